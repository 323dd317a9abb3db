#![no_main]

use bacsim_core::encoding::reader::Reader;
use bacsim_core::npdu::Npdu;
use bacsim_datalink::bip::bvlc::BvlcFrame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = BvlcFrame::decode(data) else {
        return;
    };
    if frame.function.carries_npdu() {
        let mut r = Reader::new(frame.payload);
        if Npdu::decode(&mut r).is_ok() {
            let _ = bacsim_core::decode(r.read_rest());
        }
    }
});
