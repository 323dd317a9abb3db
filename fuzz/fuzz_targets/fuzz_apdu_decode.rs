#![no_main]

use bacsim_core::{decode, encode};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(apdu) = decode(data) {
        // Anything that decodes must encode again without panicking.
        let _ = encode(&apdu);
    }
});
