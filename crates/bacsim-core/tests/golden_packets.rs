use bacsim_core::apdu::{AbortPdu, BacnetError, SimpleAck};
use bacsim_core::codec::{encode_into, Apdu};
use bacsim_core::encoding::writer::Writer;
use bacsim_core::npdu::{Npdu, NpduAddress};
use bacsim_core::services::{
    IAmRequest, ReadPropertyAck, ReadPropertyRequest, WhoIsRequest, WritePropertyRequest,
};
use bacsim_core::types::{
    AbortReason, DataValue, ErrorClass, ErrorCode, ObjectId, ObjectType, PropertyId, Segmentation,
};
use bacsim_core::{decode, DecodeError, DecodeErrorKind};

fn frame(npdu: Npdu, apdu: &Apdu<'_>) -> Vec<u8> {
    let mut buf = [0u8; 128];
    let mut w = Writer::new(&mut buf);
    npdu.encode(&mut w).unwrap();
    encode_into(apdu, &mut w).unwrap();
    w.as_written().to_vec()
}

#[test]
fn who_is_global_frame_matches_fixture() {
    let bytes = frame(Npdu::for_apdu(false), &Apdu::WhoIs(WhoIsRequest::global()));
    assert_eq!(bytes, [0x01, 0x00, 0x10, 0x08]);
}

#[test]
fn who_is_range_frame_matches_fixture() {
    let bytes = frame(
        Npdu::for_apdu(false),
        &Apdu::WhoIs(WhoIsRequest::range(100, 101)),
    );
    assert_eq!(bytes, [0x01, 0x00, 0x10, 0x08, 0x09, 0x64, 0x19, 0x65]);
}

#[test]
fn i_am_frame_matches_fixture() {
    let bytes = frame(
        Npdu::for_apdu(false),
        &Apdu::IAm(IAmRequest {
            device_id: ObjectId::device(1234),
            max_apdu: 1476,
            segmentation: Segmentation::NoSegmentation.to_u32(),
            vendor_id: 15,
        }),
    );
    assert_eq!(
        bytes,
        [
            0x01, 0x00, 0x10, 0x00, 0xC4, 0x02, 0x00, 0x04, 0xD2, 0x22, 0x05, 0xC4, 0x91, 0x03,
            0x21, 0x0F,
        ]
    );
}

#[test]
fn read_property_frame_matches_fixture() {
    let bytes = frame(
        Npdu::for_apdu(true),
        &Apdu::ReadProperty(ReadPropertyRequest {
            object_id: ObjectId::new(ObjectType::AnalogInput, 0),
            property_id: PropertyId::PresentValue,
            array_index: None,
            invoke_id: 1,
        }),
    );
    assert_eq!(
        bytes,
        [0x01, 0x04, 0x00, 0x05, 0x01, 0x0C, 0x0C, 0x00, 0x00, 0x00, 0x00, 0x19, 0x55]
    );
}

#[test]
fn read_property_ack_frame_matches_fixture() {
    let bytes = frame(
        Npdu::for_apdu(false),
        &Apdu::ReadPropertyAck(ReadPropertyAck {
            invoke_id: 1,
            object_id: ObjectId::new(ObjectType::AnalogInput, 0),
            property_id: PropertyId::PresentValue,
            array_index: None,
            values: vec![DataValue::Real(20.0)],
        }),
    );
    assert_eq!(
        bytes,
        [
            0x01, 0x00, 0x30, 0x01, 0x0C, 0x0C, 0x00, 0x00, 0x00, 0x00, 0x19, 0x55, 0x3E, 0x44,
            0x41, 0xA0, 0x00, 0x00, 0x3F,
        ]
    );
}

#[test]
fn write_property_frame_matches_fixture() {
    let bytes = frame(
        Npdu::for_apdu(true),
        &Apdu::WriteProperty(WritePropertyRequest::present_value(
            2,
            ObjectId::new(ObjectType::AnalogOutput, 0),
            DataValue::Real(55.0),
            Some(8),
        )),
    );
    assert_eq!(
        bytes,
        [
            0x01, 0x04, 0x00, 0x05, 0x02, 0x0F, 0x0C, 0x00, 0x40, 0x00, 0x00, 0x19, 0x55, 0x3E,
            0x44, 0x42, 0x5C, 0x00, 0x00, 0x3F, 0x49, 0x08,
        ]
    );
}

#[test]
fn responses_match_fixtures() {
    assert_eq!(
        frame(
            Npdu::for_apdu(false),
            &Apdu::SimpleAck(SimpleAck {
                invoke_id: 2,
                service_choice: 0x0F,
            })
        ),
        [0x01, 0x00, 0x20, 0x02, 0x0F]
    );
    assert_eq!(
        frame(
            Npdu::for_apdu(false),
            &Apdu::Error(BacnetError::new(
                1,
                0x0C,
                ErrorClass::Object,
                ErrorCode::UnknownObject
            ))
        ),
        [0x01, 0x00, 0x50, 0x01, 0x0C, 0x91, 0x01, 0x91, 0x1F]
    );
    assert_eq!(
        frame(
            Npdu::for_apdu(false),
            &Apdu::Abort(AbortPdu::from_server(
                5,
                AbortReason::SegmentationNotSupported
            ))
        ),
        [0x01, 0x00, 0x71, 0x05, 0x04]
    );
}

#[test]
fn virtual_destination_frame_matches_fixture() {
    let mut npdu = Npdu::for_apdu(true);
    npdu.destination = Some(NpduAddress::virtual_device(5, 100_001));
    npdu.hop_count = Some(255);
    let bytes = frame(
        npdu,
        &Apdu::ReadProperty(ReadPropertyRequest {
            object_id: ObjectId::device(100_001),
            property_id: PropertyId::ObjectName,
            array_index: None,
            invoke_id: 7,
        }),
    );
    assert_eq!(
        bytes,
        [
            0x01, 0x24, 0x00, 0x05, 0x03, 0x01, 0x86, 0xA1, 0xFF, 0x00, 0x05, 0x07, 0x0C, 0x0C,
            0x02, 0x01, 0x86, 0xA1, 0x19, 0x4D,
        ]
    );
}

#[test]
fn malformed_inputs_classify() {
    let cases: &[(&[u8], DecodeErrorKind)] = &[
        // ReadProperty with the object identifier cut short.
        (&[0x00, 0x05, 0x01, 0x0C, 0x0C, 0x00, 0x00], DecodeErrorKind::TruncatedBuffer),
        // Object identifier context tag claiming three octets.
        (
            &[0x00, 0x05, 0x01, 0x0C, 0x0B, 0x00, 0x00, 0x00, 0x19, 0x55],
            DecodeErrorKind::Malformed,
        ),
        // SubscribeCOV is not served.
        (&[0x00, 0x05, 0x01, 0x05, 0x09, 0x01], DecodeErrorKind::UnsupportedService),
        // Who-Has is not served.
        (&[0x10, 0x07, 0x3D, 0x02, 0x00, 0x41], DecodeErrorKind::UnsupportedService),
        // Property value with a non-UTF-8 character set.
        (
            &[
                0x00, 0x05, 0x01, 0x0F, 0x0C, 0x00, 0x80, 0x00, 0x00, 0x19, 0x1C, 0x3E, 0x73,
                0x03, b'o', b'k', 0x3F,
            ],
            DecodeErrorKind::Malformed,
        ),
        // Reserved APDU type.
        (&[0xF0, 0x00], DecodeErrorKind::Malformed),
    ];
    for (bytes, kind) in cases {
        let err = decode(bytes).unwrap_err();
        assert_eq!(err.kind(), *kind, "{bytes:02X?} gave {err:?}");
    }
}

#[test]
fn confirmed_request_errors_keep_the_invoke_id() {
    let err = decode(&[0x00, 0x05, 0x33, 0x0C, 0x0C, 0x00, 0x00]).unwrap_err();
    assert_eq!(err.error, DecodeError::UnexpectedEof);
    let ctx = err.request.expect("header was readable");
    assert_eq!(ctx.invoke_id, 0x33);
    assert_eq!(ctx.service_choice, 0x0C);
}
