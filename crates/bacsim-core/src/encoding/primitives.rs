use crate::encoding::{
    reader::Reader,
    tag::{AppTag, Tag},
    writer::Writer,
};
use crate::types::ObjectId;
use crate::{DecodeError, EncodeError};

/// Number of octets needed to encode `value` as a BACnet unsigned.
pub const fn unsigned_len(value: u32) -> usize {
    match value {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    }
}

/// Number of octets needed to encode `value` as a BACnet signed integer.
pub const fn signed_len(value: i32) -> usize {
    match value {
        -128..=127 => 1,
        -32_768..=32_767 => 2,
        -8_388_608..=8_388_607 => 3,
        _ => 4,
    }
}

pub fn encode_unsigned(w: &mut Writer<'_>, value: u32) -> Result<usize, EncodeError> {
    let len = unsigned_len(value);
    w.write_all(&value.to_be_bytes()[4 - len..])?;
    Ok(len)
}

pub fn decode_unsigned(r: &mut Reader<'_>, len: usize) -> Result<u32, DecodeError> {
    if len == 0 || len > 4 {
        return Err(DecodeError::InvalidLength);
    }
    let bytes = r.read_exact(len)?;
    Ok(bytes.iter().fold(0u32, |acc, b| (acc << 8) | *b as u32))
}

pub fn encode_signed(w: &mut Writer<'_>, value: i32) -> Result<usize, EncodeError> {
    let len = signed_len(value);
    w.write_all(&value.to_be_bytes()[4 - len..])?;
    Ok(len)
}

pub fn decode_signed(r: &mut Reader<'_>, len: usize) -> Result<i32, DecodeError> {
    if len == 0 || len > 4 {
        return Err(DecodeError::InvalidLength);
    }
    let bytes = r.read_exact(len)?;
    let fill = if bytes[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut out = [fill; 4];
    out[4 - len..].copy_from_slice(bytes);
    Ok(i32::from_be_bytes(out))
}

pub fn encode_app_unsigned(w: &mut Writer<'_>, value: u32) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::UnsignedInt,
        len: unsigned_len(value) as u32,
    }
    .encode(w)?;
    encode_unsigned(w, value).map(|_| ())
}

pub fn encode_app_enumerated(w: &mut Writer<'_>, value: u32) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::Enumerated,
        len: unsigned_len(value) as u32,
    }
    .encode(w)?;
    encode_unsigned(w, value).map(|_| ())
}

pub fn encode_app_object_id(w: &mut Writer<'_>, object_id: ObjectId) -> Result<(), EncodeError> {
    Tag::Application {
        tag: AppTag::ObjectId,
        len: 4,
    }
    .encode(w)?;
    w.write_be_u32(object_id.raw())
}

pub fn decode_app_unsigned(r: &mut Reader<'_>) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::UnsignedInt,
            len,
        } => decode_unsigned(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_enumerated(r: &mut Reader<'_>) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::Enumerated,
            len,
        } => decode_unsigned(r, len as usize),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn decode_app_object_id(r: &mut Reader<'_>) -> Result<ObjectId, DecodeError> {
    match Tag::decode(r)? {
        Tag::Application {
            tag: AppTag::ObjectId,
            len: 4,
        } => Ok(ObjectId::from_raw(r.read_be_u32()?)),
        Tag::Application {
            tag: AppTag::ObjectId,
            ..
        } => Err(DecodeError::InvalidLength),
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn encode_ctx_unsigned(w: &mut Writer<'_>, tag_num: u8, value: u32) -> Result<(), EncodeError> {
    Tag::Context {
        tag_num,
        len: unsigned_len(value) as u32,
    }
    .encode(w)?;
    encode_unsigned(w, value).map(|_| ())
}

pub fn encode_ctx_object_id(
    w: &mut Writer<'_>,
    tag_num: u8,
    object_id: ObjectId,
) -> Result<(), EncodeError> {
    Tag::Context { tag_num, len: 4 }.encode(w)?;
    w.write_be_u32(object_id.raw())
}

/// Decodes a required context-tagged unsigned at `expected_tag_num`.
pub fn decode_ctx_unsigned(r: &mut Reader<'_>, expected_tag_num: u8) -> Result<u32, DecodeError> {
    match Tag::decode(r)? {
        Tag::Context { tag_num, len } if tag_num == expected_tag_num => {
            decode_unsigned(r, len as usize)
        }
        _ => Err(DecodeError::InvalidTag),
    }
}

/// Decodes a context-tagged unsigned only if the next tag is `expected_tag_num`.
pub fn decode_optional_ctx_unsigned(
    r: &mut Reader<'_>,
    expected_tag_num: u8,
) -> Result<Option<u32>, DecodeError> {
    if r.is_empty() {
        return Ok(None);
    }
    match Tag::peek(r)? {
        Tag::Context { tag_num, .. } if tag_num == expected_tag_num => {
            decode_ctx_unsigned(r, expected_tag_num).map(Some)
        }
        _ => Ok(None),
    }
}

pub fn decode_ctx_object_id(
    r: &mut Reader<'_>,
    expected_tag_num: u8,
) -> Result<ObjectId, DecodeError> {
    match Tag::decode(r)? {
        Tag::Context { tag_num, len: 4 } if tag_num == expected_tag_num => {
            Ok(ObjectId::from_raw(r.read_be_u32()?))
        }
        Tag::Context { tag_num, .. } if tag_num == expected_tag_num => {
            Err(DecodeError::InvalidLength)
        }
        _ => Err(DecodeError::InvalidTag),
    }
}

pub fn expect_opening(r: &mut Reader<'_>, expected_tag_num: u8) -> Result<(), DecodeError> {
    match Tag::decode(r)? {
        Tag::Opening { tag_num } if tag_num == expected_tag_num => Ok(()),
        _ => Err(DecodeError::InvalidTag),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decode_app_object_id, decode_ctx_object_id, decode_optional_ctx_unsigned,
        decode_signed, decode_unsigned, encode_ctx_object_id, encode_ctx_unsigned,
        encode_signed, encode_unsigned,
    };
    use crate::encoding::{reader::Reader, writer::Writer};
    use crate::types::{ObjectId, ObjectType};
    use crate::DecodeError;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn unsigned_uses_minimal_octets(v in any::<u32>()) {
            let mut b = [0u8; 4];
            let mut w = Writer::new(&mut b);
            let len = encode_unsigned(&mut w, v).unwrap();
            prop_assert!(len == 1 || w.as_written()[0] != 0);
            let mut r = Reader::new(w.as_written());
            prop_assert_eq!(decode_unsigned(&mut r, len).unwrap(), v);
        }

        #[test]
        fn signed_sign_extends(v in any::<i32>()) {
            let mut b = [0u8; 4];
            let mut w = Writer::new(&mut b);
            let len = encode_signed(&mut w, v).unwrap();
            let mut r = Reader::new(w.as_written());
            prop_assert_eq!(decode_signed(&mut r, len).unwrap(), v);
        }
    }

    #[test]
    fn optional_context_tag_is_left_alone_when_absent() {
        let mut b = [0u8; 16];
        let mut w = Writer::new(&mut b);
        encode_ctx_unsigned(&mut w, 3, 9).unwrap();
        let mut r = Reader::new(w.as_written());
        assert_eq!(decode_optional_ctx_unsigned(&mut r, 2).unwrap(), None);
        assert_eq!(decode_optional_ctx_unsigned(&mut r, 3).unwrap(), Some(9));
        assert!(r.is_empty());
    }

    #[test]
    fn object_ids_must_be_four_octets() {
        let id = ObjectId::new(ObjectType::AnalogInput, 7);
        let mut b = [0u8; 8];
        let mut w = Writer::new(&mut b);
        encode_ctx_object_id(&mut w, 0, id).unwrap();
        let mut r = Reader::new(w.as_written());
        assert_eq!(decode_ctx_object_id(&mut r, 0).unwrap(), id);

        let mut r = Reader::new(&[0x0B, 0, 0, 7]);
        assert_eq!(
            decode_ctx_object_id(&mut r, 0).unwrap_err(),
            DecodeError::InvalidLength
        );
        let mut r = Reader::new(&[0xC3, 0, 0, 7]);
        assert_eq!(
            decode_app_object_id(&mut r).unwrap_err(),
            DecodeError::InvalidLength
        );
    }
}
