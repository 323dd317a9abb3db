use alloc::vec::Vec;

use crate::encoding::{
    primitives::{decode_signed, decode_unsigned, encode_signed, encode_unsigned},
    reader::Reader,
    tag::{AppTag, Tag},
    writer::Writer,
};
use crate::types::{BitString, DataValue, ObjectId};
use crate::{DecodeError, EncodeError};

/// Character set 0: ANSI X3.4 / UTF-8.
pub const CHARSET_UTF8: u8 = 0;

fn u32_len(len: usize) -> Result<u32, EncodeError> {
    u32::try_from(len).map_err(|_| EncodeError::ValueOutOfRange)
}

pub fn encode_application_data_value(
    w: &mut Writer<'_>,
    value: &DataValue<'_>,
) -> Result<(), EncodeError> {
    match value {
        DataValue::Null => Tag::Application {
            tag: AppTag::Null,
            len: 0,
        }
        .encode(w),
        DataValue::Boolean(v) => Tag::Application {
            tag: AppTag::Boolean,
            len: u32::from(*v),
        }
        .encode(w),
        DataValue::Unsigned(v) => encode_app_unsigned_like(w, AppTag::UnsignedInt, *v),
        DataValue::Signed(v) => encode_app_signed_like(w, AppTag::SignedInt, *v),
        DataValue::Real(v) => {
            Tag::Application {
                tag: AppTag::Real,
                len: 4,
            }
            .encode(w)?;
            w.write_all(&v.to_bits().to_be_bytes())
        }
        DataValue::Double(v) => {
            Tag::Application {
                tag: AppTag::Double,
                len: 8,
            }
            .encode(w)?;
            w.write_all(&v.to_bits().to_be_bytes())
        }
        DataValue::OctetString(v) => {
            Tag::Application {
                tag: AppTag::OctetString,
                len: u32_len(v.len())?,
            }
            .encode(w)?;
            w.write_all(v)
        }
        DataValue::CharacterString(v) => {
            let bytes = v.as_bytes();
            Tag::Application {
                tag: AppTag::CharacterString,
                len: u32_len(bytes.len().saturating_add(1))?,
            }
            .encode(w)?;
            w.write_u8(CHARSET_UTF8)?;
            w.write_all(bytes)
        }
        DataValue::BitString(v) => {
            if v.unused_bits > 7 || (v.data.is_empty() && v.unused_bits != 0) {
                return Err(EncodeError::ValueOutOfRange);
            }
            Tag::Application {
                tag: AppTag::BitString,
                len: u32_len(v.data.len().saturating_add(1))?,
            }
            .encode(w)?;
            w.write_u8(v.unused_bits)?;
            w.write_all(v.data)
        }
        DataValue::Enumerated(v) => encode_app_unsigned_like(w, AppTag::Enumerated, *v),
        DataValue::ObjectId(v) => {
            Tag::Application {
                tag: AppTag::ObjectId,
                len: 4,
            }
            .encode(w)?;
            w.write_all(&v.raw().to_be_bytes())
        }
    }
}

pub fn decode_application_data_value<'a>(r: &mut Reader<'a>) -> Result<DataValue<'a>, DecodeError> {
    let tag = Tag::decode(r)?;
    decode_application_data_value_from_tag(r, tag)
}

pub fn decode_application_data_value_from_tag<'a>(
    r: &mut Reader<'a>,
    tag: Tag,
) -> Result<DataValue<'a>, DecodeError> {
    let (tag, len) = match tag {
        Tag::Application { tag, len } => (tag, len),
        _ => return Err(DecodeError::InvalidTag),
    };
    match (tag, len) {
        (AppTag::Null, 0) => Ok(DataValue::Null),
        (AppTag::Boolean, len) => Ok(DataValue::Boolean(len != 0)),
        (AppTag::UnsignedInt, len) => Ok(DataValue::Unsigned(decode_unsigned(r, len as usize)?)),
        (AppTag::SignedInt, len) => Ok(DataValue::Signed(decode_signed(r, len as usize)?)),
        (AppTag::Real, 4) => Ok(DataValue::Real(f32::from_bits(r.read_be_u32()?))),
        (AppTag::Double, 8) => {
            let b = r.read_exact(8)?;
            Ok(DataValue::Double(f64::from_bits(u64::from_be_bytes([
                b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            ]))))
        }
        (AppTag::OctetString, len) => Ok(DataValue::OctetString(r.read_exact(len as usize)?)),
        (AppTag::CharacterString, len) => {
            if len == 0 {
                return Err(DecodeError::InvalidLength);
            }
            let raw = r.read_exact(len as usize)?;
            if raw[0] != CHARSET_UTF8 {
                return Err(DecodeError::Unsupported);
            }
            let s = core::str::from_utf8(&raw[1..]).map_err(|_| DecodeError::InvalidValue)?;
            Ok(DataValue::CharacterString(s))
        }
        (AppTag::BitString, len) => {
            if len == 0 {
                return Err(DecodeError::InvalidLength);
            }
            let raw = r.read_exact(len as usize)?;
            if raw[0] > 7 || (raw.len() == 1 && raw[0] != 0) {
                return Err(DecodeError::InvalidValue);
            }
            Ok(DataValue::BitString(BitString {
                unused_bits: raw[0],
                data: &raw[1..],
            }))
        }
        (AppTag::Enumerated, len) => Ok(DataValue::Enumerated(decode_unsigned(r, len as usize)?)),
        (AppTag::ObjectId, 4) => Ok(DataValue::ObjectId(ObjectId::from_raw(r.read_be_u32()?))),
        (AppTag::Date | AppTag::Time, _) => Err(DecodeError::Unsupported),
        _ => Err(DecodeError::InvalidLength),
    }
}

/// Encodes `values` between opening and closing context tag `tag_num`.
pub fn encode_value_list(
    w: &mut Writer<'_>,
    tag_num: u8,
    values: &[DataValue<'_>],
) -> Result<(), EncodeError> {
    Tag::Opening { tag_num }.encode(w)?;
    for value in values {
        encode_application_data_value(w, value)?;
    }
    Tag::Closing { tag_num }.encode(w)
}

/// Decodes application values up to and including closing tag `tag_num`.
/// The opening tag must already have been consumed.
pub fn decode_value_list<'a>(
    r: &mut Reader<'a>,
    tag_num: u8,
) -> Result<Vec<DataValue<'a>>, DecodeError> {
    let mut values = Vec::new();
    loop {
        match Tag::decode(r)? {
            Tag::Closing { tag_num: n } if n == tag_num => return Ok(values),
            tag @ Tag::Application { .. } => {
                values.push(decode_application_data_value_from_tag(r, tag)?)
            }
            _ => return Err(DecodeError::InvalidTag),
        }
    }
}

fn encode_app_unsigned_like(
    w: &mut Writer<'_>,
    tag: AppTag,
    value: u32,
) -> Result<(), EncodeError> {
    let mut scratch = [0u8; 4];
    let mut tw = Writer::new(&mut scratch);
    let len = encode_unsigned(&mut tw, value)? as u32;
    Tag::Application { tag, len }.encode(w)?;
    w.write_all(&scratch[..len as usize])
}

fn encode_app_signed_like(w: &mut Writer<'_>, tag: AppTag, value: i32) -> Result<(), EncodeError> {
    let mut scratch = [0u8; 4];
    let mut tw = Writer::new(&mut scratch);
    let len = encode_signed(&mut tw, value)? as u32;
    Tag::Application { tag, len }.encode(w)?;
    w.write_all(&scratch[..len as usize])
}
