use crate::encoding::{reader::Reader, writer::Writer};
use crate::{DecodeError, EncodeError};

/// Application tag numbers the codec understands.
///
/// Date and Time are recognised on the wire so that their tags classify
/// correctly, but no service payload the fleet handles carries them.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppTag {
    Null = 0,
    Boolean = 1,
    UnsignedInt = 2,
    SignedInt = 3,
    Real = 4,
    Double = 5,
    OctetString = 6,
    CharacterString = 7,
    BitString = 8,
    Enumerated = 9,
    Date = 10,
    Time = 11,
    ObjectId = 12,
}

impl AppTag {
    pub fn from_u8(value: u8) -> Result<Self, DecodeError> {
        Ok(match value {
            0 => Self::Null,
            1 => Self::Boolean,
            2 => Self::UnsignedInt,
            3 => Self::SignedInt,
            4 => Self::Real,
            5 => Self::Double,
            6 => Self::OctetString,
            7 => Self::CharacterString,
            8 => Self::BitString,
            9 => Self::Enumerated,
            10 => Self::Date,
            11 => Self::Time,
            12 => Self::ObjectId,
            _ => return Err(DecodeError::InvalidTag),
        })
    }
}

/// A decoded tag header.
///
/// For `Application { tag: Boolean, .. }` the `len` field carries the boolean
/// value itself (0 or 1) and no content octets follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Application { tag: AppTag, len: u32 },
    Context { tag_num: u8, len: u32 },
    Opening { tag_num: u8 },
    Closing { tag_num: u8 },
}

impl Tag {
    pub fn encode(self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        match self {
            Tag::Application { tag, len } => write_header(w, tag as u8, false, len),
            Tag::Context { tag_num, len } => write_header(w, tag_num, true, len),
            Tag::Opening { tag_num } => write_marker(w, tag_num, 6),
            Tag::Closing { tag_num } => write_marker(w, tag_num, 7),
        }
    }

    /// Decodes one tag header.
    ///
    /// Length-carrying tags are checked against the remaining input, so a
    /// length field that overruns the buffer reports truncation here rather
    /// than later inside a content decoder.
    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let first = r.read_u8()?;
        let is_context = (first & 0b0000_1000) != 0;
        let lvt = first & 0b0000_0111;

        let mut tag_num = first >> 4;
        if tag_num == 0x0F {
            tag_num = r.read_u8()?;
            if tag_num == 0xFF {
                return Err(DecodeError::InvalidTag);
            }
        }

        if is_context {
            return match lvt {
                6 => Ok(Tag::Opening { tag_num }),
                7 => Ok(Tag::Closing { tag_num }),
                _ => {
                    let len = read_len(r, lvt)?;
                    Ok(Tag::Context { tag_num, len })
                }
            };
        }

        let tag = AppTag::from_u8(tag_num)?;
        if tag == AppTag::Boolean {
            if lvt > 1 {
                return Err(DecodeError::InvalidValue);
            }
            return Ok(Tag::Application {
                tag,
                len: lvt as u32,
            });
        }
        let len = read_len(r, lvt)?;
        Ok(Tag::Application { tag, len })
    }

    /// Decodes the next tag without consuming it.
    pub fn peek(r: &Reader<'_>) -> Result<Self, DecodeError> {
        let mut probe = *r;
        Self::decode(&mut probe)
    }
}

fn write_header(
    w: &mut Writer<'_>,
    tag_num: u8,
    is_context: bool,
    len: u32,
) -> Result<(), EncodeError> {
    let mut first = if tag_num <= 14 { tag_num << 4 } else { 0xF0 };
    if is_context {
        first |= 0b0000_1000;
    }
    let lvt = if len <= 4 { len as u8 } else { 5 };
    w.write_u8(first | lvt)?;
    if tag_num > 14 {
        w.write_u8(tag_num)?;
    }

    match len {
        0..=4 => Ok(()),
        5..=253 => w.write_u8(len as u8),
        254..=0xFFFF => {
            w.write_u8(254)?;
            w.write_be_u16(len as u16)
        }
        _ => {
            w.write_u8(255)?;
            w.write_be_u32(len)
        }
    }
}

fn write_marker(w: &mut Writer<'_>, tag_num: u8, lvt: u8) -> Result<(), EncodeError> {
    if tag_num <= 14 {
        w.write_u8((tag_num << 4) | 0b0000_1000 | lvt)
    } else {
        w.write_u8(0xF8 | lvt)?;
        w.write_u8(tag_num)
    }
}

fn read_len(r: &mut Reader<'_>, lvt: u8) -> Result<u32, DecodeError> {
    let len = match lvt {
        0..=4 => lvt as u32,
        5 => match r.read_u8()? {
            254 => r.read_be_u16()? as u32,
            255 => r.read_be_u32()?,
            short => short as u32,
        },
        _ => return Err(DecodeError::InvalidLength),
    };
    if len as usize > r.remaining() {
        return Err(DecodeError::UnexpectedEof);
    }
    Ok(len)
}
