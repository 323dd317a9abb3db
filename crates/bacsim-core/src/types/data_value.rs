use crate::types::{BitString, ObjectId};

/// A single application-tagged primitive value, borrowed from the frame it
/// was decoded from.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue<'a> {
    Null,
    Boolean(bool),
    Unsigned(u32),
    Signed(i32),
    Real(f32),
    Double(f64),
    OctetString(&'a [u8]),
    CharacterString(&'a str),
    BitString(BitString<'a>),
    Enumerated(u32),
    ObjectId(ObjectId),
}
