use bacsim_core::types::{BitString, DataValue, ObjectId};
use core::fmt;

/// Owned property value held by the registry.
///
/// A property whose wire form is more than one application value (the
/// priority array, the object list) is a [`List`](Self::List).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Unsigned(u32),
    Signed(i32),
    Real(f32),
    Double(f64),
    OctetString(Vec<u8>),
    CharacterString(String),
    BitString { unused_bits: u8, data: Vec<u8> },
    Enumerated(u32),
    ObjectId(ObjectId),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn from_data_value(value: &DataValue<'_>) -> Self {
        match value {
            DataValue::Null => Self::Null,
            DataValue::Boolean(v) => Self::Boolean(*v),
            DataValue::Unsigned(v) => Self::Unsigned(*v),
            DataValue::Signed(v) => Self::Signed(*v),
            DataValue::Real(v) => Self::Real(*v),
            DataValue::Double(v) => Self::Double(*v),
            DataValue::OctetString(v) => Self::OctetString(v.to_vec()),
            DataValue::CharacterString(v) => Self::CharacterString((*v).to_string()),
            DataValue::BitString(v) => Self::BitString {
                unused_bits: v.unused_bits,
                data: v.data.to_vec(),
            },
            DataValue::Enumerated(v) => Self::Enumerated(*v),
            DataValue::ObjectId(v) => Self::ObjectId(*v),
        }
    }

    /// A single wire value stays scalar; anything else becomes a list.
    pub fn from_values(values: &[DataValue<'_>]) -> Self {
        match values {
            [single] => Self::from_data_value(single),
            many => Self::List(many.iter().map(Self::from_data_value).collect()),
        }
    }

    /// Flattens the value into application-tagged wire values.
    pub fn to_data_values(&self) -> Vec<DataValue<'_>> {
        let mut out = Vec::new();
        self.push_data_values(&mut out);
        out
    }

    fn push_data_values<'a>(&'a self, out: &mut Vec<DataValue<'a>>) {
        let value = match self {
            Self::Null => DataValue::Null,
            Self::Boolean(v) => DataValue::Boolean(*v),
            Self::Unsigned(v) => DataValue::Unsigned(*v),
            Self::Signed(v) => DataValue::Signed(*v),
            Self::Real(v) => DataValue::Real(*v),
            Self::Double(v) => DataValue::Double(*v),
            Self::OctetString(v) => DataValue::OctetString(v),
            Self::CharacterString(v) => DataValue::CharacterString(v),
            Self::BitString { unused_bits, data } => {
                DataValue::BitString(BitString::new(*unused_bits, data))
            }
            Self::Enumerated(v) => DataValue::Enumerated(*v),
            Self::ObjectId(v) => DataValue::ObjectId(*v),
            Self::List(items) => {
                for item in items {
                    item.push_data_values(out);
                }
                return;
            }
        };
        out.push(value);
    }

    /// True when both values carry the same application datatype.
    pub fn same_type(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }

    pub fn as_real(&self) -> Option<f32> {
        match self {
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Unsigned(v) => write!(f, "{v}"),
            Self::Signed(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::OctetString(v) => {
                for b in v {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
            Self::CharacterString(v) => write!(f, "{v:?}"),
            Self::BitString { unused_bits, data } => {
                let bits = BitString::new(*unused_bits, data);
                for i in 0..bits.bit_len() {
                    f.write_str(if bits.bit(i) == Some(true) { "1" } else { "0" })?;
                }
                Ok(())
            }
            Self::Enumerated(v) => write!(f, "enum({v})"),
            Self::ObjectId(v) => write!(f, "{v}"),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}
