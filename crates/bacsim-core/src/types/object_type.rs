use core::fmt;
use core::str::FromStr;

/// BACnet object types a simulated device can host.
///
/// Types outside the simulated set still round-trip through
/// [`Other`](Self::Other) so that requests naming them can be answered with
/// an unknown-object error instead of a decode failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ObjectType {
    AnalogInput,
    AnalogOutput,
    AnalogValue,
    BinaryInput,
    BinaryOutput,
    BinaryValue,
    Device,
    MultiStateInput,
    MultiStateOutput,
    MultiStateValue,
    Other(u16),
}

impl ObjectType {
    pub const fn to_u16(self) -> u16 {
        match self {
            Self::AnalogInput => 0,
            Self::AnalogOutput => 1,
            Self::AnalogValue => 2,
            Self::BinaryInput => 3,
            Self::BinaryOutput => 4,
            Self::BinaryValue => 5,
            Self::Device => 8,
            Self::MultiStateInput => 13,
            Self::MultiStateOutput => 14,
            Self::MultiStateValue => 19,
            Self::Other(v) => v,
        }
    }

    pub const fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::AnalogInput,
            1 => Self::AnalogOutput,
            2 => Self::AnalogValue,
            3 => Self::BinaryInput,
            4 => Self::BinaryOutput,
            5 => Self::BinaryValue,
            8 => Self::Device,
            13 => Self::MultiStateInput,
            14 => Self::MultiStateOutput,
            19 => Self::MultiStateValue,
            v => Self::Other(v),
        }
    }

    /// Standard hyphenated name, e.g. `analog-input`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::AnalogInput => "analog-input",
            Self::AnalogOutput => "analog-output",
            Self::AnalogValue => "analog-value",
            Self::BinaryInput => "binary-input",
            Self::BinaryOutput => "binary-output",
            Self::BinaryValue => "binary-value",
            Self::Device => "device",
            Self::MultiStateInput => "multi-state-input",
            Self::MultiStateOutput => "multi-state-output",
            Self::MultiStateValue => "multi-state-value",
            Self::Other(_) => "other",
        }
    }

    /// Output objects carry a priority array.
    pub const fn is_commandable(self) -> bool {
        matches!(
            self,
            Self::AnalogOutput | Self::BinaryOutput | Self::MultiStateOutput
        )
    }

    /// Input objects only accept present-value writes while out of service.
    pub const fn is_input(self) -> bool {
        matches!(
            self,
            Self::AnalogInput | Self::BinaryInput | Self::MultiStateInput
        )
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(v) => write!(f, "object-type-{v}"),
            other => f.write_str(other.name()),
        }
    }
}

/// Returned when a name does not match any simulated object type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownObjectType;

impl fmt::Display for UnknownObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown object type")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownObjectType {}

impl FromStr for ObjectType {
    type Err = UnknownObjectType;

    /// Accepts the hyphenated form (`analog-input`) and the camel-case form
    /// used by most BACnet tooling (`analogInput`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ALL: [ObjectType; 10] = [
            ObjectType::AnalogInput,
            ObjectType::AnalogOutput,
            ObjectType::AnalogValue,
            ObjectType::BinaryInput,
            ObjectType::BinaryOutput,
            ObjectType::BinaryValue,
            ObjectType::Device,
            ObjectType::MultiStateInput,
            ObjectType::MultiStateOutput,
            ObjectType::MultiStateValue,
        ];
        ALL.into_iter()
            .find(|t| {
                let name = t.name();
                name.eq_ignore_ascii_case(s) || camel_matches(name, s)
            })
            .ok_or(UnknownObjectType)
    }
}

fn camel_matches(hyphenated: &str, candidate: &str) -> bool {
    let mut expected = hyphenated.bytes().filter(|b| *b != b'-');
    let mut got = candidate.bytes();
    loop {
        match (expected.next(), got.next()) {
            (Some(a), Some(b)) if a.eq_ignore_ascii_case(&b) => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ObjectType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ObjectType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NameVisitor;

        impl serde::de::Visitor<'_> for NameVisitor {
            type Value = ObjectType;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object type name such as `analog-input`")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse()
                    .map_err(|_| E::invalid_value(serde::de::Unexpected::Str(v), &self))
            }
        }

        deserializer.deserialize_str(NameVisitor)
    }
}
