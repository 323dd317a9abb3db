use crate::types::ObjectType;
use core::fmt;

/// A packed BACnet object identifier combining an [`ObjectType`] and a 22-bit
/// instance number into a single `u32`.
///
/// The upper 10 bits encode the object type and the lower 22 bits encode the
/// instance number, matching the BACnet wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Largest instance number a device may be assigned; 4_194_303 is the
    /// wildcard used in requests.
    pub const MAX_DEVICE_INSTANCE: u32 = 4_194_302;
    pub const WILDCARD_INSTANCE: u32 = 0x3F_FFFF;

    pub const fn new(object_type: ObjectType, instance: u32) -> Self {
        Self((((object_type.to_u16() as u32) & 0x03FF) << 22) | (instance & 0x3F_FFFF))
    }

    pub const fn device(instance: u32) -> Self {
        Self::new(ObjectType::Device, instance)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn object_type(self) -> ObjectType {
        ObjectType::from_u16(((self.0 >> 22) & 0x03FF) as u16)
    }

    pub const fn instance(self) -> u32 {
        self.0 & 0x3F_FFFF
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.object_type(), self.instance())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ObjectId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::ObjectId;
    use crate::types::ObjectType;

    #[test]
    fn packs_type_and_instance() {
        let id = ObjectId::new(ObjectType::BinaryOutput, 1234);
        assert_eq!(id.raw(), (4 << 22) | 1234);
        assert_eq!(id.object_type(), ObjectType::BinaryOutput);
        assert_eq!(id.instance(), 1234);
        assert_eq!(id.to_string(), "binary-output,1234");
    }

    #[test]
    fn instance_is_masked_to_22_bits() {
        let id = ObjectId::device(0x40_0001);
        assert_eq!(id.instance(), 1);
    }
}
