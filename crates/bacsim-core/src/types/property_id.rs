use core::fmt;

/// BACnet property identifiers used by the simulated object model.
///
/// Anything else decodes to [`Proprietary`](Self::Proprietary) and is
/// answered with unknown-property by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PropertyId {
    ApduTimeout,
    ApplicationSoftwareVersion,
    Description,
    EventState,
    FirmwareRevision,
    Location,
    MaxApduLengthAccepted,
    ModelName,
    NumberOfApduRetries,
    NumberOfStates,
    ObjectIdentifier,
    ObjectList,
    ObjectName,
    ObjectType,
    OutOfService,
    Polarity,
    PresentValue,
    PriorityArray,
    ProtocolRevision,
    ProtocolVersion,
    RelinquishDefault,
    SegmentationSupported,
    StatusFlags,
    SystemStatus,
    Units,
    VendorIdentifier,
    VendorName,
    Proprietary(u32),
}

impl PropertyId {
    pub const fn to_u32(self) -> u32 {
        match self {
            Self::ApduTimeout => 11,
            Self::ApplicationSoftwareVersion => 12,
            Self::Description => 28,
            Self::EventState => 36,
            Self::FirmwareRevision => 44,
            Self::Location => 58,
            Self::MaxApduLengthAccepted => 62,
            Self::ModelName => 70,
            Self::NumberOfApduRetries => 73,
            Self::NumberOfStates => 74,
            Self::ObjectIdentifier => 75,
            Self::ObjectList => 76,
            Self::ObjectName => 77,
            Self::ObjectType => 79,
            Self::OutOfService => 81,
            Self::Polarity => 84,
            Self::PresentValue => 85,
            Self::PriorityArray => 87,
            Self::ProtocolRevision => 139,
            Self::ProtocolVersion => 98,
            Self::RelinquishDefault => 104,
            Self::SegmentationSupported => 107,
            Self::StatusFlags => 111,
            Self::SystemStatus => 112,
            Self::Units => 117,
            Self::VendorIdentifier => 120,
            Self::VendorName => 121,
            Self::Proprietary(v) => v,
        }
    }

    pub const fn from_u32(value: u32) -> Self {
        match value {
            11 => Self::ApduTimeout,
            12 => Self::ApplicationSoftwareVersion,
            28 => Self::Description,
            36 => Self::EventState,
            44 => Self::FirmwareRevision,
            58 => Self::Location,
            62 => Self::MaxApduLengthAccepted,
            70 => Self::ModelName,
            73 => Self::NumberOfApduRetries,
            74 => Self::NumberOfStates,
            75 => Self::ObjectIdentifier,
            76 => Self::ObjectList,
            77 => Self::ObjectName,
            79 => Self::ObjectType,
            81 => Self::OutOfService,
            84 => Self::Polarity,
            85 => Self::PresentValue,
            87 => Self::PriorityArray,
            139 => Self::ProtocolRevision,
            98 => Self::ProtocolVersion,
            104 => Self::RelinquishDefault,
            107 => Self::SegmentationSupported,
            111 => Self::StatusFlags,
            112 => Self::SystemStatus,
            117 => Self::Units,
            120 => Self::VendorIdentifier,
            121 => Self::VendorName,
            v => Self::Proprietary(v),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::ApduTimeout => "apdu-timeout",
            Self::ApplicationSoftwareVersion => "application-software-version",
            Self::Description => "description",
            Self::EventState => "event-state",
            Self::FirmwareRevision => "firmware-revision",
            Self::Location => "location",
            Self::MaxApduLengthAccepted => "max-apdu-length-accepted",
            Self::ModelName => "model-name",
            Self::NumberOfApduRetries => "number-of-apdu-retries",
            Self::NumberOfStates => "number-of-states",
            Self::ObjectIdentifier => "object-identifier",
            Self::ObjectList => "object-list",
            Self::ObjectName => "object-name",
            Self::ObjectType => "object-type",
            Self::OutOfService => "out-of-service",
            Self::Polarity => "polarity",
            Self::PresentValue => "present-value",
            Self::PriorityArray => "priority-array",
            Self::ProtocolRevision => "protocol-revision",
            Self::ProtocolVersion => "protocol-version",
            Self::RelinquishDefault => "relinquish-default",
            Self::SegmentationSupported => "segmentation-supported",
            Self::StatusFlags => "status-flags",
            Self::SystemStatus => "system-status",
            Self::Units => "units",
            Self::VendorIdentifier => "vendor-identifier",
            Self::VendorName => "vendor-name",
            Self::Proprietary(_) => "proprietary",
        }
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proprietary(v) => write!(f, "property-{v}"),
            other => f.write_str(other.name()),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for PropertyId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::PropertyId;

    #[test]
    fn numeric_mapping_roundtrips() {
        for raw in 0u32..200 {
            assert_eq!(PropertyId::from_u32(raw).to_u32(), raw);
        }
        assert_eq!(PropertyId::from_u32(85), PropertyId::PresentValue);
    }
}
