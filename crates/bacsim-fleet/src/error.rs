use bacsim_core::types::{ErrorClass, ErrorCode, ObjectId, PropertyId};
use bacsim_datalink::DataLinkError;
use std::net::SocketAddr;
use thiserror::Error;

/// Failures of a registry read or write. Each maps to one BACnet error
/// class/code pair, see [`RegistryError::bacnet_error`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("device {0} not found")]
    DeviceNotFound(u32),
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),
    #[error("unknown property {0}")]
    UnknownProperty(PropertyId),
    #[error("invalid array index")]
    InvalidArrayIndex,
    #[error("property is not an array")]
    PropertyIsNotAnArray,
    #[error("write access denied")]
    WriteAccessDenied,
    #[error("invalid data type")]
    InvalidDataType,
    #[error("value out of range")]
    ValueOutOfRange,
}

impl RegistryError {
    pub const fn bacnet_error(&self) -> (ErrorClass, ErrorCode) {
        match self {
            Self::DeviceNotFound(_) | Self::UnknownObject(_) => {
                (ErrorClass::Object, ErrorCode::UnknownObject)
            }
            Self::UnknownProperty(_) => (ErrorClass::Property, ErrorCode::UnknownProperty),
            Self::InvalidArrayIndex => (ErrorClass::Property, ErrorCode::InvalidArrayIndex),
            Self::PropertyIsNotAnArray => (ErrorClass::Property, ErrorCode::PropertyIsNotAnArray),
            Self::WriteAccessDenied => (ErrorClass::Property, ErrorCode::WriteAccessDenied),
            Self::InvalidDataType => (ErrorClass::Property, ErrorCode::InvalidDataType),
            Self::ValueOutOfRange => (ErrorClass::Property, ErrorCode::ValueOutOfRange),
        }
    }
}

/// Configuration problems detected before any socket is bound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("device count must be at least 1")]
    NoDevices,
    #[error("device instance {0} is out of range 0..=4194302")]
    InstanceOutOfRange(u64),
    #[error("device instance {0} is assigned twice")]
    DuplicateInstance(u32),
    #[error("unknown device type `{0}`")]
    UnknownDeviceType(String),
    #[error("device type scheme is empty")]
    EmptyDeviceTypes,
    #[error("device type list names {got} devices but {expected} are configured")]
    DeviceTypeListLength { expected: usize, got: usize },
    #[error("address plan overflows at device index {0}")]
    AddressOverflow(usize),
    #[error("address {0} is assigned to more than one device")]
    DuplicateAddress(SocketAddr),
    #[error("subnet prefix /{0} is longer than 32 bits")]
    InvalidPrefix(u8),
    #[error("per-device queue depth must be at least 1")]
    ZeroQueueDepth,
    #[error("shared endpoints need an IPv4 bind address, got {0}")]
    NotIpv4(SocketAddr),
}

/// A device whose endpoint could not be bound. The rest of the fleet runs.
#[derive(Debug)]
pub struct BindFailure {
    pub devices: Vec<u32>,
    pub addr: SocketAddr,
    pub error: DataLinkError,
}

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("datalink error: {0}")]
    DataLink(#[from] DataLinkError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("encode error: {0}")]
    Encode(#[from] bacsim_core::EncodeError),
    #[error("decode error: {0}")]
    Decode(#[from] bacsim_core::FrameError),
    #[error("no endpoint could be bound ({0} attempted)")]
    AllBindsFailed(usize),
    #[error("device {0} has no bound endpoint")]
    NoRoute(u32),
    #[error("inbound stream already taken")]
    InboundTaken,
    #[error("no free invoke-id toward {0}")]
    InvokeIdsExhausted(SocketAddr),
    #[error("request timed out")]
    Timeout,
    #[error("fleet is shutting down")]
    Cancelled,
    #[error("remote error class {class} code {code}")]
    RemoteError { class: u32, code: u32 },
    #[error("remote reject reason {reason}")]
    RemoteReject { reason: u8 },
    #[error("remote abort reason {reason}")]
    RemoteAbort { reason: u8 },
    #[error("unexpected response")]
    UnexpectedResponse,
}

#[cfg(test)]
mod tests {
    use super::RegistryError;
    use bacsim_core::types::{ErrorClass, ErrorCode, ObjectId, ObjectType, PropertyId};

    #[test]
    fn registry_errors_map_to_bacnet_pairs() {
        let unknown = RegistryError::UnknownObject(ObjectId::new(ObjectType::AnalogInput, 9));
        assert_eq!(
            unknown.bacnet_error(),
            (ErrorClass::Object, ErrorCode::UnknownObject)
        );
        assert_eq!(
            RegistryError::UnknownProperty(PropertyId::Units).bacnet_error(),
            (ErrorClass::Property, ErrorCode::UnknownProperty)
        );
        assert_eq!(
            RegistryError::WriteAccessDenied.bacnet_error().1,
            ErrorCode::WriteAccessDenied
        );
        assert_eq!(
            RegistryError::InvalidDataType.bacnet_error().1,
            ErrorCode::InvalidDataType
        );
        assert_eq!(
            RegistryError::ValueOutOfRange.bacnet_error().1,
            ErrorCode::ValueOutOfRange
        );
    }
}
