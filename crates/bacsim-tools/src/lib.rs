//! Shared pieces of the bacsim command-line tools: argument enums, value
//! parsing, TOML fleet files and the one-device probe used by the client
//! tools.

pub mod file_config;

use bacsim_core::types::{ObjectType, PropertyId};
use bacsim_fleet::{Addressing, DeviceTypeScheme, DiscoveryConfig, FleetConfig, PropertyValue};
use clap::ValueEnum;
use std::net::Ipv4Addr;
use std::time::Duration;

pub use file_config::{FileConfig, FileConfigError};

/// CLI-friendly enum for selecting BACnet object types.
///
/// Maps human-readable names to [`ObjectType`] variants for use with clap argument parsing.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ObjectTypeArg {
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
}

impl ObjectTypeArg {
    /// Convert to the core [`ObjectType`] representation.
    pub const fn into_object_type(self) -> ObjectType {
        match self {
            Self::AnalogInput => ObjectType::AnalogInput,
            Self::AnalogOutput => ObjectType::AnalogOutput,
            Self::AnalogValue => ObjectType::AnalogValue,
            Self::BinaryInput => ObjectType::BinaryInput,
            Self::BinaryOutput => ObjectType::BinaryOutput,
            Self::BinaryValue => ObjectType::BinaryValue,
            Self::Device => ObjectType::Device,
            Self::MultiStateInput => ObjectType::MultiStateInput,
            Self::MultiStateOutput => ObjectType::MultiStateOutput,
            Self::MultiStateValue => ObjectType::MultiStateValue,
        }
    }
}

/// Properties the probes can name on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PropertyArg {
    ObjectIdentifier,
    ObjectName,
    ObjectType,
    ObjectList,
    PresentValue,
    PriorityArray,
    RelinquishDefault,
    StatusFlags,
    OutOfService,
    Units,
    NumberOfStates,
    Description,
    VendorName,
    VendorIdentifier,
    ModelName,
    FirmwareRevision,
    SystemStatus,
}

impl PropertyArg {
    pub const fn into_property_id(self) -> PropertyId {
        match self {
            Self::ObjectIdentifier => PropertyId::ObjectIdentifier,
            Self::ObjectName => PropertyId::ObjectName,
            Self::ObjectType => PropertyId::ObjectType,
            Self::ObjectList => PropertyId::ObjectList,
            Self::PresentValue => PropertyId::PresentValue,
            Self::PriorityArray => PropertyId::PriorityArray,
            Self::RelinquishDefault => PropertyId::RelinquishDefault,
            Self::StatusFlags => PropertyId::StatusFlags,
            Self::OutOfService => PropertyId::OutOfService,
            Self::Units => PropertyId::Units,
            Self::NumberOfStates => PropertyId::NumberOfStates,
            Self::Description => PropertyId::Description,
            Self::VendorName => PropertyId::VendorName,
            Self::VendorIdentifier => PropertyId::VendorIdentifier,
            Self::ModelName => PropertyId::ModelName,
            Self::FirmwareRevision => PropertyId::FirmwareRevision,
            Self::SystemStatus => PropertyId::SystemStatus,
        }
    }
}

/// Application type used to encode a value given on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ValueKindArg {
    Null,
    Boolean,
    Unsigned,
    Signed,
    Real,
    Double,
    Enumerated,
    String,
}

/// Parses `text` as a value of `kind`.
pub fn parse_value(kind: ValueKindArg, text: &str) -> Result<PropertyValue, String> {
    let invalid = |e: &dyn std::fmt::Display| format!("invalid {kind:?} value {text:?}: {e}");
    match kind {
        ValueKindArg::Null => Ok(PropertyValue::Null),
        ValueKindArg::Boolean => match text.to_ascii_lowercase().as_str() {
            "true" | "1" | "active" | "on" => Ok(PropertyValue::Boolean(true)),
            "false" | "0" | "inactive" | "off" => Ok(PropertyValue::Boolean(false)),
            _ => Err(invalid(&"expected true or false")),
        },
        ValueKindArg::Unsigned => text
            .parse()
            .map(PropertyValue::Unsigned)
            .map_err(|e| invalid(&e)),
        ValueKindArg::Signed => text
            .parse()
            .map(PropertyValue::Signed)
            .map_err(|e| invalid(&e)),
        ValueKindArg::Real => text
            .parse()
            .map(PropertyValue::Real)
            .map_err(|e| invalid(&e)),
        ValueKindArg::Double => text
            .parse()
            .map(PropertyValue::Double)
            .map_err(|e| invalid(&e)),
        ValueKindArg::Enumerated => text
            .parse()
            .map(PropertyValue::Enumerated)
            .map_err(|e| invalid(&e)),
        ValueKindArg::String => Ok(PropertyValue::CharacterString(text.to_string())),
    }
}

/// Local side of a probe: a single quiet device that only acts as a client.
#[derive(Debug, Clone, clap::Args)]
pub struct ProbeArgs {
    /// Local address to bind.
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    pub bind: Ipv4Addr,
    /// Local port; 0 picks a free one. Devices broadcast their I-Am to the
    /// port they listen on, so Who-Is probes usually want 47808 here.
    #[arg(long, default_value_t = 0)]
    pub bind_port: u16,
    /// Subnet prefix used to compute the broadcast address.
    #[arg(long, default_value_t = 24)]
    pub prefix_len: u8,
    /// Device instance the probe identifies itself as.
    #[arg(long, default_value_t = 4_194_300)]
    pub device_instance: u32,
    #[arg(long, default_value_t = 3000)]
    pub timeout_ms: u64,
}

impl ProbeArgs {
    pub fn fleet_config(&self) -> FleetConfig {
        FleetConfig {
            device_count: 1,
            first_instance: self.device_instance,
            addressing: Addressing::PerDevice {
                base_ip: self.bind,
                ip_step: 0,
                base_port: self.bind_port,
                port_step: 0,
                prefix_len: self.prefix_len,
            },
            device_types: DeviceTypeScheme::Fixed("controller".to_string()),
            objects_per_template: 1,
            device_name_prefix: "bacsim-probe-".to_string(),
            request_timeout: self.timeout(),
            discovery: DiscoveryConfig {
                announce: false,
                startup_delay: Duration::ZERO,
                max_jitter: Duration::ZERO,
                interval: None,
                startup_who_is: None,
            },
            ..FleetConfig::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_parse_by_kind() {
        assert_eq!(
            parse_value(ValueKindArg::Real, "21.5").unwrap(),
            PropertyValue::Real(21.5)
        );
        assert_eq!(
            parse_value(ValueKindArg::Boolean, "Active").unwrap(),
            PropertyValue::Boolean(true)
        );
        assert_eq!(
            parse_value(ValueKindArg::Enumerated, "1").unwrap(),
            PropertyValue::Enumerated(1)
        );
        assert_eq!(
            parse_value(ValueKindArg::Null, "ignored").unwrap(),
            PropertyValue::Null
        );
        assert!(parse_value(ValueKindArg::Unsigned, "-3").is_err());
        assert!(parse_value(ValueKindArg::Boolean, "maybe").is_err());
    }

    #[test]
    fn probe_config_is_a_single_quiet_device() {
        let args = ProbeArgs {
            bind: Ipv4Addr::LOCALHOST,
            bind_port: 0,
            prefix_len: 8,
            device_instance: 4_194_300,
            timeout_ms: 250,
        };
        let config = args.fleet_config();
        let plans = config.plan().unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].instance, 4_194_300);
        assert!(!config.discovery.announce);
        assert_eq!(config.request_timeout, Duration::from_millis(250));
    }
}
