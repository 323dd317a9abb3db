use crate::error::ConfigError;
use crate::template::{TemplateTable, PROTOTYPE_DEVICE_TYPES};
use bacsim_core::types::ObjectId;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_APDU_TIMEOUT: Duration = Duration::from_secs(6);
pub const DEFAULT_VIRTUAL_NETWORK: u16 = 1001;

/// How simulated devices are attached to the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressing {
    /// One socket per device at `base_ip + n * ip_step`,
    /// `base_port + n * port_step`. A zero base port binds ephemeral ports.
    PerDevice {
        base_ip: Ipv4Addr,
        ip_step: u32,
        base_port: u16,
        port_step: u16,
        prefix_len: u8,
    },
    /// One socket for the whole fleet; devices are told apart by their
    /// virtual address on `virtual_network`.
    Shared {
        bind: SocketAddr,
        prefix_len: u8,
        virtual_network: u16,
    },
}

impl Addressing {
    pub fn prefix_len(&self) -> u8 {
        match self {
            Self::PerDevice { prefix_len, .. } | Self::Shared { prefix_len, .. } => *prefix_len,
        }
    }

    pub fn virtual_network(&self) -> Option<u16> {
        match self {
            Self::PerDevice { .. } => None,
            Self::Shared {
                virtual_network, ..
            } => Some(*virtual_network),
        }
    }
}

impl Default for Addressing {
    fn default() -> Self {
        Self::PerDevice {
            base_ip: Ipv4Addr::LOCALHOST,
            ip_step: 0,
            base_port: 47808,
            port_step: 1,
            prefix_len: 8,
        }
    }
}

/// Picks a device-type tag for every device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTypeScheme {
    /// `cycle[instance % cycle.len()]`
    Cycle(Vec<String>),
    Fixed(String),
    /// One entry per device, in index order.
    List(Vec<String>),
}

impl Default for DeviceTypeScheme {
    fn default() -> Self {
        Self::Cycle(PROTOTYPE_DEVICE_TYPES.iter().map(|s| s.to_string()).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Send one I-Am per device at startup.
    pub announce: bool,
    pub startup_delay: Duration,
    /// Upper bound of the random offset added to every scheduled I-Am.
    pub max_jitter: Duration,
    /// Periodic re-announcement.
    pub interval: Option<Duration>,
    /// Send a global Who-Is from every device after this delay.
    pub startup_who_is: Option<Duration>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            announce: true,
            startup_delay: Duration::ZERO,
            max_jitter: Duration::from_millis(500),
            interval: None,
            startup_who_is: Some(Duration::from_secs(2)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FleetConfig {
    pub device_count: usize,
    pub first_instance: u32,
    pub instance_step: u32,
    pub addressing: Addressing,
    /// Replaces the broadcast address computed from the bound subnet.
    pub broadcast: Option<SocketAddr>,
    /// Port of the computed broadcast address; `None` keeps each endpoint's
    /// own port. Devices on distinct ports of one host only hear each
    /// other's Who-Is and I-Am when this names a port one of them listens on.
    pub broadcast_port: Option<u16>,
    pub device_types: DeviceTypeScheme,
    pub objects_per_template: u32,
    pub templates: TemplateTable,
    /// Device object-name is this prefix followed by the instance number.
    pub device_name_prefix: String,
    pub vendor_name: String,
    pub vendor_id: u16,
    pub model_name: String,
    pub apdu_timeout: Duration,
    /// Bound of the I-Am reply delay; `None` means a quarter of
    /// `apdu_timeout`.
    pub who_is_jitter: Option<Duration>,
    pub request_timeout: Duration,
    pub discovery: DiscoveryConfig,
    pub queue_depth: usize,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            device_count: 10,
            first_instance: 1234,
            instance_step: 1,
            addressing: Addressing::default(),
            broadcast: None,
            broadcast_port: None,
            device_types: DeviceTypeScheme::default(),
            objects_per_template: 3,
            templates: TemplateTable::builtin(),
            device_name_prefix: "BACnetStimDevice".to_string(),
            vendor_name: "bacsim".to_string(),
            vendor_id: 15,
            model_name: "bacsim virtual device".to_string(),
            apdu_timeout: DEFAULT_APDU_TIMEOUT,
            who_is_jitter: None,
            request_timeout: DEFAULT_APDU_TIMEOUT,
            discovery: DiscoveryConfig::default(),
            queue_depth: 64,
        }
    }
}

/// One device as it will be constructed and bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePlan {
    pub index: usize,
    pub instance: u32,
    pub device_type: String,
    pub bind: SocketAddr,
}

impl FleetConfig {
    pub fn who_is_jitter(&self) -> Duration {
        self.who_is_jitter.unwrap_or(self.apdu_timeout / 4)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.plan().map(|_| ())
    }

    /// Resolves instance numbers, device types and bind addresses.
    pub fn plan(&self) -> Result<Vec<DevicePlan>, ConfigError> {
        if self.device_count == 0 {
            return Err(ConfigError::NoDevices);
        }
        if self.queue_depth == 0 {
            return Err(ConfigError::ZeroQueueDepth);
        }
        let prefix = self.addressing.prefix_len();
        if prefix > 32 {
            return Err(ConfigError::InvalidPrefix(prefix));
        }
        if let DeviceTypeScheme::List(list) = &self.device_types {
            if list.len() != self.device_count {
                return Err(ConfigError::DeviceTypeListLength {
                    expected: self.device_count,
                    got: list.len(),
                });
            }
        }

        let mut instances = HashSet::with_capacity(self.device_count);
        let mut addrs = HashSet::with_capacity(self.device_count);
        let mut plans = Vec::with_capacity(self.device_count);
        for index in 0..self.device_count {
            let instance = self.instance_at(index)?;
            if !instances.insert(instance) {
                return Err(ConfigError::DuplicateInstance(instance));
            }
            let device_type = self.device_type_at(index, instance)?;
            let bind = self.bind_at(index)?;
            if matches!(self.addressing, Addressing::PerDevice { .. })
                && bind.port() != 0
                && !addrs.insert(bind)
            {
                return Err(ConfigError::DuplicateAddress(bind));
            }
            plans.push(DevicePlan {
                index,
                instance,
                device_type,
                bind,
            });
        }
        Ok(plans)
    }

    fn instance_at(&self, index: usize) -> Result<u32, ConfigError> {
        let instance = u64::from(self.first_instance) + index as u64 * u64::from(self.instance_step);
        if instance > u64::from(ObjectId::MAX_DEVICE_INSTANCE) {
            return Err(ConfigError::InstanceOutOfRange(instance));
        }
        Ok(instance as u32)
    }

    fn device_type_at(&self, index: usize, instance: u32) -> Result<String, ConfigError> {
        let ty = match &self.device_types {
            DeviceTypeScheme::Cycle(cycle) => {
                if cycle.is_empty() {
                    return Err(ConfigError::EmptyDeviceTypes);
                }
                &cycle[instance as usize % cycle.len()]
            }
            DeviceTypeScheme::Fixed(ty) => ty,
            DeviceTypeScheme::List(list) => &list[index],
        };
        if !self.templates.contains(ty) {
            return Err(ConfigError::UnknownDeviceType(ty.clone()));
        }
        Ok(ty.clone())
    }

    fn bind_at(&self, index: usize) -> Result<SocketAddr, ConfigError> {
        match &self.addressing {
            Addressing::PerDevice {
                base_ip,
                ip_step,
                base_port,
                port_step,
                ..
            } => {
                let n = u32::try_from(index).map_err(|_| ConfigError::AddressOverflow(index))?;
                let ip = n
                    .checked_mul(*ip_step)
                    .and_then(|off| u32::from(*base_ip).checked_add(off))
                    .ok_or(ConfigError::AddressOverflow(index))?;
                let port = u16::try_from(n)
                    .ok()
                    .and_then(|n| n.checked_mul(*port_step))
                    .and_then(|off| base_port.checked_add(off))
                    .ok_or(ConfigError::AddressOverflow(index))?;
                Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::from(ip)), port))
            }
            Addressing::Shared { bind, .. } => {
                if !bind.is_ipv4() {
                    return Err(ConfigError::NotIpv4(*bind));
                }
                Ok(*bind)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Addressing, DeviceTypeScheme, FleetConfig};
    use crate::error::ConfigError;
    use std::net::{Ipv4Addr, SocketAddr};
    use std::time::Duration;

    #[test]
    fn default_plan_follows_prototype_numbering() {
        let plan = FleetConfig::default().plan().unwrap();
        assert_eq!(plan.len(), 10);
        assert_eq!(plan[0].instance, 1234);
        assert_eq!(plan[9].instance, 1243);
        // 1234 % 13 == 12
        assert_eq!(plan[0].device_type, "smart-actuator");
        assert_eq!(plan[1].device_type, "controller");
        assert_eq!(plan[0].bind, "127.0.0.1:47808".parse::<SocketAddr>().unwrap());
        assert_eq!(plan[3].bind.port(), 47811);
    }

    #[test]
    fn per_device_ip_stepping() {
        let cfg = FleetConfig {
            device_count: 3,
            addressing: Addressing::PerDevice {
                base_ip: Ipv4Addr::new(192, 168, 1, 10),
                ip_step: 1,
                base_port: 47808,
                port_step: 1,
                prefix_len: 24,
            },
            ..FleetConfig::default()
        };
        let plan = cfg.plan().unwrap();
        assert_eq!(plan[2].bind, "192.168.1.12:47810".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn rejects_bad_configurations() {
        let zero = FleetConfig {
            device_count: 0,
            ..FleetConfig::default()
        };
        assert_eq!(zero.validate(), Err(ConfigError::NoDevices));

        let out_of_range = FleetConfig {
            first_instance: 4_194_302,
            device_count: 2,
            ..FleetConfig::default()
        };
        assert_eq!(
            out_of_range.validate(),
            Err(ConfigError::InstanceOutOfRange(4_194_303))
        );

        let duplicate = FleetConfig {
            instance_step: 0,
            device_count: 2,
            ..FleetConfig::default()
        };
        assert_eq!(duplicate.validate(), Err(ConfigError::DuplicateInstance(1234)));

        let unknown = FleetConfig {
            device_types: DeviceTypeScheme::Fixed("espresso-machine".into()),
            ..FleetConfig::default()
        };
        assert_eq!(
            unknown.validate(),
            Err(ConfigError::UnknownDeviceType("espresso-machine".into()))
        );

        let same_port = FleetConfig {
            addressing: Addressing::PerDevice {
                base_ip: Ipv4Addr::LOCALHOST,
                ip_step: 0,
                base_port: 47808,
                port_step: 0,
                prefix_len: 8,
            },
            ..FleetConfig::default()
        };
        assert!(matches!(
            same_port.validate(),
            Err(ConfigError::DuplicateAddress(_))
        ));

        let short_list = FleetConfig {
            device_count: 2,
            device_types: DeviceTypeScheme::List(vec!["sensor".into()]),
            ..FleetConfig::default()
        };
        assert_eq!(
            short_list.validate(),
            Err(ConfigError::DeviceTypeListLength {
                expected: 2,
                got: 1
            })
        );
    }

    #[test]
    fn ephemeral_ports_may_repeat() {
        let cfg = FleetConfig {
            device_count: 4,
            addressing: Addressing::PerDevice {
                base_ip: Ipv4Addr::LOCALHOST,
                ip_step: 0,
                base_port: 0,
                port_step: 0,
                prefix_len: 8,
            },
            ..FleetConfig::default()
        };
        assert_eq!(cfg.plan().unwrap().len(), 4);
    }

    #[test]
    fn who_is_jitter_defaults_to_quarter_apdu_timeout() {
        let cfg = FleetConfig::default();
        assert_eq!(cfg.who_is_jitter(), Duration::from_millis(1500));
    }
}
