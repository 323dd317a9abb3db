//! TOML fleet files.
//!
//! Every key is optional; anything left out keeps the [`FleetConfig`]
//! default. Durations are given in milliseconds.
//!
//! ```toml
//! device_count = 10
//! first_instance = 1234
//!
//! [addressing]
//! mode = "per-device"
//! base_ip = "127.0.0.1"
//! base_port = 47808
//! port_step = 1
//!
//! [device_types]
//! fixed = "controller"
//! ```

use bacsim_fleet::config::DEFAULT_VIRTUAL_NETWORK;
use bacsim_fleet::{Addressing, DeviceTypeScheme, FleetConfig, TemplateTable};
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid fleet file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub device_count: Option<usize>,
    pub first_instance: Option<u32>,
    pub instance_step: Option<u32>,
    pub addressing: Option<AddressingSection>,
    pub broadcast: Option<SocketAddr>,
    pub broadcast_port: Option<u16>,
    pub device_types: Option<DeviceTypesSection>,
    pub objects_per_template: Option<u32>,
    /// Added to the built-in table; entries with the same tag replace it.
    pub templates: Option<TemplateTable>,
    pub device_name_prefix: Option<String>,
    pub vendor_name: Option<String>,
    pub vendor_id: Option<u16>,
    pub model_name: Option<String>,
    pub apdu_timeout_ms: Option<u64>,
    pub who_is_jitter_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub queue_depth: Option<usize>,
    pub discovery: Option<DiscoverySection>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum AddressingSection {
    PerDevice {
        base_ip: Option<Ipv4Addr>,
        ip_step: Option<u32>,
        base_port: Option<u16>,
        port_step: Option<u16>,
        prefix_len: Option<u8>,
    },
    Shared {
        bind: SocketAddr,
        prefix_len: Option<u8>,
        virtual_network: Option<u16>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceTypesSection {
    Cycle(Vec<String>),
    Fixed(String),
    List(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoverySection {
    pub announce: Option<bool>,
    pub startup_delay_ms: Option<u64>,
    pub max_jitter_ms: Option<u64>,
    pub interval_ms: Option<u64>,
    pub startup_who_is_ms: Option<u64>,
    /// Turns the startup Who-Is off.
    pub no_startup_who_is: bool,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, FileConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| FileConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, FileConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Overlays the keys present in the file onto `config`.
    pub fn apply(self, config: &mut FleetConfig) {
        set(&mut config.device_count, self.device_count);
        set(&mut config.first_instance, self.first_instance);
        set(&mut config.instance_step, self.instance_step);
        set(&mut config.objects_per_template, self.objects_per_template);
        set(&mut config.device_name_prefix, self.device_name_prefix);
        set(&mut config.vendor_name, self.vendor_name);
        set(&mut config.vendor_id, self.vendor_id);
        set(&mut config.model_name, self.model_name);
        set(&mut config.queue_depth, self.queue_depth);
        set(&mut config.apdu_timeout, self.apdu_timeout_ms.map(millis));
        set(&mut config.request_timeout, self.request_timeout_ms.map(millis));
        if let Some(ms) = self.who_is_jitter_ms {
            config.who_is_jitter = Some(millis(ms));
        }
        if self.broadcast.is_some() {
            config.broadcast = self.broadcast;
        }
        if self.broadcast_port.is_some() {
            config.broadcast_port = self.broadcast_port;
        }

        if let Some(section) = self.addressing {
            config.addressing = section.into_addressing(&config.addressing);
        }
        if let Some(section) = self.device_types {
            config.device_types = match section {
                DeviceTypesSection::Cycle(types) => DeviceTypeScheme::Cycle(types),
                DeviceTypesSection::Fixed(device_type) => DeviceTypeScheme::Fixed(device_type),
                DeviceTypesSection::List(types) => DeviceTypeScheme::List(types),
            };
        }
        if let Some(templates) = self.templates {
            for device_type in templates.device_types() {
                if let Some(objects) = templates.get(device_type) {
                    config.templates.insert(device_type, objects.to_vec());
                }
            }
        }
        if let Some(discovery) = self.discovery {
            let target = &mut config.discovery;
            set(&mut target.announce, discovery.announce);
            set(&mut target.startup_delay, discovery.startup_delay_ms.map(millis));
            set(&mut target.max_jitter, discovery.max_jitter_ms.map(millis));
            if let Some(ms) = discovery.interval_ms {
                target.interval = Some(millis(ms));
            }
            if let Some(ms) = discovery.startup_who_is_ms {
                target.startup_who_is = Some(millis(ms));
            }
            if discovery.no_startup_who_is {
                target.startup_who_is = None;
            }
        }
    }
}

impl AddressingSection {
    fn into_addressing(self, current: &Addressing) -> Addressing {
        match self {
            Self::PerDevice {
                base_ip,
                ip_step,
                base_port,
                port_step,
                prefix_len,
            } => {
                let (ip, step, port, pstep, prefix) = match *current {
                    Addressing::PerDevice {
                        base_ip,
                        ip_step,
                        base_port,
                        port_step,
                        prefix_len,
                    } => (base_ip, ip_step, base_port, port_step, prefix_len),
                    Addressing::Shared { prefix_len, .. } => {
                        (Ipv4Addr::LOCALHOST, 0, 47808, 1, prefix_len)
                    }
                };
                Addressing::PerDevice {
                    base_ip: base_ip.unwrap_or(ip),
                    ip_step: ip_step.unwrap_or(step),
                    base_port: base_port.unwrap_or(port),
                    port_step: port_step.unwrap_or(pstep),
                    prefix_len: prefix_len.unwrap_or(prefix),
                }
            }
            Self::Shared {
                bind,
                prefix_len,
                virtual_network,
            } => Addressing::Shared {
                bind,
                prefix_len: prefix_len.unwrap_or(current.prefix_len()),
                virtual_network: virtual_network.unwrap_or(DEFAULT_VIRTUAL_NETWORK),
            },
        }
    }
}

fn set<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bacsim_core::types::ObjectType;
    use bacsim_fleet::InitialValue;

    #[test]
    fn empty_file_keeps_defaults() {
        let mut config = FleetConfig::default();
        FileConfig::parse("").unwrap().apply(&mut config);
        assert_eq!(config, FleetConfig::default());
    }

    #[test]
    fn keys_overlay_defaults() {
        let text = r#"
            device_count = 4
            first_instance = 5000
            apdu_timeout_ms = 3000
            who_is_jitter_ms = 100

            [addressing]
            mode = "shared"
            bind = "127.0.0.1:47900"

            [device_types]
            list = ["meter", "sensor", "meter", "stimulator"]

            [discovery]
            announce = false
            interval_ms = 60000
            no_startup_who_is = true
        "#;
        let mut config = FleetConfig::default();
        FileConfig::parse(text).unwrap().apply(&mut config);

        assert_eq!(config.device_count, 4);
        assert_eq!(config.first_instance, 5000);
        assert_eq!(config.apdu_timeout, Duration::from_secs(3));
        assert_eq!(config.who_is_jitter(), Duration::from_millis(100));
        assert_eq!(
            config.addressing,
            Addressing::Shared {
                bind: "127.0.0.1:47900".parse().unwrap(),
                prefix_len: 8,
                virtual_network: DEFAULT_VIRTUAL_NETWORK,
            }
        );
        assert!(!config.discovery.announce);
        assert_eq!(config.discovery.interval, Some(Duration::from_secs(60)));
        assert_eq!(config.discovery.startup_who_is, None);

        let plans = config.plan().unwrap();
        let types: Vec<_> = plans.iter().map(|p| p.device_type.as_str()).collect();
        assert_eq!(types, ["meter", "sensor", "meter", "stimulator"]);
    }

    #[test]
    fn templates_extend_the_builtin_table() {
        let text = r#"
            [device_types]
            fixed = "chiller"

            [[templates.chiller]]
            object_type = "analog-input"
            name = "SupplyTemp"
            units = 62
            initial = { kind = "analog", base = 6.5, step = 0.5 }

            [[templates.chiller]]
            object_type = "multiStateValue"
            name = "Mode"
            initial = { kind = "multi-state", value = 2, states = 4 }
        "#;
        let mut config = FleetConfig::default();
        FileConfig::parse(text).unwrap().apply(&mut config);

        let chiller = config.templates.get("chiller").unwrap();
        assert_eq!(chiller.len(), 2);
        assert_eq!(chiller[0].object_type, ObjectType::AnalogInput);
        assert_eq!(chiller[0].units, Some(62));
        assert_eq!(
            chiller[1].initial,
            InitialValue::MultiState {
                value: 2,
                states: 4
            }
        );
        assert!(config.templates.contains("controller"));
        assert!(config.plan().is_ok());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FileConfig::parse("device_cuont = 3").is_err());
    }

    #[test]
    fn demo_files_plan() {
        let mut prototype = FleetConfig::default();
        FileConfig::parse(include_str!("../../../demos/prototype.toml"))
            .unwrap()
            .apply(&mut prototype);
        let plans = prototype.plan().unwrap();
        assert_eq!(plans.len(), 10);
        assert_eq!(plans[0].instance, 1234);
        assert_eq!(plans[9].bind, "127.0.0.1:47817".parse().unwrap());
        assert_eq!(prototype.broadcast_port, Some(47808));

        let mut subnet = FleetConfig::default();
        FileConfig::parse(include_str!("../../../demos/subnet.toml"))
            .unwrap()
            .apply(&mut subnet);
        let plans = subnet.plan().unwrap();
        assert_eq!(plans[0].bind, "192.168.1.10:47808".parse().unwrap());
        assert_eq!(plans[2].bind, "192.168.1.12:47808".parse().unwrap());
    }
}
