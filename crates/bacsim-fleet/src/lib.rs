//! A fleet of simulated BACnet/IP devices.
//!
//! [`Fleet::start`] turns a [`FleetConfig`] into running devices: each one
//! answers Who-Is, ReadProperty and WriteProperty, announces itself with
//! I-Am, and can act as a client toward other devices.
//!
//! # Feature flags
//!
//! - **`serde`** — `Serialize` for snapshots and values, and
//!   `Serialize`/`Deserialize` for template tables.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fleet;
pub mod multiplexer;
pub mod peers;
pub mod pending;
pub mod registry;
pub mod scheduler;
pub mod snapshot;
pub mod template;
pub mod value;

pub use config::{Addressing, DeviceTypeScheme, DiscoveryConfig, FleetConfig};
pub use error::{BindFailure, ConfigError, FleetError, RegistryError};
pub use fleet::Fleet;
pub use multiplexer::{Destination, Inbound, Multiplexer};
pub use peers::PeerInfo;
pub use registry::{DeviceRegistry, SimulatedDevice};
pub use snapshot::{DeviceSummary, ObjectSummary};
pub use template::{InitialValue, ObjectTemplate, TemplateTable};
pub use value::PropertyValue;
