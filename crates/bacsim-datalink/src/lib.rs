pub mod address;
pub mod bip;
pub mod error;

pub use address::{subnet_broadcast, DataLinkAddress};
pub use bip::bvlc::BvlcFunction;
pub use bip::transport::{BacnetIpTransport, Received};
pub use error::DataLinkError;
