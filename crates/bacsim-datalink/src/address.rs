use crate::DataLinkError;
use core::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataLinkAddress {
    Ip(SocketAddr),
}

impl DataLinkAddress {
    pub const BACNET_IP_DEFAULT_PORT: u16 = 47808;

    pub fn local_broadcast(port: u16) -> Self {
        Self::Ip(SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), port))
    }

    pub fn bacnet_default(addr: IpAddr) -> Self {
        Self::Ip(SocketAddr::new(addr, Self::BACNET_IP_DEFAULT_PORT))
    }

    pub fn as_socket_addr(self) -> SocketAddr {
        match self {
            Self::Ip(addr) => addr,
        }
    }
}

impl From<SocketAddr> for DataLinkAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::Ip(addr)
    }
}

impl fmt::Display for DataLinkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip(addr) => write!(f, "{addr}"),
        }
    }
}

/// Directed broadcast address of the subnet `ip/prefix_len`.
///
/// An unspecified `ip` has no subnet, so the limited broadcast address is
/// returned instead.
pub fn subnet_broadcast(ip: Ipv4Addr, prefix_len: u8) -> Result<Ipv4Addr, DataLinkError> {
    if prefix_len > 32 {
        return Err(DataLinkError::InvalidPrefix(prefix_len));
    }
    if ip.is_unspecified() {
        return Ok(Ipv4Addr::BROADCAST);
    }
    let mask = u32::MAX.checked_shl(32 - u32::from(prefix_len)).unwrap_or(0);
    Ok(Ipv4Addr::from(u32::from(ip) | !mask))
}
