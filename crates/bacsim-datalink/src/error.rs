use std::net::SocketAddr;
use thiserror::Error;

/// Errors that can occur at the data-link layer.
#[derive(Debug, Error)]
pub enum DataLinkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("frame too large")]
    FrameTooLarge,
    #[error("invalid frame")]
    InvalidFrame,
    #[error("unsupported BVLC function 0x{0:02x}")]
    UnsupportedBvlcFunction(u8),
    #[error("subnet prefix /{0} is longer than 32 bits")]
    InvalidPrefix(u8),
}

impl DataLinkError {
    /// Whether the error concerns one datagram only and the socket can keep
    /// receiving.
    pub fn is_per_frame(&self) -> bool {
        matches!(
            self,
            Self::FrameTooLarge | Self::InvalidFrame | Self::UnsupportedBvlcFunction(_)
        )
    }
}
