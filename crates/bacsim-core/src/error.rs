use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeError {
    BufferTooSmall,
    ValueOutOfRange,
    InvalidLength,
    Message(&'static str),
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferTooSmall => f.write_str("buffer too small"),
            Self::ValueOutOfRange => f.write_str("value out of range"),
            Self::InvalidLength => f.write_str("invalid length"),
            Self::Message(msg) => f.write_str(msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for EncodeError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    UnexpectedEof,
    InvalidTag,
    InvalidLength,
    InvalidValue,
    TrailingBytes,
    Unsupported,
    UnsupportedService(u8),
}

/// Coarse classification of a [`DecodeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    Malformed,
    UnsupportedService,
    TruncatedBuffer,
}

impl DecodeError {
    pub const fn kind(self) -> DecodeErrorKind {
        match self {
            Self::UnexpectedEof => DecodeErrorKind::TruncatedBuffer,
            Self::UnsupportedService(_) => DecodeErrorKind::UnsupportedService,
            Self::InvalidTag
            | Self::InvalidLength
            | Self::InvalidValue
            | Self::TrailingBytes
            | Self::Unsupported => DecodeErrorKind::Malformed,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => f.write_str("unexpected end of input"),
            Self::InvalidTag => f.write_str("invalid tag"),
            Self::InvalidLength => f.write_str("invalid length"),
            Self::InvalidValue => f.write_str("invalid value"),
            Self::TrailingBytes => f.write_str("trailing bytes after payload"),
            Self::Unsupported => f.write_str("unsupported encoding"),
            Self::UnsupportedService(choice) => write!(f, "unsupported service choice {choice}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}

#[cfg(test)]
mod tests {
    use super::{DecodeError, DecodeErrorKind};

    #[test]
    fn kinds_cover_truncation_and_services() {
        assert_eq!(
            DecodeError::UnexpectedEof.kind(),
            DecodeErrorKind::TruncatedBuffer
        );
        assert_eq!(
            DecodeError::UnsupportedService(0x1f).kind(),
            DecodeErrorKind::UnsupportedService
        );
        assert_eq!(DecodeError::InvalidTag.kind(), DecodeErrorKind::Malformed);
        assert_eq!(DecodeError::TrailingBytes.kind(), DecodeErrorKind::Malformed);
    }
}
