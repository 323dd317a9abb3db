#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ApduType {
    ConfirmedRequest = 0,
    UnconfirmedRequest = 1,
    SimpleAck = 2,
    ComplexAck = 3,
    SegmentAck = 4,
    Error = 5,
    Reject = 6,
    Abort = 7,
}

impl ApduType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::ConfirmedRequest),
            1 => Some(Self::UnconfirmedRequest),
            2 => Some(Self::SimpleAck),
            3 => Some(Self::ComplexAck),
            4 => Some(Self::SegmentAck),
            5 => Some(Self::Error),
            6 => Some(Self::Reject),
            7 => Some(Self::Abort),
            _ => None,
        }
    }

    /// Reads the PDU type from the high nibble of the first APDU octet.
    pub fn of_first_octet(b0: u8) -> Option<Self> {
        Self::from_u8(b0 >> 4)
    }

    /// Whether this PDU answers a confirmed request.
    pub const fn is_response(self) -> bool {
        matches!(
            self,
            Self::SimpleAck | Self::ComplexAck | Self::Error | Self::Reject | Self::Abort
        )
    }
}

#[cfg(test)]
mod tests {
    use super::ApduType;

    #[test]
    fn high_nibble_selects_type() {
        assert_eq!(ApduType::of_first_octet(0x10), Some(ApduType::UnconfirmedRequest));
        assert_eq!(ApduType::of_first_octet(0x71), Some(ApduType::Abort));
        assert_eq!(ApduType::of_first_octet(0x80), None);
        assert!(ApduType::Reject.is_response());
        assert!(!ApduType::ConfirmedRequest.is_response());
    }
}
