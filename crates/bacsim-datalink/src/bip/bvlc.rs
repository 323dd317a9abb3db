use bacsim_core::encoding::{reader::Reader, writer::Writer};
use bacsim_core::{DecodeError, EncodeError};
use std::net::{Ipv4Addr, SocketAddrV4};

pub const BVLC_TYPE_BIP: u8 = 0x81;
pub const BVLC_HEADER_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BvlcFunction {
    Result,
    WriteBroadcastDistributionTable,
    ReadBroadcastDistributionTable,
    ReadBroadcastDistributionTableAck,
    ForwardedNpdu,
    RegisterForeignDevice,
    ReadForeignDeviceTable,
    ReadForeignDeviceTableAck,
    DeleteForeignDeviceTableEntry,
    DistributeBroadcastToNetwork,
    OriginalUnicastNpdu,
    OriginalBroadcastNpdu,
    Unknown(u8),
}

impl BvlcFunction {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0x00 => Self::Result,
            0x01 => Self::WriteBroadcastDistributionTable,
            0x02 => Self::ReadBroadcastDistributionTable,
            0x03 => Self::ReadBroadcastDistributionTableAck,
            0x04 => Self::ForwardedNpdu,
            0x05 => Self::RegisterForeignDevice,
            0x06 => Self::ReadForeignDeviceTable,
            0x07 => Self::ReadForeignDeviceTableAck,
            0x08 => Self::DeleteForeignDeviceTableEntry,
            0x09 => Self::DistributeBroadcastToNetwork,
            0x0A => Self::OriginalUnicastNpdu,
            0x0B => Self::OriginalBroadcastNpdu,
            v => Self::Unknown(v),
        }
    }

    pub const fn to_u8(self) -> u8 {
        match self {
            Self::Result => 0x00,
            Self::WriteBroadcastDistributionTable => 0x01,
            Self::ReadBroadcastDistributionTable => 0x02,
            Self::ReadBroadcastDistributionTableAck => 0x03,
            Self::ForwardedNpdu => 0x04,
            Self::RegisterForeignDevice => 0x05,
            Self::ReadForeignDeviceTable => 0x06,
            Self::ReadForeignDeviceTableAck => 0x07,
            Self::DeleteForeignDeviceTableEntry => 0x08,
            Self::DistributeBroadcastToNetwork => 0x09,
            Self::OriginalUnicastNpdu => 0x0A,
            Self::OriginalBroadcastNpdu => 0x0B,
            Self::Unknown(v) => v,
        }
    }

    /// Whether frames with this function carry an NPDU for the application.
    pub const fn carries_npdu(self) -> bool {
        matches!(
            self,
            Self::OriginalUnicastNpdu
                | Self::OriginalBroadcastNpdu
                | Self::DistributeBroadcastToNetwork
                | Self::ForwardedNpdu
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BvlcHeader {
    pub function: BvlcFunction,
    pub length: u16,
}

impl BvlcHeader {
    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        w.write_u8(BVLC_TYPE_BIP)?;
        w.write_u8(self.function.to_u8())?;
        w.write_be_u16(self.length)
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        if r.read_u8()? != BVLC_TYPE_BIP {
            return Err(DecodeError::InvalidValue);
        }
        let function = BvlcFunction::from_u8(r.read_u8()?);
        let length = r.read_be_u16()?;
        if (length as usize) < BVLC_HEADER_LEN {
            return Err(DecodeError::InvalidLength);
        }
        Ok(Self { function, length })
    }
}

/// One BVLC frame split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BvlcFrame<'a> {
    pub function: BvlcFunction,
    /// Original sender of a Forwarded-NPDU.
    pub forwarded_from: Option<SocketAddrV4>,
    pub payload: &'a [u8],
}

impl<'a> BvlcFrame<'a> {
    /// Splits a datagram. The BVLC length must match the datagram length.
    pub fn decode(datagram: &'a [u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(datagram);
        let hdr = BvlcHeader::decode(&mut r)?;
        if hdr.length as usize != datagram.len() {
            return Err(DecodeError::InvalidLength);
        }
        let forwarded_from = if hdr.function == BvlcFunction::ForwardedNpdu {
            let ip = r.read_exact(4)?;
            let port = r.read_be_u16()?;
            Some(SocketAddrV4::new(
                Ipv4Addr::new(ip[0], ip[1], ip[2], ip[3]),
                port,
            ))
        } else {
            None
        };
        Ok(Self {
            function: hdr.function,
            forwarded_from,
            payload: r.read_rest(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{BvlcFrame, BvlcFunction, BvlcHeader, BVLC_TYPE_BIP};
    use bacsim_core::encoding::{reader::Reader, writer::Writer};
    use bacsim_core::DecodeError;
    use proptest::prelude::*;
    use std::net::{Ipv4Addr, SocketAddrV4};

    proptest! {
        #[test]
        fn arbitrary_datagrams_never_panic(bytes in proptest::collection::vec(any::<u8>(), 0..32)) {
            if let Ok(frame) = BvlcFrame::decode(&bytes) {
                prop_assert!(frame.payload.len() + 4 <= bytes.len());
            }
        }
    }

    #[test]
    fn bvlc_roundtrip() {
        let h = BvlcHeader {
            function: BvlcFunction::OriginalBroadcastNpdu,
            length: 12,
        };
        let mut buf = [0u8; 8];
        let mut w = Writer::new(&mut buf);
        h.encode(&mut w).unwrap();
        let mut r = Reader::new(w.as_written());
        let decoded = BvlcHeader::decode(&mut r).unwrap();
        assert_eq!(decoded, h);
    }

    #[test]
    fn unknown_function_decodes() {
        let mut r = Reader::new(&[BVLC_TYPE_BIP, 0x99, 0, 4]);
        let decoded = BvlcHeader::decode(&mut r).unwrap();
        assert_eq!(decoded.function, BvlcFunction::Unknown(0x99));
        assert!(!decoded.function.carries_npdu());
    }

    #[test]
    fn forwarded_frame_exposes_origin() {
        let frame = [
            BVLC_TYPE_BIP, 0x04, 0x00, 0x0D, 10, 1, 2, 3, 0xBA, 0xC0, 0x01, 0x00, 0x10,
        ];
        let f = BvlcFrame::decode(&frame).unwrap();
        assert_eq!(f.function, BvlcFunction::ForwardedNpdu);
        assert_eq!(
            f.forwarded_from,
            Some(SocketAddrV4::new(Ipv4Addr::new(10, 1, 2, 3), 47808))
        );
        assert_eq!(f.payload, &[0x01, 0x00, 0x10]);
    }

    #[test]
    fn length_must_match_datagram() {
        let frame = [BVLC_TYPE_BIP, 0x0A, 0x00, 0x08, 0x01, 0x00];
        assert_eq!(
            BvlcFrame::decode(&frame).unwrap_err(),
            DecodeError::InvalidLength
        );
        assert_eq!(
            BvlcFrame::decode(&[0x82, 0x0A, 0x00, 0x04]).unwrap_err(),
            DecodeError::InvalidValue
        );
    }
}
