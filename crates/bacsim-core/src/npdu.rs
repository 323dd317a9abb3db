use crate::encoding::{reader::Reader, writer::Writer};
use crate::{DecodeError, EncodeError};

/// BACnet network layer protocol version (always `0x01`).
pub const NPDU_VERSION: u8 = 0x01;

pub const CONTROL_NETWORK_MESSAGE: u8 = 0x80;
pub const CONTROL_DESTINATION_PRESENT: u8 = 0x20;
pub const CONTROL_SOURCE_PRESENT: u8 = 0x08;
pub const CONTROL_EXPECTING_REPLY: u8 = 0x04;

/// DNET value addressing every network.
pub const GLOBAL_NETWORK: u16 = 0xFFFF;

/// A network-layer address consisting of a network number and a MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NpduAddress {
    /// The DNET/SNET network number.
    pub network: u16,
    /// MAC address bytes (up to 6).
    pub mac: [u8; 6],
    /// Number of valid bytes in `mac`; zero means broadcast on `network`.
    pub mac_len: u8,
}

impl NpduAddress {
    /// Broadcast to every device on every network.
    pub const fn global_broadcast() -> Self {
        Self {
            network: GLOBAL_NETWORK,
            mac: [0; 6],
            mac_len: 0,
        }
    }

    /// Virtual address of a device behind a shared endpoint: the device
    /// instance as a 3-octet big-endian MAC on `network`.
    pub const fn virtual_device(network: u16, instance: u32) -> Self {
        let b = instance.to_be_bytes();
        Self {
            network,
            mac: [b[1], b[2], b[3], 0, 0, 0],
            mac_len: 3,
        }
    }

    pub fn mac(&self) -> &[u8] {
        &self.mac[..(self.mac_len as usize).min(self.mac.len())]
    }

    pub const fn is_broadcast(&self) -> bool {
        self.mac_len == 0
    }

    /// Device instance carried by a 3-octet virtual MAC.
    pub fn virtual_instance(&self) -> Option<u32> {
        match self.mac() {
            [a, b, c] => Some(u32::from_be_bytes([0, *a, *b, *c])),
            _ => None,
        }
    }
}

/// BACnet Network Protocol Data Unit (NPDU) header.
///
/// The destination/source presence bits of `control` are derived from the
/// address fields on encode, so callers only set priority and
/// expecting-reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Npdu {
    pub control: u8,
    pub destination: Option<NpduAddress>,
    pub source: Option<NpduAddress>,
    pub hop_count: Option<u8>,
    pub message_type: Option<u8>,
    pub vendor_id: Option<u16>,
}

impl Npdu {
    pub const fn new(control: u8) -> Self {
        Self {
            control,
            destination: None,
            source: None,
            hop_count: None,
            message_type: None,
            vendor_id: None,
        }
    }

    /// Header for an application-layer message.
    pub const fn for_apdu(expecting_reply: bool) -> Self {
        Self::new(if expecting_reply {
            CONTROL_EXPECTING_REPLY
        } else {
            0
        })
    }

    pub const fn is_network_message(&self) -> bool {
        (self.control & CONTROL_NETWORK_MESSAGE) != 0
    }

    pub const fn expecting_reply(&self) -> bool {
        (self.control & CONTROL_EXPECTING_REPLY) != 0
    }

    pub fn encode(&self, w: &mut Writer<'_>) -> Result<(), EncodeError> {
        let mut control = self.control & !(CONTROL_DESTINATION_PRESENT | CONTROL_SOURCE_PRESENT);
        if self.destination.is_some() {
            control |= CONTROL_DESTINATION_PRESENT;
        }
        if self.source.is_some() {
            control |= CONTROL_SOURCE_PRESENT;
        }
        w.write_u8(NPDU_VERSION)?;
        w.write_u8(control)?;

        if let Some(dest) = self.destination {
            encode_addr(w, dest)?;
        }
        if let Some(src) = self.source {
            if src.mac_len == 0 {
                return Err(EncodeError::InvalidLength);
            }
            encode_addr(w, src)?;
        }
        if self.destination.is_some() {
            w.write_u8(self.hop_count.unwrap_or(255))?;
        }
        if (control & CONTROL_NETWORK_MESSAGE) != 0 {
            w.write_u8(self.message_type.unwrap_or(0))?;
            if matches!(self.message_type, Some(0x80..=0xFF)) {
                w.write_be_u16(self.vendor_id.unwrap_or(0))?;
            }
        }
        Ok(())
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let version = r.read_u8()?;
        if version != NPDU_VERSION {
            return Err(DecodeError::InvalidValue);
        }

        let control = r.read_u8()?;
        let has_dest = (control & CONTROL_DESTINATION_PRESENT) != 0;
        let has_src = (control & CONTROL_SOURCE_PRESENT) != 0;
        let is_network_msg = (control & CONTROL_NETWORK_MESSAGE) != 0;

        let destination = if has_dest {
            Some(decode_addr(r)?)
        } else {
            None
        };
        let source = if has_src {
            let src = decode_addr(r)?;
            if src.mac_len == 0 {
                return Err(DecodeError::InvalidLength);
            }
            Some(src)
        } else {
            None
        };
        let hop_count = if has_dest { Some(r.read_u8()?) } else { None };

        let (message_type, vendor_id) = if is_network_msg {
            let mt = r.read_u8()?;
            let vid = if mt >= 0x80 {
                Some(r.read_be_u16()?)
            } else {
                None
            };
            (Some(mt), vid)
        } else {
            (None, None)
        };

        Ok(Self {
            control,
            destination,
            source,
            hop_count,
            message_type,
            vendor_id,
        })
    }
}

fn encode_addr(w: &mut Writer<'_>, addr: NpduAddress) -> Result<(), EncodeError> {
    if addr.mac_len as usize > addr.mac.len() {
        return Err(EncodeError::InvalidLength);
    }
    w.write_be_u16(addr.network)?;
    w.write_u8(addr.mac_len)?;
    w.write_all(&addr.mac[..addr.mac_len as usize])
}

fn decode_addr(r: &mut Reader<'_>) -> Result<NpduAddress, DecodeError> {
    let network = r.read_be_u16()?;
    let mac_len = r.read_u8()?;
    if mac_len as usize > 6 {
        return Err(DecodeError::InvalidLength);
    }
    let mut mac = [0u8; 6];
    let src = r.read_exact(mac_len as usize)?;
    mac[..mac_len as usize].copy_from_slice(src);
    Ok(NpduAddress {
        network,
        mac,
        mac_len,
    })
}

#[cfg(test)]
mod tests {
    use super::{Npdu, NpduAddress, CONTROL_DESTINATION_PRESENT, CONTROL_SOURCE_PRESENT};
    use crate::encoding::{reader::Reader, writer::Writer};

    #[test]
    fn npdu_roundtrip_with_virtual_destination() {
        let mut p = Npdu::for_apdu(true);
        p.destination = Some(NpduAddress::virtual_device(5, 100_001));
        p.hop_count = Some(255);

        let mut buf = [0u8; 32];
        let mut w = Writer::new(&mut buf);
        p.encode(&mut w).unwrap();
        assert_eq!(
            w.as_written(),
            &[0x01, 0x24, 0x00, 0x05, 0x03, 0x01, 0x86, 0xA1, 0xFF]
        );

        let mut r = Reader::new(w.as_written());
        let dec = Npdu::decode(&mut r).unwrap();
        assert!(dec.expecting_reply());
        let dest = dec.destination.unwrap();
        assert_eq!(dest.network, 5);
        assert_eq!(dest.virtual_instance(), Some(100_001));
        assert!(r.is_empty());
    }

    #[test]
    fn presence_bits_follow_address_fields() {
        let mut p = Npdu::new(CONTROL_DESTINATION_PRESENT);
        p.source = Some(NpduAddress::virtual_device(9, 7));
        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        p.encode(&mut w).unwrap();
        assert_eq!(w.as_written()[1], CONTROL_SOURCE_PRESENT);
    }

    #[test]
    fn empty_source_mac_is_rejected() {
        let mut r = Reader::new(&[0x01, 0x08, 0x00, 0x01, 0x00]);
        assert!(Npdu::decode(&mut r).is_err());
    }

    #[test]
    fn network_message_vendor_id_only_for_vendor_types() {
        let mut p = Npdu::new(0x80);
        p.message_type = Some(0x80);
        p.vendor_id = Some(260);

        let mut buf = [0u8; 16];
        let mut w = Writer::new(&mut buf);
        p.encode(&mut w).unwrap();

        let mut r = Reader::new(w.as_written());
        let dec = Npdu::decode(&mut r).unwrap();
        assert!(dec.is_network_message());
        assert_eq!(dec.message_type, Some(0x80));
        assert_eq!(dec.vendor_id, Some(260));
    }

    #[test]
    fn global_broadcast_has_no_mac() {
        let a = NpduAddress::global_broadcast();
        assert!(a.is_broadcast());
        assert_eq!(a.virtual_instance(), None);
    }
}
