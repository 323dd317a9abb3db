/// A BACnet bit string borrowed from the wire.
///
/// `unused_bits` counts the padding bits in the final octet of `data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitString<'a> {
    pub unused_bits: u8,
    pub data: &'a [u8],
}

impl<'a> BitString<'a> {
    pub const fn new(unused_bits: u8, data: &'a [u8]) -> Self {
        Self { unused_bits, data }
    }

    /// Number of meaningful bits.
    pub fn bit_len(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.unused_bits as usize)
    }

    /// Bit `index` counted from the most significant bit of the first octet.
    pub fn bit(&self, index: usize) -> Option<bool> {
        if index >= self.bit_len() {
            return None;
        }
        let octet = self.data[index / 8];
        Some(octet & (0x80 >> (index % 8)) != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::BitString;

    #[test]
    fn status_flags_layout() {
        // in-alarm, fault, overridden, out-of-service
        let flags = BitString::new(4, &[0b0001_0000]);
        assert_eq!(flags.bit_len(), 4);
        assert_eq!(flags.bit(3), Some(true));
        assert_eq!(flags.bit(0), Some(false));
        assert_eq!(flags.bit(4), None);
    }
}
