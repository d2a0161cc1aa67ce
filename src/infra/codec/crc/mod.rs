//! Transfer CRC used by multi-frame transfers: CRC-16-CCITT (polynomial
//! 0x1021, initial value 0xFFFF, no reflection, no final XOR), seeded with the
//! 64-bit data type signature so that a receiver decoding the payload with a
//! different type definition rejects it.

/// Running CRC over a transfer payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCrc(u16);

impl Default for TransferCrc {
    fn default() -> Self {
        Self(Self::INIT_VALUE)
    }
}

impl TransferCrc {
    /// Number of payload bytes the CRC occupies in the first frame.
    pub const LENGTH: usize = 2;
    const INIT_VALUE: u16 = 0xFFFF;
    const POLYNOMIAL: u16 = 0x1021;

    /// Start a CRC already seeded with a data type signature.
    pub fn with_signature(signature: u64) -> Self {
        let mut crc = Self::default();
        crc.add_bytes(&signature.to_le_bytes());
        crc
    }

    /// Feed one byte.
    pub fn add(&mut self, byte: u8) {
        self.0 ^= u16::from(byte) << 8;
        for _bit in 0..8 {
            if (self.0 & 0x8000) != 0 {
                self.0 = (self.0 << 1) ^ Self::POLYNOMIAL;
            } else {
                self.0 <<= 1;
            }
        }
    }

    /// Feed a byte slice.
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        bytes.iter().for_each(|&byte| self.add(byte));
    }

    /// Current CRC value.
    pub fn get(&self) -> u16 {
        self.0
    }
}

impl From<u16> for TransferCrc {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
