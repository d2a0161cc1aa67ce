//! Low-level components dedicated to bit manipulation for UAVCAN payloads.
//!
//! DSDL fields are packed back to back with no alignment. A scalar is laid out
//! the way the reference C implementation does it: the value is taken as
//! little-endian bytes, a trailing partial byte is left-aligned, and the
//! resulting bit string is copied most-significant-bit first into the target
//! buffer at an arbitrary bit offset. Bits outside the target range are never
//! modified.
use crate::error::{BitReaderError, BitWriterError};

/// Widest scalar supported by the codec.
pub const MAX_SCALAR_BITS: u8 = 64;

//==================================================================================SCALAR_CODEC
/// Write the low `bit_length` bits of `value` into `buffer` at `bit_offset`.
///
/// `bit_length` must stay in the [1, 64] range and the target range must fit
/// in the buffer; both are validated before anything is written.
pub fn encode_scalar(
    buffer: &mut [u8],
    bit_offset: usize,
    bit_length: u8,
    value: u64,
) -> Result<(), BitWriterError> {
    if !(1..=MAX_SCALAR_BITS).contains(&bit_length) {
        return Err(BitWriterError::InvalidBitLength { asked: bit_length });
    }
    let available = (buffer.len() * 8).saturating_sub(bit_offset);
    if bit_length as usize > available {
        return Err(BitWriterError::OutOfBounds {
            asked: bit_length as usize,
            available,
        });
    }

    let mut storage = value.to_le_bytes();
    let tail_bits = bit_length % 8;
    if tail_bits != 0 {
        // Left-align the incomplete last byte so that its significant bits
        // are the first ones copied.
        storage[(bit_length / 8) as usize] <<= 8 - tail_bits;
    }

    copy_bits(&storage, 0, bit_length as usize, buffer, bit_offset);
    Ok(())
}

/// Read `bit_length` bits from `buffer` at `bit_offset`.
///
/// When `signed` is set the value is sign-extended from bit `bit_length - 1`
/// and must be reinterpreted by the caller with `as i64`.
pub fn decode_scalar(
    buffer: &[u8],
    bit_offset: usize,
    bit_length: u8,
    signed: bool,
) -> Result<u64, BitReaderError> {
    if !(1..=MAX_SCALAR_BITS).contains(&bit_length) {
        return Err(BitReaderError::InvalidBitLength { asked: bit_length });
    }
    let available = (buffer.len() * 8).saturating_sub(bit_offset);
    if bit_length as usize > available {
        return Err(BitReaderError::OutOfBounds {
            asked: bit_length as usize,
            available,
        });
    }

    let mut storage = [0u8; 8];
    copy_bits(buffer, bit_offset, bit_length as usize, &mut storage, 0);

    let tail_bits = bit_length % 8;
    if tail_bits != 0 {
        storage[(bit_length / 8) as usize] >>= 8 - tail_bits;
    }

    let mut value = u64::from_le_bytes(storage);
    if signed && bit_length < MAX_SCALAR_BITS && (value >> (bit_length - 1)) & 1 == 1 {
        value |= u64::MAX << bit_length;
    }
    Ok(value)
}

/// Copy `length` bits, MSB first, from `src` at `src_offset` to `dst` at
/// `dst_offset`. Callers guarantee both ranges are in bounds.
fn copy_bits(src: &[u8], src_offset: usize, length: usize, dst: &mut [u8], dst_offset: usize) {
    let mut copied = 0;

    while copied < length {
        let dst_bit = dst_offset + copied;
        let dst_index = dst_bit / 8;
        let dst_used = dst_bit % 8;

        // Number of bits that still fit in the current destination byte.
        let chunk = (8 - dst_used).min(length - copied);
        let bits = read_msb_chunk(src, src_offset + copied, chunk);

        let shift = 8 - dst_used - chunk;
        let mask = (((1u16 << chunk) - 1) as u8) << shift;
        dst[dst_index] = (dst[dst_index] & !mask) | ((bits << shift) & mask);

        copied += chunk;
    }
}

/// Extract `count` (1..=8) bits starting at `bit_offset`, right-aligned.
fn read_msb_chunk(src: &[u8], bit_offset: usize, count: usize) -> u8 {
    let index = bit_offset / 8;
    let shift = bit_offset % 8;

    // The second byte is only significant when the chunk straddles a
    // boundary, in which case the caller's bounds check guarantees it exists.
    let next = src.get(index + 1).copied().unwrap_or(0);
    let window = (u32::from(src[index]) << 8) | u32::from(next);

    (((window << shift) >> (16 - count)) & ((1u32 << count) - 1)) as u8
}

//==================================================================================BITREADER
/// Cursor-based reader extracting consecutive DSDL fields from a `&[u8]`
/// without extra allocation or copies.
pub struct BitReader<'a> {
    /// Shared source buffer (typically a reassembled transfer payload).
    buffer: &'a [u8],
    /// Current index expressed as number of bits read from the beginning.
    bit_cursor: usize,
}

impl<'a> BitReader<'a> {
    /// Create a reader positioned at the start of the provided buffer.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            bit_cursor: 0,
        }
    }

    /// Cursor position in bits.
    pub fn bit_cursor(&self) -> usize {
        self.bit_cursor
    }

    /// Number of bits left after the cursor.
    pub fn remaining_bits(&self) -> usize {
        (self.buffer.len() * 8).saturating_sub(self.bit_cursor)
    }

    /// Read an unsigned field of `num_bits` bits.
    pub fn read_u64(&mut self, num_bits: u8) -> Result<u64, BitReaderError> {
        let value = decode_scalar(self.buffer, self.bit_cursor, num_bits, false)?;
        self.bit_cursor += num_bits as usize;
        Ok(value)
    }

    /// Read a two's complement field of `num_bits` bits.
    pub fn read_i64(&mut self, num_bits: u8) -> Result<i64, BitReaderError> {
        let value = decode_scalar(self.buffer, self.bit_cursor, num_bits, true)?;
        self.bit_cursor += num_bits as usize;
        Ok(value as i64)
    }

    /// Read up to 8 bits.
    pub fn read_u8(&mut self, num_bits: u8) -> Result<u8, BitReaderError> {
        if num_bits > 8 {
            return Err(BitReaderError::InvalidBitLength { asked: num_bits });
        }
        self.read_u64(num_bits).map(|val| val as u8)
    }

    /// Read up to 16 bits.
    pub fn read_u16(&mut self, num_bits: u8) -> Result<u16, BitReaderError> {
        if num_bits > 16 {
            return Err(BitReaderError::InvalidBitLength { asked: num_bits });
        }
        self.read_u64(num_bits).map(|val| val as u16)
    }

    /// Read up to 32 bits.
    pub fn read_u32(&mut self, num_bits: u8) -> Result<u32, BitReaderError> {
        if num_bits > 32 {
            return Err(BitReaderError::InvalidBitLength { asked: num_bits });
        }
        self.read_u64(num_bits).map(|val| val as u32)
    }

    /// Read a single-bit boolean.
    pub fn read_bool(&mut self) -> Result<bool, BitReaderError> {
        self.read_u64(1).map(|bit| bit == 1)
    }

    /// Fill `out` with consecutive bytes, whatever the cursor alignment.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> Result<(), BitReaderError> {
        let needed = out.len() * 8;
        if needed > self.remaining_bits() {
            return Err(BitReaderError::OutOfBounds {
                asked: needed,
                available: self.remaining_bits(),
            });
        }
        for byte in out.iter_mut() {
            *byte = self.read_u8(8)?;
        }
        Ok(())
    }

    /// Advance the cursor by `length` bits without reading data.
    pub fn skip(&mut self, length: usize) -> Result<(), BitReaderError> {
        if length > self.remaining_bits() {
            return Err(BitReaderError::OutOfBounds {
                asked: length,
                available: self.remaining_bits(),
            });
        }
        self.bit_cursor += length;
        Ok(())
    }
}

//==================================================================================BITWRITER
/// Cursor-based writer laying consecutive DSDL fields into a `&mut [u8]`.
pub struct BitWriter<'a> {
    /// Target buffer (typically the outgoing transfer payload).
    buffer: &'a mut [u8],
    /// Current position expressed in bits written.
    bit_cursor: usize,
}

impl<'a> BitWriter<'a> {
    /// Create a writer positioned at the start of the buffer.
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            bit_cursor: 0,
        }
    }

    /// Expose the cursor position in bits.
    pub fn bit_cursor(&self) -> usize {
        self.bit_cursor
    }

    /// Number of whole bytes touched so far (the serialized length).
    pub fn byte_len(&self) -> usize {
        self.bit_cursor.div_ceil(8)
    }

    /// Write the low `num_bits` bits of `value`.
    pub fn write_u64(&mut self, value: u64, num_bits: u8) -> Result<(), BitWriterError> {
        encode_scalar(self.buffer, self.bit_cursor, num_bits, value)?;
        self.bit_cursor += num_bits as usize;
        Ok(())
    }

    /// Write a two's complement field of `num_bits` bits.
    pub fn write_i64(&mut self, value: i64, num_bits: u8) -> Result<(), BitWriterError> {
        self.write_u64(value as u64, num_bits)
    }

    /// Write a single-bit boolean.
    pub fn write_bool(&mut self, value: bool) -> Result<(), BitWriterError> {
        self.write_u64(value as u64, 1)
    }

    /// Write consecutive bytes, whatever the cursor alignment.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BitWriterError> {
        let needed = bytes.len() * 8;
        let available = (self.buffer.len() * 8).saturating_sub(self.bit_cursor);
        if needed > available {
            return Err(BitWriterError::OutOfBounds {
                asked: needed,
                available,
            });
        }
        for byte in bytes {
            self.write_u64(u64::from(*byte), 8)?;
        }
        Ok(())
    }

    /// Write `length` zero bits (void/reserved fields).
    pub fn skip(&mut self, length: usize) -> Result<(), BitWriterError> {
        let available = (self.buffer.len() * 8).saturating_sub(self.bit_cursor);
        if length > available {
            return Err(BitWriterError::OutOfBounds {
                asked: length,
                available,
            });
        }
        let mut left = length;
        while left > 0 {
            let chunk = left.min(MAX_SCALAR_BITS as usize) as u8;
            self.write_u64(0, chunk)?;
            left -= chunk as usize;
        }
        Ok(())
    }
}
