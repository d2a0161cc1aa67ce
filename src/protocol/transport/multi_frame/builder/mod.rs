//! CAN frame generator for UAVCAN v0 transfers. Automatically builds the
//! required frame sequence (single or multi-frame) from an application payload.
//!
//! A payload of up to seven bytes travels in one frame followed by its tail
//! byte. Longer payloads are prefixed with the transfer CRC (little-endian)
//! and the resulting stream is cut into seven-byte chunks, each closed by a
//! tail byte whose toggle bit alternates starting from zero.
use crate::infra::codec::crc::TransferCrc;
use crate::protocol::transport::can_frame::CanFrame;
use crate::protocol::transport::can_id::CanId;
use crate::protocol::transport::transfer::{TailByte, TransferId};

/// Payload bytes carried by one frame (the eighth byte is the tail byte).
pub const FRAME_PAYLOAD: usize = 7;

/// Number of frames needed to carry `payload_len` bytes.
pub const fn frame_count(payload_len: usize) -> usize {
    if payload_len <= FRAME_PAYLOAD {
        1
    } else {
        (payload_len + TransferCrc::LENGTH).div_ceil(FRAME_PAYLOAD)
    }
}

#[derive(Debug, Clone, Copy)]
/// Shared parameters for all frames composing a transfer.
pub struct TransferBuilder<'a> {
    id: CanId,
    transfer_id: TransferId,
    payload: &'a [u8],
    crc: [u8; TransferCrc::LENGTH],
}

impl<'a> TransferBuilder<'a> {
    /// Prepare the frames of one transfer. The CRC, seeded with the data type
    /// signature, is only computed when the payload needs several frames.
    pub fn new(id: CanId, transfer_id: TransferId, payload: &'a [u8], signature: u64) -> Self {
        let crc = if payload.len() > FRAME_PAYLOAD {
            let mut crc = TransferCrc::with_signature(signature);
            crc.add_bytes(payload);
            crc.get().to_le_bytes()
        } else {
            [0; TransferCrc::LENGTH]
        };
        Self {
            id,
            transfer_id,
            payload,
            crc,
        }
    }

    /// Number of frames the iterator will produce.
    pub fn frame_count(&self) -> usize {
        frame_count(self.payload.len())
    }

    /// Start the iteration; each call to `next` yields the next frame.
    pub fn build(self) -> FrameIterator<'a> {
        FrameIterator {
            frames: self.frame_count(),
            builder: self,
            frame_index: 0,
        }
    }

    fn stream_len(&self) -> usize {
        if self.payload.len() > FRAME_PAYLOAD {
            self.payload.len() + TransferCrc::LENGTH
        } else {
            self.payload.len()
        }
    }

    fn stream_byte(&self, index: usize) -> u8 {
        if self.payload.len() <= FRAME_PAYLOAD {
            self.payload[index]
        } else if index < TransferCrc::LENGTH {
            self.crc[index]
        } else {
            self.payload[index - TransferCrc::LENGTH]
        }
    }
}

/// Lazy iterator returning frames one by one as they are encoded.
#[derive(Debug, Clone)]
pub struct FrameIterator<'a> {
    builder: TransferBuilder<'a>,
    frame_index: usize,
    frames: usize,
}

impl<'a> Iterator for FrameIterator<'a> {
    type Item = CanFrame;

    fn next(&mut self) -> Option<Self::Item> {
        if self.frame_index >= self.frames {
            return None;
        }

        let start = self.frame_index * FRAME_PAYLOAD;
        let end = (start + FRAME_PAYLOAD).min(self.builder.stream_len());
        let chunk_len = end - start;

        let mut data = [0u8; 8];
        for (offset, slot) in data[..chunk_len].iter_mut().enumerate() {
            *slot = self.builder.stream_byte(start + offset);
        }
        data[chunk_len] = TailByte::new(
            self.frame_index == 0,
            self.frame_index + 1 == self.frames,
            self.frame_index % 2 == 1,
            self.builder.transfer_id,
        )
        .value();

        self.frame_index += 1;

        Some(CanFrame {
            id: self.builder.id,
            data,
            len: chunk_len + 1,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.frames - self.frame_index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameIterator<'_> {}
