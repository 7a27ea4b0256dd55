use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::crc::FrameCheck;
use crate::error::{FrameError, Result};
use crate::escape::{escaped, FLAG};
use crate::ring::{RingProducer, TxRing};

/// Largest payload a peer's reassembly buffer accepts.
pub const MAX_PAYLOAD: usize = 138;

/// Destination for encoded wire bytes, one byte at a time.
pub trait FrameSink {
    fn put(&mut self, byte: u8) -> Result<()>;
}

impl FrameSink for BytesMut {
    fn put(&mut self, byte: u8) -> Result<()> {
        self.put_u8(byte);
        Ok(())
    }
}

impl FrameSink for Vec<u8> {
    fn put(&mut self, byte: u8) -> Result<()> {
        self.push(byte);
        Ok(())
    }
}

impl FrameSink for RingProducer<'_> {
    fn put(&mut self, byte: u8) -> Result<()> {
        self.append(byte)
    }
}

/// Serializes frames into their stuffed wire form.
///
/// ```text
/// 0x7E │ address │ control │ payload... │ crc_lo │ crc_hi │ 0x7E
///      └──────────── escaped, CRC-covered ─┘└─ escaped ─┘
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FrameEncoder {
    max_payload: usize,
}

impl Default for FrameEncoder {
    fn default() -> Self {
        Self::new(MAX_PAYLOAD)
    }
}

impl FrameEncoder {
    pub fn new(max_payload: usize) -> Self {
        Self { max_payload }
    }

    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Write one complete frame into `sink`.
    pub fn write<S: FrameSink + ?Sized>(
        &self,
        sink: &mut S,
        address: u8,
        control: u8,
        payload: &[u8],
    ) -> Result<()> {
        if payload.len() > self.max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.max_payload,
            });
        }

        let mut check = FrameCheck::new();
        sink.put(FLAG)?;
        for &byte in [address, control].iter().chain(payload) {
            check.update(byte);
            put_escaped(sink, byte)?;
        }
        for byte in check.finish() {
            put_escaped(sink, byte)?;
        }
        sink.put(FLAG)
    }

    /// Queue one complete frame on the transmit ring.
    ///
    /// Holds the ring's producer lock for the whole frame so concurrent
    /// senders never interleave. Returns the number of wire bytes queued.
    /// If the ring has an append timeout and it expires, the bytes queued so
    /// far stay in the ring; the peer discards them at the next flag.
    pub fn enqueue(&self, ring: &TxRing, address: u8, control: u8, payload: &[u8]) -> Result<usize> {
        let mut producer = ring.producer();
        self.write(&mut producer, address, control, payload)?;
        trace!(
            address,
            control,
            payload_len = payload.len(),
            wire_len = producer.appended(),
            "frame queued"
        );
        Ok(producer.appended())
    }

    /// Append one complete frame to `dst`.
    pub fn encode(&self, address: u8, control: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
        // worst case: every byte escaped plus two flags
        dst.reserve(2 * (payload.len() + 4) + 2);
        self.write(dst, address, control, payload)
    }
}

/// Encode a frame with the default payload limit.
pub fn encode_frame(address: u8, control: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    FrameEncoder::default().encode(address, control, payload, dst)
}

fn put_escaped<S: FrameSink + ?Sized>(sink: &mut S, byte: u8) -> Result<()> {
    for out in escaped(byte) {
        sink.put(out)?;
    }
    Ok(())
}
