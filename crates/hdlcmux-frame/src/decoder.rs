use bytes::Bytes;
use tracing::{debug, trace, warn};

use crate::channel::{channel_name, DEFAULT_ADDRESSES};
use crate::crc::{frame_residue, CRC_LEN, GOOD_RESIDUE};
use crate::error::{FrameError, Result};
use crate::escape::{ESCAPE, ESCAPE_XOR, FLAG};
use crate::frame::Frame;

/// Default reassembly capacity: control, payload and CRC of the largest frame.
pub const DEFAULT_REASSEMBLY_CAPACITY: usize = 143;

/// Smallest reassembled body that can be valid: control byte plus CRC.
const MIN_BODY: usize = 1 + CRC_LEN;

/// Configuration for the frame decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Bytes buffered after the address before a frame counts as overflowed.
    pub reassembly_capacity: usize,
    /// Addresses this decoder collects. Frames for any other address are skipped.
    pub accepted_addresses: Vec<u8>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            reassembly_capacity: DEFAULT_REASSEMBLY_CAPACITY,
            accepted_addresses: DEFAULT_ADDRESSES.to_vec(),
        }
    }
}

/// Where the decoder is within the inbound stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Between frames; the next data byte is a candidate address.
    Idle,
    /// Address accepted; buffering the frame body.
    Collecting { address: u8 },
    /// Frame rejected; skipping to the next flag.
    Ignoring,
}

/// Outcome of a frame boundary or a rejected frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeEvent {
    /// A frame passed the CRC check.
    Frame(Frame),
    /// A closed frame failed the CRC check.
    ChecksumFailed { address: u8, residue: u16, len: usize },
    /// A closed frame was too short to hold a control byte and CRC.
    Runt { address: u8, len: usize },
    /// The frame body outgrew the reassembly buffer and was discarded.
    Overflow { address: u8, capacity: usize },
    /// The frame's address is not accepted; it is skipped without buffering.
    Ignored { address: u8 },
}

/// Streaming decoder for one inbound byte stream.
///
/// Bytes may arrive in arbitrary chunks; all state (address, partial body,
/// pending escape) carries across calls. A flag always returns the decoder to
/// [`DecoderState::Idle`], so a corrupted frame costs at most itself.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecoderState,
    escape: bool,
    buf: Vec<u8>,
    config: DecoderConfig,
}

impl FrameDecoder {
    /// Create a decoder with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(DecoderConfig::default())
    }

    /// Create a decoder with explicit configuration.
    ///
    /// The reassembly buffer is allocated once, here.
    pub fn with_config(config: DecoderConfig) -> Result<Self> {
        let capacity = config.reassembly_capacity;
        if capacity < MIN_BODY {
            return Err(FrameError::InvalidCapacity {
                capacity,
                reason: "reassembly capacity must hold a control byte and CRC",
            });
        }

        let mut buf = Vec::new();
        buf.try_reserve_exact(capacity)
            .map_err(|_| FrameError::AllocationFailed { bytes: capacity })?;

        Ok(Self {
            state: DecoderState::Idle,
            escape: false,
            buf,
            config,
        })
    }

    /// Process one raw byte from the wire.
    pub fn push_byte(&mut self, byte: u8) -> Option<DecodeEvent> {
        if byte == FLAG {
            self.escape = false;
            let event = match std::mem::replace(&mut self.state, DecoderState::Idle) {
                DecoderState::Collecting { address } => Some(self.complete(address)),
                DecoderState::Idle | DecoderState::Ignoring => None,
            };
            self.buf.clear();
            return event;
        }

        if byte == ESCAPE {
            self.escape = true;
            return None;
        }

        let byte = if std::mem::take(&mut self.escape) {
            byte ^ ESCAPE_XOR
        } else {
            byte
        };

        match self.state {
            DecoderState::Idle => {
                if self.config.accepted_addresses.contains(&byte) {
                    self.state = DecoderState::Collecting { address: byte };
                    None
                } else {
                    debug!(address = byte, "ignoring frame for unknown address");
                    self.state = DecoderState::Ignoring;
                    Some(DecodeEvent::Ignored { address: byte })
                }
            }
            DecoderState::Collecting { address } => {
                if self.buf.len() < self.config.reassembly_capacity {
                    self.buf.push(byte);
                    return None;
                }
                let capacity = self.config.reassembly_capacity;
                warn!(
                    address,
                    capacity, "reassembly overflow, dropping frame until next flag"
                );
                self.buf.clear();
                self.state = DecoderState::Ignoring;
                Some(DecodeEvent::Overflow { address, capacity })
            }
            DecoderState::Ignoring => None,
        }
    }

    /// Process a chunk of raw bytes, handing every event to `on_event`.
    ///
    /// Returns the number of events emitted.
    pub fn feed<F>(&mut self, bytes: &[u8], mut on_event: F) -> usize
    where
        F: FnMut(DecodeEvent),
    {
        let mut events = 0;
        for &byte in bytes {
            if let Some(event) = self.push_byte(byte) {
                events += 1;
                on_event(event);
            }
        }
        events
    }

    /// Process a chunk of raw bytes and collect the events.
    pub fn decode(&mut self, bytes: &[u8]) -> Vec<DecodeEvent> {
        let mut events = Vec::new();
        self.feed(bytes, |event| events.push(event));
        events
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Bytes of the current frame body buffered so far.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// True if the previous byte was an escape marker.
    pub fn escape_pending(&self) -> bool {
        self.escape
    }

    /// Drop any partial frame and return to [`DecoderState::Idle`].
    pub fn reset(&mut self) {
        self.state = DecoderState::Idle;
        self.escape = false;
        self.buf.clear();
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    fn complete(&self, address: u8) -> DecodeEvent {
        let len = self.buf.len();
        if len < MIN_BODY {
            debug!(address, len, "runt frame");
            return DecodeEvent::Runt { address, len };
        }

        let residue = frame_residue(address, &self.buf);
        if residue != GOOD_RESIDUE {
            warn!(
                address,
                channel = channel_name(address),
                residue,
                len,
                "checksum failure"
            );
            return DecodeEvent::ChecksumFailed {
                address,
                residue,
                len,
            };
        }

        let frame = Frame::new(
            address,
            self.buf[0],
            Bytes::copy_from_slice(&self.buf[1..len - CRC_LEN]),
        );
        trace!(
            address,
            control = frame.control,
            payload_len = frame.payload.len(),
            "frame decoded"
        );
        DecodeEvent::Frame(frame)
    }
}
