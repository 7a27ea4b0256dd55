//! HDLC-style framing for point-to-point UART links.
//!
//! Every frame on the wire looks like:
//! - `0x7E` opening flag
//! - address, control and payload bytes, byte-stuffed
//! - CRC-16/X-25 over address, control and payload, low byte first, byte-stuffed
//! - `0x7E` closing flag
//!
//! Outbound frames are queued on a [`TxRing`] that a single consumer drains
//! to the transport; inbound bytes go through a [`FrameDecoder`] that yields
//! validated frames and diagnostics.

pub mod channel;
pub mod control;
pub mod crc;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod escape;
pub mod frame;
pub mod ring;

#[cfg(feature = "async")]
pub mod codec;

pub use channel::{channel_name, DATA, DEBUG, DEFAULT_ADDRESSES};
pub use crc::{crc_update, FrameCheck, GOOD_RESIDUE};
pub use decoder::{
    DecodeEvent, DecoderConfig, DecoderState, FrameDecoder, DEFAULT_REASSEMBLY_CAPACITY,
};
pub use encoder::{encode_frame, FrameEncoder, FrameSink, MAX_PAYLOAD};
pub use error::{FrameError, Result};
pub use escape::{ESCAPE, FLAG};
pub use frame::Frame;
pub use ring::{RingConfig, RingProducer, TxRing, DEFAULT_RING_CAPACITY};

#[cfg(feature = "async")]
pub use codec::HdlcCodec;
