//! `tokio_util::codec` adapter for async byte streams.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::decoder::{DecodeEvent, DecoderConfig, FrameDecoder};
use crate::encoder::FrameEncoder;
use crate::error::{FrameError, Result};
use crate::frame::Frame;

/// Codec yielding validated frames from a raw HDLC byte stream.
///
/// Diagnostics (checksum failures, overflows, ignored addresses) are logged
/// and skipped; use [`FrameDecoder`] directly to observe them.
#[derive(Debug)]
pub struct HdlcCodec {
    decoder: FrameDecoder,
    encoder: FrameEncoder,
}

impl HdlcCodec {
    pub fn new() -> Result<Self> {
        Self::with_config(DecoderConfig::default(), FrameEncoder::default())
    }

    pub fn with_config(config: DecoderConfig, encoder: FrameEncoder) -> Result<Self> {
        Ok(Self {
            decoder: FrameDecoder::with_config(config)?,
            encoder,
        })
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }
}

impl Decoder for HdlcCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        while src.has_remaining() {
            let byte = src.get_u8();
            match self.decoder.push_byte(byte) {
                Some(DecodeEvent::Frame(frame)) => return Ok(Some(frame)),
                Some(other) => debug!(event = ?other, "codec skipped frame"),
                None => {}
            }
        }
        Ok(None)
    }
}

impl Encoder<Frame> for HdlcCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        self.encoder
            .encode(frame.address, frame.control, &frame.payload, dst)
    }
}
