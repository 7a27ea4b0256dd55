use hdlcmux_frame::{DecodeEvent, Frame, FrameDecoder, DEBUG};
use tracing::{debug, warn};

use crate::handler::ChannelHandler;
use crate::sender::LinkSender;
use crate::stats::StatsCounters;

/// Inbound half of a link: decodes raw bytes, acknowledges information
/// frames and hands the rest to a [`ChannelHandler`].
///
/// Bytes must be delivered in order from a single context.
pub struct LinkReceiver<H> {
    decoder: FrameDecoder,
    sender: LinkSender,
    handler: H,
    ack_information_frames: bool,
}

impl<H: ChannelHandler> LinkReceiver<H> {
    pub(crate) fn new(
        decoder: FrameDecoder,
        sender: LinkSender,
        handler: H,
        ack_information_frames: bool,
    ) -> Self {
        Self {
            decoder,
            sender,
            handler,
            ack_information_frames,
        }
    }

    /// Process bytes received from the transport.
    ///
    /// Every byte is consumed; the return value is always `bytes.len()`.
    pub fn receive(&mut self, bytes: &[u8]) -> usize {
        let Self {
            decoder,
            sender,
            handler,
            ack_information_frames,
        } = self;
        decoder.feed(bytes, |event| {
            dispatch(sender, handler, *ack_information_frames, event)
        });
        bytes.len()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    /// Sender sharing this link's transmit ring.
    pub fn sender(&self) -> &LinkSender {
        &self.sender
    }
}

fn dispatch<H: ChannelHandler>(sender: &LinkSender, handler: &mut H, ack: bool, event: DecodeEvent) {
    let counters = sender.counters();
    let frame = match event {
        DecodeEvent::Frame(frame) => frame,
        other => {
            match &other {
                DecodeEvent::ChecksumFailed { .. } => StatsCounters::bump(&counters.checksum_failures),
                DecodeEvent::Overflow { .. } => StatsCounters::bump(&counters.overflows),
                DecodeEvent::Runt { .. } => StatsCounters::bump(&counters.runts),
                DecodeEvent::Ignored { .. } => StatsCounters::bump(&counters.ignored),
                DecodeEvent::Frame(_) => {}
            }
            handler.on_diagnostic(&other);
            return;
        }
    };
    StatsCounters::bump(&counters.frames_received);

    if ack {
        if let Some(reply) = frame.ack() {
            if let Err(err) = sender.send_ack(&reply) {
                warn!(address = frame.address, error = %err, "failed to queue ack");
            }
        }
    }

    deliver(handler, &frame);
}

fn deliver<H: ChannelHandler>(handler: &mut H, frame: &Frame) {
    if frame.address == DEBUG {
        let text = String::from_utf8_lossy(&frame.payload);
        let line = text.trim_end_matches(['\r', '\n']);
        debug!(line, "frame data");
        handler.on_control_line(line);
    } else {
        handler.on_data_frame(frame);
    }
}

impl<H> std::fmt::Debug for LinkReceiver<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkReceiver")
            .field("decoder", &self.decoder)
            .field("ack_information_frames", &self.ack_information_frames)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::BytesMut;
    use hdlcmux_frame::{control, encode_frame, FrameDecoder, DATA};
    use hdlcmux_transport::MemoryWire;

    use super::*;
    use crate::config::LinkConfig;
    use crate::sender::{LinkCore, ManualDrain};

    #[derive(Default)]
    struct Recorder {
        lines: Vec<String>,
        frames: Vec<Frame>,
        diagnostics: Vec<DecodeEvent>,
    }

    impl ChannelHandler for Recorder {
        fn on_control_line(&mut self, line: &str) {
            self.lines.push(line.to_string());
        }

        fn on_data_frame(&mut self, frame: &Frame) {
            self.frames.push(frame.clone());
        }

        fn on_diagnostic(&mut self, event: &DecodeEvent) {
            self.diagnostics.push(event.clone());
        }
    }

    fn receiver(ack: bool) -> LinkReceiver<Recorder> {
        let core = Arc::new(LinkCore::new(&LinkConfig::default()).unwrap());
        let sender = LinkSender::new(core, Arc::new(ManualDrain));
        LinkReceiver::new(FrameDecoder::new().unwrap(), sender, Recorder::default(), ack)
    }

    fn wire(address: u8, control: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(address, control, payload, &mut buf).unwrap();
        buf.to_vec()
    }

    fn sent(receiver: &LinkReceiver<Recorder>) -> Vec<DecodeEvent> {
        let mut out = MemoryWire::new();
        receiver.sender().drain_to(&mut out).unwrap();
        FrameDecoder::new().unwrap().decode(&out.contents())
    }

    #[test]
    fn information_frame_is_acked_once() {
        let mut rx = receiver(true);
        let bytes = wire(DATA, control::information(3), b"payload");
        assert_eq!(rx.receive(&bytes), bytes.len());

        assert_eq!(rx.handler().frames.len(), 1);
        assert_eq!(rx.handler().frames[0].payload.as_ref(), b"payload");

        let acks = sent(&rx);
        assert_eq!(acks.len(), 1);
        match &acks[0] {
            DecodeEvent::Frame(ack) => {
                assert_eq!(ack.address, DATA);
                assert!(ack.payload.is_empty());
                assert_eq!(ack.control & control::SUPERVISORY, control::SUPERVISORY);
                assert_eq!(ack.control & control::SEQUENCE_MASK, control::information(3));
            }
            other => panic!("unexpected event {other:?}"),
        }

        let stats = rx.sender().stats();
        assert_eq!(stats.frames_received, 1);
        assert_eq!(stats.acks_sent, 1);
        assert_eq!(stats.frames_sent, 0);
    }

    #[test]
    fn supervisory_frame_is_not_acked() {
        let mut rx = receiver(true);
        rx.receive(&wire(DATA, control::UNACKED, b"x"));
        assert!(sent(&rx).is_empty());
        assert_eq!(rx.handler().frames.len(), 1);
    }

    #[test]
    fn ack_can_be_disabled() {
        let mut rx = receiver(false);
        rx.receive(&wire(DATA, control::information(1), b"x"));
        assert!(sent(&rx).is_empty());
    }

    #[test]
    fn debug_channel_surfaces_text_lines() {
        let mut rx = receiver(true);
        rx.receive(&wire(DEBUG, control::UNACKED, b"boot ok\r\n"));
        rx.receive(&wire(DEBUG, control::UNACKED, &[b'a', 0xFF, b'b']));

        assert_eq!(rx.handler().lines, vec!["boot ok".to_string(), "a\u{FFFD}b".to_string()]);
        assert!(rx.handler().frames.is_empty());
    }

    #[test]
    fn diagnostics_are_counted_and_forwarded() {
        let mut rx = receiver(true);
        let mut corrupt = wire(DATA, 0x00, b"HI");
        corrupt[3] ^= 0x01;

        rx.receive(&corrupt);
        rx.receive(&[0x7E, 0x09, 0x01, 0x02, 0x7E]);
        rx.receive(&[0x7E, DATA, 0x03, 0x7E]);

        let stats = rx.sender().stats();
        assert_eq!(stats.checksum_failures, 1);
        assert_eq!(stats.ignored, 1);
        assert_eq!(stats.runts, 1);
        assert_eq!(stats.frames_received, 0);
        assert_eq!(rx.handler().diagnostics.len(), 3);
        assert!(sent(&rx).is_empty());
    }
}
