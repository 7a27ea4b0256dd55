use std::sync::Arc;

use hdlcmux_frame::FrameDecoder;
use hdlcmux_transport::Transport;
use tracing::info;

use crate::config::LinkConfig;
use crate::error::Result;
use crate::handler::ChannelHandler;
use crate::receiver::LinkReceiver;
use crate::sender::{DrainScheduler, LinkCore, LinkSender, ManualDrain};
use crate::stats::LinkStats;
use crate::worker::TxWorker;

/// One running link: senders, the receiver and the worker owning the transport.
#[derive(Debug)]
pub struct Link<H> {
    sender: LinkSender,
    receiver: LinkReceiver<H>,
    worker: TxWorker,
}

impl<H: ChannelHandler> Link<H> {
    /// Allocate the link's buffers and start its transmit worker.
    pub fn spawn<T>(transport: T, handler: H, config: LinkConfig) -> Result<Self>
    where
        T: Transport + 'static,
    {
        let core = Arc::new(LinkCore::new(&config)?);
        let decoder = FrameDecoder::with_config(config.decoder.clone())?;
        let name = transport.name();
        let (worker, scheduler) = TxWorker::spawn(Arc::clone(&core), transport, &config)?;
        let sender = LinkSender::new(core, scheduler);
        let receiver = LinkReceiver::new(
            decoder,
            sender.clone(),
            handler,
            config.ack_information_frames,
        );

        info!(
            transport = name,
            ring = config.ring.capacity,
            "link established"
        );
        Ok(Self {
            sender,
            receiver,
            worker,
        })
    }

    /// A new sender handle for this link.
    pub fn sender(&self) -> LinkSender {
        self.sender.clone()
    }

    /// Feed bytes read from the transport.
    pub fn receive(&mut self, bytes: &[u8]) -> usize {
        self.receiver.receive(bytes)
    }

    pub fn receiver(&self) -> &LinkReceiver<H> {
        &self.receiver
    }

    pub fn receiver_mut(&mut self) -> &mut LinkReceiver<H> {
        &mut self.receiver
    }

    pub fn stats(&self) -> LinkStats {
        self.sender.stats()
    }

    /// Split into parts, e.g. to move the receiver onto a reader thread.
    pub fn into_parts(self) -> (LinkSender, LinkReceiver<H>, TxWorker) {
        (self.sender, self.receiver, self.worker)
    }

    /// Flush queued frames, stop the worker and hand back the handler.
    pub fn shutdown(self) -> Result<H> {
        self.worker.shutdown()?;
        Ok(self.receiver.into_handler())
    }
}

/// Build a link without a drain worker.
///
/// Nothing reaches a transport until the caller runs [`LinkSender::drain_to`].
/// ACKs for received information frames are queued on the same ring, so a
/// caller that receives and drains on one thread must drain between
/// [`LinkReceiver::receive`] calls. Once the ring is full, `receive` blocks
/// in the ACK append unless `config.ring.append_timeout` is set, in which case
/// the ACK is dropped with a warning.
pub fn manual<H: ChannelHandler>(
    handler: H,
    config: LinkConfig,
) -> Result<(LinkSender, LinkReceiver<H>)> {
    let scheduler: Arc<dyn DrainScheduler> = Arc::new(ManualDrain);
    let core = Arc::new(LinkCore::new(&config)?);
    let decoder = FrameDecoder::with_config(config.decoder)?;
    let sender = LinkSender::new(core, scheduler);
    let receiver = LinkReceiver::new(
        decoder,
        sender.clone(),
        handler,
        config.ack_information_frames,
    );
    Ok((sender, receiver))
}

/// Build a link whose ring is drained by a tokio task.
///
/// Must be called from within a tokio runtime.
#[cfg(feature = "async")]
pub fn spawn_async<T, H>(
    transport: T,
    handler: H,
    config: LinkConfig,
) -> Result<(LinkSender, LinkReceiver<H>, crate::drain_task::DrainTask)>
where
    T: Transport + 'static,
    H: ChannelHandler,
{
    let core = Arc::new(LinkCore::new(&config)?);
    let decoder = FrameDecoder::with_config(config.decoder.clone())?;
    let (task, scheduler) =
        crate::drain_task::DrainTask::spawn(Arc::clone(&core), transport, &config);
    let sender = LinkSender::new(core, scheduler);
    let receiver = LinkReceiver::new(
        decoder,
        sender.clone(),
        handler,
        config.ack_information_frames,
    );
    Ok((sender, receiver, task))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::BytesMut;
    use hdlcmux_frame::{control, encode_frame, DecodeEvent, Frame, DATA, DEBUG};
    use hdlcmux_transport::MemoryWire;

    use super::*;
    use crate::error::LinkError;

    #[derive(Default)]
    struct Recorder {
        lines: Vec<String>,
        frames: Vec<Frame>,
    }

    impl ChannelHandler for Recorder {
        fn on_control_line(&mut self, line: &str) {
            self.lines.push(line.to_string());
        }

        fn on_data_frame(&mut self, frame: &Frame) {
            self.frames.push(frame.clone());
        }
    }

    fn wire(address: u8, control: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(address, control, payload, &mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn manual_link_with_append_timeout_never_blocks_on_acks() {
        let mut config = LinkConfig::default();
        config.ring.capacity = 16;
        config.ring.append_timeout = Some(Duration::from_millis(5));
        let (sender, mut receiver) = manual(Recorder::default(), config).unwrap();

        let mut capture = Vec::new();
        for _ in 0..10 {
            capture.extend(wire(DATA, control::information(0), b"x"));
        }
        receiver.receive(&capture);

        // two 6-byte ACKs fit the 15 usable slots; the rest time out
        let stats = sender.stats();
        assert_eq!(stats.frames_received, 10);
        assert_eq!(stats.acks_sent, 2);
        assert_eq!(receiver.handler().frames.len(), 10);
    }

    #[test]
    fn two_links_talk_over_memory_wires() {
        let config = LinkConfig {
            drain_poll_interval: Duration::from_millis(2),
            ..LinkConfig::default()
        };
        let a_to_b = MemoryWire::new();
        let b_to_a = MemoryWire::new();
        let mut a = Link::spawn(a_to_b.clone(), Recorder::default(), config.clone()).unwrap();
        let mut b = Link::spawn(b_to_a.clone(), Recorder::default(), config).unwrap();

        a.sender().send_frame(DATA, control::information(2), b"ping").unwrap();
        a.sender().send_text(DEBUG, "hello b").unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while a.sender().pending() > 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        b.receive(&a_to_b.take());

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        while b.sender().pending() > 0 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        a.receive(&b_to_a.take());

        let a_handler = a.shutdown().unwrap();
        let b_handler = b.shutdown().unwrap();

        assert_eq!(b_handler.frames.len(), 1);
        assert_eq!(b_handler.frames[0].payload.as_ref(), b"ping");
        assert_eq!(b_handler.lines, vec!["hello b".to_string()]);

        // a sees b's ack on the data channel
        assert_eq!(a_handler.frames.len(), 1);
        let ack = &a_handler.frames[0];
        assert!(!ack.is_information());
        assert_eq!(ack.sequence(), 2);
        assert!(ack.payload.is_empty());
    }

    #[test]
    fn manual_link_decodes_and_acks() {
        let (sender, mut receiver) = manual(Recorder::default(), LinkConfig::default()).unwrap();
        receiver.receive(&wire(DATA, control::information(6), b"HI"));

        let mut out = MemoryWire::new();
        sender.drain_to(&mut out).unwrap();
        let events = FrameDecoder::new().unwrap().decode(&out.contents());
        assert_eq!(
            events,
            vec![DecodeEvent::Frame(Frame::new(
                DATA,
                control::ack_for(control::information(6)),
                bytes::Bytes::new()
            ))]
        );
        assert_eq!(receiver.handler().frames.len(), 1);
    }

    #[test]
    fn invalid_ring_capacity_fails_construction() {
        let config = LinkConfig {
            ring: hdlcmux_frame::RingConfig {
                capacity: 100,
                ..Default::default()
            },
            ..LinkConfig::default()
        };
        let err = manual(Recorder::default(), config).unwrap_err();
        assert!(matches!(err, LinkError::Frame(_)));
    }
}
