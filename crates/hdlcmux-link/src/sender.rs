use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hdlcmux_frame::{control, Frame, FrameEncoder, TxRing};
use hdlcmux_transport::{Transport, TransportError};
use tracing::debug;

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::stats::{LinkStats, StatsCounters};

/// Requests an asynchronous drain of the transmit ring.
///
/// Called from any sender after a frame is queued. Implementations must run
/// the drain on a different execution context than the caller, eventually.
pub trait DrainScheduler: Send + Sync {
    fn request_drain(&self);
}

/// Scheduler that does nothing; the owner drains with [`LinkSender::drain_to`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualDrain;

impl DrainScheduler for ManualDrain {
    fn request_drain(&self) {}
}

/// State shared by every sender, the receiver and the drain side.
#[derive(Debug)]
pub(crate) struct LinkCore {
    pub ring: TxRing,
    pub encoder: FrameEncoder,
    pub stats: StatsCounters,
    pub stopped: AtomicBool,
}

impl LinkCore {
    pub fn new(config: &LinkConfig) -> Result<Self> {
        Ok(Self {
            ring: TxRing::new(config.ring.clone())?,
            encoder: FrameEncoder::default(),
            stats: StatsCounters::default(),
            stopped: AtomicBool::new(false),
        })
    }

    /// Drain the ring until it is empty or the transport stops accepting.
    pub fn drain<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<usize> {
        let written = self
            .ring
            .drain_all(transport)
            .map_err(TransportError::from)?;
        if written > 0 {
            self.stats
                .bytes_written
                .fetch_add(written as u64, Ordering::Relaxed);
            debug!(
                bytes = written,
                pending = self.ring.len(),
                transport = transport.name(),
                "wrote to transport"
            );
        }
        Ok(written)
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

/// Cloneable handle for queuing outbound frames on a link.
#[derive(Clone)]
pub struct LinkSender {
    core: Arc<LinkCore>,
    scheduler: Arc<dyn DrainScheduler>,
}

impl LinkSender {
    pub(crate) fn new(core: Arc<LinkCore>, scheduler: Arc<dyn DrainScheduler>) -> Self {
        Self { core, scheduler }
    }

    /// Queue one frame and schedule a drain.
    ///
    /// Returns once the frame is in the ring, not once it is on the wire.
    /// Blocks while the ring is full.
    pub fn send_frame(&self, address: u8, control: u8, payload: &[u8]) -> Result<usize> {
        let queued = self.enqueue(address, control, payload)?;
        StatsCounters::bump(&self.core.stats.frames_sent);
        debug!(address, control, len = payload.len(), "frame enqueued");
        Ok(queued)
    }

    /// Queue a text line as an unacknowledged frame.
    pub fn send_text(&self, address: u8, text: &str) -> Result<usize> {
        self.send_frame(address, control::UNACKED, text.as_bytes())
    }

    pub(crate) fn send_ack(&self, ack: &Frame) -> Result<usize> {
        let queued = self.enqueue(ack.address, ack.control, &ack.payload)?;
        StatsCounters::bump(&self.core.stats.acks_sent);
        debug!(address = ack.address, control = ack.control, "ack queued");
        Ok(queued)
    }

    fn enqueue(&self, address: u8, control: u8, payload: &[u8]) -> Result<usize> {
        if self.core.is_stopped() {
            return Err(LinkError::WorkerStopped);
        }
        let queued = self
            .core
            .encoder
            .enqueue(&self.core.ring, address, control, payload)?;
        self.scheduler.request_drain();
        Ok(queued)
    }

    /// The transport can take bytes again; schedule a drain.
    ///
    /// Optional: the drain worker already re-polls a stalled transport every
    /// `drain_poll_interval`. Calling this only shortens that wait, e.g. from
    /// a transport that reports write readiness.
    pub fn wakeup(&self) {
        self.scheduler.request_drain();
    }

    /// Drain the ring into `transport` on the caller's thread.
    ///
    /// For links built with [`ManualDrain`]. Returns the bytes written.
    pub fn drain_to<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<usize> {
        self.core.drain(transport)
    }

    /// Wire bytes queued but not yet written.
    pub fn pending(&self) -> usize {
        self.core.ring.len()
    }

    pub fn stats(&self) -> LinkStats {
        self.core.stats.snapshot()
    }

    pub(crate) fn counters(&self) -> &StatsCounters {
        &self.core.stats
    }
}

impl std::fmt::Debug for LinkSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkSender")
            .field("pending", &self.pending())
            .field("stopped", &self.core.is_stopped())
            .finish()
    }
}
