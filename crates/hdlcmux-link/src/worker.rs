use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use hdlcmux_transport::{Transport, TransportError};
use tracing::{debug, error, info};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::sender::{DrainScheduler, LinkCore};

enum WorkerMsg {
    Drain,
    Shutdown,
}

/// Scheduler backed by the worker's message channel.
struct ChannelScheduler {
    tx: Sender<WorkerMsg>,
}

impl DrainScheduler for ChannelScheduler {
    fn request_drain(&self) {
        // A closed channel means the worker is gone; senders see `stopped`.
        let _ = self.tx.send(WorkerMsg::Drain);
    }
}

/// Thread that owns the transport and drains the transmit ring into it.
///
/// Wakes on every drain request and, while bytes remain queued, every
/// `drain_poll_interval`. Shutdown flushes the ring before the thread exits.
pub struct TxWorker {
    tx: Sender<WorkerMsg>,
    handle: Option<JoinHandle<Result<()>>>,
    core: Arc<LinkCore>,
}

impl TxWorker {
    pub(crate) fn spawn<T>(
        core: Arc<LinkCore>,
        transport: T,
        config: &LinkConfig,
    ) -> Result<(Self, Arc<dyn DrainScheduler>)>
    where
        T: Transport + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let poll = config.drain_poll_interval;
        let shutdown_timeout = config.shutdown_timeout;
        let worker_core = Arc::clone(&core);

        let handle = std::thread::Builder::new()
            .name("hdlcmux-tx".to_string())
            .spawn(move || {
                let result = run(&worker_core, transport, &rx, poll, shutdown_timeout);
                worker_core.stop();
                result
            })
            .map_err(TransportError::from)?;

        let scheduler: Arc<dyn DrainScheduler> = Arc::new(ChannelScheduler { tx: tx.clone() });
        Ok((
            Self {
                tx,
                handle: Some(handle),
                core,
            },
            scheduler,
        ))
    }

    /// True until the worker thread has exited.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Flush the ring, stop the worker and join it.
    ///
    /// Returns the worker's own error if it stopped early on a transport
    /// failure, or [`LinkError::ShutdownFailed`] if the flush timed out.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let _ = self.tx.send(WorkerMsg::Shutdown);
        let result = handle
            .join()
            .map_err(|_| LinkError::ShutdownFailed("tx worker panicked".to_string()))?;
        self.core.stop();
        result
    }
}

impl Drop for TxWorker {
    fn drop(&mut self) {
        if let Err(err) = self.stop_and_join() {
            error!(error = %err, "tx worker shutdown failed");
        }
    }
}

impl std::fmt::Debug for TxWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxWorker")
            .field("running", &self.is_running())
            .field("pending", &self.core.ring.len())
            .finish()
    }
}

fn run<T: Transport>(
    core: &LinkCore,
    mut transport: T,
    rx: &Receiver<WorkerMsg>,
    poll: Duration,
    shutdown_timeout: Duration,
) -> Result<()> {
    info!(transport = transport.name(), "tx worker started");
    loop {
        match rx.recv_timeout(poll) {
            Ok(WorkerMsg::Drain) => {}
            Ok(WorkerMsg::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                if core.ring.is_empty() {
                    continue;
                }
            }
        }

        if let Err(err) = core.drain(&mut transport) {
            error!(
                error = %err,
                transport = transport.name(),
                "transport write failed, stopping tx worker"
            );
            return Err(err);
        }
    }

    flush(core, &mut transport, poll, shutdown_timeout)?;
    info!("tx worker stopped");
    Ok(())
}

/// Drain until the ring is empty, retrying a stalled transport until `timeout`.
fn flush<T: Transport + ?Sized>(
    core: &LinkCore,
    transport: &mut T,
    poll: Duration,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        core.drain(transport)?;
        if core.ring.is_empty() {
            break;
        }
        if Instant::now() >= deadline {
            return Err(LinkError::ShutdownFailed(format!(
                "{} bytes still queued after {timeout:?}",
                core.ring.len()
            )));
        }
        debug!(
            pending = core.ring.len(),
            "waiting for transport to accept queued bytes"
        );
        std::thread::sleep(poll.min(Duration::from_millis(5)));
    }
    transport.flush().map_err(TransportError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use hdlcmux_frame::{FrameDecoder, DATA};
    use hdlcmux_transport::MemoryWire;

    use super::*;
    use crate::sender::LinkSender;

    fn fast_config() -> LinkConfig {
        LinkConfig {
            drain_poll_interval: Duration::from_millis(2),
            shutdown_timeout: Duration::from_millis(200),
            ..LinkConfig::default()
        }
    }

    fn spawn_with<T>(transport: T, config: &LinkConfig) -> (LinkSender, TxWorker)
    where
        T: Transport + 'static,
    {
        let core = Arc::new(LinkCore::new(config).unwrap());
        let (worker, scheduler) = TxWorker::spawn(Arc::clone(&core), transport, config).unwrap();
        (LinkSender::new(core, scheduler), worker)
    }

    #[test]
    fn worker_drains_and_flushes_on_shutdown() {
        let wire = MemoryWire::with_write_limit(3);
        let (sender, worker) = spawn_with(wire.clone(), &fast_config());

        for i in 0..20u8 {
            sender.send_frame(DATA, 0x03, &[i; 10]).unwrap();
        }
        worker.shutdown().unwrap();

        assert_eq!(sender.pending(), 0);
        let events = FrameDecoder::new().unwrap().decode(&wire.contents());
        assert_eq!(events.len(), 20);
        assert_eq!(sender.stats().bytes_written as usize, wire.len());
    }

    #[test]
    fn stalled_transport_resumes_on_poll() {
        let wire = MemoryWire::with_write_limit(0);
        let (sender, worker) = spawn_with(wire.clone(), &fast_config());

        sender.send_frame(DATA, 0x03, b"HI").unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(wire.is_empty());
        assert_eq!(sender.pending(), 8);

        wire.set_write_limit(None);
        sender.wakeup();
        worker.shutdown().unwrap();
        assert_eq!(wire.len(), 8);
    }

    #[test]
    fn stalled_transport_resumes_without_wakeup() {
        let wire = MemoryWire::with_write_limit(0);
        let (sender, worker) = spawn_with(wire.clone(), &fast_config());

        sender.send_frame(DATA, 0x03, b"HI").unwrap();
        std::thread::sleep(Duration::from_millis(10));
        wire.set_write_limit(None);

        let deadline = Instant::now() + Duration::from_secs(2);
        while wire.len() < 8 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert_eq!(wire.len(), 8);
        assert_eq!(sender.pending(), 0);
        worker.shutdown().unwrap();
    }

    #[test]
    fn shutdown_times_out_on_dead_transport() {
        let wire = MemoryWire::with_write_limit(0);
        let (sender, worker) = spawn_with(wire, &fast_config());

        sender.send_frame(DATA, 0x03, b"stuck").unwrap();
        let err = worker.shutdown().unwrap_err();
        assert!(matches!(err, LinkError::ShutdownFailed(_)));
        assert!(matches!(
            sender.send_frame(DATA, 0x03, b"late"),
            Err(LinkError::WorkerStopped)
        ));
    }

    struct BrokenWire {
        calls: Arc<Mutex<usize>>,
    }

    impl Transport for BrokenWire {
        fn write(&mut self, _bytes: &[u8]) -> io::Result<usize> {
            *self.calls.lock().unwrap() += 1;
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[test]
    fn transport_failure_stops_worker() {
        let calls = Arc::new(Mutex::new(0));
        let (sender, worker) = spawn_with(
            BrokenWire {
                calls: Arc::clone(&calls),
            },
            &fast_config(),
        );

        sender.send_frame(DATA, 0x03, b"x").unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        while worker.is_running() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }

        assert!(!worker.is_running());
        assert!(matches!(worker.shutdown(), Err(LinkError::Transport(_))));
        assert!(matches!(
            sender.send_frame(DATA, 0x03, b"y"),
            Err(LinkError::WorkerStopped)
        ));
        assert_eq!(*calls.lock().unwrap(), 1);
    }
}
