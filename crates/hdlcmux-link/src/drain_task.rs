//! Tokio task that drains the transmit ring (feature `async`).

use std::sync::Arc;
use std::time::Duration;

use hdlcmux_transport::{Transport, TransportError};
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::config::LinkConfig;
use crate::error::{LinkError, Result};
use crate::sender::{DrainScheduler, LinkCore};

struct NotifyScheduler {
    notify: Arc<Notify>,
}

impl DrainScheduler for NotifyScheduler {
    fn request_drain(&self) {
        self.notify.notify_one();
    }
}

/// Handle to a spawned drain task.
///
/// The transport's `write` runs on the runtime, so it must not block.
#[derive(Debug)]
pub struct DrainTask {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<()>>,
}

impl DrainTask {
    pub(crate) fn spawn<T>(
        core: Arc<LinkCore>,
        transport: T,
        config: &LinkConfig,
    ) -> (Self, Arc<dyn DrainScheduler>)
    where
        T: Transport + 'static,
    {
        let notify = Arc::new(Notify::new());
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(run(
            core,
            transport,
            Arc::clone(&notify),
            shutdown_rx,
            config.drain_poll_interval,
            config.shutdown_timeout,
        ));

        let scheduler: Arc<dyn DrainScheduler> = Arc::new(NotifyScheduler { notify });
        (
            Self {
                shutdown: Some(shutdown_tx),
                handle,
            },
            scheduler,
        )
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Flush the ring and wait for the task to exit.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        (&mut self.handle)
            .await
            .map_err(|err| LinkError::ShutdownFailed(format!("drain task failed: {err}")))?
    }
}

async fn run<T: Transport>(
    core: Arc<LinkCore>,
    mut transport: T,
    notify: Arc<Notify>,
    mut shutdown: oneshot::Receiver<()>,
    poll: Duration,
    shutdown_timeout: Duration,
) -> Result<()> {
    info!(transport = transport.name(), "drain task started");
    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let result: Result<()> = async {
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = notify.notified() => {}
                _ = ticker.tick() => {
                    if core.ring.is_empty() {
                        continue;
                    }
                }
            }
            if let Err(err) = core.drain(&mut transport) {
                error!(error = %err, "transport write failed, stopping drain task");
                return Err(err);
            }
        }

        let deadline = Instant::now() + shutdown_timeout;
        loop {
            core.drain(&mut transport)?;
            if core.ring.is_empty() {
                break;
            }
            if Instant::now() >= deadline {
                return Err(LinkError::ShutdownFailed(format!(
                    "{} bytes still queued after {shutdown_timeout:?}",
                    core.ring.len()
                )));
            }
            debug!(
                pending = core.ring.len(),
                "waiting for transport to accept queued bytes"
            );
            tokio::time::sleep(poll.min(Duration::from_millis(5))).await;
        }
        transport.flush().map_err(TransportError::from)?;
        info!("drain task stopped");
        Ok(())
    }
    .await;

    core.stop();
    result
}

#[cfg(test)]
mod tests {
    use hdlcmux_frame::{FrameDecoder, DATA};
    use hdlcmux_transport::MemoryWire;

    use super::*;
    use crate::sender::LinkSender;

    fn config() -> LinkConfig {
        LinkConfig {
            drain_poll_interval: Duration::from_millis(2),
            shutdown_timeout: Duration::from_millis(100),
            ..LinkConfig::default()
        }
    }

    #[tokio::test]
    async fn drain_task_writes_queued_frames() {
        let config = config();
        let core = Arc::new(LinkCore::new(&config).unwrap());
        let wire = MemoryWire::with_write_limit(4);
        let (task, scheduler) = DrainTask::spawn(Arc::clone(&core), wire.clone(), &config);
        let sender = LinkSender::new(core, scheduler);

        sender.send_frame(DATA, 0x03, b"async one").unwrap();
        sender.send_frame(DATA, 0x03, b"async two").unwrap();
        task.shutdown().await.unwrap();

        let events = FrameDecoder::new().unwrap().decode(&wire.contents());
        assert_eq!(events.len(), 2);
        assert!(matches!(
            sender.send_frame(DATA, 0x03, b"late"),
            Err(LinkError::WorkerStopped)
        ));
    }

    #[tokio::test]
    async fn drain_task_shutdown_times_out_on_stalled_wire() {
        let config = config();
        let core = Arc::new(LinkCore::new(&config).unwrap());
        let wire = MemoryWire::with_write_limit(0);
        let (task, scheduler) = DrainTask::spawn(Arc::clone(&core), wire, &config);
        let sender = LinkSender::new(core, scheduler);

        sender.send_frame(DATA, 0x03, b"stuck").unwrap();
        let err = task.shutdown().await.unwrap_err();
        assert!(matches!(err, LinkError::ShutdownFailed(_)));
    }
}
