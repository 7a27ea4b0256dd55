use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time link counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Frames queued by senders, ACKs excluded.
    pub frames_sent: u64,
    /// ACK frames queued by the receiver.
    pub acks_sent: u64,
    /// Wire bytes accepted by the transport.
    pub bytes_written: u64,
    /// Frames that passed the CRC check.
    pub frames_received: u64,
    pub checksum_failures: u64,
    pub overflows: u64,
    pub runts: u64,
    /// Frames skipped because of their address.
    pub ignored: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    pub frames_sent: AtomicU64,
    pub acks_sent: AtomicU64,
    pub bytes_written: AtomicU64,
    pub frames_received: AtomicU64,
    pub checksum_failures: AtomicU64,
    pub overflows: AtomicU64,
    pub runts: AtomicU64,
    pub ignored: AtomicU64,
}

impl StatsCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> LinkStats {
        let get = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        LinkStats {
            frames_sent: get(&self.frames_sent),
            acks_sent: get(&self.acks_sent),
            bytes_written: get(&self.bytes_written),
            frames_received: get(&self.frames_received),
            checksum_failures: get(&self.checksum_failures),
            overflows: get(&self.overflows),
            runts: get(&self.runts),
            ignored: get(&self.ignored),
        }
    }
}
