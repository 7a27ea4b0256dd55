use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use hdlcmux_transport::Transport;
use rand::Rng;
use tracing::{debug, trace};

use crate::error::{FrameError, Result};

/// Default transmit ring capacity in bytes.
pub const DEFAULT_RING_CAPACITY: usize = 1024;

/// Configuration for the transmit ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingConfig {
    /// Capacity in bytes. Must be a power of two; one slot always stays free.
    pub capacity: usize,
    /// Shortest sleep while waiting for the consumer to free space.
    pub backoff_min: Duration,
    /// Longest sleep while waiting for the consumer to free space.
    pub backoff_max: Duration,
    /// Give up on a full ring after this long. `None` waits indefinitely.
    pub append_timeout: Option<Duration>,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_RING_CAPACITY,
            backoff_min: Duration::from_millis(3),
            backoff_max: Duration::from_millis(5),
            append_timeout: None,
        }
    }
}

/// Fixed-capacity single-producer/single-consumer byte ring.
///
/// `head` is only advanced by the holder of the producer lock and `tail` only
/// by the holder of the consumer lock. Each side publishes its index with a
/// release store after touching the slots it owns, and reads the other side's
/// index with an acquire load, so a byte is never read before it is written
/// nor overwritten before it is read.
pub struct TxRing {
    slots: Box<[UnsafeCell<u8>]>,
    mask: usize,
    head: AtomicUsize,
    tail: AtomicUsize,
    producer: Mutex<()>,
    consumer: Mutex<()>,
    config: RingConfig,
}

// SAFETY: slots are only written through `RingProducer` (serialized by the
// producer lock) at indices outside the live range, and only read through
// `drain_to` (serialized by the consumer lock) at indices inside it. The
// acquire/release pairs on `head` and `tail` order those accesses.
unsafe impl Sync for TxRing {}

impl TxRing {
    /// Allocate a ring with the given configuration.
    pub fn new(config: RingConfig) -> Result<Self> {
        let capacity = config.capacity;
        if capacity < 2 || !capacity.is_power_of_two() {
            return Err(FrameError::InvalidCapacity {
                capacity,
                reason: "ring capacity must be a power of two of at least 2",
            });
        }

        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| FrameError::AllocationFailed { bytes: capacity })?;
        slots.resize_with(capacity, || UnsafeCell::new(0));

        Ok(Self {
            slots: slots.into_boxed_slice(),
            mask: capacity - 1,
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            producer: Mutex::new(()),
            consumer: Mutex::new(()),
            config,
        })
    }

    /// Allocate a ring of `capacity` bytes with default backoff.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::new(RingConfig {
            capacity,
            ..RingConfig::default()
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Bytes appended but not yet drained.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) & self.mask
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes that can be appended without waiting.
    pub fn free(&self) -> usize {
        self.mask - self.len()
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    /// Take the producer role.
    ///
    /// The returned handle holds the producer lock, so every byte appended
    /// through it lands contiguously with no other producer interleaving.
    pub fn producer(&self) -> RingProducer<'_> {
        let guard = self
            .producer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        RingProducer {
            ring: self,
            _guard: guard,
            appended: 0,
        }
    }

    /// Hand the longest contiguous run of pending bytes to `sink`.
    ///
    /// The run stops at the physical end of the buffer; a wrapped backlog
    /// takes two calls. Returns how many bytes the sink accepted.
    pub fn drain_to<T: Transport + ?Sized>(&self, sink: &mut T) -> std::io::Result<usize> {
        let _guard = self.lock_consumer();
        self.drain_locked(sink)
    }

    /// Drain until the ring is empty or the sink stops accepting bytes.
    pub fn drain_all<T: Transport + ?Sized>(&self, sink: &mut T) -> std::io::Result<usize> {
        let _guard = self.lock_consumer();
        let mut total = 0usize;
        loop {
            let written = self.drain_locked(sink)?;
            if written == 0 {
                return Ok(total);
            }
            total += written;
        }
    }

    fn lock_consumer(&self) -> MutexGuard<'_, ()> {
        self.consumer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn drain_locked<T: Transport + ?Sized>(&self, sink: &mut T) -> std::io::Result<usize> {
        let head = self.head.load(Ordering::Acquire);
        let tail = self.tail.load(Ordering::Relaxed);
        let count = if head >= tail {
            head - tail
        } else {
            self.capacity() - tail
        };
        if count == 0 {
            return Ok(0);
        }

        // SAFETY: [tail, tail + count) lies inside the slice and holds bytes
        // published by the producer's release store on `head`; the producer
        // does not write them again until `tail` moves past them.
        let run = unsafe {
            std::slice::from_raw_parts(self.slots.as_ptr().cast::<u8>().add(tail), count)
        };
        let written = sink.write(run)?.min(count);
        trace!(offered = count, written, transport = sink.name(), "drained tx ring");

        self.tail
            .store((tail + written) & self.mask, Ordering::Release);
        Ok(written)
    }

    fn backoff(&self) -> Duration {
        let lo = self.config.backoff_min.as_micros() as u64;
        let hi = (self.config.backoff_max.as_micros() as u64).max(lo);
        Duration::from_micros(rand::thread_rng().gen_range(lo..=hi))
    }
}

impl std::fmt::Debug for TxRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxRing")
            .field("capacity", &self.capacity())
            .field("len", &self.len())
            .finish()
    }
}

/// Exclusive producer handle for a [`TxRing`].
pub struct RingProducer<'a> {
    ring: &'a TxRing,
    _guard: MutexGuard<'a, ()>,
    appended: usize,
}

impl RingProducer<'_> {
    /// Append one byte if a slot is free.
    pub fn try_append(&mut self, byte: u8) -> bool {
        let ring = self.ring;
        let head = ring.head.load(Ordering::Relaxed);
        let tail = ring.tail.load(Ordering::Acquire);
        if tail.wrapping_sub(head + 1) & ring.mask == 0 {
            return false;
        }

        // SAFETY: `head` is a free slot (checked above) and only this handle,
        // which holds the producer lock, writes slots.
        unsafe {
            *ring.slots[head].get() = byte;
        }
        ring.head.store((head + 1) & ring.mask, Ordering::Release);
        self.appended += 1;
        true
    }

    /// Append one byte, sleeping with a randomized backoff while the ring is full.
    ///
    /// Waits indefinitely unless `append_timeout` is configured, in which case
    /// it fails with [`FrameError::Backpressure`]. Bytes appended before the
    /// failure stay queued.
    pub fn append(&mut self, byte: u8) -> Result<()> {
        let started = Instant::now();
        loop {
            if self.try_append(byte) {
                return Ok(());
            }
            if let Some(limit) = self.ring.config.append_timeout {
                let waited = started.elapsed();
                if waited >= limit {
                    return Err(FrameError::Backpressure { waited });
                }
            }
            debug!(capacity = self.ring.capacity(), "tx ring full");
            std::thread::sleep(self.ring.backoff());
        }
    }

    /// Bytes appended through this handle.
    pub fn appended(&self) -> usize {
        self.appended
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hdlcmux_transport::MemoryWire;

    use super::*;

    fn fast_config(capacity: usize) -> RingConfig {
        RingConfig {
            capacity,
            backoff_min: Duration::from_micros(100),
            backoff_max: Duration::from_micros(300),
            append_timeout: None,
        }
    }

    #[test]
    fn rejects_non_power_of_two() {
        assert!(matches!(
            TxRing::with_capacity(1000),
            Err(FrameError::InvalidCapacity { capacity: 1000, .. })
        ));
        assert!(matches!(
            TxRing::with_capacity(1),
            Err(FrameError::InvalidCapacity { .. })
        ));
    }

    #[test]
    fn fills_to_capacity_minus_one() {
        let ring = TxRing::with_capacity(8).unwrap();
        let mut producer = ring.producer();
        for byte in 0..7u8 {
            assert!(producer.try_append(byte));
        }
        assert!(!producer.try_append(7));
        assert_eq!(producer.appended(), 7);
        drop(producer);

        assert_eq!(ring.len(), 7);
        assert_eq!(ring.free(), 0);
    }

    #[test]
    fn drain_on_empty_ring_is_noop() {
        let ring = TxRing::with_capacity(8).unwrap();
        let mut wire = MemoryWire::new();
        assert_eq!(ring.drain_to(&mut wire).unwrap(), 0);
        assert_eq!(wire.write_calls(), 0);
    }

    #[test]
    fn drain_stops_at_physical_end() {
        let ring = TxRing::with_capacity(8).unwrap();
        let mut wire = MemoryWire::new();

        {
            let mut producer = ring.producer();
            for byte in 0..6u8 {
                producer.append(byte).unwrap();
            }
        }
        assert_eq!(ring.drain_to(&mut wire).unwrap(), 6);

        {
            let mut producer = ring.producer();
            for byte in 6..11u8 {
                producer.append(byte).unwrap();
            }
        }
        // tail at 6: only slots 6 and 7 are contiguous
        assert_eq!(ring.drain_to(&mut wire).unwrap(), 2);
        assert_eq!(ring.drain_to(&mut wire).unwrap(), 3);
        assert_eq!(wire.take(), (0..11u8).collect::<Vec<_>>());
    }

    #[test]
    fn partial_acceptance_advances_tail_by_accepted() {
        let ring = TxRing::with_capacity(16).unwrap();
        let mut wire = MemoryWire::with_write_limit(3);
        {
            let mut producer = ring.producer();
            for byte in b"abcdefgh" {
                producer.append(*byte).unwrap();
            }
        }

        assert_eq!(ring.drain_to(&mut wire).unwrap(), 3);
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.drain_all(&mut wire).unwrap(), 5);
        assert_eq!(wire.contents(), b"abcdefgh");
        assert!(ring.is_empty());
    }

    #[test]
    fn stalled_sink_leaves_bytes_queued() {
        let ring = TxRing::with_capacity(8).unwrap();
        let mut wire = MemoryWire::with_write_limit(0);
        ring.producer().append(0x42).unwrap();

        assert_eq!(ring.drain_all(&mut wire).unwrap(), 0);
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn append_blocks_until_drain_frees_space() {
        let ring = Arc::new(TxRing::new(fast_config(8)).unwrap());
        {
            let mut producer = ring.producer();
            for byte in 0..7u8 {
                producer.append(byte).unwrap();
            }
        }

        let blocked = {
            let ring = Arc::clone(&ring);
            std::thread::spawn(move || ring.producer().append(7).unwrap())
        };

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(ring.len(), 7, "append must wait while the ring is full");

        let mut wire = MemoryWire::with_write_limit(1);
        assert_eq!(ring.drain_to(&mut wire).unwrap(), 1);
        blocked.join().unwrap();

        wire.set_write_limit(None);
        ring.drain_all(&mut wire).unwrap();
        assert_eq!(wire.contents(), (0..8u8).collect::<Vec<_>>());
    }

    #[test]
    fn append_timeout_reports_backpressure() {
        let ring = TxRing::new(RingConfig {
            append_timeout: Some(Duration::from_millis(5)),
            ..fast_config(4)
        })
        .unwrap();
        let mut producer = ring.producer();
        for byte in 0..3u8 {
            producer.append(byte).unwrap();
        }

        let err = producer.append(3).unwrap_err();
        assert!(matches!(err, FrameError::Backpressure { .. }));
    }

    #[test]
    fn concurrent_producer_and_consumer_conserve_bytes() {
        const TOTAL: usize = 20_000;
        let ring = Arc::new(TxRing::new(fast_config(64)).unwrap());
        let wire = MemoryWire::with_write_limit(7);

        let producer = {
            let ring = Arc::clone(&ring);
            std::thread::spawn(move || {
                for i in 0..TOTAL {
                    ring.producer().append((i % 251) as u8).unwrap();
                }
            })
        };

        let consumer = {
            let ring = Arc::clone(&ring);
            let mut wire = wire.clone();
            std::thread::spawn(move || {
                let mut drained = 0usize;
                while drained < TOTAL {
                    let n = ring.drain_to(&mut wire).unwrap();
                    if n == 0 {
                        std::thread::yield_now();
                    }
                    drained += n;
                }
            })
        };

        producer.join().unwrap();
        consumer.join().unwrap();

        let expected: Vec<u8> = (0..TOTAL).map(|i| (i % 251) as u8).collect();
        assert_eq!(wire.contents(), expected);
        assert!(ring.is_empty());
    }
}
