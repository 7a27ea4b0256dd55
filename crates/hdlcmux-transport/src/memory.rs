use std::sync::{Arc, Mutex, MutexGuard};

use crate::traits::Transport;

/// An in-memory wire that records everything written to it.
///
/// Clones share the same buffer, so one clone can be handed to a link as its
/// transport while another inspects what was sent. An optional per-write limit
/// simulates a UART FIFO that accepts only part of each offered run.
#[derive(Debug, Clone, Default)]
pub struct MemoryWire {
    state: Arc<Mutex<WireState>>,
}

#[derive(Debug, Default)]
struct WireState {
    bytes: Vec<u8>,
    write_limit: Option<usize>,
    write_calls: usize,
}

impl MemoryWire {
    /// Create an empty wire that accepts every offered byte.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty wire that accepts at most `limit` bytes per write.
    pub fn with_write_limit(limit: usize) -> Self {
        let wire = Self::default();
        wire.set_write_limit(Some(limit));
        wire
    }

    /// Change the per-write acceptance limit. `Some(0)` stalls the wire.
    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.lock().write_limit = limit;
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.lock().bytes.clone()
    }

    /// Take everything written so far, leaving the wire empty.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().bytes)
    }

    /// Number of bytes currently recorded.
    pub fn len(&self) -> usize {
        self.lock().bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `write` calls observed, including ones that accepted nothing.
    pub fn write_calls(&self) -> usize {
        self.lock().write_calls
    }

    fn lock(&self) -> MutexGuard<'_, WireState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Transport for MemoryWire {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        let mut state = self.lock();
        state.write_calls += 1;
        let accepted = match state.write_limit {
            Some(limit) => bytes.len().min(limit),
            None => bytes.len(),
        };
        state.bytes.extend_from_slice(&bytes[..accepted]);
        Ok(accepted)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
