use std::time::Duration;

/// Errors that can occur while building, queuing or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// A fixed buffer was configured with an unusable size.
    #[error("invalid capacity {capacity}: {reason}")]
    InvalidCapacity {
        capacity: usize,
        reason: &'static str,
    },

    /// A fixed buffer could not be allocated at construction.
    #[error("failed to allocate {bytes}-byte buffer")]
    AllocationFailed { bytes: usize },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The transmit ring stayed full for longer than the configured append timeout.
    #[error("tx ring still full after {waited:?}")]
    Backpressure { waited: Duration },

    /// An I/O error occurred while handing bytes to the transport.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
