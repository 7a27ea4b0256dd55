/// Errors that can occur while running a link.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] hdlcmux_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] hdlcmux_frame::FrameError),

    /// The inbound byte stream ended.
    #[error("link disconnected: {0}")]
    Disconnected(String),

    /// The transmit worker has exited; nothing queued now would be sent.
    #[error("tx worker stopped")]
    WorkerStopped,

    /// The transmit worker could not flush or exit cleanly.
    #[error("shutdown failed: {0}")]
    ShutdownFailed(String),
}

pub type Result<T> = std::result::Result<T, LinkError>;
