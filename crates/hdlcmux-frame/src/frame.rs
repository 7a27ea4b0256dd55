use bytes::Bytes;

use crate::channel::channel_name;
use crate::control;

/// A validated frame with its CRC trailer stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Channel address.
    pub address: u8,
    /// Control byte.
    pub control: u8,
    /// Logical payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(address: u8, control: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            address,
            control,
            payload: payload.into(),
        }
    }

    /// Supervisory frame acknowledging `self`, if `self` expects one.
    pub fn ack(&self) -> Option<Frame> {
        self.is_information()
            .then(|| Frame::new(self.address, control::ack_for(self.control), Bytes::new()))
    }

    pub fn is_information(&self) -> bool {
        control::is_information(self.control)
    }

    pub fn sequence(&self) -> u8 {
        control::sequence(self.control)
    }

    pub fn channel_name(&self) -> &'static str {
        channel_name(self.address)
    }
}
