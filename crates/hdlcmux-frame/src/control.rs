//! Control byte layout.
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! ┌───────────────┬───────────┬───┐
//! │   reserved    │ sequence  │ S │
//! └───────────────┴───────────┴───┘
//! ```
//! `S` clear marks an information frame, which the receiver acknowledges with
//! a supervisory frame carrying the same sequence and `S` set.

/// Bit 0: set on supervisory (ACK) frames.
pub const SUPERVISORY: u8 = 0x01;

/// Bits 1-3: sequence number.
pub const SEQUENCE_MASK: u8 = 0x0E;

/// Control byte the host uses for unacknowledged traffic.
pub const UNACKED: u8 = 0x03;

/// True if the frame carries information and expects an acknowledgment.
pub fn is_information(control: u8) -> bool {
    control & SUPERVISORY == 0
}

/// The 3-bit sequence number.
pub fn sequence(control: u8) -> u8 {
    (control & SEQUENCE_MASK) >> 1
}

/// Control byte for an information frame with the given sequence.
pub fn information(sequence: u8) -> u8 {
    (sequence << 1) & SEQUENCE_MASK
}

/// Control byte of the acknowledgment for a received information frame.
pub fn ack_for(control: u8) -> u8 {
    (control & SEQUENCE_MASK) | SUPERVISORY
}
