//! Channel addresses.
//!
//! The address byte that follows the opening flag selects the logical channel.
//! Frames for any other address are skipped up to the next flag, which lets
//! other consumers share the wire.

/// Primary data channel (greybus traffic).
pub const DATA: u8 = 0x01;

/// Control/debug channel. Payloads are text lines from the co-processor.
pub const DEBUG: u8 = 0x02;

/// Addresses a link accepts unless configured otherwise.
pub const DEFAULT_ADDRESSES: [u8; 2] = [DATA, DEBUG];

/// Returns a human-readable name for a channel address.
pub fn channel_name(address: u8) -> &'static str {
    match address {
        DATA => "DATA",
        DEBUG => "DEBUG",
        _ => "UNKNOWN",
    }
}
