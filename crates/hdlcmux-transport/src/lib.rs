//! Transport seam for HDLC links.
//!
//! The protocol engine never owns the wire. It hands contiguous byte runs to a
//! [`Transport`] sink, which may accept fewer bytes than offered, and it is fed
//! inbound bytes by whoever reads the device:
//! - [`IoTransport`] adapts any `std::io::Write`
//! - [`MemoryWire`] records writes in memory (tests, offline encoding)
//! - `SerialTransport` drives a UART through `serialport` (feature `serial`)

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(feature = "serial")]
pub mod serial;

pub use error::{Result, TransportError};
pub use memory::MemoryWire;
pub use traits::{IoTransport, Transport};

#[cfg(feature = "serial")]
pub use serial::{open_serial, FlowControl, SerialConfig, SerialReader, SerialTransport};
