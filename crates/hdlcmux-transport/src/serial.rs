use std::io::{Read, Write};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::{is_transient, Transport};

/// Default UART speed used by the co-processor firmware.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// UART flow control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowControl {
    /// No flow control.
    #[default]
    None,
    /// RTS/CTS.
    Hardware,
    /// XON/XOFF.
    Software,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(value: FlowControl) -> Self {
        match value {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
            FlowControl::Software => serialport::FlowControl::Software,
        }
    }
}

/// UART configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyS4`.
    pub path: String,
    pub baud_rate: u32,
    pub flow_control: FlowControl,
    /// How long a single read or write may block before reporting no progress.
    pub timeout: Duration,
}

impl SerialConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            flow_control: FlowControl::None,
            timeout: Duration::from_millis(100),
        }
    }
}

/// Outbound half of an open UART.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

/// Inbound half of an open UART.
///
/// Read timeouts surface as `ErrorKind::TimedOut`; callers treat them as
/// "no bytes yet".
pub struct SerialReader {
    port: Box<dyn serialport::SerialPort>,
}

/// Open and configure a UART, returning its outbound and inbound halves.
pub fn open_serial(config: &SerialConfig) -> Result<(SerialTransport, SerialReader)> {
    let port = serialport::new(&config.path, config.baud_rate)
        .flow_control(config.flow_control.into())
        .timeout(config.timeout)
        .open()
        .map_err(|err| TransportError::Open {
            path: config.path.clone(),
            source: err.into(),
        })?;
    let reader = port.try_clone().map_err(|err| TransportError::Open {
        path: config.path.clone(),
        source: err.into(),
    })?;

    info!(
        path = %config.path,
        baud = config.baud_rate,
        flow_control = ?config.flow_control,
        "opened uart"
    );

    Ok((SerialTransport { port }, SerialReader { port: reader }))
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        match self.port.write(bytes) {
            Ok(n) => Ok(n),
            Err(err) if is_transient(err.kind()) => {
                debug!("uart write stalled");
                Ok(0)
            }
            Err(err) => Err(err),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.port.flush() {
            Err(err) if is_transient(err.kind()) => Ok(()),
            other => other,
        }
    }

    fn name(&self) -> &'static str {
        "uart"
    }
}

impl Read for SerialReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.port.read(buf)
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port.name())
            .finish()
    }
}

impl std::fmt::Debug for SerialReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialReader")
            .field("port", &self.port.name())
            .finish()
    }
}
