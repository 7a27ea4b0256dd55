use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

use hdlcmux_transport::{FlowControl, SerialConfig};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod payload;
pub mod printer;
pub mod send;
pub mod version;

use payload::parse_byte;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one frame over a UART and flush it.
    Send(SendArgs),
    /// Listen on a UART, acknowledge and print received frames.
    Listen(ListenArgs),
    /// Print the wire bytes of one frame without opening a device.
    Encode(EncodeArgs),
    /// Decode captured wire bytes and print frames and diagnostics.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FlowArg {
    None,
    Hardware,
    Software,
}

impl From<FlowArg> for FlowControl {
    fn from(value: FlowArg) -> Self {
        match value {
            FlowArg::None => FlowControl::None,
            FlowArg::Hardware => FlowControl::Hardware,
            FlowArg::Software => FlowControl::Software,
        }
    }
}

#[derive(Args, Debug)]
pub struct SerialArgs {
    /// UART device path, e.g. /dev/ttyS4.
    pub device: String,
    /// Baud rate.
    #[arg(long, default_value_t = hdlcmux_transport::serial::DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Flow control.
    #[arg(long, value_enum, default_value = "none")]
    pub flow: FlowArg,
}

impl SerialArgs {
    pub fn config(&self) -> SerialConfig {
        SerialConfig {
            baud_rate: self.baud,
            flow_control: self.flow.into(),
            ..SerialConfig::new(self.device.clone())
        }
    }
}

#[derive(Args, Debug)]
pub struct FrameArgs {
    /// Address byte (decimal or 0x-prefixed hex).
    #[arg(long, short = 'a', default_value = "1", value_parser = parse_byte)]
    pub address: u8,
    /// Control byte (decimal or 0x-prefixed hex).
    #[arg(long, short = 'c', default_value = "0x03", value_parser = parse_byte)]
    pub control: u8,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex payload; whitespace, ':' and ',' are ignored.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub serial: SerialArgs,
    #[command(flatten)]
    pub frame: FrameArgs,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub serial: SerialArgs,
    /// Addresses to accept (comma-separated). Default: 0x01 and 0x02.
    #[arg(long = "address", value_delimiter = ',', value_parser = parse_byte)]
    pub addresses: Option<Vec<u8>>,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Do not acknowledge information frames.
    #[arg(long)]
    pub no_ack: bool,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub frame: FrameArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Captured wire bytes as hex.
    #[arg(conflicts_with = "file", required_unless_present = "file")]
    pub hex: Option<String>,
    /// Read raw captured bytes from file.
    #[arg(long)]
    pub file: Option<PathBuf>,
    /// Addresses to accept (comma-separated). Default: 0x01 and 0x02.
    #[arg(long = "address", value_delimiter = ',', value_parser = parse_byte)]
    pub addresses: Option<Vec<u8>>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
