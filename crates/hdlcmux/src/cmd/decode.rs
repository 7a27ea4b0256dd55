use std::time::Duration;

use hdlcmux_link::{manual, LinkConfig, LinkStats};
use hdlcmux_transport::MemoryWire;

use crate::cmd::payload::{parse_hex, read_file};
use crate::cmd::printer::PrintHandler;
use crate::cmd::DecodeArgs;
use crate::exit::{link_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_wire, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = match (&args.hex, &args.file) {
        (Some(hex), None) => parse_hex(hex)?,
        (None, Some(path)) => read_file(path)?,
        _ => return Err(CliError::usage("provide either <HEX> or --file")),
    };

    let mut config = LinkConfig::default();
    if let Some(addresses) = args.addresses {
        config.decoder.accepted_addresses = addresses;
    }
    let (acks, stats) = decode(&bytes, config, format)?;
    if !acks.is_empty() {
        print_wire("ack", &acks, format);
    }

    if stats.checksum_failures > 0 || stats.overflows > 0 {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

/// Bytes fed to the receiver between drains. A frame needs at least four wire
/// bytes after a shared flag and its ACK takes at most ten, so the ACKs of one
/// chunk always fit an empty default ring.
const DECODE_CHUNK: usize = 256;

/// Upper bound on a single ACK append if the ring still fills up.
const ACK_APPEND_TIMEOUT: Duration = Duration::from_millis(100);

/// Feed captured bytes through a link, printing what it delivers.
///
/// Returns the ACK bytes the link would have sent back, and its counters.
fn decode(
    bytes: &[u8],
    mut config: LinkConfig,
    format: OutputFormat,
) -> CliResult<(Vec<u8>, LinkStats)> {
    if bytes.is_empty() {
        return Err(CliError::usage("no input bytes"));
    }
    if config.ring.append_timeout.is_none() {
        config.ring.append_timeout = Some(ACK_APPEND_TIMEOUT);
    }
    let (sender, mut receiver) = manual(PrintHandler::new(format), config)
        .map_err(|err| link_error("link setup failed", err))?;

    // Nothing else drains this ring, so empty it after every chunk.
    let mut wire = MemoryWire::new();
    for chunk in bytes.chunks(DECODE_CHUNK) {
        receiver.receive(chunk);
        sender
            .drain_to(&mut wire)
            .map_err(|err| link_error("ack drain failed", err))?;
    }
    Ok((wire.take(), sender.stats()))
}
