use hdlcmux_link::{manual, LinkConfig};
use hdlcmux_transport::MemoryWire;

use crate::cmd::payload::resolve_payload;
use crate::cmd::printer::PrintHandler;
use crate::cmd::EncodeArgs;
use crate::exit::{link_error, CliResult, SUCCESS};
use crate::output::{print_wire, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args.frame)?;
    let wire = encode(args.frame.address, args.frame.control, &payload)?;
    print_wire("wire", &wire, format);
    Ok(SUCCESS)
}

fn encode(address: u8, control: u8, payload: &[u8]) -> CliResult<Vec<u8>> {
    let handler = PrintHandler::new(OutputFormat::Raw);
    let (sender, _receiver) = manual(handler, LinkConfig::default())
        .map_err(|err| link_error("link setup failed", err))?;
    sender
        .send_frame(address, control, payload)
        .map_err(|err| link_error("encode failed", err))?;

    let mut wire = MemoryWire::new();
    sender
        .drain_to(&mut wire)
        .map_err(|err| link_error("encode failed", err))?;
    Ok(wire.take())
}
