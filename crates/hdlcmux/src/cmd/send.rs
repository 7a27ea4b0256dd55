use hdlcmux_link::{Link, LinkConfig};
use hdlcmux_transport::open_serial;

use crate::cmd::payload::resolve_payload;
use crate::cmd::printer::PrintHandler;
use crate::cmd::SendArgs;
use crate::exit::{link_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_stats, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args.frame)?;
    let (transport, _reader) =
        open_serial(&args.serial.config()).map_err(|err| transport_error("open failed", err))?;

    let link = Link::spawn(transport, PrintHandler::new(format), LinkConfig::default())
        .map_err(|err| link_error("link setup failed", err))?;
    let sender = link.sender();

    let queued = sender
        .send_frame(args.frame.address, args.frame.control, &payload)
        .map_err(|err| link_error("send failed", err))?;
    tracing::debug!(queued, device = %args.serial.device, "frame queued");

    link.shutdown()
        .map_err(|err| link_error("flush failed", err))?;
    print_stats(&sender.stats(), format);

    Ok(SUCCESS)
}
