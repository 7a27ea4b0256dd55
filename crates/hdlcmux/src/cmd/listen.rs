use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hdlcmux_link::{pump, Link, LinkConfig, LinkError};
use hdlcmux_transport::open_serial;
use tracing::info;

use crate::cmd::printer::PrintHandler;
use crate::cmd::ListenArgs;
use crate::exit::{link_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_stats, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let (transport, mut reader) =
        open_serial(&args.serial.config()).map_err(|err| transport_error("open failed", err))?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let config = link_config(&args);
    let handler = PrintHandler::new(format).with_limit(args.count, Arc::clone(&running));
    let link =
        Link::spawn(transport, handler, config).map_err(|err| link_error("link setup failed", err))?;
    let (sender, mut receiver, worker) = link.into_parts();

    let pumped = pump(&mut reader, &mut receiver, &running);
    let flushed = worker.shutdown();

    let stats = sender.stats();
    info!(
        printed = receiver.handler().printed(),
        received = stats.frames_received,
        acks = stats.acks_sent,
        checksum_failures = stats.checksum_failures,
        "listener stopped"
    );

    match pumped {
        Ok(_) => {}
        Err(LinkError::Disconnected(reason)) => info!(%reason, "device closed"),
        Err(err) => return Err(link_error("receive failed", err)),
    }
    flushed.map_err(|err| link_error("flush failed", err))?;

    if args.count.is_none() {
        print_stats(&stats, format);
    }
    Ok(SUCCESS)
}

fn link_config(args: &ListenArgs) -> LinkConfig {
    let mut config = LinkConfig {
        ack_information_frames: !args.no_ack,
        ..LinkConfig::default()
    };
    if let Some(addresses) = &args.addresses {
        config.decoder.accepted_addresses = addresses.clone();
    }
    config
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
