use std::io::{ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};

use hdlcmux_transport::TransportError;
use tracing::{debug, trace};

use crate::error::{LinkError, Result};
use crate::handler::ChannelHandler;
use crate::receiver::LinkReceiver;

const READ_CHUNK_SIZE: usize = 256;

/// Read from `reader` and feed the receiver until `running` is cleared.
///
/// Read timeouts are expected (a UART with nothing to say) and only serve to
/// re-check `running`. Returns the number of bytes received, or
/// [`LinkError::Disconnected`] when the stream ends.
pub fn pump<R, H>(
    reader: &mut R,
    receiver: &mut LinkReceiver<H>,
    running: &AtomicBool,
) -> Result<u64>
where
    R: Read + ?Sized,
    H: ChannelHandler,
{
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    let mut total = 0u64;

    while running.load(Ordering::SeqCst) {
        let read = match reader.read(&mut chunk) {
            Ok(0) => {
                debug!(total, "inbound stream closed");
                return Err(LinkError::Disconnected("end of stream".to_string()));
            }
            Ok(n) => n,
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::Interrupted | ErrorKind::TimedOut | ErrorKind::WouldBlock
                ) =>
            {
                continue
            }
            Err(err) => return Err(TransportError::Io(err).into()),
        };

        trace!(bytes = read, "received");
        receiver.receive(&chunk[..read]);
        total += read as u64;
    }

    Ok(total)
}
