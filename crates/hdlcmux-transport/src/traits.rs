use std::io::{ErrorKind, Write};

/// Outbound side of a link transport.
///
/// `write` must not block for long: it offers a contiguous run of bytes and
/// reports how many the wire accepted. Returning `Ok(0)` means "full, try
/// again later" and is not an error.
pub trait Transport: Send {
    /// Offer bytes to the wire. Partial acceptance is allowed.
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize>;

    /// Push any bytes buffered below this layer onto the wire.
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    /// Transport name for diagnostics.
    fn name(&self) -> &'static str;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        (**self).write(bytes)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        (**self).flush()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Adapts any `std::io::Write` into a [`Transport`].
///
/// `WouldBlock`, `TimedOut` and `Interrupted` are reported as zero bytes
/// accepted so the caller retries on its next drain.
#[derive(Debug)]
pub struct IoTransport<W> {
    inner: W,
}

impl<W: Write + Send> IoTransport<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Borrow the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume the adapter and return the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write + Send> Transport for IoTransport<W> {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        match self.inner.write(bytes) {
            Ok(n) => Ok(n),
            Err(err) if is_transient(err.kind()) => Ok(0),
            Err(err) => Err(err),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.inner.flush() {
            Err(err) if is_transient(err.kind()) => Ok(()),
            other => other,
        }
    }

    fn name(&self) -> &'static str {
        "io-writer"
    }
}

pub(crate) fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StallingWriter {
        stalls: usize,
        data: Vec<u8>,
    }

    impl Write for StallingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.stalls > 0 {
                self.stalls -= 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::from(ErrorKind::Interrupted))
        }
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn would_block_is_reported_as_zero_accepted() {
        let mut transport = IoTransport::new(StallingWriter {
            stalls: 1,
            data: Vec::new(),
        });

        assert_eq!(transport.write(b"abc").unwrap(), 0);
        assert_eq!(transport.write(b"abc").unwrap(), 3);
        assert_eq!(transport.get_ref().data, b"abc");
    }

    #[test]
    fn interrupted_flush_is_not_an_error() {
        let mut transport = IoTransport::new(StallingWriter {
            stalls: 0,
            data: Vec::new(),
        });
        transport.flush().unwrap();
    }

    #[test]
    fn hard_errors_propagate() {
        let mut transport = IoTransport::new(BrokenWriter);
        let err = transport.write(b"x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
    }

    #[test]
    fn boxed_transport_forwards() {
        let mut boxed: Box<dyn Transport> = Box::new(IoTransport::new(Vec::<u8>::new()));
        assert_eq!(boxed.write(b"hi").unwrap(), 2);
        assert_eq!(boxed.name(), "io-writer");
    }
}
