use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hdlcmux_frame::{DecodeEvent, Frame};
use hdlcmux_link::ChannelHandler;

use crate::output::{print_diagnostic, print_frame, print_line, OutputFormat};

/// Handler that prints everything the link delivers.
///
/// With a limit set, clears `running` once that many frames and lines have
/// been printed.
pub struct PrintHandler {
    format: OutputFormat,
    printed: usize,
    limit: Option<(usize, Arc<AtomicBool>)>,
}

impl PrintHandler {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            printed: 0,
            limit: None,
        }
    }

    pub fn with_limit(mut self, count: Option<usize>, running: Arc<AtomicBool>) -> Self {
        self.limit = count.map(|count| (count, running));
        self
    }

    pub fn printed(&self) -> usize {
        self.printed
    }

    fn count(&mut self) {
        self.printed = self.printed.saturating_add(1);
        if let Some((limit, running)) = &self.limit {
            if self.printed >= *limit {
                running.store(false, Ordering::SeqCst);
            }
        }
    }

    fn limit_reached(&self) -> bool {
        self.limit
            .as_ref()
            .is_some_and(|(limit, _)| self.printed >= *limit)
    }
}

impl ChannelHandler for PrintHandler {
    fn on_control_line(&mut self, line: &str) {
        if self.limit_reached() {
            return;
        }
        print_line(line, self.format);
        self.count();
    }

    fn on_data_frame(&mut self, frame: &Frame) {
        if self.limit_reached() {
            return;
        }
        print_frame(frame, self.format);
        self.count();
    }

    fn on_diagnostic(&mut self, event: &DecodeEvent) {
        print_diagnostic(event, self.format);
    }
}
