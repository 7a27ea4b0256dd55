use hdlcmux_frame::{DecodeEvent, Frame};

/// Consumer of validated inbound traffic.
///
/// Debug-channel frames arrive as text lines; frames on every other accepted
/// address arrive whole.
pub trait ChannelHandler: Send {
    /// A text line from the debug channel, decoded lossily as UTF-8.
    fn on_control_line(&mut self, line: &str);

    /// A frame from a data-bearing channel.
    fn on_data_frame(&mut self, frame: &Frame);

    /// A frame was dropped (checksum failure, overflow, runt or ignored address).
    fn on_diagnostic(&mut self, event: &DecodeEvent) {
        let _ = event;
    }
}

impl<H: ChannelHandler + ?Sized> ChannelHandler for Box<H> {
    fn on_control_line(&mut self, line: &str) {
        (**self).on_control_line(line);
    }

    fn on_data_frame(&mut self, frame: &Frame) {
        (**self).on_data_frame(frame);
    }

    fn on_diagnostic(&mut self, event: &DecodeEvent) {
        (**self).on_diagnostic(event);
    }
}
