//! HID transport abstraction for device communication.
//!
//! Provides a trait-based transport layer so that real HID devices and
//! mock devices share the same interface.
//!
//! # Request serialization
//!
//! The firmware protocol has no request id: a response is matched to a
//! request only by arriving next. Only one request may be outstanding at a
//! time. [`HidTransport::send_report`] takes `&mut self`, so the borrow
//! checker rejects a second request while the first is still waiting for
//! its report. A request that times out must not leave its response behind
//! for the next caller; implementations discard stale inbound reports
//! before writing a new frame.

use crate::error::Result;
use crate::protocol::Frame;
use std::time::Duration;

/// Abstraction over one raw HID request/response exchange.
pub trait HidTransport: Send {
    /// Write one report and wait up to `timeout` for exactly one inbound report.
    ///
    /// Fails with [`crate::error::Error::ResponseTimeout`] when nothing arrives.
    fn send_report(&mut self, frame: &Frame, timeout: Duration) -> Result<Vec<u8>>;
}

impl<T: HidTransport + ?Sized> HidTransport for Box<T> {
    fn send_report(&mut self, frame: &Frame, timeout: Duration) -> Result<Vec<u8>> {
        (**self).send_report(frame, timeout)
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;
    use crate::error::Error;
    use crate::protocol::cmd;

    #[test]
    fn mock_returns_registered_response() {
        let mut mock = MockTransport::new();
        mock.on_command(cmd::GET_LAYER_COUNT, &[], &[cmd::GET_LAYER_COUNT, 0x04]);
        let frame = Frame::new(cmd::GET_LAYER_COUNT, &[]).unwrap();
        let resp = mock.send_report(&frame, Duration::from_millis(10)).unwrap();
        assert_eq!(resp[1], 0x04);
        assert_eq!(mock.sent.len(), 1);
    }

    #[test]
    fn mock_unregistered_request_times_out() {
        let mut mock = MockTransport::new();
        let frame = Frame::new(cmd::GET_PROTOCOL_VERSION, &[]).unwrap();
        let timeout = Duration::from_millis(25);
        match mock.send_report(&frame, timeout) {
            Err(Error::ResponseTimeout(d)) => assert_eq!(d, timeout),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn boxed_transport_forwards() {
        let mut mock = MockTransport::new();
        mock.on_command(cmd::MACRO_GET_COUNT, &[], &[cmd::MACRO_GET_COUNT, 0x10]);
        let mut boxed: Box<dyn HidTransport> = Box::new(mock);
        let frame = Frame::new(cmd::MACRO_GET_COUNT, &[]).unwrap();
        let resp = boxed.send_report(&frame, Duration::from_millis(10)).unwrap();
        assert_eq!(resp[1], 0x10);
    }
}
