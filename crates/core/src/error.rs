//! Error types for open-vial-core.

use std::time::Duration;
use thiserror::Error;

/// Core library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HID device communication failure.
    #[error("HID error: {0}")]
    Hid(String),

    /// Device filters did not select exactly one device.
    #[error("no device selected: {matched} devices matched the filters (expected exactly 1)")]
    NoDeviceSelected { matched: usize },

    /// A request was issued on a closed channel.
    #[error("device not open")]
    DeviceNotOpen,

    /// Command arguments do not fit in one report frame.
    #[error("command arguments too large: {len} bytes (max {max})")]
    ArgsTooLarge { len: usize, max: usize },

    /// No inbound report arrived before the deadline.
    #[error("no response within {0:?}")]
    ResponseTimeout(Duration),

    /// A decode read past the end of the response.
    #[error("response too short: {width}-byte read at offset {offset}, frame is {len} bytes")]
    ShortResponse {
        offset: usize,
        width: usize,
        len: usize,
    },

    /// Unpack format string contains an unknown width code.
    #[error("invalid unpack format: {0:?}")]
    InvalidUnpackFormat(String),

    /// Buffer read slice offset leaves no payload in a frame.
    #[error("invalid slice offset {0}: must leave payload bytes in a frame")]
    InvalidSlice(usize),

    /// Keycode text could not be turned into a number.
    #[error("unparseable keycode: {0:?}")]
    UnparseableKeycode(String),

    /// Key table construction invariant violated.
    #[error("invalid key table: {0}")]
    InvalidKeyTable(String),

    /// Write parameter outside what the keyboard reported.
    #[error("value out of range: {field} = {value} (allowed {min}..={max})")]
    OutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    /// Device returned a well-formed frame with an impossible payload.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<hidapi::HidError> for Error {
    fn from(e: hidapi::HidError) -> Self {
        Error::Hid(e.to_string())
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, Error>;
