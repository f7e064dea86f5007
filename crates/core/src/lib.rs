//! open-vial-core: VIA/Vial keyboard protocol, buffer transfers, and keycode codec.
//!
//! This crate provides the cross-platform core logic for configuring
//! VIA/Vial keyboards over raw HID: report framing, one-at-a-time command
//! dispatch, response decoding, chunked buffer and dynamic-entry transfers,
//! and conversion between QMK keycode text and 16-bit codes.

pub mod buffer;
pub mod comm;
pub mod decode;
pub mod device;
pub mod dynamic;
pub mod error;
pub mod keyboard;
pub mod keycode;
pub mod protocol;
pub mod transport;

pub use comm::Dispatcher;
pub use error::{Error, Result};
