//! VIA/Vial report framing and command identifiers.
//!
//! Every request and every response is a single fixed-size report of
//! [`MSG_LEN`] bytes. Byte 0 of a request is the command id, the remaining
//! bytes carry arguments and are zero-padded.
//!
//! Vial commands ride on top of VIA: they are sent with command id
//! [`cmd::VIAL_PREFIX`] and the Vial subcommand as the first argument byte.

use crate::error::{Error, Result};

/// Report length in bytes, both directions.
pub const MSG_LEN: usize = 32;

/// Maximum number of argument bytes after the command id.
pub const MAX_ARGS: usize = MSG_LEN - 1;

/// VIA command ids.
pub mod cmd {
    pub const GET_PROTOCOL_VERSION: u8 = 0x01;
    pub const GET_KEYBOARD_VALUE: u8 = 0x02;
    pub const SET_KEYBOARD_VALUE: u8 = 0x03;
    pub const GET_KEYCODE: u8 = 0x04;
    pub const SET_KEYCODE: u8 = 0x05;
    pub const LIGHTING_SET_VALUE: u8 = 0x07;
    pub const LIGHTING_GET_VALUE: u8 = 0x08;
    pub const LIGHTING_SAVE: u8 = 0x09;
    pub const MACRO_GET_COUNT: u8 = 0x0C;
    pub const MACRO_GET_BUFFER_SIZE: u8 = 0x0D;
    pub const MACRO_GET_BUFFER: u8 = 0x0E;
    pub const MACRO_SET_BUFFER: u8 = 0x0F;
    pub const GET_LAYER_COUNT: u8 = 0x11;
    pub const KEYMAP_GET_BUFFER: u8 = 0x12;
    /// Prefix for all Vial subcommands.
    pub const VIAL_PREFIX: u8 = 0xFE;

    /// Human-readable name for a command id (for logs).
    pub fn name(cmd: u8) -> &'static str {
        match cmd {
            GET_PROTOCOL_VERSION => "GET_PROTOCOL_VERSION",
            GET_KEYBOARD_VALUE => "GET_KEYBOARD_VALUE",
            SET_KEYBOARD_VALUE => "SET_KEYBOARD_VALUE",
            GET_KEYCODE => "GET_KEYCODE",
            SET_KEYCODE => "SET_KEYCODE",
            LIGHTING_SET_VALUE => "LIGHTING_SET_VALUE",
            LIGHTING_GET_VALUE => "LIGHTING_GET_VALUE",
            LIGHTING_SAVE => "LIGHTING_SAVE",
            MACRO_GET_COUNT => "MACRO_GET_COUNT",
            MACRO_GET_BUFFER_SIZE => "MACRO_GET_BUFFER_SIZE",
            MACRO_GET_BUFFER => "MACRO_GET_BUFFER",
            MACRO_SET_BUFFER => "MACRO_SET_BUFFER",
            GET_LAYER_COUNT => "GET_LAYER_COUNT",
            KEYMAP_GET_BUFFER => "KEYMAP_GET_BUFFER",
            VIAL_PREFIX => "VIAL_PREFIX",
            _ => "UNKNOWN",
        }
    }
}

/// Keyboard value ids for GET/SET_KEYBOARD_VALUE.
pub mod value {
    pub const LAYOUT_OPTIONS: u8 = 0x02;
}

/// Vial subcommands (sent behind [`cmd::VIAL_PREFIX`]).
pub mod vial {
    pub const GET_KEYBOARD_ID: u8 = 0x00;
    pub const GET_SIZE: u8 = 0x01;
    pub const GET_DEFINITION: u8 = 0x02;
    pub const GET_ENCODER: u8 = 0x03;
    pub const SET_ENCODER: u8 = 0x04;
    pub const GET_UNLOCK_STATUS: u8 = 0x05;
    pub const UNLOCK_START: u8 = 0x06;
    pub const UNLOCK_POLL: u8 = 0x07;
    pub const LOCK: u8 = 0x08;
    pub const QMK_SETTINGS_GET: u8 = 0x0A;
    pub const QMK_SETTINGS_SET: u8 = 0x0B;
    pub const DYNAMIC_ENTRY_OP: u8 = 0x0E;
}

/// Dynamic entry subcommands (sent behind [`vial::DYNAMIC_ENTRY_OP`]).
pub mod dynamic {
    pub const GET_NUMBER_OF_ENTRIES: u8 = 0x00;
    pub const TAP_DANCE_GET: u8 = 0x01;
    pub const TAP_DANCE_SET: u8 = 0x02;
    pub const COMBO_GET: u8 = 0x03;
    pub const COMBO_SET: u8 = 0x04;
    pub const KEY_OVERRIDE_GET: u8 = 0x05;
    pub const KEY_OVERRIDE_SET: u8 = 0x06;
}

/// Encode a value as little-endian 16-bit argument bytes.
pub fn le16(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

/// Encode a value as little-endian 32-bit argument bytes.
pub fn le32(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

/// One outgoing report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame([u8; MSG_LEN]);

impl Frame {
    /// Build a zero-filled frame with `cmd` at byte 0 and `args` from byte 1.
    ///
    /// Arguments longer than [`MAX_ARGS`] are rejected, never truncated.
    pub fn new(cmd: u8, args: &[u8]) -> Result<Self> {
        if args.len() > MAX_ARGS {
            return Err(Error::ArgsTooLarge {
                len: args.len(),
                max: MAX_ARGS,
            });
        }
        let mut buf = [0u8; MSG_LEN];
        buf[0] = cmd;
        buf[1..=args.len()].copy_from_slice(args);
        Ok(Self(buf))
    }

    /// Command id.
    pub fn cmd(&self) -> u8 {
        self.0[0]
    }

    /// Argument bytes (including zero padding).
    pub fn args(&self) -> &[u8] {
        &self.0[1..]
    }

    pub fn as_bytes(&self) -> &[u8; MSG_LEN] {
        &self.0
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
