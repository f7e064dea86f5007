//! QMK keycodes: textual identifiers ↔ 16-bit codes.
//!
//! A keycode is either a plain identifier (`KC_A`, `MO(2)`, `M5`) or a
//! composite `WRAP(KEY)` where `WRAP(kc)` is a template whose code occupies
//! the high byte and `KEY` a basic key in the low byte. Composites are
//! numerically the sum of both codes.
//!
//! [`Keycodes`] is the codec for one session: the static base table plus the
//! connected keyboard's custom keycodes.

mod codec;
pub mod grammar;
mod keymap;
mod table;

pub use codec::Keycodes;
pub use keymap::{parse_keymap, stringify_keymap};
pub use table::{is_template, KeyTable, PLACEHOLDER};

use serde::{Deserialize, Serialize};

/// "Transparent / no-op" sentinel accepted from UI input.
pub const SENTINEL: u16 = 0x00FF;

pub const MAX_LAYERS: u8 = 32;
pub const MAX_MACROS: u8 = 127;
pub const MAX_TAP_DANCES: u8 = 255;
pub const MAX_CUSTOM_KEYCODES: u8 = 64;

/// Layer-switching keycode families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LayerFn {
    Mo,
    Df,
    Tg,
    Tt,
    Osl,
    To,
}

impl LayerFn {
    pub const ALL: [LayerFn; 6] = [
        LayerFn::To,
        LayerFn::Mo,
        LayerFn::Df,
        LayerFn::Tg,
        LayerFn::Osl,
        LayerFn::Tt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LayerFn::Mo => "MO",
            LayerFn::Df => "DF",
            LayerFn::Tg => "TG",
            LayerFn::Tt => "TT",
            LayerFn::Osl => "OSL",
            LayerFn::To => "TO",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }

    /// Code of layer 0; layer `n` is this plus `n`.
    pub fn base_code(self) -> u16 {
        match self {
            LayerFn::To => 0x5200,
            LayerFn::Mo => 0x5220,
            LayerFn::Df => 0x5240,
            LayerFn::Tg => 0x5260,
            LayerFn::Osl => 0x5280,
            LayerFn::Tt => 0x52C0,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            LayerFn::Mo => "Momentarily turn on layer",
            LayerFn::Df => "Set default layer",
            LayerFn::Tg => "Toggle layer",
            LayerFn::Tt => "Momentary on hold, toggle on tap",
            LayerFn::Osl => "One-shot layer",
            LayerFn::To => "Turn on layer",
        }
    }
}

/// What kind of key an entry describes, fixed when the table is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    Plain,
    Layer { function: LayerFn, layer: u8 },
    Macro(u8),
    TapDance(u8),
    Custom(u8),
}

/// One key table entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    pub code: u16,
    /// Canonical identifier.
    pub id: String,
    /// Short label for a key cap; may contain a line break.
    pub label: String,
    pub title: String,
    pub kind: KeyKind,
}

impl KeyEntry {
    pub fn new(code: u16, id: &str, label: &str, title: &str, kind: KeyKind) -> Self {
        Self {
            code,
            id: id.to_string(),
            label: label.to_string(),
            title: title.to_string(),
            kind,
        }
    }
}

/// Keyboard-defined keycode occupying one `USERnn` slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomKeycode {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, rename = "shortName")]
    pub short_name: String,
}

/// Keycode as it arrives from a UI or a saved layout: a number or a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyInput {
    Code(i64),
    Name(String),
}

impl KeyInput {
    /// Empty name or zero code.
    pub fn is_blank(&self) -> bool {
        match self {
            KeyInput::Code(n) => *n == 0,
            KeyInput::Name(s) => s.is_empty(),
        }
    }
}

impl From<u16> for KeyInput {
    fn from(code: u16) -> Self {
        KeyInput::Code(code.into())
    }
}

impl From<&str> for KeyInput {
    fn from(name: &str) -> Self {
        KeyInput::Name(name.to_string())
    }
}

impl From<String> for KeyInput {
    fn from(name: String) -> Self {
        KeyInput::Name(name)
    }
}

/// Display description of a keycode, as produced by [`Keycodes::parse_desc`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyDesc {
    Layer { function: LayerFn, index: u8 },
    Macro { index: u8 },
    TapDance { index: u8 },
    Key { display: String, title: Option<String> },
    /// Nothing matched; carries the raw input.
    Broken { title: String },
}
