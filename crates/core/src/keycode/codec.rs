use super::grammar::{parse_expr, KeyExpr};
use super::table::{is_template, KeyTable, PLACEHOLDER};
use super::{CustomKeycode, KeyDesc, KeyEntry, KeyInput, KeyKind, LayerFn, MAX_CUSTOM_KEYCODES, SENTINEL};
use crate::error::{Error, Result};
use crate::keyboard::KeyboardInfo;
use tracing::{debug, warn};

/// Keycode codec for one session.
///
/// Lookups consult the session's custom keycodes first, then the shared
/// base table. The base table is never modified.
#[derive(Debug, Clone)]
pub struct Keycodes {
    base: &'static KeyTable,
    overlay: KeyTable,
}

impl Keycodes {
    /// Codec with no custom keycodes.
    pub fn standard() -> Result<Self> {
        Ok(Self {
            base: KeyTable::base()?,
            overlay: KeyTable::new(),
        })
    }

    /// Codec with a keyboard's custom keycodes injected into the `USERnn` slots.
    ///
    /// Each custom keycode at index `i` is reachable by its own name and by
    /// `USERi`, which becomes an alias of the custom name. Entries past the
    /// last slot, names already taken and template-shaped names are skipped.
    pub fn with_custom_keycodes(custom: &[CustomKeycode]) -> Result<Self> {
        let mut codec = Self::standard()?;
        if custom.len() > usize::from(MAX_CUSTOM_KEYCODES) {
            warn!(
                count = custom.len(),
                max = MAX_CUSTOM_KEYCODES,
                "Too many custom keycodes, extra entries ignored"
            );
        }
        for (slot, ck) in (0..MAX_CUSTOM_KEYCODES).zip(custom) {
            codec.inject(slot, ck)?;
        }
        debug!(injected = codec.overlay.len() / 2, "Custom keycodes loaded");
        Ok(codec)
    }

    /// Codec for the connected keyboard.
    pub fn for_keyboard(kb: &KeyboardInfo) -> Result<Self> {
        Self::with_custom_keycodes(&kb.custom_keycodes)
    }

    fn inject(&mut self, slot: u8, ck: &CustomKeycode) -> Result<()> {
        if ck.name.is_empty() {
            return Ok(());
        }
        if self.base.contains(&ck.name) || self.overlay.contains(&ck.name) {
            warn!(name = %ck.name, slot, "Custom keycode name already taken, skipped");
            return Ok(());
        }
        if is_template(&ck.name) {
            warn!(name = %ck.name, slot, "Custom keycode name is a template pattern, skipped");
            return Ok(());
        }
        let user_id = format!("USER{slot:02}");
        let code = self
            .base
            .get(&user_id)
            .map(|e| e.code)
            .ok_or_else(|| Error::InvalidKeyTable(format!("missing slot {user_id}")))?;

        let label = if ck.short_name.is_empty() {
            &ck.name
        } else {
            &ck.short_name
        };
        let title = if ck.title.is_empty() { &ck.name } else { &ck.title };
        let entry = KeyEntry::new(code, &ck.name, label, title, KeyKind::Custom(slot));

        self.overlay.insert_as(user_id.clone(), entry.clone())?;
        self.overlay.insert(entry)?;
        self.overlay.alias(&user_id, &ck.name)
    }

    fn entry(&self, id: &str) -> Option<&KeyEntry> {
        self.overlay.get(id).or_else(|| self.base.get(id))
    }

    fn name_of(&self, code: u16) -> Option<&str> {
        self.overlay
            .name_of(code)
            .or_else(|| self.base.name_of(code))
    }

    /// Resolve an alias to its canonical identifier.
    ///
    /// Hex literals and unknown identifiers come back unchanged.
    pub fn canonical<'a>(&'a self, input: &'a str) -> &'a str {
        if input.starts_with("0x") {
            return input;
        }
        self.overlay
            .resolve_alias(input)
            .or_else(|| self.base.resolve_alias(input))
            .unwrap_or(input)
    }

    /// Entry for an identifier or alias.
    pub fn lookup(&self, id: &str) -> Option<&KeyEntry> {
        self.entry(self.canonical(id))
    }

    /// Render a code as text.
    ///
    /// Codes in a template's range render as `WRAP(KEY)`; otherwise the
    /// owning name is used. Codes with no name come back as hex.
    pub fn stringify(&self, code: u16) -> String {
        let modmask = code & 0xFF00;
        let keyid = code & 0x00FF;

        if modmask != 0 {
            if let Some(key) = self.name_of(keyid) {
                let Some(mask) = self.name_of(modmask) else {
                    return format!("0x{code:04x}");
                };
                if is_template(mask) {
                    return mask.replacen(PLACEHOLDER, &format!("({key})"), 1);
                }
                if keyid == 0 {
                    return mask.to_string();
                }
                return match self.name_of(code) {
                    Some(name) => name.to_string(),
                    None => format!("0x{code:04x}"),
                };
            }
        }

        match self.name_of(code) {
            Some(name) => name.to_string(),
            None => format!("0x{code:x}"),
        }
    }

    /// Parse keycode text into a code.
    ///
    /// Tries, in order: the sentinel, a table identifier or alias, a
    /// `WRAP(KEY)` composite, a hex literal and a decimal number.
    pub fn parse(&self, input: &str) -> Result<u16> {
        let text = self.canonical(input);
        if let Some(entry) = self.entry(text) {
            return Ok(entry.code);
        }

        match parse_expr(text) {
            Ok(KeyExpr::Sentinel) => return Ok(SENTINEL),
            Ok(KeyExpr::HexLiteral(code)) => return Ok(code),
            Ok(KeyExpr::Composite { func, arg }) => {
                if let Some(code) = self.composite_code(func, arg) {
                    return Ok(code);
                }
            }
            Ok(KeyExpr::Plain(_)) | Err(_) => {}
        }

        text.parse::<u16>()
            .map_err(|_| Error::UnparseableKeycode(input.to_string()))
    }

    /// Parse a number-or-name input. `-1` and `0xFF` map to the sentinel.
    pub fn parse_input(&self, input: &KeyInput) -> Result<u16> {
        match input {
            KeyInput::Code(-1) => Ok(SENTINEL),
            KeyInput::Code(n) => {
                u16::try_from(*n).map_err(|_| Error::UnparseableKeycode(n.to_string()))
            }
            KeyInput::Name(s) => self.parse(s),
        }
    }

    fn composite_code(&self, func: &str, arg: &str) -> Option<u16> {
        let template = format!("{func}{PLACEHOLDER}");
        let mask = self.lookup(&template)?.code;
        let arg = if arg == "kc" { "KC_NO" } else { arg };
        let key = self.lookup(arg)?.code;
        mask.checked_add(key)
    }

    /// Table entry for a number-or-name input.
    ///
    /// Numbers (and numeric text) resolve through the code's canonical name.
    /// Returns `None`, with a warning, when nothing matches.
    pub fn define<'a>(&'a self, input: &'a KeyInput) -> Option<&'a KeyEntry> {
        let code = match input {
            KeyInput::Code(n) => Some(u16::try_from(*n).ok()),
            KeyInput::Name(s) => numeric_text(s),
        };
        let found = match code {
            Some(Some(code)) => self.name_of(code).and_then(|name| self.entry(name)),
            Some(None) => None,
            None => match input {
                KeyInput::Name(s) => self.lookup(s),
                KeyInput::Code(_) => None,
            },
        };
        if found.is_none() {
            warn!(?input, "Unknown keycode");
        }
        found
    }

    /// Describe a keycode for display. Never fails: unknown text comes back
    /// as [`KeyDesc::Broken`].
    pub fn parse_desc(&self, input: &str) -> KeyDesc {
        let text = self.canonical(input);
        let expr = parse_expr(text).ok();

        if let Some(KeyExpr::Composite { func, arg }) = expr {
            if let (Some(function), Ok(index)) = (LayerFn::from_name(func), arg.parse::<u8>()) {
                return KeyDesc::Layer { function, index };
            }
        }
        if let Some(index) = text
            .strip_prefix('M')
            .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|n| n.parse::<u8>().ok())
        {
            return KeyDesc::Macro { index };
        }
        if let Some(KeyExpr::Composite { func, arg }) = expr {
            if func == "TD" {
                if let Ok(index) = arg.parse::<u8>() {
                    return KeyDesc::TapDance { index };
                }
            }
            let wrapper = self
                .lookup(&format!("{func}{PLACEHOLDER}"))
                .or_else(|| self.lookup(func));
            let key = self.lookup(if arg == "kc" { "KC_NO" } else { arg });
            if let (Some(wrapper), Some(key)) = (wrapper, key) {
                return KeyDesc::Key {
                    display: format!("{}{}", wrapper.label.replacen(PLACEHOLDER, "", 1), key.label),
                    title: Some(key.title.clone()),
                };
            }
        }
        if let Some(entry) = self.entry(text) {
            return KeyDesc::Key {
                display: entry.label.clone(),
                title: Some(entry.title.clone()),
            };
        }
        if text.starts_with("0x") {
            return KeyDesc::Key {
                display: text.to_string(),
                title: None,
            };
        }
        KeyDesc::Broken {
            title: input.to_string(),
        }
    }
}

/// Decimal or `0x` hex text as a code; `Some(None)` if numeric but out of range.
fn numeric_text(s: &str) -> Option<Option<u16>> {
    if let Some(digits) = s.strip_prefix("0x") {
        if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Some(u16::from_str_radix(digits, 16).ok());
        }
        return None;
    }
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        return Some(s.parse().ok());
    }
    None
}
