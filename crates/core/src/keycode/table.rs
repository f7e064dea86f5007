//! Keycode tables.
//!
//! The base table is built once from static data and never changes. A
//! session's custom keycodes live in a second, much smaller [`KeyTable`]
//! that the codec consults first.

use super::{KeyEntry, KeyKind, LayerFn, MAX_CUSTOM_KEYCODES, MAX_LAYERS, MAX_MACROS, MAX_TAP_DANCES};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Placeholder that marks a modifier/function template, e.g. `LCTL(kc)`.
pub const PLACEHOLDER: &str = "(kc)";

/// Identifier → entry map with aliases and a reverse code → name index.
#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    entries: HashMap<String, KeyEntry>,
    aliases: HashMap<String, String>,
    names: HashMap<u16, String>,
}

/// Whether `id` is a template like `LCTL(kc)`: word characters, then the placeholder.
pub fn is_template(id: &str) -> bool {
    id.find(PLACEHOLDER).is_some_and(|pos| {
        pos > 0
            && id[..pos]
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

impl KeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide base table.
    pub fn base() -> Result<&'static KeyTable> {
        static BASE: OnceLock<std::result::Result<KeyTable, String>> = OnceLock::new();
        BASE.get_or_init(|| build_base().map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|msg| Error::InvalidKeyTable(msg.clone()))
    }

    /// Register `entry` under its own canonical id.
    pub fn insert(&mut self, entry: KeyEntry) -> Result<()> {
        let key = entry.id.clone();
        self.insert_as(key, entry)
    }

    /// Register `entry` under `key`, which may differ from `entry.id`.
    ///
    /// Rejects duplicate keys, a code already owned by another canonical id,
    /// and templates whose code overlaps the base-key byte (the composite
    /// rule adds mask and key codes, so a template's low byte must be zero).
    pub fn insert_as(&mut self, key: String, entry: KeyEntry) -> Result<()> {
        if self.entries.contains_key(&key) {
            return Err(Error::InvalidKeyTable(format!("duplicate identifier {key}")));
        }
        if is_template(&entry.id) && entry.code & 0x00FF != 0 {
            return Err(Error::InvalidKeyTable(format!(
                "template {} has code 0x{:04X} overlapping the key byte",
                entry.id, entry.code
            )));
        }
        match self.names.get(&entry.code) {
            Some(owner) if *owner != entry.id => {
                return Err(Error::InvalidKeyTable(format!(
                    "code 0x{:04X} claimed by both {owner} and {}",
                    entry.code, entry.id
                )));
            }
            Some(_) => {}
            None => {
                self.names.insert(entry.code, entry.id.clone());
            }
        }
        self.entries.insert(key, entry);
        Ok(())
    }

    /// Register `from` as an alternate spelling of `to`, which must exist.
    pub fn alias(&mut self, from: &str, to: &str) -> Result<()> {
        if !self.entries.contains_key(to) {
            return Err(Error::InvalidKeyTable(format!(
                "alias {from} points at unknown {to}"
            )));
        }
        if self.aliases.contains_key(from) {
            return Err(Error::InvalidKeyTable(format!("duplicate alias {from}")));
        }
        self.aliases.insert(from.to_string(), to.to_string());
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&KeyEntry> {
        self.entries.get(id)
    }

    pub fn resolve_alias(&self, id: &str) -> Option<&str> {
        self.aliases.get(id).map(String::as_str)
    }

    /// Canonical name owning `code`.
    pub fn name_of(&self, code: u16) -> Option<&str> {
        self.names.get(&code).map(String::as_str)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id) || self.aliases.contains_key(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &KeyEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn add(&mut self, code: u16, id: &str, label: &str, title: &str) -> Result<()> {
        self.insert(KeyEntry::new(code, id, label, title, KeyKind::Plain))
    }
}

// Basic HID usage page keys.
const BASIC: &[(u16, &str, &str, &str)] = &[
    (0x0000, "KC_NO", "", "Nothing"),
    (0x0001, "KC_TRNS", "▽", "Pass-through"),
    (0x0028, "KC_ENT", "Enter", "Enter"),
    (0x0029, "KC_ESC", "Esc", "Escape"),
    (0x002A, "KC_BSPC", "Bksp", "Backspace"),
    (0x002B, "KC_TAB", "Tab", "Tab"),
    (0x002C, "KC_SPC", "Space", "Space"),
    (0x002D, "KC_MINS", "_\n-", "- and _"),
    (0x002E, "KC_EQL", "+\n=", "= and +"),
    (0x002F, "KC_LBRC", "{\n[", "[ and {"),
    (0x0030, "KC_RBRC", "}\n]", "] and }"),
    (0x0031, "KC_BSLS", "|\n\\", "\\ and |"),
    (0x0032, "KC_NUHS", "~\n#", "Non-US # and ~"),
    (0x0033, "KC_SCLN", ":\n;", "; and :"),
    (0x0034, "KC_QUOT", "\"\n'", "' and \""),
    (0x0035, "KC_GRV", "~\n`", "` and ~"),
    (0x0036, "KC_COMM", "<\n,", ", and <"),
    (0x0037, "KC_DOT", ">\n.", ". and >"),
    (0x0038, "KC_SLSH", "?\n/", "/ and ?"),
    (0x0039, "KC_CAPS", "Caps\nLock", "Caps Lock"),
    (0x0046, "KC_PSCR", "Print\nScreen", "Print Screen"),
    (0x0047, "KC_SCRL", "Scroll\nLock", "Scroll Lock"),
    (0x0048, "KC_PAUS", "Pause", "Pause"),
    (0x0049, "KC_INS", "Insert", "Insert"),
    (0x004A, "KC_HOME", "Home", "Home"),
    (0x004B, "KC_PGUP", "Page\nUp", "Page Up"),
    (0x004C, "KC_DEL", "Del", "Delete"),
    (0x004D, "KC_END", "End", "End"),
    (0x004E, "KC_PGDN", "Page\nDown", "Page Down"),
    (0x004F, "KC_RGHT", "Right", "Right"),
    (0x0050, "KC_LEFT", "Left", "Left"),
    (0x0051, "KC_DOWN", "Down", "Down"),
    (0x0052, "KC_UP", "Up", "Up"),
    (0x0053, "KC_NUM", "Num\nLock", "Num Lock"),
    (0x0054, "KC_PSLS", "/", "Keypad /"),
    (0x0055, "KC_PAST", "*", "Keypad *"),
    (0x0056, "KC_PMNS", "-", "Keypad -"),
    (0x0057, "KC_PPLS", "+", "Keypad +"),
    (0x0058, "KC_PENT", "Num\nEnter", "Keypad Enter"),
    (0x0062, "KC_P0", "0", "Keypad 0"),
    (0x0063, "KC_PDOT", ".", "Keypad ."),
    (0x0064, "KC_NUBS", "|\n\\", "Non-US \\ and |"),
    (0x0065, "KC_APP", "Menu", "Application"),
    (0x0066, "KC_KB_POWER", "Power", "Keyboard Power"),
    (0x0067, "KC_PEQL", "=", "Keypad ="),
    (0x0074, "KC_EXEC", "Exec", "Execute"),
    (0x0075, "KC_HELP", "Help", "Help"),
    (0x0076, "KC_MENU", "Menu", "Menu"),
    (0x0077, "KC_SLCT", "Select", "Select"),
    (0x0078, "KC_STOP", "Stop", "Stop"),
    (0x0079, "KC_AGIN", "Again", "Again"),
    (0x007A, "KC_UNDO", "Undo", "Undo"),
    (0x007B, "KC_CUT", "Cut", "Cut"),
    (0x007C, "KC_COPY", "Copy", "Copy"),
    (0x007D, "KC_PSTE", "Paste", "Paste"),
    (0x007E, "KC_FIND", "Find", "Find"),
    (0x0087, "KC_INT1", "Ro", "International 1"),
    (0x0088, "KC_INT2", "Kana", "International 2"),
    (0x0089, "KC_INT3", "¥", "International 3"),
    (0x008A, "KC_INT4", "Henkan", "International 4"),
    (0x008B, "KC_INT5", "Muhenkan", "International 5"),
    (0x0090, "KC_LNG1", "Han/Eng", "Language 1"),
    (0x0091, "KC_LNG2", "Hanja", "Language 2"),
    (0x00A5, "KC_PWR", "Sys\nPower", "System Power"),
    (0x00A6, "KC_SLEP", "Sys\nSleep", "System Sleep"),
    (0x00A7, "KC_WAKE", "Sys\nWake", "System Wake"),
    (0x00A8, "KC_MUTE", "Mute", "Audio Mute"),
    (0x00A9, "KC_VOLU", "Vol +", "Volume Up"),
    (0x00AA, "KC_VOLD", "Vol -", "Volume Down"),
    (0x00AB, "KC_MNXT", "Media\nNext", "Next Track"),
    (0x00AC, "KC_MPRV", "Media\nPrev", "Previous Track"),
    (0x00AD, "KC_MSTP", "Media\nStop", "Media Stop"),
    (0x00AE, "KC_MPLY", "Media\nPlay", "Play/Pause"),
    (0x00AF, "KC_MSEL", "Media\nSelect", "Media Select"),
    (0x00B0, "KC_EJCT", "Eject", "Eject"),
    (0x00B1, "KC_MAIL", "Mail", "Launch Mail"),
    (0x00B2, "KC_CALC", "Calc", "Launch Calculator"),
    (0x00B3, "KC_MYCM", "My\nComp", "Launch My Computer"),
    (0x00B4, "KC_WSCH", "Web\nSearch", "Browser Search"),
    (0x00B5, "KC_WHOM", "Web\nHome", "Browser Home"),
    (0x00B6, "KC_WBAK", "Web\nBack", "Browser Back"),
    (0x00B7, "KC_WFWD", "Web\nFwd", "Browser Forward"),
    (0x00B8, "KC_WSTP", "Web\nStop", "Browser Stop"),
    (0x00B9, "KC_WREF", "Web\nRefr", "Browser Refresh"),
    (0x00BA, "KC_WFAV", "Web\nFav", "Browser Favorites"),
    (0x00BB, "KC_MFFD", "Fast\nFwd", "Fast Forward"),
    (0x00BC, "KC_MRWD", "Rewind", "Rewind"),
    (0x00BD, "KC_BRIU", "Bright\nUp", "Brightness Up"),
    (0x00BE, "KC_BRID", "Bright\nDown", "Brightness Down"),
    (0x00CD, "KC_MS_U", "Mouse\nUp", "Mouse Up"),
    (0x00CE, "KC_MS_D", "Mouse\nDown", "Mouse Down"),
    (0x00CF, "KC_MS_L", "Mouse\nLeft", "Mouse Left"),
    (0x00D0, "KC_MS_R", "Mouse\nRight", "Mouse Right"),
    (0x00D1, "KC_BTN1", "Mouse\n1", "Mouse Button 1"),
    (0x00D2, "KC_BTN2", "Mouse\n2", "Mouse Button 2"),
    (0x00D3, "KC_BTN3", "Mouse\n3", "Mouse Button 3"),
    (0x00D4, "KC_BTN4", "Mouse\n4", "Mouse Button 4"),
    (0x00D5, "KC_BTN5", "Mouse\n5", "Mouse Button 5"),
    (0x00D9, "KC_WH_U", "Wheel\nUp", "Mouse Wheel Up"),
    (0x00DA, "KC_WH_D", "Wheel\nDown", "Mouse Wheel Down"),
    (0x00DB, "KC_WH_L", "Wheel\nLeft", "Mouse Wheel Left"),
    (0x00DC, "KC_WH_R", "Wheel\nRight", "Mouse Wheel Right"),
    (0x00DD, "KC_ACL0", "Accel\n0", "Mouse Acceleration 0"),
    (0x00DE, "KC_ACL1", "Accel\n1", "Mouse Acceleration 1"),
    (0x00DF, "KC_ACL2", "Accel\n2", "Mouse Acceleration 2"),
    (0x00E0, "KC_LCTL", "LCtrl", "Left Control"),
    (0x00E1, "KC_LSFT", "LShift", "Left Shift"),
    (0x00E2, "KC_LALT", "LAlt", "Left Alt"),
    (0x00E3, "KC_LGUI", "LGui", "Left GUI"),
    (0x00E4, "KC_RCTL", "RCtrl", "Right Control"),
    (0x00E5, "KC_RSFT", "RShift", "Right Shift"),
    (0x00E6, "KC_RALT", "RAlt", "Right Alt"),
    (0x00E7, "KC_RGUI", "RGui", "Right GUI"),
];

// Modifier wrappers: QK_MODS range, mask in the high byte.
const MODIFIER_TEMPLATES: &[(u16, &str, &str, &str)] = &[
    (0x0100, "LCTL(kc)", "LCtl\n(kc)", "Left Control + key"),
    (0x0200, "LSFT(kc)", "LSft\n(kc)", "Left Shift + key"),
    (0x0300, "C_S(kc)", "LCS\n(kc)", "Left Control + Left Shift + key"),
    (0x0400, "LALT(kc)", "LAlt\n(kc)", "Left Alt + key"),
    (0x0500, "LCA(kc)", "LCA\n(kc)", "Left Control + Left Alt + key"),
    (0x0600, "LSA(kc)", "LSA\n(kc)", "Left Shift + Left Alt + key"),
    (0x0700, "MEH(kc)", "Meh\n(kc)", "Left Control + Shift + Alt + key"),
    (0x0800, "LGUI(kc)", "LGui\n(kc)", "Left GUI + key"),
    (0x0A00, "SGUI(kc)", "SGui\n(kc)", "Left Shift + Left GUI + key"),
    (0x0D00, "LCAG(kc)", "LCAG\n(kc)", "Left Control + Alt + GUI + key"),
    (0x0F00, "HYPR(kc)", "Hypr\n(kc)", "Left Control + Shift + Alt + GUI + key"),
    (0x1100, "RCTL(kc)", "RCtl\n(kc)", "Right Control + key"),
    (0x1200, "RSFT(kc)", "RSft\n(kc)", "Right Shift + key"),
    (0x1400, "RALT(kc)", "RAlt\n(kc)", "Right Alt + key"),
    (0x1800, "RGUI(kc)", "RGui\n(kc)", "Right GUI + key"),
];

// Mod-tap: hold for modifier, tap for key.
const MOD_TAP_TEMPLATES: &[(u16, &str, &str, &str)] = &[
    (0x2100, "LCTL_T(kc)", "LCtl_T\n(kc)", "Left Control when held, key when tapped"),
    (0x2200, "LSFT_T(kc)", "LSft_T\n(kc)", "Left Shift when held, key when tapped"),
    (0x2300, "C_S_T(kc)", "LCS_T\n(kc)", "Left Control + Shift when held, key when tapped"),
    (0x2400, "LALT_T(kc)", "LAlt_T\n(kc)", "Left Alt when held, key when tapped"),
    (0x2500, "LCA_T(kc)", "LCA_T\n(kc)", "Left Control + Alt when held, key when tapped"),
    (0x2700, "MEH_T(kc)", "Meh_T\n(kc)", "Meh when held, key when tapped"),
    (0x2800, "LGUI_T(kc)", "LGui_T\n(kc)", "Left GUI when held, key when tapped"),
    (0x2A00, "SGUI_T(kc)", "SGui_T\n(kc)", "Left Shift + GUI when held, key when tapped"),
    (0x2D00, "LCAG_T(kc)", "LCAG_T\n(kc)", "Left Control + Alt + GUI when held, key when tapped"),
    (0x2F00, "ALL_T(kc)", "Hypr_T\n(kc)", "Hyper when held, key when tapped"),
    (0x3100, "RCTL_T(kc)", "RCtl_T\n(kc)", "Right Control when held, key when tapped"),
    (0x3200, "RSFT_T(kc)", "RSft_T\n(kc)", "Right Shift when held, key when tapped"),
    (0x3400, "RALT_T(kc)", "RAlt_T\n(kc)", "Right Alt when held, key when tapped"),
    (0x3800, "RGUI_T(kc)", "RGui_T\n(kc)", "Right GUI when held, key when tapped"),
    (0x3D00, "RCAG_T(kc)", "RCAG_T\n(kc)", "Right Control + Alt + GUI when held, key when tapped"),
];

// Backlight, RGB and firmware keys (QK_LIGHTING / QK_QUANTUM ranges).
const QUANTUM: &[(u16, &str, &str, &str)] = &[
    (0x7800, "BL_ON", "BL On", "Backlight On"),
    (0x7801, "BL_OFF", "BL Off", "Backlight Off"),
    (0x7802, "BL_TOGG", "BL\nToggle", "Toggle Backlight"),
    (0x7803, "BL_DOWN", "BL -", "Decrease Backlight"),
    (0x7804, "BL_UP", "BL +", "Increase Backlight"),
    (0x7805, "BL_STEP", "BL\nCycle", "Cycle Backlight"),
    (0x7806, "BL_BRTG", "BL\nBreath", "Toggle Backlight Breathing"),
    (0x7820, "RGB_TOG", "RGB\nToggle", "Toggle RGB Lighting"),
    (0x7821, "RGB_MOD", "RGB\nMode +", "Next RGB Mode"),
    (0x7822, "RGB_RMOD", "RGB\nMode -", "Previous RGB Mode"),
    (0x7823, "RGB_HUI", "Hue +", "Increase Hue"),
    (0x7824, "RGB_HUD", "Hue -", "Decrease Hue"),
    (0x7825, "RGB_SAI", "Sat +", "Increase Saturation"),
    (0x7826, "RGB_SAD", "Sat -", "Decrease Saturation"),
    (0x7827, "RGB_VAI", "Bright +", "Increase Value"),
    (0x7828, "RGB_VAD", "Bright -", "Decrease Value"),
    (0x7829, "RGB_SPI", "Effect +", "Increase RGB Speed"),
    (0x782A, "RGB_SPD", "Effect -", "Decrease RGB Speed"),
    (0x7C00, "QK_BOOT", "Reset", "Enter bootloader"),
    (0x7C01, "QK_REBOOT", "Reboot", "Reboot the keyboard"),
    (0x7C02, "QK_DEBUG_TOGGLE", "Debug", "Toggle debug mode"),
    (0x7C03, "QK_CLEAR_EEPROM", "Clear\nEEPROM", "Reinitialize EEPROM"),
    (0x7C16, "QK_GESC", "Esc\n~", "Escape, Shift+Escape sends ~"),
    (0x7C77, "QK_REPEAT_KEY", "Repeat", "Repeat the last key"),
];

const ALIASES: &[(&str, &str)] = &[
    ("XXXXXXX", "KC_NO"),
    ("KC_TRANSPARENT", "KC_TRNS"),
    ("_______", "KC_TRNS"),
    ("KC_ENTER", "KC_ENT"),
    ("KC_ESCAPE", "KC_ESC"),
    ("KC_BACKSPACE", "KC_BSPC"),
    ("KC_SPACE", "KC_SPC"),
    ("KC_MINUS", "KC_MINS"),
    ("KC_EQUAL", "KC_EQL"),
    ("KC_LEFT_BRACKET", "KC_LBRC"),
    ("KC_RIGHT_BRACKET", "KC_RBRC"),
    ("KC_BACKSLASH", "KC_BSLS"),
    ("KC_SEMICOLON", "KC_SCLN"),
    ("KC_QUOTE", "KC_QUOT"),
    ("KC_GRAVE", "KC_GRV"),
    ("KC_COMMA", "KC_COMM"),
    ("KC_SLASH", "KC_SLSH"),
    ("KC_CAPS_LOCK", "KC_CAPS"),
    ("KC_PRINT_SCREEN", "KC_PSCR"),
    ("KC_SCROLL_LOCK", "KC_SCRL"),
    ("KC_PAUSE", "KC_PAUS"),
    ("KC_INSERT", "KC_INS"),
    ("KC_PAGE_UP", "KC_PGUP"),
    ("KC_DELETE", "KC_DEL"),
    ("KC_PAGE_DOWN", "KC_PGDN"),
    ("KC_RIGHT", "KC_RGHT"),
    ("KC_NUM_LOCK", "KC_NUM"),
    ("KC_KP_ENTER", "KC_PENT"),
    ("KC_APPLICATION", "KC_APP"),
    ("KC_AUDIO_MUTE", "KC_MUTE"),
    ("KC_AUDIO_VOL_UP", "KC_VOLU"),
    ("KC_AUDIO_VOL_DOWN", "KC_VOLD"),
    ("KC_MEDIA_NEXT_TRACK", "KC_MNXT"),
    ("KC_MEDIA_PREV_TRACK", "KC_MPRV"),
    ("KC_MEDIA_PLAY_PAUSE", "KC_MPLY"),
    ("KC_LEFT_CTRL", "KC_LCTL"),
    ("KC_LEFT_SHIFT", "KC_LSFT"),
    ("KC_LEFT_ALT", "KC_LALT"),
    ("KC_LEFT_GUI", "KC_LGUI"),
    ("KC_RIGHT_CTRL", "KC_RCTL"),
    ("KC_RIGHT_SHIFT", "KC_RSFT"),
    ("KC_RIGHT_ALT", "KC_RALT"),
    ("KC_RIGHT_GUI", "KC_RGUI"),
    ("C(kc)", "LCTL(kc)"),
    ("S(kc)", "LSFT(kc)"),
    ("A(kc)", "LALT(kc)"),
    ("G(kc)", "LGUI(kc)"),
    ("LOPT(kc)", "LALT(kc)"),
    ("LCMD(kc)", "LGUI(kc)"),
    ("ROPT(kc)", "RALT(kc)"),
    ("ALGR(kc)", "RALT(kc)"),
    ("RCMD(kc)", "RGUI(kc)"),
    ("SCMD(kc)", "SGUI(kc)"),
    ("CTL_T(kc)", "LCTL_T(kc)"),
    ("SFT_T(kc)", "LSFT_T(kc)"),
    ("ALT_T(kc)", "LALT_T(kc)"),
    ("GUI_T(kc)", "LGUI_T(kc)"),
    ("HYPR_T(kc)", "ALL_T(kc)"),
    ("RGB_MODE_FORWARD", "RGB_MOD"),
    ("RGB_MODE_REVERSE", "RGB_RMOD"),
    ("RESET", "QK_BOOT"),
    ("QK_RBT", "QK_REBOOT"),
    ("DB_TOGG", "QK_DEBUG_TOGGLE"),
    ("EE_CLR", "QK_CLEAR_EEPROM"),
    ("KC_GESC", "QK_GESC"),
    ("QK_REP", "QK_REPEAT_KEY"),
];

fn build_base() -> Result<KeyTable> {
    let mut t = KeyTable::new();

    for &(code, id, label, title) in BASIC
        .iter()
        .chain(MODIFIER_TEMPLATES)
        .chain(MOD_TAP_TEMPLATES)
        .chain(QUANTUM)
    {
        t.add(code, id, label, title)?;
    }

    for (i, c) in ('A'..='Z').enumerate() {
        let label = c.to_string();
        t.add(0x04 + i as u16, &format!("KC_{c}"), &label, &label)?;
    }
    for (i, c) in "1234567890".chars().enumerate() {
        let label = c.to_string();
        t.add(0x1E + i as u16, &format!("KC_{c}"), &label, &label)?;
    }
    for n in 1..=9u16 {
        t.add(0x58 + n, &format!("KC_P{n}"), &n.to_string(), &format!("Keypad {n}"))?;
    }
    for n in 1..=24u16 {
        let code = if n <= 12 { 0x39 + n } else { 0x67 + (n - 12) };
        t.add(code, &format!("KC_F{n}"), &format!("F{n}"), &format!("F{n}"))?;
    }

    for n in 0..16u16 {
        t.add(
            0x4000 | (n << 8),
            &format!("LT{n}(kc)"),
            &format!("LT {n}\n(kc)"),
            &format!("Layer {n} when held, key when tapped"),
        )?;
    }

    for function in LayerFn::ALL {
        for layer in 0..MAX_LAYERS {
            let id = format!("{}({layer})", function.as_str());
            t.insert(KeyEntry::new(
                function.base_code() + u16::from(layer),
                &id,
                &id,
                &format!("{} {layer}", function.title()),
                KeyKind::Layer { function, layer },
            ))?;
        }
    }

    for index in 0..MAX_TAP_DANCES {
        let id = format!("TD({index})");
        t.insert(KeyEntry::new(
            0x5700 + u16::from(index),
            &id,
            &id,
            &format!("Tap dance {index}"),
            KeyKind::TapDance(index),
        ))?;
    }

    for index in 0..MAX_MACROS {
        let id = format!("M{index}");
        t.insert(KeyEntry::new(
            0x7700 + u16::from(index),
            &id,
            &id,
            &format!("Macro {index}"),
            KeyKind::Macro(index),
        ))?;
    }

    for slot in 0..MAX_CUSTOM_KEYCODES {
        let id = format!("USER{slot:02}");
        t.insert(KeyEntry::new(
            0x7E00 + u16::from(slot),
            &id,
            &id,
            &format!("User {slot}"),
            KeyKind::Custom(slot),
        ))?;
    }

    for &(from, to) in ALIASES {
        t.alias(from, to)?;
    }
    Ok(t)
}
