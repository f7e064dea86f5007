//! Keyboard session state and the operations that load and update it.
//!
//! Every function issues its requests through a [`Dispatcher`] one at a
//! time. Loaders fill a [`KeyboardInfo`]; updaters validate against it
//! before any I/O and keep it in sync with what was written.

use crate::buffer::{read_buffer, write_buffer};
use crate::comm::Dispatcher;
use crate::decode::DecodeSpec;
use crate::dynamic::{
    read_entries, read_entry_counts, write_entry, ComboEntry, DynamicEntry, KeyOverrideEntry,
    TapDanceEntry,
};
use crate::error::{Error, Result};
use crate::keycode::CustomKeycode;
use crate::protocol::{cmd, le16, le32, value, vial, MSG_LEN};
use crate::transport::HidTransport;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Largest keyboard definition accepted from firmware.
pub const MAX_DEFINITION_SIZE: u32 = 1 << 20;

/// Macro buffer as stored on the keyboard: `count` NUL-terminated macros.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroData {
    pub count: u8,
    pub size: u16,
    pub buffer: Vec<u8>,
}

impl MacroData {
    /// The raw bytes of each macro, without terminators.
    pub fn macros(&self) -> Vec<&[u8]> {
        self.buffer
            .split(|&b| b == 0)
            .take(self.count.into())
            .collect()
    }
}

/// Everything known about the connected keyboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardInfo {
    pub via_proto: Option<u16>,
    pub vial_proto: Option<u32>,
    pub kbid: Option<String>,
    pub rows: u8,
    pub cols: u8,
    pub layers: u8,
    pub custom_keycodes: Vec<CustomKeycode>,
    /// One flat `rows * cols` list of codes per layer.
    pub keymap: Vec<Vec<u16>>,
    pub macros: MacroData,
    pub tap_dances: Vec<TapDanceEntry>,
    pub combos: Vec<ComboEntry>,
    pub key_overrides: Vec<KeyOverrideEntry>,
    /// QMK setting id → value.
    pub settings: BTreeMap<u16, u32>,
    pub definition_size: u32,
    /// Compressed definition exactly as read from the keyboard.
    pub definition: Vec<u8>,
}

impl KeyboardInfo {
    pub fn new(rows: u8, cols: u8) -> Self {
        Self {
            rows,
            cols,
            ..Self::default()
        }
    }

    /// Whether bit `bit` of setting `qsid` is set. Unknown settings read as 0.
    pub fn setting_bit(&self, qsid: u16, bit: u8) -> bool {
        bit < 32 && (self.setting_value(qsid) >> bit) & 1 == 1
    }

    pub fn setting_value(&self, qsid: u16) -> u32 {
        self.settings.get(&qsid).copied().unwrap_or(0)
    }

    /// Loaded keycode at a matrix position.
    pub fn key(&self, layer: u8, row: u8, col: u8) -> Option<u16> {
        let cell = usize::from(row) * usize::from(self.cols) + usize::from(col);
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.keymap.get(usize::from(layer))?.get(cell).copied()
    }

    fn check_position(&self, layer: u8, row: u8, col: u8) -> Result<()> {
        check_index("layer", layer, self.layers)?;
        check_index("row", row, self.rows)?;
        check_index("col", col, self.cols)
    }

    fn keymap_size(&self) -> usize {
        usize::from(self.layers) * usize::from(self.rows) * usize::from(self.cols) * 2
    }
}

fn check_index(field: &'static str, value: u8, count: u8) -> Result<()> {
    if value >= count {
        return Err(Error::OutOfRange {
            field,
            value: value.into(),
            min: 0,
            max: u32::from(count).saturating_sub(1),
        });
    }
    Ok(())
}

/// Read the VIA protocol version and the Vial protocol version and keyboard id.
pub fn load_protocol_versions<T: HidTransport>(
    d: &mut Dispatcher<T>,
    kb: &mut KeyboardInfo,
) -> Result<()> {
    // VIA: u16 big-endian after the echoed command byte
    let via = d.send_scalar(cmd::GET_PROTOCOL_VERSION, &[], &DecodeSpec::u16_be(1))?;
    kb.via_proto = Some(via as u16);

    // Vial: u32 protocol, u64 keyboard uid, both little-endian
    let fields = d.send_vial_fields(vial::GET_KEYBOARD_ID, &[], "<IQ")?;
    kb.vial_proto = Some(fields[0] as u32);
    kb.kbid = Some(format!("{:016x}", fields[1]));

    info!(
        via = via,
        vial = fields[0],
        kbid = kb.kbid.as_deref().unwrap_or_default(),
        "Protocol versions"
    );
    Ok(())
}

/// Read the compressed keyboard definition.
///
/// Steps:
/// 1. GET_SIZE: total length (u32 little-endian)
/// 2. GET_DEFINITION with a little-endian u32 block index, one report per
///    block, until the whole definition is collected
pub fn load_definition<T: HidTransport>(
    d: &mut Dispatcher<T>,
    kb: &mut KeyboardInfo,
) -> Result<()> {
    let size = d.send_vial_scalar(vial::GET_SIZE, &[], &DecodeSpec::u32_le(0))? as u32;
    if size > MAX_DEFINITION_SIZE {
        return Err(Error::Protocol(format!(
            "definition of {size} bytes exceeds {MAX_DEFINITION_SIZE}"
        )));
    }

    let total = size as usize;
    let mut definition = Vec::with_capacity(total);
    let mut block = 0u32;
    while definition.len() < total {
        let data = d
            .send_vial(vial::GET_DEFINITION, &le32(block), &DecodeSpec::Raw)?
            .into_bytes()
            .unwrap_or_default();
        if data.is_empty() {
            return Err(Error::Protocol(format!("empty definition block {block}")));
        }
        let n = data.len().min(MSG_LEN).min(total - definition.len());
        definition.extend_from_slice(&data[..n]);
        block += 1;
    }

    debug!(size, blocks = block, "Definition loaded");
    kb.definition_size = size;
    kb.definition = definition;
    Ok(())
}

pub fn load_layer_count<T: HidTransport>(
    d: &mut Dispatcher<T>,
    kb: &mut KeyboardInfo,
) -> Result<()> {
    kb.layers = d.send_scalar(cmd::GET_LAYER_COUNT, &[], &DecodeSpec::byte(1))? as u8;
    Ok(())
}

/// Read every layer's keymap in one buffer transfer.
///
/// Needs `layers`, `rows` and `cols`. Keycodes are big-endian u16, layer
/// by layer, row by row.
pub fn load_keymap<T: HidTransport>(d: &mut Dispatcher<T>, kb: &mut KeyboardInfo) -> Result<()> {
    let size = kb.keymap_size();
    let buffer = read_buffer(d, cmd::KEYMAP_GET_BUFFER, size, Some(4), None)?;

    let per_layer = usize::from(kb.rows) * usize::from(kb.cols);
    let codes: Vec<u16> = buffer
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    kb.keymap = if per_layer == 0 {
        Vec::new()
    } else {
        codes.chunks(per_layer).map(<[u16]>::to_vec).collect()
    };
    debug!(layers = kb.keymap.len(), per_layer, "Keymap loaded");
    Ok(())
}

/// Read one key straight from the keyboard.
pub fn read_key<T: HidTransport>(d: &mut Dispatcher<T>, layer: u8, row: u8, col: u8) -> Result<u16> {
    // Response echoes [cmd, layer, row, col], keycode big-endian at 4
    let code = d.send_scalar(cmd::GET_KEYCODE, &[layer, row, col], &DecodeSpec::u16_be(4))?;
    Ok(code as u16)
}

/// Assign `code` to one key and mirror it into the loaded keymap.
pub fn update_key<T: HidTransport>(
    d: &mut Dispatcher<T>,
    kb: &mut KeyboardInfo,
    layer: u8,
    row: u8,
    col: u8,
    code: u16,
) -> Result<()> {
    kb.check_position(layer, row, col)?;
    let [hi, lo] = code.to_be_bytes();
    d.send(cmd::SET_KEYCODE, &[layer, row, col, hi, lo], &DecodeSpec::Raw)?;

    let cell = usize::from(row) * usize::from(kb.cols) + usize::from(col);
    if let Some(slot) = kb
        .keymap
        .get_mut(usize::from(layer))
        .and_then(|keys| keys.get_mut(cell))
    {
        *slot = code;
    }
    debug!(layer, row, col, code = format_args!("0x{code:04X}"), "Key updated");
    Ok(())
}

/// Read the macro count, buffer size and the buffer itself.
///
/// The buffer transfer stops as soon as `count` terminators have arrived.
pub fn load_macros<T: HidTransport>(d: &mut Dispatcher<T>, kb: &mut KeyboardInfo) -> Result<()> {
    let count = d.send_scalar(cmd::MACRO_GET_COUNT, &[], &DecodeSpec::byte(1))? as u8;
    let size = d.send_scalar(cmd::MACRO_GET_BUFFER_SIZE, &[], &DecodeSpec::u16_be(1))? as u16;

    let all_terminated =
        |buf: &[u8]| buf.iter().filter(|&&b| b == 0).count() >= usize::from(count);
    let buffer = read_buffer(
        d,
        cmd::MACRO_GET_BUFFER,
        size.into(),
        Some(4),
        Some(&all_terminated),
    )?;

    kb.macros = MacroData {
        count,
        size,
        buffer,
    };
    debug!(count, size, "Macros loaded");
    Ok(())
}

/// Write the whole macro buffer back.
pub fn update_macros<T: HidTransport>(d: &mut Dispatcher<T>, kb: &KeyboardInfo) -> Result<()> {
    let macros = &kb.macros;
    if macros.buffer.len() > usize::from(macros.size) {
        return Err(Error::OutOfRange {
            field: "macro buffer length",
            value: u32::try_from(macros.buffer.len()).unwrap_or(u32::MAX),
            min: 0,
            max: macros.size.into(),
        });
    }
    write_buffer(d, cmd::MACRO_SET_BUFFER, macros.size.into(), &macros.buffer)
}

/// Read tap dances, combos and key overrides.
pub fn load_dynamic_entries<T: HidTransport>(
    d: &mut Dispatcher<T>,
    kb: &mut KeyboardInfo,
) -> Result<()> {
    let counts = read_entry_counts(d)?;
    kb.tap_dances = read_entries(d, counts.tap_dances)?;
    kb.combos = read_entries(d, counts.combos)?;
    kb.key_overrides = read_entries(d, counts.key_overrides)?;
    debug!(
        tap_dances = counts.tap_dances,
        combos = counts.combos,
        key_overrides = counts.key_overrides,
        "Dynamic entries loaded"
    );
    Ok(())
}

fn update_entry<T: HidTransport, E: DynamicEntry>(
    d: &mut Dispatcher<T>,
    entries: &[E],
    field: &'static str,
    index: u8,
) -> Result<()> {
    let entry = entries.get(usize::from(index)).ok_or(Error::OutOfRange {
        field,
        value: index.into(),
        min: 0,
        max: u32::try_from(entries.len()).unwrap_or(u32::MAX).saturating_sub(1),
    })?;
    write_entry(d, index, entry)
}

/// Write the loaded tap dance at `index` back to the keyboard.
pub fn update_tap_dance<T: HidTransport>(
    d: &mut Dispatcher<T>,
    kb: &KeyboardInfo,
    index: u8,
) -> Result<()> {
    update_entry(d, &kb.tap_dances, "tap dance", index)
}

pub fn update_combo<T: HidTransport>(
    d: &mut Dispatcher<T>,
    kb: &KeyboardInfo,
    index: u8,
) -> Result<()> {
    update_entry(d, &kb.combos, "combo", index)
}

pub fn update_key_override<T: HidTransport>(
    d: &mut Dispatcher<T>,
    kb: &KeyboardInfo,
    index: u8,
) -> Result<()> {
    update_entry(d, &kb.key_overrides, "key override", index)
}

/// Read the given QMK settings. Settings the firmware rejects are left out.
pub fn load_qmk_settings<T: HidTransport>(
    d: &mut Dispatcher<T>,
    kb: &mut KeyboardInfo,
    qsids: &[u16],
) -> Result<()> {
    for &qsid in qsids {
        // status byte (0 = ok), then the value as little-endian u32
        let fields = d.send_vial_fields(vial::QMK_SETTINGS_GET, &le16(qsid), "<BI")?;
        if fields[0] != 0 {
            debug!(qsid, status = fields[0], "QMK setting not supported");
            continue;
        }
        kb.settings.insert(qsid, fields[1] as u32);
    }
    debug!(loaded = kb.settings.len(), "QMK settings loaded");
    Ok(())
}

/// Store `value` for setting `qsid` on the keyboard and in `kb`.
pub fn update_qmk_setting<T: HidTransport>(
    d: &mut Dispatcher<T>,
    kb: &mut KeyboardInfo,
    qsid: u16,
    value: u32,
) -> Result<()> {
    let mut args = le16(qsid).to_vec();
    args.extend_from_slice(&le32(value));
    let status = d.send_vial_scalar(vial::QMK_SETTINGS_SET, &args, &DecodeSpec::byte(0))?;
    if status != 0 {
        return Err(Error::Protocol(format!(
            "QMK setting {qsid} rejected with status {status}"
        )));
    }
    kb.settings.insert(qsid, value);
    Ok(())
}

/// Vial lock state and the keys to hold while unlocking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockStatus {
    pub unlocked: bool,
    pub in_progress: bool,
    /// (row, col) of each unlock key.
    pub keys: Vec<(u8, u8)>,
}

pub fn unlock_status<T: HidTransport>(d: &mut Dispatcher<T>) -> Result<UnlockStatus> {
    let raw = d
        .send_vial(vial::GET_UNLOCK_STATUS, &[], &DecodeSpec::Raw)?
        .into_bytes()
        .unwrap_or_default();
    let [unlocked, in_progress, rest @ ..] = raw.as_slice() else {
        return Err(Error::ShortResponse {
            offset: 0,
            width: 2,
            len: raw.len(),
        });
    };
    // Pairs of (row, col); 0xFF marks an unused slot
    let keys = rest
        .chunks_exact(2)
        .filter(|pair| pair[0] != 0xFF && pair[1] != 0xFF)
        .map(|pair| (pair[0], pair[1]))
        .collect();
    Ok(UnlockStatus {
        unlocked: *unlocked == 1,
        in_progress: *in_progress == 1,
        keys,
    })
}

pub fn unlock_start<T: HidTransport>(d: &mut Dispatcher<T>) -> Result<()> {
    d.send_vial(vial::UNLOCK_START, &[], &DecodeSpec::Raw)?;
    info!("Unlock started, hold the unlock keys");
    Ok(())
}

/// Progress of an unlock in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockPoll {
    pub unlocked: bool,
    pub in_progress: bool,
    /// Counts down while the unlock keys are held.
    pub counter: u8,
}

pub fn unlock_poll<T: HidTransport>(d: &mut Dispatcher<T>) -> Result<UnlockPoll> {
    let f = d.send_vial_fields(vial::UNLOCK_POLL, &[], "BBB")?;
    Ok(UnlockPoll {
        unlocked: f[0] == 1,
        in_progress: f[1] == 1,
        counter: f[2] as u8,
    })
}

pub fn lock<T: HidTransport>(d: &mut Dispatcher<T>) -> Result<()> {
    d.send_vial(vial::LOCK, &[], &DecodeSpec::Raw)?;
    info!("Keyboard locked");
    Ok(())
}

/// Encoder rotation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncoderDirection {
    CounterClockwise = 0,
    Clockwise = 1,
}

/// Counter-clockwise and clockwise keycodes of one encoder on one layer.
pub fn read_encoder<T: HidTransport>(
    d: &mut Dispatcher<T>,
    layer: u8,
    index: u8,
) -> Result<(u16, u16)> {
    let f = d.send_vial_fields(vial::GET_ENCODER, &[layer, index], ">HH")?;
    Ok((f[0] as u16, f[1] as u16))
}

pub fn update_encoder<T: HidTransport>(
    d: &mut Dispatcher<T>,
    layer: u8,
    index: u8,
    direction: EncoderDirection,
    code: u16,
) -> Result<()> {
    let [hi, lo] = code.to_be_bytes();
    d.send_vial(
        vial::SET_ENCODER,
        &[layer, index, direction as u8, hi, lo],
        &DecodeSpec::Raw,
    )?;
    Ok(())
}

/// Read `len` value bytes of lighting parameter `id`.
pub fn lighting_get<T: HidTransport>(d: &mut Dispatcher<T>, id: u8, len: usize) -> Result<Vec<u8>> {
    // Response echoes [cmd, id], value follows
    let raw = d.send_raw(cmd::LIGHTING_GET_VALUE, &[id])?;
    raw.get(2..2 + len)
        .map(<[u8]>::to_vec)
        .ok_or(Error::ShortResponse {
            offset: 2,
            width: len,
            len: raw.len(),
        })
}

pub fn lighting_set<T: HidTransport>(d: &mut Dispatcher<T>, id: u8, value: &[u8]) -> Result<()> {
    let mut args = Vec::with_capacity(1 + value.len());
    args.push(id);
    args.extend_from_slice(value);
    d.send(cmd::LIGHTING_SET_VALUE, &args, &DecodeSpec::Raw)?;
    Ok(())
}

pub fn lighting_save<T: HidTransport>(d: &mut Dispatcher<T>) -> Result<()> {
    d.send(cmd::LIGHTING_SAVE, &[], &DecodeSpec::Raw)?;
    Ok(())
}

pub fn read_layout_options<T: HidTransport>(d: &mut Dispatcher<T>) -> Result<u32> {
    let options = d.send_scalar(
        cmd::GET_KEYBOARD_VALUE,
        &[value::LAYOUT_OPTIONS],
        &DecodeSpec::u32_be(2),
    )?;
    Ok(options as u32)
}

pub fn update_layout_options<T: HidTransport>(d: &mut Dispatcher<T>, options: u32) -> Result<()> {
    let mut args = vec![value::LAYOUT_OPTIONS];
    args.extend_from_slice(&options.to_be_bytes());
    d.send(cmd::SET_KEYBOARD_VALUE, &args, &DecodeSpec::Raw)?;
    Ok(())
}

/// Full load of everything that does not need the definition: versions,
/// layer count, keymap, macros and dynamic entries.
///
/// `kb.rows` and `kb.cols` must already be set.
pub fn load_keyboard<T: HidTransport>(d: &mut Dispatcher<T>, kb: &mut KeyboardInfo) -> Result<()> {
    load_protocol_versions(d, kb)?;
    load_layer_count(d, kb)?;
    load_keymap(d, kb)?;
    load_macros(d, kb)?;
    load_dynamic_entries(d, kb)?;
    info!(
        layers = kb.layers,
        rows = kb.rows,
        cols = kb.cols,
        macros = kb.macros.count,
        "Keyboard loaded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::dynamic;
    use crate::transport::mock::MockTransport;

    #[test]
    fn protocol_versions_decode_via_and_vial() {
        let mut mock = MockTransport::new();
        mock.on_command(cmd::GET_PROTOCOL_VERSION, &[], &[cmd::GET_PROTOCOL_VERSION, 0x00, 0x09]);
        mock.on_vial(
            vial::GET_KEYBOARD_ID,
            &[],
            &[6, 0, 0, 0, 0xEF, 0xBE, 0xAD, 0xDE, 0, 0, 0, 0],
        );
        let mut d = Dispatcher::new(mock);
        let mut kb = KeyboardInfo::default();
        load_protocol_versions(&mut d, &mut kb).unwrap();
        assert_eq!(kb.via_proto, Some(9));
        assert_eq!(kb.vial_proto, Some(6));
        assert_eq!(kb.kbid.as_deref(), Some("00000000deadbeef"));
    }

    #[test]
    fn definition_is_read_block_by_block() {
        let definition: Vec<u8> = (0..70u8).collect();
        let served = definition.clone();
        let mock = MockTransport::new().with_handler(move |req| match req[1] {
            vial::GET_SIZE => Some(le32(70).to_vec()),
            vial::GET_DEFINITION => {
                let block = u32::from_le_bytes([req[2], req[3], req[4], req[5]]) as usize;
                let start = block * MSG_LEN;
                Some(served[start..(start + MSG_LEN).min(served.len())].to_vec())
            }
            _ => None,
        });
        let mut d = Dispatcher::new(mock);
        let mut kb = KeyboardInfo::default();
        load_definition(&mut d, &mut kb).unwrap();
        assert_eq!(kb.definition_size, 70);
        assert_eq!(kb.definition, definition);
        assert_eq!(d.transport().sent.len(), 4); // size + 3 blocks
    }

    #[test]
    fn oversize_definition_is_rejected() {
        let mut mock = MockTransport::new();
        mock.on_vial(vial::GET_SIZE, &[], &le32(MAX_DEFINITION_SIZE + 1));
        let mut d = Dispatcher::new(mock);
        let mut kb = KeyboardInfo::default();
        assert!(matches!(
            load_definition(&mut d, &mut kb),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn keymap_splits_into_layers() {
        // 2 layers of 1x2, served in one chunk
        let mut mock = MockTransport::new();
        mock.on_command(
            cmd::KEYMAP_GET_BUFFER,
            &[0, 0],
            &[cmd::KEYMAP_GET_BUFFER, 0, 0, 0, 0x00, 0x04, 0x01, 0x04, 0x52, 0x21, 0x00, 0x01],
        );
        let mut d = Dispatcher::new(mock);
        let mut kb = KeyboardInfo {
            layers: 2,
            ..KeyboardInfo::new(1, 2)
        };
        load_keymap(&mut d, &mut kb).unwrap();
        assert_eq!(kb.keymap, vec![vec![0x0004, 0x0104], vec![0x5221, 0x0001]]);
        assert_eq!(kb.key(1, 0, 0), Some(0x5221));
        assert_eq!(kb.key(1, 1, 0), None);
    }

    #[test]
    fn update_key_validates_then_mirrors() {
        let mut d = Dispatcher::new(MockTransport::new().with_handler(|req| Some(req.to_vec())));
        let mut kb = KeyboardInfo {
            layers: 1,
            keymap: vec![vec![0; 4]],
            ..KeyboardInfo::new(2, 2)
        };

        update_key(&mut d, &mut kb, 0, 1, 0, 0x0104).unwrap();
        assert_eq!(kb.keymap[0], vec![0, 0, 0x0104, 0]);
        assert_eq!(
            &d.transport().sent[0][..6],
            &[cmd::SET_KEYCODE, 0, 1, 0, 0x01, 0x04]
        );

        let err = update_key(&mut d, &mut kb, 1, 0, 0, 4).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { field: "layer", .. }));
        let err = update_key(&mut d, &mut kb, 0, 2, 0, 4).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { field: "row", max: 1, .. }));
        assert_eq!(d.transport().sent.len(), 1);
    }

    #[test]
    fn read_key_decodes_big_endian_at_four() {
        let mut mock = MockTransport::new();
        mock.on_command(cmd::GET_KEYCODE, &[0, 1, 2], &[cmd::GET_KEYCODE, 0, 1, 2, 0x52, 0x21]);
        let mut d = Dispatcher::new(mock);
        assert_eq!(read_key(&mut d, 0, 1, 2).unwrap(), 0x5221);
    }

    #[test]
    fn macros_stop_after_last_terminator() {
        let mut mock = MockTransport::new();
        mock.on_command(cmd::MACRO_GET_COUNT, &[], &[cmd::MACRO_GET_COUNT, 2]);
        mock.on_command(cmd::MACRO_GET_BUFFER_SIZE, &[], &[cmd::MACRO_GET_BUFFER_SIZE, 0x01, 0x00]);
        mock.on_command(
            cmd::MACRO_GET_BUFFER,
            &[0, 0],
            &[cmd::MACRO_GET_BUFFER, 0, 0, 0, b'h', b'i', 0, b'x', 0],
        );
        let mut d = Dispatcher::new(mock);
        let mut kb = KeyboardInfo::default();
        load_macros(&mut d, &mut kb).unwrap();
        assert_eq!(kb.macros.count, 2);
        assert_eq!(kb.macros.size, 256);
        assert_eq!(kb.macros.buffer.len(), 256);
        assert_eq!(kb.macros.macros(), vec![&b"hi"[..], &b"x"[..]]);
        assert_eq!(d.transport().sent.len(), 3);
    }

    #[test]
    fn oversized_macro_buffer_is_rejected_before_io() {
        let mut d = Dispatcher::new(MockTransport::new());
        let kb = KeyboardInfo {
            macros: MacroData {
                count: 1,
                size: 4,
                buffer: vec![1, 2, 3, 4, 5],
            },
            ..KeyboardInfo::default()
        };
        assert!(matches!(
            update_macros(&mut d, &kb),
            Err(Error::OutOfRange { .. })
        ));
        assert!(d.transport().sent.is_empty());
    }

    #[test]
    fn update_combo_requires_loaded_entry() {
        let mut d = Dispatcher::new(MockTransport::new().with_handler(|_| Some(vec![0])));
        let kb = KeyboardInfo {
            combos: vec![ComboEntry {
                keys: [0x0004, 0x0005, 0, 0],
                output: 0x0029,
            }],
            ..KeyboardInfo::default()
        };
        update_combo(&mut d, &kb, 0).unwrap();
        assert_eq!(
            &d.transport().sent[0][..4],
            &[cmd::VIAL_PREFIX, vial::DYNAMIC_ENTRY_OP, dynamic::COMBO_SET, 0]
        );
        assert!(matches!(
            update_combo(&mut d, &kb, 1),
            Err(Error::OutOfRange { field: "combo", .. })
        ));
    }

    #[test]
    fn qmk_settings_skip_unsupported() {
        let mut mock = MockTransport::new();
        mock.on_vial(vial::QMK_SETTINGS_GET, &le16(7), &[0, 0x2C, 0x01, 0, 0]);
        mock.on_vial(vial::QMK_SETTINGS_GET, &le16(8), &[1]);
        let mut d = Dispatcher::new(mock);
        let mut kb = KeyboardInfo::default();
        load_qmk_settings(&mut d, &mut kb, &[7, 8]).unwrap();
        assert_eq!(kb.setting_value(7), 300);
        assert!(!kb.settings.contains_key(&8));
        assert!(kb.setting_bit(7, 2));
        assert!(!kb.setting_bit(7, 0));
        assert!(!kb.setting_bit(7, 40));
    }

    #[test]
    fn qmk_setting_update_sends_le_fields() {
        let mut d = Dispatcher::new(MockTransport::new().with_handler(|_| Some(vec![0])));
        let mut kb = KeyboardInfo::default();
        update_qmk_setting(&mut d, &mut kb, 0x0102, 0x0A0B0C0D).unwrap();
        assert_eq!(
            &d.transport().sent[0][..8],
            &[cmd::VIAL_PREFIX, vial::QMK_SETTINGS_SET, 0x02, 0x01, 0x0D, 0x0C, 0x0B, 0x0A]
        );
        assert_eq!(kb.setting_value(0x0102), 0x0A0B0C0D);
    }

    #[test]
    fn unlock_status_lists_keys() {
        let mut mock = MockTransport::new();
        let mut resp = vec![0, 1, 0, 1, 3, 4];
        resp.resize(MSG_LEN, 0xFF);
        mock.on_vial(vial::GET_UNLOCK_STATUS, &[], &resp);
        let mut d = Dispatcher::new(mock);
        let status = unlock_status(&mut d).unwrap();
        assert!(!status.unlocked);
        assert!(status.in_progress);
        assert_eq!(status.keys, vec![(0, 1), (3, 4)]);
    }

    #[test]
    fn unlock_poll_reports_counter() {
        let mut mock = MockTransport::new();
        mock.on_vial(vial::UNLOCK_POLL, &[], &[0, 1, 42]);
        let mut d = Dispatcher::new(mock);
        assert_eq!(
            unlock_poll(&mut d).unwrap(),
            UnlockPoll {
                unlocked: false,
                in_progress: true,
                counter: 42
            }
        );
    }

    #[test]
    fn encoder_read_and_write() {
        let mut mock = MockTransport::new();
        mock.on_vial(vial::GET_ENCODER, &[0, 1], &[0x00, 0xAA, 0x00, 0xA9]);
        mock.on_vial(vial::SET_ENCODER, &[0, 1, 1, 0x00, 0xA9], &[]);
        let mut d = Dispatcher::new(mock);
        assert_eq!(read_encoder(&mut d, 0, 1).unwrap(), (0x00AA, 0x00A9));
        update_encoder(&mut d, 0, 1, EncoderDirection::Clockwise, 0x00A9).unwrap();
    }

    #[test]
    fn layout_options_are_big_endian() {
        let mut mock = MockTransport::new();
        mock.on_command(
            cmd::GET_KEYBOARD_VALUE,
            &[value::LAYOUT_OPTIONS],
            &[cmd::GET_KEYBOARD_VALUE, value::LAYOUT_OPTIONS, 0, 0, 0x01, 0x02],
        );
        mock.on_command(
            cmd::SET_KEYBOARD_VALUE,
            &[value::LAYOUT_OPTIONS, 0, 0, 0x01, 0x03],
            &[],
        );
        let mut d = Dispatcher::new(mock);
        assert_eq!(read_layout_options(&mut d).unwrap(), 0x0102);
        update_layout_options(&mut d, 0x0103).unwrap();
    }

    #[test]
    fn lighting_value_follows_echo() {
        let mut mock = MockTransport::new();
        mock.on_command(cmd::LIGHTING_GET_VALUE, &[0x80], &[cmd::LIGHTING_GET_VALUE, 0x80, 200, 7]);
        let mut d = Dispatcher::new(mock);
        assert_eq!(lighting_get(&mut d, 0x80, 2).unwrap(), vec![200, 7]);
        assert!(matches!(
            lighting_get(&mut d, 0x80, MSG_LEN),
            Err(Error::ShortResponse { .. })
        ));
    }

    #[test]
    fn keyboard_info_serde_roundtrip() {
        let mut kb = KeyboardInfo::new(5, 14);
        kb.layers = 4;
        kb.kbid = Some("00000000deadbeef".into());
        kb.settings.insert(7, 300);
        let json = serde_json::to_string(&kb).expect("serialize");
        let back: KeyboardInfo = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, kb);
    }
}
