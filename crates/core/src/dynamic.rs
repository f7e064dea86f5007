//! Vial dynamic entries: tap dances, combos and key overrides.
//!
//! Entries are fetched one request per index through
//! [`vial::DYNAMIC_ENTRY_OP`]. Every response starts with a status byte
//! (0 = ok) followed by the packed entry.

use crate::comm::Dispatcher;
use crate::decode::{DecodeSpec, Decoded};
use crate::error::{Error, Result};
use crate::protocol::{dynamic, le16, vial};
use crate::transport::HidTransport;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Issue `count` sequential fetches of `subcmd`, one per index, in order.
pub fn fetch_all<T: HidTransport>(
    d: &mut Dispatcher<T>,
    subcmd: u8,
    count: u8,
    spec: &DecodeSpec,
) -> Result<Vec<Decoded>> {
    let mut entries = Vec::with_capacity(count.into());
    for index in 0..count {
        entries.push(d.send_vial(vial::DYNAMIC_ENTRY_OP, &[subcmd, index], spec)?);
    }
    debug!(subcmd, count, "Fetched dynamic entries");
    Ok(entries)
}

/// Number of entries of each kind the firmware supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryCounts {
    pub tap_dances: u8,
    pub combos: u8,
    pub key_overrides: u8,
}

pub fn read_entry_counts<T: HidTransport>(d: &mut Dispatcher<T>) -> Result<EntryCounts> {
    let f = d.send_vial_fields(
        vial::DYNAMIC_ENTRY_OP,
        &[dynamic::GET_NUMBER_OF_ENTRIES],
        "BBB",
    )?;
    Ok(EntryCounts {
        tap_dances: f[0] as u8,
        combos: f[1] as u8,
        key_overrides: f[2] as u8,
    })
}

/// A fixed-shape dynamic entry.
pub trait DynamicEntry: Sized {
    /// Unpack format of the response, status byte included.
    const FORMAT: &'static str;
    const GET: u8;
    const SET: u8;

    /// Build from unpacked fields after the status byte.
    fn from_fields(fields: &[u64]) -> Self;

    /// Argument bytes following the subcommand and index of a SET request.
    fn to_args(&self) -> Vec<u8>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapDanceEntry {
    pub on_tap: u16,
    pub on_hold: u16,
    pub on_double_tap: u16,
    pub on_tap_hold: u16,
    pub tapping_term: u16,
}

impl DynamicEntry for TapDanceEntry {
    const FORMAT: &'static str = "<BHHHHH";
    const GET: u8 = dynamic::TAP_DANCE_GET;
    const SET: u8 = dynamic::TAP_DANCE_SET;

    fn from_fields(f: &[u64]) -> Self {
        Self {
            on_tap: f[0] as u16,
            on_hold: f[1] as u16,
            on_double_tap: f[2] as u16,
            on_tap_hold: f[3] as u16,
            tapping_term: f[4] as u16,
        }
    }

    fn to_args(&self) -> Vec<u8> {
        [
            self.on_tap,
            self.on_hold,
            self.on_double_tap,
            self.on_tap_hold,
            self.tapping_term,
        ]
        .iter()
        .flat_map(|&v| le16(v))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboEntry {
    pub keys: [u16; 4],
    pub output: u16,
}

impl DynamicEntry for ComboEntry {
    const FORMAT: &'static str = "<BHHHHH";
    const GET: u8 = dynamic::COMBO_GET;
    const SET: u8 = dynamic::COMBO_SET;

    fn from_fields(f: &[u64]) -> Self {
        Self {
            keys: [f[0] as u16, f[1] as u16, f[2] as u16, f[3] as u16],
            output: f[4] as u16,
        }
    }

    fn to_args(&self) -> Vec<u8> {
        self.keys
            .iter()
            .chain(std::iter::once(&self.output))
            .flat_map(|&v| le16(v))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOverrideEntry {
    pub trigger: u16,
    pub replacement: u16,
    pub layers: u16,
    pub trigger_mods: u8,
    pub negative_mods: u8,
    pub suppressed_mods: u8,
    pub options: u8,
}

impl DynamicEntry for KeyOverrideEntry {
    const FORMAT: &'static str = "<BHHHBBBB";
    const GET: u8 = dynamic::KEY_OVERRIDE_GET;
    const SET: u8 = dynamic::KEY_OVERRIDE_SET;

    fn from_fields(f: &[u64]) -> Self {
        Self {
            trigger: f[0] as u16,
            replacement: f[1] as u16,
            layers: f[2] as u16,
            trigger_mods: f[3] as u8,
            negative_mods: f[4] as u8,
            suppressed_mods: f[5] as u8,
            options: f[6] as u8,
        }
    }

    fn to_args(&self) -> Vec<u8> {
        let mut args = Vec::with_capacity(10);
        args.extend_from_slice(&le16(self.trigger));
        args.extend_from_slice(&le16(self.replacement));
        args.extend_from_slice(&le16(self.layers));
        args.extend_from_slice(&[
            self.trigger_mods,
            self.negative_mods,
            self.suppressed_mods,
            self.options,
        ]);
        args
    }
}

/// Fetch `count` typed entries.
pub fn read_entries<T: HidTransport, E: DynamicEntry>(
    d: &mut Dispatcher<T>,
    count: u8,
) -> Result<Vec<E>> {
    let spec = DecodeSpec::unpack(E::FORMAT)?;
    fetch_all(d, E::GET, count, &spec)?
        .into_iter()
        .enumerate()
        .map(|(index, decoded)| {
            let fields = decoded
                .into_fields()
                .ok_or_else(|| Error::Protocol("dynamic entry did not unpack".into()))?;
            match fields.split_first() {
                Some((0, rest)) => Ok(E::from_fields(rest)),
                Some((status, _)) => Err(Error::Protocol(format!(
                    "dynamic entry {index} returned status {status}"
                ))),
                None => Err(Error::Protocol("empty dynamic entry".into())),
            }
        })
        .collect()
}

/// Store one typed entry at `index`.
pub fn write_entry<T: HidTransport, E: DynamicEntry>(
    d: &mut Dispatcher<T>,
    index: u8,
    entry: &E,
) -> Result<()> {
    let mut args = vec![E::SET, index];
    args.extend(entry.to_args());
    d.send_vial(vial::DYNAMIC_ENTRY_OP, &args, &DecodeSpec::Raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::cmd;
    use crate::transport::mock::MockTransport;

    #[test]
    fn fetch_all_preserves_request_order() {
        let mut mock = MockTransport::new();
        for i in 0..3u8 {
            mock.on_vial(vial::DYNAMIC_ENTRY_OP, &[dynamic::COMBO_GET, i], &[0, 0x10 + i]);
        }
        let mut d = Dispatcher::new(mock);
        let out = fetch_all(&mut d, dynamic::COMBO_GET, 3, &DecodeSpec::byte(1)).unwrap();
        assert_eq!(
            out,
            vec![Decoded::Byte(0x10), Decoded::Byte(0x11), Decoded::Byte(0x12)]
        );
        let indices: Vec<u8> = d.transport().sent.iter().map(|f| f[3]).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn fetch_all_zero_count_sends_nothing() {
        let mut d = Dispatcher::new(MockTransport::new());
        assert!(fetch_all(&mut d, dynamic::TAP_DANCE_GET, 0, &DecodeSpec::Raw)
            .unwrap()
            .is_empty());
        assert!(d.transport().sent.is_empty());
    }

    #[test]
    fn read_entry_counts_unpacks_three_bytes() {
        let mut mock = MockTransport::new();
        mock.on_vial(
            vial::DYNAMIC_ENTRY_OP,
            &[dynamic::GET_NUMBER_OF_ENTRIES],
            &[8, 16, 4],
        );
        let mut d = Dispatcher::new(mock);
        let counts = read_entry_counts(&mut d).unwrap();
        assert_eq!(
            counts,
            EntryCounts {
                tap_dances: 8,
                combos: 16,
                key_overrides: 4
            }
        );
    }

    #[test]
    fn read_tap_dances_decodes_little_endian_fields() {
        let mut mock = MockTransport::new();
        mock.on_vial(
            vial::DYNAMIC_ENTRY_OP,
            &[dynamic::TAP_DANCE_GET, 0],
            &[0, 0x04, 0x00, 0xE0, 0x00, 0x05, 0x00, 0x00, 0x00, 0xC8, 0x00],
        );
        let mut d = Dispatcher::new(mock);
        let entries: Vec<TapDanceEntry> = read_entries(&mut d, 1).unwrap();
        assert_eq!(
            entries[0],
            TapDanceEntry {
                on_tap: 0x0004,
                on_hold: 0x00E0,
                on_double_tap: 0x0005,
                on_tap_hold: 0,
                tapping_term: 200,
            }
        );
    }

    #[test]
    fn nonzero_status_is_protocol_error() {
        let mut mock = MockTransport::new();
        mock.on_vial(vial::DYNAMIC_ENTRY_OP, &[dynamic::COMBO_GET, 0], &[1]);
        let mut d = Dispatcher::new(mock);
        let result: Result<Vec<ComboEntry>> = read_entries(&mut d, 1);
        assert!(matches!(result, Err(Error::Protocol(_))));
    }

    #[test]
    fn write_key_override_encodes_fields() {
        let mut d = Dispatcher::new(MockTransport::new().with_handler(|_| Some(vec![0])));
        let ko = KeyOverrideEntry {
            trigger: 0x0104,
            replacement: 0x0005,
            layers: 0xFFFF,
            trigger_mods: 1,
            negative_mods: 2,
            suppressed_mods: 3,
            options: 0x80,
        };
        write_entry(&mut d, 2, &ko).unwrap();
        let sent = &d.transport().sent[0];
        assert_eq!(
            &sent[..15],
            &[
                cmd::VIAL_PREFIX,
                vial::DYNAMIC_ENTRY_OP,
                dynamic::KEY_OVERRIDE_SET,
                2,
                0x04,
                0x01,
                0x05,
                0x00,
                0xFF,
                0xFF,
                1,
                2,
                3,
                0x80,
                0
            ]
        );
    }

    #[test]
    fn combo_args_put_output_last() {
        let combo = ComboEntry {
            keys: [0x0004, 0x0005, 0, 0],
            output: 0x0029,
        };
        assert_eq!(
            combo.to_args(),
            vec![0x04, 0, 0x05, 0, 0, 0, 0, 0, 0x29, 0]
        );
    }
}
