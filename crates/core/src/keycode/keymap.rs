//! Whole-keymap conversion, one layer at a time.

use super::{KeyInput, Keycodes, SENTINEL};
use crate::error::Result;

/// Render every layer's codes. The sentinel renders as `"-1"`.
pub fn stringify_keymap(codec: &Keycodes, layers: &[Vec<u16>]) -> Vec<Vec<String>> {
    layers
        .iter()
        .map(|layer| {
            layer
                .iter()
                .map(|&code| {
                    if code == SENTINEL {
                        "-1".to_string()
                    } else {
                        codec.stringify(code)
                    }
                })
                .collect()
        })
        .collect()
}

/// Parse a layer × row × column grid into one flat code list per layer.
///
/// Missing cells, empty names and zero codes become the sentinel.
pub fn parse_keymap(
    codec: &Keycodes,
    layers: &[Vec<Vec<Option<KeyInput>>>],
) -> Result<Vec<Vec<u16>>> {
    layers
        .iter()
        .map(|rows| {
            rows.iter()
                .flatten()
                .map(|cell| match cell {
                    None => Ok(SENTINEL),
                    Some(input) if input.is_blank() => Ok(SENTINEL),
                    Some(input) => codec.parse_input(input),
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stringify_renders_sentinel_as_minus_one() {
        let codec = Keycodes::standard().unwrap();
        let out = stringify_keymap(&codec, &[vec![0x0004, SENTINEL, 0x0104], vec![0x5221]]);
        assert_eq!(
            out,
            vec![
                vec!["KC_A".to_string(), "-1".into(), "LCTL(KC_A)".into()],
                vec!["MO(1)".to_string()]
            ]
        );
    }

    #[test]
    fn parse_flattens_rows_and_maps_blanks() {
        let codec = Keycodes::standard().unwrap();
        let grid = vec![vec![
            vec![Some(KeyInput::from("KC_A")), None],
            vec![Some(KeyInput::from("")), Some(KeyInput::Code(0))],
            vec![Some(KeyInput::from("-1")), Some(KeyInput::Code(0x0104))],
        ]];
        let out = parse_keymap(&codec, &grid).unwrap();
        assert_eq!(
            out,
            vec![vec![0x0004, SENTINEL, SENTINEL, SENTINEL, SENTINEL, 0x0104]]
        );
    }

    #[test]
    fn parse_reports_bad_cell() {
        let codec = Keycodes::standard().unwrap();
        let grid = vec![vec![vec![Some(KeyInput::from("BOGUS_KEY"))]]];
        assert!(parse_keymap(&codec, &grid).is_err());
    }

    #[test]
    fn grid_round_trip_through_json() {
        let codec = Keycodes::standard().unwrap();
        let layers = vec![vec![0x0029, 0x0104, 0x7C00, 0x5700]];
        let text = stringify_keymap(&codec, &layers);
        let json = serde_json::to_string(&vec![text]).unwrap();
        let grid: Vec<Vec<Vec<Option<KeyInput>>>> = serde_json::from_str(&json).unwrap();
        assert_eq!(parse_keymap(&codec, &grid).unwrap(), layers);
    }
}
