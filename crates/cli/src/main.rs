//! open-vial CLI: command-line VIA/Vial keyboard configuration tool.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use open_vial_core::comm::Dispatcher;
use open_vial_core::device::{self, DeviceFilter, HidChannel};
use open_vial_core::dynamic;
use open_vial_core::keyboard::{self, KeyboardInfo};
use open_vial_core::keycode::{self, Keycodes};
use std::time::Duration;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "open-vial",
    version,
    about = "Open-source VIA/Vial keyboard configuration"
)]
struct Cli {
    /// Restrict to a keyboard by hex VID:PID (repeatable).
    #[arg(long = "device", value_name = "VID:PID", value_parser = parse_vid_pid, global = true)]
    devices: Vec<(u16, u16)>,

    /// Response timeout in milliseconds.
    #[arg(long, default_value_t = 1000, global = true)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List connected VIA/Vial keyboards.
    ListDevices,
    /// Show protocol versions, keyboard id, layers and dynamic entry counts.
    Info,
    /// Print the keymap as JSON layers of keycode strings.
    DumpKeymap {
        /// Matrix rows.
        #[arg(long)]
        rows: u8,
        /// Matrix columns.
        #[arg(long)]
        cols: u8,
    },
    /// Assign a keycode (name, composite, or number) to one key.
    SetKey {
        /// Matrix rows.
        #[arg(long)]
        rows: u8,
        /// Matrix columns.
        #[arg(long)]
        cols: u8,
        layer: u8,
        row: u8,
        col: u8,
        keycode: String,
    },
    /// Convert keycodes offline, without a keyboard.
    Keycode {
        #[command(subcommand)]
        action: KeycodeAction,
    },
}

#[derive(Subcommand)]
enum KeycodeAction {
    /// Keycode text to its 16-bit value.
    Parse { text: String },
    /// 16-bit value (decimal or 0x hex) to keycode text.
    Stringify { code: String },
    /// Display description of keycode text.
    Describe { text: String },
}

fn parse_vid_pid(s: &str) -> std::result::Result<(u16, u16), String> {
    let (vid, pid) = s
        .split_once(':')
        .ok_or_else(|| format!("expected VID:PID, got {s:?}"))?;
    let hex = |v: &str| {
        u16::from_str_radix(v.trim_start_matches("0x"), 16).map_err(|e| format!("{v:?}: {e}"))
    };
    Ok((hex(vid)?, hex(pid)?))
}

fn parse_code(s: &str) -> Result<u16> {
    let code = match s.strip_prefix("0x") {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse(),
    };
    code.with_context(|| format!("invalid keycode value {s:?}"))
}

fn filters(cli: &Cli) -> Vec<DeviceFilter> {
    if cli.devices.is_empty() {
        vec![DeviceFilter::vial()]
    } else {
        cli.devices
            .iter()
            .map(|&(vid, pid)| DeviceFilter::vial_device(vid, pid))
            .collect()
    }
}

fn connect(cli: &Cli) -> Result<Dispatcher<HidChannel>> {
    let api = hidapi::HidApi::new().context("hidapi init")?;
    let mut channel = HidChannel::new();
    channel
        .open(&api, &filters(cli))
        .context("open keyboard (use --device VID:PID to pick one)")?;
    Ok(Dispatcher::new(channel).with_timeout(Duration::from_millis(cli.timeout_ms)))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::ListDevices => {
            let api = hidapi::HidApi::new().context("hidapi init")?;
            let devices = device::list_devices(&api, &filters(&cli));
            if devices.is_empty() {
                println!("No VIA/Vial keyboards found.");
                println!("Ensure your keyboard is connected and udev rules allow hidraw access.");
            } else {
                for dev in &devices {
                    println!(
                        "{} (VID: 0x{:04X}, PID: 0x{:04X}, path: {})",
                        dev.product.as_deref().unwrap_or("Unknown keyboard"),
                        dev.vid,
                        dev.pid,
                        dev.path
                    );
                }
            }
        }
        Commands::Info => {
            let mut d = connect(&cli)?;
            let mut kb = KeyboardInfo::default();
            keyboard::load_protocol_versions(&mut d, &mut kb)?;
            keyboard::load_layer_count(&mut d, &mut kb)?;
            let counts = dynamic::read_entry_counts(&mut d)?;

            println!("VIA protocol:  {}", kb.via_proto.unwrap_or_default());
            println!("Vial protocol: {}", kb.vial_proto.unwrap_or_default());
            println!("Keyboard ID:   {}", kb.kbid.unwrap_or_default());
            println!("Layers:        {}", kb.layers);
            println!("Tap dances:    {}", counts.tap_dances);
            println!("Combos:        {}", counts.combos);
            println!("Key overrides: {}", counts.key_overrides);
        }
        Commands::DumpKeymap { rows, cols } => {
            let mut d = connect(&cli)?;
            let mut kb = KeyboardInfo::new(*rows, *cols);
            keyboard::load_layer_count(&mut d, &mut kb)?;
            keyboard::load_keymap(&mut d, &mut kb)?;

            let codec = Keycodes::for_keyboard(&kb)?;
            let layers = keycode::stringify_keymap(&codec, &kb.keymap);
            println!("{}", serde_json::to_string_pretty(&layers)?);
        }
        Commands::SetKey {
            rows,
            cols,
            layer,
            row,
            col,
            keycode,
        } => {
            let codec = Keycodes::standard()?;
            let code = codec.parse(keycode)?;
            debug!(keycode = %keycode, code, "Parsed keycode");

            let mut d = connect(&cli)?;
            let mut kb = KeyboardInfo::new(*rows, *cols);
            keyboard::load_layer_count(&mut d, &mut kb)?;
            keyboard::update_key(&mut d, &mut kb, *layer, *row, *col, code)?;

            let stored = keyboard::read_key(&mut d, *layer, *row, *col)?;
            if stored != code {
                bail!("keyboard reports 0x{stored:04X} after writing 0x{code:04X}");
            }
            println!("Layer {layer} ({row}, {col}) = {}", codec.stringify(code));
        }
        Commands::Keycode { action } => {
            let codec = Keycodes::standard()?;
            match action {
                KeycodeAction::Parse { text } => {
                    let code = codec.parse(text)?;
                    println!("0x{code:04X} ({code})");
                }
                KeycodeAction::Stringify { code } => {
                    println!("{}", codec.stringify(parse_code(code)?));
                }
                KeycodeAction::Describe { text } => {
                    println!("{}", serde_json::to_string_pretty(&codec.parse_desc(text))?);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vid_pid_parses_hex() {
        assert_eq!(parse_vid_pid("feed:6060"), Ok((0xFEED, 0x6060)));
        assert_eq!(parse_vid_pid("0x4653:0x0001"), Ok((0x4653, 0x0001)));
        assert!(parse_vid_pid("feed").is_err());
        assert!(parse_vid_pid("xyz:1").is_err());
    }

    #[test]
    fn code_accepts_decimal_and_hex() {
        assert_eq!(parse_code("260").unwrap(), 260);
        assert_eq!(parse_code("0x0104").unwrap(), 0x0104);
        assert!(parse_code("0xZZ").is_err());
    }

    #[test]
    fn cli_accepts_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "open-vial",
            "dump-keymap",
            "--rows",
            "5",
            "--cols",
            "14",
            "--device",
            "feed:6060",
            "--timeout-ms",
            "250",
        ])
        .unwrap();
        assert_eq!(cli.devices, vec![(0xFEED, 0x6060)]);
        assert_eq!(cli.timeout_ms, 250);
        assert_eq!(filters(&cli), vec![DeviceFilter::vial_device(0xFEED, 0x6060)]);
    }

    #[test]
    fn set_key_takes_matrix_size() {
        let cli = Cli::try_parse_from([
            "open-vial", "set-key", "--rows", "5", "--cols", "14", "1", "4", "13", "KC_A",
        ])
        .unwrap();
        match cli.command {
            Commands::SetKey {
                rows,
                cols,
                layer,
                row,
                col,
                keycode,
            } => {
                assert_eq!((rows, cols), (5, 14));
                assert_eq!((layer, row, col), (1, 4, 13));
                assert_eq!(keycode, "KC_A");
            }
            _ => panic!("expected set-key"),
        }
        assert!(Cli::try_parse_from(["open-vial", "set-key", "0", "0", "0", "KC_A"]).is_err());
    }
}
