//! Build script for gaskit-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates dispenser.toml at compile time
//! - Generates the `DispenserConfig` builder from dispenser.toml

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Serial channels wired on the board
const BOARD_CHANNELS: usize = 2;

/// Highest price the dispenser accepts
const MAX_PRICE: i64 = 9999;

const TIMING_KEYS: &[&str] = &[
    "response_timeout_ms",
    "idle_poll_ms",
    "fuelling_poll_ms",
    "close_timeout_ms",
    "recovery_ms",
    "liveness_ms",
];

/// Validated dispenser.toml contents
struct Settings {
    baudrate: u32,
    timing: Vec<(&'static str, u32)>,
    default_price: u32,
    units: Vec<(u8, u8)>,
}

fn main() {
    setup_linker();
    let settings = validate_config();
    generate_config(&settings);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate dispenser.toml at compile time
fn validate_config() -> Settings {
    println!("cargo:rerun-if-changed=dispenser.toml");

    let config_path = Path::new("dispenser.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: dispenser.toml not found!                                ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a dispenser.toml configuration file.      ║\n\
            ║  Please create one in the gaskit-firmware directory.             ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read dispenser.toml                            ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in dispenser.toml                    ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    let baudrate = validate_serial(&config, &mut errors);
    let timing = validate_timing(&config, &mut errors);
    let default_price = validate_pricing(&config, &mut errors);
    let units = validate_units(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid dispenser.toml                                   ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=dispenser.toml validated successfully");

    Settings {
        baudrate,
        timing,
        default_price,
        units,
    }
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn section<'a>(
    config: &'a toml::Value,
    name: &str,
    errors: &mut Vec<String>,
) -> Option<&'a toml::value::Table> {
    match config.get(name) {
        Some(toml::Value::Table(t)) => Some(t),
        Some(_) => {
            errors.push(format!("[{}] must be a table", name));
            None
        }
        None => {
            errors.push(format!("Missing [{}] section", name));
            None
        }
    }
}

fn integer_in(
    table: &toml::value::Table,
    section: &str,
    key: &str,
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) -> Option<i64> {
    match table.get(key) {
        Some(toml::Value::Integer(value)) if range.contains(value) => Some(*value),
        Some(toml::Value::Integer(_)) => {
            errors.push(format!(
                "[{}] {} must be {}-{}",
                section,
                key,
                range.start(),
                range.end()
            ));
            None
        }
        Some(_) => {
            errors.push(format!("[{}] {} must be an integer", section, key));
            None
        }
        None => {
            errors.push(format!("[{}] missing '{}'", section, key));
            None
        }
    }
}

fn validate_serial(config: &toml::Value, errors: &mut Vec<String>) -> u32 {
    section(config, "serial", errors)
        .and_then(|serial| integer_in(serial, "serial", "baudrate", 1200..=921_600, errors))
        .unwrap_or_default() as u32
}

fn validate_timing(config: &toml::Value, errors: &mut Vec<String>) -> Vec<(&'static str, u32)> {
    let Some(timing) = section(config, "timing", errors) else {
        return Vec::new();
    };

    let mut values = Vec::new();
    for &key in TIMING_KEYS {
        if let Some(ms) = integer_in(timing, "timing", key, 1..=60_000, errors) {
            values.push((key, ms as u32));
        }
    }

    for key in timing.keys() {
        if !TIMING_KEYS.contains(&key.as_str()) {
            errors.push(format!("[timing] unknown key '{}'", key));
        }
    }

    values
}

fn validate_pricing(config: &toml::Value, errors: &mut Vec<String>) -> u32 {
    section(config, "pricing", errors)
        .and_then(|pricing| integer_in(pricing, "pricing", "default_price", 0..=MAX_PRICE, errors))
        .unwrap_or_default() as u32
}

fn validate_units(config: &toml::Value, errors: &mut Vec<String>) -> Vec<(u8, u8)> {
    let units = match config.get("unit") {
        Some(toml::Value::Array(units)) => units,
        Some(_) => {
            errors.push("[[unit]] must be an array of tables".to_string());
            return Vec::new();
        }
        None => {
            errors.push("Missing [[unit]] entries".to_string());
            return Vec::new();
        }
    };

    if units.len() != BOARD_CHANNELS {
        errors.push(format!(
            "exactly {} [[unit]] entries required (one per channel), found {}",
            BOARD_CHANNELS,
            units.len()
        ));
    }

    let mut addresses = Vec::new();
    for (i, unit) in units.iter().enumerate() {
        let address = unit
            .get("address")
            .and_then(|a| a.as_array())
            .filter(|a| a.len() == 2)
            .and_then(|a| {
                let high = a[0].as_integer().and_then(|v| u8::try_from(v).ok())?;
                let low = a[1].as_integer().and_then(|v| u8::try_from(v).ok())?;
                Some((high, low))
            });

        match address {
            Some(address) if addresses.contains(&address) => {
                errors.push(format!("[[unit]] {} duplicates address {:02X?}", i, address));
            }
            Some(address) => addresses.push(address),
            None => errors.push(format!(
                "[[unit]] {} address must be [high, low] bytes",
                i
            )),
        }
    }

    addresses
}

/// Write the generated configuration module to OUT_DIR
fn generate_config(settings: &Settings) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let mut code = String::new();
    code.push_str("// Generated by build.rs from dispenser.toml\n\n");
    code.push_str(&format!(
        "/// Number of configured units\npub const UNIT_COUNT: usize = {};\n\n",
        settings.units.len()
    ));
    code.push_str(&format!(
        "/// Dispenser serial baud rate\npub const BAUDRATE: u32 = {};\n\n",
        settings.baudrate
    ));

    code.push_str("/// Configuration compiled from dispenser.toml\n");
    code.push_str("pub fn dispenser_config() -> DispenserConfig {\n");
    code.push_str("    let mut units = heapless::Vec::new();\n");
    for (high, low) in &settings.units {
        code.push_str(&format!(
            "    let _ = units.push(UnitConfig::new(0x{:02X}, 0x{:02X}));\n",
            high, low
        ));
    }
    code.push_str("    DispenserConfig {\n        units,\n        timing: TimingConfig {\n");
    for (key, ms) in &settings.timing {
        code.push_str(&format!("            {}: {},\n", key, ms));
    }
    code.push_str("        },\n");
    code.push_str(&format!(
        "        default_price: {},\n    }}\n}}\n",
        settings.default_price
    ));

    fs::write(out_dir.join("dispenser_config.rs"), code).unwrap();
}
