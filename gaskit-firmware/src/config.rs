//! Build-time dispenser configuration
//!
//! `dispenser.toml` is validated by build.rs and turned into the
//! [`dispenser_config`] builder plus the board constants below.

use gaskit_core::{DispenserConfig, TimingConfig, UnitConfig};

include!(concat!(env!("OUT_DIR"), "/dispenser_config.rs"));
