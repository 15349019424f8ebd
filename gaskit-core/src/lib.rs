//! Board-agnostic core logic for the dispenser controller firmware
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Receive handoff between the reception context and the poll loop
//! - Command sequencer (pure transition function per state)
//! - Per-dispenser unit controller with timeout/retry policy
//! - Dispenser manager (unit collection, command API, poll entry point)
//! - Link liveness supervision
//! - Price record persistence and preset limits
//! - Configuration type definitions
//!
//! The crate never reads a clock: every poll receives the current
//! [`time::Millis`] tick from the caller.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod handoff;
pub mod manager;
pub mod preset;
pub mod price;
pub mod sequencer;
pub mod supervision;
pub mod time;
pub mod unit;

mod log;

#[cfg(test)]
mod testing;

// Links the std critical-section implementation into the test binary
#[cfg(test)]
use critical_section as _;

pub use config::{ConfigError, DispenserConfig, TimingConfig, UnitConfig, MAX_UNITS};
pub use handoff::{Deposit, ReceiveHandoff, RxBlock, RX_BUFFER_SIZE};
pub use manager::{Channel, DispenserManager};
pub use preset::{check_amount_preset, check_volume_preset, PresetError};
pub use price::{PriceError, PriceLoad, PriceStore, MAX_PRICE};
pub use sequencer::{Notice, SequencerState};
pub use time::Millis;
pub use unit::{UnitController, UnitSnapshot};

pub use gaskit_protocol::UnitStatus;
