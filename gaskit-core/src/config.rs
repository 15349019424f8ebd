//! Configuration type definitions
//!
//! The configuration is validated once, when the
//! [`DispenserManager`](crate::manager::DispenserManager) is built. Nothing
//! downstream re-checks unit indices or timeouts.

use heapless::Vec;

use gaskit_protocol::Address;

use crate::price::MAX_PRICE;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum number of dispenser units (one serial channel each)
pub const MAX_UNITS: usize = 8;

/// Price used when no valid price record exists (minor units per liter)
pub const DEFAULT_PRICE: u32 = 1100;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// No units configured
    NoUnits,
    /// Two units share a protocol address
    DuplicateAddress,
    /// A timeout or window is zero
    ZeroTimeout,
    /// Default price outside the storable range
    PriceOutOfRange,
    /// Number of serial channels differs from the number of units
    ChannelCountMismatch,
}

/// Sequencer timing
///
/// All values are milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimingConfig {
    /// Response timeout for status, readout and settlement requests
    pub response_timeout_ms: u32,
    /// Status poll interval while the dispenser is idle
    pub idle_poll_ms: u32,
    /// Status poll interval while a fuelling cycle is active
    pub fuelling_poll_ms: u32,
    /// Response timeout for the close-transaction request
    pub close_timeout_ms: u32,
    /// Time spent in the error state before polling resumes
    pub recovery_ms: u32,
    /// Maximum time without a valid frame before a unit is disconnected
    pub liveness_ms: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: 100,
            idle_poll_ms: 500,
            fuelling_poll_ms: 200,
            close_timeout_ms: 200,
            recovery_ms: 500,
            liveness_ms: 2000,
        }
    }
}

impl TimingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        let all = [
            self.response_timeout_ms,
            self.idle_poll_ms,
            self.fuelling_poll_ms,
            self.close_timeout_ms,
            self.recovery_ms,
            self.liveness_ms,
        ];
        if all.iter().any(|&ms| ms == 0) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

/// One dispenser unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnitConfig {
    /// Protocol address, high byte
    pub address_high: u8,
    /// Protocol address, low byte
    pub address_low: u8,
}

impl UnitConfig {
    pub const fn new(address_high: u8, address_low: u8) -> Self {
        Self {
            address_high,
            address_low,
        }
    }

    pub fn address(&self) -> Address {
        Address::new(self.address_high, self.address_low)
    }
}

/// Complete dispenser controller configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DispenserConfig {
    /// Units in channel order
    pub units: Vec<UnitConfig, MAX_UNITS>,
    /// Sequencer timing
    pub timing: TimingConfig,
    /// Initial price per liter for every unit
    pub default_price: u32,
}

impl Default for DispenserConfig {
    /// Two units at addresses `00 01` and `00 02`
    fn default() -> Self {
        let mut units = Vec::new();
        let _ = units.push(UnitConfig::new(0x00, 0x01));
        let _ = units.push(UnitConfig::new(0x00, 0x02));
        Self {
            units,
            timing: TimingConfig::default(),
            default_price: DEFAULT_PRICE,
        }
    }
}

impl DispenserConfig {
    /// Check the configuration for structural errors
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.units.is_empty() {
            return Err(ConfigError::NoUnits);
        }

        for (i, unit) in self.units.iter().enumerate() {
            if self.units[i + 1..]
                .iter()
                .any(|other| other.address() == unit.address())
            {
                return Err(ConfigError::DuplicateAddress);
            }
        }

        if self.default_price > MAX_PRICE {
            return Err(ConfigError::PriceOutOfRange);
        }

        self.timing.validate()
    }
}
