//! Peripheral drivers
//!
//! Concrete implementations of the `gaskit-hal` traits for parts fitted to
//! the controller board:
//!
//! - AT24Cxx I²C EEPROM (price records)

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod eeprom;
