//! Serial EEPROM drivers

pub mod at24;

pub use at24::{At24, AT24C256};
