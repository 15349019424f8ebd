//! Non-volatile memory abstraction
//!
//! Byte-addressed storage such as an I²C EEPROM. Records are small and
//! written rarely, so no wear levelling is expected of implementations.

/// Errors reported by non-volatile memory implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NvError {
    /// Bus transfer failed
    Bus,
    /// Access past the end of the device
    OutOfBounds,
}

/// Byte-addressed non-volatile memory
pub trait NvMemory {
    /// Error type for memory operations
    type Error: core::fmt::Debug;

    /// Read `buf.len()` bytes starting at `offset`
    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write `data` starting at `offset`
    ///
    /// Returns once the data is committed.
    fn write(&mut self, offset: u16, data: &[u8]) -> Result<(), Self::Error>;

    /// Total capacity in bytes
    fn capacity(&self) -> usize;
}
