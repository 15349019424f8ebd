//! AT24Cxx I²C EEPROM
//!
//! Two-byte word address, big-endian. Writes never cross a page boundary
//! and each page write is followed by the device's internal write cycle.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use heapless::Vec;

use gaskit_hal::nvmem::{NvError, NvMemory};

/// Default 7-bit bus address (A0..A2 strapped low)
pub const DEFAULT_ADDRESS: u8 = 0x50;

/// Largest supported page
const MAX_PAGE_SIZE: usize = 64;

/// Internal write cycle time
const WRITE_CYCLE_MS: u32 = 5;

/// Device geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Geometry {
    /// Capacity in bytes
    pub capacity: usize,
    /// Page size in bytes
    pub page_size: usize,
}

/// AT24C256: 32 KiB, 64-byte pages
pub const AT24C256: Geometry = Geometry {
    capacity: 32 * 1024,
    page_size: 64,
};

/// AT24Cxx EEPROM on a blocking I²C bus
pub struct At24<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
    geometry: Geometry,
}

impl<I2C: I2c, D: DelayNs> At24<I2C, D> {
    /// Create a driver for a device at [`DEFAULT_ADDRESS`]
    pub fn new(i2c: I2C, delay: D, geometry: Geometry) -> Self {
        Self::with_address(i2c, delay, geometry, DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I2C, delay: D, geometry: Geometry, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
            geometry: Geometry {
                page_size: geometry.page_size.clamp(1, MAX_PAGE_SIZE),
                ..geometry
            },
        }
    }

    /// Release the bus and delay
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }

    fn check_bounds(&self, offset: u16, len: usize) -> Result<(), NvError> {
        if usize::from(offset) + len > self.geometry.capacity {
            return Err(NvError::OutOfBounds);
        }
        Ok(())
    }

    fn write_page(&mut self, offset: u16, chunk: &[u8]) -> Result<(), NvError> {
        let mut buf: Vec<u8, { 2 + MAX_PAGE_SIZE }> = Vec::new();
        // Chunk length is bounded by the page size
        let _ = buf.extend_from_slice(&offset.to_be_bytes());
        let _ = buf.extend_from_slice(chunk);

        self.i2c
            .write(self.address, &buf)
            .map_err(|_| NvError::Bus)?;
        self.delay.delay_ms(WRITE_CYCLE_MS);
        Ok(())
    }
}

impl<I2C: I2c, D: DelayNs> NvMemory for At24<I2C, D> {
    type Error = NvError;

    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.check_bounds(offset, buf.len())?;
        if buf.is_empty() {
            return Ok(());
        }
        self.i2c
            .write_read(self.address, &offset.to_be_bytes(), buf)
            .map_err(|_| NvError::Bus)
    }

    fn write(&mut self, offset: u16, data: &[u8]) -> Result<(), Self::Error> {
        self.check_bounds(offset, data.len())?;

        let page_size = self.geometry.page_size;
        let mut cursor = usize::from(offset);
        let mut remaining = data;
        while !remaining.is_empty() {
            let page_room = page_size - cursor % page_size;
            let (chunk, rest) = remaining.split_at(remaining.len().min(page_room));
            self.write_page(cursor as u16, chunk)?;
            cursor += chunk.len();
            remaining = rest;
        }
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.geometry.capacity
    }
}
