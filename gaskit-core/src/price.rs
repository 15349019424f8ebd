//! Per-unit price records in non-volatile memory
//!
//! Each unit owns a 4-byte big-endian record at offset `4 * unit`. A record
//! outside `0..=MAX_PRICE` (including erased memory, which reads as all
//! ones) is replaced with the default price and written back.

use gaskit_hal::NvMemory;

/// Highest price the dispenser accepts in a preset payload (4 digits)
pub const MAX_PRICE: u32 = 9999;

/// Size of one price record
pub const PRICE_RECORD_SIZE: usize = 4;

/// Price store errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PriceError<E> {
    /// Price above [`MAX_PRICE`]
    OutOfRange(u32),
    /// Record lies past the end of the memory
    NoRecord,
    /// Underlying memory failed
    Memory(E),
}

/// Outcome of loading a price record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PriceLoad {
    pub price: u32,
    /// The stored value was invalid and has been replaced
    pub repaired: bool,
}

/// Price records for all units
pub struct PriceStore<N: NvMemory> {
    memory: N,
    default_price: u32,
}

impl<N: NvMemory> PriceStore<N> {
    /// Create a store; `default_price` replaces invalid records
    pub fn new(memory: N, default_price: u32) -> Self {
        Self {
            memory,
            default_price: default_price.min(MAX_PRICE),
        }
    }

    /// Load the price for `unit`, repairing an invalid record
    pub fn load(&mut self, unit: usize) -> Result<PriceLoad, PriceError<N::Error>> {
        let offset = self.offset(unit)?;
        let mut record = [0u8; PRICE_RECORD_SIZE];
        self.memory
            .read(offset, &mut record)
            .map_err(PriceError::Memory)?;

        let price = u32::from_be_bytes(record);
        if price <= MAX_PRICE {
            return Ok(PriceLoad {
                price,
                repaired: false,
            });
        }

        let price = self.default_price;
        self.memory
            .write(offset, &price.to_be_bytes())
            .map_err(PriceError::Memory)?;
        Ok(PriceLoad {
            price,
            repaired: true,
        })
    }

    /// Store the price for `unit`
    pub fn save(&mut self, unit: usize, price: u32) -> Result<(), PriceError<N::Error>> {
        if price > MAX_PRICE {
            return Err(PriceError::OutOfRange(price));
        }
        let offset = self.offset(unit)?;
        self.memory
            .write(offset, &price.to_be_bytes())
            .map_err(PriceError::Memory)
    }

    /// Give the memory back
    pub fn release(self) -> N {
        self.memory
    }

    fn offset(&self, unit: usize) -> Result<u16, PriceError<N::Error>> {
        let start = unit
            .checked_mul(PRICE_RECORD_SIZE)
            .filter(|start| start + PRICE_RECORD_SIZE <= self.memory.capacity())
            .ok_or(PriceError::NoRecord)?;
        u16::try_from(start).map_err(|_| PriceError::NoRecord)
    }
}
