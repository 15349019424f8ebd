//! Command letters
//!
//! Every request carries one of these letters; a dispenser answers with a
//! frame carrying the same letter.

/// GasKit command letters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Status poll
    Status = b'S',
    /// Current volume readout
    VolumeReadout = b'L',
    /// Current amount readout
    AmountReadout = b'R',
    /// Final settlement of a completed fuelling
    FinalSettlement = b'T',
    /// Close the current transaction
    CloseTransaction = b'N',
    /// Start fuelling a preset volume
    StartByVolume = b'V',
    /// Start fuelling a preset amount
    StartByAmount = b'M',
    /// Stop fuelling
    Stop = b'B',
    /// Resume a stopped fuelling
    Resume = b'G',
    /// Totalizer request / report
    Totalizer = b'C',
}

impl Command {
    /// Get the command as its wire byte
    pub const fn as_byte(self) -> u8 {
        self as u8
    }
}
