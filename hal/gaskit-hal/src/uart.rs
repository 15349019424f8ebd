//! UART serial transmit abstraction
//!
//! Reception is not abstracted here: received blocks arrive asynchronously
//! and are handed to the engine through `gaskit_core::handoff`.

/// UART transmitter
///
/// A dispenser channel is half-duplex, so a transmission occupies the line
/// until it completes. Implementations must bound the call with a short
/// timeout rather than wait indefinitely.
pub trait UartTx {
    /// Error type for transmit operations
    type Error: core::fmt::Debug;

    /// Write data to the UART
    ///
    /// Blocks until all data has been written or an error occurs.
    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Flush any buffered data
    fn flush(&mut self) -> Result<(), Self::Error>;
}

impl<T: UartTx + ?Sized> UartTx for &mut T {
    type Error = T::Error;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        T::write_blocking(self, data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        T::flush(self)
    }
}
