//! Blocking transmit adapter for the dispenser channels

use embassy_stm32::mode::Async;
use embassy_stm32::usart::{self, UartTx as Stm32UartTx};

use gaskit_hal::UartTx;

/// USART transmitter driven in blocking mode
///
/// A frame is at most 27 bytes, so a blocking write at the dispenser baud
/// rate stays within a few tens of milliseconds.
pub struct SerialTx {
    tx: Stm32UartTx<'static, Async>,
}

impl SerialTx {
    pub fn new(tx: Stm32UartTx<'static, Async>) -> Self {
        Self { tx }
    }
}

impl UartTx for SerialTx {
    type Error = usart::Error;

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.tx.blocking_write(data)
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.tx.blocking_flush()
    }
}
