//! Dispenser UART receive task
//!
//! Waits for idle-line completion of each response block and deposits it
//! into the channel's handoff. Reception is re-armed as soon as the block is
//! deposited, whether or not the poll loop has consumed the previous one.

use defmt::*;
use embassy_stm32::mode::Async;
use embassy_stm32::usart::UartRx;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Timer};

use gaskit_core::{Deposit, ReceiveHandoff, RX_BUFFER_SIZE};

/// Receive task, one instance per dispenser channel
#[embassy_executor::task(pool_size = 2)]
pub async fn uart_rx_task(
    unit: usize,
    mut rx: UartRx<'static, Async>,
    handoff: &'static ReceiveHandoff<CriticalSectionRawMutex>,
) {
    info!("UNIT{} RX task started", unit + 1);

    let mut buf = [0u8; RX_BUFFER_SIZE];

    loop {
        match rx.read_until_idle(&mut buf).await {
            Ok(0) => {}
            Ok(n) => {
                trace!("UNIT{} RAW RX: {=[u8]:02x}", unit + 1, &buf[..n]);
                match handoff.deposit(&buf[..n]) {
                    Deposit::Stored => {}
                    Deposit::Overwrote => debug!("UNIT{} unconsumed block replaced", unit + 1),
                    Deposit::Rejected => warn!("UNIT{} oversized block dropped", unit + 1),
                }
            }
            Err(e) => {
                warn!("UNIT{} UART read error: {:?}", unit + 1, e);
                Timer::after(Duration::from_millis(10)).await;
            }
        }
    }
}
