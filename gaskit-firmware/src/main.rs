//! GasKit Dispenser Controller Firmware
//!
//! Main entry point for the STM32H743 controller board. Drives two fuel
//! dispensers over independent USART channels and keeps unit prices in an
//! AT24C256 EEPROM.

#![no_std]
#![no_main]

mod channels;
mod config;
mod serial;
mod tasks;

use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::bind_interrupts;
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::peripherals::{USART2, USART3};
use embassy_stm32::usart::{self, Uart};
use embassy_time::Delay;
use {defmt_rtt as _, panic_probe as _};

use gaskit_core::{Channel, DispenserManager, PriceStore};
use gaskit_drivers::eeprom::{At24, AT24C256};

use crate::channels::RX_HANDOFFS;
use crate::serial::SerialTx;

bind_interrupts!(struct Irqs {
    USART2 => usart::InterruptHandler<USART2>;
    USART3 => usart::InterruptHandler<USART3>;
});

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("GasKit Dispenser Controller starting...");

    let p = embassy_stm32::init(Default::default());
    let config = config::dispenser_config();

    // Dispenser channels: UNIT1 on USART2 (PA2=TX, PA3=RX), UNIT2 on USART3 (PB10=TX, PB11=RX)
    let mut uart_config = usart::Config::default();
    uart_config.baudrate = config::BAUDRATE;

    let uart1 = Uart::new(
        p.USART2,
        p.PA3, // RX
        p.PA2, // TX
        Irqs,
        p.DMA1_CH0,
        p.DMA1_CH1,
        uart_config,
    )
    .unwrap();
    let uart2 = Uart::new(
        p.USART3,
        p.PB11, // RX
        p.PB10, // TX
        Irqs,
        p.DMA1_CH2,
        p.DMA1_CH3,
        uart_config,
    )
    .unwrap();

    let (tx1, rx1) = uart1.split();
    let (tx2, rx2) = uart2.split();

    // Price EEPROM on I2C1 (PB6=SCL, PB7=SDA)
    let i2c = I2c::new_blocking(p.I2C1, p.PB6, p.PB7, i2c::Config::default());
    let eeprom = At24::new(i2c, Delay, AT24C256);
    let mut prices = PriceStore::new(eeprom, config.default_price);

    let channels = [
        Channel::new(&RX_HANDOFFS[0], SerialTx::new(tx1)),
        Channel::new(&RX_HANDOFFS[1], SerialTx::new(tx2)),
    ];
    let mut manager = match DispenserManager::new(&config, channels, tasks::dispenser::now()) {
        Ok(manager) => manager,
        Err(e) => defmt::panic!("Invalid dispenser configuration: {:?}", e),
    };

    for unit in 0..manager.unit_count() {
        match prices.load(unit) {
            Ok(load) => {
                if load.repaired {
                    warn!("UNIT{} stored price invalid, reset to {}", unit + 1, load.price);
                }
                manager.set_price(unit, load.price);
                info!("UNIT{} price {}", unit + 1, load.price);
            }
            Err(e) => error!("UNIT{} price load failed: {:?}", unit + 1, e),
        }
    }

    spawner.spawn(tasks::uart_rx_task(0, rx1, &RX_HANDOFFS[0])).unwrap();
    spawner.spawn(tasks::uart_rx_task(1, rx2, &RX_HANDOFFS[1])).unwrap();
    spawner.spawn(tasks::dispenser_task(manager, prices)).unwrap();

    info!("All tasks spawned");
}
