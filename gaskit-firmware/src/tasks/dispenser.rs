//! Dispenser engine task
//!
//! Owns the [`DispenserManager`] and the price store. Every tick it applies
//! queued console commands, polls every unit once and publishes the unit
//! snapshots when they change.

use defmt::*;
use embassy_stm32::i2c::I2c;
use embassy_stm32::mode::Blocking;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Delay, Duration, Instant, Ticker};

use gaskit_core::{
    check_amount_preset, check_volume_preset, DispenserManager, Millis, PriceStore,
};
use gaskit_drivers::eeprom::At24;

use crate::channels::{DispenserCommand, UnitsView, COMMAND_CHANNEL, UNITS_VIEW};
use crate::config::UNIT_COUNT;
use crate::serial::SerialTx;

/// Poll loop period
const POLL_INTERVAL_MS: u64 = 5;

pub type Manager = DispenserManager<'static, CriticalSectionRawMutex, SerialTx>;
pub type Eeprom = At24<I2c<'static, Blocking>, Delay>;

/// Current tick for the engine
pub fn now() -> Millis {
    // Truncation is intended: the engine works on a wrapping 32-bit tick
    Millis(Instant::now().as_millis() as u32)
}

#[embassy_executor::task]
pub async fn dispenser_task(mut manager: Manager, mut prices: PriceStore<Eeprom>) {
    info!("Dispenser task started ({} units)", manager.unit_count());

    let mut ticker = Ticker::every(Duration::from_millis(POLL_INTERVAL_MS));
    let mut published: Option<UnitsView> = None;

    loop {
        while let Ok(command) = COMMAND_CHANNEL.try_receive() {
            handle_command(&mut manager, &mut prices, command);
        }

        manager.poll(now());

        let view = units_view(&manager);
        if published != Some(view) {
            UNITS_VIEW.signal(view);
            published = Some(view);
        }

        ticker.next().await;
    }
}

fn handle_command(manager: &mut Manager, prices: &mut PriceStore<Eeprom>, command: DispenserCommand) {
    debug!("Command: {:?}", command);

    match command {
        DispenserCommand::StartByVolume {
            unit,
            nozzle,
            volume_cl,
        } => {
            let Some(price) = manager.unit(unit).map(|u| u.price()) else {
                return;
            };
            match check_volume_preset(volume_cl, price) {
                Ok(()) => manager.start_by_volume(unit, nozzle, volume_cl, price),
                Err(e) => warn!("UNIT{} volume preset rejected: {:?}", unit + 1, e),
            }
        }
        DispenserCommand::StartByAmount {
            unit,
            nozzle,
            amount,
        } => {
            let Some(price) = manager.unit(unit).map(|u| u.price()) else {
                return;
            };
            match check_amount_preset(amount, price) {
                Ok(()) => manager.start_by_amount(unit, nozzle, amount, price),
                Err(e) => warn!("UNIT{} amount preset rejected: {:?}", unit + 1, e),
            }
        }
        DispenserCommand::Stop(unit) => manager.stop(unit),
        DispenserCommand::Resume(unit) => manager.resume(unit),
        DispenserCommand::CloseTransaction(unit) => manager.close_transaction(unit),
        DispenserCommand::RequestTotalizer(unit) => manager.request_totalizer(unit),
        DispenserCommand::SetPrice { unit, price } => {
            if unit >= manager.unit_count() {
                return;
            }
            match prices.save(unit, price) {
                Ok(()) => {
                    manager.set_price(unit, price);
                    info!("UNIT{} price set to {}", unit + 1, price);
                }
                Err(e) => warn!("UNIT{} price not saved: {:?}", unit + 1, e),
            }
        }
        DispenserCommand::SetActiveUnit(unit) => manager.set_active_unit(unit),
    }
}

fn units_view(manager: &Manager) -> UnitsView {
    let mut units = [None; UNIT_COUNT];
    for (index, slot) in units.iter_mut().enumerate() {
        *slot = manager.snapshot(index);
    }
    UnitsView {
        units,
        active_unit: manager.active_unit(),
    }
}
