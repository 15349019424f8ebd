//! Inter-task communication channels
//!
//! Defines the statics shared between Embassy tasks: one receive handoff per
//! dispenser channel, the command queue from the operator console and the
//! published unit snapshots.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use gaskit_core::{ReceiveHandoff, UnitSnapshot};

use crate::config::UNIT_COUNT;

/// Command queue capacity
const COMMAND_CHANNEL_SIZE: usize = 8;

/// Receive handoffs, indexed by unit
pub static RX_HANDOFFS: [ReceiveHandoff<CriticalSectionRawMutex>; UNIT_COUNT] =
    [const { ReceiveHandoff::new() }; UNIT_COUNT];

/// Operator console request
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum DispenserCommand {
    StartByVolume {
        unit: usize,
        nozzle: u8,
        volume_cl: u32,
    },
    StartByAmount {
        unit: usize,
        nozzle: u8,
        amount: u32,
    },
    Stop(usize),
    Resume(usize),
    CloseTransaction(usize),
    RequestTotalizer(usize),
    /// Change and persist the price of one unit
    SetPrice {
        unit: usize,
        price: u32,
    },
    SetActiveUnit(usize),
}

/// Commands from the operator console to the dispenser task
pub static COMMAND_CHANNEL: Channel<CriticalSectionRawMutex, DispenserCommand, COMMAND_CHANNEL_SIZE> =
    Channel::new();

/// Latest snapshot of every unit plus the active unit index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitsView {
    pub units: [Option<UnitSnapshot>; UNIT_COUNT],
    pub active_unit: usize,
}

/// Signalled by the dispenser task whenever a snapshot changes
pub static UNITS_VIEW: Signal<CriticalSectionRawMutex, UnitsView> = Signal::new();
