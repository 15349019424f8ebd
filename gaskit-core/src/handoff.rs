//! Receive handoff
//!
//! One slot per serial channel that carries a completed response block from
//! the reception context (UART idle-line interrupt or receive task) to the
//! poll loop.
//!
//! The ready flag and the block live behind a single blocking mutex, so the
//! depositor and the consumer always see them change together. The critical
//! section covers only a copy of at most [`RX_BUFFER_SIZE`] bytes.
//!
//! The slot holds one block. A block deposited before the previous one was
//! taken replaces it; the older block is lost.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use heapless::Vec;

/// Receive buffer size per channel
pub const RX_BUFFER_SIZE: usize = 64;

/// One received block
pub type RxBlock = Vec<u8, RX_BUFFER_SIZE>;

/// Result of depositing a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Deposit {
    /// Slot was empty
    Stored,
    /// Slot held an unconsumed block, which was replaced
    Overwrote,
    /// Block larger than [`RX_BUFFER_SIZE`]; slot left untouched
    Rejected,
}

struct Slot {
    block: RxBlock,
    ready: bool,
}

/// Single-slot mailbox between reception and the poll loop
pub struct ReceiveHandoff<M: RawMutex> {
    slot: Mutex<M, RefCell<Slot>>,
}

impl<M: RawMutex> ReceiveHandoff<M> {
    /// Create an empty handoff
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(RefCell::new(Slot {
                block: Vec::new(),
                ready: false,
            })),
        }
    }

    /// Deposit a completed block (reception side)
    pub fn deposit(&self, bytes: &[u8]) -> Deposit {
        if bytes.len() > RX_BUFFER_SIZE {
            return Deposit::Rejected;
        }

        self.slot.lock(|cell| {
            let mut slot = cell.borrow_mut();
            let overwrote = slot.ready;
            slot.block.clear();
            // Cannot fail: length checked above
            let _ = slot.block.extend_from_slice(bytes);
            slot.ready = true;
            if overwrote {
                Deposit::Overwrote
            } else {
                Deposit::Stored
            }
        })
    }

    /// Take the pending block, if any (poll side)
    pub fn take(&self) -> Option<RxBlock> {
        self.slot.lock(|cell| {
            let mut slot = cell.borrow_mut();
            if !slot.ready {
                return None;
            }
            slot.ready = false;
            Some(core::mem::take(&mut slot.block))
        })
    }
}

impl<M: RawMutex> Default for ReceiveHandoff<M> {
    fn default() -> Self {
        Self::new()
    }
}
