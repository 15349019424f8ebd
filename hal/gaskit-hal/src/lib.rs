//! GasKit Hardware Abstraction Layer
//!
//! This crate defines the hardware seams the protocol engine depends on.
//! Chip-specific code (the STM32 firmware, host test fakes) implements them,
//! so the engine itself never touches a peripheral.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  gaskit-firmware (embassy, STM32H7)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  gaskit-core (engine, price store)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  gaskit-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::UartTx`] - Bounded blocking serial transmit
//! - [`nvmem::NvMemory`] - Byte-addressed non-volatile memory

#![no_std]
#![deny(unsafe_code)]

pub mod nvmem;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use nvmem::NvMemory;
pub use uart::UartTx;
