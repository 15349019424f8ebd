//! GasKit Dispenser Protocol
//!
//! This crate defines the half-duplex serial protocol spoken between the
//! controller and a fuel dispenser. Every exchange is a single request frame
//! followed by a single response frame.
//!
//! # Protocol Overview
//!
//! All messages use the same binary frame format:
//! ```text
//! ┌─────┬───────────┬──────────┬─────────┬────────────┬──────────┐
//! │ STX │ ADDR HIGH │ ADDR LOW │ COMMAND │ PAYLOAD    │ CHECKSUM │
//! │ 1B  │ 1B        │ 1B       │ 1B      │ 0–22B      │ 1B       │
//! └─────┴───────────┴──────────┴─────────┴────────────┴──────────┘
//! ```
//!
//! The checksum is a plain XOR of every byte from ADDR HIGH through the end
//! of the payload. Commands are single ASCII letters; payload fields are
//! ASCII digits.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod command;
pub mod frame;
pub mod request;
pub mod response;
pub mod status;

pub use command::Command;
pub use frame::{
    checksum, decode, encode, Address, DecodeError, Frame, FRAME_START, MAX_FRAME_SIZE,
    MAX_PAYLOAD_SIZE, MIN_FRAME_SIZE,
};
pub use request::{preset_payload, PresetPayload, TOTALIZER_ALL_NOZZLES};
pub use response::{
    AmountReadout, ResponseError, Settlement, TotalizerReport, VolumeReadout,
};
pub use status::{StatusCode, UnitStatus};
