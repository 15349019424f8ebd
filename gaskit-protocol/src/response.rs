//! Typed readout responses
//!
//! Readout payloads are fixed-column ASCII. Numeric fields are parsed the
//! way the dispenser firmware expects its own output to be read: leading
//! digits only, stopping at the first non-digit, so a field padded with a
//! separator still yields its value.

use crate::command::Command;
use crate::frame::Frame;

/// Errors from typed response parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ResponseError {
    /// Frame carries a different command letter
    WrongCommand,
    /// Payload is shorter than the fixed layout
    TooShort,
}

/// Parse the leading decimal digits of a field
///
/// Leading spaces are skipped; an empty digit run yields 0.
pub(crate) fn parse_digits(field: &[u8]) -> u64 {
    field
        .iter()
        .skip_while(|&&byte| byte == b' ')
        .take_while(|byte| byte.is_ascii_digit())
        .fold(0u64, |acc, &byte| {
            acc.saturating_mul(10).saturating_add(u64::from(byte - b'0'))
        })
}

fn expect(frame: &Frame, command: Command, min_len: usize) -> Result<&[u8], ResponseError> {
    if frame.command != command.as_byte() {
        return Err(ResponseError::WrongCommand);
    }
    if frame.payload.len() < min_len {
        return Err(ResponseError::TooShort);
    }
    Ok(&frame.payload)
}

fn digit_value(byte: u8) -> u8 {
    byte.wrapping_sub(b'0')
}

/// Volume readout (`L`): `N T ? ? V V V V V V`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VolumeReadout {
    pub nozzle: u8,
    /// Transaction id character
    pub transaction_id: u8,
    pub volume_cl: u32,
}

impl VolumeReadout {
    pub const MIN_LEN: usize = 10;

    pub fn parse(frame: &Frame) -> Result<Self, ResponseError> {
        let payload = expect(frame, Command::VolumeReadout, Self::MIN_LEN)?;
        Ok(Self {
            nozzle: digit_value(payload[0]),
            transaction_id: payload[1],
            volume_cl: parse_digits(&payload[4..10]) as u32,
        })
    }
}

/// Amount readout (`R`): amount in columns 4..10
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AmountReadout {
    pub amount: u32,
}

impl AmountReadout {
    pub const MIN_LEN: usize = 10;

    pub fn parse(frame: &Frame) -> Result<Self, ResponseError> {
        let payload = expect(frame, Command::AmountReadout, Self::MIN_LEN)?;
        Ok(Self {
            amount: parse_digits(&payload[4..10]) as u32,
        })
    }
}

/// Final settlement (`T`): nozzle, transaction id, amount at 4..10, volume at 11..17
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Settlement {
    pub nozzle: u8,
    pub transaction_id: u8,
    pub amount: u32,
    pub volume_cl: u32,
}

impl Settlement {
    pub const MIN_LEN: usize = 22;

    pub fn parse(frame: &Frame) -> Result<Self, ResponseError> {
        let payload = expect(frame, Command::FinalSettlement, Self::MIN_LEN)?;
        Ok(Self {
            nozzle: digit_value(payload[0]),
            transaction_id: payload[1],
            amount: parse_digits(&payload[4..10]) as u32,
            volume_cl: parse_digits(&payload[11..17]) as u32,
        })
    }
}

/// Totalizer report (`C`): nozzle digit, separator, 9-digit counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TotalizerReport {
    /// Nozzle digit (`0` = all nozzles)
    pub nozzle: u8,
    pub totalizer_cl: u64,
}

impl TotalizerReport {
    pub const MIN_LEN: usize = 11;

    pub fn parse(frame: &Frame) -> Result<Self, ResponseError> {
        let payload = expect(frame, Command::Totalizer, Self::MIN_LEN)?;
        Ok(Self {
            nozzle: digit_value(payload[0]),
            totalizer_cl: parse_digits(&payload[2..11]),
        })
    }
}
