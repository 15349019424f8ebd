//! Frame encoding and decoding for the GasKit protocol.
//!
//! Frame format:
//! - STX (1 byte): 0x02 start marker
//! - ADDR HIGH, ADDR LOW (2 bytes): dispenser protocol address
//! - COMMAND (1 byte): ASCII command letter
//! - PAYLOAD (0-22 bytes): ASCII fields, command specific
//! - CHECKSUM (1 byte): XOR of ADDR HIGH through the last PAYLOAD byte
//!
//! There is no length byte. A frame is delimited by the serial idle line,
//! so the decoder always works on one complete received block.

use heapless::Vec;

/// Frame start marker (ASCII STX)
pub const FRAME_START: u8 = 0x02;

/// Maximum payload size in bytes
pub const MAX_PAYLOAD_SIZE: usize = 22;

/// Smallest block that can hold a frame (STX + address + command + checksum)
pub const MIN_FRAME_SIZE: usize = 5;

/// Maximum complete frame size (STX + ADDR + COMMAND + MAX_PAYLOAD + CHECKSUM)
pub const MAX_FRAME_SIZE: usize = 1 + 2 + 1 + MAX_PAYLOAD_SIZE + 1;

/// Errors that can occur while decoding a received block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Fewer than [`MIN_FRAME_SIZE`] bytes
    TooShort,
    /// First byte is not [`FRAME_START`]
    BadMarker,
    /// Trailing byte does not match the computed XOR
    ChecksumMismatch,
}

/// Two-byte dispenser protocol address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Address {
    pub high: u8,
    pub low: u8,
}

impl Address {
    pub const fn new(high: u8, low: u8) -> Self {
        Self { high, low }
    }
}

/// A decoded frame
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    /// Address the frame was sent from / to
    pub address: Address,
    /// Raw command byte (see [`crate::Command`])
    pub command: u8,
    /// Payload data
    pub payload: Vec<u8, MAX_PAYLOAD_SIZE>,
}

impl Frame {
    /// Create a frame, silently truncating the payload to [`MAX_PAYLOAD_SIZE`]
    pub fn new(address: Address, command: u8, payload: &[u8]) -> Self {
        let len = payload.len().min(MAX_PAYLOAD_SIZE);
        let mut payload_vec = Vec::new();
        // Cannot fail: len is clamped to the capacity
        let _ = payload_vec.extend_from_slice(&payload[..len]);
        Self {
            address,
            command,
            payload: payload_vec,
        }
    }
}

/// XOR checksum over a byte slice
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, &byte| acc ^ byte)
}

/// Build a wire frame
///
/// Payloads longer than [`MAX_PAYLOAD_SIZE`] are truncated silently.
pub fn encode(address: Address, command: u8, payload: &[u8]) -> Vec<u8, MAX_FRAME_SIZE> {
    let len = payload.len().min(MAX_PAYLOAD_SIZE);

    let mut buffer = [0u8; MAX_FRAME_SIZE];
    buffer[0] = FRAME_START;
    buffer[1] = address.high;
    buffer[2] = address.low;
    buffer[3] = command;
    buffer[4..4 + len].copy_from_slice(&payload[..len]);
    let end = 4 + len;
    buffer[end] = checksum(&buffer[1..end]);

    let mut frame = Vec::new();
    // Cannot fail: end + 1 <= MAX_FRAME_SIZE
    let _ = frame.extend_from_slice(&buffer[..=end]);
    frame
}

/// Decode one complete received block
///
/// The payload is everything between the command byte and the checksum,
/// clamped to [`MAX_PAYLOAD_SIZE`].
pub fn decode(bytes: &[u8]) -> Result<Frame, DecodeError> {
    if bytes.len() < MIN_FRAME_SIZE {
        return Err(DecodeError::TooShort);
    }
    if bytes[0] != FRAME_START {
        return Err(DecodeError::BadMarker);
    }

    let last = bytes.len() - 1;
    if checksum(&bytes[1..last]) != bytes[last] {
        return Err(DecodeError::ChecksumMismatch);
    }

    Ok(Frame::new(
        Address::new(bytes[1], bytes[2]),
        bytes[3],
        &bytes[4..last],
    ))
}
