//! Host-side fakes shared by unit tests

use std::vec::Vec;

use gaskit_hal::{NvMemory, UartTx};
use gaskit_protocol::{encode, Address, MAX_FRAME_SIZE};

/// Records every transmitted frame
#[derive(Debug, Default)]
pub struct RecordingTx {
    pub sent: Vec<Vec<u8>>,
}

impl RecordingTx {
    pub fn new() -> Self {
        Self::default()
    }

    /// Command letters of all transmitted frames, in order
    pub fn commands(&self) -> Vec<u8> {
        self.sent.iter().map(|frame| frame[3]).collect()
    }

    /// Payload of the last transmitted frame
    pub fn last_payload(&self) -> Option<&[u8]> {
        self.sent.last().map(|frame| &frame[4..frame.len() - 1])
    }
}

impl UartTx for RecordingTx {
    type Error = ();

    fn write_blocking(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.sent.push(data.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Transmitter whose every write fails
#[derive(Debug, Default)]
pub struct FailingTx;

impl UartTx for FailingTx {
    type Error = ();

    fn write_blocking(&mut self, _data: &[u8]) -> Result<(), Self::Error> {
        Err(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// RAM-backed non-volatile memory
#[derive(Debug)]
pub struct MemNv {
    pub bytes: Vec<u8>,
    pub writes: usize,
}

impl MemNv {
    /// Zero-filled memory
    pub fn new(size: usize) -> Self {
        Self {
            bytes: std::vec![0; size],
            writes: 0,
        }
    }

    /// Memory as shipped from the factory
    pub fn erased(size: usize) -> Self {
        Self {
            bytes: std::vec![0xFF; size],
            writes: 0,
        }
    }

    fn range(&self, offset: u16, len: usize) -> Result<core::ops::Range<usize>, ()> {
        let start = usize::from(offset);
        let end = start + len;
        if end > self.bytes.len() {
            return Err(());
        }
        Ok(start..end)
    }
}

impl NvMemory for MemNv {
    type Error = ();

    fn read(&mut self, offset: u16, buf: &mut [u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, buf.len())?;
        buf.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, offset: u16, data: &[u8]) -> Result<(), Self::Error> {
        let range = self.range(offset, data.len())?;
        self.bytes[range].copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

/// Encoded response from the unit at `00 01`
pub fn response(command: u8, payload: &[u8]) -> heapless::Vec<u8, MAX_FRAME_SIZE> {
    encode(Address::new(0x00, 0x01), command, payload)
}
