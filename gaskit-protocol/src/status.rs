//! Dispenser status codes
//!
//! A status-poll response carries two ASCII digits: a nozzle/phase digit and
//! a status digit. Together they identify where the dispenser is in its own
//! transaction lifecycle.

/// Dispenser-reported lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UnitStatus {
    /// No transaction (`10`)
    #[default]
    Idle,
    /// Nozzle lifted without authorization (`21`)
    Calling,
    /// Preset accepted, waiting for fuel to flow (`31`)
    Authorized,
    /// Transaction started (`41`)
    Started,
    /// Fuel flowing (`61`)
    Fuelling,
    /// Fuelling completed, nozzle still raised (`81`)
    Stopped,
    /// Nozzle returned after completion (`90`)
    Ended,
}

impl UnitStatus {
    /// Check if this status requires the sequencer to leave the plain poll loop
    ///
    /// Fuelling continues the readout cycle, Stopped requests the final
    /// settlement, Ended closes the transaction.
    pub fn needs_action(self) -> bool {
        matches!(
            self,
            UnitStatus::Fuelling | UnitStatus::Stopped | UnitStatus::Ended
        )
    }

    /// Check if the dispenser is inside an active fuelling cycle
    ///
    /// The sequencer polls faster while this holds.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            UnitStatus::Started | UnitStatus::Fuelling | UnitStatus::Stopped
        )
    }
}

/// Raw two-digit status code from a status-poll response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusCode {
    /// Nozzle/phase digit (ASCII)
    pub nozzle: u8,
    /// Status digit (ASCII)
    pub status: u8,
}

impl StatusCode {
    pub const fn new(nozzle: u8, status: u8) -> Self {
        Self { nozzle, status }
    }

    /// Read the code from a status-poll payload
    ///
    /// Returns `None` if the payload holds fewer than two bytes.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        match payload {
            [nozzle, status, ..] => Some(Self::new(*nozzle, *status)),
            _ => None,
        }
    }

    /// Numeric value of the nozzle digit
    pub fn nozzle_number(&self) -> u8 {
        self.nozzle.wrapping_sub(b'0')
    }

    /// Map the code onto a known lifecycle status
    pub fn classify(&self) -> Option<UnitStatus> {
        match (self.nozzle, self.status) {
            (b'9', b'0') => Some(UnitStatus::Ended),
            (b'1', b'0') => Some(UnitStatus::Idle),
            (b'2', b'1') => Some(UnitStatus::Calling),
            (b'3', b'1') => Some(UnitStatus::Authorized),
            (b'4', b'1') => Some(UnitStatus::Started),
            (b'6', b'1') => Some(UnitStatus::Fuelling),
            (b'8', b'1') => Some(UnitStatus::Stopped),
            _ => None,
        }
    }
}
