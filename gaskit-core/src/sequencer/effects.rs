//! Effects and notices produced by a sequencer step

use gaskit_protocol::{
    Command, DecodeError, ResponseError, Settlement, StatusCode, TotalizerReport, UnitStatus,
    VolumeReadout,
};

use super::state::SequencerState;

/// Upper bound on effects produced by one step
pub const MAX_EFFECTS: usize = 6;

/// Something the unit controller must do as a result of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Effect {
    /// Transmit a request without payload
    Transmit(Command),
    /// Count a retry and restart the wait timer, staying in the wait state
    RetryWait,
    /// Record the dispenser-reported status
    SetStatus { status: UnitStatus, nozzle: u8 },
    /// Zero volume, amount and transaction id
    ResetTransaction,
    RecordVolume(VolumeReadout),
    RecordAmount(u32),
    RecordSettlement(Settlement),
    SetFinalSettlementSent(bool),
    SetTransactionClosed(bool),
    /// Clear the connected flag
    MarkDisconnected,
    /// Report a notice
    Notify(Notice),
}

/// Log level of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
}

/// Observable events of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Notice {
    StateChanged {
        from: SequencerState,
        to: SequencerState,
    },
    /// A wait state timed out; `attempt` counts from 1
    ResponseTimeout { state: SequencerState, attempt: u8 },
    /// A wait state timed out with no retries left
    RetriesExhausted { state: SequencerState },
    Status { code: StatusCode, status: UnitStatus },
    /// Status code outside the known table, treated as idle
    UnknownStatus(StatusCode),
    /// New authorization found stale transaction data, which was cleared
    StaleTransactionReset,
    SettlementRequested,
    /// Dispenser still stopped but settlement was already requested
    SettlementPending,
    /// Nozzle hung up after completion; closing the transaction
    TransactionEnded,
    Volume(VolumeReadout),
    Amount(u32),
    Settlement(Settlement),
    /// Expected response arrived but its payload did not match the layout
    MalformedResponse {
        command: Command,
        error: ResponseError,
    },
    CloseAcknowledged,
    Totalizer(TotalizerReport),
    /// Frame not consumed by the sequencer and not a totalizer report
    UnexpectedCommand(u8),
    /// Received block was not a valid frame
    DroppedFrame(DecodeError),
    Transmitted(Command),
    TransmitFailed(Command),
    /// Liveness window exceeded
    Disconnected,
    /// Error state recovery window elapsed
    Recovered,
}

impl Notice {
    /// Level the notice is logged at
    pub fn level(&self) -> Level {
        match self {
            Notice::Transmitted(_) | Notice::Status { .. } => Level::Trace,
            Notice::StateChanged { .. }
            | Notice::Volume(_)
            | Notice::Amount(_)
            | Notice::SettlementPending
            | Notice::DroppedFrame(_) => Level::Debug,
            Notice::StaleTransactionReset
            | Notice::SettlementRequested
            | Notice::TransactionEnded
            | Notice::Settlement(_)
            | Notice::CloseAcknowledged
            | Notice::Totalizer(_)
            | Notice::Recovered => Level::Info,
            Notice::ResponseTimeout { .. }
            | Notice::RetriesExhausted { .. }
            | Notice::UnknownStatus(_)
            | Notice::MalformedResponse { .. }
            | Notice::UnexpectedCommand(_)
            | Notice::TransmitFailed(_)
            | Notice::Disconnected => Level::Warn,
        }
    }
}
