//! Sequencer states

use gaskit_protocol::Command;

/// Sequencer states
///
/// Exactly one is active per unit. Every `Send*` state transmits its request
/// and moves to the matching `Wait*` state on the same step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SequencerState {
    /// Waiting for the next status poll to fall due
    #[default]
    Idle,
    SendStatus,
    WaitStatus,
    SendVolumeReadout,
    WaitVolumeReadout,
    SendAmountReadout,
    WaitAmountReadout,
    SendFinalSettlement,
    WaitFinalSettlement,
    SendClose,
    WaitClose,
    /// Communication failed; polling resumes after the recovery window
    Error,
}

impl SequencerState {
    /// Request transmitted by this state, for `Send*` states
    pub fn request(self) -> Option<Command> {
        match self {
            SequencerState::SendStatus => Some(Command::Status),
            SequencerState::SendVolumeReadout => Some(Command::VolumeReadout),
            SequencerState::SendAmountReadout => Some(Command::AmountReadout),
            SequencerState::SendFinalSettlement => Some(Command::FinalSettlement),
            SequencerState::SendClose => Some(Command::CloseTransaction),
            _ => None,
        }
    }

    /// Check if this state is waiting for a response
    pub fn is_wait(self) -> bool {
        matches!(
            self,
            SequencerState::WaitStatus
                | SequencerState::WaitVolumeReadout
                | SequencerState::WaitAmountReadout
                | SequencerState::WaitFinalSettlement
                | SequencerState::WaitClose
        )
    }
}
