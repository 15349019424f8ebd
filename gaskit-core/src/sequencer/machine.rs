//! Pure transition function
//!
//! [`step`] decides what a unit does next from its current state, a
//! read-only view of the unit ([`StepContext`]) and at most one received
//! frame. It never transmits, logs or mutates anything; the unit controller
//! applies the returned [`Effect`]s.

use heapless::Vec;

use gaskit_protocol::{
    AmountReadout, Command, Frame, ResponseError, Settlement, StatusCode, UnitStatus,
    VolumeReadout,
};

use super::effects::{Effect, Notice, MAX_EFFECTS};
use super::state::SequencerState;
use crate::config::TimingConfig;

/// Re-sends allowed for status, volume and amount reads
pub const MAX_READ_RETRIES: u8 = 3;

/// Read-only view of the unit fields a step depends on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StepContext {
    /// Last dispenser-reported status
    pub status: UnitStatus,
    /// Time since the current state (or current retry) was entered
    pub elapsed_ms: u32,
    /// Re-sends already made from the current wait state
    pub retry_count: u8,
    pub final_settlement_sent: bool,
    /// Volume or amount left over from a previous cycle
    pub has_transaction_data: bool,
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// State to enter, `None` to stay
    pub next: Option<SequencerState>,
    /// Effects to apply, in order, before the state change
    pub effects: Vec<Effect, MAX_EFFECTS>,
    /// Whether the frame passed in was the response this state waits for
    pub consumed: bool,
}

impl Step {
    fn stay() -> Self {
        Self {
            next: None,
            effects: Vec::new(),
            consumed: false,
        }
    }

    fn to(state: SequencerState) -> Self {
        Self {
            next: Some(state),
            ..Self::stay()
        }
    }

    fn with(mut self, effect: Effect) -> Self {
        // Capacity covers the longest branch below
        let _ = self.effects.push(effect);
        self
    }

    fn notify(self, notice: Notice) -> Self {
        self.with(Effect::Notify(notice))
    }

    fn consume(mut self) -> Self {
        self.consumed = true;
        self
    }
}

/// What a wait state does when its timeout elapses
enum OnTimeout {
    /// Re-send `resend` while retries remain, then enter `exhausted`
    Retry {
        resend: Command,
        exhausted: SequencerState,
    },
    /// Enter the given state without retrying
    GiveUp(SequencerState),
}

/// Effects applied when a state is entered
pub fn entry_effects(state: SequencerState) -> Vec<Effect, MAX_EFFECTS> {
    let mut effects = Vec::new();
    if state == SequencerState::Error {
        let _ = effects.push(Effect::MarkDisconnected);
        let _ = effects.push(Effect::SetFinalSettlementSent(false));
    }
    effects
}

/// Advance one state by one step
pub fn step(
    state: SequencerState,
    ctx: &StepContext,
    frame: Option<&Frame>,
    timing: &TimingConfig,
) -> Step {
    use SequencerState::*;

    if let Some(command) = state.request() {
        return Step::to(wait_state_for(state)).with(Effect::Transmit(command));
    }

    match state {
        Idle => {
            let interval = if ctx.status.is_active() {
                timing.fuelling_poll_ms
            } else {
                timing.idle_poll_ms
            };
            if ctx.elapsed_ms >= interval {
                Step::to(SendStatus)
            } else {
                Step::stay()
            }
        }

        WaitStatus => match frame.filter(|f| f.command == Command::Status.as_byte()) {
            Some(frame) => on_status(ctx, frame).consume(),
            None => on_timeout(
                state,
                ctx,
                timing.response_timeout_ms,
                OnTimeout::Retry {
                    resend: Command::Status,
                    exhausted: Error,
                },
            ),
        },

        WaitVolumeReadout => {
            match frame.filter(|f| f.command == Command::VolumeReadout.as_byte()) {
                Some(frame) => {
                    let step = Step::to(SendAmountReadout).consume();
                    match VolumeReadout::parse(frame) {
                        Ok(readout) => step
                            .with(Effect::RecordVolume(readout))
                            .notify(Notice::Volume(readout)),
                        Err(error) => step.notify(malformed(Command::VolumeReadout, error)),
                    }
                }
                None => on_timeout(
                    state,
                    ctx,
                    timing.response_timeout_ms,
                    OnTimeout::Retry {
                        resend: Command::VolumeReadout,
                        exhausted: Idle,
                    },
                ),
            }
        }

        WaitAmountReadout => {
            match frame.filter(|f| f.command == Command::AmountReadout.as_byte()) {
                Some(frame) => {
                    // Keep the status/volume/amount cycle running while fuel flows
                    let next = if ctx.status == UnitStatus::Fuelling {
                        SendStatus
                    } else {
                        Idle
                    };
                    let step = Step::to(next).consume();
                    match AmountReadout::parse(frame) {
                        Ok(readout) => step
                            .with(Effect::RecordAmount(readout.amount))
                            .notify(Notice::Amount(readout.amount)),
                        Err(error) => step.notify(malformed(Command::AmountReadout, error)),
                    }
                }
                None => on_timeout(
                    state,
                    ctx,
                    timing.response_timeout_ms,
                    OnTimeout::Retry {
                        resend: Command::AmountReadout,
                        exhausted: Idle,
                    },
                ),
            }
        }

        WaitFinalSettlement => {
            match frame.filter(|f| f.command == Command::FinalSettlement.as_byte()) {
                Some(frame) => {
                    // finalSettlementSent stays set until the transaction closes
                    let step = Step::to(Idle).consume();
                    match Settlement::parse(frame) {
                        Ok(settlement) => step
                            .with(Effect::RecordSettlement(settlement))
                            .notify(Notice::Settlement(settlement)),
                        Err(error) => step.notify(malformed(Command::FinalSettlement, error)),
                    }
                }
                None => on_timeout(
                    state,
                    ctx,
                    timing.response_timeout_ms,
                    OnTimeout::GiveUp(Idle),
                ),
            }
        }

        // Any frame acknowledges the close, except a totalizer report
        WaitClose => match frame.filter(|f| f.command != Command::Totalizer.as_byte()) {
            Some(_) => Step::to(SendStatus)
                .consume()
                .with(Effect::SetFinalSettlementSent(false))
                .with(Effect::SetTransactionClosed(false))
                .notify(Notice::CloseAcknowledged),
            None => on_timeout(
                state,
                ctx,
                timing.close_timeout_ms,
                OnTimeout::GiveUp(SendStatus),
            ),
        },

        Error => {
            if ctx.elapsed_ms >= timing.recovery_ms {
                Step::to(Idle).notify(Notice::Recovered)
            } else {
                Step::stay()
            }
        }

        // Send states were handled above
        SendStatus | SendVolumeReadout | SendAmountReadout | SendFinalSettlement | SendClose => {
            Step::stay()
        }
    }
}

fn wait_state_for(state: SequencerState) -> SequencerState {
    match state {
        SequencerState::SendStatus => SequencerState::WaitStatus,
        SequencerState::SendVolumeReadout => SequencerState::WaitVolumeReadout,
        SequencerState::SendAmountReadout => SequencerState::WaitAmountReadout,
        SequencerState::SendFinalSettlement => SequencerState::WaitFinalSettlement,
        SequencerState::SendClose => SequencerState::WaitClose,
        other => other,
    }
}

fn malformed(command: Command, error: ResponseError) -> Notice {
    Notice::MalformedResponse { command, error }
}

fn on_timeout(
    state: SequencerState,
    ctx: &StepContext,
    timeout_ms: u32,
    policy: OnTimeout,
) -> Step {
    if ctx.elapsed_ms < timeout_ms {
        return Step::stay();
    }

    match policy {
        OnTimeout::Retry { resend, exhausted } => {
            if ctx.retry_count < MAX_READ_RETRIES {
                Step::stay()
                    .notify(Notice::ResponseTimeout {
                        state,
                        attempt: ctx.retry_count + 1,
                    })
                    .with(Effect::Transmit(resend))
                    .with(Effect::RetryWait)
            } else {
                Step::to(exhausted).notify(Notice::RetriesExhausted { state })
            }
        }
        OnTimeout::GiveUp(next) => {
            Step::to(next).notify(Notice::ResponseTimeout { state, attempt: 1 })
        }
    }
}

/// Decode a status response and pick the follow-up state
fn on_status(ctx: &StepContext, frame: &Frame) -> Step {
    let Some(code) = StatusCode::parse(&frame.payload) else {
        return Step::to(SequencerState::Idle)
            .notify(malformed(Command::Status, ResponseError::TooShort));
    };

    let (status, step) = match code.classify() {
        Some(status) => (status, Step::stay().notify(Notice::Status { code, status })),
        None => (
            UnitStatus::Idle,
            Step::stay().notify(Notice::UnknownStatus(code)),
        ),
    };
    let step = step.with(Effect::SetStatus {
        status,
        nozzle: code.nozzle_number(),
    });

    if !status.needs_action() {
        let step = Step {
            next: Some(SequencerState::Idle),
            ..step
        };
        return match status {
            UnitStatus::Authorized if ctx.has_transaction_data => step
                .with(Effect::ResetTransaction)
                .notify(Notice::StaleTransactionReset),
            _ => step,
        };
    }

    match status {
        UnitStatus::Fuelling => Step {
            next: Some(SequencerState::SendVolumeReadout),
            ..step
        },
        UnitStatus::Stopped if !ctx.final_settlement_sent => Step {
            next: Some(SequencerState::SendFinalSettlement),
            ..step
        }
        .with(Effect::SetFinalSettlementSent(true))
        .notify(Notice::SettlementRequested),
        UnitStatus::Stopped => Step {
            next: Some(SequencerState::Idle),
            ..step
        }
        .notify(Notice::SettlementPending),
        // Ended
        _ => Step {
            next: Some(SequencerState::SendClose),
            ..step
        }
        .with(Effect::SetFinalSettlementSent(false))
        .with(Effect::SetTransactionClosed(true))
        .notify(Notice::TransactionEnded),
    }
}
