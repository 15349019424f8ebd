//! Command sequencer
//!
//! Drives one dispenser through the fixed exchange of requests: status poll,
//! volume and amount readouts while fuel flows, final settlement once the
//! dispenser stops, and transaction close once the nozzle is hung up.
//!
//! The decision logic is a pure function, [`step`], from the current state,
//! a snapshot of the unit and an optional received frame to a [`Step`]: the
//! next state plus a list of [`Effect`]s. The unit controller applies the
//! effects (transmit, field updates, notices).

pub mod effects;
pub mod machine;
pub mod state;

pub use effects::{Effect, Level, Notice, MAX_EFFECTS};
pub use machine::{entry_effects, step, Step, StepContext, MAX_READ_RETRIES};
pub use state::SequencerState;
