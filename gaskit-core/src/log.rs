//! Notice logging
//!
//! With the `defmt` feature every notice is emitted at its own level.
//! Without it notices only reach the caller-supplied observer.

use crate::sequencer::Notice;

#[cfg(feature = "defmt")]
pub(crate) fn notice(unit: u8, notice: &Notice) {
    use crate::sequencer::Level;

    match notice.level() {
        Level::Trace => defmt::trace!("UNIT{} {}", unit + 1, notice),
        Level::Debug => defmt::debug!("UNIT{} {}", unit + 1, notice),
        Level::Info => defmt::info!("UNIT{} {}", unit + 1, notice),
        Level::Warn => defmt::warn!("UNIT{} {}", unit + 1, notice),
    }
}

#[cfg(not(feature = "defmt"))]
pub(crate) fn notice(unit: u8, notice: &Notice) {
    let _ = (unit, notice);
}
