//! Dispenser manager
//!
//! Owns one [`UnitController`] per configured unit and is the single entry
//! point for the UI layer. Unit indices are checked here; an index outside
//! the configured range makes an operation a no-op.

use embassy_sync::blocking_mutex::raw::RawMutex;
use heapless::Vec;

use gaskit_hal::UartTx;

use crate::config::{ConfigError, DispenserConfig, MAX_UNITS};
use crate::handoff::ReceiveHandoff;
use crate::sequencer::Notice;
use crate::time::Millis;
use crate::unit::{UnitController, UnitSnapshot};

/// Serial channel bound to one unit
pub struct Channel<'a, M: RawMutex, T: UartTx> {
    /// Receive side, filled by the reception context
    pub handoff: &'a ReceiveHandoff<M>,
    /// Transmit side
    pub tx: T,
}

impl<'a, M: RawMutex, T: UartTx> Channel<'a, M, T> {
    pub fn new(handoff: &'a ReceiveHandoff<M>, tx: T) -> Self {
        Self { handoff, tx }
    }
}

/// All dispenser units plus the UI's active-unit selection
pub struct DispenserManager<'a, M: RawMutex, T: UartTx> {
    units: Vec<UnitController<'a, M, T>, MAX_UNITS>,
    active_unit: usize,
}

impl<'a, M: RawMutex, T: UartTx> DispenserManager<'a, M, T> {
    /// Build the manager from a validated configuration
    ///
    /// `channels` are bound to units in configuration order and must match
    /// the unit count.
    pub fn new<I>(config: &DispenserConfig, channels: I, now: Millis) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = Channel<'a, M, T>>,
    {
        config.validate()?;

        let mut channels = channels.into_iter();
        let mut units = Vec::new();
        for (index, unit) in config.units.iter().enumerate() {
            let channel = channels.next().ok_or(ConfigError::ChannelCountMismatch)?;
            let controller = UnitController::new(
                index as u8,
                unit.address(),
                channel.handoff,
                channel.tx,
                config.timing,
                config.default_price,
                now,
            );
            // Cannot fail: both vectors hold MAX_UNITS
            let _ = units.push(controller);
        }
        if channels.next().is_some() {
            return Err(ConfigError::ChannelCountMismatch);
        }

        Ok(Self {
            units,
            active_unit: 0,
        })
    }

    /// Advance every unit by one step
    pub fn poll(&mut self, now: Millis) {
        self.poll_with(now, |_, _| {});
    }

    /// Advance every unit by one step, reporting notices to `observer`
    pub fn poll_with<F>(&mut self, now: Millis, mut observer: F)
    where
        F: FnMut(u8, &Notice),
    {
        for unit in self.units.iter_mut() {
            unit.poll(now, &mut observer);
        }
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Read access to one unit
    pub fn unit(&self, index: usize) -> Option<&UnitController<'a, M, T>> {
        self.units.get(index)
    }

    pub fn snapshot(&self, index: usize) -> Option<UnitSnapshot> {
        self.unit(index).map(UnitController::snapshot)
    }

    pub fn start_by_volume(&mut self, unit: usize, nozzle: u8, volume_cl: u32, price: u32) {
        if let Some(unit) = self.units.get_mut(unit) {
            unit.start_by_volume(nozzle, volume_cl, price);
        }
    }

    pub fn start_by_amount(&mut self, unit: usize, nozzle: u8, amount: u32, price: u32) {
        if let Some(unit) = self.units.get_mut(unit) {
            unit.start_by_amount(nozzle, amount, price);
        }
    }

    pub fn stop(&mut self, unit: usize) {
        if let Some(unit) = self.units.get_mut(unit) {
            unit.stop();
        }
    }

    pub fn resume(&mut self, unit: usize) {
        if let Some(unit) = self.units.get_mut(unit) {
            unit.resume();
        }
    }

    pub fn close_transaction(&mut self, unit: usize) {
        if let Some(unit) = self.units.get_mut(unit) {
            unit.close_transaction();
        }
    }

    pub fn request_totalizer(&mut self, unit: usize) {
        if let Some(unit) = self.units.get_mut(unit) {
            unit.request_totalizer();
        }
    }

    pub fn set_price(&mut self, unit: usize, price: u32) {
        if let Some(unit) = self.units.get_mut(unit) {
            unit.set_price(price);
        }
    }

    /// Select the unit the UI targets; ignored for an invalid index
    pub fn set_active_unit(&mut self, index: usize) {
        if index < self.units.len() {
            self.active_unit = index;
        }
    }

    pub fn active_unit(&self) -> usize {
        self.active_unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UnitConfig;
    use crate::testing::{response, RecordingTx};
    use crate::SequencerState;
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

    type Handoff = ReceiveHandoff<CriticalSectionRawMutex>;
    type TestManager<'a> = DispenserManager<'a, CriticalSectionRawMutex, RecordingTx>;

    fn manager<'a>(handoffs: &'a [Handoff; 2]) -> TestManager<'a> {
        let channels = handoffs
            .iter()
            .map(|handoff| Channel::new(handoff, RecordingTx::new()));
        DispenserManager::new(&DispenserConfig::default(), channels, Millis(0)).unwrap()
    }

    fn commands(manager: &TestManager<'_>, index: usize) -> std::vec::Vec<u8> {
        manager.unit(index).unwrap().tx().commands()
    }

    #[test]
    fn test_units_bound_in_order() {
        let handoffs = [Handoff::new(), Handoff::new()];
        let manager = manager(&handoffs);
        assert_eq!(manager.unit_count(), 2);
        assert_eq!(
            manager.unit(1).unwrap().address(),
            gaskit_protocol::Address::new(0x00, 0x02)
        );
        assert_eq!(manager.snapshot(0).unwrap().price, 1100);
        assert!(manager.unit(2).is_none());
    }

    #[test]
    fn test_channel_count_mismatch() {
        let handoffs = [Handoff::new(), Handoff::new(), Handoff::new()];
        let config = DispenserConfig::default();

        let short = handoffs[..1]
            .iter()
            .map(|handoff| Channel::new(handoff, RecordingTx::new()));
        assert!(matches!(
            DispenserManager::new(&config, short, Millis(0)),
            Err(ConfigError::ChannelCountMismatch)
        ));

        let long = handoffs
            .iter()
            .map(|handoff| Channel::new(handoff, RecordingTx::new()));
        assert!(matches!(
            DispenserManager::new(&config, long, Millis(0)),
            Err(ConfigError::ChannelCountMismatch)
        ));
    }

    #[test]
    fn test_full_unit_table() {
        let handoffs: [Handoff; MAX_UNITS] = core::array::from_fn(|_| Handoff::new());
        let mut config = DispenserConfig::default();
        config.units.clear();
        for low in 1..=MAX_UNITS as u8 {
            config.units.push(UnitConfig::new(0x00, low)).unwrap();
        }
        assert!(config.units.push(UnitConfig::new(0x00, 0xFF)).is_err());

        let channels = handoffs
            .iter()
            .map(|handoff| Channel::new(handoff, RecordingTx::new()));
        let manager = DispenserManager::new(&config, channels, Millis(0)).unwrap();
        assert_eq!(manager.unit_count(), MAX_UNITS);
        assert_eq!(
            manager.unit(MAX_UNITS - 1).unwrap().address(),
            gaskit_protocol::Address::new(0x00, MAX_UNITS as u8)
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let handoffs = [Handoff::new(), Handoff::new()];
        let mut config = DispenserConfig::default();
        config.units[1] = UnitConfig::new(0x00, 0x01);
        let channels = handoffs
            .iter()
            .map(|handoff| Channel::new(handoff, RecordingTx::new()));
        assert!(matches!(
            DispenserManager::new(&config, channels, Millis(0)),
            Err(ConfigError::DuplicateAddress)
        ));
    }

    #[test]
    fn test_poll_advances_every_unit() {
        let handoffs = [Handoff::new(), Handoff::new()];
        let mut manager = manager(&handoffs);

        manager.poll(Millis(500));
        manager.poll(Millis(501));
        assert_eq!(commands(&manager, 0), b"S");
        assert_eq!(commands(&manager, 1), b"S");

        // Only unit 1 answers
        handoffs[1].deposit(&response(b'S', b"61"));
        manager.poll(Millis(510));
        assert_eq!(
            manager.unit(0).unwrap().state(),
            SequencerState::WaitStatus
        );
        assert_eq!(
            manager.unit(1).unwrap().state(),
            SequencerState::SendVolumeReadout
        );
    }

    #[test]
    fn test_poll_with_reports_unit_index() {
        let handoffs = [Handoff::new(), Handoff::new()];
        let mut manager = manager(&handoffs);

        let mut seen = std::vec::Vec::new();
        manager.poll_with(Millis(500), |unit, notice| seen.push((unit, *notice)));
        assert!(seen.contains(&(
            0,
            Notice::StateChanged {
                from: SequencerState::Idle,
                to: SequencerState::SendStatus
            }
        )));
        assert!(seen.iter().any(|(unit, _)| *unit == 1));
    }

    #[test]
    fn test_commands_routed_by_index() {
        let handoffs = [Handoff::new(), Handoff::new()];
        let mut manager = manager(&handoffs);

        manager.start_by_volume(1, 2, 2500, 1200);
        manager.stop(0);
        manager.resume(0);
        manager.close_transaction(1);
        manager.request_totalizer(0);

        assert_eq!(commands(&manager, 0), b"BGC");
        assert_eq!(commands(&manager, 1), b"VN");
        assert!(manager.snapshot(1).unwrap().transaction_closed);
        assert_eq!(manager.snapshot(1).unwrap().price, 1200);
    }

    #[test]
    fn test_invalid_index_is_noop() {
        let handoffs = [Handoff::new(), Handoff::new()];
        let mut manager = manager(&handoffs);

        manager.start_by_amount(2, 1, 1000, 1100);
        manager.stop(7);
        manager.set_price(2, 1500);
        manager.set_active_unit(2);

        assert!(commands(&manager, 0).is_empty());
        assert!(commands(&manager, 1).is_empty());
        assert_eq!(manager.active_unit(), 0);
    }

    #[test]
    fn test_active_unit_bookkeeping() {
        let handoffs = [Handoff::new(), Handoff::new()];
        let mut manager = manager(&handoffs);
        manager.set_active_unit(1);
        assert_eq!(manager.active_unit(), 1);

        // Selection has no protocol effect
        assert!(commands(&manager, 1).is_empty());
    }

    #[test]
    fn test_set_price() {
        let handoffs = [Handoff::new(), Handoff::new()];
        let mut manager = manager(&handoffs);
        manager.set_price(1, 4599);
        assert_eq!(manager.unit(1).unwrap().price(), 4599);
        assert_eq!(manager.unit(0).unwrap().price(), 1100);
    }
}
