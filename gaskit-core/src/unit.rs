//! Per-dispenser unit controller
//!
//! A [`UnitController`] is bound for its whole life to one serial channel
//! and one protocol address. Each [`poll`](UnitController::poll) does one
//! step:
//!
//! 1. Take at most one received block from the handoff and decode it.
//! 2. Run the sequencer step for the current state and apply its effects.
//! 3. Hand a frame the step did not consume to the out-of-band pass.
//! 4. Check link liveness.
//!
//! Operator commands (`stop`, `resume`, `close_transaction`, presets,
//! totalizer) are transmitted immediately, whatever the sequencer is
//! waiting for. The dispenser may answer them instead of the pending
//! request; the wait timeout or the out-of-band pass absorbs that.

use embassy_sync::blocking_mutex::raw::RawMutex;

use gaskit_hal::UartTx;
use gaskit_protocol::{
    decode, encode, preset_payload, Address, Command, Frame, TotalizerReport, UnitStatus,
    TOTALIZER_ALL_NOZZLES,
};

use crate::config::TimingConfig;
use crate::handoff::ReceiveHandoff;
use crate::log;
use crate::sequencer::{self, entry_effects, Effect, Notice, SequencerState, StepContext};
use crate::supervision::{LinkMonitor, LinkStatus};
use crate::time::Millis;

/// Copy of the displayable unit fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnitSnapshot {
    pub address: Address,
    pub status: UnitStatus,
    pub state: SequencerState,
    pub nozzle: u8,
    /// Transaction id character, 0 when none
    pub transaction_id: u8,
    pub volume_cl: u32,
    pub amount: u32,
    pub price: u32,
    pub totalizer_cl: u64,
    pub connected: bool,
    pub final_settlement_sent: bool,
    pub transaction_closed: bool,
}

impl UnitSnapshot {
    /// Check if volume or amount from a fuelling cycle is present
    pub fn has_transaction_data(&self) -> bool {
        self.volume_cl > 0 || self.amount > 0
    }
}

/// Protocol engine for one dispenser
pub struct UnitController<'a, M: RawMutex, T: UartTx> {
    index: u8,
    address: Address,
    handoff: &'a ReceiveHandoff<M>,
    tx: T,
    timing: TimingConfig,

    state: SequencerState,
    state_entered_at: Millis,
    retry_count: u8,

    status: UnitStatus,
    nozzle: u8,
    transaction_id: u8,
    volume_cl: u32,
    amount: u32,
    price: u32,
    totalizer_cl: u64,
    link: LinkMonitor,
    final_settlement_sent: bool,
    transaction_closed: bool,
}

impl<'a, M: RawMutex, T: UartTx> UnitController<'a, M, T> {
    /// Create a controller in `Idle`, disconnected
    pub fn new(
        index: u8,
        address: Address,
        handoff: &'a ReceiveHandoff<M>,
        tx: T,
        timing: TimingConfig,
        price: u32,
        now: Millis,
    ) -> Self {
        Self {
            index,
            address,
            handoff,
            tx,
            timing,
            state: SequencerState::Idle,
            state_entered_at: now,
            retry_count: 0,
            status: UnitStatus::Idle,
            nozzle: 0,
            transaction_id: 0,
            volume_cl: 0,
            amount: 0,
            price,
            totalizer_cl: 0,
            link: LinkMonitor::new(now),
            final_settlement_sent: false,
            transaction_closed: false,
        }
    }

    /// Advance by one step
    ///
    /// Every notice produced is logged and passed to `observer` along with
    /// the unit index.
    pub fn poll<F>(&mut self, now: Millis, observer: &mut F)
    where
        F: FnMut(u8, &Notice),
    {
        let frame = self.receive(now, observer);

        let ctx = self.context(now);
        let step = sequencer::step(self.state, &ctx, frame.as_ref(), &self.timing);
        for effect in step.effects {
            self.apply(effect, now, observer);
        }
        if let Some(next) = step.next {
            self.change_state(next, now, observer);
        }

        if let Some(frame) = frame.filter(|_| !step.consumed) {
            self.out_of_band(&frame, observer);
        }

        if self.link.check(now, self.timing.liveness_ms) == LinkStatus::Lost {
            self.emit(Notice::Disconnected, observer);
            self.change_state(SequencerState::Error, now, observer);
        }
    }

    /// Start a transaction limited by volume (centiliters)
    ///
    /// Clears the previous transaction's fields and flags, then transmits
    /// the preset. The sequencer state is untouched; the next status poll
    /// sees the dispenser's reaction.
    pub fn start_by_volume(&mut self, nozzle: u8, volume_cl: u32, price: u32) {
        self.start(Command::StartByVolume, nozzle, volume_cl, price);
    }

    /// Start a transaction limited by amount (minor units)
    pub fn start_by_amount(&mut self, nozzle: u8, amount: u32, price: u32) {
        self.start(Command::StartByAmount, nozzle, amount, price);
    }

    pub fn stop(&mut self) {
        self.transmit(Command::Stop, &[], &mut ignore);
    }

    pub fn resume(&mut self) {
        self.transmit(Command::Resume, &[], &mut ignore);
    }

    /// Close the transaction without waiting for the sequencer's own close
    pub fn close_transaction(&mut self) {
        self.transmit(Command::CloseTransaction, &[], &mut ignore);
        self.transaction_closed = true;
    }

    /// Ask for the all-nozzle totalizer; the report arrives out of band
    pub fn request_totalizer(&mut self) {
        self.transmit(Command::Totalizer, TOTALIZER_ALL_NOZZLES, &mut ignore);
    }

    pub fn set_price(&mut self, price: u32) {
        self.price = price;
    }

    pub fn snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            address: self.address,
            status: self.status,
            state: self.state,
            nozzle: self.nozzle,
            transaction_id: self.transaction_id,
            volume_cl: self.volume_cl,
            amount: self.amount,
            price: self.price,
            totalizer_cl: self.totalizer_cl,
            connected: self.link.is_connected(),
            final_settlement_sent: self.final_settlement_sent,
            transaction_closed: self.transaction_closed,
        }
    }

    pub fn index(&self) -> u8 {
        self.index
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn status(&self) -> UnitStatus {
        self.status
    }

    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    pub fn final_settlement_sent(&self) -> bool {
        self.final_settlement_sent
    }

    pub fn transaction_closed(&self) -> bool {
        self.transaction_closed
    }

    pub fn volume_cl(&self) -> u32 {
        self.volume_cl
    }

    pub fn amount(&self) -> u32 {
        self.amount
    }

    pub fn price(&self) -> u32 {
        self.price
    }

    pub fn totalizer_cl(&self) -> u64 {
        self.totalizer_cl
    }

    /// Serial transmitter
    pub fn tx(&self) -> &T {
        &self.tx
    }

    fn start(&mut self, command: Command, nozzle: u8, value: u32, price: u32) {
        self.reset_transaction();
        self.final_settlement_sent = false;
        self.transaction_closed = false;
        self.price = price;

        let payload = preset_payload(nozzle, value, price);
        self.transmit(command, payload.as_bytes(), &mut ignore);
    }

    fn reset_transaction(&mut self) {
        self.volume_cl = 0;
        self.amount = 0;
        self.transaction_id = 0;
    }

    fn context(&self, now: Millis) -> StepContext {
        StepContext {
            status: self.status,
            elapsed_ms: now.since(self.state_entered_at),
            retry_count: self.retry_count,
            final_settlement_sent: self.final_settlement_sent,
            has_transaction_data: self.volume_cl > 0 || self.amount > 0,
        }
    }

    fn receive<F>(&mut self, now: Millis, observer: &mut F) -> Option<Frame>
    where
        F: FnMut(u8, &Notice),
    {
        let block = self.handoff.take()?;
        match decode(&block) {
            Ok(frame) => {
                self.link.frame_received(now);
                Some(frame)
            }
            Err(error) => {
                self.emit(Notice::DroppedFrame(error), observer);
                None
            }
        }
    }

    fn change_state<F>(&mut self, next: SequencerState, now: Millis, observer: &mut F)
    where
        F: FnMut(u8, &Notice),
    {
        if next == self.state {
            return;
        }

        let from = self.state;
        self.state = next;
        self.state_entered_at = now;
        self.retry_count = 0;
        self.emit(Notice::StateChanged { from, to: next }, observer);

        for effect in entry_effects(next) {
            self.apply(effect, now, observer);
        }
    }

    fn apply<F>(&mut self, effect: Effect, now: Millis, observer: &mut F)
    where
        F: FnMut(u8, &Notice),
    {
        match effect {
            Effect::Transmit(command) => self.transmit(command, &[], observer),
            Effect::RetryWait => {
                self.retry_count = self.retry_count.saturating_add(1);
                self.state_entered_at = now;
            }
            Effect::SetStatus { status, nozzle } => {
                self.status = status;
                self.nozzle = nozzle;
            }
            Effect::ResetTransaction => self.reset_transaction(),
            Effect::RecordVolume(readout) => {
                self.nozzle = readout.nozzle;
                self.transaction_id = readout.transaction_id;
                self.volume_cl = readout.volume_cl;
            }
            Effect::RecordAmount(amount) => self.amount = amount,
            Effect::RecordSettlement(settlement) => {
                self.nozzle = settlement.nozzle;
                self.transaction_id = settlement.transaction_id;
                self.amount = settlement.amount;
                self.volume_cl = settlement.volume_cl;
            }
            Effect::SetFinalSettlementSent(sent) => self.final_settlement_sent = sent,
            Effect::SetTransactionClosed(closed) => self.transaction_closed = closed,
            Effect::MarkDisconnected => self.link.disconnect(),
            Effect::Notify(notice) => self.emit(notice, observer),
        }
    }

    /// Handle a valid frame the sequencer was not waiting for
    fn out_of_band<F>(&mut self, frame: &Frame, observer: &mut F)
    where
        F: FnMut(u8, &Notice),
    {
        if frame.command != Command::Totalizer.as_byte() {
            self.emit(Notice::UnexpectedCommand(frame.command), observer);
            return;
        }

        match TotalizerReport::parse(frame) {
            Ok(report) => {
                self.totalizer_cl = report.totalizer_cl;
                self.emit(Notice::Totalizer(report), observer);
            }
            Err(error) => self.emit(
                Notice::MalformedResponse {
                    command: Command::Totalizer,
                    error,
                },
                observer,
            ),
        }
    }

    /// Transmit a request
    ///
    /// A failed transmit is only reported; the wait timeout recovers.
    fn transmit<F>(&mut self, command: Command, payload: &[u8], observer: &mut F)
    where
        F: FnMut(u8, &Notice),
    {
        let bytes = encode(self.address, command.as_byte(), payload);
        let result = self.tx.write_blocking(&bytes).and_then(|()| self.tx.flush());
        let notice = match result {
            Ok(()) => Notice::Transmitted(command),
            Err(_) => Notice::TransmitFailed(command),
        };
        self.emit(notice, observer);
    }

    fn emit<F>(&self, notice: Notice, observer: &mut F)
    where
        F: FnMut(u8, &Notice),
    {
        log::notice(self.index, &notice);
        observer(self.index, &notice);
    }
}

fn ignore(_unit: u8, _notice: &Notice) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_PRICE;
    use crate::sequencer::MAX_READ_RETRIES;
    use crate::testing::{response, FailingTx, RecordingTx};
    use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
    use proptest::prelude::*;

    type Handoff = ReceiveHandoff<CriticalSectionRawMutex>;
    type TestUnit<'a> = UnitController<'a, CriticalSectionRawMutex, RecordingTx>;

    fn unit(handoff: &Handoff) -> TestUnit<'_> {
        unit_with(handoff, TimingConfig::default())
    }

    fn unit_with(handoff: &Handoff, timing: TimingConfig) -> TestUnit<'_> {
        UnitController::new(
            0,
            Address::new(0x00, 0x01),
            handoff,
            RecordingTx::new(),
            timing,
            DEFAULT_PRICE,
            Millis(0),
        )
    }

    fn poll<T: UartTx>(
        unit: &mut UnitController<'_, CriticalSectionRawMutex, T>,
        now: u32,
    ) -> Vec<Notice> {
        let mut notices = Vec::new();
        unit.poll(Millis(now), &mut |_, notice: &Notice| notices.push(*notice));
        notices
    }

    fn reply(handoff: &Handoff, command: u8, payload: &[u8]) {
        handoff.deposit(&response(command, payload));
    }

    /// Poll until the status request is out: Idle -> SendStatus -> WaitStatus
    fn send_status(unit: &mut TestUnit<'_>, at: u32) {
        poll(unit, at);
        assert_eq!(unit.state(), SequencerState::SendStatus);
        poll(unit, at + 1);
        assert_eq!(unit.state(), SequencerState::WaitStatus);
    }

    #[test]
    fn test_fuelling_cycle() {
        let handoff = Handoff::new();
        let mut unit = unit(&handoff);

        poll(&mut unit, 0);
        assert_eq!(unit.state(), SequencerState::Idle);
        send_status(&mut unit, 500);

        reply(&handoff, b'S', b"61");
        poll(&mut unit, 520);
        assert_eq!(unit.status(), UnitStatus::Fuelling);
        assert_eq!(unit.state(), SequencerState::SendVolumeReadout);
        assert!(unit.is_connected());

        poll(&mut unit, 521);
        reply(&handoff, b'L', b"1A;;001234");
        poll(&mut unit, 530);
        assert_eq!(unit.volume_cl(), 1234);
        assert_eq!(unit.snapshot().transaction_id, b'A');
        assert_eq!(unit.state(), SequencerState::SendAmountReadout);

        poll(&mut unit, 531);
        reply(&handoff, b'R', b"1A;;005678");
        poll(&mut unit, 540);
        assert_eq!(unit.amount(), 5678);
        assert_eq!(unit.state(), SequencerState::SendStatus);

        poll(&mut unit, 541);
        assert_eq!(unit.tx().commands(), b"SLRS");
    }

    #[test]
    fn test_settlement_requested_once() {
        let handoff = Handoff::new();
        let mut unit = unit(&handoff);

        send_status(&mut unit, 500);
        reply(&handoff, b'S', b"81");
        poll(&mut unit, 510);
        assert!(unit.final_settlement_sent());
        assert_eq!(unit.state(), SequencerState::SendFinalSettlement);

        poll(&mut unit, 511);
        reply(&handoff, b'T', b"2B;;001500;002000;1100");
        poll(&mut unit, 520);
        assert_eq!(unit.state(), SequencerState::Idle);
        assert_eq!(unit.amount(), 1500);
        assert_eq!(unit.volume_cl(), 2000);
        assert!(unit.final_settlement_sent());

        // Still stopped: fast poll, no second settlement request
        send_status(&mut unit, 720);
        reply(&handoff, b'S', b"81");
        poll(&mut unit, 730);
        assert_eq!(unit.state(), SequencerState::Idle);
        assert_eq!(unit.tx().commands(), b"STS");

        // Nozzle hung up: close
        send_status(&mut unit, 930);
        reply(&handoff, b'S', b"90");
        poll(&mut unit, 940);
        assert_eq!(unit.state(), SequencerState::SendClose);
        assert!(unit.transaction_closed());
        assert!(!unit.final_settlement_sent());

        poll(&mut unit, 941);
        reply(&handoff, b'N', b"");
        poll(&mut unit, 950);
        assert_eq!(unit.state(), SequencerState::SendStatus);
        assert!(!unit.transaction_closed());
        assert_eq!(unit.tx().commands(), b"STSSN");
    }

    #[test]
    fn test_status_timeouts_reach_error() {
        let handoff = Handoff::new();
        let mut unit = unit(&handoff);
        send_status(&mut unit, 500);

        poll(&mut unit, 600);
        assert_eq!(unit.retry_count(), 0);

        // Retries count from the first timeout, so Error comes on the fourth
        for (retry, at) in [(1, 601), (2, 701), (3, 801)] {
            let notices = poll(&mut unit, at);
            assert_eq!(unit.state(), SequencerState::WaitStatus);
            assert_eq!(unit.retry_count(), retry);
            assert!(notices.contains(&Notice::Transmitted(Command::Status)));
        }

        let notices = poll(&mut unit, 901);
        assert_eq!(unit.state(), SequencerState::Error);
        assert_eq!(unit.retry_count(), 0);
        assert!(!unit.is_connected());
        assert!(notices.contains(&Notice::RetriesExhausted {
            state: SequencerState::WaitStatus
        }));
        assert_eq!(unit.tx().commands(), b"SSSS");
    }

    #[test]
    fn test_error_recovers_to_idle() {
        let handoff = Handoff::new();
        let mut unit = unit(&handoff);
        send_status(&mut unit, 500);
        for at in [601, 701, 801, 901] {
            poll(&mut unit, at);
        }
        assert_eq!(unit.state(), SequencerState::Error);

        poll(&mut unit, 1400);
        assert_eq!(unit.state(), SequencerState::Error);

        let notices = poll(&mut unit, 1401);
        assert_eq!(unit.state(), SequencerState::Idle);
        assert_eq!(unit.retry_count(), 0);
        assert!(!unit.is_connected());
        assert!(notices.contains(&Notice::Recovered));
    }

    #[test]
    fn test_error_clears_settlement_flag() {
        let handoff = Handoff::new();
        let mut unit = unit(&handoff);
        send_status(&mut unit, 500);
        reply(&handoff, b'S', b"81");
        poll(&mut unit, 510);
        assert!(unit.final_settlement_sent());

        // Settlement never answered; next status polls go unanswered too
        poll(&mut unit, 511);
        poll(&mut unit, 611);
        assert_eq!(unit.state(), SequencerState::Idle);
        send_status(&mut unit, 811);
        for at in [912, 1012, 1112, 1212] {
            poll(&mut unit, at);
        }
        assert_eq!(unit.state(), SequencerState::Error);
        assert!(!unit.final_settlement_sent());
    }

    #[test]
    fn test_start_by_volume_resets_transaction() {
        let handoff = Handoff::new();
        let mut unit = unit(&handoff);
        send_status(&mut unit, 500);
        reply(&handoff, b'S', b"81");
        poll(&mut unit, 510);
        poll(&mut unit, 511);
        reply(&handoff, b'T', b"2B;;001500;002000;1100");
        poll(&mut unit, 520);
        assert!(unit.snapshot().has_transaction_data());

        let state = unit.state();
        unit.start_by_volume(1, 5000, 1250);

        let snapshot = unit.snapshot();
        assert_eq!(snapshot.volume_cl, 0);
        assert_eq!(snapshot.amount, 0);
        assert_eq!(snapshot.transaction_id, 0);
        assert!(!snapshot.final_settlement_sent);
        assert!(!snapshot.transaction_closed);
        assert_eq!(snapshot.price, 1250);
        assert_eq!(unit.state(), state);
        assert_eq!(unit.tx().commands().last(), Some(&b'V'));
        assert_eq!(unit.tx().last_payload(), Some(&b"1;005000;1250"[..]));
    }

    #[test]
    fn test_start_by_amount_payload() {
        let handoff = Handoff::new();
        let mut unit = unit(&handoff);
        unit.start_by_amount(2, 50_000, 1100);
        assert_eq!(unit.tx().commands(), b"M");
        assert_eq!(unit.tx().last_payload(), Some(&b"2;050000;1100"[..]));
    }

    #[test]
    fn test_operator_commands_bypass_sequencer() {
        let handoff = Handoff::new();
        let mut unit = unit(&handoff);
        send_status(&mut unit, 500);

        unit.stop();
        unit.resume();
        unit.close_transaction();
        unit.request_totalizer();

        assert_eq!(unit.state(), SequencerState::WaitStatus);
        assert!(unit.transaction_closed());
        assert_eq!(unit.tx().commands(), b"SBGNC");
        assert_eq!(unit.tx().last_payload(), Some(&b"0"[..]));
    }

    #[test]
    fn test_totalizer_out_of_band() {
        let handoff = Handoff::new();
        let mut unit = unit(&handoff);
        send_status(&mut unit, 500);

        reply(&handoff, b'C', b"0;000123456");
        let notices = poll(&mut unit, 510);
        assert_eq!(unit.totalizer_cl(), 123_456);
        assert_eq!(unit.state(), SequencerState::WaitStatus);
        assert!(notices
            .iter()
            .any(|notice| matches!(notice, Notice::Totalizer(_))));

        // The wait is still served afterwards
        reply(&handoff, b'S', b"10");
        poll(&mut unit, 520);
        assert_eq!(unit.state(), SequencerState::Idle);
    }

    #[test]
    fn test_unexpected_command_discarded() {
        let handoff = Handoff::new();
        let mut unit = unit(&handoff);
        send_status(&mut unit, 500);

        reply(&handoff, b'X', b"");
        let notices = poll(&mut unit, 510);
        assert!(notices.contains(&Notice::UnexpectedCommand(b'X')));
        assert_eq!(unit.state(), SequencerState::WaitStatus);
        assert_eq!(unit.retry_count(), 0);
    }

    #[test]
    fn test_corrupt_frame_dropped() {
        let handoff = Handoff::new();
        let mut unit = unit(&handoff);
        send_status(&mut unit, 500);

        let mut bytes = response(b'S', b"61");
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        handoff.deposit(&bytes);

        let notices = poll(&mut unit, 510);
        assert!(notices
            .iter()
            .any(|notice| matches!(notice, Notice::DroppedFrame(_))));
        assert_eq!(unit.state(), SequencerState::WaitStatus);
        assert!(!unit.is_connected());
    }

    #[test]
    fn test_liveness_window_forces_error() {
        let handoff = Handoff::new();
        let timing = TimingConfig {
            idle_poll_ms: 10_000,
            ..TimingConfig::default()
        };
        let mut unit = unit_with(&handoff, timing);

        reply(&handoff, b'S', b"10");
        poll(&mut unit, 0);
        assert!(unit.is_connected());

        poll(&mut unit, 2000);
        assert!(unit.is_connected());
        assert_eq!(unit.state(), SequencerState::Idle);

        let notices = poll(&mut unit, 2001);
        assert!(!unit.is_connected());
        assert_eq!(unit.state(), SequencerState::Error);
        assert!(notices.contains(&Notice::Disconnected));
    }

    #[test]
    fn test_transmit_failure_keeps_sequence() {
        let handoff = Handoff::new();
        let mut unit = UnitController::new(
            1,
            Address::new(0x00, 0x02),
            &handoff,
            FailingTx,
            TimingConfig::default(),
            DEFAULT_PRICE,
            Millis(0),
        );

        poll(&mut unit, 500);
        let notices = poll(&mut unit, 501);
        assert_eq!(unit.state(), SequencerState::WaitStatus);
        assert!(notices.contains(&Notice::TransmitFailed(Command::Status)));
    }

    fn reply_strategy() -> impl Strategy<Value = Option<(u8, &'static [u8])>> {
        prop_oneof![
            3 => Just(None),
            1 => Just(Some((b'S', &b"61"[..]))),
            1 => Just(Some((b'S', &b"81"[..]))),
            1 => Just(Some((b'S', &b"90"[..]))),
            1 => Just(Some((b'L', &b"1A;;000100"[..]))),
            1 => Just(Some((b'R', &b"1A;;000200"[..]))),
            1 => Just(Some((b'T', &b"1A;;000200;000100;1100"[..]))),
            1 => Just(Some((b'C', &b"0;000000042"[..]))),
        ]
    }

    proptest! {
        #[test]
        fn test_retry_count_resets_on_state_change(
            steps in proptest::collection::vec((0u32..400, reply_strategy()), 1..200)
        ) {
            let handoff = Handoff::new();
            let mut unit = unit(&handoff);
            let mut now = 0u32;

            for (advance, reply_with) in steps {
                now += advance;
                if let Some((command, payload)) = reply_with {
                    reply(&handoff, command, payload);
                }

                let before = (unit.state(), unit.retry_count());
                poll(&mut unit, now);
                let after = (unit.state(), unit.retry_count());

                prop_assert!(after.1 <= MAX_READ_RETRIES);
                if after.0 != before.0 {
                    prop_assert_eq!(after.1, 0);
                } else if after.1 != before.1 {
                    prop_assert!(after.0.is_wait());
                    prop_assert_eq!(after.1, before.1 + 1);
                }
            }
        }
    }
}
