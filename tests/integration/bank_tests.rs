//! ValveBank behaviour against the recording mocks: the pump rule, stagger
//! ordering, close-all spacing, and both sweeps.

use agroirriga::app::bank::{OpenOutcome, ValveBank};
use agroirriga::app::events::{AppEvent, ChangeReason, Position};
use agroirriga::app::valve::{ChannelHealth, ValveId};
use agroirriga::config::ControllerConfig;
use agroirriga::error::{ActuatorError, ValveError};

use crate::mock_hw::{HwCall, MockClock, MockDelay, MockHw, RecordingSink};

const MINUTE: u64 = 60_000;

struct Rig {
    bank: ValveBank<MockHw, MockClock>,
    hw: MockHw,
    clock: MockClock,
    delay: MockDelay,
    sink: RecordingSink,
}

fn rig_with(prepare: impl FnOnce(&MockHw)) -> Rig {
    let hw = MockHw::new();
    let clock = MockClock::new();
    let mut sink = RecordingSink::new();
    prepare(&hw);
    let mut bank = ValveBank::new(hw.clone(), clock.clone(), &ControllerConfig::default());
    bank.initialize(&mut sink);
    Rig {
        bank,
        delay: MockDelay::new(&hw, &clock),
        hw,
        clock,
        sink,
    }
}

/// Initialised bank with an empty call log.
fn rig() -> Rig {
    let mut r = rig_with(|_| {});
    r.hw.clear();
    r.sink.clear();
    r
}

impl Rig {
    fn open(&mut self, valve: u8, minutes: u16) -> Result<OpenOutcome, ValveError> {
        self.bank
            .open(valve, minutes, true, &mut self.delay, &mut self.sink)
    }

    fn close(&mut self, valve: u8) -> Result<(), ValveError> {
        self.bank.close(valve, &mut self.sink)
    }
}

fn id(n: u8) -> ValveId {
    ValveId::new(n).unwrap()
}

// ── Initialisation ────────────────────────────────────────────

#[test]
fn initialize_drives_every_output_off() {
    let r = rig_with(|_| {});
    let calls = r.hw.calls();
    for n in 1..=10 {
        assert!(calls.contains(&HwCall::Valve { valve: n, on: false }));
    }
    assert_eq!(calls.last(), Some(&HwCall::Pump(false)));
    assert_eq!(r.sink.events.last(), Some(&AppEvent::Initialized { faulted: 0 }));
}

#[test]
fn initialize_isolates_a_dead_channel() {
    let mut r = rig_with(|hw| hw.break_valve(4));
    assert!(r.sink.events.contains(&AppEvent::ChannelFault {
        valve: id(4),
        error: ActuatorError::GpioWriteFailed
    }));
    assert_eq!(
        r.sink.events.last(),
        Some(&AppEvent::Initialized { faulted: 1 << 3 })
    );

    assert_eq!(r.open(4, 10), Err(ValveError::ChannelFaulted(id(4))));
    assert_eq!(r.open(5, 10), Ok(OpenOutcome::Opened));
    assert!(r.hw.pump_on());
}

// ── Validation ────────────────────────────────────────────────

#[test]
fn out_of_range_ids_have_no_side_effects() {
    let mut r = rig();
    for v in [0u8, 11, 200, 255] {
        assert_eq!(r.open(v, 5), Err(ValveError::InvalidValveId(v)));
        assert_eq!(r.close(v), Err(ValveError::InvalidValveId(v)));
        assert!(!r.bank.is_open(v));
        assert_eq!(r.bank.running_minutes(v), 0);
        assert_eq!(r.bank.health(v), None);
    }
    assert!(r.hw.calls().is_empty());
    assert!(r.sink.events.is_empty());
}

// ── Pump rule ─────────────────────────────────────────────────

#[test]
fn pump_runs_while_any_valve_is_open() {
    let mut r = rig();
    r.open(1, 0).unwrap();
    r.open(2, 0).unwrap();
    assert!(r.hw.pump_on() && r.bank.pump_energized());

    r.close(1).unwrap();
    assert!(r.hw.pump_on(), "valve 2 still open");
    assert!(r.hw.valve_on(2));

    r.close(2).unwrap();
    assert!(!r.hw.pump_on());
    assert!(!r.bank.pump_energized());
}

#[test]
fn pump_is_written_after_the_valve_on_open() {
    let mut r = rig();
    r.open(6, 0).unwrap();
    assert_eq!(
        r.hw.calls(),
        vec![HwCall::Valve { valve: 6, on: true }, HwCall::Pump(true)]
    );
}

#[test]
fn closing_a_closed_valve_is_harmless() {
    let mut r = rig();
    r.close(3).unwrap();
    r.close(3).unwrap();
    assert!(!r.bank.is_open(3));
    assert!(!r.hw.pump_on());
    assert!(r.sink.valve_events().is_empty());
}

#[test]
fn pump_write_failure_does_not_fail_the_open() {
    let mut r = rig();
    r.hw.break_pump();
    assert_eq!(r.open(1, 0), Ok(OpenOutcome::Opened));
    assert!(r.bank.pump_energized());
    assert!(r
        .sink
        .events
        .contains(&AppEvent::PumpFault(ActuatorError::GpioWriteFailed)));
}

// ── Re-arm ────────────────────────────────────────────────────

#[test]
fn reopening_rearms_without_resetting_the_run() {
    let mut r = rig();
    r.open(2, 5).unwrap();
    r.clock.advance(3 * MINUTE);
    r.hw.clear();

    assert_eq!(r.open(2, 10), Ok(OpenOutcome::Rearmed));
    assert_eq!(
        r.hw.calls(),
        vec![HwCall::Pump(true)],
        "re-arm only re-applies the pump"
    );
    assert_eq!(r.bank.scheduled_minutes(2), 10);

    r.clock.advance(4 * MINUTE);
    assert!(r.bank.tick(&mut r.sink).is_empty());
    assert_eq!(r.bank.running_minutes(2), 7);

    r.clock.advance(3 * MINUTE);
    let report = r.bank.tick(&mut r.sink);
    assert_eq!(report.expired.as_slice(), &[id(2)]);
}

#[test]
fn rearm_restores_a_pump_that_failed_to_start() {
    let mut r = rig();
    r.hw.break_pump();
    r.open(1, 0).unwrap();
    assert!(r.hw.valve_on(1));
    assert!(!r.hw.pump_on());

    r.hw.repair_pump();
    assert_eq!(r.open(1, 30), Ok(OpenOutcome::Rearmed));
    assert!(r.hw.pump_on());
    assert!(r.hw.delays().is_empty());
    assert_eq!(r.hw.valve_writes(), vec![(1, true)]);
}

// ── Duration expiry ───────────────────────────────────────────

#[test]
fn duration_expires_on_the_minute_not_before() {
    let mut r = rig();
    r.open(6, 1).unwrap();

    r.clock.advance(59_999);
    assert!(r.bank.tick(&mut r.sink).is_empty());
    assert!(r.bank.is_open(6));

    r.clock.advance(1);
    let report = r.bank.tick(&mut r.sink);
    assert_eq!(report.expired.as_slice(), &[id(6)]);
    assert!(report.safety_closed.is_empty());
    assert!(!r.bank.is_open(6));
    assert!(!r.hw.pump_on());

    let closed = r.sink.valve_events().pop().unwrap();
    assert_eq!(closed.state, Position::Closed);
    assert_eq!(closed.reason, ChangeReason::DurationExpired);
    assert_eq!(closed.ran_minutes, 1);
}

#[test]
fn running_minutes_truncate() {
    let mut r = rig();
    r.open(4, 0).unwrap();
    r.clock.advance(MINUTE + 59_999);
    assert_eq!(r.bank.running_minutes(4), 1);
    assert_eq!(r.bank.running_minutes(5), 0);
}

// ── Safety ceiling ────────────────────────────────────────────

#[test]
fn open_ended_valve_is_closed_only_by_the_safety_ceiling() {
    let mut r = rig();
    r.open(7, 0).unwrap();

    r.clock.advance(119 * MINUTE);
    assert!(r.bank.tick(&mut r.sink).is_empty());

    r.clock.advance(MINUTE);
    assert!(
        r.bank.tick(&mut r.sink).is_empty(),
        "exactly two hours is still within the ceiling"
    );
    assert!(r.bank.is_open(7));

    r.clock.advance(1);
    let report = r.bank.tick(&mut r.sink);
    assert_eq!(report.safety_closed.as_slice(), &[id(7)]);
    assert!(report.expired.is_empty());
    assert!(!r.hw.valve_on(7));
    assert!(!r.hw.pump_on());

    let closed = r.sink.valve_events().pop().unwrap();
    assert_eq!(closed.reason, ChangeReason::SafetyTimeout);
    assert_eq!(closed.ran_minutes, 120);
}

#[test]
fn safety_ceiling_overrides_a_longer_schedule() {
    let mut r = rig();
    r.open(8, 300).unwrap();
    r.clock.advance(7_200_001);
    let report = r.bank.tick(&mut r.sink);
    assert_eq!(report.safety_closed.as_slice(), &[id(8)]);
    assert!(report.expired.is_empty());
}

#[test]
fn valve_due_for_both_closes_once_as_expired() {
    let mut r = rig();
    r.open(9, 200).unwrap();
    r.clock.advance(200 * MINUTE);
    let report = r.bank.tick(&mut r.sink);
    assert_eq!(report.expired.as_slice(), &[id(9)]);
    assert!(report.safety_closed.is_empty());
    assert_eq!(r.sink.valve_events().len(), 2, "one open, one close");
}

// ── Stagger ───────────────────────────────────────────────────

#[test]
fn first_valve_opens_without_waiting() {
    let mut r = rig();
    r.open(1, 0).unwrap();
    assert!(r.hw.delays().is_empty());
}

#[test]
fn second_valve_waits_before_energising() {
    let mut r = rig();
    r.open(1, 0).unwrap();
    r.open(2, 0).unwrap();

    assert_eq!(r.hw.delays(), vec![500]);
    let wait = r.hw.position(HwCall::Delay(500)).unwrap();
    let energise = r.hw.position(HwCall::Valve { valve: 2, on: true }).unwrap();
    assert!(wait < energise);
}

#[test]
fn stagger_can_be_skipped() {
    let mut r = rig();
    r.open(1, 0).unwrap();
    r.bank
        .open(2, 0, false, &mut r.delay, &mut r.sink)
        .unwrap();
    assert!(r.hw.delays().is_empty());
    assert!(r.hw.valve_on(2));
}

// ── Close all ─────────────────────────────────────────────────

#[test]
fn close_all_walks_every_channel_in_order() {
    let mut r = rig();
    for v in [3, 5, 9] {
        r.bank
            .open(v, 0, false, &mut r.delay, &mut r.sink)
            .unwrap();
    }
    r.hw.clear();
    r.sink.clear();

    r.bank.close_all(&mut r.delay, &mut r.sink);

    let closed: Vec<u8> = r.hw.valve_writes().iter().map(|(v, _)| *v).collect();
    assert_eq!(closed, (1..=10).collect::<Vec<_>>());
    assert!(r.hw.valve_writes().iter().all(|(_, on)| !on));
    assert_eq!(r.hw.delays(), vec![100; 9]);
    assert_eq!(r.hw.calls().first(), Some(&HwCall::Valve { valve: 1, on: false }));
    assert!(!r.hw.pump_on());
    assert_eq!(r.bank.open_count(), 0);

    let events = r.sink.valve_events();
    assert_eq!(
        events.iter().map(|e| e.valve.get()).collect::<Vec<_>>(),
        vec![3, 5, 9]
    );
    assert!(events.iter().all(|e| e.reason == ChangeReason::Commanded));
}

#[test]
fn close_all_continues_past_a_failing_channel() {
    let mut r = rig();
    r.open(2, 0).unwrap();
    r.open(3, 0).unwrap();
    r.hw.break_valve(2);

    r.bank.close_all(&mut r.delay, &mut r.sink);
    assert_eq!(r.bank.open_count(), 0);
    assert!(!r.hw.valve_on(3));
    assert!(!r.hw.pump_on());
    assert_eq!(
        r.bank.health(2),
        Some(ChannelHealth::Faulted(ActuatorError::GpioWriteFailed))
    );
}

// ── Write failures ────────────────────────────────────────────

#[test]
fn closing_a_dead_closed_channel_is_quiet() {
    let mut r = rig_with(|hw| hw.break_valve(4));
    r.sink.clear();

    assert_eq!(r.close(4), Ok(()));
    assert_eq!(r.close(4), Ok(()));
    r.bank.close_all(&mut r.delay, &mut r.sink);

    assert!(r.sink.events.is_empty(), "no repeated fault reports");
    assert!(!r.hw.pump_on());
    assert_eq!(
        r.bank.health(4),
        Some(ChannelHealth::Faulted(ActuatorError::GpioWriteFailed))
    );
}

#[test]
fn failed_close_still_clears_the_valve_and_stops_the_pump() {
    let mut r = rig();
    r.open(3, 0).unwrap();
    r.hw.break_valve(3);

    assert_eq!(
        r.close(3),
        Err(ValveError::Actuator {
            valve: id(3),
            error: ActuatorError::GpioWriteFailed
        })
    );
    assert!(!r.bank.is_open(3));
    assert!(!r.hw.pump_on());
    assert!(matches!(r.bank.health(3), Some(ChannelHealth::Faulted(_))));
}

#[test]
fn reinitialising_recovers_a_repaired_channel() {
    let mut r = rig_with(|hw| hw.break_valve(10));
    assert!(r.open(10, 0).is_err());

    r.hw.repair_valve(10);
    r.bank.initialize(&mut r.sink);
    assert_eq!(r.bank.health(10), Some(ChannelHealth::Ok));
    assert_eq!(r.open(10, 0), Ok(OpenOutcome::Opened));
}

// ── Status snapshot ───────────────────────────────────────────

#[test]
fn statuses_cover_every_channel() {
    let mut r = rig();
    r.open(5, 45).unwrap();
    r.clock.advance(2 * MINUTE);

    let statuses = r.bank.statuses();
    assert_eq!(statuses.len(), 10);
    let five = statuses[4];
    assert_eq!(five.valve, id(5));
    assert_eq!(five.state, Position::Open);
    assert_eq!(five.running_minutes, 2);
    assert_eq!(five.scheduled_minutes, 45);
    assert!(statuses
        .iter()
        .filter(|s| s.valve != id(5))
        .all(|s| s.state == Position::Closed && s.running_minutes == 0));
}
