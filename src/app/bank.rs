//! The valve bank: ten solenoid channels and the shared pump relay.
//!
//! ```text
//!  ValveCommand ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                   │        ValveBank         │
//!   ClockPort ────▶ │  [Valve; 10] · pump rule │ ──▶ ActuatorPort
//!                   └──────────────────────────┘
//!                        ▲ tick() at ≤ 1 Hz
//! ```
//!
//! ## Pump rule
//!
//! The pump is energised exactly when at least one valve is open.  It has no
//! state of its own: every mutating call recomputes it from the valve array
//! and writes the relay before returning.
//!
//! ## Staggering
//!
//! Energising a solenoid while another is already drawing current waits
//! `stagger_delay_ms` first, so inrush spikes on the shared supply never
//! overlap.  `close_all` spaces its closes by `close_all_spacing_ms` for the
//! same reason.
//!
//! ## Sweeps
//!
//! [`ValveBank::tick`] runs two independent passes: scheduled-duration
//! expiry, then the unconditional safety ceiling.  Open-ended valves
//! (duration 0) are only ever closed by command or by the ceiling.

use embedded_hal::delay::DelayNs;
use log::{debug, error, info, warn};

use crate::config::ControllerConfig;
use crate::error::{ActuatorError, ValveError};

use super::events::{AppEvent, ChangeReason, Position, SweepReport, ValveEvent, ValveStatus};
use super::ports::{ActuatorPort, ClockPort, EventSink};
use super::valve::{ChannelHealth, VALVE_COUNT, Valve, ValveId, ValveState};

/// Result of a successful [`ValveBank::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// The valve was closed and has been energised.
    Opened,
    /// The valve was already open; only its scheduled duration changed.
    Rearmed,
}

/// First half of an open: what the bank observed before any wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpenStep {
    Rearmed,
    Activate { stagger: bool },
}

#[derive(Debug, Clone, Copy)]
struct Timing {
    stagger_delay_ms: u32,
    close_all_spacing_ms: u32,
    safety_timeout_ms: u64,
}

/// Owns every valve record, the pump state, and the hardware ports.
pub struct ValveBank<A, C> {
    valves: [Valve; VALVE_COUNT],
    pump_energized: bool,
    actuators: A,
    clock: C,
    timing: Timing,
}

impl<A: ActuatorPort, C: ClockPort> ValveBank<A, C> {
    /// Build the bank.  Outputs are not touched until [`initialize`](Self::initialize).
    pub fn new(actuators: A, clock: C, config: &ControllerConfig) -> Self {
        Self {
            valves: [Valve::default(); VALVE_COUNT],
            pump_energized: false,
            actuators,
            clock,
            timing: Timing {
                stagger_delay_ms: config.stagger_delay_ms,
                close_all_spacing_ms: config.close_all_spacing_ms,
                safety_timeout_ms: config.safety_timeout_ms,
            },
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive every output to OFF and reset all state to closed.
    ///
    /// Channels whose output cannot be driven are marked faulted and
    /// reported; the rest of the bank stays usable.  Calling this again
    /// re-probes faulted channels.
    pub fn initialize(&mut self, sink: &mut impl EventSink) {
        let mut faulted = 0u16;

        for valve in ValveId::all() {
            let slot = &mut self.valves[valve.index()];
            slot.state = ValveState::Closed;
            match self.actuators.set_valve(valve, false) {
                Ok(()) => slot.health = ChannelHealth::Ok,
                Err(error) => {
                    error!("valve {valve}: output init failed: {error}");
                    slot.health = ChannelHealth::Faulted(error);
                    faulted |= 1 << valve.index();
                    sink.emit(&AppEvent::ChannelFault { valve, error });
                }
            }
        }

        self.pump_energized = false;
        if let Err(error) = self.actuators.set_pump(false) {
            error!("pump: output init failed: {error}");
            sink.emit(&AppEvent::PumpFault(error));
        }

        if faulted == 0 {
            info!("ValveBank initialised: {VALVE_COUNT} channels closed, pump off");
        } else {
            warn!("ValveBank initialised degraded: faulted=0b{faulted:010b}");
        }
        sink.emit(&AppEvent::Initialized { faulted });
    }

    /// Close everything and hand the actuator adapter back.
    pub fn shutdown(mut self, delay: &mut impl DelayNs, sink: &mut impl EventSink) -> A {
        self.close_all(delay, sink);
        info!("ValveBank shut down");
        self.actuators
    }

    // ── Commands ──────────────────────────────────────────────

    /// Open `valve` for `duration_minutes` (0 = until closed).
    ///
    /// If the valve is already open only the duration is replaced; there is
    /// no wait and no solenoid write, but the pump is still re-applied.
    /// Otherwise, when `stagger` is set and any valve is open, blocks for the
    /// stagger interval before energising.
    pub fn open(
        &mut self,
        valve: u8,
        duration_minutes: u16,
        stagger: bool,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) -> Result<OpenOutcome, ValveError> {
        let id = validate(valve)?;
        match self.prepare_open(id, duration_minutes, stagger)? {
            OpenStep::Rearmed => {
                self.apply_pump(sink);
                Ok(OpenOutcome::Rearmed)
            }
            OpenStep::Activate { stagger } => {
                if stagger {
                    debug!(
                        "valve {id}: staggering {} ms behind open valves",
                        self.timing.stagger_delay_ms
                    );
                    delay.delay_ms(self.timing.stagger_delay_ms);
                }
                self.activate(id, duration_minutes, sink)
            }
        }
    }

    /// Close `valve`.  Closing a closed valve is a no-op apart from
    /// re-asserting the OFF level; a closed faulted channel is not written.
    pub fn close(&mut self, valve: u8, sink: &mut impl EventSink) -> Result<(), ValveError> {
        let id = validate(valve)?;
        self.close_valve(id, sink)
    }

    /// Close valves 1..=10 in order, waiting the close-all spacing between
    /// consecutive channels.  Output failures are reported as
    /// [`AppEvent::ChannelFault`] and do not stop the sweep.
    pub fn close_all(&mut self, delay: &mut impl DelayNs, sink: &mut impl EventSink) {
        info!("Closing all valves");
        for id in ValveId::all() {
            if id.index() > 0 {
                delay.delay_ms(self.timing.close_all_spacing_ms);
            }
            let _ = self.close_valve(id, sink);
        }
    }

    // ── Periodic sweep ────────────────────────────────────────

    /// Run the duration-expiry pass then the safety-ceiling pass.
    ///
    /// Call at a steady cadence (≤ 1 s).  Does nothing when no valve is due.
    pub fn tick(&mut self, sink: &mut impl EventSink) -> SweepReport {
        let now = self.clock.now_ms();
        let mut report = SweepReport::default();

        for id in ValveId::all() {
            if self.valves[id.index()].duration_expired(now) {
                let _ = self.close_at(id, ChangeReason::DurationExpired, now, sink);
                let _ = report.expired.push(id);
            }
        }

        for id in ValveId::all() {
            if self.valves[id.index()].exceeds(now, self.timing.safety_timeout_ms) {
                let _ = self.close_at(id, ChangeReason::SafetyTimeout, now, sink);
                let _ = report.safety_closed.push(id);
            }
        }

        report
    }

    // ── Queries ───────────────────────────────────────────────

    /// False for out-of-range ids.
    pub fn is_open(&self, valve: u8) -> bool {
        self.slot(valve).is_some_and(Valve::is_open)
    }

    /// Whole minutes `valve` has been open; 0 for closed or out-of-range ids.
    pub fn running_minutes(&self, valve: u8) -> u32 {
        let now = self.clock.now_ms();
        self.slot(valve).map_or(0, |v| v.running_minutes(now))
    }

    /// Scheduled run length of an open valve; 0 otherwise.
    pub fn scheduled_minutes(&self, valve: u8) -> u16 {
        self.slot(valve).map_or(0, Valve::scheduled_minutes)
    }

    /// Output health of `valve`; `None` for out-of-range ids.
    pub fn health(&self, valve: u8) -> Option<ChannelHealth> {
        self.slot(valve).map(Valve::health)
    }

    pub fn valve(&self, id: ValveId) -> &Valve {
        &self.valves[id.index()]
    }

    pub fn pump_energized(&self) -> bool {
        self.pump_energized
    }

    pub fn open_count(&self) -> usize {
        self.valves.iter().filter(|v| v.is_open()).count()
    }

    /// Snapshot of every channel for status reporting.
    pub fn statuses(&self) -> heapless::Vec<ValveStatus, VALVE_COUNT> {
        let now = self.clock.now_ms();
        ValveId::all()
            .map(|valve| {
                let v = &self.valves[valve.index()];
                ValveStatus {
                    valve,
                    state: if v.is_open() {
                        Position::Open
                    } else {
                        Position::Closed
                    },
                    running_minutes: v.running_minutes(now),
                    scheduled_minutes: v.scheduled_minutes(),
                    faulted: matches!(v.health, ChannelHealth::Faulted(_)),
                }
            })
            .collect()
    }

    pub fn actuators(&self) -> &A {
        &self.actuators
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    // ── Split open (used by the shared monitor) ───────────────

    pub(crate) fn stagger_delay_ms(&self) -> u32 {
        self.timing.stagger_delay_ms
    }

    pub(crate) fn close_all_spacing_ms(&self) -> u32 {
        self.timing.close_all_spacing_ms
    }

    /// Observe the bank and decide what opening `id` requires.  Re-arms in
    /// place when the valve is already open.
    pub(crate) fn prepare_open(
        &mut self,
        id: ValveId,
        minutes: u16,
        stagger: bool,
    ) -> Result<OpenStep, ValveError> {
        let slot = &mut self.valves[id.index()];
        if matches!(slot.health, ChannelHealth::Faulted(_)) {
            return Err(ValveError::ChannelFaulted(id));
        }
        if let ValveState::Open {
            scheduled_minutes, ..
        } = &mut slot.state
        {
            debug!("valve {id}: re-armed {} -> {minutes} min", *scheduled_minutes);
            *scheduled_minutes = minutes;
            return Ok(OpenStep::Rearmed);
        }
        Ok(OpenStep::Activate {
            stagger: stagger && self.any_open(),
        })
    }

    /// Energise `id` and record the open.  Second half of [`open`](Self::open).
    pub(crate) fn activate(
        &mut self,
        id: ValveId,
        minutes: u16,
        sink: &mut impl EventSink,
    ) -> Result<OpenOutcome, ValveError> {
        // Re-check: the shared monitor releases the state lock while waiting.
        if let OpenStep::Rearmed = self.prepare_open(id, minutes, false)? {
            self.apply_pump(sink);
            return Ok(OpenOutcome::Rearmed);
        }

        if let Err(error) = self.actuators.set_valve(id, true) {
            self.fault_channel(id, error, sink);
            // The solenoid may have latched before the driver reported failure.
            let _ = self.actuators.set_valve(id, false);
            return Err(ValveError::Actuator { valve: id, error });
        }

        let now = self.clock.now_ms();
        self.valves[id.index()].state = ValveState::Open {
            opened_at_ms: now,
            scheduled_minutes: minutes,
        };
        if minutes == 0 {
            info!("valve {id}: open (until closed)");
        } else {
            info!("valve {id}: open for {minutes} min");
        }

        self.apply_pump(sink);
        sink.emit(&AppEvent::ValveChanged(ValveEvent {
            valve: id,
            state: Position::Open,
            reason: ChangeReason::Commanded,
            ran_minutes: 0,
        }));
        Ok(OpenOutcome::Opened)
    }

    pub(crate) fn close_valve(
        &mut self,
        id: ValveId,
        sink: &mut impl EventSink,
    ) -> Result<(), ValveError> {
        let now = self.clock.now_ms();
        self.close_at(id, ChangeReason::Commanded, now, sink)
    }

    // ── Internal ──────────────────────────────────────────────

    fn slot(&self, valve: u8) -> Option<&Valve> {
        ValveId::new(valve).map(|id| &self.valves[id.index()])
    }

    fn any_open(&self) -> bool {
        self.valves.iter().any(Valve::is_open)
    }

    /// De-energise `id`, clear its record, and recompute the pump.
    ///
    /// Logical state is cleared even if the write fails: the channel is then
    /// faulted, and a valve we cannot drive must not keep the pump running.
    /// A channel that is already closed and faulted is left alone.
    fn close_at(
        &mut self,
        id: ValveId,
        reason: ChangeReason,
        now: u64,
        sink: &mut impl EventSink,
    ) -> Result<(), ValveError> {
        let slot = &mut self.valves[id.index()];
        let was_open = slot.is_open();
        let ran_minutes = slot.running_minutes(now);
        slot.state = ValveState::Closed;

        if !was_open && matches!(slot.health, ChannelHealth::Faulted(_)) {
            self.apply_pump(sink);
            return Ok(());
        }

        let written = self.actuators.set_valve(id, false);
        if let Err(error) = written {
            self.fault_channel(id, error, sink);
        }

        if was_open {
            match reason {
                ChangeReason::Commanded => info!("valve {id}: closed after {ran_minutes} min"),
                ChangeReason::DurationExpired => {
                    info!("valve {id}: timer expired after {ran_minutes} min");
                }
                ChangeReason::SafetyTimeout => {
                    error!(
                        "SAFETY: valve {id} force-closed after {ran_minutes} min continuous run"
                    );
                }
            }
        }

        self.apply_pump(sink);

        if was_open {
            sink.emit(&AppEvent::ValveChanged(ValveEvent {
                valve: id,
                state: Position::Closed,
                reason,
                ran_minutes,
            }));
        }

        written.map_err(|error| ValveError::Actuator { valve: id, error })
    }

    fn fault_channel(&mut self, id: ValveId, error: ActuatorError, sink: &mut impl EventSink) {
        error!("valve {id}: output write failed: {error}");
        self.valves[id.index()].health = ChannelHealth::Faulted(error);
        sink.emit(&AppEvent::ChannelFault { valve: id, error });
    }

    /// Recompute the pump from the valve array and write the relay.
    pub(crate) fn apply_pump(&mut self, sink: &mut impl EventSink) {
        let required = self.any_open();
        if required != self.pump_energized {
            info!("pump: {}", if required { "on" } else { "off" });
        }
        self.pump_energized = required;
        if let Err(error) = self.actuators.set_pump(required) {
            error!("pump: output write failed: {error}");
            sink.emit(&AppEvent::PumpFault(error));
        }
    }
}

/// Map a raw command id to a [`ValveId`], rejecting anything outside 1..=10.
pub(crate) fn validate(valve: u8) -> Result<ValveId, ValveError> {
    ValveId::new(valve).ok_or_else(|| {
        warn!("Rejected command for invalid valve id {valve}");
        ValveError::InvalidValveId(valve)
    })
}
