//! Thread-safe wrapper around [`ValveBank`] for multiple command sources.
//!
//! Two locks:
//!
//! - the **state lock** guards the bank itself and is only held for the
//!   short, non-blocking parts of each call;
//! - the **activation gate** owns the delay provider and is held by `open`
//!   across observe → stagger wait → energise, and by `close_all` across the
//!   whole sweep.
//!
//! Two racing opens therefore serialise on the gate, so the second one always
//! sees the first valve open and staggers.  A `close`, a query, or a sweep on
//! another thread only needs the state lock and is never stalled behind a
//! stagger wait.

use std::sync::{Mutex, MutexGuard, PoisonError};

use embedded_hal::delay::DelayNs;
use log::debug;

use crate::error::ValveError;

use super::bank::{OpenOutcome, OpenStep, ValveBank, validate};
use super::events::{SweepReport, ValveStatus};
use super::ports::{ActuatorPort, ClockPort, EventSink};
use super::valve::{VALVE_COUNT, ValveId};

/// A [`ValveBank`] shared between threads.
pub struct SharedValveBank<A, C, D> {
    gate: Mutex<D>,
    bank: Mutex<ValveBank<A, C>>,
}

impl<A, C, D> SharedValveBank<A, C, D>
where
    A: ActuatorPort,
    C: ClockPort,
    D: DelayNs,
{
    /// Wrap an already-initialised bank.
    pub fn new(bank: ValveBank<A, C>, delay: D) -> Self {
        Self {
            gate: Mutex::new(delay),
            bank: Mutex::new(bank),
        }
    }

    /// See [`ValveBank::open`].
    pub fn open(
        &self,
        valve: u8,
        duration_minutes: u16,
        stagger: bool,
        sink: &mut impl EventSink,
    ) -> Result<OpenOutcome, ValveError> {
        let id = validate(valve)?;
        let mut delay = lock(&self.gate);

        let (step, wait_ms) = {
            let mut bank = lock(&self.bank);
            let step = bank.prepare_open(id, duration_minutes, stagger)?;
            if step == OpenStep::Rearmed {
                bank.apply_pump(sink);
            }
            (step, bank.stagger_delay_ms())
        };

        match step {
            OpenStep::Rearmed => Ok(OpenOutcome::Rearmed),
            OpenStep::Activate { stagger } => {
                if stagger {
                    debug!("valve {id}: staggering {wait_ms} ms (state lock released)");
                    delay.delay_ms(wait_ms);
                }
                lock(&self.bank).activate(id, duration_minutes, sink)
            }
        }
    }

    /// See [`ValveBank::close`].  Never waits on the activation gate.
    pub fn close(&self, valve: u8, sink: &mut impl EventSink) -> Result<(), ValveError> {
        lock(&self.bank).close(valve, sink)
    }

    /// See [`ValveBank::close_all`].  Opens are held off until it finishes;
    /// closes, queries, and sweeps may interleave between channels.
    pub fn close_all(&self, sink: &mut impl EventSink) {
        let mut delay = lock(&self.gate);
        let spacing_ms = lock(&self.bank).close_all_spacing_ms();
        for id in ValveId::all() {
            if id.index() > 0 {
                delay.delay_ms(spacing_ms);
            }
            let _ = lock(&self.bank).close_valve(id, sink);
        }
    }

    /// See [`ValveBank::tick`].
    pub fn tick(&self, sink: &mut impl EventSink) -> SweepReport {
        lock(&self.bank).tick(sink)
    }

    pub fn is_open(&self, valve: u8) -> bool {
        lock(&self.bank).is_open(valve)
    }

    pub fn running_minutes(&self, valve: u8) -> u32 {
        lock(&self.bank).running_minutes(valve)
    }

    pub fn pump_energized(&self) -> bool {
        lock(&self.bank).pump_energized()
    }

    pub fn statuses(&self) -> heapless::Vec<ValveStatus, VALVE_COUNT> {
        lock(&self.bank).statuses()
    }

    /// Run `f` with exclusive access to the bank (no gate).
    pub fn with_bank<R>(&self, f: impl FnOnce(&mut ValveBank<A, C>) -> R) -> R {
        f(&mut lock(&self.bank))
    }

    /// Unwrap back into the bank and the delay provider.
    pub fn into_inner(self) -> (ValveBank<A, C>, D) {
        (
            self.bank.into_inner().unwrap_or_else(PoisonError::into_inner),
            self.gate.into_inner().unwrap_or_else(PoisonError::into_inner),
        )
    }
}

/// Bank state is consistent between statements; a lock poisoned by a panic
/// elsewhere is recovered, never propagated.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
