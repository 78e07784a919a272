//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ValveBank (domain)
//! ```
//!
//! Driven adapters (GPIO outputs, clocks, event sinks) implement these
//! traits.  The [`ValveBank`](super::bank::ValveBank) consumes them via
//! generics, so the domain core never touches hardware directly.
//!
//! Blocking waits use [`embedded_hal::delay::DelayNs`] directly rather than a
//! port of our own; every HAL already ships one.

use crate::error::ActuatorError;

use super::events::AppEvent;
use super::valve::ValveId;

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to drive solenoids and the pump.
///
/// `energized` is the logical state; adapters translate it into the
/// electrical level their driver needs (active-high or active-low).
pub trait ActuatorPort {
    /// Drive the solenoid output for `valve`.
    fn set_valve(&mut self, valve: ValveId, energized: bool) -> Result<(), ActuatorError>;

    /// Drive the shared pump relay.
    fn set_pump(&mut self, energized: bool) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic time source.  Must not jump with wall-clock adjustments
/// (NTP sync, timezone changes).
pub trait ClockPort {
    /// Milliseconds since an arbitrary fixed origin (usually boot).
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.  Adapters
/// decide where they go (serial log, MQTT status topic, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

/// Fan one event out to two sinks, e.g. the serial log and the uplink.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &AppEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: &AppEvent) {
        (**self).emit(event);
    }
}
