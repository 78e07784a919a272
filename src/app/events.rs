//! Outbound application events.
//!
//! The [`ValveBank`](super::bank::ValveBank) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, publish over MQTT, etc.

use serde::Serialize;

use crate::error::ActuatorError;

use super::valve::{VALVE_COUNT, ValveId};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The bank drove every output to its OFF level.  `faulted` is a bitmask
    /// of channels (bit 0 = valve 1) whose output could not be driven.
    Initialized { faulted: u16 },

    /// A valve changed state.
    ValveChanged(ValveEvent),

    /// A valve output failed; the channel is now excluded from use.
    ChannelFault { valve: ValveId, error: ActuatorError },

    /// The pump relay write failed.  Retried on the next valve change.
    PumpFault(ActuatorError),
}

/// Why a valve changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeReason {
    /// An explicit open/close/close-all command.
    Commanded,
    /// The scheduled run length elapsed.
    DurationExpired,
    /// The unconditional continuous-run ceiling was hit.  Operationally
    /// significant: points at a stuck command or a runaway schedule.
    SafetyTimeout,
}

/// Valve position after a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Position {
    #[serde(rename = "ON")]
    Open,
    #[serde(rename = "OFF")]
    Closed,
}

/// One valve state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValveEvent {
    pub valve: ValveId,
    pub state: Position,
    pub reason: ChangeReason,
    /// Whole minutes the valve had been open (0 for opens).
    pub ran_minutes: u32,
}

/// Valves closed by one [`tick`](super::bank::ValveBank::tick) sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Closed because the scheduled duration elapsed.
    pub expired: heapless::Vec<ValveId, VALVE_COUNT>,
    /// Force-closed by the safety ceiling.
    pub safety_closed: heapless::Vec<ValveId, VALVE_COUNT>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.safety_closed.is_empty()
    }
}

/// Point-in-time view of one valve, for status reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValveStatus {
    #[serde(rename = "number")]
    pub valve: ValveId,
    pub state: Position,
    pub running_minutes: u32,
    pub scheduled_minutes: u16,
    #[serde(skip_serializing_if = "core::ops::Not::not")]
    pub faulted: bool,
}

/// Point-in-time view of the whole bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub device_id: heapless::String<48>,
    pub valves: heapless::Vec<ValveStatus, VALVE_COUNT>,
    pub pump: Position,
}
