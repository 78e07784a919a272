//! JSON wire formats spoken with the irrigation backend.
//!
//! Inbound, on `agroirriga/<device>/command`:
//!
//! ```json
//! {"action":"valve_on","valve":3,"duration":10,"source":"web_api"}
//! {"action":"valve_off","valve":3}
//! {"action":"valve_all_off"}
//! ```
//!
//! Outbound: a periodic status document on `/status`, one document per valve
//! state change on `/events`, and an alert on `/alerts` for every safety
//! timeout.

use core::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::app::commands::ValveCommand;
use crate::app::events::{ChangeReason, Position, StatusReport, ValveEvent};
use crate::app::valve::ValveId;
use crate::error::CodecError;

use super::channels::Outbound;

/// Topic strings hold `agroirriga/` + a 48-byte device id + a suffix.
pub type Topic = heapless::String<96>;

// ───────────────────────────────────────────────────────────────
// Inbound
// ───────────────────────────────────────────────────────────────

/// Longer than any action we accept; longer strings are rejected as malformed.
type Action = heapless::String<32>;

#[derive(Deserialize)]
struct WireCommand {
    action: Action,
    #[serde(default, alias = "valveId")]
    valve: Option<u8>,
    #[serde(default, alias = "durationMinutes")]
    duration: Option<u16>,
}

/// Decode one command payload.
///
/// Unknown fields are ignored and a missing duration means open-ended.
/// Valve ids are passed through unchecked; range validation is the bank's job.
pub fn decode_command(payload: &[u8]) -> Result<ValveCommand, CodecError> {
    let wire: WireCommand =
        serde_json::from_slice(payload).map_err(|_| CodecError::Malformed)?;

    match wire.action.as_str() {
        "valve_on" | "open" => Ok(ValveCommand::Open {
            valve: wire.valve.ok_or(CodecError::MissingField("valve"))?,
            duration_minutes: wire.duration.unwrap_or(0),
        }),
        "valve_off" | "close" => Ok(ValveCommand::Close {
            valve: wire.valve.ok_or(CodecError::MissingField("valve"))?,
        }),
        "valve_all_off" | "close_all" | "closeAll" => Ok(ValveCommand::CloseAll),
        _ => Err(CodecError::UnsupportedAction),
    }
}

// ───────────────────────────────────────────────────────────────
// Outbound
// ───────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct EventDoc<'a> {
    device_id: &'a str,
    valve: ValveId,
    state: Position,
    reason: ChangeReason,
    ran_minutes: u32,
}

#[derive(Serialize)]
struct AlertDoc<'a> {
    device_id: &'a str,
    alert_type: &'static str,
    valve: ValveId,
    ran_minutes: u32,
}

pub fn encode_status(report: &StatusReport) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(report).map_err(|_| CodecError::EncodeFailed)
}

pub fn encode_event(device_id: &str, event: &ValveEvent) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(&EventDoc {
        device_id,
        valve: event.valve,
        state: event.state,
        reason: event.reason,
        ran_minutes: event.ran_minutes,
    })
    .map_err(|_| CodecError::EncodeFailed)
}

/// Alert document for a safety timeout; `None` for any other change.
pub fn encode_alert(device_id: &str, event: &ValveEvent) -> Option<Result<Vec<u8>, CodecError>> {
    if event.reason != ChangeReason::SafetyTimeout {
        return None;
    }
    Some(
        serde_json::to_vec(&AlertDoc {
            device_id,
            alert_type: "safety_timeout",
            valve: event.valve,
            ran_minutes: event.ran_minutes,
        })
        .map_err(|_| CodecError::EncodeFailed),
    )
}

/// One message ready for the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publish {
    pub topic: Topic,
    pub payload: Vec<u8>,
}

/// Encode an outbound queue entry into the publishes it produces: one for
/// status and ordinary events, two (event + alert) for safety timeouts.
pub fn encode_outbound(
    msg: &Outbound,
    topics: &Topics,
) -> Result<heapless::Vec<Publish, 2>, CodecError> {
    let mut out = heapless::Vec::new();
    match msg {
        Outbound::Status(report) => {
            let _ = out.push(Publish {
                topic: topics.status.clone(),
                payload: encode_status(report)?,
            });
        }
        Outbound::Event(event) => {
            let _ = out.push(Publish {
                topic: topics.events.clone(),
                payload: encode_event(&topics.device_id, event)?,
            });
            if let Some(alert) = encode_alert(&topics.device_id, event) {
                let _ = out.push(Publish {
                    topic: topics.alerts.clone(),
                    payload: alert?,
                });
            }
        }
    }
    Ok(out)
}

// ───────────────────────────────────────────────────────────────
// Topics
// ───────────────────────────────────────────────────────────────

/// MQTT topic names for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub device_id: heapless::String<48>,
    pub command: Topic,
    pub status: Topic,
    pub events: Topic,
    pub alerts: Topic,
}

impl Topics {
    pub fn new(device_id: &heapless::String<48>) -> Self {
        Self {
            device_id: device_id.clone(),
            command: topic(device_id, "command"),
            status: topic(device_id, "status"),
            events: topic(device_id, "events"),
            alerts: topic(device_id, "alerts"),
        }
    }
}

fn topic(device_id: &str, suffix: &str) -> Topic {
    let mut t = Topic::new();
    // Capacity covers the longest device id plus the longest suffix.
    let _ = write!(t, "agroirriga/{device_id}/{suffix}");
    t
}
