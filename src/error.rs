//! Error types for the valve controller.
//!
//! A small set of `Copy` enums: every failure the core can report is a plain
//! value that can be logged, forwarded as telemetry, or matched on by the
//! command adapter without allocation.

use core::fmt;

use crate::app::valve::ValveId;

// ---------------------------------------------------------------------------
// Valve command errors
// ---------------------------------------------------------------------------

/// Errors returned by the [`ValveBank`](crate::app::bank::ValveBank) entry points.
///
/// All of these are recoverable: the caller treats the command as a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveError {
    /// The requested id is outside 1..=10.  No physical side effect occurred.
    InvalidValveId(u8),
    /// The channel failed to bind or drive earlier and is excluded from use.
    ChannelFaulted(ValveId),
    /// Driving the channel's output failed during this call.
    Actuator { valve: ValveId, error: ActuatorError },
}

impl fmt::Display for ValveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValveId(id) => write!(f, "invalid valve id {id} (expected 1-10)"),
            Self::ChannelFaulted(valve) => write!(f, "valve {valve} channel is faulted"),
            Self::Actuator { valve, error } => write!(f, "valve {valve}: {error}"),
        }
    }
}

impl core::error::Error for ValveError {}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

/// Failures reported by an [`ActuatorPort`](crate::app::ports::ActuatorPort).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// No output pin is bound to this channel (hardware init failed).
    NotBound,
    /// The GPIO level write returned an error.
    GpioWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotBound => write!(f, "output not bound"),
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
        }
    }
}

impl core::error::Error for ActuatorError {}

// ---------------------------------------------------------------------------
// Link codec errors
// ---------------------------------------------------------------------------

/// Errors from decoding inbound command payloads or encoding outbound ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Payload is not a JSON object of the expected shape.
    Malformed,
    /// The `action` is valid JSON but not something this controller executes
    /// (e.g. `schedule_irrigation`, which belongs to the scheduling backend).
    UnsupportedAction,
    /// A field required by the action is absent.
    MissingField(&'static str),
    /// Serialising an outbound document failed.
    EncodeFailed,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed payload"),
            Self::UnsupportedAction => write!(f, "unsupported action"),
            Self::MissingField(name) => write!(f, "missing field '{name}'"),
            Self::EncodeFailed => write!(f, "encode failed"),
        }
    }
}

impl core::error::Error for CodecError {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from parsing or validating a [`ControllerConfig`](crate::config::ControllerConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The document could not be deserialised.
    Corrupted,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl core::error::Error for ConfigError {}
