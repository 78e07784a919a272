//! Queues between the network task and the control loop.
//!
//! Uses `embassy-sync` bounded MPMC channels so the MQTT callback thread and
//! the synchronous control loop share them without heap allocation.
//!
//! ```text
//! ┌──────────────┐ ValveCommand ┌──────────────┐
//! │  MQTT task   │─────────────▶│ Control loop │
//! │              │◀─────────────│              │
//! └──────────────┘   Outbound   └──────────────┘
//! ```

use core::fmt;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::commands::ValveCommand;
use crate::app::events::{StatusReport, ValveEvent};
use crate::error::CodecError;

use super::codec::{Publish, Topics, decode_command, encode_outbound};

/// Channel depth for inbound commands.
pub const COMMAND_DEPTH: usize = 8;

/// Channel depth for outbound messages.
pub const OUTBOUND_DEPTH: usize = 16;

pub type CommandChannel = Channel<CriticalSectionRawMutex, ValveCommand, COMMAND_DEPTH>;
pub type OutboundChannel = Channel<CriticalSectionRawMutex, Outbound, OUTBOUND_DEPTH>;

/// Something the control loop wants published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Event(ValveEvent),
    Status(StatusReport),
}

/// Inbound command channel: MQTT task → control loop.
pub static COMMAND_CHANNEL: CommandChannel = Channel::new();

/// Outbound channel: control loop → MQTT task.
pub static OUTBOUND_CHANNEL: OutboundChannel = Channel::new();

/// Why an inbound payload did not reach the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntakeError {
    Codec(CodecError),
    QueueFull,
}

impl fmt::Display for IntakeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Codec(e) => write!(f, "command rejected: {e}"),
            Self::QueueFull => write!(f, "command queue full"),
        }
    }
}

impl core::error::Error for IntakeError {}

impl From<CodecError> for IntakeError {
    fn from(e: CodecError) -> Self {
        Self::Codec(e)
    }
}

/// Decode a command payload and queue it for the control loop.
///
/// Called from the transport's receive callback; never blocks.
pub fn submit(channel: &CommandChannel, payload: &[u8]) -> Result<ValveCommand, IntakeError> {
    let cmd = decode_command(payload).inspect_err(|e| warn!("Dropping command: {e}"))?;
    channel.try_send(cmd).map_err(|_| {
        warn!("Dropping command {cmd:?}: queue full");
        IntakeError::QueueFull
    })?;
    Ok(cmd)
}

/// Empty the outbound queue, handing each encoded message to `publish`.
///
/// Called from the uplink task; never blocks.  Entries that fail to encode are
/// logged and dropped.  Returns the number of messages handed over.
pub fn drain_outbound(
    channel: &OutboundChannel,
    topics: &Topics,
    mut publish: impl FnMut(Publish),
) -> usize {
    let mut sent = 0;
    while let Ok(msg) = channel.try_receive() {
        match encode_outbound(&msg, topics) {
            Ok(out) => {
                for p in out {
                    publish(p);
                    sent += 1;
                }
            }
            Err(e) => warn!("Dropping outbound message: {e}"),
        }
    }
    sent
}
