//! Per-valve state records.
//!
//! The bank holds ten of these in a fixed array indexed by `id - 1`.  A
//! [`ValveId`] can only be obtained through validation, so code that holds one
//! never needs to range-check again.

use core::fmt;

use serde::Serialize;

use crate::error::ActuatorError;

/// Number of solenoid channels.  Fixed hardware topology.
pub const VALVE_COUNT: usize = 10;

const MS_PER_MINUTE: u64 = 60_000;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A validated 1-based valve identifier (1..=10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ValveId(u8);

impl ValveId {
    /// Returns `None` for ids outside 1..=10.
    pub const fn new(id: u8) -> Option<Self> {
        if id >= 1 && id as usize <= VALVE_COUNT {
            Some(Self(id))
        } else {
            None
        }
    }

    /// Build from a zero-based array index.
    pub(crate) const fn from_index(idx: usize) -> Self {
        debug_assert!(idx < VALVE_COUNT);
        Self(idx as u8 + 1)
    }

    /// All ten ids in ascending order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..VALVE_COUNT).map(Self::from_index)
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize - 1
    }
}

impl TryFrom<u8> for ValveId {
    type Error = u8;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Self::new(id).ok_or(id)
    }
}

impl fmt::Display for ValveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Open/closed state of one valve.  The open timestamp and scheduled duration
/// only exist while the valve is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValveState {
    #[default]
    Closed,
    Open {
        /// Monotonic timestamp of the closed→open transition.
        opened_at_ms: u64,
        /// Requested run length; 0 = open-ended.
        scheduled_minutes: u16,
    },
}

/// Health of a channel's physical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelHealth {
    #[default]
    Ok,
    /// The output could not be bound or driven.  The channel refuses opens
    /// until the bank is re-initialised.
    Faulted(ActuatorError),
}

/// Record for a single valve channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Valve {
    pub(crate) state: ValveState,
    pub(crate) health: ChannelHealth,
}

impl Valve {
    pub fn state(&self) -> ValveState {
        self.state
    }

    pub fn health(&self) -> ChannelHealth {
        self.health
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, ValveState::Open { .. })
    }

    /// Scheduled run length, 0 while closed or open-ended.
    pub fn scheduled_minutes(&self) -> u16 {
        match self.state {
            ValveState::Open {
                scheduled_minutes, ..
            } => scheduled_minutes,
            ValveState::Closed => 0,
        }
    }

    /// Milliseconds since the valve opened, `None` while closed.
    /// A clock reading earlier than the open timestamp counts as zero.
    pub fn elapsed_ms(&self, now_ms: u64) -> Option<u64> {
        match self.state {
            ValveState::Open { opened_at_ms, .. } => Some(now_ms.saturating_sub(opened_at_ms)),
            ValveState::Closed => None,
        }
    }

    /// Whole minutes open, truncated toward zero.  0 while closed.
    pub fn running_minutes(&self, now_ms: u64) -> u32 {
        self.elapsed_ms(now_ms)
            .map_or(0, |ms| (ms / MS_PER_MINUTE).min(u64::from(u32::MAX)) as u32)
    }

    /// True if a scheduled (non-zero) duration has fully elapsed.
    pub fn duration_expired(&self, now_ms: u64) -> bool {
        match self.state {
            ValveState::Open {
                scheduled_minutes: 0,
                ..
            }
            | ValveState::Closed => false,
            ValveState::Open {
                scheduled_minutes, ..
            } => self.running_minutes(now_ms) >= u32::from(scheduled_minutes),
        }
    }

    /// True if the valve has been open strictly longer than `ceiling_ms`.
    pub fn exceeds(&self, now_ms: u64, ceiling_ms: u64) -> bool {
        self.elapsed_ms(now_ms).is_some_and(|ms| ms > ceiling_ms)
    }
}
