//! GPIO pin assignments for the AgroIrriga controller board.
//!
//! Single source of truth: the output binder references this module rather
//! than hard-coding pin numbers.  Change a pin here and it propagates everywhere.

use crate::app::valve::VALVE_COUNT;

// ---------------------------------------------------------------------------
// Solenoid drivers (one digital output per valve)
// ---------------------------------------------------------------------------

/// Digital outputs driving valves 1..=10, indexed by `valve - 1`.
/// Only GPIOs that support push-pull output are used.
pub const SOLENOID_GPIOS: [i32; VALVE_COUNT] = [4, 5, 13, 14, 15, 16, 17, 18, 19, 21];

// ---------------------------------------------------------------------------
// Main pump relay
// ---------------------------------------------------------------------------

/// Digital output driving the shared pump contactor.
pub const PUMP_GPIO: i32 = 22;
