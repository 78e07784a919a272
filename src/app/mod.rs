//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the business rules for the valve controller: the
//! per-valve state machine, the pump rule, staggering, and the expiry and
//! safety sweeps.  All interaction with hardware happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable without
//! real peripherals.

pub mod bank;
pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod shared;
pub mod valve;
