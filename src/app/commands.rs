//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (MQTT command
//! topic, local console, a scheduling backend) that the
//! [`AppService`](super::service::AppService) applies to the valve bank.
//! Valve ids are carried raw; the bank validates them.

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveCommand {
    /// Open a valve (or re-arm its duration if already open).
    /// `duration_minutes == 0` keeps it open until closed.
    Open { valve: u8, duration_minutes: u16 },

    /// Close a single valve.
    Close { valve: u8 },

    /// Close every valve, staggered.
    CloseAll,
}
