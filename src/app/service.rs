//! Application service — the hexagonal core.
//!
//! [`AppService`] owns the [`ValveBank`] and the live configuration, and is
//! what the control loop talks to.  Commands arrive from whatever transport
//! is wired in; the sweep runs on the loop's fixed cadence; status reports go
//! out on their own slower cadence.
//!
//! ```text
//!  ValveCommand ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                   │       AppService       │
//!   ClockPort ────▶ │  ValveBank · status    │ ──▶ ActuatorPort
//!                   └────────────────────────┘
//! ```

use embedded_hal::delay::DelayNs;
use log::info;

use crate::config::ControllerConfig;
use crate::error::ValveError;

use super::bank::{OpenOutcome, ValveBank};
use super::commands::ValveCommand;
use super::events::{Position, StatusReport, SweepReport};
use super::ports::{ActuatorPort, ClockPort, EventSink};

/// What a successfully applied command did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Opened,
    Rearmed,
    Closed,
    AllClosed,
}

impl From<OpenOutcome> for CommandOutcome {
    fn from(outcome: OpenOutcome) -> Self {
        match outcome {
            OpenOutcome::Opened => Self::Opened,
            OpenOutcome::Rearmed => Self::Rearmed,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService<A, C> {
    bank: ValveBank<A, C>,
    config: ControllerConfig,
    tick_count: u64,
    /// Monotonic time of the last status report, `None` before the first.
    last_status_ms: Option<u64>,
}

impl<A: ActuatorPort, C: ClockPort> AppService<A, C> {
    /// Construct the service.  Outputs are untouched until [`start`](Self::start).
    pub fn new(actuators: A, clock: C, config: ControllerConfig) -> Self {
        let bank = ValveBank::new(actuators, clock, &config);
        Self {
            bank,
            config,
            tick_count: 0,
            last_status_ms: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive all outputs to a known-off state.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.bank.initialize(sink);
        info!("AppService started ({})", self.config.device_id);
    }

    /// Close every valve and release the hardware.
    pub fn shutdown(self, delay: &mut impl DelayNs, sink: &mut impl EventSink) -> A {
        self.bank.shutdown(delay, sink)
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one sweep.  Call every `tick_interval_ms`.
    pub fn tick(&mut self, sink: &mut impl EventSink) -> SweepReport {
        self.tick_count += 1;
        self.bank.tick(sink)
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply an external command.  Opens always request staggering.
    pub fn handle_command(
        &mut self,
        cmd: ValveCommand,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) -> Result<CommandOutcome, ValveError> {
        match cmd {
            ValveCommand::Open {
                valve,
                duration_minutes,
            } => self
                .bank
                .open(valve, duration_minutes, true, delay, sink)
                .map(CommandOutcome::from),
            ValveCommand::Close { valve } => {
                self.bank.close(valve, sink)?;
                Ok(CommandOutcome::Closed)
            }
            ValveCommand::CloseAll => {
                self.bank.close_all(delay, sink);
                Ok(CommandOutcome::AllClosed)
            }
        }
    }

    // ── Status ────────────────────────────────────────────────

    /// True when a periodic status report is due; marks it as sent.
    pub fn status_due(&mut self) -> bool {
        let now = self.bank.clock().now_ms();
        let interval_ms = u64::from(self.config.status_interval_secs) * 1000;
        let due = self
            .last_status_ms
            .is_none_or(|last| now.saturating_sub(last) >= interval_ms);
        if due {
            self.last_status_ms = Some(now);
        }
        due
    }

    /// Build a status report from the current bank state.
    pub fn build_status(&self) -> StatusReport {
        StatusReport {
            device_id: self.config.device_id.clone(),
            valves: self.bank.statuses(),
            pump: if self.bank.pump_energized() {
                Position::Open
            } else {
                Position::Closed
            },
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn bank(&self) -> &ValveBank<A, C> {
        &self.bank
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Total sweeps executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
