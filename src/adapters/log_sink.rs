//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).

use log::{error, info, warn};

use crate::app::events::{AppEvent, ChangeReason, Position};
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Initialized { faulted } => {
                info!("START | faulted=0b{faulted:010b}");
            }
            AppEvent::ValveChanged(ev) => match (ev.state, ev.reason) {
                (Position::Open, _) => info!("VALVE | {} ON", ev.valve),
                (Position::Closed, ChangeReason::SafetyTimeout) => {
                    warn!("VALVE | {} OFF safety-timeout after {} min", ev.valve, ev.ran_minutes);
                }
                (Position::Closed, reason) => {
                    info!("VALVE | {} OFF {:?} after {} min", ev.valve, reason, ev.ran_minutes);
                }
            },
            AppEvent::ChannelFault { valve, error: e } => {
                error!("FAULT | valve {valve}: {e}");
            }
            AppEvent::PumpFault(e) => {
                error!("FAULT | pump: {e}");
            }
        }
    }
}
