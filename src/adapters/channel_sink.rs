//! Event sink that forwards valve changes to the outbound queue.
//!
//! The MQTT task drains [`OUTBOUND_CHANNEL`](crate::link::channels::OUTBOUND_CHANNEL)
//! and publishes each entry.  Fault and lifecycle events stay local; they are
//! visible in the next status report and in the log.

use log::warn;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::link::channels::{Outbound, OutboundChannel};

pub struct ChannelEventSink<'a> {
    channel: &'a OutboundChannel,
    dropped: u32,
}

impl<'a> ChannelEventSink<'a> {
    pub fn new(channel: &'a OutboundChannel) -> Self {
        Self { channel, dropped: 0 }
    }

    /// Events discarded because the queue was full.
    pub fn dropped(&self) -> u32 {
        self.dropped
    }
}

impl EventSink for ChannelEventSink<'_> {
    fn emit(&mut self, event: &AppEvent) {
        let AppEvent::ValveChanged(ev) = event else {
            return;
        };
        if self.channel.try_send(Outbound::Event(*ev)).is_err() {
            self.dropped = self.dropped.saturating_add(1);
            warn!("Outbound queue full, dropped event for valve {}", ev.valve);
        }
    }
}
