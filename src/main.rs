//! AgroIrriga Firmware — Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  GpioActuators     LogEventSink   ChannelEventSink             │
//! │  (ActuatorPort)    (EventSink)    (EventSink → MQTT queue)     │
//! │  MonotonicClock    StdDelay                                    │
//! │  (ClockPort)       (DelayNs)                                   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  ValveBank · pump rule · expiry + safety sweeps        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  COMMAND_CHANNEL ──▶ control loop (1 Hz) ──▶ OUTBOUND_CHANNEL  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::Result;
use log::{debug, info, warn};

use agroirriga::adapters::channel_sink::ChannelEventSink;
use agroirriga::adapters::gpio::bind_outputs;
use agroirriga::adapters::log_sink::LogEventSink;
use agroirriga::adapters::time::{MonotonicClock, StdDelay};
use agroirriga::app::service::AppService;
use agroirriga::app::valve::VALVE_COUNT;
use agroirriga::config::ControllerConfig;
use agroirriga::link::channels::{COMMAND_CHANNEL, OUTBOUND_CHANNEL, Outbound, drain_outbound};
use agroirriga::link::codec::Topics;

fn uplink(topics: &Topics) {
    loop {
        drain_outbound(&OUTBOUND_CHANNEL, topics, |msg| {
            debug!("PUB {} ({} bytes)", msg.topic, msg.payload.len());
        });
        std::thread::sleep(Duration::from_millis(100));
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  AgroIrriga v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Config ─────────────────────────────────────────────
    let config = ControllerConfig::default();
    config.validate()?;
    info!("Device ID: {}", config.device_id);

    // ── 3. Outputs ────────────────────────────────────────────
    let actuators = bind_outputs(&config);
    let bound = actuators.bound_channels();
    if bound < VALVE_COUNT {
        warn!("Only {bound}/{VALVE_COUNT} solenoid outputs bound, running degraded");
    }

    // ── 4. Uplink task ────────────────────────────────────────
    //
    // Drains OUTBOUND_CHANNEL so the queue never backs up.  The MQTT client
    // publishes from the closure below, and its subscription callback on
    // `topics.command` feeds COMMAND_CHANNEL via `link::channels::submit`.
    // Until the broker is connected, messages are only logged.
    let topics = Topics::new(&config.device_id);
    info!("Command topic: {}", topics.command);
    std::thread::Builder::new()
        .name("uplink".into())
        .stack_size(8 * 1024)
        .spawn(move || uplink(&topics))?;

    // ── 5. Application service ────────────────────────────────
    let tick = Duration::from_millis(u64::from(config.tick_interval_ms));
    let mut service = AppService::new(actuators, MonotonicClock::new(), config);
    let mut delay = StdDelay;
    let mut sink = (LogEventSink::new(), ChannelEventSink::new(&OUTBOUND_CHANNEL));
    service.start(&mut sink);

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        while let Ok(cmd) = COMMAND_CHANNEL.try_receive() {
            match service.handle_command(cmd, &mut delay, &mut sink) {
                Ok(outcome) => debug!("{cmd:?} -> {outcome:?}"),
                Err(e) => warn!("{cmd:?} failed: {e}"),
            }
        }

        let report = service.tick(&mut sink);
        if !report.safety_closed.is_empty() {
            warn!("Safety sweep closed {:?}", report.safety_closed);
        }

        if service.status_due()
            && OUTBOUND_CHANNEL
                .try_send(Outbound::Status(service.build_status()))
                .is_err()
        {
            warn!("Outbound queue full, status report skipped");
        }

        std::thread::sleep(tick);
    }
}
