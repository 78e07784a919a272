//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements    | Connects to                  |
//! |----------------|---------------|------------------------------|
//! | `gpio`         | ActuatorPort  | Solenoid + pump GPIO outputs |
//! | `log_sink`     | EventSink     | Serial log output            |
//! | `channel_sink` | EventSink     | Outbound MQTT queue          |
//! | `time`         | ClockPort     | ESP32 system timer           |
//! |                | DelayNs       | FreeRTOS task delay          |

pub mod channel_sink;
pub mod gpio;
pub mod log_sink;
pub mod time;
