//! Controller configuration parameters
//!
//! All tunable parameters for the valve controller.  The surrounding system
//! supplies them (e.g. a JSON document delivered at boot); this crate never
//! persists them.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Longest tick interval accepted.  The safety sweep must not lag by more than
/// a few seconds behind the ceiling.
const MAX_TICK_INTERVAL_MS: u32 = 5_000;

/// Core controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // --- Identity ---
    /// Device identifier used in topics and payloads
    pub device_id: heapless::String<48>,

    // --- Valve timing ---
    /// Wait before energising a valve while another is already open (ms)
    pub stagger_delay_ms: u32,
    /// Spacing between consecutive closes during close-all (ms)
    pub close_all_spacing_ms: u32,
    /// Maximum continuous open time for any valve (ms)
    pub safety_timeout_ms: u64,

    // --- Loop timing ---
    /// Control loop (sweep) interval (milliseconds)
    pub tick_interval_ms: u32,
    /// Status report interval (seconds)
    pub status_interval_secs: u32,

    // --- Output polarity ---
    /// true if a solenoid driver energises on HIGH, false for low-trigger relays
    pub valve_active_high: bool,
    /// true if the pump contactor energises on HIGH
    pub pump_active_high: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        let mut device_id = heapless::String::new();
        // Fits: 21 bytes into 48.
        let _ = device_id.push_str("agroirriga_fazenda_01");

        Self {
            device_id,

            // Valve timing
            stagger_delay_ms: 500,
            close_all_spacing_ms: 100,
            safety_timeout_ms: 2 * 60 * 60 * 1000, // 2 h

            // Loop timing
            tick_interval_ms: 1000,   // 1 Hz
            status_interval_secs: 60, // 1/min

            // Polarity
            valve_active_high: true,
            pump_active_high: true,
        }
    }
}

impl ControllerConfig {
    /// Parse a JSON config document and validate it.
    /// Missing fields take their defaults.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_slice(bytes).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would disable or weaken the safety ceiling.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_id.is_empty() {
            return Err(ConfigError::ValidationFailed("device_id must not be empty"));
        }
        if self.safety_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "safety_timeout_ms must be positive",
            ));
        }
        if self.tick_interval_ms == 0 || self.tick_interval_ms > MAX_TICK_INTERVAL_MS {
            return Err(ConfigError::ValidationFailed(
                "tick_interval_ms must be within 1..=5000",
            ));
        }
        if u64::from(self.stagger_delay_ms) >= self.safety_timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "stagger_delay_ms must be below safety_timeout_ms",
            ));
        }
        if self.status_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "status_interval_secs must be positive",
            ));
        }
        Ok(())
    }
}
