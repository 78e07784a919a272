//! GPIO actuator adapter bridging `embedded-hal` output pins to
//! [`ActuatorPort`].
//!
//! One digital output per solenoid plus the pump relay.  Channels whose pin
//! could not be claimed at boot are held as `None` and report
//! [`ActuatorError::NotBound`], so the bank marks them faulted while the
//! remaining channels keep working.  Electrical polarity comes from
//! [`ControllerConfig`]; the domain only ever says energised or not.

use embedded_hal::digital::{Error as _, OutputPin};
use log::debug;

use crate::app::ports::ActuatorPort;
use crate::app::valve::{VALVE_COUNT, ValveId};
use crate::config::ControllerConfig;
use crate::error::ActuatorError;

/// Solenoid and pump outputs behind [`ActuatorPort`].
pub struct GpioActuators<P> {
    valves: [Option<P>; VALVE_COUNT],
    pump: Option<P>,
    valve_active_high: bool,
    pump_active_high: bool,
}

impl<P: OutputPin> GpioActuators<P> {
    pub fn new(
        valves: [Option<P>; VALVE_COUNT],
        pump: Option<P>,
        config: &ControllerConfig,
    ) -> Self {
        Self {
            valves,
            pump,
            valve_active_high: config.valve_active_high,
            pump_active_high: config.pump_active_high,
        }
    }

    /// Number of solenoid channels with a bound output.
    pub fn bound_channels(&self) -> usize {
        self.valves.iter().filter(|p| p.is_some()).count()
    }

    /// Release the pins.
    pub fn into_parts(self) -> ([Option<P>; VALVE_COUNT], Option<P>) {
        (self.valves, self.pump)
    }
}

impl<P: OutputPin> ActuatorPort for GpioActuators<P> {
    fn set_valve(&mut self, valve: ValveId, energized: bool) -> Result<(), ActuatorError> {
        drive(
            self.valves[valve.index()].as_mut(),
            energized,
            self.valve_active_high,
        )
    }

    fn set_pump(&mut self, energized: bool) -> Result<(), ActuatorError> {
        drive(self.pump.as_mut(), energized, self.pump_active_high)
    }
}

fn drive<P: OutputPin>(
    pin: Option<&mut P>,
    energized: bool,
    active_high: bool,
) -> Result<(), ActuatorError> {
    let pin = pin.ok_or(ActuatorError::NotBound)?;
    let written = if energized == active_high {
        pin.set_high()
    } else {
        pin.set_low()
    };
    written.map_err(|e| {
        debug!("gpio write error: {:?}", e.kind());
        ActuatorError::GpioWriteFailed
    })
}

// ── ESP-IDF binding ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod espidf {
    use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
    use log::error;

    use super::GpioActuators;
    use crate::config::ControllerConfig;
    use crate::pins::{PUMP_GPIO, SOLENOID_GPIOS};

    pub type EspOutput = PinDriver<'static, AnyOutputPin, Output>;

    fn claim(gpio: i32) -> Option<EspOutput> {
        // SAFETY: each GPIO in `pins` is claimed exactly once, here.
        let pin = unsafe { AnyOutputPin::new(gpio) };
        PinDriver::output(pin)
            .inspect_err(|e| error!("GPIO{gpio}: output init failed: {e}"))
            .ok()
    }

    /// Claim every solenoid and pump output listed in [`crate::pins`].
    /// Call once at boot.
    pub fn bind_outputs(config: &ControllerConfig) -> GpioActuators<EspOutput> {
        GpioActuators::new(SOLENOID_GPIOS.map(claim), claim(PUMP_GPIO), config)
    }
}

#[cfg(target_os = "espidf")]
pub use espidf::{EspOutput, bind_outputs};
