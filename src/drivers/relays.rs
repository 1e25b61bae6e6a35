//! Heater, fan and damper relay outputs.
//!
//! All three are active-high.  The damper relay drives the motor to the
//! closed position while energised.  Outputs are rewritten every tick so
//! a glitched pin recovers within one second.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives GPIO via hw_init.
//! On host/test: tracks state in-memory only.

use crate::control::{ActuatorOutputs, DamperPosition};
use crate::drivers::hw_init;
use crate::error::ActuatorError;
use crate::pins;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayState {
    pub heater: bool,
    pub fan: bool,
    pub damper_closed: bool,
}

pub struct RelayBank {
    state: RelayState,
}

impl Default for RelayBank {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayBank {
    pub fn new() -> Self {
        Self {
            state: RelayState::default(),
        }
    }

    pub fn set_heater(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.state.heater = on;
        hw_init::gpio_write(pins::HEATER_GPIO, on)
    }

    pub fn set_fan(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.state.fan = on;
        hw_init::gpio_write(pins::FAN_GPIO, on)
    }

    pub fn set_damper(&mut self, position: DamperPosition) -> Result<(), ActuatorError> {
        let closed = position == DamperPosition::Closed;
        self.state.damper_closed = closed;
        hw_init::gpio_write(pins::DAMPER_GPIO, closed)
    }

    /// Drive all three lines, even if an earlier write fails.  Returns
    /// the first failure.
    pub fn apply(&mut self, out: &ActuatorOutputs) -> Result<(), ActuatorError> {
        let heater = self.set_heater(out.heater);
        let fan = self.set_fan(out.fan);
        let damper = self.set_damper(out.damper);
        heater.and(fan).and(damper)
    }

    pub fn state(&self) -> RelayState {
        self.state
    }
}
