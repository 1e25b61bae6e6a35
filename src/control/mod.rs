//! Actuator control: heater hysteresis, damper linkage and fan gating.
//!
//! [`ActuatorControl::compute`] turns the FSM context into one
//! [`ActuatorOutputs`] per second tick.  Precedence, highest first:
//!
//! 1. Any fault or soft-off: heater off, fan off, damper open.  During a
//!    fan retry with the fan fault as the only fault, the fan follows the
//!    state's demand.
//! 2. `Run` with time left: heater from hysteresis, fan once released.
//! 3. `Cool`: heater off, fan on.
//! 4. Anything else: all off.
//!
//! In auto mode the damper closes while the heater is on; in manual mode
//! it is always open.

pub mod hysteresis;

use crate::error::{Fault, FaultFlags};
use crate::fsm::StateId;
use crate::fsm::context::FsmContext;
use hysteresis::HysteresisController;

/// Damper blade position.  `Closed` drives the output high.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamperPosition {
    Open,
    Closed,
}

/// Front-panel lamp register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedBits(u8);

impl LedBits {
    pub const HEATER: u8 = 0x01;
    pub const FAN: u8 = 0x02;
    pub const DAMPER_AUTO: u8 = 0x20;
    pub const DAMPER_OPEN: u8 = 0x40;
    pub const DAMPER_CLOSE: u8 = 0x80;

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, mask: u8) -> bool {
        self.0 & mask == mask
    }
}

/// Relay register as reported over telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RelayBits(u8);

impl RelayBits {
    /// RY1, fitted on some boards, never driven here.
    pub const COMPRESSOR: u8 = 0x01;
    pub const HEATER: u8 = 0x02;
    pub const FAN: u8 = 0x04;
    pub const DAMPER: u8 = 0x08;

    pub const fn bits(self) -> u8 {
        self.0
    }
}

/// Desired actuator state for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorOutputs {
    pub heater: bool,
    pub fan: bool,
    pub damper: DamperPosition,
    /// Damper mode, carried for the lamp register.
    pub auto_damper: bool,
}

impl ActuatorOutputs {
    /// Heater and fan off, damper open.
    pub const fn safe(auto_damper: bool) -> Self {
        Self {
            heater: false,
            fan: false,
            damper: DamperPosition::Open,
            auto_damper,
        }
    }

    pub fn led_bits(&self) -> LedBits {
        let mut b = 0;
        if self.heater {
            b |= LedBits::HEATER;
        }
        if self.fan {
            b |= LedBits::FAN;
        }
        if self.auto_damper {
            b |= LedBits::DAMPER_AUTO;
        }
        b |= match self.damper {
            DamperPosition::Open => LedBits::DAMPER_OPEN,
            DamperPosition::Closed => LedBits::DAMPER_CLOSE,
        };
        LedBits(b)
    }

    pub fn relay_bits(&self) -> RelayBits {
        let mut b = 0;
        if self.heater {
            b |= RelayBits::HEATER;
        }
        if self.fan {
            b |= RelayBits::FAN;
        }
        if self.damper == DamperPosition::Closed {
            b |= RelayBits::DAMPER;
        }
        RelayBits(b)
    }
}

/// Whether the current state wants the fan, ignoring faults.
fn fan_demand(ctx: &FsmContext) -> bool {
    match ctx.process.dry_state {
        StateId::Run => ctx.process.remaining_minutes > 0 && ctx.fan_released,
        StateId::Cool => true,
        _ => false,
    }
}

/// Per-tick actuator decision logic.
pub struct ActuatorControl {
    heater: HysteresisController,
}

impl ActuatorControl {
    pub fn new(hysteresis_c: f32) -> Self {
        Self {
            heater: HysteresisController::new(hysteresis_c),
        }
    }

    /// Compute the outputs for the current context.
    pub fn compute(&mut self, ctx: &FsmContext) -> ActuatorOutputs {
        let p = &ctx.process;

        if ctx.has_faults() || p.soft_off {
            self.heater.reset();
            let mut out = ActuatorOutputs::safe(p.auto_damper);
            out.fan = !p.soft_off
                && ctx.fan_retry
                && ctx.fault_flags == FaultFlags::from_bits(Fault::Fan.mask())
                && fan_demand(ctx);
            return out;
        }

        let (heater, fan) = match p.dry_state {
            StateId::Run if p.remaining_minutes > 0 => {
                let on = self.heater.update(
                    ctx.sensors.measured_temperature_c,
                    f32::from(p.set_temperature_c),
                );
                (on, ctx.fan_released)
            }
            StateId::Cool => {
                self.heater.reset();
                (false, true)
            }
            StateId::Run | StateId::Finish => {
                self.heater.reset();
                (false, false)
            }
        };

        let damper = if p.auto_damper && heater {
            DamperPosition::Closed
        } else {
            DamperPosition::Open
        };

        ActuatorOutputs {
            heater,
            fan,
            damper,
            auto_damper: p.auto_damper,
        }
    }
}
