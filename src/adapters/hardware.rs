//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`], the relay bank and the buzzer, exposing them
//! through [`SensorPort`] and [`ActuatorPort`].  On non-espidf targets,
//! the underlying drivers use cfg-gated simulation stubs.

use log::{info, warn};

use crate::app::ports::{ActuatorPort, SensorPort};
use crate::control::ActuatorOutputs;
use crate::drivers::buzzer::Buzzer;
use crate::drivers::relays::{RelayBank, RelayState};
use crate::fsm::context::SensorSnapshot;
use crate::sensors::SensorHub;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter {
    sensor_hub: SensorHub,
    relays: RelayBank,
    buzzer: Buzzer,
    /// A relay write failed on the last apply.
    relay_fault: bool,
}

impl HardwareAdapter {
    pub fn new(sensor_hub: SensorHub, relays: RelayBank, buzzer: Buzzer) -> Self {
        Self {
            sensor_hub,
            relays,
            buzzer,
            relay_fault: false,
        }
    }

    /// Last levels written to the relays.
    pub fn relay_state(&self) -> RelayState {
        self.relays.state()
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl SensorPort for HardwareAdapter {
    fn sample_fast(&mut self) {
        self.sensor_hub.sample_fast();
    }

    fn read_all(&mut self) -> SensorSnapshot {
        self.sensor_hub.read_all()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl ActuatorPort for HardwareAdapter {
    fn apply(&mut self, out: &ActuatorOutputs) {
        match self.relays.apply(out) {
            Ok(()) if self.relay_fault => {
                info!("relays: writes recovered");
                self.relay_fault = false;
            }
            Ok(()) => {}
            Err(e) => {
                if !self.relay_fault {
                    warn!("relays: {e}; retried next tick");
                }
                self.relay_fault = true;
            }
        }
    }

    fn beep(&mut self) {
        self.buzzer.beep();
    }
}
