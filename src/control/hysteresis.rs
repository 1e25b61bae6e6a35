//! Two-threshold on/off controller for the heater.
//!
//! Switches on below `setpoint - band`, off above `setpoint + band`, and
//! otherwise holds the last commanded state.

/// Hysteresis (bang-bang) controller.
#[derive(Debug, Clone, Copy)]
pub struct HysteresisController {
    band: f32,
    on: bool,
}

impl HysteresisController {
    pub fn new(band: f32) -> Self {
        Self {
            band: band.abs(),
            on: false,
        }
    }

    /// Compute the output for one sample.
    pub fn update(&mut self, measured: f32, setpoint: f32) -> bool {
        if measured < setpoint - self.band {
            self.on = true;
        } else if measured > setpoint + self.band {
            self.on = false;
        }
        self.on
    }

    /// Last commanded output.
    pub fn is_on(&self) -> bool {
        self.on
    }

    /// Forget the held state; the next update starts from off.
    pub fn reset(&mut self) {
        self.on = false;
    }
}
