//! Smoothing filters for the primary temperature channel.
//!
//! Two stages:
//!
//! 1. [`ExpFilter`] runs on the raw divider voltage at the control-loop
//!    rate (≈ 10 ms) and rejects ADC noise.
//! 2. [`SlewLimitedAverage`] runs once per second on the converted
//!    temperature: a 10-sample moving average whose output may move at
//!    most `max_step` per call.

/// Smoothing factor for the fast voltage EMA.
pub const EMA_ALPHA: f32 = 0.01;

/// Window length of the per-second moving average.
pub const AVERAGE_WINDOW: usize = 10;

/// Largest change of the averaged temperature per second (°C).
pub const MAX_STEP_C: f32 = 2.0;

/// First-order exponential filter, seeded by the first sample.
#[derive(Debug, Clone, Copy)]
pub struct ExpFilter {
    alpha: f32,
    value: Option<f32>,
}

impl ExpFilter {
    pub const fn new(alpha: f32) -> Self {
        Self { alpha, value: None }
    }

    /// Feed one sample and return the filtered value.
    pub fn update(&mut self, sample: f32) -> f32 {
        let next = match self.value {
            Some(old) => old * (1.0 - self.alpha) + sample * self.alpha,
            None => sample,
        };
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<f32> {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = None;
    }
}

impl Default for ExpFilter {
    fn default() -> Self {
        Self::new(EMA_ALPHA)
    }
}

/// Moving average over [`AVERAGE_WINDOW`] samples followed by a slew
/// limiter on the output.
#[derive(Debug, Clone)]
pub struct SlewLimitedAverage {
    ring: [f32; AVERAGE_WINDOW],
    head: usize,
    max_step: f32,
    last: Option<f32>,
}

impl SlewLimitedAverage {
    pub const fn new(max_step: f32) -> Self {
        Self {
            ring: [0.0; AVERAGE_WINDOW],
            head: 0,
            max_step,
            last: None,
        }
    }

    pub fn update(&mut self, sample: f32) -> f32 {
        let Some(last) = self.last else {
            // First sample after construction or reset fills the window.
            self.ring = [sample; AVERAGE_WINDOW];
            self.head = 0;
            self.last = Some(sample);
            return sample;
        };

        self.ring[self.head] = sample;
        self.head = (self.head + 1) % AVERAGE_WINDOW;

        let avg = self.ring.iter().sum::<f32>() / AVERAGE_WINDOW as f32;
        let out = avg.clamp(last - self.max_step, last + self.max_step);
        self.last = Some(out);
        out
    }

    pub fn last(&self) -> Option<f32> {
        self.last
    }

    /// Forget history; the next sample re-seeds the window.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl Default for SlewLimitedAverage {
    fn default() -> Self {
        Self::new(MAX_STEP_C)
    }
}
