//! NTC thermistor (5 kΩ @ 25 °C, β = 3970) on a 5 kΩ pull-up divider.
//!
//! The divider voltage arrives in millivolts.  Below [`SHORT_MV`] the
//! probe is shorted, above [`OPEN_MV`] it is disconnected; both report
//! [`FAULT_SENTINEL_C`] instead of a converted temperature.

use crate::error::SensorError;

/// Pull-up resistance (Ω).
pub const PULL_UP_OHMS: f32 = 5_000.0;
/// Nominal resistance at 25 °C (Ω).
pub const R25_OHMS: f32 = 5_000.0;
/// β coefficient (K).
pub const BETA: f32 = 3_970.0;
/// 25 °C in kelvin.
pub const T0_K: f32 = 298.15;
/// Divider supply (V).
pub const V_SUPPLY: f32 = 3.3;

/// Full-scale reading of the 12-bit converter, in mV.
pub const FULL_SCALE_MV: f32 = 3_300.0;
const ADC_COUNTS: f32 = 4_095.0;
/// Lowest accepted reading (one count).
pub const MIN_MV: f32 = FULL_SCALE_MV / ADC_COUNTS;
/// Highest accepted reading (full scale minus one count).
pub const MAX_MV: f32 = FULL_SCALE_MV - FULL_SCALE_MV / ADC_COUNTS;

/// Divider voltage below which the probe counts as shorted.
pub const SHORT_MV: f32 = 150.0;
/// Divider voltage above which the probe counts as open.
pub const OPEN_MV: f32 = 3_200.0;

/// Temperature reported while the probe is faulted (°C).
pub const FAULT_SENTINEL_C: f32 = 99.9;

/// Clamp a raw millivolt sample into the valid converter range.
pub fn clamp_mv(mv: f32) -> f32 {
    if mv.is_nan() {
        return MIN_MV;
    }
    mv.clamp(MIN_MV, MAX_MV)
}

/// Classify the divider voltage.
pub fn check(mv: f32) -> Result<(), SensorError> {
    if mv < SHORT_MV {
        Err(SensorError::ThermistorShort)
    } else if mv > OPEN_MV {
        Err(SensorError::ThermistorOpen)
    } else {
        Ok(())
    }
}

/// Convert a divider voltage to °C with the one-constant β equation.
///
/// The input is clamped first, so the result is always finite.
pub fn mv_to_celsius(mv: f32) -> f32 {
    let v = clamp_mv(mv) / 1000.0;
    let r_ntc = PULL_UP_OHMS * v / (V_SUPPLY - v);
    let inv_t = 1.0 / T0_K + (r_ntc / R25_OHMS).ln() / BETA;
    1.0 / inv_t - 273.15
}
