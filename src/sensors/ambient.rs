//! Analog-output ambient temperature/humidity probe.
//!
//! Both channels are linear over 0..3.3 V.

const V_FULL_MV: f32 = 3_300.0;

pub const TEMP_MIN_C: f32 = -20.0;
pub const TEMP_MAX_C: f32 = 199.0;

/// Temperature channel: −66.875 °C at 0 V, +151.875 °C at full scale.
pub fn mv_to_celsius(mv: f32) -> f32 {
    let t = -66.875 + 218.75 * (mv / V_FULL_MV);
    if t.is_nan() {
        return TEMP_MIN_C;
    }
    t.clamp(TEMP_MIN_C, TEMP_MAX_C)
}

/// Humidity channel: −12.5 %RH at 0 V, 112.5 %RH at full scale.
pub fn mv_to_humidity(mv: f32) -> f32 {
    let rh = -12.5 + 125.0 * (mv / V_FULL_MV);
    if rh.is_nan() {
        return 0.0;
    }
    rh.clamp(0.0, 100.0)
}
