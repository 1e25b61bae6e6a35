//! GPIO / peripheral pin assignments for the dryer main board (ESP32).
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Digital inputs
// ---------------------------------------------------------------------------

/// Front-panel rocker switch. LOW = on, HIGH = soft-off.
pub const POWER_SWITCH_GPIO: i32 = 21;
/// AC zero-cross detector, two edges per mains cycle.
pub const ZERO_CROSS_GPIO: i32 = 23;
/// Bimetal over-temperature thermostat. HIGH = overheated.
pub const OVERHEAT_GPIO: i32 = 26;

// ---------------------------------------------------------------------------
// Relay / digital outputs (active HIGH)
// ---------------------------------------------------------------------------

pub const FAN_GPIO: i32 = 18;
pub const HEATER_GPIO: i32 = 5;
pub const AUX0_GPIO: i32 = 17;
pub const AUX1_GPIO: i32 = 16;
pub const AUX2_GPIO: i32 = 4;
/// Damper motor. HIGH = closed, LOW = open.
pub const DAMPER_GPIO: i32 = 19;
pub const BUZZER_GPIO: i32 = 22;

// ---------------------------------------------------------------------------
// Analog inputs (ADC1, 12-bit, 0–3.3 V)
// ---------------------------------------------------------------------------

/// Main chamber NTC on GPIO36.
pub const ADC1_CH_NTC_MAIN: u32 = 0;
/// Fan current-sense shunt amplifier on GPIO39.
pub const ADC1_CH_FAN_CURRENT: u32 = 3;
/// SHT3x-ARP analog temperature output on GPIO34.
pub const ADC1_CH_AMBIENT_TEMP: u32 = 6;
/// SHT3x-ARP analog humidity output on GPIO35.
pub const ADC1_CH_AMBIENT_RH: u32 = 7;

// ---------------------------------------------------------------------------
// TM1638 front panel
// ---------------------------------------------------------------------------
//
// STB = GPIO27, CLK = GPIO14, DIO = GPIO15.  The driver takes typed
// `esp-idf-hal` pins, so `main` moves them out of `Peripherals` by name.
