//! System configuration parameters
//!
//! All tunable parameters for the dryer controller.
//! Values can be overridden via NVS (stored as a postcard blob).

use serde::{Deserialize, Serialize};

/// Fixed-capacity identifier string used by the upload collaborator.
pub type IdString = heapless::String<24>;

/// Which interrupt source drives the one-second tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeBaseMode {
    /// Periodic 1 s hardware timer.
    Timer,
    /// AC zero-cross pulses; `edges_per_second` is twice the line frequency.
    ZeroCross { edges_per_second: u16 },
}

/// Identifiers attached to every bulk upload record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadIdentity {
    pub product_id: IdString,
    pub partner_id: IdString,
    pub machine_id: IdString,
    pub record_id: IdString,
}

/// Core dryer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DryerConfig {
    // --- Heater ---
    /// Hysteresis half-band around the setpoint (°C)
    pub hysteresis_c: f32,
    /// Upper bound for the operator setpoint (°C)
    pub max_set_temperature_c: u16,

    // --- Process ---
    /// Cooling phase length after the run timer expires (minutes)
    pub cooling_minutes: u16,
    /// Delay before the fan energises after boot into RUN (seconds)
    pub fan_start_delay_secs: u16,
    /// Boot banner window; control is held off while it runs (seconds)
    pub boot_banner_secs: u16,
    /// Upper bound for the remaining-time setting (minutes)
    pub max_remaining_minutes: u16,
    /// TIME key step (minutes)
    pub time_step_minutes: u16,

    // --- Safety ---
    /// Fan current-sense threshold in raw 12-bit ADC counts; lower readings
    /// while the fan runs count as stalled
    pub fan_current_threshold: u16,
    /// Consecutive low-current seconds before the fan fault latches
    pub fan_stall_secs: u8,
    /// Chamber temperature that starts the high-temperature timer (°C)
    pub high_temp_limit_c: f32,
    /// Seconds above the high limit before the fault latches
    pub high_temp_secs: u16,
    /// Seconds between alert beeps while any fault is active
    pub alert_interval_secs: u8,

    // --- Front panel ---
    /// Settle delay between the last settings edit and the save (ms)
    pub persist_settle_ms: u32,
    /// Keypad scan period (ms)
    pub key_poll_ms: u32,
    /// Display refresh period (ms)
    pub display_refresh_ms: u32,
    /// TM1638 brightness (0-7)
    pub brightness: u8,

    // --- Timing ---
    /// Tick source
    pub timebase: TimeBaseMode,
    /// Telemetry report interval (seconds)
    pub telemetry_interval_secs: u32,
    /// Bulk upload interval (seconds)
    pub upload_interval_secs: u32,

    // --- Uplink ---
    pub upload: UploadIdentity,
}

impl Default for DryerConfig {
    fn default() -> Self {
        Self {
            // Heater
            hysteresis_c: 1.0,
            max_set_temperature_c: 70,

            // Process
            cooling_minutes: 5,
            fan_start_delay_secs: 2,
            boot_banner_secs: 3,
            max_remaining_minutes: 12_000,
            time_step_minutes: 30,

            // Safety
            fan_current_threshold: 100,
            fan_stall_secs: 3,
            high_temp_limit_c: 95.0,
            high_temp_secs: 60,
            alert_interval_secs: 1,

            // Front panel
            persist_settle_ms: 3_000,
            key_poll_ms: 50,
            display_refresh_ms: 100,
            brightness: 7,

            // Timing
            timebase: TimeBaseMode::Timer,
            telemetry_interval_secs: 60,  // 1/min
            upload_interval_secs: 300,    // 5 min

            upload: UploadIdentity::default(),
        }
    }
}
