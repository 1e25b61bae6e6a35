//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to.  It holds the process state that survives power loss, the
//! latest sensor snapshot, the actuator outputs computed for this tick,
//! the fan start-delay bookkeeping and the accumulated fault flags.

use crate::config::DryerConfig;
use crate::control::ActuatorOutputs;
use crate::error::{FaultFlags, SensorError};

use super::StateId;

// ---------------------------------------------------------------------------
// Sensor snapshot (read-only to state handlers; written by sensor hub)
// ---------------------------------------------------------------------------

/// Filtered readings for one second tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct SensorSnapshot {
    /// Smoothed chamber temperature (°C); the control variable.
    pub measured_temperature_c: f32,
    /// EMA-filtered thermistor divider voltage (mV).
    pub ntc_mv: f32,
    /// Probe fault, if the divider voltage is out of range.
    pub thermistor_fault: Option<SensorError>,
    /// Ambient probe temperature (°C).
    pub secondary_temperature_c: f32,
    /// Ambient probe relative humidity (%).
    pub humidity_percent: f32,
    /// Fan current-sense reading (raw 12-bit ADC counts).
    pub fan_current_raw: u16,
    /// Hardware over-temperature thermostat line asserted.
    pub overheat: bool,
}

// ---------------------------------------------------------------------------
// Process state (persisted subset lives in PersistedState)
// ---------------------------------------------------------------------------

/// The dryer's long-lived process state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessState {
    pub dry_state: StateId,
    /// Drying time left; counts down once per minute in `Run`.
    pub remaining_minutes: u16,
    /// Cooling time left; counts down once per minute in `Cool`.
    pub cooling_minutes_remaining: u16,
    /// Operator setpoint (°C).
    pub set_temperature_c: u16,
    /// Damper follows the heater when set, otherwise stays open.
    pub auto_damper: bool,
    /// Software power-off: actuators off, sensing and faults still run.
    pub soft_off: bool,
}

impl ProcessState {
    pub fn persisted(&self) -> PersistedState {
        PersistedState {
            remaining_minutes: self.remaining_minutes,
            set_temperature_c: self.set_temperature_c,
            auto_damper: self.auto_damper,
            soft_off: self.soft_off,
            dry_state: self.dry_state,
        }
    }
}

impl From<PersistedState> for ProcessState {
    fn from(p: PersistedState) -> Self {
        Self {
            dry_state: p.dry_state,
            remaining_minutes: p.remaining_minutes,
            cooling_minutes_remaining: 0,
            set_temperature_c: p.set_temperature_c,
            auto_damper: p.auto_damper,
            soft_off: p.soft_off,
        }
    }
}

/// The fields written to non-volatile storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedState {
    pub remaining_minutes: u16,
    pub set_temperature_c: u16,
    pub auto_damper: bool,
    pub soft_off: bool,
    pub dry_state: StateId,
}

impl Default for PersistedState {
    /// First-boot values: stopped, powered off, 45 °C.
    fn default() -> Self {
        Self {
            remaining_minutes: 0,
            set_temperature_c: 45,
            auto_damper: false,
            soft_off: true,
            dry_state: StateId::Finish,
        }
    }
}

// ---------------------------------------------------------------------------
// FsmContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Process --
    pub process: ProcessState,
    /// Seconds left before the fan may start after boot.
    pub fan_delay_secs: u16,
    /// Fan start delay has elapsed (or was skipped).
    pub fan_released: bool,
    /// A handler changed persisted fields; the service saves after the tick.
    pub persist_requested: bool,

    // -- Sensor data --
    /// Latest sensor readings.  Updated before each FSM tick.
    pub sensors: SensorSnapshot,

    // -- Actuator outputs --
    /// Outputs computed for this tick, applied by the service.
    pub commands: ActuatorOutputs,

    // -- Configuration --
    pub config: DryerConfig,

    // -- Safety --
    /// Set by the safety supervisor, read by state handlers.
    pub fault_flags: FaultFlags,
    /// A stalled-fan retry window is open.
    pub fan_retry: bool,
}

impl FsmContext {
    /// Create a context for a cold boot from the persisted state.
    ///
    /// A persisted `Cool` is not resumed; the caller coerces it before
    /// building the context.
    pub fn new(config: DryerConfig, process: ProcessState) -> Self {
        Self {
            process,
            fan_delay_secs: config.fan_start_delay_secs,
            fan_released: false,
            persist_requested: false,
            sensors: SensorSnapshot::default(),
            commands: ActuatorOutputs::safe(process.auto_damper),
            config,
            fault_flags: FaultFlags::NONE,
            fan_retry: false,
        }
    }

    /// Returns `true` if **any** fault is active.
    pub fn has_faults(&self) -> bool {
        self.fault_flags.any()
    }

    pub fn request_persist(&mut self) {
        self.persist_requested = true;
    }

    /// Take and clear the persist request.
    pub fn take_persist_request(&mut self) -> bool {
        core::mem::take(&mut self.persist_requested)
    }
}
