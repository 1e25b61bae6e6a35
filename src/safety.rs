//! Safety supervisor.
//!
//! The supervisor runs **every second tick before the FSM** and maintains
//! the fault register in `FsmContext.fault_flags`.  Any set bit makes
//! [`ActuatorControl`](crate::control::ActuatorControl) force heater and
//! fan off and the damper open.  The one exception is the fan retry: while
//! a stalled-fan fault is the only fault, every [`FAN_RETRY_SECS`] the
//! supervisor opens a window of `fan_stall_secs + 1` seconds in which the
//! fan alone may run, so a recovered fan can be observed.
//!
//! ## Fault lifecycle
//!
//! | Fault                 | Sets when                              | Clears when                  |
//! |-----------------------|----------------------------------------|------------------------------|
//! | thermistor short/open | divider voltage out of range           | voltage back in range        |
//! | overheat              | thermostat line asserted               | line released                |
//! | high temperature      | above limit for `high_temp_secs`       | back below the limit         |
//! | fan                   | `fan_stall_secs` low-current samples   | `fan_stall_secs` good samples in a retry, or [`reset_latched`] |
//! | heater 1/2, memory    | raised via [`raise`]                   | [`reset_latched`] only       |
//!
//! Every set/clear transition is logged exactly once.
//!
//! [`reset_latched`]: SafetySupervisor::reset_latched
//! [`raise`]: SafetySupervisor::raise

use crate::config::DryerConfig;
use crate::error::{Fault, FaultFlags, SensorError};
use crate::fsm::context::SensorSnapshot;
use log::{error, info, warn};

/// Seconds between fan retries while the fan fault is latched.
pub const FAN_RETRY_SECS: u16 = 30;

/// Safety supervisor.
pub struct SafetySupervisor {
    fan_current_threshold: u16,
    fan_stall_secs: u8,
    high_temp_limit_c: f32,
    high_temp_secs: u16,
    alert_interval_secs: u8,
    faults: FaultFlags,
    /// Consecutive low-current seconds while the fan runs.
    fan_low_count: u8,
    /// Consecutive good-current seconds during a fan retry.
    fan_good_count: u8,
    /// Seconds since the fan fault latched or the last retry ended.
    fan_retry_wait: u16,
    /// Seconds left in the current fan retry; zero when none is open.
    fan_retry_left: u8,
    /// Consecutive seconds above the high-temperature limit.
    high_temp_count: u16,
    /// Seconds since the last alert beep.
    alert_count: u8,
}

impl SafetySupervisor {
    pub fn new(config: &DryerConfig) -> Self {
        Self {
            fan_current_threshold: config.fan_current_threshold,
            fan_stall_secs: config.fan_stall_secs.max(1),
            high_temp_limit_c: config.high_temp_limit_c,
            high_temp_secs: config.high_temp_secs.max(1),
            alert_interval_secs: config.alert_interval_secs.max(1),
            faults: FaultFlags::NONE,
            fan_low_count: 0,
            fan_good_count: 0,
            fan_retry_wait: 0,
            fan_retry_left: 0,
            high_temp_count: 0,
            alert_count: 0,
        }
    }

    /// Evaluate all safety conditions against the latest sensor snapshot.
    ///
    /// `fan_running` is true when the fan is commanded on and its start
    /// delay has elapsed.  Returns the updated fault register.
    pub fn evaluate(&mut self, snap: &SensorSnapshot, fan_running: bool) -> FaultFlags {
        // ── Thermistor ────────────────────────────────────────────
        self.eval_fault(
            Fault::ThermistorShort,
            snap.thermistor_fault == Some(SensorError::ThermistorShort),
        );
        self.eval_fault(
            Fault::ThermistorOpen,
            snap.thermistor_fault == Some(SensorError::ThermistorOpen),
        );

        // ── Overheat thermostat ───────────────────────────────────
        self.eval_fault(Fault::Overheat, snap.overheat);

        // ── High temperature (only with a healthy probe) ─────────
        if snap.thermistor_fault.is_none() && snap.measured_temperature_c > self.high_temp_limit_c {
            self.high_temp_count = self.high_temp_count.saturating_add(1);
        } else {
            self.high_temp_count = 0;
        }
        self.eval_fault(Fault::HighTemp, self.high_temp_count >= self.high_temp_secs);

        // ── Fan current (latched, retried) ────────────────────────
        let fan_ok = snap.fan_current_raw >= self.fan_current_threshold;
        if self.faults.contains(Fault::Fan) {
            self.eval_fan_retry(fan_running, fan_ok);
        } else if fan_running && !fan_ok {
            self.fan_low_count = self.fan_low_count.saturating_add(1);
            if self.fan_low_count >= self.fan_stall_secs {
                self.raise(Fault::Fan);
                self.fan_retry_wait = 0;
            }
        } else {
            self.fan_low_count = 0;
        }

        if !self.faults.any() {
            self.alert_count = 0;
        }
        self.faults
    }

    /// Latch a fault raised outside the sensor path.
    pub fn raise(&mut self, fault: Fault) {
        if !self.faults.contains(fault) {
            error!("SAFETY FAULT SET: {fault}");
        }
        self.faults.set(fault);
    }

    /// Clear every latched fault (operator reset).  Self-clearing faults
    /// are left for the next evaluation.
    pub fn reset_latched(&mut self) {
        for fault in Fault::DISPLAY_PRIORITY {
            if fault.is_latched() && self.faults.contains(fault) {
                info!("SAFETY FAULT CLEARED: {fault} (reset)");
                self.faults.clear(fault);
            }
        }
        self.clear_fan_counters();
    }

    /// True while a fan retry window is open.
    pub fn fan_retry_active(&self) -> bool {
        self.fan_retry_left > 0
    }

    /// Call once per second tick; true when an alert beep is due.
    pub fn alert_due(&mut self) -> bool {
        if !self.faults.any() {
            return false;
        }
        self.alert_count += 1;
        if self.alert_count >= self.alert_interval_secs {
            self.alert_count = 0;
            true
        } else {
            false
        }
    }

    /// Current fault register.
    pub fn faults(&self) -> FaultFlags {
        self.faults
    }

    /// True if **any** fault is active.
    pub fn has_faults(&self) -> bool {
        self.faults.any()
    }

    // ── Internal ──────────────────────────────────────────────────

    /// Advance the retry cycle of a latched fan fault.  Clears the fault
    /// after `fan_stall_secs` consecutive good samples inside a window.
    fn eval_fan_retry(&mut self, fan_running: bool, fan_ok: bool) {
        if self.fan_retry_left == 0 {
            self.fan_retry_wait = self.fan_retry_wait.saturating_add(1);
            if self.fan_retry_wait >= FAN_RETRY_SECS {
                self.fan_retry_wait = 0;
                self.fan_good_count = 0;
                self.fan_retry_left = self.fan_stall_secs.saturating_add(1);
                info!("SAFETY: retrying stalled fan");
            }
            return;
        }

        self.fan_retry_left -= 1;
        if fan_running && fan_ok {
            self.fan_good_count = self.fan_good_count.saturating_add(1);
            if self.fan_good_count >= self.fan_stall_secs {
                info!("SAFETY FAULT CLEARED: {} (current restored)", Fault::Fan);
                self.faults.clear(Fault::Fan);
                self.clear_fan_counters();
            }
        } else {
            self.fan_good_count = 0;
            if self.fan_retry_left == 0 {
                warn!("SAFETY: fan retry failed");
            }
        }
    }

    fn clear_fan_counters(&mut self) {
        self.fan_low_count = 0;
        self.fan_good_count = 0;
        self.fan_retry_wait = 0;
        self.fan_retry_left = 0;
    }

    /// Set or clear a self-clearing fault bit based on a condition.
    fn eval_fault(&mut self, fault: Fault, condition: bool) {
        if condition {
            if !self.faults.contains(fault) {
                error!("SAFETY FAULT SET: {fault}");
            }
            self.faults.set(fault);
        } else {
            if self.faults.contains(fault) {
                info!("SAFETY FAULT CLEARED: {fault}");
            }
            self.faults.clear(fault);
        }
    }
}
