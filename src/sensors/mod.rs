//! Sensor subsystem: analog channels, filtering and the aggregating
//! [`SensorHub`].
//!
//! The hub is fed twice: [`SensorHub::sample_fast`] on every control-loop
//! pass updates the thermistor voltage EMA, and [`SensorHub::read_all`]
//! on every second tick converts and averages it into a
//! [`SensorSnapshot`] for `FsmContext.sensors`.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads ADC1 through hw_init and the thermostat line by GPIO.
//! On host/test: reads static atomics set through the `sim_set_*` hooks.

pub mod ambient;
pub mod filter;
pub mod thermistor;

use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use log::{info, warn};

use crate::error::SensorError;
use crate::fsm::context::SensorSnapshot;
use filter::{ExpFilter, SlewLimitedAverage};

// ── Simulation inputs ─────────────────────────────────────────

static SIM_NTC_MV: AtomicU16 = AtomicU16::new(1_650);
static SIM_AMBIENT_T_MV: AtomicU16 = AtomicU16::new(1_000);
static SIM_AMBIENT_RH_MV: AtomicU16 = AtomicU16::new(1_650);
static SIM_FAN_COUNTS: AtomicU16 = AtomicU16::new(600);
static SIM_OVERHEAT: AtomicBool = AtomicBool::new(false);

pub fn sim_set_ntc_mv(mv: u16) {
    SIM_NTC_MV.store(mv, Ordering::Relaxed);
}

pub fn sim_set_ambient_mv(temp_mv: u16, rh_mv: u16) {
    SIM_AMBIENT_T_MV.store(temp_mv, Ordering::Relaxed);
    SIM_AMBIENT_RH_MV.store(rh_mv, Ordering::Relaxed);
}

/// Fan current sense in raw ADC counts.
pub fn sim_set_fan_current_counts(counts: u16) {
    SIM_FAN_COUNTS.store(counts, Ordering::Relaxed);
}

pub fn sim_set_overheat(asserted: bool) {
    SIM_OVERHEAT.store(asserted, Ordering::Relaxed);
}

// ── Raw channel access ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    Ntc,
    AmbientTemp,
    AmbientRh,
}

/// A failed conversion reads as 0 mV: the thermistor then classifies as
/// shorted and the outputs go safe.
#[cfg(target_os = "espidf")]
fn read_mv(ch: Channel) -> u16 {
    use crate::drivers::hw_init;
    use crate::pins;
    let adc = match ch {
        Channel::Ntc => pins::ADC1_CH_NTC_MAIN,
        Channel::AmbientTemp => pins::ADC1_CH_AMBIENT_TEMP,
        Channel::AmbientRh => pins::ADC1_CH_AMBIENT_RH,
    };
    hw_init::adc1_read(adc).map_or_else(
        |e| {
            log::debug!("sensors: {ch:?}: {e}");
            0
        },
        hw_init::counts_to_mv,
    )
}

#[cfg(not(target_os = "espidf"))]
fn read_mv(ch: Channel) -> u16 {
    let src = match ch {
        Channel::Ntc => &SIM_NTC_MV,
        Channel::AmbientTemp => &SIM_AMBIENT_T_MV,
        Channel::AmbientRh => &SIM_AMBIENT_RH_MV,
    };
    src.load(Ordering::Relaxed)
}

/// Fan current sense, raw counts.  A failed read counts as a stalled fan.
#[cfg(target_os = "espidf")]
fn read_fan_counts() -> u16 {
    use crate::drivers::hw_init;
    hw_init::adc1_read(crate::pins::ADC1_CH_FAN_CURRENT).unwrap_or_else(|e| {
        log::debug!("sensors: fan current: {e}");
        0
    })
}

#[cfg(not(target_os = "espidf"))]
fn read_fan_counts() -> u16 {
    SIM_FAN_COUNTS.load(Ordering::Relaxed)
}

/// Thermostat line: HIGH = overheated.
#[cfg(target_os = "espidf")]
fn read_overheat() -> bool {
    crate::drivers::hw_init::gpio_read(crate::pins::OVERHEAT_GPIO)
}

#[cfg(not(target_os = "espidf"))]
fn read_overheat() -> bool {
    SIM_OVERHEAT.load(Ordering::Relaxed)
}

// ── Hub ───────────────────────────────────────────────────────

/// Aggregates all analog channels and produces a unified snapshot.
pub struct SensorHub {
    ntc_ema: ExpFilter,
    temperature: SlewLimitedAverage,
    /// Classification of the latest raw thermistor sample.
    probe_fault: Option<SensorError>,
    last_raw_mv: f32,
    /// Last reported probe fault, for edge logging.
    logged_fault: Option<SensorError>,
}

impl Default for SensorHub {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorHub {
    pub fn new() -> Self {
        Self {
            ntc_ema: ExpFilter::default(),
            temperature: SlewLimitedAverage::default(),
            probe_fault: None,
            last_raw_mv: thermistor::MIN_MV,
            logged_fault: None,
        }
    }

    /// Classify one raw thermistor sample and feed it to the voltage EMA.
    pub fn sample_fast(&mut self) {
        let mv = thermistor::clamp_mv(f32::from(read_mv(Channel::Ntc)));
        self.feed_ntc(mv);
    }

    /// Read every channel and return a unified snapshot.
    ///
    /// Takes a fresh thermistor sample first, so a probe that shorted or
    /// opened since the last pass is flagged on this tick.
    pub fn read_all(&mut self) -> SensorSnapshot {
        self.sample_fast();
        let (measured, fault) = self.convert_primary();

        SensorSnapshot {
            measured_temperature_c: measured,
            ntc_mv: self.ntc_ema.value().unwrap_or(self.last_raw_mv),
            thermistor_fault: fault,
            secondary_temperature_c: ambient::mv_to_celsius(f32::from(read_mv(Channel::AmbientTemp))),
            humidity_percent: ambient::mv_to_humidity(f32::from(read_mv(Channel::AmbientRh))),
            fan_current_raw: read_fan_counts(),
            overheat: read_overheat(),
        }
    }

    /// Out-of-range samples never reach the EMA; they reset it so the
    /// first good sample after recovery seeds it again.
    fn feed_ntc(&mut self, mv: f32) {
        self.last_raw_mv = mv;
        match thermistor::check(mv) {
            Ok(()) => {
                self.ntc_ema.update(mv);
                self.probe_fault = None;
            }
            Err(e) => {
                self.ntc_ema.reset();
                self.probe_fault = Some(e);
            }
        }
    }

    fn convert_primary(&mut self) -> (f32, Option<SensorError>) {
        let fault = self.probe_fault;
        if fault != self.logged_fault {
            let mv = self.last_raw_mv;
            match fault {
                Some(e) => warn!("sensors: {e} ({mv:.0} mV)"),
                None => info!("sensors: thermistor back in range ({mv:.0} mV)"),
            }
            self.logged_fault = fault;
        }

        let Some(ntc_mv) = self.ntc_ema.value().filter(|_| fault.is_none()) else {
            self.temperature.reset();
            return (thermistor::FAULT_SENTINEL_C, fault);
        };

        let celsius = thermistor::mv_to_celsius(ntc_mv);
        (self.temperature.update(celsius), None)
    }
}
