//! Mock adapters for integration tests.
//!
//! Records every actuator and panel call so tests can assert on the full
//! command history without touching real GPIO or relays.

use dryerctl::app::events::AppEvent;
use dryerctl::app::ports::{
    ActuatorPort, ConfigError, ConfigPort, EventSink, PanelPort, ProcessStore, SensorPort,
};
use dryerctl::config::DryerConfig;
use dryerctl::control::ActuatorOutputs;
use dryerctl::display::SegmentBuffer;
use dryerctl::error::{ActuatorError, PersistError};
use dryerctl::fsm::context::{PersistedState, SensorSnapshot};
use std::collections::VecDeque;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ActuatorCall {
    Apply(ActuatorOutputs),
    Beep,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<ActuatorCall>,
    /// Returned from every `read_all`.
    pub snapshot: SensorSnapshot,
    pub fast_samples: u32,
}

#[allow(dead_code)]
impl MockHardware {
    /// Healthy probe at `temp_c`, fan current well above threshold.
    pub fn at(temp_c: f32) -> Self {
        Self {
            calls: Vec::new(),
            snapshot: SensorSnapshot {
                measured_temperature_c: temp_c,
                ntc_mv: 1_650.0,
                thermistor_fault: None,
                secondary_temperature_c: 22.0,
                humidity_percent: 40.0,
                fan_current_raw: 800,
                overheat: false,
            },
            fast_samples: 0,
        }
    }

    pub fn last_outputs(&self) -> Option<ActuatorOutputs> {
        self.calls.iter().rev().find_map(|c| match c {
            ActuatorCall::Apply(out) => Some(*out),
            _ => None,
        })
    }

    pub fn heater_on(&self) -> bool {
        self.last_outputs().is_some_and(|o| o.heater)
    }

    pub fn fan_on(&self) -> bool {
        self.last_outputs().is_some_and(|o| o.fan)
    }

    pub fn beeps(&self) -> usize {
        self.calls.iter().filter(|c| **c == ActuatorCall::Beep).count()
    }
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::at(25.0)
    }
}

impl SensorPort for MockHardware {
    fn sample_fast(&mut self) {
        self.fast_samples += 1;
    }

    fn read_all(&mut self) -> SensorSnapshot {
        self.snapshot
    }
}

impl ActuatorPort for MockHardware {
    fn apply(&mut self, out: &ActuatorOutputs) {
        self.calls.push(ActuatorCall::Apply(*out));
    }

    fn beep(&mut self) {
        self.calls.push(ActuatorCall::Beep);
    }
}

// ── MockNvs ───────────────────────────────────────────────────

pub struct MockNvs {
    pub process: Option<PersistedState>,
    pub saves: Vec<PersistedState>,
    pub fail: bool,
}

#[allow(dead_code)]
impl MockNvs {
    pub fn new() -> Self {
        Self {
            process: None,
            saves: Vec::new(),
            fail: false,
        }
    }

    pub fn with_process(state: PersistedState) -> Self {
        Self {
            process: Some(state),
            ..Self::new()
        }
    }

    pub fn last_saved(&self) -> Option<PersistedState> {
        self.saves.last().copied()
    }
}

impl Default for MockNvs {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigPort for MockNvs {
    fn load(&self) -> Result<DryerConfig, ConfigError> {
        Ok(DryerConfig::default())
    }

    fn save(&self, _config: &DryerConfig) -> Result<(), ConfigError> {
        Ok(())
    }
}

impl ProcessStore for MockNvs {
    fn load(&self) -> Result<Option<PersistedState>, PersistError> {
        Ok(self.process)
    }

    fn save(&mut self, state: &PersistedState) -> Result<(), PersistError> {
        if self.fail {
            return Err(PersistError::Unavailable);
        }
        self.process = Some(*state);
        self.saves.push(*state);
        Ok(())
    }
}

// ── MockPanel ─────────────────────────────────────────────────

pub struct MockPanel {
    /// Scan vectors returned by successive `read_keys`; idle when empty.
    pub scans: VecDeque<u32>,
    /// Power switch level.  HIGH means off.
    pub power_high: bool,
    pub shown: Vec<SegmentBuffer>,
    pub beeps: usize,
    pub bus_fault: bool,
}

#[allow(dead_code)]
impl MockPanel {
    /// Power switch on (line low), no keys held.
    pub fn switched_on() -> Self {
        Self {
            scans: VecDeque::new(),
            power_high: false,
            shown: Vec::new(),
            beeps: 0,
            bus_fault: false,
        }
    }

    pub fn press(&mut self, scan: u32) {
        self.scans.push_back(scan);
    }
}

impl PanelPort for MockPanel {
    fn read_keys(&mut self) -> Result<u32, ActuatorError> {
        if self.bus_fault {
            return Err(ActuatorError::PanelBus);
        }
        Ok(self.scans.pop_front().unwrap_or(0))
    }

    fn show(&mut self, seg: &SegmentBuffer) -> Result<(), ActuatorError> {
        if self.bus_fault {
            return Err(ActuatorError::PanelBus);
        }
        self.shown.push(*seg);
        Ok(())
    }

    fn power_switch_high(&mut self) -> bool {
        self.power_high
    }

    fn beep(&mut self) {
        self.beeps += 1;
    }
}

// ── LogSink ───────────────────────────────────────────────────

pub struct LogSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl LogSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn state_changes(&self) -> Vec<(dryerctl::fsm::StateId, dryerctl::fsm::StateId)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::StateChanged { from, to } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for LogSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}
