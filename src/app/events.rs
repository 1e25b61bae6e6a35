//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them: log to serial, queue for the
//! uplink, etc.

use serde::Serialize;

use crate::error::FaultFlags;
use crate::fsm::StateId;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Periodic telemetry snapshot.
    Telemetry(TelemetryData),

    /// The process moved between states.
    StateChanged { from: StateId, to: StateId },

    /// The error register changed.  `changed` holds the toggled bits.
    FaultsChanged { changed: FaultFlags, current: FaultFlags },

    /// The application service has started (carries initial state).
    Started(StateId),
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TelemetryData {
    pub state: &'static str,
    pub soft_off: bool,
    pub temperature_c: f32,
    pub secondary_temperature_c: f32,
    pub humidity_percent: f32,
    pub fan_current_raw: u16,
    pub relay_bits: u8,
    pub led_bits: u8,
    pub fault_flags: FaultFlags,
    pub set_temperature_c: u16,
    pub remaining_minutes: u16,
}

/// One bulk-upload sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadRecord {
    /// Measured chamber temperature, whole °C.
    pub measure_value: i16,
    /// True when no drying cycle is running.
    pub departure: bool,
}
