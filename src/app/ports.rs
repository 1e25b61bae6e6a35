//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (sensors, actuators, panel, event sinks, storage,
//! uplink) implement these traits.  The
//! [`AppService`](super::service::AppService) consumes them via generics,
//! so the domain core never touches hardware directly.
//!
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed; callers must handle every variant explicitly.

use crate::config::DryerConfig;
use crate::control::ActuatorOutputs;
use crate::display::SegmentBuffer;
use crate::error::{ActuatorError, CommsError, PersistError};
use crate::fsm::context::{PersistedState, SensorSnapshot};

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the domain calls this to obtain sensor data.
pub trait SensorPort {
    /// Feed one raw thermistor sample into the fast filter.  Called on
    /// every control-loop pass.
    fn sample_fast(&mut self);

    /// Convert and average every channel.  Called once per second tick.
    fn read_all(&mut self) -> SensorSnapshot;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command actuators.
pub trait ActuatorPort {
    /// Drive heater, fan and damper to `out`.
    fn apply(&mut self, out: &ActuatorOutputs);

    /// One 50 ms buzzer pulse.
    fn beep(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Panel port (driven adapter: domain ↔ display/keypad module)
// ───────────────────────────────────────────────────────────────

/// Front-panel module plus the power switch line.
pub trait PanelPort {
    /// Raw 32-bit key-scan vector.
    fn read_keys(&mut self) -> Result<u32, ActuatorError>;

    /// Transpose and write a logical segment buffer.
    fn show(&mut self, seg: &SegmentBuffer) -> Result<(), ActuatorError>;

    /// Power switch line level.  HIGH means off.
    fn power_switch_high(&mut self) -> bool;

    /// Key confirmation pulse.
    fn beep(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, uplink
/// queue, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Process store (driven adapter: domain ↔ NVS)
// ───────────────────────────────────────────────────────────────

/// Load/save of the power-loss-surviving process fields.
pub trait ProcessStore {
    /// `Ok(None)` on first boot.
    fn load(&self) -> Result<Option<PersistedState>, PersistError>;

    /// Synchronous write-through.
    fn save(&mut self, state: &PersistedState) -> Result<(), PersistError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`DryerConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<DryerConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &DryerConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Uplink seams (external collaborators)
// ───────────────────────────────────────────────────────────────

/// Telemetry/event publisher plus the inbound command topic (MQTT on
/// the product).
pub trait UplinkTransport {
    fn publish(&mut self, frame: &str) -> Result<(), CommsError>;

    /// Copy one pending inbound payload into `buf`.  `Ok(0)` when idle.
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, CommsError>;
}

/// Bulk record upload (HTTP form POST on the product).
pub trait UploadPort {
    fn upload(&mut self, form_body: &str) -> Result<(), CommsError>;
}

// ───────────────────────────────────────────────────────────────
// Scheduler delegate (decouples scheduler from the uplink queues)
// ───────────────────────────────────────────────────────────────

/// Callback trait that the scheduler invokes when a schedule fires.
///
/// The control loop implements this by building a telemetry frame or an
/// upload record; the scheduler itself knows nothing about either.
pub trait SchedulerDelegate {
    /// * `label`: the human-readable label of the schedule that fired.
    /// * `kind` : whether it was a periodic or one-shot fire.
    fn on_schedule_fired(&mut self, label: &str, kind: ScheduleFiredKind);
}

/// Discriminant passed to [`SchedulerDelegate::on_schedule_fired`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleFiredKind {
    /// A recurring periodic schedule fired.
    Periodic,
    /// A one-shot schedule fired (auto-disables after).
    OneShot,
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
