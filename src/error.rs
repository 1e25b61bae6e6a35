//! Unified error and fault types for the dryer firmware.
//!
//! Every fallible operation funnels into [`Error`].  Fault conditions that
//! the controller must *display and act on* (rather than return) live in
//! [`FaultFlags`], a bitmask with one named bit per [`Fault`].

use core::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Top-level firmware error; the per-area errors lift into it with `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read or returned out-of-range data.
    Sensor(SensorError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// Process state could not be loaded or saved.
    Persist(PersistError),
    /// The uplink collaborator rejected or dropped a message.
    Comms(CommsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Persist(e) => write!(f, "persist: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error.
    AdcReadFailed,
    /// Thermistor divider voltage below the short threshold.
    ThermistorShort,
    /// Thermistor divider voltage above the open threshold.
    ThermistorOpen,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::ThermistorShort => write!(f, "thermistor short"),
            Self::ThermistorOpen => write!(f, "thermistor open"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed.
    GpioWriteFailed,
    /// Front-panel bus transaction failed.
    PanelBus,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::PanelBus => write!(f, "panel bus error"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Persistence errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistError {
    /// Backing store unavailable or write failed.
    Unavailable,
    /// Stored value had the wrong size or an out-of-range discriminant.
    Corrupted,
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "store unavailable"),
            Self::Corrupted => write!(f, "stored value corrupted"),
        }
    }
}

impl From<PersistError> for Error {
    fn from(e: PersistError) -> Self {
        Self::Persist(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// Transport not connected.
    NotConnected,
    /// Publish or upload was rejected by the remote end.
    Rejected,
    /// Outbound queue full, message dropped.
    QueueFull,
    /// Inbound payload could not be parsed.
    Malformed,
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected"),
            Self::Rejected => write!(f, "rejected by remote"),
            Self::QueueFull => write!(f, "queue full"),
            Self::Malformed => write!(f, "malformed payload"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Process faults
// ---------------------------------------------------------------------------

/// Named fault bits.  Any set bit forces heater and fan off and the
/// damper open until it clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Fault {
    /// Thermistor divider shorted (voltage too low).
    ThermistorShort = 0b0000_0001,
    /// Thermistor divider open (voltage too high).
    ThermistorOpen = 0b0000_0010,
    /// Hardware over-temperature thermostat line asserted.
    Overheat = 0b0000_0100,
    /// Fan commanded on but current sense stayed low.
    Fan = 0b0000_1000,
    /// Heater bank 1 failure.
    Heater1 = 0b0001_0000,
    /// Heater bank 2 failure.
    Heater2 = 0b0010_0000,
    /// Chamber temperature above the high limit for too long.
    HighTemp = 0b0100_0000,
    /// Non-volatile memory failure.
    Memory = 0b1000_0000,
}

impl Fault {
    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }

    /// Faults in display-priority order, highest first.
    pub const DISPLAY_PRIORITY: [Fault; 8] = [
        Fault::Fan,
        Fault::Heater1,
        Fault::Heater2,
        Fault::ThermistorOpen,
        Fault::ThermistorShort,
        Fault::Overheat,
        Fault::HighTemp,
        Fault::Memory,
    ];

    /// Two-character panel code.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Fan => "E1",
            Self::Heater1 | Self::Heater2 => "E2",
            Self::ThermistorOpen => "E3",
            Self::ThermistorShort => "E4",
            Self::Overheat => "E5",
            Self::HighTemp => "HI",
            Self::Memory => "E7",
        }
    }

    /// Latched faults stay set until an explicit reset.
    pub const fn is_latched(self) -> bool {
        matches!(
            self,
            Self::Fan | Self::Heater1 | Self::Heater2 | Self::Memory
        )
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThermistorShort => write!(f, "thermistor short"),
            Self::ThermistorOpen => write!(f, "thermistor open"),
            Self::Overheat => write!(f, "overheat thermostat"),
            Self::Fan => write!(f, "fan stall"),
            Self::Heater1 => write!(f, "heater 1"),
            Self::Heater2 => write!(f, "heater 2"),
            Self::HighTemp => write!(f, "high temperature"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

/// Error register: one bit per [`Fault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaultFlags(u8);

impl FaultFlags {
    pub const NONE: Self = Self(0);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn any(self) -> bool {
        self.0 != 0
    }

    pub const fn contains(self, fault: Fault) -> bool {
        self.0 & fault.mask() != 0
    }

    pub fn set(&mut self, fault: Fault) {
        self.0 |= fault.mask();
    }

    pub fn clear(&mut self, fault: Fault) {
        self.0 &= !fault.mask();
    }

    /// Highest-priority active fault, if any.
    pub fn highest(self) -> Option<Fault> {
        Fault::DISPLAY_PRIORITY
            .into_iter()
            .find(|f| self.contains(*f))
    }
}

impl fmt::Display for FaultFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0b{:08b}", self.0)
    }
}
