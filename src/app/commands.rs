//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (the uplink
//! command topic) that the [`AppService`](super::service::AppService)
//! applies exactly as the matching key press would.
//!
//! Wire form: `{"cmd":"set_temperature","value":55}`.

use serde::{Deserialize, Serialize};

use crate::error::CommsError;

/// Largest inbound command payload accepted.
pub const MAX_COMMAND_LEN: usize = 128;

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", content = "value", rename_all = "snake_case")]
pub enum DryerCommand {
    /// Clear soft-off.
    PowerOn,
    /// Set soft-off; a running cycle finishes without cooling.
    PowerOff,
    /// New setpoint (°C), clamped to the configured maximum.
    SetTemperature(u16),
    /// New remaining time (minutes), clamped to the configured maximum.
    SetRemainingMinutes(u16),
    /// Accepted for protocol compatibility; this machine has no defrost cycle.
    ForceDefrost,
    /// Clear latched faults.
    Reset,
}

/// Parse one inbound payload.
pub fn parse(payload: &[u8]) -> Result<DryerCommand, CommsError> {
    if payload.len() > MAX_COMMAND_LEN {
        return Err(CommsError::Malformed);
    }
    serde_json::from_slice(payload).map_err(|_| CommsError::Malformed)
}
