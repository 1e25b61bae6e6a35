//! Uplink inter-task channels.
//!
//! `embassy-sync` bounded channels bridge the async I/O thread with the
//! synchronous control loop without heap allocation.
//!
//! ```text
//! ┌──────────────┐  Frame / UploadRecord ┌──────────────┐
//! │ Control Loop │──────────────────────▶│   I/O Task   │
//! │  (sync)      │◀──────────────────────│  (async)     │
//! └──────────────┘      DryerCommand     └──────────────┘
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use super::codec::Frame;
use crate::app::commands::DryerCommand;
use crate::app::events::UploadRecord;

/// Outbound telemetry and event frames.
pub const FRAME_DEPTH: usize = 8;

/// Pending bulk-upload records.
pub const UPLOAD_DEPTH: usize = 10;

/// Inbound commands.
pub const CMD_DEPTH: usize = 8;

/// Encoded frames: control loop → I/O task.
pub static FRAME_CHANNEL: Channel<CriticalSectionRawMutex, Frame, FRAME_DEPTH> = Channel::new();

/// Upload records: control loop → I/O task.
pub static UPLOAD_CHANNEL: Channel<CriticalSectionRawMutex, UploadRecord, UPLOAD_DEPTH> =
    Channel::new();

/// Parsed commands: I/O task → control loop.
pub static CMD_CHANNEL: Channel<CriticalSectionRawMutex, DryerCommand, CMD_DEPTH> = Channel::new();

/// Unit tests touching the shared frame queue take this first.
#[cfg(test)]
pub(crate) static FRAME_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
