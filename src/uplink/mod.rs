//! Uplink: telemetry frames, fault events, bulk upload and inbound
//! commands.
//!
//! The control loop never talks to the network.  It queues frames and
//! upload records into static channels ([`channels`]), and the I/O
//! thread ([`io_task`]) drains them into the
//! [`UplinkTransport`](crate::app::ports::UplinkTransport) and
//! [`UploadPort`](crate::app::ports::UploadPort) seams.  Inbound command
//! payloads travel the other way through the same mechanism.

pub mod channels;
pub mod codec;
pub mod io_task;
