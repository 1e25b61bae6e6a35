//! Async uplink I/O task.
//!
//! Runs in a dedicated thread using `edge-executor` for cooperative
//! scheduling and `async-io-mini` for reactor-driven timers.  Three
//! concurrent futures:
//!
//! 1. **Publish**: wakes on `FRAME_CHANNEL.receive().await`
//! 2. **Upload**: wakes on `UPLOAD_CHANNEL.receive().await`, backs off
//!    after a failed post
//! 3. **Commands**: polls the transport's inbound topic every 50ms
//!
//! ```text
//!  ┌──────────────────────────────────────────────────────────┐
//!  │  I/O Thread                                              │
//!  │  ┌────────────────────────────────────────────────────┐  │
//!  │  │  edge_executor::LocalExecutor                      │  │
//!  │  │  ┌───────────┐  ┌─────────────┐  ┌──────────────┐  │  │
//!  │  │  │ Publish   │  │ Upload      │  │ Commands     │  │  │
//!  │  │  │ wake-on-rx│  │ wake-on-rx  │  │ 50ms ⏱       │  │  │
//!  │  │  └───────────┘  └─────────────┘  └──────────────┘  │  │
//!  │  └────────────────────────────────────────────────────┘  │
//!  └──────────────────────────────────────────────────────────┘
//! ```

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;

use log::{debug, info, warn};

use super::channels::{CMD_CHANNEL, FRAME_CHANNEL, UPLOAD_CHANNEL};
use super::codec::{Frame, form_body};
use crate::app::commands::{self, DryerCommand, MAX_COMMAND_LEN};
use crate::app::events::UploadRecord;
use crate::app::ports::{UplinkTransport, UploadPort};
use crate::config::UploadIdentity;
use crate::error::CommsError;

const COMMAND_POLL_MS: u64 = 50;
const UPLOAD_BACKOFF_MS: u64 = 5_000;

type SharedTransport<T> = Rc<RefCell<T>>;

// ── Control-loop side ────────────────────────────────────────

/// Queue an encoded frame for publication.  Drops it when full.
pub fn queue_frame(frame: Frame) -> Result<(), CommsError> {
    FRAME_CHANNEL.try_send(frame).map_err(|_| {
        warn!("UPLINK: frame queue full, dropping frame");
        CommsError::QueueFull
    })
}

/// Queue one upload record.  Drops it when full.
pub fn queue_upload(record: UploadRecord) -> Result<(), CommsError> {
    UPLOAD_CHANNEL.try_send(record).map_err(|_| {
        warn!(
            "UPLINK: upload queue full, dropping record (value={})",
            record.measure_value
        );
        CommsError::QueueFull
    })
}

/// Next inbound command, if any.
pub fn try_recv_command() -> Option<DryerCommand> {
    CMD_CHANNEL.try_receive().ok()
}

// ── I/O side ─────────────────────────────────────────────────

/// Parse one inbound payload and hand it to the control loop.
fn dispatch_inbound(payload: &[u8]) {
    match commands::parse(payload) {
        Ok(cmd) => {
            debug!("UPLINK: command {:?}", cmd);
            if CMD_CHANNEL.try_send(cmd).is_err() {
                warn!("UPLINK: command channel full, dropping {:?}", cmd);
            }
        }
        Err(e) => warn!("UPLINK: rejected inbound payload: {}", e),
    }
}

async fn publish_next<T: UplinkTransport>(transport: &SharedTransport<T>) {
    let frame = FRAME_CHANNEL.receive().await;
    match transport.borrow_mut().publish(&frame) {
        Ok(()) => debug!("UPLINK: published {} bytes", frame.len()),
        Err(e) => warn!("UPLINK: publish failed: {}", e),
    }
}

async fn upload_next<U: UploadPort>(port: &mut U, identity: &UploadIdentity) -> bool {
    let record = UPLOAD_CHANNEL.receive().await;
    let body = match form_body(identity, &record) {
        Ok(b) => b,
        Err(e) => {
            warn!("UPLINK: upload record not encodable: {}", e);
            return true;
        }
    };
    match port.upload(&body) {
        Ok(()) => {
            info!("UPLINK: uploaded value={}", record.measure_value);
            true
        }
        Err(e) => {
            warn!("UPLINK: upload failed: {}", e);
            false
        }
    }
}

fn poll_commands<T: UplinkTransport>(transport: &SharedTransport<T>, buf: &mut [u8]) {
    let mut t = transport.borrow_mut();
    loop {
        match t.receive(buf) {
            Ok(0) => break,
            Ok(n) => dispatch_inbound(&buf[..n.min(buf.len())]),
            Err(CommsError::NotConnected) => break,
            Err(e) => {
                warn!("UPLINK: inbound read failed: {}", e);
                break;
            }
        }
    }
}

async fn publish_loop<T: UplinkTransport>(transport: SharedTransport<T>) {
    loop {
        publish_next(&transport).await;
    }
}

async fn upload_loop<U: UploadPort>(mut port: U, identity: UploadIdentity) {
    loop {
        if !upload_next(&mut port, &identity).await {
            async_io_mini::Timer::after(Duration::from_millis(UPLOAD_BACKOFF_MS)).await;
        }
    }
}

async fn command_loop<T: UplinkTransport>(transport: SharedTransport<T>) {
    let mut buf = [0u8; MAX_COMMAND_LEN];
    loop {
        poll_commands(&transport, &mut buf);
        async_io_mini::Timer::after(Duration::from_millis(COMMAND_POLL_MS)).await;
    }
}

fn run_io_loop<T, U>(transport: T, port: U, identity: UploadIdentity)
where
    T: UplinkTransport + 'static,
    U: UploadPort + 'static,
{
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();
    let transport: SharedTransport<T> = Rc::new(RefCell::new(transport));

    executor.spawn(publish_loop(transport.clone())).detach();
    executor.spawn(upload_loop(port, identity)).detach();
    executor.spawn(command_loop(transport)).detach();

    info!("UPLINK: I/O task started");
    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
}

/// Spawn the uplink I/O thread on Core 0 next to the network stack.
pub fn spawn<T, U>(
    transport: T,
    port: U,
    identity: UploadIdentity,
) -> std::io::Result<std::thread::JoinHandle<()>>
where
    T: UplinkTransport + Send + 'static,
    U: UploadPort + Send + 'static,
{
    crate::drivers::task_pin::spawn_on_core(
        crate::drivers::task_pin::Core::Pro,
        10,
        12,
        "uplink-io\0",
        move || run_io_loop(transport, port, identity),
    )
}
