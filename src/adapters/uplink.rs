//! Uplink adapters.
//!
//! [`UplinkEventSink`] turns telemetry and fault-change events into
//! encoded frames and queues them for the I/O thread.  The network side
//! (MQTT session, HTTP client) lives outside this firmware; the
//! logging stand-ins below fill the seams until it is wired in.

use log::{info, warn};

use crate::adapters::device_id::CpuIdString;
use crate::adapters::log_sink::LogEventSink;
use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, UplinkTransport, UploadPort};
use crate::error::CommsError;
use crate::uplink::{codec, io_task};

/// Logs every event and queues uplink frames.
pub struct UplinkEventSink {
    cpuid: CpuIdString,
    log: LogEventSink,
    queued: u32,
    dropped: u32,
}

impl UplinkEventSink {
    pub fn new(cpuid: CpuIdString) -> Self {
        Self {
            cpuid,
            log: LogEventSink::new(),
            queued: 0,
            dropped: 0,
        }
    }

    /// (queued, dropped) frame counts since boot.
    pub fn counters(&self) -> (u32, u32) {
        (self.queued, self.dropped)
    }

    fn enqueue(&mut self, frame: Result<codec::Frame, CommsError>) {
        let result = frame.and_then(io_task::queue_frame);
        match result {
            Ok(()) => self.queued = self.queued.wrapping_add(1),
            Err(CommsError::QueueFull) => self.dropped = self.dropped.wrapping_add(1),
            Err(e) => {
                warn!("UPLINK: frame not encodable: {}", e);
                self.dropped = self.dropped.wrapping_add(1);
            }
        }
    }
}

impl EventSink for UplinkEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.log.emit(event);
        match event {
            AppEvent::Telemetry(t) => {
                let f = codec::telemetry_frame(&self.cpuid, t);
                self.enqueue(f);
            }
            AppEvent::FaultsChanged { changed, current } => {
                let f = codec::event_frame(&self.cpuid, *changed, *current);
                self.enqueue(f);
            }
            AppEvent::StateChanged { .. } | AppEvent::Started(_) => {}
        }
    }
}

/// Publisher stand-in: logs frames, never receives.
#[derive(Debug, Default)]
pub struct LogUplinkTransport;

impl UplinkTransport for LogUplinkTransport {
    fn publish(&mut self, frame: &str) -> Result<(), CommsError> {
        info!("MQTT > {}", frame);
        Ok(())
    }

    fn receive(&mut self, _buf: &mut [u8]) -> Result<usize, CommsError> {
        Ok(0)
    }
}

/// Upload stand-in: logs the form body.
#[derive(Debug, Default)]
pub struct LogUploadPort;

impl UploadPort for LogUploadPort {
    fn upload(&mut self, form_body: &str) -> Result<(), CommsError> {
        info!("HTTP POST > {}", form_body);
        Ok(())
    }
}
