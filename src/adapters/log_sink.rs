//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART in production).  The uplink
//! sink wraps this one so every event is logged once.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | state={} off={} | T={:.1}\u{00b0}C set={} | \
                     amb={:.1}\u{00b0}C RH={:.0}% | fan_i={} | \
                     relay=0x{:02X} led=0x{:02X} | left={}min | faults={}",
                    t.state,
                    t.soft_off,
                    t.temperature_c,
                    t.set_temperature_c,
                    t.secondary_temperature_c,
                    t.humidity_percent,
                    t.fan_current_raw,
                    t.relay_bits,
                    t.led_bits,
                    t.remaining_minutes,
                    t.fault_flags,
                );
            }
            AppEvent::StateChanged { from, to } => {
                info!("STATE | {from} -> {to}");
            }
            AppEvent::FaultsChanged { changed, current } => {
                info!("FAULT | changed={changed} current={current}");
            }
            AppEvent::Started(state) => {
                info!("START | initial_state={state}");
            }
        }
    }
}
