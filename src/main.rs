//! Dryer controller firmware: main entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter   UplinkEventSink   NvsAdapter   Tm1638Panel  │
//! │  (Sensor+Actuator) (EventSink)       (Config+     (PanelPort)  │
//! │                                       ProcessStore)            │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  FSM · Safety · Hysteresis · Panel input               │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  TimeBase (ISR flags) · Scheduler (delegate-driven)            │
//! └────────────────────────────────────────────────────────────────┘
//!
//!  main task (Core 1)      panel thread (Core 1)    uplink-io (Core 0)
//!  ~10ms control loop      key scan + display       frames, uploads,
//!         │                        │                 inbound commands
//!         └──── Arc<Mutex<Shared>> ┘                       │
//!         ◀────────────── embassy-sync channels ───────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;
use log::{debug, error, info, warn};

use esp_idf_hal::gpio::{IOPin, OutputPin};

use dryerctl::adapters::device_id;
use dryerctl::adapters::hardware::HardwareAdapter;
use dryerctl::adapters::nvs::NvsAdapter;
use dryerctl::adapters::panel::{self, EspPanel};
use dryerctl::adapters::time::Esp32TimeAdapter;
use dryerctl::adapters::uplink::{LogUplinkTransport, LogUploadPort, UplinkEventSink};
use dryerctl::app::ports::{ConfigPort, ScheduleFiredKind, SchedulerDelegate};
use dryerctl::app::service::AppService;
use dryerctl::config::{DryerConfig, TimeBaseMode};
use dryerctl::drivers::buzzer::Buzzer;
use dryerctl::drivers::relays::RelayBank;
use dryerctl::drivers::task_pin::{self, Core};
use dryerctl::drivers::watchdog::Watchdog;
use dryerctl::drivers::{hw_init, hw_timer};
use dryerctl::scheduler::{self, Scheduler};
use dryerctl::sensors::SensorHub;
use dryerctl::timebase::TIME_BASE;
use dryerctl::uplink::io_task;

/// Control-loop pass period; also the fast-sampling cadence.
const LOOP_PERIOD: Duration = Duration::from_millis(10);
const PANEL_IDLE: Duration = Duration::from_millis(5);

// ── Shared state ──────────────────────────────────────────────

/// Everything both loops touch.  One pass holds the lock at a time.
struct Shared {
    app: AppService,
    nvs: NvsAdapter,
    sink: UplinkEventSink,
}

type SharedState = Arc<Mutex<Shared>>;

fn lock(shared: &SharedState) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

// ── Scheduler delegate ────────────────────────────────────────
//
// The scheduler only knows labels.  This turns them into a telemetry
// event (which the sink encodes and queues) or an upload record.

struct ReportDelegate<'a> {
    app: &'a AppService,
    sink: &'a mut UplinkEventSink,
}

impl SchedulerDelegate for ReportDelegate<'_> {
    fn on_schedule_fired(&mut self, label: &str, kind: ScheduleFiredKind) {
        match label {
            scheduler::TELEMETRY => {
                self.app.publish_telemetry(&mut *self.sink);
                let (queued, dropped) = self.sink.counters();
                debug!(
                    "Uplink frames: {} queued, {} dropped ({} s up, {} s ticked)",
                    queued,
                    dropped,
                    self.app.secs_since_boot(),
                    TIME_BASE.seconds_total()
                );
            }
            scheduler::UPLOAD => {
                // Logged and dropped inside when the queue is full.
                let _ = io_task::queue_upload(self.app.build_upload_record());
            }
            other => warn!("Schedule '{}' ({:?}) has no handler", other, kind),
        }
    }
}

// ── Time base ─────────────────────────────────────────────────

fn start_timebase(cfg: &DryerConfig) {
    match cfg.timebase {
        TimeBaseMode::Timer => hw_timer::start_second_timer(),
        TimeBaseMode::ZeroCross { edges_per_second } => {
            TIME_BASE.set_edges_per_second(edges_per_second);
            match hw_init::init_zero_cross_isr() {
                Ok(()) => info!("Time base: zero-cross, {} edges/s", edges_per_second),
                Err(e) => {
                    warn!("Time base: {}; falling back to the 1 Hz timer", e);
                    hw_timer::start_second_timer();
                }
            }
        }
    }
}

// ── Panel thread ──────────────────────────────────────────────

fn panel_loop(shared: &SharedState, mut panel: EspPanel, cfg: &DryerConfig) {
    let time = Esp32TimeAdapter::new();
    let poll_every = u64::from(cfg.key_poll_ms.max(1));
    let refresh_every = u64::from(cfg.display_refresh_ms.max(1));
    let mut next_poll = 0u64;
    let mut next_refresh = 0u64;

    loop {
        let now = time.uptime_ms();
        if now >= next_poll {
            let mut guard = lock(shared);
            let Shared { app, nvs, sink } = &mut *guard;
            app.poll_panel(now, &mut panel, nvs, sink);
            next_poll = now + poll_every;
        }
        if now >= next_refresh {
            lock(shared).app.refresh_panel(now, &mut panel);
            next_refresh = now + refresh_every;
        }
        std::thread::sleep(PANEL_IDLE);
    }
}

/// Stop feeding the watchdog so it resets the chip.
fn park() -> ! {
    loop {
        std::thread::sleep(Duration::from_secs(1));
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  dryerctl v{:<26}║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let watchdog = Watchdog::new();
    if let Err(e) = hw_init::init_peripherals() {
        error!("HAL init failed: {}; parked until the watchdog resets", e);
        park();
    }

    // ── 2. Config + stored process state ──────────────────────
    let mut nvs = NvsAdapter::new().unwrap_or_else(|e| {
        warn!("NVS init failed ({}), running with defaults and no persistence", e);
        NvsAdapter::default()
    });
    let config = ConfigPort::load(&nvs).unwrap_or_else(|e| {
        warn!("NVS config load failed ({}), using defaults", e);
        DryerConfig::default()
    });

    start_timebase(&config);

    let cpuid = device_id::cpu_id(&device_id::read_mac());
    info!("CPUID: {}", cpuid);

    // ── 3. Adapters + app service ─────────────────────────────
    let mut hw = HardwareAdapter::new(SensorHub::new(), RelayBank::new(), Buzzer::new());
    let mut sink = UplinkEventSink::new(cpuid);
    let app = AppService::boot(config.clone(), &mut nvs, &mut sink);
    let shared: SharedState = Arc::new(Mutex::new(Shared { app, nvs, sink }));

    // ── 4. Uplink I/O thread ──────────────────────────────────
    io_task::spawn(LogUplinkTransport, LogUploadPort, config.upload.clone())?;

    // ── 5. Front panel thread ─────────────────────────────────
    let peripherals = esp_idf_hal::peripherals::Peripherals::take()?;
    let pins = peripherals.pins;
    // STB, CLK, DIO; see the panel section of `pins`.
    match panel::esp_panel(
        pins.gpio27.downgrade_output(),
        pins.gpio14.downgrade_output(),
        pins.gpio15.downgrade(),
        config.brightness,
    ) {
        Ok(p) => {
            let shared = shared.clone();
            let cfg = config.clone();
            task_pin::spawn_on_core(Core::App, 6, 8, "panel\0", move || {
                panel_loop(&shared, p, &cfg);
            })?;
        }
        Err(e) => error!("Front panel unavailable ({}); running headless", e),
    }

    // ── 6. Control loop ───────────────────────────────────────
    let mut sched = Scheduler::for_config(&config);
    info!("System ready. Entering control loop.");

    loop {
        {
            let mut guard = lock(&shared);
            let Shared { app, nvs, sink } = &mut *guard;

            app.fast_sample(&mut hw);

            if TIME_BASE.take_second() {
                app.on_second(&mut hw, nvs, sink);
                sched.tick(&mut ReportDelegate {
                    app: &*app,
                    sink: &mut *sink,
                });
            }
            if TIME_BASE.take_minute() {
                app.on_minute(nvs, sink);
            }
            while let Some(cmd) = io_task::try_recv_command() {
                app.handle_command(cmd, &mut hw, nvs, sink);
            }
        }

        watchdog.feed();
        std::thread::sleep(LOOP_PERIOD);
    }
}
