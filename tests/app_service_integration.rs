//! Integration tests: AppService against the host NVS and uplink adapters.
//!
//! Unlike `tests/integration/`, these use the crate's own adapters in
//! their host backends instead of mocks.

use dryerctl::adapters::device_id::{self, CpuIdString};
use dryerctl::adapters::nvs::NvsAdapter;
use dryerctl::adapters::uplink::UplinkEventSink;
use dryerctl::app::events::AppEvent;
use dryerctl::app::ports::{
    ActuatorPort, ConfigError, ConfigPort, EventSink, ProcessStore, ScheduleFiredKind,
    SchedulerDelegate, SensorPort,
};
use dryerctl::app::service::AppService;
use dryerctl::config::DryerConfig;
use dryerctl::control::ActuatorOutputs;
use dryerctl::error::PersistError;
use dryerctl::fsm::StateId;
use dryerctl::fsm::context::{PersistedState, SensorSnapshot};
use dryerctl::scheduler::{self, Scheduler};
use dryerctl::uplink::channels::FRAME_CHANNEL;

// ── Mock implementations ──────────────────────────────────────

struct MockHw {
    snapshot: SensorSnapshot,
    applied: Vec<ActuatorOutputs>,
}

impl MockHw {
    fn new() -> Self {
        Self {
            snapshot: SensorSnapshot {
                measured_temperature_c: 35.0,
                ntc_mv: 1_400.0,
                fan_current_raw: 900,
                ..SensorSnapshot::default()
            },
            applied: Vec::new(),
        }
    }
}

impl SensorPort for MockHw {
    fn sample_fast(&mut self) {}

    fn read_all(&mut self) -> SensorSnapshot {
        self.snapshot
    }
}

impl ActuatorPort for MockHw {
    fn apply(&mut self, out: &ActuatorOutputs) {
        self.applied.push(*out);
    }
    fn beep(&mut self) {}
}

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &AppEvent) {}
}

fn running() -> PersistedState {
    PersistedState {
        remaining_minutes: 120,
        set_temperature_c: 55,
        auto_damper: true,
        soft_off: false,
        dry_state: StateId::Run,
    }
}

fn nvs() -> NvsAdapter {
    NvsAdapter::new().expect("host NVS always opens")
}

// ── Persistence ───────────────────────────────────────────────

#[test]
fn process_state_survives_a_reboot() {
    let mut nvs = nvs();
    ProcessStore::save(&mut nvs, &running()).unwrap();

    let mut app = AppService::boot(DryerConfig::default(), &mut nvs, &mut NullSink);
    let mut hw = MockHw::new();
    for _ in 0..5 {
        app.on_second(&mut hw, &mut nvs, &mut NullSink);
    }
    app.on_minute(&mut nvs, &mut NullSink);
    app.on_minute(&mut nvs, &mut NullSink);
    drop(app);

    let app = AppService::boot(DryerConfig::default(), &mut nvs, &mut NullSink);
    assert_eq!(app.state(), StateId::Run);
    assert_eq!(app.process().remaining_minutes, 118);
    assert_eq!(app.process().set_temperature_c, 55);
    assert!(app.process().auto_damper);
}

#[test]
fn interrupted_cooling_reboots_as_finish() {
    let mut nvs = nvs();
    ProcessStore::save(
        &mut nvs,
        &PersistedState {
            remaining_minutes: 0,
            dry_state: StateId::Cool,
            ..running()
        },
    )
    .unwrap();

    let app = AppService::boot(DryerConfig::default(), &mut nvs, &mut NullSink);
    assert_eq!(app.state(), StateId::Finish);
    let stored = ProcessStore::load(&nvs).unwrap().unwrap();
    assert_eq!(stored.dry_state, StateId::Finish);
}

#[test]
fn corrupted_state_byte_falls_back_to_defaults() {
    let mut nvs = nvs();
    ProcessStore::save(&mut nvs, &running()).unwrap();
    nvs.sim_set_u8("dry_state", 7);

    assert_eq!(ProcessStore::load(&nvs), Err(PersistError::Corrupted));

    let app = AppService::boot(DryerConfig::default(), &mut nvs, &mut NullSink);
    assert_eq!(app.state(), StateId::Finish);
    assert!(app.process().soft_off);
    assert_eq!(app.process().set_temperature_c, 45);
}

#[test]
fn first_boot_loads_nothing() {
    let nvs = nvs();
    assert_eq!(ProcessStore::load(&nvs), Ok(None));
}

#[test]
fn config_round_trip_and_validation() {
    let nvs = nvs();
    let cfg = DryerConfig {
        cooling_minutes: 8,
        hysteresis_c: 1.5,
        ..DryerConfig::default()
    };
    ConfigPort::save(&nvs, &cfg).unwrap();
    let loaded = ConfigPort::load(&nvs).unwrap();
    assert_eq!(loaded.cooling_minutes, 8);
    assert!((loaded.hysteresis_c - 1.5).abs() < f32::EPSILON);

    let bad = DryerConfig {
        cooling_minutes: 0,
        ..DryerConfig::default()
    };
    assert!(matches!(
        ConfigPort::save(&nvs, &bad),
        Err(ConfigError::ValidationFailed(_))
    ));
}

// ── Uplink ────────────────────────────────────────────────────

struct Reports<'a> {
    app: &'a AppService,
    sink: &'a mut UplinkEventSink,
    uploads: Vec<(i16, bool)>,
}

impl SchedulerDelegate for Reports<'_> {
    fn on_schedule_fired(&mut self, label: &str, _kind: ScheduleFiredKind) {
        match label {
            scheduler::TELEMETRY => {
                self.app.publish_telemetry(&mut *self.sink);
            }
            scheduler::UPLOAD => {
                let r = self.app.build_upload_record();
                self.uploads.push((r.measure_value, r.departure));
            }
            _ => {}
        }
    }
}

// The only test in this binary that touches the frame queue.
#[test]
fn scheduled_reports_and_fault_events_reach_the_frame_queue() {
    while FRAME_CHANNEL.try_receive().is_ok() {}

    let cpuid: CpuIdString = device_id::cpu_id(&device_id::read_mac());
    let mut nvs = nvs();
    ProcessStore::save(&mut nvs, &running()).unwrap();
    let mut sink = UplinkEventSink::new(cpuid.clone());
    let mut app = AppService::boot(DryerConfig::default(), &mut nvs, &mut sink);
    let mut hw = MockHw::new();

    let cfg = DryerConfig {
        telemetry_interval_secs: 5,
        upload_interval_secs: 6,
        ..DryerConfig::default()
    };
    let mut sched = Scheduler::for_config(&cfg);
    let mut uploads = Vec::new();

    for _ in 0..6 {
        app.on_second(&mut hw, &mut nvs, &mut sink);
        let mut d = Reports {
            app: &app,
            sink: &mut sink,
            uploads: Vec::new(),
        };
        sched.tick(&mut d);
        uploads.append(&mut d.uploads);
    }

    // One-shot after the banner (4 s) and the periodic one at 5 s.
    let mut frames = Vec::new();
    while let Ok(f) = FRAME_CHANNEL.try_receive() {
        frames.push(f);
    }
    assert_eq!(frames.len(), 2);
    let prefix = format!(r#"{{"idx":0,"zz":"{}|35.0|"#, cpuid);
    assert!(frames.iter().all(|f| f.starts_with(&prefix)), "{frames:?}");
    assert!(frames[1].contains("|RUN|0|"));
    assert_eq!(uploads, vec![(35, false)]);

    hw.snapshot.overheat = true;
    app.on_second(&mut hw, &mut nvs, &mut sink);
    let evt = FRAME_CHANNEL.try_receive().expect("fault event frame");
    assert!(evt.starts_with(&format!(r#"{{"idx":1,"evt":"{}|0004|0004|"#, cpuid)));
    assert_eq!(sink.counters(), (3, 0));
}
