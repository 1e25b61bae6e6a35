//! Integration tests for the AppService → FSM → actuators pipeline.
//!
//! These run on the host and drive whole second/minute cycles through
//! mock adapters, checking what reaches the relays, the store and the
//! panel.

use super::mock_hw::{LogSink, MockHardware, MockNvs, MockPanel};

use dryerctl::adapters::hardware::HardwareAdapter;
use dryerctl::app::commands::DryerCommand;
use dryerctl::app::events::AppEvent;
use dryerctl::app::service::AppService;
use dryerctl::config::DryerConfig;
use dryerctl::control::DamperPosition;
use dryerctl::display::transpose;
use dryerctl::drivers::buzzer::Buzzer;
use dryerctl::drivers::relays::RelayBank;
use dryerctl::error::Fault;
use dryerctl::fsm::StateId;
use dryerctl::fsm::context::PersistedState;
use dryerctl::sensors::{self, SensorHub};

const KEY_TEMP_UP: u32 = 1 << 2;
const KEY_TIME_UP: u32 = 1 << 5;
const KEY_DAMPER: u32 = 1 << 9;
const KEY_COMBO: u32 = (1 << 6) | (1 << 2) | (1 << 18);

fn running(remaining: u16) -> PersistedState {
    PersistedState {
        remaining_minutes: remaining,
        set_temperature_c: 50,
        auto_damper: true,
        soft_off: false,
        dry_state: StateId::Run,
    }
}

fn boot(persisted: PersistedState) -> (AppService, MockNvs, LogSink) {
    let mut nvs = MockNvs::with_process(persisted);
    let mut sink = LogSink::new();
    let app = AppService::boot(DryerConfig::default(), &mut nvs, &mut sink);
    (app, nvs, sink)
}

/// Run the boot banner seconds; no FSM ticks happen inside them.
fn pass_banner(app: &mut AppService, hw: &mut MockHardware, nvs: &mut MockNvs, sink: &mut LogSink) {
    for _ in 0..app.config().boot_banner_secs {
        app.on_second(hw, nvs, sink);
    }
}

/// Tick until the fan is driven, at most `limit` seconds.
fn run_until_fan(
    app: &mut AppService,
    hw: &mut MockHardware,
    nvs: &mut MockNvs,
    sink: &mut LogSink,
    limit: u32,
) {
    for _ in 0..limit {
        app.on_second(hw, nvs, sink);
        if hw.fan_on() {
            return;
        }
    }
    panic!("fan never started within {limit}s");
}

// ── Boot ──────────────────────────────────────────────────────

#[test]
fn boot_in_run_keeps_running_and_starts_fan_delay() {
    let (mut app, mut nvs, mut sink) = boot(running(45));
    let mut hw = MockHardware::at(30.0);
    let delay = app.config().fan_start_delay_secs;

    assert_eq!(app.state(), StateId::Run);
    assert_eq!(app.fan_delay(), (delay, false));

    pass_banner(&mut app, &mut hw, &mut nvs, &mut sink);
    assert!(!hw.heater_on() && !hw.fan_on(), "banner keeps outputs safe");
    assert_eq!(app.fan_delay(), (delay, false), "no countdown inside the banner");

    app.on_second(&mut hw, &mut nvs, &mut sink);
    assert_eq!(app.state(), StateId::Run);
    assert_eq!(app.fan_delay(), (delay - 1, false));
    assert!(hw.heater_on(), "30 °C is well below a 50 °C setpoint");
    assert!(!hw.fan_on(), "fan waits for its start delay");
    assert_eq!(hw.last_outputs().map(|o| o.damper), Some(DamperPosition::Closed));

    run_until_fan(&mut app, &mut hw, &mut nvs, &mut sink, 5);
    assert!(app.fan_delay().1);
}

#[test]
fn boot_coerces_persisted_cool_to_finish() {
    let (app, nvs, sink) = boot(PersistedState {
        dry_state: StateId::Cool,
        ..running(0)
    });
    assert_eq!(app.state(), StateId::Finish);
    assert_eq!(nvs.saves.len(), 1);
    assert_eq!(nvs.last_saved().map(|s| s.dry_state), Some(StateId::Finish));
    assert_eq!(sink.events.first(), Some(&AppEvent::Started(StateId::Finish)));
}

#[test]
fn minute_ticks_are_ignored_inside_banner() {
    let (mut app, mut nvs, mut sink) = boot(running(45));
    app.on_minute(&mut nvs, &mut sink);
    assert_eq!(app.process().remaining_minutes, 45);
    assert!(nvs.saves.is_empty());
}

// ── Process cycle ─────────────────────────────────────────────

#[test]
fn remaining_zero_on_second_tick_enters_cool_at_once() {
    let (mut app, mut nvs, mut sink) = boot(running(45));
    let mut hw = MockHardware::at(30.0);
    pass_banner(&mut app, &mut hw, &mut nvs, &mut sink);

    app.handle_command(DryerCommand::SetRemainingMinutes(0), &mut hw, &mut nvs, &mut sink);
    app.on_second(&mut hw, &mut nvs, &mut sink);

    assert_eq!(app.state(), StateId::Cool);
    assert_eq!(
        app.process().cooling_minutes_remaining,
        app.config().cooling_minutes
    );
    assert!(!hw.heater_on());
    assert!(hw.fan_on(), "cooling runs the fan");
    assert_eq!(nvs.last_saved().map(|s| s.dry_state), Some(StateId::Cool));
}

#[test]
fn full_cycle_run_cool_finish_persists_every_minute() {
    let (mut app, mut nvs, mut sink) = boot(running(2));
    let mut hw = MockHardware::at(30.0);
    pass_banner(&mut app, &mut hw, &mut nvs, &mut sink);
    app.on_second(&mut hw, &mut nvs, &mut sink);

    app.on_minute(&mut nvs, &mut sink);
    assert_eq!(app.state(), StateId::Run);
    assert_eq!(nvs.last_saved().map(|s| s.remaining_minutes), Some(1));

    app.on_minute(&mut nvs, &mut sink);
    assert_eq!(app.state(), StateId::Cool);
    assert_eq!(nvs.last_saved().map(|s| s.remaining_minutes), Some(0));

    for _ in 0..app.config().cooling_minutes {
        app.on_second(&mut hw, &mut nvs, &mut sink);
        assert_eq!(app.state(), StateId::Cool);
        app.on_minute(&mut nvs, &mut sink);
    }
    assert_eq!(app.state(), StateId::Finish);

    for _ in 0..10 {
        app.on_second(&mut hw, &mut nvs, &mut sink);
    }
    assert_eq!(app.state(), StateId::Finish, "no time set, stays finished");
    assert!(!hw.fan_on() && !hw.heater_on());
    assert_eq!(
        sink.state_changes(),
        vec![(StateId::Run, StateId::Cool), (StateId::Cool, StateId::Finish)]
    );
}

#[test]
fn time_set_while_finished_resumes_with_fan_at_once() {
    let (mut app, mut nvs, mut sink) = boot(PersistedState {
        dry_state: StateId::Finish,
        ..running(0)
    });
    let mut hw = MockHardware::at(30.0);
    pass_banner(&mut app, &mut hw, &mut nvs, &mut sink);

    app.handle_command(DryerCommand::SetRemainingMinutes(90), &mut hw, &mut nvs, &mut sink);
    app.on_second(&mut hw, &mut nvs, &mut sink);

    assert_eq!(app.state(), StateId::Run);
    assert!(app.fan_delay().1);
    assert!(hw.fan_on() && hw.heater_on());
}

// ── Heater control ────────────────────────────────────────────

#[test]
fn heater_follows_hysteresis_band() {
    let (mut app, mut nvs, mut sink) = boot(running(45));
    let mut hw = MockHardware::at(48.0);
    pass_banner(&mut app, &mut hw, &mut nvs, &mut sink);

    let mut step = |t: f32, hw: &mut MockHardware| {
        hw.snapshot.measured_temperature_c = t;
        app.on_second(hw, &mut nvs, &mut sink);
        hw.heater_on()
    };

    assert!(step(48.0, &mut hw));
    assert!(step(49.5, &mut hw), "inside the band: holds on");
    assert!(step(50.9, &mut hw), "inside the band: holds on");
    assert!(!step(51.5, &mut hw));
    assert!(!step(50.5, &mut hw), "inside the band: holds off");
    assert!(!step(49.1, &mut hw), "inside the band: holds off");
    assert!(step(48.9, &mut hw));
}

#[test]
fn manual_damper_stays_open_while_heating() {
    let (mut app, mut nvs, mut sink) = boot(PersistedState {
        auto_damper: false,
        ..running(45)
    });
    let mut hw = MockHardware::at(30.0);
    pass_banner(&mut app, &mut hw, &mut nvs, &mut sink);
    app.on_second(&mut hw, &mut nvs, &mut sink);

    let out = hw.last_outputs().expect("outputs applied");
    assert!(out.heater);
    assert_eq!(out.damper, DamperPosition::Open);
}

// ── Safety ────────────────────────────────────────────────────

#[test]
fn overheat_forces_everything_off_in_the_same_tick() {
    let (mut app, mut nvs, mut sink) = boot(running(45));
    let mut hw = MockHardware::at(30.0);
    pass_banner(&mut app, &mut hw, &mut nvs, &mut sink);
    run_until_fan(&mut app, &mut hw, &mut nvs, &mut sink, 5);
    assert!(hw.heater_on());

    hw.snapshot.overheat = true;
    app.on_second(&mut hw, &mut nvs, &mut sink);

    let out = hw.last_outputs().expect("outputs applied");
    assert!(!out.heater && !out.fan);
    assert_eq!(out.damper, DamperPosition::Open);
    assert!(app.fault_flags().contains(Fault::Overheat));
    assert!(hw.beeps() >= 1, "active fault sounds the alert");
    assert!(sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::FaultsChanged { current, .. } if current.contains(Fault::Overheat))));

    hw.snapshot.overheat = false;
    app.on_second(&mut hw, &mut nvs, &mut sink);
    assert!(!app.fault_flags().any(), "thermostat fault clears itself");
    assert!(hw.heater_on());
}

#[test]
fn probe_fault_mid_run_cuts_heater_on_the_next_second() {
    // The only test in this binary that drives the simulated ADC.
    sensors::sim_set_ntc_mv(1_650);

    let mut nvs = MockNvs::with_process(running(45));
    let mut sink = LogSink::new();
    let mut app = AppService::boot(DryerConfig::default(), &mut nvs, &mut sink);
    let mut hw = HardwareAdapter::new(SensorHub::new(), RelayBank::new(), Buzzer::new());

    // Fill the fast filter with healthy samples and get the heater going.
    for _ in 0..10 {
        for _ in 0..100 {
            app.fast_sample(&mut hw);
        }
        app.on_second(&mut hw, &mut nvs, &mut sink);
    }
    assert!(!app.fault_flags().any());
    assert!(hw.relay_state().heater, "25 °C chamber heats toward 50 °C");

    sensors::sim_set_ntc_mv(100);
    app.fast_sample(&mut hw);
    app.on_second(&mut hw, &mut nvs, &mut sink);
    let t = app.build_telemetry();
    assert!((t.temperature_c - 99.9).abs() < 0.01, "got {}", t.temperature_c);
    assert!(app.fault_flags().contains(Fault::ThermistorShort));
    assert!(!hw.relay_state().heater);
    assert!(!hw.relay_state().fan);

    sensors::sim_set_ntc_mv(3_290);
    app.fast_sample(&mut hw);
    app.on_second(&mut hw, &mut nvs, &mut sink);
    assert!(app.fault_flags().contains(Fault::ThermistorOpen));
    assert!(!app.fault_flags().contains(Fault::ThermistorShort));
    assert!(!hw.relay_state().heater);

    sensors::sim_set_ntc_mv(1_650);
    app.fast_sample(&mut hw);
    app.on_second(&mut hw, &mut nvs, &mut sink);
    assert!(!app.fault_flags().any(), "probe faults clear with the sample");
}

#[test]
fn stalled_fan_is_retried_and_clears_once_current_returns() {
    let (mut app, mut nvs, mut sink) = boot(running(45));
    let mut hw = MockHardware::at(30.0);
    pass_banner(&mut app, &mut hw, &mut nvs, &mut sink);
    run_until_fan(&mut app, &mut hw, &mut nvs, &mut sink, 5);

    hw.snapshot.fan_current_raw = 20;
    for _ in 0..3 {
        app.on_second(&mut hw, &mut nvs, &mut sink);
    }
    assert!(app.fault_flags().contains(Fault::Fan));

    // The fan comes back; it stays off until the retry window opens.
    hw.snapshot.fan_current_raw = 800;
    for _ in 0..29 {
        app.on_second(&mut hw, &mut nvs, &mut sink);
        assert!(!hw.fan_on());
    }
    app.on_second(&mut hw, &mut nvs, &mut sink);
    assert!(hw.fan_on(), "retry drives the fan");
    assert!(!hw.heater_on(), "heater stays off during the retry");

    app.on_second(&mut hw, &mut nvs, &mut sink);
    app.on_second(&mut hw, &mut nvs, &mut sink);
    assert!(app.fault_flags().contains(Fault::Fan));
    app.on_second(&mut hw, &mut nvs, &mut sink);
    assert!(!app.fault_flags().any(), "three good samples clear the stall");

    app.on_second(&mut hw, &mut nvs, &mut sink);
    assert!(hw.heater_on() && hw.fan_on());
}

#[test]
fn failed_save_raises_memory_fault_and_keeps_running() {
    let (mut app, mut nvs, mut sink) = boot(running(45));
    let mut hw = MockHardware::at(30.0);
    pass_banner(&mut app, &mut hw, &mut nvs, &mut sink);
    app.on_second(&mut hw, &mut nvs, &mut sink);

    nvs.fail = true;
    app.on_minute(&mut nvs, &mut sink);
    assert_eq!(app.process().remaining_minutes, 44);
    assert!(app.fault_flags().contains(Fault::Memory));
    assert_eq!(app.state(), StateId::Run);
}

// ── Power switch and soft-off ─────────────────────────────────

#[test]
fn power_switch_off_mid_run_finishes_and_persists() {
    let (mut app, mut nvs, mut sink) = boot(running(45));
    let mut hw = MockHardware::at(30.0);
    let mut panel = MockPanel::switched_on();
    pass_banner(&mut app, &mut hw, &mut nvs, &mut sink);
    app.poll_panel(0, &mut panel, &mut nvs, &mut sink);
    assert!(!app.process().soft_off);

    panel.power_high = true;
    app.poll_panel(50, &mut panel, &mut nvs, &mut sink);

    assert_eq!(app.state(), StateId::Finish);
    let saved = nvs.last_saved().expect("saved in the same pass");
    assert!(saved.soft_off);
    assert_eq!(saved.dry_state, StateId::Finish);
    assert_eq!(saved.remaining_minutes, 45, "remaining time is kept");

    app.on_second(&mut hw, &mut nvs, &mut sink);
    assert!(!hw.heater_on() && !hw.fan_on());
}

#[test]
fn power_on_command_resumes_run() {
    let (mut app, mut nvs, mut sink) = boot(PersistedState {
        soft_off: true,
        dry_state: StateId::Finish,
        ..running(45)
    });
    let mut hw = MockHardware::at(30.0);
    pass_banner(&mut app, &mut hw, &mut nvs, &mut sink);
    app.on_second(&mut hw, &mut nvs, &mut sink);
    assert_eq!(app.state(), StateId::Finish);

    app.handle_command(DryerCommand::PowerOn, &mut hw, &mut nvs, &mut sink);
    assert_eq!(nvs.last_saved().map(|s| s.soft_off), Some(false));
    app.on_second(&mut hw, &mut nvs, &mut sink);
    assert_eq!(app.state(), StateId::Run);
}

// ── Keys ──────────────────────────────────────────────────────

#[test]
fn key_edits_beep_and_save_after_settling() {
    let (mut app, mut nvs, mut sink) = boot(running(45));
    let mut panel = MockPanel::switched_on();
    app.poll_panel(0, &mut panel, &mut nvs, &mut sink);
    let saves_before = nvs.saves.len();

    panel.press(KEY_TEMP_UP);
    app.poll_panel(100, &mut panel, &mut nvs, &mut sink);
    assert_eq!(app.process().set_temperature_c, 51);
    assert_eq!(panel.beeps, 1);
    assert!(app.save_pending());

    panel.press(KEY_TIME_UP);
    app.poll_panel(200, &mut panel, &mut nvs, &mut sink);
    assert_eq!(app.process().remaining_minutes, 90, "45 rounds up to 60, then one step");

    panel.press(KEY_DAMPER);
    app.poll_panel(300, &mut panel, &mut nvs, &mut sink);
    assert!(!app.process().auto_damper);

    // Settling runs on the second tick: 3000 ms is three seconds.
    let mut hw = MockHardware::at(30.0);
    app.on_second(&mut hw, &mut nvs, &mut sink);
    app.on_second(&mut hw, &mut nvs, &mut sink);
    assert_eq!(nvs.saves.len(), saves_before, "still settling");

    app.on_second(&mut hw, &mut nvs, &mut sink);
    assert!(!app.save_pending());
    let saved = nvs.last_saved().expect("settle save");
    assert_eq!(saved.set_temperature_c, 51);
    assert_eq!(saved.remaining_minutes, 90);
    assert!(!saved.auto_damper);
}

#[test]
fn remote_edit_is_saved_without_a_panel() {
    let (mut app, mut nvs, mut sink) = boot(running(45));
    let mut hw = MockHardware::at(30.0);
    let saves_before = nvs.saves.len();

    app.handle_command(DryerCommand::SetTemperature(62), &mut hw, &mut nvs, &mut sink);
    assert!(app.save_pending());
    app.on_second(&mut hw, &mut nvs, &mut sink);
    app.on_second(&mut hw, &mut nvs, &mut sink);
    assert_eq!(nvs.saves.len(), saves_before);

    app.on_second(&mut hw, &mut nvs, &mut sink);
    assert!(!app.save_pending());
    assert_eq!(nvs.last_saved().map(|s| s.set_temperature_c), Some(62));
}

#[test]
fn keys_are_ignored_while_soft_off() {
    let (mut app, mut nvs, mut sink) = boot(running(45));
    let mut panel = MockPanel::switched_on();
    panel.power_high = true;
    app.poll_panel(0, &mut panel, &mut nvs, &mut sink);
    assert!(app.process().soft_off);

    panel.press(KEY_TEMP_UP);
    app.poll_panel(100, &mut panel, &mut nvs, &mut sink);
    assert_eq!(app.process().set_temperature_c, 50);
    assert_eq!(panel.beeps, 0);
}

#[test]
fn combo_chord_clears_latched_fan_fault() {
    let (mut app, mut nvs, mut sink) = boot(running(45));
    let mut hw = MockHardware::at(30.0);
    let mut panel = MockPanel::switched_on();
    pass_banner(&mut app, &mut hw, &mut nvs, &mut sink);
    run_until_fan(&mut app, &mut hw, &mut nvs, &mut sink, 5);

    hw.snapshot.fan_current_raw = 0;
    for _ in 0..3 {
        app.on_second(&mut hw, &mut nvs, &mut sink);
    }
    assert!(app.fault_flags().contains(Fault::Fan));

    panel.press(KEY_COMBO);
    app.poll_panel(0, &mut panel, &mut nvs, &mut sink);
    assert!(!app.fault_flags().any());
    assert_eq!(panel.beeps, 1);
}

#[test]
fn panel_bus_errors_do_not_disturb_control() {
    let (mut app, mut nvs, mut sink) = boot(running(45));
    let mut hw = MockHardware::at(30.0);
    let mut panel = MockPanel::switched_on();
    panel.bus_fault = true;

    app.poll_panel(0, &mut panel, &mut nvs, &mut sink);
    app.refresh_panel(0, &mut panel);
    assert!(panel.shown.is_empty());

    pass_banner(&mut app, &mut hw, &mut nvs, &mut sink);
    app.on_second(&mut hw, &mut nvs, &mut sink);
    assert!(hw.heater_on());
}

// ── Display ───────────────────────────────────────────────────

#[test]
fn banner_then_readout_on_the_panel() {
    let (mut app, mut nvs, mut sink) = boot(running(45));
    let mut hw = MockHardware::at(30.0);
    let mut panel = MockPanel::switched_on();

    app.on_second(&mut hw, &mut nvs, &mut sink);
    let banner = app.render_panel(0);
    app.refresh_panel(0, &mut panel);
    assert_eq!(panel.shown.len(), 1);
    assert_eq!(panel.shown[0], transpose(&banner), "panel receives the grid layout");
    assert_eq!(app.render_panel(0), banner, "same inputs, same buffer");

    for _ in 0..app.config().boot_banner_secs {
        app.on_second(&mut hw, &mut nvs, &mut sink);
    }
    assert_ne!(app.render_panel(0), banner, "readout replaces the banner");
}

// ── Telemetry and upload ──────────────────────────────────────

#[test]
fn telemetry_and_upload_reflect_the_last_tick() {
    let (mut app, mut nvs, mut sink) = boot(running(45));
    let mut hw = MockHardware::at(30.0);
    pass_banner(&mut app, &mut hw, &mut nvs, &mut sink);
    app.on_second(&mut hw, &mut nvs, &mut sink);

    let t = app.publish_telemetry(&mut sink);
    assert_eq!(t.state, "RUN");
    assert_eq!(t.remaining_minutes, 45);
    assert_eq!(t.relay_bits & 0x02, 0x02, "heater relay");
    assert!(matches!(sink.events.last(), Some(AppEvent::Telemetry(_))));

    let rec = app.build_upload_record();
    assert_eq!(rec.measure_value, 30);
    assert!(!rec.departure);
}
