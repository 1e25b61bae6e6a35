//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the FSM, safety supervisor, actuator control and
//! the front-panel input state.  All I/O flows through port traits
//! injected at call sites, making the entire service testable with mock
//! adapters.
//!
//! ```text
//!  SensorPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                 │        AppService         │
//! ActuatorPort ◀──│ FSM · Safety · Hysteresis │◀──▶ ProcessStore
//!                 │       · Panel input        │
//!   PanelPort ◀──▶└──────────────────────────┘
//! ```
//!
//! ## Per-second order
//!
//! 1. sensors → snapshot
//! 2. safety → fault register (edge events)
//! 3. FSM second handler (skipped inside the boot banner window)
//! 4. actuator outputs → `ActuatorPort`
//! 5. alert beep, settle save of edited settings, pending save,
//!    state-change event

use log::{info, warn};

use crate::config::DryerConfig;
use crate::control::{ActuatorControl, ActuatorOutputs};
use crate::display::keypad::{self, KeyDebouncer, KeyEvent, PowerSwitch};
use crate::display::render::{self, Blink, PanelView, SegmentBuffer};
use crate::error::{Fault, FaultFlags};
use crate::fsm::context::{FsmContext, PersistedState, ProcessState};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, StateId};
use crate::safety::SafetySupervisor;

use super::commands::DryerCommand;
use super::events::{AppEvent, TelemetryData, UploadRecord};
use super::ports::{ActuatorPort, EventSink, PanelPort, ProcessStore, SensorPort};

// ───────────────────────────────────────────────────────────────
// Panel input state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct PanelInput {
    keys: KeyDebouncer,
    power: PowerSwitch,
    blink: Blink,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService {
    fsm: Fsm,
    ctx: FsmContext,
    safety: SafetySupervisor,
    control: ActuatorControl,
    panel: PanelInput,
    /// Second ticks since boot.
    secs_since_boot: u32,
    last_faults: FaultFlags,
    /// Seconds since the last unsaved settings edit, panel or remote.
    edit_age_secs: Option<u32>,
}

impl AppService {
    /// Construct the service from configuration and the loaded state.
    ///
    /// A persisted `Cool` becomes `Finish`: an interrupted cooling cycle
    /// is not resumed.  Does **not** start the FSM; call [`boot`](Self::boot)
    /// or [`start`](Self::start) next.
    pub fn new(config: DryerConfig, mut persisted: PersistedState) -> Self {
        if persisted.dry_state == StateId::Cool {
            info!("Persisted state was Cool; resuming as Finish");
            persisted.dry_state = StateId::Finish;
        }
        let process = ProcessState::from(persisted);
        let safety = SafetySupervisor::new(&config);
        let control = ActuatorControl::new(config.hysteresis_c);
        let ctx = FsmContext::new(config, process);
        let fsm = Fsm::new(build_state_table(), process.dry_state);

        Self {
            fsm,
            ctx,
            safety,
            control,
            panel: PanelInput::default(),
            secs_since_boot: 0,
            last_faults: FaultFlags::NONE,
            edit_age_secs: None,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Load the process state, coerce `Cool`, re-persist if coerced and
    /// start the FSM.
    pub fn boot(
        config: DryerConfig,
        store: &mut impl ProcessStore,
        sink: &mut impl EventSink,
    ) -> Self {
        let persisted = match store.load() {
            Ok(Some(p)) => p,
            Ok(None) => {
                info!("No stored process state; using defaults");
                PersistedState::default()
            }
            Err(e) => {
                warn!("Process state load failed: {e}; using defaults");
                PersistedState::default()
            }
        };
        let coerced = persisted.dry_state == StateId::Cool;

        let mut app = Self::new(config, persisted);
        app.start(sink);
        if coerced {
            app.ctx.request_persist();
            app.flush_persist(store);
        }
        app
    }

    /// Start the FSM in the loaded state.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx);
        // Starting is not a transition; nothing to save.
        self.ctx.take_persist_request();
        sink.emit(&AppEvent::Started(self.fsm.current_state()));
        info!(
            "AppService started in {} ({} min left, {} °C, soft_off={})",
            self.fsm.current_state(),
            self.ctx.process.remaining_minutes,
            self.ctx.process.set_temperature_c,
            self.ctx.process.soft_off
        );
    }

    // ── Control-loop entry points ─────────────────────────────

    /// Fast path, every control-loop pass.
    pub fn fast_sample(&mut self, hw: &mut impl SensorPort) {
        hw.sample_fast();
    }

    /// Run one full second cycle: sensors → safety → FSM → actuators.
    ///
    /// The `hw` parameter satisfies **both** [`SensorPort`] and
    /// [`ActuatorPort`], which avoids a double mutable borrow while
    /// keeping the port boundary explicit.
    pub fn on_second(
        &mut self,
        hw: &mut (impl SensorPort + ActuatorPort),
        store: &mut impl ProcessStore,
        sink: &mut impl EventSink,
    ) {
        self.secs_since_boot = self.secs_since_boot.saturating_add(1);
        let prev_state = self.fsm.current_state();

        // 1. Sensors
        let snapshot = hw.read_all();
        self.ctx.sensors = snapshot;

        // 2. Safety; the fan counts as running if it was driven last tick.
        let fan_running = self.ctx.commands.fan;
        self.ctx.fault_flags = self.safety.evaluate(&snapshot, fan_running);
        self.ctx.fan_retry = self.safety.fan_retry_active();
        self.publish_fault_change(sink);

        // 3./4. FSM and outputs
        let outputs = if self.in_banner() {
            ActuatorOutputs::safe(self.ctx.process.auto_damper)
        } else {
            self.fsm.tick(&mut self.ctx);
            self.control.compute(&self.ctx)
        };
        self.ctx.commands = outputs;
        hw.apply(&outputs);

        // 5. Alert, save, events
        if self.safety.alert_due() {
            hw.beep();
        }
        self.settle_edits();
        self.flush_persist(store);
        self.publish_state_change(prev_state, sink);
    }

    /// Minute tick: countdowns.
    pub fn on_minute(&mut self, store: &mut impl ProcessStore, sink: &mut impl EventSink) {
        if self.in_banner() {
            return;
        }
        let prev_state = self.fsm.current_state();
        self.fsm.minute(&mut self.ctx);
        self.flush_persist(store);
        self.publish_state_change(prev_state, sink);
    }

    // ── Front panel ───────────────────────────────────────────

    /// One keypad pass: power switch, then key actions.
    ///
    /// Keys are ignored while soft-off.
    pub fn poll_panel(
        &mut self,
        now_ms: u64,
        panel: &mut impl PanelPort,
        store: &mut impl ProcessStore,
        sink: &mut impl EventSink,
    ) {
        if let Some(soft_off) = self.panel.power.sample(panel.power_switch_high()) {
            info!("Power switch: {}", if soft_off { "OFF" } else { "ON" });
            self.set_soft_off(soft_off, store, sink);
        }

        if self.ctx.process.soft_off {
            return;
        }

        let scan = match panel.read_keys() {
            Ok(scan) => scan,
            Err(e) => {
                warn!("Key scan failed: {e}");
                return;
            }
        };
        if let Some(key) = self.panel.keys.poll(keypad::decode(scan), now_ms) {
            if self.apply_key(key) {
                panel.beep();
            }
        }
    }

    /// Build the segment buffer for the current state.
    pub fn render_panel(&mut self, now_ms: u64) -> SegmentBuffer {
        let view = self.panel_view(now_ms);
        render::render(&view)
    }

    /// Render and write to the panel.
    pub fn refresh_panel(&mut self, now_ms: u64, panel: &mut impl PanelPort) {
        let seg = self.render_panel(now_ms);
        if let Err(e) = panel.show(&seg) {
            warn!("Panel write failed: {e}");
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply a remote command with the same effects as the matching key.
    pub fn handle_command(
        &mut self,
        cmd: DryerCommand,
        hw: &mut impl ActuatorPort,
        store: &mut impl ProcessStore,
        sink: &mut impl EventSink,
    ) {
        info!("Command: {cmd:?}");
        match cmd {
            DryerCommand::PowerOn => self.set_soft_off(false, store, sink),
            DryerCommand::PowerOff => self.set_soft_off(true, store, sink),
            DryerCommand::SetTemperature(t) => {
                self.ctx.process.set_temperature_c = t.min(self.ctx.config.max_set_temperature_c);
                self.mark_edited();
                hw.beep();
            }
            DryerCommand::SetRemainingMinutes(m) => {
                self.ctx.process.remaining_minutes = m.min(self.ctx.config.max_remaining_minutes);
                self.mark_edited();
                hw.beep();
            }
            DryerCommand::ForceDefrost => {
                info!("Force defrost ignored: no defrost cycle on this machine");
            }
            DryerCommand::Reset => {
                self.reset_faults();
                hw.beep();
            }
        }
    }

    /// Switch soft-off.  Turning off mid-cycle finishes at once (cooling
    /// skipped) and is saved in the same call.
    pub fn set_soft_off(
        &mut self,
        soft_off: bool,
        store: &mut impl ProcessStore,
        sink: &mut impl EventSink,
    ) {
        if self.ctx.process.soft_off == soft_off {
            return;
        }
        let prev_state = self.fsm.current_state();
        self.ctx.process.soft_off = soft_off;
        if soft_off {
            self.reset_faults();
            if prev_state != StateId::Finish {
                self.fsm.force_transition(StateId::Finish, &mut self.ctx);
            }
        }
        self.ctx.request_persist();
        self.flush_persist(store);
        self.publish_state_change(prev_state, sink);
    }

    // ── Queries ───────────────────────────────────────────────

    /// Build a telemetry snapshot from the current context.
    pub fn build_telemetry(&self) -> TelemetryData {
        let s = &self.ctx.sensors;
        let out = &self.ctx.commands;
        TelemetryData {
            state: self.fsm.current_state().wire_name(),
            soft_off: self.ctx.process.soft_off,
            temperature_c: s.measured_temperature_c,
            secondary_temperature_c: s.secondary_temperature_c,
            humidity_percent: s.humidity_percent,
            fan_current_raw: s.fan_current_raw,
            relay_bits: out.relay_bits().bits(),
            led_bits: out.led_bits().bits(),
            fault_flags: self.ctx.fault_flags,
            set_temperature_c: self.ctx.process.set_temperature_c,
            remaining_minutes: self.ctx.process.remaining_minutes,
        }
    }

    /// Emit a telemetry event and return the snapshot.
    pub fn publish_telemetry(&self, sink: &mut impl EventSink) -> TelemetryData {
        let t = self.build_telemetry();
        sink.emit(&AppEvent::Telemetry(t));
        t
    }

    /// Latest bulk-upload sample.
    pub fn build_upload_record(&self) -> UploadRecord {
        // `as` saturates and maps NaN to 0.
        let measure = self.ctx.sensors.measured_temperature_c as i16;
        UploadRecord {
            measure_value: measure,
            departure: self.fsm.current_state() != StateId::Run || self.ctx.process.soft_off,
        }
    }

    /// Current FSM state.
    pub fn state(&self) -> StateId {
        self.fsm.current_state()
    }

    pub fn process(&self) -> &ProcessState {
        &self.ctx.process
    }

    /// Outputs applied on the last second tick.
    pub fn outputs(&self) -> ActuatorOutputs {
        self.ctx.commands
    }

    /// Current fault register.
    pub fn fault_flags(&self) -> FaultFlags {
        self.ctx.fault_flags
    }

    /// Fan start delay bookkeeping: `(seconds left, released)`.
    pub fn fan_delay(&self) -> (u16, bool) {
        (self.ctx.fan_delay_secs, self.ctx.fan_released)
    }

    pub fn config(&self) -> &DryerConfig {
        &self.ctx.config
    }

    /// True while a settings edit waits for its settle save.
    pub fn save_pending(&self) -> bool {
        self.edit_age_secs.is_some()
    }

    pub fn secs_since_boot(&self) -> u32 {
        self.secs_since_boot
    }

    // ── Internal ──────────────────────────────────────────────

    fn in_banner(&self) -> bool {
        self.secs_since_boot <= u32::from(self.ctx.config.boot_banner_secs)
    }

    fn panel_view(&mut self, now_ms: u64) -> PanelView {
        let p = &self.ctx.process;
        PanelView {
            faults: self.ctx.fault_flags,
            banner: self.in_banner(),
            soft_off: p.soft_off,
            measured_temperature_c: self.ctx.sensors.measured_temperature_c,
            set_temperature_c: p.set_temperature_c,
            remaining_minutes: p.remaining_minutes,
            led_bits: self.ctx.commands.led_bits().bits(),
            blink_on: self.panel.blink.update(now_ms),
        }
    }

    /// Returns `true` when the key did something worth a beep.
    fn apply_key(&mut self, key: KeyEvent) -> bool {
        let cfg = &self.ctx.config;
        let p = &mut self.ctx.process;
        match key {
            KeyEvent::TempUp | KeyEvent::TempDown => {
                p.set_temperature_c = keypad::adjust_temperature(
                    p.set_temperature_c,
                    key == KeyEvent::TempUp,
                    cfg.max_set_temperature_c,
                );
                info!("Temp set: {} °C", p.set_temperature_c);
            }
            KeyEvent::TimeUp | KeyEvent::TimeDown => {
                p.remaining_minutes = keypad::adjust_time(
                    p.remaining_minutes,
                    key == KeyEvent::TimeUp,
                    cfg.time_step_minutes,
                    cfg.max_remaining_minutes,
                );
                info!("Time set: {} min", p.remaining_minutes);
            }
            KeyEvent::DamperToggle => {
                p.auto_damper = !p.auto_damper;
                self.ctx.commands.auto_damper = p.auto_damper;
                info!(
                    "Damper mode: {}",
                    if p.auto_damper { "AUTO" } else { "MANUAL" }
                );
            }
            KeyEvent::Combo => {
                self.reset_faults();
                return true;
            }
            KeyEvent::Mode | KeyEvent::None => return false,
        }
        self.mark_edited();
        true
    }

    /// Restart the settle timer; the save follows `persist_settle_ms`
    /// after the last edit, rounded up to whole seconds.
    fn mark_edited(&mut self) {
        self.edit_age_secs = Some(0);
    }

    /// Age the pending edit by one second and request the save once it
    /// has settled.
    fn settle_edits(&mut self) {
        let Some(age) = self.edit_age_secs.map(|a| a.saturating_add(1)) else {
            return;
        };
        if u64::from(age) * 1000 >= u64::from(self.ctx.config.persist_settle_ms) {
            self.edit_age_secs = None;
            self.ctx.request_persist();
            info!("Settings saved");
        } else {
            self.edit_age_secs = Some(age);
        }
    }

    fn reset_faults(&mut self) {
        self.safety.reset_latched();
        self.ctx.fault_flags = self.safety.faults();
        self.ctx.fan_retry = self.safety.fan_retry_active();
    }

    /// Save if a handler or edit asked for it.  Failures are logged and
    /// raise the memory fault; control carries on.
    fn flush_persist(&mut self, store: &mut impl ProcessStore) {
        if !self.ctx.take_persist_request() {
            return;
        }
        let snapshot = self.ctx.process.persisted();
        if let Err(e) = store.save(&snapshot) {
            warn!("Process state save failed: {e}");
            self.safety.raise(Fault::Memory);
            self.ctx.fault_flags = self.safety.faults();
        }
    }

    fn publish_fault_change(&mut self, sink: &mut impl EventSink) {
        let current = self.ctx.fault_flags;
        if current != self.last_faults {
            let changed = FaultFlags::from_bits(current.bits() ^ self.last_faults.bits());
            sink.emit(&AppEvent::FaultsChanged { changed, current });
            self.last_faults = current;
        }
    }

    fn publish_state_change(&self, from: StateId, sink: &mut impl EventSink) {
        let to = self.fsm.current_state();
        if to != from {
            sink.emit(&AppEvent::StateChanged { from, to });
        }
    }
}
