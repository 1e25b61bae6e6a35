//! Concrete state handler functions and table builder.
//!
//! ```text
//!            [remaining == 0]              [cooling == 0]
//!   RUN ─────────────────────▶ COOL ─────────────────────▶ FINISH
//!    ▲ │                                                     │
//!    │ └──────────────[soft-off, cooling skipped]───────────▶│
//!    │                                                       │
//!    └───────────[remaining > 0 && !soft_off, fan at once]───┘
//! ```

use super::context::FsmContext;
use super::{StateDescriptor, StateId};
use log::info;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; StateId::COUNT] {
    [
        // Index 0: Run
        StateDescriptor {
            id: StateId::Run,
            name: "Run",
            on_enter: Some(run_enter),
            on_exit: None,
            on_update: run_update,
            on_minute: Some(run_minute),
        },
        // Index 1: Cool
        StateDescriptor {
            id: StateId::Cool,
            name: "Cool",
            on_enter: Some(cool_enter),
            on_exit: Some(cool_exit),
            on_update: cool_update,
            on_minute: Some(cool_minute),
        },
        // Index 2: Finish
        StateDescriptor {
            id: StateId::Finish,
            name: "Finish",
            on_enter: Some(finish_enter),
            on_exit: None,
            on_update: finish_update,
            on_minute: None,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  RUN state: heating with the countdown running
// ═══════════════════════════════════════════════════════════════════════════

fn run_enter(ctx: &mut FsmContext) {
    info!(
        "RUN: {} min at {} °C, fan {}",
        ctx.process.remaining_minutes,
        ctx.process.set_temperature_c,
        if ctx.fan_released { "on" } else { "delayed" }
    );
}

fn run_update(ctx: &mut FsmContext) -> Option<StateId> {
    // Power switched off mid-run: skip cooling.
    if ctx.process.soft_off {
        return Some(StateId::Finish);
    }

    if ctx.process.remaining_minutes == 0 {
        return Some(StateId::Cool);
    }

    if !ctx.fan_released {
        if ctx.fan_delay_secs > 0 {
            ctx.fan_delay_secs -= 1;
        } else {
            ctx.fan_released = true;
            info!("RUN: fan start delay elapsed");
        }
    }

    None
}

fn run_minute(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.process.remaining_minutes > 0 {
        ctx.process.remaining_minutes -= 1;
        ctx.request_persist();
    }
    if ctx.process.remaining_minutes == 0 {
        info!("RUN: drying complete");
        return Some(StateId::Cool);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  COOL state: heater off, fan purging residual heat
// ═══════════════════════════════════════════════════════════════════════════

fn cool_enter(ctx: &mut FsmContext) {
    ctx.process.cooling_minutes_remaining = ctx.config.cooling_minutes;
    info!("COOL: fan on for {} min", ctx.config.cooling_minutes);
}

fn cool_exit(ctx: &mut FsmContext) {
    ctx.process.cooling_minutes_remaining = 0;
}

fn cool_update(ctx: &mut FsmContext) -> Option<StateId> {
    if ctx.process.soft_off {
        return Some(StateId::Finish);
    }
    None
}

fn cool_minute(ctx: &mut FsmContext) -> Option<StateId> {
    ctx.process.cooling_minutes_remaining = ctx.process.cooling_minutes_remaining.saturating_sub(1);
    if ctx.process.cooling_minutes_remaining == 0 {
        info!("COOL: cooling complete");
        return Some(StateId::Finish);
    }
    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  FINISH state: idle, waiting for a new run
// ═══════════════════════════════════════════════════════════════════════════

fn finish_enter(_ctx: &mut FsmContext) {
    info!("FINISH: idle");
}

fn finish_update(ctx: &mut FsmContext) -> Option<StateId> {
    // Time set while stopped: resume without the boot fan delay.
    if ctx.process.remaining_minutes > 0 && !ctx.process.soft_off {
        ctx.fan_released = true;
        ctx.fan_delay_secs = 0;
        return Some(StateId::Run);
    }
    None
}
