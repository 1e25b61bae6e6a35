//! Function-pointer finite state machine engine for the drying process.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │  StateTable                                                           │
//! │  ┌─────────┬──────────┬──────────┬───────────────────┬──────────────┐ │
//! │  │ StateId │ on_enter │ on_exit  │ on_update (1 s)   │ on_minute    │ │
//! │  ├─────────┼──────────┼──────────┼───────────────────┼──────────────┤ │
//! │  │ Run     │ fn(ctx)  │ -        │ fn(ctx)->Option<> │ fn(ctx)->... │ │
//! │  │ Cool    │ fn(ctx)  │ fn(ctx)  │ fn(ctx)->Option<> │ fn(ctx)->... │ │
//! │  │ Finish  │ fn(ctx)  │ -        │ fn(ctx)->Option<> │ -            │ │
//! │  └─────────┴──────────┴──────────┴───────────────────┴──────────────┘ │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The second tick calls `on_update`, the minute tick calls `on_minute`.
//! A `Some(next)` return runs `on_exit(current)`, then `on_enter(next)`.
//! Every transition writes the new state into `ctx.process.dry_state`
//! and requests a save.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Drying process states.  The discriminants are the persisted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StateId {
    Run = 0,
    Cool = 1,
    Finish = 2,
}

impl StateId {
    /// Total number of states, used to size the table array.
    pub const COUNT: usize = 3;

    /// Decode a persisted value.
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Run),
            1 => Some(Self::Cool),
            2 => Some(Self::Finish),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Run => "Run",
            Self::Cool => "Cool",
            Self::Finish => "Finish",
        }
    }

    /// Upper-case name used in telemetry frames.
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Run => "RUN",
            Self::Cool => "COOL",
            Self::Finish => "FINISH",
        }
    }
}

impl core::fmt::Display for StateId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Signature for `on_enter` and `on_exit` actions.
pub type StateActionFn = fn(&mut FsmContext);

/// Signature for tick handlers.  `Some(next)` triggers a transition.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<StateId>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
pub struct StateDescriptor {
    pub id: StateId,
    pub name: &'static str,
    pub on_enter: Option<StateActionFn>,
    pub on_exit: Option<StateActionFn>,
    pub on_update: StateUpdateFn,
    pub on_minute: Option<StateUpdateFn>,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
pub struct Fsm {
    table: [StateDescriptor; StateId::COUNT],
    current: usize,
}

impl Fsm {
    pub fn new(table: [StateDescriptor; StateId::COUNT], initial: StateId) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Run the initial `on_enter` for the starting state.
    pub fn start(&mut self, ctx: &mut FsmContext) {
        info!("FSM starting in state: {}", self.table[self.current].name);
        ctx.process.dry_state = self.current_state();
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Advance the FSM by one second.
    pub fn tick(&mut self, ctx: &mut FsmContext) {
        if let Some(next) = (self.table[self.current].on_update)(ctx) {
            self.transition(next, ctx);
        }
    }

    /// Deliver a minute tick.
    pub fn minute(&mut self, ctx: &mut FsmContext) {
        if let Some(on_minute) = self.table[self.current].on_minute {
            if let Some(next) = on_minute(ctx) {
                self.transition(next, ctx);
            }
        }
    }

    /// Force an immediate transition (soft power-off, remote commands).
    pub fn force_transition(&mut self, next: StateId, ctx: &mut FsmContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_state(&self) -> StateId {
        self.table[self.current].id
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next_id: StateId, ctx: &mut FsmContext) {
        let next_idx = next_id as usize;

        info!(
            "FSM transition: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        ctx.process.dry_state = next_id;
        ctx.request_persist();

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::context::{FsmContext, PersistedState};
    use super::*;
    use crate::config::DryerConfig;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Event {
        Second,
        Minute,
        SetTime(u16),
    }

    fn arb_event() -> impl Strategy<Value = Event> {
        prop_oneof![
            4 => Just(Event::Second),
            4 => Just(Event::Minute),
            1 => (0u16..200).prop_map(Event::SetTime),
        ]
    }

    proptest! {
        #[test]
        fn cool_is_never_skipped_and_never_reverts(
            start in 0u16..10,
            events in proptest::collection::vec(arb_event(), 1..300),
        ) {
            let p = PersistedState {
                remaining_minutes: start,
                set_temperature_c: 50,
                auto_damper: false,
                soft_off: false,
                dry_state: StateId::Run,
            };
            let mut ctx = FsmContext::new(DryerConfig::default(), p.into());
            let mut fsm = Fsm::new(states::build_state_table(), StateId::Run);
            fsm.start(&mut ctx);

            let mut prev = fsm.current_state();
            for ev in events {
                match ev {
                    Event::Second => fsm.tick(&mut ctx),
                    Event::Minute => fsm.minute(&mut ctx),
                    Event::SetTime(m) => ctx.process.remaining_minutes = m,
                }
                let now = fsm.current_state();
                match (prev, now) {
                    (StateId::Run, StateId::Finish) => prop_assert!(false, "RUN skipped COOL"),
                    (StateId::Cool, StateId::Run) => prop_assert!(false, "COOL reverted to RUN"),
                    (StateId::Finish, StateId::Cool) => prop_assert!(false, "FINISH entered COOL"),
                    _ => {}
                }
                prop_assert_eq!(ctx.process.dry_state, now);
                prev = now;
            }
        }
    }
}
