//! Interrupt-driven second/minute time base.
//!
//! Producers are the 1 Hz `esp_timer` callback (Mode A) or the AC
//! zero-cross GPIO ISR (Mode B).  The consumer is the control loop,
//! which polls and clears the pending flags.
//!
//! ```text
//! ┌──────────────┐                ┌─────────────────┐
//! │ esp_timer 1Hz│──on_timer_tick▶│                 │  take_second()
//! └──────────────┘                │  TimeBase       │──────────────▶ control loop
//! ┌──────────────┐                │  (atomics only) │  take_minute()
//! │ zero-cross   │─on_zero_cross─▶│                 │──────────────▶
//! │ ISR (2×line) │                └─────────────────┘
//! └──────────────┘
//! ```
//!
//! Pending flags are booleans, not counters: a consumer that stalls for
//! several seconds sees a single tick.  Producers never block, allocate
//! or log.

use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

/// Seconds per minute tick.
pub const SECONDS_PER_MINUTE: u16 = 60;

/// Default zero-cross edges per second (60 Hz mains, both edges).
pub const DEFAULT_EDGES_PER_SECOND: u16 = 120;

/// Lock-free second/minute flag pair shared between ISR and main loop.
pub struct TimeBase {
    second_pending: AtomicBool,
    minute_pending: AtomicBool,
    /// Seconds counted towards the next minute.
    sub_minute: AtomicU16,
    /// Zero-cross edges counted towards the next second.
    edges: AtomicU16,
    edges_per_second: AtomicU16,
    /// Total seconds produced since boot (diagnostics only).
    seconds_total: AtomicU32,
}

impl TimeBase {
    pub const fn new() -> Self {
        Self {
            second_pending: AtomicBool::new(false),
            minute_pending: AtomicBool::new(false),
            sub_minute: AtomicU16::new(0),
            edges: AtomicU16::new(0),
            edges_per_second: AtomicU16::new(DEFAULT_EDGES_PER_SECOND),
            seconds_total: AtomicU32::new(0),
        }
    }

    /// Configure Mode B divisor.  Call before enabling the interrupt.
    pub fn set_edges_per_second(&self, edges: u16) {
        self.edges_per_second.store(edges.max(1), Ordering::Relaxed);
        self.edges.store(0, Ordering::Relaxed);
    }

    /// Mode A: one call per elapsed second.  ISR-safe.
    pub fn on_timer_tick(&self) {
        self.second_elapsed();
    }

    /// Mode B: one call per zero-cross edge.  ISR-safe.
    pub fn on_zero_cross(&self) {
        let per_sec = self.edges_per_second.load(Ordering::Relaxed);
        let n = self.edges.load(Ordering::Relaxed).wrapping_add(1);
        if n >= per_sec {
            self.edges.store(0, Ordering::Relaxed);
            self.second_elapsed();
        } else {
            self.edges.store(n, Ordering::Relaxed);
        }
    }

    /// Consume the pending second flag.  Returns `true` at most once per
    /// producer second.
    pub fn take_second(&self) -> bool {
        self.second_pending.swap(false, Ordering::AcqRel)
    }

    /// Consume the pending minute flag.
    pub fn take_minute(&self) -> bool {
        self.minute_pending.swap(false, Ordering::AcqRel)
    }

    /// Total seconds produced since boot.
    pub fn seconds_total(&self) -> u32 {
        self.seconds_total.load(Ordering::Relaxed)
    }

    fn second_elapsed(&self) {
        self.seconds_total.fetch_add(1, Ordering::Relaxed);
        let s = self.sub_minute.load(Ordering::Relaxed) + 1;
        if s >= SECONDS_PER_MINUTE {
            self.sub_minute.store(0, Ordering::Relaxed);
            self.minute_pending.store(true, Ordering::Release);
        } else {
            self.sub_minute.store(s, Ordering::Relaxed);
        }
        self.second_pending.store(true, Ordering::Release);
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        Self::new()
    }
}

/// The board-wide time base fed by `hw_timer` / the zero-cross ISR.
pub static TIME_BASE: TimeBase = TimeBase::new();
