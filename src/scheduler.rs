//! Report scheduler.
//!
//! Driven by the one-second tick.  When a schedule fires it notifies a
//! [`SchedulerDelegate`]; the control loop implements the delegate to
//! publish telemetry or queue an upload record.
//!
//! ```text
//!   second tick ──▶ Scheduler::tick ──▶ SchedulerDelegate
//!                                         ├─ "telemetry" → telemetry frame
//!                                         └─ "upload"    → upload record
//! ```

use crate::app::ports::{ScheduleFiredKind, SchedulerDelegate};
use crate::config::DryerConfig;
use log::info;

pub const TELEMETRY: &str = "telemetry";
pub const UPLOAD: &str = "upload";

/// A single schedule entry.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub label: &'static str,
    pub kind: ScheduleKind,
    pub enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleKind {
    /// Fire every `interval_secs` seconds.
    Periodic { interval_secs: u32 },
    /// Fire once after `delay_secs`, then auto-disable.
    OneShot { delay_secs: u32 },
}

const MAX_SCHEDULES: usize = 4;

pub struct Scheduler {
    schedules: [Option<ScheduleEntry>; MAX_SCHEDULES],
    enabled: bool,
}

#[derive(Debug, Clone)]
struct ScheduleEntry {
    schedule: Schedule,
    elapsed_secs: u32,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            schedules: [None, None, None, None],
            enabled: true,
        }
    }

    /// The stock report plan: one telemetry frame right after the boot
    /// banner, then telemetry and upload at their configured intervals.
    pub fn for_config(cfg: &DryerConfig) -> Self {
        let mut s = Self::new();
        s.add(Schedule {
            label: TELEMETRY,
            kind: ScheduleKind::OneShot {
                delay_secs: u32::from(cfg.boot_banner_secs) + 1,
            },
            enabled: true,
        });
        s.add(Schedule {
            label: TELEMETRY,
            kind: ScheduleKind::Periodic {
                interval_secs: cfg.telemetry_interval_secs,
            },
            enabled: cfg.telemetry_interval_secs > 0,
        });
        s.add(Schedule {
            label: UPLOAD,
            kind: ScheduleKind::Periodic {
                interval_secs: cfg.upload_interval_secs,
            },
            enabled: cfg.upload_interval_secs > 0,
        });
        s
    }

    /// Add a schedule.  Returns the slot index, or `None` if full.
    pub fn add(&mut self, schedule: Schedule) -> Option<usize> {
        let (i, slot) = self
            .schedules
            .iter_mut()
            .enumerate()
            .find(|(_, s)| s.is_none())?;
        info!("Scheduler: added '{}' {:?} at slot {}", schedule.label, schedule.kind, i);
        *slot = Some(ScheduleEntry {
            schedule,
            elapsed_secs: 0,
        });
        Some(i)
    }

    pub fn remove(&mut self, slot: usize) {
        if let Some(s) = self.schedules.get_mut(slot) {
            *s = None;
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Advance every schedule by one second.
    pub fn tick(&mut self, delegate: &mut dyn SchedulerDelegate) {
        if !self.enabled {
            return;
        }

        for entry in self.schedules.iter_mut().flatten() {
            if !entry.schedule.enabled {
                continue;
            }
            entry.elapsed_secs = entry.elapsed_secs.saturating_add(1);

            match entry.schedule.kind {
                ScheduleKind::Periodic { interval_secs } => {
                    if entry.elapsed_secs >= interval_secs {
                        delegate.on_schedule_fired(entry.schedule.label, ScheduleFiredKind::Periodic);
                        entry.elapsed_secs = 0;
                    }
                }
                ScheduleKind::OneShot { delay_secs } => {
                    if entry.elapsed_secs >= delay_secs {
                        info!(
                            "Scheduler: '{}' one-shot fired (after {}s)",
                            entry.schedule.label, delay_secs
                        );
                        delegate.on_schedule_fired(entry.schedule.label, ScheduleFiredKind::OneShot);
                        entry.schedule.enabled = false;
                    }
                }
            }
        }
    }

    /// Number of enabled schedules.
    pub fn active_count(&self) -> usize {
        self.schedules
            .iter()
            .flatten()
            .filter(|e| e.schedule.enabled)
            .count()
    }
}
