//! Piezo buzzer: fixed 50 ms confirmation / alert pulse.
//!
//! The pulse is a short busy wait on the calling thread.  On host builds
//! the wait is skipped and pulses are counted for tests.

use core::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use crate::drivers::hw_init;
use crate::pins;

/// Pulse length.
pub const BEEP: Duration = Duration::from_millis(50);

static BEEP_COUNT: AtomicU32 = AtomicU32::new(0);

/// Total pulses emitted since boot.
pub fn beep_count() -> u32 {
    BEEP_COUNT.load(Ordering::Relaxed)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Buzzer;

impl Buzzer {
    pub const fn new() -> Self {
        Self
    }

    pub fn beep(&self) {
        BEEP_COUNT.fetch_add(1, Ordering::Relaxed);
        let on = hw_init::gpio_write(pins::BUZZER_GPIO, true);
        #[cfg(target_os = "espidf")]
        std::thread::sleep(BEEP);
        let off = hw_init::gpio_write(pins::BUZZER_GPIO, false);
        if let Err(e) = on.and(off) {
            log::warn!("buzzer: {e}");
        }
    }
}
