//! Key-scan decoding, auto-repeat and the power switch.

/// Logical keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    None,
    Mode,
    TempUp,
    TempDown,
    TimeUp,
    TimeDown,
    DamperToggle,
    /// TEMP_DOWN + TEMP_UP + the service bit held together.
    Combo,
}

const BIT_TIME_DOWN: u32 = 1 << 1;
const BIT_TEMP_UP: u32 = 1 << 2;
const BIT_TIME_UP: u32 = 1 << 5;
const BIT_TEMP_DOWN: u32 = 1 << 6;
const BIT_DAMPER: u32 = 1 << 9;
const BIT_MODE: u32 = 1 << 10;
const BIT_SERVICE: u32 = 1 << 18;

const COMBO_MASK: u32 = BIT_TEMP_DOWN | BIT_TEMP_UP | BIT_SERVICE;

/// Later entries win when several keys are down.
const KEY_ORDER: [(u32, KeyEvent); 6] = [
    (BIT_MODE, KeyEvent::Mode),
    (BIT_TIME_DOWN, KeyEvent::TimeDown),
    (BIT_TIME_UP, KeyEvent::TimeUp),
    (BIT_TEMP_DOWN, KeyEvent::TempDown),
    (BIT_TEMP_UP, KeyEvent::TempUp),
    (BIT_DAMPER, KeyEvent::DamperToggle),
];

/// Map a 32-bit key-scan vector to a logical key.  Bits with no key
/// assigned are ignored.
pub fn decode(scan: u32) -> KeyEvent {
    if scan & COMBO_MASK == COMBO_MASK {
        return KeyEvent::Combo;
    }
    KEY_ORDER
        .iter()
        .rev()
        .find(|(bit, _)| scan & bit != 0)
        .map_or(KeyEvent::None, |(_, key)| *key)
}

/// Guard before a held key starts repeating.
pub const REPEAT_DELAY_MS: u64 = 300;
/// Auto-repeat period.
pub const REPEAT_PERIOD_MS: u64 = 100;
/// Width of the window at the start of each period in which a poll fires.
pub const REPEAT_WINDOW_MS: u64 = 20;

/// First press fires at once; a held key fires again after
/// [`REPEAT_DELAY_MS`], then once per [`REPEAT_PERIOD_MS`] window.
#[derive(Debug)]
pub struct KeyDebouncer {
    last: KeyEvent,
    pressed_at_ms: u64,
    presses: u32,
    /// Repeat window that already fired.
    fired_window: Option<u64>,
}

impl Default for KeyDebouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDebouncer {
    pub const fn new() -> Self {
        Self {
            last: KeyEvent::None,
            pressed_at_ms: 0,
            presses: 0,
            fired_window: None,
        }
    }

    pub fn poll(&mut self, key: KeyEvent, now_ms: u64) -> Option<KeyEvent> {
        if key == KeyEvent::None {
            self.reset();
            return None;
        }

        if key != self.last {
            self.last = key;
            self.pressed_at_ms = now_ms;
            self.presses = 1;
            self.fired_window = None;
            return Some(key);
        }

        self.presses = self.presses.saturating_add(1);
        let held = now_ms.saturating_sub(self.pressed_at_ms);
        if held < REPEAT_DELAY_MS {
            return None;
        }
        let since = held - REPEAT_DELAY_MS;
        let window = since / REPEAT_PERIOD_MS;
        if since % REPEAT_PERIOD_MS < REPEAT_WINDOW_MS && self.fired_window != Some(window) {
            self.fired_window = Some(window);
            return Some(key);
        }
        None
    }

    /// Polls seen for the current key, including the first.
    pub fn presses(&self) -> u32 {
        self.presses
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

/// Undebounced power switch.  LOW means on.  Any level change flips
/// soft-off directly.
#[derive(Debug)]
pub struct PowerSwitch {
    last_high: bool,
}

impl Default for PowerSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerSwitch {
    /// The line idles high, so a switch already on at boot reports a
    /// change on the first sample.
    pub const fn new() -> Self {
        Self { last_high: true }
    }

    /// Returns the new soft-off value on a level change.
    pub fn sample(&mut self, high: bool) -> Option<bool> {
        if high == self.last_high {
            return None;
        }
        self.last_high = high;
        Some(high)
    }
}

/// Setpoint after one TEMP key press.
pub fn adjust_temperature(current: u16, up: bool, max: u16) -> u16 {
    if up {
        current.saturating_add(1).min(max)
    } else {
        current.saturating_sub(1).min(max)
    }
}

/// Remaining time after one TIME key press: round up to the next
/// `step` boundary, move one step, clamp to `[0, max]`.
pub fn adjust_time(current: u16, up: bool, step: u16, max: u16) -> u16 {
    if step == 0 {
        return current.min(max);
    }
    let aligned = u32::from(current).div_ceil(u32::from(step)) * u32::from(step);
    let next = if up {
        aligned + u32::from(step)
    } else {
        aligned.saturating_sub(u32::from(step))
    };
    u16::try_from(next.min(u32::from(max))).unwrap_or(max)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn time_lands_on_step(current in 0u16..=12_000, up in any::<bool>()) {
            let t = adjust_time(current, up, 30, 12_000);
            prop_assert!(t <= 12_000);
            prop_assert_eq!(t % 30, 0);
        }

        #[test]
        fn temperature_stays_in_range(current in 0u16..=70, up in any::<bool>()) {
            let t = adjust_temperature(current, up, 70);
            prop_assert!(t <= 70);
            prop_assert!(t.abs_diff(current) <= 1);
        }
    }
}
