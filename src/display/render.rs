//! Segment-buffer rendering and grid transposition.
//!
//! [`render`] builds the logical buffer (one byte per digit, slot 8 for
//! the lamps) from a [`PanelView`].  [`transpose`] rearranges it into the
//! TM1638's grid-major RAM layout.  Both are pure.

use crate::error::FaultFlags;

use super::font::{self, DOT};

/// Revision banner shown for the first seconds after power-up.
pub const BANNER: &str = "H2TT0002";

/// Number of seven-segment digits.
pub const DIGITS: usize = 8;
/// Buffer slot holding the lamp register.
pub const LED_SLOT: usize = 8;
/// Digit carrying the blinking seconds indicator.
const BLINK_DIGIT: usize = 7;

/// Logical segment buffer: slots 0-7 are digits, 8 is the lamps, the
/// rest stay blank.
pub type SegmentBuffer = [u8; 16];

/// Everything the renderer looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelView {
    pub faults: FaultFlags,
    /// Inside the boot banner window.
    pub banner: bool,
    pub soft_off: bool,
    pub measured_temperature_c: f32,
    pub set_temperature_c: u16,
    pub remaining_minutes: u16,
    /// Lamp register (see `LedBits`).
    pub led_bits: u8,
    /// Seconds indicator phase.
    pub blink_on: bool,
}

/// Build the logical segment buffer.
///
/// Priority: fault code, then banner, then the normal readout
/// `TTSS HHMM` (temperature, setpoint, hours, minutes).  Soft-off
/// blanks everything except the fan lamp.
pub fn render(view: &PanelView) -> SegmentBuffer {
    let mut seg: SegmentBuffer = [0; 16];
    seg[LED_SLOT] = view.led_bits;

    if let Some(fault) = view.faults.highest() {
        put_str(&mut seg, 0, fault.code());
    } else if view.banner && !view.soft_off {
        put_str(&mut seg, 0, BANNER);
    } else {
        // `as` saturates: negative readings show 00.
        let temp = (view.measured_temperature_c as u16).min(99);
        put_num2(&mut seg, 0, temp);
        put_num2(&mut seg, 2, view.set_temperature_c.min(99));

        let hours = (view.remaining_minutes / 60).min(99);
        put_num2(&mut seg, 4, hours);
        put_num2(&mut seg, 6, view.remaining_minutes % 60);

        if view.blink_on {
            seg[BLINK_DIGIT] |= DOT;
        }
    }

    if view.soft_off {
        seg = [0; 16];
        seg[LED_SLOT] = view.led_bits & crate::control::LedBits::FAN;
    }
    seg
}

fn put_str(seg: &mut SegmentBuffer, pos: usize, s: &str) {
    for (i, c) in s.chars().take(DIGITS - pos).enumerate() {
        seg[pos + i] = font::glyph(c);
    }
}

fn put_num2(seg: &mut SegmentBuffer, pos: usize, n: u16) {
    seg[pos] = font::digit(n / 10);
    seg[pos + 1] = font::digit(n);
}

/// Map the logical buffer onto the TM1638 grid RAM.
///
/// Bit `g` of logical slot `s` lands in bit `s % 8` of grid byte
/// `2g` (slots 0-7) or `2g + 1` (slots 8-15).
pub fn transpose(seg: &SegmentBuffer) -> [u8; 16] {
    let mut grid = [0u8; 16];
    for (s, &byte) in seg.iter().enumerate() {
        let right = usize::from(s >= 8);
        for g in (right..16).step_by(2) {
            grid[g] |= ((byte >> (g / 2)) & 1) << (s % 8);
        }
    }
    grid
}

/// 1 Hz toggle for the seconds indicator, driven by the panel clock.
#[derive(Debug, Default)]
pub struct Blink {
    last_ms: u64,
    on: bool,
}

impl Blink {
    pub fn update(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_ms) >= 1_000 {
            self.last_ms = now_ms;
            self.on = !self.on;
        }
        self.on
    }
}
