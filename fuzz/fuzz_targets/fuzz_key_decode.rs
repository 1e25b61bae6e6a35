//! Fuzz target: `keypad::decode` and the repeat debouncer
//!
//! Interprets the input as a stream of (scan vector, elapsed ms) pairs
//! and feeds them through decode and the debouncer.  A held key may
//! never fire more than once per poll, and unassigned bits never fire.
//!
//! cargo fuzz run fuzz_key_decode

#![no_main]

use dryerctl::display::keypad::{self, KeyDebouncer, KeyEvent};
use libfuzzer_sys::fuzz_target;

const KEY_BITS: u32 = (1 << 1) | (1 << 2) | (1 << 5) | (1 << 6) | (1 << 9) | (1 << 10);

fuzz_target!(|data: &[u8]| {
    let mut debouncer = KeyDebouncer::new();
    let mut now_ms = 0u64;

    for chunk in data.chunks_exact(5) {
        let scan = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        now_ms += u64::from(chunk[4]);

        let key = keypad::decode(scan);
        if scan & KEY_BITS == 0 {
            assert_eq!(key, KeyEvent::None, "unassigned bits fired {key:?}");
        }
        if let Some(fired) = debouncer.poll(key, now_ms) {
            assert_eq!(fired, key);
            assert_ne!(fired, KeyEvent::None);
        }
    }
});
