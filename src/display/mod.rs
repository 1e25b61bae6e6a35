//! Front panel: eight seven-segment digits, a lamp register and a key
//! matrix behind one TM1638.
//!
//! Everything here is pure.  The bus itself lives in
//! [`crate::drivers::tm1638`]; the panel adapter glues the two together.

pub mod font;
pub mod keypad;
pub mod render;

pub use keypad::{KeyDebouncer, KeyEvent, PowerSwitch};
pub use render::{PanelView, SegmentBuffer, render, transpose};
