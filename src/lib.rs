//! Drying-cabinet controller firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod error;
pub mod fsm;
pub mod safety;
pub mod scheduler;
pub mod timebase;
pub mod uplink;

mod pins;

// Hardware-facing modules; the ESP-IDF paths are guarded by cfg
// attributes inside, the host builds get simulation back-ends.
pub mod adapters;
pub mod control;
pub mod display;
pub mod drivers;
pub mod sensors;

#[cfg(target_os = "espidf")]
mod esp_link_shims;
