//! Actuator drivers, hardware initialisation, and peripheral helpers.

pub mod buzzer;
pub mod hw_init;
pub mod hw_timer;
pub mod relays;
pub mod task_pin;
pub mod tm1638;
pub mod watchdog;
