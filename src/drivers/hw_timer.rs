//! Periodic 1 Hz `esp_timer` feeding the [`TIME_BASE`].
//!
//! Mode A of the time base.  The callback runs in the esp_timer task
//! context and only touches atomics.  On host builds there is no timer;
//! the simulator calls `TIME_BASE.on_timer_tick()` itself.
//!
//! [`TIME_BASE`]: crate::timebase::TIME_BASE

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
static mut SECOND_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: SECOND_TIMER is written once in `start_second_timer()` before
/// any callback fires.  Only called from the main task.
#[cfg(target_os = "espidf")]
unsafe fn second_timer() -> esp_timer_handle_t { unsafe { SECOND_TIMER } }

#[cfg(target_os = "espidf")]
unsafe extern "C" fn second_tick_cb(_arg: *mut core::ffi::c_void) {
    crate::timebase::TIME_BASE.on_timer_tick();
}

/// Start the 1 s periodic timer.
#[cfg(target_os = "espidf")]
pub fn start_second_timer() {
    // SAFETY: SECOND_TIMER is written here once at boot from the main
    // task before the callback can fire.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(second_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"second".as_ptr(),
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, &raw mut SECOND_TIMER);
        if ret != ESP_OK {
            log::error!("hw_timer: create failed (rc={ret}), no second ticks");
            return;
        }
        let ret = esp_timer_start_periodic(SECOND_TIMER, 1_000_000);
        if ret != ESP_OK {
            log::error!("hw_timer: start failed (rc={ret})");
            return;
        }
        info!("hw_timer: 1 Hz time base started");
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn start_second_timer() {
    log::info!("hw_timer(sim): timer not started (ticks driven by the simulator)");
}

/// Stop the periodic timer.
#[cfg(target_os = "espidf")]
pub fn stop_second_timer() {
    // SAFETY: null-check covers a failed start.
    unsafe {
        let t = second_timer();
        if !t.is_null() { esp_timer_stop(t); }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_second_timer() {}
