//! One-shot hardware peripheral initialization.
//!
//! Configures ADC channels, GPIO directions and the zero-cross interrupt
//! using raw ESP-IDF sys calls. Called once from `main()` before the
//! control loop starts.  The panel lines are owned by `esp-idf-hal` pin
//! drivers and are not touched here.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use crate::error::{ActuatorError, Error, SensorError};

/// Map an ESP-IDF return code to an init error, logging the code.
#[cfg(target_os = "espidf")]
fn check_init(ret: i32, what: &'static str) -> Result<(), Error> {
    if ret == ESP_OK as i32 {
        Ok(())
    } else {
        log::error!("hw_init: {what} failed (rc={ret})");
        Err(Error::Init(what))
    }
}

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

/// Millivolts at the top of the 12-bit range.
pub const ADC_FULL_SCALE_MV: u32 = 3_300;
/// Highest raw count of the 12-bit converter.
pub const ADC_MAX_COUNTS: u32 = 4_095;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), Error> {
    // SAFETY: Called once from main() before the loops start; single-threaded.
    unsafe {
        init_adc()?;
        init_gpio_inputs()?;
        init_gpio_outputs()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), Error> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the init path or the control-loop
/// read path.  `init_adc()` completes before the loop starts.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), Error> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    check_init(
        unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) },
        "ADC1 unit",
    )?;

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };

    for ch in [
        pins::ADC1_CH_NTC_MAIN,
        pins::ADC1_CH_FAN_CURRENT,
        pins::ADC1_CH_AMBIENT_TEMP,
        pins::ADC1_CH_AMBIENT_RH,
    ] {
        check_init(
            unsafe { adc_oneshot_config_channel(adc1_handle(), ch, &chan_cfg) },
            "ADC1 channel",
        )?;
    }

    info!("hw_init: ADC1 configured (CH0=NTC, CH3=fan, CH6/7=ambient)");
    Ok(())
}

/// Raw 12-bit reading.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Result<u16, SensorError> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract, control-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return Err(SensorError::AdcReadFailed);
    }
    Ok(raw.clamp(0, ADC_MAX_COUNTS as i32) as u16)
}

/// No converter on the host; the sensor layer reads its sim inputs.
#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> Result<u16, SensorError> {
    Err(SensorError::AdcReadFailed)
}

pub fn counts_to_mv(counts: u16) -> u16 {
    (u32::from(counts) * ADC_FULL_SCALE_MV / ADC_MAX_COUNTS) as u16
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), Error> {
    let input_pins = [
        pins::POWER_SWITCH_GPIO,
        pins::OVERHEAT_GPIO,
        pins::ZERO_CROSS_GPIO,
    ];

    for &pin in &input_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        check_init(unsafe { gpio_config(&cfg) }, "GPIO input")?;
    }

    info!("hw_init: GPIO inputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: read-only register access on an already-configured input.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), Error> {
    let output_pins = [
        pins::FAN_GPIO,
        pins::HEATER_GPIO,
        pins::AUX0_GPIO,
        pins::AUX1_GPIO,
        pins::AUX2_GPIO,
        pins::DAMPER_GPIO,
        pins::BUZZER_GPIO,
    ];

    for &pin in &output_pins {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        check_init(unsafe { gpio_config(&cfg) }, "GPIO output")?;
        // Every relay starts released: heater off, fan off, damper open.
        unsafe { gpio_set_level(pin, 0) };
    }

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) -> Result<(), ActuatorError> {
    // SAFETY: gpio_set_level on an output configured in init_gpio_outputs().
    let ret = unsafe { gpio_set_level(pin, u32::from(high)) };
    if ret == ESP_OK as i32 {
        Ok(())
    } else {
        Err(ActuatorError::GpioWriteFailed)
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) -> Result<(), ActuatorError> {
    Ok(())
}

// ── Zero-cross ISR ────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn zero_cross_isr(_arg: *mut core::ffi::c_void) {
    crate::timebase::TIME_BASE.on_zero_cross();
}

/// Install the GPIO ISR service and attach the zero-cross handler.
/// Only used when the time base runs from the mains.
#[cfg(target_os = "espidf")]
pub fn init_zero_cross_isr() -> Result<(), Error> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed.  The handler only touches atomics.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_ERR_INVALID_STATE as i32 {
            check_init(ret, "GPIO ISR service")?;
        }

        gpio_set_intr_type(pins::ZERO_CROSS_GPIO, gpio_int_type_t_GPIO_INTR_ANYEDGE);
        gpio_isr_handler_add(pins::ZERO_CROSS_GPIO, Some(zero_cross_isr), core::ptr::null_mut());
        gpio_intr_enable(pins::ZERO_CROSS_GPIO);
    }
    info!("hw_init: zero-cross ISR installed");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_zero_cross_isr() -> Result<(), Error> {
    log::info!("hw_init(sim): zero-cross ISR skipped");
    Ok(())
}
