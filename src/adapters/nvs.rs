//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] and [`ProcessStore`] for the dryer.
//!
//! - Config: one postcard blob under `dryer/syscfg`, range-checked
//!   before it is written.
//! - Process state: one typed NVS entry per field (`u16` for minutes and
//!   setpoint, `u8` for flags and the FSM state).
//! - NVS keys are limited to 15 characters; longer names are truncated
//!   identically on both backends.
//! - Each setter is followed by `nvs_commit()`, which ESP-IDF applies
//!   atomically.

use crate::app::ports::{ConfigError, ConfigPort, ProcessStore};
use crate::config::{DryerConfig, TimeBaseMode};
use crate::error::PersistError;
use crate::fsm::StateId;
use crate::fsm::context::PersistedState;
use log::{info, warn};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const NAMESPACE: &str = "dryer";
const CONFIG_KEY: &str = "syscfg";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 4000;

/// Longest key NVS accepts.
const NVS_KEY_MAX: usize = 15;

const KEY_REMAINING: &str = "remaining_minutes";
const KEY_SET_TEMPERATURE: &str = "set_temperature";
const KEY_AUTO_DAMPER: &str = "auto_damper";
const KEY_SOFT_OFF: &str = "soft_off";
const KEY_DRY_STATE: &str = "dry_state";

/// NUL-terminated, truncated key.
#[cfg(target_os = "espidf")]
fn nvs_key(key: &str) -> [u8; NVS_KEY_MAX + 1] {
    let mut buf = [0u8; NVS_KEY_MAX + 1];
    let kb = key.as_bytes();
    let kl = kb.len().min(NVS_KEY_MAX);
    buf[..kl].copy_from_slice(&kb[..kl]);
    buf
}

/// One stored entry, tagged with its NVS type.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Clone, PartialEq)]
enum SimEntry {
    U8(u8),
    U16(u16),
    Blob(Vec<u8>),
}

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, SimEntry>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// Returns `Err(ConfigError::IoError)` if flash initialisation fails
    /// unrecoverably. On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any other NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK
                {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self::unopened())
    }

    fn unopened() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn sim_key(key: &str) -> String {
        key[..key.len().min(NVS_KEY_MAX)].to_string()
    }

    /// Overwrite one process key with a raw `u8`, as a stale or foreign
    /// firmware image might have left it.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_u8(&self, key: &str, value: u8) {
        self.store
            .borrow_mut()
            .insert(Self::sim_key(key), SimEntry::U8(value));
    }

    /// Open the `dryer` namespace, run `f` with the handle, then close it.
    #[cfg(target_os = "espidf")]
    fn with_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = nvs_key(NAMESPACE);
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let mut handle: nvs_handle_t = 0;
        let ret = unsafe { nvs_open(ns.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe { nvs_close(handle) };
        result
    }

    /// Map a typed getter's return code: missing keys are `None`.
    #[cfg(target_os = "espidf")]
    fn get_result<T>(ret: i32, value: T) -> Result<Option<T>, i32> {
        if ret == ESP_ERR_NVS_NOT_FOUND {
            Ok(None)
        } else if ret != ESP_OK {
            Err(ret)
        } else {
            Ok(Some(value))
        }
    }

    #[cfg(target_os = "espidf")]
    fn persist_error(ret: i32) -> PersistError {
        if ret == ESP_ERR_NVS_TYPE_MISMATCH {
            PersistError::Corrupted
        } else {
            warn!("NvsAdapter: NVS error {ret}");
            PersistError::Unavailable
        }
    }

    fn get_u8(&self, key: &str) -> Result<Option<u8>, PersistError> {
        #[cfg(not(target_os = "espidf"))]
        {
            match self.store.borrow().get(&Self::sim_key(key)) {
                None => Ok(None),
                Some(SimEntry::U8(v)) => Ok(Some(*v)),
                Some(_) => Err(PersistError::Corrupted),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let k = nvs_key(key);
            Self::with_handle(false, |handle| {
                let mut v: u8 = 0;
                let ret = unsafe { nvs_get_u8(handle, k.as_ptr() as *const _, &mut v) };
                Self::get_result(ret, v)
            })
            .or_else(|e| {
                // A namespace that was never opened for writing holds nothing.
                if e == ESP_ERR_NVS_NOT_FOUND {
                    Ok(None)
                } else {
                    Err(Self::persist_error(e))
                }
            })
        }
    }

    fn get_u16(&self, key: &str) -> Result<Option<u16>, PersistError> {
        #[cfg(not(target_os = "espidf"))]
        {
            match self.store.borrow().get(&Self::sim_key(key)) {
                None => Ok(None),
                Some(SimEntry::U16(v)) => Ok(Some(*v)),
                Some(_) => Err(PersistError::Corrupted),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let k = nvs_key(key);
            Self::with_handle(false, |handle| {
                let mut v: u16 = 0;
                let ret = unsafe { nvs_get_u16(handle, k.as_ptr() as *const _, &mut v) };
                Self::get_result(ret, v)
            })
            .or_else(|e| {
                if e == ESP_ERR_NVS_NOT_FOUND {
                    Ok(None)
                } else {
                    Err(Self::persist_error(e))
                }
            })
        }
    }

    fn set_u8(&mut self, key: &str, value: u8) -> Result<(), PersistError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.sim_set_u8(key, value);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let k = nvs_key(key);
            Self::with_handle(true, |handle| {
                let ret = unsafe { nvs_set_u8(handle, k.as_ptr() as *const _, value) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                match unsafe { nvs_commit(handle) } {
                    ESP_OK => Ok(()),
                    e => Err(e),
                }
            })
            .map_err(Self::persist_error)
        }
    }

    fn set_u16(&mut self, key: &str, value: u16) -> Result<(), PersistError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(Self::sim_key(key), SimEntry::U16(value));
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let k = nvs_key(key);
            Self::with_handle(true, |handle| {
                let ret = unsafe { nvs_set_u16(handle, k.as_ptr() as *const _, value) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                match unsafe { nvs_commit(handle) } {
                    ESP_OK => Ok(()),
                    e => Err(e),
                }
            })
            .map_err(Self::persist_error)
        }
    }
}

/// Range-check every field.  Invalid values are rejected, never clamped.
pub fn validate_config(cfg: &DryerConfig) -> Result<(), ConfigError> {
    if !(0.1..=10.0).contains(&cfg.hysteresis_c) {
        return Err(ConfigError::ValidationFailed("hysteresis_c must be 0.1–10.0"));
    }
    if !(1..=99).contains(&cfg.max_set_temperature_c) {
        return Err(ConfigError::ValidationFailed(
            "max_set_temperature_c must be 1–99",
        ));
    }
    if !(40.0..=120.0).contains(&cfg.high_temp_limit_c) {
        return Err(ConfigError::ValidationFailed(
            "high_temp_limit_c must be 40.0–120.0",
        ));
    }
    if f32::from(cfg.max_set_temperature_c) >= cfg.high_temp_limit_c {
        return Err(ConfigError::ValidationFailed(
            "max_set_temperature_c must be < high_temp_limit_c",
        ));
    }
    if !(1..=3600).contains(&cfg.high_temp_secs) {
        return Err(ConfigError::ValidationFailed("high_temp_secs must be 1–3600"));
    }
    if !(1..=60).contains(&cfg.cooling_minutes) {
        return Err(ConfigError::ValidationFailed("cooling_minutes must be 1–60"));
    }
    if cfg.fan_start_delay_secs > 60 {
        return Err(ConfigError::ValidationFailed(
            "fan_start_delay_secs must be 0–60",
        ));
    }
    if cfg.boot_banner_secs > 10 {
        return Err(ConfigError::ValidationFailed("boot_banner_secs must be 0–10"));
    }
    if !(1..=120).contains(&cfg.time_step_minutes) {
        return Err(ConfigError::ValidationFailed("time_step_minutes must be 1–120"));
    }
    if !(1..=12_000).contains(&cfg.max_remaining_minutes)
        || cfg.max_remaining_minutes % cfg.time_step_minutes != 0
    {
        return Err(ConfigError::ValidationFailed(
            "max_remaining_minutes must be 1–12000 and a multiple of time_step_minutes",
        ));
    }
    if !(1..=60).contains(&cfg.fan_stall_secs) {
        return Err(ConfigError::ValidationFailed("fan_stall_secs must be 1–60"));
    }
    if !(1..=60).contains(&cfg.alert_interval_secs) {
        return Err(ConfigError::ValidationFailed("alert_interval_secs must be 1–60"));
    }
    if !(500..=60_000).contains(&cfg.persist_settle_ms) {
        return Err(ConfigError::ValidationFailed(
            "persist_settle_ms must be 500–60000",
        ));
    }
    if !(10..=500).contains(&cfg.key_poll_ms) {
        return Err(ConfigError::ValidationFailed("key_poll_ms must be 10–500"));
    }
    if !(20..=1000).contains(&cfg.display_refresh_ms) {
        return Err(ConfigError::ValidationFailed(
            "display_refresh_ms must be 20–1000",
        ));
    }
    if cfg.brightness > 7 {
        return Err(ConfigError::ValidationFailed("brightness must be 0–7"));
    }
    if let TimeBaseMode::ZeroCross { edges_per_second } = cfg.timebase {
        if !(1..=240).contains(&edges_per_second) {
            return Err(ConfigError::ValidationFailed(
                "zero-cross edges_per_second must be 1–240",
            ));
        }
    }
    if !(5..=3600).contains(&cfg.telemetry_interval_secs) {
        return Err(ConfigError::ValidationFailed(
            "telemetry_interval_secs must be 5–3600",
        ));
    }
    if !(30..=86_400).contains(&cfg.upload_interval_secs) {
        return Err(ConfigError::ValidationFailed(
            "upload_interval_secs must be 30–86400",
        ));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<DryerConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            match self.store.borrow().get(CONFIG_KEY) {
                Some(SimEntry::Blob(bytes)) => {
                    let cfg: DryerConfig =
                        postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsAdapter: loaded config from store");
                    Ok(cfg)
                }
                Some(_) => Err(ConfigError::Corrupted),
                None => {
                    info!("NvsAdapter: no stored config, using defaults");
                    Ok(DryerConfig::default())
                }
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let k = nvs_key(CONFIG_KEY);
            let result = Self::with_handle(false, |handle| {
                let mut size: usize = 0;
                // Size query first.
                let ret = unsafe {
                    nvs_get_blob(handle, k.as_ptr() as *const _, core::ptr::null_mut(), &mut size)
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                if size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ESP_ERR_NVS_INVALID_LENGTH);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        k.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(buf)
            });

            match result {
                Ok(bytes) => {
                    let cfg: DryerConfig =
                        postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsAdapter: loaded config from NVS ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NvsAdapter: no stored config, using defaults");
                    Ok(DryerConfig::default())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS read error {e}, using defaults");
                    Ok(DryerConfig::default())
                }
            }
        }
    }

    fn save(&self, config: &DryerConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(CONFIG_KEY.to_string(), SimEntry::Blob(bytes));
            info!("NvsAdapter: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let k = nvs_key(CONFIG_KEY);
            let result = Self::with_handle(true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        k.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                match unsafe { nvs_commit(handle) } {
                    ESP_OK => Ok(()),
                    e => Err(e),
                }
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE => Err(ConfigError::StorageFull),
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {e}");
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

impl ProcessStore for NvsAdapter {
    fn load(&self) -> Result<Option<PersistedState>, PersistError> {
        // `dry_state` is written last; without it nothing was ever saved.
        let Some(raw_state) = self.get_u8(KEY_DRY_STATE)? else {
            return Ok(None);
        };
        let defaults = PersistedState::default();
        let dry_state = StateId::from_u8(raw_state).ok_or(PersistError::Corrupted)?;

        let state = PersistedState {
            remaining_minutes: self
                .get_u16(KEY_REMAINING)?
                .unwrap_or(defaults.remaining_minutes),
            set_temperature_c: self
                .get_u16(KEY_SET_TEMPERATURE)?
                .unwrap_or(defaults.set_temperature_c),
            auto_damper: self
                .get_u8(KEY_AUTO_DAMPER)?
                .map_or(defaults.auto_damper, |v| v != 0),
            soft_off: self
                .get_u8(KEY_SOFT_OFF)?
                .map_or(defaults.soft_off, |v| v != 0),
            dry_state,
        };
        info!("NvsAdapter: loaded process state {state:?}");
        Ok(Some(state))
    }

    fn save(&mut self, state: &PersistedState) -> Result<(), PersistError> {
        self.set_u16(KEY_REMAINING, state.remaining_minutes)?;
        self.set_u16(KEY_SET_TEMPERATURE, state.set_temperature_c)?;
        self.set_u8(KEY_AUTO_DAMPER, u8::from(state.auto_damper))?;
        self.set_u8(KEY_SOFT_OFF, u8::from(state.soft_off))?;
        self.set_u8(KEY_DRY_STATE, state.dry_state as u8)
    }
}

impl Default for NvsAdapter {
    fn default() -> Self {
        Self::new().unwrap_or_else(|e| {
            warn!("NvsAdapter: init failed ({e}); storage unavailable");
            Self::unopened()
        })
    }
}
