//! Device identity derived from the ESP32 factory MAC address.
//!
//! The uplink identifies the controller by a 24-digit CPUID: the six MAC
//! bytes in reverse order, printed twice in uppercase hex.  It is
//! deterministic across reboots (factory-burned eFuse MAC).

/// 24 hex digits.
pub type CpuIdString = heapless::String<24>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Format: `m5m4m3m2m1m0m5m4m3m2m1m0`.
pub fn cpu_id(mac: &MacAddress) -> CpuIdString {
    use core::fmt::Write;
    let mut id = CpuIdString::new();
    for _ in 0..2 {
        for b in mac.iter().rev() {
            // Capacity is exactly 24; cannot overflow.
            let _ = write!(id, "{b:02X}");
        }
    }
    id
}
