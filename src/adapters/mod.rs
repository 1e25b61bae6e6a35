//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements                  | Connects to                 |
//! |--------------|-----------------------------|-----------------------------|
//! | `device_id`  | -                           | Factory MAC → CPUID string  |
//! | `hardware`   | SensorPort, ActuatorPort    | ESP32 ADC, relay GPIO       |
//! | `log_sink`   | EventSink                   | Serial log output           |
//! | `nvs`        | ConfigPort, ProcessStore    | NVS / in-memory store       |
//! | `panel`      | PanelPort                   | TM1638 module, power switch |
//! | `time`       | -                           | ESP32 system timer          |
//! | `uplink`     | EventSink, UplinkTransport  | Uplink frame queue          |
//! |              | UploadPort                  |                             |

pub mod device_id;
pub mod hardware;
pub mod log_sink;
pub mod nvs;
pub mod panel;
pub mod time;
pub mod uplink;
