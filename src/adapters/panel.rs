//! Front-panel adapter.
//!
//! Implements [`PanelPort`] on top of the [`Tm1638`] driver, the power
//! switch input and the buzzer.  Bus errors are logged once per burst
//! and surface as [`ActuatorError::PanelBus`].

use log::{info, warn};

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};

use crate::app::ports::PanelPort;
use crate::display::{SegmentBuffer, transpose};
use crate::drivers::buzzer::Buzzer;
use crate::drivers::hw_init;
use crate::drivers::tm1638::Tm1638;
use crate::error::ActuatorError;
use crate::pins;

pub struct Tm1638Panel<STB, CLK, DIO, D> {
    bus: Tm1638<STB, CLK, DIO, D>,
    buzzer: Buzzer,
    bus_faulted: bool,
}

impl<STB, CLK, DIO, D, E> Tm1638Panel<STB, CLK, DIO, D>
where
    STB: OutputPin + ErrorType<Error = E>,
    CLK: OutputPin + ErrorType<Error = E>,
    DIO: InputPin + OutputPin + ErrorType<Error = E>,
    D: DelayNs,
    E: core::fmt::Debug,
{
    /// Takes an un-initialised driver and brings the module up.
    pub fn new(
        mut bus: Tm1638<STB, CLK, DIO, D>,
        buzzer: Buzzer,
        brightness: u8,
    ) -> Result<Self, ActuatorError> {
        bus.init(brightness).map_err(|e| {
            warn!("PANEL: init failed: {:?}", e);
            ActuatorError::PanelBus
        })?;
        info!("PANEL: TM1638 up (brightness {})", brightness & 0x07);
        Ok(Self {
            bus,
            buzzer,
            bus_faulted: false,
        })
    }

    fn track<T, X: core::fmt::Debug>(&mut self, r: Result<T, X>) -> Result<T, ActuatorError> {
        match r {
            Ok(v) => {
                if self.bus_faulted {
                    info!("PANEL: bus recovered");
                    self.bus_faulted = false;
                }
                Ok(v)
            }
            Err(e) => {
                if !self.bus_faulted {
                    warn!("PANEL: bus error: {:?}", e);
                    self.bus_faulted = true;
                }
                Err(ActuatorError::PanelBus)
            }
        }
    }
}

impl<STB, CLK, DIO, D, E> PanelPort for Tm1638Panel<STB, CLK, DIO, D>
where
    STB: OutputPin + ErrorType<Error = E>,
    CLK: OutputPin + ErrorType<Error = E>,
    DIO: InputPin + OutputPin + ErrorType<Error = E>,
    D: DelayNs,
    E: core::fmt::Debug,
{
    fn read_keys(&mut self) -> Result<u32, ActuatorError> {
        let r = self.bus.read_keys();
        self.track(r)
    }

    fn show(&mut self, seg: &SegmentBuffer) -> Result<(), ActuatorError> {
        let grid = transpose(seg);
        let r = self.bus.write_grid(&grid);
        self.track(r)
    }

    fn power_switch_high(&mut self) -> bool {
        hw_init::gpio_read(pins::POWER_SWITCH_GPIO)
    }

    fn beep(&mut self) {
        self.buzzer.beep();
    }
}

// ── ESP-IDF wiring ────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub type EspPanel = Tm1638Panel<
    esp_idf_hal::gpio::PinDriver<'static, esp_idf_hal::gpio::AnyOutputPin, esp_idf_hal::gpio::Output>,
    esp_idf_hal::gpio::PinDriver<'static, esp_idf_hal::gpio::AnyOutputPin, esp_idf_hal::gpio::Output>,
    esp_idf_hal::gpio::PinDriver<'static, esp_idf_hal::gpio::AnyIOPin, esp_idf_hal::gpio::InputOutput>,
    esp_idf_hal::delay::Ets,
>;

/// Claim the three panel lines and bring the module up.  DIO runs
/// open-drain with the internal pull-up so the chip can drive it
/// during key reads.
#[cfg(target_os = "espidf")]
pub fn esp_panel(
    stb: esp_idf_hal::gpio::AnyOutputPin,
    clk: esp_idf_hal::gpio::AnyOutputPin,
    dio: esp_idf_hal::gpio::AnyIOPin,
    brightness: u8,
) -> anyhow::Result<EspPanel> {
    use esp_idf_hal::gpio::{PinDriver, Pull};

    let stb = PinDriver::output(stb)?;
    let clk = PinDriver::output(clk)?;
    let mut dio = PinDriver::input_output_od(dio)?;
    dio.set_pull(Pull::Up)?;
    let bus = Tm1638::new(stb, clk, dio, esp_idf_hal::delay::Ets);
    Tm1638Panel::new(bus, Buzzer::new(), brightness).map_err(|e| anyhow::anyhow!("panel: {e}"))
}
