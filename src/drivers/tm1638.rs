//! # TM1638 driver
//!
//! Bit-banged three-wire (STB/CLK/DIO) driver for the TM1638 LED/key
//! controller on the front panel.  Data is shifted LSB-first; the chip
//! latches DIO on the rising clock edge.  STB low opens a transaction
//! and STB high closes it.
//!
//! The driver is generic over `embedded-hal` 1.0 pin and delay traits so
//! the host tests can drive it with recording pins.  DIO must be
//! bidirectional: it turns into an input for the four key-scan bytes.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};

// Command opcodes.
const CMD_DATA_AUTO: u8 = 0x40;
const CMD_READ_KEYS: u8 = 0x42;
const CMD_ADDRESS: u8 = 0xC0;
const CMD_DISPLAY_ON: u8 = 0x88;

/// Display RAM size in bytes.
pub const GRID_BYTES: usize = 16;
/// Key-scan response length in bytes.
const KEY_BYTES: usize = 4;

/// Settle time between the read command and the first key bit.
const READ_SETTLE_US: u32 = 50;
/// Half clock period.
const HALF_CLOCK_US: u32 = 1;

/// Errors that may occur on the panel bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tm1638Error<E> {
    /// A GPIO operation failed.
    Pin(E),
}

impl<E> From<E> for Tm1638Error<E> {
    fn from(e: E) -> Self {
        Self::Pin(e)
    }
}

/// The TM1638 driver.
pub struct Tm1638<STB, CLK, DIO, D> {
    stb: STB,
    clk: CLK,
    dio: DIO,
    delay: D,
}

impl<STB, CLK, DIO, D, E> Tm1638<STB, CLK, DIO, D>
where
    STB: OutputPin + ErrorType<Error = E>,
    CLK: OutputPin + ErrorType<Error = E>,
    DIO: InputPin + OutputPin + ErrorType<Error = E>,
    D: DelayNs,
{
    /// Creates a driver; the bus is idle until [`Tm1638::init`].
    #[must_use]
    pub fn new(stb: STB, clk: CLK, dio: DIO, delay: D) -> Self {
        Self {
            stb,
            clk,
            dio,
            delay,
        }
    }

    /// Idle the bus, clear display RAM and switch the display on.
    pub fn init(&mut self, brightness: u8) -> Result<(), Tm1638Error<E>> {
        self.stb.set_high()?;
        self.clk.set_high()?;
        self.command(CMD_DATA_AUTO)?;
        self.write_grid(&[0; GRID_BYTES])?;
        self.set_brightness(brightness)
    }

    /// Display on at `brightness` (0-7).
    pub fn set_brightness(&mut self, brightness: u8) -> Result<(), Tm1638Error<E>> {
        self.command(CMD_DISPLAY_ON | (brightness & 0x07))
    }

    /// Write all sixteen grid bytes starting at address 0.
    pub fn write_grid(&mut self, grid: &[u8; GRID_BYTES]) -> Result<(), Tm1638Error<E>> {
        self.command(CMD_DATA_AUTO)?;
        self.stb.set_low()?;
        self.write_byte(CMD_ADDRESS)?;
        for &b in grid {
            self.write_byte(b)?;
        }
        self.stb.set_high()?;
        Ok(())
    }

    /// Scan the key matrix.  Byte `n` of the response fills bits
    /// `8n..8n+8` of the result.
    pub fn read_keys(&mut self) -> Result<u32, Tm1638Error<E>> {
        self.stb.set_low()?;
        self.write_byte(CMD_READ_KEYS)?;
        // Release DIO so the chip can drive it.
        self.dio.set_high()?;
        self.delay.delay_us(READ_SETTLE_US);

        let mut keys = 0u32;
        for n in 0..KEY_BYTES {
            keys |= u32::from(self.read_byte()?) << (8 * n);
        }
        self.stb.set_high()?;
        Ok(keys)
    }

    fn command(&mut self, cmd: u8) -> Result<(), Tm1638Error<E>> {
        self.stb.set_low()?;
        self.write_byte(cmd)?;
        self.stb.set_high()?;
        Ok(())
    }

    fn write_byte(&mut self, mut b: u8) -> Result<(), Tm1638Error<E>> {
        for _ in 0..8 {
            self.clk.set_low()?;
            self.dio.set_state(PinState::from(b & 0x01 != 0))?;
            self.delay.delay_us(HALF_CLOCK_US);
            self.clk.set_high()?;
            self.delay.delay_us(HALF_CLOCK_US);
            b >>= 1;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, Tm1638Error<E>> {
        let mut b = 0u8;
        for _ in 0..8 {
            b >>= 1;
            self.clk.set_low()?;
            self.delay.delay_us(HALF_CLOCK_US);
            if self.dio.is_high()? {
                b |= 0x80;
            }
            self.clk.set_high()?;
            self.delay.delay_us(HALF_CLOCK_US);
        }
        Ok(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Ev {
        Stb(bool),
        Clk(bool),
        Dio(bool),
    }

    #[derive(Default)]
    struct Bus {
        events: Vec<Ev>,
        /// Bits the chip drives during a read.
        reply: VecDeque<bool>,
    }

    type Shared = Rc<RefCell<Bus>>;

    struct Pin {
        bus: Shared,
        kind: fn(bool) -> Ev,
    }

    impl ErrorType for Pin {
        type Error = Infallible;
    }

    impl OutputPin for Pin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.bus.borrow_mut().events.push((self.kind)(false));
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.bus.borrow_mut().events.push((self.kind)(true));
            Ok(())
        }
    }

    impl InputPin for Pin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.bus.borrow_mut().reply.pop_front().unwrap_or(false))
        }
        fn is_low(&mut self) -> Result<bool, Infallible> {
            self.is_high().map(|h| !h)
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn driver() -> (Tm1638<Pin, Pin, Pin, NoDelay>, Shared) {
        let bus: Shared = Rc::default();
        let pin = |kind: fn(bool) -> Ev| Pin {
            bus: bus.clone(),
            kind,
        };
        (Tm1638::new(pin(Ev::Stb), pin(Ev::Clk), pin(Ev::Dio), NoDelay), bus)
    }

    /// Reconstruct bytes from DIO levels sampled at each rising clock
    /// edge, split into STB-low transactions.
    fn transactions(events: &[Ev]) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        let mut cur: Option<(Vec<u8>, u8, u8)> = None;
        let mut dio = false;
        for ev in events {
            match *ev {
                Ev::Stb(false) => cur = Some((Vec::new(), 0, 0)),
                Ev::Stb(true) => {
                    if let Some((bytes, _, _)) = cur.take() {
                        out.push(bytes);
                    }
                }
                Ev::Dio(level) => dio = level,
                Ev::Clk(true) => {
                    if let Some((bytes, acc, n)) = cur.as_mut() {
                        *acc |= u8::from(dio) << *n;
                        *n += 1;
                        if *n == 8 {
                            bytes.push(*acc);
                            *acc = 0;
                            *n = 0;
                        }
                    }
                }
                Ev::Clk(false) => {}
            }
        }
        out
    }

    #[test]
    fn init_clears_and_sets_brightness() {
        let (mut tm, bus) = driver();
        tm.init(7).unwrap();
        let tx = transactions(&bus.borrow().events);
        assert_eq!(tx[0], vec![0x40]);
        assert_eq!(tx[1], vec![0x40]);
        let mut clear = vec![0xC0];
        clear.extend([0u8; 16]);
        assert_eq!(tx[2], clear);
        assert_eq!(tx[3], vec![0x8F]);
    }

    #[test]
    fn brightness_is_masked() {
        let (mut tm, bus) = driver();
        tm.set_brightness(0x0A).unwrap();
        assert_eq!(transactions(&bus.borrow().events), vec![vec![0x8A]]);
    }

    #[test]
    fn bytes_are_sent_lsb_first() {
        let (mut tm, bus) = driver();
        tm.set_brightness(1).unwrap();
        let dio: Vec<bool> = bus
            .borrow()
            .events
            .iter()
            .filter_map(|e| match e {
                Ev::Dio(l) => Some(*l),
                _ => None,
            })
            .collect();
        // 0x89 = 1001_0001
        assert_eq!(dio, vec![true, false, false, true, false, false, false, true]);
    }

    #[test]
    fn key_scan_assembles_little_endian() {
        let (mut tm, bus) = driver();
        // byte0 = 0x02 (bit 1), byte1 = 0x00, byte2 = 0x04 (bit 18), byte3 = 0
        let mut reply = VecDeque::new();
        for byte in [0x02u8, 0x00, 0x04, 0x00] {
            for i in 0..8 {
                reply.push_back((byte >> i) & 1 == 1);
            }
        }
        bus.borrow_mut().reply = reply;
        let keys = tm.read_keys().unwrap();
        assert_eq!(keys, (1 << 1) | (1 << 18));
        assert_eq!(bus.borrow().events.last(), Some(&Ev::Stb(true)));
    }
}
