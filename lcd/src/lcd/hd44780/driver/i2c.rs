use crate::lcd::hd44780::driver::HD44780Driver;
use crate::{Clock, I2cBus, LcdResult};
use log::{debug, trace};
use std::time::Duration;

/// Register select bit of the backpack's output register. Low for commands, high for data.
pub const BIT_RS: u8 = 0b0000_0001;
/// Enable strobe bit. The controller latches the data nibble on its falling edge.
pub const BIT_ENABLE: u8 = 0b0000_0100;
/// Backlight transistor bit.
pub const BIT_BACKLIGHT: u8 = 0b0000_1000;
/// Data lines D4..D7.
pub const DATA_MASK: u8 = 0b1111_0000;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Mode {
    Command,
    Data,
}

impl Mode {
    pub fn bits(self) -> u8 {
        match self {
            Mode::Command => 0,
            Mode::Data => BIT_RS,
        }
    }
}

/// Delays around the enable strobe.
///
/// Every nibble waits `enable_delay` before raising E, holds E high for `enable_pulse`, and waits
/// `enable_delay` again after dropping it.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Timing {
    pub enable_pulse: Duration,
    pub enable_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Timing {
            enable_pulse: Duration::from_micros(500),
            enable_delay: Duration::from_micros(500),
        }
    }
}

/// Builds the byte put on the backpack's register for one nibble transfer.
///
/// `bits` must already carry the nibble in its upper half; the lower half is ignored.
pub fn control_byte(mode: Mode, bits: u8, backlight: bool) -> u8 {
    let mut byte = mode.bits() | (bits & DATA_MASK);
    if backlight {
        byte |= BIT_BACKLIGHT;
    }
    byte
}

/// Splits `data` into the high and low nibble control bytes, in transfer order.
pub fn nibble_bytes(data: u8, mode: Mode, backlight: bool) -> [u8; 2] {
    [
        control_byte(mode, data, backlight),
        control_byte(mode, data << 4, backlight),
    ]
}

/// HD44780 driver for the common PCF8574 I2C backpack, which exposes the controller's 4-bit bus as one
/// 8-bit register (`D7 D6 D5 D4 BL E RW RS`).
///
/// Each logical byte goes out as two nibbles. Each nibble is written once as-is and then strobed with E,
/// so a byte costs six bus writes and six delays. Nothing is retried: a failed write is returned as is.
#[derive(Debug)]
pub struct I2cHD44780Driver<B: I2cBus, C: Clock> {
    bus: B,
    clock: C,
    address: u8,
    backlight: bool,
    timing: Timing,
}

impl<B: I2cBus, C: Clock> I2cHD44780Driver<B, C> {
    /// Creates the driver with the backlight on and [Timing::default]. Nothing is sent until
    /// [HD44780Driver::init] or the first command.
    pub fn new(bus: B, clock: C, address: u8) -> Self {
        I2cHD44780Driver {
            bus,
            clock,
            address,
            backlight: true,
            timing: Timing::default(),
        }
    }

    pub fn with_backlight(mut self, backlight: bool) -> Self {
        self.backlight = backlight;
        self
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn backlight(&self) -> bool {
        self.backlight
    }

    /// Sets the backlight state. Takes effect with the next transfer, see [Self::refresh_backlight].
    pub fn set_backlight(&mut self, backlight: bool) {
        self.backlight = backlight;
    }

    /// Writes only the backlight bit to the backpack, without strobing E, so a
    /// [Self::set_backlight] change shows up immediately.
    pub fn refresh_backlight(&mut self) -> LcdResult<()> {
        let byte = if self.backlight { BIT_BACKLIGHT } else { 0 };
        self.bus.write_byte(self.address, byte)
    }

    /// Blocks on the driver's clock.
    pub fn sleep(&mut self, duration: Duration) {
        self.clock.sleep(duration);
    }

    fn pulse_enable(&mut self, byte: u8) -> LcdResult<()> {
        self.clock.sleep(self.timing.enable_delay);
        self.bus.write_byte(self.address, byte | BIT_ENABLE)?;
        self.clock.sleep(self.timing.enable_pulse);
        self.bus.write_byte(self.address, byte & !BIT_ENABLE)?;
        self.clock.sleep(self.timing.enable_delay);
        Ok(())
    }

    fn write_nibble(&mut self, byte: u8) -> LcdResult<()> {
        self.bus.write_byte(self.address, byte)?;
        self.pulse_enable(byte)
    }

    /// Transfers one byte to the controller as two strobed nibbles.
    pub fn send(&mut self, data: u8, mode: Mode) -> LcdResult<()> {
        trace!("Sending data: {:08b}, mode: {:?}", data, mode);

        let [high, low] = nibble_bytes(data, mode, self.backlight);
        trace!("Writing HN: {:08b}", high);
        self.write_nibble(high)?;
        trace!("Writing LN: {:08b}", low);
        self.write_nibble(low)?;

        Ok(())
    }
}

impl<B: I2cBus, C: Clock> HD44780Driver for I2cHD44780Driver<B, C> {
    fn init(&mut self, multiline: bool, alt_font: bool) -> LcdResult<()> {
        debug!("Initializing HD44780 at {:#04x}", self.address);

        // Synchronize: 0x33 gives two 8-bit function sets, 0x32 a third one plus the switch to 4-bit
        self.send(0b00110011, Mode::Command)?;
        self.send(0b00110010, Mode::Command)?;
        self.set_entry_mode(true, false)?;
        self.set_display_control(true, false, false)?;
        self.function_set(false, multiline, alt_font)?;
        self.clear_display()?;
        self.clock.sleep(self.timing.enable_delay);
        Ok(())
    }

    fn send_command(&mut self, command: u8) -> LcdResult<()> {
        self.send(command, Mode::Command)
    }

    fn send_data(&mut self, data: u8) -> LcdResult<()> {
        self.send(data, Mode::Data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LcdError;
    use crate::mock::{BusEvent, Recorder, RecordingBus, RecordingClock};

    const ADDRESS: u8 = 0x27;

    fn driver(recorder: &Recorder) -> I2cHD44780Driver<RecordingBus, RecordingClock> {
        I2cHD44780Driver::new(recorder.bus(), recorder.clock(), ADDRESS)
    }

    #[test]
    fn test_control_bytes_for_data_a() {
        assert_eq!(nibble_bytes(0x41, Mode::Data, true), [0x49, 0x19]);
        assert_eq!(nibble_bytes(0x41, Mode::Data, false), [0x41, 0x11]);
        assert_eq!(nibble_bytes(0x41, Mode::Command, true), [0x48, 0x18]);
    }

    #[test]
    fn test_control_byte_ignores_low_bits() {
        assert_eq!(control_byte(Mode::Command, 0xFF, false), 0xF0);
        assert_eq!(control_byte(Mode::Data, 0x0F, true), BIT_RS | BIT_BACKLIGHT);
    }

    #[test]
    fn test_send_sequence() {
        let recorder = Recorder::new();
        let mut lcd = driver(&recorder);
        lcd.send(0x41, Mode::Data).unwrap();

        let delay = Duration::from_micros(500);
        let write = |value| BusEvent::Write { address: ADDRESS, value };
        assert_eq!(
            recorder.events(),
            vec![
                write(0x49),
                BusEvent::Sleep(delay),
                write(0x4D),
                BusEvent::Sleep(delay),
                write(0x49),
                BusEvent::Sleep(delay),
                write(0x19),
                BusEvent::Sleep(delay),
                write(0x1D),
                BusEvent::Sleep(delay),
                write(0x19),
                BusEvent::Sleep(delay),
            ]
        );
    }

    #[test]
    fn test_custom_timing() {
        let recorder = Recorder::new();
        let timing = Timing {
            enable_pulse: Duration::from_micros(50),
            enable_delay: Duration::from_micros(100),
        };
        let mut lcd = driver(&recorder).with_timing(timing);
        lcd.send_command(0x01).unwrap();

        let pulse = Duration::from_micros(50);
        let delay = Duration::from_micros(100);
        assert_eq!(recorder.sleeps(), vec![delay, pulse, delay, delay, pulse, delay]);
    }

    #[test]
    fn test_backlight_bit_follows_state() {
        let recorder = Recorder::new();
        let mut lcd = driver(&recorder);

        lcd.send_data(b'x').unwrap();
        assert!(recorder.writes().iter().all(|b| b & BIT_BACKLIGHT != 0));

        recorder.clear();
        lcd.set_backlight(false);
        assert!(recorder.writes().is_empty());
        lcd.send_data(b'x').unwrap();
        lcd.send_command(0x0C).unwrap();
        assert!(recorder.writes().iter().all(|b| b & BIT_BACKLIGHT == 0));
    }

    #[test]
    fn test_refresh_backlight() {
        let recorder = Recorder::new();
        let mut lcd = driver(&recorder).with_backlight(false);
        lcd.refresh_backlight().unwrap();
        lcd.set_backlight(true);
        lcd.refresh_backlight().unwrap();
        assert_eq!(recorder.writes(), vec![0x00, BIT_BACKLIGHT]);
        assert!(recorder.sleeps().is_empty());
    }

    #[test]
    fn test_init_sequence() {
        let recorder = Recorder::new();
        let mut lcd = driver(&recorder);
        lcd.init(true, false).unwrap();

        assert_eq!(
            recorder.transfers(),
            [0x33u8, 0x32, 0x06, 0x0C, 0x28, 0x01]
                .map(|value| (Mode::Command, value))
                .to_vec()
        );
        // Settle delay after the clear
        assert_eq!(recorder.sleeps().len(), 6 * 6 + 1);
        assert_eq!(recorder.events().last(), Some(&BusEvent::Sleep(Duration::from_micros(500))));
    }

    #[test]
    fn test_ddram_address_range() {
        let recorder = Recorder::new();
        let mut lcd = driver(&recorder);
        lcd.set_entry_mode(false, true).unwrap();
        lcd.set_ddram_address(0x54).unwrap();
        assert_eq!(
            lcd.set_ddram_address(0x80),
            Err(LcdError::InvalidDdramAddress(0x80))
        );

        assert_eq!(
            recorder.transfers(),
            vec![(Mode::Command, 0x05), (Mode::Command, 0xD4)]
        );
    }

    #[test]
    fn test_transport_error_is_not_retried() {
        let recorder = Recorder::new();
        let mut lcd = driver(&recorder);
        recorder.fail_after(4);

        let err = lcd.send_data(b'A').unwrap_err();
        assert!(matches!(err, LcdError::Transport { address: ADDRESS, .. }));
        assert_eq!(recorder.writes().len(), 4);
    }
}
