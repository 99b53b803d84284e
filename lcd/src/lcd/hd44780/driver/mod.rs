mod i2c;

use crate::{LcdError, LcdResult};
pub use i2c::*;
use std::fmt::Debug;

/// Command-level interface of the HD44780 controller.
///
/// Implementors only provide [Self::init], [Self::send_command] and [Self::send_data]; the rest of the
/// instruction set is built on top of `send_command`. There is no read path: the I2C backpack ties R/W
/// to ground, so the busy flag can't be polled and transfers are timed instead.
pub trait HD44780Driver: Debug {
    /// Runs the power-on reset sequence, leaving the controller in 4-bit mode with the display on,
    /// cursor off, and the DDRAM cleared.
    fn init(&mut self, multiline: bool, alt_font: bool) -> LcdResult<()>;

    /// Clears the display and sets the cursor to the home position.
    fn clear_display(&mut self) -> LcdResult<()> {
        self.send_command(0b00000001)
    }

    /// Entry mode: `increment` moves the address counter forward after each data byte, `shift` scrolls the
    /// whole display along with it.
    fn set_entry_mode(&mut self, increment: bool, shift: bool) -> LcdResult<()> {
        let mut command = 0b00000100;
        if increment {
            command |= 0b00000010;
        }
        if shift {
            command |= 0b00000001;
        }
        self.send_command(command)
    }

    /// Sets the display on/off, cursor on/off, and blinking on/off.
    fn set_display_control(
        &mut self,
        display_on: bool,
        cursor_on: bool,
        blink_on: bool,
    ) -> LcdResult<()> {
        let mut command = 0b00001000;
        if display_on {
            command |= 0b00000100;
        }
        if cursor_on {
            command |= 0b00000010;
        }
        if blink_on {
            command |= 0b00000001;
        }
        self.send_command(command)
    }

    /// Sets the interface data length, number of display lines and font.
    ///
    /// `data_length` is `true` for an 8-bit bus, which the backpack can't drive past initialization.
    fn function_set(&mut self, data_length: bool, two_lines: bool, font: bool) -> LcdResult<()> {
        let mut command = 0b00100000;
        if data_length {
            command |= 0b00010000;
        }
        if two_lines {
            command |= 0b00001000;
        }
        if font {
            command |= 0b00000100;
        }
        self.send_command(command)
    }

    /// Sets the DDRAM address. The next data byte is written there.
    fn set_ddram_address(&mut self, address: u8) -> LcdResult<()> {
        if address > 0b01111111 {
            return Err(LcdError::InvalidDdramAddress(address));
        }
        let command = 0b10000000 | address;
        self.send_command(command)
    }

    /// Sends a command to the HD44780 controller.
    /// RS is held low (command).
    fn send_command(&mut self, command: u8) -> LcdResult<()>;

    /// Sends data to the HD44780 controller.
    /// RS is held high (data).
    fn send_data(&mut self, data: u8) -> LcdResult<()>;
}
