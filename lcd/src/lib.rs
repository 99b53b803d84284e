pub mod clock;
#[cfg(target_os = "linux")]
pub mod i2c;
pub mod lcd;
pub mod mock;

use std::fmt::Debug;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum LcdError {
    #[error("bus write to device {address:#04x} failed: {kind}")]
    Transport {
        address: u8,
        kind: embedded_hal::i2c::ErrorKind,
    },
    #[error("can't open I2C bus {path}: {reason}")]
    Open { path: String, reason: String },
    #[error("invalid I2C address {0:#04x}, expected a 7-bit address")]
    InvalidAddress(u8),
    #[error("invalid width {0}, expected at least one character per line")]
    InvalidWidth(usize),
    #[error("invalid line count {0}, expected 1 to 4 lines")]
    InvalidLineCount(u8),
    #[error("DDRAM address {0:#04x} out of range")]
    InvalidDdramAddress(u8),
}

pub type LcdResult<T> = Result<T, LcdError>;

/// A bus able to write a single byte to a device.
///
/// This is the only thing the LCD driver needs from the underlying I2C implementation, so it can be
/// backed by `/dev/i2c-N` ([i2c::LinuxI2cBus]), a recording mock ([mock::RecordingBus]), or anything
/// else that can push one byte at a time.
pub trait I2cBus: Debug {
    /// Writes `value` to the device at the 7-bit `address`. Blocks until the write is done.
    ///
    /// # Errors
    /// - `LcdError::Transport` if the device did not acknowledge or the bus is unavailable.
    fn write_byte(&mut self, address: u8, value: u8) -> LcdResult<()>;
}

/// Blocking delay source.
pub trait Clock: Debug {
    fn sleep(&mut self, duration: Duration);
}

impl<T: I2cBus + ?Sized> I2cBus for &mut T {
    fn write_byte(&mut self, address: u8, value: u8) -> LcdResult<()> {
        (**self).write_byte(address, value)
    }
}

impl<T: I2cBus + ?Sized> I2cBus for Box<T> {
    fn write_byte(&mut self, address: u8, value: u8) -> LcdResult<()> {
        (**self).write_byte(address, value)
    }
}

impl<T: Clock + ?Sized> Clock for &mut T {
    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration)
    }
}

impl<T: Clock + ?Sized> Clock for Box<T> {
    fn sleep(&mut self, duration: Duration) {
        (**self).sleep(duration)
    }
}
