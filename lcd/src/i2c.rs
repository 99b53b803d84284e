//! [I2cBus] implementation on top of the Linux `i2c-dev` interface (`/dev/i2c-N`).
//!
//! On a Raspberry Pi the header pins 3 and 5 are `/dev/i2c-1`, which needs `dtparam=i2c_arm=on`.
use crate::{I2cBus, LcdError, LcdResult};
use embedded_hal::i2c::{Error as _, I2c};
use linux_embedded_hal::I2cdev;
use log::{debug, trace};
use std::fmt::{Debug, Formatter};
use std::path::Path;

pub struct LinuxI2cBus {
    dev: I2cdev,
    path: String,
}

impl LinuxI2cBus {
    /// Opens `/dev/i2c-{bus}`.
    pub fn open(bus: u8) -> LcdResult<Self> {
        Self::open_path(format!("/dev/i2c-{}", bus))
    }

    pub fn open_path(path: impl AsRef<Path>) -> LcdResult<Self> {
        let path = path.as_ref();
        let dev = I2cdev::new(path).map_err(|err| LcdError::Open {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;

        debug!("Opened I2C bus {}", path.display());

        Ok(LinuxI2cBus {
            dev,
            path: path.display().to_string(),
        })
    }
}

impl Debug for LinuxI2cBus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "LinuxI2cBus({})", self.path)
    }
}

impl I2cBus for LinuxI2cBus {
    fn write_byte(&mut self, address: u8, value: u8) -> LcdResult<()> {
        if address > 0x7F {
            return Err(LcdError::InvalidAddress(address));
        }
        trace!("{} {:#04x} <- {:08b}", self.path, address, value);
        self.dev
            .write(address, &[value])
            .map_err(|err| LcdError::Transport {
                address,
                kind: err.kind(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device() {
        let err = LinuxI2cBus::open_path("/nonexistent/i2c-99").unwrap_err();
        assert!(matches!(err, LcdError::Open { ref path, .. } if path == "/nonexistent/i2c-99"));
    }
}
