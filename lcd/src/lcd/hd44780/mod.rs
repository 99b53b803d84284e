//! HD44780 character LCD controller.
//!
//! [driver::HD44780Driver] holds the controller command set, [driver::I2cHD44780Driver] drives it
//! through a PCF8574-style I2C backpack in 4-bit mode.

pub mod driver;
