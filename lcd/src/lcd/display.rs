//! Line-oriented text output on top of [I2cHD44780Driver].
//!
//! [LcdDisplay] owns the panel geometry. It pads or truncates text to single lines, and wraps longer text
//! over the available lines. Text that doesn't fit on the panel at all is scrolled one line at a time.
//! Nothing is buffered between calls: every call recomputes its lines from the text it's given.

use crate::lcd::hd44780::driver::{HD44780Driver, I2cHD44780Driver, Timing};
use crate::{Clock, I2cBus, LcdError, LcdResult};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Pause between two scroll windows used by [LcdDisplay::print] callers that have no preference.
pub const DEFAULT_SCROLL_INTERVAL: Duration = Duration::from_secs(5);

/// How far [LcdDisplay::print] scrolls text that needs more lines than the panel has.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollPolicy {
    /// Advances one chunk per window and stops before the window would start at the last chunk.
    /// The final window may be partial: lines past the end of the text keep whatever they showed before,
    /// and with a single-line panel the last chunk is never shown.
    #[default]
    StopBeforeLast,
    /// Stops once the last chunk is on the bottom line, so every window fills the panel.
    FullWindows,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// 7-bit I2C address of the backpack. PCF8574 boards default to `0x27`, PCF8574A ones to `0x3F`.
    pub address: u8,
    /// Characters per line.
    pub width: usize,
    /// Number of lines, 1 to 4.
    pub max_lines: u8,
    pub backlight: bool,
    pub scroll_policy: ScrollPolicy,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            address: 0x27,
            width: 16,
            max_lines: 2,
            backlight: true,
            scroll_policy: ScrollPolicy::default(),
        }
    }
}

impl DisplayConfig {
    /// # Errors
    /// - `LcdError::InvalidAddress` if `address` doesn't fit in 7 bits.
    /// - `LcdError::InvalidWidth` if `width` is zero.
    /// - `LcdError::InvalidLineCount` if `max_lines` is not in `1..=4`.
    pub fn validate(&self) -> LcdResult<()> {
        if self.address > 0x7F {
            return Err(LcdError::InvalidAddress(self.address));
        }
        if self.width == 0 {
            return Err(LcdError::InvalidWidth(self.width));
        }
        if !(1..=4).contains(&self.max_lines) {
            return Err(LcdError::InvalidLineCount(self.max_lines));
        }
        Ok(())
    }
}

/// DDRAM start of each physical line. Lines 3 and 4 continue lines 1 and 2 in memory, which is why
/// their offsets look out of order.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LineAddress {
    Line1,
    Line2,
    Line3,
    Line4,
}

impl LineAddress {
    /// Maps a 1-based line number, `None` outside `1..=4`.
    pub fn from_line(line: u8) -> Option<Self> {
        match line {
            1 => Some(LineAddress::Line1),
            2 => Some(LineAddress::Line2),
            3 => Some(LineAddress::Line3),
            4 => Some(LineAddress::Line4),
            _ => None,
        }
    }

    pub fn ddram_offset(self) -> u8 {
        match self {
            LineAddress::Line1 => 0x00,
            LineAddress::Line2 => 0x40,
            LineAddress::Line3 => 0x14,
            LineAddress::Line4 => 0x54,
        }
    }

}

/// Stops a scrolling [LcdDisplay::print_cancellable] between two windows.
///
/// Clones share the same flag, so one can be handed to another thread.
#[derive(Debug, Clone, Default)]
pub struct ScrollCancel(Arc<AtomicBool>);

impl ScrollCancel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Splits `text` into chunks of `width` characters, the last one possibly shorter.
/// Empty text gives no chunks.
pub fn chunk(text: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(width.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Ranges of chunk indices shown together while scrolling `chunks` chunks over `lines` lines.
///
/// Text that fits gives one window with everything.
pub fn scroll_windows(chunks: usize, lines: usize, policy: ScrollPolicy) -> Vec<Range<usize>> {
    let lines = lines.max(1);
    if chunks <= lines {
        return vec![0..chunks];
    }
    match policy {
        ScrollPolicy::StopBeforeLast => (0..chunks - 1)
            .map(|start| start..(start + lines).min(chunks))
            .collect(),
        ScrollPolicy::FullWindows => (0..=chunks - lines)
            .map(|start| start..start + lines)
            .collect(),
    }
}

/// A character LCD behind an I2C backpack.
#[derive(Debug)]
pub struct LcdDisplay<B: I2cBus, C: Clock> {
    driver: I2cHD44780Driver<B, C>,
    config: DisplayConfig,
}

impl<B: I2cBus, C: Clock> LcdDisplay<B, C> {
    /// Validates `config` and initializes the controller.
    ///
    /// # Errors
    /// - Configuration errors from [DisplayConfig::validate], before anything is sent.
    /// - `LcdError::Transport` if the initialization sequence can't be written.
    pub fn new(bus: B, clock: C, config: DisplayConfig) -> LcdResult<Self> {
        Self::new_with_timing(bus, clock, config, Timing::default())
    }

    pub fn new_with_timing(bus: B, clock: C, config: DisplayConfig, timing: Timing) -> LcdResult<Self> {
        config.validate()?;

        let driver = I2cHD44780Driver::new(bus, clock, config.address)
            .with_backlight(config.backlight)
            .with_timing(timing);
        let mut display = LcdDisplay { driver, config };

        // The backpack always runs the controller in 2-line mode, the line count only affects layout here
        display.driver.init(true, false)?;
        debug!(
            "{}x{} display at {:#04x} initialized",
            display.config.width, display.config.max_lines, display.config.address
        );
        Ok(display)
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn driver(&self) -> &I2cHD44780Driver<B, C> {
        &self.driver
    }

    pub fn backlight(&self) -> bool {
        self.driver.backlight()
    }

    /// Switches the backlight. Visible with the next write, or right away after [Self::refresh_backlight].
    pub fn set_backlight(&mut self, backlight: bool) {
        self.config.backlight = backlight;
        self.driver.set_backlight(backlight);
    }

    pub fn refresh_backlight(&mut self) -> LcdResult<()> {
        self.driver.refresh_backlight()
    }

    /// Keeps the current content on screen for `duration`, using the display's clock.
    pub fn hold(&mut self, duration: Duration) {
        self.driver.sleep(duration);
    }

    /// Writes `text` on one physical line, padded with spaces or cut to exactly `width` characters.
    ///
    /// Lines outside `1..=4` fall back to line 1. Lines past `max_lines` but within `1..=4` are still
    /// written, the controller has memory for them. Characters up to U+00FF go out as their code point,
    /// wider ones as `?`.
    pub fn write_line(&mut self, text: &str, line: u8) -> LcdResult<()> {
        let address = LineAddress::from_line(line).unwrap_or_else(|| {
            warn!("Line {} doesn't exist, writing to line 1", line);
            LineAddress::Line1
        });
        self.driver.set_ddram_address(address.ddram_offset())?;

        let padded = text.chars().chain(std::iter::repeat(' ')).take(self.config.width);
        for c in padded {
            if c <= '\u{FF}' {
                self.driver.send_data(c as u8)?;
            } else {
                warn!("Character {} doesn't fit in one byte", c);
                self.driver.send_data(b'?')?;
            }
        }
        Ok(())
    }

    /// Shows `text` on the panel, wrapping it over the lines.
    ///
    /// Text that needs more lines than the panel has is scrolled one line per `scroll_interval`
    /// according to the configured [ScrollPolicy]. Blocks until the last window is shown.
    pub fn print(&mut self, text: &str, scroll_interval: Duration) -> LcdResult<()> {
        self.print_cancellable(text, scroll_interval, &ScrollCancel::new())
            .map(|_| ())
    }

    /// Like [Self::print], but checks `cancel` around every pause between scroll windows.
    ///
    /// Returns `false` if the scroll was cancelled before its last window.
    pub fn print_cancellable(
        &mut self,
        text: &str,
        scroll_interval: Duration,
        cancel: &ScrollCancel,
    ) -> LcdResult<bool> {
        if text.chars().count() <= self.config.width {
            self.write_line(text, 1)?;
            return Ok(true);
        }

        let chunks = chunk(text, self.config.width);
        let lines = self.config.max_lines as usize;
        let windows = scroll_windows(chunks.len(), lines, self.config.scroll_policy);
        if windows.len() > 1 {
            debug!(
                "Scrolling {} chunks over {} lines in {} windows",
                chunks.len(),
                lines,
                windows.len()
            );
        }

        for (i, window) in windows.into_iter().enumerate() {
            if i > 0 {
                if cancel.is_cancelled() {
                    debug!("Scroll cancelled before window {}", i);
                    return Ok(false);
                }
                self.driver.sleep(scroll_interval);
                if cancel.is_cancelled() {
                    debug!("Scroll cancelled before window {}", i);
                    return Ok(false);
                }
            }
            for (line, chunk) in chunks[window].iter().enumerate() {
                self.write_line(chunk, line as u8 + 1)?;
            }
        }
        Ok(true)
    }

    /// Blanks every configured line.
    pub fn clear(&mut self) -> LcdResult<()> {
        for line in 1..=self.config.max_lines {
            self.write_line("", line)?;
        }
        Ok(())
    }
}
