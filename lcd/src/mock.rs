//! Recording [I2cBus] and [Clock] implementations.
//!
//! Both handles created by a [Recorder] append to the same log, so the relative order of bus writes and
//! delays can be checked afterwards. Used by the tests and by dry runs of the demo binary.
use crate::lcd::hd44780::driver::{BIT_ENABLE, BIT_RS, DATA_MASK, Mode};
use crate::{Clock, I2cBus, LcdError, LcdResult};
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use log::trace;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BusEvent {
    Write { address: u8, value: u8 },
    Sleep(Duration),
}

#[derive(Debug, Default)]
struct RecorderState {
    events: Vec<BusEvent>,
    /// Number of writes that still succeed before every following write fails.
    fail_after: Option<usize>,
}

#[derive(Debug, Default, Clone)]
pub struct Recorder {
    state: Rc<RefCell<RecorderState>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bus(&self) -> RecordingBus {
        RecordingBus {
            state: Rc::clone(&self.state),
        }
    }

    pub fn clock(&self) -> RecordingClock {
        RecordingClock {
            state: Rc::clone(&self.state),
        }
    }

    /// Makes the bus NACK every write after the next `writes` successful ones.
    pub fn fail_after(&self, writes: usize) {
        self.state.borrow_mut().fail_after = Some(writes);
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.state.borrow().events.clone()
    }

    /// Bytes written to the bus, in order.
    pub fn writes(&self) -> Vec<u8> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|event| match event {
                BusEvent::Write { value, .. } => Some(*value),
                BusEvent::Sleep(_) => None,
            })
            .collect()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.state
            .borrow()
            .events
            .iter()
            .filter_map(|event| match event {
                BusEvent::Sleep(duration) => Some(*duration),
                BusEvent::Write { .. } => None,
            })
            .collect()
    }

    /// Decodes the logical bytes seen by the controller, i.e. pairs of nibbles written with E high.
    /// A trailing unpaired nibble is dropped.
    pub fn transfers(&self) -> Vec<(Mode, u8)> {
        let latched: Vec<u8> = self
            .writes()
            .into_iter()
            .filter(|byte| byte & BIT_ENABLE != 0)
            .collect();
        latched
            .chunks_exact(2)
            .map(|pair| {
                let mode = if pair[0] & BIT_RS != 0 { Mode::Data } else { Mode::Command };
                (mode, (pair[0] & DATA_MASK) | (pair[1] >> 4))
            })
            .collect()
    }

    /// Data bytes seen by the controller, as text.
    pub fn text(&self) -> String {
        self.transfers()
            .into_iter()
            .filter(|(mode, _)| *mode == Mode::Data)
            .map(|(_, byte)| byte as char)
            .collect()
    }

    pub fn clear(&self) {
        self.state.borrow_mut().events.clear();
    }
}

#[derive(Debug)]
pub struct RecordingBus {
    state: Rc<RefCell<RecorderState>>,
}

impl I2cBus for RecordingBus {
    fn write_byte(&mut self, address: u8, value: u8) -> LcdResult<()> {
        let mut state = self.state.borrow_mut();
        match &mut state.fail_after {
            Some(0) => {
                return Err(LcdError::Transport {
                    address,
                    kind: ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
                });
            }
            Some(remaining) => *remaining -= 1,
            None => {}
        }
        trace!("Bus write {:#04x} <- {:08b}", address, value);
        state.events.push(BusEvent::Write { address, value });
        Ok(())
    }
}

#[derive(Debug)]
pub struct RecordingClock {
    state: Rc<RefCell<RecorderState>>,
}

impl Clock for RecordingClock {
    fn sleep(&mut self, duration: Duration) {
        self.state.borrow_mut().events.push(BusEvent::Sleep(duration));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_log_keeps_order() {
        let recorder = Recorder::new();
        let mut bus = recorder.bus();
        let mut clock = recorder.clock();

        bus.write_byte(0x27, 0x01).unwrap();
        clock.sleep(Duration::from_millis(1));
        bus.write_byte(0x27, 0x02).unwrap();

        assert_eq!(
            recorder.events(),
            vec![
                BusEvent::Write { address: 0x27, value: 0x01 },
                BusEvent::Sleep(Duration::from_millis(1)),
                BusEvent::Write { address: 0x27, value: 0x02 },
            ]
        );
        assert_eq!(recorder.writes(), vec![0x01, 0x02]);
        assert_eq!(recorder.sleeps(), vec![Duration::from_millis(1)]);
    }

    #[test]
    fn test_fail_after() {
        let recorder = Recorder::new();
        let mut bus = recorder.bus();
        recorder.fail_after(1);

        assert!(bus.write_byte(0x27, 0x01).is_ok());
        assert_eq!(
            bus.write_byte(0x27, 0x02),
            Err(LcdError::Transport {
                address: 0x27,
                kind: ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            })
        );
        assert_eq!(recorder.writes(), vec![0x01]);
    }
}
