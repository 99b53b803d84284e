use crate::Clock;
use std::thread::sleep;
use std::time::Duration;

/// [Clock] backed by [std::thread::sleep].
#[derive(Debug, Default, Copy, Clone)]
pub struct ThreadClock;

impl Clock for ThreadClock {
    fn sleep(&mut self, duration: Duration) {
        sleep(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_thread_clock_blocks() {
        let start = Instant::now();
        ThreadClock.sleep(Duration::from_millis(2));
        assert!(start.elapsed() >= Duration::from_millis(2));
    }
}
