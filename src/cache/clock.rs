use std::sync::RwLock;
use std::time::{Duration, Instant};

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "yatube::cache::clock";

/// Monotonic time source used to age cache entries.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: RwLock::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = rw_write(&self.now, SOURCE, "advance");
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *rw_read(&self.now, SOURCE, "now")
    }
}
