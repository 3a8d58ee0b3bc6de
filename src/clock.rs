//! Wall clock and the blocking sleep the scheduler suspends on.

use chrono::{DateTime, Utc};
use std::time::Duration;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Block the calling thread for `duration`.
    fn sleep(&self, duration: Duration);

    /// Block until `until`. Returns immediately if it has already passed.
    fn sleep_until(&self, until: DateTime<Utc>) {
        if let Ok(wait) = (until - self.now()).to_std() {
            self.sleep(wait);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
