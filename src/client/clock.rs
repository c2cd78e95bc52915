use std::cell::Cell;

use chrono::{DateTime, Utc};
use odra::host::HostEnv;

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Block time of an Odra host environment (milliseconds since epoch).
#[derive(Clone)]
pub struct HostClock {
    env: HostEnv,
}

impl HostClock {
    pub fn new(env: HostEnv) -> Self {
        Self { env }
    }
}

impl Clock for HostClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = i64::try_from(self.env.block_time()).unwrap_or(i64::MAX);
        DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// Manually driven clock.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Cell<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Cell::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}
