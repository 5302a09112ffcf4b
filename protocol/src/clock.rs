//! # Time Source
//!
//! The succession state machine is nothing but wall-clock comparisons, so
//! the clock is injected rather than read ambiently. Production uses
//! [`SystemClock`]; tests and the simulator drive a [`ManualClock`].

use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

/// Anything that can tell the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Second resolution.
///
/// Uses an atomic so a shared `&ManualClock` can be advanced while the
/// manager holding it is borrowed elsewhere.
#[derive(Debug)]
pub struct ManualClock {
    unix_secs: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            unix_secs: AtomicI64::new(start.timestamp()),
        }
    }

    /// Start at the unix epoch plus `secs`.
    pub fn at_unix(secs: i64) -> Self {
        Self {
            unix_secs: AtomicI64::new(secs),
        }
    }

    pub fn advance_secs(&self, secs: u64) {
        let delta = i64::try_from(secs).unwrap_or(i64::MAX);
        let current = self.unix_secs.load(Ordering::SeqCst);
        self.unix_secs
            .store(current.saturating_add(delta), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let current = self.unix_secs.load(Ordering::SeqCst);
        self.unix_secs
            .store(current.saturating_add(by.num_seconds()), Ordering::SeqCst);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        self.unix_secs.store(to.timestamp(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.unix_secs.load(Ordering::SeqCst);
        DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}
