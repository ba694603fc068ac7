//! Injected time source
//!
//! Locktime filtering and block timestamps read the time through [`Clock`]
//! so mining and selection can be driven by a fixed clock in tests.

use crate::error::Result;
use crate::utils::current_timestamp;
use std::sync::atomic::{AtomicI64, Ordering};

/// Wall-clock source, in milliseconds since the Unix epoch
pub trait Clock: Send + Sync {
    fn now(&self) -> Result<i64>;
}

/// Reads the system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<i64> {
        current_timestamp()
    }
}

/// A clock that only moves when told to
#[derive(Debug, Default)]
pub struct FixedClock {
    millis: AtomicI64,
}

impl FixedClock {
    pub fn new(millis: i64) -> FixedClock {
        FixedClock {
            millis: AtomicI64::new(millis),
        }
    }

    pub fn set(&self, millis: i64) {
        self.millis.store(millis, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: i64) {
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Result<i64> {
        Ok(self.millis.load(Ordering::SeqCst))
    }
}
