//! Clock abstraction

use crate::instant::Instant;
use std::fmt;

/// Source of the current instant
pub trait Clock: Send + Sync + fmt::Debug {
    /// Instant at the moment of the call
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Always returns the same instant, for replaying a recorded failure
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Instant);

impl Clock for FixedClock {
    fn now(&self) -> Instant {
        self.0
    }
}
