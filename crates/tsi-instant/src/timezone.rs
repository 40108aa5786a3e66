//! Ambient timezone state
//!
//! A process would normally keep this in an environment variable. Here it is
//! an explicit handle: every component that turns an [`Instant`] into local
//! wall-clock text (or back) receives a clone of the same handle, and tests
//! build their own so nothing leaks between them.
//!
//! [`Instant`]: crate::Instant

use crate::error::TimezoneError;
use chrono_tz::Tz;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Shared, mutable timezone used for local rendering
#[derive(Clone)]
pub struct AmbientTimezone {
    inner: Arc<RwLock<Tz>>,
}

impl AmbientTimezone {
    /// Create a handle starting in `tz`
    #[inline]
    #[must_use]
    pub fn new(tz: Tz) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tz)),
        }
    }

    /// Create a handle from an IANA identifier
    ///
    /// # Errors
    /// - `TimezoneError::Unknown` if the identifier is not recognised
    pub fn parse(name: &str) -> Result<Self, TimezoneError> {
        parse_zone(name).map(Self::new)
    }

    /// Zone currently in effect
    #[inline]
    #[must_use]
    pub fn current(&self) -> Tz {
        *self.inner.read()
    }

    /// IANA name of the zone currently in effect
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.current().name()
    }

    /// Switch zones, returning the previous one
    pub fn set(&self, tz: Tz) -> Tz {
        std::mem::replace(&mut *self.inner.write(), tz)
    }

    /// Switch zones by IANA identifier
    ///
    /// # Errors
    /// - `TimezoneError::Unknown` if the identifier is not recognised
    pub fn set_named(&self, name: &str) -> Result<Tz, TimezoneError> {
        let tz = parse_zone(name)?;
        Ok(self.set(tz))
    }

    /// Switch zones until the returned guard is dropped
    #[must_use = "the previous zone is restored as soon as the guard drops"]
    pub fn scoped(&self, tz: Tz) -> TimezoneGuard {
        let previous = self.set(tz);
        TimezoneGuard {
            handle: self.clone(),
            previous,
        }
    }
}

impl Default for AmbientTimezone {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl fmt::Debug for AmbientTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AmbientTimezone").field(&self.name()).finish()
    }
}

/// Restores the zone that was active before [`AmbientTimezone::scoped`]
#[derive(Debug)]
pub struct TimezoneGuard {
    handle: AmbientTimezone,
    previous: Tz,
}

impl TimezoneGuard {
    /// Zone that will be restored on drop
    #[inline]
    #[must_use]
    pub fn previous(&self) -> Tz {
        self.previous
    }
}

impl Drop for TimezoneGuard {
    fn drop(&mut self) {
        self.handle.set(self.previous);
    }
}

/// Zone at capture time and zone at read-back time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimezonePlan {
    /// Active when the instant is captured and written
    pub create: Tz,
    /// Active when the instant is read back
    pub read: Tz,
}

impl TimezonePlan {
    /// Create a plan
    ///
    /// # Errors
    /// - `TimezoneError::NoPerturbation` if both zones are the same
    pub fn new(create: Tz, read: Tz) -> Result<Self, TimezoneError> {
        if create == read {
            return Err(TimezoneError::NoPerturbation(create.name().to_string()));
        }
        Ok(Self { create, read })
    }

    /// Create a plan from IANA identifiers
    ///
    /// # Errors
    /// - `TimezoneError::Unknown` for an unrecognised identifier
    /// - `TimezoneError::NoPerturbation` if both zones are the same
    pub fn from_names(create: &str, read: &str) -> Result<Self, TimezoneError> {
        Self::new(parse_zone(create)?, parse_zone(read)?)
    }
}

impl Default for TimezonePlan {
    fn default() -> Self {
        Self {
            create: Tz::Europe__London,
            read: Tz::America__Los_Angeles,
        }
    }
}

fn parse_zone(name: &str) -> Result<Tz, TimezoneError> {
    name.parse::<Tz>()
        .map_err(|_| TimezoneError::Unknown(name.to_string()))
}
