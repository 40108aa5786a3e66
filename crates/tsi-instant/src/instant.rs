//! Canonical instant representation
//!
//! An [`Instant`] is nothing but a signed millisecond count since the Unix
//! epoch. All derived traits (`Eq`, `Ord`, `Hash`) look at that count alone;
//! textual renderings are produced on demand and never stored here.

use crate::timezone::AmbientTimezone;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timezone-independent point in time, millisecond ticks since 1970-01-01T00:00:00Z
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instant(i64);

impl Instant {
    /// Unix epoch
    pub const EPOCH: Self = Self(0);

    /// Build from a raw tick count
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Raw tick count
    #[inline]
    #[must_use]
    pub const fn as_millis(self) -> i64 {
        self.0
    }

    /// Build from any zoned datetime, truncating below millisecond precision
    #[inline]
    #[must_use]
    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self(dt.timestamp_millis())
    }

    /// Current wall-clock instant
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(&Utc::now())
    }

    /// UTC datetime, `None` if the tick count is outside chrono's range
    #[must_use]
    pub fn to_utc(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.0).single()
    }

    /// ISO-8601 in UTC with millisecond precision and a `Z` suffix
    #[must_use]
    pub fn to_rfc3339(self) -> String {
        match self.to_utc() {
            Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Millis, true),
            None => format!("{}ms", self.0),
        }
    }

    /// Wall-clock text in the ambient zone. Diagnostic output only.
    #[must_use]
    pub fn render_local(self, tz: &AmbientTimezone) -> String {
        let zone = tz.current();
        match self.to_utc() {
            Some(dt) => dt
                .with_timezone(&zone)
                .format("%a %b %d %Y %H:%M:%S%.3f GMT%z (%Z)")
                .to_string(),
            None => format!("{}ms ({})", self.0, zone.name()),
        }
    }

    /// Signed distance `other - self` in milliseconds
    #[inline]
    #[must_use]
    pub fn millis_until(self, other: Self) -> i64 {
        other.0.saturating_sub(self.0)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Instant {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_datetime(&dt)
    }
}
