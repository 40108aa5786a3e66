//! Timestamp column encodings
//!
//! `Aware` writes RFC 3339 text with an explicit `Z` offset; reading it back
//! does not consult the ambient zone at all.
//!
//! `Naive` writes the wall-clock reading in the ambient zone and drops the
//! offset. Reading it back re-attaches whatever zone is ambient *then*, so a
//! zone change between write and read shifts the instant by the difference
//! of the two UTC offsets. It exists to replay that defect.

use crate::error::{ParseEncodingError, StoreError};
use chrono::{DateTime, Duration, NaiveDateTime, Offset, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tsi_instant::{AmbientTimezone, Instant};

const NAIVE_WRITE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const NAIVE_READ_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// How an instant column is written to and read from text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampEncoding {
    /// Absolute instant with explicit UTC offset
    #[default]
    Aware,
    /// Wall-clock text in the ambient zone, no offset
    Naive,
}

impl TimestampEncoding {
    /// Column text for `instant`
    ///
    /// # Errors
    /// - `StoreError::OutOfRange` if the instant has no calendar representation
    pub fn encode(self, instant: Instant, tz: &AmbientTimezone) -> Result<String, StoreError> {
        let utc = instant
            .to_utc()
            .ok_or(StoreError::OutOfRange(instant.as_millis()))?;

        Ok(match self {
            Self::Aware => utc.to_rfc3339_opts(SecondsFormat::Millis, true),
            Self::Naive => utc
                .with_timezone(&tz.current())
                .naive_local()
                .format(NAIVE_WRITE_FORMAT)
                .to_string(),
        })
    }

    /// Instant for column text
    ///
    /// # Errors
    /// - `StoreError::MalformedTimestamp` if the text does not parse
    ///
    /// Naive text that is ambiguous in the ambient zone takes the earliest
    /// instant. Text inside a DST gap is read with the offset in effect just
    /// before the transition, which lands it past the gap.
    pub fn decode(self, value: &str, tz: &AmbientTimezone) -> Result<Instant, StoreError> {
        match self {
            Self::Aware => DateTime::parse_from_rfc3339(value)
                .map(|dt| Instant::from_datetime(&dt))
                .map_err(|e| malformed(value, &e)),
            Self::Naive => {
                let naive = NaiveDateTime::parse_from_str(value, NAIVE_READ_FORMAT)
                    .map_err(|e| malformed(value, &e))?;
                let zone = tz.current();
                match zone.from_local_datetime(&naive).earliest() {
                    Some(dt) => Ok(Instant::from_datetime(&dt)),
                    None => Ok(before_gap(&zone, naive)),
                }
            }
        }
    }

    /// Lowercase name, as accepted by `FromStr`
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aware => "aware",
            Self::Naive => "naive",
        }
    }
}

/// Reads `naive` with the offset that applied a day earlier
fn before_gap<Z: TimeZone>(zone: &Z, naive: NaiveDateTime) -> Instant {
    let earlier = naive - Duration::days(1);
    let offset = zone.offset_from_utc_datetime(&earlier).fix();
    let utc = naive - Duration::seconds(i64::from(offset.local_minus_utc()));
    Instant::from_datetime(&Utc.from_utc_datetime(&utc))
}

impl fmt::Display for TimestampEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimestampEncoding {
    type Err = ParseEncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "aware" => Ok(Self::Aware),
            "naive" => Ok(Self::Naive),
            other => Err(ParseEncodingError(other.to_string())),
        }
    }
}

fn malformed(value: &str, err: &chrono::ParseError) -> StoreError {
    StoreError::MalformedTimestamp {
        value: value.to_string(),
        reason: err.to_string(),
    }
}
