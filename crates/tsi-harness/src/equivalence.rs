//! Equivalence assertion
//!
//! The only place a round-trip is judged. Comparison is on raw tick counts;
//! rendered strings never take part, so a rendering bug cannot pass as a
//! preserved instant.

use crate::error::Layer;
use serde::{Deserialize, Serialize};
use tsi_instant::Instant;

/// Instant captured at creation and the one read back after the zone change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturedPair {
    pub expected: Instant,
    pub actual: Instant,
}

impl CapturedPair {
    /// Create a pair
    #[inline]
    #[must_use]
    pub fn new(expected: Instant, actual: Instant) -> Self {
        Self { expected, actual }
    }

    /// `actual - expected` in milliseconds
    #[inline]
    #[must_use]
    pub fn delta_millis(&self) -> i64 {
        self.expected.millis_until(self.actual)
    }
}

/// Round-trip returned a different instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error(
    "{layer} round-trip changed the instant: expected {expected_millis}, actual {actual_millis} \
     (delta {delta_millis} ms = {delta_secs} s)"
)]
pub struct InvariantViolation {
    pub layer: Layer,
    pub expected_millis: i64,
    pub actual_millis: i64,
    pub delta_millis: i64,
    pub delta_secs: i64,
}

impl InvariantViolation {
    /// Describe a mismatch between `expected` and `actual`
    #[must_use]
    pub fn new(layer: Layer, expected: Instant, actual: Instant) -> Self {
        let delta_millis = expected.millis_until(actual);
        Self {
            layer,
            expected_millis: expected.as_millis(),
            actual_millis: actual.as_millis(),
            delta_millis,
            delta_secs: delta_millis / 1000,
        }
    }
}

/// Assert both instants carry the same tick count
///
/// # Errors
/// - `InvariantViolation` with both raw tick values on mismatch
pub fn assert_same_instant(layer: Layer, pair: CapturedPair) -> Result<(), InvariantViolation> {
    if pair.expected.as_millis() == pair.actual.as_millis() {
        return Ok(());
    }
    Err(InvariantViolation::new(layer, pair.expected, pair.actual))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_ticks_pass() {
        let t = Instant::from_millis(1_757_422_142_605);
        assert!(assert_same_instant(Layer::Storage, CapturedPair::new(t, t)).is_ok());
    }

    #[test]
    fn mismatch_reports_raw_ticks() {
        let pair = CapturedPair::new(
            Instant::from_millis(1_757_422_142_605),
            Instant::from_millis(1_757_458_142_605),
        );
        let err = assert_same_instant(Layer::Storage, pair).unwrap_err();

        assert_eq!(err.delta_millis, 36_000_000);
        assert_eq!(err.delta_secs, 36_000);

        let message = err.to_string();
        assert!(message.contains("1757422142605"));
        assert!(message.contains("1757458142605"));
        assert!(message.contains("36000 s"));
        assert!(!message.contains("2025-09-09"));
    }

    #[test]
    fn off_by_one_millisecond_fails() {
        let pair = CapturedPair::new(Instant::from_millis(10), Instant::from_millis(9));
        let err = assert_same_instant(Layer::Session, pair).unwrap_err();
        assert_eq!(err.delta_millis, -1);
        assert_eq!(err.layer, Layer::Session);
    }
}
