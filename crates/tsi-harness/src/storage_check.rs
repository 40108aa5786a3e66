//! Storage round-trip checker
//!
//! recreate table -> capture `t0` -> insert -> switch zone -> fetch latest.
//! Returns the captured pair; judging it is left to
//! [`assert_same_instant`](crate::equivalence::assert_same_instant).

use crate::equivalence::CapturedPair;
use crate::error::HarnessError;
use std::sync::Arc;
use tsi_instant::{AmbientTimezone, Clock, TimezonePlan};
use tsi_store::RecordStore;

/// Writes an instant through a [`RecordStore`] and reads it back under another zone
#[derive(Debug)]
pub struct StorageRoundTrip<S> {
    store: S,
    clock: Arc<dyn Clock>,
    timezone: AmbientTimezone,
    plan: TimezonePlan,
}

impl<S: RecordStore> StorageRoundTrip<S> {
    /// Create a checker
    #[must_use]
    pub fn new(store: S, clock: Arc<dyn Clock>, timezone: AmbientTimezone, plan: TimezonePlan) -> Self {
        Self {
            store,
            clock,
            timezone,
            plan,
        }
    }

    /// Run the write/perturb/read sequence
    ///
    /// # Errors
    /// - `HarnessError::Storage` for any store failure, including an empty table
    pub async fn write_then_read(&self) -> Result<CapturedPair, HarnessError> {
        // Previous zone comes back when this returns, on success or error
        let _restore = self.timezone.scoped(self.plan.create);

        self.store.recreate_table().await?;

        let t0 = self.clock.now();
        self.store.insert_record(t0).await?;
        tracing::info!("Inserted (UTC): {}", t0.to_rfc3339());

        self.timezone.set(self.plan.read);
        tracing::debug!("Ambient timezone now {}", self.timezone.name());

        let record = self.store.fetch_latest().await?;
        tracing::info!("Read back (UTC): {}", record.created_at.to_rfc3339());
        tracing::info!("Read back (Local): {}", record.created_at.render_local(&self.timezone));

        Ok(CapturedPair::new(t0, record.created_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equivalence::assert_same_instant;
    use crate::error::Layer;
    use tsi_instant::{FixedClock, Instant, Tz};
    use tsi_store::{SqliteStore, StoreError, TimestampEncoding};

    const OBSERVED: Instant = Instant::from_millis(1_757_422_142_605);

    async fn checker(encoding: TimestampEncoding, plan: TimezonePlan) -> (StorageRoundTrip<SqliteStore>, AmbientTimezone) {
        let tz = AmbientTimezone::new(Tz::UTC);
        let store = SqliteStore::open_in_memory(tz.clone(), encoding).await.unwrap();
        let check = StorageRoundTrip::new(store, Arc::new(FixedClock(OBSERVED)), tz.clone(), plan);
        (check, tz)
    }

    #[tokio::test]
    async fn aware_storage_preserves_instant() {
        let (check, _) = checker(TimestampEncoding::Aware, TimezonePlan::default()).await;
        let pair = check.write_then_read().await.unwrap();

        assert_eq!(pair.expected, OBSERVED);
        assert!(assert_same_instant(Layer::Storage, pair).is_ok());
    }

    #[tokio::test]
    async fn naive_storage_reproduces_ten_hour_drift() {
        let plan = TimezonePlan::new(Tz::Africa__Addis_Ababa, Tz::America__Los_Angeles).unwrap();
        let (check, _) = checker(TimestampEncoding::Naive, plan).await;

        let pair = check.write_then_read().await.unwrap();
        let err = assert_same_instant(Layer::Storage, pair).unwrap_err();

        assert_eq!(err.expected_millis, 1_757_422_142_605);
        assert_eq!(err.actual_millis, 1_757_458_142_605);
        assert_eq!(err.delta_secs, 36_000);
    }

    #[tokio::test]
    async fn ambient_zone_is_restored() {
        let (check, tz) = checker(TimestampEncoding::Aware, TimezonePlan::default()).await;
        check.write_then_read().await.unwrap();
        assert_eq!(tz.current(), Tz::UTC);
    }

    #[tokio::test]
    async fn closed_store_propagates_storage_error() {
        let (check, tz) = checker(TimestampEncoding::Aware, TimezonePlan::default()).await;
        check.store.close().await.unwrap();

        let err = check.write_then_read().await.unwrap_err();
        assert!(matches!(err, HarnessError::Storage(StoreError::Closed)));
        assert_eq!(tz.current(), Tz::UTC);
    }
}
