//! Testing utilities for TSI workspace
//!
//! Shared fixtures: the instant from the observed 10-hour drift, the
//! canonical sign-up identity, and ready-to-use in-memory stores.

#![allow(missing_docs)]
#![allow(clippy::missing_panics_doc)]

use std::sync::Arc;
use tsi_identity::{IdentityConfig, SignUpRequest, SqliteIdentityService};
use tsi_instant::{AmbientTimezone, Clock, FixedClock, Instant, TimezonePlan, Tz};
use tsi_store::{SqliteStore, TimestampEncoding};

/// 2025-09-09T12:49:02.605Z, the instant from the original drift report
pub const OBSERVED_INSTANT: Instant = Instant::from_millis(1_757_422_142_605);

/// What a naive column returned for [`OBSERVED_INSTANT`] after
/// Africa/Addis_Ababa -> America/Los_Angeles
pub const DRIFTED_INSTANT: Instant = Instant::from_millis(1_757_458_142_605);

/// `DRIFTED_INSTANT - OBSERVED_INSTANT`
pub const OBSERVED_DRIFT_MILLIS: i64 = 36_000_000;

pub fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(OBSERVED_INSTANT))
}

pub fn utc_timezone() -> AmbientTimezone {
    AmbientTimezone::new(Tz::UTC)
}

/// UTC+3 capture, Pacific read-back
pub fn replay_plan() -> TimezonePlan {
    TimezonePlan::new(Tz::Africa__Addis_Ababa, Tz::America__Los_Angeles).expect("distinct zones")
}

pub fn test_identity() -> SignUpRequest {
    SignUpRequest::new("test", "test@test.com", "password")
}

pub async fn memory_store(encoding: TimestampEncoding, tz: &AmbientTimezone) -> SqliteStore {
    SqliteStore::open_in_memory(tz.clone(), encoding)
        .await
        .expect("in-memory store")
}

/// Migrated identity service over `store`, stamping [`OBSERVED_INSTANT`]
pub async fn identity_service(store: SqliteStore) -> SqliteIdentityService {
    let service = SqliteIdentityService::new(store, fixed_clock(), IdentityConfig::default());
    service.migrate().await.expect("identity schema");
    service
}
