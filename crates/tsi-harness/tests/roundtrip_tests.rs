//! End-to-end round-trip scenarios through the `Harness` runner
//!
//! Run with: cargo test --package tsi-harness --test roundtrip_tests

use pretty_assertions::assert_eq;
use tsi_harness::{
    FailureKind, Harness, HarnessConfig, Layer, OutcomeStatus, Scenario, StorageRoundTrip,
};
use tsi_instant::Instant;
use tsi_store::{ResetStrategy, TimestampEncoding};
use tsi_test_utils::{
    fixed_clock, memory_store, replay_plan, utc_timezone, DRIFTED_INSTANT, OBSERVED_DRIFT_MILLIS,
    OBSERVED_INSTANT,
};

fn replay_config() -> HarnessConfig {
    HarnessConfig::new()
        .with_timezones("Africa/Addis_Ababa", "America/Los_Angeles")
        .with_fixed_instant(OBSERVED_INSTANT)
}

#[tokio::test]
async fn canonical_run_passes_both_layers() {
    let harness = Harness::bootstrap(&HarnessConfig::new()).await.unwrap();
    let report = harness.run(&Scenario::ALL).await;

    assert!(report.passed(), "{}", report.generate_text());
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.outcomes[0].layer, Layer::Storage);
    assert_eq!(report.outcomes[1].layer, Layer::Session);
}

#[tokio::test]
async fn aware_encoding_survives_the_replayed_zone_change() {
    let harness = Harness::bootstrap(&replay_config()).await.unwrap();
    let report = harness.run(&Scenario::ALL).await;

    assert!(report.passed(), "{}", report.generate_text());
    for outcome in &report.outcomes {
        assert_eq!(
            outcome.status,
            OutcomeStatus::Passed {
                expected_millis: OBSERVED_INSTANT.as_millis(),
                actual_millis: OBSERVED_INSTANT.as_millis(),
            }
        );
    }
}

#[tokio::test]
async fn naive_storage_replays_the_ten_hour_drift() {
    let config = replay_config().with_encoding(TimestampEncoding::Naive);
    let harness = Harness::bootstrap(&config).await.unwrap();
    let report = harness.run(&[Scenario::StorageRoundTrip]).await;

    assert_eq!(report.exit_code(), FailureKind::Invariant.exit_code());

    let failure = report.first_failure().unwrap();
    assert_eq!(failure.scenario, Scenario::StorageRoundTrip);
    assert_eq!(failure.layer, Layer::Storage);
    match &failure.status {
        OutcomeStatus::Failed { kind, message, .. } => {
            assert_eq!(*kind, FailureKind::Invariant);
            assert!(message.contains("1757422142605"), "{message}");
            assert!(message.contains("1757458142605"), "{message}");
            assert!(message.contains(&OBSERVED_DRIFT_MILLIS.to_string()), "{message}");
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

// 2025-03-30T01:30:00Z, the first minute of London's spring-forward gap in UTC wall time
const SPRING_FORWARD: i64 = 1_743_298_200_000;

#[tokio::test]
async fn naive_wall_time_in_a_dst_gap_is_an_invariant_failure() {
    // Written as 01:30 Tokyo time, read back where 01:30 does not exist
    let config = HarnessConfig::new()
        .with_encoding(TimestampEncoding::Naive)
        .with_timezones("Asia/Tokyo", "Europe/London")
        .with_fixed_instant(Instant::from_millis(SPRING_FORWARD - 9 * 3_600_000));
    let harness = Harness::bootstrap(&config).await.unwrap();
    let report = harness.run(&[Scenario::StorageRoundTrip]).await;

    assert_eq!(report.exit_code(), FailureKind::Invariant.exit_code());
    let failure = report.first_failure().unwrap();
    assert_eq!(failure.layer, Layer::Storage);
    match &failure.status {
        OutcomeStatus::Failed { kind, message, .. } => {
            assert_eq!(*kind, FailureKind::Invariant);
            assert!(message.contains(&SPRING_FORWARD.to_string()), "{message}");
            assert!(message.contains("32400000"), "{message}");
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn naive_utc_wall_time_in_a_dst_gap_is_not_a_transport_failure() {
    let config = HarnessConfig::new()
        .with_encoding(TimestampEncoding::Naive)
        .with_timezones("UTC", "Europe/London")
        .with_fixed_instant(Instant::from_millis(SPRING_FORWARD));
    let harness = Harness::bootstrap(&config).await.unwrap();
    let report = harness.run(&[Scenario::StorageRoundTrip]).await;

    assert_ne!(report.exit_code(), FailureKind::Transport.exit_code());
    // GMT still applies at 01:30, so the wall time reads back unchanged
    assert!(report.passed(), "{}", report.generate_text());
}

#[tokio::test]
async fn naive_checker_reads_back_the_observed_value() {
    let tz = utc_timezone();
    let store = memory_store(TimestampEncoding::Naive, &tz).await;
    let check = StorageRoundTrip::new(store, fixed_clock(), tz.clone(), replay_plan());

    let pair = check.write_then_read().await.unwrap();

    assert_eq!(pair.expected, OBSERVED_INSTANT);
    assert_eq!(pair.actual, DRIFTED_INSTANT);
    assert_eq!(pair.delta_millis(), OBSERVED_DRIFT_MILLIS);
}

#[tokio::test]
async fn first_failure_stops_the_run() {
    let config = replay_config().with_encoding(TimestampEncoding::Naive);
    let harness = Harness::bootstrap(&config).await.unwrap();
    let store = harness.store().clone();

    let report = harness.run(&Scenario::ALL).await;

    assert_eq!(report.outcomes.len(), 1);
    assert!(store.is_closed());
}

#[tokio::test]
async fn naive_session_is_attributed_to_the_session_layer() {
    let config = HarnessConfig::new()
        .with_encoding(TimestampEncoding::Naive)
        .with_fixed_instant(OBSERVED_INSTANT);
    let harness = Harness::bootstrap(&config).await.unwrap();
    let report = harness.run(&[Scenario::SessionRoundTrip]).await;

    let failure = report.first_failure().unwrap();
    assert_eq!(failure.layer, Layer::Session);
    assert_eq!(report.exit_code(), 3);
    match &failure.status {
        // London (BST) -> Los Angeles (PDT)
        OutcomeStatus::Failed { message, .. } => assert!(message.contains("28800000"), "{message}"),
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn session_scenario_leaves_tables_empty() {
    let harness = Harness::bootstrap(&HarnessConfig::new()).await.unwrap();

    let pair = harness.run_scenario(Scenario::SessionRoundTrip).await.unwrap();
    assert_eq!(pair.expected, pair.actual);

    for table in ["user", "account", "session"] {
        assert_eq!(harness.store().row_count(table).await.unwrap(), 0, "{table}");
    }
    harness.close().await;
}

#[tokio::test]
async fn failed_session_scenario_still_leaves_tables_empty() {
    let config = HarnessConfig::new()
        .with_encoding(TimestampEncoding::Naive)
        .with_fixed_instant(OBSERVED_INSTANT);
    let harness = Harness::bootstrap(&config).await.unwrap();

    let err = harness.run_scenario(Scenario::SessionRoundTrip).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Invariant);
    assert_eq!(err.layer(), Some(Layer::Session));

    for table in ["user", "account", "session"] {
        assert_eq!(harness.store().row_count(table).await.unwrap(), 0, "{table}");
    }

    // Nothing left behind to collide with
    let err = harness.run_scenario(Scenario::SessionRoundTrip).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::Invariant);
    harness.close().await;
}

#[tokio::test]
async fn session_scenario_can_repeat_with_the_same_identity() {
    let harness = Harness::bootstrap(&HarnessConfig::new()).await.unwrap();

    harness.run_scenario(Scenario::SessionRoundTrip).await.unwrap();
    harness.run_scenario(Scenario::SessionRoundTrip).await.unwrap();
    harness.close().await;
}

#[tokio::test]
async fn double_reset_matches_single_reset() {
    let dir = tempfile::tempdir().unwrap();

    let mut reports = Vec::new();
    for (name, resets) in [("once.db", 1), ("twice.db", 2)] {
        let path = dir.path().join(name);
        let config = replay_config().with_database_url(format!("sqlite://{}", path.display()));

        let harness = Harness::bootstrap(&config).await.unwrap();
        // Leave residue behind so the reset has something to clear
        harness.run_scenario(Scenario::StorageRoundTrip).await.unwrap();
        for _ in 0..resets {
            harness.reset(ResetStrategy::FullTruncate).await.unwrap();
        }
        let report = harness.run(&Scenario::ALL).await;
        assert!(report.passed(), "{}", report.generate_text());
        reports.push(report.outcomes);
    }

    assert_eq!(reports[0], reports[1]);
}

#[tokio::test]
async fn file_database_survives_reopen_after_recreate_reset() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tsi.db");
    let config = HarnessConfig::new().with_database_url(path.display().to_string());

    let harness = Harness::bootstrap(&config).await.unwrap();
    let first = harness.reset(ResetStrategy::RecreateTable).await.unwrap();
    harness.close().await;

    let harness = Harness::bootstrap(&config).await.unwrap();
    let second = harness.reset(ResetStrategy::RecreateTable).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(harness.store().row_count("demo_times").await.unwrap(), 0);
    harness.close().await;
}
