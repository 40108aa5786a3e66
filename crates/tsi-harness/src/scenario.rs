//! Scenario runner
//!
//! Owns the process-wide resources (one store connection, one identity
//! service, one ambient zone handle) and runs scenarios strictly one after
//! another. The first failure ends the run; the connection is released on
//! every path out of [`Harness::run`].

use crate::config::HarnessConfig;
use crate::equivalence::{assert_same_instant, CapturedPair};
use crate::error::{HarnessError, Layer};
use crate::report::{HarnessReport, ScenarioOutcome};
use crate::session_check::SessionRoundTrip;
use crate::storage_check::StorageRoundTrip;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tsi_identity::{CookieForwarder, SignUpRequest, SqliteIdentityService};
use tsi_instant::{AmbientTimezone, Clock, TimezonePlan};
use tsi_store::{EnvironmentReset, ResetReport, ResetStrategy, SqliteStore};

/// A round-trip scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// Record store write/read
    StorageRoundTrip,
    /// Sign-up/session read
    SessionRoundTrip,
}

impl Scenario {
    /// Every scenario, in run order
    pub const ALL: [Self; 2] = [Self::StorageRoundTrip, Self::SessionRoundTrip];

    /// Stable name for output
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::StorageRoundTrip => "storage-roundtrip",
            Self::SessionRoundTrip => "session-roundtrip",
        }
    }

    /// Layer exercised
    #[must_use]
    pub fn layer(self) -> Layer {
        match self {
            Self::StorageRoundTrip => Layer::Storage,
            Self::SessionRoundTrip => Layer::Session,
        }
    }

    /// Parse a CLI selection: `storage`, `session` or `all`
    ///
    /// # Errors
    /// - `HarnessError::Config` for anything else
    pub fn parse_selection(raw: &str) -> Result<Vec<Self>, HarnessError> {
        match raw {
            "all" => Ok(Self::ALL.to_vec()),
            other => other.parse::<Self>().map(|s| vec![s]),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "storage" | "storage-roundtrip" => Ok(Self::StorageRoundTrip),
            "session" | "session-roundtrip" => Ok(Self::SessionRoundTrip),
            other => Err(HarnessError::Config(format!("unknown scenario: {other}"))),
        }
    }
}

/// Bootstrapped harness
#[derive(Debug)]
pub struct Harness {
    store: SqliteStore,
    identity: SqliteIdentityService,
    timezone: AmbientTimezone,
    clock: Arc<dyn Clock>,
    plan: TimezonePlan,
    fixture: SignUpRequest,
    database: String,
}

impl Harness {
    /// Open the store, create the identity schema, start in the capture zone
    ///
    /// # Errors
    /// - `HarnessError::Timezone` for a bad zone pair
    /// - `HarnessError::Storage` if the database cannot be opened
    /// - `HarnessError::Identity` if the identity schema cannot be created
    pub async fn bootstrap(config: &HarnessConfig) -> Result<Self, HarnessError> {
        let plan = config.plan()?;
        let clock = config.clock();
        let timezone = AmbientTimezone::new(plan.create);

        let store = SqliteStore::open(config.database_target(), timezone.clone(), config.encoding).await?;
        let identity = SqliteIdentityService::new(store.clone(), Arc::clone(&clock), config.session.clone());

        if let Err(e) = identity.migrate().await {
            close_quietly(&store).await;
            return Err(e.into());
        }

        tracing::info!(
            "Harness ready: {} ({} timestamps), {} -> {}",
            store.target(),
            config.encoding,
            plan.create.name(),
            plan.read.name()
        );

        Ok(Self {
            database: store.target().to_string(),
            store,
            identity,
            timezone,
            clock,
            plan,
            fixture: config.identity.to_request(),
        })
    }

    /// Shared store handle
    #[inline]
    #[must_use]
    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Ambient zone handle
    #[inline]
    #[must_use]
    pub fn timezone(&self) -> &AmbientTimezone {
        &self.timezone
    }

    /// Run `scenarios` in order, stopping at the first failure, then release the store
    pub async fn run(self, scenarios: &[Scenario]) -> HarnessReport {
        let mut report = HarnessReport::new(
            self.database.clone(),
            self.store.encoding(),
            self.plan,
        );

        for &scenario in scenarios {
            tracing::info!("Running {}", scenario);
            match self.run_scenario(scenario).await {
                Ok(pair) => {
                    tracing::info!("{} passed: {} preserved", scenario, pair.expected.as_millis());
                    report.push(ScenarioOutcome::passed(scenario, pair));
                }
                Err(e) => {
                    tracing::error!("{} failed: {}", scenario, e);
                    report.push(ScenarioOutcome::failed(scenario, &e));
                    break;
                }
            }
        }

        self.close().await;
        report
    }

    /// Run one scenario: reset, capture, assert
    ///
    /// # Errors
    /// - any `HarnessError`; nothing is retried
    pub async fn run_scenario(&self, scenario: Scenario) -> Result<CapturedPair, HarnessError> {
        match scenario {
            Scenario::StorageRoundTrip => {
                let check = StorageRoundTrip::new(
                    self.store.clone(),
                    Arc::clone(&self.clock),
                    self.timezone.clone(),
                    self.plan,
                );
                let pair = check.write_then_read().await?;
                assert_same_instant(Layer::Storage, pair)?;
                Ok(pair)
            }
            Scenario::SessionRoundTrip => {
                self.reset(ResetStrategy::FullTruncate).await?;

                let check = SessionRoundTrip::new(
                    self.identity.clone(),
                    CookieForwarder,
                    self.timezone.clone(),
                    self.plan,
                );
                let outcome = match check.signup_then_read(&self.fixture).await {
                    Ok(pair) => assert_same_instant(Layer::Session, pair)
                        .map(|()| pair)
                        .map_err(HarnessError::from),
                    Err(e) => Err(e),
                };

                // Truncate even on failure; the scenario's own error wins
                let cleanup = self.reset(ResetStrategy::FullTruncate).await;
                match (outcome, cleanup) {
                    (Ok(pair), Ok(_)) => Ok(pair),
                    (Ok(_), Err(e)) | (Err(e), Ok(_)) => Err(e),
                    (Err(e), Err(reset)) => {
                        tracing::warn!("Post-scenario reset failed: {}", reset);
                        Err(e)
                    }
                }
            }
        }
    }

    /// Administrative reset
    ///
    /// # Errors
    /// - `HarnessError::Storage` on any store failure
    pub async fn reset(&self, strategy: ResetStrategy) -> Result<ResetReport, HarnessError> {
        Ok(self.store.reset(strategy).await?)
    }

    /// Release the store connection
    pub async fn close(self) {
        close_quietly(&self.store).await;
    }
}

async fn close_quietly(store: &SqliteStore) {
    if let Err(e) = store.close().await {
        tracing::warn!("Failed to close {}: {}", store.target(), e);
    }
}
