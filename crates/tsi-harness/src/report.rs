//! Run report

use crate::equivalence::CapturedPair;
use crate::error::{FailureKind, HarnessError, Layer};
use crate::scenario::Scenario;
use serde::Serialize;
use tsi_instant::TimezonePlan;
use tsi_store::TimestampEncoding;

/// Result of one scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Passed {
        expected_millis: i64,
        actual_millis: i64,
    },
    Failed {
        kind: FailureKind,
        exit_code: i32,
        message: String,
    },
}

/// One line of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioOutcome {
    pub scenario: Scenario,
    pub layer: Layer,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl ScenarioOutcome {
    /// Scenario whose captured pair passed the assertion
    #[must_use]
    pub fn passed(scenario: Scenario, pair: CapturedPair) -> Self {
        Self {
            scenario,
            layer: scenario.layer(),
            status: OutcomeStatus::Passed {
                expected_millis: pair.expected.as_millis(),
                actual_millis: pair.actual.as_millis(),
            },
        }
    }

    /// Scenario that stopped on `error`
    #[must_use]
    pub fn failed(scenario: Scenario, error: &HarnessError) -> Self {
        Self {
            scenario,
            layer: error.layer().unwrap_or_else(|| scenario.layer()),
            status: OutcomeStatus::Failed {
                kind: error.kind(),
                exit_code: error.exit_code(),
                message: error.to_string(),
            },
        }
    }

    /// Whether the scenario passed
    #[inline]
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self.status, OutcomeStatus::Passed { .. })
    }
}

/// Report for a whole run
#[derive(Debug, Clone, Serialize)]
pub struct HarnessReport {
    pub database: String,
    pub encoding: TimestampEncoding,
    pub create_timezone: &'static str,
    pub read_timezone: &'static str,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl HarnessReport {
    /// Empty report
    #[must_use]
    pub fn new(database: String, encoding: TimestampEncoding, plan: TimezonePlan) -> Self {
        Self {
            database,
            encoding,
            create_timezone: plan.create.name(),
            read_timezone: plan.read.name(),
            outcomes: Vec::new(),
        }
    }

    /// Append an outcome
    pub fn push(&mut self, outcome: ScenarioOutcome) {
        self.outcomes.push(outcome);
    }

    /// True when every scenario that ran passed
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcomes.iter().all(ScenarioOutcome::is_passed)
    }

    /// First failed scenario, if any
    #[must_use]
    pub fn first_failure(&self) -> Option<&ScenarioOutcome> {
        self.outcomes.iter().find(|o| !o.is_passed())
    }

    /// 0 on success, the failure's code otherwise
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.first_failure().map(|o| &o.status) {
            Some(OutcomeStatus::Failed { exit_code, .. }) => *exit_code,
            _ => 0,
        }
    }

    /// Generate text report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();

        report.push_str("=== Timestamp Round-Trip Report ===\n\n");
        report.push_str(&format!("Database: {}\n", self.database));
        report.push_str(&format!("Encoding: {}\n", self.encoding));
        report.push_str(&format!(
            "Timezones: {} -> {}\n\n",
            self.create_timezone, self.read_timezone
        ));

        for outcome in &self.outcomes {
            match &outcome.status {
                OutcomeStatus::Passed {
                    expected_millis,
                    actual_millis,
                } => report.push_str(&format!(
                    "[PASS] {} ({}): expected {}, actual {}\n",
                    outcome.scenario, outcome.layer, expected_millis, actual_millis
                )),
                OutcomeStatus::Failed { kind, message, .. } => report.push_str(&format!(
                    "[FAIL] {} ({}, {}): {}\n",
                    outcome.scenario, outcome.layer, kind, message
                )),
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));

        report
    }

    /// Pretty JSON
    ///
    /// # Errors
    /// - `serde_json::Error` (not expected for this type)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
