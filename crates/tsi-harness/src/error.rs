//! Error types for the harness
//!
//! Failures fall into four families that must stay distinguishable in the
//! output and the exit status:
//! - Precondition: account creation echoed the wrong identity fields
//! - Invariant: the instant changed across the round-trip
//! - Transport: storage or identity layer failed outright
//! - Missing credential: nothing usable to resolve a session with
//!
//! None of them is retried.

use crate::equivalence::InvariantViolation;
use serde::{Deserialize, Serialize};
use std::fmt;
use tsi_identity::IdentityError;
use tsi_instant::TimezoneError;
use tsi_store::StoreError;

/// Layer a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Direct record store round-trip
    Storage,
    /// Identity/session round-trip
    Session,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage => f.write_str("storage"),
            Self::Session => f.write_str("session"),
        }
    }
}

/// Failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Precondition,
    Invariant,
    Transport,
    MissingCredential,
    Config,
}

impl FailureKind {
    /// Process exit status for this kind of failure
    #[inline]
    #[must_use]
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Precondition => 2,
            Self::Invariant => 3,
            Self::Transport => 4,
            Self::MissingCredential => 5,
            Self::Config => 6,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Precondition => "precondition",
            Self::Invariant => "invariant",
            Self::Transport => "transport",
            Self::MissingCredential => "missing credential",
            Self::Config => "config",
        };
        f.write_str(name)
    }
}

/// Identity field echoed back differently from what was submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("account creation returned {field} {actual:?}, submitted {expected:?}")]
pub struct PreconditionFailure {
    pub field: &'static str,
    pub expected: String,
    pub actual: String,
}

/// Main harness error type
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// Returned identity fields do not match the submitted ones
    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionFailure),

    /// Instant changed across the round-trip
    #[error("invariant failed: {0}")]
    Invariant(#[from] InvariantViolation),

    /// Storage layer failure
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    /// Identity layer failure other than a missing credential, including
    /// store errors raised by the identity service
    #[error("identity failure: {0}")]
    Identity(IdentityError),

    /// No usable credential after account creation
    #[error("missing credential: {0}")]
    MissingCredential(IdentityError),

    /// Bad timezone configuration
    #[error("timezone error: {0}")]
    Timezone(#[from] TimezoneError),

    /// Any other configuration problem
    #[error("configuration error: {0}")]
    Config(String),
}

impl HarnessError {
    /// Failure family
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Precondition(_) => FailureKind::Precondition,
            Self::Invariant(_) => FailureKind::Invariant,
            Self::Storage(_) | Self::Identity(_) => FailureKind::Transport,
            Self::MissingCredential(_) => FailureKind::MissingCredential,
            Self::Timezone(_) | Self::Config(_) => FailureKind::Config,
        }
    }

    /// Layer the failure is pinned to, when the error itself knows
    #[must_use]
    pub fn layer(&self) -> Option<Layer> {
        match self {
            Self::Invariant(violation) => Some(violation.layer),
            Self::Storage(_) => Some(Layer::Storage),
            Self::Precondition(_) | Self::Identity(_) | Self::MissingCredential(_) => Some(Layer::Session),
            Self::Timezone(_) | Self::Config(_) => None,
        }
    }

    /// Process exit status
    #[inline]
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }
}

impl From<IdentityError> for HarnessError {
    fn from(err: IdentityError) -> Self {
        if err.is_missing_credential() {
            Self::MissingCredential(err)
        } else {
            Self::Identity(err)
        }
    }
}
