//! TSI Harness - timestamp round-trip verification
//!
//! Checks that an instant captured when something is created comes back
//! with the same tick count after the ambient timezone changes:
//! 1. **Storage round-trip**: write to a record table, read the latest row
//! 2. **Session round-trip**: sign up, then resolve the session user
//!
//! Scenarios run one after another against a single store connection and
//! stop at the first failure. Every failure is classified
//! ([`FailureKind`]) and maps to its own exit status.
//!
//! # Example
//!
//! ```rust,ignore
//! use tsi_harness::{Harness, HarnessConfig, Scenario};
//!
//! let config = HarnessConfig::new().with_timezones("Europe/London", "America/Los_Angeles");
//! let harness = Harness::bootstrap(&config).await?;
//! let report = harness.run(&Scenario::ALL).await;
//!
//! println!("{}", report.generate_text());
//! std::process::exit(report.exit_code());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod equivalence;
pub mod error;
pub mod logging;
pub mod report;
pub mod scenario;
pub mod session_check;
pub mod storage_check;

pub use config::{HarnessConfig, IdentityFixture};
pub use equivalence::{assert_same_instant, CapturedPair, InvariantViolation};
pub use error::{FailureKind, HarnessError, Layer, PreconditionFailure};
pub use logging::init_tracing;
pub use report::{HarnessReport, OutcomeStatus, ScenarioOutcome};
pub use scenario::{Harness, Scenario};
pub use session_check::SessionRoundTrip;
pub use storage_check::StorageRoundTrip;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
