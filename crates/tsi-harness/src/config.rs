//! Harness configuration
//!
//! Defaults reproduce the canonical scenario: sign up as
//! `test / test@test.com` under Europe/London, read back under
//! America/Los_Angeles, against an in-memory database with zone-aware
//! timestamp columns. A TOML file can override any field; the CLI
//! overrides the file.

use crate::error::HarnessError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tsi_identity::{IdentityConfig, SignUpRequest};
use tsi_instant::{Clock, FixedClock, Instant, SystemClock, TimezonePlan};
use tsi_store::{DatabaseTarget, TimestampEncoding};

/// Identity submitted by the session round-trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityFixture {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl IdentityFixture {
    /// Sign-up request for this identity
    #[must_use]
    pub fn to_request(&self) -> SignUpRequest {
        SignUpRequest::new(self.name.clone(), self.email.clone(), self.password.clone())
    }
}

impl Default for IdentityFixture {
    fn default() -> Self {
        Self {
            name: "test".to_string(),
            email: "test@test.com".to_string(),
            password: "password".to_string(),
        }
    }
}

/// Harness configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// `:memory:`, `sqlite://path` or a plain path
    pub database_url: String,
    /// Zone in effect when instants are captured and written
    pub create_timezone: String,
    /// Zone in effect when instants are read back
    pub read_timezone: String,
    /// Instant column encoding
    pub encoding: TimestampEncoding,
    /// Identity used by the session round-trip
    pub identity: IdentityFixture,
    /// Session/cookie settings
    pub session: IdentityConfig,
    /// Pin "now" to this tick count instead of the wall clock
    pub fixed_instant_millis: Option<i64>,
}

impl HarnessConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML; missing fields take their defaults
    ///
    /// # Errors
    /// - `HarnessError::Config` on invalid TOML or field values
    pub fn from_toml_str(raw: &str) -> Result<Self, HarnessError> {
        toml::from_str(raw).map_err(|e| HarnessError::Config(e.to_string()))
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// - `HarnessError::Config` if the file cannot be read or parsed
    pub fn from_toml_file(path: &Path) -> Result<Self, HarnessError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// With database location
    #[inline]
    #[must_use]
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = url.into();
        self
    }

    /// With capture and read-back zones
    #[inline]
    #[must_use]
    pub fn with_timezones(mut self, create: impl Into<String>, read: impl Into<String>) -> Self {
        self.create_timezone = create.into();
        self.read_timezone = read.into();
        self
    }

    /// With instant column encoding
    #[inline]
    #[must_use]
    pub fn with_encoding(mut self, encoding: TimestampEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// With identity fixture
    #[inline]
    #[must_use]
    pub fn with_identity(mut self, identity: IdentityFixture) -> Self {
        self.identity = identity;
        self
    }

    /// With a pinned "now"
    #[inline]
    #[must_use]
    pub fn with_fixed_instant(mut self, instant: Instant) -> Self {
        self.fixed_instant_millis = Some(instant.as_millis());
        self
    }

    /// Parsed capture/read-back zones
    ///
    /// # Errors
    /// - `HarnessError::Timezone` for unknown or identical zones
    pub fn plan(&self) -> Result<TimezonePlan, HarnessError> {
        Ok(TimezonePlan::from_names(&self.create_timezone, &self.read_timezone)?)
    }

    /// Parsed database location
    #[must_use]
    pub fn database_target(&self) -> DatabaseTarget {
        DatabaseTarget::parse(&self.database_url)
    }

    /// Clock implied by `fixed_instant_millis`
    #[must_use]
    pub fn clock(&self) -> Arc<dyn Clock> {
        match self.fixed_instant_millis {
            Some(millis) => Arc::new(FixedClock(Instant::from_millis(millis))),
            None => Arc::new(SystemClock),
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            database_url: ":memory:".to_string(),
            create_timezone: "Europe/London".to_string(),
            read_timezone: "America/Los_Angeles".to_string(),
            encoding: TimestampEncoding::Aware,
            identity: IdentityFixture::default(),
            session: IdentityConfig::default(),
            fixed_instant_millis: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_canonical_scenario() {
        let config = HarnessConfig::new();
        let plan = config.plan().unwrap();

        assert_eq!(plan, TimezonePlan::default());
        assert_eq!(config.database_target(), DatabaseTarget::Memory);
        assert_eq!(config.identity.email, "test@test.com");
    }

    #[test]
    fn toml_overrides_selected_fields() {
        let config = HarnessConfig::from_toml_str(
            r#"
            database_url = "sqlite:///tmp/tsi.db"
            create_timezone = "Africa/Addis_Ababa"
            encoding = "naive"
            fixed_instant_millis = 1757422142605

            [identity]
            email = "replay@test.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.encoding, TimestampEncoding::Naive);
        assert_eq!(config.read_timezone, "America/Los_Angeles");
        assert_eq!(config.identity.email, "replay@test.com");
        assert_eq!(config.identity.name, "test");
        assert_eq!(config.clock().now(), Instant::from_millis(1_757_422_142_605));
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = HarnessConfig::from_toml_str("encoding = \"sideways\"").unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn identical_zones_are_rejected() {
        let config = HarnessConfig::new().with_timezones("UTC", "UTC");
        assert!(matches!(config.plan(), Err(HarnessError::Timezone(_))));
    }
}
