//! Identity service configuration

use serde::{Deserialize, Serialize};

/// Session and cookie settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Session lifetime in seconds
    pub session_ttl_secs: i64,
    /// Name of the session cookie
    pub cookie_name: String,
}

impl IdentityConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With session lifetime
    #[inline]
    #[must_use]
    pub fn with_session_ttl_secs(mut self, secs: i64) -> Self {
        self.session_ttl_secs = secs;
        self
    }

    /// With cookie name
    #[inline]
    #[must_use]
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 7 * 24 * 60 * 60,
            cookie_name: "tsi.session_token".to_string(),
        }
    }
}
