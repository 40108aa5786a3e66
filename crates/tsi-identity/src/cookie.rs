//! Cookie credential exchange
//!
//! The checker never parses cookies itself. It hands the creation
//! response's headers to a [`CredentialExtractor`] and gets back headers
//! for the next request.

use crate::error::IdentityError;
use http::header::{COOKIE, SET_COOKIE};
use http::{HeaderMap, HeaderValue};

/// Response headers in, request headers out
pub trait CredentialExtractor: Send + Sync {
    /// Build request headers carrying the credential found in `response`
    ///
    /// # Errors
    /// - `IdentityError::MissingCredential` if `response` has nothing to forward
    fn extract_credential(&self, response: &HeaderMap) -> Result<HeaderMap, IdentityError>;
}

/// Forwards every `Set-Cookie` pair as a single `Cookie` header
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieForwarder;

impl CredentialExtractor for CookieForwarder {
    fn extract_credential(&self, response: &HeaderMap) -> Result<HeaderMap, IdentityError> {
        let pairs: Vec<&str> = response
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|raw| raw.split(';').next())
            .map(str::trim)
            .filter(|pair| pair.contains('='))
            .collect();

        if pairs.is_empty() {
            return Err(IdentityError::MissingCredential);
        }

        let value = HeaderValue::from_str(&pairs.join("; "))
            .map_err(|e| IdentityError::Header(e.to_string()))?;

        let mut request = HeaderMap::new();
        request.insert(COOKIE, value);
        Ok(request)
    }
}

/// Value of cookie `name` in the request's `Cookie` headers
#[must_use]
pub fn find_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

pub(crate) fn session_cookie(
    name: &str,
    token: &str,
    max_age_secs: i64,
) -> Result<HeaderValue, IdentityError> {
    HeaderValue::from_str(&format!(
        "{name}={token}; Max-Age={max_age_secs}; Path=/; HttpOnly; SameSite=Lax"
    ))
    .map_err(|e| IdentityError::Header(e.to_string()))
}

pub(crate) fn expired_cookie(name: &str) -> Result<HeaderValue, IdentityError> {
    session_cookie(name, "", 0)
}
