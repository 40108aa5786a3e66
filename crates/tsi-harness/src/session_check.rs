//! Session round-trip checker
//!
//! sign up (headers requested) -> check echoed name/email -> capture
//! `created_at` -> switch zone -> forward credential -> resolve session ->
//! capture the session user's `created_at`.

use crate::equivalence::CapturedPair;
use crate::error::{HarnessError, PreconditionFailure};
use tsi_identity::{CredentialExtractor, HeaderMode, IdentityError, IdentityService, SignUpRequest};
use tsi_instant::{AmbientTimezone, TimezonePlan};

/// Creates an account and reads its creation instant back through a session
#[derive(Debug)]
pub struct SessionRoundTrip<I, C> {
    identity: I,
    extractor: C,
    timezone: AmbientTimezone,
    plan: TimezonePlan,
}

impl<I: IdentityService, C: CredentialExtractor> SessionRoundTrip<I, C> {
    /// Create a checker
    #[must_use]
    pub fn new(identity: I, extractor: C, timezone: AmbientTimezone, plan: TimezonePlan) -> Self {
        Self {
            identity,
            extractor,
            timezone,
            plan,
        }
    }

    /// Run the sign-up/perturb/session sequence
    ///
    /// # Errors
    /// - `HarnessError::Precondition` if name or email come back different
    /// - `HarnessError::MissingCredential` if no session can be resolved
    /// - `HarnessError::Identity` for other failures, store errors included
    pub async fn signup_then_read(&self, identity: &SignUpRequest) -> Result<CapturedPair, HarnessError> {
        let _restore = self.timezone.scoped(self.plan.create);
        tracing::info!("Starting signup test with user {}", identity.email);

        let created = self
            .identity
            .sign_up(identity.clone(), HeaderMode::Return)
            .await?;

        check_field("name", &identity.name, &created.user.name)?;
        check_field("email", &identity.email, &created.user.email)?;

        let t0 = created.user.created_at;
        tracing::info!("Created at {}", t0.render_local(&self.timezone));

        self.timezone.set(self.plan.read);
        tracing::debug!("Ambient timezone now {}", self.timezone.name());

        let response_headers = created
            .headers
            .as_ref()
            .ok_or(HarnessError::MissingCredential(IdentityError::MissingCredential))?;
        let request = self.extractor.extract_credential(response_headers)?;

        let view = self.identity.get_session(&request).await?;
        let t1 = view.user.created_at;
        tracing::info!("Session created at {}", t1.render_local(&self.timezone));

        Ok(CapturedPair::new(t0, t1))
    }
}

fn check_field(field: &'static str, submitted: &str, returned: &str) -> Result<(), PreconditionFailure> {
    if submitted == returned {
        return Ok(());
    }
    Err(PreconditionFailure {
        field,
        expected: submitted.to_string(),
        actual: returned.to_string(),
    })
}
