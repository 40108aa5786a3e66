//! Error types for the identity service

use tsi_store::StoreError;

/// Identity and session errors
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Name is empty
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// Email is not shaped like an address
    #[error("invalid email: {0:?}")]
    InvalidEmail(String),

    /// Password length outside the accepted range
    #[error("invalid password: {0}")]
    InvalidPassword(String),

    /// An account already uses this email
    #[error("email already registered: {0}")]
    EmailTaken(String),

    /// Unknown email or wrong password
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Response carried nothing that can be forwarded as a credential
    #[error("response carried no credential to forward")]
    MissingCredential,

    /// Request does not resolve to a live session
    #[error("no session: {0}")]
    NoSession(String),

    /// Header value could not be built or read
    #[error("header error: {0}")]
    Header(String),

    /// Stored row does not decode
    #[error("corrupt row: {0}")]
    CorruptRow(String),

    /// Underlying storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl IdentityError {
    /// Missing or unusable credential, as opposed to a validation or storage failure
    #[inline]
    #[must_use]
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, Self::MissingCredential | Self::NoSession(_))
    }
}
