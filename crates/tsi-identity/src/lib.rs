//! TSI Identity - accounts and sessions
//!
//! An email/password identity service persisted through [`tsi_store`]:
//! - `sign_up` creates a user (stamping its creation instant) and a session
//! - `get_session` resolves a session from request cookies
//! - [`CredentialExtractor`] turns response `Set-Cookie` headers into a
//!   request `Cookie` header
//!
//! Every instant column goes through the store's `TimestampEncoding`, so a
//! naive encoding shows up as drift on the session path as well.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod cookie;
pub mod error;
pub mod password;
pub mod service;
pub mod types;

pub use config::IdentityConfig;
pub use cookie::{find_cookie, CookieForwarder, CredentialExtractor};
pub use error::IdentityError;
pub use service::{IdentityService, SqliteIdentityService};
pub use types::{AuthResponse, HeaderMode, Session, SessionId, SessionView, SignUpRequest, User, UserId};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
