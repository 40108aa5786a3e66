//! Identity service over the shared SQLite store
//!
//! Three tables: `user`, `account` (password credential) and `session`.
//! Instants are written with the store's encoding under the zone in effect
//! at write time and decoded under the zone in effect at read time, exactly
//! like the record path.

use crate::config::IdentityConfig;
use crate::cookie::{expired_cookie, find_cookie, session_cookie};
use crate::error::IdentityError;
use crate::password::{hash_password, verify_password};
use crate::types::{AuthResponse, HeaderMode, Session, SessionId, SessionView, SignUpRequest, User, UserId};
use async_trait::async_trait;
use http::header::SET_COOKIE;
use http::HeaderMap;
use rand::Rng;
use rusqlite::{params, OptionalExtension};
use std::sync::Arc;
use tsi_instant::{Clock, Instant};
use tsi_store::SqliteStore;
use uuid::Uuid;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS "user" (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  email TEXT NOT NULL UNIQUE COLLATE NOCASE,
  email_verified INTEGER NOT NULL DEFAULT 0,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS account (
  id TEXT PRIMARY KEY,
  user_id TEXT NOT NULL REFERENCES "user"(id) ON DELETE CASCADE,
  provider_id TEXT NOT NULL,
  password_hash TEXT NOT NULL,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS session (
  id TEXT PRIMARY KEY,
  token TEXT NOT NULL UNIQUE,
  user_id TEXT NOT NULL REFERENCES "user"(id) ON DELETE CASCADE,
  expires_at TEXT NOT NULL,
  created_at TEXT NOT NULL,
  updated_at TEXT NOT NULL
);
"#;

const CREDENTIAL_PROVIDER: &str = "credential";
const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 8..=128;

/// Identity operations consumed by the session round-trip check
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Create a user with a password credential and open a session
    async fn sign_up(&self, request: SignUpRequest, headers: HeaderMode) -> Result<AuthResponse, IdentityError>;

    /// Open a session for an existing user
    async fn sign_in(&self, email: &str, password: &str, headers: HeaderMode) -> Result<AuthResponse, IdentityError>;

    /// Resolve the session named by the request's cookie
    ///
    /// # Errors
    /// - `IdentityError::NoSession` if there is no cookie, no such session,
    ///   or the session has expired. Never an empty success.
    async fn get_session(&self, request: &HeaderMap) -> Result<SessionView, IdentityError>;

    /// Invalidate the session named by the request's cookie; returns headers clearing it
    async fn sign_out(&self, request: &HeaderMap) -> Result<HeaderMap, IdentityError>;
}

/// [`IdentityService`] persisted in a [`SqliteStore`]
#[derive(Debug, Clone)]
pub struct SqliteIdentityService {
    store: SqliteStore,
    clock: Arc<dyn Clock>,
    config: IdentityConfig,
}

/// Raw columns of a session joined with its user
struct SessionRow {
    session_id: String,
    token: String,
    expires_at: String,
    session_created_at: String,
    user: UserRow,
}

/// Encoded columns of a session about to be inserted
struct SessionInsert {
    id: String,
    token: String,
    user_id: String,
    expires_at: String,
    created_at: String,
}

impl SessionInsert {
    fn insert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<usize> {
        conn.execute(
            "INSERT INTO session (id, token, user_id, expires_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![self.id, self.token, self.user_id, self.expires_at, self.created_at],
        )
    }
}

struct UserRow {
    id: String,
    name: String,
    email: String,
    email_verified: bool,
    created_at: String,
    updated_at: String,
}

impl SqliteIdentityService {
    /// Create a service over `store`
    #[must_use]
    pub fn new(store: SqliteStore, clock: Arc<dyn Clock>, config: IdentityConfig) -> Self {
        Self { store, clock, config }
    }

    /// Create the identity tables if missing
    ///
    /// # Errors
    /// - `IdentityError::Store` on schema failure
    pub async fn migrate(&self) -> Result<(), IdentityError> {
        self.store
            .interact(|conn| Ok(conn.execute_batch(SCHEMA)?))
            .await?;
        tracing::debug!("Identity schema ready");
        Ok(())
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    /// Fresh session for `user_id` created at `now`, with its encoded row
    fn new_session(&self, user_id: UserId, now: Instant) -> Result<(Session, SessionInsert), IdentityError> {
        let expires_at = Instant::from_millis(
            now.as_millis()
                .saturating_add(self.config.session_ttl_secs.saturating_mul(1000)),
        );
        let session = Session {
            id: SessionId::new(),
            token: new_token(),
            user_id,
            expires_at,
            created_at: now,
        };

        let row = SessionInsert {
            id: session.id.to_string(),
            token: session.token.clone(),
            user_id: user_id.to_string(),
            expires_at: self.store.encode_instant(expires_at)?,
            created_at: self.store.encode_instant(now)?,
        };
        Ok((session, row))
    }

    /// Insert a session row for `user_id`, returning the session and its token
    async fn open_session(&self, user_id: UserId) -> Result<Session, IdentityError> {
        let (session, row) = self.new_session(user_id, self.clock.now())?;
        self.store
            .interact(move |conn| {
                row.insert(conn)?;
                Ok(())
            })
            .await?;

        Ok(session)
    }

    fn response(&self, user: User, session: Session, mode: HeaderMode) -> Result<AuthResponse, IdentityError> {
        let headers = match mode {
            HeaderMode::Omit => None,
            HeaderMode::Return => {
                let mut headers = HeaderMap::new();
                headers.insert(
                    SET_COOKIE,
                    session_cookie(&self.config.cookie_name, &session.token, self.config.session_ttl_secs)?,
                );
                Some(headers)
            }
        };

        Ok(AuthResponse {
            user,
            token: session.token,
            headers,
        })
    }

    fn decode_user(&self, row: UserRow) -> Result<User, IdentityError> {
        Ok(User {
            id: UserId(parse_uuid(&row.id)?),
            name: row.name,
            email: row.email,
            email_verified: row.email_verified,
            created_at: self.store.decode_instant(&row.created_at)?,
            updated_at: self.store.decode_instant(&row.updated_at)?,
        })
    }
}

#[async_trait]
impl IdentityService for SqliteIdentityService {
    async fn sign_up(&self, request: SignUpRequest, headers: HeaderMode) -> Result<AuthResponse, IdentityError> {
        validate(&request)?;

        let now = self.clock.now();
        let user = User {
            id: UserId::new(),
            name: request.name,
            email: request.email,
            email_verified: false,
            created_at: now,
            updated_at: now,
        };

        let user_id = user.id.to_string();
        let account_id = Uuid::new_v4().to_string();
        let name = user.name.clone();
        let email = user.email.clone();
        let password_hash = hash_password(&request.password);
        let stamp = self.store.encode_instant(now)?;
        let (session, session_row) = self.new_session(user.id, now)?;

        // User, credential and first session commit together or not at all
        let inserted = self
            .store
            .interact(move |conn| {
                let tx = conn.transaction()?;
                let taken = tx
                    .query_row(r#"SELECT 1 FROM "user" WHERE email = ?1"#, [&email], |_| Ok(()))
                    .optional()?
                    .is_some();
                if taken {
                    return Ok(false);
                }
                tx.execute(
                    r#"INSERT INTO "user" (id, name, email, email_verified, created_at, updated_at)
                       VALUES (?1, ?2, ?3, 0, ?4, ?4)"#,
                    params![user_id, name, email, stamp],
                )?;
                tx.execute(
                    "INSERT INTO account (id, user_id, provider_id, password_hash, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                    params![account_id, user_id, CREDENTIAL_PROVIDER, password_hash, stamp],
                )?;
                session_row.insert(&tx)?;
                tx.commit()?;
                Ok(true)
            })
            .await?;

        if !inserted {
            return Err(IdentityError::EmailTaken(user.email));
        }

        tracing::info!("Signed up {} ({})", user.email, user.id);
        self.response(user, session, headers)
    }

    async fn sign_in(&self, email: &str, password: &str, headers: HeaderMode) -> Result<AuthResponse, IdentityError> {
        let lookup = email.to_string();
        let found = self
            .store
            .interact(move |conn| {
                Ok(conn
                    .query_row(
                        r#"SELECT u.id, u.name, u.email, u.email_verified, u.created_at, u.updated_at,
                                  a.password_hash
                           FROM "user" u JOIN account a ON a.user_id = u.id
                           WHERE u.email = ?1 AND a.provider_id = ?2"#,
                        params![lookup, CREDENTIAL_PROVIDER],
                        |row| {
                            Ok((
                                UserRow {
                                    id: row.get(0)?,
                                    name: row.get(1)?,
                                    email: row.get(2)?,
                                    email_verified: row.get(3)?,
                                    created_at: row.get(4)?,
                                    updated_at: row.get(5)?,
                                },
                                row.get::<_, String>(6)?,
                            ))
                        },
                    )
                    .optional()?)
            })
            .await?;

        let Some((row, stored_hash)) = found else {
            return Err(IdentityError::InvalidCredentials);
        };
        if !verify_password(password, &stored_hash) {
            tracing::warn!("Rejected sign-in for {}", email);
            return Err(IdentityError::InvalidCredentials);
        }

        let user = self.decode_user(row)?;
        let session = self.open_session(user.id).await?;
        self.response(user, session, headers)
    }

    async fn get_session(&self, request: &HeaderMap) -> Result<SessionView, IdentityError> {
        let token = find_cookie(request, &self.config.cookie_name)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| IdentityError::NoSession(format!("no {} cookie", self.config.cookie_name)))?
            .to_string();

        let row = self
            .store
            .interact(move |conn| {
                Ok(conn
                    .query_row(
                        r#"SELECT s.id, s.token, s.expires_at, s.created_at,
                                  u.id, u.name, u.email, u.email_verified, u.created_at, u.updated_at
                           FROM session s JOIN "user" u ON u.id = s.user_id
                           WHERE s.token = ?1"#,
                        [&token],
                        |row| {
                            Ok(SessionRow {
                                session_id: row.get(0)?,
                                token: row.get(1)?,
                                expires_at: row.get(2)?,
                                session_created_at: row.get(3)?,
                                user: UserRow {
                                    id: row.get(4)?,
                                    name: row.get(5)?,
                                    email: row.get(6)?,
                                    email_verified: row.get(7)?,
                                    created_at: row.get(8)?,
                                    updated_at: row.get(9)?,
                                },
                            })
                        },
                    )
                    .optional()?)
            })
            .await?
            .ok_or_else(|| IdentityError::NoSession("unknown session token".to_string()))?;

        let expires_at = self.store.decode_instant(&row.expires_at)?;
        if expires_at <= self.clock.now() {
            return Err(IdentityError::NoSession("session expired".to_string()));
        }

        let user = self.decode_user(row.user)?;
        let session = Session {
            id: SessionId(parse_uuid(&row.session_id)?),
            token: row.token,
            user_id: user.id,
            expires_at,
            created_at: self.store.decode_instant(&row.session_created_at)?,
        };

        tracing::debug!("Resolved session {} for {}", session.id, user.email);
        Ok(SessionView { session, user })
    }

    async fn sign_out(&self, request: &HeaderMap) -> Result<HeaderMap, IdentityError> {
        let token = find_cookie(request, &self.config.cookie_name)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| IdentityError::NoSession(format!("no {} cookie", self.config.cookie_name)))?
            .to_string();

        let deleted = self
            .store
            .interact(move |conn| Ok(conn.execute("DELETE FROM session WHERE token = ?1", [&token])?))
            .await?;
        if deleted == 0 {
            return Err(IdentityError::NoSession("unknown session token".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, expired_cookie(&self.config.cookie_name)?);
        Ok(headers)
    }
}

fn validate(request: &SignUpRequest) -> Result<(), IdentityError> {
    if request.name.trim().is_empty() {
        return Err(IdentityError::InvalidName(request.name.clone()));
    }

    let email = request.email.trim();
    let well_formed = email == request.email
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !domain.starts_with('.'));
    if !well_formed {
        return Err(IdentityError::InvalidEmail(request.email.clone()));
    }

    let len = request.password.chars().count();
    if !PASSWORD_LEN.contains(&len) {
        return Err(IdentityError::InvalidPassword(format!(
            "length {len} outside {}..={}",
            PASSWORD_LEN.start(),
            PASSWORD_LEN.end()
        )));
    }
    Ok(())
}

fn new_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    hex::encode(bytes)
}

fn parse_uuid(raw: &str) -> Result<Uuid, IdentityError> {
    Uuid::parse_str(raw).map_err(|e| IdentityError::CorruptRow(format!("id {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookie::{CookieForwarder, CredentialExtractor};
    use tsi_instant::{AmbientTimezone, FixedClock, Tz};
    use tsi_store::TimestampEncoding;

    const OBSERVED: Instant = Instant::from_millis(1_757_422_142_605);

    async fn service_with(tz: &AmbientTimezone, encoding: TimestampEncoding, config: IdentityConfig) -> SqliteIdentityService {
        let store = SqliteStore::open_in_memory(tz.clone(), encoding).await.unwrap();
        let service = SqliteIdentityService::new(store, Arc::new(FixedClock(OBSERVED)), config);
        service.migrate().await.unwrap();
        service
    }

    async fn service(tz: &AmbientTimezone) -> SqliteIdentityService {
        service_with(tz, TimestampEncoding::Aware, IdentityConfig::default()).await
    }

    fn test_user() -> SignUpRequest {
        SignUpRequest::new("test", "test@test.com", "password")
    }

    #[tokio::test]
    async fn sign_up_returns_submitted_fields() {
        let tz = AmbientTimezone::default();
        let service = service(&tz).await;

        let response = service.sign_up(test_user(), HeaderMode::Omit).await.unwrap();
        assert_eq!(response.user.name, "test");
        assert_eq!(response.user.email, "test@test.com");
        assert_eq!(response.user.created_at, OBSERVED);
        assert!(response.headers.is_none());
    }

    #[tokio::test]
    async fn sign_up_then_session_round_trip() {
        let tz = AmbientTimezone::new(Tz::Europe__London);
        let service = service(&tz).await;

        let response = service.sign_up(test_user(), HeaderMode::Return).await.unwrap();
        let request = CookieForwarder
            .extract_credential(response.headers.as_ref().unwrap())
            .unwrap();

        tz.set(Tz::America__Los_Angeles);
        let view = service.get_session(&request).await.unwrap();

        assert_eq!(view.user.id, response.user.id);
        assert_eq!(view.user.created_at, response.user.created_at);
        assert_eq!(view.session.token, response.token);
    }

    #[tokio::test]
    async fn naive_encoding_drifts_on_session_path() {
        let tz = AmbientTimezone::new(Tz::Europe__London);
        let service = service_with(&tz, TimestampEncoding::Naive, IdentityConfig::default()).await;

        let response = service.sign_up(test_user(), HeaderMode::Return).await.unwrap();
        let request = CookieForwarder
            .extract_credential(response.headers.as_ref().unwrap())
            .unwrap();

        tz.set(Tz::America__Los_Angeles);
        let view = service.get_session(&request).await.unwrap();

        // BST (UTC+1) to PDT (UTC-7)
        assert_eq!(response.user.created_at.millis_until(view.user.created_at), 8 * 3_600_000);
    }

    #[tokio::test]
    async fn failed_session_insert_rolls_back_the_sign_up() {
        let tz = AmbientTimezone::default();
        let service = service(&tz).await;
        service
            .store
            .interact(|conn| {
                Ok(conn.execute_batch(
                    "CREATE TRIGGER no_sessions BEFORE INSERT ON session
                     BEGIN SELECT RAISE(ABORT, 'sessions disabled'); END;",
                )?)
            })
            .await
            .unwrap();

        let err = service.sign_up(test_user(), HeaderMode::Return).await.unwrap_err();
        assert!(matches!(err, IdentityError::Store(_)), "{err:?}");
        for table in ["user", "account", "session"] {
            assert_eq!(service.store.row_count(table).await.unwrap(), 0, "{table}");
        }

        service
            .store
            .interact(|conn| Ok(conn.execute_batch("DROP TRIGGER no_sessions;")?))
            .await
            .unwrap();

        // No orphaned user blocks the retry
        let response = service.sign_up(test_user(), HeaderMode::Return).await.unwrap();
        assert_eq!(response.user.email, "test@test.com");
        assert_eq!(service.store.row_count("session").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected_case_insensitively() {
        let tz = AmbientTimezone::default();
        let service = service(&tz).await;

        service.sign_up(test_user(), HeaderMode::Omit).await.unwrap();
        let err = service
            .sign_up(SignUpRequest::new("other", "TEST@test.com", "password"), HeaderMode::Omit)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::EmailTaken(_)));
    }

    #[tokio::test]
    async fn validation_rejects_bad_input() {
        let tz = AmbientTimezone::default();
        let service = service(&tz).await;

        let cases = [
            SignUpRequest::new("", "a@b.co", "password"),
            SignUpRequest::new("a", "not-an-email", "password"),
            SignUpRequest::new("a", "a@b.co", "short"),
        ];
        for request in cases {
            assert!(service.sign_up(request, HeaderMode::Omit).await.is_err());
        }
    }

    #[tokio::test]
    async fn get_session_without_cookie_is_an_error() {
        let tz = AmbientTimezone::default();
        let service = service(&tz).await;

        let err = service.get_session(&HeaderMap::new()).await.unwrap_err();
        assert!(matches!(err, IdentityError::NoSession(_)));
    }

    #[tokio::test]
    async fn expired_session_is_rejected() {
        let tz = AmbientTimezone::default();
        let service = service_with(&tz, TimestampEncoding::Aware, IdentityConfig::new().with_session_ttl_secs(0)).await;

        let response = service.sign_up(test_user(), HeaderMode::Return).await.unwrap();
        let request = CookieForwarder
            .extract_credential(response.headers.as_ref().unwrap())
            .unwrap();

        let err = service.get_session(&request).await.unwrap_err();
        assert!(matches!(err, IdentityError::NoSession(ref reason) if reason.contains("expired")));
    }

    #[tokio::test]
    async fn sign_in_checks_password() {
        let tz = AmbientTimezone::default();
        let service = service(&tz).await;
        service.sign_up(test_user(), HeaderMode::Omit).await.unwrap();

        let ok = service
            .sign_in("test@test.com", "password", HeaderMode::Return)
            .await
            .unwrap();
        assert_eq!(ok.user.created_at, OBSERVED);
        assert!(ok.headers.is_some());

        let err = service
            .sign_in("test@test.com", "wrong-password", HeaderMode::Omit)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidCredentials));
    }

    #[tokio::test]
    async fn sign_out_invalidates_session() {
        let tz = AmbientTimezone::default();
        let service = service(&tz).await;

        let response = service.sign_up(test_user(), HeaderMode::Return).await.unwrap();
        let request = CookieForwarder
            .extract_credential(response.headers.as_ref().unwrap())
            .unwrap();

        let cleared = service.sign_out(&request).await.unwrap();
        assert!(cleared.contains_key(SET_COOKIE));

        let err = service.get_session(&request).await.unwrap_err();
        assert!(matches!(err, IdentityError::NoSession(_)));
    }
}
