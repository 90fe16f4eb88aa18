//! Authentication Service
//!
//! Credential verification and session lifecycle orchestration: login,
//! logout, password change, and administrative revocation. This is the
//! only component that writes to the session store; the request gate in
//! [`crate::session`] only reads from it.
//!
//! # Design Philosophy
//!
//! A principal holds at most one live session. Login does not check for
//! an existing session before saving: it unconditionally overwrites the
//! store entry, which both establishes the new session and invalidates
//! the previous token in a single write. There is no separate "revoke
//! then create" sequence to get half-done.
//!
//! Login failures are deliberately coarse. An unknown username and a
//! wrong password both answer [`AuthError::CredentialsInvalid`], so a
//! caller cannot probe which usernames exist. The precise cause is
//! logged server-side.
//!
//! # Concurrency
//!
//! Overwrite semantics make concurrent logins safe: two simultaneous
//! logins for the same principal race their store writes, exactly one
//! wins, and only the winning token passes the gate afterwards. A
//! logout racing a login can delete the session the login just saved;
//! the affected user logs in again. The store is never left with more
//! than one session per principal.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use portcullis::auth::{AuthService, MemoryUserDirectory};
//! use portcullis::config::AuthConfig;
//! use portcullis::password::Argon2PasswordService;
//! use portcullis::store::MemorySessionStore;
//!
//! let config = AuthConfig::from_env()?;
//! let auth = AuthService::new(
//!     &config,
//!     Arc::new(directory),
//!     Arc::new(store),
//!     Arc::new(Argon2PasswordService::new()),
//! );
//!
//! // Login: verify credentials, issue a token, save the session
//! let session = auth.login("alice", "password").await?;
//! println!("issued {}", session.token.preview());
//!
//! // Logout: verify the token first, then remove the session
//! auth.logout(session.token.as_str()).await?;
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::events::SecurityEvent;
use crate::password::PasswordService;
use crate::security_event;
use crate::store::SessionStore;
use crate::token::{Principal, SignedToken, TokenSigner};

// ============================================================================
// User directory
// ============================================================================

/// A user as the directory knows it.
///
/// Only the fields the authentication flow needs. The digest is an
/// encoded password hash (PHC string), never a plaintext password.
#[derive(Debug, Clone)]
pub struct UserRecord {
    /// Stable numeric identifier, used as the session principal
    pub id: Principal,
    /// Login name, unique within the directory
    pub username: String,
    /// Encoded password hash
    pub password_digest: String,
}

/// Error from the user directory backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The backing store could not be reached
    Unavailable { reason: String },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { reason } => write!(f, "user directory unavailable: {}", reason),
        }
    }
}

impl std::error::Error for DirectoryError {}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Unavailable { reason } => Self::DirectoryUnavailable { reason },
        }
    }
}

/// Lookup and update interface over the user backend.
///
/// Implement this against your database. A lookup that finds nothing is
/// `Ok(None)`, not an error; `Err` means the backend itself failed and
/// the caller fails closed.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Find a user by login name
    async fn find_by_username(&self, username: &str)
        -> Result<Option<UserRecord>, DirectoryError>;

    /// Find a user by principal id
    async fn find_by_id(&self, principal: Principal)
        -> Result<Option<UserRecord>, DirectoryError>;

    /// Replace a user's password digest
    async fn update_password_digest(
        &self,
        principal: Principal,
        digest: &str,
    ) -> Result<(), DirectoryError>;
}

// ============================================================================
// Issued session
// ============================================================================

/// The result of a successful login or password change.
///
/// Carries the typed principal alongside the signed token so handlers
/// never re-parse the token to learn who logged in.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// Principal the token was issued to
    pub principal: Principal,
    /// The signed session token
    pub token: SignedToken,
}

// ============================================================================
// Authentication service
// ============================================================================

/// Orchestrates credential checks and the session lifecycle.
///
/// Cheap to clone; collaborators are shared behind `Arc`.
#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn UserDirectory>,
    store: Arc<dyn SessionStore>,
    passwords: Arc<dyn PasswordService>,
    signer: TokenSigner,
    session_ttl: Duration,
}

impl AuthService {
    /// Create a service from configuration and collaborators.
    pub fn new(
        config: &AuthConfig,
        directory: Arc<dyn UserDirectory>,
        store: Arc<dyn SessionStore>,
        passwords: Arc<dyn PasswordService>,
    ) -> Self {
        Self {
            directory,
            store,
            passwords,
            signer: TokenSigner::new(config),
            session_ttl: config.session_ttl,
        }
    }

    /// The signer this service issues tokens with.
    ///
    /// The request gate shares it so both sides agree on the secret.
    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Verify credentials and establish a session.
    ///
    /// On success the new token is saved under the principal's key,
    /// replacing whatever session was there. On any credential problem
    /// the store is left untouched and the caller gets the one generic
    /// [`AuthError::CredentialsInvalid`].
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedSession, AuthError> {
        let user = match self.directory.find_by_username(username).await? {
            Some(user) => user,
            None => {
                security_event!(
                    SecurityEvent::AuthenticationFailure,
                    username = %username,
                    reason = "unknown_user",
                    "Login rejected"
                );
                return Err(AuthError::CredentialsInvalid);
            }
        };

        if let Err(err) = self.passwords.compare(&user.password_digest, password) {
            security_event!(
                SecurityEvent::AuthenticationFailure,
                username = %username,
                principal = %user.id,
                reason = %err,
                "Login rejected"
            );
            return Err(err.into());
        }

        let session = self.establish(user.id).await?;

        security_event!(
            SecurityEvent::AuthenticationSuccess,
            username = %username,
            principal = %user.id,
            token = %session.token.preview(),
            "User authenticated"
        );

        Ok(session)
    }

    /// Verify a token and end its session.
    ///
    /// The token is verified before the store is consulted, so a
    /// malformed or forged token cannot trigger a store operation. If
    /// the session is already gone the delete is a no-op and logout
    /// still succeeds; logging out twice is not an error.
    pub async fn logout(&self, token: &str) -> Result<Principal, AuthError> {
        let claims = self.signer.verify(token)?;

        self.store.delete(claims.sub).await?;

        security_event!(
            SecurityEvent::Logout,
            principal = %claims.sub,
            token = %crate::token::token_preview(token),
            "User logged out"
        );

        Ok(claims.sub)
    }

    /// Change a principal's password and rotate their session.
    ///
    /// The current password must verify against the stored digest. On
    /// success the new digest is persisted and a fresh token is issued
    /// and saved, which invalidates the pre-change session token the
    /// same way a new login would.
    pub async fn change_password(
        &self,
        principal: Principal,
        current_password: &str,
        new_password: &str,
    ) -> Result<IssuedSession, AuthError> {
        let user = match self.directory.find_by_id(principal).await? {
            Some(user) => user,
            None => {
                security_event!(
                    SecurityEvent::AuthenticationFailure,
                    principal = %principal,
                    reason = "unknown_principal",
                    "Password change rejected"
                );
                return Err(AuthError::CredentialsInvalid);
            }
        };

        if let Err(err) = self.passwords.compare(&user.password_digest, current_password) {
            security_event!(
                SecurityEvent::AuthenticationFailure,
                principal = %principal,
                reason = %err,
                "Password change rejected"
            );
            return Err(err.into());
        }

        let digest = self.passwords.hash(new_password)?;
        self.directory
            .update_password_digest(principal, &digest)
            .await?;

        let session = self.establish(principal).await?;

        security_event!(
            SecurityEvent::PasswordChanged,
            principal = %principal,
            token = %session.token.preview(),
            "Password changed, session rotated"
        );

        Ok(session)
    }

    /// Remove a principal's session without a token.
    ///
    /// Administrative path for account deactivation. Succeeds whether or
    /// not a session existed.
    pub async fn revoke(&self, principal: Principal) -> Result<(), AuthError> {
        self.store.delete(principal).await?;

        security_event!(
            SecurityEvent::SessionDestroyed,
            principal = %principal,
            "Session revoked"
        );

        Ok(())
    }

    /// Issue a token for the principal and save it as their session.
    async fn establish(&self, principal: Principal) -> Result<IssuedSession, AuthError> {
        let token = self.signer.issue(principal)?;
        self.store
            .save(principal, token.as_str(), self.session_ttl)
            .await?;

        security_event!(
            SecurityEvent::SessionCreated,
            principal = %principal,
            token = %token.preview(),
            "Session saved"
        );

        Ok(IssuedSession { principal, token })
    }
}

// ============================================================================
// In-memory directory
// ============================================================================

/// In-memory [`UserDirectory`] for tests and single-instance use.
///
/// Production deployments implement [`UserDirectory`] against their
/// user database instead.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: Arc<RwLock<HashMap<Principal, UserRecord>>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user record.
    pub fn insert(&self, record: UserRecord) {
        self.users.write().unwrap().insert(record.id, record);
    }
}

impl Clone for MemoryUserDirectory {
    fn clone(&self) -> Self {
        Self {
            users: Arc::clone(&self.users),
        }
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        let users = self.users.read().unwrap();
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(
        &self,
        principal: Principal,
    ) -> Result<Option<UserRecord>, DirectoryError> {
        let users = self.users.read().unwrap();
        Ok(users.get(&principal).cloned())
    }

    async fn update_password_digest(
        &self,
        principal: Principal,
        digest: &str,
    ) -> Result<(), DirectoryError> {
        let mut users = self.users.write().unwrap();
        match users.get_mut(&principal) {
            Some(user) => {
                user.password_digest = digest.to_string();
                Ok(())
            }
            None => Ok(()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
