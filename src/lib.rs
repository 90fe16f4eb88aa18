//! # Portcullis
//!
//! Remote-store-backed session authentication for Axum applications.
//!
//! A signed token alone does not make a session. Every login saves its
//! token to a shared store under the principal's key, and every
//! protected request must present a token that both verifies
//! cryptographically and exactly matches the stored one. Overwriting
//! the store entry is how a new login supersedes the old session;
//! deleting it is how logout and revocation work, with no token
//! blocklist to maintain.
//!
//! ## Features
//!
//! - **Token signing**: HS256 with a pinned algorithm, zero clock
//!   leeway, and a signing secret injected through configuration
//! - **Authoritative session store**: one live session per principal;
//!   Redis backend with bounded call timeouts (feature `redis`) plus an
//!   in-memory store for tests and single-instance use
//! - **Session gate**: middleware that verifies, cross-checks the
//!   store, and answers every rejection with the same generic 401
//! - **Credential handling**: Argon2 password hashing behind a trait,
//!   with one indistinguishable error for every login failure
//! - **Cookie contract**: HttpOnly, SameSite=Strict session cookie
//!   helpers for browser clients
//! - **Security events**: structured tracing for logins, supersession,
//!   revocation, and gate decisions
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use axum::{routing::{get, post}, Router};
//! use portcullis::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Fatal at startup if SESSION_SIGNING_SECRET is missing or weak
//!     let config = AuthConfig::from_env()?;
//!
//!     // Shared store; every call is bounded by config.store_timeout
//!     let store = Arc::new(
//!         RedisSessionStore::connect("redis://127.0.0.1/", config.store_timeout).await?,
//!     );
//!
//!     let auth = AuthService::new(
//!         &config,
//!         Arc::new(directory), // your UserDirectory implementation
//!         store.clone(),
//!         Arc::new(Argon2PasswordService::new()),
//!     );
//!     let gate = SessionGate::new(&config, store);
//!
//!     let app = Router::new()
//!         .route("/profile", get(profile))
//!         .with_session_gate(gate)
//!         // routes added after the gate stay public
//!         .route("/login", post(login))
//!         .with_state(auth);
//!
//!     // serve `app`...
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `redis` (default): the Redis-backed [`store::RedisSessionStore`].
//!   Disable it for hosts that bring their own [`store::SessionStore`]
//!   implementation.

pub mod auth;
pub mod config;
pub mod cookie;
pub mod crypto;
pub mod error;
pub mod events;
mod parse;
pub mod password;
pub mod prelude;
pub mod secret;
pub mod session;
pub mod store;
pub mod token;

// Re-exports
pub use auth::{AuthService, IssuedSession, UserDirectory, UserRecord};
pub use config::{AuthConfig, AuthConfigBuilder, ConfigError};
pub use cookie::CookiePolicy;
pub use crypto::{constant_time_eq, tokens_match};
pub use error::AuthError;
pub use events::{SecurityEvent, Severity};
pub use parse::parse_duration;
pub use password::{Argon2PasswordService, PasswordService};
pub use secret::{SecretPolicy, SigningSecret};
pub use session::{AuthSession, ProtectedRouter, SessionGate};
pub use store::{MemorySessionStore, SessionStore, StoreError};
pub use token::{Principal, SessionClaims, SignedToken, TokenSigner};

#[cfg(feature = "redis")]
pub use store::RedisSessionStore;
