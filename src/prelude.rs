//! Portcullis Prelude - Common imports for session-authenticated apps
//!
//! Re-exports the types a host application touches when wiring the
//! session protocol: configuration, the service, the store, and the
//! gate, in one import.
//!
//! # Usage
//!
//! ```ignore
//! use portcullis::prelude::*;
//!
//! let config = AuthConfig::from_env()?;
//! let app = Router::new()
//!     .route("/profile", get(profile))
//!     .with_session_gate(SessionGate::new(&config, store));
//! ```
//!
//! # What's Included
//!
//! ## Configuration
//! - [`AuthConfig`], [`AuthConfigBuilder`] - Lifetimes, timeout, cookie contract
//! - [`SigningSecret`], [`SecretPolicy`] - Secret validation and generation
//!
//! ## Tokens
//! - [`TokenSigner`], [`SignedToken`], [`SessionClaims`], [`Principal`]
//!
//! ## Session Store
//! - [`SessionStore`], [`MemorySessionStore`]
//! - [`RedisSessionStore`] (with the `redis` feature)
//!
//! ## Authentication Service
//! - [`AuthService`], [`IssuedSession`]
//! - [`UserDirectory`], [`UserRecord`], [`MemoryUserDirectory`]
//! - [`PasswordService`], [`Argon2PasswordService`]
//!
//! ## Session Gate
//! - [`SessionGate`], [`AuthSession`], [`ProtectedRouter`]
//!
//! ## Errors and Events
//! - [`AuthError`], [`SecurityEvent`], [`Severity`]

// =============================================================================
// Configuration
// =============================================================================

pub use crate::config::{AuthConfig, AuthConfigBuilder, ConfigError};
pub use crate::cookie::CookiePolicy;
pub use crate::secret::{SecretPolicy, SigningSecret};

// =============================================================================
// Tokens
// =============================================================================

pub use crate::token::{Principal, SessionClaims, SignedToken, TokenError, TokenSigner};

// =============================================================================
// Session Store
// =============================================================================

pub use crate::store::{session_key, MemorySessionStore, SessionStore, StoreError};

#[cfg(feature = "redis")]
pub use crate::store::RedisSessionStore;

// =============================================================================
// Authentication Service
// =============================================================================

pub use crate::auth::{
    AuthService,
    DirectoryError,
    IssuedSession,
    MemoryUserDirectory,
    UserDirectory,
    UserRecord,
};

// =============================================================================
// Passwords
// =============================================================================

pub use crate::password::{Argon2PasswordService, PasswordError, PasswordService};

// =============================================================================
// Session Gate
// =============================================================================

pub use crate::session::{
    session_guard,
    AuthSession,
    ProtectedRouter,
    SessionGate,
};

// =============================================================================
// Errors and Events
// =============================================================================

pub use crate::error::AuthError;
pub use crate::events::{SecurityEvent, Severity};
pub use crate::security_event;

// =============================================================================
// External Re-exports for Convenience
// =============================================================================

// Axum types commonly used alongside the gate
pub use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{delete, get, patch, post, put},
    Router,
};

// Tracing for logging
pub use tracing::{debug, error, info, instrument, trace, warn};
