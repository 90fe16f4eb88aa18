//! Authentication error taxonomy
//!
//! Internal components answer precise, typed error kinds; the outward
//! surface collapses all of them into two generic responses. A client
//! is never told which verification step failed: not "expired" versus
//! "superseded", not "unknown user" versus "wrong password". The
//! precise kind is logged server-side for operators.
//!
//! The collapse is not configurable. Unlike framework-level error
//! layers that expose details in development builds, the uniform
//! rejection here is part of the protocol contract.
//!
//! # Usage
//!
//! ```ignore
//! use portcullis::error::AuthError;
//!
//! async fn login_handler(/* ... */) -> Result<Json<LoginResponse>, AuthError> {
//!     let session = auth.login(&body.username, &body.password).await?;
//!     // a CredentialsInvalid error has already been collapsed to a
//!     // generic 401 by the time the client sees it
//!     Ok(Json(LoginResponse { token: session.token.into_string() }))
//! }
//! ```

use std::fmt;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::password::PasswordError;
use crate::store::StoreError;
use crate::token::TokenError;

/// The closed set of failure kinds in the authentication protocol.
///
/// Kind is separate from message text: kinds drive status mapping and
/// logging; the client-visible message is one of two fixed generic
/// strings chosen by status class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Login failed: unknown username or wrong password, deliberately
    /// indistinguishable
    CredentialsInvalid,
    /// Presented token is not a parseable encoding
    TokenMalformed,
    /// Presented token's signature or algorithm is wrong
    TokenSignatureInvalid,
    /// Presented token's embedded expiry has elapsed
    TokenExpired,
    /// Presented token lacks a required claim or has the wrong shape
    TokenClaimMissing,
    /// A token could not be signed at issuance
    TokenSigning,
    /// The store holds no session for the principal
    SessionNotFound,
    /// The stored token differs from the presented one; the session was
    /// superseded or revoked
    SessionMismatch,
    /// The session store could not be reached; callers fail closed
    StoreUnavailable { reason: String },
    /// The user directory could not be reached
    DirectoryUnavailable { reason: String },
    /// The password hashing backend failed
    PasswordHash,
}

impl AuthError {
    /// HTTP status for this kind: 401 for anything the caller did,
    /// 503 for anything the infrastructure did.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::CredentialsInvalid
            | Self::TokenMalformed
            | Self::TokenSignatureInvalid
            | Self::TokenExpired
            | Self::TokenClaimMissing
            | Self::SessionNotFound
            | Self::SessionMismatch => StatusCode::UNAUTHORIZED,

            Self::TokenSigning
            | Self::StoreUnavailable { .. }
            | Self::DirectoryUnavailable { .. }
            | Self::PasswordHash => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Stable snake_case name for structured log fields.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::CredentialsInvalid => "credentials_invalid",
            Self::TokenMalformed => "token_malformed",
            Self::TokenSignatureInvalid => "token_signature_invalid",
            Self::TokenExpired => "token_expired",
            Self::TokenClaimMissing => "token_claim_missing",
            Self::TokenSigning => "token_signing",
            Self::SessionNotFound => "session_not_found",
            Self::SessionMismatch => "session_mismatch",
            Self::StoreUnavailable { .. } => "store_unavailable",
            Self::DirectoryUnavailable { .. } => "directory_unavailable",
            Self::PasswordHash => "password_hash",
        }
    }

    /// Log the error before it is collapsed into a generic response.
    fn log(&self) {
        match self.status_code() {
            StatusCode::SERVICE_UNAVAILABLE => {
                tracing::error!(error_kind = self.kind_name(), reason = %self, "Auth infrastructure error");
            }
            _ => {
                tracing::warn!(error_kind = self.kind_name(), reason = %self, "Auth rejection");
            }
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialsInvalid => write!(f, "invalid credentials"),
            Self::TokenMalformed => write!(f, "malformed token"),
            Self::TokenSignatureInvalid => write!(f, "invalid token signature"),
            Self::TokenExpired => write!(f, "token expired"),
            Self::TokenClaimMissing => write!(f, "required claim missing or malformed"),
            Self::TokenSigning => write!(f, "token signing failed"),
            Self::SessionNotFound => write!(f, "no stored session for principal"),
            Self::SessionMismatch => write!(f, "presented token superseded by a newer session"),
            Self::StoreUnavailable { reason } => {
                write!(f, "session store unavailable: {}", reason)
            }
            Self::DirectoryUnavailable { reason } => {
                write!(f, "user directory unavailable: {}", reason)
            }
            Self::PasswordHash => write!(f, "password hashing failed"),
        }
    }
}

impl std::error::Error for AuthError {}

// ============================================================================
// Conversions from component errors
// ============================================================================

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Malformed => Self::TokenMalformed,
            TokenError::SignatureInvalid => Self::TokenSignatureInvalid,
            TokenError::Expired => Self::TokenExpired,
            TokenError::ClaimMissing => Self::TokenClaimMissing,
            TokenError::Signing => Self::TokenSigning,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => Self::SessionNotFound,
            StoreError::Unavailable { reason } => Self::StoreUnavailable { reason },
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        match err {
            // A wrong password and an unreadable digest both answer the
            // same generic rejection; the distinction lives in logs.
            PasswordError::Mismatch | PasswordError::BadDigest => Self::CredentialsInvalid,
            PasswordError::Hash => Self::PasswordHash,
        }
    }
}

// ============================================================================
// Error response
// ============================================================================

/// JSON error response format
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorResponse {
    /// Stable error code
    pub error: String,
    /// Generic human-readable message
    pub message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();

        let status = self.status_code();
        let body = match status {
            StatusCode::SERVICE_UNAVAILABLE => ErrorResponse {
                error: "service_unavailable".to_string(),
                message: "Service temporarily unavailable".to_string(),
            },
            _ => ErrorResponse {
                error: "unauthorized".to_string(),
                message: "Authentication required".to_string(),
            },
        };

        if status == StatusCode::UNAUTHORIZED {
            (
                status,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(body),
            )
                .into_response()
        } else {
            (status, Json(body)).into_response()
        }
    }
}

/// Result type alias for code returning [`AuthError`]
pub type Result<T> = std::result::Result<T, AuthError>;

// ============================================================================
// Tests
// ============================================================================
