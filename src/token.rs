//! Session token issuance and verification
//!
//! Signed bearer tokens carry the principal id and an expiry, nothing
//! more. Verification is a pure, offline check: algorithm pinning,
//! signature, expiry, claim shape. Whether the token is still the
//! authoritative session for its principal is a separate question the
//! session store answers (see [`session`](crate::session)).
//!
//! # Design Philosophy
//!
//! - **HS256 only, pinned at verification**: a token whose header names
//!   any other algorithm fails before its claims are read, closing the
//!   algorithm-substitution hole.
//! - **Zero clock leeway**: the embedded expiry is a hard bound, not a
//!   suggestion.
//! - **Typed claims**: a token without a numeric principal id fails
//!   with a claim error instead of admitting a default value.
//! - **No store access**: the signer cannot revoke, it only attests.
//!
//! # Usage
//!
//! ```ignore
//! use portcullis::{AuthConfig, SigningSecret, TokenSigner};
//!
//! let config = AuthConfig::new(SigningSecret::generate(&Default::default()));
//! let signer = TokenSigner::new(&config);
//!
//! let token = signer.issue(42)?;
//! let claims = signer.verify(token.as_str())?;
//! assert_eq!(claims.sub, 42);
//! ```

use std::fmt;

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;

/// Numeric identifier of an authenticated user.
///
/// Owned by the host application's user management; this crate only
/// carries it through tokens, store keys, and request extensions.
pub type Principal = u64;

/// Claims embedded in every session token.
///
/// Parsed as a whole during verification; a token whose payload does
/// not deserialize into exactly this shape (numeric `sub`, numeric
/// timestamps) is rejected with [`TokenError::ClaimMissing`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Principal the token was issued to
    pub sub: Principal,
    /// Issuance time, unix seconds
    pub iat: i64,
    /// Expiry, unix seconds
    pub exp: i64,
    /// Unique token id, so two logins in the same second still produce
    /// distinct tokens and supersession stays observable
    pub jti: String,
}

/// An encoded, signed session token.
///
/// Opaque outside this module. `Debug` prints a truncated preview so a
/// stray debug log cannot leak a usable credential; use
/// [`as_str`](Self::as_str) when the full value is genuinely needed
/// (response bodies, cookies, store writes).
#[derive(Clone, PartialEq, Eq)]
pub struct SignedToken(String);

impl SignedToken {
    /// The full encoded token.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper, yielding the encoded token.
    pub fn into_string(self) -> String {
        self.0
    }

    /// Truncated form for log statements.
    pub fn preview(&self) -> String {
        token_preview(&self.0)
    }
}

impl From<String> for SignedToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignedToken({})", self.preview())
    }
}

/// Truncate a presented token for logging.
///
/// Matches the operational convention of logging only the first few
/// characters; enough to correlate, never enough to replay.
pub fn token_preview(token: &str) -> String {
    let head: String = token.chars().take(10).collect();
    format!("{}...", head)
}

/// Error kinds for token issuance and verification.
///
/// Kind is separated from message text: the kind drives control flow
/// and logging, the `Display` form is for operator logs only and never
/// reaches a client verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    /// Not a parseable token encoding
    Malformed,
    /// Signature check failed, or the header named a different algorithm
    SignatureInvalid,
    /// Embedded expiry has elapsed
    Expired,
    /// A required claim is absent or not of the expected type
    ClaimMissing,
    /// The signing backend failed while encoding
    Signing,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed token"),
            Self::SignatureInvalid => write!(f, "invalid token signature"),
            Self::Expired => write!(f, "token expired"),
            Self::ClaimMissing => write!(f, "required claim missing or malformed"),
            Self::Signing => write!(f, "token signing failed"),
        }
    }
}

impl std::error::Error for TokenError {}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName => Self::SignatureInvalid,
            // Claims are only deserialized after the signature passes,
            // so a JSON shape failure means a signed-but-wrong payload.
            ErrorKind::MissingRequiredClaim(_) | ErrorKind::Json(_) => Self::ClaimMissing,
            _ => Self::Malformed,
        }
    }
}

/// Issues and verifies signed session tokens.
///
/// Stateless: the signer holds derived key material and the pinned
/// validation rules, nothing per-session. The signing secret arrives
/// through [`AuthConfig`], never from ambient global state.
#[derive(Clone)]
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenSigner {
    /// Build a signer from the injected configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // The expiry embedded at issuance is exact; no grace window.
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            ttl_secs: config.token_ttl.as_secs() as i64,
        }
    }

    /// Create a signed token for `principal`, expiring after the
    /// configured token TTL.
    pub fn issue(&self, principal: Principal) -> Result<SignedToken, TokenError> {
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: principal,
            iat: now,
            exp: now + self.ttl_secs,
            jti: Uuid::new_v4().to_string(),
        };

        let encoded = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| TokenError::Signing)?;
        Ok(SignedToken(encoded))
    }

    /// Verify a presented token: algorithm, signature, expiry, claim
    /// shape. Purely local; never consults the session store.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}
