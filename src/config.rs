//! Authentication configuration
//!
//! Provides a builder-pattern configuration for the session-authentication
//! protocol: signing secret, token and session lifetimes, store call
//! timeout, and the session cookie contract.

use std::fmt;
use std::time::Duration;

use crate::cookie::CookiePolicy;
use crate::parse::parse_duration;
use crate::secret::{SecretError, SecretPolicy, SigningSecret};

/// Configuration for the session-authentication protocol.
///
/// Two lifetimes govern a session and they are reconciled here, once,
/// at construction time:
///
/// - `token_ttl` is baked into the signed token as its `exp` claim and
///   acts as a hard upper bound that no store state can extend.
/// - `session_ttl` is applied to the store entry on every save and is
///   the authoritative revocation control.
///
/// Construction fails unless `session_ttl >= token_ttl`, so a token can
/// never outlive the store entry that vouches for it.
///
/// # Example
///
/// ```ignore
/// use portcullis::{AuthConfig, SigningSecret};
/// use std::time::Duration;
///
/// // Load from environment variables (fatal if the secret is missing)
/// let config = AuthConfig::from_env()?;
///
/// // Or build programmatically
/// let secret = SigningSecret::new("long-random-value-from-a-vault")?;
/// let config = AuthConfig::builder(secret)
///     .token_ttl(Duration::from_secs(3600))
///     .session_ttl(Duration::from_secs(86_400))
///     .store_timeout(Duration::from_secs(2))
///     .build()?;
/// ```
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Symmetric HS256 signing secret, injected into the token signer
    pub secret: SigningSecret,

    /// Lifetime baked into each signed token (`exp` claim)
    pub token_ttl: Duration,

    /// Lifetime applied to the store entry on every save
    pub session_ttl: Duration,

    /// Per-call bound on store round trips; elapse means fail closed
    pub store_timeout: Duration,

    /// Session cookie contract for host-application handlers
    pub cookie: CookiePolicy,
}

impl AuthConfig {
    /// Create a configuration with default lifetimes.
    ///
    /// Defaults: 1 hour token TTL, 24 hour session TTL, 2 second store
    /// timeout, and the default cookie contract. These defaults satisfy
    /// the TTL ordering rule, so no validation result is surfaced.
    pub fn new(secret: SigningSecret) -> Self {
        Self {
            secret,
            token_ttl: Duration::from_secs(60 * 60),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            store_timeout: Duration::from_secs(2),
            cookie: CookiePolicy::default(),
        }
    }

    /// Create a new builder for programmatic configuration.
    pub fn builder(secret: SigningSecret) -> AuthConfigBuilder {
        AuthConfigBuilder {
            config: Self::new(secret),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// A missing or weak `SESSION_SIGNING_SECRET` is a fatal error,
    /// surfaced once at startup rather than on the first request. Use
    /// [`SigningSecret::generate`] to mint a value for a new deployment.
    ///
    /// # Environment Variables
    ///
    /// - `SESSION_SIGNING_SECRET`: required; validated against the
    ///   [`SecretPolicy`] for the current environment
    /// - `SESSION_TOKEN_TTL`: e.g., "1h", "30m" (default: "1h")
    /// - `SESSION_STORE_TTL`: e.g., "24h", "7d" (default: "24h")
    /// - `SESSION_STORE_TIMEOUT`: e.g., "2s", "500ms" (default: "2s")
    /// - `SESSION_COOKIE_NAME`: cookie name (default: "auth_token")
    /// - `SESSION_COOKIE_PATH`: cookie path (default: "/")
    /// - `SESSION_COOKIE_DOMAIN`: cookie domain (default: unset)
    /// - `SESSION_COOKIE_SECURE`: "true"/"false" (default: "true")
    ///
    /// The environment name is read from `RUST_ENV`, then `APP_ENV`,
    /// defaulting to "development".
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = std::env::var("RUST_ENV")
            .or_else(|_| std::env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let raw_secret =
            std::env::var("SESSION_SIGNING_SECRET").map_err(|_| ConfigError::MissingSecret)?;
        let policy = SecretPolicy::for_environment(&environment);
        let secret = SigningSecret::validated(raw_secret, &policy)?;

        let token_ttl = std::env::var("SESSION_TOKEN_TTL")
            .ok()
            .and_then(|s| parse_duration(&s))
            .unwrap_or(Duration::from_secs(60 * 60));

        let session_ttl = std::env::var("SESSION_STORE_TTL")
            .ok()
            .and_then(|s| parse_duration(&s))
            .unwrap_or(Duration::from_secs(24 * 60 * 60));

        let store_timeout = std::env::var("SESSION_STORE_TIMEOUT")
            .ok()
            .and_then(|s| parse_duration(&s))
            .unwrap_or(Duration::from_secs(2));

        let cookie = CookiePolicy::from_env();

        AuthConfigBuilder {
            config: Self {
                secret,
                token_ttl,
                session_ttl,
                store_timeout,
                cookie,
            },
        }
        .build()
    }
}

/// Builder for AuthConfig
#[derive(Debug, Clone)]
pub struct AuthConfigBuilder {
    config: AuthConfig,
}

impl AuthConfigBuilder {
    /// Set the lifetime baked into each signed token.
    pub fn token_ttl(mut self, ttl: Duration) -> Self {
        self.config.token_ttl = ttl;
        self
    }

    /// Set the lifetime applied to store entries on save.
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.config.session_ttl = ttl;
        self
    }

    /// Set the per-call bound on store round trips.
    pub fn store_timeout(mut self, timeout: Duration) -> Self {
        self.config.store_timeout = timeout;
        self
    }

    /// Set the session cookie contract.
    pub fn cookie(mut self, cookie: CookiePolicy) -> Self {
        self.config.cookie = cookie;
        self
    }

    /// Build the configuration, enforcing the lifetime rules.
    pub fn build(self) -> Result<AuthConfig, ConfigError> {
        let config = self.config;

        if config.token_ttl.is_zero() {
            return Err(ConfigError::ZeroDuration { field: "token_ttl" });
        }
        if config.store_timeout.is_zero() {
            return Err(ConfigError::ZeroDuration {
                field: "store_timeout",
            });
        }
        if config.session_ttl < config.token_ttl {
            return Err(ConfigError::TtlOrder {
                token_ttl: config.token_ttl,
                session_ttl: config.session_ttl,
            });
        }

        Ok(config)
    }
}

/// Error type for configuration failures, all fatal at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// `SESSION_SIGNING_SECRET` is not set
    MissingSecret,
    /// The signing secret failed policy validation
    WeakSecret(SecretError),
    /// The store TTL would let a token outlive its store entry
    TtlOrder {
        token_ttl: Duration,
        session_ttl: Duration,
    },
    /// A duration that must be positive was zero
    ZeroDuration { field: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSecret => {
                write!(f, "SESSION_SIGNING_SECRET is not set")
            }
            Self::WeakSecret(err) => {
                write!(f, "signing secret rejected: {}", err)
            }
            Self::TtlOrder {
                token_ttl,
                session_ttl,
            } => {
                write!(
                    f,
                    "session TTL ({:?}) must be at least the token TTL ({:?})",
                    session_ttl, token_ttl
                )
            }
            Self::ZeroDuration { field } => {
                write!(f, "{} must be positive", field)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::WeakSecret(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SecretError> for ConfigError {
    fn from(err: SecretError) -> Self {
        Self::WeakSecret(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_secret() -> SigningSecret {
        SigningSecret::new("unit-config-signing-secret-0123456789").unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = AuthConfig::new(test_secret());

        assert_eq!(config.token_ttl, Duration::from_secs(3600));
        assert_eq!(config.session_ttl, Duration::from_secs(86_400));
        assert_eq!(config.store_timeout, Duration::from_secs(2));
        assert_eq!(config.cookie.name, "auth_token");
    }

    #[test]
    fn test_builder_overrides() {
        let config = AuthConfig::builder(test_secret())
            .token_ttl(Duration::from_secs(600))
            .session_ttl(Duration::from_secs(1200))
            .store_timeout(Duration::from_millis(250))
            .build()
            .unwrap();

        assert_eq!(config.token_ttl, Duration::from_secs(600));
        assert_eq!(config.session_ttl, Duration::from_secs(1200));
        assert_eq!(config.store_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_rejects_session_ttl_below_token_ttl() {
        let result = AuthConfig::builder(test_secret())
            .token_ttl(Duration::from_secs(3600))
            .session_ttl(Duration::from_secs(60))
            .build();

        assert!(matches!(result, Err(ConfigError::TtlOrder { .. })));
    }

    #[test]
    fn test_equal_ttls_are_allowed() {
        // The original deployment ran 24h/24h; equality stays legal.
        let result = AuthConfig::builder(test_secret())
            .token_ttl(Duration::from_secs(86_400))
            .session_ttl(Duration::from_secs(86_400))
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn test_rejects_zero_durations() {
        let result = AuthConfig::builder(test_secret())
            .token_ttl(Duration::ZERO)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::ZeroDuration { field: "token_ttl" })
        ));

        let result = AuthConfig::builder(test_secret())
            .store_timeout(Duration::ZERO)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::ZeroDuration {
                field: "store_timeout"
            })
        ));
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::TtlOrder {
            token_ttl: Duration::from_secs(3600),
            session_ttl: Duration::from_secs(60),
        };
        assert!(err.to_string().contains("session TTL"));

        assert_eq!(
            ConfigError::MissingSecret.to_string(),
            "SESSION_SIGNING_SECRET is not set"
        );
    }
}
