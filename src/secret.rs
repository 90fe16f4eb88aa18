//! Signing Secret Validation and Generation
//!
//! The HS256 signing secret is the root of trust for every session token:
//! anyone holding it can mint a token for any principal. This module wraps
//! the secret in a type that cannot leak through `Debug` output and
//! validates it against environment-aware strength requirements before a
//! signer is ever built from it.
//!
//! # Features
//!
//! - Environment-based secret length requirements
//! - Weak pattern detection
//! - Shannon entropy calculation
//! - Character diversity requirements for production
//! - Secure secret generation for development bootstrap
//!
//! # Example
//!
//! ```
//! use portcullis::secret::{SecretPolicy, SigningSecret};
//!
//! // Validate a secret for production
//! let policy = SecretPolicy::for_environment("production");
//! match policy.validate("my-secret-key") {
//!     Ok(()) => println!("Secret is valid"),
//!     Err(e) => println!("Secret validation failed: {}", e),
//! }
//!
//! // Generate a secret that satisfies the policy
//! let secret = SigningSecret::generate(&policy);
//! assert!(secret.len() >= 64);
//! ```

use std::collections::HashMap;
use std::fmt;

/// Error type for signing-secret validation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum SecretError {
    /// Secret is too short for the required environment
    TooShort {
        actual: usize,
        minimum: usize,
        context: String,
    },
    /// Secret contains a weak/common pattern
    WeakPattern { pattern: String },
    /// Secret has insufficient entropy
    LowEntropy {
        actual: f64,
        minimum: f64,
        context: String,
    },
    /// Secret lacks required character diversity
    InsufficientDiversity { missing: Vec<String> },
}

impl fmt::Display for SecretError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort {
                actual,
                minimum,
                context,
            } => {
                write!(
                    f,
                    "Secret length ({} chars) is below minimum ({} chars) for {}",
                    actual, minimum, context
                )
            }
            Self::WeakPattern { pattern } => {
                write!(f, "Secret contains weak pattern: '{}'", pattern)
            }
            Self::LowEntropy {
                actual,
                minimum,
                context,
            } => {
                write!(
                    f,
                    "Secret entropy ({:.1} bits) is below minimum ({:.1} bits) for {}",
                    actual, minimum, context
                )
            }
            Self::InsufficientDiversity { missing } => {
                write!(f, "Secret must contain: {}", missing.join(", "))
            }
        }
    }
}

impl std::error::Error for SecretError {}

/// Strength requirements for a signing secret.
///
/// Defines what a valid secret looks like for a given deployment
/// environment. Stricter environments demand longer secrets, more
/// entropy, and character diversity.
#[derive(Debug, Clone)]
pub struct SecretPolicy {
    /// Minimum secret length in characters
    pub min_length: usize,
    /// Minimum Shannon entropy in bits
    pub min_entropy: f64,
    /// Whether to require character diversity (upper, lower, digit, special)
    pub require_diversity: bool,
    /// Whether to check for weak patterns
    pub check_weak_patterns: bool,
    /// Context string for error messages
    pub context: String,
}

impl Default for SecretPolicy {
    fn default() -> Self {
        Self::for_environment("development")
    }
}

impl SecretPolicy {
    /// Create a policy for a specific environment.
    ///
    /// # Environments
    ///
    /// - `production`: 64 char min, 128-bit entropy, diversity required
    /// - `staging`: 48 char min, 96-bit entropy, diversity required
    /// - `testing`: 32 char min, 64-bit entropy
    /// - `development` (default): 32 char min, 32-bit entropy
    pub fn for_environment(environment: &str) -> Self {
        match environment.to_lowercase().as_str() {
            "production" | "prod" => Self {
                min_length: 64,
                min_entropy: 128.0,
                require_diversity: true,
                check_weak_patterns: true,
                context: "production environment".to_string(),
            },
            "staging" | "stage" => Self {
                min_length: 48,
                min_entropy: 96.0,
                require_diversity: true,
                check_weak_patterns: true,
                context: "staging environment".to_string(),
            },
            "testing" | "test" => Self {
                min_length: 32,
                min_entropy: 64.0,
                require_diversity: false,
                check_weak_patterns: true,
                context: "testing environment".to_string(),
            },
            _ => Self {
                min_length: 32,
                min_entropy: 32.0,
                require_diversity: false,
                check_weak_patterns: true,
                context: "development environment".to_string(),
            },
        }
    }

    /// Validate a secret against this policy.
    pub fn validate(&self, secret: &str) -> Result<(), SecretError> {
        if secret.len() < self.min_length {
            return Err(SecretError::TooShort {
                actual: secret.len(),
                minimum: self.min_length,
                context: self.context.clone(),
            });
        }

        if self.check_weak_patterns {
            if let Some(pattern) = find_weak_pattern(secret) {
                return Err(SecretError::WeakPattern {
                    pattern: pattern.to_string(),
                });
            }
        }

        let entropy = shannon_entropy(secret);
        if entropy < self.min_entropy {
            return Err(SecretError::LowEntropy {
                actual: entropy,
                minimum: self.min_entropy,
                context: self.context.clone(),
            });
        }

        if self.require_diversity {
            let missing = check_diversity(secret);
            if !missing.is_empty() {
                return Err(SecretError::InsufficientDiversity { missing });
            }
        }

        Ok(())
    }
}

/// The symmetric secret session tokens are signed with.
///
/// Injected into [`TokenSigner`](crate::token::TokenSigner) through
/// configuration; there is no process-global signing state. The wrapper
/// never prints its contents: `Debug` and `Display` are redacted, and
/// the raw bytes are reachable only through [`as_bytes`](Self::as_bytes).
///
/// The value must remain stable across restarts. Restarting with a new
/// secret invalidates every outstanding token.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningSecret(String);

impl SigningSecret {
    /// Wrap a secret value without policy validation.
    ///
    /// Rejects only the empty string. Use [`validated`](Self::validated)
    /// on any secret read from the deployment environment.
    pub fn new(value: impl Into<String>) -> Result<Self, SecretError> {
        let value = value.into();
        if value.is_empty() {
            return Err(SecretError::TooShort {
                actual: 0,
                minimum: 1,
                context: "signing secret".to_string(),
            });
        }
        Ok(Self(value))
    }

    /// Wrap a secret value after validating it against `policy`.
    pub fn validated(value: impl Into<String>, policy: &SecretPolicy) -> Result<Self, SecretError> {
        let value = value.into();
        policy.validate(&value)?;
        Ok(Self(value))
    }

    /// Generate a random secret that satisfies `policy`.
    ///
    /// Retries up to 10 times if a generated candidate misses the
    /// entropy requirement (unlikely at the lengths involved), then
    /// falls back to a longer candidate that cannot miss it.
    pub fn generate(policy: &SecretPolicy) -> Self {
        let length = policy.min_length.max(64);

        for _ in 0..10 {
            let candidate = random_secret(length);
            if policy.validate(&candidate).is_ok() {
                return Self(candidate);
            }
        }

        Self(random_secret(length + 32))
    }

    /// Raw key material for the HS256 signer.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// The raw secret string.
    ///
    /// Exists for operator bootstrap flows that print a freshly
    /// generated secret so it can be pinned in deployment config.
    /// Never pass the result to a log statement.
    pub fn reveal(&self) -> &str {
        &self.0
    }

    /// Length of the secret in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the secret is empty. Constructors reject empty values,
    /// so this is false for any obtainable instance.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningSecret(<{} bytes redacted>)", self.0.len())
    }
}

/// Generate a random secret string of the given length.
///
/// Characters are drawn from A-Z, a-z, 0-9, and special characters.
fn random_secret(length: usize) -> String {
    use rand::Rng;

    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()_+-=[]{}|;:,.<>?/~`";

    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Check for weak patterns in the secret.
fn find_weak_pattern(secret: &str) -> Option<&'static str> {
    const WEAK_PATTERNS: &[&str] = &[
        "secret", "password", "admin", "123456", "qwerty", "default",
        "example", "test", "demo", "sample", "temp", "changeme",
        "letmein", "welcome", "monkey", "dragon", "master",
    ];

    let secret_lower = secret.to_lowercase();
    for pattern in WEAK_PATTERNS {
        if secret_lower.contains(pattern) {
            return Some(pattern);
        }
    }
    None
}

/// Check character diversity and return missing categories.
fn check_diversity(secret: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !secret.chars().any(|c| c.is_uppercase()) {
        missing.push("uppercase letters".to_string());
    }
    if !secret.chars().any(|c| c.is_lowercase()) {
        missing.push("lowercase letters".to_string());
    }
    if !secret.chars().any(|c| c.is_ascii_digit()) {
        missing.push("digits".to_string());
    }
    if !secret.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
        missing.push("special characters".to_string());
    }

    missing
}

/// Shannon entropy of a string in bits (entropy per character times length).
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut char_counts: HashMap<char, usize> = HashMap::new();
    let total = s.len() as f64;

    for c in s.chars() {
        *char_counts.entry(c).or_insert(0) += 1;
    }

    let mut entropy = 0.0;
    for count in char_counts.values() {
        let probability = *count as f64 / total;
        entropy -= probability * probability.log2();
    }

    entropy * total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_for_environment() {
        let prod = SecretPolicy::for_environment("production");
        assert_eq!(prod.min_length, 64);
        assert!(prod.require_diversity);

        let dev = SecretPolicy::for_environment("development");
        assert_eq!(dev.min_length, 32);
        assert!(!dev.require_diversity);
    }

    #[test]
    fn test_validate_too_short() {
        let policy = SecretPolicy::for_environment("production");
        let result = policy.validate("short");

        assert!(matches!(result, Err(SecretError::TooShort { .. })));
    }

    #[test]
    fn test_validate_weak_pattern() {
        let policy = SecretPolicy::for_environment("development");
        // Long enough but contains "password"
        let result = policy.validate("this-is-a-password-that-is-long-enough");

        assert!(matches!(result, Err(SecretError::WeakPattern { .. })));
    }

    #[test]
    fn test_validate_low_entropy() {
        let policy = SecretPolicy::for_environment("production");
        // Long enough but low entropy (repeated chars)
        let result =
            policy.validate("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");

        assert!(matches!(result, Err(SecretError::LowEntropy { .. })));
    }

    #[test]
    fn test_validate_insufficient_diversity() {
        let mut policy = SecretPolicy::for_environment("production");
        policy.min_entropy = 10.0; // only testing the diversity check here

        let result =
            policy.validate("abcdefghijklmnopqrstuvwxyzabcdefghijklmnopqrstuvwxyzabcdefghijkl");

        assert!(matches!(
            result,
            Err(SecretError::InsufficientDiversity { .. })
        ));
    }

    #[test]
    fn test_shannon_entropy() {
        // Low entropy (all same character)
        let low = shannon_entropy("aaaaaaaaaa");
        assert!(low < 1.0);

        // Higher entropy (diverse characters)
        let high = shannon_entropy("aB3$xY9!pQ");
        assert!(high > 30.0);

        let empty = shannon_entropy("");
        assert_eq!(empty, 0.0);
    }

    #[test]
    fn test_generate_satisfies_policy() {
        let policy = SecretPolicy::for_environment("production");
        let secret = SigningSecret::generate(&policy);

        assert!(policy.validate(secret.reveal()).is_ok());
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(matches!(
            SigningSecret::new(""),
            Err(SecretError::TooShort { .. })
        ));
        assert!(SigningSecret::new("a-perfectly-ordinary-value").is_ok());
    }

    #[test]
    fn test_validated_enforces_policy() {
        let policy = SecretPolicy::for_environment("production");
        assert!(SigningSecret::validated("short", &policy).is_err());

        let generated = SigningSecret::generate(&policy);
        assert!(SigningSecret::validated(generated.reveal(), &policy).is_ok());
    }

    #[test]
    fn test_debug_redacts_value() {
        let secret = SigningSecret::new("super-sensitive-key-material").unwrap();
        let printed = format!("{:?}", secret);

        assert!(!printed.contains("sensitive"));
        assert!(printed.contains("redacted"));
    }

    #[test]
    fn test_error_display() {
        let err = SecretError::TooShort {
            actual: 10,
            minimum: 64,
            context: "production".to_string(),
        };
        assert!(err.to_string().contains("10"));
        assert!(err.to_string().contains("64"));

        let err = SecretError::WeakPattern {
            pattern: "password".to_string(),
        };
        assert!(err.to_string().contains("password"));
    }
}
