//! Password hashing and comparison
//!
//! The authentication service consumes password handling as an opaque
//! capability: hash a plaintext into a digest, compare a digest against
//! a plaintext. The default implementation is Argon2id with per-hash
//! random salts; hosts with an existing digest corpus can supply their
//! own [`PasswordService`] implementation instead.
//!
//! Plaintexts and digests never appear in log statements.

use std::fmt;

/// Error type for password operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordError {
    /// The hashing backend failed
    Hash,
    /// The plaintext does not match the digest
    Mismatch,
    /// The stored digest could not be parsed
    BadDigest,
}

impl fmt::Display for PasswordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hash => write!(f, "password hashing failed"),
            Self::Mismatch => write!(f, "password does not match digest"),
            Self::BadDigest => write!(f, "stored password digest is unparseable"),
        }
    }
}

impl std::error::Error for PasswordError {}

/// Hash and compare credentials.
///
/// `compare` answers [`PasswordError::Mismatch`] for a wrong password;
/// the service collapses that into its single generic credentials error
/// before anything reaches a client.
pub trait PasswordService: Send + Sync {
    /// Hash a plaintext password into a storable digest.
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError>;

    /// Compare a stored digest against a supplied plaintext.
    fn compare(&self, digest: &str, plaintext: &str) -> Result<(), PasswordError>;
}

/// Argon2id implementation of [`PasswordService`].
///
/// Default parameters of the `argon2` crate; each hash gets a fresh
/// OS-sourced salt, so hashing the same plaintext twice yields
/// different digests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2PasswordService;

impl Argon2PasswordService {
    /// Create the default Argon2id service.
    pub fn new() -> Self {
        Self
    }
}

impl PasswordService for Argon2PasswordService {
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        use argon2::password_hash::SaltString;
        use argon2::{Argon2, PasswordHasher};
        use rand::rngs::OsRng;

        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| PasswordError::Hash)
    }

    fn compare(&self, digest: &str, plaintext: &str) -> Result<(), PasswordError> {
        use argon2::password_hash::PasswordHash;
        use argon2::{Argon2, PasswordVerifier};

        let parsed = PasswordHash::new(digest).map_err(|_| PasswordError::BadDigest)?;
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .map_err(|_| PasswordError::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_compare() {
        let service = Argon2PasswordService::new();
        let digest = service.hash("correct horse battery staple").unwrap();

        assert!(service
            .compare(&digest, "correct horse battery staple")
            .is_ok());
    }

    #[test]
    fn test_compare_rejects_wrong_password() {
        let service = Argon2PasswordService::new();
        let digest = service.hash("correct horse battery staple").unwrap();

        assert_eq!(
            service.compare(&digest, "incorrect horse"),
            Err(PasswordError::Mismatch)
        );
    }

    #[test]
    fn test_hashes_are_salted() {
        let service = Argon2PasswordService::new();
        let first = service.hash("same input").unwrap();
        let second = service.hash("same input").unwrap();

        assert_ne!(first, second);
        assert!(service.compare(&first, "same input").is_ok());
        assert!(service.compare(&second, "same input").is_ok());
    }

    #[test]
    fn test_compare_rejects_garbage_digest() {
        let service = Argon2PasswordService::new();

        assert_eq!(
            service.compare("not-a-digest", "anything"),
            Err(PasswordError::BadDigest)
        );
    }
}
