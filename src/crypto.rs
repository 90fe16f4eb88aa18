//! Constant-time comparison for token material
//!
//! The session gate cross-checks the presented bearer token against the
//! stored session token on every protected request. That comparison runs
//! in constant time so response latency never reveals how many leading
//! bytes of a guessed token matched.

use subtle::ConstantTimeEq;

/// Performs constant-time comparison of two byte slices.
///
/// Standard `==` on slices short-circuits at the first mismatching byte,
/// which leaks match length as a timing side-channel. The `subtle` crate
/// compares every byte regardless of where (or whether) the inputs differ.
///
/// ```rust
/// use portcullis::crypto::constant_time_eq;
///
/// assert!(constant_time_eq(b"stored-token", b"stored-token"));
/// assert!(!constant_time_eq(b"stored-token", b"forged-token"));
/// ```
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    // subtle::ConstantTimeEq returns a Choice, which we convert to bool
    a.ct_eq(b).into()
}

/// Compares a stored session token against a presented one.
///
/// Equality means the presented token is still the authoritative token
/// for its principal. Length differences compare unequal without
/// changing the timing profile of the match.
pub fn tokens_match(stored: &str, presented: &str) -> bool {
    constant_time_eq(stored.as_bytes(), presented.as_bytes())
}
