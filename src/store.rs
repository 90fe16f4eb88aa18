//! Server-side session storage
//!
//! The store holds the one currently valid token per principal under the
//! key `token_user_<principalId>`. Writing is an unconditional overwrite
//! with a per-write TTL, and that overwrite is the protocol's entire
//! revocation mechanism: saving a new token supersedes the old one, no
//! locks, no read-modify-write.
//!
//! # Design Philosophy
//!
//! - **Last-writer-wins**: concurrent saves for the same principal race
//!   safely to a single visible value, never a torn one.
//! - **Bounded calls**: every remote round trip carries a timeout.
//!   Elapse or connection failure is [`StoreError::Unavailable`], which
//!   callers treat as "deny", never as "no session".
//! - **Expiry is absence**: an entry past its TTL answers
//!   [`StoreError::NotFound`], indistinguishable from never-saved.
//!
//! # Usage
//!
//! ```ignore
//! use portcullis::store::{RedisSessionStore, SessionStore};
//! use std::time::Duration;
//!
//! let store = RedisSessionStore::connect(
//!     "redis://127.0.0.1:6379",
//!     Duration::from_secs(2),
//! ).await?;
//!
//! store.save(42, token.as_str(), Duration::from_secs(86_400)).await?;
//! let current = store.get(42).await?;
//! store.delete(42).await?;
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;

#[cfg(feature = "redis")]
use crate::events::SecurityEvent;
#[cfg(feature = "redis")]
use crate::security_event;
use crate::token::Principal;

/// Error type for session store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No entry for the principal: never saved, deleted, or expired
    #[error("no session for principal {principal}")]
    NotFound { principal: Principal },
    /// The store could not be reached, errored, or timed out.
    /// Callers must fail closed on this kind.
    #[error("session store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Key under which a principal's current token is stored.
///
/// Wire contract with existing deployments; do not change the format.
pub fn session_key(principal: Principal) -> String {
    format!("token_user_{}", principal)
}

/// Key-value persistence of the one currently valid token per principal.
///
/// Implementations must be safe to share across request tasks; the
/// service and the session gate both hold the store behind an
/// `Arc<dyn SessionStore>`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Unconditionally overwrite the principal's session entry.
    ///
    /// Idempotent and last-writer-wins. Saving is what supersedes any
    /// previously active session.
    async fn save(
        &self,
        principal: Principal,
        token: &str,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Fetch the principal's current token.
    ///
    /// Answers [`StoreError::NotFound`] when the entry is absent or its
    /// TTL has elapsed.
    async fn get(&self, principal: Principal) -> Result<String, StoreError>;

    /// Remove the principal's session entry. A no-op when absent.
    async fn delete(&self, principal: Principal) -> Result<(), StoreError>;
}

// ============================================================================
// Redis-backed store
// ============================================================================

/// Redis-backed session store.
///
/// Shares one multiplexed [`ConnectionManager`] handle across request
/// tasks; the manager reconnects on its own and is cheap to clone.
/// Every command is wrapped in the configured per-call timeout. No
/// retries: a failed call surfaces as [`StoreError::Unavailable`] and
/// the request fails closed.
///
/// [`ConnectionManager`]: redis::aio::ConnectionManager
#[cfg(feature = "redis")]
#[derive(Clone)]
pub struct RedisSessionStore {
    connection: redis::aio::ConnectionManager,
    timeout: Duration,
}

#[cfg(feature = "redis")]
impl RedisSessionStore {
    /// Connect to Redis at `url` with the given per-call timeout.
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url).map_err(|err| StoreError::Unavailable {
            reason: err.to_string(),
        })?;
        let connection =
            client
                .get_connection_manager()
                .await
                .map_err(|err| StoreError::Unavailable {
                    reason: err.to_string(),
                })?;

        Ok(Self::new(connection, timeout))
    }

    /// Wrap an existing connection manager.
    pub fn new(connection: redis::aio::ConnectionManager, timeout: Duration) -> Self {
        Self {
            connection,
            timeout,
        }
    }

    /// Run one store command under the per-call timeout.
    async fn bounded<T, F>(&self, command: F) -> Result<T, StoreError>
    where
        F: std::future::Future<Output = Result<T, redis::RedisError>>,
    {
        match tokio::time::timeout(self.timeout, command).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                security_event!(
                    SecurityEvent::StoreUnavailable,
                    error = %err,
                    "Session store command failed"
                );
                Err(StoreError::Unavailable {
                    reason: err.to_string(),
                })
            }
            Err(_) => {
                security_event!(
                    SecurityEvent::StoreUnavailable,
                    timeout = ?self.timeout,
                    "Session store command timed out"
                );
                Err(StoreError::Unavailable {
                    reason: format!("timed out after {:?}", self.timeout),
                })
            }
        }
    }
}

#[cfg(feature = "redis")]
#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn save(
        &self,
        principal: Principal,
        token: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        use redis::AsyncCommands;

        let key = session_key(principal);
        let mut conn = self.connection.clone();
        let token = token.to_string();
        let seconds = ttl.as_secs().max(1);

        self.bounded(async move {
            let _: () = conn.set_ex(&key, token, seconds).await?;
            Ok(())
        })
        .await
    }

    async fn get(&self, principal: Principal) -> Result<String, StoreError> {
        use redis::AsyncCommands;

        let key = session_key(principal);
        let mut conn = self.connection.clone();

        let value: Option<String> = self.bounded(async move { conn.get(&key).await }).await?;
        value.ok_or(StoreError::NotFound { principal })
    }

    async fn delete(&self, principal: Principal) -> Result<(), StoreError> {
        use redis::AsyncCommands;

        let key = session_key(principal);
        let mut conn = self.connection.clone();

        self.bounded(async move {
            let _: () = conn.del(&key).await?;
            Ok(())
        })
        .await
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug, Clone)]
struct StoredSession {
    token: String,
    expires_at: Instant,
}

/// In-memory session store.
///
/// Backs tests and single-node deployments. Honors the same contract as
/// the Redis store: unconditional overwrite on save, TTL expiry
/// surfacing as [`StoreError::NotFound`], delete as a no-op when
/// absent. Expired entries are dropped when read.
///
/// For multi-node deployments use [`RedisSessionStore`]; per-process
/// maps cannot give every node the same view of "the one current
/// token".
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<Principal, StoredSession>>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Clone for MemorySessionStore {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(
        &self,
        principal: Principal,
        token: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().unwrap();
        sessions.insert(
            principal,
            StoredSession {
                token: token.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, principal: Principal) -> Result<String, StoreError> {
        let mut sessions = self.sessions.write().unwrap();
        match sessions.get(&principal) {
            Some(entry) if entry.expires_at > Instant::now() => Ok(entry.token.clone()),
            Some(_) => {
                sessions.remove(&principal);
                Err(StoreError::NotFound { principal })
            }
            None => Err(StoreError::NotFound { principal }),
        }
    }

    async fn delete(&self, principal: Principal) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().unwrap();
        sessions.remove(&principal);
        Ok(())
    }
}
