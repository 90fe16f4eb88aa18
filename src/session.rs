//! Session Gate Middleware
//!
//! Request-side enforcement of the session protocol: extract a token,
//! verify its signature, confirm it is the live session in the store,
//! and attach the authenticated principal to the request.
//!
//! # Design Philosophy
//!
//! A valid signature is not enough. The store holds the single live
//! token per principal, so a token that verifies cryptographically but
//! no longer matches the stored one (superseded by a newer login,
//! removed by logout or revocation) is rejected. The check order is
//! fixed: signature first, store second. A token that fails
//! verification never causes a store read, so forged or mangled tokens
//! cannot generate store traffic.
//!
//! Every rejection answers the same 401 with the same body. The client
//! is never told whether the token was missing, malformed, expired,
//! superseded, or whether the store was down; the precise reason is
//! logged server-side. Store outages also answer 401: the gate fails
//! closed rather than admitting a request it cannot check.
//!
//! # Usage
//!
//! ```ignore
//! use axum::{routing::get, Router};
//! use portcullis::session::{AuthSession, ProtectedRouter, SessionGate};
//!
//! async fn profile(session: AuthSession) -> String {
//!     format!("user {}", session.principal)
//! }
//!
//! let gate = SessionGate::new(&config, store.clone());
//! let app = Router::new()
//!     .route("/profile", get(profile))
//!     .with_session_gate(gate);
//! // Login and logout routes mount outside the gate; logout verifies
//! // its token through the service, not through this middleware.
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::json;

use crate::config::AuthConfig;
use crate::cookie::CookiePolicy;
use crate::crypto;
use crate::error::AuthError;
use crate::events::SecurityEvent;
use crate::security_event;
use crate::store::{SessionStore, StoreError};
use crate::token::{token_preview, Principal, TokenSigner};

// ============================================================================
// Gate state
// ============================================================================

/// Shared state for the session gate middleware.
///
/// Holds the verifying side of the token signer and a read handle to
/// the session store. Build it from the same [`AuthConfig`] as the
/// [`crate::auth::AuthService`] so both sides share the signing secret.
#[derive(Clone)]
pub struct SessionGate {
    signer: TokenSigner,
    store: Arc<dyn SessionStore>,
    cookie: CookiePolicy,
}

impl SessionGate {
    /// Create a gate from configuration and a store handle.
    pub fn new(config: &AuthConfig, store: Arc<dyn SessionStore>) -> Self {
        Self {
            signer: TokenSigner::new(config),
            store,
            cookie: config.cookie.clone(),
        }
    }
}

// ============================================================================
// Authenticated session
// ============================================================================

/// The authenticated caller, attached to requests that pass the gate.
///
/// Extract it in handlers to learn who is calling without re-parsing
/// the token.
#[derive(Clone)]
pub struct AuthSession {
    /// Principal the session belongs to
    pub principal: Principal,
    token: String,
}

impl AuthSession {
    /// The token the request presented, for handlers that forward it
    /// (logout hands it to the service).
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("principal", &self.principal)
            .field("token", &token_preview(&self.token))
            .finish()
    }
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Present only when the gate admitted the request. A route that
        // extracts AuthSession without the gate layered rejects rather
        // than serving unauthenticated traffic.
        parts
            .extensions
            .get::<AuthSession>()
            .cloned()
            .ok_or(AuthError::SessionNotFound)
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// Session gate middleware function.
///
/// Use with `axum::middleware::from_fn_with_state`, or apply it through
/// [`ProtectedRouter::with_session_gate`].
pub async fn session_guard(
    State(gate): State<SessionGate>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let token = match extract_token(request.headers(), &gate.cookie) {
        Some(token) => token,
        None => {
            security_event!(
                SecurityEvent::AccessDenied,
                path = %path,
                reason = "missing_token",
                "Request rejected"
            );
            return unauthorized_response();
        }
    };

    // Signature check comes first; a token that fails it never reaches
    // the store.
    let claims = match gate.signer.verify(&token) {
        Ok(claims) => claims,
        Err(err) => {
            security_event!(
                SecurityEvent::AccessDenied,
                path = %path,
                token = %token_preview(&token),
                reason = %AuthError::from(err).kind_name(),
                "Request rejected"
            );
            return unauthorized_response();
        }
    };

    // The store is authoritative: only the most recently saved token is
    // live, whatever the token's own expiry says.
    let stored = match gate.store.get(claims.sub).await {
        Ok(stored) => stored,
        Err(StoreError::NotFound { .. }) => {
            security_event!(
                SecurityEvent::AccessDenied,
                path = %path,
                principal = %claims.sub,
                reason = %AuthError::SessionNotFound.kind_name(),
                "Request rejected"
            );
            return unauthorized_response();
        }
        Err(StoreError::Unavailable { reason }) => {
            security_event!(
                SecurityEvent::AccessDenied,
                path = %path,
                principal = %claims.sub,
                reason = "store_unavailable",
                detail = %reason,
                "Request rejected, failing closed"
            );
            return unauthorized_response();
        }
    };

    if !crypto::tokens_match(&stored, &token) {
        security_event!(
            SecurityEvent::SessionSuperseded,
            principal = %claims.sub,
            presented = %token_preview(&token),
            stored = %token_preview(&stored),
            "Presented token is no longer the live session"
        );
        security_event!(
            SecurityEvent::AccessDenied,
            path = %path,
            principal = %claims.sub,
            reason = %AuthError::SessionMismatch.kind_name(),
            "Request rejected"
        );
        return unauthorized_response();
    }

    security_event!(
        SecurityEvent::AccessGranted,
        path = %path,
        principal = %claims.sub,
        "Request admitted"
    );

    request.extensions_mut().insert(AuthSession {
        principal: claims.sub,
        token,
    });

    next.run(request).await
}

/// Pull a token from the request: `Authorization: Bearer` first, then
/// the session cookie.
fn extract_token(headers: &HeaderMap, cookie: &CookiePolicy) -> Option<String> {
    bearer_token(headers).or_else(|| cookie.read(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// The one rejection every gate failure answers with.
///
/// Identical status, headers, and body regardless of cause.
fn unauthorized_response() -> Response {
    let body = json!({
        "error": "unauthorized",
        "message": "Authentication required"
    });

    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        Json(body),
    )
        .into_response()
}

// ============================================================================
// Router extension
// ============================================================================

/// Extension trait that applies the session gate to an Axum router.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, routing::get};
/// use portcullis::session::{ProtectedRouter, SessionGate};
///
/// let app = Router::new()
///     .route("/profile", get(profile))
///     .with_session_gate(gate)
///     // routes added after the gate are not protected
///     .route("/login", post(login));
/// ```
pub trait ProtectedRouter {
    /// Require a live session for every route registered so far.
    fn with_session_gate(self, gate: SessionGate) -> Self;
}

impl<S> ProtectedRouter for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_session_gate(self, gate: SessionGate) -> Self {
        self.layer(middleware::from_fn_with_state(gate, session_guard))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthService, MemoryUserDirectory, UserRecord};
    use crate::password::{Argon2PasswordService, PasswordService};
    use crate::secret::SigningSecret;
    use crate::store::MemorySessionStore;
    use crate::token::SessionClaims;
    use axum::body::Body;
    use axum::http::Request as HttpRequest;
    use axum::routing::get;
    use http_body_util::BodyExt;
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tower::ServiceExt;

    const ALICE: Principal = 42;
    const ALICE_PASSWORD: &str = "correct horse battery staple";
    const TEST_SECRET: &str = "a-test-signing-secret-of-decent-length";

    fn test_config() -> AuthConfig {
        AuthConfig::new(SigningSecret::new(TEST_SECRET.to_string()).unwrap())
    }

    fn auth_service(store: Arc<dyn SessionStore>) -> AuthService {
        let passwords = Argon2PasswordService::new();
        let directory = MemoryUserDirectory::new();
        directory.insert(UserRecord {
            id: ALICE,
            username: "alice".to_string(),
            password_digest: passwords.hash(ALICE_PASSWORD).unwrap(),
        });
        AuthService::new(
            &test_config(),
            Arc::new(directory),
            store,
            Arc::new(passwords),
        )
    }

    async fn profile(session: AuthSession) -> String {
        format!("hello {}", session.principal)
    }

    fn protected_app(store: Arc<dyn SessionStore>) -> Router {
        let gate = SessionGate::new(&test_config(), store);
        Router::new()
            .route("/profile", get(profile))
            .with_session_gate(gate)
    }

    fn harness() -> (AuthService, Router) {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        (auth_service(store.clone()), protected_app(store))
    }

    fn bearer_request(token: &str) -> Request {
        HttpRequest::builder()
            .uri("/profile")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    fn cookie_request(token: &str) -> Request {
        HttpRequest::builder()
            .uri("/profile")
            .header(header::COOKIE, format!("auth_token={}", token))
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    /// Store that counts reads, for asserting which tokens reach it.
    #[derive(Default)]
    struct CountingStore {
        inner: MemorySessionStore,
        gets: AtomicUsize,
    }

    #[async_trait::async_trait]
    impl SessionStore for CountingStore {
        async fn save(
            &self,
            principal: Principal,
            token: &str,
            ttl: Duration,
        ) -> Result<(), StoreError> {
            self.inner.save(principal, token, ttl).await
        }

        async fn get(&self, principal: Principal) -> Result<String, StoreError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            self.inner.get(principal).await
        }

        async fn delete(&self, principal: Principal) -> Result<(), StoreError> {
            self.inner.delete(principal).await
        }
    }

    struct DownStore;

    #[async_trait::async_trait]
    impl SessionStore for DownStore {
        async fn save(&self, _: Principal, _: &str, _: Duration) -> Result<(), StoreError> {
            Err(StoreError::Unavailable {
                reason: "connection refused".to_string(),
            })
        }

        async fn get(&self, _: Principal) -> Result<String, StoreError> {
            Err(StoreError::Unavailable {
                reason: "connection refused".to_string(),
            })
        }

        async fn delete(&self, _: Principal) -> Result<(), StoreError> {
            Err(StoreError::Unavailable {
                reason: "connection refused".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_fresh_login_token_passes_gate() {
        let (auth, app) = harness();

        let session = auth.login("alice", ALICE_PASSWORD).await.unwrap();
        let response = app
            .oneshot(bearer_request(session.token.as_str()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "hello 42");
    }

    #[tokio::test]
    async fn test_cookie_token_passes_gate() {
        let (auth, app) = harness();

        let session = auth.login("alice", ALICE_PASSWORD).await.unwrap();
        let response = app
            .oneshot(cookie_request(session.token.as_str()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bearer_takes_precedence_over_cookie() {
        let (auth, app) = harness();

        let session = auth.login("alice", ALICE_PASSWORD).await.unwrap();
        let request = HttpRequest::builder()
            .uri("/profile")
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", session.token.as_str()),
            )
            .header(header::COOKIE, "auth_token=stale-garbage")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_token_rejected() {
        let (_, app) = harness();

        let request = HttpRequest::builder()
            .uri("/profile")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[tokio::test]
    async fn test_invalid_tokens_never_reach_the_store() {
        let store = Arc::new(CountingStore::default());
        let app = protected_app(store.clone());

        // Not a token at all
        let response = app
            .clone()
            .oneshot(bearer_request("garbage"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        // Signed under a different secret
        let foreign = {
            let secret =
                SigningSecret::new("an-entirely-different-secret-material".to_string()).unwrap();
            TokenSigner::new(&AuthConfig::new(secret))
                .issue(ALICE)
                .unwrap()
        };
        let response = app
            .clone()
            .oneshot(bearer_request(foreign.as_str()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        assert_eq!(store.gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_second_login_invalidates_first_token() {
        let (auth, app) = harness();

        let first = auth.login("alice", ALICE_PASSWORD).await.unwrap();
        let second = auth.login("alice", ALICE_PASSWORD).await.unwrap();

        // The earlier token still has a valid signature and is not
        // expired, but it is no longer the stored session.
        let response = app
            .clone()
            .oneshot(bearer_request(first.token.as_str()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(bearer_request(second.token.as_str()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_logout_defeats_a_valid_token() {
        let (auth, app) = harness();

        let session = auth.login("alice", ALICE_PASSWORD).await.unwrap();
        auth.logout(session.token.as_str()).await.unwrap();

        let response = app
            .oneshot(bearer_request(session.token.as_str()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_revocation_defeats_a_valid_token() {
        let (auth, app) = harness();

        let session = auth.login("alice", ALICE_PASSWORD).await.unwrap();
        auth.revoke(ALICE).await.unwrap();

        let response = app
            .oneshot(bearer_request(session.token.as_str()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_expired_token_rejected() {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let app = protected_app(store.clone());

        // Craft a token signed with the right secret but already past
        // its expiry, and plant it in the store as the live session.
        let now = chrono::Utc::now().timestamp();
        let claims = SessionClaims {
            sub: ALICE,
            iat: now - 7200,
            exp: now - 3600,
            jti: "test".to_string(),
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();
        store
            .save(ALICE, &token, Duration::from_secs(60))
            .await
            .unwrap();

        let response = app.oneshot(bearer_request(&token)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_signature_with_empty_store_rejected() {
        let (_, app) = harness();

        // Issued by the right signer but never saved as a session
        let orphan = TokenSigner::new(&test_config()).issue(ALICE).unwrap();
        let response = app.oneshot(bearer_request(orphan.as_str())).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_store_outage_fails_closed() {
        let app = protected_app(Arc::new(DownStore));

        let token = TokenSigner::new(&test_config()).issue(ALICE).unwrap();
        let response = app.oneshot(bearer_request(token.as_str())).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_all_rejections_are_byte_identical() {
        let (auth, app) = harness();
        auth.login("alice", ALICE_PASSWORD).await.unwrap();
        let orphan = TokenSigner::new(&test_config()).issue(7777).unwrap();

        let missing = HttpRequest::builder()
            .uri("/profile")
            .body(Body::empty())
            .unwrap();
        let requests = vec![
            missing,
            bearer_request("garbage"),
            bearer_request(orphan.as_str()),
        ];

        let mut bodies = Vec::new();
        for request in requests {
            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            bodies.push(body_text(response).await);
        }

        assert!(bodies.windows(2).all(|pair| pair[0] == pair[1]));
        assert!(bodies[0].contains("Authentication required"));
    }

    #[tokio::test]
    async fn test_extractor_without_gate_rejects() {
        // Route uses the extractor but the gate was never layered; the
        // extension is absent and the request must not be served.
        let app = Router::new().route("/profile", get(profile));

        let request = HttpRequest::builder()
            .uri("/profile")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_concurrent_logins_one_winner_passes_gate() {
        let (auth, app) = harness();

        let a = auth.clone();
        let b = auth.clone();
        let first = tokio::spawn(async move { a.login("alice", ALICE_PASSWORD).await });
        let second = tokio::spawn(async move { b.login("alice", ALICE_PASSWORD).await });
        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();

        let first_status = app
            .clone()
            .oneshot(bearer_request(first.token.as_str()))
            .await
            .unwrap()
            .status();
        let second_status = app
            .oneshot(bearer_request(second.token.as_str()))
            .await
            .unwrap()
            .status();

        // Exactly one of the two racing tokens is the live session.
        let admitted = [first_status, second_status]
            .iter()
            .filter(|s| **s == StatusCode::OK)
            .count();
        assert_eq!(admitted, 1);
    }

    #[tokio::test]
    async fn test_full_session_lifecycle() {
        let (auth, app) = harness();

        // Login: the issued token is admitted
        let first = auth.login("alice", ALICE_PASSWORD).await.unwrap();
        let response = app
            .clone()
            .oneshot(bearer_request(first.token.as_str()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Second login: a different token, which displaces the first
        let second = auth.login("alice", ALICE_PASSWORD).await.unwrap();
        assert_ne!(second.token.as_str(), first.token.as_str());

        let response = app
            .clone()
            .oneshot(bearer_request(first.token.as_str()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .clone()
            .oneshot(bearer_request(second.token.as_str()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Logout the live session: its token stops working too
        auth.logout(second.token.as_str()).await.unwrap();
        let response = app
            .oneshot(bearer_request(second.token.as_str()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_bearer_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi".to_string()));

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwdw==".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer ".parse().unwrap());
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_auth_session_debug_hides_token() {
        let session = AuthSession {
            principal: ALICE,
            token: "eyJhbGciOiJIUzI1NiJ9.secret-payload.signature".to_string(),
        };
        let debug = format!("{:?}", session);
        assert!(debug.contains("eyJhbGciOi..."));
        assert!(!debug.contains("secret-payload"));
    }
}
