//! Test utilities for integration tests.
//!
//! This module provides router builders, request helpers and an instrumented
//! protocol handler for observing per-tenant serialization.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use http_body_util::BodyExt;

use widdler::{
    create_router, Authenticator, CredentialStore, ProtocolHandler, RouterConfig, TenantRegistry,
};

/// Base URL advertised by test routers.
pub const BASE_URL: &str = "http://localhost:8080";

/// Cheapest bcrypt cost, keeps tests fast.
pub const TEST_COST: u32 = 4;

// =============================================================================
// Routers
// =============================================================================

/// Credential store with low-cost hashes for `users`.
pub fn store_with(users: &[(&str, &str)]) -> CredentialStore {
    users
        .iter()
        .map(|(user, password)| {
            (
                user.to_string(),
                bcrypt::hash(password, TEST_COST).unwrap(),
            )
        })
        .collect()
}

fn test_config() -> RouterConfig {
    RouterConfig::new(BASE_URL).with_tracing(false)
}

/// Router with authentication disabled, serving `root` as the shared workspace.
pub fn anonymous_router(root: &Path) -> Router {
    let registry = TenantRegistry::anonymous(root);
    create_router(registry, Authenticator::none(), test_config())
}

/// Router with the credentials file hidden from listings, no authentication.
pub fn anonymous_router_hiding(root: &Path, hidden: &str) -> Router {
    let mut registry = TenantRegistry::new().with_hidden_name(hidden);
    registry.register(widdler::ANONYMOUS_TENANT, root);
    create_router(registry, Authenticator::none(), test_config())
}

/// Router with Basic authentication, one tenant per user below `root`.
pub fn basic_router(root: &Path, users: &[(&str, &str)]) -> Router {
    let store = store_with(users);
    let mut registry = TenantRegistry::new().with_hidden_name(".htpasswd");
    registry.register_all(root, store.usernames());
    create_router(registry, Authenticator::basic(store), test_config())
}

/// Router with header authentication, one tenant per user below `root`.
pub fn header_router(root: &Path, users: &[(&str, &str)]) -> Router {
    let store = store_with(users);
    let mut registry = TenantRegistry::new();
    registry.register_all(root, store.usernames());
    create_router(
        registry,
        Authenticator::header(store, "x-widdler-auth-"),
        test_config(),
    )
}

/// Router with Basic authentication whose tenants use `protocol` per user.
pub fn basic_router_with_protocols(
    root: &Path,
    users: &[(&str, &str)],
    protocols: Vec<Arc<dyn ProtocolHandler>>,
) -> Router {
    let store = store_with(users);
    let mut registry = TenantRegistry::new();
    for ((user, _), protocol) in users.iter().zip(protocols) {
        registry.register_with(*user, root.join(user), protocol);
    }
    create_router(registry, Authenticator::basic(store), test_config())
}

// =============================================================================
// Requests
// =============================================================================

/// `Authorization` header value for Basic credentials.
pub fn basic_auth(user: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", user, password)))
}

/// Build a request with an optional Basic authorization.
pub fn request(method: Method, uri: &str, auth: Option<(&str, &str)>, body: Body) -> Request {
    let mut builder = axum::http::Request::builder().method(method).uri(uri);
    if let Some((user, password)) = auth {
        builder = builder.header(header::AUTHORIZATION, basic_auth(user, password));
    }
    builder.body(body).unwrap()
}

pub fn get(uri: &str) -> Request {
    request(Method::GET, uri, None, Body::empty())
}

pub fn get_as(uri: &str, user: &str, password: &str) -> Request {
    request(Method::GET, uri, Some((user, password)), Body::empty())
}

pub fn put(uri: &str, body: &'static str) -> Request {
    request(Method::PUT, uri, None, Body::from(body))
}

/// Send `request` through a clone of `router`.
pub async fn send(router: &Router, request: Request) -> Response {
    use tower::ServiceExt;
    router.clone().oneshot(request).await.unwrap()
}

/// Collect a response body into a string.
pub async fn body_string(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

// =============================================================================
// Instrumented Protocol Handler
// =============================================================================

/// Protocol handler that sleeps and records how many calls overlap.
#[derive(Clone)]
pub struct SlowProtocol {
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl SlowProtocol {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProtocolHandler for SlowProtocol {
    async fn serve(&self, _request: Request) -> Response {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);

        tokio::time::sleep(self.delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (StatusCode::OK, "served").into_response()
    }
}
