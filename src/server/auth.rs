//! Request authentication for widdler.
//!
//! Three modes are supported, selected once at startup:
//!
//! - **none**: every request belongs to the anonymous tenant.
//! - **basic**: credentials come from `Authorization: Basic <base64(user:secret)>`.
//! - **header**: a trusted reverse proxy asserts the identity with a header
//!   named `<prefix><username>` whose value is the secret.
//!
//! In both credential-carrying modes the secret is checked against the bcrypt
//! hash from the credentials file. bcrypt compares the derived hash in
//! constant time, and unknown usernames are checked against a dummy hash so
//! the work done does not reveal whether a user exists.
//!
//! # Header mode matching
//!
//! Header names are case-insensitive and arrive lowercased, so the prefix is
//! lowercased too and the username taken from the remainder is lowercase.
//! The first header (in header-map iteration order) whose name starts with the
//! prefix and has a non-empty remainder wins; later matches are ignored.
//!
//! # Example
//!
//! ```rust
//! use widdler::credentials::CredentialStore;
//! use widdler::server::auth::Authenticator;
//!
//! let hash = bcrypt::hash("wonderland", 4).unwrap();
//! let store: CredentialStore = [("alice".to_string(), hash)].into_iter().collect();
//! let auth = Authenticator::basic(store);
//!
//! assert!(auth.verify("alice", "wonderland"));
//! assert!(!auth.verify("alice", "wonderlanD"));
//! assert!(!auth.verify("bob", "wonderland"));
//! ```

use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::{debug, warn};

use crate::config::{AuthMode, DEFAULT_REALM};
use crate::credentials::CredentialStore;
use crate::tenant::ANONYMOUS_TENANT;

// =============================================================================
// Types
// =============================================================================

/// Well-formed bcrypt hash that matches no password in practice.
///
/// Verified against when the username is unknown, so both paths cost one
/// bcrypt evaluation.
const DUMMY_HASH: &str = "$2b$11$abcdefghijklmnopqrstuuABCDEFGHIJKLMNOPQRSTUVWXYZabcde";

/// Authentication error types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No credentials were presented
    MissingCredentials,

    /// Credentials were presented but could not be decoded
    MalformedHeader,

    /// Unknown user or wrong secret
    InvalidCredentials,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredentials => write!(f, "Missing credentials"),
            AuthError::MalformedHeader => write!(f, "Malformed authorization header"),
            AuthError::InvalidCredentials => write!(f, "Invalid credentials"),
        }
    }
}

impl std::error::Error for AuthError {}

impl AuthError {
    /// Build the 401 challenge response for `realm`.
    ///
    /// The body is the same for every variant.
    pub fn into_challenge(self, realm: &str) -> Response {
        let error_type = match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::MalformedHeader => "malformed_header",
            AuthError::InvalidCredentials => "invalid_credentials",
        };

        // A wrong password could indicate guessing, so log at warn level
        match self {
            AuthError::InvalidCredentials => {
                warn!(error_type, status = 401, "Authentication failed: {}", self);
            }
            _ => {
                debug!(error_type, status = 401, "Authentication failed: {}", self);
            }
        }

        let challenge = HeaderValue::from_str(&format!("Basic realm=\"{}\"", realm))
            .unwrap_or_else(|_| HeaderValue::from_static("Basic"));

        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, challenge)],
            "Unauthorized\n",
        )
            .into_response()
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.into_challenge(DEFAULT_REALM)
    }
}

/// A `(username, secret)` pair presented by a client.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Credential Extraction
// =============================================================================

/// Extract credentials from an `Authorization: Basic` header.
pub fn extract_basic(headers: &HeaderMap) -> Result<Credentials, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?;
    let value = value.to_str().map_err(|_| AuthError::MalformedHeader)?;

    let (scheme, encoded) = value
        .trim()
        .split_once(' ')
        .ok_or(AuthError::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::MalformedHeader);
    }

    let decoded = STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::MalformedHeader)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::MalformedHeader)?;

    let (username, secret) = decoded.split_once(':').ok_or(AuthError::MalformedHeader)?;

    Ok(Credentials {
        username: username.to_string(),
        secret: secret.to_string(),
    })
}

/// Extract credentials from the first header named `<prefix><username>`.
///
/// `prefix` must already be lowercase.
pub fn extract_prefixed_header(
    headers: &HeaderMap,
    prefix: &str,
) -> Result<Credentials, AuthError> {
    for (name, value) in headers {
        let Some(username) = name.as_str().strip_prefix(prefix) else {
            continue;
        };
        if username.is_empty() {
            continue;
        }

        let secret = value.to_str().map_err(|_| AuthError::MalformedHeader)?;
        return Ok(Credentials {
            username: username.to_string(),
            secret: secret.to_string(),
        });
    }

    Err(AuthError::MissingCredentials)
}

// =============================================================================
// Authenticator
// =============================================================================

#[derive(Debug, Clone)]
enum AuthMethod {
    None,
    Basic,
    Header { prefix: String },
}

/// Resolves each request to a tenant username.
#[derive(Debug, Clone)]
pub struct Authenticator {
    method: AuthMethod,
    store: Arc<CredentialStore>,
    realm: String,
}

impl Authenticator {
    /// Authentication disabled; everyone is the anonymous tenant.
    pub fn none() -> Self {
        Self {
            method: AuthMethod::None,
            store: Arc::new(CredentialStore::new()),
            realm: DEFAULT_REALM.to_string(),
        }
    }

    /// HTTP Basic authentication against `store`.
    pub fn basic(store: CredentialStore) -> Self {
        Self {
            method: AuthMethod::Basic,
            store: Arc::new(store),
            realm: DEFAULT_REALM.to_string(),
        }
    }

    /// Proxy-asserted identity via headers starting with `prefix`.
    pub fn header(store: CredentialStore, prefix: &str) -> Self {
        Self {
            method: AuthMethod::Header {
                prefix: prefix.to_ascii_lowercase(),
            },
            store: Arc::new(store),
            realm: DEFAULT_REALM.to_string(),
        }
    }

    /// Build the authenticator for a configured mode.
    pub fn from_mode(mode: AuthMode, store: CredentialStore, header_prefix: &str) -> Self {
        match mode {
            AuthMode::None => Self::none(),
            AuthMode::Basic => Self::basic(store),
            AuthMode::Header => Self::header(store, header_prefix),
        }
    }

    /// Set the realm advertised in challenges.
    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = realm.into();
        self
    }

    pub fn mode(&self) -> AuthMode {
        match self.method {
            AuthMethod::None => AuthMode::None,
            AuthMethod::Basic => AuthMode::Basic,
            AuthMethod::Header { .. } => AuthMode::Header,
        }
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    /// Authenticate a request and return the tenant username.
    ///
    /// The bcrypt check runs on the blocking thread pool.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<String, AuthError> {
        let credentials = match &self.method {
            AuthMethod::None => return Ok(ANONYMOUS_TENANT.to_string()),
            AuthMethod::Basic => extract_basic(headers)?,
            AuthMethod::Header { prefix } => extract_prefixed_header(headers, prefix)?,
        };

        let store = Arc::clone(&self.store);
        let Credentials { username, secret } = credentials;

        let checked = tokio::task::spawn_blocking(move || {
            let ok = verify_with(&store, &username, &secret);
            (username, ok)
        })
        .await;

        match checked {
            Ok((username, true)) => Ok(username),
            Ok((_, false)) => Err(AuthError::InvalidCredentials),
            Err(e) => {
                warn!(error = %e, "Credential check did not complete");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Check `secret` against the stored hash for `username`.
    pub fn verify(&self, username: &str, secret: &str) -> bool {
        verify_with(&self.store, username, secret)
    }
}

fn verify_with(store: &CredentialStore, username: &str, secret: &str) -> bool {
    match store.hash_for(username) {
        Some(hash) => bcrypt::verify(secret, hash).unwrap_or(false),
        None => {
            let _ = bcrypt::verify(secret, DUMMY_HASH);
            false
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
