//! Request dispatch for the widdler file server.
//!
//! Every request, whatever its method, enters [`dispatch_handler`], which runs
//! the following state machine:
//!
//! ```text
//! path safety ──► authenticate ──► find tenant ──► with_lock {
//!     ensure root ──► classify ──┬── *.html ──► materialize ──► protocol
//!                                └── other  ──► landing | redirect | browser
//! }
//! ```
//!
//! # Responses produced here
//!
//! - `404 Not Found`: unsafe path or unknown tenant
//! - `401 Unauthorized`: authentication failure (with challenge)
//! - `301 Moved Permanently`: tenant root with an `index.html`
//! - `500 Internal Server Error`: filesystem failure, body is the error text
//!
//! Everything else comes from the protocol handler or the directory browser.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};
use tracing::{debug, error, info};

use crate::error::DispatchError;
use crate::tenant::{browse::redirect, resolve_path, DocumentTemplate, TenantHandlers, TenantRegistry};

use super::auth::Authenticator;
use super::landing::render_landing;

/// Suffix that routes a path to the protocol handler.
pub const DOCUMENT_SUFFIX: &str = ".html";

/// Body of every dispatcher-generated 404.
const NOT_FOUND_BODY: &str = "404 page not found\n";

/// Token that must never appear in a request path.
const PARENT_DIR_TOKEN: &str = "..";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// Built once at startup; every field is read-only afterwards.
#[derive(Clone)]
pub struct AppState {
    /// Tenant bundles keyed by username
    pub registry: Arc<TenantRegistry>,

    /// Request authentication
    pub authenticator: Arc<Authenticator>,

    /// Initial content of new documents
    pub template: DocumentTemplate,

    /// Base URL advertised on the landing page
    pub base_url: String,

    /// Path fragment that is always answered with 404 (the credentials file name)
    pub blocked_fragment: String,
}

impl AppState {
    pub fn new(
        registry: TenantRegistry,
        authenticator: Authenticator,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            authenticator: Arc::new(authenticator),
            template: DocumentTemplate::bundled(),
            base_url: base_url.into(),
            blocked_fragment: crate::config::DEFAULT_CREDENTIALS_FILE.to_string(),
        }
    }

    /// Use a different template for new documents.
    pub fn with_template(mut self, template: DocumentTemplate) -> Self {
        self.template = template;
        self
    }

    /// Block a different path fragment.
    pub fn with_blocked_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.blocked_fragment = fragment.into();
        self
    }

    /// Whether `raw_path` may be dispatched at all.
    ///
    /// Checked on the raw path and again on its percent-decoded form.
    pub fn is_safe_path(&self, raw_path: &str) -> bool {
        let decoded = urlencoding::decode(raw_path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| raw_path.to_string());

        [raw_path, decoded.as_str()].iter().all(|path| {
            !path.contains(PARENT_DIR_TOKEN)
                && (self.blocked_fragment.is_empty() || !path.contains(&self.blocked_fragment))
        })
    }
}

// =============================================================================
// Request Context
// =============================================================================

/// How a request is served once its tenant is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// HTML document, handled by the protocol handler
    Document,
    /// Anything else, handled by the directory browser
    Browse,
}

impl RequestClass {
    /// Classify a raw request path by its percent-decoded form.
    pub fn of(raw_path: &str) -> Self {
        let decoded = urlencoding::decode(raw_path);
        let path = decoded.as_deref().unwrap_or(raw_path);

        if path.ends_with(DOCUMENT_SUFFIX) {
            RequestClass::Document
        } else {
            RequestClass::Browse
        }
    }
}

/// Per-request facts, dropped when the request completes.
#[derive(Debug)]
pub struct RequestContext {
    pub username: String,
    pub path: String,
    pub class: RequestClass,
    /// Absolute filesystem target, `None` when the path cannot be mapped
    pub target: Option<PathBuf>,
}

impl RequestContext {
    fn new(tenant: &TenantHandlers, path: &str) -> Self {
        Self {
            username: tenant.username().to_string(),
            path: path.to_string(),
            class: RequestClass::of(path),
            target: resolve_path(tenant.root(), path),
        }
    }
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Convert DispatchError to a plain-text 500.
impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        error!(kind = self.kind(), error = %self, "Request failed");

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("{}\n", self),
        )
            .into_response()
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        NOT_FOUND_BODY,
    )
        .into_response()
}

// =============================================================================
// Handlers
// =============================================================================

/// Single entry point for every request.
pub async fn dispatch_handler(State(state): State<AppState>, request: Request) -> Response {
    let raw_path = request.uri().path().to_string();

    if !state.is_safe_path(&raw_path) {
        debug!(path = %raw_path, "Rejected unsafe path");
        return not_found();
    }

    let username = match state.authenticator.authenticate(request.headers()).await {
        Ok(username) => username,
        Err(e) => return e.into_challenge(state.authenticator.realm()),
    };

    let Some(tenant) = state.registry.find(&username) else {
        debug!(username = %username, "No tenant registered");
        return not_found();
    };

    let state_ref = &state;
    let tenant_ref = tenant.as_ref();
    tenant
        .with_lock(move || serve_tenant(state_ref, tenant_ref, request))
        .await
        .unwrap_or_else(IntoResponse::into_response)
}

/// Everything after the tenant lock has been taken.
async fn serve_tenant(
    state: &AppState,
    tenant: &TenantHandlers,
    request: Request,
) -> Result<Response, DispatchError> {
    ensure_root(tenant.root()).await?;

    let context = RequestContext::new(tenant, request.uri().path());
    debug!(
        username = %context.username,
        path = %context.path,
        class = ?context.class,
        "Dispatching"
    );

    match context.class {
        RequestClass::Document => serve_document(state, tenant, context, request).await,
        RequestClass::Browse => serve_browse(state, tenant, context, request).await,
    }
}

/// Create the tenant root with owner-only permissions if it is missing.
async fn ensure_root(root: &Path) -> Result<(), DispatchError> {
    match tokio::fs::metadata(root).await {
        Ok(_) => return Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(source) => {
            return Err(DispatchError::CreateRoot {
                path: root.to_path_buf(),
                source,
            })
        }
    }

    let mut builder = tokio::fs::DirBuilder::new();
    #[cfg(unix)]
    builder.mode(0o700);

    match builder.create(root).await {
        Ok(()) => {
            info!(path = %root.display(), "Created tenant directory");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(source) => Err(DispatchError::CreateRoot {
            path: root.to_path_buf(),
            source,
        }),
    }
}

async fn serve_document(
    state: &AppState,
    tenant: &TenantHandlers,
    context: RequestContext,
    request: Request,
) -> Result<Response, DispatchError> {
    let Some(target) = context.target else {
        return Ok(not_found());
    };

    state
        .template
        .materialize(&target)
        .await
        .map_err(|source| DispatchError::CreateDocument {
            path: target.clone(),
            source,
        })?;

    Ok(tenant.protocol().serve(request).await)
}

async fn serve_browse(
    state: &AppState,
    tenant: &TenantHandlers,
    context: RequestContext,
    request: Request,
) -> Result<Response, DispatchError> {
    let entries = tenant
        .browser()
        .visible_entries()
        .await
        .map_err(|source| DispatchError::ListDirectory {
            path: tenant.root().to_path_buf(),
            source,
        })?;

    if entries.is_empty() {
        let username = (!tenant.is_anonymous()).then(|| context.username.as_str());
        return Ok(Html(render_landing(username, &state.base_url)).into_response());
    }

    if context.path == "/" && entries.iter().any(|name| name == "index.html") {
        return Ok(redirect(StatusCode::MOVED_PERMANENTLY, "/index.html"));
    }

    tenant.browser().serve(request).await
}

// =============================================================================
// Tests
// =============================================================================
