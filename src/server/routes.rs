//! Router configuration for widdler.
//!
//! There is no route table: WebDAV uses arbitrary paths and methods, so a
//! single fallback hands every request to the dispatcher.
//!
//! # Layers
//!
//! ```text
//! TraceLayer (optional)
//!   └── access_log
//!         └── fallback ─► dispatch_handler
//! ```
//!
//! # Example
//!
//! ```ignore
//! use widdler::server::{create_router, Authenticator, RouterConfig};
//! use widdler::tenant::TenantRegistry;
//!
//! let registry = TenantRegistry::anonymous(Path::new("/srv/wikis"));
//! let config = RouterConfig::new("http://localhost:8080");
//! let router = create_router(registry, Authenticator::none(), config);
//!
//! let listener = tokio::net::TcpListener::bind("localhost:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use super::access_log::access_log;
use super::auth::Authenticator;
use super::handlers::{dispatch_handler, AppState};
use crate::config::DEFAULT_CREDENTIALS_FILE;
use crate::tenant::{DocumentTemplate, TenantRegistry};

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Base URL used for links on the landing page
    pub base_url: String,

    /// Initial content for new documents
    pub template: DocumentTemplate,

    /// Path fragment rejected with 404 (the credentials file name)
    pub blocked_fragment: String,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a router configuration advertising `base_url`.
    ///
    /// By default:
    /// - New documents use the bundled template
    /// - Paths containing `.htpasswd` are blocked
    /// - Tracing is enabled
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            template: DocumentTemplate::bundled(),
            blocked_fragment: DEFAULT_CREDENTIALS_FILE.to_string(),
            enable_tracing: true,
        }
    }

    /// Set the template for new documents.
    pub fn with_template(mut self, template: DocumentTemplate) -> Self {
        self.template = template;
        self
    }

    /// Set the blocked path fragment.
    pub fn with_blocked_fragment(mut self, fragment: impl Into<String>) -> Self {
        self.blocked_fragment = fragment.into();
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `registry` - Tenant bundles, frozen from here on
/// * `authenticator` - Authentication mode and credentials
/// * `config` - Router configuration
pub fn create_router(
    registry: TenantRegistry,
    authenticator: Authenticator,
    config: RouterConfig,
) -> Router {
    let state = AppState::new(registry, authenticator, config.base_url)
        .with_template(config.template)
        .with_blocked_fragment(config.blocked_fragment);

    let router = Router::new()
        .fallback(dispatch_handler)
        .with_state(state)
        .layer(middleware::from_fn(access_log));

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

// =============================================================================
// Tests
// =============================================================================
