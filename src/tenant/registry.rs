//! Tenant Handler Registry.
//!
//! The registry owns one [`TenantHandlers`] bundle per known user (or a single
//! anonymous bundle when authentication is off). It is populated once at
//! startup and then shared read-only behind an `Arc`, so lookups take no lock.
//!
//! Each bundle carries its own exclusive lock. [`TenantHandlers::with_lock`]
//! guarantees at most one in-flight request per tenant, which keeps the
//! "does X exist / create X" sequences in the dispatcher race-free.
//!
//! # Example
//!
//! ```ignore
//! use widdler::tenant::TenantRegistry;
//!
//! let mut registry = TenantRegistry::new();
//! registry.register("alice", "/srv/wikis/alice");
//!
//! let tenant = registry.find("alice").unwrap();
//! tenant.with_lock(|| async { /* exclusive section */ }).await;
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use super::browse::DirectoryBrowser;
use super::protocol::{DavProtocol, ProtocolHandler};

/// Username of the single tenant used when authentication is disabled.
pub const ANONYMOUS_TENANT: &str = "";

/// Filesystem root of a tenant below the serving root.
pub fn tenant_root(serving_root: &Path, username: &str) -> PathBuf {
    if username == ANONYMOUS_TENANT {
        serving_root.to_path_buf()
    } else {
        serving_root.join(username)
    }
}

// =============================================================================
// TenantHandlers
// =============================================================================

/// Per-tenant bundle: protocol handler, directory browser and exclusive lock.
pub struct TenantHandlers {
    username: String,
    root: PathBuf,
    protocol: Arc<dyn ProtocolHandler>,
    browser: DirectoryBrowser,
    lock: Mutex<()>,
}

impl TenantHandlers {
    pub fn new(
        username: impl Into<String>,
        root: impl Into<PathBuf>,
        protocol: Arc<dyn ProtocolHandler>,
        browser: DirectoryBrowser,
    ) -> Self {
        Self {
            username: username.into(),
            root: root.into(),
            protocol,
            browser,
            lock: Mutex::new(()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_anonymous(&self) -> bool {
        self.username == ANONYMOUS_TENANT
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn protocol(&self) -> &dyn ProtocolHandler {
        self.protocol.as_ref()
    }

    pub fn browser(&self) -> &DirectoryBrowser {
        &self.browser
    }

    /// Run `f` while holding this tenant's exclusive lock.
    ///
    /// The lock is released when the returned future completes, is dropped,
    /// or unwinds.
    pub async fn with_lock<F, Fut, T>(&self, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.lock.lock().await;
        f().await
    }

    /// Whether a request currently holds this tenant's lock.
    #[cfg(test)]
    fn is_busy(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}

impl std::fmt::Debug for TenantHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantHandlers")
            .field("username", &self.username)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// TenantRegistry
// =============================================================================

/// Mapping from username to tenant bundle.
#[derive(Debug, Default)]
pub struct TenantRegistry {
    tenants: HashMap<String, Arc<TenantHandlers>>,
    hidden: Vec<String>,
}

impl TenantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the single anonymous tenant rooted at `serving_root`.
    pub fn anonymous(serving_root: &Path) -> Self {
        let mut registry = Self::new();
        registry.register(ANONYMOUS_TENANT, tenant_root(serving_root, ANONYMOUS_TENANT));
        registry
    }

    /// Hide `name` from directory listings of tenants registered afterwards.
    pub fn with_hidden_name(mut self, name: impl Into<String>) -> Self {
        self.hidden.push(name.into());
        self
    }

    /// Register one tenant per username, each rooted at `serving_root/<username>`.
    pub fn register_all<'a>(
        &mut self,
        serving_root: &Path,
        usernames: impl IntoIterator<Item = &'a str>,
    ) {
        for username in usernames {
            self.register(username, tenant_root(serving_root, username));
        }
    }

    /// Register a tenant served over WebDAV from `root`.
    ///
    /// A username that is already registered keeps its existing bundle.
    pub fn register(
        &mut self,
        username: impl Into<String>,
        root: impl Into<PathBuf>,
    ) -> Arc<TenantHandlers> {
        let root = root.into();
        let protocol = Arc::new(DavProtocol::new(&root));
        self.register_with(username, root, protocol)
    }

    /// Register a tenant with a caller-supplied protocol handler.
    pub fn register_with(
        &mut self,
        username: impl Into<String>,
        root: impl Into<PathBuf>,
        protocol: Arc<dyn ProtocolHandler>,
    ) -> Arc<TenantHandlers> {
        let username = username.into();
        let root = root.into();
        let hidden = &self.hidden;

        let bundle = self.tenants.entry(username.clone()).or_insert_with(|| {
            let browser = hidden
                .iter()
                .fold(DirectoryBrowser::new(&root), |browser, name| {
                    browser.hide(name.clone())
                });
            Arc::new(TenantHandlers::new(username, root, protocol, browser))
        });

        Arc::clone(bundle)
    }

    /// Look up the bundle for `username`.
    pub fn find(&self, username: &str) -> Option<Arc<TenantHandlers>> {
        self.tenants.get(username).cloned()
    }

    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.tenants.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
