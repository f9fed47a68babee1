//! Per-tenant workspaces.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       TenantRegistry                         │
//! │         username ──► Arc<TenantHandlers> (immutable)         │
//! │                                                              │
//! │  ┌──────────────────────────────────────────────────────┐    │
//! │  │                  TenantHandlers                      │    │
//! │  │  ┌───────────────┐ ┌──────────────────┐ ┌─────────┐  │    │
//! │  │  │ DavProtocol   │ │ DirectoryBrowser │ │ Mutex   │  │    │
//! │  │  │ (*.html)      │ │ (everything else)│ │ (1 req) │  │    │
//! │  │  └───────────────┘ └──────────────────┘ └─────────┘  │    │
//! │  └──────────────────────────────────────────────────────┘    │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod browse;
pub mod document;
pub mod protocol;
pub mod registry;

use std::path::{Component, Path, PathBuf};

pub use browse::DirectoryBrowser;
pub use document::DocumentTemplate;
pub use protocol::{DavProtocol, ProtocolHandler};
pub use registry::{tenant_root, TenantHandlers, TenantRegistry, ANONYMOUS_TENANT};

/// Map a raw request path onto a filesystem path below `root`.
///
/// The path is percent-decoded first. Returns `None` when decoding fails or
/// when a component would escape the root.
pub fn resolve_path(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let decoded = urlencoding::decode(uri_path).ok()?;
    let mut target = root.to_path_buf();

    for component in Path::new(decoded.as_ref()).components() {
        match component {
            Component::Normal(part) => target.push(part),
            Component::RootDir | Component::CurDir => {}
            Component::ParentDir | Component::Prefix(_) => return None,
        }
    }

    Some(target)
}
