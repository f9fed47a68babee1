//! Remote file-editing protocol capability.
//!
//! The dispatcher never interprets protocol semantics itself. It hands the
//! whole request to a [`ProtocolHandler`] bound to the tenant root and returns
//! whatever comes back, status codes included.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::Request;
use axum::response::Response;
use dav_server::{localfs::LocalFs, memls::MemLs, DavHandler};

/// A handler serving a file-editing protocol against one directory.
#[async_trait]
pub trait ProtocolHandler: Send + Sync {
    /// Serve a request. Errors are expressed as HTTP responses.
    async fn serve(&self, request: Request) -> Response;
}

/// WebDAV over the local filesystem.
///
/// Locks taken through `LOCK` live in memory and are scoped to this tenant.
pub struct DavProtocol {
    root: PathBuf,
    handler: DavHandler,
}

impl DavProtocol {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let handler = DavHandler::builder()
            .filesystem(LocalFs::new(&root, false, false, false))
            .locksystem(MemLs::new())
            .build_handler();

        Self { root, handler }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ProtocolHandler for DavProtocol {
    async fn serve(&self, request: Request) -> Response {
        self.handler.handle(request).await.map(Body::new)
    }
}
