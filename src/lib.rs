//! # widdler
//!
//! A multi-tenant WebDAV file server for self-saving HTML wikis.
//!
//! Each authenticated user gets a private directory below the serving root.
//! Any `*.html` path that does not exist yet is created from a bundled
//! template on first access and then served over WebDAV, so a browser page
//! can save itself back with a plain `PUT`. Everything else is browsable
//! read-only.
//!
//! ## Features
//!
//! - **Self-initializing documents**: missing HTML files are materialized on demand
//! - **Per-user isolation**: one directory, one WebDAV handler and one lock per user
//! - **Authentication**: none, HTTP Basic against an htpasswd file, or proxy headers
//! - **Path safety**: traversal tokens and the credentials file are never served
//!
//! ## Architecture
//!
//! - [`credentials`] - htpasswd-style credential store
//! - [`tenant`] - Tenant registry, WebDAV handler, directory browser, template
//! - [`server`] - Axum dispatcher, authentication and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use widdler::{create_router, Authenticator, RouterConfig, TenantRegistry};
//!
//! #[tokio::main]
//! async fn main() {
//!     let registry = TenantRegistry::anonymous(Path::new("/srv/wikis"));
//!     let router = create_router(
//!         registry,
//!         Authenticator::none(),
//!         RouterConfig::new("http://localhost:8080"),
//!     );
//!
//!     let listener = tokio::net::TcpListener::bind("localhost:8080").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod credentials;
pub mod error;
pub mod server;
pub mod tenant;

// Re-export commonly used types
pub use config::{AdduserConfig, AuthMode, Cli, Command, ServeConfig};
pub use credentials::{append_entry, validate_username, CredentialStore, DEFAULT_BCRYPT_COST};
pub use error::{CredentialError, DispatchError};
pub use server::{
    create_router, dispatch_handler, render_landing, AppState, AuthError, Authenticator,
    RouterConfig,
};
pub use tenant::{
    resolve_path, DavProtocol, DirectoryBrowser, DocumentTemplate, ProtocolHandler,
    TenantHandlers, TenantRegistry, ANONYMOUS_TENANT,
};
