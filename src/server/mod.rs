//! HTTP server layer for widdler.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │             any method, any path ─► dispatch_handler            │
//! │                                                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌────────────┐  ┌─────────┐  │
//! │  │  handlers   │  │    auth     │  │  landing   │  │ routes  │  │
//! │  │ (dispatch)  │  │(basic/hdr)  │  │ (empty dir)│  │ (layers)│  │
//! │  └─────────────┘  └─────────────┘  └────────────┘  └─────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod access_log;
pub mod auth;
pub mod handlers;
pub mod landing;
pub mod routes;

pub use access_log::access_log;
pub use auth::{AuthError, Authenticator, Credentials};
pub use handlers::{dispatch_handler, AppState, RequestClass, RequestContext, DOCUMENT_SUFFIX};
pub use landing::{render_landing, LANDING_DOCUMENT};
pub use routes::{create_router, RouterConfig};
