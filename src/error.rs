use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or extending the credentials file.
///
/// All of these are startup-fatal for the `serve` command.
#[derive(Debug, Error)]
pub enum CredentialError {
    /// The file could not be opened, read or written
    #[error("Credentials file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line does not have the `username:hash` shape
    #[error("Malformed credentials entry on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Username cannot be stored in a colon-delimited file
    #[error("Invalid username {0:?}: must be non-empty, must not start with '.' or '#', and must contain no ':', '/', '\\' or whitespace")]
    InvalidUsername(String),

    /// Password hashing failed
    #[error("Password hashing failed: {0}")]
    Hash(String),
}

/// Server-side failures while dispatching a request.
///
/// Every variant maps to HTTP 500 with the error text as body.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Tenant root directory could not be created
    #[error("Failed to create directory {path}: {source}")]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTML document could not be materialized from the template
    #[error("Failed to create {path}: {source}")]
    CreateDocument {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tenant directory could not be listed
    #[error("Failed to list {path}: {source}")]
    ListDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file server failed to produce a response
    #[error("Failed to serve {path}: {source}")]
    Browse {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DispatchError {
    /// Short machine-readable label used in log events.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::CreateRoot { .. } => "create_root",
            DispatchError::CreateDocument { .. } => "create_document",
            DispatchError::ListDirectory { .. } => "list_directory",
            DispatchError::Browse { .. } => "browse",
        }
    }
}
