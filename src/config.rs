//! Configuration management for widdler.
//!
//! This module provides the command-line interface:
//! - `serve` (the default when no subcommand is given) runs the server
//! - `adduser` appends a bcrypt entry to the credentials file
//!
//! Serve options can also be set through environment variables with the
//! `WIDDLER_` prefix:
//!
//! - `WIDDLER_WIKIS` - Directory holding the per-user workspaces (default: .)
//! - `WIDDLER_HTTP` - Listen address (default: localhost:8080)
//! - `WIDDLER_TLS_CERT` / `WIDDLER_TLS_KEY` - PEM certificate and key
//! - `WIDDLER_HTPASS` - Credentials file (default: <wikis>/.htpasswd)
//! - `WIDDLER_AUTH` - Authentication mode: none, basic or header (default: basic)
//! - `WIDDLER_AUTH_HEADER_PREFIX` - Header prefix for header mode
//! - `WIDDLER_PUBLIC_URL` - Base URL advertised on the landing page
//! - `WIDDLER_TEMPLATE` - Replacement for the bundled HTML document

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::credentials::DEFAULT_BCRYPT_COST;

// =============================================================================
// Default Values
// =============================================================================

/// Default listen address.
pub const DEFAULT_LISTEN: &str = "localhost:8080";

/// Default serving root.
pub const DEFAULT_WIKIS_DIR: &str = ".";

/// Name of the credentials file when no explicit path is given.
pub const DEFAULT_CREDENTIALS_FILE: &str = ".htpasswd";

/// Default realm advertised in authentication challenges.
pub const DEFAULT_REALM: &str = "widdler";

/// Default header prefix for `--auth header`.
pub const DEFAULT_AUTH_HEADER_PREFIX: &str = "x-widdler-auth-";

// =============================================================================
// CLI Arguments
// =============================================================================

/// widdler - per-user WebDAV workspaces for self-initializing HTML documents.
///
/// Any HTML path that does not exist yet is created from a bundled template
/// on first access.
#[derive(Parser, Debug)]
#[command(name = "widdler")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// Resolve the command to run, defaulting to `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the WebDAV server (default)
    Serve(ServeConfig),

    /// Add a user to the credentials file (creating it if needed)
    Adduser(AdduserConfig),
}

/// How requests are authenticated.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// No authentication; everyone shares a single anonymous workspace
    None,
    /// HTTP Basic authentication against the credentials file
    Basic,
    /// Identity asserted by a trusted proxy through a prefixed header
    Header,
}

impl AuthMode {
    pub fn is_enabled(self) -> bool {
        self != AuthMode::None
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AuthMode::None => "none",
            AuthMode::Basic => "basic",
            AuthMode::Header => "header",
        }
    }
}

/// Options for the `serve` command.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Directory of per-user workspaces to serve over WebDAV.
    #[arg(long, default_value = DEFAULT_WIKIS_DIR, env = "WIDDLER_WIKIS")]
    pub wikis: PathBuf,

    /// Address to listen on.
    #[arg(long = "http", default_value = DEFAULT_LISTEN, env = "WIDDLER_HTTP")]
    pub listen: String,

    /// TLS certificate (PEM). Requires --tls-key.
    #[arg(long, env = "WIDDLER_TLS_CERT")]
    pub tls_cert: Option<PathBuf>,

    /// TLS private key (PEM). Requires --tls-cert.
    #[arg(long, env = "WIDDLER_TLS_KEY")]
    pub tls_key: Option<PathBuf>,

    /// Base URL used in links on the landing page.
    ///
    /// Defaults to http(s)://<listen address>.
    #[arg(long, env = "WIDDLER_PUBLIC_URL")]
    pub public_url: Option<String>,

    /// HTML file used to initialize new documents instead of the bundled one.
    #[arg(long, env = "WIDDLER_TEMPLATE")]
    pub template: Option<PathBuf>,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Path to the credentials (.htpasswd) file.
    ///
    /// Defaults to .htpasswd inside the wikis directory.
    #[arg(long, env = "WIDDLER_HTPASS")]
    pub htpass: Option<PathBuf>,

    /// Authentication mode.
    #[arg(long, value_enum, default_value_t = AuthMode::Basic, env = "WIDDLER_AUTH")]
    pub auth: AuthMode,

    /// Header name prefix carrying the username in header mode.
    #[arg(long, default_value = DEFAULT_AUTH_HEADER_PREFIX, env = "WIDDLER_AUTH_HEADER_PREFIX")]
    pub auth_header_prefix: String,

    /// Realm sent in authentication challenges.
    #[arg(long, default_value = DEFAULT_REALM, env = "WIDDLER_REALM")]
    pub realm: String,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.listen.trim().is_empty() {
            return Err("Listen address is required. Set --http or WIDDLER_HTTP".to_string());
        }

        match (&self.tls_cert, &self.tls_key) {
            (Some(_), None) => {
                return Err("--tls-cert was given without --tls-key".to_string());
            }
            (None, Some(_)) => {
                return Err("--tls-key was given without --tls-cert".to_string());
            }
            _ => {}
        }

        if self.auth == AuthMode::Header && self.auth_header_prefix.trim().is_empty() {
            return Err(
                "Header authentication needs a non-empty --auth-header-prefix".to_string(),
            );
        }

        if self.realm.is_empty() || self.realm.contains('"') {
            return Err("realm must be non-empty and must not contain '\"'".to_string());
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> &str {
        &self.listen
    }

    pub fn tls_enabled(&self) -> bool {
        self.tls_cert.is_some() && self.tls_key.is_some()
    }

    /// Credentials file path, falling back to `<wikis>/.htpasswd`.
    pub fn credentials_path(&self) -> PathBuf {
        self.htpass
            .clone()
            .unwrap_or_else(|| self.wikis.join(DEFAULT_CREDENTIALS_FILE))
    }

    /// Base URL advertised to users, without a trailing slash.
    pub fn base_url(&self) -> String {
        match &self.public_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => {
                let scheme = if self.tls_enabled() { "https" } else { "http" };
                format!("{}://{}", scheme, self.listen)
            }
        }
    }
}

/// Options for the `adduser` command.
#[derive(Args, Debug, Clone)]
pub struct AdduserConfig {
    /// Credentials file to create or extend.
    #[arg(long, default_value = DEFAULT_CREDENTIALS_FILE, env = "WIDDLER_HTPASS")]
    pub htpass: PathBuf,

    /// Username to add (prompted for when omitted).
    #[arg(long)]
    pub user: Option<String>,

    /// bcrypt cost factor.
    #[arg(long, default_value_t = DEFAULT_BCRYPT_COST)]
    pub cost: u32,
}

impl AdduserConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(4..=31).contains(&self.cost) {
            return Err("cost must be between 4 and 31".to_string());
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
