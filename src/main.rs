//! widdler - A multi-tenant WebDAV server for self-saving HTML wikis.
//!
//! This binary starts the HTTP server and configures all components.

use std::io::{self, BufRead, Write};
use std::net::SocketAddr;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use widdler::{
    config::{AdduserConfig, Cli, Command, ServeConfig, DEFAULT_CREDENTIALS_FILE},
    credentials::{append_entry, validate_username, CredentialStore},
    server::{create_router, Authenticator, RouterConfig},
    tenant::{DocumentTemplate, TenantRegistry, ANONYMOUS_TENANT},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Adduser(config) => run_adduser(config),
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    // Template for new documents
    let template = match &config.template {
        Some(path) => match DocumentTemplate::from_file(path).await {
            Ok(template) => template,
            Err(e) => {
                error!("Failed to read template {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => DocumentTemplate::bundled(),
    };

    // Serving root
    if let Err(e) = tokio::fs::create_dir_all(&config.wikis).await {
        error!("Failed to create {}: {}", config.wikis.display(), e);
        return ExitCode::FAILURE;
    }

    // Credentials
    let credentials_path = config.credentials_path();
    let store = match CredentialStore::load_if_present(&credentials_path) {
        Ok(Some(store)) => store,
        Ok(None) if config.auth.is_enabled() => {
            error!("No credentials file found at {}", credentials_path.display());
            error!("Create one with: widdler adduser --htpass {}", credentials_path.display());
            return ExitCode::FAILURE;
        }
        Ok(None) => CredentialStore::new(),
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if config.auth.is_enabled() && store.is_empty() {
        error!("No users in {}", credentials_path.display());
        return ExitCode::FAILURE;
    }

    // Tenants
    let blocked_fragment = credentials_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_CREDENTIALS_FILE.to_string());

    let mut registry = TenantRegistry::new().with_hidden_name(blocked_fragment.clone());
    if config.auth.is_enabled() {
        registry.register_all(&config.wikis, store.usernames());
    } else {
        registry.register(ANONYMOUS_TENANT, &config.wikis);
    }

    let authenticator = Authenticator::from_mode(config.auth, store, &config.auth_header_prefix)
        .with_realm(config.realm.clone());

    // Print startup banner and info
    print_banner();

    info!("Configuration:");
    info!("  Wikis: {}", config.wikis.display());
    info!("  Tenants: {}", registry.len());
    if config.auth.is_enabled() {
        info!("  Auth: {} ({})", config.auth.as_str(), credentials_path.display());
    } else {
        warn!("  Auth: DISABLED - every request uses the shared workspace");
    }
    info!(
        "  TLS: {}",
        if config.tls_enabled() { "enabled" } else { "disabled" }
    );

    let router_config = build_router_config(&config, template, blocked_fragment);
    let router = create_router(registry, authenticator, router_config);
    let app = router.into_make_service_with_connect_info::<SocketAddr>();

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: {}", config.base_url());
    info!("");
    info!("  Open a wiki in your browser:");
    info!("    {}/wiki.html", config.base_url());
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    if let (Some(cert), Some(key)) = (&config.tls_cert, &config.tls_key) {
        let tls = match axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key).await {
            Ok(tls) => tls,
            Err(e) => {
                error!("Failed to load TLS certificate: {}", e);
                return ExitCode::FAILURE;
            }
        };

        let socket_addr = match tokio::net::lookup_host(addr).await.map(|mut a| a.next()) {
            Ok(Some(socket_addr)) => socket_addr,
            Ok(None) => {
                error!("Failed to resolve {}", addr);
                return ExitCode::FAILURE;
            }
            Err(e) => {
                error!("Failed to resolve {}: {}", addr, e);
                return ExitCode::FAILURE;
            }
        };

        if let Err(e) = axum_server::bind_rustls(socket_addr, tls).serve(app).await {
            error!("Server error: {}", e);
            return ExitCode::FAILURE;
        }
        return ExitCode::SUCCESS;
    }

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("██╗    ██╗██╗██████╗ ██████╗ ██╗     ███████╗██████╗ ");
    info!("██║    ██║██║██╔══██╗██╔══██╗██║     ██╔════╝██╔══██╗");
    info!("██║ █╗ ██║██║██║  ██║██║  ██║██║     █████╗  ██████╔╝");
    info!("██║███╗██║██║██║  ██║██║  ██║██║     ██╔══╝  ██╔══██╗");
    info!("╚███╔███╔╝██║██████╔╝██████╔╝███████╗███████╗██║  ██║");
    info!(" ╚══╝╚══╝ ╚═╝╚═════╝ ╚═════╝ ╚══════╝╚══════╝╚═╝  ╚═╝");
    info!("");
    info!("                        v{}", version);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "widdler=debug,tower_http=debug"
    } else {
        "widdler=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(
    config: &ServeConfig,
    template: DocumentTemplate,
    blocked_fragment: String,
) -> RouterConfig {
    RouterConfig::new(config.base_url())
        .with_template(template)
        .with_blocked_fragment(blocked_fragment)
        .with_tracing(!config.no_tracing)
}

// =============================================================================
// Adduser Command
// =============================================================================

fn run_adduser(config: AdduserConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let username = match config.user.clone() {
        Some(user) => user,
        None => match prompt_line("Username: ") {
            Ok(user) => user,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    if let Err(e) = validate_username(&username) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let password = match rpassword::prompt_password("Password: ") {
        Ok(password) => password,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if password.is_empty() {
        eprintln!("Error: password must not be empty");
        return ExitCode::FAILURE;
    }

    match append_entry(&config.htpass, &username, &password, config.cost) {
        Ok(()) => {
            println!("Added {} to {}", username, config.htpass.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn prompt_line(prompt: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    stdout.write_all(prompt.as_bytes())?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
