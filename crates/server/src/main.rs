//! DeptShare Server
//!
//! Department-scoped file share service.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use server::config::{default_config_path, Config};
use server::files::{DepartmentAuthorizer, DirectoryLister, FileOperations, PathResolver};
use server::http::{build_router, AppState};
use server::router::OperationRouter;
use server::session::HeaderClaimsResolver;

/// DeptShare server - department-scoped file share service.
#[derive(Parser, Debug)]
#[command(name = "deptshare-server")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for the server.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the DeptShare server
    Serve {
        /// Override the bind address from the configuration
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Write a starter configuration file and exit
    InitConfig {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &cli.config {
        Config::load(config_path)?
    } else {
        Config::load_default()?
    };

    // Apply environment variable overrides
    config.apply_env_overrides();

    if let Commands::Serve { bind: Some(addr) } = &cli.command {
        config.server.bind_addr = addr.clone();
    }

    // Validate configuration
    config.validate()?;

    // Initialize tracing; --verbose wins over the configured level,
    // RUST_LOG wins over both.
    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.server.log_level.clone()
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Commands::Serve { .. } => serve(config).await,
        Commands::InitConfig { force } => init_config(&cli.config, force),
    }
}

/// Provision the share root and run the HTTP server until ctrl-c.
async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("DeptShare server starting...");

    provision_share_root(&config)?;

    let resolver = Arc::new(
        PathResolver::new(&config.storage.root).with_context(|| {
            format!(
                "Failed to open share root: {}",
                config.storage.root.display()
            )
        })?,
    );
    let authorizer = Arc::new(DepartmentAuthorizer::new(config.share.departments.clone()));
    let lister = Arc::new(DirectoryLister::new(resolver.clone()));
    let operations = Arc::new(FileOperations::new(config.upload.max_upload_size));

    let router = Arc::new(OperationRouter::new(
        resolver, authorizer, lister, operations,
    ));
    let claims = Arc::new(HeaderClaimsResolver::new(config.share.departments.clone()));
    let app = build_router(
        AppState::new(router, claims),
        config.upload.max_upload_size as usize,
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    tracing::info!(
        addr = %config.server.bind_addr,
        root = %config.storage.root.display(),
        departments = ?config.share.departments,
        "Listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    tracing::info!("DeptShare server stopped");
    Ok(())
}

/// Create the share root and the configured department folders.
///
/// Department folders are provisioned here because writes at the root
/// level are denied to every caller.
fn provision_share_root(config: &Config) -> anyhow::Result<()> {
    fs::create_dir_all(&config.storage.root).with_context(|| {
        format!(
            "Failed to create share root: {}",
            config.storage.root.display()
        )
    })?;

    for department in &config.share.departments {
        let folder = config.storage.root.join(department);
        if !folder.exists() {
            fs::create_dir(&folder).with_context(|| {
                format!("Failed to create department folder: {}", folder.display())
            })?;
            tracing::info!(department = %department, "Provisioned department folder");
        }
    }

    Ok(())
}

/// Write a starter configuration file.
fn init_config(path: &Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.clone().unwrap_or_else(default_config_path);

    if path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    let config = Config::default();
    config.save(&path)?;
    println!("Wrote configuration to {}", path.display());
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install ctrl-c handler");
    } else {
        tracing::info!("Shutdown signal received");
    }
}
