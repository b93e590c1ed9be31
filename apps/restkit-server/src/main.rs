mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use config::ServerConfig;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// restkit server - hosts the sample API on the restkit dispatch runtime
#[derive(Parser)]
#[command(name = "restkit-server")]
#[command(about = "restkit server - sample API on the restkit dispatch runtime")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port override for the HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Validate configuration and exit
    Check,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},restkit={default_level}")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(ref path) = cli.config {
        if !Path::new(path).is_file() {
            anyhow::bail!("config file does not exist: {}", path.to_string_lossy());
        }
    }

    init_logging(cli.verbose);

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    if cli.print_config {
        println!("{}", config.render()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(&config),
    }
}

fn check_config(config: &ServerConfig) -> Result<()> {
    // Loading already validated the merged layers; building the runtime
    // catches route conflicts.
    simple_api::build_runtime().context("assembling the API runtime")?;
    println!("Configuration is valid");
    println!("{}", config.render()?);
    Ok(())
}

async fn run_server(config: ServerConfig) -> Result<()> {
    tracing::info!(addr = %config.socket_addr(), "restkit server starting");

    let router = simple_api::router()?.layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.socket_addr())
        .await
        .with_context(|| format!("binding {}", config.socket_addr()))?;

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            signal_token.cancel();
        }
    });

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .context("serving HTTP")?;

    tracing::info!("restkit server stopped");
    Ok(())
}
