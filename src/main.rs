use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use geocode_gateway::config::{load_config, GatewayConfig};
use geocode_gateway::observability::{logging, metrics};
use geocode_gateway::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "geocode-gateway")]
#[command(about = "Admission-control gateway for a geocoding backend", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, global = true, default_value = "gateway.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway (default)
    Serve,
    /// Validate the configuration and print the sections forwarded to the geocoding engine
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration {}: {}", cli.config.display(), e);
            std::process::exit(2);
        }
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::CheckConfig => {
            println!("Configuration OK");
            print!("{}", config.passthrough_toml()?);
            Ok(())
        }
        Commands::Serve => serve(config).await,
    }
}

async fn serve(config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(config.log_level.as_deref(), config.observability.log_format);

    tracing::info!("geocode-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        backend = %config.backend.url,
        backend_timeout_ms = config.backend.timeout_ms,
        rate_limit_points = config.rate_limit.points,
        rate_limit_duration_secs = config.rate_limit.duration_secs,
        cors_enabled = config.cors.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move { signal_shutdown.trigger_on_signal().await });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
