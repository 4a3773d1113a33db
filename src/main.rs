//! protomux: single-port protocol multiplexer.

use std::path::PathBuf;

use clap::Parser;

use protomux::config::validation::validate_config;
use protomux::config::{load_config, ConfigError, MuxConfig};
use protomux::dispatch::Collaborators;
use protomux::http::MuxServer;
use protomux::lifecycle::Shutdown;
use protomux::net::{ConnectionTracker, Listener};
use protomux::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "protomux")]
#[command(about = "Serve admin, WebSocket and plain HTTP traffic on one port", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Serve static resources from `static_files.root` instead of the bundle.
    #[arg(long)]
    unpacked: bool,
}

fn resolve_config(cli: &Cli) -> Result<MuxConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => MuxConfig::default(),
    };
    if let Some(bind) = &cli.bind {
        config.listener.bind_address = bind.clone();
    }
    if cli.unpacked {
        config.static_files.unpacked = true;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "protomux starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        admin_root_path = %config.paths.admin_root_path,
        websocket_path = %config.paths.websocket_path,
        unpacked = config.static_files.unpacked,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let tracker = ConnectionTracker::new();
    let collaborators = Collaborators::builtin(&config, tracker.clone());
    let server = MuxServer::new(&config, collaborators, tracker)?;
    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    shutdown.trigger_on_signal();

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
