//! ETSI Stream Binary
//!
//! WebSocket server streaming stored ETSI datasets from IoTDB.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use clap::Parser;
use etsi_client::RestSessionFactory;
use etsi_stream::{create_router, AppState, StreamConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

#[derive(Parser)]
#[command(name = "etsi-stream")]
#[command(author = "AutomataNexus Development Team")]
#[command(version = "0.1.0")]
#[command(about = "ETSI WebSocket stream router", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Host to bind to
    #[arg(long)]
    bind: Option<String>,

    /// Port to listen on
    #[arg(short = 'w', long, env = "WSPORT")]
    wsport: Option<u16>,

    /// Identifier root every group lives under
    #[arg(long, env = "ETSI_ROOT")]
    root: Option<String>,

    /// Query timeout in milliseconds
    #[arg(long)]
    query_timeout_ms: Option<u64>,

    /// IoTDB host
    #[arg(short = 'H', long, env = "IOTDB_HOST")]
    host: Option<String>,

    /// IoTDB REST port
    #[arg(short, long, env = "IOTDB_PORT")]
    port: Option<u16>,

    /// IoTDB user
    #[arg(long, env = "IOTDB_USER")]
    user: Option<String>,

    /// IoTDB password
    #[arg(long, env = "IOTDB_PASSWORD", hide_env_values = true)]
    password: Option<String>,
}

impl Args {
    fn into_config(self) -> etsi_common::Result<StreamConfig> {
        let mut config = match &self.config {
            Some(path) => StreamConfig::from_file(path)?,
            None => StreamConfig::from_env(),
        };

        if let Some(bind) = self.bind {
            config.host = bind;
        }
        if let Some(port) = self.wsport {
            config.port = port;
        }
        if let Some(root) = self.root {
            config.identifier_root = root;
        }
        if let Some(ms) = self.query_timeout_ms {
            config.client.timeout.query = Duration::from_millis(ms);
        }

        let connection = &mut config.client.connection;
        if let Some(host) = self.host {
            connection.host = host;
        }
        if let Some(port) = self.port {
            connection.port = port;
        }
        if let Some(user) = self.user {
            connection.username = user;
        }
        if let Some(password) = self.password {
            connection.password = password;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = match Args::parse().into_config() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("Invalid configuration: {}", err);
            return ExitCode::from(2);
        }
    };
    let addr: SocketAddr = config.socket_addr();

    tracing::info!("Starting ETSI stream router on {}", addr);
    tracing::info!("Identifier root: {}", config.identifier_root);
    tracing::info!("TSDB endpoint: {}", config.client.connection.address());

    let sessions = Arc::new(RestSessionFactory::new(config.client.clone()));
    let state = AppState::new(config, sessions);
    let state_for_shutdown = state.clone();
    let app = create_router(state);

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind to {}: {}", addr, err);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Stream endpoint ready at ws://{}/ws", addr);

    // Run server with graceful shutdown
    match axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state_for_shutdown))
        .await
    {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("Server error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install signal handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!(
        "Shutdown signal received, closing {} connections",
        state.connections.active()
    );
    state.shutdown();
}
