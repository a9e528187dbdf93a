//! Task service binary.
//!
//! Configuration comes from `~/.config/todoapp/config.json` (or
//! `TODOAPP_CONFIG_PATH`), then `DATABASE_URL`, `HOST` and `PORT`, then
//! `--config-override KEY=VALUE` flags. `RUST_LOG` controls logging.

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use todo_core::config::resolve_config;
use todo_core::storage::open_store;
use todo_server::AppState;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve the to-do task API", long_about = None)]
struct Args {
    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE")]
    config_override: Vec<String>,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo_server=debug,todo_core=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let loaded = match resolve_config(&args.config_override) {
        Ok(loaded) => loaded,
        Err(error) => {
            tracing::error!(%error, "configuration error");
            std::process::exit(1);
        }
    };
    if let Some(error) = loaded.error.as_ref() {
        tracing::warn!(%error, "ignoring config file, using defaults");
    }
    let config = loaded.config;

    let database_url = match config.database_url() {
        Ok(url) => url,
        Err(error) => {
            tracing::error!(%error, "cannot determine database location");
            std::process::exit(1);
        }
    };

    let store = match open_store(&database_url) {
        Ok(store) => store,
        Err(error) => {
            tracing::error!(%error, database_url = %database_url, "failed to open task store");
            std::process::exit(1);
        }
    };

    // Host names are resolved here; the first address that binds wins.
    let listener = match TcpListener::bind((config.host(), config.port())).await {
        Ok(listener) => listener,
        Err(error) => {
            tracing::error!(
                %error,
                "failed to bind to {}:{}",
                config.host(),
                config.port()
            );
            std::process::exit(1);
        }
    };

    let state = AppState::new(store.clone());
    if let Err(error) = todo_server::serve(listener, state, shutdown_signal()).await {
        tracing::error!(%error, "server error");
        std::process::exit(1);
    }

    if let Err(error) = store.close() {
        tracing::error!(%error, "failed to close task store");
        std::process::exit(1);
    }

    tracing::info!("server shutdown complete");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::warn!(%error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::warn!(%error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
