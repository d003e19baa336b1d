//! NVR Gateway Daemon
//!
//! Control-plane HTTP gateway in front of a network video recorder: bearer
//! API-key authentication, camera CRUD, a live MPEG-TS stream per camera,
//! and SIGHUP-triggered reconciliation of recorder sessions against the
//! persisted camera configuration.

mod config;
mod error;
mod http;
mod recorder;
mod reload;
mod state;
mod store;

use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::error::{NvrError, Result};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    if config.version {
        config::print_version();
        return Ok(());
    }

    init_logging(&config);
    tracing::info!("nvrd v{} starting", env!("CARGO_PKG_VERSION"));

    init_store_root(&config);

    let listen = config.listen;
    let state = Arc::new(AppState::new(config));

    // Bring sessions in line with whatever cameras were persisted.
    state.recorder.reconcile(&state.cameras.list());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let watcher = reload::spawn(state.clone(), shutdown_rx);

    let app = http::create_router(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| NvrError::Listen {
            addr: listen.to_string(),
            source: e,
        })?;
    tracing::info!("listening on {}", listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal()?)
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = watcher.await;
    tracing::info!("shut down");
    Ok(())
}

/// Initialize logging. RUST_LOG, when set, overrides the CLI level.
fn init_logging(config: &Config) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Create the store root with restrictive permissions. A pre-existing
/// directory is fine; a creation failure is logged and the process continues
/// degraded (every store mutation will surface its own error).
fn init_store_root(config: &Config) {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    if let Err(e) = builder.create(&config.store) {
        tracing::error!("creating store root {}: {}", config.store.display(), e);
    }
}

/// Install the shutdown signal handlers up front so an installation failure
/// surfaces at startup instead of mid-serve.
fn shutdown_signal() -> Result<impl std::future::Future<Output = ()>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        Ok(async move {
            tokio::select! {
                _ = interrupt.recv() => {},
                _ = terminate.recv() => {},
            }
        })
    }
    #[cfg(not(unix))]
    {
        Ok(async {
            let _ = tokio::signal::ctrl_c().await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_shutdown_signal_handlers_install() {
        assert!(shutdown_signal().is_ok());
    }
}
