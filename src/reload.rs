//! Reload signal watcher
//!
//! A background task, alive for the process lifetime, that re-reads camera
//! configuration and reconciles recorder sessions whenever the operator sends
//! SIGHUP. It only ever calls into the collaborators; in-flight HTTP requests
//! are untouched.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::state::AppState;

/// Spawn the watcher. It exits cleanly when `shutdown` flips to true.
pub fn spawn(state: Arc<AppState>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            let mut hangup = match tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::hangup(),
            ) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!("failed to install SIGHUP handler: {}", e);
                    let _ = shutdown.changed().await;
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = hangup.recv() => {
                        tracing::info!("SIGHUP received, reloading cameras");
                        match state.reload_and_reconcile() {
                            Ok(count) => {
                                tracing::info!("reload complete, {} cameras", count)
                            }
                            Err(e) => tracing::error!("reload failed: {}", e),
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::debug!("reload watcher shutting down");
                        return;
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = state;
            let _ = shutdown.changed().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_watcher_stops_on_shutdown() {
        let (_dir, state) = crate::state::tests::test_state();
        let (tx, rx) = watch::channel(false);

        let handle = spawn(state, rx);
        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
