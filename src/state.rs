//! Application state
//!
//! One immutable configuration plus the three collaborators: camera store,
//! API key store, recorder. Built once in main and shared via Arc; no other
//! shared mutable state exists at this layer.

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::error::Result;
use crate::recorder::Recorder;
use crate::store::{ApiKeyStore, CameraStore};

pub struct AppState {
    pub config: Config,
    pub cameras: CameraStore,
    pub keys: ApiKeyStore,
    pub recorder: Recorder,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let cameras = CameraStore::open(config.cameras_dir());
        let keys = ApiKeyStore::open(config.keys_file());
        Self {
            config,
            cameras,
            keys,
            recorder: Recorder::new(),
            started_at: Utc::now(),
        }
    }

    /// Re-read persisted camera configuration and align recorder sessions to
    /// it. Shared by the reload endpoint and the signal watcher; both callers
    /// see the same idempotent behavior.
    pub fn reload_and_reconcile(&self) -> Result<usize> {
        self.cameras.reload()?;
        let cameras = self.cameras.list();
        self.recorder.reconcile(&cameras);
        Ok(cameras.len())
    }

    /// Seconds since process start.
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use clap::Parser;
    use std::sync::Arc;

    pub(crate) fn test_state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::try_parse_from([
            "nvrd",
            "--store",
            dir.path().to_str().unwrap(),
            "--listen",
            "127.0.0.1:0",
        ])
        .unwrap();
        let state = Arc::new(AppState::new(config));
        (dir, state)
    }

    #[tokio::test]
    async fn test_reload_and_reconcile_idempotent() {
        let (_dir, state) = test_state();
        state
            .cameras
            .create("rtsp://example/cam".into(), String::new())
            .unwrap();

        let first = state.reload_and_reconcile().unwrap();
        let list_first: Vec<String> = state.cameras.list().into_iter().map(|c| c.id).collect();
        let second = state.reload_and_reconcile().unwrap();
        let list_second: Vec<String> = state.cameras.list().into_iter().map(|c| c.id).collect();

        assert_eq!(first, second);
        assert_eq!(list_first, list_second);
    }
}
