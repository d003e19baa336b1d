//! Recorder session management
//!
//! One session per camera drives an external `ffmpeg` process that pulls the
//! camera's source and remuxes it to MPEG-TS on stdout. The session fans the
//! byte stream out over a broadcast channel so any number of live viewers can
//! attach without touching the capture process.

use bytes::Bytes;
use dashmap::DashMap;
use std::collections::HashSet;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::{NvrError, Result};
use crate::store::Camera;

/// Read size for the capture pipe.
const CHUNK_SIZE: usize = 32 * 1024;

/// Broadcast backlog per session, in chunks. Slow viewers skip ahead.
const CHANNEL_CAPACITY: usize = 64;

struct Session {
    tx: broadcast::Sender<Bytes>,
    pump: JoinHandle<()>,
}

impl Drop for Session {
    fn drop(&mut self) {
        // Aborting the pump drops the child handle, which kills the process.
        self.pump.abort();
    }
}

/// Manages active capture sessions, keyed by camera id.
#[derive(Clone)]
pub struct Recorder {
    sessions: Arc<DashMap<String, Session>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// Subscribe to a camera's live byte stream, starting a session if none
    /// is running.
    pub fn ensure_session(&self, camera: &Camera) -> Result<broadcast::Receiver<Bytes>> {
        if let Some(session) = self.sessions.get(&camera.id) {
            return Ok(session.tx.subscribe());
        }
        self.start(camera)?;
        self.sessions
            .get(&camera.id)
            .map(|s| s.tx.subscribe())
            .ok_or_else(|| NvrError::Recorder(format!("session for {} exited at once", camera.id)))
    }

    /// Start a capture session for a camera. No-op if one is already running.
    pub fn start(&self, camera: &Camera) -> Result<()> {
        if self.sessions.contains_key(&camera.id) {
            return Ok(());
        }

        let mut child = Command::new("ffmpeg")
            .args([
                "-nostdin",
                "-loglevel",
                "error",
                "-i",
                &camera.source,
                "-c",
                "copy",
                "-f",
                "mpegts",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NvrError::Recorder(format!("spawn capture for {}: {}", camera.id, e)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| NvrError::Recorder("capture process has no stdout".into()))?;

        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        let pump_tx = tx.clone();
        let camera_id = camera.id.clone();
        let sessions = self.sessions.clone();

        let pump = tokio::spawn(async move {
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => {
                        tracing::info!("capture for camera {} ended", camera_id);
                        break;
                    }
                    Ok(n) => {
                        // No receivers is fine; the stream keeps flowing so a
                        // viewer can attach mid-session.
                        let _ = pump_tx.send(Bytes::copy_from_slice(&buf[..n]));
                    }
                    Err(e) => {
                        tracing::warn!("capture read for camera {} failed: {}", camera_id, e);
                        break;
                    }
                }
            }
            let _ = child.kill().await;
            sessions.remove(&camera_id);
        });

        tracing::info!("started capture session for camera {}", camera.id);
        self.sessions.insert(camera.id.clone(), Session { tx, pump });
        Ok(())
    }

    /// Stop a camera's session, if any. Dropping the session kills the
    /// capture process and disconnects all viewers.
    pub fn stop(&self, camera_id: &str) {
        if self.sessions.remove(camera_id).is_some() {
            tracing::info!("stopped capture session for camera {}", camera_id);
        }
    }

    /// Align active sessions to the given camera set: start sessions for
    /// cameras lacking one, stop sessions whose camera is gone. Idempotent;
    /// running it twice with no configuration change does nothing the second
    /// time.
    pub fn reconcile(&self, cameras: &[Camera]) {
        let current: HashSet<String> = self.sessions.iter().map(|s| s.key().clone()).collect();
        let (to_start, to_stop) = plan(&current, cameras);

        for camera_id in to_stop {
            self.stop(&camera_id);
        }
        for camera in to_start {
            if let Err(e) = self.start(camera) {
                tracing::warn!("reconcile could not start camera {}: {}", camera.id, e);
            }
        }
    }

    /// Ids of currently active sessions.
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.iter().map(|s| s.key().clone()).collect();
        ids.sort();
        ids
    }

    /// (camera id, live viewer count) per active session.
    pub fn subscriber_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .sessions
            .iter()
            .map(|s| (s.key().clone(), s.tx.receiver_count()))
            .collect();
        counts.sort();
        counts
    }
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

/// Compute the session changes needed to match `desired`: cameras to start
/// and session ids to stop. Pure over the id sets.
fn plan<'a>(current: &HashSet<String>, desired: &'a [Camera]) -> (Vec<&'a Camera>, Vec<String>) {
    let desired_ids: HashSet<&str> = desired.iter().map(|c| c.id.as_str()).collect();
    let to_start: Vec<&Camera> = desired
        .iter()
        .filter(|c| !current.contains(&c.id))
        .collect();
    let mut to_stop: Vec<String> = current
        .iter()
        .filter(|id| !desired_ids.contains(id.as_str()))
        .cloned()
        .collect();
    to_stop.sort();
    (to_start, to_stop)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn camera(id: &str) -> Camera {
        Camera {
            id: id.to_string(),
            source: format!("rtsp://example/{id}"),
            remark: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_starts_missing_sessions() {
        let current = HashSet::new();
        let desired = vec![camera("a"), camera("b")];
        let (to_start, to_stop) = plan(&current, &desired);
        assert_eq!(to_start.len(), 2);
        assert!(to_stop.is_empty());
    }

    #[test]
    fn test_plan_stops_removed_sessions() {
        let current: HashSet<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let desired = vec![camera("b")];
        let (to_start, to_stop) = plan(&current, &desired);
        assert!(to_start.is_empty());
        assert_eq!(to_stop, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_plan_is_idempotent_when_aligned() {
        let current: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();
        let desired = vec![camera("a"), camera("b")];
        let (to_start, to_stop) = plan(&current, &desired);
        assert!(to_start.is_empty());
        assert!(to_stop.is_empty());
    }

    #[tokio::test]
    async fn test_stop_unknown_session_is_noop() {
        let recorder = Recorder::new();
        recorder.stop("nope");
        assert!(recorder.session_ids().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_empty_is_noop() {
        let recorder = Recorder::new();
        recorder.reconcile(&[]);
        recorder.reconcile(&[]);
        assert!(recorder.session_ids().is_empty());
        assert!(recorder.subscriber_counts().is_empty());
    }
}
