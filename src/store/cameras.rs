//! Camera store
//!
//! Each registered camera is persisted as one JSON document under
//! `<store>/cameras/<id>.json`. The in-memory index is a DashMap so request
//! handlers and the reload path can touch it concurrently.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::{NvrError, Result};

/// A registered camera.
///
/// `id` is assigned at registration and never changes; `source` is an opaque
/// connection descriptor (typically an RTSP URL) the recorder hands to its
/// capture process; `remark` is the only mutable field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    pub id: String,
    pub source: String,
    #[serde(default)]
    pub remark: String,
    pub created_at: DateTime<Utc>,
}

/// File-backed camera store.
#[derive(Debug)]
pub struct CameraStore {
    dir: PathBuf,
    cameras: DashMap<String, Camera>,
}

impl CameraStore {
    /// Open the store, creating the directory if needed and indexing any
    /// persisted camera documents. Directory trouble at open time is logged
    /// rather than fatal; individual operations surface their own errors.
    pub fn open(dir: PathBuf) -> Self {
        if let Err(e) = fs::create_dir_all(&dir) {
            tracing::error!("creating camera store {}: {}", dir.display(), e);
        }
        let store = Self {
            dir,
            cameras: DashMap::new(),
        };
        if let Err(e) = store.reload() {
            tracing::error!("initial camera load: {}", e);
        }
        store
    }

    /// Register a new camera and persist it.
    pub fn create(&self, source: String, remark: String) -> Result<Camera> {
        let camera = Camera {
            id: Uuid::new_v4().to_string(),
            source,
            remark,
            created_at: Utc::now(),
        };
        self.persist(&camera)?;
        self.cameras.insert(camera.id.clone(), camera.clone());
        Ok(camera)
    }

    /// All cameras, ordered by registration time then id.
    pub fn list(&self) -> Vec<Camera> {
        let mut cameras: Vec<Camera> = self.cameras.iter().map(|r| r.value().clone()).collect();
        cameras.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        cameras
    }

    /// Look up a camera by id.
    pub fn get(&self, id: &str) -> Option<Camera> {
        self.cameras.get(id).map(|r| r.value().clone())
    }

    /// Deregister a camera and remove its document.
    pub fn delete(&self, id: &str) -> Result<()> {
        if self.cameras.remove(id).is_none() {
            return Err(NvrError::CameraNotFound(id.to_string()));
        }
        match fs::remove_file(self.doc_path(id)) {
            Ok(()) => Ok(()),
            // Index and disk can drift if a file was removed out-of-band.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Update a camera's remark, leaving every other field untouched.
    /// The index only changes once the document is persisted, so a failed
    /// write leaves memory and disk agreeing on the old remark.
    pub fn update_remark(&self, id: &str, remark: String) -> Result<Camera> {
        let mut updated = self
            .cameras
            .get(id)
            .map(|r| r.value().clone())
            .ok_or_else(|| NvrError::CameraNotFound(id.to_string()))?;
        updated.remark = remark;
        self.persist(&updated)?;
        self.cameras.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    /// Re-read persisted camera documents, replacing the in-memory index.
    /// Documents that fail to parse are skipped with a warning.
    pub fn reload(&self) -> Result<()> {
        let mut loaded = Vec::new();
        for dirent in fs::read_dir(&self.dir)? {
            let path = dirent?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let raw = fs::read_to_string(&path)?;
            match serde_json::from_str::<Camera>(&raw) {
                Ok(camera) => loaded.push(camera),
                Err(e) => {
                    tracing::warn!("skipping camera document {}: {}", path.display(), e);
                }
            }
        }
        self.cameras.clear();
        for camera in loaded {
            self.cameras.insert(camera.id.clone(), camera);
        }
        tracing::debug!("camera store reloaded, {} cameras", self.cameras.len());
        Ok(())
    }

    /// Number of registered cameras.
    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    fn doc_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn persist(&self, camera: &Camera) -> Result<()> {
        let raw = serde_json::to_string_pretty(camera)?;
        fs::write(self.doc_path(&camera.id), raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, CameraStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CameraStore::open(dir.path().join("cameras"));
        (dir, store)
    }

    #[test]
    fn test_create_and_get() {
        let (_dir, store) = temp_store();
        let camera = store
            .create("rtsp://10.0.0.5/stream1".into(), "front door".into())
            .unwrap();
        let found = store.get(&camera.id).unwrap();
        assert_eq!(found.source, "rtsp://10.0.0.5/stream1");
        assert_eq!(found.remark, "front door");
    }

    #[test]
    fn test_list_ordered_by_creation() {
        let (_dir, store) = temp_store();
        let a = store.create("rtsp://a".into(), String::new()).unwrap();
        let b = store.create("rtsp://b".into(), String::new()).unwrap();
        let c = store.create("rtsp://c".into(), String::new()).unwrap();

        let ids: Vec<String> = store.list().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn test_update_remark_keeps_id() {
        let (_dir, store) = temp_store();
        let camera = store.create("rtsp://a".into(), "old".into()).unwrap();

        let updated = store.update_remark(&camera.id, "new".into()).unwrap();
        assert_eq!(updated.id, camera.id);
        assert_eq!(updated.source, camera.source);
        assert_eq!(updated.remark, "new");

        // Persisted copy matches.
        let reloaded = CameraStore::open(store.dir.clone());
        assert_eq!(reloaded.get(&camera.id).unwrap().remark, "new");
    }

    #[test]
    fn test_update_remark_failed_persist_leaves_memory_unchanged() {
        let (_dir, store) = temp_store();
        let camera = store.create("rtsp://a".into(), "old".into()).unwrap();

        // Removing the store directory makes the next document write fail.
        fs::remove_dir_all(&store.dir).unwrap();
        assert!(store.update_remark(&camera.id, "new".into()).is_err());
        assert_eq!(store.get(&camera.id).unwrap().remark, "old");
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = temp_store();
        let camera = store.create("rtsp://a".into(), String::new()).unwrap();
        store.delete(&camera.id).unwrap();
        assert!(store.get(&camera.id).is_none());
        assert!(matches!(
            store.delete(&camera.id),
            Err(NvrError::CameraNotFound(_))
        ));
    }

    #[test]
    fn test_reload_drops_removed_documents() {
        let (_dir, store) = temp_store();
        let keep = store.create("rtsp://keep".into(), String::new()).unwrap();
        let gone = store.create("rtsp://gone".into(), String::new()).unwrap();

        fs::remove_file(store.doc_path(&gone.id)).unwrap();
        store.reload().unwrap();

        assert!(store.get(&keep.id).is_some());
        assert!(store.get(&gone.id).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reload_is_idempotent() {
        let (_dir, store) = temp_store();
        store.create("rtsp://a".into(), String::new()).unwrap();
        store.create("rtsp://b".into(), String::new()).unwrap();

        store.reload().unwrap();
        let first: Vec<String> = store.list().into_iter().map(|c| c.id).collect();
        store.reload().unwrap();
        let second: Vec<String> = store.list().into_iter().map(|c| c.id).collect();
        assert_eq!(first, second);
    }
}
