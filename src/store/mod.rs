//! Persistent collaborators
//!
//! File-backed stores for camera registrations and API keys. The gateway
//! only guarantees the store root exists; document layout belongs here.

pub mod cameras;
pub mod keys;

pub use cameras::{Camera, CameraStore};
pub use keys::ApiKeyStore;
