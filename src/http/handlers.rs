//! HTTP request handlers
//!
//! API key and camera CRUD, reload, and the stat snapshot. The live stream
//! handler lives in `media`, static assets in `assets`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::middleware::AuthContext;
use crate::error::{NvrError, Result};
use crate::state::AppState;
use crate::store::Camera;

#[derive(Debug, Serialize)]
pub struct KeyResponse {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteKeyRequest {
    pub key: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCameraRequest {
    /// Opaque connection descriptor, e.g. an RTSP URL.
    pub source: String,
    #[serde(default)]
    pub remark: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRemarkRequest {
    pub remark: String,
}

/// Issue a new API key.
/// POST /v1/api/keys
pub async fn create_api_key(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<KeyResponse>)> {
    let key = state.keys.issue()?;
    tracing::info!("issued new API key");
    Ok((StatusCode::CREATED, Json(KeyResponse { key })))
}

/// Revoke an API key. The body selects the key; without a body the caller's
/// own key is revoked.
/// DELETE /v1/api/keys
pub async fn delete_api_key(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthContext>,
    body: axum::body::Bytes,
) -> Result<StatusCode> {
    let key = if body.is_empty() {
        auth.key
    } else {
        let request: DeleteKeyRequest = serde_json::from_slice(&body)
            .map_err(|e| NvrError::BadRequest(format!("bad revocation body: {e}")))?;
        request.key
    };
    state.keys.revoke(&key)?;
    tracing::info!("revoked API key");
    Ok(StatusCode::NO_CONTENT)
}

/// Register a camera.
/// POST /v1/api/cameras
pub async fn create_camera(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateCameraRequest>,
) -> Result<(StatusCode, Json<Camera>)> {
    if request.source.trim().is_empty() {
        return Err(NvrError::BadRequest("camera source must not be empty".into()));
    }
    let camera = state.cameras.create(request.source, request.remark)?;
    tracing::info!("registered camera {}", camera.id);
    Ok((StatusCode::CREATED, Json(camera)))
}

/// List registered cameras in registration order.
/// GET /v1/api/cameras
pub async fn list_cameras(State(state): State<Arc<AppState>>) -> Json<Vec<Camera>> {
    Json(state.cameras.list())
}

/// Deregister a camera, stopping any active capture session first.
/// DELETE /v1/api/cameras/{camera_id}
pub async fn delete_camera(
    State(state): State<Arc<AppState>>,
    Path(camera_id): Path<String>,
) -> Result<StatusCode> {
    state.recorder.stop(&camera_id);
    state.cameras.delete(&camera_id)?;
    tracing::info!("deregistered camera {}", camera_id);
    Ok(StatusCode::NO_CONTENT)
}

/// Update a camera's remark; the identifier never changes.
/// PATCH /v1/api/cameras/{camera_id}/remark
pub async fn update_camera_remark(
    State(state): State<Arc<AppState>>,
    Path(camera_id): Path<String>,
    Json(request): Json<UpdateRemarkRequest>,
) -> Result<Json<Camera>> {
    let camera = state.cameras.update_remark(&camera_id, request.remark)?;
    Ok(Json(camera))
}

/// Re-read persisted cameras and reconcile recorder sessions, synchronously.
/// POST /v1/api/cameras/reload
pub async fn reload_cameras(State(state): State<Arc<AppState>>) -> Result<Json<serde_json::Value>> {
    let count = state.reload_and_reconcile()?;
    Ok(Json(serde_json::json!({
        "status": "ok",
        "cameras": count,
    })))
}

/// Runtime statistics snapshot.
/// GET /v1/api/stat
pub async fn stat(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let sessions = state.recorder.subscriber_counts();
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "pid": std::process::id(),
        "uptime_secs": state.uptime_secs(),
        "store": state.config.store.display().to_string(),
        "cameras": state.cameras.len(),
        "api_keys": state.keys.len(),
        "sessions": sessions
            .iter()
            .map(|(id, viewers)| {
                serde_json::json!({ "camera_id": id, "viewers": viewers })
            })
            .collect::<Vec<_>>(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_camera_request_remark_optional() {
        let request: CreateCameraRequest =
            serde_json::from_str(r#"{"source": "rtsp://10.0.0.5/s1"}"#).unwrap();
        assert_eq!(request.source, "rtsp://10.0.0.5/s1");
        assert_eq!(request.remark, "");
    }

    #[test]
    fn test_key_response_shape() {
        let raw = serde_json::to_value(KeyResponse { key: "abc".into() }).unwrap();
        assert_eq!(raw, serde_json::json!({"key": "abc"}));
    }
}
