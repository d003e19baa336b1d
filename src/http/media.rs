//! Live stream handler
//!
//! Streams a camera's MPEG-TS bytes to the client as they arrive. The
//! broadcast receiver backing the body is dropped with it when the client
//! disconnects, so the viewer count falls without any bookkeeping here.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::error::{NvrError, Result};
use crate::state::AppState;

/// Continuous MPEG-TS stream for one camera.
/// GET /media/{camera_id}/live.ts
pub async fn live_ts(
    State(state): State<Arc<AppState>>,
    Path(camera_id): Path<String>,
) -> Result<Response> {
    let camera = state
        .cameras
        .get(&camera_id)
        .ok_or_else(|| NvrError::CameraNotFound(camera_id.clone()))?;

    let rx = state.recorder.ensure_session(&camera)?;
    tracing::debug!("live viewer attached to camera {}", camera_id);

    let stream = futures_util::stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(chunk) => return Some((Ok::<Bytes, Infallible>(chunk), rx)),
                // A slow viewer skips ahead rather than stalling the session.
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("live viewer lagged, skipped {} chunks", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, HeaderValue::from_static("video/mp2t"))
        .body(Body::from_stream(stream))
        .map_err(|e| NvrError::Recorder(format!("building stream response: {e}")))
}
