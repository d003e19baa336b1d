//! Axum router configuration

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

use super::{assets, handlers, media, middleware};

/// Create the router with all routes and middleware.
///
/// Layer order matters: trace wraps cross-origin wraps authentication wraps
/// the router, so OPTIONS short-circuits before authentication and every
/// response, including 401s, carries the cross-origin headers.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/media/{camera_id}/live.ts", get(media::live_ts))
        .route(
            "/v1/api/keys",
            post(handlers::create_api_key).delete(handlers::delete_api_key),
        )
        .route(
            "/v1/api/cameras",
            post(handlers::create_camera).get(handlers::list_cameras),
        )
        .route("/v1/api/cameras/reload", post(handlers::reload_cameras))
        .route("/v1/api/cameras/{camera_id}", delete(handlers::delete_camera))
        .route(
            "/v1/api/cameras/{camera_id}/remark",
            patch(handlers::update_camera_remark),
        )
        .route("/v1/api/stat", get(handlers::stat))
        // Anything else is the bundled SPA, except under the API and media
        // prefixes where unmatched verb+path combinations 404.
        .fallback(assets::serve)
        .method_not_allowed_fallback(assets::serve)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_api_key,
        ))
        .layer(axum_middleware::from_fn(middleware::cors))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
