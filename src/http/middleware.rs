//! Gateway middleware
//!
//! Two layers wrap every request: permissive cross-origin headers on the
//! outside, bearer-key authentication on the inside. The contracts here are
//! stricter than tower-http's CorsLayer offers (any OPTIONS request must
//! short-circuit with an empty body before authentication or routing run),
//! so both are hand middleware.

use axum::{
    extract::{Request, State},
    http::{header::HeaderValue, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::NvrError;
use crate::state::AppState;

/// Authentication context attached to authenticated requests, extractable by
/// handlers via `Extension<AuthContext>`.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The bearer key the request presented.
    pub key: String,
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        "Access-Control-Allow-Origin",
        HeaderValue::from_static("*"),
    );
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, PUT, DELETE, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type, Authorization"),
    );
}

/// Cross-origin middleware. Every response, success or error, carries the
/// permissive header set; OPTIONS requests are answered immediately and never
/// reach the rest of the chain.
pub async fn cors(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::OK.into_response();
        apply_cors_headers(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}

/// Paths that require a valid API key. Everything else is the bundled SPA.
fn is_protected(path: &str) -> bool {
    path.starts_with("/v1/api") || path.starts_with("/media")
}

/// Bearer-key authentication middleware.
///
/// Exemptions: unprotected paths pass through, and `POST /v1/api/keys` is
/// allowed without a credential only while no key exists yet, so the very
/// first credential can be bootstrapped. Everything else presents
/// `Authorization: Bearer <key>` or gets 401 before any handler runs.
pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, NvrError> {
    let path = request.uri().path();
    if !is_protected(path) {
        return Ok(next.run(request).await);
    }

    if request.method() == Method::POST && path == "/v1/api/keys" && state.keys.is_empty() {
        tracing::info!("bootstrap: issuing first API key without credential");
        return Ok(next.run(request).await);
    }

    let key = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(NvrError::InvalidApiKey)?;

    if !state.keys.exists(key) {
        return Err(NvrError::InvalidApiKey);
    }

    let context = AuthContext {
        key: key.to_string(),
    };
    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}
