//! Embedded static assets
//!
//! The bundled single-page application is compiled into the binary. The set
//! is immutable for the process lifetime, so look-up-then-serve carries no
//! race. Misses serve the entry document so client-side routes resolve.

use axum::{
    http::{header, HeaderValue, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

const INDEX_HTML: &str = include_str!("../../ui/index.html");
const APP_JS: &str = include_str!("../../ui/app.js");
const STYLE_CSS: &str = include_str!("../../ui/style.css");

/// Exact-path lookup into the embedded set.
fn lookup(path: &str) -> Option<(&'static str, &'static str)> {
    match path {
        "/" | "/index.html" => Some((INDEX_HTML, "text/html; charset=utf-8")),
        "/app.js" => Some((APP_JS, "text/javascript; charset=utf-8")),
        "/style.css" => Some((STYLE_CSS, "text/css; charset=utf-8")),
        _ => None,
    }
}

/// Router fallback: static asset, SPA entry document, or a JSON 404 for
/// anything under the API and media prefixes, which are never eligible for
/// the SPA fallback.
pub async fn serve(method: Method, uri: Uri) -> Response {
    let path = uri.path();

    if path.starts_with("/v1/api") || path.starts_with("/media") {
        return not_found(path);
    }
    if method != Method::GET {
        return not_found(path);
    }

    let (body, content_type) = lookup(path).unwrap_or((INDEX_HTML, "text/html; charset=utf-8"));
    (
        [(header::CONTENT_TYPE, HeaderValue::from_static(content_type))],
        body,
    )
        .into_response()
}

fn not_found(path: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": {
                "code": "not_found",
                "message": format!("no route for {path}"),
            }
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_assets() {
        assert_eq!(lookup("/").unwrap().0, INDEX_HTML);
        assert_eq!(lookup("/index.html").unwrap().0, INDEX_HTML);
        assert_eq!(lookup("/app.js").unwrap().1, "text/javascript; charset=utf-8");
        assert_eq!(lookup("/style.css").unwrap().1, "text/css; charset=utf-8");
    }

    #[test]
    fn test_lookup_miss() {
        assert!(lookup("/cameras/42").is_none());
        assert!(lookup("/favicon.ico").is_none());
    }

    #[test]
    fn test_entry_document_is_html() {
        assert!(INDEX_HTML.contains("<!DOCTYPE html>"));
    }
}
