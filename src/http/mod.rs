//! HTTP gateway module
//!
//! Request routing and handling:
//! - Axum router for the key/camera API and the live media path
//! - Cross-origin and bearer-key authentication middleware
//! - Live MPEG-TS streaming
//! - Embedded SPA assets with entry-document fallback

pub mod assets;
pub mod handlers;
pub mod media;
pub mod middleware;
pub mod routes;

pub use routes::create_router;
