//! HTTP router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//!
//! Layer stack (outermost → innermost):
//! 1. Permissive CORS → 2. Body limit → Handler

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::core_state::CoreState;

/// Room for multipart boundaries and part headers on top of the image.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the classifier router.
///
/// `max_upload_bytes` caps the image part; the request body as a whole is
/// allowed a little more for multipart framing.
pub fn predict_router(core: Arc<CoreState>, max_upload_bytes: usize) -> Router {
    let ctx = ApiContext::new(core, max_upload_bytes);

    Router::new()
        .route("/predict", post(endpoints::predict::predict))
        .route("/health", get(endpoints::health::check))
        .with_state(ctx)
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD),
        ))
        .layer(CorsLayer::permissive())
}
