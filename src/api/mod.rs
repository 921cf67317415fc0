//! HTTP surface for the classifier.
//!
//! A single `POST /predict` route takes a multipart upload and answers
//! with the predicted digit and its fact. `GET /health` reports liveness.
//! The router is composable; `predict_router()` can be mounted on any axum
//! server instance.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::predict_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
