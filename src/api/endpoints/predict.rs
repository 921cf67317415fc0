//! `POST /predict`: classify an uploaded digit image.
//!
//! Expects `multipart/form-data` with a file part named `file`. The image
//! is classified on the blocking pool; decoding and resampling are CPU
//! bound and must not stall the runtime.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::pipeline::Prediction;

/// Multipart part carrying the image.
pub const FILE_FIELD: &str = "file";

pub async fn predict(
    State(ctx): State<ApiContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Prediction>, ApiError> {
    // A non-multipart request carries no file at all
    let mut multipart = multipart.map_err(|_| ApiError::NoFile)?;
    let bytes = read_file_part(&mut multipart, ctx.max_upload_bytes).await?;

    let core = ctx.core.clone();
    let prediction = tokio::task::spawn_blocking(move || core.classify(&bytes))
        .await
        .map_err(|e| ApiError::Internal(format!("Classification task failed: {e}")))??;

    Ok(Json(prediction))
}

/// Return the contents of the first `file` part that names a file.
/// Other parts are skipped.
async fn read_file_part(multipart: &mut Multipart, limit: usize) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let is_file = field.name() == Some(FILE_FIELD)
            && field.file_name().is_some_and(|name| !name.is_empty());
        if !is_file {
            continue;
        }

        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        if bytes.len() > limit {
            return Err(ApiError::PayloadTooLarge { limit });
        }
        tracing::debug!(size = bytes.len(), "Received upload");
        return Ok(bytes.to_vec());
    }
    Err(ApiError::NoFile)
}

fn multipart_error(err: MultipartError, limit: usize) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge { limit }
    } else {
        ApiError::BadRequest(err.body_text())
    }
}
