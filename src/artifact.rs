//! JSON artifact loading shared by the model transforms and the fact table.
//!
//! Artifacts are read once at startup. Every failure here aborts startup,
//! so errors carry the offending path.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Cannot read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed artifact {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid {artifact}: {reason}")]
    Invalid {
        artifact: &'static str,
        reason: String,
    },
}

impl ArtifactError {
    pub(crate) fn invalid(artifact: &'static str, reason: impl Into<String>) -> Self {
        ArtifactError::Invalid {
            artifact,
            reason: reason.into(),
        }
    }
}

/// Read and deserialize a JSON artifact.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let raw = std::fs::read(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| ArtifactError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Reject empty, ragged or non-finite matrices. Returns the row width.
pub(crate) fn check_matrix(
    artifact: &'static str,
    name: &str,
    rows: &[Vec<f32>],
) -> Result<usize, ArtifactError> {
    let width = rows
        .first()
        .map(Vec::len)
        .ok_or_else(|| ArtifactError::invalid(artifact, format!("{name} is empty")))?;
    if width == 0 {
        return Err(ArtifactError::invalid(artifact, format!("{name} has empty rows")));
    }
    for (i, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(ArtifactError::invalid(
                artifact,
                format!("{name} row {i} has {} values, expected {width}", row.len()),
            ));
        }
        check_finite(artifact, name, row)?;
    }
    Ok(width)
}

pub(crate) fn check_finite(
    artifact: &'static str,
    name: &str,
    values: &[f32],
) -> Result<(), ArtifactError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(i) => Err(ArtifactError::invalid(
            artifact,
            format!("{name}[{i}] is not finite"),
        )),
        None => Ok(()),
    }
}
