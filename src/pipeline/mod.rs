//! Digit normalization and classification pipeline.
//!
//! bytes → grayscale → polarity → binary mask → crop → 20x20 → 28x28
//! → flat vector → scaled → reduced → label.
//!
//! Every stage is a pure function of its input. Errors fail fast and carry
//! the stage that raised them.

pub mod features;
pub mod geometry;
pub mod preprocess;
pub mod types;

pub use features::*;
pub use geometry::*;
pub use preprocess::*;
pub use types::*;

use serde::Serialize;
use thiserror::Error;

use crate::model::DimensionMismatch;

/// Pipeline stage that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Decode,
    Binarize,
    Crop,
    Features,
    FactLookup,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Decode => "decode",
            Stage::Binarize => "binarize",
            Stage::Crop => "crop",
            Stage::Features => "features",
            Stage::FactLookup => "fact_lookup",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifyError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Image has uniform intensity {value}; no threshold separates stroke from background")]
    DegenerateImage { value: u8 },

    #[error("No digit detected: binarized image has no foreground pixels")]
    EmptyForeground,

    #[error("Feature vector has {actual} dimensions, transform expects {expected}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Transformed feature {index} is not finite")]
    NonFiniteFeature { index: usize },

    #[error("Label {0} has no entry in the fact table")]
    UnknownLabel(u8),
}

impl ClassifyError {
    pub fn stage(&self) -> Stage {
        match self {
            ClassifyError::Decode(_) => Stage::Decode,
            ClassifyError::DegenerateImage { .. } => Stage::Binarize,
            ClassifyError::EmptyForeground => Stage::Crop,
            ClassifyError::ShapeMismatch { .. } => Stage::Features,
            ClassifyError::NonFiniteFeature { .. } => Stage::Features,
            ClassifyError::UnknownLabel(_) => Stage::FactLookup,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ClassifyError::Decode(_) => "DECODE_ERROR",
            ClassifyError::DegenerateImage { .. } => "DEGENERATE_IMAGE",
            ClassifyError::EmptyForeground => "EMPTY_FOREGROUND",
            ClassifyError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            ClassifyError::NonFiniteFeature { .. } => "NON_FINITE_FEATURE",
            ClassifyError::UnknownLabel(_) => "UNKNOWN_LABEL",
        }
    }

    /// True when the failure points at the loaded model/fact configuration
    /// rather than at the uploaded image.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ClassifyError::ShapeMismatch { .. }
                | ClassifyError::NonFiniteFeature { .. }
                | ClassifyError::UnknownLabel(_)
        )
    }
}

impl From<DimensionMismatch> for ClassifyError {
    fn from(err: DimensionMismatch) -> Self {
        ClassifyError::ShapeMismatch {
            expected: err.expected,
            actual: err.actual,
        }
    }
}
