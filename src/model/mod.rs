//! Pre-fit statistical transforms consumed by the feature pipeline.
//!
//! The pipeline only sees the `Transform` and `Classifier` capabilities.
//! Concrete implementations deserialize parameters learned offline and are
//! never refitted here.

pub mod linear;
pub mod pca;
pub mod scaler;

pub use linear::LinearClassifier;
pub use pca::Pca;
pub use scaler::StandardScaler;

use thiserror::Error;

/// Input vector length differs from what a transform was fitted on.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("expected {expected} input dimensions, got {actual}")]
pub struct DimensionMismatch {
    pub expected: usize,
    pub actual: usize,
}

pub fn check_dim(expected: usize, actual: usize) -> Result<(), DimensionMismatch> {
    if expected == actual {
        Ok(())
    } else {
        Err(DimensionMismatch { expected, actual })
    }
}

/// Vector → vector transform with fixed input and output dimensionality.
pub trait Transform: Send + Sync {
    fn input_dim(&self) -> usize;

    fn output_dim(&self) -> usize;

    /// Apply the transform. Fails only when `x.len() != self.input_dim()`.
    fn transform(&self, x: &[f32]) -> Result<Vec<f32>, DimensionMismatch>;
}

/// Vector → label classifier with a fixed, enumerable label space.
pub trait Classifier: Send + Sync {
    fn input_dim(&self) -> usize;

    /// Every label `predict` can return.
    fn labels(&self) -> &[u8];

    fn predict(&self, x: &[f32]) -> Result<u8, DimensionMismatch>;
}
