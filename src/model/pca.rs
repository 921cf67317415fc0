//! Linear projection onto pre-fit principal components.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{check_dim, DimensionMismatch, Transform};
use crate::artifact::{check_finite, check_matrix, load_json, ArtifactError};

const ARTIFACT: &str = "pca";

/// Fitted PCA parameters.
///
/// `transform(x)_j = Σ_i (x_i - mean_i) * components[j][i]`, optionally
/// divided by `sqrt(explained_variance[j])` when whitening.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pca {
    mean: Vec<f32>,
    components: Vec<Vec<f32>>,
    #[serde(default)]
    explained_variance: Option<Vec<f32>>,
    #[serde(default)]
    whiten: bool,
}

impl Pca {
    pub fn new(mean: Vec<f32>, components: Vec<Vec<f32>>) -> Result<Self, ArtifactError> {
        let pca = Self {
            mean,
            components,
            explained_variance: None,
            whiten: false,
        };
        pca.validate()?;
        Ok(pca)
    }

    /// Enable whitening with the per-component variances.
    pub fn whitened(mut self, explained_variance: Vec<f32>) -> Result<Self, ArtifactError> {
        self.explained_variance = Some(explained_variance);
        self.whiten = true;
        self.validate()?;
        Ok(self)
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let pca: Self = load_json(path)?;
        pca.validate()?;
        Ok(pca)
    }

    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        let width = check_matrix(ARTIFACT, "components", &self.components)?;
        if width != self.mean.len() {
            return Err(ArtifactError::invalid(
                ARTIFACT,
                format!(
                    "components have {width} columns but mean has {} values",
                    self.mean.len()
                ),
            ));
        }
        check_finite(ARTIFACT, "mean", &self.mean)?;

        if self.whiten {
            let variance = self.explained_variance.as_deref().ok_or_else(|| {
                ArtifactError::invalid(ARTIFACT, "whiten requires explained_variance")
            })?;
            if variance.len() != self.components.len() {
                return Err(ArtifactError::invalid(
                    ARTIFACT,
                    format!(
                        "explained_variance has {} values for {} components",
                        variance.len(),
                        self.components.len()
                    ),
                ));
            }
            if let Some(j) = variance.iter().position(|v| !(v.is_finite() && *v > 0.0)) {
                return Err(ArtifactError::invalid(
                    ARTIFACT,
                    format!("explained_variance[{j}] must be positive"),
                ));
            }
        }
        Ok(())
    }
}

impl Transform for Pca {
    fn input_dim(&self) -> usize {
        self.mean.len()
    }

    fn output_dim(&self) -> usize {
        self.components.len()
    }

    fn transform(&self, x: &[f32]) -> Result<Vec<f32>, DimensionMismatch> {
        check_dim(self.mean.len(), x.len())?;

        let centered: Vec<f32> = x.iter().zip(&self.mean).map(|(v, m)| v - m).collect();
        let mut projected: Vec<f32> = self
            .components
            .iter()
            .map(|component| component.iter().zip(&centered).map(|(c, v)| c * v).sum())
            .collect();

        if self.whiten {
            if let Some(variance) = &self.explained_variance {
                for (p, var) in projected.iter_mut().zip(variance) {
                    *p /= var.sqrt();
                }
            }
        }
        Ok(projected)
    }
}
