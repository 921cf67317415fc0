//! Per-dimension standardization: `(x - mean) / scale`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{check_dim, DimensionMismatch, Transform};
use crate::artifact::{check_finite, load_json, ArtifactError};

const ARTIFACT: &str = "scaler";

/// Fitted standard scaler parameters.
///
/// `scale` is the per-feature divisor as persisted after fitting; constant
/// features are expected to carry a scale of 1, never 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f32>,
    scale: Vec<f32>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f32>, scale: Vec<f32>) -> Result<Self, ArtifactError> {
        let scaler = Self { mean, scale };
        scaler.validate()?;
        Ok(scaler)
    }

    /// Load from a JSON artifact `{"mean": [...], "scale": [...]}`.
    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let scaler: Self = load_json(path)?;
        scaler.validate()?;
        Ok(scaler)
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        if self.mean.is_empty() {
            return Err(ArtifactError::invalid(ARTIFACT, "mean is empty"));
        }
        if self.mean.len() != self.scale.len() {
            return Err(ArtifactError::invalid(
                ARTIFACT,
                format!(
                    "mean has {} values but scale has {}",
                    self.mean.len(),
                    self.scale.len()
                ),
            ));
        }
        check_finite(ARTIFACT, "mean", &self.mean)?;
        check_finite(ARTIFACT, "scale", &self.scale)?;
        if let Some(i) = self.scale.iter().position(|s| *s == 0.0) {
            return Err(ArtifactError::invalid(ARTIFACT, format!("scale[{i}] is zero")));
        }
        Ok(())
    }
}

impl Transform for StandardScaler {
    fn input_dim(&self) -> usize {
        self.mean.len()
    }

    fn output_dim(&self) -> usize {
        self.mean.len()
    }

    fn transform(&self, x: &[f32]) -> Result<Vec<f32>, DimensionMismatch> {
        check_dim(self.mean.len(), x.len())?;
        Ok(x.iter()
            .zip(&self.mean)
            .zip(&self.scale)
            .map(|((v, m), s)| (v - m) / s)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transform_standardizes_each_dimension() {
        let scaler = StandardScaler::new(vec![1.0, 10.0], vec![2.0, 5.0]).unwrap();
        let out = scaler.transform(&[3.0, 0.0]).unwrap();
        assert_eq!(out, vec![1.0, -2.0]);
    }

    #[test]
    fn transform_rejects_wrong_length() {
        let scaler = StandardScaler::new(vec![0.0; 784], vec![1.0; 784]).unwrap();
        let err = scaler.transform(&[0.0; 783]).unwrap_err();
        assert_eq!(err, DimensionMismatch { expected: 784, actual: 783 });
    }

    #[test]
    fn new_rejects_length_mismatch() {
        let err = StandardScaler::new(vec![0.0, 0.0], vec![1.0]).unwrap_err();
        assert!(err.to_string().contains("mean has 2 values"));
    }

    #[test]
    fn new_rejects_zero_scale() {
        let err = StandardScaler::new(vec![0.0, 0.0], vec![1.0, 0.0]).unwrap_err();
        assert!(err.to_string().contains("scale[1] is zero"));
    }

    #[test]
    fn new_rejects_empty() {
        assert!(StandardScaler::new(vec![], vec![]).is_err());
    }

    #[test]
    fn load_from_json_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        std::fs::write(&path, r#"{"mean": [0.5, 1.5], "scale": [0.5, 0.5]}"#).unwrap();

        let scaler = StandardScaler::load(&path).unwrap();
        assert_eq!(scaler.input_dim(), 2);
        assert_eq!(scaler.transform(&[1.0, 1.0]).unwrap(), vec![1.0, -1.0]);
    }

    #[test]
    fn load_validates_parameters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        std::fs::write(&path, r#"{"mean": [0.5], "scale": [0.0]}"#).unwrap();

        assert!(matches!(
            StandardScaler::load(&path),
            Err(ArtifactError::Invalid { artifact: "scaler", .. })
        ));
    }
}
