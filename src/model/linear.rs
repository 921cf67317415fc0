//! Linear decision-function classifier (one-vs-rest or binary).

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{check_dim, Classifier, DimensionMismatch};
use crate::artifact::{check_finite, check_matrix, load_json, ArtifactError};

const ARTIFACT: &str = "classifier";

/// Highest label a digit classifier may emit.
pub const MAX_DIGIT_LABEL: u8 = 9;

/// Fitted linear classifier.
///
/// Multi-class: one `coef` row per class, prediction is the class with the
/// largest `coef · x + intercept` (first wins on ties).
/// Binary: two classes and a single `coef` row; a positive decision value
/// selects `classes[1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearClassifier {
    classes: Vec<u8>,
    coef: Vec<Vec<f32>>,
    intercept: Vec<f32>,
}

impl LinearClassifier {
    pub fn new(
        classes: Vec<u8>,
        coef: Vec<Vec<f32>>,
        intercept: Vec<f32>,
    ) -> Result<Self, ArtifactError> {
        let model = Self {
            classes,
            coef,
            intercept,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let model: Self = load_json(path)?;
        model.validate()?;
        Ok(model)
    }

    fn is_binary(&self) -> bool {
        self.classes.len() == 2 && self.coef.len() == 1
    }

    fn decision(&self, row: usize, x: &[f32]) -> f32 {
        self.coef[row].iter().zip(x).map(|(w, v)| w * v).sum::<f32>() + self.intercept[row]
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        if self.classes.len() < 2 {
            return Err(ArtifactError::invalid(ARTIFACT, "needs at least two classes"));
        }
        if let Some(label) = self.classes.iter().find(|c| **c > MAX_DIGIT_LABEL) {
            return Err(ArtifactError::invalid(
                ARTIFACT,
                format!("class {label} is not a digit"),
            ));
        }
        let mut sorted = self.classes.clone();
        sorted.sort_unstable();
        sorted.dedup();
        if sorted.len() != self.classes.len() {
            return Err(ArtifactError::invalid(ARTIFACT, "classes contain duplicates"));
        }

        check_matrix(ARTIFACT, "coef", &self.coef)?;
        if !self.is_binary() && self.coef.len() != self.classes.len() {
            return Err(ArtifactError::invalid(
                ARTIFACT,
                format!(
                    "{} coef rows for {} classes",
                    self.coef.len(),
                    self.classes.len()
                ),
            ));
        }
        if self.intercept.len() != self.coef.len() {
            return Err(ArtifactError::invalid(
                ARTIFACT,
                format!(
                    "{} intercepts for {} coef rows",
                    self.intercept.len(),
                    self.coef.len()
                ),
            ));
        }
        check_finite(ARTIFACT, "intercept", &self.intercept)
    }
}

impl Classifier for LinearClassifier {
    fn input_dim(&self) -> usize {
        self.coef[0].len()
    }

    fn labels(&self) -> &[u8] {
        &self.classes
    }

    fn predict(&self, x: &[f32]) -> Result<u8, DimensionMismatch> {
        check_dim(self.input_dim(), x.len())?;

        if self.is_binary() {
            let idx = usize::from(self.decision(0, x) > 0.0);
            return Ok(self.classes[idx]);
        }

        let mut best = 0;
        let mut best_score = f32::NEG_INFINITY;
        for row in 0..self.coef.len() {
            let score = self.decision(row, x);
            if score > best_score {
                best_score = score;
                best = row;
            }
        }
        Ok(self.classes[best])
    }
}
