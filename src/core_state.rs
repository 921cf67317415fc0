//! Process-wide classification state.
//!
//! `CoreState` owns the normalization policy, the pre-fit transforms and
//! the fact table. It is built once at startup, wrapped in `Arc` and shared
//! read-only by every request; nothing in it is mutated after construction.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::artifact::ArtifactError;
use crate::config::{AppConfig, ConfigError};
use crate::facts::FactTable;
use crate::model::{LinearClassifier, Pca, StandardScaler};
use crate::pipeline::{ClassifyError, FeaturePipeline, NormalizationPipeline, Prediction};

/// Failures that abort startup before the first request is served.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Model configuration is inconsistent: {0}")]
    Inconsistent(#[from] ClassifyError),

    #[error("Cannot start server on {addr}: {source}")]
    Server {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

pub struct CoreState {
    normalizer: NormalizationPipeline,
    features: FeaturePipeline,
    facts: FactTable,
}

impl CoreState {
    /// Assemble the state and check that every label the classifier can
    /// emit has a fact. A gap is reported here, not on first occurrence.
    pub fn new(
        normalizer: NormalizationPipeline,
        features: FeaturePipeline,
        facts: FactTable,
    ) -> Result<Self, ClassifyError> {
        facts.validate_labels(features.labels())?;
        Ok(Self {
            normalizer,
            features,
            facts,
        })
    }

    /// Load every artifact named by the configuration.
    pub fn load(config: &AppConfig) -> Result<Self, StartupError> {
        let scaler = StandardScaler::load(&config.scaler_path())?;
        let reducer = Pca::load(&config.reducer_path())?;
        let classifier = LinearClassifier::load(&config.classifier_path())?;
        let features =
            FeaturePipeline::new(Box::new(scaler), Box::new(reducer), Box::new(classifier))?;
        let facts = FactTable::load(&config.facts_path)?;

        let state = Self::new(
            NormalizationPipeline::mnist_with_limit(config.max_upload_bytes),
            features,
            facts,
        )?;

        info!(
            models = %display_path(&config.models_dir),
            labels = ?state.features.labels(),
            facts = state.facts.len(),
            "Classifier loaded"
        );
        Ok(state)
    }

    /// bytes → label → fact. Fails fast at the first stage that rejects
    /// the input.
    pub fn classify(&self, image_bytes: &[u8]) -> Result<Prediction, ClassifyError> {
        let result = self.run(image_bytes);
        match &result {
            Ok(prediction) => info!(label = prediction.label, "Digit classified"),
            Err(e) if e.is_configuration_error() => {
                error!(stage = e.stage().as_str(), code = e.code(), "Model configuration error: {e}")
            }
            Err(e) => warn!(stage = e.stage().as_str(), code = e.code(), "Rejected upload: {e}"),
        }
        result
    }

    fn run(&self, image_bytes: &[u8]) -> Result<Prediction, ClassifyError> {
        let canvas = self.normalizer.normalize_bytes(image_bytes)?;
        let label = self.features.predict_canvas(&canvas)?;
        let fact = self.facts.lookup(label)?;
        Ok(Prediction {
            label,
            fact: fact.to_string(),
        })
    }

    pub fn facts(&self) -> &FactTable {
        &self.facts
    }

    pub fn labels(&self) -> &[u8] {
        self.features.labels()
    }
}

fn display_path(path: &std::path::Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .display()
        .to_string()
}
