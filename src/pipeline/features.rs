//! Canvas → feature vector → label.
//!
//! The three transforms are opaque and pre-fit. Their dimensions are
//! checked once when the pipeline is assembled and again at each boundary
//! at call time.

use tracing::debug;

use super::types::{NormalizedCanvas, FEATURE_LEN};
use super::ClassifyError;
use crate::model::{Classifier, Transform};

pub struct FeaturePipeline {
    scaler: Box<dyn Transform>,
    reducer: Box<dyn Transform>,
    classifier: Box<dyn Classifier>,
}

impl std::fmt::Debug for FeaturePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeaturePipeline")
            .field("input_dim", &self.scaler.input_dim())
            .field("reduced_dim", &self.reducer.output_dim())
            .field("labels", &self.classifier.labels())
            .finish()
    }
}

impl FeaturePipeline {
    /// Assemble the chain scaler → reducer → classifier.
    ///
    /// Fails with `ShapeMismatch` if the scaler does not accept the
    /// 784-long canvas or adjacent transforms disagree on dimensionality.
    pub fn new(
        scaler: Box<dyn Transform>,
        reducer: Box<dyn Transform>,
        classifier: Box<dyn Classifier>,
    ) -> Result<Self, ClassifyError> {
        let chain = [
            (FEATURE_LEN, scaler.input_dim()),
            (scaler.output_dim(), reducer.input_dim()),
            (reducer.output_dim(), classifier.input_dim()),
        ];
        for (produced, expected) in chain {
            if produced != expected {
                return Err(ClassifyError::ShapeMismatch {
                    expected,
                    actual: produced,
                });
            }
        }

        Ok(Self {
            scaler,
            reducer,
            classifier,
        })
    }

    /// Label space of the underlying classifier.
    pub fn labels(&self) -> &[u8] {
        self.classifier.labels()
    }

    pub fn predict_canvas(&self, canvas: &NormalizedCanvas) -> Result<u8, ClassifyError> {
        self.predict(&canvas.flatten())
    }

    /// Scale, reduce and classify a raw 784-long feature vector.
    ///
    /// Transform outputs must stay finite; an overflowing artifact is a
    /// configuration error, not a label.
    pub fn predict(&self, raw: &[f32]) -> Result<u8, ClassifyError> {
        let scaled = self.scaler.transform(raw)?;
        check_finite(&scaled)?;
        let reduced = self.reducer.transform(&scaled)?;
        check_finite(&reduced)?;
        let label = self.classifier.predict(&reduced)?;
        debug!(reduced_dim = reduced.len(), label, "Feature vector classified");
        Ok(label)
    }
}

fn check_finite(values: &[f32]) -> Result<(), ClassifyError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(ClassifyError::NonFiniteFeature { index }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::model::{LinearClassifier, Pca, StandardScaler};
    use crate::pipeline::NormalizationPipeline;

    fn identity_scaler(dim: usize) -> Box<dyn Transform> {
        Box::new(StandardScaler::new(vec![0.0; dim], vec![1.0; dim]).unwrap())
    }

    #[test]
    fn new_rejects_scaler_not_fed_by_canvas() {
        let err = FeaturePipeline::new(
            identity_scaler(100),
            Box::new(Pca::new(vec![0.0; 100], vec![vec![1.0; 100]]).unwrap()),
            Box::new(LinearClassifier::new(vec![0, 1], vec![vec![1.0]], vec![0.0]).unwrap()),
        )
        .unwrap_err();
        assert_eq!(err, ClassifyError::ShapeMismatch { expected: 100, actual: FEATURE_LEN });
    }

    #[test]
    fn new_rejects_reducer_classifier_mismatch() {
        let err = FeaturePipeline::new(
            identity_scaler(FEATURE_LEN),
            Box::new(Pca::new(vec![0.0; FEATURE_LEN], vec![vec![1.0; FEATURE_LEN]; 3]).unwrap()),
            Box::new(LinearClassifier::new(vec![0, 1], vec![vec![1.0; 2]], vec![0.0]).unwrap()),
        )
        .unwrap_err();
        assert_eq!(err, ClassifyError::ShapeMismatch { expected: 2, actual: 3 });
    }

    #[test]
    fn predict_rejects_short_vector() {
        let features = fixtures::feature_pipeline();
        let err = features.predict(&[0.0; FEATURE_LEN - 1]).unwrap_err();
        assert_eq!(
            err,
            ClassifyError::ShapeMismatch { expected: FEATURE_LEN, actual: FEATURE_LEN - 1 }
        );
    }

    #[test]
    fn predict_rejects_overflowing_scaler() {
        let features = FeaturePipeline::new(
            Box::new(StandardScaler::new(vec![0.0; FEATURE_LEN], vec![1e-38; FEATURE_LEN]).unwrap()),
            Box::new(Pca::new(vec![0.0; FEATURE_LEN], vec![vec![1.0; FEATURE_LEN]]).unwrap()),
            Box::new(LinearClassifier::new(vec![0, 1], vec![vec![1.0]], vec![0.0]).unwrap()),
        )
        .unwrap();

        let err = features.predict(&[255.0; FEATURE_LEN]).unwrap_err();
        assert_eq!(err, ClassifyError::NonFiniteFeature { index: 0 });
        assert!(err.is_configuration_error());
        // All-zero input stays finite and still classifies
        assert_eq!(features.predict(&[0.0; FEATURE_LEN]).unwrap(), 0);
    }

    #[test]
    fn predict_rejects_overflowing_projection() {
        let features = FeaturePipeline::new(
            identity_scaler(FEATURE_LEN),
            Box::new(Pca::new(vec![0.0; FEATURE_LEN], vec![vec![1e36; FEATURE_LEN]; 2]).unwrap()),
            Box::new(
                LinearClassifier::new(vec![0, 1], vec![vec![1.0, 0.0], vec![0.0, 1.0]], vec![0.0; 2])
                    .unwrap(),
            ),
        )
        .unwrap();

        let err = features.predict(&[255.0; FEATURE_LEN]).unwrap_err();
        assert_eq!(err, ClassifyError::NonFiniteFeature { index: 0 });
    }

    #[test]
    fn predict_canvas_matches_template() {
        let features = fixtures::feature_pipeline();
        let pipeline = NormalizationPipeline::mnist();

        let seven = pipeline.normalize_grid(fixtures::seven(28)).unwrap();
        let zero = pipeline.normalize_grid(fixtures::zero(28)).unwrap();
        let one = pipeline.normalize_grid(fixtures::one(28)).unwrap();

        assert_eq!(features.predict_canvas(&seven).unwrap(), 7);
        assert_eq!(features.predict_canvas(&zero).unwrap(), 0);
        assert_eq!(features.predict_canvas(&one).unwrap(), 1);
    }

    #[test]
    fn labels_come_from_classifier() {
        assert_eq!(fixtures::feature_pipeline().labels(), &[0, 1, 7]);
    }
}
