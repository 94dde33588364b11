use std::{path::Path, sync::Arc};

use tracing::{info, warn};

use crate::{
    error::ServiceError,
    model::{
        Classifier, FeatureVector, FruitLabel, ModelMetadata, PredictionResult,
        loader::LoadedModel,
    },
};

const DEFAULT_CONFIDENCE: f64 = 100.0;

/// Process-wide model handle. Built once before the server starts; `None` is degraded
/// mode.
pub struct ModelRegistry {
    model: Option<LoadedModel>,
}

impl ModelRegistry {
    /// Never fails: a missing or corrupt artifact leaves the registry unavailable.
    pub fn initialize(model_path: &Path) -> Self {
        match LoadedModel::load(model_path) {
            Ok(model) => {
                info!(
                    path = %model_path.display(),
                    kind = %model.metadata.kind,
                    supports_probability = model.metadata.supports_probability,
                    "model loaded"
                );
                Self { model: Some(model) }
            }
            Err(err) => {
                warn!(
                    path = %model_path.display(),
                    error = %err,
                    "model unavailable, /predict will fail until restart"
                );
                Self::unavailable()
            }
        }
    }

    pub fn unavailable() -> Self {
        Self { model: None }
    }

    pub fn from_classifier(classifier: Arc<dyn Classifier>, metadata: ModelMetadata) -> Self {
        Self {
            model: Some(LoadedModel {
                classifier,
                metadata,
            }),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.model.as_ref().map(|m| &m.metadata)
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResult, ServiceError> {
        let model = self.model.as_ref().ok_or(ServiceError::ModelUnavailable)?;
        let classifier = model.classifier.as_ref();

        let code = classifier.predict(features)?;
        let label = FruitLabel::from_code(code).ok_or_else(|| {
            ServiceError::Inference(format!("model returned unknown class code {code}"))
        })?;

        let confidence = match classifier.predict_proba(features)? {
            Some(distribution) => confidence_percent(&distribution)?,
            None => DEFAULT_CONFIDENCE,
        };

        Ok(PredictionResult {
            label,
            code: label.code(),
            confidence,
        })
    }
}

/// Highest class probability as a percentage rounded to two decimals.
fn confidence_percent(distribution: &[f64]) -> Result<f64, ServiceError> {
    if distribution
        .iter()
        .any(|p| !p.is_finite() || !(0.0..=1.0).contains(p))
    {
        return Err(ServiceError::Inference(
            "model returned an invalid probability distribution".into(),
        ));
    }
    let max = distribution
        .iter()
        .copied()
        .reduce(f64::max)
        .ok_or_else(|| ServiceError::Inference("model returned no probabilities".into()))?;

    Ok((max * 100.0 * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    struct FixedModel {
        code: i64,
        proba: Option<Result<Vec<f64>, String>>,
    }

    impl Classifier for FixedModel {
        fn predict(&self, _features: &FeatureVector) -> Result<i64, ServiceError> {
            Ok(self.code)
        }

        fn predict_proba(
            &self,
            _features: &FeatureVector,
        ) -> Result<Option<Vec<f64>>, ServiceError> {
            match &self.proba {
                None => Ok(None),
                Some(Ok(dist)) => Ok(Some(dist.clone())),
                Some(Err(msg)) => Err(ServiceError::Inference(msg.clone())),
            }
        }

        fn kind(&self) -> &'static str {
            "fixed"
        }

        fn classes(&self) -> &[i64] {
            &[0, 1]
        }

        fn supports_probability(&self) -> bool {
            self.proba.is_some()
        }
    }

    fn registry(code: i64, proba: Option<Result<Vec<f64>, String>>) -> ModelRegistry {
        let metadata = ModelMetadata {
            kind: "fixed".into(),
            path: PathBuf::from("fixed.json"),
            size_bytes: 0,
            classes: vec![0, 1],
            supports_probability: proba.is_some(),
        };
        ModelRegistry::from_classifier(Arc::new(FixedModel { code, proba }), metadata)
    }

    fn features() -> FeatureVector {
        FeatureVector::new(1, 0).unwrap()
    }

    #[test]
    fn confidence_is_rounded_max_probability() {
        let result = registry(1, Some(Ok(vec![0.25, 0.75])))
            .predict(&features())
            .unwrap();
        assert_eq!(result.label, FruitLabel::Orange);
        assert_eq!(result.code, 1);
        assert_eq!(result.confidence, 75.0);

        assert_eq!(confidence_percent(&[40.0 / 42.0, 2.0 / 42.0]).unwrap(), 95.24);
    }

    #[test]
    fn unsupported_probabilities_default_to_full_confidence() {
        let result = registry(0, None).predict(&features()).unwrap();
        assert_eq!(result.label, FruitLabel::Pomme);
        assert_eq!(result.confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn failing_probabilities_surface_as_errors() {
        let err = registry(0, Some(Err("proba exploded".into())))
            .predict(&features())
            .unwrap_err();
        assert_eq!(err.to_string(), "proba exploded");

        let err = registry(0, Some(Ok(vec![1.5, -0.5])))
            .predict(&features())
            .unwrap_err();
        assert!(matches!(err, ServiceError::Inference(_)));

        let err = registry(0, Some(Ok(Vec::new())))
            .predict(&features())
            .unwrap_err();
        assert!(matches!(err, ServiceError::Inference(_)));
    }

    #[test]
    fn unknown_class_codes_are_rejected() {
        let err = registry(7, None).predict(&features()).unwrap_err();
        assert_eq!(err.to_string(), "model returned unknown class code 7");
    }

    #[test]
    fn unavailable_registry_refuses_predictions() {
        let registry = ModelRegistry::unavailable();
        assert!(!registry.is_loaded());
        assert!(registry.metadata().is_none());
        assert!(matches!(
            registry.predict(&features()),
            Err(ServiceError::ModelUnavailable)
        ));
    }

    #[test]
    fn initialize_degrades_on_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModelRegistry::initialize(&dir.path().join("absent.json"));
        assert!(!registry.is_loaded());
    }
}
