use std::path::PathBuf;

use serde::Serialize;

use crate::error::ServiceError;

pub const COLOR_DOMAIN: [i64; 3] = [0, 1, 2];
pub const TEXTURE_DOMAIN: [i64; 2] = [0, 1];
pub const OUTPUT_DOMAIN: [i64; 2] = [0, 1];

/// Validated model input. Only constructible with in-domain values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FeatureVector {
    #[serde(rename = "couleur")]
    color: i64,
    texture: i64,
}

impl FeatureVector {
    pub fn new(color: i64, texture: i64) -> Result<Self, ServiceError> {
        if !COLOR_DOMAIN.contains(&color) {
            return Err(ServiceError::InvalidValue(format!(
                "couleur must be one of 0, 1, 2 (got {color})"
            )));
        }
        if !TEXTURE_DOMAIN.contains(&texture) {
            return Err(ServiceError::InvalidValue(format!(
                "texture must be one of 0, 1 (got {texture})"
            )));
        }
        Ok(Self { color, texture })
    }

    pub fn color(&self) -> i64 {
        self.color
    }

    pub fn texture(&self) -> i64 {
        self.texture
    }

    pub fn as_array(&self) -> [f64; 2] {
        [self.color as f64, self.texture as f64]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FruitLabel {
    Pomme,
    Orange,
}

impl FruitLabel {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(FruitLabel::Pomme),
            1 => Some(FruitLabel::Orange),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            FruitLabel::Pomme => 0,
            FruitLabel::Orange => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: FruitLabel,
    pub code: i64,
    /// Percentage in `[0, 100]`, two decimals.
    pub confidence: f64,
}

/// Wire shape of a successful `/predict` call.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResponse {
    pub success: bool,
    pub prediction: FruitLabel,
    pub prediction_code: i64,
    pub probability: f64,
    pub input: FeatureVector,
}

impl PredictionResponse {
    pub fn new(result: PredictionResult, input: FeatureVector) -> Self {
        Self {
            success: true,
            prediction: result.label,
            prediction_code: result.code,
            probability: result.confidence,
            input,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    pub kind: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub classes: Vec<i64>,
    pub supports_probability: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_vector_rejects_out_of_domain_values() {
        assert!(FeatureVector::new(2, 1).is_ok());
        assert!(matches!(
            FeatureVector::new(3, 0),
            Err(ServiceError::InvalidValue(_))
        ));
        assert!(matches!(
            FeatureVector::new(0, 2),
            Err(ServiceError::InvalidValue(_))
        ));
        assert!(matches!(
            FeatureVector::new(-1, 0),
            Err(ServiceError::InvalidValue(_))
        ));
    }

    #[test]
    fn label_codes_are_bijective() {
        for code in OUTPUT_DOMAIN {
            let label = FruitLabel::from_code(code).unwrap();
            assert_eq!(label.code(), code);
        }
        assert_eq!(FruitLabel::from_code(2), None);
    }

    #[test]
    fn response_echoes_input_with_wire_names() {
        let input = FeatureVector::new(1, 0).unwrap();
        let result = PredictionResult {
            label: FruitLabel::Pomme,
            code: 0,
            confidence: 95.24,
        };
        let value = serde_json::to_value(PredictionResponse::new(result, input)).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["prediction"], "pomme");
        assert_eq!(value["prediction_code"], 0);
        assert_eq!(value["probability"], 95.24);
        assert_eq!(value["input"], serde_json::json!({"couleur": 1, "texture": 0}));
    }
}
