//! Turns a raw `/predict` body into a [`FeatureVector`].

use serde_json::{Map, Value};

use crate::{error::ServiceError, model::FeatureVector};

pub const COLOR_FIELD: &str = "couleur";
pub const TEXTURE_FIELD: &str = "texture";

/// Parses the request body. Anything that is not a JSON object carrying both keys is
/// `MissingFields`; values that do not coerce to in-domain integers are `InvalidValue`.
pub fn parse_features(body: &[u8]) -> Result<FeatureVector, ServiceError> {
    let payload: Value = serde_json::from_slice(body).map_err(|_| ServiceError::MissingFields)?;
    let object = payload.as_object().ok_or(ServiceError::MissingFields)?;

    let raw_color = required(object, COLOR_FIELD)?;
    let raw_texture = required(object, TEXTURE_FIELD)?;

    let color = coerce_int(COLOR_FIELD, raw_color)?;
    let texture = coerce_int(TEXTURE_FIELD, raw_texture)?;

    FeatureVector::new(color, texture)
}

fn required<'a>(object: &'a Map<String, Value>, key: &str) -> Result<&'a Value, ServiceError> {
    object.get(key).ok_or(ServiceError::MissingFields)
}

/// Integer coercion: integers as-is, finite floats truncated toward zero, booleans as
/// 0/1, and strings holding an integer literal.
fn coerce_int(field: &str, value: &Value) -> Result<i64, ServiceError> {
    let coerced = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    };

    coerced.ok_or_else(|| ServiceError::InvalidValue(format!("{field} must be an integer")))
}
