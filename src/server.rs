use std::{any::Any, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderValue, StatusCode},
    response::{Html, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{self, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, warn};

use crate::{
    config::AppConfig,
    error::{ServiceError, error_envelope},
    model::{ModelMetadata, ModelRegistry, PredictionResponse},
    validation::parse_features,
};

const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ModelRegistry>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    model: Option<ModelMetadata>,
}

pub fn build_router(config: Arc<AppConfig>, registry: Arc<ModelRegistry>) -> Router {
    let cors = cors_layer(&config);
    let state = AppState { registry };

    Router::new()
        .route("/", get(index))
        .route("/predict", post(predict))
        .route("/api/info", get(api_info))
        .route("/health", get(health))
        .with_state(state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(cors::Any)
        .allow_headers(cors::Any);

    match config.cors_allowed_origins.as_ref() {
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match HeaderValue::from_str(origin) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        warn!(%origin, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            layer.allow_origin(AllowOrigin::list(allowed))
        }
        None => layer.allow_origin(cors::Any),
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn predict(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PredictionResponse>, ServiceError> {
    if !state.registry.is_loaded() {
        return Err(ServiceError::ModelUnavailable);
    }

    let body = body?;
    let features = parse_features(&body)?;
    let result = state.registry.predict(&features)?;
    debug!(
        couleur = features.color(),
        texture = features.texture(),
        code = result.code,
        confidence = result.confidence,
        "prediction served"
    );

    Ok(Json(PredictionResponse::new(result, features)))
}

async fn api_info() -> Json<Value> {
    Json(api_info_payload())
}

/// Static description of the accepted and produced categorical domains.
pub fn api_info_payload() -> Value {
    json!({
        "name": "Fruit Classifier API",
        "version": "1.0",
        "model": "DecisionTreeClassifier",
        "features": {
            "couleur": {
                "type": "categorical",
                "values": {"0": "vert", "1": "rouge", "2": "orange"}
            },
            "texture": {
                "type": "categorical",
                "values": {"0": "lisse", "1": "rugueux"}
            }
        },
        "output": {
            "type": "categorical",
            "values": {"0": "pomme", "1": "orange"}
        }
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let model = state.registry.metadata().cloned();
    let status = if model.is_some() { "ok" } else { "degraded" };

    Json(HealthResponse { status, model })
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unexpected failure".to_string()
    };
    error!(%message, "request handler panicked");

    error_envelope(StatusCode::INTERNAL_SERVER_ERROR, message)
}
