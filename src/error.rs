use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("model not loaded")]
    ModelUnavailable,
    #[error("missing data (couleur and texture are required)")]
    MissingFields,
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("{0}")]
    Inference(String),
    #[error("{message}")]
    RequestBody { status: StatusCode, message: String },
    #[error("invalid model artifact: {0}")]
    Artifact(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::MissingFields | ServiceError::InvalidValue(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::RequestBody { status, .. } => *status,
            ServiceError::ModelUnavailable
            | ServiceError::Inference(_)
            | ServiceError::Artifact(_)
            | ServiceError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<BytesRejection> for ServiceError {
    fn from(rejection: BytesRejection) -> Self {
        ServiceError::RequestBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "prediction failed");
        } else {
            tracing::debug!(error = %self, "prediction rejected");
        }

        error_envelope(status, self.to_string())
    }
}

/// Builds the `{"success": false, "error": ...}` body shared by every failure path.
pub fn error_envelope(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({
        "success": false,
        "error": message.into(),
    });

    (status, axum::Json(body)).into_response()
}
