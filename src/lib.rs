pub mod config;
pub mod error;
pub mod model;
pub mod server;
pub mod validation;

pub use config::AppConfig;
pub use error::ServiceError;
pub use model::{Classifier, FeatureVector, ModelRegistry, PredictionResult};
pub use server::build_router;
