mod classifier;
mod loader;
mod registry;
mod types;

pub use classifier::{Classifier, DecisionTree, LookupEntry, LookupTable, TreeNode};
pub use loader::{LoadedModel, parse_artifact};
pub use registry::ModelRegistry;
pub use types::{
    COLOR_DOMAIN, FeatureVector, FruitLabel, ModelMetadata, OUTPUT_DOMAIN, PredictionResponse,
    PredictionResult, TEXTURE_DOMAIN,
};
