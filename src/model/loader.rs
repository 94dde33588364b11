use std::{fs, io, path::Path, sync::Arc};

use serde::Deserialize;

use crate::{
    error::ServiceError,
    model::{
        ModelMetadata,
        classifier::{Classifier, DecisionTree, LookupEntry, LookupTable},
    },
};

/// On-disk model format, tagged by `kind`.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum ModelArtifact {
    DecisionTree(DecisionTree),
    LookupTable { entries: Vec<LookupEntry> },
}

pub struct LoadedModel {
    pub classifier: Arc<dyn Classifier>,
    pub metadata: ModelMetadata,
}

impl LoadedModel {
    pub fn load(path: &Path) -> Result<Self, ServiceError> {
        let raw = fs::read(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => {
                ServiceError::Artifact(format!("model artifact missing: {}", path.display()))
            }
            _ => ServiceError::Io(err),
        })?;
        let size_bytes = raw.len() as u64;
        let classifier = parse_artifact(&raw)?;

        let metadata = ModelMetadata {
            kind: classifier.kind().to_string(),
            path: path.to_path_buf(),
            size_bytes,
            classes: classifier.classes().to_vec(),
            supports_probability: classifier.supports_probability(),
        };

        Ok(Self {
            classifier,
            metadata,
        })
    }
}

pub fn parse_artifact(raw: &[u8]) -> Result<Arc<dyn Classifier>, ServiceError> {
    let artifact: ModelArtifact = serde_json::from_slice(raw)
        .map_err(|e| ServiceError::Artifact(format!("cannot decode artifact: {e}")))?;

    let classifier: Arc<dyn Classifier> = match artifact {
        ModelArtifact::DecisionTree(tree) => {
            tree.validate()?;
            Arc::new(tree)
        }
        ModelArtifact::LookupTable { entries } => Arc::new(LookupTable::new(entries)?),
    };
    Ok(classifier)
}
