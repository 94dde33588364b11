use std::collections::HashSet;

use serde::Deserialize;

use crate::{error::ServiceError, model::FeatureVector};

/// A loaded model. Implementations are immutable after construction and shared across
/// request tasks.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<i64, ServiceError>;

    /// `Ok(None)` means the model has no probability estimates; an `Err` means it has
    /// them but computing one failed.
    fn predict_proba(&self, features: &FeatureVector) -> Result<Option<Vec<f64>>, ServiceError>;

    fn kind(&self) -> &'static str;

    fn classes(&self) -> &[i64];

    fn supports_probability(&self) -> bool;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

/// Binary decision tree in the flattened layout: node 0 is the root and children always
/// come after their parent.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    n_features: usize,
    classes: Vec<i64>,
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn new(
        n_features: usize,
        classes: Vec<i64>,
        nodes: Vec<TreeNode>,
    ) -> Result<Self, ServiceError> {
        let tree = Self {
            n_features,
            classes,
            nodes,
        };
        tree.validate()?;
        Ok(tree)
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.n_features != 2 {
            return Err(ServiceError::Artifact(format!(
                "decision tree expects {} features, service provides 2",
                self.n_features
            )));
        }
        validate_classes(&self.classes)?;
        if self.nodes.is_empty() {
            return Err(ServiceError::Artifact("decision tree has no nodes".into()));
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= self.n_features {
                        return Err(ServiceError::Artifact(format!(
                            "node {idx} splits on unknown feature {feature}"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(ServiceError::Artifact(format!(
                            "node {idx} has a non-finite threshold"
                        )));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(ServiceError::Artifact(format!(
                                "node {idx} points to invalid child {child}"
                            )));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != self.classes.len() {
                        return Err(ServiceError::Artifact(format!(
                            "leaf {idx} has {} weights for {} classes",
                            value.len(),
                            self.classes.len()
                        )));
                    }
                    if value.iter().any(|w| !w.is_finite() || *w < 0.0) {
                        return Err(ServiceError::Artifact(format!(
                            "leaf {idx} has a negative or non-finite weight"
                        )));
                    }
                    if value.iter().sum::<f64>() <= 0.0 {
                        return Err(ServiceError::Artifact(format!(
                            "leaf {idx} weights sum to zero"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_for(&self, features: &FeatureVector) -> Result<&[f64], ServiceError> {
        let x = features.as_array();
        let mut idx = 0;
        // Child indices strictly increase, so the walk ends within `nodes.len()` steps.
        loop {
            match self.nodes.get(idx) {
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = x.get(*feature).ok_or_else(|| {
                        ServiceError::Inference(format!("feature index {feature} out of range"))
                    })?;
                    idx = if *value <= *threshold { *left } else { *right };
                }
                Some(TreeNode::Leaf { value }) => return Ok(value.as_slice()),
                None => {
                    return Err(ServiceError::Inference(format!(
                        "decision tree has no node {idx}"
                    )));
                }
            }
        }
    }
}

impl Classifier for DecisionTree {
    fn predict(&self, features: &FeatureVector) -> Result<i64, ServiceError> {
        let weights = self.leaf_for(features)?;
        // First maximum wins ties, matching argmax.
        let best = weights
            .iter()
            .enumerate()
            .fold(None::<(usize, f64)>, |best, (idx, &w)| match best {
                Some((_, top)) if top >= w => best,
                _ => Some((idx, w)),
            })
            .map(|(idx, _)| idx)
            .ok_or_else(|| ServiceError::Inference("empty leaf".into()))?;

        self.classes
            .get(best)
            .copied()
            .ok_or_else(|| ServiceError::Inference(format!("no class for leaf index {best}")))
    }

    fn predict_proba(&self, features: &FeatureVector) -> Result<Option<Vec<f64>>, ServiceError> {
        let weights = self.leaf_for(features)?;
        let total: f64 = weights.iter().sum();
        if !total.is_finite() || total <= 0.0 {
            return Err(ServiceError::Inference(
                "leaf weights do not form a distribution".into(),
            ));
        }
        Ok(Some(weights.iter().map(|w| w / total).collect()))
    }

    fn kind(&self) -> &'static str {
        "decision_tree"
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn supports_probability(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupEntry {
    #[serde(rename = "couleur")]
    pub color: i64,
    pub texture: i64,
    pub code: i64,
}

/// Exact-match table from feature pair to class code. Has no probability estimates.
#[derive(Debug, Clone)]
pub struct LookupTable {
    entries: Vec<LookupEntry>,
    classes: Vec<i64>,
}

impl LookupTable {
    pub fn new(entries: Vec<LookupEntry>) -> Result<Self, ServiceError> {
        let mut table = Self {
            entries,
            classes: Vec::new(),
        };
        table.validate()?;
        Ok(table)
    }

    /// Checks the entries and fills in the class list derived from them.
    fn validate(&mut self) -> Result<(), ServiceError> {
        if self.entries.is_empty() {
            return Err(ServiceError::Artifact("lookup table has no entries".into()));
        }
        let mut seen = HashSet::new();
        let mut classes = Vec::new();
        for entry in &self.entries {
            if !seen.insert((entry.color, entry.texture)) {
                return Err(ServiceError::Artifact(format!(
                    "duplicate lookup entry for couleur={} texture={}",
                    entry.color, entry.texture
                )));
            }
            if !classes.contains(&entry.code) {
                classes.push(entry.code);
            }
        }
        classes.sort_unstable();
        self.classes = classes;
        Ok(())
    }
}

impl Classifier for LookupTable {
    fn predict(&self, features: &FeatureVector) -> Result<i64, ServiceError> {
        self.entries
            .iter()
            .find(|e| e.color == features.color() && e.texture == features.texture())
            .map(|e| e.code)
            .ok_or_else(|| {
                ServiceError::Inference(format!(
                    "lookup table has no entry for couleur={} texture={}",
                    features.color(),
                    features.texture()
                ))
            })
    }

    fn predict_proba(&self, _features: &FeatureVector) -> Result<Option<Vec<f64>>, ServiceError> {
        Ok(None)
    }

    fn kind(&self) -> &'static str {
        "lookup_table"
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn supports_probability(&self) -> bool {
        false
    }
}

fn validate_classes(classes: &[i64]) -> Result<(), ServiceError> {
    if classes.is_empty() {
        return Err(ServiceError::Artifact("model declares no classes".into()));
    }
    let unique: HashSet<_> = classes.iter().collect();
    if unique.len() != classes.len() {
        return Err(ServiceError::Artifact("model declares duplicate classes".into()));
    }
    Ok(())
}
