//! Prediction models: the classifier/regressor seams and the tree-ensemble
//! back end the exported artifacts use.
//!
//! Both model kinds are multi-output. A classifier returns one class index per
//! output column; a regressor returns one value per output column. Models are
//! immutable after load and shared across threads.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Multi-output classifier returning encoded class indices
pub trait Classifier: Send + Sync {
    /// Width of the feature vector the model was trained on
    fn n_features(&self) -> usize;

    /// Output column names, in prediction order
    fn output_names(&self) -> Vec<&str>;

    /// Number of classes per output column
    fn class_counts(&self) -> Vec<usize>;

    fn predict(&self, features: &[f64]) -> Result<Vec<usize>>;
}

/// Multi-output regressor
pub trait Regressor: Send + Sync {
    fn n_features(&self) -> usize;

    fn output_names(&self) -> Vec<&str>;

    fn predict(&self, features: &[f64]) -> Result<Vec<f64>>;
}

// ============================================================================
// Decision Trees
// ============================================================================

/// One node of a flattened decision tree
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    /// Go to `left` when `x[feature] <= threshold`, else to `right`
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

/// A decision tree stored as a node array rooted at index 0
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    /// Check the structure so that `leaf_for` always terminates in range
    ///
    /// Children must point strictly forward, which rules out cycles.
    pub fn validate(&self, n_features: usize, leaf_width: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".into());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {} splits on feature {} but only {} features exist",
                            idx, feature, n_features
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has a non-finite threshold", idx));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!(
                                "node {} has invalid child index {}",
                                idx, child
                            ));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if value.len() != leaf_width {
                        return Err(format!(
                            "leaf {} has {} values, expected {}",
                            idx,
                            value.len(),
                            leaf_width
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk from the root to the leaf selected by `features`
    ///
    /// Fails instead of panicking or looping on a tree that never went
    /// through `validate`.
    pub fn leaf_for(&self, features: &[f64]) -> Result<&[f64]> {
        let mut idx = 0;
        loop {
            let node = self.nodes.get(idx).ok_or_else(|| {
                Error::Inference(format!("tree has no node {}", idx))
            })?;
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = features.get(*feature).ok_or_else(|| {
                        Error::Inference(format!(
                            "node {} splits on missing feature {}",
                            idx, feature
                        ))
                    })?;
                    let next = if *x <= *threshold { *left } else { *right };
                    if next <= idx {
                        return Err(Error::Inference(format!(
                            "node {} points back to node {}",
                            idx, next
                        )));
                    }
                    idx = next;
                }
                Node::Leaf { value } => return Ok(value),
            }
        }
    }
}

fn check_width(features: &[f64], n_features: usize) -> Result<()> {
    if features.len() != n_features {
        return Err(Error::Inference(format!(
            "expected {} features, got {}",
            n_features,
            features.len()
        )));
    }
    if let Some(pos) = features.iter().position(|v| !v.is_finite()) {
        return Err(Error::Inference(format!(
            "feature {} is not a finite number",
            pos
        )));
    }
    Ok(())
}

// ============================================================================
// Forest Classifier
// ============================================================================

/// Trees voting on one categorical output column
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClassifierOutput {
    pub name: String,
    pub n_classes: usize,
    pub trees: Vec<DecisionTree>,
}

/// Random-forest style multi-output classifier
///
/// Leaves hold per-class scores; scores are averaged over the trees of an
/// output and the highest-scoring class wins (ties go to the lower index).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ForestClassifier {
    pub n_features: usize,
    pub outputs: Vec<ClassifierOutput>,
}

impl ForestClassifier {
    pub fn validate(&self) -> Result<()> {
        if self.outputs.is_empty() {
            return Err(Error::ModelLoad("classifier has no outputs".into()));
        }
        for output in &self.outputs {
            if output.n_classes == 0 || output.trees.is_empty() {
                return Err(Error::ModelLoad(format!(
                    "classifier output '{}' needs at least one class and one tree",
                    output.name
                )));
            }
            for (t, tree) in output.trees.iter().enumerate() {
                tree.validate(self.n_features, output.n_classes)
                    .map_err(|e| {
                        Error::ModelLoad(format!(
                            "classifier output '{}' tree {}: {}",
                            output.name, t, e
                        ))
                    })?;
            }
        }
        Ok(())
    }
}

impl Classifier for ForestClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|o| o.name.as_str()).collect()
    }

    fn class_counts(&self) -> Vec<usize> {
        self.outputs.iter().map(|o| o.n_classes).collect()
    }

    fn predict(&self, features: &[f64]) -> Result<Vec<usize>> {
        check_width(features, self.n_features)?;

        self.outputs
            .iter()
            .map(|output| -> Result<usize> {
                let mut scores = vec![0.0; output.n_classes];
                for tree in &output.trees {
                    let leaf = tree.leaf_for(features)?;
                    if leaf.len() != output.n_classes {
                        return Err(Error::Inference(format!(
                            "output '{}' leaf has {} scores, expected {}",
                            output.name,
                            leaf.len(),
                            output.n_classes
                        )));
                    }
                    for (score, value) in scores.iter_mut().zip(leaf) {
                        *score += value;
                    }
                }
                Ok(argmax(&scores))
            })
            .collect()
    }
}

fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (idx, score) in scores.iter().enumerate() {
        if *score > scores[best] {
            best = idx;
        }
    }
    best
}

// ============================================================================
// Forest Regressor
// ============================================================================

/// Trees averaged into one numeric output column
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RegressorOutput {
    pub name: String,
    pub trees: Vec<DecisionTree>,
}

/// Random-forest style multi-output regressor
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ForestRegressor {
    pub n_features: usize,
    pub outputs: Vec<RegressorOutput>,
}

impl ForestRegressor {
    pub fn validate(&self) -> Result<()> {
        if self.outputs.is_empty() {
            return Err(Error::ModelLoad("regressor has no outputs".into()));
        }
        for output in &self.outputs {
            if output.trees.is_empty() {
                return Err(Error::ModelLoad(format!(
                    "regressor output '{}' has no trees",
                    output.name
                )));
            }
            for (t, tree) in output.trees.iter().enumerate() {
                tree.validate(self.n_features, 1).map_err(|e| {
                    Error::ModelLoad(format!(
                        "regressor output '{}' tree {}: {}",
                        output.name, t, e
                    ))
                })?;
            }
        }
        Ok(())
    }
}

impl Regressor for ForestRegressor {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|o| o.name.as_str()).collect()
    }

    fn predict(&self, features: &[f64]) -> Result<Vec<f64>> {
        check_width(features, self.n_features)?;

        self.outputs
            .iter()
            .map(|output| -> Result<f64> {
                if output.trees.is_empty() {
                    return Err(Error::Inference(format!(
                        "output '{}' has no trees",
                        output.name
                    )));
                }
                let mut sum = 0.0;
                for tree in &output.trees {
                    let leaf = tree.leaf_for(features)?;
                    sum += leaf.first().copied().ok_or_else(|| {
                        Error::Inference(format!("output '{}' has an empty leaf", output.name))
                    })?;
                }
                Ok(sum / output.trees.len() as f64)
            })
            .collect()
    }
}
