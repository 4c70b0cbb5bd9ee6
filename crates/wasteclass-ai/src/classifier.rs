//! Binary classifiers loaded from persisted artifacts.
//!
//! Two artifact kinds are supported: a linear decision function and a
//! random forest of axis-aligned decision trees. Both map a scaled feature
//! vector to one of the classes declared in the artifact.

use serde::{Deserialize, Serialize};
use wasteclass_core::{InferenceError, ScaledFeatureVector};

/// A pre-trained decision function over scaled features.
pub trait Classifier: Send + Sync {
    /// Number of features the model was trained on.
    fn n_features(&self) -> usize;

    /// Structural checks, run once before the model serves predictions.
    fn validate(&self) -> Result<(), String>;

    /// Predict one discrete class for a single sample.
    fn predict(&self, x: &ScaledFeatureVector) -> Result<i64, InferenceError>;
}

/// Serialized classifier, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    Linear(LinearModel),
    RandomForest(RandomForest),
}

/// `d = w·x + b`; predicts `classes[1]` when `d > 0`, else `classes[0]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearModel {
    pub weights: Vec<f64>,
    pub intercept: f64,
    #[serde(default = "default_classes")]
    pub classes: [i64; 2],
}

/// Ensemble of decision trees voting with averaged leaf probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub classes: Vec<i64>,
    pub trees: Vec<DecisionTree>,
}

/// Flat node array; index 0 is the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Go to `left` when `x[feature] <= threshold`, else `right`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class probabilities, indexed like the forest's `classes`.
    Leaf { proba: Vec<f64> },
}

fn default_classes() -> [i64; 2] {
    [0, 1]
}

impl ModelArtifact {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Linear(_) => "linear",
            Self::RandomForest(_) => "random_forest",
        }
    }
}

impl Classifier for ModelArtifact {
    fn n_features(&self) -> usize {
        match self {
            Self::Linear(m) => m.n_features(),
            Self::RandomForest(f) => f.n_features(),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Linear(m) => m.validate(),
            Self::RandomForest(f) => f.validate(),
        }
    }

    fn predict(&self, x: &ScaledFeatureVector) -> Result<i64, InferenceError> {
        match self {
            Self::Linear(m) => m.predict(x),
            Self::RandomForest(f) => f.predict(x),
        }
    }
}

impl LinearModel {
    pub fn decision_function(&self, x: &[f64]) -> f64 {
        self.weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>() + self.intercept
    }
}

impl Classifier for LinearModel {
    fn n_features(&self) -> usize {
        self.weights.len()
    }

    fn validate(&self) -> Result<(), String> {
        if self.weights.is_empty() {
            return Err("linear model has no weights".into());
        }
        if !self.intercept.is_finite() || self.weights.iter().any(|w| !w.is_finite()) {
            return Err("linear model has non-finite coefficients".into());
        }
        Ok(())
    }

    fn predict(&self, x: &ScaledFeatureVector) -> Result<i64, InferenceError> {
        check_len(self.n_features(), x)?;
        let d = self.decision_function(x.as_slice());
        Ok(if d > 0.0 {
            self.classes[1]
        } else {
            self.classes[0]
        })
    }
}

impl RandomForest {
    /// Mean class probabilities across all trees.
    pub fn predict_proba(&self, x: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if self.trees.is_empty() {
            return Err(InferenceError::MalformedModel("forest has no trees".into()));
        }
        let mut accum = vec![0.0f64; self.classes.len()];
        for tree in &self.trees {
            let proba = tree.leaf(x)?;
            if proba.len() != accum.len() {
                return Err(InferenceError::MalformedModel(format!(
                    "leaf has {} probabilities for {} classes",
                    proba.len(),
                    accum.len()
                )));
            }
            for (acc, p) in accum.iter_mut().zip(proba) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        for v in &mut accum {
            *v /= n;
        }
        Ok(accum)
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("forest declares no classes".into());
        }
        if self.trees.is_empty() {
            return Err("forest has no trees".into());
        }
        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {t} has no nodes"));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    TreeNode::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if *feature >= self.n_features {
                            return Err(format!(
                                "tree {t} node {i}: feature {feature} out of range ({} features)",
                                self.n_features
                            ));
                        }
                        if threshold.is_nan() {
                            return Err(format!("tree {t} node {i}: threshold is NaN"));
                        }
                        // Children strictly after the parent guarantees traversal ends.
                        for child in [*left, *right] {
                            if child <= i || child >= tree.nodes.len() {
                                return Err(format!(
                                    "tree {t} node {i}: child index {child} is invalid"
                                ));
                            }
                        }
                    }
                    TreeNode::Leaf { proba } => {
                        if proba.len() != self.classes.len() {
                            return Err(format!(
                                "tree {t} node {i}: {} probabilities for {} classes",
                                proba.len(),
                                self.classes.len()
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn predict(&self, x: &ScaledFeatureVector) -> Result<i64, InferenceError> {
        check_len(self.n_features, x)?;
        let proba = self.predict_proba(x.as_slice())?;
        self.classes
            .get(argmax(&proba))
            .copied()
            .ok_or_else(|| InferenceError::MalformedModel("forest declares no classes".into()))
    }
}

impl DecisionTree {
    /// Walk from the root to a leaf and return its probabilities.
    ///
    /// Every step must move to a later node, so the walk ends even on a
    /// tree that skipped validation.
    fn leaf(&self, x: &[f64]) -> Result<&[f64], InferenceError> {
        let mut idx = 0;
        loop {
            let node = self.nodes.get(idx).ok_or_else(|| {
                InferenceError::MalformedModel(format!("node {idx} does not exist"))
            })?;
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = x.get(*feature).ok_or_else(|| {
                        InferenceError::MalformedModel(format!(
                            "node {idx} splits on missing feature {feature}"
                        ))
                    })?;
                    let next = if *value <= *threshold { *left } else { *right };
                    if next <= idx {
                        return Err(InferenceError::MalformedModel(format!(
                            "node {idx} links back to node {next}"
                        )));
                    }
                    idx = next;
                }
                TreeNode::Leaf { proba } => return Ok(proba),
            }
        }
    }
}

// ── Helpers ──

fn check_len(expected: usize, x: &ScaledFeatureVector) -> Result<(), InferenceError> {
    if x.len() != expected {
        return Err(InferenceError::ShapeMismatch {
            expected,
            actual: x.len(),
        });
    }
    Ok(())
}

/// Index of the largest value; the first one wins ties.
fn argmax(values: &[f64]) -> usize {
    let mut best_idx = 0;
    let mut best = f64::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best {
            best = v;
            best_idx = i;
        }
    }
    best_idx
}
