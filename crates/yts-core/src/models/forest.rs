//! Regression tree ensembles in array form.
//!
//! Trees are stored as flat node arrays. A split sends `x[feature] <= threshold`
//! to `left`; every child index is strictly greater than its parent's, so
//! traversal always terminates.

use serde::{Deserialize, Serialize};

/// One node of a regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default)]
        impurity: f64,
        #[serde(default)]
        weighted_samples: f64,
    },
    Leaf {
        value: f64,
        #[serde(default)]
        impurity: f64,
        #[serde(default)]
        weighted_samples: f64,
    },
}

impl TreeNode {
    fn impurity(&self) -> f64 {
        match self {
            TreeNode::Split { impurity, .. } | TreeNode::Leaf { impurity, .. } => *impurity,
        }
    }

    fn weighted_samples(&self) -> f64 {
        match self {
            TreeNode::Split {
                weighted_samples, ..
            }
            | TreeNode::Leaf {
                weighted_samples, ..
            } => *weighted_samples,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Check structural invariants against the encoded feature width.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let len = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "node {} splits on feature {} but only {} exist",
                            idx, feature, n_features
                        ));
                    }
                    if !threshold.is_finite() {
                        return Err(format!("node {} has non-finite threshold", idx));
                    }
                    for child in [*left, *right] {
                        if child <= idx || child >= len {
                            return Err(format!(
                                "node {} has out-of-order child {}",
                                idx, child
                            ));
                        }
                    }
                }
                TreeNode::Leaf { value, .. } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {} has non-finite value", idx));
                    }
                }
            }
        }
        Ok(())
    }

    /// Raw prediction for an encoded row. Assumes [`DecisionTree::validate`] passed.
    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    let v = x.get(*feature).copied().unwrap_or(0.0);
                    idx = if v <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Normalized weighted impurity decrease per feature. A single-leaf tree
    /// yields all zeros.
    pub fn impurity_importances(&self, n_features: usize) -> Vec<f64> {
        let mut importances = vec![0.0; n_features];
        for node in &self.nodes {
            if let TreeNode::Split {
                feature,
                left,
                right,
                impurity,
                weighted_samples,
                ..
            } = node
            {
                let l = &self.nodes[*left];
                let r = &self.nodes[*right];
                let decrease = weighted_samples * impurity
                    - l.weighted_samples() * l.impurity()
                    - r.weighted_samples() * r.impurity();
                if let Some(slot) = importances.get_mut(*feature) {
                    *slot += decrease;
                }
            }
        }
        normalize(&mut importances);
        importances
    }
}

fn normalize(values: &mut [f64]) {
    let total: f64 = values.iter().sum();
    if total > 0.0 && total.is_finite() {
        for v in values.iter_mut() {
            *v /= total;
        }
    }
}

/// Averaging ensemble of regression trees for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    /// Encoded feature width the trees were fitted on.
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl Forest {
    pub fn validate(&self, expected_features: usize) -> Result<(), String> {
        if self.n_features != expected_features {
            return Err(format!(
                "model expects {} features, encoder produces {}",
                self.n_features, expected_features
            ));
        }
        if self.trees.is_empty() {
            return Err("ensemble has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }

    /// Mean of tree outputs, in the transformed target space.
    pub fn predict(&self, x: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.predict(x)).sum();
        total / self.trees.len() as f64
    }

    /// Forest-level impurity importances: mean of per-tree normalized
    /// importances over trees with at least one split, renormalized.
    pub fn feature_importances(&self) -> Vec<f64> {
        let informative: Vec<Vec<f64>> = self
            .trees
            .iter()
            .filter(|t| t.nodes.len() > 1)
            .map(|t| t.impurity_importances(self.n_features))
            .collect();

        let mut mean = vec![0.0; self.n_features];
        if informative.is_empty() {
            return mean;
        }
        for tree in &informative {
            for (acc, v) in mean.iter_mut().zip(tree) {
                *acc += v;
            }
        }
        let n = informative.len() as f64;
        for v in mean.iter_mut() {
            *v /= n;
        }
        normalize(&mut mean);
        mean
    }
}
