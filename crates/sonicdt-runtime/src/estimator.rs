//! Serializable regression estimators
//!
//! These are the model payloads the built-in decoders understand. Trees are
//! stored as flat node arrays; a split sends `x[feature] <= threshold` to
//! `left` and everything else to `right`. Child indices always point forward,
//! which `validate` enforces so traversal terminates.

use serde::{Deserialize, Serialize};
use sonicdt_core::{InputFrame, FEATURE_COLUMNS};

use crate::traits::{InferenceError, Predictor};

/// Artifact layout version understood by this build
pub const ARTIFACT_VERSION: u32 = 1;

/// A trained model as stored on disk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Layout version, must equal [`ARTIFACT_VERSION`]
    pub version: u32,
    /// Feature columns in training order
    pub feature_names: Vec<String>,
    /// Name of the predicted quantity
    pub target: String,
    /// The fitted estimator
    pub estimator: Estimator,
}

/// Supported estimator families
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Estimator {
    Linear(LinearModel),
    RandomForest(ForestModel),
    GradientBoosting(BoostedModel),
}

/// `intercept + sum(coefficients[i] * x[i])`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// Mean of the tree outputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestModel {
    pub trees: Vec<RegressionTree>,
}

/// `init + learning_rate * sum(tree outputs)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostedModel {
    pub init: f64,
    pub learning_rate: f64,
    pub trees: Vec<RegressionTree>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    /// Node 0 is the root
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

impl ModelArtifact {
    /// Wrap an estimator with the standard DT feature schema
    pub fn new(estimator: Estimator) -> Self {
        Self {
            version: ARTIFACT_VERSION,
            feature_names: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            target: "DT".to_string(),
            estimator,
        }
    }

    /// Check the artifact matches the schema this service feeds it
    pub fn validate(&self) -> Result<(), String> {
        if self.feature_names != FEATURE_COLUMNS {
            return Err(format!(
                "feature names {:?} do not match expected {:?}",
                self.feature_names, FEATURE_COLUMNS
            ));
        }
        self.estimator.validate(self.feature_names.len())
    }
}

impl Estimator {
    fn validate(&self, n_features: usize) -> Result<(), String> {
        match self {
            Estimator::Linear(linear) => {
                if linear.coefficients.len() != n_features {
                    return Err(format!(
                        "linear model has {} coefficients, expected {}",
                        linear.coefficients.len(),
                        n_features
                    ));
                }
                Ok(())
            }
            Estimator::RandomForest(forest) => validate_trees(&forest.trees, n_features),
            Estimator::GradientBoosting(boosted) => validate_trees(&boosted.trees, n_features),
        }
    }

    fn evaluate(&self, x: &[f64]) -> Result<f64, InferenceError> {
        match self {
            Estimator::Linear(linear) => Ok(linear
                .coefficients
                .iter()
                .zip(x)
                .fold(linear.intercept, |acc, (c, v)| acc + c * v)),
            Estimator::RandomForest(forest) => {
                if forest.trees.is_empty() {
                    return Err(InferenceError::Failed("forest has no trees".to_string()));
                }
                let mut total = 0.0;
                for tree in &forest.trees {
                    total += tree.evaluate(x)?;
                }
                Ok(total / forest.trees.len() as f64)
            }
            Estimator::GradientBoosting(boosted) => {
                let mut total = 0.0;
                for tree in &boosted.trees {
                    total += tree.evaluate(x)?;
                }
                Ok(boosted.init + boosted.learning_rate * total)
            }
        }
    }
}

fn validate_trees(trees: &[RegressionTree], n_features: usize) -> Result<(), String> {
    if trees.is_empty() {
        return Err("ensemble has no trees".to_string());
    }
    trees
        .iter()
        .enumerate()
        .try_for_each(|(i, tree)| tree.validate(n_features).map_err(|e| format!("tree {}: {}", i, e)))
}

impl RegressionTree {
    fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("no nodes".to_string());
        }
        let len = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                left,
                right,
                ..
            } = node
            {
                if *feature >= n_features {
                    return Err(format!("node {} splits on feature {}", idx, feature));
                }
                for child in [*left, *right] {
                    if child <= idx || child >= len {
                        return Err(format!("node {} has invalid child {}", idx, child));
                    }
                }
            }
        }
        Ok(())
    }

    fn evaluate(&self, x: &[f64]) -> Result<f64, InferenceError> {
        let malformed = || InferenceError::Failed("malformed tree".to_string());
        let mut idx = 0;
        // Forward-only children bound the walk by the node count
        for _ in 0..self.nodes.len() {
            match self.nodes.get(idx).ok_or_else(malformed)? {
                TreeNode::Leaf { value } => return Ok(*value),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let v = x.get(*feature).ok_or_else(malformed)?;
                    idx = if *v <= *threshold { *left } else { *right };
                }
            }
        }
        Err(malformed())
    }
}

impl Predictor for ModelArtifact {
    fn predict(&self, input: &InputFrame) -> Result<Vec<f64>, InferenceError> {
        if input.rows.is_empty() {
            return Err(InferenceError::EmptyInput);
        }

        let indices = self
            .feature_names
            .iter()
            .map(|name| {
                input
                    .column_index(name)
                    .ok_or_else(|| InferenceError::MissingColumn(name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut outputs = Vec::with_capacity(input.rows.len());
        let mut x = Vec::with_capacity(indices.len());
        for (row_idx, row) in input.rows.iter().enumerate() {
            x.clear();
            for (&col, name) in indices.iter().zip(&self.feature_names) {
                let value = *row.get(col).ok_or(InferenceError::ShapeMismatch {
                    row: row_idx,
                    found: row.len(),
                    expected: input.columns.len(),
                })?;
                if !value.is_finite() {
                    return Err(InferenceError::NonFiniteInput {
                        column: name.clone(),
                        value,
                    });
                }
                x.push(value);
            }

            let y = self.estimator.evaluate(&x)?;
            if !y.is_finite() {
                return Err(InferenceError::NonFiniteOutput(y));
            }
            outputs.push(y);
        }

        Ok(outputs)
    }

    fn describe(&self) -> String {
        match &self.estimator {
            Estimator::Linear(_) => format!("linear regression -> {}", self.target),
            Estimator::RandomForest(forest) => {
                format!("random forest ({} trees) -> {}", forest.trees.len(), self.target)
            }
            Estimator::GradientBoosting(boosted) => format!(
                "gradient boosting ({} trees) -> {}",
                boosted.trees.len(),
                self.target
            ),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_forest() -> ModelArtifact {
    ModelArtifact::new(Estimator::RandomForest(ForestModel {
        trees: vec![
            RegressionTree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 0,
                        threshold: 2.4,
                        left: 1,
                        right: 2,
                    },
                    TreeNode::Leaf { value: 110.0 },
                    TreeNode::Leaf { value: 80.0 },
                ],
            },
            RegressionTree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 2,
                        threshold: 0.25,
                        left: 1,
                        right: 2,
                    },
                    TreeNode::Leaf { value: 70.0 },
                    TreeNode::Leaf { value: 100.0 },
                ],
            },
        ],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonicdt_core::FeatureVector;

    fn frame(rhob: f64, gr: f64, nphi: f64, pef: f64) -> InputFrame {
        InputFrame::single(&FeatureVector::new(rhob, gr, nphi, pef))
    }

    #[test]
    fn test_forest_averages_trees() {
        let model = sample_forest();
        assert!(model.validate().is_ok());

        // RHOB > 2.4 -> 80, NPHI <= 0.25 -> 70
        assert_eq!(model.predict(&frame(2.5, 50.0, 0.2, 5.0)).unwrap(), vec![75.0]);
        // Threshold equality goes left
        assert_eq!(model.predict(&frame(2.4, 50.0, 0.25, 5.0)).unwrap(), vec![90.0]);
    }

    #[test]
    fn test_linear_model() {
        let model = ModelArtifact::new(Estimator::Linear(LinearModel {
            coefficients: vec![-50.0, 0.1, 100.0, -2.0],
            intercept: 200.0,
        }));
        assert!(model.validate().is_ok());
        let y = model.predict(&frame(2.5, 50.0, 0.2, 5.0)).unwrap()[0];
        assert!((y - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_gradient_boosting() {
        let model = ModelArtifact::new(Estimator::GradientBoosting(BoostedModel {
            init: 80.0,
            learning_rate: 0.5,
            trees: vec![RegressionTree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 1,
                        threshold: 60.0,
                        left: 1,
                        right: 2,
                    },
                    TreeNode::Leaf { value: -4.0 },
                    TreeNode::Leaf { value: 12.0 },
                ],
            }],
        }));
        assert!(model.validate().is_ok());
        assert_eq!(model.predict(&frame(2.5, 50.0, 0.2, 5.0)).unwrap(), vec![78.0]);
        assert_eq!(model.predict(&frame(2.5, 75.0, 0.2, 5.0)).unwrap(), vec![86.0]);
    }

    #[test]
    fn test_columns_are_matched_by_name() {
        let model = sample_forest();
        let shuffled = InputFrame::new(
            vec![
                "PEF".to_string(),
                "NPHI".to_string(),
                "GR".to_string(),
                "RHOB".to_string(),
            ],
            vec![vec![5.0, 0.2, 50.0, 2.5]],
        )
        .unwrap();
        assert_eq!(model.predict(&shuffled).unwrap(), vec![75.0]);
    }

    #[test]
    fn test_missing_column() {
        let model = sample_forest();
        let partial = InputFrame::new(
            vec!["RHOB".to_string(), "GR".to_string(), "NPHI".to_string()],
            vec![vec![2.5, 50.0, 0.2]],
        )
        .unwrap();
        assert_eq!(
            model.predict(&partial).unwrap_err(),
            InferenceError::MissingColumn("PEF".to_string())
        );
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let model = sample_forest();
        let err = model.predict(&frame(2.5, f64::NAN, 0.2, 5.0)).unwrap_err();
        assert!(matches!(err, InferenceError::NonFiniteInput { ref column, .. } if column == "GR"));
    }

    #[test]
    fn test_empty_input_rejected() {
        let model = sample_forest();
        let empty = InputFrame::new(
            FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            vec![],
        )
        .unwrap();
        assert_eq!(model.predict(&empty).unwrap_err(), InferenceError::EmptyInput);
    }

    #[test]
    fn test_validate_rejects_schema_mismatch() {
        let mut model = sample_forest();
        model.feature_names = vec!["RHOB".into(), "GR".into(), "PEF".into(), "NPHI".into()];
        assert!(model.validate().unwrap_err().contains("feature names"));
    }

    #[test]
    fn test_validate_rejects_bad_trees() {
        let backwards = ModelArtifact::new(Estimator::RandomForest(ForestModel {
            trees: vec![RegressionTree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 0,
                        threshold: 1.0,
                        left: 0,
                        right: 1,
                    },
                    TreeNode::Leaf { value: 1.0 },
                ],
            }],
        }));
        assert!(backwards.validate().unwrap_err().contains("invalid child 0"));

        let bad_feature = ModelArtifact::new(Estimator::RandomForest(ForestModel {
            trees: vec![RegressionTree {
                nodes: vec![
                    TreeNode::Split {
                        feature: 7,
                        threshold: 1.0,
                        left: 1,
                        right: 2,
                    },
                    TreeNode::Leaf { value: 1.0 },
                    TreeNode::Leaf { value: 2.0 },
                ],
            }],
        }));
        assert!(bad_feature.validate().unwrap_err().contains("feature 7"));

        let empty = ModelArtifact::new(Estimator::RandomForest(ForestModel { trees: vec![] }));
        assert!(empty.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_wrong_coefficient_count() {
        let model = ModelArtifact::new(Estimator::Linear(LinearModel {
            coefficients: vec![1.0, 2.0],
            intercept: 0.0,
        }));
        assert!(model.validate().unwrap_err().contains("2 coefficients"));
    }

    #[test]
    fn test_describe() {
        assert_eq!(sample_forest().describe(), "random forest (2 trees) -> DT");
    }
}
