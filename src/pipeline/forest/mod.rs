//! Random forest classifier for the two-class spam task
//!
//! Each tree gets its own seed, drawn in order from a generator seeded with
//! `random_state`, and trees are fitted in parallel then collected in tree
//! order. The fitted forest is therefore identical to a sequential build.

mod tree;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::features::FeatureMatrix;
use super::params::ModelParams;
use super::records::Label;
use crate::error::{PipelineError, Result};

pub use tree::{DecisionTree, Node, TreeConfig};

/// A fitted forest. Never mutated after training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestModel {
    params: ModelParams,
    n_features: usize,
    feature_names: Vec<String>,
    trees: Vec<DecisionTree>,
}

/// Candidate features per node: `ceil(sqrt(n_features))`, at least one
pub fn features_per_split(n_features: usize) -> usize {
    ((n_features as f64).sqrt().ceil() as usize).max(1)
}

/// Per-tree seeds derived from the forest seed
fn tree_seeds(random_state: u64, n_trees: usize) -> Vec<u64> {
    let mut rng = ChaCha8Rng::seed_from_u64(random_state);
    (0..n_trees).map(|_| rng.gen()).collect()
}

impl RandomForestModel {
    pub fn fit(matrix: &FeatureMatrix, params: &ModelParams) -> Result<Self> {
        Self::fit_with_progress(matrix, params, || {})
    }

    /// Fit the forest, calling `on_tree` once per finished tree
    pub fn fit_with_progress<F>(
        matrix: &FeatureMatrix,
        params: &ModelParams,
        on_tree: F,
    ) -> Result<Self>
    where
        F: Fn() + Sync,
    {
        if params.n_estimators == 0 {
            return Err(PipelineError::config("n_estimators must be > 0"));
        }
        if matrix.is_empty() {
            return Err(PipelineError::training("Training matrix has no rows"));
        }
        let positives = matrix.labels.iter().filter(|l| l.is_positive()).count();
        if positives == 0 || positives == matrix.n_rows() {
            return Err(PipelineError::training(format!(
                "Training labels contain a single class ({} rows, {} positive)",
                matrix.n_rows(),
                positives
            )));
        }

        let n_rows = matrix.n_rows();
        let labels: Vec<bool> = matrix.labels.iter().map(|l| l.is_positive()).collect();
        let config = TreeConfig {
            max_depth: params.max_depth,
            min_samples_split: params.min_samples_split,
            min_samples_leaf: params.min_samples_leaf,
            max_features: features_per_split(matrix.n_features()),
        };

        let trees: Vec<DecisionTree> = tree_seeds(params.random_state, params.n_estimators)
            .into_par_iter()
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let sample: Vec<usize> = if params.bootstrap {
                    (0..n_rows).map(|_| rng.gen_range(0..n_rows)).collect()
                } else {
                    (0..n_rows).collect()
                };
                let tree = DecisionTree::fit(&matrix.rows, &labels, &sample, &config, &mut rng);
                on_tree();
                tree
            })
            .collect();

        Ok(Self {
            params: params.clone(),
            n_features: matrix.n_features(),
            feature_names: matrix.columns.clone(),
            trees,
        })
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Mean of the trees' leaf positive fractions
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.trees.iter().map(|t| t.leaf_value(row)).sum();
        sum / self.trees.len() as f64
    }

    /// Majority vote of the trees; a tied vote falls back to the mean probability
    pub fn predict(&self, row: &[f64]) -> Label {
        let votes = self.trees.iter().filter(|t| t.leaf_value(row) > 0.5).count();
        let n = self.trees.len();
        let positive = match (2 * votes).cmp(&n) {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Less => false,
            std::cmp::Ordering::Equal => self.predict_proba(row) > 0.5,
        };
        if positive {
            Label::Spam
        } else {
            Label::Ham
        }
    }

    /// Labels and positive-class probabilities for every row, in row order
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> (Vec<Label>, Vec<f64>) {
        rows.par_iter()
            .map(|row| (self.predict(row), self.predict_proba(row)))
            .unzip()
    }

    /// Impurity-based importances averaged over trees, normalized to sum to 1
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            let tree_sum: f64 = tree.importances().iter().sum();
            if tree_sum <= 0.0 {
                continue;
            }
            for (acc, imp) in total.iter_mut().zip(tree.importances()) {
                *acc += imp / tree_sum;
            }
        }
        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for v in total.iter_mut() {
                *v /= sum;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::features::feature_column_names;

    fn toy_matrix() -> FeatureMatrix {
        // Feature 0 separates the classes, feature 1 is noise
        let rows: Vec<Vec<f64>> = (0..20)
            .map(|i| vec![if i < 10 { 0.1 } else { 0.9 }, (i % 3) as f64])
            .collect();
        let labels = (0..20)
            .map(|i| if i < 10 { Label::Ham } else { Label::Spam })
            .collect();
        FeatureMatrix::new(feature_column_names(2), rows, labels).unwrap()
    }

    #[test]
    fn test_features_per_split() {
        assert_eq!(features_per_split(0), 1);
        assert_eq!(features_per_split(1), 1);
        assert_eq!(features_per_split(50), 8);
        assert_eq!(features_per_split(100), 10);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let matrix = toy_matrix();
        let params = ModelParams::new(7, 2);
        let a = RandomForestModel::fit(&matrix, &params).unwrap();
        let b = RandomForestModel::fit(&matrix, &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_learns_separable_data() {
        let matrix = toy_matrix();
        let model = RandomForestModel::fit(&matrix, &ModelParams::new(15, 1)).unwrap();

        let (labels, probs) = model.predict_batch(&matrix.rows);
        assert_eq!(labels, matrix.labels);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));

        let importances = model.feature_importances();
        assert!(importances[0] > importances[1]);
    }

    #[test]
    fn test_progress_called_per_tree() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let counter = AtomicUsize::new(0);
        RandomForestModel::fit_with_progress(&toy_matrix(), &ModelParams::new(5, 0), || {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
        assert_eq!(counter.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_single_class_rejected() {
        let matrix = FeatureMatrix::new(
            feature_column_names(1),
            vec![vec![0.0], vec![1.0]],
            vec![Label::Ham, Label::Ham],
        )
        .unwrap();
        assert!(matches!(
            RandomForestModel::fit(&matrix, &ModelParams::new(3, 0)),
            Err(PipelineError::Training(_))
        ));
    }

    #[test]
    fn test_empty_matrix_rejected() {
        let matrix = FeatureMatrix::new(feature_column_names(1), vec![], vec![]).unwrap();
        assert!(matches!(
            RandomForestModel::fit(&matrix, &ModelParams::new(3, 0)),
            Err(PipelineError::Training(_))
        ));
    }

    #[test]
    fn test_serde_round_trip_preserves_predictions() {
        let matrix = toy_matrix();
        let model = RandomForestModel::fit(&matrix, &ModelParams::new(4, 9)).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let back: RandomForestModel = serde_json::from_str(&json).unwrap();

        let (labels, probs) = model.predict_batch(&matrix.rows);
        let (back_labels, back_probs) = back.predict_batch(&matrix.rows);
        assert_eq!(back_labels, labels);
        for (a, b) in probs.iter().zip(&back_probs) {
            assert!((a - b).abs() < 1e-12);
        }
        assert_eq!(back.trees().len(), 4);
    }
}
