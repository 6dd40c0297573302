//! CART classification tree over dense `f64` rows
//!
//! Nodes live in a flat arena (`nodes[0]` is the root) so a serialized tree
//! has constant nesting depth regardless of how deep it grows.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// `None` grows until leaves are pure or too small to split
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Candidate features drawn at each node
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        /// Fraction of positive samples that reached this leaf
        positive_fraction: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        /// Rows with `value <= threshold` go left
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    /// Total impurity decrease per feature, weighted by node size
    importances: Vec<f64>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Gini impurity of a binary node with `positives` out of `n`
fn gini(positives: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = positives as f64 / n as f64;
    2.0 * p * (1.0 - p)
}

struct Builder<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [bool],
    config: &'a TreeConfig,
    n_features: usize,
    nodes: Vec<Node>,
    importances: Vec<f64>,
}

impl DecisionTree {
    /// Grow a tree on the rows listed in `sample` (indices may repeat).
    ///
    /// `rng` drives the per-node feature draw.
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[bool],
        sample: &[usize],
        config: &TreeConfig,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let n_features = rows.first().map_or(0, |r| r.len());
        let mut builder = Builder {
            rows,
            labels,
            config,
            n_features,
            nodes: Vec::new(),
            importances: vec![0.0; n_features],
        };
        builder.grow(sample.to_vec(), 0, rng);

        Self {
            nodes: builder.nodes,
            importances: builder.importances,
        }
    }

    /// Positive fraction of the leaf reached by `row`
    pub fn leaf_value(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf {
                    positive_fraction, ..
                } => return *positive_fraction,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row.get(*feature).copied().unwrap_or(0.0);
                    idx = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn importances(&self) -> &[f64] {
        &self.importances
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 1,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }
}

impl Builder<'_> {
    /// Grow the subtree for `indices`, returning its node index
    fn grow(&mut self, indices: Vec<usize>, depth: usize, rng: &mut ChaCha8Rng) -> usize {
        let n = indices.len();
        let positives = indices.iter().filter(|&&i| self.labels[i]).count();
        let impurity = gini(positives, n);

        let at_depth_limit = self.config.max_depth.is_some_and(|d| depth >= d);
        if at_depth_limit || n < self.config.min_samples_split || impurity <= 0.0 {
            return self.leaf(positives, n);
        }

        let Some(split) = self.find_best_split(&indices, impurity, rng) else {
            return self.leaf(positives, n);
        };

        self.importances[split.feature] += split.gain * n as f64;

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.rows[i][split.feature] <= split.threshold);

        // Reserve the slot so the parent precedes its children
        let slot = self.nodes.len();
        self.nodes.push(Node::Leaf {
            positive_fraction: 0.0,
            n_samples: n,
        });
        let left = self.grow(left_idx, depth + 1, rng);
        let right = self.grow(right_idx, depth + 1, rng);
        self.nodes[slot] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        slot
    }

    fn leaf(&mut self, positives: usize, n: usize) -> usize {
        let positive_fraction = if n == 0 {
            0.0
        } else {
            positives as f64 / n as f64
        };
        self.nodes.push(Node::Leaf {
            positive_fraction,
            n_samples: n,
        });
        self.nodes.len() - 1
    }

    /// Best Gini split over midpoints of sorted distinct values.
    ///
    /// Features are visited in a random order. The search stops after
    /// `max_features` features once a valid split has been found, and keeps
    /// drawing otherwise.
    fn find_best_split(
        &self,
        indices: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(rng);

        let n = indices.len();
        let total_pos = indices.iter().filter(|&&i| self.labels[i]).count();
        let min_leaf = self.config.min_samples_leaf;

        let mut best: Option<BestSplit> = None;
        let mut best_gain = 0.0;
        let mut values: Vec<(f64, bool)> = Vec::with_capacity(n);

        for (visited, &feature) in features.iter().enumerate() {
            if visited >= self.config.max_features && best.is_some() {
                break;
            }

            values.clear();
            values.extend(indices.iter().map(|&i| (self.rows[i][feature], self.labels[i])));
            values.sort_by(|a, b| a.0.total_cmp(&b.0));

            // Sweep thresholds left to right
            let mut left_pos = 0;
            for k in 0..n - 1 {
                if values[k].1 {
                    left_pos += 1;
                }
                if values[k].0 == values[k + 1].0 {
                    continue;
                }
                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let weighted = (n_left as f64 * gini(left_pos, n_left)
                    + n_right as f64 * gini(total_pos - left_pos, n_right))
                    / n as f64;
                let gain = parent_impurity - weighted;

                if gain > best_gain {
                    best_gain = gain;
                    best = Some(BestSplit {
                        feature,
                        threshold: (values[k].0 + values[k + 1].0) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}
