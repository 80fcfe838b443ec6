use crate::models::TabularModel;
use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Limits for a single fitted tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Candidate features examined per split; `None` scans all of them.
    pub feature_subsample: Option<usize>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            min_samples_split: 2,
            feature_subsample: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

/// Depth-limited regression tree fitted by weighted variance reduction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Node,
    /// Squared-error reduction credited to each feature during fitting.
    importances: Vec<f64>,
}

struct FitContext<'x, 'y, 'w, 'c> {
    x: ArrayView2<'x, f64>,
    y: ArrayView1<'y, f64>,
    weights: &'w [f64],
    config: &'c TreeConfig,
}

impl RegressionTree {
    /// Fits on the given rows; `weights` must hold one weight per row.
    pub fn fit(
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        weights: &[f64],
        config: &TreeConfig,
        rng: &mut StdRng,
    ) -> Self {
        let mut importances = vec![0.0; x.ncols()];
        let indices: Vec<usize> = (0..x.nrows()).collect();
        let context = FitContext {
            x,
            y,
            weights,
            config,
        };
        let root = build_node(&context, &indices, 0, rng, &mut importances);
        Self { root, importances }
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.importances
    }
}

impl TabularModel for RegressionTree {
    fn predict_one(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

fn weighted_moments(context: &FitContext<'_, '_, '_, '_>, indices: &[usize]) -> (f64, f64, f64) {
    let mut total_weight = 0.0;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for &index in indices {
        let weight = context.weights[index];
        let label = context.y[index];
        total_weight += weight;
        sum += weight * label;
        sum_sq += weight * label * label;
    }
    (total_weight, sum, sum_sq)
}

fn build_node(
    context: &FitContext<'_, '_, '_, '_>,
    indices: &[usize],
    depth: usize,
    rng: &mut StdRng,
    importances: &mut Vec<f64>,
) -> Node {
    let (total_weight, sum, sum_sq) = weighted_moments(context, indices);
    let mean = if total_weight > 0.0 {
        sum / total_weight
    } else {
        0.0
    };
    if depth >= context.config.max_depth
        || indices.len() < context.config.min_samples_split.max(2)
        || total_weight <= 0.0
    {
        return Node::Leaf { value: mean };
    }
    let parent_sse = (sum_sq - sum * sum / total_weight).max(0.0);
    if parent_sse <= 1e-12 {
        return Node::Leaf { value: mean };
    }

    let n_features = context.x.ncols();
    let mut candidates: Vec<usize> = (0..n_features).collect();
    if let Some(limit) = context.config.feature_subsample {
        if limit < n_features {
            candidates.shuffle(rng);
            candidates.truncate(limit.max(1));
        }
    }

    let mut best: Option<(usize, f64, f64)> = None; // (feature, threshold, gain)
    let mut order = indices.to_vec();
    for &feature in &candidates {
        order.sort_by(|&a, &b| {
            context.x[[a, feature]]
                .partial_cmp(&context.x[[b, feature]])
                .unwrap_or(Ordering::Equal)
        });
        let mut left_weight = 0.0;
        let mut left_sum = 0.0;
        let mut left_sum_sq = 0.0;
        for position in 0..order.len() - 1 {
            let index = order[position];
            let weight = context.weights[index];
            let label = context.y[index];
            left_weight += weight;
            left_sum += weight * label;
            left_sum_sq += weight * label * label;

            let value = context.x[[index, feature]];
            let next = context.x[[order[position + 1], feature]];
            if next == value {
                continue;
            }
            let right_weight = total_weight - left_weight;
            if left_weight <= 0.0 || right_weight <= 0.0 {
                continue;
            }
            let left_sse = (left_sum_sq - left_sum * left_sum / left_weight).max(0.0);
            let right_sum = sum - left_sum;
            let right_sum_sq = sum_sq - left_sum_sq;
            let right_sse = (right_sum_sq - right_sum * right_sum / right_weight).max(0.0);
            let gain = parent_sse - left_sse - right_sse;
            if gain > 1e-12 && best.map_or(true, |(_, _, best_gain)| gain > best_gain) {
                best = Some((feature, (value + next) / 2.0, gain));
            }
        }
    }

    match best {
        None => Node::Leaf { value: mean },
        Some((feature, threshold, gain)) => {
            importances[feature] += gain;
            let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                .iter()
                .copied()
                .partition(|&index| context.x[[index, feature]] <= threshold);
            let left = build_node(context, &left_indices, depth + 1, rng, importances);
            let right = build_node(context, &right_indices, depth + 1, rng, importances);
            Node::Split {
                feature,
                threshold,
                left: Box::new(left),
                right: Box::new(right),
            }
        }
    }
}
