use crate::math::stats::StatsHelper;
use crate::models::tree::{RegressionTree, TreeConfig};
use crate::models::TabularModel;
use crate::prelude::{CoreError, CoreResult};
use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Fit settings for the gradient-boosted lifetime regressor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostedConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for BoostedConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            learning_rate: 0.1,
            max_depth: 5,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

/// Least-squares gradient boosting over depth-limited regression trees.
///
/// Each stage fits a tree to the residual of the running prediction and
/// contributes `learning_rate` of its output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoostedRegressor {
    base: f64,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedRegressor {
    pub fn fit(
        x: ArrayView2<f64>,
        y: ArrayView1<f64>,
        config: &BoostedConfig,
    ) -> CoreResult<Self> {
        let rows = x.nrows();
        if rows == 0 {
            return Err(CoreError::InvalidInput(
                "empty lifetime training set".to_string(),
            ));
        }
        if y.len() != rows {
            return Err(CoreError::InvalidInput(format!(
                "feature rows ({}) and labels ({}) disagree",
                rows,
                y.len()
            )));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let weights = vec![1.0; rows];
        let tree_config = TreeConfig {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            feature_subsample: None,
        };
        let labels: Vec<f64> = y.iter().copied().collect();
        let base = StatsHelper::mean(&labels);
        let mut predictions = vec![base; rows];
        let mut trees = Vec::with_capacity(config.n_estimators);

        for _ in 0..config.n_estimators {
            let residuals: Array1<f64> = y
                .iter()
                .zip(&predictions)
                .map(|(&label, &prediction)| label - prediction)
                .collect();
            let tree =
                RegressionTree::fit(x, residuals.view(), &weights, &tree_config, &mut rng);
            for (row, prediction) in predictions.iter_mut().enumerate() {
                *prediction += config.learning_rate * tree.predict_one(x.row(row));
            }
            trees.push(tree);
        }

        Ok(Self {
            base,
            learning_rate: config.learning_rate,
            trees,
        })
    }

    /// Mean per-feature split gain across all stages, normalized to sum
    /// to 1 when any split occurred.
    pub fn feature_importances(&self, n_features: usize) -> Vec<f64> {
        let mut totals = vec![0.0; n_features];
        for tree in &self.trees {
            for (feature, gain) in tree.feature_importances().iter().enumerate() {
                if feature < n_features {
                    totals[feature] += gain;
                }
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            for total in &mut totals {
                *total /= sum;
            }
        }
        totals
    }
}

impl TabularModel for GradientBoostedRegressor {
    fn predict_one(&self, row: ArrayView1<f64>) -> f64 {
        let boosted: f64 = self
            .trees
            .iter()
            .map(|tree| tree.predict_one(row))
            .sum::<f64>();
        self.base + self.learning_rate * boosted
    }
}
