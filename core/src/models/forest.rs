use crate::models::tree::{RegressionTree, TreeConfig};
use crate::models::TabularModel;
use crate::prelude::{CoreError, CoreResult};
use crate::telemetry::RootCause;
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Fit settings for the root-cause forests.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Weight samples inversely to their class frequency.
    pub balanced_weights: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
            balanced_weights: true,
            seed: 42,
        }
    }
}

/// Bootstrap forest of regression trees averaged into a probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    pub threshold: f64,
}

impl RandomForest {
    pub fn fit(x: ArrayView2<f64>, y: ArrayView1<f64>, config: &ForestConfig) -> CoreResult<Self> {
        let rows = x.nrows();
        if rows == 0 {
            return Err(CoreError::InvalidInput(
                "empty classification training set".to_string(),
            ));
        }
        if y.len() != rows {
            return Err(CoreError::InvalidInput(format!(
                "feature rows ({}) and labels ({}) disagree",
                rows,
                y.len()
            )));
        }

        let weights = if config.balanced_weights {
            class_balanced_weights(y)
        } else {
            vec![1.0; rows]
        };
        let subsample = ((x.ncols() as f64).sqrt().round() as usize).max(1);
        let tree_config = TreeConfig {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            feature_subsample: Some(subsample),
        };

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut trees = Vec::with_capacity(config.n_estimators);
        for _ in 0..config.n_estimators {
            let sample: Vec<usize> = (0..rows).map(|_| rng.gen_range(0..rows)).collect();
            let x_sample = x.select(Axis(0), &sample);
            let y_sample = y.select(Axis(0), &sample);
            let w_sample: Vec<f64> = sample.iter().map(|&row| weights[row]).collect();
            trees.push(RegressionTree::fit(
                x_sample.view(),
                y_sample.view(),
                &w_sample,
                &tree_config,
                &mut rng,
            ));
        }

        Ok(Self {
            trees,
            threshold: 0.5,
        })
    }

    pub fn predict_proba_one(&self, row: ArrayView1<f64>) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: f64 = self.trees.iter().map(|tree| tree.predict_one(row)).sum();
        (total / self.trees.len() as f64).clamp(0.0, 1.0)
    }

    pub fn predict_label(&self, row: ArrayView1<f64>) -> u8 {
        u8::from(self.predict_proba_one(row) >= self.threshold)
    }

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

impl TabularModel for RandomForest {
    fn predict_one(&self, row: ArrayView1<f64>) -> f64 {
        self.predict_proba_one(row)
    }
}

/// Inverse-frequency sample weights for a 0/1 target; a single-class
/// target degrades to uniform weights.
fn class_balanced_weights(y: ArrayView1<f64>) -> Vec<f64> {
    let rows = y.len();
    let positives = y.iter().filter(|&&label| label >= 0.5).count();
    let negatives = rows - positives;
    if positives == 0 || negatives == 0 {
        return vec![1.0; rows];
    }
    let positive_weight = rows as f64 / (2.0 * positives as f64);
    let negative_weight = rows as f64 / (2.0 * negatives as f64);
    y.iter()
        .map(|&label| {
            if label >= 0.5 {
                positive_weight
            } else {
                negative_weight
            }
        })
        .collect()
}

/// One forest per root-cause label; the one-hot targets are independently
/// settable, so each label trains on its own column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiLabelForest {
    pub causes: Vec<RootCause>,
    forests: Vec<RandomForest>,
}

impl MultiLabelForest {
    pub fn fit(
        x: ArrayView2<f64>,
        y: ArrayView2<f64>,
        causes: &[RootCause],
        config: &ForestConfig,
    ) -> CoreResult<Self> {
        if y.ncols() != causes.len() {
            return Err(CoreError::InvalidInput(format!(
                "target columns ({}) and cause labels ({}) disagree",
                y.ncols(),
                causes.len()
            )));
        }
        let mut forests = Vec::with_capacity(causes.len());
        for (column, _) in causes.iter().enumerate() {
            let per_label = ForestConfig {
                seed: config.seed.wrapping_add(column as u64),
                ..config.clone()
            };
            forests.push(RandomForest::fit(x, y.column(column), &per_label)?);
        }
        Ok(Self {
            causes: causes.to_vec(),
            forests,
        })
    }

    /// Per-row, per-cause label predictions.
    pub fn predict(&self, x: ArrayView2<f64>) -> Array2<u8> {
        let mut out = Array2::zeros((x.nrows(), self.forests.len()));
        for (row_index, row) in x.rows().into_iter().enumerate() {
            for (column, forest) in self.forests.iter().enumerate() {
                out[[row_index, column]] = forest.predict_label(row);
            }
        }
        out
    }

    /// Importances averaged across the per-cause forests.
    pub fn mean_feature_importances(&self, n_features: usize) -> Vec<f64> {
        let mut totals = vec![0.0; n_features];
        if self.forests.is_empty() {
            return totals;
        }
        for forest in &self.forests {
            for (feature, value) in forest.feature_importances(n_features).iter().enumerate() {
                totals[feature] += value;
            }
        }
        for total in &mut totals {
            *total /= self.forests.len() as f64;
        }
        totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array2};

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [-2.0, 0.3],
            [-1.5, 0.1],
            [-1.0, 0.7],
            [-0.5, 0.2],
            [0.5, 0.9],
            [1.0, 0.4],
            [1.5, 0.6],
            [2.0, 0.8],
        ];
        let y = array![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        (x, y)
    }

    #[test]
    fn forest_separates_a_linear_boundary() {
        let (x, y) = separable();
        let config = ForestConfig {
            n_estimators: 25,
            ..ForestConfig::default()
        };
        let forest = RandomForest::fit(x.view(), y.view(), &config).unwrap();
        assert_eq!(forest.predict_label(array![-1.2, 0.5].view()), 0);
        assert_eq!(forest.predict_label(array![1.2, 0.5].view()), 1);
    }

    #[test]
    fn single_class_target_degrades_to_uniform_weights() {
        let y = array![1.0, 1.0, 1.0];
        assert_eq!(class_balanced_weights(y.view()), vec![1.0, 1.0, 1.0]);
        let y = array![0.0, 0.0, 1.0, 1.0];
        let weights = class_balanced_weights(y.view());
        assert!((weights[0] - 1.0).abs() < 1e-12);
        assert!((weights[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn multi_label_forest_predicts_one_column_per_cause() {
        let (x, y_binary) = separable();
        let mut y = Array2::zeros((x.nrows(), RootCause::ALL.len()));
        for (row, &label) in y_binary.iter().enumerate() {
            y[[row, RootCause::MemoryLeak.index()]] = label;
        }
        let config = ForestConfig {
            n_estimators: 10,
            ..ForestConfig::default()
        };
        let model = MultiLabelForest::fit(x.view(), y.view(), &RootCause::ALL, &config).unwrap();
        let predicted = model.predict(x.view());
        assert_eq!(predicted.dim(), (8, RootCause::ALL.len()));
        assert_eq!(predicted[[0, RootCause::MemoryLeak.index()]], 0);
        assert_eq!(predicted[[7, RootCause::MemoryLeak.index()]], 1);
    }
}
