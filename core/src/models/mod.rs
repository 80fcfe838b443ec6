pub mod boosted;
pub mod forest;
pub mod metrics;
pub mod sequence;
pub mod tree;

pub use boosted::{BoostedConfig, GradientBoostedRegressor};
pub use forest::{ForestConfig, MultiLabelForest, RandomForest};
pub use metrics::{
    balanced_class_weights, classification_metrics, mean_absolute_error, r2_score,
    root_mean_squared_error, ClassificationReport,
};
pub use sequence::{RecurrentClassifier, SequenceModelConfig};
pub use tree::{RegressionTree, TreeConfig};

use ndarray::{Array1, ArrayView1, ArrayView2};

/// Prediction seam shared by the tabular models.
pub trait TabularModel {
    fn predict_one(&self, row: ArrayView1<f64>) -> f64;

    fn predict(&self, x: ArrayView2<f64>) -> Array1<f64> {
        let predictions: Vec<f64> = x.rows().into_iter().map(|row| self.predict_one(row)).collect();
        Array1::from_vec(predictions)
    }
}
