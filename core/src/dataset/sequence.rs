use crate::features::FeatureTable;
use ndarray::{s, Array1, Array3};

/// Sliding feature windows paired with a binary label offset
/// `prediction_horizon` rows past the window end.
#[derive(Debug, Clone)]
pub struct SequenceDataset {
    /// windows x sequence_length x features
    pub x: Array3<f64>,
    pub y: Array1<f64>,
}

impl SequenceDataset {
    pub fn len(&self) -> usize {
        self.x.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Slides a fixed-width window across the table with stride 1.
///
/// For a table of `n` rows the result holds `max(0, n - L - H + 1)`
/// windows; the label of window `k` is the anomaly flag at row
/// `k + L + H - 1`. A table shorter than `L + H` yields an empty dataset,
/// not an error.
pub fn build_sequence_dataset(
    table: &FeatureTable,
    sequence_length: usize,
    prediction_horizon: usize,
) -> SequenceDataset {
    let n = table.len();
    let n_features = table.features.ncols();
    let needed = sequence_length + prediction_horizon;
    if sequence_length == 0 || n < needed {
        return SequenceDataset {
            x: Array3::zeros((0, sequence_length, n_features)),
            y: Array1::zeros(0),
        };
    }

    let count = n - needed + 1;
    let mut x = Array3::zeros((count, sequence_length, n_features));
    let mut y = Array1::zeros(count);
    for window in 0..count {
        x.slice_mut(s![window, .., ..])
            .assign(&table.features.slice(s![window..window + sequence_length, ..]));
        y[window] = table.anomaly[window + needed - 1] as f64;
    }
    SequenceDataset { x, y }
}
