use ndarray::ArrayView1;
use serde::Serialize;

/// Binary classification tallies at a fixed threshold.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support_positive: usize,
    pub support_negative: usize,
}

impl ClassificationReport {
    pub fn summary(&self) -> String {
        format!(
            "accuracy {:.3} precision {:.3} recall {:.3} f1 {:.3} (support {}+/{}-)",
            self.accuracy,
            self.precision,
            self.recall,
            self.f1,
            self.support_positive,
            self.support_negative
        )
    }
}

pub fn classification_metrics(truth: &[u8], predicted: &[u8]) -> ClassificationReport {
    let mut true_positive = 0usize;
    let mut false_positive = 0usize;
    let mut true_negative = 0usize;
    let mut false_negative = 0usize;
    for (&actual, &guess) in truth.iter().zip(predicted) {
        match (actual, guess) {
            (1, 1) => true_positive += 1,
            (0, 1) => false_positive += 1,
            (0, 0) => true_negative += 1,
            _ => false_negative += 1,
        }
    }
    let total = truth.len().max(1);
    let accuracy = (true_positive + true_negative) as f64 / total as f64;
    let precision = safe_fraction(true_positive, true_positive + false_positive);
    let recall = safe_fraction(true_positive, true_positive + false_negative);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    ClassificationReport {
        accuracy,
        precision,
        recall,
        f1,
        support_positive: true_positive + false_negative,
        support_negative: true_negative + false_positive,
    }
}

fn safe_fraction(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

pub fn mean_absolute_error(truth: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    truth
        .iter()
        .zip(predicted.iter())
        .map(|(&actual, &guess)| (actual - guess).abs())
        .sum::<f64>()
        / truth.len() as f64
}

pub fn root_mean_squared_error(truth: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let mean_squared = truth
        .iter()
        .zip(predicted.iter())
        .map(|(&actual, &guess)| (actual - guess) * (actual - guess))
        .sum::<f64>()
        / truth.len() as f64;
    mean_squared.sqrt()
}

pub fn r2_score(truth: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let mean = truth.sum() / truth.len() as f64;
    let total: f64 = truth.iter().map(|&actual| (actual - mean) * (actual - mean)).sum();
    if total == 0.0 {
        return 0.0;
    }
    let residual: f64 = truth
        .iter()
        .zip(predicted.iter())
        .map(|(&actual, &guess)| (actual - guess) * (actual - guess))
        .sum();
    1.0 - residual / total
}

/// Inverse-frequency weights `n / (2 * n_class)` for a binary target;
/// `None` when only one class is present.
pub fn balanced_class_weights(labels: &[u8]) -> Option<[f64; 2]> {
    let total = labels.len();
    let positives = labels.iter().filter(|&&label| label == 1).count();
    let negatives = total - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }
    Some([
        total as f64 / (2.0 * negatives as f64),
        total as f64 / (2.0 * positives as f64),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn report_counts_a_known_confusion() {
        let truth = [1, 1, 0, 0, 1, 0];
        let predicted = [1, 0, 0, 1, 1, 0];
        let report = classification_metrics(&truth, &predicted);
        assert!((report.accuracy - 4.0 / 6.0).abs() < 1e-12);
        assert!((report.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.recall - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(report.support_positive, 3);
        assert_eq!(report.support_negative, 3);
    }

    #[test]
    fn degenerate_predictions_do_not_divide_by_zero() {
        let report = classification_metrics(&[0, 0], &[0, 0]);
        assert_eq!(report.precision, 0.0);
        assert_eq!(report.recall, 0.0);
        assert_eq!(report.f1, 0.0);
        assert_eq!(report.accuracy, 1.0);
    }

    #[test]
    fn regression_metrics_on_a_perfect_fit() {
        let truth = array![1.0, 2.0, 3.0];
        let predicted = array![1.0, 2.0, 3.0];
        assert_eq!(mean_absolute_error(truth.view(), predicted.view()), 0.0);
        assert_eq!(root_mean_squared_error(truth.view(), predicted.view()), 0.0);
        assert_eq!(r2_score(truth.view(), predicted.view()), 1.0);
    }

    #[test]
    fn class_weights_are_inverse_frequency() {
        let labels = [0, 0, 0, 0, 0, 0, 0, 0, 1, 1];
        let weights = balanced_class_weights(&labels).unwrap();
        assert!((weights[0] - 0.625).abs() < 1e-12);
        assert!((weights[1] - 2.5).abs() < 1e-12);
        assert!(balanced_class_weights(&[0, 0, 0]).is_none());
    }
}
