use crate::dataset::root_cause::RootCauseDataset;
use crate::dataset::sequence::SequenceDataset;
use crate::telemetry::RootCause;
use ndarray::{Array1, Array2, Array3, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Shuffled train/test index split.
pub fn split_indices(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let test_len = ((n as f64) * test_fraction).round() as usize;
    let test_len = test_len.min(n);
    let (test, train) = indices.split_at(test_len);
    (train.to_vec(), test.to_vec())
}

/// Stratified variant keeping the binary label mix in both halves.
pub fn stratified_indices(
    labels: &[u8],
    test_fraction: f64,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for class in [0u8, 1u8] {
        let mut class_indices: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, &label)| label == class)
            .map(|(index, _)| index)
            .collect();
        class_indices.shuffle(&mut rng);
        let test_len = ((class_indices.len() as f64) * test_fraction).round() as usize;
        let test_len = test_len.min(class_indices.len());
        test.extend_from_slice(&class_indices[..test_len]);
        train.extend_from_slice(&class_indices[test_len..]);
    }
    train.shuffle(&mut rng);
    test.shuffle(&mut rng);
    (train, test)
}

/// On-disk dump of the sequence train/test split.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceSplit {
    pub x_train: Array3<f64>,
    pub x_test: Array3<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
}

impl SequenceSplit {
    pub fn from_dataset(dataset: &SequenceDataset, test_fraction: f64, seed: u64) -> Self {
        let labels: Vec<u8> = dataset.y.iter().map(|&label| (label >= 0.5) as u8).collect();
        let (train, test) = stratified_indices(&labels, test_fraction, seed);
        Self {
            x_train: dataset.x.select(Axis(0), &train),
            x_test: dataset.x.select(Axis(0), &test),
            y_train: dataset.y.select(Axis(0), &train),
            y_test: dataset.y.select(Axis(0), &test),
        }
    }
}

/// On-disk dump of the root-cause train/test split.
///
/// Preprocessing always writes this file; a zero-row split means "no
/// anomalies existed", which the trainer handles by skipping, while a
/// missing file means preprocessing has not run at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabularSplit {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array2<f64>,
    pub y_test: Array2<f64>,
    pub causes: Vec<RootCause>,
}

impl TabularSplit {
    pub fn from_dataset(dataset: &RootCauseDataset, test_fraction: f64, seed: u64) -> Self {
        let (train, test) = split_indices(dataset.x.nrows(), test_fraction, seed);
        Self {
            x_train: dataset.x.select(Axis(0), &train),
            x_test: dataset.x.select(Axis(0), &test),
            y_train: dataset.y.select(Axis(0), &train),
            y_test: dataset.y.select(Axis(0), &test),
            causes: dataset.causes.clone(),
        }
    }

    pub fn empty(n_features: usize) -> Self {
        let n_causes = RootCause::ALL.len();
        Self {
            x_train: Array2::zeros((0, n_features)),
            x_test: Array2::zeros((0, n_features)),
            y_train: Array2::zeros((0, n_causes)),
            y_test: Array2::zeros((0, n_causes)),
            causes: RootCause::ALL.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn split_partitions_all_indices() {
        let (train, test) = split_indices(10, 0.2, 42);
        assert_eq!(train.len(), 8);
        assert_eq!(test.len(), 2);
        let all: HashSet<usize> = train.iter().chain(test.iter()).copied().collect();
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn split_is_deterministic_for_a_seed() {
        assert_eq!(split_indices(20, 0.2, 7), split_indices(20, 0.2, 7));
        assert_ne!(split_indices(20, 0.2, 7).1, split_indices(20, 0.2, 8).1);
    }

    #[test]
    fn stratified_split_preserves_the_class_mix() {
        let mut labels = vec![0u8; 10];
        labels.extend(vec![1u8; 10]);
        let (train, test) = stratified_indices(&labels, 0.2, 42);
        assert_eq!(train.len(), 16);
        assert_eq!(test.len(), 4);
        let positives_in_test = test.iter().filter(|&&index| labels[index] == 1).count();
        assert_eq!(positives_in_test, 2);
    }
}
