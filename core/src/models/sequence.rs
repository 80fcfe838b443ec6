use crate::prelude::{CoreError, CoreResult};
use log::debug;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, ArrayView3, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Fit settings for the recurrent anomaly classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceModelConfig {
    pub hidden_units: usize,
    pub epochs: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for SequenceModelConfig {
    fn default() -> Self {
        Self {
            hidden_units: 16,
            epochs: 30,
            learning_rate: 0.05,
            seed: 42,
        }
    }
}

const GRADIENT_CLIP: f64 = 5.0;
const STD_FLOOR: f64 = 1e-6;

/// Recurrent binary classifier over engineered feature windows.
///
/// A single tanh recurrent layer feeds a sigmoid head. Inputs are
/// standardized with statistics captured from the training split, and the
/// loss is class-weighted binary cross-entropy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrentClassifier {
    w_xh: Array2<f64>,
    w_hh: Array2<f64>,
    b_h: Array1<f64>,
    w_ho: Array1<f64>,
    b_o: f64,
    feature_mean: Array1<f64>,
    feature_std: Array1<f64>,
    pub sequence_length: usize,
    pub n_features: usize,
}

impl RecurrentClassifier {
    pub fn input_shape(&self) -> [usize; 2] {
        [self.sequence_length, self.n_features]
    }

    pub fn fit(
        x: ArrayView3<f64>,
        y: ArrayView1<f64>,
        class_weights: [f64; 2],
        config: &SequenceModelConfig,
    ) -> CoreResult<Self> {
        let (windows, sequence_length, n_features) = x.dim();
        if windows == 0 {
            return Err(CoreError::InvalidInput(
                "empty sequence training set".to_string(),
            ));
        }
        if sequence_length == 0 {
            return Err(CoreError::InvalidInput(
                "sequence windows must hold at least one row".to_string(),
            ));
        }
        if y.len() != windows {
            return Err(CoreError::InvalidInput(format!(
                "windows ({}) and labels ({}) disagree",
                windows,
                y.len()
            )));
        }
        let hidden = config.hidden_units.max(1);

        // Standardization statistics over every timestep of the training
        // windows.
        let mut mean: Array1<f64> = Array1::zeros(n_features);
        let mut sum_sq: Array1<f64> = Array1::zeros(n_features);
        let samples = (windows * sequence_length) as f64;
        for window in x.axis_iter(Axis(0)) {
            for row in window.rows() {
                for (feature, &value) in row.iter().enumerate() {
                    mean[feature] += value;
                    sum_sq[feature] += value * value;
                }
            }
        }
        mean.mapv_inplace(|total| total / samples);
        let mut std = Array1::zeros(n_features);
        for feature in 0..n_features {
            let variance = (sum_sq[feature] / samples - mean[feature] * mean[feature]).max(0.0);
            std[feature] = variance.sqrt().max(STD_FLOOR);
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let input_scale = (1.0 / n_features.max(1) as f64).sqrt();
        let hidden_scale = (1.0 / hidden as f64).sqrt();
        let mut model = Self {
            w_xh: Array2::from_shape_fn((hidden, n_features), |_| {
                rng.gen_range(-input_scale..input_scale)
            }),
            w_hh: Array2::from_shape_fn((hidden, hidden), |_| {
                rng.gen_range(-hidden_scale..hidden_scale)
            }),
            b_h: Array1::zeros(hidden),
            w_ho: Array1::from_shape_fn(hidden, |_| rng.gen_range(-hidden_scale..hidden_scale)),
            b_o: 0.0,
            feature_mean: mean,
            feature_std: std,
            sequence_length,
            n_features,
        };

        let mut order: Vec<usize> = (0..windows).collect();
        for epoch in 0..config.epochs {
            order.shuffle(&mut rng);
            let mut epoch_loss = 0.0;
            for &window_index in &order {
                let window = model.standardize(x.index_axis(Axis(0), window_index));
                let label = y[window_index];
                let weight = class_weights[usize::from(label >= 0.5)];
                epoch_loss +=
                    model.train_window(window.view(), label, weight, config.learning_rate);
            }
            debug!(
                "sequence fit epoch {} mean loss {:.5}",
                epoch,
                epoch_loss / windows as f64
            );
        }
        Ok(model)
    }

    fn standardize(&self, window: ArrayView2<f64>) -> Array2<f64> {
        let mut out = window.to_owned();
        for mut row in out.rows_mut() {
            row -= &self.feature_mean;
            row /= &self.feature_std;
        }
        out
    }

    /// Forward pass returning the output probability and the hidden state
    /// after each timestep.
    fn forward(&self, window: ArrayView2<f64>) -> (f64, Vec<Array1<f64>>) {
        let hidden = self.b_h.len();
        let mut state = Array1::zeros(hidden);
        let mut states = Vec::with_capacity(window.nrows());
        for row in window.rows() {
            let pre = self.w_xh.dot(&row) + self.w_hh.dot(&state) + &self.b_h;
            state = pre.mapv(f64::tanh);
            states.push(state.clone());
        }
        let logit = self.w_ho.dot(&state) + self.b_o;
        (sigmoid(logit), states)
    }

    /// One SGD step on a single window; returns the weighted loss.
    fn train_window(
        &mut self,
        window: ArrayView2<f64>,
        label: f64,
        weight: f64,
        learning_rate: f64,
    ) -> f64 {
        let (probability, states) = self.forward(window);
        let loss = -weight
            * (label * probability.max(1e-12).ln()
                + (1.0 - label) * (1.0 - probability).max(1e-12).ln());

        // Output layer.
        let d_logit = weight * (probability - label);
        let last_state = &states[states.len() - 1];
        let grad_w_ho = last_state.mapv(|h| clip(d_logit * h));
        let grad_b_o = clip(d_logit);
        let mut d_state = self.w_ho.mapv(|w| w * d_logit);

        // Backpropagation through time.
        let hidden = self.b_h.len();
        let mut grad_w_xh = Array2::zeros(self.w_xh.raw_dim());
        let mut grad_w_hh = Array2::zeros(self.w_hh.raw_dim());
        let mut grad_b_h = Array1::zeros(hidden);
        for t in (0..states.len()).rev() {
            let d_pre = {
                let state = &states[t];
                let mut d_pre = d_state.clone();
                for unit in 0..hidden {
                    d_pre[unit] *= 1.0 - state[unit] * state[unit];
                }
                d_pre
            };
            let input = window.row(t);
            for unit in 0..hidden {
                for feature in 0..self.n_features {
                    grad_w_xh[[unit, feature]] += d_pre[unit] * input[feature];
                }
            }
            if t > 0 {
                let previous = &states[t - 1];
                for unit in 0..hidden {
                    for other in 0..hidden {
                        grad_w_hh[[unit, other]] += d_pre[unit] * previous[other];
                    }
                }
            }
            grad_b_h += &d_pre;
            d_state = self.w_hh.t().dot(&d_pre);
        }

        self.w_xh.zip_mut_with(&grad_w_xh, |weight_value, &grad| {
            *weight_value -= learning_rate * clip(grad)
        });
        self.w_hh.zip_mut_with(&grad_w_hh, |weight_value, &grad| {
            *weight_value -= learning_rate * clip(grad)
        });
        self.b_h.zip_mut_with(&grad_b_h, |weight_value, &grad| {
            *weight_value -= learning_rate * clip(grad)
        });
        self.w_ho.zip_mut_with(&grad_w_ho, |weight_value, &grad| {
            *weight_value -= learning_rate * grad
        });
        self.b_o -= learning_rate * grad_b_o;
        loss
    }

    pub fn predict_proba(&self, x: ArrayView3<f64>) -> Array1<f64> {
        let probabilities: Vec<f64> = x
            .axis_iter(Axis(0))
            .map(|window| self.forward(self.standardize(window).view()).0)
            .collect();
        Array1::from_vec(probabilities)
    }

    pub fn predict(&self, x: ArrayView3<f64>, threshold: f64) -> Vec<u8> {
        self.predict_proba(x)
            .iter()
            .map(|&probability| u8::from(probability >= threshold))
            .collect()
    }
}

fn sigmoid(value: f64) -> f64 {
    1.0 / (1.0 + (-value).exp())
}

fn clip(value: f64) -> f64 {
    value.clamp(-GRADIENT_CLIP, GRADIENT_CLIP)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    /// Windows of constant +level or -level in every feature, labeled by
    /// the sign.
    fn signed_windows(per_class: usize) -> (Array3<f64>, Array1<f64>) {
        let mut x = Array3::zeros((2 * per_class, 6, 4));
        let mut y = Array1::zeros(2 * per_class);
        for sample in 0..2 * per_class {
            let level = if sample % 2 == 0 { 1.0 } else { -1.0 };
            x.index_axis_mut(Axis(0), sample).fill(level);
            y[sample] = if level > 0.0 { 1.0 } else { 0.0 };
        }
        (x, y)
    }

    #[test]
    fn probabilities_stay_in_unit_interval() {
        let (x, y) = signed_windows(5);
        let config = SequenceModelConfig {
            hidden_units: 4,
            epochs: 3,
            ..SequenceModelConfig::default()
        };
        let model = RecurrentClassifier::fit(x.view(), y.view(), [1.0, 1.0], &config).unwrap();
        let probabilities = model.predict_proba(x.view());
        assert!(probabilities
            .iter()
            .all(|&probability| (0.0..=1.0).contains(&probability)));
    }

    #[test]
    fn learns_to_rank_separable_classes() {
        let (x, y) = signed_windows(10);
        let config = SequenceModelConfig {
            hidden_units: 4,
            epochs: 60,
            learning_rate: 0.1,
            seed: 42,
        };
        let model = RecurrentClassifier::fit(x.view(), y.view(), [1.0, 1.0], &config).unwrap();
        let probabilities = model.predict_proba(x.view());
        let mut positive_mean = 0.0;
        let mut negative_mean = 0.0;
        for (index, &label) in y.iter().enumerate() {
            if label >= 0.5 {
                positive_mean += probabilities[index] / 10.0;
            } else {
                negative_mean += probabilities[index] / 10.0;
            }
        }
        assert!(positive_mean > negative_mean);
    }

    #[test]
    fn fit_is_deterministic_for_a_seed() {
        let (x, y) = signed_windows(4);
        let config = SequenceModelConfig {
            hidden_units: 3,
            epochs: 2,
            ..SequenceModelConfig::default()
        };
        let first = RecurrentClassifier::fit(x.view(), y.view(), [1.0, 1.0], &config).unwrap();
        let second = RecurrentClassifier::fit(x.view(), y.view(), [1.0, 1.0], &config).unwrap();
        assert_eq!(
            first.predict_proba(x.view()),
            second.predict_proba(x.view())
        );
    }

    #[test]
    fn input_shape_reflects_the_training_tensors() {
        let (x, y) = signed_windows(3);
        let config = SequenceModelConfig {
            hidden_units: 2,
            epochs: 1,
            ..SequenceModelConfig::default()
        };
        let model = RecurrentClassifier::fit(x.view(), y.view(), [1.0, 1.0], &config).unwrap();
        assert_eq!(model.input_shape(), [6, 4]);
    }

    #[test]
    fn empty_training_set_is_rejected() {
        let x = Array3::<f64>::zeros((0, 6, 4));
        let y = Array1::<f64>::zeros(0);
        let config = SequenceModelConfig::default();
        assert!(RecurrentClassifier::fit(x.view(), y.view(), [1.0, 1.0], &config).is_err());
    }
}
