/// Rolling-window and ratio helpers shared by the feature-engineering pass.
pub struct StatsHelper;

impl StatsHelper {
    pub fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// Mean over each trailing `window` samples. Rows without a complete
    /// window fall back to the raw value.
    pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(values.len());
        let mut running = 0.0;
        for (i, &value) in values.iter().enumerate() {
            running += value;
            if i + 1 < window || window == 0 {
                out.push(value);
            } else {
                out.push(running / window as f64);
                running -= values[i + 1 - window];
            }
        }
        out
    }

    /// Sample standard deviation over each trailing `window` samples; 0
    /// until the window is complete.
    pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(values.len());
        for i in 0..values.len() {
            if window < 2 || i + 1 < window {
                out.push(0.0);
                continue;
            }
            let slice = &values[i + 1 - window..=i];
            let mean = Self::mean(slice);
            let sum_sq: f64 = slice.iter().map(|v| (v - mean) * (v - mean)).sum();
            let variance = (sum_sq / (window - 1) as f64).max(0.0);
            out.push(variance.sqrt());
        }
        out
    }

    /// First difference with the leading element treated as zero.
    pub fn delta(values: &[f64]) -> Vec<f64> {
        let mut out = Vec::with_capacity(values.len());
        for i in 0..values.len() {
            if i == 0 {
                out.push(0.0);
            } else {
                out.push(values[i] - values[i - 1]);
            }
        }
        out
    }

    /// Ratio with a zero denominator replaced by `epsilon`.
    pub fn ratio_or_epsilon(numerator: f64, denominator: f64, epsilon: f64) -> f64 {
        if denominator == 0.0 {
            numerator / epsilon
        } else {
            numerator / denominator
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rolling_mean_of_constant_window_is_the_constant() {
        let values = vec![5.0; 8];
        let means = StatsHelper::rolling_mean(&values, 4);
        assert!(means.iter().all(|&m| (m - 5.0).abs() < 1e-12));
    }

    #[test]
    fn rolling_mean_falls_back_to_raw_value_before_window_fills() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        let means = StatsHelper::rolling_mean(&values, 3);
        assert_eq!(means[0], 1.0);
        assert_eq!(means[1], 2.0);
        assert!((means[2] - 2.0).abs() < 1e-12);
        assert!((means[3] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn rolling_std_is_zero_for_constant_window_and_incomplete_window() {
        let values = vec![7.0; 6];
        let stds = StatsHelper::rolling_std(&values, 3);
        assert!(stds.iter().all(|&s| s == 0.0));

        let ramp = vec![1.0, 2.0, 3.0, 4.0];
        let stds = StatsHelper::rolling_std(&ramp, 3);
        assert_eq!(stds[0], 0.0);
        assert_eq!(stds[1], 0.0);
        assert!((stds[2] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn delta_treats_first_value_as_zero() {
        let values = vec![2.0, 5.0, 4.0];
        assert_eq!(StatsHelper::delta(&values), vec![0.0, 3.0, -1.0]);
    }

    #[test]
    fn ratio_substitutes_epsilon_for_zero_denominator() {
        assert_eq!(StatsHelper::ratio_or_epsilon(10.0, 2.0, 0.1), 5.0);
        assert_eq!(StatsHelper::ratio_or_epsilon(10.0, 0.0, 0.1), 100.0);
    }
}
