use crate::features::FeatureTable;
use crate::telemetry::RootCause;
use ndarray::{Array2, Axis};

/// Flat per-row dataset restricted to anomalous timestamps, with the
/// one-hot cause indicators as a multi-label target matrix.
#[derive(Debug, Clone)]
pub struct RootCauseDataset {
    pub x: Array2<f64>,
    pub y: Array2<f64>,
    pub causes: Vec<RootCause>,
}

impl RootCauseDataset {
    pub fn len(&self) -> usize {
        self.x.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Builds the root-cause dataset from rows flagged anomalous.
///
/// Returns `None` when the table holds no anomalous rows; callers skip
/// the dependent training stage rather than treating this as a failure.
pub fn build_root_cause_dataset(table: &FeatureTable) -> Option<RootCauseDataset> {
    let rows: Vec<usize> = table
        .anomaly
        .iter()
        .enumerate()
        .filter(|(_, &flag)| flag == 1)
        .map(|(row, _)| row)
        .collect();
    if rows.is_empty() {
        return None;
    }
    let x = table.features.select(Axis(0), &rows);
    let y = table.causes.select(Axis(0), &rows).mapv(f64::from);
    Some(RootCauseDataset {
        x,
        y,
        causes: RootCause::ALL.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn table(flags: &[u8], cause_rows: &[(usize, RootCause)]) -> FeatureTable {
        let n = flags.len();
        let mut causes = Array2::zeros((n, RootCause::ALL.len()));
        for &(row, cause) in cause_rows {
            causes[[row, cause.index()]] = 1;
        }
        FeatureTable {
            timestamps: (0..n)
                .map(|i| {
                    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                        + chrono::Duration::minutes(10 * i as i64)
                })
                .collect(),
            satellite_ids: vec!["SAT-001".to_string(); n],
            columns: vec!["a".into(), "b".into()],
            features: Array2::from_shape_fn((n, 2), |(row, column)| (row + column) as f64),
            anomaly: flags.to_vec(),
            causes,
        }
    }

    #[test]
    fn no_anomalies_signals_empty_with_none() {
        let table = table(&[0, 0, 0, 0], &[]);
        assert!(build_root_cause_dataset(&table).is_none());
    }

    #[test]
    fn keeps_only_flagged_rows() {
        let table = table(
            &[0, 1, 0, 1],
            &[
                (1, RootCause::MemoryLeak),
                (3, RootCause::CoolingSystemFailure),
            ],
        );
        let dataset = build_root_cause_dataset(&table).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.x[[0, 0]], 1.0);
        assert_eq!(dataset.y[[0, RootCause::MemoryLeak.index()]], 1.0);
        assert_eq!(dataset.y[[1, RootCause::CoolingSystemFailure.index()]], 1.0);
        assert_eq!(dataset.y[[1, RootCause::MemoryLeak.index()]], 0.0);
    }
}
