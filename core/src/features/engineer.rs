use crate::diagnostics::StageLog;
use crate::math::stats::StatsHelper;
use crate::prelude::{CoreError, CoreResult};
use crate::telemetry::{self, AnomalyEvent, Channel, RootCause, TelemetryRecord};
use chrono::{DateTime, Datelike, Timelike, Utc};
use ndarray::Array2;
use std::collections::{HashMap, HashSet};

/// Rolling window in samples (one hour at the default 10-minute cadence).
pub const DEFAULT_ROLLING_WINDOW: usize = 6;

/// Substituted for a zero denominator in the cross-channel ratios.
pub const RATIO_EPSILON: f64 = 0.1;

/// Engineered feature rows, derived 1:1 from the surviving telemetry
/// records.
///
/// Label columns (`anomaly`, `causes`) ride alongside the feature matrix
/// and are never part of it, so downstream feature sets cannot leak
/// label-derived columns.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub timestamps: Vec<DateTime<Utc>>,
    pub satellite_ids: Vec<String>,
    /// Column names for `features`, in order.
    pub columns: Vec<String>,
    pub features: Array2<f64>,
    /// Binary anomaly flag per row.
    pub anomaly: Vec<u8>,
    /// One-hot cause indicators per row, one column per `RootCause::ALL`
    /// entry. Independently settable; the generator only ever sets one.
    pub causes: Array2<u8>,
}

impl FeatureTable {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// The fixed feature schema, in column order.
pub fn feature_columns() -> Vec<String> {
    let mut columns = vec![
        "orbit_position".to_string(),
        "in_eclipse".to_string(),
        "hour".to_string(),
        "day_of_week".to_string(),
    ];
    for channel in Channel::ALL {
        columns.push(channel.name().to_string());
    }
    for channel in Channel::ALL {
        columns.push(format!("{}_delta", channel.name()));
        columns.push(format!("{}_rolling_mean", channel.name()));
        columns.push(format!("{}_rolling_std", channel.name()));
        columns.push(format!("{}_deviation", channel.name()));
    }
    columns.push("power_temp_ratio".to_string());
    columns.push("battery_power_ratio".to_string());
    columns.push("eclipse_change".to_string());
    columns.push("time_since_eclipse_change".to_string());
    columns
}

/// Derives the engineered feature table from a telemetry series, merging
/// anomaly labels by exact timestamp when provided.
///
/// The first `window - 1` rows lack full rolling history and are dropped
/// from the output.
pub fn engineer_features(
    records: &[TelemetryRecord],
    anomalies: Option<&[AnomalyEvent]>,
    window: usize,
) -> CoreResult<FeatureTable> {
    let log = StageLog::new("features");
    if records.is_empty() {
        return Err(CoreError::InvalidInput(
            "no telemetry records to engineer features from".to_string(),
        ));
    }
    if window == 0 {
        return Err(CoreError::InvalidInput(
            "rolling window must be at least 1 sample".to_string(),
        ));
    }
    telemetry::record::check_monotonic(records)?;

    let n = records.len();
    let columns = feature_columns();
    let n_columns = columns.len();

    // Per-channel series and their rolling statistics.
    let mut deltas = Vec::with_capacity(Channel::ALL.len());
    let mut means = Vec::with_capacity(Channel::ALL.len());
    let mut stds = Vec::with_capacity(Channel::ALL.len());
    let mut raw = Vec::with_capacity(Channel::ALL.len());
    for channel in Channel::ALL {
        let series: Vec<f64> = records.iter().map(|r| r.value(channel)).collect();
        deltas.push(StatsHelper::delta(&series));
        means.push(StatsHelper::rolling_mean(&series, window));
        stds.push(StatsHelper::rolling_std(&series, window));
        raw.push(series);
    }

    // Eclipse-transition scan: a single left-to-right pass carrying the
    // samples-since-change counter.
    let mut eclipse_change = vec![0.0; n];
    let mut since_change = vec![0.0; n];
    let mut counter = 0usize;
    for i in 0..n {
        if i == 0 {
            counter = 0;
        } else {
            eclipse_change[i] = records[i].in_eclipse as f64 - records[i - 1].in_eclipse as f64;
            if records[i].in_eclipse != records[i - 1].in_eclipse {
                counter = 0;
            } else {
                counter += 1;
            }
        }
        since_change[i] = counter as f64;
    }

    // Label merge: exact-timestamp left join against the anomaly table.
    let mut label_map: HashMap<DateTime<Utc>, [u8; 5]> = HashMap::new();
    if let Some(events) = anomalies {
        let known: HashSet<DateTime<Utc>> = records.iter().map(|r| r.timestamp).collect();
        let mut unmatched = 0usize;
        for event in events {
            if known.contains(&event.timestamp) {
                label_map.entry(event.timestamp).or_insert([0; 5])[event.root_cause.index()] = 1;
            } else {
                unmatched += 1;
            }
        }
        if unmatched > 0 {
            log.caution(&format!(
                "{} anomaly events matched no telemetry timestamp",
                unmatched
            ));
        }
    }

    let dropped = (window - 1).min(n);
    let kept = n - dropped;
    let mut flat = Vec::with_capacity(kept * n_columns);
    let mut cause_flat = Vec::with_capacity(kept * RootCause::ALL.len());
    let mut timestamps = Vec::with_capacity(kept);
    let mut satellite_ids = Vec::with_capacity(kept);
    let mut anomaly = Vec::with_capacity(kept);

    for i in dropped..n {
        let record = &records[i];
        flat.push(record.orbit_position);
        flat.push(record.in_eclipse as f64);
        flat.push(record.timestamp.hour() as f64);
        flat.push(record.timestamp.weekday().num_days_from_monday() as f64);
        for series in &raw {
            flat.push(series[i]);
        }
        for channel_index in 0..Channel::ALL.len() {
            flat.push(deltas[channel_index][i]);
            flat.push(means[channel_index][i]);
            flat.push(stds[channel_index][i]);
            flat.push(raw[channel_index][i] - means[channel_index][i]);
        }
        flat.push(StatsHelper::ratio_or_epsilon(
            record.power,
            record.temperature,
            RATIO_EPSILON,
        ));
        flat.push(StatsHelper::ratio_or_epsilon(
            record.battery_health,
            record.power,
            RATIO_EPSILON,
        ));
        flat.push(eclipse_change[i]);
        flat.push(since_change[i]);

        let labels = label_map.get(&record.timestamp).copied().unwrap_or([0; 5]);
        anomaly.push(u8::from(labels.iter().any(|&set| set == 1)));
        cause_flat.extend_from_slice(&labels);
        timestamps.push(record.timestamp);
        satellite_ids.push(record.satellite_id.clone());
    }

    let features = Array2::from_shape_vec((kept, n_columns), flat)
        .map_err(|err| CoreError::Internal(format!("feature matrix shape: {}", err)))?;
    let causes = Array2::from_shape_vec((kept, RootCause::ALL.len()), cause_flat)
        .map_err(|err| CoreError::Internal(format!("cause matrix shape: {}", err)))?;

    let flagged = anomaly.iter().filter(|&&flag| flag == 1).count();
    log.record(&format!(
        "engineered {} rows ({} warm-up rows dropped), {} flagged anomalous",
        kept, dropped, flagged
    ));

    Ok(FeatureTable {
        timestamps,
        satellite_ids,
        columns,
        features,
        anomaly,
        causes,
    })
}
