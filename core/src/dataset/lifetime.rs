use crate::telemetry::TelemetryRecord;
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Battery health at which the pack is considered end-of-life.
pub const BATTERY_EOL_HEALTH: f64 = 60.0;

/// Ceiling on the days-to-EOL label; also used when the battery is not
/// degrading at all.
pub const LIFETIME_CAP_DAYS: f64 = 500.0;

/// Feature columns of the lifetime dataset, in order.
pub const LIFETIME_FEATURES: [&str; 7] = [
    "batteryHealth",
    "power",
    "temperature",
    "day",
    "in_eclipse",
    "orbit_position",
    "memoryUsage",
];

#[derive(Debug, Clone)]
pub struct LifetimeDataset {
    pub x: Array2<f64>,
    /// Days until the battery reaches `BATTERY_EOL_HEALTH` at the current
    /// per-day degradation rate, clipped to [0, cap].
    pub y: Array1<f64>,
}

impl LifetimeDataset {
    pub fn len(&self) -> usize {
        self.x.nrows()
    }
}

/// Derives days-to-EOL labels from the raw telemetry table.
///
/// The per-day battery rate is the first difference of battery health over
/// elapsed days within each satellite's series (first row treated as
/// zero). Rows with extreme rates (<= -1 or >= 0.1 per day) are dropped.
/// Returns `None` when nothing survives the filter.
pub fn build_lifetime_dataset(records: &[TelemetryRecord]) -> Option<LifetimeDataset> {
    let start = records.iter().map(|r| r.timestamp).min()?;
    let mut previous: HashMap<&str, (f64, f64)> = HashMap::new();
    let mut flat = Vec::new();
    let mut labels = Vec::new();

    for record in records {
        let day = (record.timestamp - start).num_seconds() as f64 / 86_400.0;
        let rate = match previous.get(record.satellite_id.as_str()) {
            Some(&(health, previous_day)) => {
                let elapsed = day - previous_day;
                let elapsed = if elapsed == 0.0 { 1.0 } else { elapsed };
                (record.battery_health - health) / elapsed
            }
            None => 0.0,
        };
        previous.insert(record.satellite_id.as_str(), (record.battery_health, day));

        if rate <= -1.0 || rate >= 0.1 {
            continue;
        }
        let days_to_eol = if rate < 0.0 {
            ((record.battery_health - BATTERY_EOL_HEALTH) / rate.abs())
                .clamp(0.0, LIFETIME_CAP_DAYS)
        } else {
            LIFETIME_CAP_DAYS
        };

        flat.extend_from_slice(&[
            record.battery_health,
            record.power,
            record.temperature,
            day,
            record.in_eclipse as f64,
            record.orbit_position,
            record.memory_usage,
        ]);
        labels.push(days_to_eol);
    }

    if labels.is_empty() {
        return None;
    }
    let rows = labels.len();
    let x = Array2::from_shape_vec((rows, LIFETIME_FEATURES.len()), flat).ok()?;
    Some(LifetimeDataset {
        x,
        y: Array1::from_vec(labels),
    })
}
