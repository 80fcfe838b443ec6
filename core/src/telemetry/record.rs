use crate::prelude::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Closed set of monitored sensor channels.
///
/// Serialized names match the CSV headers of the telemetry table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    Power,
    Temperature,
    BatteryHealth,
    SignalStrength,
    MemoryUsage,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Power,
        Channel::Temperature,
        Channel::BatteryHealth,
        Channel::SignalStrength,
        Channel::MemoryUsage,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Channel::Power => "power",
            Channel::Temperature => "temperature",
            Channel::BatteryHealth => "batteryHealth",
            Channel::SignalStrength => "signalStrength",
            Channel::MemoryUsage => "memoryUsage",
        }
    }

    /// Physical range the channel is clipped to.
    pub fn clip_range(self) -> (f64, f64) {
        match self {
            Channel::Power => (0.0, 100.0),
            Channel::Temperature => (-10.0, 50.0),
            Channel::BatteryHealth => (0.0, 100.0),
            Channel::SignalStrength => (0.0, 100.0),
            Channel::MemoryUsage => (0.0, 100.0),
        }
    }
}

/// One telemetry sample. Field order matches the CSV column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub timestamp: DateTime<Utc>,
    pub satellite_id: String,
    /// Orbit phase fraction in [0, 1).
    pub orbit_position: f64,
    pub in_eclipse: u8,
    pub power: f64,
    pub temperature: f64,
    #[serde(rename = "batteryHealth")]
    pub battery_health: f64,
    #[serde(rename = "signalStrength")]
    pub signal_strength: f64,
    #[serde(rename = "memoryUsage")]
    pub memory_usage: f64,
}

impl TelemetryRecord {
    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Power => self.power,
            Channel::Temperature => self.temperature,
            Channel::BatteryHealth => self.battery_health,
            Channel::SignalStrength => self.signal_strength,
            Channel::MemoryUsage => self.memory_usage,
        }
    }

    pub fn value_mut(&mut self, channel: Channel) -> &mut f64 {
        match channel {
            Channel::Power => &mut self.power,
            Channel::Temperature => &mut self.temperature,
            Channel::BatteryHealth => &mut self.battery_health,
            Channel::SignalStrength => &mut self.signal_strength,
            Channel::MemoryUsage => &mut self.memory_usage,
        }
    }
}

/// Checks the series invariant: strictly increasing timestamps within each
/// satellite's records.
pub fn check_monotonic(records: &[TelemetryRecord]) -> CoreResult<()> {
    let mut last_seen: HashMap<&str, DateTime<Utc>> = HashMap::new();
    for record in records {
        if let Some(previous) = last_seen.get(record.satellite_id.as_str()) {
            if record.timestamp <= *previous {
                return Err(CoreError::InvalidInput(format!(
                    "non-monotonic timestamp {} for satellite {}",
                    record.timestamp, record.satellite_id
                )));
            }
        }
        last_seen.insert(record.satellite_id.as_str(), record.timestamp);
    }
    Ok(())
}

pub fn read_telemetry_csv<P: AsRef<Path>>(path: P) -> CoreResult<Vec<TelemetryRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

pub fn write_telemetry_csv<P: AsRef<Path>>(
    path: P,
    records: &[TelemetryRecord],
) -> CoreResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(offset_minutes: i64) -> TelemetryRecord {
        TelemetryRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::minutes(offset_minutes),
            satellite_id: "SAT-001".to_string(),
            orbit_position: 0.1,
            in_eclipse: 0,
            power: 90.0,
            temperature: 25.0,
            battery_health: 95.0,
            signal_strength: 85.0,
            memory_usage: 60.0,
        }
    }

    #[test]
    fn telemetry_csv_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("telemetry.csv");
        let records = vec![record(0), record(10)];
        write_telemetry_csv(&path, &records).unwrap();
        let loaded = read_telemetry_csv(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].satellite_id, "SAT-001");
        assert_eq!(loaded[1].timestamp, records[1].timestamp);
    }

    #[test]
    fn monotonic_check_rejects_repeated_timestamps() {
        let records = vec![record(0), record(0)];
        assert!(check_monotonic(&records).is_err());
        let records = vec![record(0), record(10)];
        assert!(check_monotonic(&records).is_ok());
    }

    #[test]
    fn channel_accessors_cover_all_channels() {
        let mut sample = record(0);
        for channel in Channel::ALL {
            *sample.value_mut(channel) = 42.0;
            assert_eq!(sample.value(channel), 42.0);
        }
    }
}
