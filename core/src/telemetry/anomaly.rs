use crate::prelude::CoreResult;
use crate::telemetry::Channel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Closed set of root-cause labels.
///
/// The deployed label set is fixed, so the schema is enumerated here
/// rather than inferred from whatever the anomaly table happens to
/// contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootCause {
    SolarPanelDegradation,
    CoolingSystemFailure,
    BatteryCellDegradation,
    AntennaMisalignment,
    MemoryLeak,
}

impl RootCause {
    pub const ALL: [RootCause; 5] = [
        RootCause::SolarPanelDegradation,
        RootCause::CoolingSystemFailure,
        RootCause::BatteryCellDegradation,
        RootCause::AntennaMisalignment,
        RootCause::MemoryLeak,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RootCause::SolarPanelDegradation => "solar_panel_degradation",
            RootCause::CoolingSystemFailure => "cooling_system_failure",
            RootCause::BatteryCellDegradation => "battery_cell_degradation",
            RootCause::AntennaMisalignment => "antenna_misalignment",
            RootCause::MemoryLeak => "memory_leak",
        }
    }

    /// Position within [`RootCause::ALL`], used for one-hot columns.
    pub fn index(self) -> usize {
        RootCause::ALL
            .iter()
            .position(|cause| *cause == self)
            .unwrap_or(0)
    }
}

/// Ordinal severity tier attached to each labeled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One labeled anomaly. Field order matches the CSV column order.
///
/// Only a sub-sampled fraction of the samples inside a fault window carry
/// an event, modeling detection latency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyEvent {
    pub timestamp: DateTime<Utc>,
    pub parameter: Channel,
    /// Observed (post-injection) channel value.
    pub value: f64,
    pub root_cause: RootCause,
    pub severity: Severity,
}

impl AnomalyEvent {
    pub fn new(
        timestamp: DateTime<Utc>,
        parameter: Channel,
        value: f64,
        root_cause: RootCause,
        severity: Severity,
    ) -> Self {
        Self {
            timestamp,
            parameter,
            value,
            root_cause,
            severity,
        }
    }
}

pub fn read_anomaly_csv<P: AsRef<Path>>(path: P) -> CoreResult<Vec<AnomalyEvent>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut events = Vec::new();
    for row in reader.deserialize() {
        events.push(row?);
    }
    Ok(events)
}

pub fn write_anomaly_csv<P: AsRef<Path>>(path: P, events: &[AnomalyEvent]) -> CoreResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for event in events {
        writer.serialize(event)?;
    }
    writer.flush()?;
    Ok(())
}
