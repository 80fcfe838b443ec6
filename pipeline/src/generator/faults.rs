use satcore::telemetry::{AnomalyEvent, Channel, RootCause, Severity, TelemetryRecord};
use serde::{Deserialize, Serialize};

/// How an active fault perturbs its channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FaultEffect {
    /// Multiply the channel by a constant factor.
    Scale(f64),
    /// Add a constant offset.
    Offset(f64),
    /// Multiplicative decay compounding per sample since fault onset.
    ExponentialDecay { factor: f64 },
    /// Running accumulator over the previous sample, capped at a ceiling.
    Leak { step: f64, ceiling: f64 },
}

/// Extra condition a sample must meet before it is labeled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum LabelGate {
    Always,
    Below(f64),
    Above(f64),
}

impl LabelGate {
    fn admits(self, value: f64) -> bool {
        match self {
            LabelGate::Always => true,
            LabelGate::Below(limit) => value < limit,
            LabelGate::Above(limit) => value > limit,
        }
    }
}

/// One injected fault: a fractional window over the series, an effect,
/// and a sparse labeling policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultWindow {
    pub channel: Channel,
    pub start_fraction: f64,
    pub duration_fraction: f64,
    pub effect: FaultEffect,
    /// Label every Nth sample (global index) to model detection delay.
    pub label_cadence: usize,
    pub label_gate: LabelGate,
    pub root_cause: RootCause,
    pub severity: Severity,
}

/// The staged, non-overlapping fault schedule used for training data.
pub fn default_schedule() -> Vec<FaultWindow> {
    vec![
        FaultWindow {
            channel: Channel::Power,
            start_fraction: 0.20,
            duration_fraction: 0.03,
            effect: FaultEffect::Scale(0.7),
            label_cadence: 3,
            label_gate: LabelGate::Always,
            root_cause: RootCause::SolarPanelDegradation,
            severity: Severity::High,
        },
        FaultWindow {
            channel: Channel::Temperature,
            start_fraction: 0.40,
            duration_fraction: 0.02,
            effect: FaultEffect::Offset(15.0),
            label_cadence: 3,
            label_gate: LabelGate::Always,
            root_cause: RootCause::CoolingSystemFailure,
            severity: Severity::High,
        },
        FaultWindow {
            channel: Channel::BatteryHealth,
            start_fraction: 0.60,
            duration_fraction: 0.05,
            effect: FaultEffect::ExponentialDecay { factor: 0.997 },
            label_cadence: 3,
            label_gate: LabelGate::Below(75.0),
            root_cause: RootCause::BatteryCellDegradation,
            severity: Severity::Medium,
        },
        FaultWindow {
            channel: Channel::SignalStrength,
            start_fraction: 0.70,
            duration_fraction: 0.01,
            effect: FaultEffect::Scale(0.5),
            label_cadence: 2,
            label_gate: LabelGate::Always,
            root_cause: RootCause::AntennaMisalignment,
            severity: Severity::Medium,
        },
        FaultWindow {
            channel: Channel::MemoryUsage,
            start_fraction: 0.85,
            duration_fraction: 0.04,
            effect: FaultEffect::Leak {
                step: 0.5,
                ceiling: 95.0,
            },
            label_cadence: 3,
            label_gate: LabelGate::Above(85.0),
            root_cause: RootCause::MemoryLeak,
            severity: Severity::Low,
        },
    ]
}

/// Applies each fault window to its channel and returns the sparse event
/// table.
///
/// Windows are half-open index ranges computed from the series length.
/// Injected values are re-clipped to the channel's physical range, and a
/// sample is labeled only when it sits on the window's cadence and passes
/// the gate.
pub fn inject_faults(
    records: &mut [TelemetryRecord],
    schedule: &[FaultWindow],
) -> Vec<AnomalyEvent> {
    let n = records.len();
    let mut events = Vec::new();
    for fault in schedule {
        let start = (n as f64 * fault.start_fraction) as usize;
        let duration = (n as f64 * fault.duration_fraction) as usize;
        let end = start.saturating_add(duration).min(n);
        let (low, high) = fault.channel.clip_range();
        for i in start..end {
            let current = records[i].value(fault.channel);
            let value = match &fault.effect {
                FaultEffect::Scale(factor) => current * factor,
                FaultEffect::Offset(offset) => current + offset,
                FaultEffect::ExponentialDecay { factor } => {
                    current * factor.powi((i - start) as i32)
                }
                FaultEffect::Leak { step, ceiling } => {
                    let previous = if i == 0 {
                        current
                    } else {
                        records[i - 1].value(fault.channel)
                    };
                    ceiling.min(previous + step)
                }
            };
            let value = value.clamp(low, high);
            *records[i].value_mut(fault.channel) = value;
            if fault.label_cadence > 0
                && i % fault.label_cadence == 0
                && fault.label_gate.admits(value)
            {
                events.push(AnomalyEvent::new(
                    records[i].timestamp,
                    fault.channel,
                    value,
                    fault.root_cause,
                    fault.severity,
                ));
            }
        }
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn flat_records(n: usize) -> Vec<TelemetryRecord> {
        (0..n)
            .map(|i| TelemetryRecord {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::minutes(10 * i as i64),
                satellite_id: "SAT-001".to_string(),
                orbit_position: 0.1,
                in_eclipse: 0,
                power: 80.0,
                temperature: 25.0,
                battery_health: 95.0,
                signal_strength: 85.0,
                memory_usage: 60.0,
            })
            .collect()
    }

    fn power_drop() -> FaultWindow {
        FaultWindow {
            channel: Channel::Power,
            start_fraction: 0.2,
            duration_fraction: 0.1,
            effect: FaultEffect::Scale(0.7),
            label_cadence: 3,
            label_gate: LabelGate::Always,
            root_cause: RootCause::SolarPanelDegradation,
            severity: Severity::High,
        }
    }

    #[test]
    fn power_window_scales_by_the_configured_factor() {
        let mut records = flat_records(100);
        let events = inject_faults(&mut records, &[power_drop()]);
        for (i, record) in records.iter().enumerate() {
            if (20..30).contains(&i) {
                assert!((record.power - 56.0).abs() < 1e-9);
            } else {
                assert_eq!(record.power, 80.0);
            }
        }
        assert!(events
            .iter()
            .all(|event| event.root_cause == RootCause::SolarPanelDegradation));
    }

    #[test]
    fn labeling_is_sparse_on_the_cadence() {
        let mut records = flat_records(100);
        let events = inject_faults(&mut records, &[power_drop()]);
        // Window [20, 30); every 3rd global index: 21, 24, 27.
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].timestamp, records[21].timestamp);
        assert!((events[0].value - 56.0).abs() < 1e-9);
    }

    #[test]
    fn leak_accumulates_and_caps_at_the_ceiling() {
        let mut records = flat_records(100);
        for record in &mut records {
            record.memory_usage = 94.0;
        }
        let fault = FaultWindow {
            channel: Channel::MemoryUsage,
            start_fraction: 0.0,
            duration_fraction: 0.1,
            effect: FaultEffect::Leak {
                step: 0.5,
                ceiling: 95.0,
            },
            label_cadence: 3,
            label_gate: LabelGate::Above(85.0),
            root_cause: RootCause::MemoryLeak,
            severity: Severity::Low,
        };
        let events = inject_faults(&mut records, &[fault]);
        assert_eq!(records[0].memory_usage, 94.5);
        assert_eq!(records[1].memory_usage, 95.0);
        assert_eq!(records[2].memory_usage, 95.0);
        assert_eq!(records[9].memory_usage, 95.0);
        assert!(!events.is_empty());
    }

    #[test]
    fn decay_compounds_from_fault_onset() {
        let mut records = flat_records(10);
        let fault = FaultWindow {
            channel: Channel::BatteryHealth,
            start_fraction: 0.5,
            duration_fraction: 0.3,
            effect: FaultEffect::ExponentialDecay { factor: 0.9 },
            label_cadence: 1,
            label_gate: LabelGate::Below(75.0),
            root_cause: RootCause::BatteryCellDegradation,
            severity: Severity::Medium,
        };
        let events = inject_faults(&mut records, &[fault]);
        assert!((records[5].battery_health - 95.0).abs() < 1e-9);
        assert!((records[6].battery_health - 95.0 * 0.9).abs() < 1e-9);
        assert!((records[7].battery_health - 95.0 * 0.81).abs() < 1e-9);
        // Only the decayed samples under 75 are labeled.
        assert_eq!(events.len(), 0);
    }

    #[test]
    fn gate_admits_only_matching_values() {
        assert!(LabelGate::Always.admits(1.0));
        assert!(LabelGate::Below(75.0).admits(74.9));
        assert!(!LabelGate::Below(75.0).admits(75.0));
        assert!(LabelGate::Above(85.0).admits(85.1));
        assert!(!LabelGate::Above(85.0).admits(85.0));
    }
}
