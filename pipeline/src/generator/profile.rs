use crate::generator::faults;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use satcore::telemetry::{AnomalyEvent, Channel, TelemetryRecord};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Configuration for generating synthetic telemetry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub days: u32,
    pub sample_interval_minutes: u32,
    pub satellite_id: String,
    /// Typical LEO orbit.
    pub orbit_period_minutes: f64,
    /// Orbit-phase band treated as eclipse (exclusive bounds).
    pub eclipse_band: (f64, f64),
    pub seed: u64,
    /// Fixed start keeps generated tables reproducible for a seed.
    pub start_time: DateTime<Utc>,
    pub description: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            days: 90,
            sample_interval_minutes: 10,
            satellite_id: "SAT-001".to_string(),
            orbit_period_minutes: 95.0,
            eclipse_band: (0.3, 0.7),
            seed: 42,
            start_time: DateTime::<Utc>::default(),
            description: None,
        }
    }
}

impl GeneratorConfig {
    pub fn sample_count(&self) -> usize {
        (self.days as usize * 24 * 60) / self.sample_interval_minutes.max(1) as usize
    }
}

/// Produces the telemetry table and its companion anomaly table.
///
/// Each channel is a baseline plus a slow trend, an orbit-keyed periodic
/// term, a cross-channel coupling where applicable, and Gaussian noise,
/// clipped to the channel's physical range. Staged faults are then
/// injected with sparse labeling.
pub fn generate_telemetry(
    config: &GeneratorConfig,
) -> anyhow::Result<(Vec<TelemetryRecord>, Vec<AnomalyEvent>)> {
    let samples = config.sample_count();
    if samples == 0 {
        anyhow::bail!("generator configuration yields zero samples");
    }
    let interval = config.sample_interval_minutes.max(1) as f64;
    let span = (samples.saturating_sub(1)).max(1) as f64;
    let mut rng = StdRng::seed_from_u64(config.seed);
    let power_noise = Normal::new(0.0, 1.0).map_err(anyhow::Error::msg)?;
    let temperature_noise = Normal::new(0.0, 1.0).map_err(anyhow::Error::msg)?;
    let battery_noise = Normal::new(0.0, 0.5).map_err(anyhow::Error::msg)?;
    let signal_noise = Normal::new(0.0, 2.0).map_err(anyhow::Error::msg)?;
    let memory_noise = Normal::new(0.0, 3.0).map_err(anyhow::Error::msg)?;

    let mut records = Vec::with_capacity(samples);
    for i in 0..samples {
        let minutes = i as f64 * interval;
        let orbit_position =
            (minutes % config.orbit_period_minutes) / config.orbit_period_minutes;
        let in_eclipse =
            u8::from(orbit_position > config.eclipse_band.0 && orbit_position < config.eclipse_band.1);
        let orbit_angle = orbit_position * 2.0 * PI;

        // Solar-panel degradation and battery cycle counts accrue linearly
        // over the series.
        let degradation = 5.0 * i as f64 / span;
        let cycles = 180.0 * i as f64 / span;

        let power = 90.0 - degradation + 5.0 * orbit_angle.sin()
            - 20.0 * in_eclipse as f64
            + power_noise.sample(&mut rng);
        let temperature = 25.0
            + 10.0 * orbit_angle.sin()
            + 0.1 * (power - 85.0)
            + temperature_noise.sample(&mut rng);
        let battery_health = 95.0 - 0.02 * cycles + battery_noise.sample(&mut rng);
        let ground_station_angle = minutes / (4.0 * 60.0) * 2.0 * PI;
        let signal_strength =
            85.0 + 10.0 * ground_station_angle.sin() + signal_noise.sample(&mut rng);
        let activity_angle = minutes / (6.0 * 60.0) * 2.0 * PI;
        let memory_usage = 60.0 + 15.0 * activity_angle.sin() + memory_noise.sample(&mut rng);

        let mut record = TelemetryRecord {
            timestamp: config.start_time
                + Duration::minutes(i as i64 * config.sample_interval_minutes.max(1) as i64),
            satellite_id: config.satellite_id.clone(),
            orbit_position,
            in_eclipse,
            power,
            temperature,
            battery_health,
            signal_strength,
            memory_usage,
        };
        for channel in Channel::ALL {
            let (low, high) = channel.clip_range();
            let value = record.value(channel).clamp(low, high);
            *record.value_mut(channel) = value;
        }
        records.push(record);
    }

    let events = faults::inject_faults(&mut records, &faults::default_schedule());
    debug!(
        "synthesized {} samples for {} with {} labeled events",
        samples,
        config.satellite_id,
        events.len()
    );
    Ok((records, events))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_day_config() -> GeneratorConfig {
        GeneratorConfig {
            days: 1,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn sample_count_follows_duration_and_interval() {
        assert_eq!(one_day_config().sample_count(), 144);
        let config = GeneratorConfig {
            days: 90,
            ..GeneratorConfig::default()
        };
        assert_eq!(config.sample_count(), 12_960);
    }

    #[test]
    fn every_channel_stays_inside_its_clip_range() {
        let (records, _) = generate_telemetry(&one_day_config()).unwrap();
        for record in &records {
            for channel in Channel::ALL {
                let (low, high) = channel.clip_range();
                let value = record.value(channel);
                assert!(value >= low && value <= high, "{:?} = {}", channel, value);
            }
        }
    }

    #[test]
    fn eclipse_flag_matches_the_orbit_band() {
        let (records, _) = generate_telemetry(&one_day_config()).unwrap();
        for record in &records {
            let inside = record.orbit_position > 0.3 && record.orbit_position < 0.7;
            assert_eq!(record.in_eclipse == 1, inside);
        }
    }

    #[test]
    fn timestamps_advance_by_the_sampling_interval() {
        let (records, _) = generate_telemetry(&one_day_config()).unwrap();
        for pair in records.windows(2) {
            assert_eq!(pair[1].timestamp - pair[0].timestamp, Duration::minutes(10));
        }
    }

    #[test]
    fn generation_is_deterministic_for_a_seed() {
        let config = one_day_config();
        let (first, first_events) = generate_telemetry(&config).unwrap();
        let (second, second_events) = generate_telemetry(&config).unwrap();
        assert_eq!(first.len(), second.len());
        assert_eq!(first_events.len(), second_events.len());
        assert_eq!(first[7].power, second[7].power);
        assert_eq!(first[100].memory_usage, second[100].memory_usage);
    }

    #[test]
    fn anomaly_events_reference_existing_timestamps() {
        let (records, events) = generate_telemetry(&one_day_config()).unwrap();
        assert!(!events.is_empty());
        for event in &events {
            assert!(records.iter().any(|r| r.timestamp == event.timestamp));
        }
    }
}
