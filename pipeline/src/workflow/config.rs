use crate::generator::profile::GeneratorConfig;
use anyhow::Context;
use satcore::models::{BoostedConfig, ForestConfig, SequenceModelConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Feature-engineering and dataset-shaping settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureSettings {
    pub rolling_window: usize,
    pub sequence_length: usize,
    pub prediction_horizon: usize,
    pub test_fraction: f64,
    pub split_seed: u64,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        Self {
            rolling_window: satcore::features::DEFAULT_ROLLING_WINDOW,
            sequence_length: 12,
            prediction_horizon: 1,
            test_fraction: 0.2,
            split_seed: 42,
        }
    }
}

/// Full pipeline configuration, loadable from YAML with per-section
/// defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the CSVs, dataset dumps, and model artifacts.
    pub data_dir: PathBuf,
    /// Directory the web bundle and metadata sidecar are written to.
    pub web_dir: PathBuf,
    pub generator: GeneratorConfig,
    pub features: FeatureSettings,
    pub sequence_model: SequenceModelConfig,
    pub lifetime_model: BoostedConfig,
    pub root_cause_model: ForestConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            web_dir: PathBuf::from("web_models"),
            generator: GeneratorConfig::default(),
            features: FeatureSettings::default(),
            sequence_model: SequenceModelConfig::default(),
            lifetime_model: BoostedConfig::default(),
            root_cause_model: ForestConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading pipeline config {}", path_ref.display()))?;
        let config: PipelineConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing pipeline config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn telemetry_csv(&self) -> PathBuf {
        self.data_dir.join("satellite_telemetry_training.csv")
    }

    pub fn anomalies_csv(&self) -> PathBuf {
        self.data_dir.join("satellite_anomalies_training.csv")
    }

    pub fn sequence_split_path(&self) -> PathBuf {
        self.data_dir.join("sequence_dataset.json")
    }

    pub fn root_cause_split_path(&self) -> PathBuf {
        self.data_dir.join("root_cause_dataset.json")
    }

    pub fn anomaly_model_path(&self) -> PathBuf {
        self.data_dir.join("anomaly_model.json")
    }

    pub fn lifetime_model_path(&self) -> PathBuf {
        self.data_dir.join("lifetime_model.json")
    }

    pub fn root_cause_model_path(&self) -> PathBuf {
        self.data_dir.join("root_cause_model.json")
    }
}
