use crate::generator::profile;
use crate::workflow::config::PipelineConfig;
use anyhow::Context;
use ndarray::Axis;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use satcore::artifact;
use satcore::dataset::{
    build_lifetime_dataset, build_root_cause_dataset, build_sequence_dataset, split_indices,
    SequenceSplit, TabularSplit,
};
use satcore::diagnostics::StageLog;
use satcore::export;
use satcore::features::{engineer_features, feature_columns};
use satcore::models::{
    balanced_class_weights, classification_metrics, mean_absolute_error, r2_score,
    root_mean_squared_error, GradientBoostedRegressor, MultiLabelForest, RecurrentClassifier,
    TabularModel,
};
use satcore::telemetry;

/// Fraction of labels flipped when a training split collapses to a single
/// class, so the fit stays well-posed instead of failing outright.
const SYNTHETIC_LABEL_FRACTION: f64 = 0.05;
const SYNTHETIC_LABEL_FLOOR: usize = 5;

/// Sequences the pipeline stages over the filesystem hand-off.
#[derive(Clone)]
pub struct Runner {
    config: PipelineConfig,
}

impl Runner {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn generate(&self) -> anyhow::Result<()> {
        let log = StageLog::new("generate");
        let (records, events) = profile::generate_telemetry(&self.config.generator)
            .context("generating synthetic telemetry")?;
        std::fs::create_dir_all(&self.config.data_dir)
            .with_context(|| format!("creating {}", self.config.data_dir.display()))?;
        telemetry::write_telemetry_csv(self.config.telemetry_csv(), &records)
            .context("writing telemetry csv")?;
        telemetry::write_anomaly_csv(self.config.anomalies_csv(), &events)
            .context("writing anomaly csv")?;
        log.record(&format!(
            "generated {} telemetry records with {} anomaly events",
            records.len(),
            events.len()
        ));
        Ok(())
    }

    pub fn preprocess(&self) -> anyhow::Result<()> {
        let log = StageLog::new("preprocess");
        let telemetry_path = self.config.telemetry_csv();
        let records = telemetry::read_telemetry_csv(&telemetry_path).with_context(|| {
            format!(
                "reading {}; run the generate stage first",
                telemetry_path.display()
            )
        })?;
        let anomaly_path = self.config.anomalies_csv();
        let events = telemetry::read_anomaly_csv(&anomaly_path).with_context(|| {
            format!(
                "reading {}; run the generate stage first",
                anomaly_path.display()
            )
        })?;

        let settings = &self.config.features;
        let table = engineer_features(&records, Some(&events), settings.rolling_window)
            .context("engineering features")?;

        let sequences = build_sequence_dataset(
            &table,
            settings.sequence_length,
            settings.prediction_horizon,
        );
        if sequences.is_empty() {
            log.caution("telemetry is too short for any sequence window");
        }
        let sequence_split =
            SequenceSplit::from_dataset(&sequences, settings.test_fraction, settings.split_seed);
        artifact::save_json(&self.config.sequence_split_path(), &sequence_split)
            .context("writing sequence dataset dump")?;

        let root_split = match build_root_cause_dataset(&table) {
            Some(dataset) => {
                TabularSplit::from_dataset(&dataset, settings.test_fraction, settings.split_seed)
            }
            None => {
                log.caution("no anomalous rows; writing an empty root-cause dataset");
                TabularSplit::empty(table.features.ncols())
            }
        };
        artifact::save_json(&self.config.root_cause_split_path(), &root_split)
            .context("writing root-cause dataset dump")?;

        log.record(&format!(
            "{} sequence windows ({} train / {} test), {} root-cause rows",
            sequences.len(),
            sequence_split.y_train.len(),
            sequence_split.y_test.len(),
            root_split.x_train.nrows() + root_split.x_test.nrows()
        ));
        Ok(())
    }

    pub fn train_anomaly(&self) -> anyhow::Result<()> {
        let log = StageLog::new("train-anomaly");
        let split_path = self.config.sequence_split_path();
        let split: SequenceSplit = artifact::load_json(&split_path).with_context(|| {
            format!(
                "loading {}; run the preprocess stage first",
                split_path.display()
            )
        })?;
        if split.x_train.dim().0 == 0 {
            log.caution("empty sequence training split; skipping the anomaly trainer");
            return Ok(());
        }

        let mut y_train = split.y_train.clone();
        let mut labels: Vec<u8> = y_train.iter().map(|&label| (label >= 0.5) as u8).collect();
        if balanced_class_weights(&labels).is_none() {
            // Degradation policy for a single-class split: flip a small
            // random fraction so the fit stays well-posed.
            let flip_count = ((labels.len() as f64 * SYNTHETIC_LABEL_FRACTION) as usize)
                .max(SYNTHETIC_LABEL_FLOOR)
                .min(labels.len());
            let missing_class = u8::from(labels.iter().all(|&label| label == 0));
            let mut indices: Vec<usize> = (0..labels.len()).collect();
            indices.shuffle(&mut StdRng::seed_from_u64(self.config.sequence_model.seed));
            for &index in indices.iter().take(flip_count) {
                labels[index] = missing_class;
                y_train[index] = missing_class as f64;
            }
            log.caution(&format!(
                "single-class training split; flipped {} labels to class {}",
                flip_count, missing_class
            ));
        }
        let class_weights = balanced_class_weights(&labels).unwrap_or([1.0, 1.0]);
        log.record(&format!(
            "class weights {:.3} (normal) / {:.3} (anomaly)",
            class_weights[0], class_weights[1]
        ));

        let model = RecurrentClassifier::fit(
            split.x_train.view(),
            y_train.view(),
            class_weights,
            &self.config.sequence_model,
        )
        .context("fitting the sequence classifier")?;

        if split.x_test.dim().0 > 0 {
            let truth: Vec<u8> = split
                .y_test
                .iter()
                .map(|&label| (label >= 0.5) as u8)
                .collect();
            let predicted = model.predict(split.x_test.view(), export::DECISION_THRESHOLD);
            let report = classification_metrics(&truth, &predicted);
            log.record(&format!("held-out {}", report.summary()));
        }

        artifact::save_json(&self.config.anomaly_model_path(), &model)
            .context("writing anomaly model artifact")?;
        log.record("anomaly model saved");
        Ok(())
    }

    pub fn train_lifetime(&self) -> anyhow::Result<()> {
        let log = StageLog::new("train-lifetime");
        let telemetry_path = self.config.telemetry_csv();
        let records = telemetry::read_telemetry_csv(&telemetry_path).with_context(|| {
            format!(
                "reading {}; run the generate stage first",
                telemetry_path.display()
            )
        })?;
        let dataset = match build_lifetime_dataset(&records) {
            Some(dataset) => dataset,
            None => {
                log.caution("no usable battery-rate rows; skipping the lifetime trainer");
                return Ok(());
            }
        };

        let settings = &self.config.features;
        let (train, test) =
            split_indices(dataset.len(), settings.test_fraction, settings.split_seed);
        let x_train = dataset.x.select(Axis(0), &train);
        let y_train = dataset.y.select(Axis(0), &train);
        let model = GradientBoostedRegressor::fit(
            x_train.view(),
            y_train.view(),
            &self.config.lifetime_model,
        )
        .context("fitting the lifetime regressor")?;

        if !test.is_empty() {
            let x_test = dataset.x.select(Axis(0), &test);
            let y_test = dataset.y.select(Axis(0), &test);
            let predicted = model.predict(x_test.view());
            log.record(&format!(
                "held-out mae {:.2} days rmse {:.2} days r2 {:.3}",
                mean_absolute_error(y_test.view(), predicted.view()),
                root_mean_squared_error(y_test.view(), predicted.view()),
                r2_score(y_test.view(), predicted.view())
            ));
        }

        artifact::save_json(&self.config.lifetime_model_path(), &model)
            .context("writing lifetime model artifact")?;
        log.record("lifetime model saved");
        Ok(())
    }

    pub fn train_root_cause(&self) -> anyhow::Result<()> {
        let log = StageLog::new("train-root-cause");
        let split_path = self.config.root_cause_split_path();
        let split: TabularSplit = artifact::load_json(&split_path).with_context(|| {
            format!(
                "loading {}; run the preprocess stage first",
                split_path.display()
            )
        })?;
        if split.x_train.nrows() == 0 {
            log.caution("empty root-cause dataset; skipping the root-cause trainer");
            return Ok(());
        }

        let model = MultiLabelForest::fit(
            split.x_train.view(),
            split.y_train.view(),
            &split.causes,
            &self.config.root_cause_model,
        )
        .context("fitting the root-cause classifier")?;

        if split.x_test.nrows() > 0 {
            let predicted = model.predict(split.x_test.view());
            for (column, cause) in split.causes.iter().enumerate() {
                let truth: Vec<u8> = split
                    .y_test
                    .column(column)
                    .iter()
                    .map(|&label| (label >= 0.5) as u8)
                    .collect();
                let guesses: Vec<u8> = predicted.column(column).to_vec();
                let report = classification_metrics(&truth, &guesses);
                log.record(&format!("{}: {}", cause.label(), report.summary()));
            }
        }

        let columns = feature_columns();
        let mut ranked: Vec<(String, f64)> = columns
            .into_iter()
            .zip(model.mean_feature_importances(split.x_train.ncols()))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let top: Vec<String> = ranked
            .iter()
            .take(5)
            .map(|(name, value)| format!("{} {:.3}", name, value))
            .collect();
        log.record(&format!("top feature importances: {}", top.join(", ")));

        artifact::save_json(&self.config.root_cause_model_path(), &model)
            .context("writing root-cause model artifact")?;
        log.record("root-cause model saved");
        Ok(())
    }

    pub fn export(&self) -> anyhow::Result<()> {
        let log = StageLog::new("export");
        let model_path = self.config.anomaly_model_path();
        let model: RecurrentClassifier = artifact::load_json(&model_path).with_context(|| {
            format!(
                "loading {}; run the train-anomaly stage first",
                model_path.display()
            )
        })?;
        match export::export_web_bundle(&model, &self.config.web_dir) {
            Ok(paths) => {
                log.record(&format!(
                    "web bundle at {}, metadata at {}",
                    paths.bundle.display(),
                    paths.metadata.display()
                ));
            }
            Err(err) => {
                log.caution(&format!("automatic conversion failed: {}", err));
                println!(
                    "{}",
                    export::manual_conversion_instructions(&model_path, &self.config.web_dir)
                );
            }
        }
        Ok(())
    }

    /// Runs every stage in pipeline order.
    pub fn run_all(&self) -> anyhow::Result<()> {
        self.generate()?;
        self.preprocess()?;
        self.train_anomaly()?;
        self.train_lifetime()?;
        self.train_root_cause()?;
        self.export()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::GeneratorConfig;
    use satcore::export::ModelMetadata;
    use satcore::models::{BoostedConfig, ForestConfig, SequenceModelConfig};

    fn fast_config(dir: &std::path::Path) -> PipelineConfig {
        PipelineConfig {
            data_dir: dir.join("data"),
            web_dir: dir.join("web_models"),
            generator: GeneratorConfig {
                days: 2,
                ..GeneratorConfig::default()
            },
            sequence_model: SequenceModelConfig {
                hidden_units: 4,
                epochs: 2,
                ..SequenceModelConfig::default()
            },
            lifetime_model: BoostedConfig {
                n_estimators: 5,
                max_depth: 3,
                ..BoostedConfig::default()
            },
            root_cause_model: ForestConfig {
                n_estimators: 5,
                max_depth: 4,
                ..ForestConfig::default()
            },
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn full_pipeline_produces_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let config = fast_config(dir.path());
        let runner = Runner::new(config.clone());
        runner.run_all().unwrap();

        assert!(config.telemetry_csv().exists());
        assert!(config.anomalies_csv().exists());
        assert!(config.sequence_split_path().exists());
        assert!(config.root_cause_split_path().exists());
        assert!(config.anomaly_model_path().exists());
        assert!(config.lifetime_model_path().exists());
        assert!(config.root_cause_model_path().exists());

        let metadata: ModelMetadata =
            artifact::load_json(&config.web_dir.join("model_metadata.json")).unwrap();
        assert_eq!(
            metadata.anomaly_detection.input_shape,
            vec![config.features.sequence_length, feature_columns().len()]
        );
    }

    #[test]
    fn single_class_split_trains_via_the_synthetic_label_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let config = fast_config(dir.path());
        let runner = Runner::new(config.clone());

        // A split whose training labels are all zero.
        let x_train = ndarray::Array3::from_elem((30, 6, 4), 0.25);
        let x_test = ndarray::Array3::from_elem((6, 6, 4), 0.25);
        let split = SequenceSplit {
            x_train,
            x_test,
            y_train: ndarray::Array1::zeros(30),
            y_test: ndarray::Array1::zeros(6),
        };
        artifact::save_json(&config.sequence_split_path(), &split).unwrap();

        runner.train_anomaly().unwrap();
        assert!(config.anomaly_model_path().exists());
    }

    #[test]
    fn missing_inputs_are_fatal_with_a_stage_hint() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Runner::new(fast_config(dir.path()));
        let err = runner.preprocess().unwrap_err();
        assert!(format!("{:#}", err).contains("run the generate stage first"));
        let err = runner.train_anomaly().unwrap_err();
        assert!(format!("{:#}", err).contains("run the preprocess stage first"));
    }
}
