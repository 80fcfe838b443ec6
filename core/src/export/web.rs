use crate::artifact;
use crate::models::RecurrentClassifier;
use crate::prelude::CoreResult;
use crate::telemetry::RootCause;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Decision threshold advertised to the web client.
pub const DECISION_THRESHOLD: f64 = 0.5;

pub const METADATA_VERSION: &str = "1.0";

const WEB_FORMAT: &str = "satcore-recurrent-v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyModelInfo {
    #[serde(rename = "type")]
    pub model_type: String,
    pub input_shape: Vec<usize>,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootCauseInfo {
    pub causes: Vec<RootCause>,
}

/// Sidecar the web front end reads next to the converted model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub anomaly_detection: AnomalyModelInfo,
    pub root_cause: RootCauseInfo,
    pub version: String,
}

impl ModelMetadata {
    pub fn for_model(model: &RecurrentClassifier) -> Self {
        Self {
            anomaly_detection: AnomalyModelInfo {
                model_type: "recurrent".to_string(),
                input_shape: model.input_shape().to_vec(),
                threshold: DECISION_THRESHOLD,
            },
            root_cause: RootCauseInfo {
                causes: RootCause::ALL.to_vec(),
            },
            version: METADATA_VERSION.to_string(),
        }
    }
}

/// Weights bundle written for the JavaScript runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebModelBundle {
    pub format: String,
    pub model: RecurrentClassifier,
}

#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub bundle: PathBuf,
    pub metadata: PathBuf,
}

/// Converts the trained sequence model into the web bundle plus the JSON
/// metadata sidecar under `out_dir`.
pub fn export_web_bundle(
    model: &RecurrentClassifier,
    out_dir: &Path,
) -> CoreResult<ExportPaths> {
    let bundle = out_dir.join("anomaly_detection").join("model.json");
    artifact::save_json(
        &bundle,
        &WebModelBundle {
            format: WEB_FORMAT.to_string(),
            model: model.clone(),
        },
    )?;
    let metadata = out_dir.join("model_metadata.json");
    artifact::save_json(&metadata, &ModelMetadata::for_model(model))?;
    Ok(ExportPaths { bundle, metadata })
}

/// Recovery steps printed when automatic conversion fails; the pipeline
/// keeps going instead of aborting.
pub fn manual_conversion_instructions(artifact_path: &Path, out_dir: &Path) -> String {
    format!(
        "Automatic web conversion failed. To convert manually:\n\
         1. Verify the trained model artifact exists at {}.\n\
         2. Re-run the export stage once the artifact is readable, or copy\n\
            the artifact to {} and write a model_metadata.json sidecar with\n\
            the input shape, a {} threshold, and the root-cause label set.",
        artifact_path.display(),
        out_dir.join("anomaly_detection").join("model.json").display(),
        DECISION_THRESHOLD
    )
}
