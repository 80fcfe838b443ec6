pub mod web;

pub use web::{
    export_web_bundle, manual_conversion_instructions, AnomalyModelInfo, ExportPaths,
    ModelMetadata, RootCauseInfo, WebModelBundle, DECISION_THRESHOLD, METADATA_VERSION,
};
