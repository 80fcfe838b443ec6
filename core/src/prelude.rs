/// Common error type for pipeline operations.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv failure: {0}")]
    Csv(#[from] csv::Error),
    #[error("serialization failure: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("internal failure: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

pub use crate::features::FeatureTable;
pub use crate::telemetry::{AnomalyEvent, Channel, RootCause, Severity, TelemetryRecord};
