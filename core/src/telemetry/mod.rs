pub mod anomaly;
pub mod record;

pub use anomaly::{read_anomaly_csv, write_anomaly_csv, AnomalyEvent, RootCause, Severity};
pub use record::{read_telemetry_csv, write_telemetry_csv, Channel, TelemetryRecord};
