//! Telemetry modeling and training core for the Rust satellite-health
//! platform.
//!
//! The modules mirror the offline pipeline stages: typed telemetry and
//! anomaly records with CSV interchange, rolling-window feature
//! engineering, dataset builders, the three model-fitting procedures, and
//! the web export step. Every stage is an ordinary callable function so
//! the driver binary can sequence them and tests can exercise them in
//! isolation.

pub mod artifact;
pub mod dataset;
pub mod diagnostics;
pub mod export;
pub mod features;
pub mod math;
pub mod models;
pub mod prelude;
pub mod telemetry;

pub use prelude::{CoreError, CoreResult};
