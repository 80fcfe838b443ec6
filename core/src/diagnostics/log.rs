use log::{info, warn};

/// Stage-prefixed logger used by the pipeline stages.
pub struct StageLog {
    stage: &'static str,
}

impl StageLog {
    pub fn new(stage: &'static str) -> Self {
        Self { stage }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.stage, message);
    }

    /// Recoverable degradations go through here so they are never silent.
    pub fn caution(&self, message: &str) {
        warn!("[{}] {}", self.stage, message);
    }
}
