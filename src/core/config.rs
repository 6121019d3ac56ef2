use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::batch::BatchPlan;
use crate::core::command::WorkerCommand;
use crate::core::detector::DetectorConfig;
use crate::core::error::UeflowError;
use crate::core::job::JobKind;

/// Largest identity that fits the 10-digit MSIN field.
pub const MAX_MSIN: u64 = 9_999_999_999;

/// Everything one experiment run needs.
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    pub plan: BatchPlan,
    /// Ceiling on concurrently running UEs.
    pub max_concurrent: u32,
    pub detector: DetectorConfig,
    pub tick_interval: Duration,
    pub fast_template: PathBuf,
    pub slow_template: PathBuf,
    /// Rendered configs and worker logs.
    pub log_dir: PathBuf,
    pub status_file: PathBuf,
    pub timeline_file: PathBuf,
    pub registry_url: String,
    pub registry_timeout: Duration,
    pub worker: WorkerCommand,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            plan: BatchPlan::default(),
            max_concurrent: 10,
            detector: DetectorConfig::default(),
            tick_interval: Duration::from_secs(1),
            fast_template: PathBuf::from("config/ue1.yaml"),
            slow_template: PathBuf::from("config/ue2.yaml"),
            log_dir: PathBuf::from("experiment_logs"),
            status_file: PathBuf::from("experiment_status.json"),
            timeline_file: PathBuf::from("timeline.csv"),
            registry_url: "http://127.0.0.2:8000/debug/sessions".to_string(),
            registry_timeout: Duration::from_secs(1),
            worker: WorkerCommand::default(),
        }
    }
}

impl ExperimentConfig {
    pub fn template_for(&self, kind: JobKind) -> &Path {
        match kind {
            JobKind::Fast => &self.fast_template,
            JobKind::Slow => &self.slow_template,
        }
    }

    pub fn validate(&self) -> Result<(), UeflowError> {
        let invalid = |message: &str| {
            Err(UeflowError::InvalidConfig {
                message: message.to_string(),
            })
        };

        if self.max_concurrent == 0 {
            return invalid("max concurrent UEs must be positive");
        }
        if self.tick_interval.is_zero() {
            return invalid("tick interval must be positive");
        }
        self.plan.validate()
    }
}
