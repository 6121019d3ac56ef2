pub mod admission;
pub mod batch;
pub mod command;
pub mod config;
pub mod detector;
pub mod error;
pub mod event;
pub mod formatter;
pub mod job;
pub mod launcher;
pub mod logscan;
pub mod registry;
pub mod reporter;
pub mod scheduler;
pub mod summary;
pub mod template;

use std::sync::atomic::AtomicBool;

use config::ExperimentConfig;
use error::UeflowError;
use launcher::ProcessLauncher;
use registry::HttpSessionRegistry;
use scheduler::Scheduler;
use summary::RunSummary;

/// Run a full experiment against real workers and the HTTP session registry.
pub fn run_experiment(
    config: ExperimentConfig,
    interrupted: &AtomicBool,
) -> Result<RunSummary, UeflowError> {
    config.validate()?;

    let registry = HttpSessionRegistry::new(config.registry_url.clone(), config.registry_timeout)?;
    let launcher = ProcessLauncher::new(config.worker.clone());

    let mut scheduler = Scheduler::new(config, launcher, registry);
    scheduler.run(interrupted)
}
