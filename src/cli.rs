use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use signal_hook::consts::{SIGINT, SIGTERM};

use crate::core::batch::{build_queue, BatchPlan};
use crate::core::command::WorkerCommand;
use crate::core::config::ExperimentConfig;
use crate::core::detector::DetectorConfig;
use crate::core::error::UeflowError;
use crate::core::formatter::{format_plan_line, format_summary_line};
use crate::core::logscan::RELEASE_MARKER;
use crate::core::run_experiment;

#[derive(Debug, Parser)]
#[command(name = "ueflow", version, about = "UE load-test orchestrator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Launch UE workers batch by batch and track them to completion
    Run(RunArgs),
    /// Print the job queue a run would start with
    Plan(PlanArgs),
}

#[derive(Debug, Clone, Args)]
pub struct BatchArgs {
    #[arg(long = "batches", default_value_t = 10)]
    pub batches: u32,
    #[arg(long = "fast-per-batch", default_value_t = 9)]
    pub fast_per_batch: u32,
    #[arg(long = "slow-per-batch", default_value_t = 1)]
    pub slow_per_batch: u32,
    #[arg(long = "fast-start", default_value_t = 1)]
    pub fast_start: u64,
    #[arg(long = "slow-start", default_value_t = 91)]
    pub slow_start: u64,
}

#[derive(Debug, Parser)]
pub struct PlanArgs {
    #[command(flatten)]
    pub batch: BatchArgs,
}

#[derive(Debug, Parser)]
pub struct RunArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    /// Ceiling on concurrently running UEs
    #[arg(long = "max-concurrent", default_value_t = 10)]
    pub max_concurrent: u32,
    /// Seconds before a fast job is declared timed out
    #[arg(long = "fast-timeout", default_value_t = 180)]
    pub fast_timeout: u64,
    /// Seconds before a slow job is declared timed out
    #[arg(long = "slow-timeout", default_value_t = 300)]
    pub slow_timeout: u64,
    /// Seconds before an empty registry counts as released
    #[arg(long = "grace-period", default_value_t = 20)]
    pub grace_period: u64,
    #[arg(long = "tick-ms", default_value_t = 1000)]
    pub tick_ms: u64,

    #[arg(long = "fast-template", default_value = "config/ue1.yaml")]
    pub fast_template: PathBuf,
    #[arg(long = "slow-template", default_value = "config/ue2.yaml")]
    pub slow_template: PathBuf,
    #[arg(long = "log-dir", default_value = "experiment_logs")]
    pub log_dir: PathBuf,
    #[arg(long = "status-file", default_value = "experiment_status.json")]
    pub status_file: PathBuf,
    #[arg(long = "timeline-file", default_value = "timeline.csv")]
    pub timeline_file: PathBuf,

    #[arg(long = "registry-url", default_value = "http://127.0.0.2:8000/debug/sessions")]
    pub registry_url: String,
    #[arg(long = "registry-timeout-ms", default_value_t = 1000)]
    pub registry_timeout_ms: u64,

    /// UE simulator binary
    #[arg(long = "worker", default_value = "build/free-ran-ue")]
    pub worker: String,
    /// Network namespace the worker runs in
    #[arg(long = "netns", default_value = "free-ue-ns")]
    pub netns: String,
    /// Run the worker directly instead of through `sudo ip netns exec`
    #[arg(long = "no-netns")]
    pub no_netns: bool,

    /// MCC and MNC prefix of the SUPIs
    #[arg(long = "plmn", default_value = "20893")]
    pub plmn: String,
    #[arg(long = "release-marker", default_value = RELEASE_MARKER)]
    pub release_marker: String,
}

impl From<BatchArgs> for BatchPlan {
    fn from(args: BatchArgs) -> Self {
        BatchPlan {
            batches: args.batches,
            fast_per_batch: args.fast_per_batch,
            slow_per_batch: args.slow_per_batch,
            fast_start: args.fast_start,
            slow_start: args.slow_start,
        }
    }
}

pub fn run_args_to_config(args: RunArgs) -> ExperimentConfig {
    let worker = if args.no_netns {
        WorkerCommand::direct(&args.worker)
    } else {
        WorkerCommand::in_netns(&args.netns, &args.worker)
    };

    ExperimentConfig {
        plan: args.batch.into(),
        max_concurrent: args.max_concurrent,
        detector: DetectorConfig {
            fast_timeout: Duration::from_secs(args.fast_timeout),
            slow_timeout: Duration::from_secs(args.slow_timeout),
            grace_period: Duration::from_secs(args.grace_period),
            plmn: args.plmn,
            release_marker: args.release_marker,
        },
        tick_interval: Duration::from_millis(args.tick_ms),
        fast_template: args.fast_template,
        slow_template: args.slow_template,
        log_dir: args.log_dir,
        status_file: args.status_file,
        timeline_file: args.timeline_file,
        registry_url: args.registry_url,
        registry_timeout: Duration::from_millis(args.registry_timeout_ms),
        worker,
    }
}

/// Exit code used when a second signal arrives while draining.
pub const FORCED_EXIT_CODE: i32 = 130;

/// SIGINT and SIGTERM raise the returned flag; the run loop drains on it.
/// A second signal while the flag is already set exits immediately.
pub fn install_interrupt_flag() -> Result<Arc<AtomicBool>, UeflowError> {
    let interrupted = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        let install_failed = |e: std::io::Error| {
            UeflowError::io(format!("failed to install handler for signal {signal}"), e)
        };
        // Must be registered before the flag itself so the first signal only sets it.
        signal_hook::flag::register_conditional_shutdown(
            signal,
            FORCED_EXIT_CODE,
            Arc::clone(&interrupted),
        )
        .map_err(install_failed)?;
        signal_hook::flag::register(signal, Arc::clone(&interrupted)).map_err(install_failed)?;
    }
    Ok(interrupted)
}

pub fn execute(command: Commands) -> Result<(), UeflowError> {
    match command {
        Commands::Run(args) => {
            let config = run_args_to_config(args);
            let interrupted = install_interrupt_flag()?;
            let summary = run_experiment(config, &interrupted)?;
            println!("{}", format_summary_line(&summary));
            Ok(())
        }
        Commands::Plan(args) => {
            let plan: BatchPlan = args.batch.into();
            plan.validate()?;
            let (fast_end, slow_end) = plan.identity_ends()?;
            let queue = build_queue(&plan);
            for (index, job) in queue.iter().enumerate() {
                println!("{}", format_plan_line(index, job));
            }
            println!(
                "{} jobs, {} UEs (fast {}..{}, slow {}..{})",
                queue.len(),
                plan.total_ues(),
                plan.fast_start,
                fast_end,
                plan.slow_start,
                slow_end
            );
            Ok(())
        }
    }
}
