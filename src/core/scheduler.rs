//! The experiment loop.
//!
//! All run state lives in [`Scheduler`] and is only touched from
//! [`Scheduler::tick_at`], one tick at a time:
//!
//! 1. query the session registry
//! 2. retire running jobs the detector has a verdict for
//! 3. admit at most one job (or job slice) from the queue head
//! 4. publish the status snapshot and new timeline rows
//!
//! [`Scheduler::run`] repeats this on a fixed interval until the queue is
//! drained and nothing is running, or until the interrupt flag is raised.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use chrono::{DateTime, Local};

use crate::core::admission::{active_count, admit_next, available_slots};
use crate::core::batch::build_queue;
use crate::core::config::ExperimentConfig;
use crate::core::detector::{evaluate, Verdict};
use crate::core::error::UeflowError;
use crate::core::event::{EventKind, EventLog};
use crate::core::job::{Job, JobStatus};
use crate::core::launcher::{LaunchRequest, Launcher, WorkerProcess};
use crate::core::registry::SessionRegistry;
use crate::core::reporter::{Reporter, StatusSnapshot};
use crate::core::summary::RunSummary;
use crate::core::template::write_config;

pub struct Scheduler<L, R> {
    config: ExperimentConfig,
    queue: VecDeque<Job>,
    active: Vec<Job>,
    completed: Vec<Job>,
    events: EventLog,
    launcher: L,
    registry: R,
    reporter: Reporter,
    started_wall: DateTime<Local>,
    started: Instant,
}

impl<L: Launcher, R: SessionRegistry> Scheduler<L, R> {
    pub fn new(config: ExperimentConfig, launcher: L, registry: R) -> Self {
        let queue = build_queue(&config.plan);
        Self::with_queue(config, queue, launcher, registry)
    }

    pub fn with_queue(
        config: ExperimentConfig,
        queue: VecDeque<Job>,
        launcher: L,
        registry: R,
    ) -> Self {
        let reporter = Reporter::new(&config.status_file, &config.timeline_file);
        Self {
            config,
            queue,
            active: Vec::new(),
            completed: Vec::new(),
            events: EventLog::new(),
            launcher,
            registry,
            reporter,
            started_wall: Local::now(),
            started: Instant::now(),
        }
    }

    pub fn queue(&self) -> &VecDeque<Job> {
        &self.queue
    }

    pub fn active(&self) -> &[Job] {
        &self.active
    }

    pub fn completed(&self) -> &[Job] {
        &self.completed
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn active_ue_count(&self) -> u64 {
        active_count(&self.active)
    }

    pub fn is_finished(&self) -> bool {
        self.queue.is_empty() && self.active.is_empty()
    }

    /// Prepare output locations and record the start of the run.
    pub fn start(&mut self) -> Result<(), UeflowError> {
        fs::create_dir_all(&self.config.log_dir).map_err(|e| {
            UeflowError::io(
                format!("failed to create log directory {}", self.config.log_dir.display()),
                e,
            )
        })?;
        self.reporter.init_timeline()?;

        self.started_wall = Local::now();
        self.started = Instant::now();

        tracing::info!(
            jobs = self.queue.len(),
            ues = self.queue.iter().map(|j| u64::from(j.count)).sum::<u64>(),
            max_concurrent = self.config.max_concurrent,
            "experiment starting"
        );
        self.events.record(EventKind::Start, "Experiment Started", 0);
        self.publish();
        Ok(())
    }

    pub fn tick(&mut self) {
        self.tick_at(Instant::now());
    }

    pub fn tick_at(&mut self, now: Instant) {
        let view = self.registry.query();
        self.detect(now, view.sessions());
        self.admit(now);
        self.publish();
    }

    /// Drive ticks until the plan is exhausted or `interrupted` is raised,
    /// then drain.
    pub fn run(&mut self, interrupted: &AtomicBool) -> Result<RunSummary, UeflowError> {
        self.start()?;

        while !self.is_finished() {
            if interrupted.load(Ordering::SeqCst) {
                let active = self.active_ue_count();
                self.events
                    .record(EventKind::Stop, "Experiment interrupted by user", active);
                break;
            }

            self.tick();
            if self.is_finished() {
                break;
            }
            thread::sleep(self.config.tick_interval);
        }

        self.shutdown();
        Ok(self.summary())
    }

    /// Signal every still-running worker and write the final status.
    ///
    /// Jobs that were running stay in the active list so the last snapshot
    /// shows what was cut short.
    pub fn shutdown(&mut self) {
        self.events.record(EventKind::End, "Cleaning up...", 0);

        for job in &mut self.active {
            if let Some(mut process) = job.take_process() {
                terminate_worker(job, process.as_mut());
            }
        }

        self.publish();
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_jobs(
            &self.completed,
            self.active.len() + self.queue.len(),
            self.started.elapsed(),
        )
    }

    fn detect(&mut self, now: Instant, sessions: Option<&HashSet<String>>) {
        let mut index = 0;
        while index < self.active.len() {
            match evaluate(&mut self.active[index], now, sessions, &self.config.detector) {
                Some(verdict) => {
                    let job = self.active.remove(index);
                    self.retire(job, verdict);
                }
                None => index += 1,
            }
        }
    }

    fn retire(&mut self, mut job: Job, verdict: Verdict) {
        job.finish(verdict.status());
        if let Some(mut process) = job.take_process() {
            terminate_worker(&job, process.as_mut());
        }

        let message = verdict.describe(&job);
        let active = self.active_ue_count();
        self.events.record(verdict.event_kind(), message, active);
        self.completed.push(job);
    }

    fn admit(&mut self, now: Instant) {
        let available = available_slots(self.config.max_concurrent, self.active_ue_count());
        if let Some(job) = admit_next(&mut self.queue, available) {
            self.launch(job, now);
        }
    }

    fn launch(&mut self, mut job: Job, now: Instant) {
        let stem = job.artifact_stem();
        let config_path = self.config.log_dir.join(format!("{stem}.yaml"));
        let log_path = self.config.log_dir.join(format!("{stem}.log"));

        match self.spawn_worker(&job, &config_path, &log_path) {
            Ok(process) => {
                tracing::debug!(
                    batch = job.batch_id,
                    kind = %job.kind,
                    count = job.count,
                    imsi = job.start_imsi,
                    pid = process.id(),
                    "job launched"
                );
                let message = format!("Starting Job {job}");
                job.attach(process, now, &log_path);
                self.active.push(job);
                let active = self.active_ue_count();
                self.events.record(EventKind::Launch, message, active);
            }
            Err(e) => {
                tracing::error!(
                    batch = job.batch_id,
                    kind = %job.kind,
                    imsi = job.start_imsi,
                    error = %e,
                    "job could not be launched"
                );
                job.finish(JobStatus::ConfigError);
                let message = format!("Job {job} could not be launched: {e}");
                let active = self.active_ue_count();
                self.events.record(EventKind::ConfigError, message, active);
                self.completed.push(job);
            }
        }
    }

    fn spawn_worker(
        &mut self,
        job: &Job,
        config_path: &Path,
        log_path: &Path,
    ) -> Result<Box<dyn WorkerProcess>, UeflowError> {
        write_config(self.config.template_for(job.kind), job.start_imsi, config_path)?;
        self.launcher.launch(&LaunchRequest {
            config_path,
            log_path,
            count: job.count,
        })
    }

    fn publish(&mut self) {
        let snapshot = StatusSnapshot::capture(
            self.started_wall,
            Local::now(),
            &self.active,
            &self.completed,
            &self.events,
        );
        self.reporter.publish(&snapshot, &mut self.events);
    }
}

fn terminate_worker(job: &Job, process: &mut dyn WorkerProcess) {
    let pid = process.id();
    match process.terminate() {
        Ok(()) => tracing::debug!(
            batch = job.batch_id,
            imsi = job.start_imsi,
            pid,
            status = %job.status,
            "worker terminated"
        ),
        Err(e) => tracing::debug!(
            batch = job.batch_id,
            imsi = job.start_imsi,
            pid,
            error = %e,
            "worker termination failed"
        ),
    }
}
