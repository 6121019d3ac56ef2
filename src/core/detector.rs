//! Per-tick completion and timeout rules for running jobs.
//!
//! Rules are tried in a fixed order and the first that matches decides the
//! job's fate for this tick:
//!
//! 1. elapsed time past the kind's timeout
//! 2. none of the job's SUPIs held by the registry, once the grace period is
//!    over (skipped while the registry is unreachable)
//! 3. worker process gone
//! 4. enough release markers in the worker log

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::core::event::EventKind;
use crate::core::job::{Job, JobKind, JobStatus};
use crate::core::logscan::{count_marker_lines, RELEASE_MARKER};
use crate::core::registry::supi_for;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectorConfig {
    pub fast_timeout: Duration,
    pub slow_timeout: Duration,
    pub grace_period: Duration,
    pub plmn: String,
    pub release_marker: String,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            fast_timeout: Duration::from_secs(180),
            slow_timeout: Duration::from_secs(300),
            grace_period: Duration::from_secs(20),
            plmn: "20893".to_string(),
            release_marker: RELEASE_MARKER.to_string(),
        }
    }
}

impl DetectorConfig {
    pub fn timeout_for(&self, kind: JobKind) -> Duration {
        match kind {
            JobKind::Fast => self.fast_timeout,
            JobKind::Slow => self.slow_timeout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    TimedOut,
    RegistryReleased,
    ProcessDied,
    LogReleased,
}

impl Verdict {
    pub fn status(&self) -> JobStatus {
        match self {
            Verdict::TimedOut => JobStatus::TimedOut,
            Verdict::RegistryReleased | Verdict::LogReleased => JobStatus::Completed,
            Verdict::ProcessDied => JobStatus::Died,
        }
    }

    pub fn event_kind(&self) -> EventKind {
        match self {
            Verdict::TimedOut => EventKind::Timeout,
            Verdict::RegistryReleased | Verdict::LogReleased => EventKind::Completed,
            Verdict::ProcessDied => EventKind::Died,
        }
    }

    pub fn describe(&self, job: &Job) -> String {
        match self {
            Verdict::TimedOut => format!("Job {job} timed out"),
            Verdict::RegistryReleased => format!("Job {job} completed (SMF confirmed release)"),
            Verdict::ProcessDied => format!("Job {job} process died unexpectedly"),
            Verdict::LogReleased => format!("Job {job} completed (All released)"),
        }
    }
}

/// Decide whether `job` leaves `Running` at `now`. Returns `None` for jobs
/// that stay running and for jobs that are not running at all.
pub fn evaluate(
    job: &mut Job,
    now: Instant,
    active_sessions: Option<&HashSet<String>>,
    config: &DetectorConfig,
) -> Option<Verdict> {
    if job.status != JobStatus::Running {
        return None;
    }
    let elapsed = job.elapsed(now)?;

    if elapsed > config.timeout_for(job.kind) {
        return Some(Verdict::TimedOut);
    }

    if let Some(sessions) = active_sessions {
        if elapsed > config.grace_period
            && job
                .imsis()
                .all(|msin| !sessions.contains(&supi_for(&config.plmn, msin)))
        {
            return Some(Verdict::RegistryReleased);
        }
    }

    let alive = job.process_mut().map(|p| p.is_alive()).unwrap_or(false);
    if !alive {
        return Some(Verdict::ProcessDied);
    }

    if let Some(log_path) = job.log_path.as_deref() {
        match count_marker_lines(log_path, &config.release_marker) {
            Ok(released) if released >= job.count as usize => {
                return Some(Verdict::LogReleased);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(log = %log_path.display(), error = %e, "worker log unreadable");
            }
        }
    }

    None
}
