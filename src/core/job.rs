use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::core::launcher::WorkerProcess;
use crate::core::registry::supi_for;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Fast,
    Slow,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Fast => "fast",
            JobKind::Slow => "slow",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    TimedOut,
    Died,
    ConfigError,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending | JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::TimedOut => write!(f, "timed_out"),
            JobStatus::Died => write!(f, "died"),
            JobStatus::ConfigError => write!(f, "config_error"),
        }
    }
}

/// A contiguous range of UE identities handed to one worker process.
///
/// The process handle is owned by the job from launch until it leaves
/// `Running`; whoever retires the job takes the handle to terminate it.
#[derive(Debug)]
pub struct Job {
    pub kind: JobKind,
    pub count: u32,
    pub start_imsi: u64,
    pub batch_id: u32,
    pub status: JobStatus,
    pub started_at: Option<Instant>,
    pub log_path: Option<PathBuf>,
    process: Option<Box<dyn WorkerProcess>>,
}

impl Job {
    pub fn new(kind: JobKind, count: u32, start_imsi: u64, batch_id: u32) -> Self {
        Self {
            kind,
            count,
            start_imsi,
            batch_id,
            status: JobStatus::Pending,
            started_at: None,
            log_path: None,
            process: None,
        }
    }

    /// One past the last identity of this job.
    pub fn end_imsi(&self) -> u64 {
        self.start_imsi + u64::from(self.count)
    }

    pub fn imsis(&self) -> std::ops::Range<u64> {
        self.start_imsi..self.end_imsi()
    }

    pub fn expected_supis(&self, plmn: &str) -> HashSet<String> {
        self.imsis().map(|msin| supi_for(plmn, msin)).collect()
    }

    /// Carve `take` identities off the low end into a new pending job.
    ///
    /// `take` must be smaller than `count`; the remainder keeps its place.
    pub fn split_front(&mut self, take: u32) -> Job {
        debug_assert!(take > 0 && take < self.count);
        let front = Job::new(self.kind, take, self.start_imsi, self.batch_id);
        self.count -= take;
        self.start_imsi += u64::from(take);
        front
    }

    /// File stem shared by the rendered config and the worker log.
    pub fn artifact_stem(&self) -> String {
        format!("ue_{}_b{}_{}", self.kind, self.batch_id, self.start_imsi)
    }

    pub fn attach(
        &mut self,
        process: Box<dyn WorkerProcess>,
        started_at: Instant,
        log_path: &Path,
    ) {
        self.process = Some(process);
        self.started_at = Some(started_at);
        self.log_path = Some(log_path.to_path_buf());
        self.status = JobStatus::Running;
    }

    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.started_at
            .map(|started| now.saturating_duration_since(started))
    }

    pub fn process_mut(&mut self) -> Option<&mut (dyn WorkerProcess + 'static)> {
        self.process.as_deref_mut()
    }

    pub fn take_process(&mut self) -> Option<Box<dyn WorkerProcess>> {
        self.process.take()
    }

    pub fn finish(&mut self, status: JobStatus) {
        debug_assert!(status.is_terminal());
        self.status = status;
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Job(Batch={}, Type={}, Count={}, IMSI={})",
            self.batch_id, self.kind, self.count, self.start_imsi
        )
    }
}
