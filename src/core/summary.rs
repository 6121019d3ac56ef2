use std::time::Duration;

use crate::core::job::{Job, JobKind, JobStatus};

/// Outcome counts for one experiment run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: usize,
    pub timed_out: usize,
    pub died: usize,
    pub config_errors: usize,
    /// Jobs still running or queued when the run stopped.
    pub unfinished: usize,
    pub ue_fast: u64,
    pub ue_slow: u64,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn from_jobs<'a>(
        finished: impl IntoIterator<Item = &'a Job>,
        unfinished: usize,
        elapsed: Duration,
    ) -> Self {
        let mut summary = RunSummary {
            unfinished,
            elapsed,
            ..RunSummary::default()
        };

        for job in finished {
            match job.status {
                JobStatus::Completed => summary.completed += 1,
                JobStatus::TimedOut => summary.timed_out += 1,
                JobStatus::Died => summary.died += 1,
                JobStatus::ConfigError => summary.config_errors += 1,
                JobStatus::Pending | JobStatus::Running => summary.unfinished += 1,
            }
            match job.kind {
                JobKind::Fast => summary.ue_fast += u64::from(job.count),
                JobKind::Slow => summary.ue_slow += u64::from(job.count),
            }
        }

        summary
    }

    pub fn is_clean(&self) -> bool {
        self.timed_out == 0 && self.died == 0 && self.config_errors == 0 && self.unfinished == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_each_terminal_status() {
        let mut jobs = vec![
            Job::new(JobKind::Fast, 9, 1, 1),
            Job::new(JobKind::Slow, 1, 91, 1),
            Job::new(JobKind::Fast, 9, 10, 2),
            Job::new(JobKind::Slow, 1, 92, 2),
        ];
        jobs[0].finish(JobStatus::Completed);
        jobs[1].finish(JobStatus::TimedOut);
        jobs[2].finish(JobStatus::Died);
        jobs[3].finish(JobStatus::ConfigError);

        let summary = RunSummary::from_jobs(&jobs, 2, Duration::from_secs(42));

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.timed_out, 1);
        assert_eq!(summary.died, 1);
        assert_eq!(summary.config_errors, 1);
        assert_eq!(summary.unfinished, 2);
        assert_eq!(summary.ue_fast, 18);
        assert_eq!(summary.ue_slow, 2);
        assert!(!summary.is_clean());
    }

    #[test]
    fn all_completed_is_clean() {
        let mut job = Job::new(JobKind::Fast, 1, 1, 1);
        job.finish(JobStatus::Completed);
        let summary = RunSummary::from_jobs([&job], 0, Duration::ZERO);
        assert!(summary.is_clean());
    }
}
