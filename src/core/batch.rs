use std::collections::VecDeque;

use crate::core::config::MAX_MSIN;
use crate::core::error::UeflowError;
use crate::core::job::{Job, JobKind};

/// Static shape of an experiment: `batches` rounds of one fast and one slow
/// job, each kind drawing identities from its own contiguous range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub batches: u32,
    pub fast_per_batch: u32,
    pub slow_per_batch: u32,
    pub fast_start: u64,
    pub slow_start: u64,
}

impl Default for BatchPlan {
    fn default() -> Self {
        Self {
            batches: 10,
            fast_per_batch: 9,
            slow_per_batch: 1,
            fast_start: 1,
            slow_start: 91,
        }
    }
}

impl BatchPlan {
    /// Total number of UEs the plan will ever launch.
    pub fn total_ues(&self) -> u64 {
        u64::from(self.batches)
            * (u64::from(self.fast_per_batch) + u64::from(self.slow_per_batch))
    }

    /// Highest identity (exclusive) each kind reaches: `(fast_end, slow_end)`.
    pub fn identity_ends(&self) -> Result<(u64, u64), UeflowError> {
        let batches = u64::from(self.batches);
        let end = |start: u64, per_batch: u32| {
            batches
                .checked_mul(u64::from(per_batch))
                .and_then(|span| start.checked_add(span))
                .ok_or_else(|| UeflowError::InvalidConfig {
                    message: format!("identity range starting at {start} overflows"),
                })
        };
        Ok((
            end(self.fast_start, self.fast_per_batch)?,
            end(self.slow_start, self.slow_per_batch)?,
        ))
    }

    /// Reject plans whose identities do not fit the MSIN field or collide.
    pub fn validate(&self) -> Result<(), UeflowError> {
        let invalid = |message: &str| {
            Err(UeflowError::InvalidConfig {
                message: message.to_string(),
            })
        };

        if self.fast_per_batch == 0 && self.slow_per_batch == 0 {
            return invalid("at least one UE kind needs a positive per-batch count");
        }

        let (fast_end, slow_end) = self.identity_ends()?;
        let fast_used = self.fast_per_batch > 0 && self.batches > 0;
        let slow_used = self.slow_per_batch > 0 && self.batches > 0;
        if (fast_used && fast_end - 1 > MAX_MSIN) || (slow_used && slow_end - 1 > MAX_MSIN) {
            return invalid("identity range exceeds the 10-digit MSIN space");
        }

        let overlap = self.fast_start < slow_end && self.slow_start < fast_end;
        if fast_used && slow_used && overlap {
            return invalid("fast and slow identity ranges overlap");
        }

        Ok(())
    }
}

pub fn build_queue(plan: &BatchPlan) -> VecDeque<Job> {
    let mut queue = VecDeque::with_capacity(plan.batches as usize * 2);
    let mut fast_imsi = plan.fast_start;
    let mut slow_imsi = plan.slow_start;

    for batch_id in 1..=plan.batches {
        if plan.fast_per_batch > 0 {
            queue.push_back(Job::new(
                JobKind::Fast,
                plan.fast_per_batch,
                fast_imsi,
                batch_id,
            ));
            fast_imsi += u64::from(plan.fast_per_batch);
        }

        if plan.slow_per_batch > 0 {
            queue.push_back(Job::new(
                JobKind::Slow,
                plan.slow_per_batch,
                slow_imsi,
                batch_id,
            ));
            slow_imsi += u64::from(plan.slow_per_batch);
        }
    }

    queue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_plan_interleaves_fast_then_slow() {
        let queue = build_queue(&BatchPlan::default());
        assert_eq!(queue.len(), 20);

        for (index, job) in queue.iter().enumerate() {
            let expected_kind = if index % 2 == 0 {
                JobKind::Fast
            } else {
                JobKind::Slow
            };
            assert_eq!(job.kind, expected_kind);
            assert_eq!(job.batch_id, index as u32 / 2 + 1);
        }
    }

    #[test]
    fn identity_ranges_advance_per_kind() {
        let queue = build_queue(&BatchPlan::default());
        let fast: Vec<&Job> = queue.iter().filter(|j| j.kind == JobKind::Fast).collect();
        let slow: Vec<&Job> = queue.iter().filter(|j| j.kind == JobKind::Slow).collect();

        assert_eq!(fast[0].start_imsi, 1);
        assert_eq!(fast[1].start_imsi, 10);
        assert_eq!(fast[9].end_imsi(), 91);
        assert_eq!(slow[0].start_imsi, 91);
        assert_eq!(slow[9].start_imsi, 100);

        for pair in fast.windows(2).chain(slow.windows(2)) {
            assert_eq!(pair[0].end_imsi(), pair[1].start_imsi);
        }
    }

    #[test]
    fn queue_total_matches_plan() {
        let plan = BatchPlan {
            batches: 4,
            fast_per_batch: 7,
            slow_per_batch: 3,
            fast_start: 1,
            slow_start: 500,
        };
        let queue = build_queue(&plan);
        let total: u64 = queue.iter().map(|j| u64::from(j.count)).sum();
        assert_eq!(total, plan.total_ues());
        assert_eq!(plan.identity_ends().unwrap(), (29, 512));
    }

    #[test]
    fn zero_count_kind_is_skipped() {
        let plan = BatchPlan {
            batches: 3,
            slow_per_batch: 0,
            ..BatchPlan::default()
        };
        let queue = build_queue(&plan);
        assert_eq!(queue.len(), 3);
        assert!(queue.iter().all(|j| j.kind == JobKind::Fast));
    }

    #[test]
    fn identity_end_overflow_is_an_error() {
        let plan = BatchPlan {
            fast_start: u64::MAX,
            ..BatchPlan::default()
        };
        assert!(matches!(
            plan.identity_ends(),
            Err(UeflowError::InvalidConfig { .. })
        ));

        let plan = BatchPlan {
            slow_start: u64::MAX - 5,
            ..BatchPlan::default()
        };
        assert!(plan.identity_ends().is_err());
        assert!(plan.validate().is_err());
    }

    #[test]
    fn zero_batches_builds_empty_queue() {
        let plan = BatchPlan {
            batches: 0,
            ..BatchPlan::default()
        };
        assert!(build_queue(&plan).is_empty());
    }
}
