use std::collections::VecDeque;

use crate::core::job::Job;

/// UEs currently held by running jobs.
pub fn active_count(active: &[Job]) -> u64 {
    active.iter().map(|job| u64::from(job.count)).sum()
}

pub fn available_slots(ceiling: u32, active: u64) -> u32 {
    u64::from(ceiling).saturating_sub(active) as u32
}

/// Take at most `available` UEs from the head of the queue.
///
/// A head that does not fit is split: the low end of its range is returned
/// and the remainder stays at the front for a later tick.
pub fn admit_next(queue: &mut VecDeque<Job>, available: u32) -> Option<Job> {
    if available == 0 {
        return None;
    }

    let head = queue.front_mut()?;
    if head.count <= available {
        queue.pop_front()
    } else {
        Some(head.split_front(available))
    }
}
