use std::time::Duration;

use crate::core::job::Job;
use crate::core::summary::RunSummary;

pub fn format_plan_line(index: usize, job: &Job) -> String {
    format!(
        "{:>3}  batch={:<3} {:<4} count={:<3} imsi={:010}..{:010}",
        index + 1,
        job.batch_id,
        job.kind,
        job.count,
        job.start_imsi,
        job.end_imsi().saturating_sub(1)
    )
}

pub fn format_summary_line(summary: &RunSummary) -> String {
    format!(
        "Final  : completed={} timed_out={} died={} config_error={} unfinished={} ue_fast={} ue_slow={} duration={}",
        summary.completed,
        summary.timed_out,
        summary.died,
        summary.config_errors,
        summary.unfinished,
        summary.ue_fast,
        summary.ue_slow,
        format_duration(summary.elapsed)
    )
}

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Quote a CSV field when it contains a separator, quote or line break.
pub fn escape_csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
