use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::core::admission::active_count;
use crate::core::error::UeflowError;
use crate::core::event::{Event, EventLog};
use crate::core::formatter::escape_csv_field;
use crate::core::job::{Job, JobKind};

pub const RECENT_EVENTS: usize = 10;
pub const TIMELINE_HEADER: &str = "timestamp,event_type,active_count,message";

/// What the status viewer polls.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub start_time: f64,
    pub current_time: f64,
    pub elapsed: f64,
    pub active_ue_count: u64,
    pub completed_fast: u64,
    pub completed_slow: u64,
    pub active_jobs: Vec<String>,
    pub events: Vec<String>,
}

impl StatusSnapshot {
    pub fn capture(
        started_at: DateTime<Local>,
        now: DateTime<Local>,
        active: &[Job],
        completed: &[Job],
        events: &EventLog,
    ) -> Self {
        let ue_total = |kind: JobKind| -> u64 {
            completed
                .iter()
                .filter(|job| job.kind == kind)
                .map(|job| u64::from(job.count))
                .sum()
        };

        let start_time = unix_seconds(started_at);
        let current_time = unix_seconds(now);

        Self {
            start_time,
            current_time,
            elapsed: (current_time - start_time).max(0.0),
            active_ue_count: active_count(active),
            completed_fast: ue_total(JobKind::Fast),
            completed_slow: ue_total(JobKind::Slow),
            active_jobs: active.iter().map(|job| job.to_string()).collect(),
            events: events
                .recent(RECENT_EVENTS)
                .iter()
                .map(Event::format_line)
                .collect(),
        }
    }
}

fn unix_seconds(at: DateTime<Local>) -> f64 {
    at.timestamp_micros() as f64 / 1_000_000.0
}

pub fn timeline_row(event: &Event) -> String {
    format!(
        "{:.6},{},{},{}",
        event.unix_seconds(),
        event.kind,
        event.active_count,
        escape_csv_field(&event.message)
    )
}

/// Writes the status snapshot and the CSV timeline.
#[derive(Debug, Clone)]
pub struct Reporter {
    status_path: PathBuf,
    timeline_path: PathBuf,
}

impl Reporter {
    pub fn new(status_path: impl Into<PathBuf>, timeline_path: impl Into<PathBuf>) -> Self {
        Self {
            status_path: status_path.into(),
            timeline_path: timeline_path.into(),
        }
    }

    pub fn status_path(&self) -> &Path {
        &self.status_path
    }

    pub fn timeline_path(&self) -> &Path {
        &self.timeline_path
    }

    /// Truncate the timeline and write its header.
    pub fn init_timeline(&self) -> Result<(), UeflowError> {
        fs::write(&self.timeline_path, format!("{TIMELINE_HEADER}\n")).map_err(|e| {
            UeflowError::io(
                format!("failed to create timeline {}", self.timeline_path.display()),
                e,
            )
        })
    }

    /// Replace the snapshot file via write-then-rename so readers never see a
    /// half-written document.
    pub fn write_status(&self, snapshot: &StatusSnapshot) -> Result<(), UeflowError> {
        let body = serde_json::to_string_pretty(snapshot)?;
        let tmp_path = self.status_path.with_extension("json.tmp");

        fs::write(&tmp_path, body).map_err(|e| {
            UeflowError::io(format!("failed to write {}", tmp_path.display()), e)
        })?;
        fs::rename(&tmp_path, &self.status_path).map_err(|e| {
            UeflowError::io(
                format!("failed to replace {}", self.status_path.display()),
                e,
            )
        })
    }

    pub fn append_timeline(&self, events: &[Event]) -> Result<(), UeflowError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut rows = String::new();
        for event in events {
            rows.push_str(&timeline_row(event));
            rows.push('\n');
        }

        let context = || format!("failed to append to {}", self.timeline_path.display());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.timeline_path)
            .map_err(|e| UeflowError::io(context(), e))?;
        file.write_all(rows.as_bytes())
            .map_err(|e| UeflowError::io(context(), e))
    }

    /// Best-effort publish of both artifacts. Events stay queued for the next
    /// call when the timeline cannot be appended.
    pub fn publish(&self, snapshot: &StatusSnapshot, events: &mut EventLog) {
        if let Err(e) = self.write_status(snapshot) {
            tracing::warn!(error = %e, "status snapshot not written");
        }

        match self.append_timeline(events.unflushed()) {
            Ok(()) => events.mark_flushed(),
            Err(e) => tracing::warn!(error = %e, "timeline not updated"),
        }
    }
}
