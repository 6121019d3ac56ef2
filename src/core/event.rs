use std::fmt;

use chrono::{DateTime, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Start,
    Launch,
    Completed,
    Timeout,
    Died,
    ConfigError,
    Stop,
    End,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Start => "START",
            EventKind::Launch => "LAUNCH",
            EventKind::Completed => "COMPLETED",
            EventKind::Timeout => "TIMEOUT",
            EventKind::Died => "DIED",
            EventKind::ConfigError => "CONFIG_ERROR",
            EventKind::Stop => "STOP",
            EventKind::End => "END",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub timestamp: DateTime<Local>,
    pub kind: EventKind,
    pub active_count: u64,
    pub message: String,
}

impl Event {
    /// `[HH:MM:SS] TYPE: message (Active: n)`
    pub fn format_line(&self) -> String {
        format!(
            "[{}] {}: {} (Active: {})",
            self.timestamp.format("%H:%M:%S"),
            self.kind,
            self.message,
            self.active_count
        )
    }

    pub fn unix_seconds(&self) -> f64 {
        self.timestamp.timestamp_micros() as f64 / 1_000_000.0
    }
}

/// Append-only record of everything the scheduler did, with a cursor marking
/// how far the timeline file has caught up.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<Event>,
    flushed: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        kind: EventKind,
        message: impl Into<String>,
        active_count: u64,
    ) -> &Event {
        self.record_at(Local::now(), kind, message, active_count)
    }

    /// Timestamps never go backwards: a clock step is clamped to the
    /// previous event's time.
    pub fn record_at(
        &mut self,
        timestamp: DateTime<Local>,
        kind: EventKind,
        message: impl Into<String>,
        active_count: u64,
    ) -> &Event {
        let timestamp = match self.events.last() {
            Some(last) if last.timestamp > timestamp => last.timestamp,
            _ => timestamp,
        };

        let event = Event {
            timestamp,
            kind,
            active_count,
            message: message.into(),
        };
        tracing::info!(event = %event.kind, active = active_count, "{}", event.message);

        self.events.push(event);
        &self.events[self.events.len() - 1]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent(&self, limit: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(limit);
        &self.events[start..]
    }

    pub fn unflushed(&self) -> &[Event] {
        &self.events[self.flushed..]
    }

    pub fn mark_flushed(&mut self) {
        self.flushed = self.events.len();
    }

    pub fn count_of(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
