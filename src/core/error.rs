use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UeflowError {
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("worker binary not found: {program}")]
    WorkerNotFound { program: String },
    #[error("failed to spawn worker {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("session registry request failed: {0}")]
    Registry(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl UeflowError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        UeflowError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Failures while turning a per-kind template into a worker config.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template has no msin field")]
    MissingField,
    #[error("failed to read template {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write config {}: {source}", .path.display())]
    Unwritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum TerminationError {
    #[error("process id {pid} is out of range for signalling")]
    InvalidPid { pid: u32 },
    #[error("failed to signal process {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: io::Error,
    },
}
