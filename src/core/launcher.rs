use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::core::command::WorkerCommand;
use crate::core::error::{TerminationError, UeflowError};

/// A launched worker as seen by the scheduler: it can only be probed and
/// signalled, never waited on.
pub trait WorkerProcess: fmt::Debug {
    fn id(&self) -> u32;

    /// Non-blocking liveness probe.
    fn is_alive(&mut self) -> bool;

    /// Ask the worker to stop (SIGTERM for OS processes).
    fn terminate(&mut self) -> Result<(), TerminationError>;
}

#[derive(Debug, Clone, Copy)]
pub struct LaunchRequest<'a> {
    pub config_path: &'a Path,
    pub log_path: &'a Path,
    pub count: u32,
}

pub trait Launcher {
    fn launch(&mut self, request: &LaunchRequest<'_>) -> Result<Box<dyn WorkerProcess>, UeflowError>;
}

/// Spawns workers as child processes with stdout and stderr captured in the
/// job log.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    command: WorkerCommand,
}

impl ProcessLauncher {
    pub fn new(command: WorkerCommand) -> Self {
        Self { command }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&mut self, request: &LaunchRequest<'_>) -> Result<Box<dyn WorkerProcess>, UeflowError> {
        let log = File::create(request.log_path).map_err(|e| {
            UeflowError::io(
                format!("failed to create worker log {}", request.log_path.display()),
                e,
            )
        })?;
        let log_stderr = log.try_clone().map_err(|e| {
            UeflowError::io(
                format!("failed to share worker log {}", request.log_path.display()),
                e,
            )
        })?;

        let mut cmd = Command::new(&self.command.program);
        cmd.args(self.command.to_args(request.config_path, request.count))
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_stderr));

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                UeflowError::WorkerNotFound {
                    program: self.command.program.clone(),
                }
            } else {
                UeflowError::Spawn {
                    program: self.command.program.clone(),
                    source: e,
                }
            }
        })?;

        tracing::debug!(pid = child.id(), program = %self.command.program, "worker spawned");

        Ok(Box::new(ChildProcess {
            child,
            exited: false,
            signalled: false,
        }))
    }
}

/// How long dropping a signalled worker waits for it to exit and be reaped.
const REAP_GRACE: Duration = Duration::from_millis(250);
const REAP_POLL: Duration = Duration::from_millis(5);

#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    exited: bool,
    signalled: bool,
}

impl WorkerProcess for ChildProcess {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn is_alive(&mut self) -> bool {
        if self.exited {
            return false;
        }

        match self.child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(pid = self.child.id(), %status, "worker exited");
                self.exited = true;
                false
            }
            Ok(None) => true,
            Err(e) => {
                // Undecidable probe; let the timeout settle it.
                tracing::warn!(pid = self.child.id(), error = %e, "worker liveness probe failed");
                true
            }
        }
    }

    fn terminate(&mut self) -> Result<(), TerminationError> {
        // A reaped pid may already belong to someone else.
        if !self.is_alive() {
            return Ok(());
        }

        let pid = self.child.id();
        let raw = libc::pid_t::try_from(pid).map_err(|_| TerminationError::InvalidPid { pid })?;

        // SAFETY: kill(2) has no memory-safety preconditions; `raw` is the pid of
        // a child we spawned and have not yet reaped.
        #[allow(unsafe_code)]
        let result = unsafe { libc::kill(raw, libc::SIGTERM) };
        if result == 0 {
            self.signalled = true;
            Ok(())
        } else {
            Err(TerminationError::Signal {
                pid,
                source: io::Error::last_os_error(),
            })
        }
    }
}

impl Drop for ChildProcess {
    /// Reap the worker so a terminated job does not linger as a zombie. Only a
    /// worker we signalled is waited for, and never longer than `REAP_GRACE`.
    fn drop(&mut self) {
        if !self.is_alive() {
            return;
        }
        if !self.signalled {
            tracing::debug!(pid = self.child.id(), "dropping handle of a running worker");
            return;
        }

        let deadline = Instant::now() + REAP_GRACE;
        while Instant::now() < deadline {
            thread::sleep(REAP_POLL);
            if !self.is_alive() {
                return;
            }
        }
        tracing::debug!(pid = self.child.id(), "worker still running after SIGTERM");
    }
}
