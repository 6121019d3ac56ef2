#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use tempfile::TempDir;

use ueflow::core::config::ExperimentConfig;
use ueflow::core::error::{TerminationError, UeflowError};
use ueflow::core::launcher::{LaunchRequest, Launcher, WorkerProcess};
use ueflow::core::registry::{SessionRegistry, SessionView};

pub const TEMPLATE: &str = "ue:\n  mcc: 208\n  mnc: 93\n  msin: \"0000000001\"\n";

/// Shared view of one fake worker.
#[derive(Debug, Default)]
pub struct WorkerState {
    pub alive: Cell<bool>,
    pub terminations: Cell<u32>,
}

#[derive(Debug)]
pub struct FakeProcess {
    pid: u32,
    state: Rc<WorkerState>,
}

impl WorkerProcess for FakeProcess {
    fn id(&self) -> u32 {
        self.pid
    }

    fn is_alive(&mut self) -> bool {
        self.state.alive.get()
    }

    fn terminate(&mut self) -> Result<(), TerminationError> {
        self.state.terminations.set(self.state.terminations.get() + 1);
        self.state.alive.set(false);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LaunchRecord {
    pub config_path: PathBuf,
    pub log_path: PathBuf,
    pub count: u32,
    pub state: Rc<WorkerState>,
}

/// Launcher whose workers never touch the OS.
#[derive(Debug, Clone, Default)]
pub struct FakeLauncher {
    pub launches: Rc<RefCell<Vec<LaunchRecord>>>,
    pub fail: Rc<Cell<bool>>,
}

impl FakeLauncher {
    pub fn launched(&self) -> Vec<LaunchRecord> {
        self.launches.borrow().clone()
    }
}

impl Launcher for FakeLauncher {
    fn launch(&mut self, request: &LaunchRequest<'_>) -> Result<Box<dyn WorkerProcess>, UeflowError> {
        if self.fail.get() {
            return Err(UeflowError::WorkerNotFound {
                program: "fake-worker".to_string(),
            });
        }

        fs::write(request.log_path, "").map_err(|e| UeflowError::io("fake log", e))?;

        let state = Rc::new(WorkerState {
            alive: Cell::new(true),
            terminations: Cell::new(0),
        });
        let mut launches = self.launches.borrow_mut();
        launches.push(LaunchRecord {
            config_path: request.config_path.to_path_buf(),
            log_path: request.log_path.to_path_buf(),
            count: request.count,
            state: Rc::clone(&state),
        });

        Ok(Box::new(FakeProcess {
            pid: 1000 + launches.len() as u32,
            state,
        }))
    }
}

/// Registry returning whatever the test put in it.
#[derive(Debug, Clone, Default)]
pub struct FakeRegistry {
    pub sessions: Rc<RefCell<HashSet<String>>>,
    pub down: Rc<Cell<bool>>,
}

impl FakeRegistry {
    pub fn set(&self, sessions: impl IntoIterator<Item = String>) {
        *self.sessions.borrow_mut() = sessions.into_iter().collect();
    }

    pub fn hold(&self, sessions: impl IntoIterator<Item = String>) {
        self.sessions.borrow_mut().extend(sessions);
    }
}

impl SessionRegistry for FakeRegistry {
    fn query(&self) -> SessionView {
        if self.down.get() {
            SessionView::Unavailable
        } else {
            SessionView::Available(self.sessions.borrow().clone())
        }
    }
}

pub struct TestEnv {
    pub dir: TempDir,
    pub config: ExperimentConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let fast_template = dir.path().join("ue1.yaml");
        let slow_template = dir.path().join("ue2.yaml");
        fs::write(&fast_template, TEMPLATE).unwrap();
        fs::write(&slow_template, TEMPLATE).unwrap();

        let config = ExperimentConfig {
            fast_template,
            slow_template,
            log_dir: dir.path().join("logs"),
            status_file: dir.path().join("experiment_status.json"),
            timeline_file: dir.path().join("timeline.csv"),
            tick_interval: Duration::from_millis(10),
            ..ExperimentConfig::default()
        };

        Self { dir, config }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
