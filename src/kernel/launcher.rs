use std::{
    collections::HashMap,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    error::{ErrorCode, KernelError, KernelResult},
    kernel::program::{Entry, ProgramRegistry},
    library::Library,
    utils::panic_message,
};

/// Process identity. Handed out in increasing order starting at 1.
pub type Pid = i32;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LaunchError {
    #[error("no such program: {0}")]
    NoSuchProgram(String),

    #[error("program {0} has no entry point")]
    NoEntryPoint(String),

    #[error("unable to start {name}: {reason}")]
    BadCommand { name: String, reason: String },
}

impl LaunchError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NoSuchProgram(_) => ErrorCode::NoClass,
            Self::NoEntryPoint(_) => ErrorCode::NoMain,
            Self::BadCommand { .. } => ErrorCode::BadCommand,
        }
    }
}

/// One launched program. Carries its exit code once it has finished.
#[derive(Debug)]
pub struct ProcessRecord {
    pid: Pid,
    name: String,
    args: Vec<String>,
    outcome: Mutex<Option<i32>>,
    finished: Condvar,
}

impl ProcessRecord {
    fn new(pid: Pid, name: &str, args: Vec<String>) -> Self {
        Self {
            pid,
            name: name.to_string(),
            args,
            outcome: Mutex::new(None),
            finished: Condvar::new(),
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.lock().is_some()
    }

    fn finish(&self, code: i32) {
        *self.outcome.lock() = Some(code);
        self.finished.notify_all();
    }

    /// Blocks until the process has finished and returns its exit code.
    pub fn wait(&self) -> i32 {
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(code) = *outcome {
                return code;
            }
            self.finished.wait(&mut outcome);
        }
    }
}

#[derive(Debug)]
struct ProcessTable {
    next_pid: Pid,
    records: HashMap<Pid, Arc<ProcessRecord>>,
}

/// Starts programs on their own threads and lets callers wait for them.
#[derive(Debug)]
pub struct Launcher {
    programs: ProgramRegistry,
    table: Mutex<ProcessTable>,
}

impl Launcher {
    pub fn new(programs: ProgramRegistry) -> Self {
        Self {
            programs,
            table: Mutex::new(ProcessTable {
                next_pid: 1,
                records: HashMap::new(),
            }),
        }
    }

    pub fn programs(&self) -> &ProgramRegistry {
        &self.programs
    }

    /// Starts `name` in parallel with the caller and returns its pid.
    ///
    /// No pid is used up when the name cannot be resolved.
    pub fn launch(&self, library: &Library, name: &str, args: Vec<String>) -> Result<Pid, LaunchError> {
        let entry = self.programs.resolve(name)?;

        let record = {
            let mut table = self.table.lock();
            let pid = table.next_pid;
            table.next_pid += 1;
            let record = Arc::new(ProcessRecord::new(pid, name, args));
            table.records.insert(pid, Arc::clone(&record));
            record
        };
        let pid = record.pid;

        let library = library.clone();
        let process = Arc::clone(&record);
        let spawned = thread::Builder::new()
            .name(format!("{name}-{pid}"))
            .spawn(move || {
                let code = run_process(&library, &process, entry);
                process.finish(code);
            });

        if let Err(e) = spawned {
            self.table.lock().records.remove(&pid);
            record.finish(ErrorCode::BadCommand.code());
            return Err(LaunchError::BadCommand {
                name: name.to_string(),
                reason: e.to_string(),
            });
        }

        info!(pid, program = name, "process launched");
        Ok(pid)
    }

    /// Waits for `pid` to finish and returns its exit code.
    ///
    /// The record leaves the table before the wait, so only one caller can
    /// join a given pid.
    pub fn join_one(&self, pid: Pid) -> KernelResult<i32> {
        let record = self
            .table
            .lock()
            .records
            .remove(&pid)
            .ok_or(KernelError::NoSuchProcess(pid))?;

        let code = record.wait();
        debug!(pid, code, "process joined");
        Ok(code)
    }

    /// Waits until every process in the table has finished, including ones
    /// launched while waiting.
    ///
    /// Finished records stay in the table; they can still be joined once.
    pub fn join_all(&self) {
        loop {
            let running = self
                .table
                .lock()
                .records
                .values()
                .find(|record| !record.is_finished())
                .cloned();
            match running {
                Some(record) => {
                    record.wait();
                }
                None => break,
            }
        }
        debug!("all processes finished");
    }

    /// Launches `name` and waits for it.
    pub fn exec_and_wait(&self, library: &Library, name: &str, args: Vec<String>) -> KernelResult<i32> {
        let pid = self.launch(library, name, args)?;
        self.join_one(pid)
    }

    /// Pids currently in the table, in increasing order.
    pub fn live(&self) -> Vec<Pid> {
        let mut pids: Vec<Pid> = self.table.lock().records.keys().copied().collect();
        pids.sort_unstable();
        pids
    }
}

fn run_process(library: &Library, record: &ProcessRecord, entry: Entry) -> i32 {
    match panic::catch_unwind(AssertUnwindSafe(|| entry(library, &record.args))) {
        Ok(code) => {
            debug!(pid = record.pid, code, "process exited");
            code
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            warn!(pid = record.pid, program = %record.name, %reason, "process crashed");
            library.output(format!("Kernel: User error: {reason}\n"));
            ErrorCode::InChild.code()
        }
    }
}
