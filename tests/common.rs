//! Shared test helpers.

#![allow(dead_code)]

use hostgenius::backup::BackupManager;
use hostgenius::error::{HostsError, Result};
use hostgenius::manager::HostManager;
use hostgenius::platform::{PrivilegedExec, ShellExec, FLUSH_FAILED_MARKER};
use hostgenius::store::GroupStore;
use hostgenius::writer::SystemHostsWriter;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create a temp directory for use as HOSTGENIUS_HOME.
/// Uses current dir (workspace) so sandbox allows full access.
pub fn temp_home() -> TempDir {
    tempfile::Builder::new()
        .prefix("hostgenius_test_")
        .tempdir_in(std::env::current_dir().unwrap_or_else(|_| std::path::Path::new(".").into()))
        .expect("temp dir")
}

/// Run a closure with HOSTGENIUS_HOME set to the given path.
pub fn with_test_env<F, R>(home: &Path, f: F) -> R
where
    F: FnOnce() -> R,
{
    let prev = std::env::var_os("HOSTGENIUS_HOME");
    std::env::set_var("HOSTGENIUS_HOME", home);
    let r = f();
    match prev {
        Some(v) => std::env::set_var("HOSTGENIUS_HOME", v),
        None => std::env::remove_var("HOSTGENIUS_HOME"),
    }
    r
}

/// How [`MockExec`] answers a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMode {
    /// Run the command with [`ShellExec`] (real `cp`, unix only).
    Shell,
    /// Report success without doing anything.
    Succeed,
    /// Elevation prompt dismissed.
    Deny,
    /// Non-zero exit.
    Fail,
    /// Copy not performed, flush marker printed.
    FlushFails,
}

/// Executor that records every command it is given.
pub struct MockExec {
    mode: MockMode,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockExec {
    pub fn new(mode: MockMode) -> (Box<dyn PrivilegedExec>, Arc<Mutex<Vec<String>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let exec = MockExec {
            mode,
            calls: Arc::clone(&calls),
        };
        (Box::new(exec), calls)
    }
}

impl PrivilegedExec for MockExec {
    fn exec(&self, command: &str) -> Result<String> {
        self.calls.lock().unwrap().push(command.to_string());
        match self.mode {
            MockMode::Shell => ShellExec.exec(command),
            MockMode::Succeed => Ok(String::new()),
            MockMode::Deny => Err(HostsError::Permission("User canceled.".to_string())),
            MockMode::Fail => Err(HostsError::CommandFailed {
                status: "exit status: 1".to_string(),
                stderr: "cp: permission denied".to_string(),
            }),
            MockMode::FlushFails => Ok(format!("{FLUSH_FAILED_MARKER}\n")),
        }
    }
}

/// Layout of a sandboxed hosts file, backups and temp directory under `dir`.
pub struct Sandbox {
    pub hosts: PathBuf,
    pub backups: PathBuf,
    pub temp: PathBuf,
    pub db: PathBuf,
}

impl Sandbox {
    pub fn new(dir: &Path, hosts_content: &str) -> Self {
        let sandbox = Sandbox {
            hosts: dir.join("hosts"),
            backups: dir.join("backups"),
            temp: dir.join("tmp"),
            db: dir.join(".data.db"),
        };
        fs::write(&sandbox.hosts, hosts_content).unwrap();
        fs::create_dir_all(&sandbox.temp).unwrap();
        sandbox
    }

    pub fn writer(&self, exec: Box<dyn PrivilegedExec>) -> SystemHostsWriter {
        SystemHostsWriter::new(&self.hosts, BackupManager::new(&self.backups), exec)
            .with_flush_dns(false)
            .with_temp_dir(&self.temp)
    }

    pub fn manager(&self, exec: Box<dyn PrivilegedExec>) -> HostManager {
        let store = GroupStore::open(&self.db).unwrap();
        HostManager::new(store, self.writer(exec))
    }

    pub fn hosts_content(&self) -> String {
        fs::read_to_string(&self.hosts).unwrap()
    }

    pub fn temp_files(&self) -> usize {
        fs::read_dir(&self.temp).unwrap().count()
    }
}
