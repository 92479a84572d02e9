//! Privileged overwrite of the system hosts file.
//!
//! Every write walks `Idle -> BackingUp -> Writing -> FlushingDns ->
//! CleaningTemp -> Idle`; any error leaves the writer in `Failed` until the
//! next write. The backup must succeed before the live file is touched, and the
//! temp file is removed whatever happens after it was created.

use parking_lot::Mutex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backup::{BackupInfo, BackupManager};
use crate::error::{HostsError, Result};
use crate::platform::{flush_dns_command, install_command, PrivilegedExec, FLUSH_FAILED_MARKER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStage {
    Idle,
    BackingUp,
    Writing,
    FlushingDns,
    CleaningTemp,
    Failed,
}

/// Outcome of the DNS flush chained after the copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DnsFlush {
    Flushed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteReport {
    pub backup: BackupInfo,
    pub bytes_written: u64,
    pub dns_flush: DnsFlush,
}

pub struct SystemHostsWriter {
    hosts_path: PathBuf,
    temp_dir: PathBuf,
    backups: BackupManager,
    executor: Box<dyn PrivilegedExec>,
    flush_dns: bool,
    stage: Mutex<WriteStage>,
    write_lock: Mutex<()>,
}

impl SystemHostsWriter {
    pub fn new(
        hosts_path: impl Into<PathBuf>,
        backups: BackupManager,
        executor: Box<dyn PrivilegedExec>,
    ) -> Self {
        Self {
            hosts_path: hosts_path.into(),
            temp_dir: std::env::temp_dir(),
            backups,
            executor,
            flush_dns: true,
            stage: Mutex::new(WriteStage::Idle),
            write_lock: Mutex::new(()),
        }
    }

    pub fn with_flush_dns(mut self, flush_dns: bool) -> Self {
        self.flush_dns = flush_dns;
        self
    }

    /// Directory for the staging file handed to the elevated copy.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    pub fn hosts_path(&self) -> &Path {
        &self.hosts_path
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn stage(&self) -> WriteStage {
        *self.stage.lock()
    }

    /// Current hosts file content; a missing file reads as empty.
    pub fn read_raw(&self) -> Result<String> {
        if !self.hosts_path.exists() {
            return Ok(String::new());
        }
        fs::read_to_string(&self.hosts_path)
            .map_err(|e| HostsError::io(format!("read {}", self.hosts_path.display()), e))
    }

    /// Back up the live file, then replace it with `content`.
    ///
    /// Concurrent callers are serialized; one write runs at a time.
    pub fn write(&self, content: &[u8]) -> Result<WriteReport> {
        let _guard = self.write_lock.lock();
        let result = self.run(content);
        match &result {
            Ok(report) => {
                self.enter(WriteStage::Idle);
                info!(
                    path = %self.hosts_path.display(),
                    bytes = report.bytes_written,
                    backup = %report.backup.id,
                    "hosts file updated"
                );
            }
            Err(e) => {
                self.enter(WriteStage::Failed);
                warn!(path = %self.hosts_path.display(), error = %e, "hosts file update failed");
            }
        }
        result
    }

    fn run(&self, content: &[u8]) -> Result<WriteReport> {
        self.enter(WriteStage::BackingUp);
        let backup = self.backups.create_from(&self.hosts_path)?;

        self.enter(WriteStage::Writing);
        let temp = self
            .temp_dir
            .join(format!("hostgenius_hosts_{}.txt", Uuid::new_v4().simple()));
        if let Err(e) = fs::write(&temp, content) {
            self.enter(WriteStage::CleaningTemp);
            remove_temp(&temp);
            return Err(HostsError::io(format!("write {}", temp.display()), e));
        }

        let flush = self.flush_dns.then(flush_dns_command);
        let command = install_command(&temp, &self.hosts_path, flush);
        let outcome = self.executor.exec(&command);

        let dns_flush = match (&outcome, flush) {
            (Ok(stdout), Some(flush)) => {
                self.enter(WriteStage::FlushingDns);
                if stdout.contains(FLUSH_FAILED_MARKER) {
                    warn!(command = flush, "DNS cache flush failed; hosts file was still written");
                    DnsFlush::Failed
                } else {
                    DnsFlush::Flushed
                }
            }
            _ => DnsFlush::Skipped,
        };

        self.enter(WriteStage::CleaningTemp);
        remove_temp(&temp);

        outcome?;
        Ok(WriteReport {
            backup,
            bytes_written: content.len() as u64,
            dns_flush,
        })
    }

    fn enter(&self, stage: WriteStage) {
        *self.stage.lock() = stage;
        debug!(?stage, "hosts write stage");
    }
}

fn remove_temp(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "could not remove temp file");
        }
    }
}
