//! Timestamped snapshots of the system hosts file.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::error::{HostsError, Result};

const FILE_PREFIX: &str = "hosts_";
const FILE_SUFFIX: &str = ".txt";
const ID_PREFIX: &str = "backup_";

/// One snapshot file in the backups directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    pub id: String,
    pub file_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub size: u64,
}

/// Owns the backups directory. Files are named `hosts_<timestamp>.txt`.
#[derive(Debug, Clone)]
pub struct BackupManager {
    dir: PathBuf,
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Copy `source` verbatim into a new snapshot file.
    pub fn create_from(&self, source: &Path) -> Result<BackupInfo> {
        let backup_err = |source_err| HostsError::Backup {
            path: source.to_path_buf(),
            source: source_err,
        };
        fs::create_dir_all(&self.dir).map_err(backup_err)?;

        let mut now = Utc::now();
        let (stamp, path) = loop {
            let stamp = file_stamp(now);
            let path = self.dir.join(format!("{FILE_PREFIX}{stamp}{FILE_SUFFIX}"));
            if !path.exists() {
                break (stamp, path);
            }
            now += ChronoDuration::milliseconds(1);
        };

        fs::copy(source, &path).map_err(backup_err)?;
        let size = fs::metadata(&path).map_err(backup_err)?.len();

        info!(path = %path.display(), size, "hosts file backed up");
        Ok(BackupInfo {
            id: format!("{ID_PREFIX}{stamp}"),
            file_path: path,
            created_at: now,
            size,
        })
    }

    /// Snapshots, newest first.
    pub fn list(&self) -> Result<Vec<BackupInfo>> {
        let mut backups = Vec::new();
        for (path, stamp) in self.snapshot_files()? {
            let meta = fs::metadata(&path)
                .map_err(|e| HostsError::io(format!("stat {}", path.display()), e))?;
            backups.push(BackupInfo {
                id: format!("{ID_PREFIX}{stamp}"),
                created_at: DateTime::<Utc>::from(file_time(&meta)),
                size: meta.len(),
                file_path: path,
            });
        }
        backups.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(backups)
    }

    pub fn find(&self, id: &str) -> Result<Option<BackupInfo>> {
        Ok(self.list()?.into_iter().find(|b| b.id == id))
    }

    pub fn read(&self, backup: &BackupInfo) -> Result<Vec<u8>> {
        fs::read(&backup.file_path)
            .map_err(|e| HostsError::io(format!("read {}", backup.file_path.display()), e))
    }

    /// Delete snapshots older than `keep_days` days. Returns how many were removed.
    pub fn prune(&self, keep_days: u32) -> Result<usize> {
        let age = Duration::from_secs(u64::from(keep_days) * 24 * 60 * 60);
        let cutoff = SystemTime::now()
            .checked_sub(age)
            .unwrap_or(UNIX_EPOCH);
        self.prune_older_than(cutoff)
    }

    /// Delete snapshots whose creation time is before `cutoff`.
    pub fn prune_older_than(&self, cutoff: SystemTime) -> Result<usize> {
        let mut removed = 0;
        for (path, _) in self.snapshot_files()? {
            let meta = fs::metadata(&path)
                .map_err(|e| HostsError::io(format!("stat {}", path.display()), e))?;
            if file_time(&meta) < cutoff {
                fs::remove_file(&path)
                    .map_err(|e| HostsError::io(format!("remove {}", path.display()), e))?;
                debug!(path = %path.display(), "pruned backup");
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, "old backups pruned");
        }
        Ok(removed)
    }

    /// Total bytes used by the backups directory.
    pub fn total_size(&self) -> Result<u64> {
        dir_size(&self.dir)
    }

    fn snapshot_files(&self) -> Result<Vec<(PathBuf, String)>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.dir)
            .map_err(|e| HostsError::io(format!("list {}", self.dir.display()), e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| HostsError::io("read backup entry", e))?;
            let name = entry.file_name().into_string().unwrap_or_default();
            if let Some(stamp) = snapshot_stamp(&name) {
                files.push((entry.path(), stamp.to_string()));
            }
        }
        Ok(files)
    }
}

/// ISO-8601 timestamp with `:` and `.` replaced so it is safe in file names.
pub fn file_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
        .replace([':', '.'], "-")
}

fn snapshot_stamp(file_name: &str) -> Option<&str> {
    file_name
        .strip_prefix(FILE_PREFIX)?
        .strip_suffix(FILE_SUFFIX)
        .filter(|s| !s.is_empty())
}

fn file_time(meta: &fs::Metadata) -> SystemTime {
    meta.created()
        .or_else(|_| meta.modified())
        .unwrap_or(UNIX_EPOCH)
}

/// Recursive size of a directory; a missing directory counts as zero.
pub(crate) fn dir_size(dir: &Path) -> Result<u64> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut total = 0;
    let entries =
        fs::read_dir(dir).map_err(|e| HostsError::io(format!("list {}", dir.display()), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| HostsError::io("read directory entry", e))?;
        let meta = entry
            .metadata()
            .map_err(|e| HostsError::io(format!("stat {}", entry.path().display()), e))?;
        total += if meta.is_dir() {
            dir_size(&entry.path())?
        } else {
            meta.len()
        };
    }
    Ok(total)
}
