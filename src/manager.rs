//! Host manager service: ties the group store to the system hosts writer.
//!
//! Construct one per process and hand it to whatever boundary layer drives it.

use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::backup::{dir_size, BackupInfo, BackupManager};
use crate::config::{Config, HostGeniusPaths};
use crate::error::{HostsError, Result};
use crate::group::{GroupExport, GroupUpdate, HostGroup, HostHistory, NewGroup};
use crate::hosts::{self, HostEntry};
use crate::platform::default_executor;
use crate::sections::{self, Dialect};
use crate::store::GroupStore;
use crate::writer::{SystemHostsWriter, WriteReport};

/// Description given to groups created by a hosts-file import.
pub const IMPORTED_DESCRIPTION: &str = "Imported from a hosts configuration file";

/// How the enabled groups are combined into one hosts body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// System content plus a HostGenius managed section (what `apply` writes).
    #[default]
    Sections,
    /// Plain concatenation of enabled groups.
    Concat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DataSize {
    pub total: u64,
    pub database: u64,
    pub backups: u64,
}

pub struct HostManager {
    store: GroupStore,
    writer: SystemHostsWriter,
}

impl HostManager {
    pub fn new(store: GroupStore, writer: SystemHostsWriter) -> Self {
        Self { store, writer }
    }

    /// Open the store under `paths`, wire the platform writer and pull the
    /// current system portion of the hosts file into the system group.
    pub fn open(paths: &HostGeniusPaths, config: &Config) -> Result<Self> {
        for dir in [&paths.data_dir, &paths.backups_dir] {
            fs::create_dir_all(dir)
                .map_err(|e| HostsError::io(format!("create {}", dir.display()), e))?;
        }
        let store = GroupStore::open(&paths.db_file)?;
        let writer = SystemHostsWriter::new(
            config.hosts_path(),
            BackupManager::new(&paths.backups_dir),
            default_executor(),
        )
        .with_flush_dns(config.should_flush_dns());

        let manager = Self::new(store, writer);
        if let Err(e) = manager.sync_system_group() {
            warn!(error = %e, "could not initialise system group from hosts file");
        }
        Ok(manager)
    }

    pub fn store(&self) -> &GroupStore {
        &self.store
    }

    pub fn writer(&self) -> &SystemHostsWriter {
        &self.writer
    }

    pub fn backups(&self) -> &BackupManager {
        self.writer.backups()
    }

    // Groups

    pub fn groups(&self) -> Result<Vec<HostGroup>> {
        self.store.get_all_groups()
    }

    /// Look a group up by id, falling back to its name.
    pub fn find_group(&self, id_or_name: &str) -> Result<Option<HostGroup>> {
        match self.store.get_group_by_id(id_or_name)? {
            Some(group) => Ok(Some(group)),
            None => self.store.get_group_by_name(id_or_name),
        }
    }

    /// Create a user group. User groups are never system groups.
    pub fn create_group(&self, group: NewGroup) -> Result<String> {
        self.store.create_group(NewGroup {
            is_system: false,
            ..group
        })
    }

    pub fn update_group(&self, id: &str, update: &GroupUpdate) -> Result<bool> {
        self.store.update_group(id, update)
    }

    pub fn delete_group(&self, id: &str) -> Result<bool> {
        self.store.delete_group(id)
    }

    pub fn toggle_group(&self, id: &str) -> Result<bool> {
        let Some(group) = self.store.get_group_by_id(id)? else {
            return Ok(false);
        };
        self.store
            .update_group(id, &GroupUpdate::enabled(!group.enabled))
    }

    pub fn group_history(&self, id: &str, limit: usize) -> Result<Vec<HostHistory>> {
        self.store.get_history(id, limit)
    }

    // System hosts file

    /// Raw hosts file; a missing file reads as empty.
    pub fn read_raw_system_hosts(&self) -> Result<String> {
        self.writer.read_raw()
    }

    /// Raw hosts file, refreshing the system group from its unmanaged part.
    pub fn read_system_hosts(&self) -> Result<String> {
        let raw = self.writer.read_raw()?;
        self.sync_system_content(&raw)?;
        info!(length = raw.len(), "read system hosts file");
        Ok(raw)
    }

    pub fn parsed_system_hosts(&self) -> Result<Vec<HostEntry>> {
        Ok(hosts::parse(&self.writer.read_raw()?))
    }

    /// Copy the unmanaged part of the live file into the system group.
    /// Returns whether the group changed.
    pub fn sync_system_group(&self) -> Result<bool> {
        let raw = self.writer.read_raw()?;
        self.sync_system_content(&raw)
    }

    fn sync_system_content(&self, raw: &str) -> Result<bool> {
        let system_portion = sections::extract_system_portion(raw);
        let system = self.store.system_group()?;
        if system.content == system_portion {
            return Ok(false);
        }
        self.store
            .update_group(&system.id, &GroupUpdate::content(system_portion))
    }

    // Merge and apply

    pub fn preview(&self, strategy: MergeStrategy) -> Result<String> {
        match strategy {
            MergeStrategy::Sections => {
                Ok(sections::generate_own_format(&self.store.get_all_groups()?))
            }
            MergeStrategy::Concat => self.store.get_merged_hosts(),
        }
    }

    /// Write system content plus every enabled group to the live hosts file.
    pub fn apply_hosts(&self) -> Result<WriteReport> {
        let mut content = self.preview(MergeStrategy::Sections)?;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        self.writer.write(content.as_bytes())
    }

    // Backups

    pub fn create_backup(&self) -> Result<BackupInfo> {
        self.backups().create_from(self.writer.hosts_path())
    }

    pub fn list_backups(&self) -> Result<Vec<BackupInfo>> {
        self.backups().list()
    }

    pub fn prune_backups(&self, keep_days: u32) -> Result<usize> {
        self.backups().prune(keep_days)
    }

    /// Write a backup's bytes back to the live file. The current file is
    /// itself backed up first, as with any write.
    pub fn restore_from_backup(&self, backup_id: &str) -> Result<WriteReport> {
        let backup = self
            .backups()
            .find(backup_id)?
            .ok_or_else(|| HostsError::not_found("backup", backup_id))?;
        let content = self.backups().read(&backup)?;
        let report = self.writer.write(&content)?;

        if let Err(e) = self.sync_system_group() {
            warn!(error = %e, "could not refresh system group after restore");
        }
        Ok(report)
    }

    // Import and export

    /// Import groups from a hosts file carrying a HostGenius or SwitchHosts
    /// managed section. Existing groups are updated in place; names that
    /// collide with the system group, or that are not valid group names, are
    /// skipped.
    pub fn import_hosts_config(&self, path: &Path) -> Result<ImportSummary> {
        if !path.is_file() {
            return Err(HostsError::not_found("file", path.display().to_string()));
        }
        let content = fs::read_to_string(path)
            .map_err(|e| HostsError::io(format!("read {}", path.display()), e))?;
        self.import_hosts_text(&content)
    }

    pub fn import_hosts_text(&self, content: &str) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        for imported in sections::parse_groups(content) {
            if let Err(e) = sections::validate_group_name(&imported.name) {
                warn!(error = %e, "skipping imported group");
                summary.skipped += 1;
                continue;
            }
            match self.store.get_group_by_name(&imported.name)? {
                Some(existing) if existing.is_system => summary.skipped += 1,
                Some(existing) => {
                    let update = GroupUpdate {
                        content: Some(imported.content),
                        enabled: Some(imported.enabled),
                        ..Default::default()
                    };
                    self.store.update_group(&existing.id, &update)?;
                    summary.updated += 1;
                }
                None => {
                    self.store.create_group(NewGroup {
                        name: imported.name,
                        description: Some(
                            imported
                                .description
                                .unwrap_or_else(|| IMPORTED_DESCRIPTION.to_string()),
                        ),
                        content: imported.content,
                        enabled: imported.enabled,
                        is_system: false,
                    })?;
                    summary.created += 1;
                }
            }
        }

        info!(?summary, "imported hosts configuration");
        Ok(summary)
    }

    pub fn export_hosts_config(&self, dialect: Dialect) -> Result<String> {
        let groups = self.store.get_all_groups()?;
        Ok(match dialect {
            Dialect::HostGenius => sections::generate_own_format(&groups),
            Dialect::SwitchHosts => sections::generate_external_format(&groups),
        })
    }

    /// Single group as a JSON document.
    pub fn export_group(&self, id: &str) -> Result<String> {
        let group = self
            .store
            .get_group_by_id(id)?
            .ok_or_else(|| HostsError::not_found("group", id))?;
        serde_json::to_string_pretty(&GroupExport::from(&group))
            .map_err(|e| HostsError::ConfigFormat(e.to_string()))
    }

    /// Create a group from an exported JSON document. Imported groups start disabled.
    pub fn import_group(&self, json: &str) -> Result<String> {
        let export: GroupExport =
            serde_json::from_str(json).map_err(|e| HostsError::ConfigFormat(e.to_string()))?;
        if export.name.trim().is_empty() {
            return Err(HostsError::ConfigFormat("group name is empty".to_string()));
        }
        self.create_group(NewGroup {
            name: export.name,
            description: export.description,
            content: export.content,
            enabled: false,
            is_system: false,
        })
    }

    /// Bytes used by the data directory, the database and the backups.
    pub fn data_size(&self) -> Result<DataSize> {
        let total = match self.store.path().and_then(Path::parent) {
            Some(dir) => dir_size(dir)?,
            None => 0,
        };
        Ok(DataSize {
            total,
            database: self.store.database_size()?,
            backups: self.backups().total_size()?,
        })
    }
}
