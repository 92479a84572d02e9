//! Doctor command: health checks for the HostGenius data directory and hosts file.

use anyhow::Result;

use crate::config::{Config, HostGeniusPaths};
use crate::sections::{HOSTGENIUS_START, SWITCHHOSTS_START};
use crate::store::{GroupStore, LEGACY_DB_FILE};

/// Result of a single check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub ok: bool,
    pub message: String,
}

impl CheckResult {
    fn pass(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Run all doctor checks.
pub fn run_checks(paths: &HostGeniusPaths, config: &Config) -> Result<Vec<CheckResult>> {
    let mut results = Vec::new();

    // 1. Data directory
    if !paths.data_dir.is_dir() {
        results.push(CheckResult::fail(format!(
            "Data directory {} missing. Run 'hostgenius init'.",
            paths.data_dir.display()
        )));
        return Ok(results);
    }
    results.push(CheckResult::pass(format!(
        "Data directory {}",
        paths.data_dir.display()
    )));

    // 2. Database opens and holds the system group. Read-only: doctor never
    // creates the schema or renames a legacy file.
    let legacy = paths
        .db_file
        .parent()
        .map(|dir| dir.join(LEGACY_DB_FILE))
        .filter(|p| p.is_file() && !paths.db_file.exists());
    if let Some(legacy) = legacy {
        results.push(CheckResult::pass(format!(
            "Legacy database {} found; it is renamed the next time HostGenius opens its store",
            legacy.display()
        )));
    } else if paths.db_file.is_file() {
        let opened = GroupStore::open_read_only(&paths.db_file)
            .and_then(|store| Ok((store.system_group()?, store.get_all_groups()?)));
        match opened {
            Ok((system, groups)) => results.push(CheckResult::pass(format!(
                "Database ok: {} group(s), system group '{}' at version {}",
                groups.len(),
                system.name,
                system.version
            ))),
            Err(e) => results.push(CheckResult::fail(format!("Database unusable: {e}"))),
        }
    } else {
        results.push(CheckResult::fail(format!(
            "Database {} missing. Run 'hostgenius init'.",
            paths.db_file.display()
        )));
    }

    // 3. Hosts file readable, and whether it carries a managed section
    let hosts_path = config.hosts_path();
    match std::fs::read_to_string(&hosts_path) {
        Ok(content) => {
            results.push(CheckResult::pass(format!(
                "Hosts file {} readable",
                hosts_path.display()
            )));
            let managed = content.contains(HOSTGENIUS_START);
            let foreign = content.contains(SWITCHHOSTS_START);
            results.push(match (managed, foreign) {
                (true, _) => CheckResult::pass("Hosts file has a HostGenius section"),
                (false, true) => CheckResult::pass(
                    "Hosts file has a SwitchHosts section. Run 'hostgenius hosts import' to adopt it.",
                ),
                (false, false) => CheckResult::pass(
                    "Hosts file has no managed section yet. Run 'hostgenius apply' after enabling a group.",
                ),
            });
        }
        Err(e) => results.push(CheckResult::fail(format!(
            "Cannot read hosts file {}: {e}",
            hosts_path.display()
        ))),
    }

    // 4. Backups
    let backups = crate::backup::BackupManager::new(&paths.backups_dir).list()?;
    results.push(match backups.first() {
        Some(latest) => CheckResult::pass(format!(
            "{} backup(s), latest {}",
            backups.len(),
            latest.id
        )),
        None => CheckResult::pass("No backups yet"),
    });

    Ok(results)
}
