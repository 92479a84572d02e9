//! Group store: `host_groups` and `host_history` in an embedded SQLite database.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection, OpenFlags, OptionalExtension, Row};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{HostsError, Result};
use crate::group::{
    GroupUpdate, HistoryOperation, HostGroup, HostHistory, NewGroup, SyncStatus,
    SYSTEM_GROUP_DESCRIPTION, SYSTEM_GROUP_NAME,
};
use crate::sections::validate_group_name;

/// File name used by earlier releases; renamed on first open.
pub const LEGACY_DB_FILE: &str = "hosts.db";

/// Default number of history rows returned per group.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

const GROUP_COLUMNS: &str = "id, name, description, content, enabled, is_system, version, \
     created_at, updated_at, sync_status, last_sync_at, share_token, created_by";

/// Single-connection store; every mutation runs in its own transaction.
pub struct GroupStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl GroupStore {
    /// Open (or create) the database at `path` and make sure the system group exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = resolve_db_path(path.as_ref());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| HostsError::io(format!("create {}", parent.display()), e))?;
        }
        let conn = Connection::open(&path)?;
        Self::init(conn, Some(path))
    }

    /// Open an existing database without creating, migrating or renaming anything.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let store = Self {
            conn: Mutex::new(conn),
            path,
        };
        store.create_tables()?;
        store.ensure_system_group()?;
        Ok(store)
    }

    fn create_tables(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS host_groups (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                content TEXT NOT NULL DEFAULT '',
                enabled INTEGER NOT NULL DEFAULT 1,
                is_system INTEGER NOT NULL DEFAULT 0,
                version INTEGER NOT NULL DEFAULT 1 CHECK (version >= 1),
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                sync_status TEXT NOT NULL DEFAULT 'local'
                    CHECK (sync_status IN ('local', 'synced', 'pending', 'conflict')),
                last_sync_at TEXT,
                share_token TEXT,
                created_by TEXT
            );

            CREATE TABLE IF NOT EXISTS host_history (
                id TEXT PRIMARY KEY,
                group_id TEXT NOT NULL,
                content TEXT NOT NULL,
                version INTEGER NOT NULL,
                operation TEXT NOT NULL
                    CHECK (operation IN ('create', 'update', 'delete', 'merge')),
                created_at TEXT NOT NULL,
                created_by TEXT,
                FOREIGN KEY (group_id) REFERENCES host_groups (id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_host_groups_name ON host_groups(name);
            CREATE INDEX IF NOT EXISTS idx_host_groups_sync_status ON host_groups(sync_status);
            CREATE INDEX IF NOT EXISTS idx_host_history_group_id ON host_history(group_id);
            CREATE INDEX IF NOT EXISTS idx_host_history_created_at ON host_history(created_at);",
        )?;
        Ok(())
    }

    fn ensure_system_group(&self) -> Result<()> {
        if self.get_group_by_name(SYSTEM_GROUP_NAME)?.is_none() {
            let id = self.create_group(NewGroup {
                name: SYSTEM_GROUP_NAME.to_string(),
                description: Some(SYSTEM_GROUP_DESCRIPTION.to_string()),
                content: String::new(),
                enabled: true,
                is_system: true,
            })?;
            info!(%id, "created system group");
        }
        Ok(())
    }

    /// Database file location (`None` for in-memory stores).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Size of the database file in bytes.
    pub fn database_size(&self) -> Result<u64> {
        match &self.path {
            Some(p) => fs::metadata(p)
                .map(|m| m.len())
                .map_err(|e| HostsError::io(format!("stat {}", p.display()), e)),
            None => Ok(0),
        }
    }

    /// Insert a group at version 1 together with its `create` history row.
    ///
    /// Only one system group may exist; asking for another fails with
    /// [`HostsError::SystemGroupExists`].
    pub fn create_group(&self, group: NewGroup) -> Result<String> {
        validate_group_name(&group.name)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        if group.is_system {
            let existing: i64 = tx.query_row(
                "SELECT COUNT(*) FROM host_groups WHERE is_system = 1",
                [],
                |row| row.get(0),
            )?;
            if existing > 0 {
                return Err(HostsError::SystemGroupExists);
            }
        }
        tx.execute(
            "INSERT INTO host_groups
                (id, name, description, content, enabled, is_system, version,
                 created_at, updated_at, sync_status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7, ?8)",
            params![
                id,
                group.name,
                group.description,
                group.content,
                group.enabled,
                group.is_system,
                now,
                SyncStatus::Local,
            ],
        )
        .map_err(|e| unique_violation(e, &group.name))?;
        insert_history(&tx, &id, &group.content, 1, HistoryOperation::Create, now)?;
        tx.commit()?;

        debug!(%id, name = %group.name, "group created");
        Ok(id)
    }

    /// All groups, system group first, then by name.
    pub fn get_all_groups(&self) -> Result<Vec<HostGroup>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {GROUP_COLUMNS} FROM host_groups ORDER BY is_system DESC, name ASC"
        ))?;
        let groups = stmt
            .query_map([], group_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(groups)
    }

    pub fn get_group_by_id(&self, id: &str) -> Result<Option<HostGroup>> {
        let conn = self.conn.lock();
        query_group(&conn, "id", id)
    }

    pub fn get_group_by_name(&self, name: &str) -> Result<Option<HostGroup>> {
        let conn = self.conn.lock();
        query_group(&conn, "name", name)
    }

    pub fn system_group(&self) -> Result<HostGroup> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!(
                "SELECT {GROUP_COLUMNS} FROM host_groups
                 WHERE is_system = 1 ORDER BY created_at ASC LIMIT 1"
            ),
            [],
            group_from_row,
        )
        .optional()?
        .ok_or_else(|| HostsError::not_found("group", SYSTEM_GROUP_NAME))
    }

    /// Apply the supplied fields, bump the version and mark the group pending.
    ///
    /// Returns `false` when the group does not exist, nothing was supplied, or
    /// the update would rename or disable the system group. A history row is
    /// written only when `content` is part of the update.
    pub fn update_group(&self, id: &str, update: &GroupUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        if let Some(name) = &update.name {
            validate_group_name(name)?;
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let Some(current) = query_group(&tx, "id", id)? else {
            return Ok(false);
        };
        if current.is_system {
            if let Some(name) = update.name.as_deref().filter(|n| *n != current.name) {
                warn!(new_name = %name, "refusing to rename the system group");
                return Ok(false);
            }
            if update.enabled.is_some_and(|enabled| enabled != current.enabled) {
                warn!("refusing to change the enabled state of the system group");
                return Ok(false);
            }
        }

        let now = Utc::now();
        let version = current.version + 1;
        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(name) = &update.name {
            sets.push("name = ?");
            values.push(Box::new(name.clone()));
        }
        if let Some(description) = &update.description {
            sets.push("description = ?");
            values.push(Box::new(description.clone()));
        }
        if let Some(content) = &update.content {
            sets.push("content = ?");
            values.push(Box::new(content.clone()));
        }
        if let Some(enabled) = update.enabled {
            sets.push("enabled = ?");
            values.push(Box::new(enabled));
        }
        sets.extend(["version = ?", "updated_at = ?", "sync_status = ?"]);
        values.push(Box::new(version));
        values.push(Box::new(now));
        values.push(Box::new(SyncStatus::Pending));
        values.push(Box::new(id.to_string()));

        let sql = format!("UPDATE host_groups SET {} WHERE id = ?", sets.join(", "));
        let changed = tx
            .execute(&sql, params_from_iter(values.iter()))
            .map_err(|e| unique_violation(e, update.name.as_deref().unwrap_or(&current.name)))?;

        if changed > 0 {
            if let Some(content) = &update.content {
                insert_history(&tx, id, content, version, HistoryOperation::Update, now)?;
            }
        }
        tx.commit()?;

        debug!(%id, version, "group updated");
        Ok(changed > 0)
    }

    /// Delete a non-system group and its history in one transaction.
    pub fn delete_group(&self, id: &str) -> Result<bool> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        match query_group(&tx, "id", id)? {
            Some(group) if !group.is_system => {}
            _ => return Ok(false),
        }

        tx.execute("DELETE FROM host_history WHERE group_id = ?1", params![id])?;
        let removed = tx.execute("DELETE FROM host_groups WHERE id = ?1", params![id])?;
        tx.commit()?;

        debug!(%id, "group deleted");
        Ok(removed > 0)
    }

    /// History of a group, newest first.
    pub fn get_history(&self, group_id: &str, limit: usize) -> Result<Vec<HostHistory>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, group_id, content, version, operation, created_at, created_by
             FROM host_history
             WHERE group_id = ?1
             ORDER BY created_at DESC, version DESC
             LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![group_id, limit], |row| {
                Ok(HostHistory {
                    id: row.get(0)?,
                    group_id: row.get(1)?,
                    content: row.get(2)?,
                    version: row.get(3)?,
                    operation: row.get(4)?,
                    created_at: row.get(5)?,
                    created_by: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Plain concatenation of every enabled group's trimmed content.
    pub fn get_merged_hosts(&self) -> Result<String> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT content FROM host_groups WHERE enabled = 1 ORDER BY is_system DESC, name ASC",
        )?;
        let contents = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        let sections: Vec<&str> = contents
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .collect();
        Ok(sections.join("\n\n"))
    }
}

/// Prefer `.data.db`; move a legacy `hosts.db` into place if only that exists.
fn resolve_db_path(path: &Path) -> PathBuf {
    let Some(dir) = path.parent() else {
        return path.to_path_buf();
    };
    let legacy = dir.join(LEGACY_DB_FILE);
    if legacy == path || !legacy.is_file() || path.exists() {
        return path.to_path_buf();
    }
    match fs::rename(&legacy, path) {
        Ok(()) => {
            info!(from = %legacy.display(), to = %path.display(), "renamed legacy database");
            path.to_path_buf()
        }
        Err(e) => {
            warn!(error = %e, "could not rename legacy database, using it in place");
            legacy
        }
    }
}

fn query_group(conn: &Connection, column: &str, value: &str) -> Result<Option<HostGroup>> {
    let group = conn
        .query_row(
            &format!("SELECT {GROUP_COLUMNS} FROM host_groups WHERE {column} = ?1"),
            params![value],
            group_from_row,
        )
        .optional()?;
    Ok(group)
}

fn group_from_row(row: &Row<'_>) -> rusqlite::Result<HostGroup> {
    Ok(HostGroup {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        content: row.get(3)?,
        enabled: row.get(4)?,
        is_system: row.get(5)?,
        version: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
        sync_status: row.get(9)?,
        last_sync_at: row.get(10)?,
        share_token: row.get(11)?,
        created_by: row.get(12)?,
    })
}

fn insert_history(
    conn: &Connection,
    group_id: &str,
    content: &str,
    version: i64,
    operation: HistoryOperation,
    at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO host_history (id, group_id, content, version, operation, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![Uuid::new_v4().to_string(), group_id, content, version, operation, at],
    )?;
    Ok(())
}

fn unique_violation(err: rusqlite::Error, name: &str) -> HostsError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            HostsError::DuplicateName(name.to_string())
        }
        _ => err.into(),
    }
}
