//! Group and history records as stored in the database.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the undeletable group mirroring the unmanaged part of the hosts file.
pub const SYSTEM_GROUP_NAME: &str = "System Hosts";
pub const SYSTEM_GROUP_DESCRIPTION: &str = "Content of the system hosts file outside managed sections";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Local,
    Synced,
    Pending,
    Conflict,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Local => "local",
            SyncStatus::Synced => "synced",
            SyncStatus::Pending => "pending",
            SyncStatus::Conflict => "conflict",
        }
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(SyncStatus::Local),
            "synced" => Ok(SyncStatus::Synced),
            "pending" => Ok(SyncStatus::Pending),
            "conflict" => Ok(SyncStatus::Conflict),
            other => Err(format!("unknown sync status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryOperation {
    Create,
    Update,
    Delete,
    Merge,
}

impl HistoryOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            HistoryOperation::Create => "create",
            HistoryOperation::Update => "update",
            HistoryOperation::Delete => "delete",
            HistoryOperation::Merge => "merge",
        }
    }
}

impl FromStr for HistoryOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(HistoryOperation::Create),
            "update" => Ok(HistoryOperation::Update),
            "delete" => Ok(HistoryOperation::Delete),
            "merge" => Ok(HistoryOperation::Merge),
            other => Err(format!("unknown history operation '{other}'")),
        }
    }
}

impl fmt::Display for HistoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

macro_rules! text_column {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

text_column!(SyncStatus);
text_column!(HistoryOperation);

/// A named, toggleable block of hosts text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostGroup {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub content: String,
    pub enabled: bool,
    pub is_system: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub sync_status: SyncStatus,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub share_token: Option<String>,
    pub created_by: Option<String>,
}

/// Append-only snapshot of a group's content at a given version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostHistory {
    pub id: String,
    pub group_id: String,
    pub content: String,
    pub version: i64,
    pub operation: HistoryOperation,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<String>,
}

/// Input for creating a group.
#[derive(Debug, Clone, Default)]
pub struct NewGroup {
    pub name: String,
    pub description: Option<String>,
    pub content: String,
    pub enabled: bool,
    pub is_system: bool,
}

impl NewGroup {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            enabled: true,
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub enabled: Option<bool>,
}

impl GroupUpdate {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.content.is_none()
            && self.enabled.is_none()
    }
}

/// Portable single-group export document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupExport {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_version")]
    pub version: i64,
    #[serde(default = "Utc::now")]
    pub exported_at: DateTime<Utc>,
}

fn default_version() -> i64 {
    1
}

impl From<&HostGroup> for GroupExport {
    fn from(group: &HostGroup) -> Self {
        Self {
            name: group.name.clone(),
            description: group.description.clone(),
            content: group.content.clone(),
            version: group.version,
            exported_at: Utc::now(),
        }
    }
}
