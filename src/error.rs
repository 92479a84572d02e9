//! Error taxonomy for the hosts engine.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, HostsError>;

#[derive(Debug, Error)]
pub enum HostsError {
    /// Group name already taken (unique constraint on `host_groups.name`).
    #[error("a group named '{0}' already exists")]
    DuplicateName(String),

    /// Name that would not survive a write and re-read of a managed section.
    #[error("invalid group name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// A second system group was requested.
    #[error("a system group already exists")]
    SystemGroupExists,

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Elevation prompt was denied or dismissed.
    #[error("administrator permission denied: {0}")]
    Permission(String),

    /// Snapshot of the live hosts file could not be taken; nothing was written.
    #[error("backup of {} failed: {source}", path.display())]
    Backup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid group configuration: {0}")]
    ConfigFormat(String),

    #[error("privileged command failed ({status}): {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl HostsError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}
