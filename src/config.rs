//! Configuration loading and path resolution.
//!
//! Supports HOSTGENIUS_HOME env var override for testing.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the data directory under the user's home.
pub const DATA_DIR_NAME: &str = ".HostGenius";

/// Default retention for `backup prune`.
pub const DEFAULT_BACKUP_KEEP_DAYS: u32 = 30;

/// Paths for the HostGenius data directory.
#[derive(Debug, Clone)]
pub struct HostGeniusPaths {
    pub data_dir: PathBuf,
    pub db_file: PathBuf,
    pub backups_dir: PathBuf,
    pub config_file: PathBuf,
}

impl HostGeniusPaths {
    /// Build paths from base directory (e.g. ~/.HostGenius or HOSTGENIUS_HOME).
    pub fn from_base(base: PathBuf) -> Self {
        Self {
            db_file: base.join(".data.db"),
            backups_dir: base.join("backups"),
            config_file: base.join("config.toml"),
            data_dir: base,
        }
    }

    /// Paths for testing: use a temp dir as base.
    pub fn for_test(base: impl AsRef<Path>) -> Self {
        Self::from_base(base.as_ref().to_path_buf())
    }

    /// Get default paths (respects HOSTGENIUS_HOME).
    pub fn default_paths() -> Self {
        let base = if let Ok(home) = std::env::var("HOSTGENIUS_HOME") {
            PathBuf::from(home)
        } else if let Some(dirs) = directories::BaseDirs::new() {
            dirs.home_dir().join(DATA_DIR_NAME)
        } else {
            PathBuf::from(DATA_DIR_NAME)
        };
        Self::from_base(base)
    }

    /// Ensure data and backup directories exist.
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        fs::create_dir_all(&self.backups_dir)?;
        Ok(())
    }
}

/// Main config.toml structure.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// Hosts file to manage instead of the platform default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts_file: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub flush_dns: bool,
    #[serde(default = "default_keep_days")]
    pub backup_keep_days: u32,
}

fn default_true() -> bool {
    true
}

fn default_keep_days() -> u32 {
    DEFAULT_BACKUP_KEEP_DAYS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hosts_file: None,
            flush_dns: true,
            backup_keep_days: DEFAULT_BACKUP_KEEP_DAYS,
        }
    }
}

/// Path to config.toml (respects HOSTGENIUS_HOME).
pub fn config_path() -> PathBuf {
    HostGeniusPaths::default_paths().config_file
}

/// Platform location of the system hosts file.
pub fn platform_hosts_path() -> PathBuf {
    #[cfg(windows)]
    {
        let windir = std::env::var("WINDIR").unwrap_or_else(|_| r"C:\Windows".to_string());
        return PathBuf::from(windir)
            .join("System32")
            .join("drivers")
            .join("etc")
            .join("hosts");
    }

    #[cfg(not(windows))]
    return PathBuf::from("/etc/hosts");
}

/// Hosts file override from HOSTGENIUS_HOSTS_FILE (tests, sandboxes).
pub fn hosts_file_override() -> Option<PathBuf> {
    std::env::var_os("HOSTGENIUS_HOSTS_FILE").map(PathBuf::from)
}

impl Config {
    /// Load config from paths (with shared lock when file exists).
    pub fn load(paths: &HostGeniusPaths) -> Result<Config> {
        if paths.config_file.is_file() {
            let mut file = fs::OpenOptions::new().read(true).open(&paths.config_file)?;
            fs2::FileExt::lock_shared(&file)?;
            use std::io::Read;
            let mut s = String::new();
            file.read_to_string(&mut s)?;
            let cfg: Config = toml::from_str(&s)?;
            Ok(cfg)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to paths (with exclusive lock). Creates parent dirs if needed.
    /// The file is only truncated once the lock is held.
    pub fn save(&self, paths: &HostGeniusPaths) -> Result<()> {
        if let Some(p) = paths.config_file.parent() {
            fs::create_dir_all(p)?;
        }
        let s = toml::to_string_pretty(self)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&paths.config_file)?;
        fs2::FileExt::lock_exclusive(&file)?;
        file.set_len(0)?;
        use std::io::Write;
        file.write_all(s.as_bytes())?;
        Ok(())
    }

    /// Effective hosts file: env override, then config, then platform default.
    pub fn hosts_path(&self) -> PathBuf {
        hosts_file_override()
            .or_else(|| self.hosts_file.clone())
            .unwrap_or_else(platform_hosts_path)
    }

    /// Whether the DNS cache should be flushed after a write.
    pub fn should_flush_dns(&self) -> bool {
        self.flush_dns && std::env::var_os("HOSTGENIUS_SKIP_DNS_FLUSH").is_none()
    }
}
