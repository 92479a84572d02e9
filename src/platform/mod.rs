//! Platform abstraction for privileged execution and hosts file commands.

#[cfg(unix)]
pub mod unix;

#[cfg(windows)]
pub mod windows;

use std::path::Path;
use std::process::Command;

use crate::error::{HostsError, Result};

/// Printed by the install command when the DNS flush step fails.
pub const FLUSH_FAILED_MARKER: &str = "HOSTGENIUS_DNS_FLUSH_FAILED";

/// Runs a shell command, possibly with administrator rights.
pub trait PrivilegedExec: Send + Sync {
    /// Execute `command` through the platform shell and return its stdout.
    ///
    /// Denied or cancelled elevation must surface as [`HostsError::Permission`].
    fn exec(&self, command: &str) -> Result<String>;
}

/// Get platform executor.
/// If HOSTGENIUS_HOSTS_FILE is set (e.g. in tests), the target is user-writable
/// and commands run without elevation.
pub fn default_executor() -> Box<dyn PrivilegedExec> {
    if crate::config::hosts_file_override().is_some() {
        return Box::new(ShellExec);
    }
    #[cfg(unix)]
    return Box::new(unix::ElevatedExec::default());

    #[cfg(windows)]
    return Box::new(windows::ElevatedExec::default());
}

/// Executor that runs commands with the current user's rights.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExec;

impl PrivilegedExec for ShellExec {
    fn exec(&self, command: &str) -> Result<String> {
        #[cfg(windows)]
        let mut cmd = {
            let mut c = Command::new("cmd");
            c.args(["/C", command]);
            c
        };
        #[cfg(not(windows))]
        let mut cmd = {
            let mut c = Command::new("sh");
            c.args(["-c", command]);
            c
        };

        let output = cmd
            .output()
            .map_err(|e| HostsError::io("spawn shell", e))?;
        if !output.status.success() {
            return Err(HostsError::CommandFailed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// DNS cache flush command for the current platform.
pub fn flush_dns_command() -> &'static str {
    if cfg!(windows) {
        "ipconfig /flushdns"
    } else if cfg!(target_os = "macos") {
        "dscacheutil -flushcache"
    } else {
        "systemctl restart systemd-resolved"
    }
}

/// One shell command that copies `temp` over `hosts` and, when `flush` is set,
/// flushes the DNS cache. A failing flush prints [`FLUSH_FAILED_MARKER`]
/// instead of failing the command.
///
/// Paths are quoted, so shell metacharacters in them are never interpreted.
pub fn install_command(temp: &Path, hosts: &Path, flush: Option<&str>) -> String {
    let temp = temp.display().to_string();
    let hosts = hosts.display().to_string();

    if cfg!(windows) {
        let copy = format!(
            "powershell -NoProfile -Command \"Copy-Item -LiteralPath {} -Destination {} -Force\"",
            powershell_quote(&temp),
            powershell_quote(&hosts)
        );
        match flush {
            Some(flush) => format!("{copy} && ({flush} || echo {FLUSH_FAILED_MARKER})"),
            None => copy,
        }
    } else {
        let copy = format!("cp {} {}", sh_quote(&temp), sh_quote(&hosts));
        match flush {
            Some(flush) => format!(
                "{copy} && {{ {flush} >/dev/null 2>&1 || echo {FLUSH_FAILED_MARKER}; }}"
            ),
            None => copy,
        }
    }
}

/// Single-quote `s` for `sh`; an embedded `'` becomes `'\''`.
pub fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Single-quote `s` for PowerShell; an embedded `'` is doubled.
pub fn powershell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
