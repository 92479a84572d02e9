//! Unix (macOS, Linux) platform implementations.

use std::process::{Command, Output};

use super::PrivilegedExec;
use crate::error::{HostsError, Result};

/// Runs commands as root: `osascript` on macOS, `pkexec` elsewhere.
pub struct ElevatedExec {
    /// Shown in the macOS authentication prompt.
    pub prompt: String,
}

impl Default for ElevatedExec {
    fn default() -> Self {
        Self {
            prompt: "HostGenius needs administrator rights to update the hosts file.".to_string(),
        }
    }
}

impl PrivilegedExec for ElevatedExec {
    fn exec(&self, command: &str) -> Result<String> {
        #[cfg(target_os = "macos")]
        let output = {
            let script = format!(
                "do shell script \"{}\" with prompt \"{}\" with administrator privileges",
                applescript_escape(command),
                applescript_escape(&self.prompt)
            );
            Command::new("osascript")
                .args(["-e", &script])
                .output()
                .map_err(|e| HostsError::io("spawn osascript", e))?
        };

        #[cfg(not(target_os = "macos"))]
        let output = Command::new("pkexec")
            .args(["sh", "-c", command])
            .output()
            .map_err(|e| HostsError::io("spawn pkexec", e))?;

        check_output(output)
    }
}

fn check_output(output: Output) -> Result<String> {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if output.status.success() {
        return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
    }

    // pkexec: 126 = dialog dismissed, 127 = not authorized.
    // osascript: error -128 = user cancelled.
    let denied = (matches!(output.status.code(), Some(126 | 127)) && !cfg!(target_os = "macos"))
        || stderr.contains("-128")
        || stderr.contains("User canceled");
    if denied {
        return Err(HostsError::Permission(if stderr.is_empty() {
            "authentication was cancelled".to_string()
        } else {
            stderr
        }));
    }

    Err(HostsError::CommandFailed {
        status: output.status.to_string(),
        stderr,
    })
}

#[cfg(target_os = "macos")]
fn applescript_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
