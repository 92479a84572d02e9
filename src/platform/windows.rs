//! Windows platform implementations.

use std::fs;
use std::process::Command;

use super::PrivilegedExec;
use crate::error::{HostsError, Result};

/// Runs commands through an elevated `cmd.exe` started with `Start-Process -Verb RunAs`.
///
/// The elevated process cannot share our stdout, so its output is redirected to
/// a file in the temp directory and read back afterwards.
#[derive(Default)]
pub struct ElevatedExec;

impl PrivilegedExec for ElevatedExec {
    fn exec(&self, command: &str) -> Result<String> {
        let out_file = std::env::temp_dir().join(format!(
            "hostgenius_exec_{}.log",
            uuid::Uuid::new_v4().simple()
        ));
        let inner = format!("{command} > \"{}\" 2>&1", out_file.display());
        let script = format!(
            "$p = Start-Process -FilePath cmd.exe -ArgumentList '/C', '{}' -Verb RunAs -Wait -PassThru -WindowStyle Hidden; exit $p.ExitCode",
            inner.replace('\'', "''")
        );

        let output = Command::new("powershell")
            .args(["-NoProfile", "-NonInteractive", "-Command", &script])
            .output()
            .map_err(|e| HostsError::io("spawn powershell", e))?;

        let captured = fs::read_to_string(&out_file).unwrap_or_default();
        let _ = fs::remove_file(&out_file);

        if output.status.success() {
            return Ok(captured);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if stderr.contains("canceled by the user") || stderr.contains("cancelled by the user") {
            return Err(HostsError::Permission(stderr));
        }
        Err(HostsError::CommandFailed {
            status: output.status.to_string(),
            stderr: if stderr.is_empty() { captured } else { stderr },
        })
    }
}
