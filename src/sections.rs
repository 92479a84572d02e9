//! Managed sections: sentinel-delimited regions of the hosts file owned by
//! HostGenius or by SwitchHosts.
//!
//! A managed section looks like
//!
//! ```text
//! # --- HOSTGENIUS_CONTENT_START ---
//! # --- Dev [enabled] ---
//! # Description: local services
//! 127.0.0.1	api.dev.test
//!
//! # --- HOSTGENIUS_CONTENT_END ---
//! ```
//!
//! Everything outside it belongs to the system group.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{HostsError, Result};
use crate::group::HostGroup;

pub const HOSTGENIUS_START: &str = "HOSTGENIUS_CONTENT_START";
pub const HOSTGENIUS_END: &str = "HOSTGENIUS_CONTENT_END";
pub const SWITCHHOSTS_START: &str = "SWITCHHOSTS_CONTENT_START";
pub const SWITCHHOSTS_END: &str = "SWITCHHOSTS_CONTENT_END";

const DESCRIPTION_PREFIX: &str = "# Description:";

static STATUS_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[(disabled|off|enabled|on)\]").expect("valid regex"));

/// Sentinel vocabulary of a managed section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    HostGenius,
    SwitchHosts,
}

impl Dialect {
    pub fn start_marker(self) -> &'static str {
        match self {
            Dialect::HostGenius => HOSTGENIUS_START,
            Dialect::SwitchHosts => SWITCHHOSTS_START,
        }
    }

    pub fn end_marker(self) -> &'static str {
        match self {
            Dialect::HostGenius => HOSTGENIUS_END,
            Dialect::SwitchHosts => SWITCHHOSTS_END,
        }
    }

    /// Name for content found before any group boundary.
    pub fn default_group_name(self) -> &'static str {
        match self {
            Dialect::HostGenius => "Imported from HostGenius",
            Dialect::SwitchHosts => "Imported from SwitchHosts",
        }
    }

    fn start_in(line: &str) -> Option<Self> {
        if line.contains(SWITCHHOSTS_START) {
            Some(Dialect::SwitchHosts)
        } else if line.contains(HOSTGENIUS_START) {
            Some(Dialect::HostGenius)
        } else {
            None
        }
    }

    fn is_end(line: &str) -> bool {
        line.contains(SWITCHHOSTS_END) || line.contains(HOSTGENIUS_END)
    }
}

/// A group recovered from a managed section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedGroup {
    pub name: String,
    pub description: Option<String>,
    pub content: String,
    pub enabled: bool,
}

/// Hosts text with every managed section (markers included) removed.
pub fn extract_system_portion(content: &str) -> String {
    let mut kept = Vec::new();
    let mut in_managed = false;

    for line in content.lines() {
        let trimmed = line.trim();
        if Dialect::start_in(trimmed).is_some() {
            in_managed = true;
            continue;
        }
        if Dialect::is_end(trimmed) {
            in_managed = false;
            continue;
        }
        if !in_managed {
            kept.push(line);
        }
    }

    kept.join("\n").trim().to_string()
}

struct PendingGroup {
    name: String,
    description: Option<String>,
    lines: Vec<String>,
    enabled: bool,
}

impl PendingGroup {
    fn new(name: String, enabled: bool) -> Self {
        Self {
            name,
            description: None,
            lines: Vec::new(),
            enabled,
        }
    }

    fn finish(self) -> ImportedGroup {
        ImportedGroup {
            name: self.name,
            description: self.description,
            content: self.lines.join("\n").trim().to_string(),
            enabled: self.enabled,
        }
    }
}

/// Split the first managed section of `content` into groups.
///
/// Groups whose content is empty after trimming are dropped.
pub fn parse_groups(content: &str) -> Vec<ImportedGroup> {
    let mut groups: Vec<ImportedGroup> = Vec::new();
    let mut current: Option<PendingGroup> = None;
    let mut dialect: Option<Dialect> = None;

    for line in content.lines() {
        let trimmed = line.trim();

        let Some(active) = dialect else {
            dialect = Dialect::start_in(trimmed);
            continue;
        };

        if Dialect::is_end(trimmed) {
            break;
        }

        if is_boundary(trimmed) {
            if let Some(done) = current.take() {
                groups.push(done.finish());
            }
            let (name, enabled) = boundary_name(trimmed, active);
            let name = if name.is_empty() {
                format!("Group{}", groups.len() + 1)
            } else {
                name
            };
            current = Some(PendingGroup::new(name, enabled));
            continue;
        }

        match current.as_mut() {
            Some(group) => {
                if active == Dialect::HostGenius
                    && group.description.is_none()
                    && group.lines.is_empty()
                {
                    if let Some(desc) = trimmed.strip_prefix(DESCRIPTION_PREFIX) {
                        group.description = Some(desc.trim().to_string());
                        continue;
                    }
                }
                group.lines.push(line.to_string());
            }
            None if !trimmed.is_empty() && !trimmed.starts_with('#') => {
                let mut group = PendingGroup::new(active.default_group_name().to_string(), true);
                group.lines.push(line.to_string());
                current = Some(group);
            }
            None => {}
        }
    }

    if let Some(done) = current {
        groups.push(done.finish());
    }

    groups.retain(|g| !g.content.is_empty());
    groups
}

/// Check that `name` reads back unchanged from a boundary line in either dialect.
pub fn validate_group_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("must not be empty")
    } else if name.contains(['\n', '\r']) {
        Some("must be a single line")
    } else if name != name.trim() {
        Some("must not start or end with whitespace")
    } else if name.starts_with(['#', '-']) || name.ends_with(['#', '-']) {
        Some("must not start or end with '#' or '-'")
    } else if STATUS_TAG.is_match(name) {
        Some("must not contain a status tag such as [enabled] or [off]")
    } else if [HOSTGENIUS_START, HOSTGENIUS_END, SWITCHHOSTS_START, SWITCHHOSTS_END]
        .iter()
        .any(|marker| name.contains(marker))
    {
        Some("must not contain a section marker")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(HostsError::InvalidName {
            name: name.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

fn is_boundary(trimmed: &str) -> bool {
    trimmed.starts_with('#') && trimmed.contains("---")
}

/// Group name and enabled flag from a boundary line.
fn boundary_name(trimmed: &str, dialect: Dialect) -> (String, bool) {
    let (stripped, enabled) = match dialect {
        Dialect::HostGenius => {
            let enabled = STATUS_TAG
                .captures(trimmed)
                .map(|c| !matches!(c[1].to_ascii_lowercase().as_str(), "disabled" | "off"))
                .unwrap_or(true);
            (STATUS_TAG.replace_all(trimmed, "").into_owned(), enabled)
        }
        Dialect::SwitchHosts => {
            let enabled = !trimmed.contains("[disabled]") && !trimmed.contains("[off]");
            (trimmed.replace("[disabled]", "").replace("[off]", ""), enabled)
        }
    };

    let name = stripped
        .trim_matches(|c: char| c == '#' || c == '-' || c.is_whitespace())
        .to_string();
    (name, enabled)
}

/// Hosts body for the live file: system content, then a HostGenius section
/// holding every enabled group. Disabled groups are left out entirely.
pub fn generate_own_format(groups: &[HostGroup]) -> String {
    let active: Vec<&HostGroup> = groups
        .iter()
        .filter(|g| !g.is_system && g.enabled && !g.content.trim().is_empty())
        .collect();

    let mut block = Vec::new();
    for group in active {
        block.push(format!("# --- {} [enabled] ---", group.name));
        if let Some(desc) = group.description.as_deref().filter(|d| !d.trim().is_empty()) {
            block.push(format!("{DESCRIPTION_PREFIX} {}", desc.trim()));
        }
        block.push(group.content.trim().to_string());
        block.push(String::new());
    }

    assemble(groups, Dialect::HostGenius, block)
}

/// SwitchHosts-compatible document carrying every group; disabled groups are
/// tagged `[disabled]` so the state survives a round trip.
pub fn generate_external_format(groups: &[HostGroup]) -> String {
    let mut block = Vec::new();
    for group in groups
        .iter()
        .filter(|g| !g.is_system && !g.content.trim().is_empty())
    {
        let suffix = if group.enabled { "" } else { " [disabled]" };
        block.push(format!("# --- {}{suffix} ---", group.name));
        block.push(group.content.trim().to_string());
        block.push(String::new());
    }

    assemble(groups, Dialect::SwitchHosts, block)
}

fn assemble(groups: &[HostGroup], dialect: Dialect, block: Vec<String>) -> String {
    let mut sections = Vec::new();

    if let Some(system) = groups.iter().find(|g| g.is_system) {
        let content = system.content.trim();
        if !content.is_empty() {
            sections.push(content.to_string());
        }
    }

    if !block.is_empty() {
        let mut lines = Vec::with_capacity(block.len() + 2);
        lines.push(format!("# --- {} ---", dialect.start_marker()));
        lines.extend(block);
        lines.push(format!("# --- {} ---", dialect.end_marker()));
        sections.push(lines.join("\n"));
    }

    sections.join("\n\n")
}
