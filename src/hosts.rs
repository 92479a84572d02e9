//! Hosts file text codec: raw text <-> structured entries.

use serde::{Deserialize, Serialize};

/// One `ip domain` mapping. A line with several domains yields one entry per domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostEntry {
    pub ip: String,
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub enabled: bool,
}

impl HostEntry {
    pub fn new(ip: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            domain: domain.into(),
            comment: None,
            enabled: true,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Parse hosts text into entries.
///
/// Blank lines and full-line comments are skipped. Lines with fewer than two
/// tokens (an IP without any domain) are dropped silently.
pub fn parse(content: &str) -> Vec<HostEntry> {
    let mut entries = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (host_part, comment) = match line.split_once('#') {
            Some((host, comment)) => {
                let comment = comment.trim();
                (host, (!comment.is_empty()).then(|| comment.to_string()))
            }
            None => (line, None),
        };

        let mut tokens = host_part.split_whitespace();
        let Some(ip) = tokens.next() else {
            continue;
        };
        for domain in tokens {
            entries.push(HostEntry {
                ip: ip.to_string(),
                domain: domain.to_string(),
                comment: comment.clone(),
                enabled: true,
            });
        }
    }

    entries
}

/// Format entries as hosts text, one `ip<TAB>domain` line per enabled entry.
pub fn format(entries: &[HostEntry]) -> String {
    entries
        .iter()
        .filter(|e| e.enabled)
        .map(|e| match &e.comment {
            Some(comment) if !comment.is_empty() => format!("{}\t{}\t# {comment}", e.ip, e.domain),
            _ => format!("{}\t{}", e.ip, e.domain),
        })
        .collect::<Vec<_>>()
        .join("\n")
}
