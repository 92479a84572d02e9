//! CLI definitions and command routing.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{Config, HostGeniusPaths};
use crate::group::{GroupUpdate, HostGroup, NewGroup};
use crate::manager::{HostManager, MergeStrategy};
use crate::sections::Dialect;
use crate::store::DEFAULT_HISTORY_LIMIT;
use crate::writer::{DnsFlush, WriteReport};

#[derive(Parser)]
#[command(name = "hostgenius")]
#[command(about = "Manage the system hosts file as named, toggleable groups")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// One-time setup: creates the data directory, database and config.toml
    Init,

    /// Check the data directory, database, hosts file and backups
    Doctor,

    /// Write the system group plus every enabled group to the hosts file
    Apply,

    /// Print what `apply` would write, without touching the hosts file
    Preview {
        /// Plain concatenation of enabled groups, without managed-section markers
        #[arg(long)]
        legacy: bool,
    },

    /// Manage host groups (list, show, create, update, delete, toggle, history)
    Group {
        #[command(subcommand)]
        cmd: GroupCmd,
    },

    /// Read the system hosts file, or import/export managed sections
    Hosts {
        #[command(subcommand)]
        cmd: HostsCmd,
    },

    /// Manage hosts file backups (list, create, restore, prune)
    Backup {
        #[command(subcommand)]
        cmd: BackupCmd,
    },

    /// Show disk usage of the data directory
    DataSize,
}

#[derive(Subcommand)]
pub enum GroupCmd {
    /// List all groups, system group first
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one group (by id or name) with its content
    Show { group: String },
    /// Create a group
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// Hosts text for the group
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        /// Read the group's hosts text from a file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Create the group disabled
        #[arg(long)]
        disabled: bool,
        /// Apply to the hosts file afterwards
        #[arg(long)]
        apply: bool,
    },
    /// Change name, description or content of a group
    Update {
        group: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, conflicts_with = "file")]
        content: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        /// Apply to the hosts file afterwards
        #[arg(long)]
        apply: bool,
    },
    /// Delete a group and its history; the system group cannot be deleted
    Delete {
        group: String,
        /// Apply to the hosts file afterwards
        #[arg(long)]
        apply: bool,
    },
    /// Flip a group between enabled and disabled
    Toggle {
        group: String,
        /// Apply to the hosts file afterwards
        #[arg(long)]
        apply: bool,
    },
    /// Show content history of a group, newest first
    History {
        group: String,
        #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
        limit: usize,
    },
    /// Export one group as JSON
    Export {
        group: String,
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Import a group from an exported JSON file (created disabled)
    Import { file: PathBuf },
}

#[derive(Subcommand)]
pub enum HostsCmd {
    /// Print the system hosts file (refreshes the system group)
    Show {
        /// Print the file without refreshing the system group
        #[arg(long, conflicts_with = "parsed")]
        raw: bool,
        /// Print the parsed entries, one `ip<TAB>domain` per line
        #[arg(long)]
        parsed: bool,
    },
    /// Import groups from a file with a HostGenius or SwitchHosts section
    Import { file: PathBuf },
    /// Print all groups as a managed-section document
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Hostgenius)]
        format: ExportFormat,
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Parse a hosts file and print its entries as JSON
    Parse { file: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ExportFormat {
    /// HostGenius markers; disabled groups are left out
    Hostgenius,
    /// SwitchHosts markers; disabled groups are tagged [disabled]
    Switchhosts,
}

impl From<ExportFormat> for Dialect {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::Hostgenius => Dialect::HostGenius,
            ExportFormat::Switchhosts => Dialect::SwitchHosts,
        }
    }
}

#[derive(Subcommand)]
pub enum BackupCmd {
    /// List backups, newest first
    List,
    /// Back up the hosts file now
    Create,
    /// Write a backup back to the hosts file
    Restore { id: String },
    /// Delete backups older than N days (default from config.toml)
    Prune {
        #[arg(long)]
        days: Option<u32>,
    },
}

/// Run CLI and dispatch to handlers.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let paths = HostGeniusPaths::default_paths();

    match cli.command {
        Commands::Init => cmd_init(&paths),
        Commands::Doctor => cmd_doctor(&paths),
        Commands::Apply => {
            let (_, manager) = open_manager(&paths)?;
            apply(&manager)
        }
        Commands::Preview { legacy } => {
            let (_, manager) = open_manager(&paths)?;
            let strategy = if legacy {
                MergeStrategy::Concat
            } else {
                MergeStrategy::Sections
            };
            println!("{}", manager.preview(strategy)?);
            Ok(())
        }
        Commands::Group { cmd } => cmd_group(&paths, cmd),
        Commands::Hosts { cmd } => cmd_hosts(&paths, cmd),
        Commands::Backup { cmd } => cmd_backup(&paths, cmd),
        Commands::DataSize => {
            let (_, manager) = open_manager(&paths)?;
            let size = manager.data_size()?;
            println!("total\t{}", size.total);
            println!("database\t{}", size.database);
            println!("backups\t{}", size.backups);
            Ok(())
        }
    }
}

fn open_manager(paths: &HostGeniusPaths) -> Result<(Config, HostManager)> {
    let config = Config::load(paths)?;
    let manager = HostManager::open(paths, &config)
        .with_context(|| format!("open data directory {}", paths.data_dir.display()))?;
    Ok((config, manager))
}

fn cmd_init(paths: &HostGeniusPaths) -> Result<()> {
    paths.ensure_dirs()?;

    if !paths.config_file.is_file() {
        Config::default().save(paths)?;
        println!("Created {}", paths.config_file.display());
    }

    let (config, manager) = open_manager(paths)?;
    let system = manager.store().system_group()?;
    println!(
        "System group '{}' tracks {}",
        system.name,
        config.hosts_path().display()
    );
    println!("HostGenius initialised at {}", paths.data_dir.display());
    Ok(())
}

fn cmd_doctor(paths: &HostGeniusPaths) -> Result<()> {
    let config = Config::load(paths)?;
    let results = crate::doctor::run_checks(paths, &config)?;
    let mut failed = 0;
    for r in &results {
        let mark = if r.ok { "ok" } else { "FAIL" };
        println!("[{mark}] {}", r.message);
        if !r.ok {
            failed += 1;
        }
    }
    if failed > 0 {
        bail!("{failed} check(s) failed");
    }
    Ok(())
}

fn apply(manager: &HostManager) -> Result<()> {
    let report = manager.apply_hosts()?;
    print_write_report(manager, &report);
    Ok(())
}

fn print_write_report(manager: &HostManager, report: &WriteReport) {
    println!(
        "Wrote {} bytes to {} (backup {})",
        report.bytes_written,
        manager.writer().hosts_path().display(),
        report.backup.id
    );
    if report.dns_flush == DnsFlush::Failed {
        eprintln!("Warning: DNS cache flush failed; changes apply once the cache expires.");
    }
}

/// Find a group by id or name.
fn resolve_group(manager: &HostManager, key: &str) -> Result<HostGroup> {
    match manager.find_group(key)? {
        Some(group) => Ok(group),
        None => bail!("no group with id or name '{key}'"),
    }
}

fn read_content(content: Option<String>, file: Option<&Path>) -> Result<Option<String>> {
    match (content, file) {
        (Some(content), _) => Ok(Some(content)),
        (None, Some(path)) => fs::read_to_string(path)
            .map(Some)
            .with_context(|| format!("read {}", path.display())),
        (None, None) => Ok(None),
    }
}

fn cmd_group(paths: &HostGeniusPaths, cmd: GroupCmd) -> Result<()> {
    let (_, manager) = open_manager(paths)?;

    match cmd {
        GroupCmd::List { json } => {
            let groups = manager.groups()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
                return Ok(());
            }
            for g in &groups {
                let state = if g.enabled { "on" } else { "off" };
                let system = if g.is_system { " (system)" } else { "" };
                println!("{}\t{state}\tv{}\t{}{system}", g.id, g.version, g.name);
            }
            Ok(())
        }
        GroupCmd::Show { group } => {
            let g = resolve_group(&manager, &group)?;
            println!("id: {}", g.id);
            println!("name: {}", g.name);
            if let Some(desc) = &g.description {
                println!("description: {desc}");
            }
            println!("enabled: {}", g.enabled);
            println!("system: {}", g.is_system);
            println!("version: {}", g.version);
            println!("updated: {}", g.updated_at.to_rfc3339());
            println!();
            println!("{}", g.content);
            Ok(())
        }
        GroupCmd::Create {
            name,
            description,
            content,
            file,
            disabled,
            apply: and_apply,
        } => {
            let content = read_content(content, file.as_deref())?.unwrap_or_default();
            let mut new = NewGroup::new(name.trim(), content).enabled(!disabled);
            if let Some(desc) = description {
                new = new.description(desc);
            }
            let name = new.name.clone();
            let id = manager.create_group(new)?;
            println!("Created group: {name} ({id})");
            if and_apply {
                apply(&manager)?;
            }
            Ok(())
        }
        GroupCmd::Update {
            group,
            name,
            description,
            content,
            file,
            apply: and_apply,
        } => {
            let g = resolve_group(&manager, &group)?;
            let update = GroupUpdate {
                name: name.map(|n| n.trim().to_string()),
                description,
                content: read_content(content, file.as_deref())?,
                enabled: None,
            };
            if update.is_empty() {
                bail!("nothing to update; pass --name, --description, --content or --file");
            }
            if !manager.update_group(&g.id, &update)? {
                bail!("group '{}' was not updated (the system group cannot be renamed)", g.name);
            }
            println!("Updated group: {}", g.name);
            if and_apply {
                apply(&manager)?;
            }
            Ok(())
        }
        GroupCmd::Delete {
            group,
            apply: and_apply,
        } => {
            let g = resolve_group(&manager, &group)?;
            if !manager.delete_group(&g.id)? {
                bail!("group '{}' cannot be deleted", g.name);
            }
            println!("Deleted group: {}", g.name);
            if and_apply {
                apply(&manager)?;
            }
            Ok(())
        }
        GroupCmd::Toggle {
            group,
            apply: and_apply,
        } => {
            let g = resolve_group(&manager, &group)?;
            if !manager.toggle_group(&g.id)? {
                bail!("group '{}' cannot be toggled", g.name);
            }
            let state = if g.enabled { "disabled" } else { "enabled" };
            println!("Group {} {state}", g.name);
            if and_apply {
                apply(&manager)?;
            }
            Ok(())
        }
        GroupCmd::History { group, limit } => {
            let g = resolve_group(&manager, &group)?;
            for h in manager.group_history(&g.id, limit)? {
                println!(
                    "v{}\t{}\t{}\t{} line(s)",
                    h.version,
                    h.operation,
                    h.created_at.to_rfc3339(),
                    h.content.lines().count()
                );
            }
            Ok(())
        }
        GroupCmd::Export { group, output } => {
            let g = resolve_group(&manager, &group)?;
            let json = manager.export_group(&g.id)?;
            write_output(&json, output.as_deref())
        }
        GroupCmd::Import { file } => {
            let json = fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let id = manager.import_group(&json)?;
            println!("Imported group ({id}), disabled until toggled");
            Ok(())
        }
    }
}

fn cmd_hosts(paths: &HostGeniusPaths, cmd: HostsCmd) -> Result<()> {
    match cmd {
        HostsCmd::Parse { file } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("read {}", file.display()))?;
            let entries = crate::hosts::parse(&text);
            println!("{}", serde_json::to_string_pretty(&entries)?);
            Ok(())
        }
        HostsCmd::Show { raw, parsed } => {
            let (_, manager) = open_manager(paths)?;
            if parsed {
                println!("{}", crate::hosts::format(&manager.parsed_system_hosts()?));
            } else if raw {
                print!("{}", manager.read_raw_system_hosts()?);
            } else {
                print!("{}", manager.read_system_hosts()?);
            }
            Ok(())
        }
        HostsCmd::Import { file } => {
            let (_, manager) = open_manager(paths)?;
            let summary = manager.import_hosts_config(&file)?;
            println!(
                "Imported {}: {} created, {} updated, {} skipped",
                file.display(),
                summary.created,
                summary.updated,
                summary.skipped
            );
            Ok(())
        }
        HostsCmd::Export { format, output } => {
            let (_, manager) = open_manager(paths)?;
            let doc = manager.export_hosts_config(format.into())?;
            write_output(&doc, output.as_deref())
        }
    }
}

fn cmd_backup(paths: &HostGeniusPaths, cmd: BackupCmd) -> Result<()> {
    let (config, manager) = open_manager(paths)?;

    match cmd {
        BackupCmd::List => {
            for b in manager.list_backups()? {
                println!("{}\t{}\t{}", b.id, b.created_at.to_rfc3339(), b.size);
            }
            Ok(())
        }
        BackupCmd::Create => {
            let b = manager.create_backup()?;
            println!("Created backup: {} ({} bytes)", b.id, b.size);
            Ok(())
        }
        BackupCmd::Restore { id } => {
            let report = manager.restore_from_backup(&id)?;
            println!("Restored backup: {id}");
            print_write_report(&manager, &report);
            Ok(())
        }
        BackupCmd::Prune { days } => {
            let days = days.unwrap_or(config.backup_keep_days);
            let removed = manager.prune_backups(days)?;
            println!("Removed {removed} backup(s) older than {days} day(s)");
            Ok(())
        }
    }
}

fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
            println!("Wrote {}", path.display());
        }
        None => println!("{text}"),
    }
    Ok(())
}
