//! Host manager: hosts-config import/export and single-group JSON documents.

mod common;

use common::{MockExec, MockMode, Sandbox};
use hostgenius::error::HostsError;
use hostgenius::group::{NewGroup, SYSTEM_GROUP_NAME};
use hostgenius::manager::{HostManager, ImportSummary, IMPORTED_DESCRIPTION};
use hostgenius::sections::Dialect;
use std::fs;

const SWITCHHOSTS_FILE: &str = "127.0.0.1 localhost\n\
# --- SWITCHHOSTS_CONTENT_START ---\n\
# --- Work [disabled] ---\n\
10.0.0.1 intranet.work\n\
# --- Home ---\n\
10.0.0.2 nas.home\n\
# --- SWITCHHOSTS_CONTENT_END ---\n";

fn manager(dir: &std::path::Path) -> HostManager {
    let sandbox = Sandbox::new(dir, "");
    let (exec, _) = MockExec::new(MockMode::Succeed);
    sandbox.manager(exec)
}

#[test]
fn import_creates_missing_groups() {
    let dir = common::temp_home();
    let manager = manager(dir.path());
    let file = dir.path().join("switchhosts.txt");
    fs::write(&file, SWITCHHOSTS_FILE).unwrap();

    let summary = manager.import_hosts_config(&file).unwrap();
    assert_eq!(
        summary,
        ImportSummary {
            created: 2,
            updated: 0,
            skipped: 0
        }
    );

    let work = manager.find_group("Work").unwrap().unwrap();
    assert!(!work.enabled);
    assert_eq!(work.content, "10.0.0.1 intranet.work");
    assert_eq!(work.description.as_deref(), Some(IMPORTED_DESCRIPTION));
    assert!(manager.find_group("Home").unwrap().unwrap().enabled);
}

#[test]
fn import_updates_existing_and_skips_system_name() {
    let dir = common::temp_home();
    let manager = manager(dir.path());
    let id = manager
        .create_group(NewGroup::new("Home", "10.0.0.99 old.home"))
        .unwrap();
    let text = format!(
        "# --- HOSTGENIUS_CONTENT_START ---\n\
         # --- Home [disabled] ---\n\
         10.0.0.2 nas.home\n\
         # --- {SYSTEM_GROUP_NAME} [enabled] ---\n\
         6.6.6.6 hijack.test\n\
         # --- HOSTGENIUS_CONTENT_END ---\n"
    );

    let summary = manager.import_hosts_text(&text).unwrap();
    assert_eq!(
        summary,
        ImportSummary {
            created: 0,
            updated: 1,
            skipped: 1
        }
    );

    let home = manager.find_group(&id).unwrap().unwrap();
    assert_eq!(home.content, "10.0.0.2 nas.home");
    assert!(!home.enabled);
    assert_eq!(home.version, 2);
    assert!(!manager
        .store()
        .system_group()
        .unwrap()
        .content
        .contains("hijack"));
}

#[test]
fn import_keeps_own_dialect_description() {
    let dir = common::temp_home();
    let manager = manager(dir.path());
    let text = "# --- HOSTGENIUS_CONTENT_START ---\n\
                # --- Dev [enabled] ---\n\
                # Description: local services\n\
                127.0.0.1 api.dev.test\n\
                # --- HOSTGENIUS_CONTENT_END ---\n";

    manager.import_hosts_text(text).unwrap();
    let dev = manager.find_group("Dev").unwrap().unwrap();
    assert_eq!(dev.description.as_deref(), Some("local services"));
}

#[test]
fn import_missing_file_is_not_found() {
    let dir = common::temp_home();
    let manager = manager(dir.path());

    let err = manager
        .import_hosts_config(&dir.path().join("missing.txt"))
        .unwrap_err();
    assert!(matches!(err, HostsError::NotFound { entity: "file", .. }));
}

#[test]
fn export_then_import_restores_groups() {
    let dir = common::temp_home();
    let source = manager(dir.path());
    source.import_hosts_text(SWITCHHOSTS_FILE).unwrap();
    let doc = source.export_hosts_config(Dialect::SwitchHosts).unwrap();
    assert!(doc.contains("# --- Work [disabled] ---"));

    let other = common::temp_home();
    let target = manager(other.path());
    target.import_hosts_text(&doc).unwrap();

    let work = target.find_group("Work").unwrap().unwrap();
    assert!(!work.enabled);
    assert_eq!(work.content, "10.0.0.1 intranet.work");
}

#[test]
fn reimporting_own_export_updates_in_place() {
    let dir = common::temp_home();
    let manager = manager(dir.path());
    manager
        .create_group(NewGroup::new("Dev - api #2", "10.0.0.1 api.test"))
        .unwrap();
    manager.create_group(NewGroup::new("a-b", "10.0.0.2 ab.test")).unwrap();
    let before = manager.groups().unwrap().len();

    let doc = manager.export_hosts_config(Dialect::HostGenius).unwrap();
    let summary = manager.import_hosts_text(&doc).unwrap();

    assert_eq!(summary.created, 0);
    assert_eq!(summary.updated, 2);
    assert_eq!(manager.groups().unwrap().len(), before);
}

#[test]
fn import_skips_names_that_cannot_be_stored() {
    let dir = common::temp_home();
    let manager = manager(dir.path());
    let doc = "# --- SWITCHHOSTS_CONTENT_START ---\n\
# --- Legacy [ON] ---\n\
10.0.0.1 legacy.test\n\
# --- Home ---\n\
10.0.0.2 nas.home\n\
# --- SWITCHHOSTS_CONTENT_END ---\n";

    let summary = manager.import_hosts_text(doc).unwrap();
    assert_eq!(
        summary,
        ImportSummary {
            created: 1,
            updated: 0,
            skipped: 1
        }
    );
    assert!(manager.find_group("Home").unwrap().is_some());
    assert!(manager.find_group("Legacy [ON]").unwrap().is_none());
}

#[test]
fn own_export_leaves_out_disabled_groups() {
    let dir = common::temp_home();
    let manager = manager(dir.path());
    manager.import_hosts_text(SWITCHHOSTS_FILE).unwrap();

    let doc = manager.export_hosts_config(Dialect::HostGenius).unwrap();
    assert!(doc.contains("# --- Home [enabled] ---"));
    assert!(!doc.contains("Work"));
}

#[test]
fn export_group_is_camel_case_json() {
    let dir = common::temp_home();
    let manager = manager(dir.path());
    let id = manager
        .create_group(NewGroup::new("Dev", "10.0.0.1 a.test").description("d"))
        .unwrap();

    let json = manager.export_group(&id).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["name"], "Dev");
    assert_eq!(value["description"], "d");
    assert_eq!(value["content"], "10.0.0.1 a.test");
    assert_eq!(value["version"], 1);
    assert!(value["exportedAt"].is_string());
}

#[test]
fn export_unknown_group_is_not_found() {
    let dir = common::temp_home();
    let manager = manager(dir.path());

    let err = manager.export_group("missing").unwrap_err();
    assert!(matches!(err, HostsError::NotFound { entity: "group", .. }));
}

#[test]
fn imported_group_starts_disabled() {
    let dir = common::temp_home();
    let manager = manager(dir.path());
    let id = manager
        .create_group(NewGroup::new("Dev", "10.0.0.1 a.test"))
        .unwrap();
    let json = manager.export_group(&id).unwrap();
    manager.delete_group(&id).unwrap();

    let new_id = manager.import_group(&json).unwrap();
    let group = manager.find_group(&new_id).unwrap().unwrap();
    assert_eq!(group.name, "Dev");
    assert_eq!(group.content, "10.0.0.1 a.test");
    assert!(!group.enabled);
    assert_eq!(group.version, 1);
}

#[test]
fn import_group_minimal_document() {
    let dir = common::temp_home();
    let manager = manager(dir.path());

    let id = manager.import_group(r#"{"name": "Bare"}"#).unwrap();
    let group = manager.find_group(&id).unwrap().unwrap();
    assert_eq!(group.content, "");
    assert!(!group.enabled);
}

#[test]
fn malformed_group_json_is_config_format() {
    let dir = common::temp_home();
    let manager = manager(dir.path());

    for doc in ["not json", r#"{"content": "x"}"#, r#"{"name": "   "}"#] {
        let err = manager.import_group(doc).unwrap_err();
        assert!(matches!(err, HostsError::ConfigFormat(_)), "{doc}: {err}");
    }
    assert_eq!(manager.groups().unwrap().len(), 1);
}

#[test]
fn import_group_with_taken_name_is_duplicate() {
    let dir = common::temp_home();
    let manager = manager(dir.path());
    manager.create_group(NewGroup::new("Dev", "")).unwrap();

    let err = manager.import_group(r#"{"name": "Dev"}"#).unwrap_err();
    assert!(matches!(err, HostsError::DuplicateName(_)));
}
