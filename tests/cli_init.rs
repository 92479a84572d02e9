//! hostgenius init: creates the data directory and is idempotent.

mod common;

use assert_cmd::Command;
use hostgenius::config::{Config, HostGeniusPaths};
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn hostgenius(home: &Path, hosts: &Path) -> Command {
    let mut cmd = Command::cargo_bin("hostgenius").unwrap();
    cmd.env("HOSTGENIUS_HOME", home)
        .env("HOSTGENIUS_HOSTS_FILE", hosts)
        .env("HOSTGENIUS_SKIP_DNS_FLUSH", "1");
    cmd
}

#[test]
fn init_creates_structure() {
    let dir = common::temp_home();
    let hosts = dir.path().join("hosts");
    fs::write(&hosts, "127.0.0.1 localhost\n").unwrap();
    let home = dir.path().join("data");
    let paths = HostGeniusPaths::for_test(&home);

    hostgenius(&home, &hosts)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("HostGenius initialised"));

    assert!(paths.data_dir.is_dir());
    assert!(paths.backups_dir.is_dir());
    assert!(paths.db_file.is_file());
    assert!(paths.config_file.is_file());
}

#[test]
fn init_idempotent() {
    let dir = common::temp_home();
    let hosts = dir.path().join("hosts");
    fs::write(&hosts, "").unwrap();
    let home = dir.path().join("data");
    let paths = HostGeniusPaths::for_test(&home);

    hostgenius(&home, &hosts).arg("init").assert().success();
    let custom = Config {
        backup_keep_days: 7,
        ..Config::default()
    };
    custom.save(&paths).unwrap();

    hostgenius(&home, &hosts).arg("init").assert().success();
    assert_eq!(Config::load(&paths).unwrap(), custom, "second init should not overwrite config");
}

#[test]
fn init_captures_system_hosts() {
    let dir = common::temp_home();
    let hosts = dir.path().join("hosts");
    fs::write(&hosts, "127.0.0.1 localhost\n10.9.9.9 printer.lan\n").unwrap();
    let home = dir.path().join("data");

    hostgenius(&home, &hosts).arg("init").assert().success();

    hostgenius(&home, &hosts)
        .args(["group", "show", "System Hosts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("printer.lan"));
}

#[test]
fn doctor_before_and_after_init() {
    let dir = common::temp_home();
    let hosts = dir.path().join("hosts");
    fs::write(&hosts, "127.0.0.1 localhost\n").unwrap();
    let home = dir.path().join("data");

    hostgenius(&home, &hosts)
        .arg("doctor")
        .assert()
        .failure()
        .stdout(predicate::str::contains("hostgenius init"));

    hostgenius(&home, &hosts).arg("init").assert().success();

    hostgenius(&home, &hosts)
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("[ok] Database ok"))
        .stdout(predicate::str::contains("no managed section"));
}

#[test]
fn doctor_leaves_legacy_database_in_place() {
    let dir = common::temp_home();
    let hosts = dir.path().join("hosts");
    fs::write(&hosts, "127.0.0.1 localhost\n").unwrap();
    let home = dir.path().join("data");
    let paths = HostGeniusPaths::for_test(&home);

    hostgenius(&home, &hosts).arg("init").assert().success();
    let legacy = home.join(hostgenius::store::LEGACY_DB_FILE);
    fs::rename(&paths.db_file, &legacy).unwrap();

    hostgenius(&home, &hosts)
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("Legacy database"));

    assert!(legacy.is_file());
    assert!(!paths.db_file.exists());
}

#[test]
fn doctor_opens_database_read_only() {
    let dir = common::temp_home();
    let hosts = dir.path().join("hosts");
    fs::write(&hosts, "127.0.0.1 localhost\n").unwrap();
    let home = dir.path().join("data");
    let paths = HostGeniusPaths::for_test(&home);

    hostgenius(&home, &hosts).arg("init").assert().success();
    let store = hostgenius::store::GroupStore::open_read_only(&paths.db_file).unwrap();
    let before = store.get_all_groups().unwrap();
    drop(store);

    hostgenius(&home, &hosts).arg("doctor").assert().success();

    let store = hostgenius::store::GroupStore::open_read_only(&paths.db_file).unwrap();
    assert_eq!(store.get_all_groups().unwrap(), before);
    let err = store
        .create_group(hostgenius::group::NewGroup::new("Dev", "a"))
        .unwrap_err();
    assert!(matches!(err, hostgenius::error::HostsError::Database(_)));
}
