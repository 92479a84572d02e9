//! config.toml under concurrent save and load: readers never see a torn file.

mod common;

use hostgenius::config::{Config, HostGeniusPaths};
use std::path::PathBuf;
use std::sync::Barrier;
use std::thread;

fn config_for(i: u32) -> Config {
    Config {
        hosts_file: Some(PathBuf::from(format!("/srv/hosts-variant-{i}"))),
        flush_dns: i % 2 == 0,
        backup_keep_days: i,
    }
}

#[test]
fn loads_during_saves_see_whole_configs() {
    let dir = common::temp_home();
    let paths = HostGeniusPaths::for_test(dir.path());
    paths.ensure_dirs().unwrap();
    config_for(1).save(&paths).unwrap();

    let barrier = Barrier::new(6);
    thread::scope(|s| {
        for i in 2..5 {
            let (paths, barrier) = (&paths, &barrier);
            s.spawn(move || {
                barrier.wait();
                for _ in 0..20 {
                    config_for(i).save(paths).unwrap();
                }
            });
        }
        for _ in 0..3 {
            let (paths, barrier) = (&paths, &barrier);
            s.spawn(move || {
                barrier.wait();
                for _ in 0..20 {
                    let loaded = Config::load(paths).unwrap();
                    let i = loaded.backup_keep_days;
                    assert!((1..5).contains(&i), "{loaded:?}");
                    assert_eq!(loaded.hosts_file, config_for(i).hosts_file);
                    assert_eq!(loaded.flush_dns, i % 2 == 0);
                }
            });
        }
    });

    let last = Config::load(&paths).unwrap();
    assert!((2..5).contains(&last.backup_keep_days));
}
