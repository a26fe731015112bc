// Config file drives the bridge settings

use crate::common::helpers::{ROOT, TestVolume};
use mediabridge::config::Config;
use mediabridge::engine::{
    BucketRow, CapabilityTier, CatalogIndex, LocalCatalog, MediaBridge, WriteMode,
};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_config_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = Config::default();
    config.platform.tier = 30;
    config.replace.mode = WriteMode::AtomicSwap;
    config.buckets.extra.push(BucketRow {
        prefix: "/Recordings/".to_string(),
        bucket: "Recordings/".to_string(),
    });
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded.tier(), CapabilityTier(30));
    assert_eq!(loaded.replace.mode, WriteMode::AtomicSwap);
    assert_eq!(loaded.buckets.extra.len(), 1);
}

#[test]
fn test_malformed_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[platform]\ntier = \"thirty\"\n").unwrap();

    let err = Config::load_from(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}

#[test]
fn test_extra_bucket_from_config_resolves() {
    let volume = TestVolume::new(33);
    let path = volume.add_media("Recordings/memo.m4a", b"aac", false);

    let mut config = Config::default();
    config.buckets.extra.push(BucketRow {
        prefix: "/Recordings/".to_string(),
        bucket: "Recordings/".to_string(),
    });
    let bridge = MediaBridge::new(volume.catalog.clone(), config.bridge_settings(), None);

    assert_eq!(
        bridge.resolve_identifier_from_path(&path).unwrap().as_deref(),
        Some("content://media/external/audio/media/1")
    );
}

#[test]
fn test_catalog_index_persists_across_reopen() {
    let volume = TestVolume::new(33);
    volume.add_media("DCIM/Camera/a.mp4", b"a", true);
    volume.add_media("Pictures/b.jpg", b"b", false);
    assert!(CatalogIndex::exists(volume.dir.path()));

    let reopened = LocalCatalog::open(volume.dir.path(), ROOT, CapabilityTier(33)).unwrap();
    let mut config = Config::default();
    config.storage.volume_dir = Some(volume.dir.path().to_path_buf());
    let bridge = MediaBridge::new(Arc::new(reopened), config.bridge_settings(), None);

    assert_eq!(
        bridge
            .resolve_identifier_from_path(&format!("{}/Pictures/b.jpg", ROOT))
            .unwrap()
            .as_deref(),
        Some("content://media/external/images/media/2")
    );
}

#[test]
fn test_scan_picks_up_new_files_only() {
    let volume = TestVolume::new(33);
    volume.add_file("DCIM/Camera/a.mp4", b"a");
    volume.add_file("Movies/b.mkv", b"b");
    volume.add_file("Documents/notes.txt", b"c");

    assert_eq!(volume.catalog.scan(false).unwrap(), 2);
    volume.add_file("Pictures/c.png", b"d");
    assert_eq!(volume.catalog.scan(false).unwrap(), 1);
}

#[test]
fn test_worker_setting_sizes_bridge_pool() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[workers]\nmax_workers = 3\n").unwrap();
    let config = Config::load_from(&path).unwrap();

    let volume = TestVolume::new(33);
    let bridge = Arc::new(MediaBridge::new(
        volume.catalog.clone(),
        config.bridge_settings(),
        None,
    ));
    let pool = config.bridge_pool(bridge);
    assert_eq!(pool.max_workers(), 3);
    assert!(pool.can_spawn());
}
