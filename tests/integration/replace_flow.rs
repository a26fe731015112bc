// Overwriting catalog resources with staging files

use crate::common::helpers::{ROOT, TestVolume, recording};
use mediabridge::engine::{ErrorCode, WriteMode};

#[test]
fn test_owned_camera_file_is_replaced_in_place() {
    let volume = TestVolume::new(33);
    let path = volume.add_media("DCIM/Camera/VID_0001.mp4", &[0u8; 4096], true);
    let staging = volume.staging("compressed.tmp", b"0123456789");
    let (launcher, handle) = recording();
    let bridge = volume.bridge(handle);

    let id = bridge.resolve_identifier_from_path(&path).unwrap().unwrap();
    assert_eq!(bridge.replace_at_identifier(&id, &staging).unwrap(), None);

    assert_eq!(volume.read("DCIM/Camera/VID_0001.mp4"), b"0123456789");
    assert_eq!(launcher.count(), 0);
    assert_eq!(bridge.open_sessions(), 0);
}

#[test]
fn test_replace_updates_catalog_size() {
    let volume = TestVolume::new(33);
    volume.add_media("Movies/a.mp4", &[1u8; 2048], true);
    let staging = volume.staging("a.tmp", &[2u8; 100]);
    let bridge = volume.bridge(None);

    bridge
        .replace_at_identifier("content://media/external/video/media/1", &staging)
        .unwrap();

    let record = volume
        .catalog
        .indexed(&mediabridge::engine::ContentIdentifier {
            catalog_id: 1,
            media_type: mediabridge::engine::MediaType::Video,
        })
        .unwrap();
    assert_eq!(record.size_bytes, 100);
}

#[test]
fn test_missing_staging_file_leaves_target_unchanged() {
    let volume = TestVolume::new(33);
    volume.add_media("DCIM/Camera/keep.mp4", b"original", true);
    let bridge = volume.bridge(None);

    let missing = volume.real("cache/never_written.tmp");
    let err = bridge
        .replace_at_identifier(
            "content://media/external/video/media/1",
            &missing.to_string_lossy(),
        )
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::FileNotFound);
    assert_eq!(volume.read("DCIM/Camera/keep.mp4"), b"original");
}

#[test]
fn test_unknown_target_is_not_found() {
    let volume = TestVolume::new(33);
    let staging = volume.staging("x.tmp", b"data");
    let bridge = volume.bridge(None);

    let err = bridge
        .replace_at_identifier("content://media/external/video/media/77", &staging)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::FileNotFound);
}

#[test]
fn test_missing_arguments_are_rejected() {
    let volume = TestVolume::new(33);
    let staging = volume.staging("x.tmp", b"data");
    let bridge = volume.bridge(None);

    let err = bridge.replace_at_identifier("", &staging).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidArgument);

    let err = bridge
        .replace_at_identifier("content://media/external/video/media/1", "")
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidArgument);

    let err = bridge
        .replace_at_identifier("ftp://host/clip.mp4", &staging)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidArgument);
}

#[test]
fn test_read_only_target_is_security_error() {
    let volume = TestVolume::new(33);
    volume.add_media("Pictures/locked.jpg", b"jpeg", true);
    let id = mediabridge::engine::ContentIdentifier {
        catalog_id: 1,
        media_type: mediabridge::engine::MediaType::Image,
    };
    volume.catalog.set_read_only(&id, true).unwrap();
    let staging = volume.staging("x.tmp", b"new");
    let (launcher, handle) = recording();
    let bridge = volume.bridge(handle);

    let err = bridge
        .replace_at_identifier("content://media/external/images/media/1", &staging)
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::SecurityError);
    assert_eq!(launcher.count(), 0);
    assert_eq!(volume.read("Pictures/locked.jpg"), b"jpeg");
}

#[test]
fn test_legacy_tier_writes_foreign_files_without_consent() {
    let volume = TestVolume::new(28);
    volume.add_media("Movies/foreign.mp4", b"theirs", false);
    let staging = volume.staging("x.tmp", b"ours");
    let (launcher, handle) = recording();
    let bridge = volume.bridge(handle);

    bridge
        .replace_at_identifier("content://media/external/video/media/1", &staging)
        .unwrap();

    assert_eq!(volume.read("Movies/foreign.mp4"), b"ours");
    assert_eq!(launcher.count(), 0);
}

#[test]
fn test_legacy_path_identifier_on_legacy_tier() {
    let volume = TestVolume::new(28);
    let path = volume.add_file("Download/plain.mp4", b"old");
    let staging = volume.staging("x.tmp", b"new");
    let bridge = volume.bridge(None);

    bridge.replace_at_identifier(&path, &staging).unwrap();
    assert_eq!(volume.read("Download/plain.mp4"), b"new");
}

#[test]
fn test_legacy_path_identifier_is_denied_when_scoped() {
    let volume = TestVolume::new(33);
    let path = volume.add_file("Download/plain.mp4", b"old");
    let staging = volume.staging("x.tmp", b"new");
    let bridge = volume.bridge(None);

    let err = bridge.replace_at_identifier(&path, &staging).unwrap_err();
    assert_eq!(err.code, ErrorCode::SecurityError);
    assert_eq!(volume.read("Download/plain.mp4"), b"old");
}

#[test]
fn test_document_identifier_is_written_through_catalog() {
    let volume = TestVolume::new(33);
    volume.add_media("DCIM/Camera/doc.mp4", b"before", true);
    let staging = volume.staging("x.tmp", b"after");
    let bridge = volume.bridge(None);

    bridge
        .replace_at_identifier(
            "content://com.android.providers.media.documents/document/video%3A1",
            &staging,
        )
        .unwrap();
    assert_eq!(volume.read("DCIM/Camera/doc.mp4"), b"after");
}

#[test]
fn test_atomic_swap_mode_replaces_content() {
    let volume = TestVolume::new(33);
    volume.add_media("Movies/swap.mp4", &[9u8; 512], true);
    let staging = volume.staging("x.tmp", b"swapped");
    let bridge = volume.bridge_with_mode(WriteMode::AtomicSwap, None);

    bridge
        .replace_at_identifier("content://media/external/video/media/1", &staging)
        .unwrap();

    assert_eq!(volume.read("Movies/swap.mp4"), b"swapped");
    // No scratch files left next to the target
    let leftovers: Vec<_> = std::fs::read_dir(volume.real("Movies"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name())
        .collect();
    assert_eq!(leftovers.len(), 1);
}

#[test]
fn test_replace_then_resolve_still_finds_record() {
    let volume = TestVolume::new(33);
    let path = volume.add_media("DCIM/Restored/r.mp4", b"orig", true);
    let staging = volume.staging("x.tmp", b"smaller");
    let bridge = volume.bridge(None);

    let id = bridge.resolve_identifier_from_path(&path).unwrap().unwrap();
    bridge.replace_at_identifier(&id, &staging).unwrap();

    assert_eq!(
        bridge.resolve_identifier_from_path(&format!("{}/DCIM/Restored/r.mp4", ROOT)).unwrap(),
        Some(id)
    );
}
