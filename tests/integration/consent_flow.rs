// Recoverable denials, grant prompts and the single retry after approval

use crate::common::helpers::{FailingLauncher, TestVolume, recording};
use mediabridge::engine::{
    ConsentLedger, ConsentOutcome, ErrorCode, UiLauncher, local::LedgerLauncher,
};
use std::sync::Arc;

const VIDEO_1: &str = "content://media/external/video/media/1";

#[test]
fn test_foreign_file_requires_consent() {
    let volume = TestVolume::new(33);
    volume.add_media("DCIM/Camera/theirs.mp4", b"original", false);
    let staging = volume.staging("x.tmp", b"compressed");
    let (launcher, handle) = recording();
    let bridge = volume.bridge(handle);

    let err = bridge.replace_at_identifier(VIDEO_1, &staging).unwrap_err();

    assert_eq!(err.code, ErrorCode::ConsentRequired);
    assert_eq!(err.message, "User consent required for file replacement");
    let token = err.correlation_token.expect("token on CONSENT_REQUIRED");
    assert_eq!(launcher.count(), 1);
    assert_eq!(launcher.last().correlation_token, token);
    assert_eq!(volume.read("DCIM/Camera/theirs.mp4"), b"original");
    assert_eq!(bridge.open_sessions(), 1);
}

#[test]
fn test_repeated_attempt_without_grant_asks_again() {
    let volume = TestVolume::new(33);
    volume.add_media("DCIM/Camera/theirs.mp4", b"original", false);
    let staging = volume.staging("x.tmp", b"compressed");
    let (launcher, handle) = recording();
    let bridge = volume.bridge(handle);

    let first = bridge.replace_at_identifier(VIDEO_1, &staging).unwrap_err();
    let second = bridge.replace_at_identifier(VIDEO_1, &staging).unwrap_err();

    assert_eq!(first.code, ErrorCode::ConsentRequired);
    assert_eq!(second.code, ErrorCode::ConsentRequired);
    assert_ne!(first.correlation_token, second.correlation_token);
    assert_eq!(launcher.count(), 2);
    assert_eq!(bridge.open_sessions(), 1);

    // The superseded prompt no longer routes anywhere
    let stale = first.correlation_token.unwrap();
    let err = bridge
        .notify_consent(&stale, ConsentOutcome::Approved)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidArgument);
    assert_eq!(volume.read("DCIM/Camera/theirs.mp4"), b"original");
}

#[test]
fn test_approved_grant_lets_retry_succeed() {
    let volume = TestVolume::new(33);
    volume.add_media("DCIM/Camera/theirs.mp4", b"original", false);
    let staging = volume.staging("x.tmp", b"0123456789");
    let (launcher, handle) = recording();
    let bridge = volume.bridge(handle);

    let err = bridge.replace_at_identifier(VIDEO_1, &staging).unwrap_err();
    let token = err.correlation_token.unwrap();

    // The platform applies the grant, then the host reports the answer
    let request = launcher.last();
    volume.catalog.apply_grant(&request.action_handle).unwrap();
    bridge.notify_consent(&token, ConsentOutcome::Approved).unwrap();

    assert_eq!(bridge.replace_at_identifier(VIDEO_1, &staging).unwrap(), None);
    assert_eq!(volume.read("DCIM/Camera/theirs.mp4"), b"0123456789");
    assert_eq!(launcher.count(), 1);
    assert_eq!(bridge.open_sessions(), 0);
}

#[test]
fn test_denial_after_approval_is_terminal() {
    let volume = TestVolume::new(33);
    volume.add_media("DCIM/Camera/theirs.mp4", b"original", false);
    let staging = volume.staging("x.tmp", b"compressed");
    let (launcher, handle) = recording();
    let bridge = volume.bridge(handle);

    let err = bridge.replace_at_identifier(VIDEO_1, &staging).unwrap_err();
    // Approved, but the catalog never recorded the grant
    bridge
        .notify_consent(&err.correlation_token.unwrap(), ConsentOutcome::Approved)
        .unwrap();

    let err = bridge.replace_at_identifier(VIDEO_1, &staging).unwrap_err();
    assert_eq!(err.code, ErrorCode::SecurityError);
    assert_eq!(launcher.count(), 1);
    assert_eq!(bridge.open_sessions(), 0);
    assert_eq!(volume.read("DCIM/Camera/theirs.mp4"), b"original");
}

#[test]
fn test_denied_prompt_ends_session() {
    let volume = TestVolume::new(33);
    volume.add_media("Movies/theirs.mp4", b"original", false);
    let staging = volume.staging("x.tmp", b"compressed");
    let (launcher, handle) = recording();
    let bridge = volume.bridge(handle);

    let err = bridge.replace_at_identifier(VIDEO_1, &staging).unwrap_err();
    bridge
        .notify_consent(&err.correlation_token.unwrap(), ConsentOutcome::Denied)
        .unwrap();
    assert_eq!(bridge.open_sessions(), 0);

    // A later call starts over and prompts again
    let err = bridge.replace_at_identifier(VIDEO_1, &staging).unwrap_err();
    assert_eq!(err.code, ErrorCode::ConsentRequired);
    assert_eq!(launcher.count(), 2);
}

#[test]
fn test_unknown_token_is_rejected() {
    let volume = TestVolume::new(33);
    let bridge = volume.bridge(None);

    let err = bridge
        .notify_consent("not-a-token", ConsentOutcome::Approved)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidArgument);
}

#[test]
fn test_missing_ui_host_is_no_activity() {
    let volume = TestVolume::new(33);
    volume.add_media("Movies/theirs.mp4", b"original", false);
    let staging = volume.staging("x.tmp", b"compressed");
    let bridge = volume.bridge(None);

    let err = bridge.replace_at_identifier(VIDEO_1, &staging).unwrap_err();
    assert_eq!(err.code, ErrorCode::NoActivity);
    assert_eq!(bridge.open_sessions(), 0);
}

#[test]
fn test_launch_failure_is_consent_error() {
    let volume = TestVolume::new(33);
    volume.add_media("Movies/theirs.mp4", b"original", false);
    let staging = volume.staging("x.tmp", b"compressed");
    let launcher: Arc<dyn UiLauncher> = Arc::new(FailingLauncher);
    let bridge = volume.bridge(Some(launcher));

    let err = bridge.replace_at_identifier(VIDEO_1, &staging).unwrap_err();
    assert_eq!(err.code, ErrorCode::ConsentError);
}

#[test]
fn test_batch_request_needs_tier_30() {
    let volume = TestVolume::new(29);
    volume.add_media("Movies/theirs.mp4", b"original", false);
    let (launcher, handle) = recording();
    let bridge = volume.bridge(handle);

    let err = bridge.request_write_permission(&[VIDEO_1]).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnsupportedVersion);
    assert_eq!(launcher.count(), 0);
}

#[test]
fn test_batch_request_launches_one_prompt() {
    let volume = TestVolume::new(33);
    volume.add_media("Movies/a.mp4", b"a", false);
    volume.add_media("Pictures/b.jpg", b"b", false);
    let (launcher, handle) = recording();
    let bridge = volume.bridge(handle);

    let result = bridge
        .request_write_permission(&[
            VIDEO_1,
            "content://com.android.providers.media.documents/document/image%3A2",
        ])
        .unwrap();
    assert_eq!(result, None);
    assert_eq!(launcher.count(), 1);

    // Approving the batch prompt makes both writable without further prompts
    volume
        .catalog
        .apply_grant(&launcher.last().action_handle)
        .unwrap();
    let staging = volume.staging("x.tmp", b"new");
    bridge.replace_at_identifier(VIDEO_1, &staging).unwrap();
    bridge
        .replace_at_identifier("content://media/external/images/media/2", &staging)
        .unwrap();
    assert_eq!(volume.read("Pictures/b.jpg"), b"new");
    assert_eq!(launcher.count(), 1);
}

#[test]
fn test_batch_request_errors() {
    let volume = TestVolume::new(33);
    let bridge = volume.bridge(None);
    let err = bridge.request_write_permission(&[VIDEO_1]).unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionError);

    volume.add_media("Movies/a.mp4", b"a", false);
    let err = bridge.request_write_permission(&[VIDEO_1]).unwrap_err();
    assert_eq!(err.code, ErrorCode::NoActivity);

    let err = bridge.request_write_permission(&["nonsense"]).unwrap_err();
    assert_eq!(err.code, ErrorCode::PermissionError);
}

#[test]
fn test_ledger_launcher_round_trip() {
    let volume = TestVolume::new(33);
    volume.add_media("DCIM/Camera/theirs.mp4", b"original", false);
    let staging = volume.staging("x.tmp", b"compressed");
    let launcher: Arc<dyn UiLauncher> = Arc::new(LedgerLauncher::new(volume.dir.path()));
    let bridge = volume.bridge(Some(launcher));

    let err = bridge.replace_at_identifier(VIDEO_1, &staging).unwrap_err();
    let token = err.correlation_token.unwrap();

    let ledger = ConsentLedger::load(volume.dir.path()).unwrap();
    assert_eq!(ledger.pending.len(), 1);
    assert_eq!(ledger.pending[0].correlation_token, token);

    volume
        .catalog
        .answer_consent(&token, ConsentOutcome::Approved)
        .unwrap();
    assert!(ConsentLedger::load(volume.dir.path()).unwrap().pending.is_empty());

    // A fresh attempt sees the persisted grant
    bridge.replace_at_identifier(VIDEO_1, &staging).unwrap();
    assert_eq!(volume.read("DCIM/Camera/theirs.mp4"), b"compressed");
}

#[test]
fn test_superseded_prompt_is_withdrawn() {
    let volume = TestVolume::new(33);
    volume.add_media("DCIM/Camera/theirs.mp4", b"original", false);
    let staging = volume.staging("x.tmp", b"compressed");
    let (launcher, handle) = recording();
    let bridge = volume.bridge(handle);

    let first = bridge.replace_at_identifier(VIDEO_1, &staging).unwrap_err();
    let second = bridge.replace_at_identifier(VIDEO_1, &staging).unwrap_err();

    assert_eq!(launcher.withdrawn(), vec![first.correlation_token.unwrap()]);
    assert_ne!(launcher.withdrawn()[0], second.correlation_token.unwrap());
}

#[test]
fn test_superseded_ledger_token_cannot_grant_access() {
    let volume = TestVolume::new(33);
    volume.add_media("DCIM/Camera/theirs.mp4", b"original", false);
    let staging = volume.staging("x.tmp", b"compressed");
    let launcher: Arc<dyn UiLauncher> = Arc::new(LedgerLauncher::new(volume.dir.path()));
    let bridge = volume.bridge(Some(launcher));

    let tokens: Vec<String> = (0..5)
        .map(|_| {
            bridge
                .replace_at_identifier(VIDEO_1, &staging)
                .unwrap_err()
                .correlation_token
                .unwrap()
        })
        .collect();

    let ledger = ConsentLedger::load(volume.dir.path()).unwrap();
    assert_eq!(ledger.pending.len(), 1);
    assert_eq!(&ledger.pending[0].correlation_token, tokens.last().unwrap());

    assert!(
        volume
            .catalog
            .answer_consent(&tokens[0], ConsentOutcome::Approved)
            .is_err()
    );
    let err = bridge.replace_at_identifier(VIDEO_1, &staging).unwrap_err();
    assert_eq!(err.code, ErrorCode::ConsentRequired);
    assert_eq!(volume.read("DCIM/Camera/theirs.mp4"), b"original");
}

#[test]
fn test_ledger_keeps_newest_prompt_across_bridges() {
    // Each CLI invocation builds its own bridge over the same volume
    let volume = TestVolume::new(33);
    volume.add_media("DCIM/Camera/theirs.mp4", b"original", false);
    let staging = volume.staging("x.tmp", b"compressed");
    let open_bridge = || {
        let launcher: Arc<dyn UiLauncher> = Arc::new(LedgerLauncher::new(volume.dir.path()));
        volume.bridge(Some(launcher))
    };

    let stale = open_bridge()
        .replace_at_identifier(VIDEO_1, &staging)
        .unwrap_err()
        .correlation_token
        .unwrap();
    let fresh = open_bridge()
        .replace_at_identifier(VIDEO_1, &staging)
        .unwrap_err()
        .correlation_token
        .unwrap();

    assert_eq!(ConsentLedger::load(volume.dir.path()).unwrap().pending.len(), 1);
    assert!(
        volume
            .catalog
            .answer_consent(&stale, ConsentOutcome::Approved)
            .is_err()
    );
    volume
        .catalog
        .answer_consent(&fresh, ConsentOutcome::Approved)
        .unwrap();

    open_bridge().replace_at_identifier(VIDEO_1, &staging).unwrap();
    assert_eq!(volume.read("DCIM/Camera/theirs.mp4"), b"compressed");
}

#[test]
fn test_abandon_replace_drops_pending_session() {
    let volume = TestVolume::new(33);
    volume.add_media("DCIM/Camera/theirs.mp4", b"original", false);
    let staging = volume.staging("x.tmp", b"compressed");
    let launcher: Arc<dyn UiLauncher> = Arc::new(LedgerLauncher::new(volume.dir.path()));
    let bridge = volume.bridge(Some(launcher));

    let token = bridge
        .replace_at_identifier(VIDEO_1, &staging)
        .unwrap_err()
        .correlation_token
        .unwrap();

    assert!(bridge.abandon_replace(VIDEO_1).unwrap());
    assert_eq!(bridge.open_sessions(), 0);
    assert!(ConsentLedger::load(volume.dir.path()).unwrap().pending.is_empty());

    let err = bridge
        .notify_consent(&token, ConsentOutcome::Approved)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidArgument);
    assert!(!bridge.abandon_replace(VIDEO_1).unwrap());
}

#[test]
fn test_abandon_replace_drops_granted_session() {
    let volume = TestVolume::new(33);
    volume.add_media("DCIM/Camera/theirs.mp4", b"original", false);
    let staging = volume.staging("x.tmp", b"compressed");
    let (launcher, handle) = recording();
    let bridge = volume.bridge(handle);

    let token = bridge
        .replace_at_identifier(VIDEO_1, &staging)
        .unwrap_err()
        .correlation_token
        .unwrap();
    bridge.notify_consent(&token, ConsentOutcome::Approved).unwrap();
    assert_eq!(bridge.open_sessions(), 1);

    // Addressed through the document form of the same record
    assert!(
        bridge
            .abandon_replace("content://com.android.providers.media.documents/document/video%3A1")
            .unwrap()
    );
    assert_eq!(bridge.open_sessions(), 0);
    // Granted sessions have no prompt left to retract
    assert!(launcher.withdrawn().is_empty());
}
