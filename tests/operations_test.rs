//! Cloud, achievement, session and archive operations through the bridge.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use platform_bridge::core::ResultCode;
use platform_bridge::infra::platform::InMemoryPlatform;
use platform_bridge::infra::ArchiveTool;
use platform_bridge::ops::AuthTicket;
use platform_bridge::platform::CloudQuota;
use platform_bridge::{Bridge, BridgeConfig, BridgeError, Continuations};

// ============================================================================
// HELPERS
// ============================================================================

type Outcomes<T> = Arc<Mutex<Vec<Result<T, BridgeError>>>>;

fn recorder<T: Send + 'static>() -> (Continuations<T>, Outcomes<T>) {
    let outcomes: Outcomes<T> = Arc::new(Mutex::new(Vec::new()));
    let ok = Arc::clone(&outcomes);
    let failed = Arc::clone(&outcomes);
    let continuations = Continuations::new(move |value| ok.lock().push(Ok(value)))
        .on_failure(move |err| failed.lock().push(Err(err)));
    (continuations, outcomes)
}

fn settle<T: Clone>(bridge: &Bridge, outcomes: &Outcomes<T>) -> Result<T, BridgeError> {
    assert!(bridge.run_until_idle(Duration::from_secs(5)));
    let outcomes = outcomes.lock();
    assert_eq!(outcomes.len(), 1, "continuation must run exactly once");
    outcomes[0].clone()
}

fn setup() -> (Arc<InMemoryPlatform>, Bridge) {
    let platform = Arc::new(InMemoryPlatform::new());
    let bridge = Bridge::builder(platform.clone()).build().unwrap();
    (platform, bridge)
}

/// Records calls instead of touching zip files.
#[derive(Default)]
struct FakeArchiver {
    calls: Mutex<Vec<(String, PathBuf, PathBuf, Option<String>)>>,
    fail: bool,
}

impl ArchiveTool for FakeArchiver {
    fn compress(&self, zip_path: &Path, source_dir: &Path, _level: i32, password: Option<&str>) -> Result<(), String> {
        self.calls.lock().push((
            "compress".into(),
            zip_path.to_path_buf(),
            source_dir.to_path_buf(),
            password.map(str::to_string),
        ));
        if self.fail {
            Err("disk full".into())
        } else {
            Ok(())
        }
    }

    fn decompress(&self, zip_path: &Path, destination: &Path, password: Option<&str>) -> Result<(), String> {
        self.calls.lock().push((
            "decompress".into(),
            zip_path.to_path_buf(),
            destination.to_path_buf(),
            password.map(str::to_string),
        ));
        Ok(())
    }
}

// ============================================================================
// CLOUD STORAGE
// ============================================================================

#[test]
fn test_save_then_read_text() {
    let (platform, bridge) = setup();

    let (saved, save_outcomes) = recorder::<()>();
    bridge.save_text_to_file("notes.txt", "hello cloud", saved).unwrap();
    assert!(settle(&bridge, &save_outcomes).is_ok());
    assert_eq!(platform.file("notes.txt").unwrap(), b"hello cloud");

    let (read, read_outcomes) = recorder::<String>();
    bridge.read_text_from_file("notes.txt", read).unwrap();
    assert_eq!(settle(&bridge, &read_outcomes).unwrap(), "hello cloud");
}

#[test]
fn test_save_text_write_failure() {
    let (platform, bridge) = setup();
    platform.set_fail_file_write(true);

    let (saved, outcomes) = recorder::<()>();
    bridge.save_text_to_file("notes.txt", "x", saved).unwrap();
    let err = settle(&bridge, &outcomes).unwrap_err();
    assert!(err.to_string().starts_with("save_text_to_file rejected"));
}

#[test]
fn test_read_missing_file_is_rejected() {
    let (_platform, bridge) = setup();
    let (read, outcomes) = recorder::<String>();
    bridge.read_text_from_file("absent.txt", read).unwrap();
    let err = settle(&bridge, &outcomes).unwrap_err();
    assert!(err.to_string().contains("doesn't exist"));
}

#[test]
fn test_zero_byte_read_of_non_empty_file_is_rejected() {
    let (platform, bridge) = setup();
    platform.put_file("save.dat", b"content".to_vec());
    platform.set_fail_file_read(true);

    let (read, outcomes) = recorder::<String>();
    bridge.read_text_from_file("save.dat", read).unwrap();
    assert!(matches!(
        settle(&bridge, &outcomes),
        Err(BridgeError::SynchronousRejection { operation: "read_text_from_file", .. })
    ));
}

#[test]
fn test_empty_file_reads_as_empty_text() {
    let (platform, bridge) = setup();
    platform.put_file("empty.txt", Vec::new());

    let (read, outcomes) = recorder::<String>();
    bridge.read_text_from_file("empty.txt", read).unwrap();
    assert_eq!(settle(&bridge, &outcomes).unwrap(), "");
}

#[test]
fn test_delete_file() {
    let (platform, bridge) = setup();
    platform.put_file("old.txt", b"bye".to_vec());

    let (deleted, outcomes) = recorder::<()>();
    bridge.delete_file("old.txt", deleted).unwrap();
    assert!(settle(&bridge, &outcomes).is_ok());
    assert!(platform.file("old.txt").is_none());

    let (again, again_outcomes) = recorder::<()>();
    bridge.delete_file("old.txt", again).unwrap();
    assert!(settle(&bridge, &again_outcomes)
        .unwrap_err()
        .to_string()
        .contains("doesn't exist"));
}

#[test]
fn test_save_files_to_cloud_uses_file_names() {
    let (platform, bridge) = setup();
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("slot1.sav");
    let second = dir.path().join("slot2.sav");
    fs::write(&first, b"one").unwrap();
    fs::write(&second, b"two").unwrap();

    let (saved, outcomes) = recorder::<()>();
    bridge.save_files_to_cloud(vec![first, second], saved).unwrap();
    assert!(settle(&bridge, &outcomes).is_ok());
    assert_eq!(platform.file("slot1.sav").unwrap(), b"one");
    assert_eq!(platform.file("slot2.sav").unwrap(), b"two");
}

#[test]
fn test_save_files_to_cloud_uploads_nothing_on_read_failure() {
    let (platform, bridge) = setup();
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("present.sav");
    fs::write(&present, b"data").unwrap();

    let (saved, outcomes) = recorder::<()>();
    bridge
        .save_files_to_cloud(vec![present, dir.path().join("missing.sav")], saved)
        .unwrap();
    let err = settle(&bridge, &outcomes).unwrap_err();
    assert!(matches!(err, BridgeError::Io { operation: "save_files_to_cloud", .. }));
    assert!(err.to_string().contains("missing.sav"));
    assert!(platform.file("present.sav").is_none());
}

#[test]
fn test_cloud_quota() {
    let (platform, bridge) = setup();
    platform.set_quota_total(Some(1_000));
    platform.put_file("a", vec![0u8; 250]);

    let (quota, outcomes) = recorder::<CloudQuota>();
    bridge.get_cloud_quota(quota).unwrap();
    assert_eq!(
        settle(&bridge, &outcomes).unwrap(),
        CloudQuota {
            total_bytes: 1_000,
            available_bytes: 750
        }
    );

    platform.set_quota_total(None);
    let (quota, outcomes) = recorder::<CloudQuota>();
    bridge.get_cloud_quota(quota).unwrap();
    assert!(settle(&bridge, &outcomes).is_err());
}

// ============================================================================
// ACHIEVEMENTS
// ============================================================================

#[test]
fn test_achievement_lifecycle() {
    let (platform, bridge) = setup();
    platform.define_achievement("FIRST_BLOOD");

    let (activated, outcomes) = recorder::<()>();
    bridge.activate_achievement("FIRST_BLOOD", activated).unwrap();
    assert!(settle(&bridge, &outcomes).is_ok());
    assert_eq!(platform.achievement("FIRST_BLOOD"), Some(true));

    let (query, outcomes) = recorder::<bool>();
    bridge.get_achievement("FIRST_BLOOD", query).unwrap();
    assert!(settle(&bridge, &outcomes).unwrap());

    let (cleared, outcomes) = recorder::<()>();
    bridge.clear_achievement("FIRST_BLOOD", cleared).unwrap();
    assert!(settle(&bridge, &outcomes).is_ok());
    assert_eq!(platform.achievement("FIRST_BLOOD"), Some(false));
}

#[test]
fn test_unknown_achievement_is_rejected() {
    let (_platform, bridge) = setup();
    let (query, outcomes) = recorder::<bool>();
    bridge.get_achievement("NOPE", query).unwrap();
    assert!(settle(&bridge, &outcomes)
        .unwrap_err()
        .to_string()
        .contains("achievement name is not valid"));
}

#[test]
fn test_activate_reports_store_failure() {
    let (platform, bridge) = setup();
    platform.define_achievement("WIN");
    platform.set_fail_store_stats(true);

    let (activated, outcomes) = recorder::<()>();
    bridge.activate_achievement("WIN", activated).unwrap();
    assert!(settle(&bridge, &outcomes)
        .unwrap_err()
        .to_string()
        .contains("storing user achievement"));
}

// ============================================================================
// SESSION
// ============================================================================

#[test]
fn test_number_of_players() {
    let (platform, bridge) = setup();
    platform.set_players(Some(31_337));

    let (count, outcomes) = recorder::<i32>();
    bridge.get_number_of_players(count).unwrap();
    assert_eq!(settle(&bridge, &outcomes).unwrap(), 31_337);
}

#[test]
fn test_number_of_players_failures_are_distinct() {
    let (platform, bridge) = setup();
    platform.set_players_io_failure(true);
    let (count, outcomes) = recorder::<i32>();
    bridge.get_number_of_players(count).unwrap();
    let io = settle(&bridge, &outcomes).unwrap_err();
    assert!(matches!(io, BridgeError::Io { .. }));

    platform.set_players_io_failure(false);
    platform.set_players(None);
    let (count, outcomes) = recorder::<i32>();
    bridge.get_number_of_players(count).unwrap();
    let unsuccessful = settle(&bridge, &outcomes).unwrap_err();
    assert!(matches!(unsuccessful, BridgeError::ResultFetch { .. }));
}

#[test]
fn test_auth_session_ticket_is_trimmed_and_correlated() {
    let (platform, bridge) = setup();
    platform.set_auth_ticket(vec![0xAB; 240]);

    let (ticket, outcomes) = recorder::<AuthTicket>();
    bridge.get_auth_session_ticket(ticket).unwrap();
    let ticket = settle(&bridge, &outcomes).unwrap();
    assert_eq!(ticket.ticket, vec![0xAB; 240]);
    assert_eq!(ticket.handle.0, 1);
}

#[test]
fn test_auth_session_ticket_failure() {
    let (platform, bridge) = setup();
    platform.set_auth_result(ResultCode::FAIL);
    let (ticket, outcomes) = recorder::<AuthTicket>();
    bridge.get_auth_session_ticket(ticket).unwrap();
    assert!(matches!(
        settle(&bridge, &outcomes),
        Err(BridgeError::PlatformResult { code: ResultCode::FAIL, .. })
    ));

    platform.set_reject_auth_ticket(true);
    let (ticket, outcomes) = recorder::<AuthTicket>();
    bridge.get_auth_session_ticket(ticket).unwrap();
    assert!(matches!(
        settle(&bridge, &outcomes),
        Err(BridgeError::SynchronousRejection { .. })
    ));
}

#[test]
fn test_encrypted_app_ticket() {
    let (platform, bridge) = setup();
    platform.set_app_ticket(b"sealed".to_vec());

    let (ticket, outcomes) = recorder::<Vec<u8>>();
    bridge.get_encrypted_app_ticket("player-42", ticket).unwrap();
    assert_eq!(settle(&bridge, &outcomes).unwrap(), b"sealed");
    assert_eq!(platform.app_ticket_user_data().unwrap(), b"player-42");

    platform.set_app_ticket_outcome(ResultCode::LIMIT_EXCEEDED, false);
    let (ticket, outcomes) = recorder::<Vec<u8>>();
    bridge.get_encrypted_app_ticket("player-42", ticket).unwrap();
    assert!(settle(&bridge, &outcomes)
        .unwrap_err()
        .to_string()
        .contains("result code 25"));

    platform.set_app_ticket_outcome(ResultCode::OK, true);
    let (ticket, outcomes) = recorder::<Vec<u8>>();
    bridge.get_encrypted_app_ticket("player-42", ticket).unwrap();
    assert!(matches!(settle(&bridge, &outcomes), Err(BridgeError::Io { .. })));
}

// ============================================================================
// ARCHIVES
// ============================================================================

#[test]
fn test_archive_without_tool_fails_with_io() {
    let (_platform, bridge) = setup();
    let (created, outcomes) = recorder::<()>();
    bridge.create_archive("out.zip", "saves", "", 5, created).unwrap();
    assert!(matches!(
        settle(&bridge, &outcomes),
        Err(BridgeError::Io { operation: "create_archive", .. })
    ));
}

#[test]
fn test_archive_passes_password_only_when_set() {
    let archiver = Arc::new(FakeArchiver::default());
    let bridge = Bridge::builder(Arc::new(InMemoryPlatform::new()))
        .with_archive_tool(archiver.clone())
        .build()
        .unwrap();

    let (created, outcomes) = recorder::<()>();
    bridge.create_archive("out.zip", "saves", "", 9, created).unwrap();
    assert!(settle(&bridge, &outcomes).is_ok());

    let (extracted, outcomes) = recorder::<()>();
    bridge.extract_archive("out.zip", "restore", "secret", extracted).unwrap();
    assert!(settle(&bridge, &outcomes).is_ok());

    let calls = archiver.calls.lock();
    assert_eq!(calls[0].0, "compress");
    assert_eq!(calls[0].3, None);
    assert_eq!(calls[1].0, "decompress");
    assert_eq!(calls[1].2, PathBuf::from("restore"));
    assert_eq!(calls[1].3.as_deref(), Some("secret"));
}

#[test]
fn test_archive_tool_failure_is_reported() {
    let archiver = Arc::new(FakeArchiver {
        fail: true,
        ..FakeArchiver::default()
    });
    let bridge = Bridge::builder(Arc::new(InMemoryPlatform::new()))
        .with_archive_tool(archiver)
        .build()
        .unwrap();

    let (created, outcomes) = recorder::<()>();
    bridge.create_archive("out.zip", "saves", "", 1, created).unwrap();
    let err = settle(&bridge, &outcomes).unwrap_err();
    assert!(err.to_string().contains("disk full"));
}

#[test]
fn test_invalid_config_is_refused_by_builder() {
    let err = Bridge::builder(Arc::new(InMemoryPlatform::new()))
        .with_config(BridgeConfig::default().with_thread_stack_size(1024))
        .build()
        .unwrap_err();
    assert!(matches!(err, BridgeError::InvalidConfig(_)));
}
