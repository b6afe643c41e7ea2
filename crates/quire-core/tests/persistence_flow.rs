use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde_json::Value;

use quire_core::backup::{self, ImportKeys};
use quire_core::crypto::KdfParams;
use quire_core::rate_limit::ManualClock;
use quire_core::records::SqliteRecordBackend;
use quire_core::{CoreOptions, Note, QuireError, StorageContext};

const PARAMS: KdfParams = KdfParams::insecure_for_tests();

fn options(clock: Arc<ManualClock>) -> CoreOptions {
    CoreOptions {
        kdf: PARAMS,
        clock,
        ..CoreOptions::default()
    }
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

#[tokio::test]
async fn test_three_wrong_then_correct_unlock() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));
    let ctx = StorageContext::open(dir.path(), options(clock)).await.unwrap();
    let session = ctx.session().await.unwrap();

    session.initialize(&secret("correct-horse")).await.unwrap();
    session.lock().await;

    let mut remaining = Vec::new();
    for _ in 0..3 {
        match session.unlock(&secret("wrong-horse")).await {
            Err(QuireError::IncorrectPassphrase { attempts_remaining }) => {
                remaining.push(attempts_remaining)
            }
            other => panic!("unexpected unlock result: {:?}", other),
        }
    }
    assert_eq!(remaining, vec![4, 3, 2]);

    session.unlock(&secret("correct-horse")).await.unwrap();
    assert!(session.is_unlocked().await);
    assert_eq!(session.rate_limiter().failed_attempts().await.unwrap(), 0);
}

#[tokio::test]
async fn test_lockout_survives_restart_and_expires() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(1_700_000_000_000));

    {
        let ctx = StorageContext::open(dir.path(), options(clock.clone()))
            .await
            .unwrap();
        let session = ctx.session().await.unwrap();
        session.initialize(&secret("correct-horse")).await.unwrap();
        session.lock().await;
        for _ in 0..5 {
            let _ = session.unlock(&secret("wrong-horse")).await;
        }
        ctx.shutdown().await;
    }

    let ctx = StorageContext::open(dir.path(), options(clock.clone()))
        .await
        .unwrap();
    let session = ctx.session().await.unwrap();
    let status = session.rate_limiter().check_lockout().await.unwrap();
    assert!(status.locked);
    assert_eq!(status.minutes_left, 15);
    assert!(matches!(
        session.unlock(&secret("correct-horse")).await,
        Err(QuireError::LockedOut { .. })
    ));

    clock.advance(Duration::from_secs(15 * 60));
    session.unlock(&secret("correct-horse")).await.unwrap();
    assert!(!session.rate_limiter().check_lockout().await.unwrap().locked);
}

#[tokio::test]
async fn test_notes_round_trip_across_restart() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let note = Note::new("Travel", "passport in the drawer").with_tags(&["Trips"]);

    {
        let ctx = StorageContext::open(dir.path(), options(clock.clone()))
            .await
            .unwrap();
        let session = ctx.session().await.unwrap();
        session.initialize(&secret("correct-horse")).await.unwrap();
        let master = session.require_master_key().await.unwrap();
        let records = ctx.records().await.unwrap();
        records.save(&note, Some(&master)).await.unwrap();
        ctx.shutdown().await;
    }

    let raw = std::fs::read(dir.path().join("notes.db")).unwrap();
    let raw = String::from_utf8_lossy(&raw);
    assert!(!raw.contains("passport"));
    assert!(!raw.contains("Travel"));

    let ctx = StorageContext::open(dir.path(), options(clock)).await.unwrap();
    let session = ctx.session().await.unwrap();
    let records = ctx.records().await.unwrap();

    assert!(matches!(
        records.load(&note.id, None).await,
        Err(QuireError::Locked)
    ));

    session.unlock(&secret("correct-horse")).await.unwrap();
    let master = session.require_master_key().await.unwrap();
    let loaded = records.load(&note.id, Some(&master)).await.unwrap();
    assert_eq!(loaded.content, "passport in the drawer");
    assert_eq!(records.search("trips").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_legacy_row_migrates_with_identical_fields() {
    let dir = tempfile::tempdir().unwrap();
    let legacy = r#"{"id":"legacy-1","title":"Recipes","content":"flour, water","tags":["kitchen"],"created":"2022-03-04T05:06:07Z","updated":"2022-03-05T05:06:07Z"}"#;
    {
        let backend = SqliteRecordBackend::open(&dir.path().join("notes.db"))
            .await
            .unwrap();
        backend.insert_legacy("legacy-1", legacy).await.unwrap();
    }

    let ctx = StorageContext::open(dir.path(), options(Arc::new(ManualClock::new(0))))
        .await
        .unwrap();
    let records = ctx.records().await.unwrap();
    let first = records.get_note_metadata("legacy-1").await.unwrap().unwrap();

    let backend = SqliteRecordBackend::open(&dir.path().join("notes.db"))
        .await
        .unwrap();
    let row = quire_core::records::RecordBackend::get(&backend, "legacy-1")
        .await
        .unwrap()
        .unwrap();
    assert!(row.encrypted);
    assert!(row.encrypted_data.is_some());
    assert!(row.legacy_json.is_none());

    let second = records.get_note_metadata("legacy-1").await.unwrap().unwrap();
    assert_eq!(second.title, first.title);
    assert_eq!(second.content, first.content);
    assert_eq!(second.tags, first.tags);
    assert_eq!(second.created, first.created);
    assert_eq!(second.updated, first.updated);
}

#[tokio::test]
async fn test_tampered_protected_backup_restores_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = StorageContext::open(dir.path(), options(Arc::new(ManualClock::new(0))))
        .await
        .unwrap();
    let device_key = ctx.device_key().await.unwrap().clone();
    let password = secret("export-password");
    let notes = vec![Note::new("A", "alpha"), Note::new("B", "beta")];

    let exported = backup::export_protected(&notes, &password, PARAMS)
        .await
        .unwrap();

    let mut document: Value = serde_json::from_str(&exported).unwrap();
    let ciphertext = document["encryptedData"]["ciphertext"]
        .as_str()
        .unwrap()
        .to_string();
    let mut chars: Vec<char> = ciphertext.chars().collect();
    chars[4] = if chars[4] == 'A' { 'B' } else { 'A' };
    document["encryptedData"]["ciphertext"] = Value::String(chars.into_iter().collect());
    let tampered = serde_json::to_string(&document).unwrap();

    let result = backup::import(
        &tampered,
        ImportKeys {
            device_key: &device_key,
            password: Some(&password),
            params: PARAMS,
        },
    )
    .await;
    assert!(matches!(result, Err(QuireError::InvalidBackup(_))));

    let restored = backup::import(
        &exported,
        ImportKeys {
            device_key: &device_key,
            password: Some(&password),
            params: PARAMS,
        },
    )
    .await
    .unwrap();
    assert_eq!(restored, notes);
}

#[tokio::test]
async fn test_delete_then_maintenance_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = StorageContext::open(dir.path(), options(Arc::new(ManualClock::new(0))))
        .await
        .unwrap();
    let records = ctx.records().await.unwrap();

    let keep = Note::new("keep", "x");
    let drop = Note::new("drop", "y");
    records.save(&keep, None).await.unwrap();
    records.save(&drop, None).await.unwrap();
    records.delete(&drop.id).await.unwrap();

    let listed: Vec<String> = records
        .list_notes()
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(listed, vec![keep.id.clone()]);

    let report = records.cleanup_and_migrate().await.unwrap();
    assert_eq!(report.migrated, 0);
    assert_eq!(report.cleaned, 0);
}
