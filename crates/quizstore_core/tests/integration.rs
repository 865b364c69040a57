//! End-to-end tests of the public store contract.

use chrono::{Duration, TimeZone, Utc};
use quizstore_core::{BackupOptions, HealthStatus, MigrationCheck, QuizStore, StoreConfig};
use quizstore_storage::{
    BackendKind, Collection, DirStructuredHost, FileFlatHost, FlatConfig, FlatHost,
    MemoryFlatHost, MemoryStructuredHost, StorageError, StructuredHost,
};
use serde_json::json;
use std::sync::Arc;

fn structured_store(
    flat: Arc<MemoryFlatHost>,
    structured: Arc<MemoryStructuredHost>,
) -> QuizStore {
    QuizStore::new(flat, Some(structured), StoreConfig::default())
}

async fn fresh_store() -> QuizStore {
    let store = structured_store(
        Arc::new(MemoryFlatHost::new()),
        Arc::new(MemoryStructuredHost::new()),
    );
    store.init().await.unwrap();
    store
}

#[tokio::test]
async fn backup_and_restore_scenario() {
    let store = fresh_store().await;

    store
        .set(Collection::QuizData, "main", json!({"a": 1}))
        .await
        .unwrap();
    assert_eq!(
        store.get(Collection::QuizData, "main").await.unwrap(),
        Some(json!({"a": 1}))
    );

    store.create_backup(Some("snap1")).await.unwrap();
    let backups = store.list_backups().await;
    assert_eq!(backups.len(), 1);
    assert_eq!(backups[0].name, "snap1");

    store
        .set(Collection::QuizData, "main", json!({"a": 2}))
        .await
        .unwrap();
    store.restore_backup("snap1").await.unwrap();
    assert_eq!(
        store.get(Collection::QuizData, "main").await.unwrap(),
        Some(json!({"a": 1}))
    );
}

#[tokio::test]
async fn restore_is_byte_identical() {
    let store = fresh_store().await;
    let quiz = json!({"questions": [{"q": "Who painted it?", "options": ["A", "B"]}]});
    let progress = json!({"answered": {"1": true}, "score": 7});
    store
        .set(Collection::QuizData, "main", quiz.clone())
        .await
        .unwrap();
    store
        .set(Collection::UserProgress, "main", progress.clone())
        .await
        .unwrap();
    let before = serde_json::to_vec(&(
        store.get(Collection::QuizData, "main").await.unwrap(),
        store.get(Collection::UserProgress, "main").await.unwrap(),
    ))
    .unwrap();

    let id = store.create_backup(None).await.unwrap();
    assert!(id.starts_with("backup_"));

    store
        .set(Collection::QuizData, "main", json!([]))
        .await
        .unwrap();
    store.remove(Collection::UserProgress, "main").await.unwrap();
    store.restore_backup(&id).await.unwrap();

    let after = serde_json::to_vec(&(
        store.get(Collection::QuizData, "main").await.unwrap(),
        store.get(Collection::UserProgress, "main").await.unwrap(),
    ))
    .unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn fallback_is_invisible_except_for_health() {
    let structured = Arc::new(MemoryStructuredHost::new());
    structured.set_fail_open(true);
    let store = structured_store(Arc::new(MemoryFlatHost::new()), structured);
    store.init().await.unwrap();

    assert_eq!(store.backend_kind(), Some(BackendKind::Flat));
    store
        .set(Collection::QuizData, "main", json!({"a": 1}))
        .await
        .unwrap();
    store
        .set(Collection::Settings, "appSettings", json!({"lang": "zh"}))
        .await
        .unwrap();
    assert_eq!(
        store.get(Collection::QuizData, "main").await.unwrap(),
        Some(json!({"a": 1}))
    );
    assert_eq!(store.list_all(Collection::Settings).await.unwrap().len(), 1);

    store.create_backup(Some("flat-snap")).await.unwrap();
    assert_eq!(store.list_backups().await[0].id, "flat-snap");

    assert_eq!(store.health_status().await.status, HealthStatus::Limited);
}

#[tokio::test]
async fn unavailable_structured_host_falls_back() {
    let store = QuizStore::new(
        Arc::new(MemoryFlatHost::new()),
        Some(Arc::new(MemoryStructuredHost::unavailable())),
        StoreConfig::default(),
    );
    store.init().await.unwrap();
    assert_eq!(store.backend_kind(), Some(BackendKind::Flat));
    assert!(store.fallback_reason().unwrap().contains("unsupported"));
}

#[tokio::test]
async fn migration_runs_once_across_restarts() {
    let flat = Arc::new(MemoryFlatHost::with_items([
        ("artQuizData", r#"{"bank":"v1"}"#),
        ("artQuizData_userProgress", r#"{"seen":1}"#),
    ]));
    let structured = Arc::new(MemoryStructuredHost::new());

    let first = structured_store(flat.clone(), structured.clone());
    first.init().await.unwrap();
    first.init().await.unwrap();
    assert_eq!(
        first.migration_report().unwrap().outcome,
        MigrationCheck::NeedsMigration
    );
    assert_eq!(
        first.get(Collection::QuizData, "main").await.unwrap(),
        Some(json!({"bank": "v1"}))
    );
    first
        .set(Collection::QuizData, "main", json!({"bank": "v2"}))
        .await
        .unwrap();

    // legacy data is still present, but must not be imported again
    let second = structured_store(flat.clone(), structured);
    second.init().await.unwrap();
    assert_eq!(
        second.migration_report().unwrap().outcome,
        MigrationCheck::AlreadyMigrated
    );
    assert_eq!(
        second.get(Collection::QuizData, "main").await.unwrap(),
        Some(json!({"bank": "v2"}))
    );
    assert_eq!(
        flat.get_item("artQuizData_migrated_to_idb").unwrap().as_deref(),
        Some("true")
    );
}

#[tokio::test]
async fn legacy_data_is_readable_on_flat_storage() {
    let flat = Arc::new(MemoryFlatHost::with_items([(
        "artQuizData",
        r#"{"bank":"old"}"#,
    )]));
    let store = QuizStore::new(flat, None, StoreConfig::default());
    store.init().await.unwrap();

    assert!(store.migration_report().is_none());
    assert_eq!(
        store.get(Collection::QuizData, "main").await.unwrap(),
        Some(json!({"bank": "old"}))
    );
    let records = store.list_all(Collection::QuizData).await.unwrap();
    assert!(records[0].is_legacy());
}

#[tokio::test]
async fn retention_keeps_most_recent() {
    let store = fresh_store().await;
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    for i in 0..7 {
        store
            .create_backup_with(
                BackupOptions::new()
                    .name(format!("snap{i}"))
                    .created_at(base + Duration::days(i)),
            )
            .await
            .unwrap();
    }

    assert_eq!(store.cleanup_backups(3).await.unwrap(), 4);
    let remaining: Vec<_> = store
        .list_backups()
        .await
        .into_iter()
        .map(|b| b.id)
        .collect();
    assert_eq!(remaining, vec!["snap6", "snap5", "snap4"]);
}

#[tokio::test]
async fn remove_reports_true_once() {
    let store = fresh_store().await;
    store
        .set(Collection::Settings, "appSettings", json!({}))
        .await
        .unwrap();
    assert!(store.remove(Collection::Settings, "appSettings").await.unwrap());
    assert!(!store.remove(Collection::Settings, "appSettings").await.unwrap());
    assert_eq!(
        store.get(Collection::Settings, "appSettings").await.unwrap(),
        None
    );
}

#[tokio::test]
async fn operations_before_init_fail() {
    let store = QuizStore::new(Arc::new(MemoryFlatHost::new()), None, StoreConfig::default());
    assert!(!store.is_initialized());
    assert!(matches!(
        store.get(Collection::QuizData, "main").await,
        Err(StorageError::NotInitialized)
    ));
    assert!(store.list_backups().await.is_empty());
    assert!(matches!(
        store.capacity_snapshot().await,
        Err(StorageError::NotInitialized)
    ));
    assert_eq!(store.health_status().await.status, HealthStatus::Error);
}

#[tokio::test]
async fn quota_errors_surface_to_caller() {
    let structured = Arc::new(MemoryStructuredHost::new());
    let store = structured_store(Arc::new(MemoryFlatHost::new()), structured.clone());
    store.init().await.unwrap();
    structured.set_quota(Some(256));

    let err = store
        .set(Collection::QuizData, "main", json!("x".repeat(1024)))
        .await
        .unwrap_err();
    assert!(err.is_quota_exceeded());
    assert_eq!(store.stats().quota_rejections, 1);
}

#[tokio::test]
async fn oversized_flat_writes_are_refused() {
    let config = StoreConfig::default().flat(FlatConfig::default().write_limit(64));
    let flat = Arc::new(MemoryFlatHost::new());
    let store = QuizStore::new(flat.clone(), None, config);
    store.init().await.unwrap();

    let err = store
        .set(Collection::QuizData, "main", json!("y".repeat(100)))
        .await
        .unwrap_err();
    assert!(err.is_quota_exceeded());
    assert!(flat.is_empty());
}

#[tokio::test]
async fn export_bundles_canonical_records() {
    let store = fresh_store().await;
    store
        .set(Collection::QuizData, "main", json!({"a": 1}))
        .await
        .unwrap();
    store
        .set(Collection::Settings, "appSettings", json!({"sound": false}))
        .await
        .unwrap();

    let bundle = store.export_all().await.unwrap();
    assert_eq!(bundle.storage_type, BackendKind::Structured);
    assert_eq!(bundle.data.quiz_data, json!({"a": 1}));
    assert!(bundle.data.user_progress.is_null());
    assert_eq!(bundle.data.settings, json!({"sound": false}));
}

#[tokio::test]
async fn hard_reset_clears_everything() {
    let flat = Arc::new(MemoryFlatHost::with_items([("artQuizData", "[1]")]));
    let structured = Arc::new(MemoryStructuredHost::new());
    let store = structured_store(flat.clone(), structured.clone());
    store.init().await.unwrap();
    store.create_backup(Some("b")).await.unwrap();
    store
        .auto_backup(Utc.with_ymd_and_hms(2024, 2, 2, 0, 0, 0).unwrap())
        .await
        .unwrap();

    store.hard_reset().await.unwrap();

    for collection in Collection::ALL {
        assert!(store.list_all(collection).await.unwrap().is_empty());
    }
    assert!(flat.is_empty());
}

#[tokio::test]
async fn hard_reset_removes_undecodable_records() {
    let flat = Arc::new(MemoryFlatHost::new());
    let structured = Arc::new(MemoryStructuredHost::new());
    let store = structured_store(flat, structured.clone());
    store.init().await.unwrap();
    structured
        .put("settings", "bad", b"garbage".to_vec())
        .await
        .unwrap();
    assert!(store.list_all(Collection::Settings).await.unwrap().is_empty());

    store.hard_reset().await.unwrap();

    assert!(structured.get_all("settings").await.unwrap().is_empty());
}

#[tokio::test]
async fn flat_hard_reset_removes_undecodable_records() {
    let flat = Arc::new(MemoryFlatHost::with_items([
        ("settings_bad", "garbage"),
        ("sidebarWidth", "320"),
    ]));
    let store = QuizStore::new(flat.clone(), None, StoreConfig::default());
    store.init().await.unwrap();

    store.hard_reset().await.unwrap();

    assert_eq!(flat.get_item("settings_bad").unwrap(), None);
    assert_eq!(flat.get_item("sidebarWidth").unwrap().as_deref(), Some("320"));
}

#[tokio::test]
async fn on_disk_installation_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let flat_path = dir.path().join("flat.json");
    let structured_root = dir.path().join("structured");

    {
        let flat: Arc<dyn FlatHost> = Arc::new(FileFlatHost::open(&flat_path).unwrap());
        let structured: Arc<dyn StructuredHost> =
            Arc::new(DirStructuredHost::new(&structured_root));
        let store = QuizStore::new(flat, Some(structured), StoreConfig::default());
        store.init().await.unwrap();
        store
            .set(Collection::QuizData, "main", json!({"persisted": true}))
            .await
            .unwrap();
        store.create_backup(Some("disk")).await.unwrap();
    }

    let flat: Arc<dyn FlatHost> = Arc::new(FileFlatHost::open(&flat_path).unwrap());
    let structured: Arc<dyn StructuredHost> = Arc::new(DirStructuredHost::new(&structured_root));
    let store = QuizStore::new(flat, Some(structured), StoreConfig::default());
    store.init().await.unwrap();

    assert_eq!(store.backend_kind(), Some(BackendKind::Structured));
    assert_eq!(
        store.get(Collection::QuizData, "main").await.unwrap(),
        Some(json!({"persisted": true}))
    );
    assert_eq!(store.list_backups().await.len(), 1);
}
