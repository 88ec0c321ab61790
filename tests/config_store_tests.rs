use iot_admin::AdminError;
use iot_admin::config::{ConfigStore, ConnectionConfig, ConnectionPatch};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_record_path(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    std::env::temp_dir()
        .join(format!("iot-admin-{tag}-{}-{nanos}", std::process::id()))
        .join("database.json")
}

#[test]
fn missing_record_is_created_with_defaults() {
    let path = temp_record_path("defaults");
    let store = ConfigStore::new(&path);

    let cfg = store.load().expect("load defaults");
    assert_eq!(cfg, ConnectionConfig::default());
    assert!(path.is_file(), "defaults should be written to disk");

    let again = store.load().expect("reload");
    assert_eq!(again, cfg);
}

#[test]
fn update_merges_partial_values_and_persists() {
    let store = ConfigStore::new(temp_record_path("update"));
    store.load().expect("seed defaults");

    let updated = store
        .update(ConnectionPatch {
            host: Some("db.internal".to_string()),
            port: Some(3307),
            password: Some("s3cret".to_string()),
            ..Default::default()
        })
        .expect("valid update");
    assert_eq!(updated.host, "db.internal");
    assert_eq!(updated.port, 3307);
    assert_eq!(updated.username, "root", "untouched fields keep their value");

    let reloaded = store.load().expect("reload");
    assert_eq!(reloaded, updated);
    assert_eq!(reloaded.masked().password, "********");
}

#[test]
fn resubmitting_a_masked_record_keeps_the_password() {
    let store = ConfigStore::new(temp_record_path("masked"));
    store.load().expect("seed defaults");
    store
        .update(ConnectionPatch {
            password: Some("hunter2".to_string()),
            ..Default::default()
        })
        .expect("set password");

    let shown = store.load().expect("reload").masked();
    assert_eq!(shown.password, "********");
    store
        .update(ConnectionPatch::from(shown))
        .expect("resubmit masked record");

    assert_eq!(store.load().expect("reload").password, "hunter2");
}

#[test]
fn invalid_update_reports_every_violation_and_writes_nothing() {
    let store = ConfigStore::new(temp_record_path("invalid"));
    let before = store.load().expect("seed defaults");

    let err = store
        .update(ConnectionPatch {
            host: Some(String::new()),
            port: Some(70000),
            db_name: Some("bad name;".to_string()),
            ..Default::default()
        })
        .expect_err("update must be rejected");

    match err {
        AdminError::Validation(violations) => {
            assert_eq!(violations.len(), 3, "{violations:?}");
            assert!(violations.iter().any(|v| v.contains("70000")));
        }
        other => panic!("expected a validation error, got {other:?}"),
    }
    assert_eq!(store.load().expect("reload"), before);
}

#[test]
fn broken_or_unsupported_records_are_config_errors() {
    let path = temp_record_path("broken");
    std::fs::create_dir_all(path.parent().expect("parent")).expect("create dir");

    std::fs::write(&path, "{ not json").expect("write");
    let err = ConfigStore::new(&path).load().expect_err("broken json");
    assert!(matches!(err, AdminError::Config(_)), "{err:?}");

    let mut cfg = serde_json::to_value(ConnectionConfig::default()).expect("to value");
    cfg["version"] = serde_json::json!(99);
    std::fs::write(&path, cfg.to_string()).expect("write");
    let err = ConfigStore::new(&path).load().expect_err("unsupported version");
    assert!(matches!(err, AdminError::Config(_)), "{err:?}");
}
