use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use iot_admin::config::{ConfigStore, ConnectionConfig};
use iot_admin::server::{AdminState, admin_router};
use serde_json::Value;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

/// Router backed by a record that points at a port nothing listens on.
async fn unreachable_app(tag: &str) -> (Router, ConfigStore) {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let path = std::env::temp_dir()
        .join(format!("iot-admin-routes-{tag}-{}-{nanos}", std::process::id()))
        .join("database.json");

    let store = ConfigStore::new(&path);
    let cfg = ConnectionConfig {
        host: "127.0.0.1".to_string(),
        port: 1,
        password: "hunter2".to_string(),
        ..Default::default()
    };
    store.save(&cfg).expect("write connection record");

    let sql_root = Path::new(env!("CARGO_MANIFEST_DIR")).join("sql");
    let admin = iot_admin::db::spawn(store.clone(), sql_root)
        .await
        .expect("spawn admin actor");
    (admin_router(AdminState::new(admin)), store)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    let resp = app
        .clone()
        .oneshot(builder.body(body).expect("failed to build request"))
        .await
        .expect("request failed");

    let status = resp.status();
    assert!(resp.headers().contains_key("x-request-id"));
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).expect("every response is JSON");
    (status, json)
}

#[tokio::test]
async fn status_degrades_to_disconnected_snapshot() {
    let (app, _store) = unreachable_app("status").await;

    let (status, body) = send(&app, "GET", "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["connected"], false);
    assert_eq!(body["data"]["database_exists"], false);
    for list in ["tables", "views", "procedures", "functions", "triggers"] {
        assert_eq!(body["data"][list], serde_json::json!([]), "{list}");
    }
}

#[tokio::test]
async fn unknown_routes_use_the_uniform_body() {
    let (app, _store) = unreachable_app("fallback").await;

    let (status, body) = send(&app, "GET", "/api/nothing-here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert!(body["data"].is_null());
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
}

#[tokio::test]
async fn config_is_masked_and_updates_are_validated() {
    let (app, store) = unreachable_app("config").await;

    let (status, body) = send(&app, "GET", "/api/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["password"], "********");
    assert_eq!(body["data"]["port"], 1);

    let (status, body) = send(
        &app,
        "PUT",
        "/api/config",
        Some(r#"{"host":"","port":65536,"username":""}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    let violations = body["data"].as_array().expect("violations list");
    assert_eq!(violations.len(), 3, "{violations:?}");
    assert_eq!(store.load().expect("record untouched").port, 1);

    let (status, _) = send(&app, "PUT", "/api/config", Some("not-json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "PUT", "/api/config", Some(r#"{"port":2}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["port"], 2);
    assert_eq!(store.load().expect("reload").port, 2);
}

#[tokio::test]
async fn fetched_config_can_be_put_back_unchanged() {
    let (app, store) = unreachable_app("echo").await;

    let (_, fetched) = send(&app, "GET", "/api/config", None).await;
    let record = fetched["data"].to_string();
    let (status, body) = send(&app, "PUT", "/api/config", Some(&record)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["password"], "********");

    assert_eq!(store.load().expect("reload").password, "hunter2");
}

#[tokio::test]
async fn connection_test_reports_failure_without_erroring() {
    let (app, store) = unreachable_app("conn-test").await;

    let (status, body) = send(&app, "POST", "/api/config/test", Some("{}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["success"], false);

    let (status, body) = send(&app, "POST", "/api/config/test", Some(r#"{"port":0}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().is_some_and(|m| m.contains("port")));
    assert_eq!(store.load().expect("reload").port, 1, "test never persists");
}

#[tokio::test]
async fn bootstrap_steps_fail_with_a_report_when_unreachable() {
    let (app, _store) = unreachable_app("setup").await;

    let (status, body) = send(&app, "POST", "/api/setup/database", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["data"]["success"], false);
    assert!(!body["data"]["logs"].as_array().expect("logs").is_empty());

    let (status, body) = send(&app, "POST", "/api/setup/all", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["data"]["success"], false);
}

#[tokio::test]
async fn definitions_are_listed_and_read_from_disk() {
    let (app, _store) = unreachable_app("definitions").await;

    let (status, body) = send(&app, "GET", "/api/definitions/procedures", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["names"],
        serde_json::json!(["sp_device_report", "sp_resolve_log", "sp_location_summary"])
    );

    let (status, body) = send(&app, "GET", "/api/definitions/table/devices", None).await;
    assert_eq!(status, StatusCode::OK);
    let sql = body["data"]["sql"].as_str().expect("sql text");
    assert!(sql.contains("CREATE TABLE IF NOT EXISTS devices"));

    let (status, body) = send(&app, "GET", "/api/definitions/functions?bulk=true", None).await;
    assert_eq!(status, StatusCode::OK);
    let sql = body["data"]["sql"].as_str().expect("bulk text");
    assert!(sql.contains("-- FUNCTION: fn_device_health_score"));
    assert!(sql.contains("-- FUNCTION: fn_days_since_deployment"));

    let (status, _) = send(&app, "GET", "/api/definitions/tables?bulk=true", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/api/definitions/procedure/..%2Fsecrets", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/api/definitions/widgets", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn table_names_are_checked_before_touching_the_server() {
    let (app, _store) = unreachable_app("tables").await;

    let (status, body) = send(&app, "GET", "/api/tables/users%3Bdrop", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}
