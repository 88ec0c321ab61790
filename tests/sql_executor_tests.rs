use async_trait::async_trait;
use iot_admin::AdminError;
use iot_admin::db::orchestrator::create_schema_objects;
use iot_admin::db::{DefinitionCategory, ExecutionMode, SqlFileExecutor, SqlSink};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Records every batch it is handed; batches containing `fail_marker` fail.
#[derive(Default)]
struct RecordingSink {
    executed: Vec<String>,
    fail_marker: Option<&'static str>,
}

#[async_trait]
impl SqlSink for RecordingSink {
    async fn exec(&mut self, sql: &str) -> Result<u64, sqlx::Error> {
        if self.fail_marker.is_some_and(|m| sql.contains(m)) {
            return Err(sqlx::Error::Protocol(format!("rejected: {sql}")));
        }
        self.executed.push(sql.to_string());
        Ok(0)
    }
}

fn repo_sql_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("sql")
}

fn temp_sql_root(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();
    let root = std::env::temp_dir().join(format!(
        "iot-admin-sql-{tag}-{}-{nanos}",
        std::process::id()
    ));
    std::fs::create_dir_all(root.join("procedures")).expect("create sql root");
    root
}

#[test]
fn mysql_connection_is_a_sql_sink() {
    fn assert_sink<S: SqlSink + ?Sized>() {}
    assert_sink::<sqlx::mysql::MySqlConnection>();
}

#[tokio::test]
async fn placeholder_is_substituted_in_the_database_file() {
    let executor = SqlFileExecutor::new(repo_sql_root(), "plant_floor");
    let mut sink = RecordingSink::default();

    let report = executor
        .execute(&mut sink, "create_database.sql")
        .await
        .expect("execute database file");

    assert_eq!(report.mode, ExecutionMode::Plain);
    assert_eq!(sink.executed.len(), 1);
    assert!(sink.executed[0].contains("`plant_floor`"));
    assert!(!sink.executed[0].contains("{{DB_NAME}}"));
}

#[tokio::test]
async fn delimiter_block_files_run_statement_by_statement() {
    let root = temp_sql_root("routines");
    std::fs::write(
        root.join("procedures/two.sql"),
        "DELIMITER $$\n\
         DROP PROCEDURE IF EXISTS sp_a$$\n\
         CREATE PROCEDURE sp_a() BEGIN SELECT 1; SELECT 2; END$$\n\
         DROP PROCEDURE IF EXISTS sp_b$$\n\
         CREATE PROCEDURE sp_b() BEGIN SELECT 'x;y'; END$$\n\
         DELIMITER ;\n",
    )
    .expect("write procedure file");

    let executor = SqlFileExecutor::new(&root, "iot");
    let mut sink = RecordingSink::default();
    let report = executor
        .execute(&mut sink, "procedures/two.sql")
        .await
        .expect("execute");

    assert_eq!(report.mode, ExecutionMode::DelimiterBlock);
    assert_eq!(report.statements_executed, 4);
    assert!(report.is_clean());
    assert_eq!(sink.executed.len(), 4);
    assert!(sink.executed[1].ends_with("SELECT 1; SELECT 2; END"));
    assert!(sink.executed[3].contains("'x;y'"));
}

#[tokio::test]
async fn failing_statement_in_delimiter_mode_is_a_warning() {
    let root = temp_sql_root("warning");
    std::fs::write(
        root.join("procedures/dup.sql"),
        "DELIMITER $$\nCREATE PROCEDURE sp_dup() BEGIN END$$\nCREATE PROCEDURE sp_ok() BEGIN END$$\nDELIMITER ;\n",
    )
    .expect("write file");

    let executor = SqlFileExecutor::new(&root, "iot");
    let mut sink = RecordingSink {
        fail_marker: Some("sp_dup"),
        ..Default::default()
    };
    let report = executor
        .execute(&mut sink, "procedures/dup.sql")
        .await
        .expect("warnings do not fail the file");

    assert_eq!(report.statements_executed, 1);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].index, 1);
    assert!(report.warnings[0].message.contains("rejected"));
}

#[tokio::test]
async fn failing_plain_file_is_an_error() {
    let executor = SqlFileExecutor::new(repo_sql_root(), "iot");
    let mut sink = RecordingSink {
        fail_marker: Some("CREATE TABLE"),
        ..Default::default()
    };
    let err = executor
        .execute(&mut sink, "tables/users.sql")
        .await
        .expect_err("plain failure propagates");
    assert!(matches!(err, AdminError::Database(_)), "{err:?}");
}

#[tokio::test]
async fn commented_out_delimiter_keeps_plain_mode() {
    let root = temp_sql_root("commented");
    std::fs::create_dir_all(root.join("tables")).expect("create tables dir");
    std::fs::write(
        root.join("tables/commented.sql"),
        "/*\nDELIMITER $$\n*/\n-- DELIMITER //\n\
         CREATE TABLE bad (id INT);\n\
         CREATE TABLE ok (id INT);\n",
    )
    .expect("write definition");

    let executor = SqlFileExecutor::new(&root, "iot");
    let mut sink = RecordingSink {
        fail_marker: Some("bad"),
        ..Default::default()
    };
    let err = executor
        .execute(&mut sink, "tables/commented.sql")
        .await
        .expect_err("whole file fails as one batch");
    assert!(matches!(err, AdminError::Database(_)), "{err:?}");
    assert!(sink.executed.is_empty(), "{:?}", sink.executed);
}

#[tokio::test]
async fn missing_definition_file_is_reported() {
    let executor = SqlFileExecutor::new(repo_sql_root(), "iot");
    let mut sink = RecordingSink::default();
    let err = executor
        .execute(&mut sink, "tables/nope.sql")
        .await
        .expect_err("missing file");
    assert!(matches!(err, AdminError::FileNotFound(_)), "{err:?}");
    assert!(sink.executed.is_empty());
}

#[tokio::test]
async fn schema_objects_are_created_in_dependency_order() {
    let executor = SqlFileExecutor::new(repo_sql_root(), "iot");
    let mut sink = RecordingSink::default();

    let reports = create_schema_objects(&executor, &mut sink)
        .await
        .expect("create schema objects");

    let tables = DefinitionCategory::Table.files();
    for (batch, table) in sink.executed.iter().zip(tables) {
        assert!(
            batch.contains(&format!("CREATE TABLE IF NOT EXISTS {table} ")),
            "expected {table} next, got: {batch}"
        );
    }

    let position = |needle: &str| {
        sink.executed
            .iter()
            .position(|s| s.contains(needle))
            .unwrap_or_else(|| panic!("`{needle}` was never executed"))
    };
    assert!(position("VIEW v_device_overview") > position("TABLE IF NOT EXISTS device_logs"));
    assert!(position("FUNCTION fn_device_health_score(") > position("VIEW v_device_log_summary"));
    assert!(position("PROCEDURE sp_device_report(") > position("FUNCTION fn_days_since_deployment("));
    assert!(position("INDEX idx_device_logs_device_time") > position("PROCEDURE sp_location_summary("));
    assert!(position("TRIGGER trg_devices_audit") > position("INDEX idx_deployments_active"));

    assert!(reports.iter().all(|r| r.is_clean()));
    let file_count = [
        DefinitionCategory::Table,
        DefinitionCategory::View,
        DefinitionCategory::Function,
        DefinitionCategory::Procedure,
        DefinitionCategory::Index,
        DefinitionCategory::Trigger,
    ]
    .iter()
    .map(|c| c.files().len())
    .sum::<usize>();
    assert_eq!(reports.len(), file_count);
}

#[tokio::test]
async fn every_catalogued_definition_exists_on_disk() {
    let executor = SqlFileExecutor::new(repo_sql_root(), "iot");
    for category in [
        DefinitionCategory::Table,
        DefinitionCategory::View,
        DefinitionCategory::Function,
        DefinitionCategory::Procedure,
        DefinitionCategory::Index,
        DefinitionCategory::Trigger,
        DefinitionCategory::DemoData,
    ] {
        for name in category.files() {
            let path = category.relative_path(name).expect("known name");
            let text = executor
                .read_definition(&path)
                .await
                .unwrap_or_else(|e| panic!("{path}: {e}"));
            assert!(!text.trim().is_empty(), "{path} is empty");
        }
    }
}
