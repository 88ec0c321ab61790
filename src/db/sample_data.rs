use crate::db::definitions::DEMO_DATA_FILES;
use crate::db::log_generator::{DeviceLogRecord, LogGenerator};
use crate::db::sql_file::{ExecutionReport, SqlFileExecutor};
use crate::error::AdminError;
use chrono::Local;
use serde::Serialize;
use sqlx::mysql::{MySql, MySqlConnection};
use sqlx::{Connection, QueryBuilder, Transaction};
use tracing::{debug, info, warn};

/// Rows per multi-row INSERT; 8 binds each keeps well under the placeholder limit.
const INSERT_BATCH_SIZE: usize = 500;

#[derive(Debug, Clone, Serialize)]
pub struct SampleDataSummary {
    pub files: Vec<ExecutionReport>,
    pub log_rows: usize,
}

impl SampleDataSummary {
    pub fn log_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self.files.iter().flat_map(ExecutionReport::log_lines).collect();
        lines.push(format!("Generated {} device log entries", self.log_rows));
        lines
    }
}

/// Seeds reference data and synthetic logs atomically: either everything commits or nothing.
pub async fn insert_sample_data(
    conn: &mut MySqlConnection,
    executor: &SqlFileExecutor,
    generator: &LogGenerator,
) -> Result<SampleDataSummary, AdminError> {
    let mut tx = conn
        .begin()
        .await
        .map_err(|e| AdminError::SampleData(format!("could not open transaction: {e}")))?;

    match seed(&mut tx, executor, generator).await {
        Ok(summary) => {
            tx.commit()
                .await
                .map_err(|e| AdminError::SampleData(format!("commit failed: {e}")))?;
            info!(log_rows = summary.log_rows, "sample data committed");
            Ok(summary)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback after failed seeding also failed");
            }
            warn!(error = %e, "sample data rolled back");
            Err(match e {
                AdminError::SampleData(message) => AdminError::SampleData(message),
                other => AdminError::SampleData(other.to_string()),
            })
        }
    }
}

async fn seed(
    tx: &mut Transaction<'_, MySql>,
    executor: &SqlFileExecutor,
    generator: &LogGenerator,
) -> Result<SampleDataSummary, AdminError> {
    let mut files = Vec::with_capacity(DEMO_DATA_FILES.len());
    for name in DEMO_DATA_FILES {
        let path = format!("demo_data/{name}.sql");
        let report = executor.execute(&mut **tx, &path).await?;
        if !report.is_clean() {
            // a skipped statement would leave the seed partial
            return Err(AdminError::SampleData(format!(
                "{path}: {} statement(s) failed",
                report.warnings.len()
            )));
        }
        files.push(report);
    }

    for &device_id in generator.device_ids() {
        debug!(
            device_id,
            profile = generator.profile_of(device_id).name(),
            "generating device logs"
        );
    }
    let records = {
        let mut rng = rand::rng();
        generator.generate(&mut rng, Local::now().naive_local())
    };
    insert_logs(&mut **tx, &records).await?;

    Ok(SampleDataSummary {
        files,
        log_rows: records.len(),
    })
}

/// Bulk insert of generated rows; runs inside the caller's transaction.
pub async fn insert_logs(
    conn: &mut MySqlConnection,
    records: &[DeviceLogRecord],
) -> Result<(), AdminError> {
    for chunk in records.chunks(INSERT_BATCH_SIZE) {
        let mut builder = QueryBuilder::<MySql>::new(
            "INSERT INTO device_logs (device_id, log_time, log_type, message, severity_level, \
             resolved_by, resolved_at, resolution_notes) ",
        );
        builder.push_values(chunk, |mut row, record| {
            row.push_bind(record.device_id)
                .push_bind(record.log_time)
                .push_bind(record.log_type.as_str())
                .push_bind(record.message.clone())
                .push_bind(record.severity_level)
                .push_bind(record.resolved_by)
                .push_bind(record.resolved_at)
                .push_bind(record.resolution_notes.clone());
        });
        builder.build().execute(&mut *conn).await?;
    }
    Ok(())
}
