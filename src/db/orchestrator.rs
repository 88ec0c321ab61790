use crate::config::ConnectionConfig;
use crate::db::definitions::{ADVANCED_OBJECT_ORDER, DATABASE_FILE, DefinitionCategory};
use crate::db::log_generator::LogGenerator;
use crate::db::sample_data::{self, SampleDataSummary};
use crate::db::sql_file::{ExecutionReport, SqlFileExecutor, SqlSink};
use crate::db::{ConnectionProvider, inspector, quote_identifier};
use crate::error::AdminError;
use iot_admin_schema::{SchemaStatus, TableStructure};
use sqlx::Connection;
use std::path::PathBuf;
use tracing::{debug, info};

/// Drives schema creation for one configured database.
///
/// Owns the connection provider, so every operation on one orchestrator shares the same live
/// handle. Steps are not guarded against re-running: definitions use `IF NOT EXISTS` or run in
/// delimiter-block mode, and callers consult [`SchemaStatus`] before invoking a step.
pub struct SchemaOrchestrator {
    provider: ConnectionProvider,
    executor: SqlFileExecutor,
}

impl SchemaOrchestrator {
    pub fn new(config: ConnectionConfig, sql_root: impl Into<PathBuf>) -> Self {
        let executor = SqlFileExecutor::new(sql_root, config.db_name.clone());
        Self {
            provider: ConnectionProvider::new(config),
            executor,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        self.provider.config()
    }

    /// Runs the database file on a server-level handle, then rebinds the memoised handle.
    pub async fn create_database(&mut self) -> Result<Vec<ExecutionReport>, AdminError> {
        info!(db_name = %self.config().db_name, "creating database");
        let mut server = self.provider.server_connection().await?;
        let result = self.executor.execute(&mut server, DATABASE_FILE).await;
        if let Err(e) = server.close().await {
            debug!(error = %e, "closing server-level connection failed");
        }
        let report = result.map_err(|e| step_error(DATABASE_FILE, e))?;

        self.provider.invalidate().await;
        self.provider.bound_connection().await?;
        Ok(vec![report])
    }

    /// Tables in dependency order, followed by [`create_advanced_objects`](Self::create_advanced_objects).
    pub async fn create_tables(&mut self) -> Result<Vec<ExecutionReport>, AdminError> {
        let conn = self.provider.bound_connection().await?;
        create_schema_objects(&self.executor, conn).await
    }

    /// Views, functions, procedures, indexes and triggers, in that order.
    pub async fn create_advanced_objects(&mut self) -> Result<Vec<ExecutionReport>, AdminError> {
        let conn = self.provider.bound_connection().await?;
        create_advanced_objects(&self.executor, conn).await
    }

    /// Seeds reference rows plus generated logs in one transaction.
    pub async fn insert_sample_data(
        &mut self,
        generator: &LogGenerator,
    ) -> Result<SampleDataSummary, AdminError> {
        let conn = match self.provider.bound_connection().await {
            Ok(conn) => conn,
            Err(AdminError::Schema(message)) => return Err(AdminError::SampleData(message)),
            Err(e) => return Err(e),
        };
        sample_data::insert_sample_data(conn, &self.executor, generator).await
    }

    /// Drops the database and forgets the memoised handle.
    pub async fn drop_database(&mut self) -> Result<(), AdminError> {
        self.provider.invalidate().await;

        let statement = format!(
            "DROP DATABASE IF EXISTS {}",
            quote_identifier(&self.config().db_name)?
        );
        let mut server = self.provider.server_connection().await?;
        let result = server.exec(&statement).await;
        if let Err(e) = server.close().await {
            debug!(error = %e, "closing server-level connection failed");
        }
        result.map_err(|e| AdminError::Schema(format!("dropping database failed: {e}")))?;

        info!(db_name = %self.config().db_name, "database dropped");
        Ok(())
    }

    /// Releases the live handle, if any.
    pub async fn close(&mut self) {
        self.provider.invalidate().await;
    }

    /// Never fails; see [`inspector::schema_status`].
    pub async fn status(&mut self) -> SchemaStatus {
        inspector::schema_status(&mut self.provider).await
    }

    pub async fn table_structure(&mut self, table: &str) -> Result<TableStructure, AdminError> {
        let db_name = self.config().db_name.clone();
        let conn = self.provider.bound_connection().await?;
        inspector::table_structure(conn, &db_name, table).await
    }

    /// Stored definition text with the placeholder substituted.
    pub async fn definition(
        &self,
        category: DefinitionCategory,
        name: &str,
    ) -> Result<String, AdminError> {
        let path = category.relative_path(name).ok_or_else(|| {
            AdminError::NotFound(format!("{} definition `{name}`", category.label()))
        })?;
        self.executor.read_definition(&path).await
    }

    /// Every definition of `category`, separated by banners.
    pub async fn bulk_definitions(&self, category: DefinitionCategory) -> Result<String, AdminError> {
        if !category.supports_bulk() {
            return Err(AdminError::BadRequest(format!(
                "bulk export is not available for {} definitions",
                category.label()
            )));
        }

        let mut out = String::new();
        for name in category.files() {
            let body = self.definition(category, name).await?;
            out.push_str(&banner(category, name));
            out.push_str(body.trim_end());
            out.push_str("\n\n");
        }
        Ok(out)
    }
}

fn banner(category: DefinitionCategory, name: &str) -> String {
    let rule = "-- ".to_string() + &"=".repeat(60);
    format!("{rule}\n-- {}: {name}\n{rule}\n", category.label().to_uppercase())
}

/// Runs every file of `category` in list order; a plain-file failure stops the run.
pub async fn run_definitions<S>(
    executor: &SqlFileExecutor,
    sink: &mut S,
    category: DefinitionCategory,
) -> Result<Vec<ExecutionReport>, AdminError>
where
    S: SqlSink + ?Sized,
{
    let mut reports = Vec::with_capacity(category.files().len());
    for name in category.files() {
        let Some(path) = category.relative_path(name) else {
            continue;
        };
        let report = executor
            .execute(&mut *sink, &path)
            .await
            .map_err(|e| step_error(&path, e))?;
        info!(kind = category.label(), name, "definition applied");
        reports.push(report);
    }
    Ok(reports)
}

/// Tables first, then the advanced objects that read from them.
pub async fn create_schema_objects<S>(
    executor: &SqlFileExecutor,
    sink: &mut S,
) -> Result<Vec<ExecutionReport>, AdminError>
where
    S: SqlSink + ?Sized,
{
    let mut reports = run_definitions(executor, &mut *sink, DefinitionCategory::Table).await?;
    reports.extend(create_advanced_objects(executor, &mut *sink).await?);
    Ok(reports)
}

pub async fn create_advanced_objects<S>(
    executor: &SqlFileExecutor,
    sink: &mut S,
) -> Result<Vec<ExecutionReport>, AdminError>
where
    S: SqlSink + ?Sized,
{
    let mut reports = Vec::new();
    for category in ADVANCED_OBJECT_ORDER {
        reports.extend(run_definitions(executor, &mut *sink, *category).await?);
    }
    Ok(reports)
}

/// Wraps driver failures with the file that caused them; file and connection errors pass through.
fn step_error(path: &str, err: AdminError) -> AdminError {
    match err {
        AdminError::Database(e) => AdminError::Schema(format!("{path}: {e}")),
        other => other,
    }
}
