use crate::db::delimiter;
use crate::error::AdminError;
use async_trait::async_trait;
use serde::Serialize;
use sqlx::Executor;
use sqlx::mysql::MySqlConnection;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Token replaced by the configured database name in every definition file.
pub const DB_NAME_PLACEHOLDER: &str = "{{DB_NAME}}";

const PREVIEW_CHARS: usize = 80;

/// Anything that can run raw SQL text.
#[async_trait]
pub trait SqlSink: Send {
    /// Executes `sql` (possibly several statements) and returns the affected row count.
    async fn exec(&mut self, sql: &str) -> Result<u64, sqlx::Error>;
}

#[async_trait]
impl SqlSink for MySqlConnection {
    async fn exec(&mut self, sql: &str) -> Result<u64, sqlx::Error> {
        // a bare &str carries no arguments, so it goes over the text protocol
        let conn: &mut MySqlConnection = self;
        let result = Executor::execute(conn, sql).await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// Whole file sent as one batch.
    Plain,
    /// File contains `DELIMITER` directives; statements run one by one.
    DelimiterBlock,
}

/// A statement that failed in delimiter-block mode and was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatementWarning {
    pub index: usize,
    pub preview: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub file: String,
    pub mode: ExecutionMode,
    pub statements_executed: usize,
    pub warnings: Vec<StatementWarning>,
}

impl ExecutionReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Human readable lines for operation logs.
    pub fn log_lines(&self) -> Vec<String> {
        let mut lines = vec![match self.mode {
            ExecutionMode::Plain => format!("Executed {}", self.file),
            ExecutionMode::DelimiterBlock => format!(
                "Executed {} ({} statements, {} skipped)",
                self.file,
                self.statements_executed,
                self.warnings.len()
            ),
        }];
        lines.extend(self.warnings.iter().map(|w| {
            format!(
                "  warning in {} statement #{} [{}]: {}",
                self.file, w.index, w.preview, w.message
            )
        }));
        lines
    }
}

/// Reads definition files below a fixed root and runs them.
#[derive(Debug, Clone)]
pub struct SqlFileExecutor {
    root: PathBuf,
    db_name: String,
}

impl SqlFileExecutor {
    pub fn new(root: impl Into<PathBuf>, db_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            db_name: db_name.into(),
        }
    }

    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// File contents with the database-name placeholder substituted.
    pub async fn read_definition(&self, relative: &str) -> Result<String, AdminError> {
        let path = self.resolve(relative);
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AdminError::FileNotFound(path));
            }
            Err(e) => return Err(AdminError::io(path, e)),
        };
        Ok(raw.replace(DB_NAME_PLACEHOLDER, &self.db_name))
    }

    /// Runs one definition file.
    ///
    /// Plain files fail as a whole. In delimiter-block mode each statement is attempted and
    /// failures are recorded as warnings, so re-running a file over existing objects goes on.
    pub async fn execute<S>(&self, sink: &mut S, relative: &str) -> Result<ExecutionReport, AdminError>
    where
        S: SqlSink + ?Sized,
    {
        let sql = self.read_definition(relative).await?;

        if !delimiter::has_delimiter_marker(&delimiter::strip_comments(&sql)) {
            sink.exec(&sql).await?;
            debug!(file = relative, "executed plain definition");
            return Ok(ExecutionReport {
                file: relative.to_string(),
                mode: ExecutionMode::Plain,
                statements_executed: 1,
                warnings: Vec::new(),
            });
        }

        let statements = delimiter::split_statements(&sql);
        let mut executed = 0;
        let mut warnings = Vec::new();

        for (index, statement) in statements.iter().enumerate() {
            match sink.exec(statement).await {
                Ok(_) => executed += 1,
                Err(e) => {
                    let preview = preview(statement);
                    warn!(
                        file = relative,
                        statement = index + 1,
                        preview = %preview,
                        error = %e,
                        "statement failed; continuing"
                    );
                    warnings.push(StatementWarning {
                        index: index + 1,
                        preview,
                        message: e.to_string(),
                    });
                }
            }
        }

        debug!(
            file = relative,
            executed,
            skipped = warnings.len(),
            "executed delimiter-block definition"
        );
        Ok(ExecutionReport {
            file: relative.to_string(),
            mode: ExecutionMode::DelimiterBlock,
            statements_executed: executed,
            warnings,
        })
    }
}

fn preview(statement: &str) -> String {
    let flat = statement.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(PREVIEW_CHARS).collect();
    format!("{cut}...")
}
