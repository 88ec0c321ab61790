use crate::config::{ConnectionConfig, SslModeOption};
use crate::error::AdminError;
use iot_admin_schema::ConnectionTestResult;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlSslMode};
use sqlx::Connection;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the single live connection of one orchestrator.
///
/// The handle is opened lazily and reused until it stops answering pings or is invalidated
/// explicitly (reset, config change). When the configured database cannot be selected the
/// provider falls back to a server-level handle so bootstrap can create it.
pub struct ConnectionProvider {
    config: ConnectionConfig,
    conn: Option<MySqlConnection>,
    database_bound: bool,
}

impl ConnectionProvider {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            conn: None,
            database_bound: false,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Returns the memoised handle, (re)connecting if needed.
    pub async fn connection(&mut self) -> Result<&mut MySqlConnection, AdminError> {
        self.ensure_live().await?;
        self.conn
            .as_mut()
            .ok_or_else(|| AdminError::Connection("connection unavailable".to_string()))
    }

    /// Returns a handle with the configured database selected.
    ///
    /// A server-level fallback handle is replaced once, since the database may have been
    /// created since it was opened. Fails with [`AdminError::Schema`] if it still is absent.
    pub async fn bound_connection(&mut self) -> Result<&mut MySqlConnection, AdminError> {
        self.ensure_live().await?;
        if !self.database_bound {
            self.invalidate().await;
            self.ensure_live().await?;
        }
        if !self.database_bound {
            return Err(AdminError::Schema(format!(
                "database `{}` does not exist",
                self.config.db_name
            )));
        }
        self.conn
            .as_mut()
            .ok_or_else(|| AdminError::Connection("connection unavailable".to_string()))
    }

    /// Opens a fresh handle without any database selected. The caller owns and closes it.
    pub async fn server_connection(&self) -> Result<MySqlConnection, AdminError> {
        open(&self.config, false).await
    }

    /// Drops the memoised handle; the next call reconnects.
    pub async fn invalidate(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                debug!(error = %e, "closing connection failed");
            }
        }
        self.database_bound = false;
    }

    async fn ensure_live(&mut self) -> Result<(), AdminError> {
        let alive = match self.conn.as_mut() {
            Some(conn) => conn.ping().await.is_ok(),
            None => false,
        };
        if alive {
            return Ok(());
        }
        if self.conn.take().is_some() {
            warn!(host = %self.config.host, "memoised connection is gone; reconnecting");
        }

        let (conn, bound) = self.establish().await?;
        self.conn = Some(conn);
        self.database_bound = bound;
        Ok(())
    }

    async fn establish(&self) -> Result<(MySqlConnection, bool), AdminError> {
        match open(&self.config, true).await {
            Ok(conn) => {
                debug!(db_name = %self.config.db_name, "connected with database selected");
                Ok((conn, true))
            }
            Err(bound_err) => {
                warn!(
                    db_name = %self.config.db_name,
                    error = %bound_err,
                    "connecting with database failed; retrying at server level"
                );
                let conn = open(&self.config, false).await?;
                info!(host = %self.config.host, "connected without database selected");
                Ok((conn, false))
            }
        }
    }
}

/// Builds driver options from the persisted record.
pub fn connect_options(cfg: &ConnectionConfig, with_database: bool) -> MySqlConnectOptions {
    let mut opts = MySqlConnectOptions::new()
        .host(&cfg.host)
        .port(cfg.port)
        .username(&cfg.username)
        .charset(&cfg.charset);

    if !cfg.password.is_empty() {
        opts = opts.password(&cfg.password);
    }
    if with_database {
        opts = opts.database(&cfg.db_name);
    }
    if let Some(mode) = cfg.ssl_mode() {
        opts = opts.ssl_mode(match mode {
            SslModeOption::Disabled => MySqlSslMode::Disabled,
            SslModeOption::Preferred => MySqlSslMode::Preferred,
            SslModeOption::Required => MySqlSslMode::Required,
            SslModeOption::VerifyCa => MySqlSslMode::VerifyCa,
            SslModeOption::VerifyIdentity => MySqlSslMode::VerifyIdentity,
        });
    }
    if let Some(capacity) = cfg.statement_cache_capacity() {
        opts = opts.statement_cache_capacity(capacity);
    }
    opts
}

async fn open(cfg: &ConnectionConfig, with_database: bool) -> Result<MySqlConnection, AdminError> {
    let opts = connect_options(cfg, with_database);
    let timeout = cfg.connect_timeout().unwrap_or(DEFAULT_CONNECT_TIMEOUT);

    match tokio::time::timeout(timeout, MySqlConnection::connect_with(&opts)).await {
        Ok(Ok(conn)) => Ok(conn),
        Ok(Err(e)) => Err(AdminError::Connection(e.to_string())),
        Err(_) => Err(AdminError::Connection(format!(
            "timed out after {}s connecting to {}:{}",
            timeout.as_secs(),
            cfg.host,
            cfg.port
        ))),
    }
}

/// Handshake-only check (no database selected). Failure is a normal outcome, never an error.
pub async fn test_connection(cfg: &ConnectionConfig) -> ConnectionTestResult {
    let mut conn = match open(cfg, false).await {
        Ok(conn) => conn,
        Err(e) => {
            return ConnectionTestResult {
                success: false,
                message: e.to_string(),
            };
        }
    };

    let version = sqlx::query_scalar::<_, String>("SELECT CAST(VERSION() AS CHAR)")
        .fetch_one(&mut conn)
        .await;
    if let Err(e) = conn.close().await {
        debug!(error = %e, "closing test connection failed");
    }

    match version {
        Ok(version) => ConnectionTestResult {
            success: true,
            message: format!("Connected to MySQL {version} at {}:{}", cfg.host, cfg.port),
        },
        Err(e) => ConnectionTestResult {
            success: false,
            message: format!("Handshake succeeded but server query failed: {e}"),
        },
    }
}
