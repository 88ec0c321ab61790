//! Catalog snapshots for status polling and table browsing.
//!
//! Everything here reads `information_schema` for the configured schema. Status collection
//! never fails: an unreachable server gives a disconnected snapshot, and a failing sub-query
//! only leaves its part of the snapshot empty.

use crate::db::definitions::TABLE_FILES;
use crate::db::{ConnectionProvider, quote_identifier};
use crate::error::AdminError;
use chrono::NaiveDateTime;
use iot_admin_schema::{
    ColumnInfo, ForeignKeyInfo, IndexInfo, SchemaStatus, TableInfo, TableStructure,
};
use sqlx::FromRow;
use sqlx::mysql::MySqlConnection;
use std::collections::BTreeSet;
use tracing::{debug, warn};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, FromRow)]
struct TableMetaRow {
    column_count: i64,
    size_bytes: i64,
    created_at: Option<NaiveDateTime>,
}

#[derive(Debug, FromRow)]
struct ColumnRow {
    name: String,
    data_type: String,
    column_type: String,
    is_nullable: String,
    column_default: Option<String>,
    max_length: Option<i64>,
    numeric_precision: Option<i64>,
    numeric_scale: Option<i64>,
    column_key: String,
    extra: String,
    column_comment: String,
}

#[derive(Debug, FromRow)]
struct ForeignKeyRow {
    constraint_name: String,
    column_name: String,
    referenced_table: String,
    referenced_column: String,
    update_rule: String,
    delete_rule: String,
}

#[derive(Debug, FromRow)]
struct IndexRow {
    index_name: String,
    column_name: String,
    seq_in_index: i64,
    non_unique: i64,
    index_type: String,
}

/// Builds a [`SchemaStatus`] for the provider's database.
pub async fn schema_status(provider: &mut ConnectionProvider) -> SchemaStatus {
    let db_name = provider.config().db_name.clone();
    let conn = match provider.connection().await {
        Ok(conn) => conn,
        Err(e) => {
            debug!(error = %e, "status: server unreachable");
            return SchemaStatus::disconnected();
        }
    };

    match database_exists(conn, &db_name).await {
        Ok(true) => {}
        Ok(false) => return SchemaStatus::without_database(),
        Err(e) => {
            warn!(db_name = %db_name, error = %e, "status: schema lookup failed");
            return SchemaStatus::without_database();
        }
    }

    let mut status = SchemaStatus {
        connected: true,
        database_exists: true,
        ..SchemaStatus::default()
    };

    status.tables = or_empty("tables", list_relations(conn, &db_name, "BASE TABLE").await);
    status.views = or_empty("views", list_relations(conn, &db_name, "VIEW").await);
    status.procedures = or_empty("procedures", list_routines(conn, &db_name, "PROCEDURE").await);
    status.functions = or_empty("functions", list_routines(conn, &db_name, "FUNCTION").await);
    status.triggers = or_empty("triggers", list_triggers(conn, &db_name).await);

    for table in TABLE_FILES.iter().filter(|t| status.tables.contains(**t)) {
        match table_info(conn, &db_name, table).await {
            Ok(info) => {
                status.tables_info.insert(table.to_string(), info);
            }
            Err(e) => warn!(table, error = %e, "status: table details unavailable"),
        }
    }

    status
}

fn or_empty(what: &str, listed: Result<BTreeSet<String>, sqlx::Error>) -> BTreeSet<String> {
    listed.unwrap_or_else(|e| {
        warn!(what, error = %e, "status: catalog listing failed");
        BTreeSet::new()
    })
}

pub async fn database_exists(conn: &mut MySqlConnection, db_name: &str) -> Result<bool, sqlx::Error> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = ?")
            .bind(db_name)
            .fetch_one(conn)
            .await?;
    Ok(count > 0)
}

async fn list_relations(
    conn: &mut MySqlConnection,
    db_name: &str,
    table_type: &str,
) -> Result<BTreeSet<String>, sqlx::Error> {
    let names: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT CAST(TABLE_NAME AS CHAR)
        FROM information_schema.TABLES
        WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = ?
        "#,
    )
    .bind(db_name)
    .bind(table_type)
    .fetch_all(conn)
    .await?;
    Ok(names.into_iter().collect())
}

async fn list_routines(
    conn: &mut MySqlConnection,
    db_name: &str,
    routine_type: &str,
) -> Result<BTreeSet<String>, sqlx::Error> {
    let names: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT CAST(ROUTINE_NAME AS CHAR)
        FROM information_schema.ROUTINES
        WHERE ROUTINE_SCHEMA = ? AND ROUTINE_TYPE = ?
        "#,
    )
    .bind(db_name)
    .bind(routine_type)
    .fetch_all(conn)
    .await?;
    Ok(names.into_iter().collect())
}

async fn list_triggers(
    conn: &mut MySqlConnection,
    db_name: &str,
) -> Result<BTreeSet<String>, sqlx::Error> {
    let names: Vec<String> = sqlx::query_scalar(
        "SELECT CAST(TRIGGER_NAME AS CHAR) FROM information_schema.TRIGGERS WHERE TRIGGER_SCHEMA = ?",
    )
    .bind(db_name)
    .fetch_all(conn)
    .await?;
    Ok(names.into_iter().collect())
}

async fn table_info(
    conn: &mut MySqlConnection,
    db_name: &str,
    table: &str,
) -> Result<TableInfo, AdminError> {
    let row_count = count_rows(conn, db_name, table).await?;
    let meta = sqlx::query_as::<_, TableMetaRow>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM information_schema.COLUMNS c
             WHERE c.TABLE_SCHEMA = t.TABLE_SCHEMA AND c.TABLE_NAME = t.TABLE_NAME) AS column_count,
            CAST(COALESCE(t.DATA_LENGTH, 0) + COALESCE(t.INDEX_LENGTH, 0) AS SIGNED) AS size_bytes,
            t.CREATE_TIME AS created_at
        FROM information_schema.TABLES t
        WHERE t.TABLE_SCHEMA = ? AND t.TABLE_NAME = ?
        "#,
    )
    .bind(db_name)
    .bind(table)
    .fetch_one(&mut *conn)
    .await?;

    Ok(TableInfo {
        row_count,
        column_count: meta.column_count,
        size: format_size(meta.size_bytes),
        created_at: meta.created_at.map(format_created_at),
    })
}

async fn count_rows(
    conn: &mut MySqlConnection,
    db_name: &str,
    table: &str,
) -> Result<i64, AdminError> {
    let sql = format!(
        "SELECT COUNT(*) FROM {}.{}",
        quote_identifier(db_name)?,
        quote_identifier(table)?
    );
    let count: i64 = sqlx::query_scalar(&sql).fetch_one(&mut *conn).await?;
    Ok(count)
}

/// Columns, foreign keys, indexes and row count of one base table.
pub async fn table_structure(
    conn: &mut MySqlConnection,
    db_name: &str,
    table: &str,
) -> Result<TableStructure, AdminError> {
    let tables = list_relations(conn, db_name, "BASE TABLE").await?;
    if !tables.contains(table) {
        return Err(AdminError::NotFound(format!("table `{table}`")));
    }

    let columns = sqlx::query_as::<_, ColumnRow>(
        r#"
        SELECT
            CAST(COLUMN_NAME AS CHAR) AS name,
            CAST(DATA_TYPE AS CHAR) AS data_type,
            CAST(COLUMN_TYPE AS CHAR) AS column_type,
            CAST(IS_NULLABLE AS CHAR) AS is_nullable,
            CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
            CAST(CHARACTER_MAXIMUM_LENGTH AS SIGNED) AS max_length,
            CAST(NUMERIC_PRECISION AS SIGNED) AS numeric_precision,
            CAST(NUMERIC_SCALE AS SIGNED) AS numeric_scale,
            CAST(COLUMN_KEY AS CHAR) AS column_key,
            CAST(EXTRA AS CHAR) AS extra,
            CAST(COLUMN_COMMENT AS CHAR) AS column_comment
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
        "#,
    )
    .bind(db_name)
    .bind(table)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|c| ColumnInfo {
        name: c.name,
        data_type: c.data_type,
        column_type: c.column_type,
        nullable: c.is_nullable.eq_ignore_ascii_case("YES"),
        default: c.column_default,
        max_length: c.max_length,
        numeric_precision: c.numeric_precision,
        numeric_scale: c.numeric_scale,
        key: c.column_key,
        extra: c.extra,
        comment: c.column_comment,
    })
    .collect();

    let foreign_keys = sqlx::query_as::<_, ForeignKeyRow>(
        r#"
        SELECT
            CAST(k.CONSTRAINT_NAME AS CHAR) AS constraint_name,
            CAST(k.COLUMN_NAME AS CHAR) AS column_name,
            CAST(k.REFERENCED_TABLE_NAME AS CHAR) AS referenced_table,
            CAST(k.REFERENCED_COLUMN_NAME AS CHAR) AS referenced_column,
            CAST(r.UPDATE_RULE AS CHAR) AS update_rule,
            CAST(r.DELETE_RULE AS CHAR) AS delete_rule
        FROM information_schema.KEY_COLUMN_USAGE k
        JOIN information_schema.REFERENTIAL_CONSTRAINTS r
          ON r.CONSTRAINT_SCHEMA = k.CONSTRAINT_SCHEMA
         AND r.CONSTRAINT_NAME = k.CONSTRAINT_NAME
        WHERE k.TABLE_SCHEMA = ? AND k.TABLE_NAME = ? AND k.REFERENCED_TABLE_NAME IS NOT NULL
        ORDER BY k.CONSTRAINT_NAME, k.ORDINAL_POSITION
        "#,
    )
    .bind(db_name)
    .bind(table)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|fk| ForeignKeyInfo {
        constraint_name: fk.constraint_name,
        column: fk.column_name,
        referenced_table: fk.referenced_table,
        referenced_column: fk.referenced_column,
        update_rule: fk.update_rule,
        delete_rule: fk.delete_rule,
    })
    .collect();

    let indexes = sqlx::query_as::<_, IndexRow>(
        r#"
        SELECT
            CAST(INDEX_NAME AS CHAR) AS index_name,
            CAST(COLUMN_NAME AS CHAR) AS column_name,
            CAST(SEQ_IN_INDEX AS SIGNED) AS seq_in_index,
            CAST(NON_UNIQUE AS SIGNED) AS non_unique,
            CAST(INDEX_TYPE AS CHAR) AS index_type
        FROM information_schema.STATISTICS
        WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
        ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#,
    )
    .bind(db_name)
    .bind(table)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|ix| IndexInfo {
        name: ix.index_name,
        column: ix.column_name,
        seq_in_index: ix.seq_in_index,
        unique: ix.non_unique == 0,
        index_type: ix.index_type,
    })
    .collect();

    let row_count = count_rows(conn, db_name, table).await?;

    Ok(TableStructure {
        table: table.to_string(),
        columns,
        foreign_keys,
        indexes,
        row_count,
    })
}

/// Megabytes with two decimals; anything that rounds to zero is reported as `< 0.01 MB`.
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: i64) -> String {
    let mb = (bytes.max(0) as f64 / BYTES_PER_MB * 100.0).round() / 100.0;
    if mb < 0.01 {
        "< 0.01 MB".to_string()
    } else {
        format!("{mb:.2} MB")
    }
}

pub fn format_created_at(created: NaiveDateTime) -> String {
    created.format("%Y-%m-%d %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn size_formatting() {
        assert_eq!(format_size(0), "< 0.01 MB");
        assert_eq!(format_size(4_096), "< 0.01 MB");
        assert_eq!(format_size(16_384), "0.02 MB");
        assert_eq!(format_size(1_572_864), "1.50 MB");
    }

    #[test]
    fn created_at_is_minute_precision() {
        let dt = NaiveDate::from_ymd_opt(2026, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 59)
            .unwrap();
        assert_eq!(format_created_at(dt), "2026-01-02 03:04");
    }
}
