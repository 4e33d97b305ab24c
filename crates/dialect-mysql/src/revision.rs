use chrono::{DateTime, NaiveDateTime, Utc};
use mysql::PooledConn;
use mysql::prelude::Queryable;

use atlas_core::{
    Result,
    migrate::{Revision, RevisionKind, RevisionTable},
};

use crate::{exec_error, quote_qualified};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

fn table_name(table: &RevisionTable, default_schema: &str) -> String {
    let schema = table
        .schema
        .as_deref()
        .or((!default_schema.is_empty()).then_some(default_schema));
    quote_qualified(schema, &table.name)
}

pub fn ensure(conn: &mut PooledConn, table: &RevisionTable, default_schema: &str) -> Result<()> {
    conn.query_drop(format!(
        "CREATE TABLE IF NOT EXISTS {} (
  version varchar(191) NOT NULL PRIMARY KEY,
  description varchar(255) NOT NULL,
  type varchar(32) NOT NULL,
  applied bigint NOT NULL,
  total bigint NOT NULL,
  executed_at datetime(6) NOT NULL,
  execution_time_ms bigint NOT NULL,
  error longtext,
  error_stmt longtext,
  hash varchar(128) NOT NULL,
  partial_hashes json,
  operator_version varchar(64) NOT NULL
)",
        table_name(table, default_schema)
    ))
    .map_err(exec_error)
}

pub fn read_all(
    conn: &mut PooledConn,
    table: &RevisionTable,
    default_schema: &str,
) -> Result<Vec<Revision>> {
    type Row = (
        String,
        String,
        String,
        i64,
        i64,
        String,
        i64,
        Option<String>,
        Option<String>,
        String,
        Option<String>,
        String,
    );
    let rows: Vec<Row> = conn
        .query(format!(
            "SELECT version, description, type, applied, total,
        DATE_FORMAT(executed_at, '%Y-%m-%d %H:%i:%s.%f'),
        execution_time_ms, error, error_stmt, hash,
        CAST(partial_hashes AS CHAR), operator_version
   FROM {} ORDER BY version",
            table_name(table, default_schema)
        ))
        .map_err(exec_error)?;

    Ok(rows
        .into_iter()
        .map(
            |(
                version,
                description,
                kind,
                applied,
                total,
                executed_at,
                execution_time_ms,
                error,
                error_stmt,
                hash,
                partial_hashes,
                operator_version,
            )| {
                Revision {
                    version,
                    description,
                    kind: RevisionKind::parse(&kind),
                    applied: applied as usize,
                    total: total as usize,
                    executed_at: parse_timestamp(&executed_at),
                    execution_time_ms: execution_time_ms as u64,
                    error,
                    error_stmt,
                    hash,
                    partial_hashes: partial_hashes
                        .and_then(|p| serde_json::from_str(&p).ok())
                        .unwrap_or_default(),
                    operator_version,
                }
            },
        )
        .collect())
}

pub fn write(
    conn: &mut PooledConn,
    table: &RevisionTable,
    rev: &Revision,
    default_schema: &str,
) -> Result<()> {
    let partial = serde_json::to_string(&rev.partial_hashes).unwrap_or_else(|_| "[]".to_string());
    conn.exec_drop(
        format!(
            "REPLACE INTO {} (version, description, type, applied, total, executed_at,
        execution_time_ms, error, error_stmt, hash, partial_hashes, operator_version)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            table_name(table, default_schema)
        ),
        (
            rev.version.clone(),
            rev.description.clone(),
            rev.kind.as_str(),
            rev.applied as i64,
            rev.total as i64,
            rev.executed_at.format(TIMESTAMP_FORMAT).to_string(),
            rev.execution_time_ms as i64,
            rev.error.clone(),
            rev.error_stmt.clone(),
            rev.hash.clone(),
            partial,
            rev.operator_version.clone(),
        ),
    )
    .map_err(exec_error)
}

pub fn delete(
    conn: &mut PooledConn,
    table: &RevisionTable,
    version: &str,
    default_schema: &str,
) -> Result<()> {
    conn.exec_drop(
        format!(
            "DELETE FROM {} WHERE version = ?",
            table_name(table, default_schema)
        ),
        (version,),
    )
    .map_err(exec_error)
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}
