use chrono::{DateTime, Utc};
use rusqlite::Connection;

use atlas_core::{
    Result,
    migrate::{Revision, RevisionKind, RevisionTable},
};

use crate::{exec_error, quote};

/// SQLite ignores the schema part of the revision table location: the
/// database file is the namespace.
fn table_name(table: &RevisionTable) -> String {
    quote(&table.name)
}

pub fn ensure(conn: &Connection, table: &RevisionTable) -> Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {} (
  version TEXT NOT NULL PRIMARY KEY,
  description TEXT NOT NULL,
  type TEXT NOT NULL,
  applied INTEGER NOT NULL,
  total INTEGER NOT NULL,
  executed_at TEXT NOT NULL,
  execution_time_ms INTEGER NOT NULL,
  error TEXT,
  error_stmt TEXT,
  hash TEXT NOT NULL,
  partial_hashes TEXT NOT NULL,
  operator_version TEXT NOT NULL
)",
        table_name(table)
    ))
    .map_err(exec_error)
}

pub fn read_all(conn: &Connection, table: &RevisionTable) -> Result<Vec<Revision>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT version, description, type, applied, total, executed_at, execution_time_ms,
       error, error_stmt, hash, partial_hashes, operator_version
  FROM {} ORDER BY version",
            table_name(table)
        ))
        .map_err(exec_error)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Revision {
                version: row.get(0)?,
                description: row.get(1)?,
                kind: RevisionKind::parse(&row.get::<_, String>(2)?),
                applied: row.get::<_, i64>(3)? as usize,
                total: row.get::<_, i64>(4)? as usize,
                executed_at: parse_timestamp(&row.get::<_, String>(5)?),
                execution_time_ms: row.get::<_, i64>(6)? as u64,
                error: row.get(7)?,
                error_stmt: row.get(8)?,
                hash: row.get(9)?,
                partial_hashes: serde_json::from_str(&row.get::<_, String>(10)?)
                    .unwrap_or_default(),
                operator_version: row.get(11)?,
            })
        })
        .map_err(exec_error)?;
    rows.collect::<std::result::Result<Vec<_>, _>>()
        .map_err(exec_error)
}

pub fn write(conn: &Connection, table: &RevisionTable, rev: &Revision) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO {} (version, description, type, applied, total, executed_at,
       execution_time_ms, error, error_stmt, hash, partial_hashes, operator_version)
VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            table_name(table)
        ),
        rusqlite::params![
            rev.version,
            rev.description,
            rev.kind.as_str(),
            rev.applied as i64,
            rev.total as i64,
            rev.executed_at.to_rfc3339(),
            rev.execution_time_ms as i64,
            rev.error,
            rev.error_stmt,
            rev.hash,
            serde_json::to_string(&rev.partial_hashes).unwrap_or_else(|_| "[]".to_string()),
            rev.operator_version,
        ],
    )
    .map_err(exec_error)?;
    Ok(())
}

pub fn delete(conn: &Connection, table: &RevisionTable, version: &str) -> Result<()> {
    conn.execute(
        &format!("DELETE FROM {} WHERE version = ?1", table_name(table)),
        [version],
    )
    .map_err(exec_error)?;
    Ok(())
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
