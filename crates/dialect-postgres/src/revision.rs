use chrono::{DateTime, Utc};
use postgres::Client;

use atlas_core::{
    Result,
    migrate::{Revision, RevisionKind, RevisionTable},
};

use crate::{exec_error, quote, quote_qualified};

fn table_name(table: &RevisionTable, default_schema: &str) -> String {
    let schema = table.schema.as_deref().unwrap_or(default_schema);
    quote_qualified(Some(schema), &table.name)
}

pub fn ensure(client: &mut Client, table: &RevisionTable, default_schema: &str) -> Result<()> {
    if let Some(schema) = &table.schema {
        client
            .batch_execute(&format!("CREATE SCHEMA IF NOT EXISTS {}", quote(schema)))
            .map_err(exec_error)?;
    }
    client
        .batch_execute(&format!(
            "CREATE TABLE IF NOT EXISTS {} (
  version text NOT NULL PRIMARY KEY,
  description text NOT NULL,
  type text NOT NULL,
  applied bigint NOT NULL,
  total bigint NOT NULL,
  executed_at timestamptz NOT NULL,
  execution_time interval NOT NULL,
  error text,
  error_stmt text,
  hash text NOT NULL,
  partial_hashes jsonb NOT NULL DEFAULT '[]',
  operator_version text NOT NULL
)",
            table_name(table, default_schema)
        ))
        .map_err(exec_error)
}

pub fn read_all(
    client: &mut Client,
    table: &RevisionTable,
    default_schema: &str,
) -> Result<Vec<Revision>> {
    let sql = format!(
        "SELECT version, description, type, applied, total, executed_at,
        (extract(epoch FROM execution_time) * 1000)::bigint,
        error, error_stmt, hash, partial_hashes::text, operator_version
   FROM {} ORDER BY version",
        table_name(table, default_schema)
    );
    let rows = client.query(sql.as_str(), &[]).map_err(exec_error)?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let executed_at: DateTime<Utc> = row.get(5);
        let kind: String = row.get(2);
        let partial_hashes: String = row.get(10);
        out.push(Revision {
            version: row.get(0),
            description: row.get(1),
            kind: RevisionKind::parse(&kind),
            applied: row.get::<_, i64>(3) as usize,
            total: row.get::<_, i64>(4) as usize,
            executed_at,
            execution_time_ms: row.get::<_, i64>(6) as u64,
            error: row.get(7),
            error_stmt: row.get(8),
            hash: row.get(9),
            partial_hashes: serde_json::from_str(&partial_hashes).unwrap_or_default(),
            operator_version: row.get(11),
        });
    }
    Ok(out)
}

pub fn write(
    client: &mut Client,
    table: &RevisionTable,
    rev: &Revision,
    default_schema: &str,
) -> Result<()> {
    let partial = serde_json::to_string(&rev.partial_hashes).unwrap_or_else(|_| "[]".to_string());
    let sql = format!(
        "INSERT INTO {} (version, description, type, applied, total, executed_at,
        execution_time, error, error_stmt, hash, partial_hashes, operator_version)
VALUES ($1, $2, $3, $4, $5, $6, make_interval(secs => $7::double precision / 1000),
        $8, $9, $10, $11::jsonb, $12)
ON CONFLICT (version) DO UPDATE SET
        description = excluded.description,
        type = excluded.type,
        applied = excluded.applied,
        total = excluded.total,
        executed_at = excluded.executed_at,
        execution_time = excluded.execution_time,
        error = excluded.error,
        error_stmt = excluded.error_stmt,
        hash = excluded.hash,
        partial_hashes = excluded.partial_hashes,
        operator_version = excluded.operator_version",
        table_name(table, default_schema)
    );
    client
        .execute(
            sql.as_str(),
            &[
                &rev.version,
                &rev.description,
                &rev.kind.as_str(),
                &(rev.applied as i64),
                &(rev.total as i64),
                &rev.executed_at,
                &(rev.execution_time_ms as i64),
                &rev.error,
                &rev.error_stmt,
                &rev.hash,
                &partial,
                &rev.operator_version,
            ],
        )
        .map_err(exec_error)?;
    Ok(())
}

pub fn delete(
    client: &mut Client,
    table: &RevisionTable,
    version: &str,
    default_schema: &str,
) -> Result<()> {
    let sql = format!(
        "DELETE FROM {} WHERE version = $1",
        table_name(table, default_schema)
    );
    client
        .execute(sql.as_str(), &[&version])
        .map_err(exec_error)?;
    Ok(())
}
