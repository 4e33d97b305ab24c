use rusqlite::Connection;
use sqlparser::ast;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use atlas_core::{
    Attr, Check, Column, Expr, ForeignKey, Index, IndexPart, InspectMode, InspectOptions,
    QualifiedName, ReferenceAction, Result, Schema, Table, Trigger, View,
};

use crate::{exec_error, types};

/// Assemble the model for one attached database. Objects come out in
/// deterministic order: tables and indexes alphabetically, columns by
/// their ordinal position in `pragma table_info`.
pub fn schema(conn: &Connection, name: &str, opts: &InspectOptions) -> Result<Schema> {
    let mut schema = Schema::new(name);

    if opts.mode.contains(InspectMode::TABLES) {
        for table_name in object_names(conn, "table")? {
            if table_name.starts_with("sqlite_") || opts.excluded(&table_name) {
                continue;
            }
            schema.tables.push(table(conn, name, &table_name, opts)?);
        }
    }
    if opts.mode.contains(InspectMode::VIEWS) {
        for view_name in object_names(conn, "view")? {
            if opts.excluded(&view_name) {
                continue;
            }
            let def = object_sql(conn, &view_name)?.unwrap_or_default();
            schema.views.push(View::new(view_name, def));
        }
    }
    debug!(schema = %name, tables = schema.tables.len(), "inspected sqlite schema");
    Ok(schema)
}

fn object_names(conn: &Connection, kind: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")
        .map_err(exec_error)?;
    let names = stmt
        .query_map([kind], |row| row.get::<_, String>(0))
        .map_err(exec_error)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(exec_error)?;
    Ok(names)
}

fn object_sql(conn: &Connection, name: &str) -> Result<Option<String>> {
    let mut stmt = conn
        .prepare("SELECT sql FROM sqlite_master WHERE name = ?1")
        .map_err(exec_error)?;
    let mut rows = stmt
        .query_map([name], |row| row.get::<_, Option<String>>(0))
        .map_err(exec_error)?;
    match rows.next() {
        Some(row) => Ok(row.map_err(exec_error)?),
        None => Ok(None),
    }
}

fn table(
    conn: &Connection,
    schema_name: &str,
    name: &str,
    opts: &InspectOptions,
) -> Result<Table> {
    let mut table = Table::new(name);
    table.schema = Some(schema_name.to_string());

    let mut pk_columns: Vec<(i64, String)> = Vec::new();
    {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", crate::quote(name)))
            .map_err(exec_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, i64>(5)?,
                ))
            })
            .map_err(exec_error)?;
        for row in rows {
            let (col_name, raw_type, not_null, default, pk) = row.map_err(exec_error)?;
            let mut ty = types::parse_type(&raw_type);
            ty.nullable = not_null == 0 && pk == 0;
            let mut column = Column::new(&col_name, ty);
            if let Some(default) = default {
                column.default = Some(parse_default(&default));
            }
            if pk > 0 {
                pk_columns.push((pk, col_name.clone()));
                if has_autoincrement(conn, name)? {
                    column.attrs.push(Attr::AutoIncrement);
                }
            }
            table.columns.push(column);
        }
    }
    if !pk_columns.is_empty() {
        pk_columns.sort_by_key(|(ordinal, _)| *ordinal);
        table.primary_key = Some(
            Index::new("")
                .unique()
                .on_columns(pk_columns.into_iter().map(|(_, c)| c)),
        );
    }

    if opts.mode.contains(InspectMode::INDEXES) {
        table.indexes = indexes(conn, name)?;
    }
    if opts.mode.contains(InspectMode::FOREIGN_KEYS) {
        table.foreign_keys = foreign_keys(conn, schema_name, name)?;
    }
    if opts.mode.contains(InspectMode::CHECKS)
        && let Some(sql) = object_sql(conn, name)?
    {
        table.checks = parse_checks(&sql);
    }
    if opts.mode.contains(InspectMode::TRIGGERS) {
        table.triggers = triggers(conn, name)?;
    }
    Ok(table)
}

/// AUTOINCREMENT is only legal on the single INTEGER PRIMARY KEY column,
/// so its presence in the stored definition identifies that column.
fn has_autoincrement(conn: &Connection, table: &str) -> Result<bool> {
    let Some(sql) = object_sql(conn, table)? else {
        return Ok(false);
    };
    Ok(sql.to_ascii_uppercase().contains("AUTOINCREMENT"))
}

fn indexes(conn: &Connection, table: &str) -> Result<Vec<Index>> {
    let mut out = Vec::new();
    let mut stmt = conn
        .prepare(&format!("PRAGMA index_list({})", crate::quote(table)))
        .map_err(exec_error)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })
        .map_err(exec_error)?;
    for row in rows {
        let (index_name, unique, origin) = row.map_err(exec_error)?;
        // "c"-origin rows are explicit CREATE INDEX statements; "pk" and
        // "u" rows are modeled through the primary key and constraints.
        if origin != "c" {
            continue;
        }
        let mut index = Index::new(&index_name);
        index.unique = unique == 1;
        let mut part_stmt = conn
            .prepare(&format!("PRAGMA index_info({})", crate::quote(&index_name)))
            .map_err(exec_error)?;
        let part_rows = part_stmt
            .query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(2)?))
            })
            .map_err(exec_error)?;
        let mut parts: Vec<(i64, Option<String>)> = part_rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(exec_error)?;
        parts.sort_by_key(|(seq, _)| *seq);
        for (_, column) in parts {
            index.parts.push(match column {
                Some(column) => IndexPart::column(column),
                // A NULL column name marks an expression part; the text
                // lives only in sqlite_master.
                None => IndexPart::expr(""),
            });
        }
        out.push(index);
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(out)
}

fn foreign_keys(conn: &Connection, schema_name: &str, table: &str) -> Result<Vec<ForeignKey>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA foreign_key_list({})", crate::quote(table)))
        .map_err(exec_error)?;
    let rows = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })
        .map_err(exec_error)?;

    let mut grouped: Vec<(i64, ForeignKey)> = Vec::new();
    for row in rows {
        let (id, ref_table, from, to, on_update, on_delete) = row.map_err(exec_error)?;
        let entry = grouped.iter_mut().find(|(gid, _)| *gid == id);
        match entry {
            Some((_, fk)) => {
                fk.columns.push(from);
                if let Some(to) = to {
                    fk.ref_columns.push(to);
                }
            }
            None => {
                let mut fk = ForeignKey::new(
                    format!("{table}_fk_{id}"),
                    QualifiedName::new(Some(schema_name), &ref_table),
                );
                fk.columns.push(from);
                if let Some(to) = to {
                    fk.ref_columns.push(to);
                }
                fk.on_update = reference_action(&on_update);
                fk.on_delete = reference_action(&on_delete);
                grouped.push((id, fk));
            }
        }
    }
    grouped.sort_by_key(|(id, _)| *id);
    Ok(grouped.into_iter().map(|(_, fk)| fk).collect())
}

fn triggers(conn: &Connection, table: &str) -> Result<Vec<Trigger>> {
    let mut stmt = conn
        .prepare("SELECT name, sql FROM sqlite_master WHERE type = 'trigger' AND tbl_name = ?1 ORDER BY name")
        .map_err(exec_error)?;
    let rows = stmt
        .query_map([table], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
        })
        .map_err(exec_error)?;
    let mut out = Vec::new();
    for row in rows {
        let (name, sql) = row.map_err(exec_error)?;
        out.push(Trigger {
            name,
            table: table.to_string(),
            def: sql.unwrap_or_default(),
        });
    }
    Ok(out)
}

fn reference_action(raw: &str) -> ReferenceAction {
    match raw {
        "RESTRICT" => ReferenceAction::Restrict,
        "CASCADE" => ReferenceAction::Cascade,
        "SET NULL" => ReferenceAction::SetNull,
        "SET DEFAULT" => ReferenceAction::SetDefault,
        _ => ReferenceAction::NoAction,
    }
}

/// Defaults come back as the literal text from the table definition.
/// Quoted strings and plain numbers are literals; everything else is a
/// raw expression.
fn parse_default(raw: &str) -> Expr {
    let trimmed = raw.trim();
    if trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        return Expr::Literal(trimmed.trim_matches('\'').to_string());
    }
    if trimmed.parse::<f64>().is_ok() {
        return Expr::Literal(trimmed.to_string());
    }
    Expr::Raw(trimmed.to_string())
}

/// Check constraints only exist in the stored CREATE TABLE text, so parse
/// it. An unparsable definition yields no checks rather than an error.
fn parse_checks(sql: &str) -> Vec<Check> {
    let Ok(stmts) = Parser::parse_sql(&SQLiteDialect {}, sql) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for stmt in stmts {
        let ast::Statement::CreateTable(create) = stmt else {
            continue;
        };
        let mut unnamed = 0usize;
        for constraint in &create.constraints {
            if let ast::TableConstraint::Check { name, expr, .. } = constraint {
                let check_name = match name {
                    Some(name) => name.value.clone(),
                    None => {
                        unnamed += 1;
                        format!("check_{unnamed}")
                    }
                };
                out.push(Check::new(check_name, expr.to_string()));
            }
        }
        for column in &create.columns {
            for option in &column.options {
                if let ast::ColumnOption::Check(expr) = &option.option {
                    unnamed += 1;
                    out.push(Check::new(format!("check_{unnamed}"), expr.to_string()));
                }
            }
        }
    }
    out
}

/// Current definition of one table, used by the planner's rebuild path.
pub fn current_table(conn: &Connection, name: &str) -> Result<Option<Table>> {
    let names = object_names(conn, "table")?;
    if !names.iter().any(|n| n == name) {
        return Ok(None);
    }
    table(conn, "main", name, &InspectOptions::default()).map(Some)
}
