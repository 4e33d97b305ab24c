use mysql::PooledConn;
use mysql::prelude::Queryable;
use tracing::debug;

use atlas_core::{
    Attr, Check, Column, Expr, ForeignKey, Index, IndexPart, InspectMode, InspectOptions,
    QualifiedName, Realm, ReferenceAction, Result, Schema, Table, View,
};

use crate::{exec_error, types};

const SCHEMAS_QUERY: &str = "\
SELECT schema_name, default_character_set_name, default_collation_name
  FROM information_schema.schemata
 WHERE schema_name NOT IN ('information_schema', 'mysql', 'performance_schema', 'sys')
 ORDER BY schema_name";

const TABLES_QUERY: &str = "\
SELECT table_name, engine, table_collation, table_comment, auto_increment
  FROM information_schema.tables
 WHERE table_schema = ? AND table_type = 'BASE TABLE'
 ORDER BY table_name";

const COLUMNS_QUERY: &str = "\
SELECT column_name, column_type, is_nullable, column_default, extra,
       column_comment, character_set_name, collation_name, column_key
  FROM information_schema.columns
 WHERE table_schema = ? AND table_name = ?
 ORDER BY ordinal_position";

const INDEXES_QUERY: &str = "\
SELECT index_name, non_unique, seq_in_index, column_name, collation
  FROM information_schema.statistics
 WHERE table_schema = ? AND table_name = ?
 ORDER BY index_name, seq_in_index";

const FOREIGN_KEYS_QUERY: &str = "\
SELECT kcu.constraint_name, kcu.column_name, kcu.referenced_table_schema,
       kcu.referenced_table_name, kcu.referenced_column_name,
       rc.update_rule, rc.delete_rule
  FROM information_schema.key_column_usage kcu
  JOIN information_schema.referential_constraints rc
    ON rc.constraint_name = kcu.constraint_name
   AND rc.constraint_schema = kcu.table_schema
 WHERE kcu.table_schema = ? AND kcu.table_name = ?
   AND kcu.referenced_table_name IS NOT NULL
 ORDER BY kcu.constraint_name, kcu.ordinal_position";

const CHECKS_QUERY: &str = "\
SELECT tc.constraint_name, cc.check_clause
  FROM information_schema.table_constraints tc
  JOIN information_schema.check_constraints cc
    ON cc.constraint_name = tc.constraint_name
 WHERE tc.constraint_type = 'CHECK' AND tc.table_schema = ? AND tc.table_name = ?
 ORDER BY tc.constraint_name";

const VIEWS_QUERY: &str = "\
SELECT table_name, view_definition
  FROM information_schema.views
 WHERE table_schema = ?
 ORDER BY table_name";

pub fn realm(conn: &mut PooledConn, opts: &InspectOptions) -> Result<Realm> {
    let rows: Vec<(String, String, String)> =
        conn.query(SCHEMAS_QUERY).map_err(exec_error)?;
    let mut realm = Realm::default();
    for (name, charset, collation) in rows {
        if !opts.schemas.is_empty() && !opts.schemas.contains(&name) {
            continue;
        }
        let mut schema = self::schema(conn, &name, opts)?;
        schema.attrs.push(Attr::Charset(charset));
        schema.attrs.push(Attr::Collation(collation));
        realm.schemas.push(schema);
    }
    Ok(realm)
}

pub fn schema(conn: &mut PooledConn, name: &str, opts: &InspectOptions) -> Result<Schema> {
    let mut schema = Schema::new(name);

    if opts.mode.contains(InspectMode::TABLES) {
        let rows: Vec<(String, Option<String>, Option<String>, String, Option<u64>)> = conn
            .exec(TABLES_QUERY, (name,))
            .map_err(exec_error)?;
        for (table_name, engine, collation, comment, auto_increment) in rows {
            if opts.excluded(&table_name) {
                continue;
            }
            let mut table = table(conn, name, &table_name, opts)?;
            if let Some(engine) = engine {
                table.attrs.push(Attr::Engine(engine));
            }
            if let Some(collation) = collation {
                table.attrs.push(Attr::Collation(collation));
            }
            if !comment.is_empty() {
                table.attrs.push(Attr::Comment(comment));
            }
            if let Some(auto_increment) = auto_increment
                && auto_increment > 1
            {
                table.attrs.push(Attr::AutoIncrementStart(auto_increment));
            }
            schema.tables.push(table);
        }
    }
    if opts.mode.contains(InspectMode::VIEWS) {
        let rows: Vec<(String, Option<String>)> =
            conn.exec(VIEWS_QUERY, (name,)).map_err(exec_error)?;
        for (view_name, def) in rows {
            if !opts.excluded(&view_name) {
                schema
                    .views
                    .push(View::new(view_name, def.unwrap_or_default()));
            }
        }
    }
    debug!(schema = name, tables = schema.tables.len(), "inspected mysql schema");
    Ok(schema)
}

fn table(
    conn: &mut PooledConn,
    schema_name: &str,
    name: &str,
    opts: &InspectOptions,
) -> Result<Table> {
    let mut table = Table::new(name);
    table.schema = Some(schema_name.to_string());

    let rows: Vec<(
        String,
        String,
        String,
        Option<String>,
        String,
        String,
        Option<String>,
        Option<String>,
        String,
    )> = conn
        .exec(COLUMNS_QUERY, (schema_name, name))
        .map_err(exec_error)?;
    for (
        column_name,
        column_type,
        is_nullable,
        default,
        extra,
        comment,
        charset,
        collation,
        _column_key,
    ) in rows
    {
        let mut ty = types::parse_type(&column_type);
        ty.nullable = is_nullable.eq_ignore_ascii_case("yes");
        let mut column = Column::new(&column_name, ty);
        if let Some(default) = default {
            column.default = Some(parse_default(&default, &extra));
        }
        let extra_lower = extra.to_ascii_lowercase();
        if extra_lower.contains("auto_increment") {
            column.attrs.push(Attr::AutoIncrement);
        }
        if let Some(at) = extra_lower.find("on update") {
            let expr = extra[at + "on update".len()..].trim();
            column.attrs.push(Attr::OnUpdate(expr.to_string()));
        }
        if !comment.is_empty() {
            column.attrs.push(Attr::Comment(comment));
        }
        if let Some(charset) = charset {
            column.attrs.push(Attr::Charset(charset));
        }
        if let Some(collation) = collation {
            column.attrs.push(Attr::Collation(collation));
        }
        table.columns.push(column);
    }

    if opts.mode.contains(InspectMode::INDEXES) {
        let (primary, indexes) = self::indexes(conn, schema_name, name)?;
        table.primary_key = primary;
        table.indexes = indexes;
    }
    if opts.mode.contains(InspectMode::FOREIGN_KEYS) {
        table.foreign_keys = foreign_keys(conn, schema_name, name)?;
    }
    if opts.mode.contains(InspectMode::CHECKS) {
        let rows: Vec<(String, String)> = conn
            .exec(CHECKS_QUERY, (schema_name, name))
            .map_err(exec_error)?;
        for (check_name, clause) in rows {
            table.checks.push(Check::new(check_name, clause));
        }
    }
    Ok(table)
}

fn indexes(
    conn: &mut PooledConn,
    schema_name: &str,
    table: &str,
) -> Result<(Option<Index>, Vec<Index>)> {
    let rows: Vec<(String, i64, i64, Option<String>, Option<String>)> = conn
        .exec(INDEXES_QUERY, (schema_name, table))
        .map_err(exec_error)?;

    let mut primary: Option<Index> = None;
    let mut indexes: Vec<Index> = Vec::new();
    for (index_name, non_unique, _seq, column, collation) in rows {
        let mut part = match column {
            Some(column) => IndexPart::column(column),
            None => IndexPart::expr(""),
        };
        part.desc = collation.as_deref() == Some("D");

        if index_name == "PRIMARY" {
            let pk = primary.get_or_insert_with(|| Index::new("PRIMARY").unique());
            pk.parts.push(part);
            continue;
        }
        match indexes.iter_mut().find(|i| i.name == index_name) {
            Some(existing) => existing.parts.push(part),
            None => {
                let mut index = Index::new(&index_name);
                index.unique = non_unique == 0;
                index.parts.push(part);
                indexes.push(index);
            }
        }
    }
    indexes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok((primary, indexes))
}

fn foreign_keys(conn: &mut PooledConn, schema_name: &str, table: &str) -> Result<Vec<ForeignKey>> {
    let rows: Vec<(String, String, String, String, String, String, String)> = conn
        .exec(FOREIGN_KEYS_QUERY, (schema_name, table))
        .map_err(exec_error)?;

    let mut out: Vec<ForeignKey> = Vec::new();
    for (symbol, column, ref_schema, ref_table, ref_column, update_rule, delete_rule) in rows {
        match out.iter_mut().find(|fk| fk.symbol == symbol) {
            Some(fk) => {
                fk.columns.push(column);
                fk.ref_columns.push(ref_column);
            }
            None => {
                let mut fk = ForeignKey::new(
                    symbol,
                    QualifiedName::new(Some(&ref_schema), &ref_table),
                );
                fk.columns.push(column);
                fk.ref_columns.push(ref_column);
                fk.on_update = reference_action(&update_rule);
                fk.on_delete = reference_action(&delete_rule);
                out.push(fk);
            }
        }
    }
    out.sort_by(|a, b| a.symbol.cmp(&b.symbol));
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

/// MySQL reports expression defaults with the `DEFAULT_GENERATED` marker
/// in `extra`; everything else is a literal.
fn parse_default(raw: &str, extra: &str) -> Expr {
    if extra.to_ascii_uppercase().contains("DEFAULT_GENERATED") {
        Expr::Raw(raw.to_string())
    } else if raw.eq_ignore_ascii_case("current_timestamp")
        || raw.to_ascii_lowercase().starts_with("current_timestamp(")
    {
        Expr::Raw(raw.to_string())
    } else {
        Expr::Literal(raw.to_string())
    }
}
