use postgres::Client;
use tracing::debug;

use atlas_core::{
    Attr, Check, Column, EnumType, Expr, ForeignKey, Index, IndexPart, InspectMode,
    InspectOptions, QualifiedName, Realm, ReferenceAction, Result, Schema, Sequence, Table,
    TypeKind, View,
};

use crate::{exec_error, types};

const SCHEMAS_QUERY: &str = "\
SELECT schema_name FROM information_schema.schemata
 WHERE schema_name NOT IN ('information_schema', 'pg_catalog', 'pg_toast')
 ORDER BY schema_name";

const TABLES_QUERY: &str = "\
SELECT table_name FROM information_schema.tables
 WHERE table_schema = $1 AND table_type = 'BASE TABLE'
 ORDER BY table_name";

const COLUMNS_QUERY: &str = "\
SELECT column_name, data_type, udt_name, is_nullable, column_default,
       character_maximum_length, numeric_precision, numeric_scale,
       is_identity, identity_generation
  FROM information_schema.columns
 WHERE table_schema = $1 AND table_name = $2
 ORDER BY ordinal_position";

const INDEXES_QUERY: &str = "\
SELECT i.relname, ix.indisunique, ix.indisprimary, a.attname, k.ord::int,
       am.amname
  FROM pg_class t
  JOIN pg_namespace n ON n.oid = t.relnamespace
  JOIN pg_index ix ON t.oid = ix.indrelid
  JOIN pg_class i ON i.oid = ix.indexrelid
  JOIN pg_am am ON am.oid = i.relam
 CROSS JOIN LATERAL unnest(ix.indkey) WITH ORDINALITY AS k(attnum, ord)
  LEFT JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum
 WHERE n.nspname = $1 AND t.relname = $2
 ORDER BY i.relname, k.ord";

const FOREIGN_KEYS_QUERY: &str = "\
SELECT tc.constraint_name, kcu.column_name, ccu.table_schema, ccu.table_name,
       ccu.column_name, rc.update_rule, rc.delete_rule, kcu.ordinal_position::int
  FROM information_schema.table_constraints tc
  JOIN information_schema.key_column_usage kcu
    ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema
  JOIN information_schema.referential_constraints rc
    ON rc.constraint_name = tc.constraint_name AND rc.constraint_schema = tc.table_schema
  JOIN information_schema.constraint_column_usage ccu
    ON ccu.constraint_name = tc.constraint_name AND ccu.constraint_schema = tc.table_schema
 WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = $1 AND tc.table_name = $2
 ORDER BY tc.constraint_name, kcu.ordinal_position";

const CHECKS_QUERY: &str = "\
SELECT tc.constraint_name, cc.check_clause
  FROM information_schema.table_constraints tc
  JOIN information_schema.check_constraints cc
    ON cc.constraint_name = tc.constraint_name AND cc.constraint_schema = tc.table_schema
 WHERE tc.constraint_type = 'CHECK' AND tc.table_schema = $1 AND tc.table_name = $2
   AND tc.constraint_name NOT LIKE '%_not_null'
 ORDER BY tc.constraint_name";

const ENUMS_QUERY: &str = "\
SELECT t.typname, e.enumlabel
  FROM pg_type t
  JOIN pg_enum e ON t.oid = e.enumtypid
  JOIN pg_namespace n ON n.oid = t.typnamespace
 WHERE n.nspname = $1
 ORDER BY t.typname, e.enumsortorder";

const VIEWS_QUERY: &str = "\
SELECT table_name, view_definition
  FROM information_schema.views
 WHERE table_schema = $1
 ORDER BY table_name";

const SEQUENCES_QUERY: &str = "\
SELECT sequence_name, start_value::bigint, increment::bigint,
       minimum_value::bigint, maximum_value::bigint, cycle_option
  FROM information_schema.sequences
 WHERE sequence_schema = $1
 ORDER BY sequence_name";

pub fn realm(client: &mut Client, opts: &InspectOptions) -> Result<Realm> {
    let rows = client.query(SCHEMAS_QUERY, &[]).map_err(exec_error)?;
    let mut realm = Realm::default();
    for row in rows {
        let name: String = row.get(0);
        if !opts.schemas.is_empty() && !opts.schemas.contains(&name) {
            continue;
        }
        realm.schemas.push(schema(client, &name, opts)?);
    }
    Ok(realm)
}

pub fn schema(client: &mut Client, name: &str, opts: &InspectOptions) -> Result<Schema> {
    let mut schema = Schema::new(name);

    if opts.mode.contains(InspectMode::ENUMS) {
        schema.enums = enums(client, name)?;
    }
    if opts.mode.contains(InspectMode::SEQUENCES) {
        schema.sequences = sequences(client, name)?;
    }
    if opts.mode.contains(InspectMode::TABLES) {
        let enums = schema.enums.clone();
        let rows = client.query(TABLES_QUERY, &[&name]).map_err(exec_error)?;
        for row in rows {
            let table_name: String = row.get(0);
            if opts.excluded(&table_name) {
                continue;
            }
            schema
                .tables
                .push(table(client, name, &table_name, &enums, opts)?);
        }
    }
    if opts.mode.contains(InspectMode::VIEWS) {
        let rows = client.query(VIEWS_QUERY, &[&name]).map_err(exec_error)?;
        for row in rows {
            let view_name: String = row.get(0);
            let def: Option<String> = row.get(1);
            if !opts.excluded(&view_name) {
                schema
                    .views
                    .push(View::new(view_name, def.unwrap_or_default()));
            }
        }
    }
    debug!(schema = name, tables = schema.tables.len(), "inspected postgres schema");
    Ok(schema)
}

fn table(
    client: &mut Client,
    schema_name: &str,
    name: &str,
    enums: &[EnumType],
    opts: &InspectOptions,
) -> Result<Table> {
    let mut table = Table::new(name);
    table.schema = Some(schema_name.to_string());

    let rows = client
        .query(COLUMNS_QUERY, &[&schema_name, &name])
        .map_err(exec_error)?;
    for row in rows {
        let column_name: String = row.get(0);
        let data_type: String = row.get(1);
        let udt_name: String = row.get(2);
        let is_nullable: String = row.get(3);
        let default: Option<String> = row.get(4);
        let is_identity: String = row.get(8);
        let identity_generation: Option<String> = row.get(9);

        // USER-DEFINED columns carry their real type in udt_name; enum
        // references resolve to the values owned by the schema.
        let mut ty = if data_type.eq_ignore_ascii_case("user-defined") {
            match enums.iter().find(|e| e.name == udt_name) {
                Some(e) => {
                    let mut ct = types::parse_type(&udt_name);
                    ct.kind = TypeKind::Enum {
                        name: Some(e.name.clone()),
                        values: e.values.clone(),
                    };
                    ct
                }
                None => types::parse_type(&udt_name),
            }
        } else if data_type.eq_ignore_ascii_case("array") {
            types::parse_type(&format!("{}[]", udt_name.trim_start_matches('_')))
        } else {
            types::parse_type(&data_type)
        };
        ty.nullable = is_nullable.eq_ignore_ascii_case("yes");

        let mut column = Column::new(&column_name, ty);
        if let Some(default) = default {
            column.default = Some(parse_default(&default));
        }
        if is_identity.eq_ignore_ascii_case("yes") {
            column.attrs.push(Attr::Identity {
                always: identity_generation.as_deref() == Some("ALWAYS"),
            });
        }
        table.columns.push(column);
    }

    if opts.mode.contains(InspectMode::INDEXES) {
        let (primary, indexes) = self::indexes(client, schema_name, name)?;
        table.primary_key = primary;
        table.indexes = indexes;
    }
    if opts.mode.contains(InspectMode::FOREIGN_KEYS) {
        table.foreign_keys = foreign_keys(client, schema_name, name)?;
    }
    if opts.mode.contains(InspectMode::CHECKS) {
        let rows = client
            .query(CHECKS_QUERY, &[&schema_name, &name])
            .map_err(exec_error)?;
        for row in rows {
            let check_name: String = row.get(0);
            let clause: String = row.get(1);
            table.checks.push(Check::new(check_name, clause));
        }
    }
    Ok(table)
}

fn indexes(
    client: &mut Client,
    schema_name: &str,
    table: &str,
) -> Result<(Option<Index>, Vec<Index>)> {
    let rows = client
        .query(INDEXES_QUERY, &[&schema_name, &table])
        .map_err(exec_error)?;

    let mut primary: Option<Index> = None;
    let mut indexes: Vec<Index> = Vec::new();
    for row in rows {
        let index_name: String = row.get(0);
        let unique: bool = row.get(1);
        let is_primary: bool = row.get(2);
        let column: Option<String> = row.get(3);
        let method: String = row.get(5);

        let part = match column {
            Some(column) => IndexPart::column(column),
            // attnum 0: an expression part; its text lives in
            // pg_get_indexdef and is compared as opaque.
            None => IndexPart::expr(""),
        };

        if is_primary {
            let pk = primary.get_or_insert_with(|| {
                let mut index = Index::new(&index_name);
                index.unique = true;
                index
            });
            pk.parts.push(part);
            continue;
        }

        match indexes.iter_mut().find(|i| i.name == index_name) {
            Some(existing) => existing.parts.push(part),
            None => {
                let mut index = Index::new(&index_name);
                index.unique = unique;
                if method != "btree" {
                    index.attrs.push(Attr::IndexType(method));
                }
                index.parts.push(part);
                indexes.push(index);
            }
        }
    }
    indexes.sort_by(|a, b| a.name.cmp(&b.name));
    Ok((primary, indexes))
}

fn foreign_keys(client: &mut Client, schema_name: &str, table: &str) -> Result<Vec<ForeignKey>> {
    let rows = client
        .query(FOREIGN_KEYS_QUERY, &[&schema_name, &table])
        .map_err(exec_error)?;

    let mut out: Vec<ForeignKey> = Vec::new();
    for row in rows {
        let symbol: String = row.get(0);
        let column: String = row.get(1);
        let ref_schema: String = row.get(2);
        let ref_table: String = row.get(3);
        let ref_column: String = row.get(4);
        let update_rule: String = row.get(5);
        let delete_rule: String = row.get(6);

        match out.iter_mut().find(|fk| fk.symbol == symbol) {
            Some(fk) => {
                if !fk.columns.contains(&column) {
                    fk.columns.push(column);
                }
                if !fk.ref_columns.contains(&ref_column) {
                    fk.ref_columns.push(ref_column);
                }
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

fn enums(client: &mut Client, schema_name: &str) -> Result<Vec<EnumType>> {
    let rows = client
        .query(ENUMS_QUERY, &[&schema_name])
        .map_err(exec_error)?;
    let mut out: Vec<EnumType> = Vec::new();
    for row in rows {
        let type_name: String = row.get(0);
        let label: String = row.get(1);
        match out.iter_mut().find(|e| e.name == type_name) {
            Some(existing) => existing.values.push(label),
            None => out.push(EnumType::new(type_name, vec![label])),
        }
    }
    Ok(out)
}

fn sequences(client: &mut Client, schema_name: &str) -> Result<Vec<Sequence>> {
    let rows = client
        .query(SEQUENCES_QUERY, &[&schema_name])
        .map_err(exec_error)?;
    let mut out = Vec::new();
    for row in rows {
        let name: String = row.get(0);
        let mut sequence = Sequence::new(name);
        sequence.start = row.get(1);
        sequence.increment = row.get(2);
        sequence.min_value = Some(row.get(3));
        sequence.max_value = Some(row.get(4));
        let cycle: String = row.get(5);
        sequence.cycle = cycle.eq_ignore_ascii_case("yes");
        out.push(sequence);
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

/// Catalog defaults come back as expressions, often with a cast appended
/// (`'x'::character varying`). Strip the cast so the differ compares what
/// the user wrote.
fn parse_default(raw: &str) -> Expr {
    let trimmed = raw.trim();
    let without_cast = trimmed.split("::").next().unwrap_or(trimmed).trim();
    if without_cast.starts_with('\'') && without_cast.ends_with('\'') {
        return Expr::Literal(without_cast.trim_matches('\'').to_string());
    }
    if without_cast.parse::<f64>().is_ok() {
        return Expr::Literal(without_cast.to_string());
    }
    Expr::Raw(without_cast.to_string())
}
