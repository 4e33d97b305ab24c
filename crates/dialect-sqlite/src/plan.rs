use std::collections::BTreeSet;
use std::fmt::Write as _;

use rusqlite::Connection;

use atlas_core::{
    Attr, Change, Column, Expr, Index, IndexKey, Plan, PlanChange, PlanError, PlanKind,
    PlanOptions, QualifiedName, Result, Table, TypeKind,
};

use crate::{DIALECT_NAME, inspect, quote, types};

/// Build a plan for SQLite. Changes the dialect's ALTER TABLE cannot
/// express are grouped per table and planned as a rebuild: create `new_X`
/// with the desired definition, copy the surviving rows, drop `X`, rename
/// `new_X` into place.
pub fn plan_changes(
    conn: &Connection,
    name: &str,
    changes: &[Change],
    _opts: &PlanOptions,
) -> Result<Plan> {
    let mut plan = Plan::new(name, true);
    let mut created: BTreeSet<String> = BTreeSet::new();
    let mut index = 0usize;

    while index < changes.len() {
        if let Some(table) = rebuild_target(&changes[index]) {
            let start = index;
            while index < changes.len() && rebuild_target(&changes[index]).as_ref() == Some(&table)
            {
                index += 1;
            }
            push_rebuild(conn, &table, &changes[start..index], &mut plan)?;
            continue;
        }
        push_simple(conn, &changes[index], &mut created, &mut plan)?;
        index += 1;
    }
    Ok(plan)
}

/// Changes that force the rebuild pattern on this dialect.
fn rebuild_target(change: &Change) -> Option<QualifiedName> {
    match change {
        Change::ModifyColumn { table, .. }
        | Change::DropColumn { table, .. }
        | Change::AddCheck { table, .. }
        | Change::DropCheck { table, .. }
        | Change::ModifyCheck { table, .. }
        | Change::ModifyForeignKey { table, .. }
        | Change::DropForeignKey { table, .. }
        | Change::SetPrimaryKey { table, .. }
        | Change::DropPrimaryKey { table } => Some(table.clone()),
        _ => None,
    }
}

fn push_simple(
    conn: &Connection,
    change: &Change,
    created: &mut BTreeSet<String>,
    plan: &mut Plan,
) -> Result<()> {
    match change {
        Change::AddTable(table) => {
            created.insert(table.name.clone());
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    create_table_sql(table)?,
                    format!("create {:?} table", table.name),
                )
                .with_reverse(format!("DROP TABLE {}", quote(&table.name))),
            );
        }
        Change::DropTable(name) => {
            // Dropping a table loses its rows; no single statement brings
            // them back.
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!("DROP TABLE {}", quote(&name.name)),
                format!("drop {:?} table", name.name),
            ));
        }
        Change::RenameTable { from, to } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Rename,
                    format!(
                        "ALTER TABLE {} RENAME TO {}",
                        quote(&from.name),
                        quote(&to.name)
                    ),
                    format!("rename table {:?} to {:?}", from.name, to.name),
                )
                .with_reverse(format!(
                    "ALTER TABLE {} RENAME TO {}",
                    quote(&to.name),
                    quote(&from.name)
                )),
            );
        }
        Change::AddColumn { table, column } => {
            let mut change = PlanChange::new(
                PlanKind::Alter,
                format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    quote(&table.name),
                    column_def(column, false)?
                ),
                format!("add column {:?} to table: {:?}", column.name, table.name),
            );
            // A non-nullable column without a default cannot be recreated
            // with the rows it will reject.
            if column.ty.nullable || column.default.is_some() {
                change = change.with_reverse(format!(
                    "ALTER TABLE {} DROP COLUMN {}",
                    quote(&table.name),
                    quote(&column.name)
                ));
            }
            plan.push(change);
        }
        Change::RenameColumn { table, from, to } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Rename,
                    format!(
                        "ALTER TABLE {} RENAME COLUMN {} TO {}",
                        quote(&table.name),
                        quote(from),
                        quote(to)
                    ),
                    format!("rename column {from:?} to {to:?} in table: {:?}", table.name),
                )
                .with_reverse(format!(
                    "ALTER TABLE {} RENAME COLUMN {} TO {}",
                    quote(&table.name),
                    quote(to),
                    quote(from)
                )),
            );
        }
        Change::AddIndex { table, index } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    create_index_sql(&table.name, index),
                    format!("create index {:?} to table: {:?}", index.name, table.name),
                )
                .with_reverse(format!("DROP INDEX {}", quote(&index.name))),
            );
        }
        Change::DropIndex { table, index } => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!("DROP INDEX {}", quote(index)),
                format!("drop index {index:?} from table: {:?}", table.name),
            ));
        }
        Change::ModifyIndex { table, from, to, .. } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Drop,
                    format!("DROP INDEX {}", quote(&from.name)),
                    format!("drop index {:?} from table: {:?}", from.name, table.name),
                )
                .with_reverse(create_index_sql(&table.name, from)),
            );
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    create_index_sql(&table.name, to),
                    format!("create index {:?} to table: {:?}", to.name, table.name),
                )
                .with_reverse(format!("DROP INDEX {}", quote(&to.name))),
            );
        }
        Change::RenameIndex { table, from, to } => {
            // No rename verb on this dialect: recreate under the new name
            // from the current definition.
            let current = inspect::current_table(conn, &table.name)?
                .and_then(|t| t.index(from).cloned())
                .ok_or_else(|| PlanError {
                    dialect: DIALECT_NAME,
                    change: change.tag().to_string(),
                    reason: format!("index {from:?} not found on table {:?}", table.name),
                })?;
            let mut renamed = current.clone();
            renamed.name = to.clone();
            plan.push(
                PlanChange::new(
                    PlanKind::Drop,
                    format!("DROP INDEX {}", quote(from)),
                    format!("drop index {from:?} from table: {:?}", table.name),
                )
                .with_reverse(create_index_sql(&table.name, &current)),
            );
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    create_index_sql(&table.name, &renamed),
                    format!("create index {to:?} to table: {:?}", table.name),
                )
                .with_reverse(format!("DROP INDEX {}", quote(to))),
            );
        }
        Change::AddForeignKey { table, .. } => {
            // Inlined into CREATE TABLE when the table is created in this
            // plan; otherwise the constraint requires a rebuild.
            if !created.contains(&table.name) {
                return push_rebuild(conn, table, std::slice::from_ref(change), plan);
            }
        }
        Change::AddView { view, .. } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    format!("CREATE VIEW {} AS {}", quote(&view.name), view.def),
                    format!("create {:?} view", view.name),
                )
                .with_reverse(format!("DROP VIEW {}", quote(&view.name))),
            );
        }
        Change::DropView(name) => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!("DROP VIEW {}", quote(&name.name)),
                format!("drop {:?} view", name.name),
            ));
        }
        Change::ModifyView { view, from, to, .. } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Drop,
                    format!("DROP VIEW {}", quote(&view.name)),
                    format!("drop {:?} view", view.name),
                )
                .with_reverse(format!("CREATE VIEW {} AS {}", quote(&view.name), from.def)),
            );
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    format!("CREATE VIEW {} AS {}", quote(&view.name), to.def),
                    format!("create {:?} view", view.name),
                )
                .with_reverse(format!("DROP VIEW {}", quote(&view.name))),
            );
        }
        Change::AddTrigger { trigger, .. } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    trigger.def.clone(),
                    format!("create trigger {:?}", trigger.name),
                )
                .with_reverse(format!("DROP TRIGGER {}", quote(&trigger.name))),
            );
        }
        Change::DropTrigger { name, .. } => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!("DROP TRIGGER {}", quote(name)),
                format!("drop trigger {name:?}"),
            ));
        }
        Change::ModifyTrigger { from, to, .. } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Drop,
                    format!("DROP TRIGGER {}", quote(&from.name)),
                    format!("drop trigger {:?}", from.name),
                )
                .with_reverse(from.def.clone()),
            );
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    to.def.clone(),
                    format!("create trigger {:?}", to.name),
                )
                .with_reverse(format!("DROP TRIGGER {}", quote(&to.name))),
            );
        }
        unsupported => {
            return Err(PlanError {
                dialect: DIALECT_NAME,
                change: unsupported.tag().to_string(),
                reason: "not expressible on sqlite".to_string(),
            }
            .into());
        }
    }
    Ok(())
}

fn push_rebuild(
    conn: &Connection,
    table: &QualifiedName,
    changes: &[Change],
    plan: &mut Plan,
) -> Result<()> {
    let current = inspect::current_table(conn, &table.name)?.ok_or_else(|| PlanError {
        dialect: DIALECT_NAME,
        change: "ModifyTable".to_string(),
        reason: format!("table {:?} must exist for a rebuild", table.name),
    })?;

    let mut desired = current.clone();
    for change in changes {
        apply_to_table(&mut desired, change)?;
    }
    desired.name = format!("new_{}", current.name);

    let common: Vec<String> = current
        .columns
        .iter()
        .filter(|c| desired.column(&c.name).is_some())
        .map(|c| quote(&c.name))
        .collect();

    let comment = format!("modify {:?} table", current.name);
    plan.push(PlanChange::new(
        PlanKind::Create,
        create_table_sql(&desired)?,
        comment.clone(),
    ));
    plan.push(PlanChange::new(
        PlanKind::Alter,
        format!(
            "INSERT INTO {} ({}) SELECT {} FROM {}",
            quote(&desired.name),
            common.join(", "),
            common.join(", "),
            quote(&current.name)
        ),
        comment.clone(),
    ));
    plan.push(PlanChange::new(
        PlanKind::Drop,
        format!("DROP TABLE {}", quote(&current.name)),
        comment.clone(),
    ));
    plan.push(PlanChange::new(
        PlanKind::Rename,
        format!(
            "ALTER TABLE {} RENAME TO {}",
            quote(&desired.name),
            quote(&current.name)
        ),
        comment,
    ));
    Ok(())
}

/// Apply one change to an in-memory table definition, yielding the state
/// the rebuilt table must have.
fn apply_to_table(table: &mut Table, change: &Change) -> Result<()> {
    match change {
        Change::ModifyColumn { to, .. } => {
            let found = table
                .columns
                .iter_mut()
                .find(|c| c.name == to.name)
                .ok_or_else(|| PlanError {
                    dialect: DIALECT_NAME,
                    change: change.tag().to_string(),
                    reason: format!("column {:?} not found", to.name),
                })?;
            *found = to.clone();
        }
        Change::DropColumn { column, .. } => {
            table.columns.retain(|c| &c.name != column);
            table.indexes.retain(|i| {
                !i.parts
                    .iter()
                    .any(|p| matches!(&p.key, IndexKey::Column(c) if c == column))
            });
        }
        Change::AddCheck { check, .. } => table.checks.push(check.clone()),
        Change::DropCheck { name, .. } => table.checks.retain(|c| &c.name != name),
        Change::ModifyCheck { to, .. } => {
            if let Some(found) = table.checks.iter_mut().find(|c| c.name == to.name) {
                *found = to.clone();
            }
        }
        Change::AddForeignKey { fk, .. } => table.foreign_keys.push(fk.clone()),
        Change::DropForeignKey { symbol, .. } => {
            table.foreign_keys.retain(|f| &f.symbol != symbol);
        }
        Change::ModifyForeignKey { to, .. } => {
            if let Some(found) = table
                .foreign_keys
                .iter_mut()
                .find(|f| f.symbol == to.symbol)
            {
                *found = to.clone();
            }
        }
        Change::SetPrimaryKey { index, .. } => table.primary_key = Some(index.clone()),
        Change::DropPrimaryKey { .. } => table.primary_key = None,
        other => {
            return Err(PlanError {
                dialect: DIALECT_NAME,
                change: other.tag().to_string(),
                reason: "not part of a rebuild".to_string(),
            }
            .into());
        }
    }
    Ok(())
}

fn create_table_sql(table: &Table) -> Result<String> {
    let mut body = Vec::new();
    let rowid_pk = rowid_alias_column(table);

    for column in &table.columns {
        let inline_pk = rowid_pk.as_deref() == Some(column.name.as_str());
        body.push(format!("  {}", column_def(column, inline_pk)?));
    }
    if rowid_pk.is_none()
        && let Some(pk) = &table.primary_key
    {
        body.push(format!("  PRIMARY KEY ({})", part_list(&pk.parts)));
    }
    for fk in &table.foreign_keys {
        let mut clause = format!(
            "  CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            quote(&fk.symbol),
            fk.columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", "),
            quote(&fk.ref_table.name),
            fk.ref_columns
                .iter()
                .map(|c| quote(c))
                .collect::<Vec<_>>()
                .join(", ")
        );
        write!(clause, " ON UPDATE {}", fk.on_update.as_sql()).expect("write to string");
        write!(clause, " ON DELETE {}", fk.on_delete.as_sql()).expect("write to string");
        body.push(clause);
    }
    for check in &table.checks {
        body.push(format!(
            "  CONSTRAINT {} CHECK ({})",
            quote(&check.name),
            check.expr
        ));
    }

    Ok(format!(
        "CREATE TABLE {} (\n{}\n)",
        quote(&table.name),
        body.join(",\n")
    ))
}

/// An INTEGER single-column primary key is the rowid alias and must be
/// declared inline to auto-assign.
fn rowid_alias_column(table: &Table) -> Option<String> {
    let pk = table.primary_key.as_ref()?;
    if pk.parts.len() != 1 {
        return None;
    }
    let IndexKey::Column(name) = &pk.parts[0].key else {
        return None;
    };
    let column = table.column(name)?;
    matches!(column.ty.kind, TypeKind::Int { .. }).then(|| name.clone())
}

fn column_def(column: &Column, inline_pk: bool) -> Result<String> {
    let mut def = format!("{} {}", quote(&column.name), types::format_type(&column.ty)?);
    if inline_pk {
        def.push_str(" PRIMARY KEY");
        if column.auto_increment() {
            def.push_str(" AUTOINCREMENT");
        }
    }
    if !column.ty.nullable && !inline_pk {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        def.push_str(" DEFAULT ");
        def.push_str(&default_sql(default));
    }
    for attr in &column.attrs {
        if let Attr::Collation(collation) = attr {
            def.push_str(&format!(" COLLATE {collation}"));
        }
    }
    Ok(def)
}

fn default_sql(default: &Expr) -> String {
    match default {
        Expr::Literal(text) => {
            if text.parse::<f64>().is_ok() {
                text.clone()
            } else {
                format!("'{}'", text.replace('\'', "''"))
            }
        }
        Expr::Raw(expr) => {
            let keyword = expr
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
            if keyword || expr.starts_with('(') {
                expr.clone()
            } else {
                format!("({expr})")
            }
        }
    }
}

fn create_index_sql(table: &str, index: &Index) -> String {
    let unique = if index.unique { "UNIQUE " } else { "" };
    let mut sql = format!(
        "CREATE {unique}INDEX {} ON {} ({})",
        quote(&index.name),
        quote(table),
        part_list(&index.parts)
    );
    for attr in &index.attrs {
        if let Attr::Predicate(predicate) = attr {
            sql.push_str(&format!(" WHERE {predicate}"));
        }
    }
    sql
}

fn part_list(parts: &[atlas_core::IndexPart]) -> String {
    parts
        .iter()
        .map(|part| {
            let mut rendered = match &part.key {
                IndexKey::Column(name) => quote(name),
                IndexKey::Expr(expr) => format!("({expr})"),
            };
            if part.desc {
                rendered.push_str(" DESC");
            }
            rendered
        })
        .collect::<Vec<_>>()
        .join(", ")
}
