use atlas_core::{
    Attr, Change, ChangeKind, Check, Column, Expr, ForeignKey, Index, IndexKey, Plan, PlanChange,
    PlanError, PlanKind, PlanOptions, QualifiedName, Result, Table, TypeKind,
};

use crate::{DIALECT_NAME, quote, quote_qualified, types};

/// Build a plan for PostgreSQL. DDL is transactional here, so the whole
/// plan runs atomically unless an enum extension is present (`ALTER TYPE
/// ... ADD VALUE` has no reverse and marks the plan irreversible, not
/// non-transactional).
pub fn plan_changes(name: &str, changes: &[Change], _opts: &PlanOptions) -> Result<Plan> {
    let mut plan = Plan::new(name, true);
    for change in changes {
        push_change(change, &mut plan)?;
    }
    Ok(plan)
}

fn push_change(change: &Change, plan: &mut Plan) -> Result<()> {
    match change {
        Change::AddSchema(schema) => {
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    format!("CREATE SCHEMA IF NOT EXISTS {}", quote(&schema.name)),
                    format!("add new schema named {:?}", schema.name),
                )
                .with_reverse(format!("DROP SCHEMA {} CASCADE", quote(&schema.name))),
            );
        }
        Change::DropSchema { name } => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!("DROP SCHEMA {} CASCADE", quote(name)),
                format!("drop schema named {name:?}"),
            ));
        }
        Change::ModifySchema { change: facet, .. } => {
            return Err(unsupported(
                "ModifySchema",
                format!("schema facet {facet:?} has no DDL on this dialect"),
            ));
        }
        Change::AddEnum { schema, enum_type } => {
            let qualified = quote_qualified(schema.as_deref(), &enum_type.name);
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    format!(
                        "CREATE TYPE {qualified} AS ENUM ({})",
                        quote_values(&enum_type.values)
                    ),
                    format!("create enum type {:?}", enum_type.name),
                )
                .with_reverse(format!("DROP TYPE {qualified}")),
            );
        }
        Change::DropEnum(name) => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!(
                    "DROP TYPE {}",
                    quote_qualified(name.schema.as_deref(), &name.name)
                ),
                format!("drop enum type {:?}", name.name),
            ));
        }
        Change::ModifyEnum {
            enum_type,
            from,
            to,
            ..
        } => {
            push_enum_extension(
                &quote_qualified(enum_type.schema.as_deref(), &enum_type.name),
                &enum_type.name,
                &from.values,
                &to.values,
                plan,
            )?;
        }
        Change::AddTable(table) => {
            let qualified = table_name(table);
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    create_table_sql(table)?,
                    format!("create {:?} table", table.name),
                )
                .with_reverse(format!("DROP TABLE {qualified}")),
            );
        }
        Change::DropTable(name) => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!(
                    "DROP TABLE {}",
                    quote_qualified(name.schema.as_deref(), &name.name)
                ),
                format!("drop {:?} table", name.name),
            ));
        }
        Change::ModifyTable { table, change, from, to } => {
            if change.contains(ChangeKind::COMMENT) {
                let comment = comment_of(to).unwrap_or_default();
                let previous = comment_of(from).unwrap_or_default();
                plan.push(
                    PlanChange::new(
                        PlanKind::Comment,
                        format!(
                            "COMMENT ON TABLE {} IS {}",
                            qualified(table),
                            quote_string(comment)
                        ),
                        format!("modify {:?} table", table.name),
                    )
                    .with_reverse(format!(
                        "COMMENT ON TABLE {} IS {}",
                        qualified(table),
                        quote_string(previous)
                    )),
                );
            }
            let rest = *change & !ChangeKind::COMMENT;
            if !rest.is_empty() {
                return Err(unsupported(
                    "ModifyTable",
                    format!("table facet {rest:?} has no DDL on this dialect"),
                ));
            }
        }
        Change::RenameTable { from, to } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Rename,
                    format!("ALTER TABLE {} RENAME TO {}", qualified(from), quote(&to.name)),
                    format!("rename table {:?} to {:?}", from.name, to.name),
                )
                .with_reverse(format!(
                    "ALTER TABLE {} RENAME TO {}",
                    qualified(to),
                    quote(&from.name)
                )),
            );
        }
        Change::AddColumn { table, column } => {
            let mut planned = PlanChange::new(
                PlanKind::Alter,
                format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    qualified(table),
                    column_def(column)?
                ),
                format!("add column {:?} to table: {:?}", column.name, table.name),
            );
            if column.ty.nullable || column.default.is_some() {
                planned = planned.with_reverse(format!(
                    "ALTER TABLE {} DROP COLUMN {}",
                    qualified(table),
                    quote(&column.name)
                ));
            }
            plan.push(planned);
        }
        Change::DropColumn { table, column } => {
            plan.push(PlanChange::new(
                PlanKind::Alter,
                format!(
                    "ALTER TABLE {} DROP COLUMN {}",
                    qualified(table),
                    quote(column)
                ),
                format!("drop column {column:?} from table: {:?}", table.name),
            ));
        }
        Change::ModifyColumn {
            table,
            change,
            from,
            to,
        } => push_modify_column(table, *change, from, to, plan)?,
        Change::RenameColumn { table, from, to } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Rename,
                    format!(
                        "ALTER TABLE {} RENAME COLUMN {} TO {}",
                        qualified(table),
                        quote(from),
                        quote(to)
                    ),
                    format!("rename column {from:?} to {to:?} in table: {:?}", table.name),
                )
                .with_reverse(format!(
                    "ALTER TABLE {} RENAME COLUMN {} TO {}",
                    qualified(table),
                    quote(to),
                    quote(from)
                )),
            );
        }
        Change::AddIndex { table, index } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    create_index_sql(table, index),
                    format!("create index {:?} to table: {:?}", index.name, table.name),
                )
                .with_reverse(format!(
                    "DROP INDEX {}",
                    quote_qualified(table.schema.as_deref(), &index.name)
                )),
            );
        }
        Change::DropIndex { table, index } => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!(
                    "DROP INDEX {}",
                    quote_qualified(table.schema.as_deref(), index)
                ),
                format!("drop index {index:?} from table: {:?}", table.name),
            ));
        }
        Change::ModifyIndex { table, from, to, .. } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Drop,
                    format!(
                        "DROP INDEX {}",
                        quote_qualified(table.schema.as_deref(), &from.name)
                    ),
                    format!("drop index {:?} from table: {:?}", from.name, table.name),
                )
                .with_reverse(create_index_sql(table, from)),
            );
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    create_index_sql(table, to),
                    format!("create index {:?} to table: {:?}", to.name, table.name),
                )
                .with_reverse(format!(
                    "DROP INDEX {}",
                    quote_qualified(table.schema.as_deref(), &to.name)
                )),
            );
        }
        Change::RenameIndex { table, from, to } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Rename,
                    format!(
                        "ALTER INDEX {} RENAME TO {}",
                        quote_qualified(table.schema.as_deref(), from),
                        quote(to)
                    ),
                    format!("rename index {from:?} to {to:?}"),
                )
                .with_reverse(format!(
                    "ALTER INDEX {} RENAME TO {}",
                    quote_qualified(table.schema.as_deref(), to),
                    quote(from)
                )),
            );
        }
        Change::SetPrimaryKey { table, index } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Alter,
                    format!(
                        "ALTER TABLE {} ADD PRIMARY KEY ({})",
                        qualified(table),
                        part_columns(index)
                    ),
                    format!("set primary key on table: {:?}", table.name),
                )
                .with_reverse(format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    qualified(table),
                    quote(&format!("{}_pkey", table.name))
                )),
            );
        }
        Change::DropPrimaryKey { table } => {
            plan.push(PlanChange::new(
                PlanKind::Alter,
                format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    qualified(table),
                    quote(&format!("{}_pkey", table.name))
                ),
                format!("drop primary key from table: {:?}", table.name),
            ));
        }
        Change::AddForeignKey { table, fk } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Alter,
                    format!(
                        "ALTER TABLE {} ADD {}",
                        qualified(table),
                        foreign_key_clause(fk)
                    ),
                    format!("add foreign key {:?} to table: {:?}", fk.symbol, table.name),
                )
                .with_reverse(format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    qualified(table),
                    quote(&fk.symbol)
                )),
            );
        }
        Change::DropForeignKey { table, symbol } => {
            plan.push(PlanChange::new(
                PlanKind::Alter,
                format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    qualified(table),
                    quote(symbol)
                ),
                format!("drop foreign key {symbol:?} from table: {:?}", table.name),
            ));
        }
        Change::ModifyForeignKey { table, from, to, .. } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Alter,
                    format!(
                        "ALTER TABLE {} DROP CONSTRAINT {}",
                        qualified(table),
                        quote(&from.symbol)
                    ),
                    format!("drop foreign key {:?} from table: {:?}", from.symbol, table.name),
                )
                .with_reverse(format!(
                    "ALTER TABLE {} ADD {}",
                    qualified(table),
                    foreign_key_clause(from)
                )),
            );
            plan.push(
                PlanChange::new(
                    PlanKind::Alter,
                    format!(
                        "ALTER TABLE {} ADD {}",
                        qualified(table),
                        foreign_key_clause(to)
                    ),
                    format!("add foreign key {:?} to table: {:?}", to.symbol, table.name),
                )
                .with_reverse(format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    qualified(table),
                    quote(&to.symbol)
                )),
            );
        }
        Change::AddCheck { table, check } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Alter,
                    format!("ALTER TABLE {} ADD {}", qualified(table), check_clause(check)),
                    format!("add check {:?} to table: {:?}", check.name, table.name),
                )
                .with_reverse(format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    qualified(table),
                    quote(&check.name)
                )),
            );
        }
        Change::DropCheck { table, name } => {
            plan.push(PlanChange::new(
                PlanKind::Alter,
                format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    qualified(table),
                    quote(name)
                ),
                format!("drop check {name:?} from table: {:?}", table.name),
            ));
        }
        Change::ModifyCheck { table, from, to, .. } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Alter,
                    format!(
                        "ALTER TABLE {} DROP CONSTRAINT {}",
                        qualified(table),
                        quote(&from.name)
                    ),
                    format!("drop check {:?} from table: {:?}", from.name, table.name),
                )
                .with_reverse(format!(
                    "ALTER TABLE {} ADD {}",
                    qualified(table),
                    check_clause(from)
                )),
            );
            plan.push(
                PlanChange::new(
                    PlanKind::Alter,
                    format!("ALTER TABLE {} ADD {}", qualified(table), check_clause(to)),
                    format!("add check {:?} to table: {:?}", to.name, table.name),
                )
                .with_reverse(format!(
                    "ALTER TABLE {} DROP CONSTRAINT {}",
                    qualified(table),
                    quote(&to.name)
                )),
            );
        }
        Change::AddView { schema, view } => {
            let materialized = if view.materialized { "MATERIALIZED " } else { "" };
            let qualified = quote_qualified(schema.as_deref(), &view.name);
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    format!("CREATE {materialized}VIEW {qualified} AS {}", view.def),
                    format!("create {:?} view", view.name),
                )
                .with_reverse(format!("DROP {materialized}VIEW {qualified}")),
            );
        }
        Change::DropView(name) => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!(
                    "DROP VIEW {}",
                    quote_qualified(name.schema.as_deref(), &name.name)
                ),
                format!("drop {:?} view", name.name),
            ));
        }
        Change::ModifyView { view, from, to, .. } => {
            let qualified = quote_qualified(view.schema.as_deref(), &view.name);
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    format!("CREATE OR REPLACE VIEW {qualified} AS {}", to.def),
                    format!("modify {:?} view", view.name),
                )
                .with_reverse(format!(
                    "CREATE OR REPLACE VIEW {qualified} AS {}",
                    from.def
                )),
            );
        }
        Change::AddSequence { schema, sequence } => {
            let qualified = quote_qualified(schema.as_deref(), &sequence.name);
            let mut sql = format!(
                "CREATE SEQUENCE {qualified} START WITH {} INCREMENT BY {}",
                sequence.start, sequence.increment
            );
            if let Some(min) = sequence.min_value {
                sql.push_str(&format!(" MINVALUE {min}"));
            }
            if let Some(max) = sequence.max_value {
                sql.push_str(&format!(" MAXVALUE {max}"));
            }
            if sequence.cycle {
                sql.push_str(" CYCLE");
            }
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    sql,
                    format!("create sequence {:?}", sequence.name),
                )
                .with_reverse(format!("DROP SEQUENCE {qualified}")),
            );
        }
        Change::DropSequence(name) => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!(
                    "DROP SEQUENCE {}",
                    quote_qualified(name.schema.as_deref(), &name.name)
                ),
                format!("drop sequence {:?}", name.name),
            ));
        }
        Change::ModifySequence { sequence, to, from, .. } => {
            let qualified = quote_qualified(sequence.schema.as_deref(), &sequence.name);
            plan.push(
                PlanChange::new(
                    PlanKind::Alter,
                    format!(
                        "ALTER SEQUENCE {qualified} INCREMENT BY {} START WITH {}",
                        to.increment, to.start
                    ),
                    format!("modify sequence {:?}", sequence.name),
                )
                .with_reverse(format!(
                    "ALTER SEQUENCE {qualified} INCREMENT BY {} START WITH {}",
                    from.increment, from.start
                )),
            );
        }
        Change::AddFunc { func, .. } => {
            plan.push(PlanChange::new(
                PlanKind::Create,
                func.def.clone(),
                format!("create function {:?}", func.name),
            ));
        }
        Change::DropFunc(name) => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!(
                    "DROP FUNCTION {}",
                    quote_qualified(name.schema.as_deref(), &name.name)
                ),
                format!("drop function {:?}", name.name),
            ));
        }
        Change::ModifyFunc { func, to, .. } => {
            plan.push(PlanChange::new(
                PlanKind::Create,
                to.def.clone(),
                format!("modify function {:?}", func.name),
            ));
        }
        Change::AddProc { proc, .. } => {
            plan.push(PlanChange::new(
                PlanKind::Create,
                proc.def.clone(),
                format!("create procedure {:?}", proc.name),
            ));
        }
        Change::DropProc(name) => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!(
                    "DROP PROCEDURE {}",
                    quote_qualified(name.schema.as_deref(), &name.name)
                ),
                format!("drop procedure {:?}", name.name),
            ));
        }
        Change::ModifyProc { proc, to, .. } => {
            plan.push(PlanChange::new(
                PlanKind::Create,
                to.def.clone(),
                format!("modify procedure {:?}", proc.name),
            ));
        }
        Change::AddTrigger { trigger, .. } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    trigger.def.clone(),
                    format!("create trigger {:?}", trigger.name),
                )
                .with_reverse(format!(
                    "DROP TRIGGER {} ON {}",
                    quote(&trigger.name),
                    quote(&trigger.table)
                )),
            );
        }
        Change::DropTrigger { table, name } => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!("DROP TRIGGER {} ON {}", quote(name), qualified(table)),
                format!("drop trigger {name:?}"),
            ));
        }
        Change::ModifyTrigger { table, from, to, .. } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Drop,
                    format!("DROP TRIGGER {} ON {}", quote(&from.name), qualified(table)),
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
                .with_reverse(format!(
                    "DROP TRIGGER {} ON {}",
                    quote(&to.name),
                    qualified(table)
                )),
            );
        }
        Change::AddAttr { .. } | Change::ModifyAttr { .. } | Change::DropAttr { .. } => {
            return Err(unsupported(
                change.tag(),
                "realm attributes have no DDL on this dialect".to_string(),
            ));
        }
    }
    Ok(())
}

/// Per-facet column modification. Enum extensions take the `ALTER TYPE
/// ... ADD VALUE` path: the new value is appended to the type, never
/// removed, and the plan becomes irreversible.
fn push_modify_column(
    table: &QualifiedName,
    change: ChangeKind,
    from: &Column,
    to: &Column,
    plan: &mut Plan,
) -> Result<()> {
    let comment = format!("modify column {:?} in table: {:?}", to.name, table.name);

    if change.contains(ChangeKind::TYPE) {
        if let (
            TypeKind::Enum { name: Some(from_name), values: from_values },
            TypeKind::Enum { name: Some(to_name), values: to_values },
        ) = (&from.ty.kind, &to.ty.kind)
            && from_name == to_name
        {
            push_enum_extension(
                &quote_qualified(table.schema.as_deref(), from_name),
                from_name,
                from_values,
                to_values,
                plan,
            )?;
        } else {
            plan.push(
                PlanChange::new(
                    PlanKind::Alter,
                    format!(
                        "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
                        qualified(table),
                        quote(&to.name),
                        types::format_type(&to.ty)?
                    ),
                    comment.clone(),
                )
                .with_reverse(format!(
                    "ALTER TABLE {} ALTER COLUMN {} TYPE {}",
                    qualified(table),
                    quote(&from.name),
                    types::format_type(&from.ty)?
                )),
            );
        }
    }
    if change.contains(ChangeKind::NULL) {
        let (set, unset) = if to.ty.nullable {
            ("DROP NOT NULL", "SET NOT NULL")
        } else {
            ("SET NOT NULL", "DROP NOT NULL")
        };
        plan.push(
            PlanChange::new(
                PlanKind::Alter,
                format!(
                    "ALTER TABLE {} ALTER COLUMN {} {set}",
                    qualified(table),
                    quote(&to.name)
                ),
                comment.clone(),
            )
            .with_reverse(format!(
                "ALTER TABLE {} ALTER COLUMN {} {unset}",
                qualified(table),
                quote(&to.name)
            )),
        );
    }
    if change.contains(ChangeKind::DEFAULT) {
        let set = match &to.default {
            Some(default) => format!(
                "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                qualified(table),
                quote(&to.name),
                default_sql(default)
            ),
            None => format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                qualified(table),
                quote(&to.name)
            ),
        };
        let unset = match &from.default {
            Some(default) => format!(
                "ALTER TABLE {} ALTER COLUMN {} SET DEFAULT {}",
                qualified(table),
                quote(&from.name),
                default_sql(default)
            ),
            None => format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP DEFAULT",
                qualified(table),
                quote(&from.name)
            ),
        };
        plan.push(PlanChange::new(PlanKind::Alter, set, comment.clone()).with_reverse(unset));
    }
    if change.contains(ChangeKind::IDENTITY) {
        let sql = match identity_of(&to.attrs) {
            Some(always) => format!(
                "ALTER TABLE {} ALTER COLUMN {} ADD GENERATED {} AS IDENTITY",
                qualified(table),
                quote(&to.name),
                if always { "ALWAYS" } else { "BY DEFAULT" }
            ),
            None => format!(
                "ALTER TABLE {} ALTER COLUMN {} DROP IDENTITY",
                qualified(table),
                quote(&to.name)
            ),
        };
        plan.push(PlanChange::new(PlanKind::Alter, sql, comment.clone()));
    }
    if change.contains(ChangeKind::COMMENT) {
        let text = comment_of(&to.attrs).unwrap_or_default();
        let previous = comment_of(&from.attrs).unwrap_or_default();
        plan.push(
            PlanChange::new(
                PlanKind::Comment,
                format!(
                    "COMMENT ON COLUMN {}.{} IS {}",
                    qualified(table),
                    quote(&to.name),
                    quote_string(text)
                ),
                comment.clone(),
            )
            .with_reverse(format!(
                "COMMENT ON COLUMN {}.{} IS {}",
                qualified(table),
                quote(&to.name),
                quote_string(previous)
            )),
        );
    }
    Ok(())
}

/// Values present in `to` but not `from` are appended in order; removing
/// a value is not expressible on this dialect.
fn push_enum_extension(
    qualified: &str,
    name: &str,
    from_values: &[String],
    to_values: &[String],
    plan: &mut Plan,
) -> Result<()> {
    if let Some(removed) = from_values.iter().find(|v| !to_values.contains(v)) {
        return Err(unsupported(
            "ModifyEnum",
            format!("enum value {removed:?} cannot be removed from type {name:?}"),
        ));
    }
    for value in to_values.iter().filter(|v| !from_values.contains(v)) {
        plan.push(PlanChange::new(
            PlanKind::Alter,
            format!(
                "ALTER TYPE {qualified} ADD VALUE {}",
                quote_string(value)
            ),
            format!("add value to enum type {name:?}"),
        ));
    }
    Ok(())
}

fn create_table_sql(table: &Table) -> Result<String> {
    let mut body = Vec::new();
    for column in &table.columns {
        body.push(format!("  {}", column_def(column)?));
    }
    if let Some(pk) = &table.primary_key {
        body.push(format!("  PRIMARY KEY ({})", part_columns(pk)));
    }
    for check in &table.checks {
        body.push(format!("  {}", check_clause(check)));
    }
    Ok(format!(
        "CREATE TABLE {} (\n{}\n)",
        table_name(table),
        body.join(",\n")
    ))
}

fn column_def(column: &Column) -> Result<String> {
    let mut def = format!("{} {}", quote(&column.name), types::format_type(&column.ty)?);
    if let Some(always) = identity_of(&column.attrs) {
        def.push_str(if always {
            " GENERATED ALWAYS AS IDENTITY"
        } else {
            " GENERATED BY DEFAULT AS IDENTITY"
        });
    }
    for attr in &column.attrs {
        if let Attr::GeneratedAs { expr, stored } = attr {
            def.push_str(&format!(" GENERATED ALWAYS AS ({expr})"));
            if *stored {
                def.push_str(" STORED");
            }
        }
    }
    if !column.ty.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        def.push_str(" DEFAULT ");
        def.push_str(&default_sql(default));
    }
    Ok(def)
}

fn create_index_sql(table: &QualifiedName, index: &Index) -> String {
    let unique = if index.unique { "UNIQUE " } else { "" };
    let mut sql = format!(
        "CREATE {unique}INDEX {} ON {}",
        quote(&index.name),
        qualified(table)
    );
    for attr in &index.attrs {
        if let Attr::IndexType(method) = attr {
            sql.push_str(&format!(" USING {method}"));
        }
    }
    sql.push_str(&format!(" ({})", part_list(index)));
    for attr in &index.attrs {
        match attr {
            Attr::Include(columns) => {
                let quoted: Vec<String> = columns.iter().map(|c| quote(c)).collect();
                sql.push_str(&format!(" INCLUDE ({})", quoted.join(", ")));
            }
            Attr::Predicate(predicate) => sql.push_str(&format!(" WHERE {predicate}")),
            _ => {}
        }
    }
    sql
}

fn foreign_key_clause(fk: &ForeignKey) -> String {
    format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({}) ON UPDATE {} ON DELETE {}",
        quote(&fk.symbol),
        fk.columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", "),
        quote_qualified(fk.ref_table.schema.as_deref(), &fk.ref_table.name),
        fk.ref_columns
            .iter()
            .map(|c| quote(c))
            .collect::<Vec<_>>()
            .join(", "),
        fk.on_update.as_sql(),
        fk.on_delete.as_sql()
    )
}

fn check_clause(check: &Check) -> String {
    let mut clause = format!("CONSTRAINT {} CHECK ({})", quote(&check.name), check.expr);
    if check.attrs.iter().any(|a| matches!(a, Attr::NoInherit)) {
        clause.push_str(" NO INHERIT");
    }
    clause
}

fn part_list(index: &Index) -> String {
    index
        .parts
        .iter()
        .map(|part| {
            let mut rendered = match &part.key {
                IndexKey::Column(name) => quote(name),
                IndexKey::Expr(expr) => format!("({expr})"),
            };
            if let Some(collation) = &part.collation {
                rendered.push_str(&format!(" COLLATE {}", quote(collation)));
            }
            if part.desc {
                rendered.push_str(" DESC");
            }
            rendered
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn part_columns(index: &Index) -> String {
    index
        .parts
        .iter()
        .map(|part| match &part.key {
            IndexKey::Column(name) => quote(name),
            IndexKey::Expr(expr) => format!("({expr})"),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn default_sql(default: &Expr) -> String {
    match default {
        Expr::Literal(text) => {
            if text.parse::<f64>().is_ok() {
                text.clone()
            } else {
                quote_string(text)
            }
        }
        Expr::Raw(expr) => expr.clone(),
    }
}

fn quote_string(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn quote_values(values: &[String]) -> String {
    values
        .iter()
        .map(|v| quote_string(v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn table_name(table: &Table) -> String {
    quote_qualified(table.schema.as_deref(), &table.name)
}

fn qualified(name: &QualifiedName) -> String {
    quote_qualified(name.schema.as_deref(), &name.name)
}

fn identity_of(attrs: &[Attr]) -> Option<bool> {
    attrs.iter().find_map(|a| match a {
        Attr::Identity { always } => Some(*always),
        _ => None,
    })
}

fn comment_of(attrs: &[Attr]) -> Option<&str> {
    attrs.iter().find_map(|a| match a {
        Attr::Comment(c) => Some(c.as_str()),
        _ => None,
    })
}

fn unsupported(change: &str, reason: String) -> atlas_core::Error {
    PlanError {
        dialect: DIALECT_NAME,
        change: change.to_string(),
        reason,
    }
    .into()
}
