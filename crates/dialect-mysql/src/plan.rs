use atlas_core::{
    Attr, Change, ChangeKind, Check, Column, Expr, ForeignKey, Index, IndexKey, Plan, PlanChange,
    PlanError, PlanKind, PlanOptions, QualifiedName, Result, Table,
};

use crate::{DIALECT_NAME, quote, quote_qualified, types};

/// The server family behind a MySQL-protocol connection. TiDB diverges
/// from MySQL in how index drops are sequenced against column drops, so
/// its index drops go through `ALTER TABLE` where they order explicitly;
/// MariaDB spells check-constraint drops differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flavor {
    #[default]
    MySql,
    MariaDb,
    TiDb,
}

/// Build a plan for MySQL. DDL implicitly commits, so the plan is marked
/// non-transactional and the applier runs it statement by statement.
pub fn plan_changes(
    flavor: Flavor,
    name: &str,
    changes: &[Change],
    _opts: &PlanOptions,
) -> Result<Plan> {
    let mut plan = Plan::new(name, false);
    for change in changes {
        push_change(flavor, change, &mut plan)?;
    }
    Ok(plan)
}

fn push_change(flavor: Flavor, change: &Change, plan: &mut Plan) -> Result<()> {
    match change {
        Change::AddSchema(schema) => {
            let mut sql = format!("CREATE DATABASE {}", quote(&schema.name));
            if let Some(charset) = charset_of(&schema.attrs) {
                sql.push_str(&format!(" CHARACTER SET {charset}"));
            }
            if let Some(collation) = collation_of(&schema.attrs) {
                sql.push_str(&format!(" COLLATE {collation}"));
            }
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    sql,
                    format!("add new schema named {:?}", schema.name),
                )
                .with_reverse(format!("DROP DATABASE {}", quote(&schema.name))),
            );
        }
        Change::DropSchema { name } => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!("DROP DATABASE {}", quote(name)),
                format!("drop schema named {name:?}"),
            ));
        }
        Change::ModifySchema { name, change, from, to } => {
            if change.intersects(ChangeKind::CHARSET | ChangeKind::COLLATION) {
                plan.push(
                    PlanChange::new(
                        PlanKind::Alter,
                        alter_database_sql(name, to),
                        format!("modify schema named {name:?}"),
                    )
                    .with_reverse(alter_database_sql(name, from)),
                );
            }
        }
        Change::AddTable(table) => {
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    create_table_sql(table)?,
                    format!("create {:?} table", table.name),
                )
                .with_reverse(format!("DROP TABLE {}", table_name(table))),
            );
        }
        Change::DropTable(name) => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!("DROP TABLE {}", qualified(name)),
                format!("drop {:?} table", name.name),
            ));
        }
        Change::ModifyTable { table, change, from, to } => {
            push_modify_table(table, *change, from, to, plan)?;
        }
        Change::RenameTable { from, to } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Rename,
                    format!("RENAME TABLE {} TO {}", qualified(from), qualified(to)),
                    format!("rename table {:?} to {:?}", from.name, to.name),
                )
                .with_reverse(format!(
                    "RENAME TABLE {} TO {}",
                    qualified(to),
                    qualified(from)
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
        Change::ModifyColumn { table, from, to, .. } => {
            // MySQL rewrites the full column definition regardless of the
            // changed facet.
            plan.push(
                PlanChange::new(
                    PlanKind::Alter,
                    format!(
                        "ALTER TABLE {} MODIFY COLUMN {}",
                        qualified(table),
                        column_def(to)?
                    ),
                    format!("modify column {:?} in table: {:?}", to.name, table.name),
                )
                .with_reverse(format!(
                    "ALTER TABLE {} MODIFY COLUMN {}",
                    qualified(table),
                    column_def(from)?
                )),
            );
        }
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
                .with_reverse(drop_index_sql(flavor, table, &index.name)),
            );
        }
        Change::DropIndex { table, index } => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                drop_index_sql(flavor, table, index),
                format!("drop index {index:?} from table: {:?}", table.name),
            ));
        }
        Change::ModifyIndex { table, from, to, .. } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Drop,
                    drop_index_sql(flavor, table, &from.name),
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
                .with_reverse(drop_index_sql(flavor, table, &to.name)),
            );
        }
        Change::RenameIndex { table, from, to } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Rename,
                    format!(
                        "ALTER TABLE {} RENAME INDEX {} TO {}",
                        qualified(table),
                        quote(from),
                        quote(to)
                    ),
                    format!("rename index {from:?} to {to:?}"),
                )
                .with_reverse(format!(
                    "ALTER TABLE {} RENAME INDEX {} TO {}",
                    qualified(table),
                    quote(to),
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
                    "ALTER TABLE {} DROP PRIMARY KEY",
                    qualified(table)
                )),
            );
        }
        Change::DropPrimaryKey { table } => {
            plan.push(PlanChange::new(
                PlanKind::Alter,
                format!("ALTER TABLE {} DROP PRIMARY KEY", qualified(table)),
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
                    "ALTER TABLE {} DROP FOREIGN KEY {}",
                    qualified(table),
                    quote(&fk.symbol)
                )),
            );
        }
        Change::DropForeignKey { table, symbol } => {
            plan.push(PlanChange::new(
                PlanKind::Alter,
                format!(
                    "ALTER TABLE {} DROP FOREIGN KEY {}",
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
                        "ALTER TABLE {} DROP FOREIGN KEY {}",
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
                    "ALTER TABLE {} DROP FOREIGN KEY {}",
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
                .with_reverse(drop_check_sql(flavor, table, &check.name)),
            );
        }
        Change::DropCheck { table, name } => {
            plan.push(PlanChange::new(
                PlanKind::Alter,
                drop_check_sql(flavor, table, name),
                format!("drop check {name:?} from table: {:?}", table.name),
            ));
        }
        Change::ModifyCheck { table, from, to, .. } => {
            plan.push(
                PlanChange::new(
                    PlanKind::Alter,
                    drop_check_sql(flavor, table, &from.name),
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
                .with_reverse(drop_check_sql(flavor, table, &to.name)),
            );
        }
        Change::AddView { schema, view } => {
            let qualified = quote_qualified(schema.as_deref(), &view.name);
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    format!("CREATE VIEW {qualified} AS {}", view.def),
                    format!("create {:?} view", view.name),
                )
                .with_reverse(format!("DROP VIEW {qualified}")),
            );
        }
        Change::DropView(name) => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!("DROP VIEW {}", qualified(name)),
                format!("drop {:?} view", name.name),
            ));
        }
        Change::ModifyView { view, from, to, .. } => {
            let name = qualified(view);
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    format!("CREATE OR REPLACE VIEW {name} AS {}", to.def),
                    format!("modify {:?} view", view.name),
                )
                .with_reverse(format!("CREATE OR REPLACE VIEW {name} AS {}", from.def)),
            );
        }
        Change::AddSequence { schema, sequence } if flavor == Flavor::MariaDb => {
            let qualified = quote_qualified(schema.as_deref(), &sequence.name);
            plan.push(
                PlanChange::new(
                    PlanKind::Create,
                    format!(
                        "CREATE SEQUENCE {qualified} START WITH {} INCREMENT BY {}",
                        sequence.start, sequence.increment
                    ),
                    format!("create sequence {:?}", sequence.name),
                )
                .with_reverse(format!("DROP SEQUENCE {qualified}")),
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
                format!("DROP FUNCTION {}", qualified(name)),
                format!("drop function {:?}", name.name),
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
                format!("DROP PROCEDURE {}", qualified(name)),
                format!("drop procedure {:?}", name.name),
            ));
        }
        Change::ModifyFunc { func, to, .. } => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!("DROP FUNCTION {}", qualified(func)),
                format!("drop function {:?}", func.name),
            ));
            plan.push(PlanChange::new(
                PlanKind::Create,
                to.def.clone(),
                format!("create function {:?}", func.name),
            ));
        }
        Change::ModifyProc { proc, to, .. } => {
            plan.push(PlanChange::new(
                PlanKind::Drop,
                format!("DROP PROCEDURE {}", qualified(proc)),
                format!("drop procedure {:?}", proc.name),
            ));
            plan.push(PlanChange::new(
                PlanKind::Create,
                to.def.clone(),
                format!("create procedure {:?}", proc.name),
            ));
        }
        unsupported_change => {
            return Err(PlanError {
                dialect: DIALECT_NAME,
                change: unsupported_change.tag().to_string(),
                reason: "not expressible on this dialect".to_string(),
            }
            .into());
        }
    }
    Ok(())
}

/// TiDB sequences index drops through ALTER TABLE so they order with the
/// column drops that reference them; MySQL and MariaDB use the standalone
/// statement.
fn drop_index_sql(flavor: Flavor, table: &QualifiedName, index: &str) -> String {
    match flavor {
        Flavor::TiDb => format!(
            "ALTER TABLE {} DROP INDEX {}",
            qualified(table),
            quote(index)
        ),
        Flavor::MySql | Flavor::MariaDb => {
            format!("DROP INDEX {} ON {}", quote(index), qualified(table))
        }
    }
}

fn drop_check_sql(flavor: Flavor, table: &QualifiedName, name: &str) -> String {
    match flavor {
        Flavor::MariaDb => format!(
            "ALTER TABLE {} DROP CONSTRAINT {}",
            qualified(table),
            quote(name)
        ),
        Flavor::MySql | Flavor::TiDb => format!(
            "ALTER TABLE {} DROP CHECK {}",
            qualified(table),
            quote(name)
        ),
    }
}

fn push_modify_table(
    table: &QualifiedName,
    change: ChangeKind,
    from: &[Attr],
    to: &[Attr],
    plan: &mut Plan,
) -> Result<()> {
    let comment = format!("modify {:?} table", table.name);
    if change.contains(ChangeKind::COMMENT) {
        let text = comment_of(to).unwrap_or_default();
        let previous = comment_of(from).unwrap_or_default();
        plan.push(
            PlanChange::new(
                PlanKind::Comment,
                format!(
                    "ALTER TABLE {} COMMENT = {}",
                    qualified(table),
                    quote_string(text)
                ),
                comment.clone(),
            )
            .with_reverse(format!(
                "ALTER TABLE {} COMMENT = {}",
                qualified(table),
                quote_string(previous)
            )),
        );
    }
    if change.intersects(ChangeKind::CHARSET | ChangeKind::COLLATION) {
        let mut sql = format!("ALTER TABLE {}", qualified(table));
        if let Some(charset) = charset_of(to) {
            sql.push_str(&format!(" DEFAULT CHARACTER SET {charset}"));
        }
        if let Some(collation) = collation_of(to) {
            sql.push_str(&format!(" COLLATE {collation}"));
        }
        plan.push(PlanChange::new(PlanKind::Alter, sql, comment.clone()));
    }
    if change.contains(ChangeKind::ATTRS) {
        if let Some(engine) = engine_of(to) {
            plan.push(PlanChange::new(
                PlanKind::Alter,
                format!("ALTER TABLE {} ENGINE = {engine}", qualified(table)),
                comment.clone(),
            ));
        }
        if let Some(next) = auto_increment_of(to) {
            plan.push(PlanChange::new(
                PlanKind::Alter,
                format!("ALTER TABLE {} AUTO_INCREMENT = {next}", qualified(table)),
                comment.clone(),
            ));
        }
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

    let mut sql = format!(
        "CREATE TABLE {} (\n{}\n)",
        table_name(table),
        body.join(",\n")
    );
    if let Some(engine) = engine_of(&table.attrs) {
        sql.push_str(&format!(" ENGINE = {engine}"));
    }
    if let Some(charset) = charset_of(&table.attrs) {
        sql.push_str(&format!(" DEFAULT CHARACTER SET {charset}"));
    }
    if let Some(collation) = collation_of(&table.attrs) {
        sql.push_str(&format!(" COLLATE {collation}"));
    }
    if let Some(next) = auto_increment_of(&table.attrs) {
        sql.push_str(&format!(" AUTO_INCREMENT = {next}"));
    }
    if let Some(text) = comment_of(&table.attrs) {
        sql.push_str(&format!(" COMMENT = {}", quote_string(text)));
    }
    Ok(sql)
}

fn column_def(column: &Column) -> Result<String> {
    let mut def = format!("{} {}", quote(&column.name), types::format_type(&column.ty)?);
    if let Some(charset) = charset_of(&column.attrs) {
        def.push_str(&format!(" CHARACTER SET {charset}"));
    }
    if let Some(collation) = collation_of(&column.attrs) {
        def.push_str(&format!(" COLLATE {collation}"));
    }
    if column.ty.nullable {
        def.push_str(" NULL");
    } else {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        def.push_str(" DEFAULT ");
        def.push_str(&default_sql(default));
    }
    for attr in &column.attrs {
        if let Attr::OnUpdate(expr) = attr {
            def.push_str(&format!(" ON UPDATE {expr}"));
        }
    }
    if column.auto_increment() {
        def.push_str(" AUTO_INCREMENT");
    }
    if let Some(text) = comment_of(&column.attrs) {
        def.push_str(&format!(" COMMENT {}", quote_string(text)));
    }
    Ok(def)
}

fn create_index_sql(table: &QualifiedName, index: &Index) -> String {
    let unique = if index.unique { "UNIQUE " } else { "" };
    format!(
        "CREATE {unique}INDEX {} ON {} ({})",
        quote(&index.name),
        qualified(table),
        part_list(index)
    )
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
    if let Some(Attr::Enforced(false)) = check
        .attrs
        .iter()
        .find(|a| matches!(a, Attr::Enforced(_)))
    {
        clause.push_str(" NOT ENFORCED");
    }
    clause
}

fn alter_database_sql(name: &str, attrs: &[Attr]) -> String {
    let mut sql = format!("ALTER DATABASE {}", quote(name));
    if let Some(charset) = charset_of(attrs) {
        sql.push_str(&format!(" CHARACTER SET {charset}"));
    }
    if let Some(collation) = collation_of(attrs) {
        sql.push_str(&format!(" COLLATE {collation}"));
    }
    sql
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

fn table_name(table: &Table) -> String {
    quote_qualified(table.schema.as_deref(), &table.name)
}

fn qualified(name: &QualifiedName) -> String {
    quote_qualified(name.schema.as_deref(), &name.name)
}

fn comment_of(attrs: &[Attr]) -> Option<&str> {
    attrs.iter().find_map(|a| match a {
        Attr::Comment(c) => Some(c.as_str()),
        _ => None,
    })
}

fn charset_of(attrs: &[Attr]) -> Option<&str> {
    attrs.iter().find_map(|a| match a {
        Attr::Charset(c) => Some(c.as_str()),
        _ => None,
    })
}

fn collation_of(attrs: &[Attr]) -> Option<&str> {
    attrs.iter().find_map(|a| match a {
        Attr::Collation(c) => Some(c.as_str()),
        _ => None,
    })
}

fn engine_of(attrs: &[Attr]) -> Option<&str> {
    attrs.iter().find_map(|a| match a {
        Attr::Engine(e) => Some(e.as_str()),
        _ => None,
    })
}

fn auto_increment_of(attrs: &[Attr]) -> Option<u64> {
    attrs.iter().find_map(|a| match a {
        Attr::AutoIncrementStart(n) => Some(*n),
        _ => None,
    })
}
