use atlas_core::{
    Attr, Change, ChangeKind, Column, ColumnType, Index, PlanOptions, QualifiedName, Table,
    TypeKind,
};
use atlas_dialect_mysql::{Flavor, plan_changes};

fn qn(name: &str) -> QualifiedName {
    QualifiedName::new(Some("test"), name)
}

fn bigint() -> ColumnType {
    ColumnType::new("bigint", TypeKind::Int { bits: 64, unsigned: false })
}

/// `users(id BIGINT NOT NULL AUTO_INCREMENT, x BIGINT NOT NULL,
/// PRIMARY KEY(id))` plans as one CREATE TABLE with a DROP TABLE reverse.
#[test]
fn add_table_plans_create_with_drop_reverse() {
    let mut users = Table::new("users");
    users.schema = Some("test".to_string());
    users
        .columns
        .push(Column::new("id", bigint()).with_attr(Attr::AutoIncrement));
    users.columns.push(Column::new("x", bigint()));
    users.primary_key = Some(Index::new("PRIMARY").unique().on_columns(["id"]));

    let plan = plan_changes(
        Flavor::MySql,
        "add users",
        &[Change::AddTable(users)],
        &PlanOptions::default(),
    )
    .unwrap();

    assert_eq!(plan.changes.len(), 1);
    let cmd = &plan.changes[0].cmd;
    assert!(cmd.starts_with("CREATE TABLE `test`.`users`"));
    assert!(cmd.contains("`id` bigint NOT NULL AUTO_INCREMENT"));
    assert!(cmd.contains("`x` bigint NOT NULL"));
    assert!(cmd.contains("PRIMARY KEY (`id`)"));
    assert_eq!(
        plan.changes[0].reverse.as_deref(),
        Some("DROP TABLE `test`.`users`")
    );
    assert_eq!(plan.changes[0].comment, "create \"users\" table");
    assert!(!plan.transactional, "mysql ddl does not join transactions");
    assert!(plan.reversible);
}

#[test]
fn modify_column_rewrites_the_full_definition() {
    let from = Column::new("age", bigint().nullable());
    let to = Column::new("age", bigint());
    let plan = plan_changes(
        Flavor::MySql,
        "modify age",
        &[Change::ModifyColumn {
            table: qn("users"),
            change: ChangeKind::NULL,
            from,
            to,
        }],
        &PlanOptions::default(),
    )
    .unwrap();

    assert_eq!(
        plan.changes[0].cmd,
        "ALTER TABLE `test`.`users` MODIFY COLUMN `age` bigint NOT NULL"
    );
    assert_eq!(
        plan.changes[0].reverse.as_deref(),
        Some("ALTER TABLE `test`.`users` MODIFY COLUMN `age` bigint NULL")
    );
}

#[test]
fn tidb_drops_indexes_through_alter_table() {
    let change = Change::DropIndex {
        table: qn("users"),
        index: "idx_email".to_string(),
    };

    let mysql = plan_changes(
        Flavor::MySql,
        "drop index",
        std::slice::from_ref(&change),
        &PlanOptions::default(),
    )
    .unwrap();
    assert_eq!(
        mysql.changes[0].cmd,
        "DROP INDEX `idx_email` ON `test`.`users`"
    );

    let tidb = plan_changes(
        Flavor::TiDb,
        "drop index",
        &[change],
        &PlanOptions::default(),
    )
    .unwrap();
    assert_eq!(
        tidb.changes[0].cmd,
        "ALTER TABLE `test`.`users` DROP INDEX `idx_email`"
    );
}

#[test]
fn mariadb_drops_checks_as_constraints() {
    let change = Change::DropCheck {
        table: qn("users"),
        name: "age_positive".to_string(),
    };

    let mysql = plan_changes(
        Flavor::MySql,
        "drop check",
        std::slice::from_ref(&change),
        &PlanOptions::default(),
    )
    .unwrap();
    assert_eq!(
        mysql.changes[0].cmd,
        "ALTER TABLE `test`.`users` DROP CHECK `age_positive`"
    );

    let mariadb = plan_changes(
        Flavor::MariaDb,
        "drop check",
        &[change],
        &PlanOptions::default(),
    )
    .unwrap();
    assert_eq!(
        mariadb.changes[0].cmd,
        "ALTER TABLE `test`.`users` DROP CONSTRAINT `age_positive`"
    );
}

#[test]
fn rename_index_uses_the_alter_table_verb() {
    let plan = plan_changes(
        Flavor::MySql,
        "rename index",
        &[Change::RenameIndex {
            table: qn("users"),
            from: "idx_a".to_string(),
            to: "idx_b".to_string(),
        }],
        &PlanOptions::default(),
    )
    .unwrap();
    assert_eq!(
        plan.changes[0].cmd,
        "ALTER TABLE `test`.`users` RENAME INDEX `idx_a` TO `idx_b`"
    );
}

#[test]
fn non_null_add_column_without_default_is_irreversible() {
    let plan = plan_changes(
        Flavor::MySql,
        "add column",
        &[Change::AddColumn {
            table: qn("users"),
            column: Column::new("x", bigint()),
        }],
        &PlanOptions::default(),
    )
    .unwrap();
    assert!(plan.changes[0].reverse.is_none());
    assert!(!plan.reversible);

    let nullable = plan_changes(
        Flavor::MySql,
        "add column",
        &[Change::AddColumn {
            table: qn("users"),
            column: Column::new("x", bigint().nullable()),
        }],
        &PlanOptions::default(),
    )
    .unwrap();
    assert!(nullable.changes[0].reverse.is_some());
    assert!(nullable.reversible);
}

#[test]
fn schema_ops_map_to_databases() {
    let mut app = atlas_core::Schema::new("app");
    app.attrs.push(Attr::Charset("utf8mb4".to_string()));

    let plan = plan_changes(
        Flavor::MySql,
        "schemas",
        &[Change::AddSchema(app)],
        &PlanOptions::default(),
    )
    .unwrap();
    assert_eq!(
        plan.changes[0].cmd,
        "CREATE DATABASE `app` CHARACTER SET utf8mb4"
    );
    assert_eq!(
        plan.changes[0].reverse.as_deref(),
        Some("DROP DATABASE `app`")
    );
}
