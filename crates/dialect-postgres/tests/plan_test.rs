use atlas_core::{
    Change, ChangeKind, Column, ColumnType, Index, PlanKind, PlanOptions, QualifiedName, Schema,
    Table, TypeKind,
};
use atlas_dialect_postgres::plan_changes;

fn qn(name: &str) -> QualifiedName {
    QualifiedName::new(Some("public"), name)
}

fn enum_type(values: &[&str]) -> ColumnType {
    ColumnType::new(
        "state",
        TypeKind::Enum {
            name: Some("state".to_string()),
            values: values.iter().map(|v| v.to_string()).collect(),
        },
    )
}

#[test]
fn enum_extension_plans_alter_type_without_reverse() {
    let change = Change::ModifyColumn {
        table: qn("tasks"),
        change: ChangeKind::TYPE,
        from: Column::new("state", enum_type(&["on", "off"])),
        to: Column::new("state", enum_type(&["on", "off", "unknown"])),
    };
    let plan = plan_changes("enum extension", &[change], &PlanOptions::default()).unwrap();

    assert_eq!(plan.changes.len(), 1);
    assert_eq!(
        plan.changes[0].cmd,
        "ALTER TYPE \"public\".\"state\" ADD VALUE 'unknown'"
    );
    assert!(plan.changes[0].reverse.is_none());
    assert!(!plan.reversible, "enum extensions cannot be reversed");
}

#[test]
fn enum_value_removal_is_refused() {
    let change = Change::ModifyColumn {
        table: qn("tasks"),
        change: ChangeKind::TYPE,
        from: Column::new("state", enum_type(&["on", "off"])),
        to: Column::new("state", enum_type(&["on"])),
    };
    assert!(plan_changes("enum removal", &[change], &PlanOptions::default()).is_err());
}

#[test]
fn create_table_renders_identity_and_primary_key() {
    let mut table = Table::new("users");
    table.schema = Some("public".to_string());
    let mut id = Column::new(
        "id",
        ColumnType::new("bigint", TypeKind::Int { bits: 64, unsigned: false }),
    );
    id.attrs.push(atlas_core::Attr::Identity { always: false });
    table.columns.push(id);
    table.columns.push(Column::new(
        "email",
        ColumnType::new("text", TypeKind::Text { size: None, fixed: false }),
    ));
    table.primary_key = Some(Index::new("").unique().on_columns(["id"]));

    let plan = plan_changes(
        "create users",
        &[Change::AddTable(table)],
        &PlanOptions::default(),
    )
    .unwrap();

    let cmd = &plan.changes[0].cmd;
    assert!(cmd.starts_with("CREATE TABLE \"public\".\"users\""));
    assert!(cmd.contains("\"id\" bigint GENERATED BY DEFAULT AS IDENTITY NOT NULL"));
    assert!(cmd.contains("PRIMARY KEY (\"id\")"));
    assert_eq!(
        plan.changes[0].reverse.as_deref(),
        Some("DROP TABLE \"public\".\"users\"")
    );
    assert_eq!(plan.changes[0].comment, "create \"users\" table");
    assert!(plan.transactional);
}

#[test]
fn nullability_change_plans_set_not_null_with_reverse() {
    let bigint = ColumnType::new("bigint", TypeKind::Int { bits: 64, unsigned: false });
    let change = Change::ModifyColumn {
        table: qn("users"),
        change: ChangeKind::NULL,
        from: Column::new("age", bigint.clone().nullable()),
        to: Column::new("age", bigint),
    };
    let plan = plan_changes("not null", &[change], &PlanOptions::default()).unwrap();
    assert_eq!(
        plan.changes[0].cmd,
        "ALTER TABLE \"public\".\"users\" ALTER COLUMN \"age\" SET NOT NULL"
    );
    assert_eq!(
        plan.changes[0].reverse.as_deref(),
        Some("ALTER TABLE \"public\".\"users\" ALTER COLUMN \"age\" DROP NOT NULL")
    );
}

#[test]
fn schema_changes_use_cascade_and_if_not_exists() {
    let plan = plan_changes(
        "schemas",
        &[
            Change::DropSchema {
                name: "legacy".to_string(),
            },
            Change::AddSchema(Schema::new("app")),
        ],
        &PlanOptions::default(),
    )
    .unwrap();

    assert_eq!(plan.changes[0].cmd, "DROP SCHEMA \"legacy\" CASCADE");
    assert_eq!(plan.changes[0].kind, PlanKind::Drop);
    assert_eq!(
        plan.changes[1].cmd,
        "CREATE SCHEMA IF NOT EXISTS \"app\""
    );
}

#[test]
fn index_rename_uses_the_alter_index_verb() {
    let plan = plan_changes(
        "rename index",
        &[Change::RenameIndex {
            table: qn("users"),
            from: "idx_old".to_string(),
            to: "idx_new".to_string(),
        }],
        &PlanOptions::default(),
    )
    .unwrap();
    assert_eq!(
        plan.changes[0].cmd,
        "ALTER INDEX \"public\".\"idx_old\" RENAME TO \"idx_new\""
    );
    assert_eq!(
        plan.changes[0].reverse.as_deref(),
        Some("ALTER INDEX \"public\".\"idx_new\" RENAME TO \"idx_old\"")
    );
}
