use atlas_core::{
    Change, ChangeKind, Column, ColumnType, Conn as _, PlanApplier as _, PlanKind, PlanOptions,
    QualifiedName, TypeKind, apply_plan,
};
use atlas_dialect_sqlite::Sqlite;

fn integer() -> ColumnType {
    ColumnType::new("INTEGER", TypeKind::Int { bits: 64, unsigned: false })
}

fn real() -> ColumnType {
    ColumnType::new("REAL", TypeKind::Float { double: true })
}

/// A non-trivial column change plans as the four-statement rewrite:
/// create `new_X`, copy rows, drop `X`, rename `new_X` to `X`.
#[test]
fn non_trivial_column_change_plans_the_rebuild_pattern() {
    let mut db = Sqlite::open_in_memory().unwrap();
    db.exec("CREATE TABLE users (a INTEGER NOT NULL)").unwrap();

    let change = Change::ModifyColumn {
        table: QualifiedName::new(Some("main"), "users"),
        change: ChangeKind::TYPE | ChangeKind::NULL,
        from: Column::new("a", integer()),
        to: Column::new("a", real().nullable()),
    };
    let plan = db
        .plan_changes("modify users", &[change], &PlanOptions::default())
        .unwrap();

    assert_eq!(plan.changes.len(), 4);
    assert!(plan.changes[0].cmd.starts_with("CREATE TABLE \"new_users\""));
    assert!(plan.changes[0].cmd.contains("\"a\" REAL"));
    assert!(!plan.changes[0].cmd.contains("NOT NULL"));
    assert_eq!(
        plan.changes[1].cmd,
        "INSERT INTO \"new_users\" (\"a\") SELECT \"a\" FROM \"users\""
    );
    assert_eq!(plan.changes[2].cmd, "DROP TABLE \"users\"");
    assert_eq!(
        plan.changes[3].cmd,
        "ALTER TABLE \"new_users\" RENAME TO \"users\""
    );
    assert!(!plan.reversible);

    // The plan must actually run against the database it was built from.
    db.exec("INSERT INTO users (a) VALUES (7)").unwrap();
    apply_plan(&mut db, &plan, None).unwrap();
    db.exec("INSERT INTO users (a) VALUES (NULL)").unwrap();
}

#[test]
fn dropped_column_is_excluded_from_the_row_copy() {
    let mut db = Sqlite::open_in_memory().unwrap();
    db.exec("CREATE TABLE t (a INTEGER NOT NULL, b TEXT)").unwrap();

    let change = Change::DropColumn {
        table: QualifiedName::new(Some("main"), "t"),
        column: "b".to_string(),
    };
    let plan = db
        .plan_changes("drop column", &[change], &PlanOptions::default())
        .unwrap();
    assert_eq!(
        plan.changes[1].cmd,
        "INSERT INTO \"new_t\" (\"a\") SELECT \"a\" FROM \"t\""
    );
}

#[test]
fn consecutive_rebuild_changes_share_one_rebuild() {
    let mut db = Sqlite::open_in_memory().unwrap();
    db.exec("CREATE TABLE t (a INTEGER NOT NULL, b TEXT)").unwrap();

    let table = QualifiedName::new(Some("main"), "t");
    let changes = vec![
        Change::ModifyColumn {
            table: table.clone(),
            change: ChangeKind::NULL,
            from: Column::new("a", integer()),
            to: Column::new("a", integer().nullable()),
        },
        Change::DropColumn {
            table,
            column: "b".to_string(),
        },
    ];
    let plan = db
        .plan_changes("batch", &changes, &PlanOptions::default())
        .unwrap();
    assert_eq!(plan.changes.len(), 4, "one rebuild, not two: {plan:#?}");
}

#[test]
fn simple_changes_avoid_the_rebuild() {
    let mut db = Sqlite::open_in_memory().unwrap();
    db.exec("CREATE TABLE t (a INTEGER NOT NULL)").unwrap();

    let plan = db
        .plan_changes(
            "add column",
            &[Change::AddColumn {
                table: QualifiedName::new(Some("main"), "t"),
                column: Column::new("b", integer().nullable()),
            }],
            &PlanOptions::default(),
        )
        .unwrap();
    assert_eq!(plan.changes.len(), 1);
    assert_eq!(
        plan.changes[0].cmd,
        "ALTER TABLE \"t\" ADD COLUMN \"b\" INTEGER"
    );
    assert_eq!(plan.changes[0].kind, PlanKind::Alter);
    assert!(plan.reversible);
}

#[test]
fn rename_table_is_reversible() {
    let mut db = Sqlite::open_in_memory().unwrap();
    db.exec("CREATE TABLE old_name (a INTEGER)").unwrap();

    let plan = db
        .plan_changes(
            "rename",
            &[Change::RenameTable {
                from: QualifiedName::new(Some("main"), "old_name"),
                to: QualifiedName::new(Some("main"), "new_name"),
            }],
            &PlanOptions::default(),
        )
        .unwrap();
    assert_eq!(
        plan.changes[0].reverse.as_deref(),
        Some("ALTER TABLE \"new_name\" RENAME TO \"old_name\"")
    );
}
