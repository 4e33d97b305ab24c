use atlas_core::migrate::{
    Severity, SeverityPolicy, StmtKind, builtin_analyzers, classify_stmt, run_analyzers,
    scan_stmts,
};

fn codes(sql: &str) -> Vec<String> {
    let stmts = scan_stmts(sql).unwrap();
    let report = run_analyzers("test.sql", &stmts, &builtin_analyzers(), &[]);
    report.diagnostics.into_iter().map(|d| d.code).collect()
}

#[test]
fn classifies_common_statements() {
    assert_eq!(
        classify_stmt("CREATE TABLE users (id int)"),
        StmtKind::CreateTable {
            table: "users".to_string()
        }
    );
    assert_eq!(
        classify_stmt("DROP TABLE IF EXISTS `users`"),
        StmtKind::DropTable {
            table: "users".to_string()
        }
    );
    assert_eq!(
        classify_stmt("CREATE UNIQUE INDEX idx_users ON users (id)"),
        StmtKind::CreateIndex {
            index: "idx_users".to_string(),
            table: Some("users".to_string())
        }
    );
    assert_eq!(
        classify_stmt("ALTER TABLE users RENAME TO people"),
        StmtKind::RenameTable {
            from: "users".to_string(),
            to: "people".to_string()
        }
    );
    assert_eq!(classify_stmt("SELECT 1"), StmtKind::Other);
}

#[test]
fn alter_table_collects_column_effects() {
    let kind = classify_stmt(
        "ALTER TABLE users DROP COLUMN legacy, ADD COLUMN email varchar(255) NOT NULL",
    );
    let StmtKind::AlterTable {
        table,
        dropped_columns,
        added_columns,
    } = kind
    else {
        panic!("expected AlterTable, got {kind:?}");
    };
    assert_eq!(table, "users");
    assert_eq!(dropped_columns, ["legacy"]);
    assert_eq!(added_columns.len(), 1);
    assert_eq!(added_columns[0].name, "email");
    assert!(added_columns[0].not_null);
    assert!(!added_columns[0].has_default);
}

#[test]
fn destructive_changes_are_reported() {
    assert_eq!(codes("DROP TABLE users;"), ["DS102"]);
    assert_eq!(codes("DROP SCHEMA app;"), ["DS101"]);
    assert_eq!(
        codes("ALTER TABLE users DROP COLUMN email;"),
        ["DS103"]
    );
}

#[test]
fn recreated_table_is_not_flagged_as_destructive() {
    let sql = "DROP TABLE users;\nCREATE TABLE users (id bigint);\n";
    assert!(codes(sql).is_empty(), "got {:?}", codes(sql));
}

#[test]
fn non_null_column_without_default_is_data_dependent() {
    assert_eq!(
        codes("ALTER TABLE users ADD COLUMN age int NOT NULL;"),
        ["MF101"]
    );
    assert!(codes("ALTER TABLE users ADD COLUMN age int NOT NULL DEFAULT 0;").is_empty());
    assert!(codes("ALTER TABLE users ADD COLUMN age int;").is_empty());
}

#[test]
fn naming_policy_flags_non_snake_case() {
    assert_eq!(codes("CREATE TABLE \"Users\" (id int);"), ["NM101"]);
    assert!(codes("CREATE TABLE users_v2 (id int);").is_empty());
}

#[test]
fn nolint_suppresses_by_code_or_entirely() {
    assert!(codes("-- atlas:nolint:DS102\nDROP TABLE users;").is_empty());
    assert!(codes("-- atlas:nolint\nDROP TABLE users;").is_empty());
    // Suppressing an unrelated code keeps the diagnostic.
    assert_eq!(
        codes("-- atlas:nolint:NM101\nDROP TABLE users;"),
        ["DS102"]
    );
}

#[test]
fn severity_policy_escalates_selected_codes() {
    let mut policy = SeverityPolicy::default();
    assert_eq!(policy.severity("DS102"), Severity::Warn);
    policy.error_codes.insert("DS102".to_string());
    assert_eq!(policy.severity("DS102"), Severity::Error);
    assert_eq!(policy.severity("NM101"), Severity::Warn);
}

#[test]
fn diagnostics_point_at_the_offending_statement() {
    let sql = "CREATE TABLE a (id int);\nDROP TABLE users;\n";
    let stmts = scan_stmts(sql).unwrap();
    let report = run_analyzers("test.sql", &stmts, &builtin_analyzers(), &[]);
    assert_eq!(report.diagnostics.len(), 1);
    assert_eq!(report.diagnostics[0].pos, stmts[1].pos);
}
