//! Create-inspect-diff round trips against a real database: applying a
//! desired schema to an empty database and diffing the inspection result
//! back against it must yield no changes.

use atlas_core::{
    Column, ColumnType, Conn as _, DiffEngine, Expr, ForeignKey, Index, InspectOptions,
    Inspector as _, PlanApplier as _, PlanOptions, QualifiedName, ReferenceAction, Schema, Table,
    TypeKind, apply_plan,
};
use atlas_dialect_sqlite::{Sqlite, SqliteHooks};

fn bigint() -> ColumnType {
    ColumnType::new("INTEGER", TypeKind::Int { bits: 64, unsigned: false })
}

fn text() -> ColumnType {
    ColumnType::new("TEXT", TypeKind::Text { size: None, fixed: false })
}

fn desired() -> Schema {
    let mut schema = Schema::new("main");

    let mut users = Table::new("users");
    users.schema = Some("main".to_string());
    users.columns.push(Column::new("id", bigint()));
    users.columns.push(
        Column::new("email", text()).with_default(Expr::Literal("nobody".to_string())),
    );
    users.columns.push(Column::new("age", bigint().nullable()));
    users.primary_key = Some(Index::new("").unique().on_columns(["id"]));
    users
        .indexes
        .push(Index::new("idx_users_email").unique().on_columns(["email"]));

    let mut posts = Table::new("posts");
    posts.schema = Some("main".to_string());
    posts.columns.push(Column::new("id", bigint()));
    posts.columns.push(Column::new("user_id", bigint()));
    posts.primary_key = Some(Index::new("").unique().on_columns(["id"]));
    let mut fk = ForeignKey::new("posts_fk_0", QualifiedName::new(Some("main"), "users"));
    fk.columns.push("user_id".to_string());
    fk.ref_columns.push("id".to_string());
    fk.on_delete = ReferenceAction::Cascade;
    posts.foreign_keys.push(fk);

    schema.tables = vec![users, posts];
    schema
}

#[test]
fn apply_then_inspect_then_diff_is_empty() {
    let mut db = Sqlite::open_in_memory().unwrap();
    let engine = DiffEngine::new(&SqliteHooks);

    let empty = db.inspect_schema("main", &InspectOptions::default()).unwrap();
    let changes = engine.schema_diff(&empty, &desired()).unwrap();
    assert!(!changes.is_empty());

    db.apply_changes(&changes, &PlanOptions::default()).unwrap();

    let inspected = db.inspect_schema("main", &InspectOptions::default()).unwrap();
    let residue = engine.schema_diff(&inspected, &desired()).unwrap();
    assert!(residue.is_empty(), "round trip left changes: {residue:#?}");
}

#[test]
fn diff_then_apply_converges_two_databases() {
    let mut source = Sqlite::open_in_memory().unwrap();
    source
        .exec("CREATE TABLE items (id INTEGER NOT NULL PRIMARY KEY, name TEXT NOT NULL)")
        .unwrap();
    source
        .exec("CREATE INDEX idx_items_name ON items (name)")
        .unwrap();

    let mut target = Sqlite::open_in_memory().unwrap();
    let engine = DiffEngine::new(&SqliteHooks);

    let want = source.inspect_schema("main", &InspectOptions::default()).unwrap();
    let have = target.inspect_schema("main", &InspectOptions::default()).unwrap();
    let changes = engine.schema_diff(&have, &want).unwrap();
    let plan = target
        .plan_changes("converge", &changes, &PlanOptions::default())
        .unwrap();
    apply_plan(&mut target, &plan, None).unwrap();

    let converged = target.inspect_schema("main", &InspectOptions::default()).unwrap();
    let residue = engine.schema_diff(&converged, &want).unwrap();
    assert!(residue.is_empty(), "databases did not converge: {residue:#?}");
}

#[test]
fn inspection_reads_back_model_details() {
    let mut db = Sqlite::open_in_memory().unwrap();
    db.exec(
        "CREATE TABLE t (
           id INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
           name TEXT NOT NULL DEFAULT 'unknown',
           score REAL
         )",
    )
    .unwrap();

    let schema = db.inspect_schema("main", &InspectOptions::default()).unwrap();
    let table = schema.table("t").unwrap();

    let id = table.column("id").unwrap();
    assert!(!id.ty.nullable);
    assert!(matches!(id.ty.kind, TypeKind::Int { .. }));

    let name = table.column("name").unwrap();
    assert!(!name.ty.nullable);
    assert_eq!(name.default, Some(Expr::Literal("unknown".to_string())));

    let score = table.column("score").unwrap();
    assert!(score.ty.nullable);

    let pk = table.primary_key.as_ref().unwrap();
    assert_eq!(pk.parts.len(), 1);
}
