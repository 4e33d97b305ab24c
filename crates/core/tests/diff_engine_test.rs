use atlas_core::{
    Attr, Change, ChangeKind, Column, ColumnType, DefaultHooks, DiffEngine, EnumType, Error,
    ForeignKey, Index, QualifiedName, Schema, Table, TypeKind, UserError,
};

fn bigint() -> ColumnType {
    ColumnType::new("bigint", TypeKind::Int { bits: 64, unsigned: false })
}

fn int() -> ColumnType {
    ColumnType::new("int", TypeKind::Int { bits: 32, unsigned: false })
}

fn users(schema: &str) -> Table {
    let mut table = Table::new("users");
    table.schema = Some(schema.to_string());
    table.columns.push(Column::new("id", bigint()));
    table.primary_key = Some(Index::new("").unique().on_columns(["id"]));
    table
}

fn schema_with(tables: Vec<Table>) -> Schema {
    let mut schema = Schema::new("app");
    schema.tables = tables;
    schema
}

#[test]
fn added_table_yields_add_table() {
    let engine = DiffEngine::new(&DefaultHooks);
    let changes = engine
        .schema_diff(&schema_with(vec![]), &schema_with(vec![users("app")]))
        .unwrap();
    assert_eq!(changes.len(), 1);
    assert!(matches!(&changes[0], Change::AddTable(t) if t.name == "users"));
}

#[test]
fn identical_schemas_yield_no_changes() {
    let engine = DiffEngine::new(&DefaultHooks);
    let changes = engine
        .schema_diff(
            &schema_with(vec![users("app")]),
            &schema_with(vec![users("app")]),
        )
        .unwrap();
    assert!(changes.is_empty(), "unexpected changes: {changes:?}");
}

#[test]
fn column_type_and_null_changes_set_facets() {
    let mut from = users("app");
    from.columns.push(Column::new("age", bigint()));
    let mut to = users("app");
    to.columns.push(Column::new("age", int().nullable()));

    let engine = DiffEngine::new(&DefaultHooks);
    let changes = engine
        .schema_diff(&schema_with(vec![from]), &schema_with(vec![to]))
        .unwrap();
    assert_eq!(changes.len(), 1);
    let Change::ModifyColumn { change, .. } = &changes[0] else {
        panic!("expected ModifyColumn, got {changes:?}");
    };
    assert!(change.contains(ChangeKind::TYPE));
    assert!(change.contains(ChangeKind::NULL));
    assert!(!change.contains(ChangeKind::DEFAULT));
}

#[test]
fn rename_needs_explicit_directive() {
    let mut from = users("app");
    from.columns.push(Column::new("email", bigint()));
    // Without a directive the rename decays to drop + add.
    let mut to_plain = users("app");
    to_plain.columns.push(Column::new("mail", bigint()));

    let engine = DiffEngine::new(&DefaultHooks);
    let changes = engine
        .schema_diff(
            &schema_with(vec![from.clone()]),
            &schema_with(vec![to_plain]),
        )
        .unwrap();
    let tags: Vec<_> = changes.iter().map(Change::tag).collect();
    assert_eq!(tags, ["AddColumn", "DropColumn"]);

    let mut to_directive = users("app");
    let mut renamed = Column::new("mail", bigint());
    renamed.renamed_from = Some("email".to_string());
    to_directive.columns.push(renamed);

    let changes = engine
        .schema_diff(&schema_with(vec![from]), &schema_with(vec![to_directive]))
        .unwrap();
    assert_eq!(changes.len(), 1);
    assert!(
        matches!(&changes[0], Change::RenameColumn { from, to, .. } if from == "email" && to == "mail")
    );
}

#[test]
fn unnamed_indexes_match_structurally() {
    let mut from = users("app");
    let mut unnamed = Index::new("").on_columns(["id"]);
    unnamed.unique = false;
    from.indexes.push(unnamed.clone());

    let mut to = users("app");
    to.indexes.push(unnamed);

    let engine = DiffEngine::new(&DefaultHooks);
    let changes = engine
        .schema_diff(&schema_with(vec![from]), &schema_with(vec![to]))
        .unwrap();
    assert!(changes.is_empty(), "structural match failed: {changes:?}");
}

#[test]
fn dropped_table_drops_foreign_keys_first() {
    let mut posts = Table::new("posts");
    posts.schema = Some("app".to_string());
    posts.columns.push(Column::new("user_id", bigint()));
    let mut fk = ForeignKey::new("posts_users_fk", QualifiedName::new(Some("app"), "users"));
    fk.columns.push("user_id".to_string());
    fk.ref_columns.push("id".to_string());
    posts.foreign_keys.push(fk);

    let engine = DiffEngine::new(&DefaultHooks);
    let changes = engine
        .schema_diff(
            &schema_with(vec![users("app"), posts]),
            &schema_with(vec![users("app")]),
        )
        .unwrap();
    let tags: Vec<_> = changes.iter().map(Change::tag).collect();
    assert_eq!(tags, ["DropForeignKey", "DropTable"]);
}

#[test]
fn added_table_emits_trailing_foreign_key() {
    let mut posts = Table::new("posts");
    posts.schema = Some("app".to_string());
    posts.columns.push(Column::new("user_id", bigint()));
    let mut fk = ForeignKey::new("posts_users_fk", QualifiedName::new(Some("app"), "users"));
    fk.columns.push("user_id".to_string());
    fk.ref_columns.push("id".to_string());
    posts.foreign_keys.push(fk);

    let engine = DiffEngine::new(&DefaultHooks);
    let changes = engine
        .schema_diff(
            &schema_with(vec![users("app")]),
            &schema_with(vec![users("app"), posts]),
        )
        .unwrap();
    let tags: Vec<_> = changes.iter().map(Change::tag).collect();
    assert_eq!(tags, ["AddTable", "AddForeignKey"]);
}

#[test]
fn enum_value_addition_is_a_values_change() {
    let mut from = Schema::new("app");
    from.enums.push(EnumType::new("state", ["on", "off"]));
    let mut to = Schema::new("app");
    to.enums.push(EnumType::new("state", ["on", "off", "unknown"]));

    let engine = DiffEngine::new(&DefaultHooks);
    let changes = engine.schema_diff(&from, &to).unwrap();
    assert_eq!(changes.len(), 1);
    assert!(matches!(
        &changes[0],
        Change::ModifyEnum { change, .. } if change.contains(ChangeKind::VALUES)
    ));
}

#[test]
fn kind_conflict_is_an_error() {
    let from = schema_with(vec![users("app")]);
    let mut to = Schema::new("app");
    to.views
        .push(atlas_core::View::new("users", "SELECT 1"));

    let engine = DiffEngine::new(&DefaultHooks);
    let err = engine.schema_diff(&from, &to).unwrap_err();
    assert!(matches!(
        err,
        Error::User(UserError::KindConflict { name, .. }) if name == "users"
    ));
}

#[test]
fn whitespace_only_default_difference_is_equal() {
    let mut from = users("app");
    from.columns.push(
        Column::new("state", int()).with_default(atlas_core::Expr::Raw("(1 +  2)".to_string())),
    );
    let mut to = users("app");
    to.columns
        .push(Column::new("state", int()).with_default(atlas_core::Expr::Raw("1 + 2".to_string())));

    let engine = DiffEngine::new(&DefaultHooks);
    let changes = engine
        .schema_diff(&schema_with(vec![from]), &schema_with(vec![to]))
        .unwrap();
    assert!(changes.is_empty(), "fold failed: {changes:?}");
}

#[test]
fn comment_attr_sets_comment_facet() {
    let mut from = users("app");
    from.attrs.push(Attr::Comment("old".to_string()));
    let mut to = users("app");
    to.attrs.push(Attr::Comment("new".to_string()));

    let engine = DiffEngine::new(&DefaultHooks);
    let changes = engine
        .schema_diff(&schema_with(vec![from]), &schema_with(vec![to]))
        .unwrap();
    assert_eq!(changes.len(), 1);
    assert!(matches!(
        &changes[0],
        Change::ModifyTable { change, .. } if *change == ChangeKind::COMMENT
    ));
}
