use atlas_core::{
    Change, ChangeKind, Column, ColumnType, EnumType, ForeignKey, Index, QualifiedName, Schema,
    Table, TypeKind, sort_changes,
};

fn qn(name: &str) -> QualifiedName {
    QualifiedName::new(Some("app"), name)
}

fn table(name: &str) -> Table {
    let mut table = Table::new(name);
    table.schema = Some("app".to_string());
    table
}

fn table_with_fk(name: &str, referenced: &str) -> Table {
    let mut table = table(name);
    table
        .foreign_keys
        .push(ForeignKey::new(format!("{name}_{referenced}_fk"), qn(referenced)));
    table
}

fn column() -> Column {
    Column::new(
        "c",
        ColumnType::new("int", TypeKind::Int { bits: 32, unsigned: false }),
    )
}

#[test]
fn schemas_precede_their_contents() {
    let sorted = sort_changes(vec![
        Change::AddTable(table("users")),
        Change::AddSchema(Schema::new("app")),
    ]);
    let tags: Vec<_> = sorted.iter().map(Change::tag).collect();
    assert_eq!(tags, ["AddSchema", "AddTable"]);
}

#[test]
fn enums_precede_tables_that_reference_them() {
    let sorted = sort_changes(vec![
        Change::AddTable(table("users")),
        Change::AddEnum {
            schema: Some("app".to_string()),
            enum_type: EnumType::new("state", ["on"]),
        },
    ]);
    let tags: Vec<_> = sorted.iter().map(Change::tag).collect();
    assert_eq!(tags, ["AddEnum", "AddTable"]);
}

#[test]
fn foreign_keys_trail_every_table() {
    let sorted = sort_changes(vec![
        Change::AddForeignKey {
            table: qn("posts"),
            fk: ForeignKey::new("posts_users_fk", qn("users")),
        },
        Change::AddTable(table("posts")),
        Change::AddTable(table("users")),
    ]);
    let tags: Vec<_> = sorted.iter().map(Change::tag).collect();
    assert_eq!(tags, ["AddTable", "AddTable", "AddForeignKey"]);
}

#[test]
fn referenced_tables_are_created_first() {
    let sorted = sort_changes(vec![
        Change::AddTable(table_with_fk("posts", "users")),
        Change::AddTable(table("users")),
    ]);
    let names: Vec<_> = sorted
        .iter()
        .map(|c| match c {
            Change::AddTable(t) => t.name.as_str(),
            _ => panic!("unexpected {c:?}"),
        })
        .collect();
    assert_eq!(names, ["users", "posts"]);
}

#[test]
fn circular_tables_keep_emission_order() {
    let sorted = sort_changes(vec![
        Change::AddTable(table_with_fk("a", "b")),
        Change::AddTable(table_with_fk("b", "a")),
    ]);
    assert_eq!(sorted.len(), 2);
    let names: Vec<_> = sorted
        .iter()
        .map(|c| match c {
            Change::AddTable(t) => t.name.as_str(),
            _ => panic!("unexpected {c:?}"),
        })
        .collect();
    assert_eq!(names, ["a", "b"]);
}

#[test]
fn drops_of_dependents_come_before_their_owners() {
    let sorted = sort_changes(vec![
        Change::DropTable(qn("users")),
        Change::DropColumn {
            table: qn("posts"),
            column: "c".to_string(),
        },
        Change::DropIndex {
            table: qn("posts"),
            index: "idx".to_string(),
        },
        Change::DropForeignKey {
            table: qn("posts"),
            symbol: "fk".to_string(),
        },
    ]);
    let tags: Vec<_> = sorted.iter().map(Change::tag).collect();
    assert_eq!(tags, ["DropForeignKey", "DropIndex", "DropTable", "DropColumn"]);
}

#[test]
fn renames_precede_other_changes_to_the_same_table() {
    let sorted = sort_changes(vec![
        Change::AddColumn {
            table: qn("users"),
            column: column(),
        },
        Change::RenameColumn {
            table: qn("users"),
            from: "a".to_string(),
            to: "b".to_string(),
        },
        Change::RenameTable {
            from: qn("people"),
            to: qn("users"),
        },
    ]);
    let tags: Vec<_> = sorted.iter().map(Change::tag).collect();
    assert_eq!(tags, ["RenameTable", "RenameColumn", "AddColumn"]);
}

#[test]
fn rename_index_precedes_index_modification() {
    let sorted = sort_changes(vec![
        Change::ModifyIndex {
            table: qn("users"),
            change: ChangeKind::UNIQUE,
            from: Index::new("idx"),
            to: Index::new("idx").unique(),
        },
        Change::RenameIndex {
            table: qn("users"),
            from: "old_idx".to_string(),
            to: "idx".to_string(),
        },
    ]);
    let tags: Vec<_> = sorted.iter().map(Change::tag).collect();
    assert_eq!(tags, ["RenameIndex", "ModifyIndex"]);
}

#[test]
fn equal_rank_changes_sort_by_name() {
    let sorted = sort_changes(vec![
        Change::DropTable(qn("zebra")),
        Change::DropTable(qn("alpha")),
        Change::DropTable(qn("mango")),
    ]);
    let names: Vec<_> = sorted
        .iter()
        .map(|c| match c {
            Change::DropTable(n) => n.name.as_str(),
            _ => panic!("unexpected {c:?}"),
        })
        .collect();
    assert_eq!(names, ["alpha", "mango", "zebra"]);
}

#[test]
fn indexes_precede_foreign_keys() {
    let sorted = sort_changes(vec![
        Change::AddForeignKey {
            table: qn("posts"),
            fk: ForeignKey::new("fk", qn("users")),
        },
        Change::AddIndex {
            table: qn("posts"),
            index: Index::new("idx").on_columns(["user_id"]),
        },
    ]);
    let tags: Vec<_> = sorted.iter().map(Change::tag).collect();
    assert_eq!(tags, ["AddIndex", "AddForeignKey"]);
}
