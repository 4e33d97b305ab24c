use atlas_core::{
    Column, ColumnType, DevNormalizer, Normalizer as _, Realm, Schema, Table, TypeKind,
    twin_schema_name,
};
use atlas_testkit::FakeDriver;

fn desired_schema() -> Schema {
    let mut schema = Schema::new("app");
    let mut table = Table::new("users");
    table.schema = Some("app".to_string());
    table.columns.push(Column::new(
        "id",
        ColumnType::new("int8", TypeKind::Int { bits: 64, unsigned: false }),
    ));
    schema.tables.push(table);
    schema
}

/// Imitates what a real catalog does to user input: the raw spelling is
/// replaced by the canonical one.
fn canonicalize(schema: &mut Schema) {
    for table in &mut schema.tables {
        for column in &mut table.columns {
            if column.ty.raw == "int8" {
                column.ty.raw = "bigint".to_string();
            }
        }
    }
}

#[test]
fn round_trip_returns_the_canonical_form_under_the_original_name() {
    let mut driver = FakeDriver::new();
    driver.canonicalize = Some(canonicalize);

    let normalized = DevNormalizer::new(&mut driver)
        .normalize_schema(&desired_schema())
        .unwrap();

    assert_eq!(normalized.name, "app");
    assert_eq!(normalized.tables[0].columns[0].ty.raw, "bigint");
}

#[test]
fn twin_schema_is_dropped_on_success() {
    let mut driver = FakeDriver::new();
    DevNormalizer::new(&mut driver)
        .normalize_schema(&desired_schema())
        .unwrap();

    assert!(
        driver.realm.schemas.is_empty(),
        "twin schemas left behind: {:?}",
        driver.realm.schemas
    );
    assert!(driver.executed.iter().any(|s| s.contains("AddSchema")));
    assert!(driver.executed.iter().any(|s| s.contains("DropSchema")));
}

#[test]
fn realm_normalization_covers_every_schema() {
    let mut driver = FakeDriver::new();
    let realm = Realm::new(vec![Schema::new("a"), Schema::new("b")]);
    let normalized = DevNormalizer::new(&mut driver).normalize_realm(&realm).unwrap();
    let names: Vec<_> = normalized.schemas.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
    assert!(driver.realm.schemas.is_empty());
}

#[test]
fn twin_names_are_prefixed_and_unique_per_timestamp() {
    let a = twin_schema_name("app", 1_700_000_000, 64);
    assert!(a.starts_with("atlas_twin_app_"));
    let b = twin_schema_name("app", 1_700_000_001, 64);
    assert_ne!(a, b);
}

#[test]
fn twin_names_respect_the_identifier_limit() {
    let long = "a_rather_long_schema_name_that_overflows";
    let name = twin_schema_name(long, 1_700_000_000, 32);
    assert!(name.len() <= 32, "{name} exceeds the limit");
    assert!(name.starts_with("atlas_twin_"));

    let other = twin_schema_name("a_rather_long_schema_name_that_overflowz", 1_700_000_000, 32);
    assert_ne!(name, other, "distinct inputs must stay distinct");
}
