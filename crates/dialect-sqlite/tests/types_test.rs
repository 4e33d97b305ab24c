use atlas_core::{Driver as _, TypeIo as _, TypeKind};
use atlas_dialect_sqlite::Sqlite;

#[test]
fn parses_common_spellings() {
    let db = Sqlite::open_in_memory().unwrap();
    assert!(matches!(
        db.parse_type("INTEGER").unwrap().kind,
        TypeKind::Int { bits: 64, .. }
    ));
    assert!(matches!(
        db.parse_type("varchar(80)").unwrap().kind,
        TypeKind::Text { size: Some(80), fixed: false }
    ));
    assert!(matches!(db.parse_type("BLOB").unwrap().kind, TypeKind::Binary { .. }));
    assert!(matches!(db.parse_type("boolean").unwrap().kind, TypeKind::Bool));
    assert!(matches!(
        db.parse_type("DATETIME").unwrap().kind,
        TypeKind::Time { .. }
    ));
}

#[test]
fn unknown_spellings_stay_user_defined() {
    let db = Sqlite::open_in_memory().unwrap();
    let ty = db.parse_type("GEOGRAPHY").unwrap();
    assert!(matches!(ty.kind, TypeKind::UserDefined { .. }));
    assert_eq!(ty.raw, "GEOGRAPHY");
}

#[test]
fn formatting_yields_canonical_spellings() {
    let db = Sqlite::open_in_memory().unwrap();
    let parsed = db.parse_type("int8").unwrap();
    assert_eq!(db.format_type(&parsed).unwrap(), "INTEGER");

    let text = db.parse_type("CLOB").unwrap();
    assert_eq!(db.format_type(&text).unwrap(), "TEXT");
}

#[test]
fn driver_reports_its_name() {
    let db = Sqlite::open_in_memory().unwrap();
    assert_eq!(db.name(), "sqlite3");
}
