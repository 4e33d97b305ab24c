use atlas_core::{DiffHooks as _, Expr, TypeKind};
use atlas_dialect_mysql::{MysqlHooks, format_type, parse_type};

#[test]
fn display_widths_and_unsigned_parse() {
    let ty = parse_type("int(11)");
    assert!(matches!(ty.kind, TypeKind::Int { bits: 32, unsigned: false }));

    let unsigned = parse_type("bigint unsigned");
    assert!(matches!(unsigned.kind, TypeKind::Int { bits: 64, unsigned: true }));

    let widened = parse_type("bigint(20) unsigned");
    assert!(matches!(widened.kind, TypeKind::Int { bits: 64, unsigned: true }));
}

#[test]
fn tinyint1_is_the_conventional_boolean() {
    assert!(matches!(parse_type("tinyint(1)").kind, TypeKind::Bool));
    assert!(matches!(
        parse_type("tinyint(4)").kind,
        TypeKind::Int { bits: 8, .. }
    ));
}

#[test]
fn inline_enums_keep_their_value_list() {
    let ty = parse_type("enum('on','off')");
    let TypeKind::Enum { values, name } = ty.kind else {
        panic!("expected enum, got {:?}", ty.kind);
    };
    assert_eq!(name, None);
    assert_eq!(values, ["on", "off"]);
}

#[test]
fn formatting_round_trips_core_types() {
    assert_eq!(format_type(&parse_type("bigint unsigned")).unwrap(), "bigint unsigned");
    assert_eq!(format_type(&parse_type("varchar(255)")).unwrap(), "varchar(255)");
    assert_eq!(format_type(&parse_type("decimal(10,2)")).unwrap(), "decimal(10,2)");
    assert_eq!(
        format_type(&parse_type("enum('a','b')")).unwrap(),
        "enum('a','b')"
    );
    assert_eq!(format_type(&parse_type("datetime(6)")).unwrap(), "datetime(6)");
}

#[test]
fn display_width_differences_compare_equal() {
    let hooks = MysqlHooks;
    assert!(hooks.types_equal(&parse_type("int(11)"), &parse_type("int")));
    assert!(!hooks.types_equal(&parse_type("int"), &parse_type("bigint")));
}

#[test]
fn current_timestamp_spellings_compare_equal() {
    let hooks = MysqlHooks;
    assert!(hooks.defaults_equal(
        Some(&Expr::Raw("CURRENT_TIMESTAMP".to_string())),
        Some(&Expr::Raw("current_timestamp()".to_string())),
    ));
}
