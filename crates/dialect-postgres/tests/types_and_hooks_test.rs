use atlas_core::{ColumnType, DiffHooks as _, Expr, TypeKind};
use atlas_dialect_postgres::PostgresHooks;

fn parse(raw: &str) -> ColumnType {
    atlas_dialect_postgres::parse_type(raw)
}

#[test]
fn verbose_and_udt_spellings_parse_to_the_same_kind() {
    let verbose = parse("character varying(255)");
    let short = parse("varchar(255)");
    assert_eq!(verbose.kind, short.kind);
    assert!(matches!(
        verbose.kind,
        TypeKind::Text { size: Some(255), fixed: false }
    ));

    assert_eq!(parse("int8").kind, parse("bigint").kind);
    assert_eq!(
        parse("timestamp with time zone").kind,
        parse("timestamptz").kind
    );
    assert!(matches!(parse("jsonb").kind, TypeKind::Json { binary: true }));
    assert!(matches!(
        parse("numeric(10,2)").kind,
        TypeKind::Decimal { precision: Some(10), scale: Some(2) }
    ));
}

#[test]
fn arrays_parse_recursively() {
    let ty = parse("integer[]");
    let TypeKind::Array(inner) = ty.kind else {
        panic!("expected array, got {:?}", ty.kind);
    };
    assert!(matches!(*inner, TypeKind::Int { bits: 32, .. }));
}

#[test]
fn formatting_is_canonical() {
    assert_eq!(
        atlas_dialect_postgres::format_type(&parse("int8")).unwrap(),
        "bigint"
    );
    assert_eq!(
        atlas_dialect_postgres::format_type(&parse("varchar(64)")).unwrap(),
        "character varying(64)"
    );
    assert_eq!(
        atlas_dialect_postgres::format_type(&parse("timestamptz")).unwrap(),
        "timestamp with time zone"
    );
}

#[test]
fn alias_types_compare_equal_in_hooks() {
    let hooks = PostgresHooks;
    assert!(hooks.types_equal(&parse("int8"), &parse("bigint")));
    assert!(!hooks.types_equal(&parse("int4"), &parse("bigint")));
}

#[test]
fn volatile_default_spellings_compare_equal() {
    let hooks = PostgresHooks;
    let now = Expr::Raw("now()".to_string());
    let current = Expr::Raw("CURRENT_TIMESTAMP".to_string());
    assert!(hooks.defaults_equal(Some(&now), Some(&current)));
    assert!(!hooks.defaults_equal(Some(&now), None));

    let zero = Expr::Literal("0".to_string());
    assert!(hooks.defaults_equal(Some(&zero), Some(&Expr::Literal("0".to_string()))));
}

#[test]
fn enum_value_lists_distinguish_types() {
    let hooks = PostgresHooks;
    let small = ColumnType::new(
        "state",
        TypeKind::Enum {
            name: Some("state".to_string()),
            values: vec!["on".to_string(), "off".to_string()],
        },
    );
    let extended = ColumnType::new(
        "state",
        TypeKind::Enum {
            name: Some("state".to_string()),
            values: vec!["on".to_string(), "off".to_string(), "unknown".to_string()],
        },
    );
    assert!(!hooks.types_equal(&small, &extended));
    assert!(hooks.types_equal(&small, &small.clone()));
}
