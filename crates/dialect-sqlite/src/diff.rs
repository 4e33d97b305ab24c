use atlas_core::{ColumnType, DiffHooks, Expr, TypeKind, fold_expr};

/// SQLite equivalence decisions: affinity makes many spellings of the
/// same storage class interchangeable, and the catalog quotes stored
/// defaults in ways user input usually does not.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteHooks;

impl DiffHooks for SqliteHooks {
    fn types_equal(&self, from: &ColumnType, to: &ColumnType) -> bool {
        affinity(&from.kind) == affinity(&to.kind)
    }

    fn defaults_equal(&self, from: Option<&Expr>, to: Option<&Expr>) -> bool {
        match (from, to) {
            (None, None) => true,
            (Some(from), Some(to)) => {
                normalize_default(from) == normalize_default(to)
            }
            _ => false,
        }
    }
}

/// SQLite's five storage classes.
#[derive(Debug, PartialEq, Eq)]
enum Affinity {
    Integer,
    Real,
    Text,
    Blob,
    Numeric,
}

fn affinity(kind: &TypeKind) -> Affinity {
    match kind {
        TypeKind::Int { .. } | TypeKind::Bool => Affinity::Integer,
        TypeKind::Float { .. } => Affinity::Real,
        TypeKind::Text { .. }
        | TypeKind::Enum { .. }
        | TypeKind::Uuid
        | TypeKind::Json { .. } => Affinity::Text,
        TypeKind::Binary { .. } => Affinity::Blob,
        TypeKind::Decimal { .. }
        | TypeKind::Time { .. }
        | TypeKind::Spatial { .. }
        | TypeKind::Array(_)
        | TypeKind::UserDefined { .. } => Affinity::Numeric,
    }
}

fn normalize_default(expr: &Expr) -> String {
    match expr {
        Expr::Literal(text) => text.clone(),
        Expr::Raw(raw) => fold_expr(raw.trim_matches('\'')),
    }
}
