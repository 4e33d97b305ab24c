use atlas_core::{ColumnType, DiffHooks, Expr, TypeKind, fold_expr};

/// PostgreSQL equivalence decisions. Type aliases (`int8` vs `bigint`)
/// compare by their typed interpretation, and the handful of volatile
/// defaults the catalog rewrites (`now()` vs `CURRENT_TIMESTAMP`) compare
/// equal. Anything subtler goes through the twin database.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresHooks;

impl DiffHooks for PostgresHooks {
    fn types_equal(&self, from: &ColumnType, to: &ColumnType) -> bool {
        match (&from.kind, &to.kind) {
            // Enum equality includes the value list so an extension
            // surfaces as a type change.
            (
                TypeKind::Enum { name: a, values: av },
                TypeKind::Enum { name: b, values: bv },
            ) => a == b && av == bv,
            (a, b) => a == b,
        }
    }

    fn defaults_equal(&self, from: Option<&Expr>, to: Option<&Expr>) -> bool {
        match (from, to) {
            (None, None) => true,
            (Some(from), Some(to)) => normalize_default(from) == normalize_default(to),
            _ => false,
        }
    }
}

fn normalize_default(expr: &Expr) -> String {
    match expr {
        Expr::Literal(text) => text.clone(),
        Expr::Raw(raw) => {
            let folded = fold_expr(raw).to_ascii_lowercase();
            match folded.as_str() {
                "current_timestamp" | "now()" | "transaction_timestamp()" => {
                    "current_timestamp".to_string()
                }
                "current_date" => "current_date".to_string(),
                _ => folded,
            }
        }
    }
}
