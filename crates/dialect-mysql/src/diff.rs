use atlas_core::{ColumnType, DiffHooks, Expr, TypeKind, fold_expr};

/// MySQL equivalence decisions. Display widths (`int(11)`), the
/// `tinyint(1)`/`bool` pairing, and the catalog's spelling of volatile
/// defaults all fold away; inline enum columns compare by value list.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlHooks;

impl DiffHooks for MysqlHooks {
    fn types_equal(&self, from: &ColumnType, to: &ColumnType) -> bool {
        match (&from.kind, &to.kind) {
            (TypeKind::Enum { values: a, .. }, TypeKind::Enum { values: b, .. }) => a == b,
            // Display width is presentation only.
            (TypeKind::Int { bits: a, unsigned: au }, TypeKind::Int { bits: b, unsigned: bu }) => {
                a == b && au == bu
            }
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
    let text = match expr {
        Expr::Literal(text) => text.clone(),
        Expr::Raw(raw) => fold_expr(raw),
    };
    let lower = text.to_ascii_lowercase();
    match lower.as_str() {
        "current_timestamp" | "current_timestamp()" | "now()" => "current_timestamp".to_string(),
        _ => lower,
    }
}
