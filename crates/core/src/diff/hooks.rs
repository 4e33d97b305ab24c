use crate::{Check, ColumnType, Expr};

/// Collapse whitespace runs into single spaces and trim the ends. Raw
/// expressions compare under this folding before any dialect hook runs.
pub fn fold_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whitespace folding plus stripping of redundant outer parentheses, which
/// catalogs like to add around stored expressions.
pub fn fold_expr(s: &str) -> String {
    let mut folded = fold_ws(s);
    while let Some(inner) = strip_outer_parens(&folded) {
        folded = inner;
    }
    folded
}

fn strip_outer_parens(s: &str) -> Option<String> {
    let inner = s.strip_prefix('(')?.strip_suffix(')')?;
    // The outer pair must actually match each other.
    let mut depth = 0usize;
    for (i, ch) in inner.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return None;
                }
                depth -= 1;
            }
            _ => {
                let _ = i;
            }
        }
    }
    (depth == 0).then(|| inner.trim().to_string())
}

/// Equivalence decisions the core differ delegates to the dialect. Two
/// textually distinct spellings that the dialect treats as the same thing
/// (type aliases, `now()` vs `CURRENT_TIMESTAMP`) must compare equal here;
/// anything subtler is the twin database's job.
pub trait DiffHooks {
    fn types_equal(&self, from: &ColumnType, to: &ColumnType) -> bool {
        from.kind == to.kind || fold_ws(&from.raw).eq_ignore_ascii_case(&fold_ws(&to.raw))
    }

    fn defaults_equal(&self, from: Option<&Expr>, to: Option<&Expr>) -> bool {
        match (from, to) {
            (None, None) => true,
            (Some(from), Some(to)) => {
                from == to || fold_expr(from.as_str()) == fold_expr(to.as_str())
            }
            _ => false,
        }
    }

    fn checks_equal(&self, from: &Check, to: &Check) -> bool {
        fold_expr(&from.expr) == fold_expr(&to.expr)
    }

    fn index_exprs_equal(&self, from: &str, to: &str) -> bool {
        fold_expr(from) == fold_expr(to)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl DiffHooks for DefaultHooks {}

pub static DEFAULT_HOOKS: DefaultHooks = DefaultHooks;
