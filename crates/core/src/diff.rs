mod engine;
mod hooks;

pub use engine::DiffEngine;
pub use hooks::{DEFAULT_HOOKS, DefaultHooks, DiffHooks, fold_expr, fold_ws};
