use serde::{Deserialize, Serialize};

/// A default value or predicate. Literals are compared verbatim; raw
/// expressions are compared after whitespace folding, and anything beyond
/// that is an equivalence question for the dialect hooks or the twin
/// database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Expr {
    Literal(String),
    Raw(String),
}

impl Expr {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) | Self::Raw(s) => s,
        }
    }
}
