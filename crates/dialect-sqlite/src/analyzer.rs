use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use atlas_core::migrate::{Recognizer, Stmt, StmtKind, classify_stmt};

/// Recognizes the hand-written form of this dialect's rebuild pattern —
/// create `new_X`, copy rows, drop `X`, rename `new_X` to `X` — and folds
/// it back into one logical table modification so the analyzers report a
/// single change instead of a destructive drop. Recognition is heuristic
/// and analysis-only: a sequence that does not fold is analyzed statement
/// by statement.
#[derive(Debug, Default)]
pub struct RebuildRecognizer;

impl Recognizer for RebuildRecognizer {
    fn fold(&self, stmts: &[Stmt]) -> Option<(usize, StmtKind)> {
        if stmts.len() < 4 {
            return None;
        }
        // Each statement must be well-formed SQL before we trust the
        // keyword classification.
        for stmt in &stmts[..4] {
            Parser::parse_sql(&SQLiteDialect {}, &stmt.text).ok()?;
        }

        let StmtKind::CreateTable { table: shadow } = classify_stmt(&stmts[0].text) else {
            return None;
        };
        let original = shadow.strip_prefix("new_")?.to_string();

        let StmtKind::Insert { table: copied_into } = classify_stmt(&stmts[1].text) else {
            return None;
        };
        if copied_into != shadow {
            return None;
        }

        let StmtKind::DropTable { table: dropped } = classify_stmt(&stmts[2].text) else {
            return None;
        };
        if dropped != original {
            return None;
        }

        let StmtKind::RenameTable { from, to } = classify_stmt(&stmts[3].text) else {
            return None;
        };
        if from != shadow || to != original {
            return None;
        }

        Some((4, StmtKind::ModifyTable { table: original }))
    }
}
