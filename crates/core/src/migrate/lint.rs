use std::collections::BTreeSet;

use super::stmt::Stmt;

/// A finding of a file-level analyzer. `pos` is the byte offset of the
/// offending statement in its file; `code` is stable across releases so
/// operators can suppress or escalate it by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: String,
    pub pos: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub file: String,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warn,
    Error,
}

/// Decides which diagnostics abort an execution and which only warn.
#[derive(Debug, Clone)]
pub struct SeverityPolicy {
    pub error_codes: BTreeSet<String>,
    pub default: Severity,
}

impl Default for SeverityPolicy {
    fn default() -> Self {
        Self {
            error_codes: BTreeSet::new(),
            default: Severity::Warn,
        }
    }
}

impl SeverityPolicy {
    pub fn severity(&self, code: &str) -> Severity {
        if self.error_codes.contains(code) {
            Severity::Error
        } else {
            self.default
        }
    }
}

/// The statement kinds the analyzers reason about. Classification is
/// keyword-level on purpose: the core only needs statement boundaries and
/// kinds, not full SQL interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    CreateSchema {
        schema: String,
    },
    DropSchema {
        schema: String,
    },
    CreateTable {
        table: String,
    },
    DropTable {
        table: String,
    },
    AlterTable {
        table: String,
        dropped_columns: Vec<String>,
        added_columns: Vec<AddedColumn>,
    },
    RenameTable {
        from: String,
        to: String,
    },
    CreateIndex {
        index: String,
        table: Option<String>,
    },
    DropIndex {
        index: String,
    },
    Insert {
        table: String,
    },
    /// A logical table modification reconstructed by a dialect recognizer
    /// from a multi-statement rewrite sequence.
    ModifyTable {
        table: String,
    },
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedColumn {
    pub name: String,
    pub not_null: bool,
    pub has_default: bool,
}

/// Classify one statement by its leading keywords.
pub fn classify_stmt(sql: &str) -> StmtKind {
    let tokens = tokens(sql);
    let upper: Vec<String> = tokens.iter().map(|t| t.to_ascii_uppercase()).collect();
    let kw = |i: usize, word: &str| upper.get(i).is_some_and(|t| t == word);

    if kw(0, "CREATE") && (kw(1, "SCHEMA") || kw(1, "DATABASE")) {
        return StmtKind::CreateSchema {
            schema: object_name(&tokens, &upper, 2),
        };
    }
    if kw(0, "DROP") && (kw(1, "SCHEMA") || kw(1, "DATABASE")) {
        return StmtKind::DropSchema {
            schema: object_name(&tokens, &upper, 2),
        };
    }
    if kw(0, "CREATE") && kw(1, "TABLE") {
        return StmtKind::CreateTable {
            table: object_name(&tokens, &upper, 2),
        };
    }
    if kw(0, "DROP") && kw(1, "TABLE") {
        return StmtKind::DropTable {
            table: object_name(&tokens, &upper, 2),
        };
    }
    if kw(0, "ALTER") && kw(1, "TABLE") {
        return classify_alter_table(&tokens, &upper);
    }
    if kw(0, "CREATE") && (kw(1, "INDEX") || (kw(1, "UNIQUE") && kw(2, "INDEX"))) {
        let name_at = if kw(1, "UNIQUE") { 3 } else { 2 };
        let table = upper
            .iter()
            .position(|t| t == "ON")
            .map(|i| ident(&tokens[i + 1]));
        return StmtKind::CreateIndex {
            index: object_name(&tokens, &upper, name_at),
            table,
        };
    }
    if kw(0, "DROP") && kw(1, "INDEX") {
        return StmtKind::DropIndex {
            index: object_name(&tokens, &upper, 2),
        };
    }
    if kw(0, "INSERT") && kw(1, "INTO") {
        return StmtKind::Insert {
            table: object_name(&tokens, &upper, 2),
        };
    }
    StmtKind::Other
}

fn classify_alter_table(tokens: &[String], upper: &[String]) -> StmtKind {
    let table = object_name(tokens, upper, 2);
    let mut dropped_columns = Vec::new();
    let mut added_columns = Vec::new();

    let mut i = 3;
    while i < upper.len() {
        match upper[i].as_str() {
            "RENAME" if upper.get(i + 1).is_some_and(|t| t == "TO") => {
                return StmtKind::RenameTable {
                    from: table,
                    to: ident(&tokens[i + 2]),
                };
            }
            "DROP" if upper.get(i + 1).is_some_and(|t| t == "COLUMN") => {
                if let Some(name) = tokens.get(i + 2) {
                    dropped_columns.push(ident(name));
                }
                i += 3;
            }
            "ADD" => {
                let mut at = i + 1;
                if upper.get(at).is_some_and(|t| t == "COLUMN") {
                    at += 1;
                }
                // Skip constraint additions; only column adds matter here.
                if upper
                    .get(at)
                    .is_some_and(|t| matches!(t.as_str(), "CONSTRAINT" | "PRIMARY" | "FOREIGN" | "UNIQUE" | "CHECK" | "INDEX" | "KEY"))
                {
                    i = at + 1;
                    continue;
                }
                if let Some(name) = tokens.get(at) {
                    let clause_end = clause_end(upper, at);
                    let clause = &upper[at..clause_end];
                    let not_null = clause
                        .windows(2)
                        .any(|w| w[0] == "NOT" && w[1] == "NULL");
                    let has_default = clause.iter().any(|t| t == "DEFAULT");
                    added_columns.push(AddedColumn {
                        name: ident(name),
                        not_null,
                        has_default,
                    });
                    i = clause_end;
                    continue;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    StmtKind::AlterTable {
        table,
        dropped_columns,
        added_columns,
    }
}

/// End of the current ALTER clause: the next top-level comma or the end of
/// the statement.
fn clause_end(upper: &[String], start: usize) -> usize {
    let mut depth = 0usize;
    for (i, token) in upper.iter().enumerate().skip(start) {
        match token.as_str() {
            "(" => depth += 1,
            ")" => depth = depth.saturating_sub(1),
            "," if depth == 0 => return i,
            _ => {}
        }
    }
    upper.len()
}

/// Object name after optional `IF [NOT] EXISTS`.
fn object_name(tokens: &[String], upper: &[String], mut at: usize) -> String {
    if upper.get(at).is_some_and(|t| t == "IF") {
        at += 1;
        if upper.get(at).is_some_and(|t| t == "NOT") {
            at += 1;
        }
        if upper.get(at).is_some_and(|t| t == "EXISTS") {
            at += 1;
        }
    }
    tokens.get(at).map(|t| ident(t)).unwrap_or_default()
}

fn ident(token: &str) -> String {
    let token = token
        .trim_matches(|c: char| matches!(c, '"' | '`' | '[' | ']' | ';' | ','));
    // Unqualify: the analyzers compare bare object names.
    token
        .rsplit('.')
        .next()
        .unwrap_or(token)
        .trim_matches(|c: char| matches!(c, '"' | '`'))
        .to_string()
}

fn tokens(sql: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    for ch in sql.chars() {
        match ch {
            '(' | ')' | ',' => {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
                out.push(ch.to_string());
            }
            c if c.is_whitespace() => {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
            }
            _ => cur.push(ch),
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

/// One statement of a pass with its (possibly recognizer-folded) kind.
#[derive(Debug)]
pub struct PassEntry<'a> {
    pub stmt: &'a Stmt,
    pub kind: StmtKind,
}

/// The parsed statement stream an analyzer consumes.
#[derive(Debug)]
pub struct FilePass<'a> {
    pub file: &'a str,
    pub entries: Vec<PassEntry<'a>>,
}

impl FilePass<'_> {
    /// Whether a table with this name is re-created later in the file. A
    /// rename into the dropped name does not count: the dropped rows are
    /// still gone.
    pub fn recreated_later(&self, after: usize, name: &str) -> bool {
        self.entries
            .iter()
            .skip(after + 1)
            .any(|e| matches!(&e.kind, StmtKind::CreateTable { table } if table == name))
    }
}

/// Rewrites a dialect-specific statement sequence into one logical kind
/// before the analyzers see it. Folding is heuristic and analysis-only: a
/// failed recognition degrades to per-statement analysis and never affects
/// execution.
pub trait Recognizer {
    fn fold(&self, stmts: &[Stmt]) -> Option<(usize, StmtKind)>;
}

pub trait Analyzer {
    fn name(&self) -> &'static str;
    fn analyze(&self, pass: &FilePass<'_>) -> Vec<Diagnostic>;
}

/// Destructive-change detection: dropped schemas, tables, and columns,
/// unless the object is replaced later in the same file.
#[derive(Debug, Default)]
pub struct DestructiveAnalyzer;

impl Analyzer for DestructiveAnalyzer {
    fn name(&self) -> &'static str {
        "destructive"
    }

    fn analyze(&self, pass: &FilePass<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for (i, entry) in pass.entries.iter().enumerate() {
            match &entry.kind {
                StmtKind::DropSchema { schema } => out.push(Diagnostic {
                    code: "DS101".to_string(),
                    pos: entry.stmt.pos,
                    text: format!("dropping schema {schema:?}"),
                }),
                StmtKind::DropTable { table } => {
                    if !pass.recreated_later(i, table) {
                        out.push(Diagnostic {
                            code: "DS102".to_string(),
                            pos: entry.stmt.pos,
                            text: format!("dropping table {table:?} without replacement"),
                        });
                    }
                }
                StmtKind::AlterTable {
                    table,
                    dropped_columns,
                    ..
                } => {
                    for column in dropped_columns {
                        out.push(Diagnostic {
                            code: "DS103".to_string(),
                            pos: entry.stmt.pos,
                            text: format!("dropping column {column:?} from table {table:?}"),
                        });
                    }
                }
                _ => {}
            }
        }
        out
    }
}

/// Data-dependent changes: statements whose success depends on the rows
/// already in the table, like adding a non-null column without a default.
#[derive(Debug, Default)]
pub struct DataDependentAnalyzer;

impl Analyzer for DataDependentAnalyzer {
    fn name(&self) -> &'static str {
        "data_depend"
    }

    fn analyze(&self, pass: &FilePass<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for entry in &pass.entries {
            if let StmtKind::AlterTable {
                table,
                added_columns,
                ..
            } = &entry.kind
            {
                for column in added_columns {
                    if column.not_null && !column.has_default {
                        out.push(Diagnostic {
                            code: "MF101".to_string(),
                            pos: entry.stmt.pos,
                            text: format!(
                                "adding non-nullable column {:?} to table {table:?} without a default will fail when the table is not empty",
                                column.name
                            ),
                        });
                    }
                }
            }
        }
        out
    }
}

/// Naming policy: created objects use lower_snake_case identifiers.
#[derive(Debug, Default)]
pub struct NamingAnalyzer;

impl NamingAnalyzer {
    fn conforming(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) if c.is_ascii_lowercase() || c == '_' => {}
            _ => return false,
        }
        chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }
}

impl Analyzer for NamingAnalyzer {
    fn name(&self) -> &'static str {
        "naming"
    }

    fn analyze(&self, pass: &FilePass<'_>) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for entry in &pass.entries {
            let created = match &entry.kind {
                StmtKind::CreateTable { table } => Some(("table", table)),
                StmtKind::CreateIndex { index, .. } => Some(("index", index)),
                StmtKind::CreateSchema { schema } => Some(("schema", schema)),
                _ => None,
            };
            if let Some((kind, name)) = created
                && !name.is_empty()
                && !Self::conforming(name)
            {
                out.push(Diagnostic {
                    code: "NM101".to_string(),
                    pos: entry.stmt.pos,
                    text: format!("{kind} name {name:?} violates the naming policy"),
                });
            }
        }
        out
    }
}

pub fn builtin_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(DestructiveAnalyzer),
        Box::new(DataDependentAnalyzer),
        Box::new(NamingAnalyzer),
    ]
}

/// Run the recognizers and analyzers over one parsed file and collect the
/// surviving diagnostics. `atlas:nolint` directives on a statement
/// suppress its diagnostics, either entirely or per code.
pub fn run_analyzers(
    file: &str,
    stmts: &[Stmt],
    analyzers: &[Box<dyn Analyzer>],
    recognizers: &[Box<dyn Recognizer>],
) -> Report {
    let mut entries = Vec::new();
    let mut i = 0usize;
    'outer: while i < stmts.len() {
        for recognizer in recognizers {
            if let Some((consumed, kind)) = recognizer.fold(&stmts[i..])
                && consumed > 0
            {
                entries.push(PassEntry {
                    stmt: &stmts[i],
                    kind,
                });
                i += consumed;
                continue 'outer;
            }
        }
        entries.push(PassEntry {
            stmt: &stmts[i],
            kind: classify_stmt(&stmts[i].text),
        });
        i += 1;
    }

    let pass = FilePass { file, entries };
    let mut diagnostics = Vec::new();
    for analyzer in analyzers {
        for diagnostic in analyzer.analyze(&pass) {
            let suppressed = pass
                .entries
                .iter()
                .find(|e| e.stmt.pos == diagnostic.pos)
                .and_then(|e| e.stmt.nolint())
                .is_some_and(|codes| codes.is_empty() || codes.contains(&diagnostic.code));
            if !suppressed {
                diagnostics.push(diagnostic);
            }
        }
    }
    diagnostics.sort_by(|a, b| a.pos.cmp(&b.pos).then(a.code.cmp(&b.code)));

    Report {
        file: file.to_string(),
        diagnostics,
    }
}
