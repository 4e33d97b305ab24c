use crate::{Result, UserError};

const DIRECTIVE_PREFIX: &str = "-- atlas:";

/// One statement of a migration file: its text, byte offset in the file,
/// and the comment lines that immediately preceded it (where `-- atlas:*`
/// directives live).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub pos: usize,
    pub text: String,
    pub comments: Vec<String>,
}

impl Stmt {
    /// Arguments of every `-- atlas:<name> ...` directive attached to this
    /// statement.
    pub fn directives(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        for comment in &self.comments {
            let Some(rest) = comment.trim().strip_prefix(DIRECTIVE_PREFIX) else {
                continue;
            };
            if let Some(args) = rest.strip_prefix(name) {
                // Either `atlas:name arg` or the bare `atlas:name`.
                if args.is_empty() || args.starts_with(' ') || args.starts_with(':') {
                    out.push(args.trim_start_matches(':').trim().to_string());
                }
            }
        }
        out
    }

    /// Diagnostic codes suppressed on this statement. `None` means no
    /// suppression; an empty set suppresses everything.
    pub fn nolint(&self) -> Option<Vec<String>> {
        let directives = self.directives("nolint");
        if directives.is_empty() {
            return None;
        }
        Some(
            directives
                .iter()
                .flat_map(|d| d.split_whitespace())
                .map(str::to_string)
                .collect(),
        )
    }
}

/// A file-level checkpoint declaration: the file's contents alone
/// reproduce the state of all prior files combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    pub tag: Option<String>,
}

/// Parse the checkpoint directive when the file opens with one.
pub fn checkpoint_of(content: &str) -> Option<Checkpoint> {
    let first = content.lines().find(|l| !l.trim().is_empty())?;
    let rest = first.trim().strip_prefix(DIRECTIVE_PREFIX)?;
    let args = rest.strip_prefix("checkpoint")?;
    let tag = args.trim();
    Some(Checkpoint {
        tag: (!tag.is_empty()).then(|| tag.to_string()),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    None,
    Single,
    Double,
    Backtick,
    LineComment,
    BlockComment,
    Dollar,
}

/// Split a migration file into statements. The scanner respects quoting,
/// line and block comments, PostgreSQL dollar-quoted bodies, and
/// `-- atlas:delimiter <token>` directives that override the terminator
/// until the next such directive.
pub fn scan_stmts(content: &str) -> Result<Vec<Stmt>> {
    let bytes = content.as_bytes();
    let mut stmts = Vec::new();
    let mut delimiter = ";".to_string();
    let mut state = QuoteState::None;
    let mut dollar_tag = String::new();

    let mut buf = String::new();
    let mut pos = 0usize;
    let mut start: Option<usize> = None;
    let mut comments: Vec<String> = Vec::new();

    while pos < bytes.len() {
        let rest = &content[pos..];

        if state == QuoteState::None {
            // Between statements: full comment lines attach to the next
            // statement, and delimiter directives take effect immediately.
            if buf.trim().is_empty() && (rest.starts_with("--") || rest.starts_with('#')) {
                let line_end = rest.find('\n').map_or(bytes.len(), |i| pos + i);
                let line = content[pos..line_end].trim_end().to_string();
                if let Some(args) = line.strip_prefix(DIRECTIVE_PREFIX).and_then(|r| {
                    r.strip_prefix("delimiter")
                }) {
                    let token = args.trim();
                    if token.is_empty() {
                        return Err(UserError::Directive {
                            text: line,
                            reason: "directive requires a delimiter token".to_string(),
                        }
                        .into());
                    }
                    delimiter = token.to_string();
                } else {
                    comments.push(line);
                }
                buf.clear();
                pos = line_end + 1;
                continue;
            }

            // End of statement at the active delimiter.
            if rest.starts_with(delimiter.as_str()) {
                let text = buf.trim();
                if !text.is_empty() {
                    stmts.push(Stmt {
                        pos: start.unwrap_or(0),
                        text: text.to_string(),
                        comments: std::mem::take(&mut comments),
                    });
                }
                buf.clear();
                start = None;
                pos += delimiter.len();
                continue;
            }
        }

        let ch = rest.chars().next().expect("non-empty remainder");
        match state {
            QuoteState::None => match ch {
                '\'' => state = QuoteState::Single,
                '"' => state = QuoteState::Double,
                '`' => state = QuoteState::Backtick,
                '-' if rest.starts_with("--") => state = QuoteState::LineComment,
                '#' => state = QuoteState::LineComment,
                '/' if rest.starts_with("/*") => state = QuoteState::BlockComment,
                '$' => {
                    if let Some(tag) = dollar_tag_at(rest) {
                        dollar_tag = tag;
                        state = QuoteState::Dollar;
                        buf.push_str(&dollar_tag);
                        if start.is_none() && !ch.is_whitespace() {
                            start = Some(pos);
                        }
                        pos += dollar_tag.len();
                        continue;
                    }
                }
                _ => {}
            },
            QuoteState::Single => {
                if ch == '\\' {
                    // Skip the escaped character too.
                    buf.push(ch);
                    pos += ch.len_utf8();
                    if let Some(next) = content[pos..].chars().next() {
                        buf.push(next);
                        pos += next.len_utf8();
                    }
                    continue;
                }
                if ch == '\'' {
                    state = QuoteState::None;
                }
            }
            QuoteState::Double => {
                if ch == '"' {
                    state = QuoteState::None;
                }
            }
            QuoteState::Backtick => {
                if ch == '`' {
                    state = QuoteState::None;
                }
            }
            QuoteState::LineComment => {
                if ch == '\n' {
                    state = QuoteState::None;
                }
            }
            QuoteState::BlockComment => {
                if rest.starts_with("*/") {
                    state = QuoteState::None;
                    buf.push_str("*/");
                    pos += 2;
                    continue;
                }
            }
            QuoteState::Dollar => {
                if rest.starts_with(dollar_tag.as_str()) {
                    state = QuoteState::None;
                    buf.push_str(&dollar_tag);
                    pos += dollar_tag.len();
                    continue;
                }
            }
        }

        if start.is_none() && !ch.is_whitespace() {
            start = Some(pos);
        }
        buf.push(ch);
        pos += ch.len_utf8();
    }

    let tail = buf.trim();
    if !tail.is_empty() {
        stmts.push(Stmt {
            pos: start.unwrap_or(0),
            text: tail.to_string(),
            comments,
        });
    }
    Ok(stmts)
}

/// A dollar-quote opener (`$$` or `$tag$`) at the head of `rest`.
fn dollar_tag_at(rest: &str) -> Option<String> {
    let inner = &rest[1..];
    let end = inner.find('$')?;
    let tag = &inner[..end];
    tag.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
        .then(|| format!("${tag}$"))
}
