use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default name of the revision table in the target database.
pub const DEFAULT_REVISION_TABLE: &str = "atlas_schema_revisions";

/// Where the revision log lives. The schema is the one named by
/// `--revisions-schema` when given; otherwise the connection's default
/// schema. There is no fallback probing of other locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionTable {
    pub schema: Option<String>,
    pub name: String,
}

impl Default for RevisionTable {
    fn default() -> Self {
        Self {
            schema: None,
            name: DEFAULT_REVISION_TABLE.to_string(),
        }
    }
}

impl RevisionTable {
    pub fn in_schema(schema: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            ..Self::default()
        }
    }
}

/// How a revision entered the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevisionKind {
    /// Applied by the executor.
    #[default]
    Resolved,
    /// Recorded but its statements were never run against this target.
    Unresolved,
    /// Rewritten by a rebase of the directory.
    Rebased,
    /// Written by an explicit `set` subcommand.
    Manual,
}

impl RevisionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resolved => "resolved",
            Self::Unresolved => "unresolved",
            Self::Rebased => "rebased",
            Self::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "unresolved" => Self::Unresolved,
            "rebased" => Self::Rebased,
            "manual" => Self::Manual,
            _ => Self::Resolved,
        }
    }
}

/// A persisted record that one migration file was applied (or attempted)
/// against a target. A partially applied file stays in the log with its
/// error and statement position so a retry can resume where it stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub version: String,
    pub description: String,
    pub kind: RevisionKind,
    /// Statements applied so far.
    pub applied: usize,
    /// Statements in the file at application time.
    pub total: usize,
    pub executed_at: DateTime<Utc>,
    pub execution_time_ms: u64,
    pub error: Option<String>,
    pub error_stmt: Option<String>,
    /// File hash at application time. Divergence from the current file
    /// hash is a hard error unless the operator rehashes explicitly.
    pub hash: String,
    /// Digests of the statements applied so far, for partial-failure
    /// forensics.
    pub partial_hashes: Vec<String>,
    pub operator_version: String,
}

impl Revision {
    pub fn new(version: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            description: description.into(),
            kind: RevisionKind::Resolved,
            applied: 0,
            total: 0,
            executed_at: Utc::now(),
            execution_time_ms: 0,
            error: None,
            error_stmt: None,
            hash: String::new(),
            partial_hashes: Vec::new(),
            operator_version: String::new(),
        }
    }

    /// Execution state: `ok` when every statement applied cleanly.
    pub fn ok(&self) -> bool {
        self.error.is_none() && self.applied == self.total
    }
}
