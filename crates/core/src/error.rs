use thiserror::Error;

/// Errors that originate from operator input and short-circuit before the
/// core touches the target database.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("unknown driver {scheme:?}")]
    UnknownDriver { scheme: String },
    #[error("driver {scheme:?} is not compiled into this binary")]
    DriverUnavailable { scheme: String },
    #[error("missing value for required variable {name:?}")]
    MissingVariable { name: String },
    #[error("migration directory {path:?} is dirty: {reason}")]
    DirtyDirectory { path: String, reason: String },
    #[error("checkpoint tag {tag:?} does not match any checkpoint in the directory")]
    CheckpointTag { tag: String },
    #[error("unresolved reference to {kind} {name:?}")]
    UnresolvedReference { kind: &'static str, name: String },
    #[error("invalid migration file name {name:?}: {reason}")]
    FileName { name: String, reason: String },
    #[error("invalid directive {text:?}: {reason}")]
    Directive { text: String, reason: String },
    #[error("object {name:?} is a {from_kind} in the current state and a {to_kind} in the desired state")]
    KindConflict {
        name: String,
        from_kind: &'static str,
        to_kind: &'static str,
    },
}

/// The current database state contradicts the recorded migration history.
/// These abort an operation before any write is issued.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("checksum mismatch for {path:?}: run hash to re-generate the sum file")]
    ChecksumMismatch { path: String },
    #[error("revision {version:?} is recorded but missing from the migration directory")]
    UnknownRevision { version: String },
    #[error(
        "history rewrite detected: file {file:?} precedes recorded revision {version:?} but was never applied"
    )]
    HistoryRewrite { file: String, version: String },
    #[error(
        "file hash for {file:?} does not match revision {version:?}: the file changed after it was applied"
    )]
    RevisionHash { file: String, version: String },
    #[error("migration versions are not strictly increasing: {prev:?} precedes {next:?}")]
    VersionOrder { prev: String, next: String },
}

/// A change the target dialect cannot express.
#[derive(Debug, Error)]
#[error("dialect {dialect:?} cannot plan {change}: {reason}")]
pub struct PlanError {
    pub dialect: &'static str,
    pub change: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error("acquiring advisory lock {name:?}: held by another agent")]
    LockTimeout { name: String },
    #[error("executing statement {index} of {file:?}: {message}\n  statement: {stmt}")]
    Statement {
        file: String,
        index: usize,
        stmt: String,
        message: String,
    },
    #[error("plan {name:?} is irreversible: {reason}")]
    Irreversible { name: String, reason: String },
    #[error("normalizing through the dev database: {message}")]
    Normalization { message: String },
    #[error("{kind} {name:?} was not found")]
    NotExist { kind: &'static str, name: String },
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("connecting to {target:?}: {message}")]
    Connection { target: String, message: String },
    #[error("deadline exceeded before statement {index}")]
    Deadline { index: usize },
    #[error("analyzing {file:?}: [{code}] {text}")]
    Lint {
        file: String,
        code: String,
        text: String,
    },
    #[error("executing against the database: {message}")]
    Exec { message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Exec failure with no file context. The executor re-wraps these into
    /// [`Error::Statement`] with the file name and statement index.
    pub fn exec(message: impl Into<String>) -> Self {
        Self::Exec {
            message: message.into(),
        }
    }

    pub fn not_exist(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotExist {
            kind,
            name: name.into(),
        }
    }

    /// True for errors caused by another agent holding the advisory lock.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::LockTimeout { .. })
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
