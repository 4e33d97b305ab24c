//! The migration director: an ordered, content-addressed directory of
//! migration files, the per-target revision log, the file-level analyzers,
//! and the executor that advances a target through pending revisions.

mod dir;
mod executor;
mod hash;
mod lint;
mod revision;
mod stmt;

pub use dir::{DirLock, LocalDir, MigrationFile, split_file_name};
pub use executor::{ExecuteReport, Executor, ExecutorOptions, execution_lock_name};
pub use hash::{HASH_FILE_NAME, HashFile, hash_content, hash_dir, validate_dir, write_sum};
pub use lint::{
    AddedColumn, Analyzer, DataDependentAnalyzer, DestructiveAnalyzer, Diagnostic, FilePass,
    NamingAnalyzer, PassEntry, Recognizer, Report, Severity, SeverityPolicy, StmtKind,
    builtin_analyzers, classify_stmt, run_analyzers,
};
pub use revision::{DEFAULT_REVISION_TABLE, Revision, RevisionKind, RevisionTable};
pub use stmt::{Checkpoint, Stmt, checkpoint_of, scan_stmts};
