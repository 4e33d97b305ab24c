//! SQLite driver. The dialect has a single `main` schema, transactional
//! DDL, and a narrow ALTER TABLE: anything beyond add/rename is planned as
//! a table rebuild (create `new_X`, copy rows, drop `X`, rename).

mod analyzer;
mod diff;
mod inspect;
mod lock;
mod plan;
mod revision;
mod types;

use std::path::PathBuf;

use rusqlite::Connection;

use atlas_core::{
    Change, ColumnType, Conn, Driver, Error, InspectOptions, Inspector, Locker, Plan, PlanApplier,
    PlanOptions, Realm, Result, RevisionStore, Schema, TargetUrl, TypeIo, apply_plan,
    migrate::{Revision, RevisionTable},
};

pub use analyzer::RebuildRecognizer;
pub use diff::SqliteHooks;

pub const DIALECT_NAME: &str = "sqlite3";

pub struct Sqlite {
    pub(crate) conn: Connection,
    /// Database path, used to key the file-based advisory lock. In-memory
    /// databases lock under a shared scratch key.
    pub(crate) path: Option<PathBuf>,
}

impl Sqlite {
    /// Open a database file, creating it when missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let conn = Connection::open(&path).map_err(|e| Error::Connection {
            target: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::bootstrap(conn, Some(path))
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Connection {
            target: ":memory:".to_string(),
            message: e.to_string(),
        })?;
        Self::bootstrap(conn, None)
    }

    pub fn connect(url: &TargetUrl) -> Result<Self> {
        if url.database.is_empty() || url.database == ":memory:" {
            Self::open_in_memory()
        } else {
            Self::open(&url.database)
        }
    }

    fn bootstrap(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")
            .map_err(exec_error)?;
        Ok(Self { conn, path })
    }
}

pub(crate) fn exec_error(source: rusqlite::Error) -> Error {
    Error::exec(source.to_string())
}

impl Conn for Sqlite {
    fn exec(&mut self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql).map_err(exec_error)
    }

    fn begin(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN").map_err(exec_error)
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT").map_err(exec_error)
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK").map_err(exec_error)
    }

    fn transactional_ddl(&self) -> bool {
        true
    }
}

impl Inspector for Sqlite {
    fn inspect_realm(&mut self, opts: &InspectOptions) -> Result<Realm> {
        let main = self.inspect_schema("main", opts)?;
        Ok(Realm::new(vec![main]))
    }

    fn inspect_schema(&mut self, name: &str, opts: &InspectOptions) -> Result<Schema> {
        inspect::schema(&self.conn, name, opts)
    }
}

impl PlanApplier for Sqlite {
    fn plan_changes(&mut self, name: &str, changes: &[Change], opts: &PlanOptions) -> Result<Plan> {
        plan::plan_changes(&self.conn, name, changes, opts)
    }

    fn apply_changes(&mut self, changes: &[Change], opts: &PlanOptions) -> Result<()> {
        let plan = self.plan_changes("apply", changes, opts)?;
        apply_plan(self, &plan, None)
    }
}

impl Locker for Sqlite {
    fn lock(&mut self, name: &str, timeout: std::time::Duration) -> Result<()> {
        lock::acquire(self.path.as_deref(), name, timeout)
    }

    fn unlock(&mut self, name: &str) -> Result<()> {
        lock::release(self.path.as_deref(), name)
    }
}

impl TypeIo for Sqlite {
    fn format_type(&self, ty: &ColumnType) -> Result<String> {
        types::format_type(ty)
    }

    fn parse_type(&self, raw: &str) -> Result<ColumnType> {
        Ok(types::parse_type(raw))
    }
}

impl RevisionStore for Sqlite {
    fn ensure_revisions(&mut self, table: &RevisionTable) -> Result<()> {
        revision::ensure(&self.conn, table)
    }

    fn read_revisions(&mut self, table: &RevisionTable) -> Result<Vec<Revision>> {
        revision::read_all(&self.conn, table)
    }

    fn write_revision(&mut self, table: &RevisionTable, rev: &Revision) -> Result<()> {
        revision::write(&self.conn, table, rev)
    }

    fn delete_revision(&mut self, table: &RevisionTable, version: &str) -> Result<()> {
        revision::delete(&self.conn, table, version)
    }
}

static HOOKS: SqliteHooks = SqliteHooks;

impl Driver for Sqlite {
    fn name(&self) -> &'static str {
        DIALECT_NAME
    }

    fn max_ident_len(&self) -> usize {
        // SQLite has no catalog-enforced limit; keep twin names short
        // anyway.
        128
    }

    fn diff_hooks(&self) -> &'static dyn atlas_core::DiffHooks {
        &HOOKS
    }
}

/// Quote an identifier the SQLite way.
pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
