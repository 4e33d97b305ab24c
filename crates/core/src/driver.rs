use std::time::Duration;

use bitflags::bitflags;

use crate::{
    Change, ColumnType, Conn, Plan, Realm, Result, Schema,
    diff::{DEFAULT_HOOKS, DiffHooks},
    migrate::{Revision, RevisionTable},
};

bitflags! {
    /// Object kinds an inspection resolves. Callers narrow the mask to
    /// skip catalog queries they do not need.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InspectMode: u32 {
        const SCHEMAS = 1 << 0;
        const TABLES = 1 << 1;
        const VIEWS = 1 << 2;
        const INDEXES = 1 << 3;
        const FOREIGN_KEYS = 1 << 4;
        const CHECKS = 1 << 5;
        const SEQUENCES = 1 << 6;
        const ENUMS = 1 << 7;
        const TRIGGERS = 1 << 8;
        const FUNCS = 1 << 9;
    }
}

impl Default for InspectMode {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    pub mode: InspectMode,
    /// Restrict realm inspection to these schemas; empty means all.
    pub schemas: Vec<String>,
    /// Object names to leave out of the result.
    pub exclude: Vec<String>,
}

impl InspectOptions {
    pub fn schemas<I, S>(schemas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            schemas: schemas.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|e| e == name)
    }
}

/// Reads catalog tables and assembles the model. Implementations must be
/// deterministic: columns follow ordinal position, everything else sorts
/// alphabetically when the catalog gives no order.
pub trait Inspector {
    fn inspect_realm(&mut self, opts: &InspectOptions) -> Result<Realm>;
    fn inspect_schema(&mut self, name: &str, opts: &InspectOptions) -> Result<Schema>;

    fn inspect_table(
        &mut self,
        schema: &str,
        name: &str,
        opts: &InspectOptions,
    ) -> Result<crate::Table> {
        let inspected = self.inspect_schema(schema, opts)?;
        inspected
            .table(name)
            .cloned()
            .ok_or_else(|| crate::Error::not_exist("table", name))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    /// Qualify object names with this schema instead of their own.
    pub schema_qualifier: Option<String>,
}

/// Turns change lists into dialect statements and executes them.
pub trait PlanApplier {
    fn plan_changes(&mut self, name: &str, changes: &[Change], opts: &PlanOptions) -> Result<Plan>;

    fn apply_changes(&mut self, changes: &[Change], opts: &PlanOptions) -> Result<()>;
}

/// Named, session-scoped mutual exclusion. `lock` with a zero timeout
/// fails fast; contention surfaces as [`crate::Error::LockTimeout`].
/// Implementations pair `lock` with `unlock` on the same session.
pub trait Locker {
    fn lock(&mut self, name: &str, timeout: Duration) -> Result<()>;
    fn unlock(&mut self, name: &str) -> Result<()>;
}

/// Dialect type round-tripping: parsing accepts native spellings,
/// formatting yields the canonical one.
pub trait TypeIo {
    fn format_type(&self, ty: &ColumnType) -> Result<String>;
    fn parse_type(&self, raw: &str) -> Result<ColumnType>;
}

/// Canonicalizes a user-authored state, usually by round-tripping it
/// through a scratch database. See [`crate::DevNormalizer`].
pub trait Normalizer {
    fn normalize_schema(&mut self, schema: &Schema) -> Result<Schema>;
    fn normalize_realm(&mut self, realm: &Realm) -> Result<Realm>;
}

/// Persistence of the revision log inside the target database. Each
/// dialect materializes the logical columns natively.
pub trait RevisionStore {
    /// Create the revision table when missing.
    fn ensure_revisions(&mut self, table: &RevisionTable) -> Result<()>;
    /// All recorded revisions ordered by version.
    fn read_revisions(&mut self, table: &RevisionTable) -> Result<Vec<Revision>>;
    /// Insert or replace one revision keyed by version.
    fn write_revision(&mut self, table: &RevisionTable, revision: &Revision) -> Result<()>;
    fn delete_revision(&mut self, table: &RevisionTable, version: &str) -> Result<()>;
}

/// A dialect driver: the capability bundle the engine works against.
pub trait Driver:
    Conn + Inspector + PlanApplier + Locker + TypeIo + RevisionStore
{
    fn name(&self) -> &'static str;

    /// Identifier length limit, used when deriving twin-schema names.
    fn max_ident_len(&self) -> usize {
        64
    }

    /// Equivalence decisions the differ delegates to this dialect.
    fn diff_hooks(&self) -> &'static dyn DiffHooks {
        &DEFAULT_HOOKS
    }
}
