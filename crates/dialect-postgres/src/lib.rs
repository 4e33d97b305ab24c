//! PostgreSQL driver: catalog inspection, enum-aware planning,
//! session-scoped advisory locking, and transactional DDL.

mod diff;
mod inspect;
mod lock;
mod plan;
mod revision;
mod types;

use postgres::{Client, NoTls};

use atlas_core::{
    Change, ColumnType, Conn, Driver, Error, InspectOptions, Inspector, Locker, Plan, PlanApplier,
    PlanOptions, Realm, Result, RevisionStore, Schema, TargetUrl, TypeIo, apply_plan,
    migrate::{Revision, RevisionTable},
};

pub use diff::PostgresHooks;
pub use plan::plan_changes;
pub use types::{format_type, parse_type};

pub const DIALECT_NAME: &str = "postgres";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_SCHEMA: &str = "public";

pub struct Postgres {
    pub(crate) client: Client,
    default_schema: String,
}

impl Postgres {
    pub fn connect(url: &TargetUrl) -> Result<Self> {
        let mut config = postgres::Config::new();
        config
            .host(url.host.as_deref().unwrap_or("127.0.0.1"))
            .port(url.port.unwrap_or(DEFAULT_PORT))
            .dbname(if url.database.is_empty() {
                "postgres"
            } else {
                &url.database
            });
        if let Some(user) = &url.user {
            config.user(user);
        }
        if let Some(password) = &url.password {
            config.password(password);
        }
        let client = config.connect(NoTls).map_err(|e| Error::Connection {
            target: url.raw.clone(),
            message: e.to_string(),
        })?;
        Ok(Self::from_client(client))
    }

    pub fn from_client(client: Client) -> Self {
        Self {
            client,
            default_schema: DEFAULT_SCHEMA.to_string(),
        }
    }
}

pub(crate) fn exec_error(source: postgres::Error) -> Error {
    Error::exec(source.to_string())
}

impl Conn for Postgres {
    fn exec(&mut self, sql: &str) -> Result<()> {
        self.client.batch_execute(sql).map_err(exec_error)
    }

    fn begin(&mut self) -> Result<()> {
        self.client.batch_execute("BEGIN").map_err(exec_error)
    }

    fn commit(&mut self) -> Result<()> {
        self.client.batch_execute("COMMIT").map_err(exec_error)
    }

    fn rollback(&mut self) -> Result<()> {
        self.client.batch_execute("ROLLBACK").map_err(exec_error)
    }

    fn transactional_ddl(&self) -> bool {
        true
    }
}

impl Inspector for Postgres {
    fn inspect_realm(&mut self, opts: &InspectOptions) -> Result<Realm> {
        inspect::realm(&mut self.client, opts)
    }

    fn inspect_schema(&mut self, name: &str, opts: &InspectOptions) -> Result<Schema> {
        inspect::schema(&mut self.client, name, opts)
    }
}

impl PlanApplier for Postgres {
    fn plan_changes(&mut self, name: &str, changes: &[Change], opts: &PlanOptions) -> Result<Plan> {
        plan::plan_changes(name, changes, opts)
    }

    fn apply_changes(&mut self, changes: &[Change], opts: &PlanOptions) -> Result<()> {
        let plan = self.plan_changes("apply", changes, opts)?;
        apply_plan(self, &plan, None)
    }
}

impl Locker for Postgres {
    fn lock(&mut self, name: &str, timeout: std::time::Duration) -> Result<()> {
        lock::acquire(&mut self.client, name, timeout)
    }

    fn unlock(&mut self, name: &str) -> Result<()> {
        lock::release(&mut self.client, name)
    }
}

impl TypeIo for Postgres {
    fn format_type(&self, ty: &ColumnType) -> Result<String> {
        types::format_type(ty)
    }

    fn parse_type(&self, raw: &str) -> Result<ColumnType> {
        Ok(types::parse_type(raw))
    }
}

impl RevisionStore for Postgres {
    fn ensure_revisions(&mut self, table: &RevisionTable) -> Result<()> {
        revision::ensure(&mut self.client, table, &self.default_schema)
    }

    fn read_revisions(&mut self, table: &RevisionTable) -> Result<Vec<Revision>> {
        revision::read_all(&mut self.client, table, &self.default_schema)
    }

    fn write_revision(&mut self, table: &RevisionTable, rev: &Revision) -> Result<()> {
        revision::write(&mut self.client, table, rev, &self.default_schema)
    }

    fn delete_revision(&mut self, table: &RevisionTable, version: &str) -> Result<()> {
        revision::delete(&mut self.client, table, version, &self.default_schema)
    }
}

static HOOKS: PostgresHooks = PostgresHooks;

impl Driver for Postgres {
    fn name(&self) -> &'static str {
        DIALECT_NAME
    }

    fn max_ident_len(&self) -> usize {
        // NAMEDATALEN - 1.
        63
    }

    fn diff_hooks(&self) -> &'static dyn atlas_core::DiffHooks {
        &HOOKS
    }
}

/// Quote an identifier the PostgreSQL way.
pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// `schema`.`name` with both parts quoted; table-qualified objects fall
/// back to the bare name when no schema is set.
pub(crate) fn quote_qualified(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quote(schema), quote(name)),
        None => quote(name),
    }
}
