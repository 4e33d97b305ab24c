//! MySQL driver, also serving MariaDB and TiDB through a flavor flag.
//! DDL is not transactional here: every statement implicitly commits, so
//! plans run per statement and the executor records progress as it goes.

mod diff;
mod inspect;
mod lock;
mod plan;
mod revision;
mod types;

use mysql::prelude::Queryable;
use mysql::{Opts, OptsBuilder, Pool, PooledConn};

use atlas_core::{
    Change, ColumnType, Conn, Driver, Error, InspectOptions, Inspector, Locker, Plan, PlanApplier,
    PlanOptions, Realm, Result, RevisionStore, Schema, TargetUrl, TypeIo, apply_plan,
    migrate::{Revision, RevisionTable},
};

pub use diff::MysqlHooks;
pub use plan::{Flavor, plan_changes};
pub use types::{format_type, parse_type};

pub const DIALECT_NAME: &str = "mysql";
const DEFAULT_PORT: u16 = 3306;

pub struct Mysql {
    pub(crate) conn: PooledConn,
    pub(crate) flavor: Flavor,
    /// The database the connection is scoped to; doubles as the default
    /// schema for unqualified objects and the revision table.
    pub(crate) database: String,
}

impl Mysql {
    pub fn connect(url: &TargetUrl) -> Result<Self> {
        let flavor = match (url.driver.as_str(), url.subdriver.as_deref()) {
            ("mariadb", _) | (_, Some("mariadb")) => Flavor::MariaDb,
            ("tidb", _) | (_, Some("tidb")) => Flavor::TiDb,
            _ => Flavor::MySql,
        };
        let opts = OptsBuilder::new()
            .ip_or_hostname(url.host.clone())
            .tcp_port(url.port.unwrap_or(DEFAULT_PORT))
            .user(url.user.clone())
            .pass(url.password.clone())
            .db_name((!url.database.is_empty()).then(|| url.database.clone()));
        let pool = Pool::new(Opts::from(opts)).map_err(|e| Error::Connection {
            target: url.raw.clone(),
            message: e.to_string(),
        })?;
        let conn = pool.get_conn().map_err(|e| Error::Connection {
            target: url.raw.clone(),
            message: e.to_string(),
        })?;
        Ok(Self {
            conn,
            flavor,
            database: url.database.clone(),
        })
    }
}

pub(crate) fn exec_error(source: mysql::Error) -> Error {
    Error::exec(source.to_string())
}

impl Conn for Mysql {
    fn exec(&mut self, sql: &str) -> Result<()> {
        self.conn.query_drop(sql).map_err(exec_error)
    }

    fn begin(&mut self) -> Result<()> {
        self.conn.query_drop("BEGIN").map_err(exec_error)
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.query_drop("COMMIT").map_err(exec_error)
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn.query_drop("ROLLBACK").map_err(exec_error)
    }

    fn transactional_ddl(&self) -> bool {
        // Every DDL statement implicitly commits.
        false
    }
}

impl Inspector for Mysql {
    fn inspect_realm(&mut self, opts: &InspectOptions) -> Result<Realm> {
        inspect::realm(&mut self.conn, opts)
    }

    fn inspect_schema(&mut self, name: &str, opts: &InspectOptions) -> Result<Schema> {
        inspect::schema(&mut self.conn, name, opts)
    }
}

impl PlanApplier for Mysql {
    fn plan_changes(&mut self, name: &str, changes: &[Change], opts: &PlanOptions) -> Result<Plan> {
        plan::plan_changes(self.flavor, name, changes, opts)
    }

    fn apply_changes(&mut self, changes: &[Change], opts: &PlanOptions) -> Result<()> {
        let plan = self.plan_changes("apply", changes, opts)?;
        apply_plan(self, &plan, None)
    }
}

impl Locker for Mysql {
    fn lock(&mut self, name: &str, timeout: std::time::Duration) -> Result<()> {
        lock::acquire(&mut self.conn, name, timeout)
    }

    fn unlock(&mut self, name: &str) -> Result<()> {
        lock::release(&mut self.conn, name)
    }
}

impl TypeIo for Mysql {
    fn format_type(&self, ty: &ColumnType) -> Result<String> {
        types::format_type(ty)
    }

    fn parse_type(&self, raw: &str) -> Result<ColumnType> {
        Ok(types::parse_type(raw))
    }
}

impl RevisionStore for Mysql {
    fn ensure_revisions(&mut self, table: &RevisionTable) -> Result<()> {
        revision::ensure(&mut self.conn, table, &self.database)
    }

    fn read_revisions(&mut self, table: &RevisionTable) -> Result<Vec<Revision>> {
        revision::read_all(&mut self.conn, table, &self.database)
    }

    fn write_revision(&mut self, table: &RevisionTable, rev: &Revision) -> Result<()> {
        revision::write(&mut self.conn, table, rev, &self.database)
    }

    fn delete_revision(&mut self, table: &RevisionTable, version: &str) -> Result<()> {
        revision::delete(&mut self.conn, table, version, &self.database)
    }
}

static HOOKS: MysqlHooks = MysqlHooks;

impl Driver for Mysql {
    fn name(&self) -> &'static str {
        DIALECT_NAME
    }

    fn max_ident_len(&self) -> usize {
        64
    }

    fn diff_hooks(&self) -> &'static dyn atlas_core::DiffHooks {
        &HOOKS
    }
}

/// Quote an identifier the MySQL way.
pub(crate) fn quote(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

pub(crate) fn quote_qualified(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quote(schema), quote(name)),
        None => quote(name),
    }
}
