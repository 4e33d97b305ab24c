use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use atlas_core::{
    Change, ColumnType, Conn, Driver, Error, InspectOptions, Inspector, Locker, Plan, PlanApplier,
    PlanChange, PlanKind, PlanOptions, Realm, Result, RevisionStore, Schema, TypeIo, TypeKind,
    migrate::{Revision, RevisionTable},
};

/// An in-memory driver for tests. Executed statements are recorded
/// verbatim; inspection serves the realm the test seeded (optionally
/// passed through a canonicalizer to imitate what a real database does to
/// user input); locks live in a set that can be shared between instances
/// to exercise contention.
pub struct FakeDriver {
    pub realm: Realm,
    pub executed: Vec<String>,
    /// Fail any statement containing this fragment.
    pub fail_on: Option<String>,
    pub transactional: bool,
    /// Applied to schemas served by inspection, imitating catalog
    /// canonicalization on the twin database.
    pub canonicalize: Option<fn(&mut Schema)>,
    revisions: Vec<Revision>,
    locks: Arc<Mutex<BTreeSet<String>>>,
    held: BTreeSet<String>,
    tx_start: Option<usize>,
}

impl Default for FakeDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            realm: Realm::default(),
            executed: Vec::new(),
            fail_on: None,
            transactional: false,
            canonicalize: None,
            revisions: Vec::new(),
            locks: Arc::new(Mutex::new(BTreeSet::new())),
            held: BTreeSet::new(),
            tx_start: None,
        }
    }

    /// A driver contending on the same lock namespace as `self`.
    pub fn sharing_locks(&self) -> Self {
        let mut driver = Self::new();
        driver.locks = Arc::clone(&self.locks);
        driver
    }

    pub fn revisions(&self) -> &[Revision] {
        &self.revisions
    }
}

impl Conn for FakeDriver {
    fn exec(&mut self, sql: &str) -> Result<()> {
        if let Some(fragment) = &self.fail_on
            && sql.contains(fragment.as_str())
        {
            return Err(Error::exec(format!("forced failure on {fragment:?}")));
        }
        self.executed.push(sql.to_string());
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        self.tx_start = Some(self.executed.len());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.tx_start = None;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        if let Some(start) = self.tx_start.take() {
            self.executed.truncate(start);
        }
        Ok(())
    }

    fn transactional_ddl(&self) -> bool {
        self.transactional
    }
}

impl Inspector for FakeDriver {
    fn inspect_realm(&mut self, opts: &InspectOptions) -> Result<Realm> {
        let mut realm = self.realm.clone();
        if !opts.schemas.is_empty() {
            realm.schemas.retain(|s| opts.schemas.contains(&s.name));
        }
        if let Some(canonicalize) = self.canonicalize {
            for schema in &mut realm.schemas {
                canonicalize(schema);
            }
        }
        Ok(realm)
    }

    fn inspect_schema(&mut self, name: &str, _opts: &InspectOptions) -> Result<Schema> {
        let mut schema = self
            .realm
            .schema(name)
            .cloned()
            .ok_or_else(|| Error::not_exist("schema", name))?;
        if let Some(canonicalize) = self.canonicalize {
            canonicalize(&mut schema);
        }
        Ok(schema)
    }
}

impl PlanApplier for FakeDriver {
    fn plan_changes(&mut self, name: &str, changes: &[Change], _opts: &PlanOptions) -> Result<Plan> {
        let mut plan = Plan::new(name, self.transactional);
        for change in changes {
            plan.push(
                PlanChange::new(PlanKind::Alter, format!("-- {}", change.tag()), change.tag())
                    .with_reverse(format!("-- undo {}", change.tag())),
            );
        }
        Ok(plan)
    }

    fn apply_changes(&mut self, changes: &[Change], _opts: &PlanOptions) -> Result<()> {
        for change in changes {
            self.executed.push(format!("-- apply {}", change.tag()));
            self.apply_to_realm(change)?;
        }
        Ok(())
    }
}

impl FakeDriver {
    /// Structural application of the changes the tests use, so a
    /// create-inspect round trip through this driver behaves like a
    /// database.
    fn apply_to_realm(&mut self, change: &Change) -> Result<()> {
        match change {
            Change::AddSchema(schema) => self.realm.schemas.push(schema.clone()),
            Change::DropSchema { name } => self.realm.schemas.retain(|s| &s.name != name),
            Change::AddTable(table) => {
                let schema_name = table.schema.clone().unwrap_or_default();
                let schema = self
                    .realm
                    .schema_mut(&schema_name)
                    .ok_or_else(|| Error::not_exist("schema", schema_name.clone()))?;
                schema.tables.push(table.clone());
            }
            Change::DropTable(name) => {
                let schema_name = name.schema.clone().unwrap_or_default();
                if let Some(schema) = self.realm.schema_mut(&schema_name) {
                    schema.tables.retain(|t| t.name != name.name);
                }
            }
            Change::AddColumn { table, column } => {
                let schema_name = table.schema.clone().unwrap_or_default();
                if let Some(found) = self
                    .realm
                    .schema_mut(&schema_name)
                    .and_then(|s| s.table_mut(&table.name))
                {
                    found.columns.push(column.clone());
                }
            }
            Change::AddForeignKey { table, fk } => {
                let schema_name = table.schema.clone().unwrap_or_default();
                if let Some(found) = self
                    .realm
                    .schema_mut(&schema_name)
                    .and_then(|s| s.table_mut(&table.name))
                    && !found.foreign_keys.iter().any(|f| f.symbol == fk.symbol)
                {
                    found.foreign_keys.push(fk.clone());
                }
            }
            Change::AddEnum { schema, enum_type } => {
                let schema_name = schema.clone().unwrap_or_default();
                if let Some(found) = self.realm.schema_mut(&schema_name) {
                    found.enums.push(enum_type.clone());
                }
            }
            // The remaining operations are recorded but not materialized;
            // tests that need them inspect `executed` instead.
            _ => {}
        }
        Ok(())
    }
}

impl Locker for FakeDriver {
    fn lock(&mut self, name: &str, _timeout: Duration) -> Result<()> {
        let mut locks = self.locks.lock().expect("lock set poisoned");
        if locks.contains(name) {
            return Err(Error::LockTimeout {
                name: name.to_string(),
            });
        }
        locks.insert(name.to_string());
        self.held.insert(name.to_string());
        Ok(())
    }

    fn unlock(&mut self, name: &str) -> Result<()> {
        let mut locks = self.locks.lock().expect("lock set poisoned");
        locks.remove(name);
        self.held.remove(name);
        Ok(())
    }
}

impl TypeIo for FakeDriver {
    fn format_type(&self, ty: &ColumnType) -> Result<String> {
        Ok(ty.raw.clone())
    }

    fn parse_type(&self, raw: &str) -> Result<ColumnType> {
        Ok(ColumnType::new(
            raw,
            TypeKind::UserDefined {
                name: raw.to_string(),
            },
        ))
    }
}

impl RevisionStore for FakeDriver {
    fn ensure_revisions(&mut self, _table: &RevisionTable) -> Result<()> {
        Ok(())
    }

    fn read_revisions(&mut self, _table: &RevisionTable) -> Result<Vec<Revision>> {
        Ok(self.revisions.clone())
    }

    fn write_revision(&mut self, _table: &RevisionTable, revision: &Revision) -> Result<()> {
        match self
            .revisions
            .iter_mut()
            .find(|r| r.version == revision.version)
        {
            Some(existing) => *existing = revision.clone(),
            None => self.revisions.push(revision.clone()),
        }
        self.revisions.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(())
    }

    fn delete_revision(&mut self, _table: &RevisionTable, version: &str) -> Result<()> {
        self.revisions.retain(|r| r.version != version);
        Ok(())
    }
}

impl Driver for FakeDriver {
    fn name(&self) -> &'static str {
        "fake"
    }
}

impl Drop for FakeDriver {
    fn drop(&mut self) {
        // Locks this instance still holds must not outlive it, or a
        // panicking test would deadlock the ones after it.
        if let Ok(mut locks) = self.locks.lock() {
            for name in &self.held {
                locks.remove(name);
            }
        }
    }
}
