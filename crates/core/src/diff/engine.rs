use std::collections::BTreeSet;

use tracing::debug;

use super::{DiffHooks, fold_ws};
use crate::{
    Attr, Change, ChangeKind, Column, EnumType, Index, IndexKey, QualifiedName, Realm, Result,
    Schema, Sequence, Table, UserError, View,
    ordering::sort_changes,
    schema::{Func, Proc, Trigger},
};

/// Computes the ordered change list that transforms `from` into `to`.
/// Matching is by name within the parent; renames are only inferred from
/// an explicit `renamed_from` directive on the desired object. The engine
/// never executes statements and never mutates its inputs.
pub struct DiffEngine<'a> {
    hooks: &'a dyn DiffHooks,
}

impl<'a> DiffEngine<'a> {
    pub fn new(hooks: &'a dyn DiffHooks) -> Self {
        Self { hooks }
    }

    pub fn realm_diff(&self, from: &Realm, to: &Realm) -> Result<Vec<Change>> {
        let mut ops = Vec::new();
        diff_realm_attrs(&from.attrs, &to.attrs, &mut ops);

        let mut matched = BTreeSet::new();
        for desired in &to.schemas {
            match from.schema(&desired.name) {
                Some(current) => {
                    matched.insert(current.name.clone());
                    self.schema_diff_into(current, desired, &mut ops)?;
                }
                None => {
                    ops.push(Change::AddSchema(Schema {
                        tables: Vec::new(),
                        views: Vec::new(),
                        sequences: Vec::new(),
                        enums: Vec::new(),
                        funcs: Vec::new(),
                        procs: Vec::new(),
                        ..desired.clone()
                    }));
                    self.schema_diff_into(&Schema::new(&desired.name), desired, &mut ops)?;
                }
            }
        }
        for current in &from.schemas {
            if !matched.contains(&current.name) {
                ops.push(Change::DropSchema {
                    name: current.name.clone(),
                });
            }
        }

        debug!(changes = ops.len(), "computed realm diff");
        Ok(sort_changes(ops))
    }

    pub fn schema_diff(&self, from: &Schema, to: &Schema) -> Result<Vec<Change>> {
        let mut ops = Vec::new();
        self.schema_diff_into(from, to, &mut ops)?;
        debug!(schema = %to.name, changes = ops.len(), "computed schema diff");
        Ok(sort_changes(ops))
    }

    pub fn table_diff(&self, from: &Table, to: &Table) -> Result<Vec<Change>> {
        let mut ops = Vec::new();
        self.table_diff_into(from, to, &mut ops);
        Ok(sort_changes(ops))
    }

    fn schema_diff_into(&self, from: &Schema, to: &Schema, ops: &mut Vec<Change>) -> Result<()> {
        check_kind_conflicts(from, to)?;

        let schema_change = attr_facets(&from.attrs, &to.attrs);
        if !schema_change.is_empty() {
            ops.push(Change::ModifySchema {
                name: to.name.clone(),
                change: schema_change,
                from: from.attrs.clone(),
                to: to.attrs.clone(),
            });
        }

        self.diff_enums(from, to, ops);
        self.diff_sequences(from, to, ops);
        self.diff_tables(from, to, ops)?;
        self.diff_views(from, to, ops);
        self.diff_funcs(from, to, ops);
        self.diff_procs(from, to, ops);
        Ok(())
    }

    fn diff_tables(&self, from: &Schema, to: &Schema, ops: &mut Vec<Change>) -> Result<()> {
        let mut matched = BTreeSet::new();
        for desired in &to.tables {
            if let Some(current) = from.table(&desired.name) {
                matched.insert(current.name.clone());
                self.table_diff_into(current, desired, ops);
                continue;
            }
            if let Some(previous) = &desired.renamed_from
                && let Some(current) = from.table(previous)
                && !matched.contains(previous)
            {
                matched.insert(previous.clone());
                ops.push(Change::RenameTable {
                    from: current.qualified_name(),
                    to: desired.qualified_name(),
                });
                self.table_diff_into(current, desired, ops);
                continue;
            }
            ops.push(Change::AddTable(desired.clone()));
            // Indexes and foreign keys ride separate changes so the
            // planner can emit them after the table body, and foreign
            // keys after every referenced table exists.
            for index in &desired.indexes {
                ops.push(Change::AddIndex {
                    table: desired.qualified_name(),
                    index: index.clone(),
                });
            }
            for fk in &desired.foreign_keys {
                ops.push(Change::AddForeignKey {
                    table: desired.qualified_name(),
                    fk: fk.clone(),
                });
            }
            for trigger in &desired.triggers {
                ops.push(Change::AddTrigger {
                    table: desired.qualified_name(),
                    trigger: trigger.clone(),
                });
            }
        }
        for current in &from.tables {
            if !matched.contains(&current.name) {
                for fk in &current.foreign_keys {
                    ops.push(Change::DropForeignKey {
                        table: current.qualified_name(),
                        symbol: fk.symbol.clone(),
                    });
                }
                ops.push(Change::DropTable(current.qualified_name()));
            }
        }
        Ok(())
    }

    fn table_diff_into(&self, from: &Table, to: &Table, ops: &mut Vec<Change>) {
        let table = to.qualified_name();

        let table_change = attr_facets(&from.attrs, &to.attrs);
        if !table_change.is_empty() {
            ops.push(Change::ModifyTable {
                table: table.clone(),
                change: table_change,
                from: from.attrs.clone(),
                to: to.attrs.clone(),
            });
        }

        self.diff_columns(&table, from, to, ops);
        self.diff_primary_key(&table, from, to, ops);
        self.diff_indexes(&table, from, to, ops);
        self.diff_foreign_keys(&table, from, to, ops);
        self.diff_checks(&table, from, to, ops);
        self.diff_triggers(&table, from, to, ops);
    }

    fn diff_columns(&self, table: &QualifiedName, from: &Table, to: &Table, ops: &mut Vec<Change>) {
        let mut matched = BTreeSet::new();
        for desired in &to.columns {
            if let Some(current) = from.column(&desired.name) {
                matched.insert(current.name.clone());
                let change = self.column_facets(current, desired);
                if !change.is_empty() {
                    ops.push(Change::ModifyColumn {
                        table: table.clone(),
                        change,
                        from: current.clone(),
                        to: desired.clone(),
                    });
                }
                continue;
            }
            if let Some(previous) = &desired.renamed_from
                && let Some(current) = from.column(previous)
                && !matched.contains(previous)
            {
                matched.insert(previous.clone());
                ops.push(Change::RenameColumn {
                    table: table.clone(),
                    from: current.name.clone(),
                    to: desired.name.clone(),
                });
                let change = self.column_facets(current, desired);
                if !change.is_empty() {
                    ops.push(Change::ModifyColumn {
                        table: table.clone(),
                        change,
                        from: current.clone(),
                        to: desired.clone(),
                    });
                }
                continue;
            }
            ops.push(Change::AddColumn {
                table: table.clone(),
                column: desired.clone(),
            });
        }
        for current in &from.columns {
            if to.column(&current.name).is_none() && !matched.contains(&current.name) {
                ops.push(Change::DropColumn {
                    table: table.clone(),
                    column: current.name.clone(),
                });
            }
        }
    }

    fn column_facets(&self, from: &Column, to: &Column) -> ChangeKind {
        let mut change = ChangeKind::empty();
        if !self.hooks.types_equal(&from.ty, &to.ty) {
            change |= ChangeKind::TYPE;
        }
        if from.ty.nullable != to.ty.nullable {
            change |= ChangeKind::NULL;
        }
        if !self.hooks.defaults_equal(from.default.as_ref(), to.default.as_ref()) {
            change |= ChangeKind::DEFAULT;
        }
        change | column_attr_facets(&from.attrs, &to.attrs)
    }

    fn diff_primary_key(
        &self,
        table: &QualifiedName,
        from: &Table,
        to: &Table,
        ops: &mut Vec<Change>,
    ) {
        match (&from.primary_key, &to.primary_key) {
            (None, None) => {}
            (None, Some(pk)) => ops.push(Change::SetPrimaryKey {
                table: table.clone(),
                index: pk.clone(),
            }),
            (Some(_), None) => ops.push(Change::DropPrimaryKey {
                table: table.clone(),
            }),
            (Some(current), Some(desired)) => {
                if !self.index_parts_equal(current, desired) {
                    ops.push(Change::DropPrimaryKey {
                        table: table.clone(),
                    });
                    ops.push(Change::SetPrimaryKey {
                        table: table.clone(),
                        index: desired.clone(),
                    });
                }
            }
        }
    }

    fn diff_indexes(&self, table: &QualifiedName, from: &Table, to: &Table, ops: &mut Vec<Change>) {
        let mut matched = BTreeSet::new();
        for desired in &to.indexes {
            let current = if desired.name.is_empty() {
                // Unnamed indexes match structurally.
                from.indexes
                    .iter()
                    .find(|i| !matched.contains(&i.name) && self.index_parts_equal(i, desired))
            } else if let Some(found) = from.index(&desired.name) {
                Some(found)
            } else if let Some(previous) = &desired.renamed_from {
                let renamed = from.index(previous).filter(|current| {
                    !matched.contains(previous) && self.index_parts_equal(current, desired)
                });
                if let Some(current) = renamed {
                    matched.insert(current.name.clone());
                    ops.push(Change::RenameIndex {
                        table: table.clone(),
                        from: current.name.clone(),
                        to: desired.name.clone(),
                    });
                    continue;
                }
                None
            } else {
                None
            };

            match current {
                Some(current) => {
                    matched.insert(current.name.clone());
                    let change = self.index_facets(current, desired);
                    if !change.is_empty() {
                        ops.push(Change::ModifyIndex {
                            table: table.clone(),
                            change,
                            from: current.clone(),
                            to: desired.clone(),
                        });
                    }
                }
                None => ops.push(Change::AddIndex {
                    table: table.clone(),
                    index: desired.clone(),
                }),
            }
        }
        for current in &from.indexes {
            let still_wanted = to.index(&current.name).is_some() || matched.contains(&current.name);
            if !still_wanted {
                ops.push(Change::DropIndex {
                    table: table.clone(),
                    index: current.name.clone(),
                });
            }
        }
    }

    fn index_facets(&self, from: &Index, to: &Index) -> ChangeKind {
        let mut change = ChangeKind::empty();
        if from.unique != to.unique {
            change |= ChangeKind::UNIQUE;
        }
        if !self.index_parts_equal(from, to) {
            change |= ChangeKind::PARTS;
        }
        if predicate_of(&from.attrs) != predicate_of(&to.attrs) {
            change |= ChangeKind::PREDICATE;
        }
        change | index_attr_facets(&from.attrs, &to.attrs)
    }

    fn index_parts_equal(&self, from: &Index, to: &Index) -> bool {
        from.parts.len() == to.parts.len()
            && from.parts.iter().zip(&to.parts).all(|(f, t)| {
                f.desc == t.desc
                    && f.collation == t.collation
                    && match (&f.key, &t.key) {
                        (IndexKey::Column(a), IndexKey::Column(b)) => a == b,
                        (IndexKey::Expr(a), IndexKey::Expr(b)) => {
                            self.hooks.index_exprs_equal(a, b)
                        }
                        _ => false,
                    }
            })
    }

    fn diff_foreign_keys(
        &self,
        table: &QualifiedName,
        from: &Table,
        to: &Table,
        ops: &mut Vec<Change>,
    ) {
        for desired in &to.foreign_keys {
            match from.foreign_key(&desired.symbol) {
                Some(current) => {
                    let mut change = ChangeKind::empty();
                    if current.columns != desired.columns
                        || current.ref_table != desired.ref_table
                        || current.ref_columns != desired.ref_columns
                    {
                        change |= ChangeKind::COLUMNS;
                    }
                    if current.on_update != desired.on_update {
                        change |= ChangeKind::UPDATE_ACTION;
                    }
                    if current.on_delete != desired.on_delete {
                        change |= ChangeKind::DELETE_ACTION;
                    }
                    if !change.is_empty() {
                        ops.push(Change::ModifyForeignKey {
                            table: table.clone(),
                            change,
                            from: current.clone(),
                            to: desired.clone(),
                        });
                    }
                }
                None => ops.push(Change::AddForeignKey {
                    table: table.clone(),
                    fk: desired.clone(),
                }),
            }
        }
        for current in &from.foreign_keys {
            if to.foreign_key(&current.symbol).is_none() {
                ops.push(Change::DropForeignKey {
                    table: table.clone(),
                    symbol: current.symbol.clone(),
                });
            }
        }
    }

    fn diff_checks(&self, table: &QualifiedName, from: &Table, to: &Table, ops: &mut Vec<Change>) {
        for desired in &to.checks {
            match from.checks.iter().find(|c| c.name == desired.name) {
                Some(current) => {
                    let mut change = ChangeKind::empty();
                    if !self.hooks.checks_equal(current, desired) {
                        change |= ChangeKind::DEFINITION;
                    }
                    if attr_facets(&current.attrs, &desired.attrs) != ChangeKind::empty() {
                        change |= ChangeKind::ATTRS;
                    }
                    if !change.is_empty() {
                        ops.push(Change::ModifyCheck {
                            table: table.clone(),
                            change,
                            from: current.clone(),
                            to: desired.clone(),
                        });
                    }
                }
                None => ops.push(Change::AddCheck {
                    table: table.clone(),
                    check: desired.clone(),
                }),
            }
        }
        for current in &from.checks {
            if !to.checks.iter().any(|c| c.name == current.name) {
                ops.push(Change::DropCheck {
                    table: table.clone(),
                    name: current.name.clone(),
                });
            }
        }
    }

    fn diff_triggers(&self, table: &QualifiedName, from: &Table, to: &Table, ops: &mut Vec<Change>) {
        diff_named(
            &from.triggers,
            &to.triggers,
            |t: &Trigger| t.name.clone(),
            |current, desired| fold_ws(&current.def) == fold_ws(&desired.def),
            |desired| Change::AddTrigger {
                table: table.clone(),
                trigger: desired.clone(),
            },
            |current| Change::DropTrigger {
                table: table.clone(),
                name: current.name.clone(),
            },
            |current, desired| Change::ModifyTrigger {
                table: table.clone(),
                change: ChangeKind::DEFINITION,
                from: current.clone(),
                to: desired.clone(),
            },
            ops,
        );
    }

    fn diff_views(&self, from: &Schema, to: &Schema, ops: &mut Vec<Change>) {
        let schema = Some(to.name.clone());
        diff_named(
            &from.views,
            &to.views,
            |v: &View| v.name.clone(),
            |current, desired| {
                current.materialized == desired.materialized
                    && fold_ws(&current.def) == fold_ws(&desired.def)
            },
            |desired| Change::AddView {
                schema: schema.clone(),
                view: desired.clone(),
            },
            |current| Change::DropView(QualifiedName::new(Some(&from.name), &current.name)),
            |current, desired| Change::ModifyView {
                view: QualifiedName::new(Some(&to.name), &desired.name),
                change: ChangeKind::DEFINITION,
                from: current.clone(),
                to: desired.clone(),
            },
            ops,
        );
    }

    fn diff_sequences(&self, from: &Schema, to: &Schema, ops: &mut Vec<Change>) {
        let schema = Some(to.name.clone());
        diff_named(
            &from.sequences,
            &to.sequences,
            |s: &Sequence| s.name.clone(),
            |current, desired| {
                current.start == desired.start
                    && current.increment == desired.increment
                    && current.min_value == desired.min_value
                    && current.max_value == desired.max_value
                    && current.cycle == desired.cycle
            },
            |desired| Change::AddSequence {
                schema: schema.clone(),
                sequence: desired.clone(),
            },
            |current| Change::DropSequence(QualifiedName::new(Some(&from.name), &current.name)),
            |current, desired| Change::ModifySequence {
                sequence: QualifiedName::new(Some(&to.name), &desired.name),
                change: ChangeKind::ATTRS,
                from: current.clone(),
                to: desired.clone(),
            },
            ops,
        );
    }

    fn diff_enums(&self, from: &Schema, to: &Schema, ops: &mut Vec<Change>) {
        let schema = Some(to.name.clone());
        diff_named(
            &from.enums,
            &to.enums,
            |e: &EnumType| e.name.clone(),
            |current, desired| current.values == desired.values,
            |desired| Change::AddEnum {
                schema: schema.clone(),
                enum_type: desired.clone(),
            },
            |current| Change::DropEnum(QualifiedName::new(Some(&from.name), &current.name)),
            |current, desired| Change::ModifyEnum {
                enum_type: QualifiedName::new(Some(&to.name), &desired.name),
                change: ChangeKind::VALUES,
                from: current.clone(),
                to: desired.clone(),
            },
            ops,
        );
    }

    fn diff_funcs(&self, from: &Schema, to: &Schema, ops: &mut Vec<Change>) {
        let schema = Some(to.name.clone());
        diff_named(
            &from.funcs,
            &to.funcs,
            |f: &Func| f.name.clone(),
            |current, desired| fold_ws(&current.def) == fold_ws(&desired.def),
            |desired| Change::AddFunc {
                schema: schema.clone(),
                func: desired.clone(),
            },
            |current| Change::DropFunc(QualifiedName::new(Some(&from.name), &current.name)),
            |current, desired| Change::ModifyFunc {
                func: QualifiedName::new(Some(&to.name), &desired.name),
                change: ChangeKind::DEFINITION,
                from: current.clone(),
                to: desired.clone(),
            },
            ops,
        );
    }

    fn diff_procs(&self, from: &Schema, to: &Schema, ops: &mut Vec<Change>) {
        let schema = Some(to.name.clone());
        diff_named(
            &from.procs,
            &to.procs,
            |p: &Proc| p.name.clone(),
            |current, desired| fold_ws(&current.def) == fold_ws(&desired.def),
            |desired| Change::AddProc {
                schema: schema.clone(),
                proc: desired.clone(),
            },
            |current| Change::DropProc(QualifiedName::new(Some(&from.name), &current.name)),
            |current, desired| Change::ModifyProc {
                proc: QualifiedName::new(Some(&to.name), &desired.name),
                change: ChangeKind::DEFINITION,
                from: current.clone(),
                to: desired.clone(),
            },
            ops,
        );
    }
}

/// Generic add/drop/modify walk for schema children matched by name.
#[allow(clippy::too_many_arguments)]
fn diff_named<T>(
    from: &[T],
    to: &[T],
    name: impl Fn(&T) -> String,
    equal: impl Fn(&T, &T) -> bool,
    add: impl Fn(&T) -> Change,
    drop: impl Fn(&T) -> Change,
    modify: impl Fn(&T, &T) -> Change,
    ops: &mut Vec<Change>,
) {
    for desired in to {
        match from.iter().find(|c| name(c) == name(desired)) {
            Some(current) => {
                if !equal(current, desired) {
                    ops.push(modify(current, desired));
                }
            }
            None => ops.push(add(desired)),
        }
    }
    for current in from {
        if !to.iter().any(|d| name(d) == name(current)) {
            ops.push(drop(current));
        }
    }
}

/// The differ refuses to compare states where one side holds a table and
/// the other a view (or enum, sequence, ...) under the same name.
fn check_kind_conflicts(from: &Schema, to: &Schema) -> Result<()> {
    let kinds = |s: &Schema| {
        let mut named: Vec<(String, &'static str)> = Vec::new();
        named.extend(s.tables.iter().map(|t| (t.name.clone(), "table")));
        named.extend(s.views.iter().map(|v| (v.name.clone(), "view")));
        named.extend(s.enums.iter().map(|e| (e.name.clone(), "enum")));
        named.extend(s.sequences.iter().map(|q| (q.name.clone(), "sequence")));
        named
    };
    for (name, from_kind) in kinds(from) {
        for (to_name, to_kind) in kinds(to) {
            if name == to_name && from_kind != to_kind {
                return Err(UserError::KindConflict {
                    name,
                    from_kind,
                    to_kind,
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Realm-level attributes (server charset, collation) diff into explicit
/// attribute operations rather than a facet mask, since there is no
/// enclosing Modify operation to carry them.
fn diff_realm_attrs(from: &[Attr], to: &[Attr], ops: &mut Vec<Change>) {
    for desired in to {
        match from.iter().find(|a| attr_key(a) == attr_key(desired)) {
            Some(current) if current == desired => {}
            Some(current) => ops.push(Change::ModifyAttr {
                schema: None,
                from: current.clone(),
                to: desired.clone(),
            }),
            None => ops.push(Change::AddAttr {
                schema: None,
                attr: desired.clone(),
            }),
        }
    }
    for current in from {
        if !to.iter().any(|a| attr_key(a) == attr_key(current)) {
            ops.push(Change::DropAttr {
                schema: None,
                attr: current.clone(),
            });
        }
    }
}

fn attr_key(attr: &Attr) -> String {
    match attr {
        Attr::Comment(_) => "comment".into(),
        Attr::Charset(_) => "charset".into(),
        Attr::Collation(_) => "collation".into(),
        Attr::Engine(_) => "engine".into(),
        Attr::AutoIncrement => "auto_increment".into(),
        Attr::AutoIncrementStart(_) => "auto_increment_start".into(),
        Attr::Identity { .. } => "identity".into(),
        Attr::GeneratedAs { .. } => "generated".into(),
        Attr::OnUpdate(_) => "on_update".into(),
        Attr::IndexType(_) => "index_type".into(),
        Attr::Predicate(_) => "predicate".into(),
        Attr::Include(_) => "include".into(),
        Attr::NoInherit => "no_inherit".into(),
        Attr::Enforced(_) => "enforced".into(),
        Attr::Unknown { key, .. } => format!("unknown:{key}"),
    }
}

fn facet_bit(attr: &Attr) -> ChangeKind {
    match attr {
        Attr::Comment(_) => ChangeKind::COMMENT,
        Attr::Charset(_) => ChangeKind::CHARSET,
        Attr::Collation(_) => ChangeKind::COLLATION,
        Attr::GeneratedAs { .. } => ChangeKind::GENERATED,
        Attr::AutoIncrement | Attr::Identity { .. } => ChangeKind::IDENTITY,
        Attr::Predicate(_) => ChangeKind::PREDICATE,
        _ => ChangeKind::ATTRS,
    }
}

/// Facet mask over two attribute lists matched by attribute key.
fn attr_facets(from: &[Attr], to: &[Attr]) -> ChangeKind {
    let mut change = ChangeKind::empty();
    for desired in to {
        match from.iter().find(|a| attr_key(a) == attr_key(desired)) {
            Some(current) if current == desired => {}
            Some(_) | None => change |= facet_bit(desired),
        }
    }
    for current in from {
        if !to.iter().any(|a| attr_key(a) == attr_key(current)) {
            change |= facet_bit(current);
        }
    }
    change
}

fn column_attr_facets(from: &[Attr], to: &[Attr]) -> ChangeKind {
    // AutoIncrementStart is a table counter, not a column facet.
    let strip = |attrs: &[Attr]| {
        attrs
            .iter()
            .filter(|a| !matches!(a, Attr::AutoIncrementStart(_)))
            .cloned()
            .collect::<Vec<_>>()
    };
    attr_facets(&strip(from), &strip(to))
}

fn index_attr_facets(from: &[Attr], to: &[Attr]) -> ChangeKind {
    let strip = |attrs: &[Attr]| {
        attrs
            .iter()
            .filter(|a| !matches!(a, Attr::Predicate(_)))
            .cloned()
            .collect::<Vec<_>>()
    };
    attr_facets(&strip(from), &strip(to))
}

fn predicate_of(attrs: &[Attr]) -> Option<String> {
    attrs.iter().find_map(|a| match a {
        Attr::Predicate(p) => Some(fold_ws(p)),
        _ => None,
    })
}
