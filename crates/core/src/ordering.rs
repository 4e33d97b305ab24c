use std::collections::{BTreeMap, BTreeSet};

use crate::{Change, QualifiedName, Table};

#[derive(Debug, Clone)]
struct IndexedOp {
    original_index: usize,
    op: Change,
}

/// Coarse execution phases. Within one plan: dependents are dropped before
/// their owners, referenced objects are created before their dependents,
/// and foreign keys trail every table they may point into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PriorityGroup {
    DropTrigger = 1,
    DropView = 2,
    DropForeignKey = 3,
    DropIndex = 4,
    DropTable = 5,
    DropSequence = 6,
    DropEnum = 7,
    DropFunc = 8,
    DropProc = 9,
    DropSchema = 10,
    CreateSchema = 11,
    ModifySchema = 12,
    CreateEnum = 13,
    ModifyEnum = 14,
    CreateSequence = 15,
    ModifySequence = 16,
    CreateTable = 17,
    TableScoped = 18,
    IndexOps = 19,
    AddForeignKey = 20,
    CreateView = 21,
    CreateFuncOrProc = 22,
    CreateTrigger = 23,
    Attr = 24,
}

/// Renames run before any other change touching the renamed object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TableSubPriority {
    RenameTable = 0,
    RenameColumn = 1,
    ModifyColumn = 2,
    AddColumn = 3,
    DropColumn = 4,
    PrimaryKey = 5,
    Checks = 6,
    TableAttrs = 7,
}

/// Order a change list so that applying it sequentially respects object
/// dependencies. Equal-rank operations sort lexicographically by target
/// name so the output is deterministic across runs.
#[must_use]
pub fn sort_changes(ops: Vec<Change>) -> Vec<Change> {
    let mut grouped = BTreeMap::<PriorityGroup, Vec<IndexedOp>>::new();
    for (original_index, op) in ops.into_iter().enumerate() {
        grouped
            .entry(priority_group(&op))
            .or_default()
            .push(IndexedOp { original_index, op });
    }

    let mut sorted = Vec::new();
    for (priority, entries) in grouped {
        let mut prioritized = match priority {
            PriorityGroup::CreateTable => sort_create_tables(entries),
            PriorityGroup::TableScoped => sort_table_scoped(entries),
            _ => sort_lexicographic(entries),
        };
        sorted.extend(prioritized.drain(..).map(|entry| entry.op));
    }
    sorted
}

fn priority_group(op: &Change) -> PriorityGroup {
    match op {
        Change::DropTrigger { .. } => PriorityGroup::DropTrigger,
        Change::DropView(_) => PriorityGroup::DropView,
        Change::DropForeignKey { .. } => PriorityGroup::DropForeignKey,
        Change::DropIndex { .. } => PriorityGroup::DropIndex,
        Change::DropTable(_) => PriorityGroup::DropTable,
        Change::DropSequence(_) => PriorityGroup::DropSequence,
        Change::DropEnum(_) => PriorityGroup::DropEnum,
        Change::DropFunc(_) => PriorityGroup::DropFunc,
        Change::DropProc(_) => PriorityGroup::DropProc,
        Change::DropSchema { .. } => PriorityGroup::DropSchema,
        Change::AddSchema(_) => PriorityGroup::CreateSchema,
        Change::ModifySchema { .. } => PriorityGroup::ModifySchema,
        Change::AddEnum { .. } => PriorityGroup::CreateEnum,
        Change::ModifyEnum { .. } => PriorityGroup::ModifyEnum,
        Change::AddSequence { .. } => PriorityGroup::CreateSequence,
        Change::ModifySequence { .. } => PriorityGroup::ModifySequence,
        Change::AddTable(_) => PriorityGroup::CreateTable,
        Change::RenameTable { .. }
        | Change::RenameColumn { .. }
        | Change::ModifyColumn { .. }
        | Change::AddColumn { .. }
        | Change::DropColumn { .. }
        | Change::SetPrimaryKey { .. }
        | Change::DropPrimaryKey { .. }
        | Change::AddCheck { .. }
        | Change::DropCheck { .. }
        | Change::ModifyCheck { .. }
        | Change::ModifyTable { .. } => PriorityGroup::TableScoped,
        Change::AddIndex { .. } | Change::ModifyIndex { .. } | Change::RenameIndex { .. } => {
            PriorityGroup::IndexOps
        }
        Change::AddForeignKey { .. } | Change::ModifyForeignKey { .. } => {
            PriorityGroup::AddForeignKey
        }
        Change::AddView { .. } | Change::ModifyView { .. } => PriorityGroup::CreateView,
        Change::AddFunc { .. }
        | Change::ModifyFunc { .. }
        | Change::AddProc { .. }
        | Change::ModifyProc { .. } => PriorityGroup::CreateFuncOrProc,
        Change::AddTrigger { .. } | Change::ModifyTrigger { .. } => PriorityGroup::CreateTrigger,
        Change::AddAttr { .. } | Change::ModifyAttr { .. } | Change::DropAttr { .. } => {
            PriorityGroup::Attr
        }
    }
}

fn sort_lexicographic(mut entries: Vec<IndexedOp>) -> Vec<IndexedOp> {
    entries.sort_by(|a, b| {
        sort_name(&a.op)
            .cmp(&sort_name(&b.op))
            .then(rename_rank(&a.op).cmp(&rename_rank(&b.op)))
            .then(a.original_index.cmp(&b.original_index))
    });
    entries
}

/// Within the index group, a rename of an object precedes its modification.
fn rename_rank(op: &Change) -> u8 {
    match op {
        Change::RenameIndex { .. } => 0,
        _ => 1,
    }
}

fn sort_name(op: &Change) -> String {
    match op {
        Change::AddSchema(s) => s.name.clone(),
        Change::DropSchema { name } | Change::ModifySchema { name, .. } => name.clone(),
        Change::AddTable(t) => t.name.clone(),
        Change::DropTable(name) => name.to_string(),
        Change::ModifyTable { table, .. }
        | Change::RenameTable { to: table, .. }
        | Change::AddColumn { table, .. }
        | Change::DropColumn { table, .. }
        | Change::ModifyColumn { table, .. }
        | Change::RenameColumn { table, .. }
        | Change::AddIndex { table, .. }
        | Change::DropIndex { table, .. }
        | Change::ModifyIndex { table, .. }
        | Change::RenameIndex { table, .. }
        | Change::SetPrimaryKey { table, .. }
        | Change::DropPrimaryKey { table }
        | Change::AddForeignKey { table, .. }
        | Change::DropForeignKey { table, .. }
        | Change::ModifyForeignKey { table, .. }
        | Change::AddCheck { table, .. }
        | Change::DropCheck { table, .. }
        | Change::ModifyCheck { table, .. }
        | Change::AddTrigger { table, .. }
        | Change::DropTrigger { table, .. }
        | Change::ModifyTrigger { table, .. } => table.to_string(),
        Change::AddView { view, .. } => view.name.clone(),
        Change::DropView(name)
        | Change::DropSequence(name)
        | Change::DropEnum(name)
        | Change::DropFunc(name)
        | Change::DropProc(name) => name.to_string(),
        Change::ModifyView { view, .. } => view.to_string(),
        Change::AddSequence { sequence, .. } => sequence.name.clone(),
        Change::ModifySequence { sequence, .. } => sequence.to_string(),
        Change::AddEnum { enum_type, .. } => enum_type.name.clone(),
        Change::ModifyEnum { enum_type, .. } => enum_type.to_string(),
        Change::AddFunc { func, .. } => func.name.clone(),
        Change::ModifyFunc { func, .. } => func.to_string(),
        Change::AddProc { proc, .. } => proc.name.clone(),
        Change::ModifyProc { proc, .. } => proc.to_string(),
        Change::AddAttr { schema, .. }
        | Change::ModifyAttr { schema, .. }
        | Change::DropAttr { schema, .. } => schema.clone().unwrap_or_default(),
    }
}

fn sort_table_scoped(mut entries: Vec<IndexedOp>) -> Vec<IndexedOp> {
    entries.sort_by(|a, b| {
        sort_name(&a.op)
            .cmp(&sort_name(&b.op))
            .then(table_sub_priority(&a.op).cmp(&table_sub_priority(&b.op)))
            .then(a.original_index.cmp(&b.original_index))
    });
    entries
}

fn table_sub_priority(op: &Change) -> TableSubPriority {
    match op {
        Change::RenameTable { .. } => TableSubPriority::RenameTable,
        Change::RenameColumn { .. } => TableSubPriority::RenameColumn,
        Change::ModifyColumn { .. } => TableSubPriority::ModifyColumn,
        Change::AddColumn { .. } => TableSubPriority::AddColumn,
        Change::DropColumn { .. } => TableSubPriority::DropColumn,
        Change::SetPrimaryKey { .. } | Change::DropPrimaryKey { .. } => {
            TableSubPriority::PrimaryKey
        }
        Change::AddCheck { .. } | Change::DropCheck { .. } | Change::ModifyCheck { .. } => {
            TableSubPriority::Checks
        }
        _ => TableSubPriority::TableAttrs,
    }
}

/// Create tables referenced by foreign keys before their referrers. Cycles
/// fall back to insertion order; the foreign keys that close a cycle are
/// emitted as separate changes after both tables exist.
fn sort_create_tables(entries: Vec<IndexedOp>) -> Vec<IndexedOp> {
    let mut index_by_table = BTreeMap::<QualifiedName, usize>::new();
    for (idx, entry) in entries.iter().enumerate() {
        if let Change::AddTable(table) = &entry.op {
            index_by_table.insert(table.qualified_name(), idx);
        }
    }

    let mut dependencies = vec![BTreeSet::<usize>::new(); entries.len()];
    for (idx, entry) in entries.iter().enumerate() {
        let Change::AddTable(table) = &entry.op else {
            continue;
        };
        add_table_dependencies(idx, table, &index_by_table, &mut dependencies);
    }

    topological_sort(entries, dependencies)
}

fn add_table_dependencies(
    idx: usize,
    table: &Table,
    index_by_table: &BTreeMap<QualifiedName, usize>,
    dependencies: &mut [BTreeSet<usize>],
) {
    let self_key = table.qualified_name();
    for fk in &table.foreign_keys {
        if fk.ref_table == self_key {
            continue;
        }
        if let Some(dependency_index) = index_by_table.get(&fk.ref_table) {
            dependencies[idx].insert(*dependency_index);
        }
    }
}

fn topological_sort(entries: Vec<IndexedOp>, dependencies: Vec<BTreeSet<usize>>) -> Vec<IndexedOp> {
    let mut reverse_edges = vec![BTreeSet::<usize>::new(); entries.len()];
    for (idx, deps) in dependencies.iter().enumerate() {
        for dependency in deps {
            reverse_edges[*dependency].insert(idx);
        }
    }

    let mut remaining = dependencies.iter().map(BTreeSet::len).collect::<Vec<_>>();
    let mut ready = BTreeSet::<(String, usize)>::new();
    for (idx, count) in remaining.iter().enumerate() {
        if *count == 0 {
            ready.insert((sort_name(&entries[idx].op), idx));
        }
    }

    let mut ordered = Vec::new();
    let mut visited = vec![false; entries.len()];
    while let Some((_, idx)) = ready.pop_first() {
        if visited[idx] {
            continue;
        }
        visited[idx] = true;
        ordered.push(idx);

        for dependent in &reverse_edges[idx] {
            if remaining[*dependent] == 0 {
                continue;
            }
            remaining[*dependent] -= 1;
            if remaining[*dependent] == 0 {
                ready.insert((sort_name(&entries[*dependent].op), *dependent));
            }
        }
    }

    // Cyclic remainder keeps its emission order.
    if ordered.len() != entries.len() {
        let mut unresolved = (0..entries.len())
            .filter(|idx| !visited[*idx])
            .collect::<Vec<_>>();
        unresolved.sort_by_key(|idx| entries[*idx].original_index);
        ordered.extend(unresolved);
    }

    ordered
        .into_iter()
        .map(|idx| entries[idx].clone())
        .collect()
}
