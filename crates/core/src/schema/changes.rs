use bitflags::bitflags;

use super::{
    Attr, Check, Column, EnumType, ForeignKey, Func, Index, Proc, QualifiedName, Schema, Sequence,
    Table, Trigger, View,
};

bitflags! {
    /// Facets changed by a Modify operation. Downstream consumers use the
    /// mask to compute the minimal rewrite instead of re-diffing the
    /// carried snapshots.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChangeKind: u32 {
        const TYPE = 1 << 0;
        const NULL = 1 << 1;
        const DEFAULT = 1 << 2;
        const COMMENT = 1 << 3;
        const CHARSET = 1 << 4;
        const COLLATION = 1 << 5;
        const GENERATED = 1 << 6;
        const IDENTITY = 1 << 7;
        const UPDATE_ACTION = 1 << 8;
        const DELETE_ACTION = 1 << 9;
        const UNIQUE = 1 << 10;
        const PARTS = 1 << 11;
        const PREDICATE = 1 << 12;
        const ATTRS = 1 << 13;
        const VALUES = 1 << 14;
        const COLUMNS = 1 << 15;
        const DEFINITION = 1 << 16;
    }
}

/// One schema change operation. The differ emits an ordered list of these;
/// the planner translates each into dialect statements. The sum is closed
/// on purpose: both ends match exhaustively so a new operation cannot be
/// silently skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    AddSchema(Schema),
    DropSchema {
        name: String,
    },
    ModifySchema {
        name: String,
        change: ChangeKind,
        from: Vec<Attr>,
        to: Vec<Attr>,
    },

    AddTable(Table),
    DropTable(QualifiedName),
    ModifyTable {
        table: QualifiedName,
        change: ChangeKind,
        from: Vec<Attr>,
        to: Vec<Attr>,
    },
    RenameTable {
        from: QualifiedName,
        to: QualifiedName,
    },

    AddColumn {
        table: QualifiedName,
        column: Column,
    },
    DropColumn {
        table: QualifiedName,
        column: String,
    },
    ModifyColumn {
        table: QualifiedName,
        change: ChangeKind,
        from: Column,
        to: Column,
    },
    RenameColumn {
        table: QualifiedName,
        from: String,
        to: String,
    },

    AddIndex {
        table: QualifiedName,
        index: Index,
    },
    DropIndex {
        table: QualifiedName,
        index: String,
    },
    ModifyIndex {
        table: QualifiedName,
        change: ChangeKind,
        from: Index,
        to: Index,
    },
    RenameIndex {
        table: QualifiedName,
        from: String,
        to: String,
    },
    SetPrimaryKey {
        table: QualifiedName,
        index: Index,
    },
    DropPrimaryKey {
        table: QualifiedName,
    },

    AddForeignKey {
        table: QualifiedName,
        fk: ForeignKey,
    },
    DropForeignKey {
        table: QualifiedName,
        symbol: String,
    },
    ModifyForeignKey {
        table: QualifiedName,
        change: ChangeKind,
        from: ForeignKey,
        to: ForeignKey,
    },

    AddCheck {
        table: QualifiedName,
        check: Check,
    },
    DropCheck {
        table: QualifiedName,
        name: String,
    },
    ModifyCheck {
        table: QualifiedName,
        change: ChangeKind,
        from: Check,
        to: Check,
    },

    AddAttr {
        schema: Option<String>,
        attr: Attr,
    },
    ModifyAttr {
        schema: Option<String>,
        from: Attr,
        to: Attr,
    },
    DropAttr {
        schema: Option<String>,
        attr: Attr,
    },

    AddView {
        schema: Option<String>,
        view: View,
    },
    DropView(QualifiedName),
    ModifyView {
        view: QualifiedName,
        change: ChangeKind,
        from: View,
        to: View,
    },

    AddSequence {
        schema: Option<String>,
        sequence: Sequence,
    },
    DropSequence(QualifiedName),
    ModifySequence {
        sequence: QualifiedName,
        change: ChangeKind,
        from: Sequence,
        to: Sequence,
    },

    AddEnum {
        schema: Option<String>,
        enum_type: EnumType,
    },
    DropEnum(QualifiedName),
    ModifyEnum {
        enum_type: QualifiedName,
        change: ChangeKind,
        from: EnumType,
        to: EnumType,
    },

    AddFunc {
        schema: Option<String>,
        func: Func,
    },
    DropFunc(QualifiedName),
    ModifyFunc {
        func: QualifiedName,
        change: ChangeKind,
        from: Func,
        to: Func,
    },

    AddProc {
        schema: Option<String>,
        proc: Proc,
    },
    DropProc(QualifiedName),
    ModifyProc {
        proc: QualifiedName,
        change: ChangeKind,
        from: Proc,
        to: Proc,
    },

    AddTrigger {
        table: QualifiedName,
        trigger: Trigger,
    },
    DropTrigger {
        table: QualifiedName,
        name: String,
    },
    ModifyTrigger {
        table: QualifiedName,
        change: ChangeKind,
        from: Trigger,
        to: Trigger,
    },
}

impl Change {
    /// Short tag used in error messages and ledgers.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::AddSchema(_) => "AddSchema",
            Self::DropSchema { .. } => "DropSchema",
            Self::ModifySchema { .. } => "ModifySchema",
            Self::AddTable(_) => "AddTable",
            Self::DropTable(_) => "DropTable",
            Self::ModifyTable { .. } => "ModifyTable",
            Self::RenameTable { .. } => "RenameTable",
            Self::AddColumn { .. } => "AddColumn",
            Self::DropColumn { .. } => "DropColumn",
            Self::ModifyColumn { .. } => "ModifyColumn",
            Self::RenameColumn { .. } => "RenameColumn",
            Self::AddIndex { .. } => "AddIndex",
            Self::DropIndex { .. } => "DropIndex",
            Self::ModifyIndex { .. } => "ModifyIndex",
            Self::RenameIndex { .. } => "RenameIndex",
            Self::SetPrimaryKey { .. } => "SetPrimaryKey",
            Self::DropPrimaryKey { .. } => "DropPrimaryKey",
            Self::AddForeignKey { .. } => "AddForeignKey",
            Self::DropForeignKey { .. } => "DropForeignKey",
            Self::ModifyForeignKey { .. } => "ModifyForeignKey",
            Self::AddCheck { .. } => "AddCheck",
            Self::DropCheck { .. } => "DropCheck",
            Self::ModifyCheck { .. } => "ModifyCheck",
            Self::AddAttr { .. } => "AddAttr",
            Self::ModifyAttr { .. } => "ModifyAttr",
            Self::DropAttr { .. } => "DropAttr",
            Self::AddView { .. } => "AddView",
            Self::DropView(_) => "DropView",
            Self::ModifyView { .. } => "ModifyView",
            Self::AddSequence { .. } => "AddSequence",
            Self::DropSequence(_) => "DropSequence",
            Self::ModifySequence { .. } => "ModifySequence",
            Self::AddEnum { .. } => "AddEnum",
            Self::DropEnum(_) => "DropEnum",
            Self::ModifyEnum { .. } => "ModifyEnum",
            Self::AddFunc { .. } => "AddFunc",
            Self::DropFunc(_) => "DropFunc",
            Self::ModifyFunc { .. } => "ModifyFunc",
            Self::AddProc { .. } => "AddProc",
            Self::DropProc(_) => "DropProc",
            Self::ModifyProc { .. } => "ModifyProc",
            Self::AddTrigger { .. } => "AddTrigger",
            Self::DropTrigger { .. } => "DropTrigger",
            Self::ModifyTrigger { .. } => "ModifyTrigger",
        }
    }
}
