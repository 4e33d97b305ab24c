mod changes;
mod expr;
mod model;
mod types;

pub use changes::{Change, ChangeKind};
pub use expr::Expr;
pub use model::{
    Attr, Check, Column, EnumType, ForeignKey, Func, Index, IndexKey, IndexPart, Proc,
    QualifiedName, Realm, ReferenceAction, Schema, Sequence, Table, Trigger, View,
};
pub use types::{ColumnType, TimeKind, TypeKind};
