mod apply;
mod conn;
mod diff;
mod doc;
mod driver;
mod error;
pub mod migrate;
mod normalize;
mod ordering;
mod plan;
mod schema;
mod sqlclient;

pub use apply::apply_plan;
pub use conn::{Conn, Tx};
pub use diff::{DEFAULT_HOOKS, DefaultHooks, DiffEngine, DiffHooks, fold_expr, fold_ws};
pub use doc::{
    BlockHandler, DataSourceHandler, EvalConfig, Evaluator, Marshaler, SchemaValidator,
};
pub use driver::{
    Driver, InspectMode, InspectOptions, Inspector, Locker, Normalizer, PlanApplier, PlanOptions,
    RevisionStore, TypeIo,
};
pub use error::{Error, PlanError, Result, StateError, UserError};
pub use normalize::{DevNormalizer, twin_schema_name};
pub use ordering::sort_changes;
pub use plan::{Plan, PlanChange, PlanKind};
pub use schema::{
    Attr, Change, ChangeKind, Check, Column, ColumnType, EnumType, Expr, ForeignKey, Func, Index,
    IndexKey, IndexPart, Proc, QualifiedName, Realm, ReferenceAction, Schema, Sequence, TimeKind,
    Table, Trigger, TypeKind, View,
};
pub use sqlclient::{DirUrl, TargetUrl, parse_dir_url, parse_target_url};
