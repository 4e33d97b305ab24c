//! YAML-driven diff cases. Each case names two schema states in a compact
//! form and the change tags the differ is expected to produce, in order.
//!
//! ```yaml
//! cases:
//!   - name: add a column
//!     from:
//!       tables:
//!         users:
//!           columns:
//!             - { name: id, type: bigint }
//!     to:
//!       tables:
//!         users:
//!           columns:
//!             - { name: id, type: bigint }
//!             - { name: email, type: text, null: true }
//!     want: [AddColumn]
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;

use atlas_core::{
    Check, Column, ColumnType, DefaultHooks, DiffEngine, EnumType, Expr, ForeignKey, Index,
    QualifiedName, Schema, Table, TimeKind, TypeKind,
};

#[derive(Debug, Deserialize)]
pub struct CaseFile {
    pub cases: Vec<Case>,
}

#[derive(Debug, Deserialize)]
pub struct Case {
    pub name: String,
    pub from: SchemaSpec,
    pub to: SchemaSpec,
    pub want: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SchemaSpec {
    #[serde(default)]
    pub tables: BTreeMap<String, TableSpec>,
    #[serde(default)]
    pub enums: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TableSpec {
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeySpec>,
    #[serde(default)]
    pub checks: Vec<CheckSpec>,
    #[serde(default)]
    pub renamed_from: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, rename = "null")]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub renamed_from: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    #[serde(default)]
    pub unique: bool,
    pub columns: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForeignKeySpec {
    pub symbol: String,
    pub columns: Vec<String>,
    pub ref_table: String,
    pub ref_columns: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct CheckSpec {
    pub name: String,
    pub expr: String,
}

/// Map the compact spelling used in cases to a typed column type. Unknown
/// spellings stay user-defined, which still diffs by raw string.
pub fn column_type(raw: &str, nullable: bool) -> ColumnType {
    let kind = match raw.to_ascii_lowercase().as_str() {
        "bool" | "boolean" => TypeKind::Bool,
        "smallint" => TypeKind::Int {
            bits: 16,
            unsigned: false,
        },
        "int" | "integer" => TypeKind::Int {
            bits: 32,
            unsigned: false,
        },
        "bigint" => TypeKind::Int {
            bits: 64,
            unsigned: false,
        },
        "real" | "float" => TypeKind::Float { double: false },
        "double" => TypeKind::Float { double: true },
        "text" => TypeKind::Text {
            size: None,
            fixed: false,
        },
        "blob" | "bytea" => TypeKind::Binary { size: None },
        "date" => TypeKind::Time {
            kind: TimeKind::Date,
            precision: None,
        },
        "timestamp" => TypeKind::Time {
            kind: TimeKind::Timestamp { with_tz: false },
            precision: None,
        },
        "json" => TypeKind::Json { binary: false },
        "uuid" => TypeKind::Uuid,
        other => TypeKind::UserDefined {
            name: other.to_string(),
        },
    };
    let ty = ColumnType::new(raw, kind);
    if nullable { ty.nullable() } else { ty }
}

impl SchemaSpec {
    pub fn to_schema(&self, name: &str) -> Schema {
        let mut schema = Schema::new(name);
        for (enum_name, values) in &self.enums {
            schema.enums.push(EnumType::new(enum_name, values.clone()));
        }
        for (table_name, spec) in &self.tables {
            schema.tables.push(spec.to_table(name, table_name));
        }
        schema
    }
}

impl TableSpec {
    fn to_table(&self, schema: &str, name: &str) -> Table {
        let mut table = Table::new(name);
        table.schema = Some(schema.to_string());
        table.renamed_from = self.renamed_from.clone();
        for column in &self.columns {
            let mut built = Column::new(&column.name, column_type(&column.ty, column.nullable));
            if let Some(default) = &column.default {
                built.default = Some(Expr::Raw(default.clone()));
            }
            built.renamed_from = column.renamed_from.clone();
            table.columns.push(built);
        }
        if !self.primary_key.is_empty() {
            table.primary_key =
                Some(Index::new("").unique().on_columns(self.primary_key.clone()));
        }
        for index in &self.indexes {
            let mut built = Index::new(&index.name).on_columns(index.columns.clone());
            built.unique = index.unique;
            table.indexes.push(built);
        }
        for fk in &self.foreign_keys {
            let mut built = ForeignKey::new(
                &fk.symbol,
                QualifiedName::new(Some(schema), &fk.ref_table),
            );
            built.columns = fk.columns.clone();
            built.ref_columns = fk.ref_columns.clone();
            table.foreign_keys.push(built);
        }
        for check in &self.checks {
            table.checks.push(Check::new(&check.name, &check.expr));
        }
        table
    }
}

/// Run every case in a YAML document and panic with the case name on the
/// first mismatch.
pub fn run_cases(yaml: &str) {
    let file: CaseFile = serde_yaml::from_str(yaml).expect("case file parses");
    let engine = DiffEngine::new(&DefaultHooks);
    for case in &file.cases {
        let from = case.from.to_schema("main");
        let to = case.to.to_schema("main");
        let changes = engine
            .schema_diff(&from, &to)
            .unwrap_or_else(|e| panic!("case {:?}: diff failed: {e}", case.name));
        let got: Vec<&str> = changes.iter().map(|c| c.tag()).collect();
        assert_eq!(
            got, case.want,
            "case {:?}: expected {:?}, got {changes:#?}",
            case.name, case.want
        );
    }
}
