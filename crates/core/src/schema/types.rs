use serde::{Deserialize, Serialize};

/// A column type as the dialect spelled it plus the typed interpretation the
/// differ and planner reason about. `raw` keeps the catalog spelling so a
/// dialect can round-trip types it has no structured mapping for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    pub raw: String,
    pub kind: TypeKind,
    pub nullable: bool,
}

impl ColumnType {
    pub fn new(raw: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            raw: raw.into(),
            kind,
            nullable: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    Bool,
    Int {
        bits: u16,
        unsigned: bool,
    },
    Decimal {
        precision: Option<u16>,
        scale: Option<u16>,
    },
    Float {
        double: bool,
    },
    Text {
        size: Option<u32>,
        fixed: bool,
    },
    Binary {
        size: Option<u32>,
    },
    Time {
        kind: TimeKind,
        precision: Option<u16>,
    },
    /// Enumerated type. On MySQL the values are inlined in the column; on
    /// PostgreSQL the column references a named type owned by the schema.
    Enum {
        name: Option<String>,
        values: Vec<String>,
    },
    Json {
        binary: bool,
    },
    Uuid,
    Spatial {
        variant: String,
    },
    Array(Box<TypeKind>),
    UserDefined {
        name: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeKind {
    Date,
    Time { with_tz: bool },
    Timestamp { with_tz: bool },
}
