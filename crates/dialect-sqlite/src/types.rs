use atlas_core::{ColumnType, Result, TimeKind, TypeKind};

/// Parse a SQLite column type. SQLite applies affinity rules rather than
/// strict types, so parsing never fails: unknown spellings keep their raw
/// string as a user-defined type.
pub fn parse_type(raw: &str) -> ColumnType {
    let upper = raw.trim().to_ascii_uppercase();
    let base = upper.split('(').next().unwrap_or_default().trim().to_string();
    let size = upper
        .split_once('(')
        .and_then(|(_, rest)| rest.trim_end_matches(')').split(',').next()?.trim().parse().ok());

    let kind = match base.as_str() {
        "INT" | "INTEGER" | "BIGINT" | "INT8" => TypeKind::Int {
            bits: 64,
            unsigned: false,
        },
        "SMALLINT" | "INT2" => TypeKind::Int {
            bits: 16,
            unsigned: false,
        },
        "TINYINT" => TypeKind::Int {
            bits: 8,
            unsigned: false,
        },
        "REAL" | "FLOAT" | "DOUBLE" | "DOUBLE PRECISION" => TypeKind::Float { double: true },
        "NUMERIC" | "DECIMAL" => TypeKind::Decimal {
            precision: size.map(|s: u32| s as u16),
            scale: None,
        },
        "TEXT" | "CLOB" | "VARCHAR" | "NVARCHAR" | "CHARACTER" => TypeKind::Text {
            size,
            fixed: base == "CHARACTER",
        },
        "BLOB" => TypeKind::Binary { size: None },
        "BOOLEAN" | "BOOL" => TypeKind::Bool,
        "DATE" => TypeKind::Time {
            kind: TimeKind::Date,
            precision: None,
        },
        "DATETIME" | "TIMESTAMP" => TypeKind::Time {
            kind: TimeKind::Timestamp { with_tz: false },
            precision: None,
        },
        "JSON" => TypeKind::Json { binary: false },
        _ => TypeKind::UserDefined {
            name: raw.trim().to_string(),
        },
    };
    ColumnType::new(raw.trim(), kind)
}

/// Canonical SQLite spelling of a typed column type.
pub fn format_type(ty: &ColumnType) -> Result<String> {
    let formatted = match &ty.kind {
        TypeKind::Bool => "BOOLEAN".to_string(),
        TypeKind::Int { .. } => "INTEGER".to_string(),
        TypeKind::Decimal { precision, .. } => match precision {
            Some(p) => format!("NUMERIC({p})"),
            None => "NUMERIC".to_string(),
        },
        TypeKind::Float { .. } => "REAL".to_string(),
        TypeKind::Text { size, .. } => match size {
            Some(s) => format!("VARCHAR({s})"),
            None => "TEXT".to_string(),
        },
        TypeKind::Binary { .. } => "BLOB".to_string(),
        TypeKind::Time { kind, .. } => match kind {
            TimeKind::Date => "DATE".to_string(),
            TimeKind::Time { .. } => "TEXT".to_string(),
            TimeKind::Timestamp { .. } => "DATETIME".to_string(),
        },
        TypeKind::Json { .. } => "JSON".to_string(),
        TypeKind::Uuid => "TEXT".to_string(),
        TypeKind::Enum { .. } | TypeKind::Spatial { .. } | TypeKind::Array(_) => {
            ty.raw.clone()
        }
        TypeKind::UserDefined { name } => name.clone(),
    };
    Ok(formatted)
}
