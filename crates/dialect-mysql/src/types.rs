use atlas_core::{ColumnType, Result, TimeKind, TypeKind};

/// Parse a MySQL `column_type` spelling as information_schema reports it,
/// including display widths, the `unsigned` suffix, and inline enum value
/// lists.
pub fn parse_type(raw: &str) -> ColumnType {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();
    let unsigned = lower.contains("unsigned");
    let base = lower
        .split(['(', ' '])
        .next()
        .unwrap_or_default()
        .to_string();
    let args: Vec<String> = lower
        .split_once('(')
        .map(|(_, rest)| {
            let inner = rest.rsplit_once(')').map_or(rest, |(i, _)| i);
            inner.split(',').map(|p| p.trim().to_string()).collect()
        })
        .unwrap_or_default();
    let num = |i: usize| args.get(i).and_then(|a| a.parse::<u16>().ok());

    let kind = match base.as_str() {
        // tinyint(1) is the conventional boolean.
        "tinyint" if num(0) == Some(1) => TypeKind::Bool,
        "bool" | "boolean" => TypeKind::Bool,
        "tinyint" => TypeKind::Int { bits: 8, unsigned },
        "smallint" => TypeKind::Int { bits: 16, unsigned },
        "mediumint" => TypeKind::Int { bits: 24, unsigned },
        "int" | "integer" => TypeKind::Int { bits: 32, unsigned },
        "bigint" => TypeKind::Int { bits: 64, unsigned },
        "decimal" | "numeric" => TypeKind::Decimal {
            precision: num(0),
            scale: num(1),
        },
        "float" => TypeKind::Float { double: false },
        "double" | "real" => TypeKind::Float { double: true },
        "char" => TypeKind::Text {
            size: num(0).map(u32::from),
            fixed: true,
        },
        "varchar" => TypeKind::Text {
            size: num(0).map(u32::from),
            fixed: false,
        },
        "tinytext" | "text" | "mediumtext" | "longtext" => TypeKind::Text {
            size: None,
            fixed: false,
        },
        "binary" | "varbinary" => TypeKind::Binary {
            size: num(0).map(u32::from),
        },
        "tinyblob" | "blob" | "mediumblob" | "longblob" => TypeKind::Binary { size: None },
        "date" => TypeKind::Time {
            kind: TimeKind::Date,
            precision: None,
        },
        "time" => TypeKind::Time {
            kind: TimeKind::Time { with_tz: false },
            precision: num(0),
        },
        "datetime" => TypeKind::Time {
            kind: TimeKind::Timestamp { with_tz: false },
            precision: num(0),
        },
        "timestamp" => TypeKind::Time {
            kind: TimeKind::Timestamp { with_tz: true },
            precision: num(0),
        },
        "json" => TypeKind::Json { binary: false },
        "enum" => TypeKind::Enum {
            name: None,
            values: args
                .iter()
                .map(|a| a.trim_matches('\'').to_string())
                .collect(),
        },
        "point" | "linestring" | "polygon" | "geometry" | "multipoint" | "multilinestring"
        | "multipolygon" | "geometrycollection" => TypeKind::Spatial {
            variant: base.clone(),
        },
        _ => TypeKind::UserDefined {
            name: trimmed.to_string(),
        },
    };
    ColumnType::new(trimmed, kind)
}

/// Canonical MySQL spelling.
pub fn format_type(ty: &ColumnType) -> Result<String> {
    let formatted = match &ty.kind {
        TypeKind::Bool => "bool".to_string(),
        TypeKind::Int { bits, unsigned } => {
            let base = match bits {
                8 => "tinyint",
                16 => "smallint",
                24 => "mediumint",
                64 => "bigint",
                _ => "int",
            };
            if *unsigned {
                format!("{base} unsigned")
            } else {
                base.to_string()
            }
        }
        TypeKind::Decimal { precision, scale } => match (precision, scale) {
            (Some(p), Some(s)) => format!("decimal({p},{s})"),
            (Some(p), None) => format!("decimal({p})"),
            _ => "decimal".to_string(),
        },
        TypeKind::Float { double } => {
            if *double {
                "double".to_string()
            } else {
                "float".to_string()
            }
        }
        TypeKind::Text { size, fixed } => match (size, fixed) {
            (Some(s), true) => format!("char({s})"),
            (Some(s), false) => format!("varchar({s})"),
            (None, true) => "char".to_string(),
            (None, false) => "text".to_string(),
        },
        TypeKind::Binary { size } => match size {
            Some(s) => format!("varbinary({s})"),
            None => "blob".to_string(),
        },
        TypeKind::Time { kind, precision } => {
            let base = match kind {
                TimeKind::Date => "date",
                TimeKind::Time { .. } => "time",
                TimeKind::Timestamp { with_tz: true } => "timestamp",
                TimeKind::Timestamp { with_tz: false } => "datetime",
            };
            match precision {
                Some(p) => format!("{base}({p})"),
                None => base.to_string(),
            }
        }
        TypeKind::Json { .. } => "json".to_string(),
        TypeKind::Uuid => "char(36)".to_string(),
        TypeKind::Spatial { variant } => variant.clone(),
        TypeKind::Enum { values, .. } => {
            let quoted: Vec<String> = values
                .iter()
                .map(|v| format!("'{}'", v.replace('\'', "''")))
                .collect();
            format!("enum({})", quoted.join(","))
        }
        TypeKind::Array(_) => {
            return Err(atlas_core::PlanError {
                dialect: crate::DIALECT_NAME,
                change: "FormatType".to_string(),
                reason: "array types are not supported".to_string(),
            }
            .into());
        }
        TypeKind::UserDefined { name } => name.clone(),
    };
    Ok(formatted)
}
