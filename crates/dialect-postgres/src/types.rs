use atlas_core::{ColumnType, Result, TimeKind, TypeKind};

/// Parse a PostgreSQL type spelling, accepting both the verbose
/// information_schema form (`character varying(255)`, `timestamp with
/// time zone`) and the udt shorthand (`varchar`, `timestamptz`).
pub fn parse_type(raw: &str) -> ColumnType {
    let trimmed = raw.trim();
    let lower = trimmed.to_ascii_lowercase();

    if let Some(element) = lower.strip_suffix("[]") {
        let inner = parse_type(element);
        return ColumnType::new(trimmed, TypeKind::Array(Box::new(inner.kind)));
    }

    let base = lower.split('(').next().unwrap_or_default().trim().to_string();
    let args: Vec<u16> = lower
        .split_once('(')
        .map(|(_, rest)| {
            rest.trim_end_matches(')')
                .split(',')
                .filter_map(|p| p.trim().parse().ok())
                .collect()
        })
        .unwrap_or_default();

    let kind = match base.as_str() {
        "boolean" | "bool" => TypeKind::Bool,
        "smallint" | "int2" => TypeKind::Int {
            bits: 16,
            unsigned: false,
        },
        "integer" | "int" | "int4" => TypeKind::Int {
            bits: 32,
            unsigned: false,
        },
        "bigint" | "int8" => TypeKind::Int {
            bits: 64,
            unsigned: false,
        },
        "numeric" | "decimal" => TypeKind::Decimal {
            precision: args.first().copied(),
            scale: args.get(1).copied(),
        },
        "real" | "float4" => TypeKind::Float { double: false },
        "double precision" | "float8" => TypeKind::Float { double: true },
        "text" => TypeKind::Text {
            size: None,
            fixed: false,
        },
        "character varying" | "varchar" => TypeKind::Text {
            size: args.first().map(|s| u32::from(*s)),
            fixed: false,
        },
        "character" | "char" | "bpchar" => TypeKind::Text {
            size: args.first().map(|s| u32::from(*s)),
            fixed: true,
        },
        "bytea" => TypeKind::Binary { size: None },
        "date" => TypeKind::Time {
            kind: TimeKind::Date,
            precision: None,
        },
        "time without time zone" | "time" => TypeKind::Time {
            kind: TimeKind::Time { with_tz: false },
            precision: args.first().copied(),
        },
        "time with time zone" | "timetz" => TypeKind::Time {
            kind: TimeKind::Time { with_tz: true },
            precision: args.first().copied(),
        },
        "timestamp without time zone" | "timestamp" => TypeKind::Time {
            kind: TimeKind::Timestamp { with_tz: false },
            precision: args.first().copied(),
        },
        "timestamp with time zone" | "timestamptz" => TypeKind::Time {
            kind: TimeKind::Timestamp { with_tz: true },
            precision: args.first().copied(),
        },
        "json" => TypeKind::Json { binary: false },
        "jsonb" => TypeKind::Json { binary: true },
        "uuid" => TypeKind::Uuid,
        "point" | "line" | "lseg" | "box" | "path" | "polygon" | "circle" => TypeKind::Spatial {
            variant: base.clone(),
        },
        _ => TypeKind::UserDefined {
            name: trimmed.to_string(),
        },
    };
    ColumnType::new(trimmed, kind)
}

/// Canonical PostgreSQL spelling.
pub fn format_type(ty: &ColumnType) -> Result<String> {
    let formatted = match &ty.kind {
        TypeKind::Bool => "boolean".to_string(),
        TypeKind::Int { bits, .. } => match bits {
            16 => "smallint".to_string(),
            64 => "bigint".to_string(),
            _ => "integer".to_string(),
        },
        TypeKind::Decimal { precision, scale } => match (precision, scale) {
            (Some(p), Some(s)) => format!("numeric({p},{s})"),
            (Some(p), None) => format!("numeric({p})"),
            _ => "numeric".to_string(),
        },
        TypeKind::Float { double } => {
            if *double {
                "double precision".to_string()
            } else {
                "real".to_string()
            }
        }
        TypeKind::Text { size, fixed } => match (size, fixed) {
            (Some(s), true) => format!("character({s})"),
            (Some(s), false) => format!("character varying({s})"),
            (None, true) => "character".to_string(),
            (None, false) => "text".to_string(),
        },
        TypeKind::Binary { .. } => "bytea".to_string(),
        TypeKind::Time { kind, precision } => {
            let base = match kind {
                TimeKind::Date => return Ok("date".to_string()),
                TimeKind::Time { with_tz: false } => "time",
                TimeKind::Time { with_tz: true } => "time with time zone",
                TimeKind::Timestamp { with_tz: false } => "timestamp",
                TimeKind::Timestamp { with_tz: true } => "timestamp with time zone",
            };
            match precision {
                Some(p) => match kind {
                    TimeKind::Time { with_tz: true } => format!("time({p}) with time zone"),
                    TimeKind::Timestamp { with_tz: true } => {
                        format!("timestamp({p}) with time zone")
                    }
                    _ => format!("{base}({p})"),
                },
                None => base.to_string(),
            }
        }
        TypeKind::Json { binary } => {
            if *binary {
                "jsonb".to_string()
            } else {
                "json".to_string()
            }
        }
        TypeKind::Uuid => "uuid".to_string(),
        TypeKind::Spatial { variant } => variant.clone(),
        TypeKind::Array(inner) => {
            let element = format_type(&ColumnType::new("", (**inner).clone()))?;
            format!("{element}[]")
        }
        TypeKind::Enum { name, .. } => name.clone().unwrap_or_else(|| ty.raw.clone()),
        TypeKind::UserDefined { name } => name.clone(),
    };
    Ok(formatted)
}
