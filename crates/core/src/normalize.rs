use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::{
    DefaultHooks, DiffEngine, Driver, Error, InspectOptions, Inspector as _, Normalizer,
    PlanApplier as _, PlanOptions, Realm, Result, Schema,
};

/// Unique name for the scratch copy of a schema on the dev database.
/// When the dialect's identifier limit would be exceeded, the name is
/// truncated and a short content hash appended so distinct inputs stay
/// distinct.
pub fn twin_schema_name(name: &str, unix_ts: i64, max_len: usize) -> String {
    let twin = format!("atlas_twin_{name}_{unix_ts}");
    if twin.len() <= max_len {
        return twin;
    }
    let digest = Sha256::digest(twin.as_bytes());
    let mut suffix = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        suffix.push_str(&format!("{byte:02x}"));
    }
    let keep = max_len.saturating_sub(suffix.len() + 1);
    format!("{}_{suffix}", &twin[..keep])
}

/// Canonicalizes user input by round-tripping it through a dev database:
/// the schema is created under a twin name, inspected back out (the
/// database fills in defaults, resolves type aliases, canonicalizes
/// expressions), and the twin is dropped on every exit path. Cleanup
/// failures are joined to the primary error rather than swallowed.
pub struct DevNormalizer<'a> {
    driver: &'a mut dyn Driver,
}

impl<'a> DevNormalizer<'a> {
    pub fn new(driver: &'a mut dyn Driver) -> Self {
        Self { driver }
    }

    fn round_trip(&mut self, schema: &Schema) -> Result<Schema> {
        let twin = twin_schema_name(
            &schema.name,
            Utc::now().timestamp(),
            self.driver.max_ident_len(),
        );
        debug!(schema = %schema.name, twin = %twin, "normalizing through twin schema");

        let engine = DiffEngine::new(&DefaultHooks);
        let renamed = rename_schema(schema, &twin);
        let create = engine.realm_diff(&Realm::default(), &Realm::new(vec![renamed]))?;
        self.driver
            .apply_changes(&create, &PlanOptions::default())
            .map_err(|e| Error::Normalization {
                message: format!("creating twin schema {twin:?}: {e}"),
            })?;

        let inspected = self
            .driver
            .inspect_schema(&twin, &InspectOptions::default())
            .map(|s| rename_schema(&s, &schema.name));

        let drop = engine.realm_diff(&Realm::new(vec![Schema::new(&twin)]), &Realm::default());
        let cleanup = drop.and_then(|changes| {
            self.driver.apply_changes(&changes, &PlanOptions::default())
        });

        match (inspected, cleanup) {
            (Ok(schema), Ok(())) => Ok(schema),
            (Ok(_), Err(cleanup_err)) => Err(Error::Normalization {
                message: format!("dropping twin schema {twin:?}: {cleanup_err}"),
            }),
            (Err(primary), Ok(())) => Err(Error::Normalization {
                message: primary.to_string(),
            }),
            (Err(primary), Err(cleanup_err)) => Err(Error::Normalization {
                message: format!("{primary}; additionally, dropping twin schema {twin:?}: {cleanup_err}"),
            }),
        }
    }
}

impl Normalizer for DevNormalizer<'_> {
    fn normalize_schema(&mut self, schema: &Schema) -> Result<Schema> {
        self.round_trip(schema)
    }

    fn normalize_realm(&mut self, realm: &Realm) -> Result<Realm> {
        let mut normalized = Realm {
            schemas: Vec::with_capacity(realm.schemas.len()),
            attrs: realm.attrs.clone(),
        };
        for schema in &realm.schemas {
            normalized.schemas.push(self.round_trip(schema)?);
        }
        Ok(normalized)
    }
}

/// Deep-rename a schema: the schema itself, the back-references of its
/// tables, and any foreign key pointing into the renamed namespace.
fn rename_schema(schema: &Schema, new_name: &str) -> Schema {
    let mut renamed = schema.clone();
    let old_name = schema.name.clone();
    renamed.name = new_name.to_string();
    for table in &mut renamed.tables {
        if table.schema.as_deref() == Some(old_name.as_str()) || table.schema.is_none() {
            table.schema = Some(new_name.to_string());
        }
        for fk in &mut table.foreign_keys {
            match &fk.ref_table.schema {
                Some(schema) if schema == &old_name => {
                    fk.ref_table.schema = Some(new_name.to_string());
                }
                None => fk.ref_table.schema = Some(new_name.to_string()),
                Some(_) => {}
            }
        }
    }
    renamed
}
