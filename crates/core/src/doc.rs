//! Interface to the declarative document engine. Evaluation itself (the
//! expression language with variables, locals, data sources, and
//! `for_each`) is an external collaborator; the core only consumes the
//! contract below and hands it the configuration knobs the caller set.

use std::collections::BTreeMap;

use crate::{Realm, Result};

/// Evaluates parsed document text plus an input map into a typed realm.
pub trait Evaluator {
    fn eval(&self, body: &str, input: &BTreeMap<String, String>, config: &EvalConfig)
    -> Result<Realm>;
}

/// The dual of [`Evaluator`]: canonical document bytes for a realm.
pub trait Marshaler {
    fn marshal(&self, realm: &Realm) -> Result<Vec<u8>>;
}

/// Handler for a registered data-source block. Receives the block label
/// and returns the value the document references.
pub trait DataSourceHandler: Send + Sync {
    fn resolve(&self, label: &str) -> Result<String>;
}

/// Handler for typed, labeled blocks and singleton init blocks.
pub trait BlockHandler: Send + Sync {
    fn handle(&self, body: &str) -> Result<()>;
}

/// Validator consulted on every body, block, and attribute during
/// evaluation.
pub trait SchemaValidator: Send + Sync {
    fn validate(&self, path: &str, value: &str) -> Result<()>;
}

/// Evaluation configuration assembled with `with_*` builders mirroring the
/// documented option effects.
#[derive(Default)]
pub struct EvalConfig {
    pub scoped_enums: Vec<(String, Vec<String>)>,
    pub variables: BTreeMap<String, String>,
    pub functions: BTreeMap<String, fn(&[String]) -> String>,
    pub data_sources: BTreeMap<String, Box<dyn DataSourceHandler>>,
    pub type_label_blocks: BTreeMap<(String, String), Box<dyn BlockHandler>>,
    pub init_blocks: BTreeMap<String, Box<dyn BlockHandler>>,
    pub validators: Vec<Box<dyn Fn() -> Box<dyn SchemaValidator>>>,
}

impl EvalConfig {
    /// Restrict string-like identifiers at `path` to a closed set.
    pub fn with_scoped_enums<I, S>(mut self, path: impl Into<String>, enums: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scoped_enums
            .push((path.into(), enums.into_iter().map(Into::into).collect()));
        self
    }

    /// Predefine names bound in the top scope.
    pub fn with_variables(mut self, vars: BTreeMap<String, String>) -> Self {
        self.variables.extend(vars);
        self
    }

    pub fn with_functions(
        mut self,
        funcs: BTreeMap<String, fn(&[String]) -> String>,
    ) -> Self {
        self.functions.extend(funcs);
        self
    }

    /// Register a block kind whose evaluation is delegated to `handler`.
    pub fn with_data_source(
        mut self,
        name: impl Into<String>,
        handler: Box<dyn DataSourceHandler>,
    ) -> Self {
        self.data_sources.insert(name.into(), handler);
        self
    }

    /// Register a typed, labeled block whose first label selects `handler`.
    pub fn with_type_label_block(
        mut self,
        name: impl Into<String>,
        label: impl Into<String>,
        handler: Box<dyn BlockHandler>,
    ) -> Self {
        self.type_label_blocks
            .insert((name.into(), label.into()), handler);
        self
    }

    /// Register a singleton, label-less block that evaluates before other
    /// blocks.
    pub fn with_init_block(
        mut self,
        name: impl Into<String>,
        handler: Box<dyn BlockHandler>,
    ) -> Self {
        self.init_blocks.insert(name.into(), handler);
        self
    }

    /// Inject a validator factory consulted on every body, block, and
    /// attribute.
    pub fn with_schema_validator(
        mut self,
        factory: Box<dyn Fn() -> Box<dyn SchemaValidator>>,
    ) -> Self {
        self.validators.push(factory);
        self
    }
}
