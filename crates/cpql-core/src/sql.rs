//! The generated-SQL output contract.
//!
//! [`GeneratedSql`] is what the engine hands to the external execution
//! and row-mapping layer: parameterized SQL text, an ordered parameter
//! list describing where each value comes from, and split markers for
//! folding joined rows back into object graphs.

use serde::{Deserialize, Serialize};

use crate::intent::LikeShape;
use crate::value::Value;

/// Where a parameter's value comes from at execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamSource {
    /// A caller-supplied argument, by name.
    Named(String),
    /// A caller-supplied argument, by 1-based position.
    Positional(u32),
    /// Read from the entity instance the statement applies to. In a
    /// cascade plan, foreign-key parameters read from the parent
    /// instance of the step.
    Property(String),
    /// A value captured at derivation time.
    Value(Value),
}

/// One bound parameter of a generated statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Placeholder name as it appears in the SQL text (without `@`).
    pub name: String,
    /// Value source.
    pub source: ParamSource,
    /// Wildcard decoration the execution layer applies before binding
    /// (LIKE parameters only).
    pub decoration: Option<LikeShape>,
}

impl Parameter {
    /// Create an undecorated parameter.
    pub fn new(name: impl Into<String>, source: ParamSource) -> Self {
        Self {
            name: name.into(),
            source,
            decoration: None,
        }
    }

    /// Attach a LIKE decoration.
    #[must_use]
    pub fn decorated(mut self, shape: LikeShape) -> Self {
        self.decoration = Some(shape);
        self
    }
}

/// A generated, parameterized SQL statement.
///
/// One immutable instance per (intent, metadata, dialect) combination.
/// Only identifiers and static SQL keywords are interpolated into
/// `text`; every data value is referenced through `parameters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSql {
    /// The SQL text with `@name` placeholders.
    pub text: String,
    /// Ordered parameter descriptors.
    pub parameters: Vec<Parameter>,
    /// Column names at which a joined row splits into the next entity.
    pub split_on: Vec<String>,
}

impl GeneratedSql {
    /// Create a statement with no parameters or split markers.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
            split_on: Vec::new(),
        }
    }

    /// Look up a parameter by placeholder name.
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}
