//! Composite-key WHERE generation.
//!
//! Specializes WHERE-clause and parameter generation for primary keys of
//! one or more properties. Every declared key column is ANDed, in key
//! declaration order, no matter how the caller ordered its inputs.

use std::collections::HashMap;

use cpql_core::{EntityMetadata, Error, ParamSource, Parameter, Result, Value};

use crate::dialect::Dialect;

/// Generates primary-key WHERE clauses for one entity.
#[derive(Debug)]
pub struct CompositeKeyResolver<'a> {
    metadata: &'a EntityMetadata,
    dialect: Dialect,
}

impl<'a> CompositeKeyResolver<'a> {
    /// Create a resolver for the given entity metadata and dialect.
    pub fn new(metadata: &'a EntityMetadata, dialect: Dialect) -> Self {
        Self { metadata, dialect }
    }

    /// Build `key1 = @Key1 AND key2 = @Key2 ...` with parameters sourced
    /// from the entity instance the statement applies to.
    pub fn where_from_instance(&self) -> Result<(String, Vec<Parameter>)> {
        self.build(|property| Ok(ParamSource::Property(property.to_string())))
    }

    /// Build the key WHERE clause with parameters taken from a
    /// key/value bag. Fails with [`Error::MissingKeyComponent`] when any
    /// declared key property has no supplied value.
    pub fn where_from_values(
        &self,
        values: &HashMap<String, Value>,
    ) -> Result<(String, Vec<Parameter>)> {
        self.build(|property| {
            values
                .get(property)
                .cloned()
                .map(ParamSource::Value)
                .ok_or_else(|| Error::MissingKeyComponent {
                    property: property.to_string(),
                })
        })
    }

    fn build(
        &self,
        mut source_for: impl FnMut(&str) -> Result<ParamSource>,
    ) -> Result<(String, Vec<Parameter>)> {
        let keys = self.metadata.key_properties();
        if keys.is_empty() {
            return Err(Error::MissingKeyComponent {
                property: format!("{} declares no primary key", self.metadata.entity),
            });
        }

        let mut clauses = Vec::with_capacity(keys.len());
        let mut parameters = Vec::with_capacity(keys.len());
        for key in keys {
            let source = source_for(&key.name)?;
            clauses.push(format!(
                "{} = @{}",
                self.dialect.quote(&key.column),
                key.name
            ));
            parameters.push(Parameter::new(&key.name, source));
        }
        Ok((clauses.join(" AND "), parameters))
    }
}
