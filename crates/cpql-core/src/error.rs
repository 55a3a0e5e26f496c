//! Error types for query derivation and SQL generation.

use std::fmt;

/// The primary error type for all derivation and generation operations.
///
/// Every failure is raised synchronously at parse or generation time.
/// The engine never retries internally and never substitutes a default
/// for an error condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Malformed CPQL input. Carries the offending token and its byte
    /// position in the source text.
    Syntax { token: String, position: usize },
    /// The expression translator cannot map a construct to SQL.
    /// `node` names the specific unsupported expression shape.
    UnsupportedExpression { node: String },
    /// A referenced property is absent from the entity's metadata.
    UnknownProperty { entity: String, property: String },
    /// No metadata is registered for the named entity.
    UnknownEntity { entity: String },
    /// A property name collides with a convention keyword and would be
    /// mis-split by the greedy method-name tokenizer.
    AmbiguousKeyword { property: String, keyword: String },
    /// A declared composite-key property has no supplied value.
    MissingKeyComponent { property: String },
    /// The requested feature is not available on the target dialect.
    DialectUnsupported { dialect: String, feature: String },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Syntax { token, position } => {
                write!(f, "syntax error at position {position}: unexpected `{token}`")
            }
            Error::UnsupportedExpression { node } => {
                write!(f, "unsupported expression: {node}")
            }
            Error::UnknownProperty { entity, property } => {
                write!(f, "unknown property `{property}` on entity `{entity}`")
            }
            Error::UnknownEntity { entity } => {
                write!(f, "no metadata registered for entity `{entity}`")
            }
            Error::AmbiguousKeyword { property, keyword } => {
                write!(
                    f,
                    "property `{property}` collides with convention keyword `{keyword}`"
                )
            }
            Error::MissingKeyComponent { property } => {
                write!(f, "missing value for composite key property `{property}`")
            }
            Error::DialectUnsupported { dialect, feature } => {
                write!(f, "dialect {dialect} does not support {feature}")
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;
