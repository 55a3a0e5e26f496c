//! Core types for CPQL query derivation and SQL generation.
//!
//! This crate provides the foundational data model shared by the
//! derivation front ends and the generation back end:
//!
//! - `EntityMetadata` and friends: the externally-produced table/column/
//!   relationship description of an entity
//! - `MetadataRegistry`: explicit, compute-once metadata storage
//! - `QueryIntent` / `PredicateNode`: the structured query form all
//!   front ends produce
//! - `GeneratedSql`: the parameterized output contract
//! - `Error`: the engine-wide failure taxonomy

pub mod error;
pub mod identifiers;
pub mod intent;
pub mod metadata;
pub mod registry;
pub mod sql;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use identifiers::{quote_ident, quote_ident_mssql, quote_ident_mysql, sanitize_identifier};
pub use intent::{
    Aggregate, AggregateFn, Assignment, CompareOp, LikeShape, LogicalOp, OrderTerm, ParamRef,
    PredicateNode, QueryIntent, QueryType, SortDirection,
};
pub use metadata::{
    Cascade, EntityMetadata, FetchStrategy, JoinSpec, PropertyMeta, RelationshipKind,
    RelationshipMeta,
};
pub use registry::MetadataRegistry;
pub use sql::{GeneratedSql, ParamSource, Parameter};
pub use types::SqlType;
pub use value::Value;
