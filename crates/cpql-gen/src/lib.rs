//! SQL generation back end for CPQL query derivation.
//!
//! `cpql-gen` consumes [`cpql_core::QueryIntent`]s — produced by the
//! convention analyzer, the CPQL parser, or by hand — and emits
//! deterministic, parameterized SQL for SQL Server, PostgreSQL, MySQL,
//! and SQLite:
//!
//! - [`SqlGenerator`]: intent → [`cpql_core::GeneratedSql`]
//! - [`ExpressionTranslator`]: typed predicate [`Expr`] → WHERE fragment
//! - [`CompositeKeyResolver`]: multi-property primary-key WHERE clauses
//! - [`RelationshipAugmenter`]: relationship joins, split markers,
//!   secondary collection loads, and cascade plans
//! - [`StatementCache`]: optional memoization for runtime derivation

pub mod augment;
pub mod cache;
pub mod composite;
pub mod dialect;
pub mod expr;
pub mod generator;
pub mod translate;

pub use augment::{
    CascadeOp, CascadePlan, CascadeStep, CollectionQuery, FetchPlan, RelationshipAugmenter,
};
pub use cache::{StatementCache, cache_key};
pub use composite::CompositeKeyResolver;
pub use dialect::{Dialect, Pagination};
pub use expr::{BinaryOp, Expr, MatchKind, UnaryOp};
pub use generator::SqlGenerator;
pub use translate::{ExpressionTranslator, WhereFragment, escape_like};
