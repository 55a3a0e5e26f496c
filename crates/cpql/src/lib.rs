//! CPQL — query derivation and SQL generation for relational mappers.
//!
//! CPQL turns three kinds of query intent sources into deterministic,
//! parameterized, dialect-correct SQL:
//!
//! - **Method-name conventions**: `FindTop5ByStatusOrderByCreatedAtDesc`
//! - **CPQL text**: `SELECT u FROM User u WHERE u.IsActive = :active`
//! - **Typed predicates**: `Expr::prop("Age").ge(18)`
//!
//! All three produce the same [`QueryIntent`] structure, which
//! [`SqlGenerator`] renders against externally-produced
//! [`EntityMetadata`] for SQL Server, PostgreSQL, MySQL, or SQLite.
//! [`RelationshipAugmenter`] extends generated statements with
//! relationship joins, split markers, secondary collection loads, and
//! cascade plans.
//!
//! # Quick Start
//!
//! ```
//! use cpql::{
//!     Dialect, EntityMetadata, MetadataRegistry, MethodConventionAnalyzer, PropertyMeta,
//!     ReturnShape, SqlGenerator, SqlType,
//! };
//!
//! // Metadata comes from an external producer; here it is hand-built.
//! let registry = MetadataRegistry::new();
//! registry.register(
//!     EntityMetadata::new("User", "users")
//!         .property(PropertyMeta::new("Id", SqlType::BigInt).primary_key(true).generated(true))
//!         .property(PropertyMeta::new("Email", SqlType::VarChar(255)))
//!         .property(PropertyMeta::new("Name", SqlType::Text)),
//! );
//!
//! // Derive an intent from a repository method name...
//! let analyzer = MethodConventionAnalyzer::for_entity("User");
//! let query = analyzer.analyze("FindByEmailOrderByNameDesc", &["email"], ReturnShape::Collection);
//!
//! // ...and generate SQL for a dialect.
//! let generator = SqlGenerator::new(&registry, Dialect::Postgres);
//! let sql = generator.generate(&query.intent).unwrap();
//! assert_eq!(
//!     sql.text,
//!     "SELECT \"id\", \"email\", \"name\" FROM \"users\" WHERE \"email\" = @email ORDER BY \"name\" DESC"
//! );
//! ```
//!
//! Generation performs no I/O: the output [`GeneratedSql`] — text,
//! named parameters with value sources, and split markers — is handed
//! to an external execution and row-mapping layer.

// Re-export all public types from sub-crates
pub use cpql_core::{
    Aggregate, AggregateFn, Assignment, Cascade, CompareOp, EntityMetadata, Error, FetchStrategy,
    GeneratedSql, JoinSpec, LikeShape, LogicalOp, MetadataRegistry, OrderTerm, ParamRef,
    ParamSource, Parameter, PredicateNode, PropertyMeta, QueryIntent, QueryType, RelationshipKind,
    RelationshipMeta, Result, SortDirection, SqlType, Value, quote_ident, quote_ident_mssql,
    quote_ident_mysql, sanitize_identifier,
};

pub use cpql_convention::{
    ConditionOp, MethodConventionAnalyzer, MethodQuery, ReturnShape, validate_metadata,
};

pub use cpql_parser::CpqlParser;

pub use cpql_gen::{
    BinaryOp, CascadeOp, CascadePlan, CascadeStep, CollectionQuery, CompositeKeyResolver, Dialect,
    Expr, ExpressionTranslator, FetchPlan, MatchKind, Pagination, RelationshipAugmenter,
    SqlGenerator, StatementCache, UnaryOp, WhereFragment, cache_key, escape_like,
};
