//! Repository method-name convention analysis.
//!
//! `cpql-convention` derives [`cpql_core::QueryIntent`]s from method
//! names like `FindTop5ByStatusOrderByCreatedAtDesc`. It is one of the
//! three derivation front ends; the others are the CPQL text parser and
//! the typed expression translator.
//!
//! # Example
//!
//! ```
//! use cpql_convention::{MethodConventionAnalyzer, ReturnShape};
//! use cpql_core::QueryType;
//!
//! let analyzer = MethodConventionAnalyzer::for_entity("User");
//! let query = analyzer.analyze("CountByCountryAndIsActive", &["country", "active"], ReturnShape::Scalar);
//! assert_eq!(query.intent.query_type, QueryType::Count);
//! assert_eq!(query.properties, vec!["Country", "IsActive"]);
//! ```

pub mod analyzer;
pub mod keywords;

pub use analyzer::{MethodConventionAnalyzer, MethodQuery, ReturnShape, validate_metadata};
pub use keywords::{ConditionOp, classify_prefix, strip_operator};
