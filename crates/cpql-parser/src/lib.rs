//! CPQL: a JPQL-like textual query language.
//!
//! `cpql-parser` turns CPQL text into the same [`cpql_core::QueryIntent`]
//! structure the convention analyzer produces, so the generation back
//! end is shared between both front ends.
//!
//! # Example
//!
//! ```
//! use cpql_parser::CpqlParser;
//! use cpql_core::QueryType;
//!
//! let intent = CpqlParser::parse(
//!     "SELECT u FROM User u WHERE u.IsActive = :active ORDER BY u.Name DESC",
//! ).unwrap();
//! assert_eq!(intent.query_type, QueryType::Select);
//! assert_eq!(intent.entity, "User");
//! ```

pub mod lexer;
pub mod parser;

pub use lexer::{Lexer, Span, Token, TokenKind};
pub use parser::CpqlParser;
