//! The convention vocabulary: query-type prefixes and condition
//! operator keywords.
//!
//! All matching is case-sensitive against PascalCase method-name
//! segments. Operator keywords match as condition *suffixes*, longest
//! first; separators match mid-name only when followed by an uppercase
//! letter.

use cpql_core::QueryType;

/// Operator keywords recognized at the end of a condition segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOp {
    /// No trailing keyword: plain equality against one parameter.
    Equals,
    /// `Not` / `IsNot`: inequality.
    NotEquals,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    /// `After`: strictly greater (temporal synonym).
    After,
    /// `Before`: strictly less (temporal synonym).
    Before,
    /// `StartingWith` / `StartsWith`: LIKE with a trailing wildcard.
    StartingWith,
    /// `EndingWith` / `EndsWith`: LIKE with a leading wildcard.
    EndingWith,
    /// `Containing` / `Contains`: LIKE wrapped in wildcards.
    Containing,
    /// `Like`: the parameter is a raw LIKE pattern.
    Like,
    /// `NotLike`: negated raw pattern.
    NotLike,
    /// `Between`: two parameters, inclusive range.
    Between,
    /// `In`: set membership against one list parameter.
    In,
    /// `NotIn`: negated set membership.
    NotIn,
    /// `IsNull`: no parameter consumed.
    IsNull,
    /// `NotNull` / `IsNotNull`: no parameter consumed.
    NotNull,
    /// `True`: equality against a literal, no parameter consumed.
    True,
    /// `False`: equality against a literal, no parameter consumed.
    False,
}

impl ConditionOp {
    /// Number of method parameters this operator consumes.
    pub const fn parameter_count(self) -> usize {
        match self {
            ConditionOp::Between => 2,
            ConditionOp::IsNull | ConditionOp::NotNull | ConditionOp::True | ConditionOp::False => {
                0
            }
            _ => 1,
        }
    }
}

/// Operator keyword table, ordered longest-first so greedy suffix
/// matching picks the most specific keyword (`GreaterThanEqual` before
/// `GreaterThan`, `NotIn` before `In`).
pub const SUFFIX_OPERATORS: &[(&str, ConditionOp)] = &[
    ("GreaterThanEqual", ConditionOp::GreaterThanEqual),
    ("LessThanEqual", ConditionOp::LessThanEqual),
    ("StartingWith", ConditionOp::StartingWith),
    ("GreaterThan", ConditionOp::GreaterThan),
    ("StartsWith", ConditionOp::StartingWith),
    ("EndingWith", ConditionOp::EndingWith),
    ("Containing", ConditionOp::Containing),
    ("IsNotNull", ConditionOp::NotNull),
    ("LessThan", ConditionOp::LessThan),
    ("EndsWith", ConditionOp::EndingWith),
    ("Contains", ConditionOp::Containing),
    ("NotLike", ConditionOp::NotLike),
    ("Between", ConditionOp::Between),
    ("NotNull", ConditionOp::NotNull),
    ("IsNull", ConditionOp::IsNull),
    ("Equals", ConditionOp::Equals),
    ("Before", ConditionOp::Before),
    ("After", ConditionOp::After),
    ("IsNot", ConditionOp::NotEquals),
    ("NotIn", ConditionOp::NotIn),
    ("False", ConditionOp::False),
    ("True", ConditionOp::True),
    ("Like", ConditionOp::Like),
    ("Not", ConditionOp::NotEquals),
    ("In", ConditionOp::In),
    ("Is", ConditionOp::Equals),
];

/// The case-sensitivity modifier, stripped before operator matching.
pub const IGNORE_CASE: &str = "IgnoreCase";

/// Query-type prefix table. Longest match wins, so `Contains` beats
/// `Count` on no input (they share no prefix) and `Exists` is tried
/// before `Is` would be.
pub const PREFIXES: &[(&str, QueryType)] = &[
    ("Find", QueryType::Select),
    ("Get", QueryType::Select),
    ("Query", QueryType::Select),
    ("Search", QueryType::Select),
    ("Read", QueryType::Select),
    ("Stream", QueryType::Select),
    ("Count", QueryType::Count),
    ("Exists", QueryType::Exists),
    ("Has", QueryType::Exists),
    ("Is", QueryType::Exists),
    ("Contains", QueryType::Exists),
    ("Delete", QueryType::Delete),
    ("Remove", QueryType::Delete),
    ("Update", QueryType::Update),
    ("Modify", QueryType::Update),
    ("Insert", QueryType::Insert),
    ("Add", QueryType::Insert),
    ("Save", QueryType::Insert),
    ("Create", QueryType::Insert),
];

/// Classify a method name by its longest matching prefix. Returns the
/// query type and the remainder of the name.
pub fn classify_prefix(name: &str) -> (QueryType, &str) {
    let mut best: Option<(&str, QueryType)> = None;
    for (prefix, query_type) in PREFIXES {
        if name.starts_with(prefix)
            && best.is_none_or(|(b, _)| prefix.len() > b.len())
        {
            best = Some((prefix, *query_type));
        }
    }
    match best {
        Some((prefix, query_type)) => (query_type, &name[prefix.len()..]),
        None => (QueryType::Unknown, name),
    }
}

/// Match a trailing operator keyword against a condition segment.
///
/// Only matches when a non-empty property name remains: a segment that
/// *is* a keyword (a property literally named `Like`) parses as a plain
/// equality condition.
pub fn strip_operator(segment: &str) -> (&str, ConditionOp) {
    for (keyword, op) in SUFFIX_OPERATORS {
        if let Some(property) = segment.strip_suffix(keyword) {
            if !property.is_empty() {
                return (property, *op);
            }
        }
    }
    (segment, ConditionOp::Equals)
}
