//! Query intents and predicate trees.
//!
//! A [`QueryIntent`] is the common structured form produced by all three
//! derivation front ends (method-name conventions, CPQL text, typed
//! predicate expressions) and consumed by the SQL generator. Intents are
//! built once with consuming builder methods and never mutated afterward.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// The statement family a query intent belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryType {
    Select,
    Insert,
    Update,
    Delete,
    Count,
    Exists,
    /// No recognized prefix matched a method name. A value, not an
    /// error: callers decide whether to surface it as a diagnostic or a
    /// runtime failure.
    Unknown,
}

/// Sort direction for an ordering term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// SQL keyword for this direction.
    pub const fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTerm {
    pub property: String,
    pub direction: SortDirection,
}

/// Aggregate functions understood by CPQL and the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFn {
    /// SQL function name.
    pub const fn as_sql(self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Sum => "SUM",
            AggregateFn::Avg => "AVG",
            AggregateFn::Min => "MIN",
            AggregateFn::Max => "MAX",
        }
    }
}

/// An aggregate projection, e.g. `SUM(u.Total)`. A missing property
/// means `COUNT(*)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub function: AggregateFn,
    pub property: Option<String>,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// SQL representation of this operator.
    pub const fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// Logical connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    /// SQL representation of this connective.
    pub const fn as_sql(self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }
}

/// A reference to a parameter value.
///
/// `Literal` carries values captured from CPQL text or convention
/// keywords (`True`/`False`); they are still bound as parameters at
/// generation time, never interpolated into SQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamRef {
    /// Named parameter, `:name` in CPQL.
    Named(String),
    /// Positional parameter, `?N` in CPQL (1-based).
    Positional(u32),
    /// A captured literal value.
    Literal(Value),
}

/// Wildcard decoration applied to a LIKE parameter by the execution
/// layer: `Prefix` is `value%`, `Suffix` is `%value`, `Substring` is
/// `%value%`, and `Raw` passes the pattern through untouched.
///
/// Decorated values escape `%`, `_` and `!` with `!`; the generator
/// emits a matching `ESCAPE '!'` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LikeShape {
    Prefix,
    Suffix,
    Substring,
    Raw,
}

/// A predicate tree node. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PredicateNode {
    /// `property op param`, optionally case-folded on both sides.
    Comparison {
        property: String,
        op: CompareOp,
        param: ParamRef,
        ignore_case: bool,
    },
    /// `left AND|OR right`.
    Logical {
        left: Box<PredicateNode>,
        op: LogicalOp,
        right: Box<PredicateNode>,
    },
    /// `property BETWEEN lo AND hi`.
    Between {
        property: String,
        lo: ParamRef,
        hi: ParamRef,
    },
    /// `property IN (param)` / `property = ANY(param)` per dialect.
    InSet {
        property: String,
        param: ParamRef,
        negated: bool,
    },
    /// `property IS [NOT] NULL`.
    NullCheck { property: String, is_null: bool },
    /// `property [NOT] LIKE param` with a wildcard shape.
    Like {
        property: String,
        param: ParamRef,
        shape: LikeShape,
        negated: bool,
        ignore_case: bool,
    },
}

impl PredicateNode {
    /// Create an equality comparison.
    pub fn eq(property: impl Into<String>, param: ParamRef) -> Self {
        PredicateNode::Comparison {
            property: property.into(),
            op: CompareOp::Eq,
            param,
            ignore_case: false,
        }
    }

    /// Combine with another predicate using AND.
    #[must_use]
    pub fn and(self, other: PredicateNode) -> Self {
        PredicateNode::Logical {
            left: Box::new(self),
            op: LogicalOp::And,
            right: Box::new(other),
        }
    }

    /// Combine with another predicate using OR.
    #[must_use]
    pub fn or(self, other: PredicateNode) -> Self {
        PredicateNode::Logical {
            left: Box::new(self),
            op: LogicalOp::Or,
            right: Box::new(other),
        }
    }

    /// Every property name referenced by this subtree, left to right.
    pub fn properties(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_properties(&mut out);
        out
    }

    fn collect_properties<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            PredicateNode::Comparison { property, .. }
            | PredicateNode::Between { property, .. }
            | PredicateNode::InSet { property, .. }
            | PredicateNode::NullCheck { property, .. }
            | PredicateNode::Like { property, .. } => out.push(property),
            PredicateNode::Logical { left, right, .. } => {
                left.collect_properties(out);
                right.collect_properties(out);
            }
        }
    }
}

/// An UPDATE assignment, `property = param`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub property: String,
    pub param: ParamRef,
}

/// The structured description of a derived query.
///
/// Produced by the convention analyzer, the CPQL parser, or assembled by
/// hand; consumed by the SQL generator. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryIntent {
    /// Statement family.
    pub query_type: QueryType,
    /// Entity name (metadata registry key).
    pub entity: String,
    /// Entity alias from CPQL text, if any.
    pub alias: Option<String>,
    /// Root of the WHERE predicate tree.
    pub predicate: Option<PredicateNode>,
    /// Ordering terms.
    pub order_by: Vec<OrderTerm>,
    /// Result-count cap.
    pub limit: Option<u64>,
    /// Rows to skip before the first result.
    pub offset: Option<u64>,
    /// SELECT DISTINCT.
    pub distinct: bool,
    /// Projected property paths; empty means all mapped columns.
    pub projection: Vec<String>,
    /// GROUP BY property names.
    pub group_by: Vec<String>,
    /// HAVING predicate over the grouped rows.
    pub having: Option<PredicateNode>,
    /// Aggregate projections.
    pub aggregates: Vec<Aggregate>,
    /// UPDATE assignments; empty means all writable columns.
    pub assignments: Vec<Assignment>,
}

impl QueryIntent {
    /// Create an intent of the given type with everything else unset.
    pub fn new(query_type: QueryType, entity: impl Into<String>) -> Self {
        Self {
            query_type,
            entity: entity.into(),
            alias: None,
            predicate: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            distinct: false,
            projection: Vec::new(),
            group_by: Vec::new(),
            having: None,
            aggregates: Vec::new(),
            assignments: Vec::new(),
        }
    }

    /// Shorthand for a SELECT intent.
    pub fn select(entity: impl Into<String>) -> Self {
        Self::new(QueryType::Select, entity)
    }

    /// Shorthand for a COUNT intent.
    pub fn count(entity: impl Into<String>) -> Self {
        Self::new(QueryType::Count, entity)
    }

    /// Shorthand for an EXISTS intent.
    pub fn exists(entity: impl Into<String>) -> Self {
        Self::new(QueryType::Exists, entity)
    }

    /// Shorthand for an INSERT intent.
    pub fn insert(entity: impl Into<String>) -> Self {
        Self::new(QueryType::Insert, entity)
    }

    /// Shorthand for an UPDATE intent.
    pub fn update(entity: impl Into<String>) -> Self {
        Self::new(QueryType::Update, entity)
    }

    /// Shorthand for a DELETE intent.
    pub fn delete(entity: impl Into<String>) -> Self {
        Self::new(QueryType::Delete, entity)
    }

    /// Set the entity alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set the WHERE predicate.
    #[must_use]
    pub fn predicate(mut self, predicate: PredicateNode) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Append an ORDER BY term.
    #[must_use]
    pub fn order_by(mut self, property: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by.push(OrderTerm {
            property: property.into(),
            direction,
        });
        self
    }

    /// Set the result-count cap.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the row offset.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Enable SELECT DISTINCT.
    #[must_use]
    pub fn distinct(mut self, value: bool) -> Self {
        self.distinct = value;
        self
    }

    /// Append a projected property.
    #[must_use]
    pub fn project(mut self, property: impl Into<String>) -> Self {
        self.projection.push(property.into());
        self
    }

    /// Append a GROUP BY property.
    #[must_use]
    pub fn group_by(mut self, property: impl Into<String>) -> Self {
        self.group_by.push(property.into());
        self
    }

    /// Set the HAVING predicate.
    #[must_use]
    pub fn having(mut self, predicate: PredicateNode) -> Self {
        self.having = Some(predicate);
        self
    }

    /// Append an aggregate projection.
    #[must_use]
    pub fn aggregate(mut self, function: AggregateFn, property: Option<String>) -> Self {
        self.aggregates.push(Aggregate { function, property });
        self
    }

    /// Append an UPDATE assignment.
    #[must_use]
    pub fn assign(mut self, property: impl Into<String>, param: ParamRef) -> Self {
        self.assignments.push(Assignment {
            property: property.into(),
            param,
        });
        self
    }
}
