//! Typed predicate expressions.
//!
//! [`Expr`] is the native expression-tree form of a filter over one
//! entity's properties, built with combinator methods. It deliberately
//! represents more than the translator supports (function calls, CASE,
//! arithmetic, raw SQL) so that unsupported shapes fail loudly in
//! [`crate::ExpressionTranslator`] instead of being unrepresentable.

use cpql_core::Value;

/// Binary operators over expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,

    // Logical
    And,
    Or,

    // Arithmetic (representable, not translatable)
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// SQL text for translatable operators.
    pub const fn as_sql(self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    /// Whether this is a comparison operator.
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    /// Whether this is a logical connective.
    pub const fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// String-predicate methods lowered to LIKE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Contains,
    StartsWith,
    EndsWith,
}

/// A typed predicate expression over one entity's properties.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Property reference by name.
    Property(String),

    /// Literal value.
    Literal(Value),

    /// Binary operation.
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },

    /// Unary operation.
    Unary { op: UnaryOp, expr: Box<Expr> },

    /// String-predicate method call, e.g. `Name.contains("ada")`.
    StringMatch {
        property: Box<Expr>,
        kind: MatchKind,
        pattern: String,
    },

    /// Host-language function/method call (not translatable).
    Function { name: String, args: Vec<Expr> },

    /// Conditional expression (not translatable).
    Case {
        when_clauses: Vec<(Expr, Expr)>,
        else_clause: Option<Box<Expr>>,
    },

    /// Raw SQL fragment (not translatable; data values must be bound).
    Raw(String),
}

impl Expr {
    /// Create a property reference.
    pub fn prop(name: impl Into<String>) -> Self {
        Expr::Property(name.into())
    }

    /// Create a literal value expression.
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Create a function-call expression.
    pub fn function(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Function {
            name: name.into(),
            args,
        }
    }

    fn binary(self, op: BinaryOp, other: Expr) -> Self {
        Expr::Binary {
            left: Box::new(self),
            op,
            right: Box::new(other),
        }
    }

    /// Equal to (=).
    pub fn eq(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Eq, other.into())
    }

    /// Not equal to (<>).
    pub fn ne(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Ne, other.into())
    }

    /// Less than (<).
    pub fn lt(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Lt, other.into())
    }

    /// Less than or equal (<=).
    pub fn le(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Le, other.into())
    }

    /// Greater than (>).
    pub fn gt(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Gt, other.into())
    }

    /// Greater than or equal (>=).
    pub fn ge(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Ge, other.into())
    }

    /// Logical AND.
    pub fn and(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::And, other.into())
    }

    /// Logical OR.
    pub fn or(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Or, other.into())
    }

    /// Logical NOT.
    pub fn not(self) -> Self {
        Expr::Unary {
            op: UnaryOp::Not,
            expr: Box::new(self),
        }
    }

    /// Substring match, lowered to `LIKE '%pattern%'` with escaping.
    pub fn contains(self, pattern: impl Into<String>) -> Self {
        Expr::StringMatch {
            property: Box::new(self),
            kind: MatchKind::Contains,
            pattern: pattern.into(),
        }
    }

    /// Prefix match, lowered to `LIKE 'pattern%'` with escaping.
    pub fn starts_with(self, pattern: impl Into<String>) -> Self {
        Expr::StringMatch {
            property: Box::new(self),
            kind: MatchKind::StartsWith,
            pattern: pattern.into(),
        }
    }

    /// Suffix match, lowered to `LIKE '%pattern'` with escaping.
    pub fn ends_with(self, pattern: impl Into<String>) -> Self {
        Expr::StringMatch {
            property: Box::new(self),
            kind: MatchKind::EndsWith,
            pattern: pattern.into(),
        }
    }

    /// Arithmetic addition (representable; the translator rejects it).
    pub fn add(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Add, other.into())
    }

    /// Arithmetic subtraction (representable; the translator rejects it).
    pub fn sub(self, other: impl Into<Expr>) -> Self {
        self.binary(BinaryOp::Sub, other.into())
    }

    /// A short human-readable description of this node, used in
    /// unsupported-expression errors.
    pub fn describe(&self) -> String {
        match self {
            Expr::Property(name) => format!("property `{name}`"),
            Expr::Literal(value) => format!("{} literal", value.type_name()),
            Expr::Binary { op, .. } => format!("binary operator `{}`", op.as_sql()),
            Expr::Unary { op: UnaryOp::Not, .. } => "NOT".to_string(),
            Expr::Unary { op: UnaryOp::Neg, .. } => "unary negation".to_string(),
            Expr::StringMatch { kind, .. } => match kind {
                MatchKind::Contains => "contains".to_string(),
                MatchKind::StartsWith => "startsWith".to_string(),
                MatchKind::EndsWith => "endsWith".to_string(),
            },
            Expr::Function { name, .. } => format!("function call `{name}`"),
            Expr::Case { .. } => "CASE expression".to_string(),
            Expr::Raw(_) => "raw SQL fragment".to_string(),
        }
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Expr::Literal(Value::Text(s.to_string()))
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Expr::Literal(Value::Text(s))
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        Expr::Literal(Value::Int(n))
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Expr::Literal(Value::BigInt(n))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Expr::Literal(Value::Bool(b))
    }
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Expr::Literal(Value::Double(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combinator_shapes() {
        let e = Expr::prop("Age").gt(18).and(Expr::prop("Name").contains("ada"));
        let Expr::Binary { op, left, right } = e else {
            panic!("expected binary");
        };
        assert_eq!(op, BinaryOp::And);
        assert!(matches!(*left, Expr::Binary { op: BinaryOp::Gt, .. }));
        assert!(matches!(*right, Expr::StringMatch { .. }));
    }

    #[test]
    fn test_describe_names_nodes() {
        assert_eq!(
            Expr::function("UPPER", vec![Expr::prop("Name")]).describe(),
            "function call `UPPER`"
        );
        assert_eq!(Expr::prop("A").add(1).describe(), "binary operator `+`");
    }

    #[test]
    fn test_op_classification() {
        assert!(BinaryOp::Eq.is_comparison());
        assert!(BinaryOp::And.is_logical());
        assert!(!BinaryOp::Add.is_comparison());
        assert!(!BinaryOp::Add.is_logical());
    }
}
