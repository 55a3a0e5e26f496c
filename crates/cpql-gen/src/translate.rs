//! Typed-expression translation.
//!
//! [`ExpressionTranslator`] lowers the supported subset of [`Expr`] to a
//! WHERE fragment plus value-sourced parameters. Anything outside the
//! subset fails with [`Error::UnsupportedExpression`] naming the node —
//! constructs are never silently dropped.

use cpql_core::{EntityMetadata, Error, ParamSource, Parameter, Result, Value};

use crate::dialect::Dialect;
use crate::expr::{BinaryOp, Expr, MatchKind, UnaryOp};

/// A rendered WHERE fragment with its parameters, reusable by
/// [`crate::SqlGenerator::select_with_fragment`].
#[derive(Debug, Clone, PartialEq)]
pub struct WhereFragment {
    /// Predicate SQL without the `WHERE` keyword.
    pub sql: String,
    /// Value-sourced parameters in placeholder order.
    pub parameters: Vec<Parameter>,
}

/// Translates typed predicate expressions for one entity.
#[derive(Debug)]
pub struct ExpressionTranslator<'a> {
    metadata: &'a EntityMetadata,
    dialect: Dialect,
}

impl<'a> ExpressionTranslator<'a> {
    /// Create a translator for the given entity metadata and dialect.
    pub fn new(metadata: &'a EntityMetadata, dialect: Dialect) -> Self {
        Self { metadata, dialect }
    }

    /// Translate a boolean-valued expression into a WHERE fragment.
    pub fn translate(&self, expr: &Expr) -> Result<WhereFragment> {
        let mut parameters = Vec::new();
        let sql = self.render(expr, &mut parameters)?;
        tracing::debug!(entity = %self.metadata.entity, params = parameters.len(), "translated expression");
        Ok(WhereFragment { sql, parameters })
    }

    fn render(&self, expr: &Expr, parameters: &mut Vec<Parameter>) -> Result<String> {
        match expr {
            Expr::Property(name) => self.column(name),

            Expr::Literal(value) => Ok(self.bind(value.clone(), parameters)),

            Expr::Binary { left, op, right } if op.is_comparison() => {
                // Comparisons against a NULL literal lower to IS [NOT]
                // NULL; `col = NULL` is never true in SQL.
                if let Expr::Literal(Value::Null) = right.as_ref() {
                    let left_sql = self.render(left, parameters)?;
                    return Ok(match op {
                        BinaryOp::Eq => format!("{left_sql} IS NULL"),
                        BinaryOp::Ne => format!("{left_sql} IS NOT NULL"),
                        _ => {
                            return Err(Error::UnsupportedExpression {
                                node: format!("comparison `{}` against NULL", op.as_sql()),
                            });
                        }
                    });
                }
                let left_sql = self.render(left, parameters)?;
                let right_sql = self.render(right, parameters)?;
                Ok(format!("{left_sql} {} {right_sql}", op.as_sql()))
            }

            Expr::Binary { left, op, right } if op.is_logical() => {
                let left_sql = self.render(left, parameters)?;
                let right_sql = self.render(right, parameters)?;
                Ok(format!("({left_sql} {} {right_sql})", op.as_sql()))
            }

            Expr::Binary { .. } => Err(Error::UnsupportedExpression {
                node: expr.describe(),
            }),

            Expr::Unary {
                op: UnaryOp::Not,
                expr: inner,
            } => {
                let inner_sql = self.render(inner, parameters)?;
                Ok(format!("NOT ({inner_sql})"))
            }

            Expr::Unary { .. } => Err(Error::UnsupportedExpression {
                node: expr.describe(),
            }),

            Expr::StringMatch {
                property,
                kind,
                pattern,
            } => {
                let column = self.render(property, parameters)?;
                let escaped = escape_like(pattern);
                let decorated = match kind {
                    MatchKind::Contains => format!("%{escaped}%"),
                    MatchKind::StartsWith => format!("{escaped}%"),
                    MatchKind::EndsWith => format!("%{escaped}"),
                };
                let placeholder = self.bind(Value::Text(decorated), parameters);
                Ok(format!("{column} LIKE {placeholder} ESCAPE '!'"))
            }

            Expr::Function { .. } | Expr::Case { .. } | Expr::Raw(_) => {
                Err(Error::UnsupportedExpression {
                    node: expr.describe(),
                })
            }
        }
    }

    fn column(&self, property: &str) -> Result<String> {
        let meta = self
            .metadata
            .find_property(property)
            .ok_or_else(|| Error::UnknownProperty {
                entity: self.metadata.entity.clone(),
                property: property.to_string(),
            })?;
        Ok(self.dialect.quote(&meta.column))
    }

    fn bind(&self, value: Value, parameters: &mut Vec<Parameter>) -> String {
        let name = format!("v{}", parameters.len());
        parameters.push(Parameter::new(&name, ParamSource::Value(value)));
        format!("@{name}")
    }
}

/// Escape LIKE wildcards with `!`. The generator and translator emit a
/// matching `ESCAPE '!'` clause; a single-quoted `!` renders identically
/// on all four dialects, which a backslash would not.
pub fn escape_like(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if matches!(c, '%' | '_' | '!') {
            out.push('!');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpql_core::{PropertyMeta, SqlType};
    use pretty_assertions::assert_eq;

    fn metadata() -> EntityMetadata {
        EntityMetadata::new("User", "users")
            .property(PropertyMeta::new("Id", SqlType::BigInt).primary_key(true))
            .property(PropertyMeta::new("Name", SqlType::Text))
            .property(PropertyMeta::new("Age", SqlType::Integer))
            .property(PropertyMeta::new("IsActive", SqlType::Boolean))
    }

    fn translate(expr: &Expr) -> Result<WhereFragment> {
        let meta = metadata();
        ExpressionTranslator::new(&meta, Dialect::Postgres).translate(expr)
    }

    #[test]
    fn test_comparison_binds_literal() {
        let fragment = translate(&Expr::prop("Age").ge(18)).unwrap();
        assert_eq!(fragment.sql, "\"age\" >= @v0");
        assert_eq!(fragment.parameters.len(), 1);
        assert_eq!(
            fragment.parameters[0].source,
            ParamSource::Value(Value::Int(18))
        );
    }

    #[test]
    fn test_logical_nesting_parenthesized() {
        let expr = Expr::prop("Age")
            .ge(18)
            .and(Expr::prop("IsActive").eq(true))
            .or(Expr::prop("Name").eq("root"));
        let fragment = translate(&expr).unwrap();
        assert_eq!(
            fragment.sql,
            "((\"age\" >= @v0 AND \"is_active\" = @v1) OR \"name\" = @v2)"
        );
        assert_eq!(fragment.parameters.len(), 3);
    }

    #[test]
    fn test_not_wraps_inner() {
        let fragment = translate(&Expr::prop("IsActive").eq(true).not()).unwrap();
        assert_eq!(fragment.sql, "NOT (\"is_active\" = @v0)");
    }

    #[test]
    fn test_contains_escapes_wildcards() {
        let fragment = translate(&Expr::prop("Name").contains("50%_off!")).unwrap();
        assert_eq!(fragment.sql, "\"name\" LIKE @v0 ESCAPE '!'");
        assert_eq!(
            fragment.parameters[0].source,
            ParamSource::Value(Value::Text("%50!%!_off!!%".to_string()))
        );
    }

    #[test]
    fn test_starts_with_and_ends_with_shapes() {
        let fragment = translate(&Expr::prop("Name").starts_with("Ada")).unwrap();
        assert_eq!(
            fragment.parameters[0].source,
            ParamSource::Value(Value::Text("Ada%".to_string()))
        );
        let fragment = translate(&Expr::prop("Name").ends_with("ce")).unwrap();
        assert_eq!(
            fragment.parameters[0].source,
            ParamSource::Value(Value::Text("%ce".to_string()))
        );
    }

    #[test]
    fn test_null_comparison_lowers_to_is_null() {
        let fragment = translate(&Expr::prop("Name").eq(Value::Null)).unwrap();
        assert_eq!(fragment.sql, "\"name\" IS NULL");
        assert!(fragment.parameters.is_empty());

        let fragment = translate(&Expr::prop("Name").ne(Value::Null)).unwrap();
        assert_eq!(fragment.sql, "\"name\" IS NOT NULL");
    }

    #[test]
    fn test_function_call_is_unsupported_and_named() {
        let expr = Expr::function("UPPER", vec![Expr::prop("Name")]).eq("ADA");
        let err = translate(&expr).unwrap_err();
        assert_eq!(
            err,
            Error::UnsupportedExpression {
                node: "function call `UPPER`".to_string()
            }
        );
    }

    #[test]
    fn test_arithmetic_is_unsupported() {
        let err = translate(&Expr::prop("Age").add(1).gt(21)).unwrap_err();
        assert_eq!(
            err,
            Error::UnsupportedExpression {
                node: "binary operator `+`".to_string()
            }
        );
    }

    #[test]
    fn test_raw_sql_is_unsupported() {
        let err = translate(&Expr::Raw("1 = 1".to_string())).unwrap_err();
        assert!(matches!(err, Error::UnsupportedExpression { .. }));
    }

    #[test]
    fn test_unknown_property() {
        let err = translate(&Expr::prop("Nope").eq(1)).unwrap_err();
        assert_eq!(
            err,
            Error::UnknownProperty {
                entity: "User".to_string(),
                property: "Nope".to_string()
            }
        );
    }

    #[test]
    fn test_property_to_property_comparison() {
        let fragment = translate(&Expr::prop("Age").lt(Expr::prop("Id"))).unwrap();
        assert_eq!(fragment.sql, "\"age\" < \"id\"");
        assert!(fragment.parameters.is_empty());
    }

    #[test]
    fn test_dialect_quoting_applies() {
        let meta = metadata();
        let fragment = ExpressionTranslator::new(&meta, Dialect::SqlServer)
            .translate(&Expr::prop("Age").ge(18))
            .unwrap();
        assert_eq!(fragment.sql, "[age] >= @v0");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("a%b_c!d"), "a!%b!_c!!d");
        assert_eq!(escape_like("plain"), "plain");
    }
}
