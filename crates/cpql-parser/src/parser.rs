//! Recursive-descent parser for CPQL.
//!
//! Parsing is all-or-nothing: malformed input raises
//! [`Error::Syntax`] with the offending token and its byte position,
//! never a best-effort intent. UPDATE and DELETE statements require a
//! WHERE clause; the parser refuses to derive an unconditional bulk
//! statement.

use cpql_core::{
    AggregateFn, Error, LikeShape, LogicalOp, ParamRef, PredicateNode, QueryIntent, QueryType,
    Result, SortDirection, Value,
};

use crate::lexer::{Lexer, Token, TokenKind};

/// Parser for CPQL query text.
pub struct CpqlParser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

/// A dotted property path, e.g. `u.IsActive`, with the position of its
/// first token for error reporting.
#[derive(Debug, Clone)]
struct PathRef {
    qualifier: Option<String>,
    name: String,
    pos: usize,
}

/// A raw select-list item, resolved against the alias after FROM.
#[derive(Debug, Clone)]
enum RawItem {
    Aggregate {
        function: AggregateFn,
        star: bool,
        arg: Option<PathRef>,
    },
    Path(PathRef),
}

impl<'a> CpqlParser<'a> {
    /// Create a parser over the given source text.
    pub fn new(source: &'a str) -> Self {
        let mut lexer = Lexer::new(source);
        let current = lexer.next_token();
        Self { lexer, current }
    }

    /// Parse a complete CPQL statement into a [`QueryIntent`].
    pub fn parse(source: &str) -> Result<QueryIntent> {
        let mut parser = CpqlParser::new(source);
        let intent = parser.parse_query()?;
        tracing::debug!(query_type = ?intent.query_type, entity = %intent.entity, "parsed cpql query");
        Ok(intent)
    }

    fn parse_query(&mut self) -> Result<QueryIntent> {
        let intent = match self.current.kind {
            TokenKind::Select => self.parse_select()?,
            TokenKind::Update => self.parse_update()?,
            TokenKind::Delete => self.parse_delete()?,
            _ => return Err(self.unexpected()),
        };
        self.expect(&TokenKind::Eof)?;
        Ok(intent)
    }

    // ==================== Helpers ====================

    fn advance(&mut self) -> Token {
        std::mem::replace(&mut self.current, self.lexer.next_token())
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_ident(&mut self) -> Result<(String, usize)> {
        let pos = self.current.span.start;
        match &self.current.kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok((name, pos))
            }
            _ => Err(self.unexpected()),
        }
    }

    fn unexpected(&self) -> Error {
        Error::Syntax {
            token: self.current.kind.to_string(),
            position: self.current.span.start,
        }
    }

    // ==================== SELECT ====================

    fn parse_select(&mut self) -> Result<QueryIntent> {
        self.expect(&TokenKind::Select)?;
        let distinct = self.match_token(&TokenKind::Distinct);

        let mut items = vec![self.parse_select_item()?];
        while self.match_token(&TokenKind::Comma) {
            items.push(self.parse_select_item()?);
        }

        self.expect(&TokenKind::From)?;
        let (entity, _) = self.expect_ident()?;
        let (alias, _) = self.expect_ident()?;

        let mut intent = QueryIntent::select(&entity).alias(&alias).distinct(distinct);

        // Resolve select items now that the alias is known. A single
        // COUNT item makes this a Count query; anything else stays a
        // Select with projections and/or aggregate items.
        let only_count = items.len() == 1
            && matches!(
                items[0],
                RawItem::Aggregate {
                    function: AggregateFn::Count,
                    ..
                }
            );
        for item in items {
            match item {
                RawItem::Aggregate {
                    function,
                    star,
                    arg,
                } => {
                    let property = if star {
                        None
                    } else {
                        match arg {
                            Some(path) => self.resolve_aggregate_arg(path, &alias)?,
                            None => None,
                        }
                    };
                    intent = intent.aggregate(function, property);
                }
                RawItem::Path(path) => {
                    if path.qualifier.is_none() && path.name == alias {
                        // whole-entity selection; no projection entry
                    } else {
                        let property = resolve_property(path, &alias)?;
                        intent = intent.project(property);
                    }
                }
            }
        }
        if only_count {
            intent.query_type = QueryType::Count;
        }

        if self.match_token(&TokenKind::Where) {
            let predicate = self.parse_predicate(&alias)?;
            intent = intent.predicate(predicate);
        }
        if self.match_token(&TokenKind::Group) {
            self.expect(&TokenKind::By)?;
            loop {
                let path = self.parse_path()?;
                intent = intent.group_by(resolve_property(path, &alias)?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        if self.match_token(&TokenKind::Having) {
            let having = self.parse_predicate(&alias)?;
            intent = intent.having(having);
        }
        if self.match_token(&TokenKind::Order) {
            self.expect(&TokenKind::By)?;
            loop {
                let path = self.parse_path()?;
                let property = resolve_property(path, &alias)?;
                let direction = if self.match_token(&TokenKind::Desc) {
                    SortDirection::Desc
                } else {
                    let _ = self.match_token(&TokenKind::Asc);
                    SortDirection::Asc
                };
                intent = intent.order_by(property, direction);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }

        Ok(intent)
    }

    fn parse_select_item(&mut self) -> Result<RawItem> {
        let function = match self.current.kind {
            TokenKind::Count => Some(AggregateFn::Count),
            TokenKind::Sum => Some(AggregateFn::Sum),
            TokenKind::Avg => Some(AggregateFn::Avg),
            TokenKind::Min => Some(AggregateFn::Min),
            TokenKind::Max => Some(AggregateFn::Max),
            _ => None,
        };
        if let Some(function) = function {
            self.advance();
            self.expect(&TokenKind::LParen)?;
            let (star, arg) = if self.match_token(&TokenKind::Star) {
                (true, None)
            } else {
                (false, Some(self.parse_path()?))
            };
            self.expect(&TokenKind::RParen)?;
            return Ok(RawItem::Aggregate {
                function,
                star,
                arg,
            });
        }
        Ok(RawItem::Path(self.parse_path()?))
    }

    /// `COUNT(u)` counts rows; `COUNT(u.Id)` counts a column.
    fn resolve_aggregate_arg(&self, path: PathRef, alias: &str) -> Result<Option<String>> {
        if path.qualifier.is_none() && path.name == alias {
            return Ok(None);
        }
        resolve_property(path, alias).map(Some)
    }

    // ==================== UPDATE / DELETE ====================

    fn parse_update(&mut self) -> Result<QueryIntent> {
        self.expect(&TokenKind::Update)?;
        let (entity, _) = self.expect_ident()?;
        let alias = if matches!(self.current.kind, TokenKind::Ident(_)) {
            Some(self.expect_ident()?.0)
        } else {
            None
        };
        let alias_ref = alias.clone().unwrap_or_default();

        let mut intent = QueryIntent::update(&entity);
        if let Some(alias) = &alias {
            intent = intent.alias(alias);
        }

        self.expect(&TokenKind::Set)?;
        loop {
            let path = self.parse_path()?;
            let property = resolve_property(path, &alias_ref)?;
            self.expect(&TokenKind::Eq)?;
            let (param, _) = self.parse_operand()?;
            intent = intent.assign(property, param);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        // WHERE is mandatory: no unconditional bulk update.
        self.expect(&TokenKind::Where)?;
        let predicate = self.parse_predicate(&alias_ref)?;
        Ok(intent.predicate(predicate))
    }

    fn parse_delete(&mut self) -> Result<QueryIntent> {
        self.expect(&TokenKind::Delete)?;
        self.expect(&TokenKind::From)?;
        let (entity, _) = self.expect_ident()?;
        let alias = if matches!(self.current.kind, TokenKind::Ident(_)) {
            Some(self.expect_ident()?.0)
        } else {
            None
        };
        let alias_ref = alias.clone().unwrap_or_default();

        let mut intent = QueryIntent::delete(&entity);
        if let Some(alias) = &alias {
            intent = intent.alias(alias);
        }

        // WHERE is mandatory: no unconditional bulk delete.
        self.expect(&TokenKind::Where)?;
        let predicate = self.parse_predicate(&alias_ref)?;
        Ok(intent.predicate(predicate))
    }

    // ==================== Predicates ====================

    /// `predicate := and_expr (OR and_expr)*` — AND binds tighter.
    fn parse_predicate(&mut self, alias: &str) -> Result<PredicateNode> {
        let mut left = self.parse_and(alias)?;
        while self.match_token(&TokenKind::Or) {
            let right = self.parse_and(alias)?;
            left = PredicateNode::Logical {
                left: Box::new(left),
                op: LogicalOp::Or,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self, alias: &str) -> Result<PredicateNode> {
        let mut left = self.parse_primary(alias)?;
        while self.match_token(&TokenKind::And) {
            let right = self.parse_primary(alias)?;
            left = PredicateNode::Logical {
                left: Box::new(left),
                op: LogicalOp::And,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_primary(&mut self, alias: &str) -> Result<PredicateNode> {
        if self.match_token(&TokenKind::LParen) {
            let inner = self.parse_predicate(alias)?;
            self.expect(&TokenKind::RParen)?;
            return Ok(inner);
        }
        self.parse_condition(alias)
    }

    fn parse_condition(&mut self, alias: &str) -> Result<PredicateNode> {
        let path = self.parse_path()?;
        let property = resolve_property(path, alias)?;

        match self.current.kind {
            TokenKind::Is => {
                self.advance();
                let negated = self.match_token(&TokenKind::Not);
                self.expect(&TokenKind::Null)?;
                Ok(PredicateNode::NullCheck {
                    property,
                    is_null: !negated,
                })
            }
            TokenKind::Not => {
                self.advance();
                match self.current.kind {
                    TokenKind::Like => {
                        self.advance();
                        let (param, _) = self.parse_operand()?;
                        Ok(PredicateNode::Like {
                            property,
                            param,
                            shape: LikeShape::Raw,
                            negated: true,
                            ignore_case: false,
                        })
                    }
                    TokenKind::In => {
                        self.advance();
                        self.parse_in_list(property, true)
                    }
                    _ => Err(self.unexpected()),
                }
            }
            TokenKind::Like => {
                self.advance();
                let (param, _) = self.parse_operand()?;
                Ok(PredicateNode::Like {
                    property,
                    param,
                    shape: LikeShape::Raw,
                    negated: false,
                    ignore_case: false,
                })
            }
            TokenKind::Between => {
                self.advance();
                let (lo, _) = self.parse_operand()?;
                self.expect(&TokenKind::And)?;
                let (hi, _) = self.parse_operand()?;
                Ok(PredicateNode::Between { property, lo, hi })
            }
            TokenKind::In => {
                self.advance();
                self.parse_in_list(property, false)
            }
            TokenKind::Eq => {
                self.advance();
                if self.match_token(&TokenKind::Any) {
                    // `= ANY(:param)` — array-membership form; the
                    // parameter must be a bindable array, not a literal.
                    self.expect(&TokenKind::LParen)?;
                    let (param, pos) = self.parse_operand()?;
                    if matches!(param, ParamRef::Literal(_)) {
                        return Err(Error::Syntax {
                            token: "literal".to_string(),
                            position: pos,
                        });
                    }
                    self.expect(&TokenKind::RParen)?;
                    return Ok(PredicateNode::InSet {
                        property,
                        param,
                        negated: false,
                    });
                }
                let (param, _) = self.parse_operand()?;
                Ok(PredicateNode::Comparison {
                    property,
                    op: cpql_core::CompareOp::Eq,
                    param,
                    ignore_case: false,
                })
            }
            TokenKind::Ne | TokenKind::Lt | TokenKind::Le | TokenKind::Gt | TokenKind::Ge => {
                let op = match self.current.kind {
                    TokenKind::Ne => cpql_core::CompareOp::Ne,
                    TokenKind::Lt => cpql_core::CompareOp::Lt,
                    TokenKind::Le => cpql_core::CompareOp::Le,
                    TokenKind::Gt => cpql_core::CompareOp::Gt,
                    _ => cpql_core::CompareOp::Ge,
                };
                self.advance();
                let (param, _) = self.parse_operand()?;
                Ok(PredicateNode::Comparison {
                    property,
                    op,
                    param,
                    ignore_case: false,
                })
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_in_list(&mut self, property: String, negated: bool) -> Result<PredicateNode> {
        self.expect(&TokenKind::LParen)?;
        let mut operands = vec![self.parse_operand()?];
        while self.match_token(&TokenKind::Comma) {
            operands.push(self.parse_operand()?);
        }
        self.expect(&TokenKind::RParen)?;

        let param = if operands.len() == 1 {
            let (param, _) = operands.remove(0);
            param
        } else {
            // Multiple operands must all be literals; a list of
            // parameters has no single bindable representation.
            let mut values = Vec::with_capacity(operands.len());
            for (operand, pos) in operands {
                match operand {
                    ParamRef::Literal(value) => values.push(value),
                    other => {
                        return Err(Error::Syntax {
                            token: match other {
                                ParamRef::Named(name) => format!(":{name}"),
                                ParamRef::Positional(n) => format!("?{n}"),
                                ParamRef::Literal(_) => unreachable!(),
                            },
                            position: pos,
                        });
                    }
                }
            }
            ParamRef::Literal(Value::Array(values))
        };

        Ok(PredicateNode::InSet {
            property,
            param,
            negated,
        })
    }

    fn parse_operand(&mut self) -> Result<(ParamRef, usize)> {
        let pos = self.current.span.start;
        let param = match &self.current.kind {
            TokenKind::NamedParam(name) => ParamRef::Named(name.clone()),
            TokenKind::PositionalParam(n) => ParamRef::Positional(*n),
            TokenKind::IntLiteral(v) => ParamRef::Literal(Value::BigInt(*v)),
            TokenKind::FloatLiteral(v) => ParamRef::Literal(Value::Double(*v)),
            TokenKind::StringLiteral(s) => ParamRef::Literal(Value::Text(s.clone())),
            TokenKind::True => ParamRef::Literal(Value::Bool(true)),
            TokenKind::False => ParamRef::Literal(Value::Bool(false)),
            TokenKind::Null => ParamRef::Literal(Value::Null),
            _ => return Err(self.unexpected()),
        };
        self.advance();
        Ok((param, pos))
    }

    fn parse_path(&mut self) -> Result<PathRef> {
        let (first, pos) = self.expect_ident()?;
        if self.match_token(&TokenKind::Dot) {
            let (second, _) = self.expect_ident()?;
            return Ok(PathRef {
                qualifier: Some(first),
                name: second,
                pos,
            });
        }
        Ok(PathRef {
            qualifier: None,
            name: first,
            pos,
        })
    }
}

/// Resolve a path against the declared alias: `u.Prop` requires `u` to
/// be the alias; a bare identifier is taken as a property name.
fn resolve_property(path: PathRef, alias: &str) -> Result<String> {
    match path.qualifier {
        Some(q) if q == alias => Ok(path.name),
        Some(q) => Err(Error::Syntax {
            token: q,
            position: path.pos,
        }),
        None => Ok(path.name),
    }
}
