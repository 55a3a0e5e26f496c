//! SQL generation from query intents.
//!
//! [`SqlGenerator`] combines a [`QueryIntent`] with entity metadata and
//! a dialect descriptor and emits a [`GeneratedSql`]. Generation is a
//! pure function: a fixed (intent, metadata, dialect) triple always
//! produces byte-identical output.
//!
//! Every data value is referenced through a bound parameter; only
//! identifiers and static SQL keywords are interpolated into the text.

use cpql_core::{
    EntityMetadata, Error, GeneratedSql, LikeShape, MetadataRegistry, ParamRef, ParamSource,
    Parameter, PredicateNode, PropertyMeta, QueryIntent, QueryType, Result,
};

use crate::composite::CompositeKeyResolver;
use crate::dialect::Dialect;
use crate::translate::WhereFragment;

/// Generates dialect-correct SQL from query intents.
///
/// The metadata registry is injected at construction; there is no
/// ambient metadata state.
#[derive(Debug)]
pub struct SqlGenerator<'a> {
    registry: &'a MetadataRegistry,
    dialect: Dialect,
}

/// Collects parameters while a predicate renders, deduplicating by
/// placeholder name and assigning fresh names to captured literals.
struct ParamCtx {
    parameters: Vec<Parameter>,
    literals: usize,
}

impl ParamCtx {
    fn new() -> Self {
        Self {
            parameters: Vec::new(),
            literals: 0,
        }
    }

    fn bind(&mut self, param: &ParamRef, decoration: Option<LikeShape>) -> String {
        let (name, source) = match param {
            ParamRef::Named(name) => (name.clone(), ParamSource::Named(name.clone())),
            ParamRef::Positional(index) => (format!("p{index}"), ParamSource::Positional(*index)),
            ParamRef::Literal(value) => {
                let name = format!("v{}", self.literals);
                self.literals += 1;
                (name, ParamSource::Value(value.clone()))
            }
        };
        if !self.parameters.iter().any(|p| p.name == name) {
            let mut parameter = Parameter::new(&name, source);
            parameter.decoration = decoration;
            self.parameters.push(parameter);
        }
        format!("@{name}")
    }

    fn push_all(&mut self, parameters: Vec<Parameter>) {
        for parameter in parameters {
            if !self.parameters.iter().any(|p| p.name == parameter.name) {
                self.parameters.push(parameter);
            }
        }
    }
}

impl<'a> SqlGenerator<'a> {
    /// Create a generator over the given registry and dialect.
    pub fn new(registry: &'a MetadataRegistry, dialect: Dialect) -> Self {
        Self { registry, dialect }
    }

    /// The target dialect.
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Generate SQL for an intent, resolving metadata via the registry.
    pub fn generate(&self, intent: &QueryIntent) -> Result<GeneratedSql> {
        let metadata = self.registry.expect(&intent.entity)?;
        self.generate_for(intent, &metadata)
    }

    /// Generate SQL for an intent against explicit metadata.
    pub fn generate_for(
        &self,
        intent: &QueryIntent,
        metadata: &EntityMetadata,
    ) -> Result<GeneratedSql> {
        let sql = match intent.query_type {
            QueryType::Select => self.build_select(intent, metadata)?,
            QueryType::Count => self.build_count(intent, metadata)?,
            QueryType::Exists => self.build_exists(intent, metadata)?,
            QueryType::Insert => self.build_insert(metadata)?,
            QueryType::Update => self.build_update(intent, metadata)?,
            QueryType::Delete => self.build_delete(intent, metadata)?,
            QueryType::Unknown => {
                return Err(Error::UnsupportedExpression {
                    node: "unknown query type (no convention prefix matched)".to_string(),
                });
            }
        };
        tracing::debug!(
            entity = %metadata.entity,
            query_type = ?intent.query_type,
            dialect = self.dialect.name(),
            "generated sql"
        );
        Ok(sql)
    }

    /// Build a SELECT over a translator-produced WHERE fragment.
    pub fn select_with_fragment(
        &self,
        entity: &str,
        fragment: &WhereFragment,
    ) -> Result<GeneratedSql> {
        let metadata = self.registry.expect(entity)?;
        let mut sql = GeneratedSql::new(format!(
            "SELECT {} FROM {} WHERE {}",
            self.all_columns(&metadata),
            self.table(&metadata),
            fragment.sql
        ));
        sql.parameters = fragment.parameters.clone();
        Ok(sql)
    }

    /// Build a SELECT filtered by the primary key, with parameters
    /// sourced from the entity instance.
    pub fn select_by_key(&self, entity: &str) -> Result<GeneratedSql> {
        let metadata = self.registry.expect(entity)?;
        let (key_where, parameters) =
            CompositeKeyResolver::new(&metadata, self.dialect).where_from_instance()?;
        let mut sql = GeneratedSql::new(format!(
            "SELECT {} FROM {} WHERE {}",
            self.all_columns(&metadata),
            self.table(&metadata),
            key_where
        ));
        sql.parameters = parameters;
        Ok(sql)
    }

    // ==================== Statement builders ====================

    fn build_select(&self, intent: &QueryIntent, metadata: &EntityMetadata) -> Result<GeneratedSql> {
        let mut ctx = ParamCtx::new();
        let pagination =
            self.dialect
                .pagination(intent.limit, intent.offset, !intent.order_by.is_empty())?;

        let mut text = String::from("SELECT ");
        if intent.distinct {
            text.push_str("DISTINCT ");
        }
        if let Some(modifier) = &pagination.select_modifier {
            text.push_str(modifier);
        }
        text.push_str(&self.select_columns(intent, metadata)?);
        text.push_str(" FROM ");
        text.push_str(&self.table(metadata));

        if let Some(predicate) = &intent.predicate {
            text.push_str(" WHERE ");
            text.push_str(&self.render_predicate(predicate, metadata, &mut ctx)?);
        }
        if !intent.group_by.is_empty() {
            let columns = intent
                .group_by
                .iter()
                .map(|p| self.column(metadata, p))
                .collect::<Result<Vec<_>>>()?;
            text.push_str(" GROUP BY ");
            text.push_str(&columns.join(", "));
        }
        if let Some(having) = &intent.having {
            text.push_str(" HAVING ");
            text.push_str(&self.render_predicate(having, metadata, &mut ctx)?);
        }
        if !intent.order_by.is_empty() {
            let terms = intent
                .order_by
                .iter()
                .map(|term| {
                    Ok(format!(
                        "{} {}",
                        self.column(metadata, &term.property)?,
                        term.direction.as_sql()
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            text.push_str(" ORDER BY ");
            text.push_str(&terms.join(", "));
        }
        if let Some(suffix) = &pagination.suffix {
            text.push_str(suffix);
        }

        let mut sql = GeneratedSql::new(text);
        sql.parameters = ctx.parameters;
        Ok(sql)
    }

    fn build_count(&self, intent: &QueryIntent, metadata: &EntityMetadata) -> Result<GeneratedSql> {
        let mut ctx = ParamCtx::new();
        let counted = intent
            .aggregates
            .iter()
            .find(|a| a.function == cpql_core::AggregateFn::Count)
            .and_then(|a| a.property.as_deref());
        let projection = match counted {
            Some(property) => {
                let column = self.column(metadata, property)?;
                if intent.distinct {
                    format!("COUNT(DISTINCT {column})")
                } else {
                    format!("COUNT({column})")
                }
            }
            None => "COUNT(*)".to_string(),
        };

        let mut text = format!("SELECT {projection} FROM {}", self.table(metadata));
        if let Some(predicate) = &intent.predicate {
            text.push_str(" WHERE ");
            text.push_str(&self.render_predicate(predicate, metadata, &mut ctx)?);
        }

        let mut sql = GeneratedSql::new(text);
        sql.parameters = ctx.parameters;
        Ok(sql)
    }

    fn build_exists(&self, intent: &QueryIntent, metadata: &EntityMetadata) -> Result<GeneratedSql> {
        let mut ctx = ParamCtx::new();
        let mut inner = format!("SELECT 1 FROM {}", self.table(metadata));
        if let Some(predicate) = &intent.predicate {
            inner.push_str(" WHERE ");
            inner.push_str(&self.render_predicate(predicate, metadata, &mut ctx)?);
        }
        // Portable scalar-EXISTS form; all four dialects accept it.
        let text = format!("SELECT CASE WHEN EXISTS ({inner}) THEN 1 ELSE 0 END");
        let mut sql = GeneratedSql::new(text);
        sql.parameters = ctx.parameters;
        Ok(sql)
    }

    fn build_insert(&self, metadata: &EntityMetadata) -> Result<GeneratedSql> {
        let insertable: Vec<&PropertyMeta> = metadata
            .properties
            .iter()
            .filter(|p| !p.generated)
            .collect();
        if insertable.is_empty() {
            return Err(Error::UnknownProperty {
                entity: metadata.entity.clone(),
                property: "(no insertable properties)".to_string(),
            });
        }

        let columns: Vec<String> = insertable
            .iter()
            .map(|p| self.dialect.quote(&p.column))
            .collect();
        let placeholders: Vec<String> = insertable.iter().map(|p| format!("@{}", p.name)).collect();

        let mut text = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table(metadata),
            columns.join(", "),
            placeholders.join(", ")
        );
        if let Some(identity) = metadata.identity_property() {
            if let Some(suffix) = self
                .dialect
                .identity_suffix(&self.dialect.quote(&identity.column))
            {
                text.push_str(&suffix);
            }
        }

        let mut sql = GeneratedSql::new(text);
        sql.parameters = insertable
            .iter()
            .map(|p| Parameter::new(&p.name, ParamSource::Property(p.name.clone())))
            .collect();
        Ok(sql)
    }

    fn build_update(&self, intent: &QueryIntent, metadata: &EntityMetadata) -> Result<GeneratedSql> {
        let mut ctx = ParamCtx::new();

        let set_clauses = if intent.assignments.is_empty() {
            // Entity-shaped update: every writable, non-key column.
            let writable: Vec<&PropertyMeta> = metadata
                .properties
                .iter()
                .filter(|p| !p.primary_key && !p.generated)
                .collect();
            if writable.is_empty() {
                return Err(Error::UnknownProperty {
                    entity: metadata.entity.clone(),
                    property: "(no writable properties)".to_string(),
                });
            }
            writable
                .iter()
                .map(|p| {
                    ctx.push_all(vec![Parameter::new(
                        &p.name,
                        ParamSource::Property(p.name.clone()),
                    )]);
                    format!("{} = @{}", self.dialect.quote(&p.column), p.name)
                })
                .collect::<Vec<_>>()
        } else {
            intent
                .assignments
                .iter()
                .map(|assignment| {
                    let column = self.column(metadata, &assignment.property)?;
                    let placeholder = ctx.bind(&assignment.param, None);
                    Ok(format!("{column} = {placeholder}"))
                })
                .collect::<Result<Vec<_>>>()?
        };

        let where_sql = match &intent.predicate {
            Some(predicate) => self.render_predicate(predicate, metadata, &mut ctx)?,
            None => {
                let (key_where, parameters) =
                    CompositeKeyResolver::new(metadata, self.dialect).where_from_instance()?;
                ctx.push_all(parameters);
                key_where
            }
        };

        let text = format!(
            "UPDATE {} SET {} WHERE {}",
            self.table(metadata),
            set_clauses.join(", "),
            where_sql
        );
        let mut sql = GeneratedSql::new(text);
        sql.parameters = ctx.parameters;
        Ok(sql)
    }

    fn build_delete(&self, intent: &QueryIntent, metadata: &EntityMetadata) -> Result<GeneratedSql> {
        let mut ctx = ParamCtx::new();
        let where_sql = match &intent.predicate {
            Some(predicate) => self.render_predicate(predicate, metadata, &mut ctx)?,
            None => {
                let (key_where, parameters) =
                    CompositeKeyResolver::new(metadata, self.dialect).where_from_instance()?;
                ctx.push_all(parameters);
                key_where
            }
        };

        let text = format!("DELETE FROM {} WHERE {}", self.table(metadata), where_sql);
        let mut sql = GeneratedSql::new(text);
        sql.parameters = ctx.parameters;
        Ok(sql)
    }

    // ==================== Rendering helpers ====================

    fn table(&self, metadata: &EntityMetadata) -> String {
        self.dialect
            .qualified_table(metadata.schema.as_deref(), &metadata.table)
    }

    fn column(&self, metadata: &EntityMetadata, property: &str) -> Result<String> {
        let meta = metadata
            .find_property(property)
            .ok_or_else(|| Error::UnknownProperty {
                entity: metadata.entity.clone(),
                property: property.to_string(),
            })?;
        Ok(self.dialect.quote(&meta.column))
    }

    fn all_columns(&self, metadata: &EntityMetadata) -> String {
        metadata
            .properties
            .iter()
            .map(|p| self.dialect.quote(&p.column))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn select_columns(&self, intent: &QueryIntent, metadata: &EntityMetadata) -> Result<String> {
        if intent.projection.is_empty() && intent.aggregates.is_empty() {
            return Ok(self.all_columns(metadata));
        }
        let mut items = Vec::with_capacity(intent.projection.len() + intent.aggregates.len());
        for property in &intent.projection {
            items.push(self.column(metadata, property)?);
        }
        for aggregate in &intent.aggregates {
            let rendered = match &aggregate.property {
                Some(property) => format!(
                    "{}({})",
                    aggregate.function.as_sql(),
                    self.column(metadata, property)?
                ),
                None => format!("{}(*)", aggregate.function.as_sql()),
            };
            items.push(rendered);
        }
        Ok(items.join(", "))
    }

    fn render_predicate(
        &self,
        node: &PredicateNode,
        metadata: &EntityMetadata,
        ctx: &mut ParamCtx,
    ) -> Result<String> {
        match node {
            PredicateNode::Comparison {
                property,
                op,
                param,
                ignore_case,
            } => {
                let column = self.column(metadata, property)?;
                let placeholder = ctx.bind(param, None);
                if *ignore_case {
                    Ok(format!(
                        "LOWER({column}) {} LOWER({placeholder})",
                        op.as_sql()
                    ))
                } else {
                    Ok(format!("{column} {} {placeholder}", op.as_sql()))
                }
            }

            PredicateNode::Logical { left, op, right } => {
                let left_sql = self.render_predicate(left, metadata, ctx)?;
                let right_sql = self.render_predicate(right, metadata, ctx)?;
                Ok(format!("({left_sql} {} {right_sql})", op.as_sql()))
            }

            PredicateNode::Between { property, lo, hi } => {
                let column = self.column(metadata, property)?;
                let lo_ph = ctx.bind(lo, None);
                let hi_ph = ctx.bind(hi, None);
                Ok(format!("{column} BETWEEN {lo_ph} AND {hi_ph}"))
            }

            PredicateNode::InSet {
                property,
                param,
                negated,
            } => {
                let column = self.column(metadata, property)?;
                let placeholder = ctx.bind(param, None);
                Ok(self.dialect.set_membership(&column, &placeholder, *negated))
            }

            PredicateNode::NullCheck { property, is_null } => {
                let column = self.column(metadata, property)?;
                if *is_null {
                    Ok(format!("{column} IS NULL"))
                } else {
                    Ok(format!("{column} IS NOT NULL"))
                }
            }

            PredicateNode::Like {
                property,
                param,
                shape,
                negated,
                ignore_case,
            } => {
                let column = self.column(metadata, property)?;
                let decoration = match shape {
                    LikeShape::Raw => None,
                    shaped => Some(*shaped),
                };
                let placeholder = ctx.bind(param, decoration);
                let not = if *negated { "NOT " } else { "" };
                // Decorated patterns are !-escaped by the execution
                // layer, so they need the matching ESCAPE clause.
                let escape = if decoration.is_some() { " ESCAPE '!'" } else { "" };
                if *ignore_case {
                    Ok(format!(
                        "LOWER({column}) {not}LIKE LOWER({placeholder}){escape}"
                    ))
                } else {
                    Ok(format!("{column} {not}LIKE {placeholder}{escape}"))
                }
            }
        }
    }
}
