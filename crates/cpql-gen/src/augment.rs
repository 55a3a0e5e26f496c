//! Relationship-aware augmentation of generated SQL.
//!
//! The read path extends a generated SELECT with relationship joins and
//! split markers, or partitions the load into one query per additional
//! collection — two to-many relationships are never combined into a
//! single JOIN, because that multiplies rows into a cartesian product.
//!
//! The mutation path walks cascade metadata into an ordered plan of
//! per-entity statements. The plan's execution contract is sequential:
//! steps run in order inside the caller's transaction scope, and a
//! failure aborts the remaining steps — there is no partial-success
//! commit and no internal retry.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use cpql_core::{
    Cascade, EntityMetadata, Error, GeneratedSql, JoinSpec, MetadataRegistry, ParamSource,
    Parameter, QueryIntent, RelationshipMeta, Result,
};

use crate::dialect::Dialect;
use crate::generator::SqlGenerator;

/// The read-path result: either one joined statement or a root
/// statement plus per-collection secondary queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FetchPlan {
    /// All requested relationships fit into one statement.
    Joined(GeneratedSql),
    /// Additional collections load separately and merge in memory,
    /// keyed by the root primary key.
    Partitioned {
        root: GeneratedSql,
        collections: Vec<CollectionQuery>,
    },
}

/// A secondary query loading one to-many relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionQuery {
    /// Relationship name on the root entity.
    pub relationship: String,
    /// The statement to execute. Single-column keys filter by a
    /// `RootKeys` list parameter; composite keys produce a per-root
    /// statement with one `Root{Property}` parameter per key column.
    pub sql: GeneratedSql,
    /// Root primary-key column names the merge is keyed by.
    pub root_key_columns: Vec<String>,
    /// Result columns carrying the root key on the child side.
    pub child_key_columns: Vec<String>,
}

/// A lifecycle operation requested for a cascade walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CascadeOp {
    Persist,
    Update,
    Remove,
    Merge,
    Refresh,
}

impl CascadeOp {
    /// The cascade flag gating propagation of this operation.
    pub const fn flag(self) -> Cascade {
        match self {
            CascadeOp::Persist => Cascade::PERSIST,
            CascadeOp::Update => Cascade::UPDATE,
            CascadeOp::Remove => Cascade::REMOVE,
            CascadeOp::Merge => Cascade::MERGE,
            CascadeOp::Refresh => Cascade::REFRESH,
        }
    }

    /// Remove orders children before parents to satisfy referential
    /// constraints; everything else is parent-first.
    pub const fn children_first(self) -> bool {
        matches!(self, CascadeOp::Remove)
    }
}

/// One ordered step of a cascade plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeStep {
    /// Entity the statement applies to.
    pub entity: String,
    /// Relationship traversed to reach this entity (None for the root).
    pub relationship: Option<String>,
    /// The operation this step performs.
    pub operation: CascadeOp,
    /// Orphan-removal step: executed once per child that dropped out of
    /// the updated collection.
    pub orphan_removal: bool,
    /// The statement. Property-sourced parameters read from the
    /// instance the step applies to.
    pub sql: GeneratedSql,
}

/// An ordered cascade plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadePlan {
    pub steps: Vec<CascadeStep>,
}

/// Plans relationship joins, secondary collection loads, and cascade
/// walks.
#[derive(Debug)]
pub struct RelationshipAugmenter<'a> {
    registry: &'a MetadataRegistry,
    dialect: Dialect,
}

impl<'a> RelationshipAugmenter<'a> {
    /// Create an augmenter over the given registry and dialect.
    pub fn new(registry: &'a MetadataRegistry, dialect: Dialect) -> Self {
        Self { registry, dialect }
    }

    // ==================== Read path ====================

    /// Extend a generator-produced SELECT with the requested and
    /// eagerly-fetched relationships.
    ///
    /// All to-one relationships join into the root statement (LEFT when
    /// optional, INNER otherwise), plus at most one to-many
    /// relationship. Every further to-many relationship becomes a
    /// [`CollectionQuery`].
    pub fn plan_fetch(
        &self,
        base: &GeneratedSql,
        entity: &str,
        includes: &[&str],
    ) -> Result<FetchPlan> {
        let metadata = self.registry.expect(entity)?;

        let mut requested: Vec<&RelationshipMeta> = Vec::new();
        for name in includes {
            let rel = metadata
                .find_relationship(name)
                .ok_or_else(|| Error::UnknownProperty {
                    entity: metadata.entity.clone(),
                    property: (*name).to_string(),
                })?;
            requested.push(rel);
        }
        for rel in &metadata.relationships {
            if rel.fetch == cpql_core::FetchStrategy::Eager
                && !requested.iter().any(|r| r.name == rel.name)
            {
                requested.push(rel);
            }
        }
        if requested.is_empty() {
            return Ok(FetchPlan::Joined(base.clone()));
        }

        let mut joined: Vec<&RelationshipMeta> = Vec::new();
        let mut extra: Vec<&RelationshipMeta> = Vec::new();
        let mut have_collection = false;
        for rel in requested {
            if rel.kind.is_to_many() {
                if have_collection {
                    extra.push(rel);
                } else {
                    have_collection = true;
                    joined.push(rel);
                }
            } else {
                joined.push(rel);
            }
        }

        let root = self.join_into(base, &metadata, &joined)?;
        if extra.is_empty() {
            tracing::debug!(entity, joins = joined.len(), "planned joined fetch");
            return Ok(FetchPlan::Joined(root));
        }

        let mut collections = Vec::with_capacity(extra.len());
        for rel in extra {
            collections.push(self.collection_query(&metadata, rel)?);
        }
        tracing::debug!(
            entity,
            joins = joined.len(),
            collections = collections.len(),
            "planned partitioned fetch"
        );
        Ok(FetchPlan::Partitioned { root, collections })
    }

    /// Splice join clauses and aliased relation columns into a base
    /// SELECT.
    fn join_into(
        &self,
        base: &GeneratedSql,
        metadata: &EntityMetadata,
        relationships: &[&RelationshipMeta],
    ) -> Result<GeneratedSql> {
        if relationships.is_empty() {
            return Ok(base.clone());
        }

        let Some((head, tail)) = base.text.split_once(" FROM ") else {
            return Err(Error::UnsupportedExpression {
                node: "relationship joins over a non-SELECT statement".to_string(),
            });
        };

        let root_table = self.dialect.quote(&metadata.table);

        // Qualify the root column list so joined tables cannot shadow it.
        let rest = head.strip_prefix("SELECT ").unwrap_or(head);
        let (modifiers, columns) = split_select_modifiers(rest);
        let mut column_list: Vec<String> = columns
            .split(", ")
            .map(|item| {
                if item.contains('.') || item.contains('(') {
                    item.to_string()
                } else {
                    format!("{root_table}.{item}")
                }
            })
            .collect();

        let mut joins = String::new();
        let mut split_on = base.split_on.clone();
        for rel in relationships {
            let target = self.registry.expect(&rel.target)?;
            for property in &target.properties {
                let alias = format!("{}__{}", target.table, property.column);
                column_list.push(format!(
                    "{}.{} AS {}",
                    self.dialect.quote(&target.table),
                    self.dialect.quote(&property.column),
                    self.dialect.quote(&alias)
                ));
            }
            joins.push_str(&self.join_clause(metadata, rel, &target)?);
            if let Some(pk) = target.key_properties().first() {
                split_on.push(format!("{}__{}", target.table, pk.column));
            }
        }

        let insert_at = join_insert_point(tail);
        let mut text = String::from("SELECT ");
        text.push_str(modifiers);
        text.push_str(&column_list.join(", "));
        text.push_str(" FROM ");
        text.push_str(&tail[..insert_at]);
        text.push_str(&joins);
        text.push_str(&tail[insert_at..]);

        let mut sql = GeneratedSql::new(text);
        sql.parameters = base.parameters.clone();
        sql.split_on = split_on;
        Ok(sql)
    }

    fn join_clause(
        &self,
        root: &EntityMetadata,
        rel: &RelationshipMeta,
        target: &EntityMetadata,
    ) -> Result<String> {
        let join_kw = if rel.optional { "LEFT JOIN" } else { "INNER JOIN" };
        let root_table = self.dialect.quote(&root.table);
        let target_table = self.dialect.quote(&target.table);

        match &rel.join {
            JoinSpec::Column { local, remote } => Ok(format!(
                " {join_kw} {target_table} ON {root_table}.{} = {target_table}.{}",
                self.dialect.quote(local),
                self.dialect.quote(remote)
            )),
            JoinSpec::Table {
                table,
                local_columns,
                remote_columns,
            } => {
                let link_table = self.dialect.quote(table);
                let root_keys = root.key_properties();
                let target_keys = target.key_properties();
                let on_local = root_keys
                    .iter()
                    .zip(local_columns)
                    .map(|(pk, link_col)| {
                        format!(
                            "{root_table}.{} = {link_table}.{}",
                            self.dialect.quote(&pk.column),
                            self.dialect.quote(link_col)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(" AND ");
                let on_remote = target_keys
                    .iter()
                    .zip(remote_columns)
                    .map(|(pk, link_col)| {
                        format!(
                            "{link_table}.{} = {target_table}.{}",
                            self.dialect.quote(link_col),
                            self.dialect.quote(&pk.column)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(" AND ");
                Ok(format!(
                    " {join_kw} {link_table} ON {on_local} {join_kw} {target_table} ON {on_remote}"
                ))
            }
        }
    }

    /// Build the secondary query for one additional to-many
    /// relationship.
    fn collection_query(
        &self,
        root: &EntityMetadata,
        rel: &RelationshipMeta,
    ) -> Result<CollectionQuery> {
        let target = self.registry.expect(&rel.target)?;
        let root_key_columns: Vec<String> = root
            .key_properties()
            .iter()
            .map(|p| p.column.clone())
            .collect();

        let target_table = self.dialect.quote(&target.table);
        let child_columns: Vec<String> = target
            .properties
            .iter()
            .map(|p| format!("{target_table}.{}", self.dialect.quote(&p.column)))
            .collect();

        let (sql, child_key_columns) = match &rel.join {
            JoinSpec::Column { remote, .. } => {
                let filter_column = format!("{target_table}.{}", self.dialect.quote(remote));
                let (where_sql, parameters) =
                    self.root_key_filter(root, std::slice::from_ref(remote), &filter_column)?;
                let text = format!(
                    "SELECT {} FROM {target_table} WHERE {where_sql}",
                    child_columns.join(", ")
                );
                let mut sql = GeneratedSql::new(text);
                sql.parameters = parameters;
                (sql, vec![remote.clone()])
            }
            JoinSpec::Table {
                table,
                local_columns,
                remote_columns,
            } => {
                let link_table = self.dialect.quote(table);
                let mut columns = child_columns;
                let mut child_keys = Vec::with_capacity(local_columns.len());
                for link_col in local_columns {
                    let alias = format!("{table}__{link_col}");
                    columns.push(format!(
                        "{link_table}.{} AS {}",
                        self.dialect.quote(link_col),
                        self.dialect.quote(&alias)
                    ));
                    child_keys.push(alias);
                }
                let on = target
                    .key_properties()
                    .iter()
                    .zip(remote_columns)
                    .map(|(pk, link_col)| {
                        format!(
                            "{link_table}.{} = {target_table}.{}",
                            self.dialect.quote(link_col),
                            self.dialect.quote(&pk.column)
                        )
                    })
                    .collect::<Vec<_>>()
                    .join(" AND ");
                let filter_column =
                    format!("{link_table}.{}", self.dialect.quote(&local_columns[0]));
                let (where_sql, parameters) =
                    self.root_key_filter(root, local_columns, &filter_column)?;
                let text = format!(
                    "SELECT {} FROM {target_table} INNER JOIN {link_table} ON {on} WHERE {where_sql}",
                    columns.join(", ")
                );
                let mut sql = GeneratedSql::new(text);
                sql.parameters = parameters;
                (sql, child_keys)
            }
        };

        Ok(CollectionQuery {
            relationship: rel.name.clone(),
            sql,
            root_key_columns,
            child_key_columns,
        })
    }

    /// Filter child rows down to the loaded roots. Single-column keys
    /// batch through one `RootKeys` list parameter; composite keys
    /// produce a per-root conjunction via the key properties.
    fn root_key_filter(
        &self,
        root: &EntityMetadata,
        filter_columns: &[String],
        first_column_sql: &str,
    ) -> Result<(String, Vec<Parameter>)> {
        if filter_columns.len() == 1 {
            let placeholder = "@RootKeys";
            let sql = self
                .dialect
                .set_membership(first_column_sql, placeholder, false);
            let parameters = vec![Parameter::new(
                "RootKeys",
                ParamSource::Named("RootKeys".to_string()),
            )];
            return Ok((sql, parameters));
        }

        let root_keys = root.key_properties();
        if root_keys.len() != filter_columns.len() {
            return Err(Error::MissingKeyComponent {
                property: format!(
                    "{} key width does not match relationship columns",
                    root.entity
                ),
            });
        }
        let mut clauses = Vec::with_capacity(filter_columns.len());
        let mut parameters = Vec::with_capacity(filter_columns.len());
        for (pk, column) in root_keys.iter().zip(filter_columns) {
            let name = format!("Root{}", pk.name);
            clauses.push(format!("{} = @{name}", self.dialect.quote(column)));
            parameters.push(Parameter::new(&name, ParamSource::Named(name.clone())));
        }
        Ok((clauses.join(" AND "), parameters))
    }

    // ==================== Mutation path ====================

    /// Walk cascade metadata into an ordered plan for the requested
    /// operation.
    ///
    /// Persist/Update/Merge/Refresh order parent-before-children;
    /// Remove orders children-before-parent. A visited set keyed by
    /// entity name guards against relationship cycles: a relationship
    /// that re-enters an already-planned entity is skipped.
    pub fn plan_cascade(&self, entity: &str, op: CascadeOp) -> Result<CascadePlan> {
        let mut visited = HashSet::new();
        let mut steps = Vec::new();
        self.walk(entity, None, op, &mut visited, &mut steps)?;
        Ok(CascadePlan { steps })
    }

    fn walk(
        &self,
        entity: &str,
        relationship: Option<&str>,
        op: CascadeOp,
        visited: &mut HashSet<String>,
        steps: &mut Vec<CascadeStep>,
    ) -> Result<()> {
        if !visited.insert(entity.to_string()) {
            tracing::warn!(entity, "cascade cycle detected, skipping re-entry");
            return Ok(());
        }
        let metadata = self.registry.expect(entity)?;
        let children: Vec<&RelationshipMeta> = metadata
            .relationships
            .iter()
            .filter(|rel| rel.cascade.contains(op.flag()))
            .collect();

        if op.children_first() {
            for rel in &children {
                self.walk(&rel.target, Some(rel.name.as_str()), op, visited, steps)?;
            }
            steps.push(self.step(entity, relationship, op, false)?);
        } else {
            steps.push(self.step(entity, relationship, op, false)?);
            if op == CascadeOp::Update {
                for rel in metadata
                    .relationships
                    .iter()
                    .filter(|rel| rel.orphan_removal && rel.kind.is_to_many())
                {
                    steps.push(self.step(&rel.target, Some(rel.name.as_str()), CascadeOp::Remove, true)?);
                }
            }
            for rel in &children {
                self.walk(&rel.target, Some(rel.name.as_str()), op, visited, steps)?;
            }
        }
        Ok(())
    }

    fn step(
        &self,
        entity: &str,
        relationship: Option<&str>,
        op: CascadeOp,
        orphan_removal: bool,
    ) -> Result<CascadeStep> {
        let generator = SqlGenerator::new(self.registry, self.dialect);
        let sql = match op {
            CascadeOp::Persist => generator.generate(&QueryIntent::insert(entity))?,
            CascadeOp::Update | CascadeOp::Merge => {
                generator.generate(&QueryIntent::update(entity))?
            }
            CascadeOp::Remove => generator.generate(&QueryIntent::delete(entity))?,
            CascadeOp::Refresh => generator.select_by_key(entity)?,
        };
        Ok(CascadeStep {
            entity: entity.to_string(),
            relationship: relationship.map(str::to_string),
            operation: op,
            orphan_removal,
            sql,
        })
    }
}

/// Split `DISTINCT ` / `TOP (n) ` select modifiers from the column list.
fn split_select_modifiers(rest: &str) -> (&str, &str) {
    let mut end = 0;
    if rest.starts_with("DISTINCT ") {
        end += "DISTINCT ".len();
    }
    if rest[end..].starts_with("TOP (") {
        if let Some(close) = rest[end..].find(") ") {
            end += close + 2;
        }
    }
    (&rest[..end], &rest[end..])
}

/// The earliest clause boundary in the FROM tail, where join clauses
/// are spliced in.
fn join_insert_point(tail: &str) -> usize {
    [" WHERE ", " GROUP BY ", " HAVING ", " ORDER BY ", " LIMIT", " OFFSET"]
        .iter()
        .filter_map(|clause| tail.find(clause))
        .min()
        .unwrap_or(tail.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpql_core::{FetchStrategy, PropertyMeta, RelationshipKind, SqlType};
    use pretty_assertions::assert_eq;

    fn registry() -> MetadataRegistry {
        let registry = MetadataRegistry::new();
        registry.register(
            EntityMetadata::new("User", "users")
                .property(
                    PropertyMeta::new("Id", SqlType::BigInt)
                        .primary_key(true)
                        .generated(true),
                )
                .property(PropertyMeta::new("Email", SqlType::Text))
                .relationship(
                    RelationshipMeta::new("Team", RelationshipKind::ManyToOne, "Team", "team_id", "id")
                        .optional(true),
                )
                .relationship(
                    RelationshipMeta::new("Orders", RelationshipKind::OneToMany, "Order", "id", "user_id")
                        .fetch(FetchStrategy::Eager)
                        .cascade(Cascade::PERSIST | Cascade::UPDATE | Cascade::REMOVE)
                        .orphan_removal(true),
                )
                .relationship(
                    RelationshipMeta::new("Logins", RelationshipKind::OneToMany, "Login", "id", "user_id")
                        .fetch(FetchStrategy::Eager),
                ),
        );
        registry.register(
            EntityMetadata::new("Team", "teams")
                .property(
                    PropertyMeta::new("Id", SqlType::BigInt)
                        .primary_key(true)
                        .generated(true),
                )
                .property(PropertyMeta::new("Name", SqlType::Text)),
        );
        registry.register(
            EntityMetadata::new("Order", "orders")
                .property(
                    PropertyMeta::new("Id", SqlType::BigInt)
                        .primary_key(true)
                        .generated(true),
                )
                .property(PropertyMeta::new("UserId", SqlType::BigInt))
                .property(PropertyMeta::new("Total", SqlType::Decimal { precision: 10, scale: 2 })),
        );
        registry.register(
            EntityMetadata::new("Login", "logins")
                .property(
                    PropertyMeta::new("Id", SqlType::BigInt)
                        .primary_key(true)
                        .generated(true),
                )
                .property(PropertyMeta::new("UserId", SqlType::BigInt)),
        );
        registry
    }

    fn base_select(registry: &MetadataRegistry) -> GeneratedSql {
        SqlGenerator::new(registry, Dialect::Postgres)
            .generate(&QueryIntent::select("User"))
            .unwrap()
    }

    #[test]
    fn test_single_to_one_include_adds_left_join_and_split() {
        let registry = MetadataRegistry::new();
        registry.register(
            EntityMetadata::new("User", "users")
                .property(PropertyMeta::new("Id", SqlType::BigInt).primary_key(true))
                .property(PropertyMeta::new("Email", SqlType::Text))
                .relationship(
                    RelationshipMeta::new("Team", RelationshipKind::ManyToOne, "Team", "team_id", "id")
                        .optional(true),
                ),
        );
        registry.register(
            EntityMetadata::new("Team", "teams")
                .property(PropertyMeta::new("Id", SqlType::BigInt).primary_key(true))
                .property(PropertyMeta::new("Name", SqlType::Text)),
        );
        let base = base_select(&registry);
        let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
        let plan = augmenter.plan_fetch(&base, "User", &["Team"]).unwrap();
        let FetchPlan::Joined(sql) = plan else {
            panic!("expected joined plan");
        };
        assert_eq!(
            sql.text,
            "SELECT \"users\".\"id\", \"users\".\"email\", \"teams\".\"id\" AS \"teams__id\", \"teams\".\"name\" AS \"teams__name\" FROM \"users\" LEFT JOIN \"teams\" ON \"users\".\"team_id\" = \"teams\".\"id\""
        );
        assert_eq!(sql.split_on, vec!["teams__id"]);
    }

    #[test]
    fn test_required_to_one_uses_inner_join() {
        let registry = MetadataRegistry::new();
        registry.register(
            EntityMetadata::new("User", "users")
                .property(PropertyMeta::new("Id", SqlType::BigInt).primary_key(true))
                .relationship(RelationshipMeta::new(
                    "Team",
                    RelationshipKind::ManyToOne,
                    "Team",
                    "team_id",
                    "id",
                )),
        );
        registry.register(
            EntityMetadata::new("Team", "teams")
                .property(PropertyMeta::new("Id", SqlType::BigInt).primary_key(true)),
        );
        let base = base_select(&registry);
        let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
        let FetchPlan::Joined(sql) = augmenter.plan_fetch(&base, "User", &["Team"]).unwrap()
        else {
            panic!("expected joined plan");
        };
        assert!(sql.text.contains("INNER JOIN \"teams\""));
    }

    #[test]
    fn test_two_to_many_relationships_never_share_one_join() {
        let registry = registry();
        let base = base_select(&registry);
        let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
        let plan = augmenter.plan_fetch(&base, "User", &[]).unwrap();
        let FetchPlan::Partitioned { root, collections } = plan else {
            panic!("two eager collections must partition");
        };
        // The root joins the first collection only.
        assert!(root.text.contains("JOIN \"orders\""));
        assert!(!root.text.contains("JOIN \"logins\""));
        assert_eq!(collections.len(), 1);
        assert_eq!(collections[0].relationship, "Logins");
        assert_eq!(
            collections[0].sql.text,
            "SELECT \"logins\".\"id\", \"logins\".\"user_id\" FROM \"logins\" WHERE \"logins\".\"user_id\" = ANY(@RootKeys)"
        );
        assert_eq!(collections[0].root_key_columns, vec!["id"]);
        assert_eq!(collections[0].child_key_columns, vec!["user_id"]);
    }

    #[test]
    fn test_collection_query_uses_in_on_non_postgres() {
        let registry = registry();
        let base = SqlGenerator::new(&registry, Dialect::Sqlite)
            .generate(&QueryIntent::select("User"))
            .unwrap();
        let augmenter = RelationshipAugmenter::new(&registry, Dialect::Sqlite);
        let FetchPlan::Partitioned { collections, .. } =
            augmenter.plan_fetch(&base, "User", &[]).unwrap()
        else {
            panic!("expected partitioned plan");
        };
        assert!(collections[0].sql.text.contains("IN (@RootKeys)"));
    }

    #[test]
    fn test_join_preserves_where_clause_position() {
        let registry = registry();
        let generator = SqlGenerator::new(&registry, Dialect::Postgres);
        let base = generator
            .generate(&QueryIntent::select("User").predicate(cpql_core::PredicateNode::eq(
                "Email",
                cpql_core::ParamRef::Named("email".to_string()),
            )))
            .unwrap();
        let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
        let FetchPlan::Joined(sql) = augmenter.plan_fetch(&base, "User", &["Team"]).unwrap()
        else {
            panic!("expected joined plan");
        };
        let join_at = sql.text.find("LEFT JOIN").unwrap();
        let where_at = sql.text.find(" WHERE ").unwrap();
        assert!(join_at < where_at);
        assert_eq!(sql.parameters.len(), 1);
    }

    #[test]
    fn test_unknown_include_is_rejected() {
        let registry = registry();
        let base = base_select(&registry);
        let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
        let err = augmenter.plan_fetch(&base, "User", &["Ghost"]).unwrap_err();
        assert!(matches!(err, Error::UnknownProperty { .. }));
    }

    #[test]
    fn test_cascade_persist_orders_parent_before_children() {
        let registry = registry();
        let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
        let plan = augmenter.plan_cascade("User", CascadeOp::Persist).unwrap();
        let entities: Vec<&str> = plan.steps.iter().map(|s| s.entity.as_str()).collect();
        assert_eq!(entities, vec!["User", "Order"]);
        assert!(plan.steps[0].sql.text.starts_with("INSERT INTO \"users\""));
        assert!(plan.steps[1].sql.text.starts_with("INSERT INTO \"orders\""));
        assert_eq!(plan.steps[1].relationship.as_deref(), Some("Orders"));
    }

    #[test]
    fn test_cascade_remove_orders_children_before_parent() {
        let registry = registry();
        let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
        let plan = augmenter.plan_cascade("User", CascadeOp::Remove).unwrap();
        let entities: Vec<&str> = plan.steps.iter().map(|s| s.entity.as_str()).collect();
        assert_eq!(entities, vec!["Order", "User"]);
        assert!(plan.steps[0].sql.text.starts_with("DELETE FROM \"orders\""));
        assert!(plan.steps[1].sql.text.starts_with("DELETE FROM \"users\""));
    }

    #[test]
    fn test_cascade_update_inserts_orphan_removal_step() {
        let registry = registry();
        let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
        let plan = augmenter.plan_cascade("User", CascadeOp::Update).unwrap();
        let orphan = plan
            .steps
            .iter()
            .find(|s| s.orphan_removal)
            .expect("orphan-removal step");
        assert_eq!(orphan.entity, "Order");
        assert_eq!(orphan.operation, CascadeOp::Remove);
        assert!(orphan.sql.text.starts_with("DELETE FROM \"orders\""));
        // orphan deletion precedes the child update step
        let orphan_at = plan.steps.iter().position(|s| s.orphan_removal).unwrap();
        let child_update_at = plan
            .steps
            .iter()
            .position(|s| s.entity == "Order" && !s.orphan_removal)
            .unwrap();
        assert!(orphan_at < child_update_at);
    }

    #[test]
    fn test_cascade_cycle_is_guarded() {
        let registry = MetadataRegistry::new();
        registry.register(
            EntityMetadata::new("A", "a")
                .property(PropertyMeta::new("Id", SqlType::BigInt).primary_key(true))
                .relationship(
                    RelationshipMeta::new("B", RelationshipKind::OneToMany, "B", "id", "a_id")
                        .cascade(Cascade::PERSIST),
                ),
        );
        registry.register(
            EntityMetadata::new("B", "b")
                .property(PropertyMeta::new("Id", SqlType::BigInt).primary_key(true))
                .property(PropertyMeta::new("AId", SqlType::BigInt))
                .relationship(
                    RelationshipMeta::new("A", RelationshipKind::ManyToOne, "A", "a_id", "id")
                        .cascade(Cascade::PERSIST),
                ),
        );
        let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
        let plan = augmenter.plan_cascade("A", CascadeOp::Persist).unwrap();
        let entities: Vec<&str> = plan.steps.iter().map(|s| s.entity.as_str()).collect();
        assert_eq!(entities, vec!["A", "B"]);
    }

    #[test]
    fn test_cascade_refresh_selects_by_key() {
        let registry = registry();
        let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
        let plan = augmenter.plan_cascade("Team", CascadeOp::Refresh).unwrap();
        assert_eq!(plan.steps.len(), 1);
        assert!(
            plan.steps[0]
                .sql
                .text
                .ends_with("FROM \"teams\" WHERE \"id\" = @Id")
        );
    }

    #[test]
    fn test_many_to_many_collection_query_carries_link_keys() {
        let registry = MetadataRegistry::new();
        registry.register(
            EntityMetadata::new("Hero", "heroes")
                .property(PropertyMeta::new("Id", SqlType::BigInt).primary_key(true))
                .relationship(
                    RelationshipMeta::many_to_many(
                        "Powers",
                        "Power",
                        "hero_powers",
                        vec!["hero_id".to_string()],
                        vec!["power_id".to_string()],
                    )
                    .fetch(FetchStrategy::Eager),
                )
                .relationship(
                    RelationshipMeta::new("Missions", RelationshipKind::OneToMany, "Mission", "id", "hero_id")
                        .fetch(FetchStrategy::Eager),
                ),
        );
        registry.register(
            EntityMetadata::new("Power", "powers")
                .property(PropertyMeta::new("Id", SqlType::BigInt).primary_key(true))
                .property(PropertyMeta::new("Name", SqlType::Text)),
        );
        registry.register(
            EntityMetadata::new("Mission", "missions")
                .property(PropertyMeta::new("Id", SqlType::BigInt).primary_key(true))
                .property(PropertyMeta::new("HeroId", SqlType::BigInt)),
        );
        let base = SqlGenerator::new(&registry, Dialect::Postgres)
            .generate(&QueryIntent::select("Hero"))
            .unwrap();
        let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
        let FetchPlan::Partitioned { collections, .. } =
            augmenter.plan_fetch(&base, "Hero", &[]).unwrap()
        else {
            panic!("expected partitioned plan");
        };
        assert_eq!(collections.len(), 1);
        let q = &collections[0];
        assert_eq!(q.relationship, "Missions");
        assert_eq!(q.child_key_columns, vec!["hero_id"]);
    }
}
