//! Entity metadata: the table/column/relationship description consumed by
//! the generation engine.
//!
//! Metadata is *produced* elsewhere (attribute scanning, code generation,
//! or hand construction) and handed to this engine as plain data. The
//! engine never inspects host-language types; everything it needs to know
//! about an entity is in [`EntityMetadata`].

use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};
use std::ops::BitOr;

use crate::types::SqlType;

/// Metadata about a single mapped property/column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMeta {
    /// Property name on the entity (e.g. `"CreatedAt"`).
    pub name: String,
    /// Database column name (e.g. `"created_at"`).
    pub column: String,
    /// SQL type tag for this property.
    pub sql_type: SqlType,
    /// Whether this column is nullable.
    pub nullable: bool,
    /// Whether this column has a unique constraint.
    pub unique: bool,
    /// Whether this property is part of the primary key.
    pub primary_key: bool,
    /// Whether the database generates this value (identity/serial).
    pub generated: bool,
    /// Maximum length for string/binary columns.
    pub length: Option<u32>,
    /// Precision for decimal columns (total digits).
    pub precision: Option<u8>,
    /// Scale for decimal columns (digits after the decimal point).
    pub scale: Option<u8>,
}

impl PropertyMeta {
    /// Create a new property with the column name defaulted to the
    /// snake_case form of the property name.
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        let name = name.into();
        let column = name.to_case(Case::Snake);
        Self {
            name,
            column,
            sql_type,
            nullable: false,
            unique: false,
            primary_key: false,
            generated: false,
            length: None,
            precision: None,
            scale: None,
        }
    }

    /// Override the database column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Set the nullable flag.
    #[must_use]
    pub fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Set the unique flag.
    #[must_use]
    pub fn unique(mut self, value: bool) -> Self {
        self.unique = value;
        self
    }

    /// Mark this property as (part of) the primary key.
    #[must_use]
    pub fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Mark this property as database-generated (identity column).
    #[must_use]
    pub fn generated(mut self, value: bool) -> Self {
        self.generated = value;
        self
    }

    /// Set the maximum length for string/binary columns.
    #[must_use]
    pub fn length(mut self, value: u32) -> Self {
        self.length = Some(value);
        self
    }

    /// Set precision and scale for decimal columns.
    #[must_use]
    pub fn decimal_precision(mut self, precision: u8, scale: u8) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }
}

/// The kind of relationship between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipKind {
    /// One row on each side.
    OneToOne,
    /// One parent row, many child rows.
    OneToMany,
    /// Many child rows point at one parent row.
    ManyToOne,
    /// Many-to-many via a join table.
    ManyToMany,
}

impl RelationshipKind {
    /// Whether this relationship resolves to a collection.
    pub const fn is_to_many(self) -> bool {
        matches!(self, RelationshipKind::OneToMany | RelationshipKind::ManyToMany)
    }
}

/// Fetch strategy for a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FetchStrategy {
    /// Loaded immediately via join or secondary query.
    Eager,
    /// Loaded on demand.
    #[default]
    Lazy,
}

/// Bitset of lifecycle operations propagated from a parent entity to
/// related entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cascade(u8);

impl Cascade {
    /// No cascading.
    pub const NONE: Cascade = Cascade(0);
    /// Propagate inserts.
    pub const PERSIST: Cascade = Cascade(1);
    /// Propagate updates.
    pub const UPDATE: Cascade = Cascade(1 << 1);
    /// Propagate deletes.
    pub const REMOVE: Cascade = Cascade(1 << 2);
    /// Propagate merges.
    pub const MERGE: Cascade = Cascade(1 << 3);
    /// Propagate refreshes.
    pub const REFRESH: Cascade = Cascade(1 << 4);
    /// All lifecycle operations.
    pub const ALL: Cascade = Cascade(0b1_1111);

    /// Check whether every flag in `other` is set in `self`.
    pub const fn contains(self, other: Cascade) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check whether no flags are set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Cascade {
    type Output = Cascade;

    fn bitor(self, rhs: Cascade) -> Cascade {
        Cascade(self.0 | rhs.0)
    }
}

/// Join descriptor: either a foreign-key column pair or a join table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinSpec {
    /// Foreign-key column join. `local` is the column on the owning side,
    /// `remote` the referenced column on the target side.
    Column { local: String, remote: String },
    /// Join table for many-to-many relationships. Column lists are
    /// ordered to match the respective primary keys.
    Table {
        table: String,
        local_columns: Vec<String>,
        remote_columns: Vec<String>,
    },
}

/// Metadata about a relationship between two entities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipMeta {
    /// Name of the relationship property (e.g. `"Orders"`).
    pub name: String,
    /// Kind of relationship.
    pub kind: RelationshipKind,
    /// The related entity's name (registry key).
    pub target: String,
    /// The property on the target that owns the relationship, for the
    /// non-owning side of a bidirectional mapping.
    pub mapped_by: Option<String>,
    /// Lifecycle operations propagated to the target.
    pub cascade: Cascade,
    /// Eager or lazy loading.
    pub fetch: FetchStrategy,
    /// Delete children that drop out of an updated collection.
    pub orphan_removal: bool,
    /// Whether this side owns the foreign key / join table.
    pub owner: bool,
    /// Whether the association may be absent (drives LEFT vs INNER join).
    pub optional: bool,
    /// Column or join-table descriptor.
    pub join: JoinSpec,
}

impl RelationshipMeta {
    /// Create a relationship joined through a foreign-key column pair.
    pub fn new(
        name: impl Into<String>,
        kind: RelationshipKind,
        target: impl Into<String>,
        local: impl Into<String>,
        remote: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            target: target.into(),
            mapped_by: None,
            cascade: Cascade::NONE,
            fetch: FetchStrategy::Lazy,
            orphan_removal: false,
            owner: true,
            optional: false,
            join: JoinSpec::Column {
                local: local.into(),
                remote: remote.into(),
            },
        }
    }

    /// Create a many-to-many relationship through a join table.
    pub fn many_to_many(
        name: impl Into<String>,
        target: impl Into<String>,
        table: impl Into<String>,
        local_columns: Vec<String>,
        remote_columns: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: RelationshipKind::ManyToMany,
            target: target.into(),
            mapped_by: None,
            cascade: Cascade::NONE,
            fetch: FetchStrategy::Lazy,
            orphan_removal: false,
            owner: true,
            optional: false,
            join: JoinSpec::Table {
                table: table.into(),
                local_columns,
                remote_columns,
            },
        }
    }

    /// Set the owning-side property name for a non-owning mapping.
    #[must_use]
    pub fn mapped_by(mut self, property: impl Into<String>) -> Self {
        self.mapped_by = Some(property.into());
        self.owner = false;
        self
    }

    /// Set the cascade flags.
    #[must_use]
    pub fn cascade(mut self, cascade: Cascade) -> Self {
        self.cascade = cascade;
        self
    }

    /// Set the fetch strategy.
    #[must_use]
    pub fn fetch(mut self, fetch: FetchStrategy) -> Self {
        self.fetch = fetch;
        self
    }

    /// Enable orphan removal.
    #[must_use]
    pub fn orphan_removal(mut self, value: bool) -> Self {
        self.orphan_removal = value;
        self
    }

    /// Mark the association as optional (LEFT join on the read path).
    #[must_use]
    pub fn optional(mut self, value: bool) -> Self {
        self.optional = value;
        self
    }
}

/// Complete table/column/relationship description for one entity type.
///
/// Invariant: once registered, metadata for an entity never changes —
/// identical entity names always resolve to structurally identical
/// metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    /// Entity name (registry key), e.g. `"User"`.
    pub entity: String,
    /// Table name, e.g. `"users"`.
    pub table: String,
    /// Optional schema qualifier.
    pub schema: Option<String>,
    /// Ordered property descriptors.
    pub properties: Vec<PropertyMeta>,
    /// Primary-key property names, in key-declaration order (1..n).
    pub primary_key: Vec<String>,
    /// Relationship descriptors.
    pub relationships: Vec<RelationshipMeta>,
}

impl EntityMetadata {
    /// Create metadata with no properties or relationships.
    pub fn new(entity: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            table: table.into(),
            schema: None,
            properties: Vec::new(),
            primary_key: Vec::new(),
            relationships: Vec::new(),
        }
    }

    /// Set the schema qualifier.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Add a property. Primary-key properties are appended to the key
    /// list in the order they are added.
    #[must_use]
    pub fn property(mut self, property: PropertyMeta) -> Self {
        if property.primary_key {
            self.primary_key.push(property.name.clone());
        }
        self.properties.push(property);
        self
    }

    /// Add a relationship.
    #[must_use]
    pub fn relationship(mut self, relationship: RelationshipMeta) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Look up a property by name.
    pub fn find_property(&self, name: &str) -> Option<&PropertyMeta> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Look up a relationship by name.
    pub fn find_relationship(&self, name: &str) -> Option<&RelationshipMeta> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// The primary-key properties, in declaration order.
    pub fn key_properties(&self) -> Vec<&PropertyMeta> {
        self.primary_key
            .iter()
            .filter_map(|name| self.find_property(name))
            .collect()
    }

    /// Whether the primary key spans more than one property.
    pub fn has_composite_key(&self) -> bool {
        self.primary_key.len() > 1
    }

    /// The single database-generated key property, if there is exactly one.
    pub fn identity_property(&self) -> Option<&PropertyMeta> {
        let mut generated = self.key_properties().into_iter().filter(|p| p.generated);
        let first = generated.next()?;
        if generated.next().is_some() {
            return None;
        }
        Some(first)
    }
}
