//! Relationship augmentation: eager-load planning and cascade walks.

use cpql::{
    Cascade, CascadeOp, Dialect, EntityMetadata, FetchPlan, FetchStrategy, MetadataRegistry,
    PropertyMeta, QueryIntent, RelationshipAugmenter, RelationshipKind, RelationshipMeta,
    SqlGenerator, SqlType,
};
use pretty_assertions::assert_eq;

/// Blog-shaped model: a Post has many Comments and many Tags (both
/// eager), and an optional Author.
fn registry() -> MetadataRegistry {
    let registry = MetadataRegistry::new();
    registry.register(
        EntityMetadata::new("Post", "posts")
            .property(
                PropertyMeta::new("Id", SqlType::BigInt)
                    .primary_key(true)
                    .generated(true),
            )
            .property(PropertyMeta::new("Title", SqlType::Text))
            .property(PropertyMeta::new("AuthorId", SqlType::BigInt).nullable(true))
            .relationship(
                RelationshipMeta::new("Author", RelationshipKind::ManyToOne, "Author", "author_id", "id")
                    .optional(true)
                    .fetch(FetchStrategy::Eager),
            )
            .relationship(
                RelationshipMeta::new("Comments", RelationshipKind::OneToMany, "Comment", "id", "post_id")
                    .fetch(FetchStrategy::Eager)
                    .cascade(Cascade::PERSIST | Cascade::UPDATE | Cascade::REMOVE)
                    .orphan_removal(true),
            )
            .relationship(
                RelationshipMeta::new("Tags", RelationshipKind::OneToMany, "PostTag", "id", "post_id")
                    .fetch(FetchStrategy::Eager),
            ),
    );
    registry.register(
        EntityMetadata::new("Author", "authors")
            .property(
                PropertyMeta::new("Id", SqlType::BigInt)
                    .primary_key(true)
                    .generated(true),
            )
            .property(PropertyMeta::new("Name", SqlType::Text)),
    );
    registry.register(
        EntityMetadata::new("Comment", "comments")
            .property(
                PropertyMeta::new("Id", SqlType::BigInt)
                    .primary_key(true)
                    .generated(true),
            )
            .property(PropertyMeta::new("PostId", SqlType::BigInt))
            .property(PropertyMeta::new("Body", SqlType::Text)),
    );
    registry.register(
        EntityMetadata::new("PostTag", "post_tags")
            .property(
                PropertyMeta::new("Id", SqlType::BigInt)
                    .primary_key(true)
                    .generated(true),
            )
            .property(PropertyMeta::new("PostId", SqlType::BigInt))
            .property(PropertyMeta::new("Label", SqlType::Text)),
    );
    registry
}

#[test]
fn two_eager_collections_never_share_a_join() {
    let registry = registry();
    let base = SqlGenerator::new(&registry, Dialect::Postgres)
        .generate(&QueryIntent::select("Post"))
        .unwrap();
    let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
    let plan = augmenter.plan_fetch(&base, "Post", &[]).unwrap();

    let FetchPlan::Partitioned { root, collections } = plan else {
        panic!("two eager to-many relationships must partition the load");
    };

    // The root statement joins the to-one Author and the first
    // collection, never both collections: a single statement spanning
    // both would return |comments| x |tags| rows per post.
    assert!(root.text.contains("LEFT JOIN \"authors\""));
    assert!(root.text.contains("JOIN \"comments\""));
    assert!(!root.text.contains("JOIN \"post_tags\""));

    assert_eq!(collections.len(), 1);
    let tags = &collections[0];
    assert_eq!(tags.relationship, "Tags");
    assert_eq!(
        tags.sql.text,
        "SELECT \"post_tags\".\"id\", \"post_tags\".\"post_id\", \"post_tags\".\"label\" FROM \"post_tags\" WHERE \"post_tags\".\"post_id\" = ANY(@RootKeys)"
    );
    // Merging is keyed by the root primary key.
    assert_eq!(tags.root_key_columns, vec!["id"]);
    assert_eq!(tags.child_key_columns, vec!["post_id"]);
}

#[test]
fn split_markers_cover_each_joined_relation() {
    let registry = registry();
    let base = SqlGenerator::new(&registry, Dialect::Postgres)
        .generate(&QueryIntent::select("Post"))
        .unwrap();
    let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
    let FetchPlan::Partitioned { root, .. } = augmenter.plan_fetch(&base, "Post", &[]).unwrap()
    else {
        panic!("expected partitioned plan");
    };
    assert_eq!(root.split_on, vec!["authors__id", "comments__id"]);
}

#[test]
fn explicit_include_of_lazy_relationship_joins_it() {
    let registry = MetadataRegistry::new();
    registry.register(
        EntityMetadata::new("Comment", "comments")
            .property(PropertyMeta::new("Id", SqlType::BigInt).primary_key(true))
            .property(PropertyMeta::new("PostId", SqlType::BigInt))
            .relationship(RelationshipMeta::new(
                "Post",
                RelationshipKind::ManyToOne,
                "Post",
                "post_id",
                "id",
            )),
    );
    registry.register(
        EntityMetadata::new("Post", "posts")
            .property(PropertyMeta::new("Id", SqlType::BigInt).primary_key(true))
            .property(PropertyMeta::new("Title", SqlType::Text)),
    );
    let base = SqlGenerator::new(&registry, Dialect::Postgres)
        .generate(&QueryIntent::select("Comment"))
        .unwrap();
    let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);

    // Lazy and not included: untouched.
    let FetchPlan::Joined(untouched) = augmenter.plan_fetch(&base, "Comment", &[]).unwrap()
    else {
        panic!("expected joined plan");
    };
    assert_eq!(untouched, base);

    // Included by name: INNER JOIN (the relationship is required).
    let FetchPlan::Joined(joined) = augmenter.plan_fetch(&base, "Comment", &["Post"]).unwrap()
    else {
        panic!("expected joined plan");
    };
    assert!(joined.text.contains("INNER JOIN \"posts\" ON \"comments\".\"post_id\" = \"posts\".\"id\""));
    assert_eq!(joined.split_on, vec!["posts__id"]);
}

#[test]
fn cascade_insert_emits_parent_before_children() {
    let registry = registry();
    let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
    let plan = augmenter.plan_cascade("Post", CascadeOp::Persist).unwrap();

    let order: Vec<(&str, bool)> = plan
        .steps
        .iter()
        .map(|s| (s.entity.as_str(), s.sql.text.starts_with("INSERT")))
        .collect();
    assert_eq!(order, vec![("Post", true), ("Comment", true)]);

    let parent_at = plan.steps.iter().position(|s| s.entity == "Post").unwrap();
    let child_at = plan.steps.iter().position(|s| s.entity == "Comment").unwrap();
    assert!(parent_at < child_at, "parent INSERT must precede child INSERT");
}

#[test]
fn cascade_remove_emits_children_before_parent() {
    let registry = registry();
    let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
    let plan = augmenter.plan_cascade("Post", CascadeOp::Remove).unwrap();

    let entities: Vec<&str> = plan.steps.iter().map(|s| s.entity.as_str()).collect();
    assert_eq!(entities, vec!["Comment", "Post"]);
    assert!(plan.steps.iter().all(|s| s.sql.text.starts_with("DELETE FROM ")));
}

#[test]
fn cascade_update_plans_orphan_removal() {
    let registry = registry();
    let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
    let plan = augmenter.plan_cascade("Post", CascadeOp::Update).unwrap();

    let orphan = plan
        .steps
        .iter()
        .find(|s| s.orphan_removal)
        .expect("orphan-removal step for Comments");
    assert_eq!(orphan.entity, "Comment");
    assert_eq!(orphan.relationship.as_deref(), Some("Comments"));
    assert_eq!(orphan.operation, CascadeOp::Remove);
    assert_eq!(
        orphan.sql.text,
        "DELETE FROM \"comments\" WHERE \"id\" = @Id"
    );
}

#[test]
fn cascade_cycles_terminate() {
    let registry = MetadataRegistry::new();
    registry.register(
        EntityMetadata::new("Employee", "employees")
            .property(PropertyMeta::new("Id", SqlType::BigInt).primary_key(true))
            .property(PropertyMeta::new("ManagerId", SqlType::BigInt).nullable(true))
            .relationship(
                RelationshipMeta::new(
                    "Reports",
                    RelationshipKind::OneToMany,
                    "Employee",
                    "id",
                    "manager_id",
                )
                .cascade(Cascade::REMOVE),
            ),
    );
    let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
    let plan = augmenter.plan_cascade("Employee", CascadeOp::Remove).unwrap();
    // The self-referential walk visits the entity once.
    assert_eq!(plan.steps.len(), 1);
    assert_eq!(plan.steps[0].entity, "Employee");
}

#[test]
fn cascade_respects_flag_gating() {
    let registry = registry();
    let augmenter = RelationshipAugmenter::new(&registry, Dialect::Postgres);
    // Tags declares no cascade flags: a Persist walk never reaches it.
    let plan = augmenter.plan_cascade("Post", CascadeOp::Persist).unwrap();
    assert!(plan.steps.iter().all(|s| s.entity != "PostTag"));
    // Merge is not in the Comments cascade set either.
    let plan = augmenter.plan_cascade("Post", CascadeOp::Merge).unwrap();
    assert_eq!(plan.steps.len(), 1);
}
