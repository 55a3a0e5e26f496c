//! Method-name convention analysis.
//!
//! Turns a repository method name like `FindTop5ByStatusOrderByCreatedAtDesc`
//! into a [`QueryIntent`]. Analysis is a pure function of its inputs:
//! analyzing the same name twice yields identical intents.
//!
//! # Tokenizer limitation
//!
//! Keyword matching is greedy and unescaped. A property whose name ends
//! with an operator keyword (`StatusIn`, `PriorityLike`) or embeds a
//! separator followed by an uppercase letter (`TotalOrAmount`) is
//! mis-split. There is no escape syntax; use [`validate_metadata`] to
//! reject such property names before they reach a method name.

use cpql_core::{
    EntityMetadata, Error, LikeShape, LogicalOp, ParamRef, PredicateNode, QueryIntent, QueryType,
    Result, SortDirection, Value,
};

use crate::keywords::{
    ConditionOp, IGNORE_CASE, SUFFIX_OPERATORS, classify_prefix, strip_operator,
};
use cpql_core::CompareOp;

/// Shape of the repository method's return type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// Returns a collection of entities.
    Collection,
    /// Returns at most one entity. A scalar-shaped Select with no
    /// explicit `First`/`Top` modifier gets `limit = 1`.
    Scalar,
}

/// The analysis result: the derived intent plus the raw property/
/// separator structure for callers that want to inspect it.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodQuery {
    /// The derived query intent.
    pub intent: QueryIntent,
    /// Property names in predicate order.
    pub properties: Vec<String>,
    /// Separators between conditions; one fewer than `properties`.
    pub separators: Vec<LogicalOp>,
}

/// Analyzes repository method names for one entity.
#[derive(Debug, Clone)]
pub struct MethodConventionAnalyzer {
    entity: String,
}

impl MethodConventionAnalyzer {
    /// Create an analyzer for the named entity.
    pub fn for_entity(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
        }
    }

    /// Analyze a method name.
    ///
    /// `parameters` are the declared parameter names in order; conditions
    /// consume them positionally, falling back to `p{index}` when the
    /// declaration runs short. An unrecognized prefix yields an intent
    /// with [`QueryType::Unknown`] — not an error.
    pub fn analyze(
        &self,
        method: &str,
        parameters: &[&str],
        shape: ReturnShape,
    ) -> MethodQuery {
        let name = method.strip_suffix("Async").unwrap_or(method);
        let (query_type, rest) = classify_prefix(name);

        if query_type == QueryType::Unknown {
            tracing::warn!(method, "no convention prefix matched");
            return MethodQuery {
                intent: QueryIntent::new(QueryType::Unknown, self.entity.clone()),
                properties: Vec::new(),
                separators: Vec::new(),
            };
        }

        let mut intent = QueryIntent::new(query_type, self.entity.clone());
        let mut rest = rest;

        if let Some(r) = rest.strip_prefix("Distinct") {
            intent.distinct = true;
            rest = r;
        }
        for modifier in ["First", "Top"] {
            if let Some(r) = rest.strip_prefix(modifier) {
                let (limit, r) = take_digits(r);
                intent.limit = Some(limit.unwrap_or(1));
                rest = r;
                break;
            }
        }

        // Everything after `By` is the predicate segment; without `By`
        // only an ordering suffix is meaningful (`FindAllOrderByName`).
        let (where_seg, order_seg) = match rest.find("OrderBy") {
            Some(i) => (&rest[..i], Some(&rest[i + "OrderBy".len()..])),
            None => (rest, None),
        };

        let mut properties = Vec::new();
        let mut separators = Vec::new();

        if let Some(conditions) = where_seg.strip_prefix("By") {
            let (parts, seps) = split_conditions(conditions);
            separators = seps;
            let mut binder = ParamBinder::new(parameters);
            let mut predicate: Option<PredicateNode> = None;
            for (i, part) in parts.iter().enumerate() {
                let (node, property) = parse_condition(part, &mut binder);
                properties.push(property);
                predicate = Some(match predicate {
                    None => node,
                    Some(prev) => PredicateNode::Logical {
                        left: Box::new(prev),
                        op: separators[i - 1],
                        right: Box::new(node),
                    },
                });
            }
            intent.predicate = predicate;
        }

        if let Some(order_seg) = order_seg {
            for term in order_seg.split("Then").filter(|t| !t.is_empty()) {
                let (property, direction) = if let Some(p) = term.strip_suffix("Desc") {
                    (p, SortDirection::Desc)
                } else if let Some(p) = term.strip_suffix("Asc") {
                    (p, SortDirection::Asc)
                } else {
                    (term, SortDirection::Asc)
                };
                intent.order_by.push(cpql_core::OrderTerm {
                    property: property.to_string(),
                    direction,
                });
            }
        }

        if shape == ReturnShape::Scalar
            && query_type == QueryType::Select
            && intent.limit.is_none()
        {
            intent.limit = Some(1);
        }

        tracing::debug!(
            method,
            ?query_type,
            conditions = properties.len(),
            "analyzed method name"
        );

        MethodQuery {
            intent,
            properties,
            separators,
        }
    }
}

/// Reject property names the greedy tokenizer would mis-split.
///
/// A property name that ends with an operator keyword, equals or embeds
/// an `And`/`Or` separator before an uppercase letter, or contains an
/// `OrderBy`/`Then`/`IgnoreCase` marker cannot be referenced from a
/// method name unambiguously. There is no escape syntax; such names must
/// be renamed.
pub fn validate_metadata(metadata: &EntityMetadata) -> Result<()> {
    for property in &metadata.properties {
        let name = property.name.as_str();
        for (keyword, _) in SUFFIX_OPERATORS {
            if name.len() > keyword.len() && name.ends_with(keyword) {
                return Err(Error::AmbiguousKeyword {
                    property: name.to_string(),
                    keyword: (*keyword).to_string(),
                });
            }
        }
        for marker in ["And", "Or", "OrderBy", "Then", IGNORE_CASE] {
            if find_separator(name, marker).is_some() {
                return Err(Error::AmbiguousKeyword {
                    property: name.to_string(),
                    keyword: marker.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Binds conditions to declared parameter names, falling back to
/// positional `p{index}` names.
struct ParamBinder<'a> {
    declared: &'a [&'a str],
    next: usize,
}

impl<'a> ParamBinder<'a> {
    fn new(declared: &'a [&'a str]) -> Self {
        Self { declared, next: 0 }
    }

    fn next_param(&mut self) -> ParamRef {
        let index = self.next;
        self.next += 1;
        match self.declared.get(index) {
            Some(name) => ParamRef::Named((*name).to_string()),
            None => ParamRef::Named(format!("p{index}")),
        }
    }
}

/// Split a predicate segment on `And`/`Or` separators.
///
/// A separator only splits when it is followed by an uppercase letter
/// (the start of the next condition) and is not at the start of the
/// segment. This is the greedy, unescaped scan documented at module
/// level.
fn split_conditions(segment: &str) -> (Vec<&str>, Vec<LogicalOp>) {
    let mut parts = Vec::new();
    let mut separators = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let bytes = segment.as_bytes();
    while i < bytes.len() {
        if !segment.is_char_boundary(i) {
            i += 1;
            continue;
        }
        let found = if i > start && segment[i..].starts_with("And") {
            Some(("And", LogicalOp::And))
        } else if i > start && segment[i..].starts_with("Or") {
            Some(("Or", LogicalOp::Or))
        } else {
            None
        };
        if let Some((text, op)) = found {
            let after = i + text.len();
            let next_is_upper = bytes
                .get(after)
                .is_some_and(|b| b.is_ascii_uppercase());
            if next_is_upper {
                parts.push(&segment[start..i]);
                separators.push(op);
                start = after;
                i = after;
                continue;
            }
        }
        i += 1;
    }
    if start < segment.len() {
        parts.push(&segment[start..]);
    }
    (parts, separators)
}

/// Find a marker keyword inside (not at the end of) a property name,
/// followed by an uppercase letter — the position where the scanner
/// would split.
fn find_separator(name: &str, marker: &str) -> Option<usize> {
    let mut search = 0;
    while let Some(rel) = name[search..].find(marker) {
        let i = search + rel;
        let after = i + marker.len();
        if i > 0 && name.as_bytes().get(after).is_some_and(|b| b.is_ascii_uppercase()) {
            return Some(i);
        }
        search = i + 1;
    }
    None
}

/// Parse one condition segment into a predicate node, consuming
/// parameters as the operator requires.
fn parse_condition(part: &str, binder: &mut ParamBinder<'_>) -> (PredicateNode, String) {
    let (part, ignore_case) = match part.strip_suffix(IGNORE_CASE) {
        Some(p) if !p.is_empty() => (p, true),
        _ => (part, false),
    };
    let (property, op) = strip_operator(part);
    let property = property.to_string();

    let node = match op {
        ConditionOp::Equals => PredicateNode::Comparison {
            property: property.clone(),
            op: CompareOp::Eq,
            param: binder.next_param(),
            ignore_case,
        },
        ConditionOp::NotEquals => PredicateNode::Comparison {
            property: property.clone(),
            op: CompareOp::Ne,
            param: binder.next_param(),
            ignore_case,
        },
        ConditionOp::GreaterThan | ConditionOp::After => PredicateNode::Comparison {
            property: property.clone(),
            op: CompareOp::Gt,
            param: binder.next_param(),
            ignore_case,
        },
        ConditionOp::GreaterThanEqual => PredicateNode::Comparison {
            property: property.clone(),
            op: CompareOp::Ge,
            param: binder.next_param(),
            ignore_case,
        },
        ConditionOp::LessThan | ConditionOp::Before => PredicateNode::Comparison {
            property: property.clone(),
            op: CompareOp::Lt,
            param: binder.next_param(),
            ignore_case,
        },
        ConditionOp::LessThanEqual => PredicateNode::Comparison {
            property: property.clone(),
            op: CompareOp::Le,
            param: binder.next_param(),
            ignore_case,
        },
        ConditionOp::True => PredicateNode::Comparison {
            property: property.clone(),
            op: CompareOp::Eq,
            param: ParamRef::Literal(Value::Bool(true)),
            ignore_case,
        },
        ConditionOp::False => PredicateNode::Comparison {
            property: property.clone(),
            op: CompareOp::Eq,
            param: ParamRef::Literal(Value::Bool(false)),
            ignore_case,
        },
        ConditionOp::StartingWith => PredicateNode::Like {
            property: property.clone(),
            param: binder.next_param(),
            shape: LikeShape::Prefix,
            negated: false,
            ignore_case,
        },
        ConditionOp::EndingWith => PredicateNode::Like {
            property: property.clone(),
            param: binder.next_param(),
            shape: LikeShape::Suffix,
            negated: false,
            ignore_case,
        },
        ConditionOp::Containing => PredicateNode::Like {
            property: property.clone(),
            param: binder.next_param(),
            shape: LikeShape::Substring,
            negated: false,
            ignore_case,
        },
        ConditionOp::Like => PredicateNode::Like {
            property: property.clone(),
            param: binder.next_param(),
            shape: LikeShape::Raw,
            negated: false,
            ignore_case,
        },
        ConditionOp::NotLike => PredicateNode::Like {
            property: property.clone(),
            param: binder.next_param(),
            shape: LikeShape::Raw,
            negated: true,
            ignore_case,
        },
        ConditionOp::Between => PredicateNode::Between {
            property: property.clone(),
            lo: binder.next_param(),
            hi: binder.next_param(),
        },
        ConditionOp::In => PredicateNode::InSet {
            property: property.clone(),
            param: binder.next_param(),
            negated: false,
        },
        ConditionOp::NotIn => PredicateNode::InSet {
            property: property.clone(),
            param: binder.next_param(),
            negated: true,
        },
        ConditionOp::IsNull => PredicateNode::NullCheck {
            property: property.clone(),
            is_null: true,
        },
        ConditionOp::NotNull => PredicateNode::NullCheck {
            property: property.clone(),
            is_null: false,
        },
    };

    (node, property)
}

/// Take leading ASCII digits from a segment, returning the parsed
/// number (None when there are no digits) and the remainder.
fn take_digits(segment: &str) -> (Option<u64>, &str) {
    let end = segment
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(segment.len());
    if end == 0 {
        return (None, segment);
    }
    (segment[..end].parse().ok(), &segment[end..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use cpql_core::{PropertyMeta, SqlType};

    fn analyze(method: &str, params: &[&str]) -> MethodQuery {
        MethodConventionAnalyzer::for_entity("User").analyze(method, params, ReturnShape::Collection)
    }

    #[test]
    fn test_find_by_email_order_by_name_desc() {
        let q = analyze("FindByEmailOrderByNameDesc", &["email"]);
        assert_eq!(q.intent.query_type, QueryType::Select);
        assert_eq!(q.properties, vec!["Email"]);
        assert_eq!(q.intent.order_by.len(), 1);
        assert_eq!(q.intent.order_by[0].property, "Name");
        assert_eq!(q.intent.order_by[0].direction, SortDirection::Desc);
    }

    #[test]
    fn test_find_top5_by_status_order_by_created_at_desc() {
        let q = analyze("FindTop5ByStatusOrderByCreatedAtDesc", &["status"]);
        assert_eq!(q.intent.limit, Some(5));
        assert_eq!(q.properties, vec!["Status"]);
        assert_eq!(q.intent.order_by[0].property, "CreatedAt");
        assert_eq!(q.intent.order_by[0].direction, SortDirection::Desc);
    }

    #[test]
    fn test_count_by_country_and_is_active() {
        let q = analyze("CountByCountryAndIsActive", &["country", "active"]);
        assert_eq!(q.intent.query_type, QueryType::Count);
        assert_eq!(q.properties, vec!["Country", "IsActive"]);
        assert_eq!(q.separators, vec![LogicalOp::And]);
    }

    #[test]
    fn test_analysis_is_idempotent() {
        let a = analyze("FindByEmailOrderByNameDesc", &["email"]);
        let b = analyze("FindByEmailOrderByNameDesc", &["email"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_async_suffix_stripped() {
        let q = analyze("FindByEmailAsync", &["email"]);
        assert_eq!(q.properties, vec!["Email"]);
    }

    #[test]
    fn test_first_without_digits_defaults_to_one() {
        let q = analyze("FindFirstByEmail", &["email"]);
        assert_eq!(q.intent.limit, Some(1));
    }

    #[test]
    fn test_distinct_then_top() {
        let q = analyze("FindDistinctTop10ByCountry", &["country"]);
        assert!(q.intent.distinct);
        assert_eq!(q.intent.limit, Some(10));
    }

    #[test]
    fn test_unknown_prefix_is_a_value_not_an_error() {
        let q = analyze("FetchByEmail", &["email"]);
        assert_eq!(q.intent.query_type, QueryType::Unknown);
        assert!(q.intent.predicate.is_none());
    }

    #[test]
    fn test_between_consumes_two_parameters() {
        let q = analyze("FindByAgeBetween", &["lo", "hi"]);
        let Some(PredicateNode::Between { lo, hi, .. }) = q.intent.predicate else {
            panic!("expected between predicate");
        };
        assert_eq!(lo, ParamRef::Named("lo".to_string()));
        assert_eq!(hi, ParamRef::Named("hi".to_string()));
    }

    #[test]
    fn test_true_keyword_consumes_no_parameter() {
        let q = analyze("FindByIsActiveTrueAndCountry", &["country"]);
        assert_eq!(q.properties, vec!["IsActive", "Country"]);
        let Some(PredicateNode::Logical { left, right, .. }) = q.intent.predicate else {
            panic!("expected logical predicate");
        };
        let PredicateNode::Comparison { param, .. } = *left else {
            panic!("expected comparison");
        };
        assert_eq!(param, ParamRef::Literal(Value::Bool(true)));
        let PredicateNode::Comparison { param, .. } = *right else {
            panic!("expected comparison");
        };
        assert_eq!(param, ParamRef::Named("country".to_string()));
    }

    #[test]
    fn test_ignore_case_modifier() {
        let q = analyze("FindByEmailIgnoreCase", &["email"]);
        let Some(PredicateNode::Comparison { ignore_case, .. }) = q.intent.predicate else {
            panic!("expected comparison");
        };
        assert!(ignore_case);
    }

    #[test]
    fn test_containing_maps_to_substring_like() {
        let q = analyze("FindByNameContaining", &["fragment"]);
        let Some(PredicateNode::Like { shape, negated, .. }) = q.intent.predicate else {
            panic!("expected like predicate");
        };
        assert_eq!(shape, LikeShape::Substring);
        assert!(!negated);
    }

    #[test]
    fn test_or_separator() {
        let q = analyze("FindByCityOrCountry", &["city", "country"]);
        assert_eq!(q.separators, vec![LogicalOp::Or]);
        assert_eq!(q.properties, vec!["City", "Country"]);
    }

    #[test]
    fn test_multi_term_ordering_with_then() {
        let q = analyze("FindByCountryOrderByNameAscThenAgeDesc", &["country"]);
        assert_eq!(q.intent.order_by.len(), 2);
        assert_eq!(q.intent.order_by[0].property, "Name");
        assert_eq!(q.intent.order_by[0].direction, SortDirection::Asc);
        assert_eq!(q.intent.order_by[1].property, "Age");
        assert_eq!(q.intent.order_by[1].direction, SortDirection::Desc);
    }

    #[test]
    fn test_find_all_without_by_has_no_predicate() {
        let q = analyze("FindAllOrderByName", &[]);
        assert!(q.intent.predicate.is_none());
        assert_eq!(q.intent.order_by.len(), 1);
    }

    #[test]
    fn test_missing_declared_parameters_fall_back_to_positional_names() {
        let q = analyze("FindByCityAndCountry", &["city"]);
        let Some(PredicateNode::Logical { right, .. }) = q.intent.predicate else {
            panic!("expected logical predicate");
        };
        let PredicateNode::Comparison { param, .. } = *right else {
            panic!("expected comparison");
        };
        assert_eq!(param, ParamRef::Named("p1".to_string()));
    }

    #[test]
    fn test_scalar_shape_defaults_limit_to_one() {
        let q = MethodConventionAnalyzer::for_entity("User").analyze(
            "FindByEmail",
            &["email"],
            ReturnShape::Scalar,
        );
        assert_eq!(q.intent.limit, Some(1));
        // an explicit Top wins
        let q = MethodConventionAnalyzer::for_entity("User").analyze(
            "FindTop3ByEmail",
            &["email"],
            ReturnShape::Scalar,
        );
        assert_eq!(q.intent.limit, Some(3));
    }

    #[test]
    fn test_delete_and_exists_prefixes() {
        let q = analyze("DeleteByStatus", &["status"]);
        assert_eq!(q.intent.query_type, QueryType::Delete);
        let q = analyze("ExistsByEmail", &["email"]);
        assert_eq!(q.intent.query_type, QueryType::Exists);
        let q = analyze("HasByEmail", &["email"]);
        assert_eq!(q.intent.query_type, QueryType::Exists);
    }

    #[test]
    fn test_validate_metadata_rejects_keyword_suffix() {
        let meta = EntityMetadata::new("Job", "jobs")
            .property(PropertyMeta::new("StatusIn", SqlType::Text));
        let err = validate_metadata(&meta).unwrap_err();
        assert_eq!(
            err,
            Error::AmbiguousKeyword {
                property: "StatusIn".to_string(),
                keyword: "In".to_string()
            }
        );
    }

    #[test]
    fn test_validate_metadata_rejects_embedded_separator() {
        let meta = EntityMetadata::new("Ledger", "ledgers")
            .property(PropertyMeta::new("TotalOrAmount", SqlType::BigInt));
        assert!(validate_metadata(&meta).is_err());
    }

    #[test]
    fn test_validate_metadata_accepts_clean_names() {
        let meta = EntityMetadata::new("User", "users")
            .property(PropertyMeta::new("IsActive", SqlType::Boolean))
            .property(PropertyMeta::new("Margin", SqlType::Double))
            .property(PropertyMeta::new("Brand", SqlType::Text));
        assert!(validate_metadata(&meta).is_ok());
    }
}
