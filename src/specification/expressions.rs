//! Value objects held by a specification
//!
//! Each expression keeps its descriptor (what the store translates) next to
//! a lazily compiled function (what the in-memory evaluators run). The
//! function is compiled at most once per expression.

use crate::core::entity::Entity;
use crate::core::error::SpecResult;
use crate::core::field::FieldValue;
use crate::specification::criterion::{Criterion, Predicate};
use crate::specification::like::LikePattern;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

/// A compiled sort key extractor
pub type KeySelector<T> = Arc<dyn Fn(&T) -> FieldValue + Send + Sync>;

/// A compiled text selector used by search criteria
pub type TextSelector<T> = Arc<dyn Fn(&T) -> Option<String> + Send + Sync>;

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// One filter of a specification; filters combine with logical AND
pub struct WhereExpression<T> {
    criterion: Criterion,
    compiled: OnceLock<SpecResult<Predicate<T>>>,
}

impl<T: Entity> WhereExpression<T> {
    pub fn new(criterion: Criterion) -> Self {
        Self {
            criterion,
            compiled: OnceLock::new(),
        }
    }

    /// The descriptor used by translated queries
    pub fn criterion(&self) -> &Criterion {
        &self.criterion
    }

    /// The compiled predicate used by in-memory evaluation
    pub fn predicate(&self) -> SpecResult<Predicate<T>> {
        self.compiled
            .get_or_init(|| self.criterion.compile::<T>())
            .clone()
    }
}

impl<T> fmt::Debug for WhereExpression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhereExpression")
            .field("criterion", &self.criterion)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// How a sort key participates in the ordering chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    OrderBy,
    OrderByDescending,
    ThenBy,
    ThenByDescending,
}

/// Sort direction of one key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Primary keys define the base order, secondary keys break ties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortRole {
    Primary,
    Secondary,
}

impl OrderType {
    pub fn role(self) -> SortRole {
        match self {
            OrderType::OrderBy | OrderType::OrderByDescending => SortRole::Primary,
            OrderType::ThenBy | OrderType::ThenByDescending => SortRole::Secondary,
        }
    }

    pub fn direction(self) -> SortDirection {
        match self {
            OrderType::OrderBy | OrderType::ThenBy => SortDirection::Ascending,
            OrderType::OrderByDescending | OrderType::ThenByDescending => {
                SortDirection::Descending
            }
        }
    }
}

/// One sort key of a specification
pub struct OrderExpression<T> {
    field: String,
    order_type: OrderType,
    key: OnceLock<KeySelector<T>>,
}

impl<T: Entity> OrderExpression<T> {
    pub fn new(field: impl Into<String>, order_type: OrderType) -> Self {
        Self {
            field: field.into(),
            order_type,
            key: OnceLock::new(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn role(&self) -> SortRole {
        self.order_type.role()
    }

    pub fn direction(&self) -> SortDirection {
        self.order_type.direction()
    }

    /// The compiled key extractor
    pub fn key_selector(&self) -> KeySelector<T> {
        self.key
            .get_or_init(|| {
                let field = self.field.clone();
                Arc::new(move |e: &T| e.value_of(&field)) as KeySelector<T>
            })
            .clone()
    }
}

impl<T> fmt::Debug for OrderExpression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderExpression")
            .field("field", &self.field)
            .field("order_type", &self.order_type)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// One `LIKE` search criterion.
///
/// Criteria sharing a group combine with OR, groups combine with AND. An
/// empty search term makes the criterion a no-op.
pub struct SearchExpression<T> {
    field: String,
    search_term: String,
    search_group: i32,
    selector: OnceLock<TextSelector<T>>,
    pattern: OnceLock<SpecResult<Arc<LikePattern>>>,
}

impl<T: Entity> SearchExpression<T> {
    pub fn new(field: impl Into<String>, search_term: impl Into<String>, search_group: i32) -> Self {
        Self {
            field: field.into(),
            search_term: search_term.into(),
            search_group,
            selector: OnceLock::new(),
            pattern: OnceLock::new(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn search_group(&self) -> i32 {
        self.search_group
    }

    /// Whether this criterion takes part in matching at all
    pub fn is_effective(&self) -> bool {
        !self.search_term.is_empty()
    }

    /// The compiled text selector
    pub fn selector(&self) -> TextSelector<T> {
        self.selector
            .get_or_init(|| {
                let field = self.field.clone();
                Arc::new(move |e: &T| e.value_of(&field).as_text()) as TextSelector<T>
            })
            .clone()
    }

    /// The compiled pattern
    pub fn pattern(&self) -> SpecResult<Arc<LikePattern>> {
        self.pattern
            .get_or_init(|| LikePattern::new(&self.search_term).map(Arc::new))
            .clone()
    }

    /// Check one entity against this criterion
    pub fn is_match(&self, entity: &T) -> SpecResult<bool> {
        let pattern = self.pattern()?;
        Ok((self.selector())(entity).is_some_and(|text| pattern.is_match(&text)))
    }
}

impl<T> fmt::Debug for SearchExpression<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchExpression")
            .field("field", &self.field)
            .field("search_term", &self.search_term)
            .field("search_group", &self.search_group)
            .finish()
    }
}

/// Split search criteria into groups, in order of first appearance, keeping
/// only criteria that take part in matching. Groups left empty are dropped.
pub fn search_groups<T: Entity>(
    criteria: &[SearchExpression<T>],
) -> Vec<(i32, Vec<&SearchExpression<T>>)> {
    let mut groups: Vec<(i32, Vec<&SearchExpression<T>>)> = Vec::new();
    for criterion in criteria.iter().filter(|c| c.is_effective()) {
        match groups.iter_mut().find(|(g, _)| *g == criterion.search_group()) {
            Some((_, members)) => members.push(criterion),
            None => groups.push((criterion.search_group(), vec![criterion])),
        }
    }
    groups
}

// ---------------------------------------------------------------------------
// Includes
// ---------------------------------------------------------------------------

/// A typed navigation from one entity type to a related type.
///
/// `Child` is the element type; collection navigations are declared with
/// [`Relation::collection`].
pub struct Relation<Parent, Child> {
    name: &'static str,
    collection: bool,
    _marker: PhantomData<fn(&Parent) -> Child>,
}

impl<Parent, Child> Relation<Parent, Child> {
    /// A navigation to a single related entity
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            collection: false,
            _marker: PhantomData,
        }
    }

    /// A navigation to a collection of related entities
    pub const fn collection(name: &'static str) -> Self {
        Self {
            name,
            collection: true,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_collection(&self) -> bool {
        self.collection
    }
}

impl<Parent, Child> Clone for Relation<Parent, Child> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Parent, Child> Copy for Relation<Parent, Child> {}

impl<Parent, Child> fmt::Debug for Relation<Parent, Child> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("name", &self.name)
            .field("from", &std::any::type_name::<Parent>())
            .field("to", &std::any::type_name::<Child>())
            .field("collection", &self.collection)
            .finish()
    }
}

/// Whether an include starts a path or extends the previous one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeType {
    Include,
    ThenInclude,
}

/// One typed include step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeExpression {
    pub property: &'static str,
    pub entity_type: &'static str,
    pub property_type: &'static str,
    pub previous_property_type: Option<&'static str>,
    pub include_type: IncludeType,
    /// Full dotted path from the root entity (e.g. `assignee.team`)
    pub path: String,
}

impl IncludeExpression {
    pub(crate) fn include<E, P>(relation: &Relation<E, P>) -> Self {
        Self {
            property: relation.name(),
            entity_type: std::any::type_name::<E>(),
            property_type: std::any::type_name::<P>(),
            previous_property_type: None,
            include_type: IncludeType::Include,
            path: relation.name().to_string(),
        }
    }

    pub(crate) fn then_include<E, Prev, P>(parent_path: &str, relation: &Relation<Prev, P>) -> Self {
        Self {
            property: relation.name(),
            entity_type: std::any::type_name::<E>(),
            property_type: std::any::type_name::<P>(),
            previous_property_type: Some(std::any::type_name::<Prev>()),
            include_type: IncludeType::ThenInclude,
            path: format!("{}.{}", parent_path, relation.name()),
        }
    }
}
