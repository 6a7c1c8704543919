//! The specification aggregate

use crate::core::entity::Entity;
use crate::core::error::SpecResult;
use crate::specification::builder::SpecificationBuilder;
use crate::specification::evaluators::InMemorySpecificationEvaluator;
use crate::specification::expressions::{
    IncludeExpression, OrderExpression, SearchExpression, WhereExpression,
};
use crate::specification::validators::SpecificationValidator;
use std::fmt;
use std::sync::Arc;

/// Projection applied to every entity of a result
pub type Selector<T, R> = Arc<dyn Fn(&T) -> R + Send + Sync>;

/// Transform applied to a complete, materialized result
pub type PostProcessingAction<R> = Arc<dyn Fn(Vec<R>) -> Vec<R> + Send + Sync>;

/// Read-only view of everything a specification says about entities.
///
/// Evaluators and validators only see this view, which does not depend on
/// the projected result type, so one evaluator serves every specification
/// of an entity type.
pub trait EntitySpecification<T>: Send + Sync {
    /// Filters, combined with logical AND
    fn where_expressions(&self) -> &[WhereExpression<T>];

    /// Sort keys in insertion order
    fn order_expressions(&self) -> &[OrderExpression<T>];

    /// Typed include steps
    fn include_expressions(&self) -> &[IncludeExpression];

    /// Raw include paths
    fn include_strings(&self) -> &[String];

    /// Search criteria in insertion order
    fn search_criteria(&self) -> &[SearchExpression<T>];

    fn skip(&self) -> Option<usize>;

    fn take(&self) -> Option<usize>;

    fn cache_enabled(&self) -> bool;

    fn cache_key(&self) -> Option<&str>;

    fn as_no_tracking(&self) -> bool;

    fn as_no_tracking_with_identity_resolution(&self) -> bool;

    fn as_split_query(&self) -> bool;

    fn ignore_query_filters(&self) -> bool;
}

/// Declarative description of which entities to return, in what order,
/// with what related data, paginated and cached how.
///
/// A specification is assembled once through [`SpecificationBuilder`] and is
/// immutable afterwards. `R` is the projected result type; it defaults to
/// the entity type for specifications that return entities.
///
/// # Example
/// ```rust,ignore
/// let spec = Specification::<Issue>::builder()
///     .filter(Criterion::eq("assigned_to", "bob"))
///     .order_by("created")
///     .build();
///
/// let mine = spec.evaluate(issues)?;
/// ```
pub struct Specification<T, R = T> {
    pub(crate) where_expressions: Vec<WhereExpression<T>>,
    pub(crate) order_expressions: Vec<OrderExpression<T>>,
    pub(crate) include_expressions: Vec<IncludeExpression>,
    pub(crate) include_strings: Vec<String>,
    pub(crate) search_criteria: Vec<SearchExpression<T>>,
    pub(crate) skip: Option<usize>,
    pub(crate) take: Option<usize>,
    pub(crate) selector: Option<Selector<T, R>>,
    pub(crate) post_processing_action: Option<PostProcessingAction<R>>,
    pub(crate) cache_key: Option<String>,
    pub(crate) cache_enabled: bool,
    pub(crate) as_no_tracking: bool,
    pub(crate) as_no_tracking_with_identity_resolution: bool,
    pub(crate) as_split_query: bool,
    pub(crate) ignore_query_filters: bool,
}

impl<T: Entity, R> Specification<T, R> {
    pub(crate) fn empty() -> Self {
        Self {
            where_expressions: Vec::new(),
            order_expressions: Vec::new(),
            include_expressions: Vec::new(),
            include_strings: Vec::new(),
            search_criteria: Vec::new(),
            skip: None,
            take: None,
            selector: None,
            post_processing_action: None,
            cache_key: None,
            cache_enabled: false,
            as_no_tracking: false,
            as_no_tracking_with_identity_resolution: false,
            as_split_query: false,
            ignore_query_filters: false,
        }
    }

    /// Start building a specification
    pub fn builder() -> SpecificationBuilder<T, R> {
        SpecificationBuilder::new()
    }

    /// The projection, if one was configured
    pub fn selector(&self) -> Option<&Selector<T, R>> {
        self.selector.as_ref()
    }

    /// The post-processing transform, if one was configured
    pub fn post_processing_action(&self) -> Option<&PostProcessingAction<R>> {
        self.post_processing_action.as_ref()
    }

    /// Evaluate against an in-memory sequence and project the result.
    ///
    /// Fails with `MissingSelector` when no selector was configured.
    pub fn evaluate_projected(&self, entities: impl IntoIterator<Item = T>) -> SpecResult<Vec<R>> {
        InMemorySpecificationEvaluator::default()
            .evaluate_projected(entities.into_iter().collect(), self)
    }

    /// Check whether a single entity passes the filters and search criteria
    pub fn is_satisfied_by(&self, entity: &T) -> SpecResult<bool> {
        SpecificationValidator::default().is_valid(entity, self)
    }
}

impl<T: Entity> Specification<T, T> {
    /// Evaluate against an in-memory sequence of entities
    pub fn evaluate(&self, entities: impl IntoIterator<Item = T>) -> SpecResult<Vec<T>> {
        InMemorySpecificationEvaluator::default().evaluate(entities.into_iter().collect(), self)
    }
}

impl<T: Entity, R> EntitySpecification<T> for Specification<T, R> {
    fn where_expressions(&self) -> &[WhereExpression<T>] {
        &self.where_expressions
    }

    fn order_expressions(&self) -> &[OrderExpression<T>] {
        &self.order_expressions
    }

    fn include_expressions(&self) -> &[IncludeExpression] {
        &self.include_expressions
    }

    fn include_strings(&self) -> &[String] {
        &self.include_strings
    }

    fn search_criteria(&self) -> &[SearchExpression<T>] {
        &self.search_criteria
    }

    fn skip(&self) -> Option<usize> {
        self.skip
    }

    fn take(&self) -> Option<usize> {
        self.take
    }

    fn cache_enabled(&self) -> bool {
        self.cache_enabled
    }

    fn cache_key(&self) -> Option<&str> {
        self.cache_key.as_deref()
    }

    fn as_no_tracking(&self) -> bool {
        self.as_no_tracking
    }

    fn as_no_tracking_with_identity_resolution(&self) -> bool {
        self.as_no_tracking_with_identity_resolution
    }

    fn as_split_query(&self) -> bool {
        self.as_split_query
    }

    fn ignore_query_filters(&self) -> bool {
        self.ignore_query_filters
    }
}

impl<T, R> fmt::Debug for Specification<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specification")
            .field("where_expressions", &self.where_expressions)
            .field("order_expressions", &self.order_expressions)
            .field("include_expressions", &self.include_expressions)
            .field("include_strings", &self.include_strings)
            .field("search_criteria", &self.search_criteria)
            .field("skip", &self.skip)
            .field("take", &self.take)
            .field("has_selector", &self.selector.is_some())
            .field("has_post_processing_action", &self.post_processing_action.is_some())
            .field("cache_key", &self.cache_key)
            .field("cache_enabled", &self.cache_enabled)
            .field("as_no_tracking", &self.as_no_tracking)
            .field(
                "as_no_tracking_with_identity_resolution",
                &self.as_no_tracking_with_identity_resolution,
            )
            .field("as_split_query", &self.as_split_query)
            .field("ignore_query_filters", &self.ignore_query_filters)
            .finish()
    }
}
