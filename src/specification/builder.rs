//! Fluent construction of specifications
//!
//! Every mutating operation has a conditional `_if` form. When the condition
//! is false the operation is a no-op, and for chained operations (`then_by`,
//! `then_include`, `vary_by`) the rest of the chain is discarded as well:
//! a `then_by` after a skipped `order_by` must not silently become the
//! primary sort key.
//!
//! The chain handles ([`OrderedSpecificationBuilder`],
//! [`IncludableSpecificationBuilder`], [`CacheSpecificationBuilder`]) make the
//! sequencing rules part of the type: `then_by` only exists after an
//! `order_by`, `then_include` only after an include. All general operations
//! come from [`SpecificationBuilding`], so they can be called from any handle
//! and end the current chain.
//!
//! # Example
//!
//! ```rust,ignore
//! let spec = Specification::<Issue>::builder()
//!     .filter(Criterion::eq("assigned_to", user))
//!     .include(ISSUE_PROJECT)
//!     .then_include(PROJECT_OWNER)
//!     .order_by("created")
//!     .then_by_descending("priority")
//!     .take(20)?
//!     .build();
//! ```

use crate::core::entity::Entity;
use crate::core::error::{SpecResult, SpecificationError};
use crate::specification::criterion::Criterion;
use crate::specification::expressions::{
    IncludeExpression, OrderExpression, OrderType, Relation, SearchExpression, WhereExpression,
};
use crate::specification::specification::Specification;
use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::Arc;

/// Search group used when none is given
pub const DEFAULT_SEARCH_GROUP: i32 = 1;

/// Builder for [`Specification`]
pub struct SpecificationBuilder<T, R = T> {
    specification: Specification<T, R>,
}

impl<T: Entity, R> SpecificationBuilder<T, R> {
    pub fn new() -> Self {
        Self {
            specification: Specification::empty(),
        }
    }
}

impl<T: Entity, R> Default for SpecificationBuilder<T, R> {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a chained operation
///
/// Once discarded, a chain stays discarded: every later step of the same
/// chain is ignored regardless of its own condition.
pub enum Chain<T, R> {
    Continuing(SpecificationBuilder<T, R>),
    Discarded(SpecificationBuilder<T, R>),
}

impl<T: Entity, R> Chain<T, R> {
    fn start(builder: SpecificationBuilder<T, R>, condition: bool) -> Self {
        if condition {
            Chain::Continuing(builder)
        } else {
            Chain::Discarded(builder)
        }
    }

    /// Apply `step` if the chain is alive and `condition` holds, otherwise
    /// discard the rest of the chain
    fn step(self, condition: bool, step: impl FnOnce(&mut Specification<T, R>)) -> Self {
        match self {
            Chain::Continuing(mut builder) if condition => {
                step(&mut builder.specification);
                Chain::Continuing(builder)
            }
            Chain::Continuing(builder) | Chain::Discarded(builder) => Chain::Discarded(builder),
        }
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, Chain::Discarded(_))
    }

    fn into_builder(self) -> SpecificationBuilder<T, R> {
        match self {
            Chain::Continuing(builder) | Chain::Discarded(builder) => builder,
        }
    }
}

/// Operations available from the builder and from every chain handle
pub trait SpecificationBuilding<T: Entity, R>: Sized {
    /// End the current chain and return the plain builder
    fn into_builder(self) -> SpecificationBuilder<T, R>;

    /// Add a filter; filters combine with logical AND
    fn filter(self, criterion: Criterion) -> SpecificationBuilder<T, R> {
        self.filter_if(criterion, true)
    }

    fn filter_if(self, criterion: Criterion, condition: bool) -> SpecificationBuilder<T, R> {
        let mut builder = self.into_builder();
        if condition {
            builder
                .specification
                .where_expressions
                .push(WhereExpression::new(criterion));
        }
        builder
    }

    /// Start an ordering chain with an ascending primary key
    fn order_by(self, field: impl Into<String>) -> OrderedSpecificationBuilder<T, R> {
        self.order_by_if(field, true)
    }

    fn order_by_if(
        self,
        field: impl Into<String>,
        condition: bool,
    ) -> OrderedSpecificationBuilder<T, R> {
        start_order(self.into_builder(), field.into(), OrderType::OrderBy, condition)
    }

    /// Start an ordering chain with a descending primary key
    fn order_by_descending(self, field: impl Into<String>) -> OrderedSpecificationBuilder<T, R> {
        self.order_by_descending_if(field, true)
    }

    fn order_by_descending_if(
        self,
        field: impl Into<String>,
        condition: bool,
    ) -> OrderedSpecificationBuilder<T, R> {
        start_order(
            self.into_builder(),
            field.into(),
            OrderType::OrderByDescending,
            condition,
        )
    }

    /// Start an include chain with a typed navigation
    fn include<P>(self, relation: Relation<T, P>) -> IncludableSpecificationBuilder<T, P, R> {
        self.include_if(relation, true)
    }

    fn include_if<P>(
        self,
        relation: Relation<T, P>,
        condition: bool,
    ) -> IncludableSpecificationBuilder<T, P, R> {
        let mut builder = self.into_builder();
        let path = relation.name().to_string();
        if condition {
            builder
                .specification
                .include_expressions
                .push(IncludeExpression::include(&relation));
        }
        IncludableSpecificationBuilder {
            chain: Chain::start(builder, condition),
            path,
            _property: PhantomData,
        }
    }

    /// Include related data by a raw dotted path
    fn include_path(self, path: impl Into<String>) -> SpecificationBuilder<T, R> {
        self.include_path_if(path, true)
    }

    fn include_path_if(self, path: impl Into<String>, condition: bool) -> SpecificationBuilder<T, R> {
        let mut builder = self.into_builder();
        if condition {
            builder.specification.include_strings.push(path.into());
        }
        builder
    }

    /// Add a `LIKE` search criterion to the default group
    fn search(
        self,
        field: impl Into<String>,
        search_term: impl Into<String>,
    ) -> SpecificationBuilder<T, R> {
        self.search_in_group_if(field, search_term, DEFAULT_SEARCH_GROUP, true)
    }

    fn search_if(
        self,
        field: impl Into<String>,
        search_term: impl Into<String>,
        condition: bool,
    ) -> SpecificationBuilder<T, R> {
        self.search_in_group_if(field, search_term, DEFAULT_SEARCH_GROUP, condition)
    }

    /// Add a `LIKE` search criterion to an explicit group.
    ///
    /// Criteria in one group combine with OR, groups combine with AND.
    fn search_in_group(
        self,
        field: impl Into<String>,
        search_term: impl Into<String>,
        search_group: i32,
    ) -> SpecificationBuilder<T, R> {
        self.search_in_group_if(field, search_term, search_group, true)
    }

    fn search_in_group_if(
        self,
        field: impl Into<String>,
        search_term: impl Into<String>,
        search_group: i32,
        condition: bool,
    ) -> SpecificationBuilder<T, R> {
        let mut builder = self.into_builder();
        if condition {
            builder
                .specification
                .search_criteria
                .push(SearchExpression::new(field, search_term, search_group));
        }
        builder
    }

    /// Skip the first `count` results. Fails if skip was already set.
    fn skip(self, count: usize) -> SpecResult<SpecificationBuilder<T, R>> {
        self.skip_if(count, true)
    }

    fn skip_if(self, count: usize, condition: bool) -> SpecResult<SpecificationBuilder<T, R>> {
        let mut builder = self.into_builder();
        if condition {
            if builder.specification.skip.is_some() {
                return Err(SpecificationError::DuplicateSkip);
            }
            builder.specification.skip = Some(count);
        }
        Ok(builder)
    }

    /// Return at most `count` results. Fails if take was already set.
    fn take(self, count: usize) -> SpecResult<SpecificationBuilder<T, R>> {
        self.take_if(count, true)
    }

    fn take_if(self, count: usize, condition: bool) -> SpecResult<SpecificationBuilder<T, R>> {
        let mut builder = self.into_builder();
        if condition {
            if builder.specification.take.is_some() {
                return Err(SpecificationError::DuplicateTake);
            }
            builder.specification.take = Some(count);
        }
        Ok(builder)
    }

    /// Set the projection; a later call replaces an earlier one
    fn select(
        self,
        selector: impl Fn(&T) -> R + Send + Sync + 'static,
    ) -> SpecificationBuilder<T, R> {
        self.select_if(selector, true)
    }

    fn select_if(
        self,
        selector: impl Fn(&T) -> R + Send + Sync + 'static,
        condition: bool,
    ) -> SpecificationBuilder<T, R> {
        let mut builder = self.into_builder();
        if condition {
            builder.specification.selector = Some(Arc::new(selector));
        }
        builder
    }

    /// Set the transform applied to the materialized result; a later call
    /// replaces an earlier one
    fn post_processing_action(
        self,
        action: impl Fn(Vec<R>) -> Vec<R> + Send + Sync + 'static,
    ) -> SpecificationBuilder<T, R> {
        self.post_processing_action_if(action, true)
    }

    fn post_processing_action_if(
        self,
        action: impl Fn(Vec<R>) -> Vec<R> + Send + Sync + 'static,
        condition: bool,
    ) -> SpecificationBuilder<T, R> {
        let mut builder = self.into_builder();
        if condition {
            builder.specification.post_processing_action = Some(Arc::new(action));
        }
        builder
    }

    /// Enable result caching under `"{name}-{arg}-{arg}..."` (`"{name}-"`
    /// without arguments).
    ///
    /// Fails when `name` is empty.
    fn enable_cache<I, A>(self, name: &str, args: I) -> SpecResult<CacheSpecificationBuilder<T, R>>
    where
        I: IntoIterator<Item = A>,
        A: Display,
    {
        self.enable_cache_if(name, args, true)
    }

    fn enable_cache_if<I, A>(
        self,
        name: &str,
        args: I,
        condition: bool,
    ) -> SpecResult<CacheSpecificationBuilder<T, R>>
    where
        I: IntoIterator<Item = A>,
        A: Display,
    {
        let mut builder = self.into_builder();
        if condition {
            if name.trim().is_empty() {
                return Err(SpecificationError::InvalidCacheConfiguration {
                    reason: "specification name must not be empty".to_string(),
                });
            }
            let args: Vec<String> = args.into_iter().map(|a| a.to_string()).collect();
            builder.specification.cache_key = Some(format!("{}-{}", name, args.join("-")));
            builder.specification.cache_enabled = true;
        }
        Ok(CacheSpecificationBuilder {
            chain: Chain::start(builder, condition),
        })
    }

    fn as_no_tracking(self) -> SpecificationBuilder<T, R> {
        self.as_no_tracking_if(true)
    }

    fn as_no_tracking_if(self, condition: bool) -> SpecificationBuilder<T, R> {
        let mut builder = self.into_builder();
        if condition {
            builder.specification.as_no_tracking = true;
        }
        builder
    }

    fn as_no_tracking_with_identity_resolution(self) -> SpecificationBuilder<T, R> {
        self.as_no_tracking_with_identity_resolution_if(true)
    }

    fn as_no_tracking_with_identity_resolution_if(
        self,
        condition: bool,
    ) -> SpecificationBuilder<T, R> {
        let mut builder = self.into_builder();
        if condition {
            builder.specification.as_no_tracking_with_identity_resolution = true;
        }
        builder
    }

    fn as_split_query(self) -> SpecificationBuilder<T, R> {
        self.as_split_query_if(true)
    }

    fn as_split_query_if(self, condition: bool) -> SpecificationBuilder<T, R> {
        let mut builder = self.into_builder();
        if condition {
            builder.specification.as_split_query = true;
        }
        builder
    }

    fn ignore_query_filters(self) -> SpecificationBuilder<T, R> {
        self.ignore_query_filters_if(true)
    }

    fn ignore_query_filters_if(self, condition: bool) -> SpecificationBuilder<T, R> {
        let mut builder = self.into_builder();
        if condition {
            builder.specification.ignore_query_filters = true;
        }
        builder
    }

    /// Finish building
    fn build(self) -> Specification<T, R> {
        self.into_builder().specification
    }
}

fn start_order<T: Entity, R>(
    mut builder: SpecificationBuilder<T, R>,
    field: String,
    order_type: OrderType,
    condition: bool,
) -> OrderedSpecificationBuilder<T, R> {
    if condition {
        builder
            .specification
            .order_expressions
            .push(OrderExpression::new(field, order_type));
    }
    OrderedSpecificationBuilder {
        chain: Chain::start(builder, condition),
    }
}

impl<T: Entity, R> SpecificationBuilding<T, R> for SpecificationBuilder<T, R> {
    fn into_builder(self) -> SpecificationBuilder<T, R> {
        self
    }
}

/// Handle returned by `order_by`, allowing secondary sort keys
pub struct OrderedSpecificationBuilder<T, R = T> {
    chain: Chain<T, R>,
}

impl<T: Entity, R> OrderedSpecificationBuilder<T, R> {
    /// Add an ascending secondary key
    pub fn then_by(self, field: impl Into<String>) -> Self {
        self.then_by_if(field, true)
    }

    pub fn then_by_if(self, field: impl Into<String>, condition: bool) -> Self {
        self.then(field.into(), OrderType::ThenBy, condition)
    }

    /// Add a descending secondary key
    pub fn then_by_descending(self, field: impl Into<String>) -> Self {
        self.then_by_descending_if(field, true)
    }

    pub fn then_by_descending_if(self, field: impl Into<String>, condition: bool) -> Self {
        self.then(field.into(), OrderType::ThenByDescending, condition)
    }

    /// Whether later `then_by` calls of this chain are ignored
    pub fn is_chain_discarded(&self) -> bool {
        self.chain.is_discarded()
    }

    fn then(self, field: String, order_type: OrderType, condition: bool) -> Self {
        Self {
            chain: self.chain.step(condition, |spec| {
                spec.order_expressions
                    .push(OrderExpression::new(field, order_type))
            }),
        }
    }
}

impl<T: Entity, R> SpecificationBuilding<T, R> for OrderedSpecificationBuilder<T, R> {
    fn into_builder(self) -> SpecificationBuilder<T, R> {
        self.chain.into_builder()
    }
}

/// Handle returned by `include`, allowing nested includes from `P`
pub struct IncludableSpecificationBuilder<T, P, R = T> {
    chain: Chain<T, R>,
    path: String,
    _property: PhantomData<fn() -> P>,
}

impl<T: Entity, P, R> IncludableSpecificationBuilder<T, P, R> {
    /// Include a navigation of the previously included type
    pub fn then_include<N>(self, relation: Relation<P, N>) -> IncludableSpecificationBuilder<T, N, R> {
        self.then_include_if(relation, true)
    }

    pub fn then_include_if<N>(
        self,
        relation: Relation<P, N>,
        condition: bool,
    ) -> IncludableSpecificationBuilder<T, N, R> {
        let path = format!("{}.{}", self.path, relation.name());
        let parent_path = self.path;
        let chain = self.chain.step(condition, |spec| {
            spec.include_expressions
                .push(IncludeExpression::then_include::<T, P, N>(&parent_path, &relation))
        });
        IncludableSpecificationBuilder {
            chain,
            path,
            _property: PhantomData,
        }
    }

    /// Whether later `then_include` calls of this chain are ignored
    pub fn is_chain_discarded(&self) -> bool {
        self.chain.is_discarded()
    }
}

impl<T: Entity, P, R> SpecificationBuilding<T, R> for IncludableSpecificationBuilder<T, P, R> {
    fn into_builder(self) -> SpecificationBuilder<T, R> {
        self.chain.into_builder()
    }
}

/// Handle returned by `enable_cache`, allowing extra key segments
pub struct CacheSpecificationBuilder<T, R = T> {
    chain: Chain<T, R>,
}

impl<T: Entity, R> CacheSpecificationBuilder<T, R> {
    /// Append a segment to the cache key
    pub fn vary_by(self, arg: impl Display) -> Self {
        self.vary_by_if(arg, true)
    }

    pub fn vary_by_if(self, arg: impl Display, condition: bool) -> Self {
        Self {
            chain: self.chain.step(condition, |spec| {
                if let Some(key) = spec.cache_key.as_mut() {
                    key.push('-');
                    key.push_str(&arg.to_string());
                }
            }),
        }
    }

    pub fn is_chain_discarded(&self) -> bool {
        self.chain.is_discarded()
    }
}

impl<T: Entity, R> SpecificationBuilding<T, R> for CacheSpecificationBuilder<T, R> {
    fn into_builder(self) -> SpecificationBuilder<T, R> {
        self.chain.into_builder()
    }
}
