//! Specifications and everything that builds, evaluates and validates them

pub mod builder;
pub mod criterion;
pub mod evaluators;
pub mod expressions;
pub mod like;
#[allow(clippy::module_inception)]
pub mod specification;
pub mod validators;

pub use builder::{
    CacheSpecificationBuilder, Chain, IncludableSpecificationBuilder,
    OrderedSpecificationBuilder, SpecificationBuilder, SpecificationBuilding,
    DEFAULT_SEARCH_GROUP,
};
pub use criterion::{Criterion, Predicate};
pub use evaluators::{
    Evaluator, InMemoryEvaluator, InMemorySpecificationEvaluator, ProjectedQuery,
    SpecificationEvaluator,
};
pub use expressions::{
    IncludeExpression, IncludeType, OrderExpression, OrderType, Relation, SearchExpression,
    SortDirection, SortRole, WhereExpression,
};
pub use like::LikePattern;
pub use specification::{EntitySpecification, PostProcessingAction, Selector, Specification};
pub use validators::{SearchValidator, SpecificationValidator, Validator, WhereValidator};
