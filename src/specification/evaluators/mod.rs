//! Evaluator pipelines
//!
//! A specification is applied by a fixed sequence of small evaluators, each
//! responsible for one concern. Two pipelines exist:
//!
//! - [`SpecificationEvaluator`] translates a specification into a
//!   [`StoreQuery`] and never touches entities.
//! - [`InMemorySpecificationEvaluator`] applies the compiled functions to a
//!   materialized sequence.
//!
//! Most evaluators are unit structs implementing both traits.

use crate::core::entity::Entity;
use crate::core::error::SpecResult;
use crate::core::store::StoreQuery;
use crate::specification::specification::EntitySpecification;

mod in_memory_evaluator;
mod include_evaluator;
mod order_evaluator;
mod pagination_evaluator;
mod query_flags;
mod search_evaluator;
mod specification_evaluator;
mod where_evaluator;

pub use in_memory_evaluator::InMemorySpecificationEvaluator;
pub use include_evaluator::IncludeEvaluator;
pub use order_evaluator::OrderEvaluator;
pub use pagination_evaluator::PaginationEvaluator;
pub use query_flags::{
    AsNoTrackingEvaluator, AsNoTrackingWithIdentityResolutionEvaluator, AsSplitQueryEvaluator,
    IgnoreQueryFiltersEvaluator,
};
pub use search_evaluator::SearchEvaluator;
pub use specification_evaluator::{ProjectedQuery, SpecificationEvaluator};
pub use where_evaluator::WhereEvaluator;

/// One step of the translated-query pipeline
pub trait Evaluator<Q: StoreQuery>: Send + Sync {
    /// Name used in trace output
    fn name(&self) -> &'static str;

    /// Whether this step decides which entities match, as opposed to
    /// shaping or paginating them. Count and existence queries run only these.
    fn is_criteria_evaluator(&self) -> bool;

    fn get_query(
        &self,
        query: Q,
        specification: &dyn EntitySpecification<Q::Entity>,
    ) -> SpecResult<Q>;
}

/// One step of the in-memory pipeline
pub trait InMemoryEvaluator<T: Entity>: Send + Sync {
    /// Name used in trace output
    fn name(&self) -> &'static str;

    fn evaluate(
        &self,
        entities: Vec<T>,
        specification: &dyn EntitySpecification<T>,
    ) -> SpecResult<Vec<T>>;
}
