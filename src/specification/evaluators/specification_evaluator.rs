use super::{
    AsNoTrackingEvaluator, AsNoTrackingWithIdentityResolutionEvaluator, AsSplitQueryEvaluator,
    Evaluator, IgnoreQueryFiltersEvaluator, IncludeEvaluator, OrderEvaluator,
    PaginationEvaluator, SearchEvaluator, WhereEvaluator,
};
use crate::core::error::{SpecResult, SpecificationError};
use crate::core::store::StoreQuery;
use crate::specification::specification::{EntitySpecification, Selector, Specification};
use std::sync::Arc;

/// A translated query paired with the projection to apply to its rows
pub struct ProjectedQuery<Q: StoreQuery, R> {
    pub query: Q,
    pub selector: Selector<Q::Entity, R>,
}

/// Translates specifications into store queries.
///
/// The default pipeline runs, in order: where, search, include, order,
/// pagination, and the query hints (no tracking, ignore query filters,
/// split query, no tracking with identity resolution).
pub struct SpecificationEvaluator<Q: StoreQuery> {
    evaluators: Vec<Arc<dyn Evaluator<Q>>>,
}

impl<Q: StoreQuery + 'static> Default for SpecificationEvaluator<Q> {
    fn default() -> Self {
        Self::new(vec![
            Arc::new(WhereEvaluator),
            Arc::new(SearchEvaluator),
            Arc::new(IncludeEvaluator),
            Arc::new(OrderEvaluator),
            Arc::new(PaginationEvaluator),
            Arc::new(AsNoTrackingEvaluator),
            Arc::new(IgnoreQueryFiltersEvaluator),
            Arc::new(AsSplitQueryEvaluator),
            Arc::new(AsNoTrackingWithIdentityResolutionEvaluator),
        ])
    }
}

impl<Q: StoreQuery> SpecificationEvaluator<Q> {
    /// Build a pipeline from an explicit list of evaluators
    pub fn new(evaluators: Vec<Arc<dyn Evaluator<Q>>>) -> Self {
        Self { evaluators }
    }

    /// Names of the evaluators, in execution order
    pub fn evaluator_names(&self) -> Vec<&'static str> {
        self.evaluators.iter().map(|e| e.name()).collect()
    }

    /// Translate a specification onto `query`.
    ///
    /// With `criteria_only` only the narrowing steps run, which is what
    /// count and existence queries need.
    pub fn get_query(
        &self,
        mut query: Q,
        specification: &dyn EntitySpecification<Q::Entity>,
        criteria_only: bool,
    ) -> SpecResult<Q> {
        for evaluator in &self.evaluators {
            if criteria_only && !evaluator.is_criteria_evaluator() {
                continue;
            }
            tracing::debug!(evaluator = evaluator.name(), "applying evaluator to query");
            query = evaluator.get_query(query, specification)?;
        }
        Ok(query)
    }

    /// Translate a specification and attach its projection.
    ///
    /// Fails with `MissingSelector` when no selector was configured.
    pub fn get_projected_query<R>(
        &self,
        query: Q,
        specification: &Specification<Q::Entity, R>,
    ) -> SpecResult<ProjectedQuery<Q, R>> {
        let selector = specification
            .selector()
            .cloned()
            .ok_or(SpecificationError::MissingSelector)?;
        let query = self.get_query(query, specification, false)?;
        Ok(ProjectedQuery { query, selector })
    }
}
