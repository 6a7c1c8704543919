use super::{Evaluator, InMemoryEvaluator};
use crate::core::entity::Entity;
use crate::core::error::SpecResult;
use crate::core::store::StoreQuery;
use crate::specification::specification::EntitySpecification;

/// Applies skip, then take. A skip of zero is not emitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaginationEvaluator;

impl<Q: StoreQuery> Evaluator<Q> for PaginationEvaluator {
    fn name(&self) -> &'static str {
        "pagination"
    }

    fn is_criteria_evaluator(&self) -> bool {
        false
    }

    fn get_query(
        &self,
        mut query: Q,
        specification: &dyn EntitySpecification<Q::Entity>,
    ) -> SpecResult<Q> {
        if let Some(skip) = specification.skip().filter(|s| *s > 0) {
            query = query.skip(skip);
        }
        if let Some(take) = specification.take() {
            query = query.take(take);
        }
        Ok(query)
    }
}

impl<T: Entity> InMemoryEvaluator<T> for PaginationEvaluator {
    fn name(&self) -> &'static str {
        "pagination"
    }

    fn evaluate(
        &self,
        mut entities: Vec<T>,
        specification: &dyn EntitySpecification<T>,
    ) -> SpecResult<Vec<T>> {
        if let Some(skip) = specification.skip().filter(|s| *s > 0) {
            entities.drain(..skip.min(entities.len()));
        }
        if let Some(take) = specification.take() {
            entities.truncate(take);
        }
        Ok(entities)
    }
}
