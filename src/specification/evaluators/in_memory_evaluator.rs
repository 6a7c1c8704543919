use super::{InMemoryEvaluator, OrderEvaluator, PaginationEvaluator, SearchEvaluator, WhereEvaluator};
use crate::core::entity::Entity;
use crate::core::error::{SpecResult, SpecificationError};
use crate::specification::specification::{EntitySpecification, Specification};
use std::sync::Arc;

/// Applies specifications to materialized sequences.
///
/// The default pipeline runs where, search, order, pagination. Include
/// paths and query hints have no meaning in memory and are ignored.
pub struct InMemorySpecificationEvaluator<T: Entity> {
    evaluators: Vec<Arc<dyn InMemoryEvaluator<T>>>,
}

impl<T: Entity> Default for InMemorySpecificationEvaluator<T> {
    fn default() -> Self {
        Self::new(vec![
            Arc::new(WhereEvaluator),
            Arc::new(SearchEvaluator),
            Arc::new(OrderEvaluator),
            Arc::new(PaginationEvaluator),
        ])
    }
}

impl<T: Entity> InMemorySpecificationEvaluator<T> {
    pub fn new(evaluators: Vec<Arc<dyn InMemoryEvaluator<T>>>) -> Self {
        Self { evaluators }
    }

    /// Names of the evaluators, in execution order
    pub fn evaluator_names(&self) -> Vec<&'static str> {
        self.evaluators.iter().map(|e| e.name()).collect()
    }

    /// Run the pipeline without post-processing
    pub fn apply(
        &self,
        mut entities: Vec<T>,
        specification: &dyn EntitySpecification<T>,
    ) -> SpecResult<Vec<T>> {
        for evaluator in &self.evaluators {
            tracing::debug!(
                evaluator = evaluator.name(),
                count = entities.len(),
                "applying in-memory evaluator"
            );
            entities = evaluator.evaluate(entities, specification)?;
        }
        Ok(entities)
    }

    /// Run the pipeline, then the post-processing action if any
    pub fn evaluate(&self, entities: Vec<T>, specification: &Specification<T>) -> SpecResult<Vec<T>> {
        let result = self.apply(entities, specification)?;
        Ok(match specification.post_processing_action() {
            Some(action) => action(result),
            None => result,
        })
    }

    /// Run the pipeline, project every entity, then post-process.
    ///
    /// Fails with `MissingSelector` when no selector was configured.
    pub fn evaluate_projected<R>(
        &self,
        entities: Vec<T>,
        specification: &Specification<T, R>,
    ) -> SpecResult<Vec<R>> {
        let selector = specification
            .selector()
            .ok_or(SpecificationError::MissingSelector)?;
        let projected: Vec<R> = self
            .apply(entities, specification)?
            .iter()
            .map(|entity| selector(entity))
            .collect();
        Ok(match specification.post_processing_action() {
            Some(action) => action(projected),
            None => projected,
        })
    }
}
