use super::{Evaluator, InMemoryEvaluator};
use crate::core::entity::Entity;
use crate::core::error::SpecResult;
use crate::core::store::StoreQuery;
use crate::specification::specification::EntitySpecification;

/// Applies every filter; filters combine with logical AND
#[derive(Debug, Clone, Copy, Default)]
pub struct WhereEvaluator;

impl<Q: StoreQuery> Evaluator<Q> for WhereEvaluator {
    fn name(&self) -> &'static str {
        "where"
    }

    fn is_criteria_evaluator(&self) -> bool {
        true
    }

    fn get_query(
        &self,
        mut query: Q,
        specification: &dyn EntitySpecification<Q::Entity>,
    ) -> SpecResult<Q> {
        for expression in specification.where_expressions() {
            expression.criterion().validate()?;
            query = query.filter(expression.criterion());
        }
        Ok(query)
    }
}

impl<T: Entity> InMemoryEvaluator<T> for WhereEvaluator {
    fn name(&self) -> &'static str {
        "where"
    }

    fn evaluate(
        &self,
        mut entities: Vec<T>,
        specification: &dyn EntitySpecification<T>,
    ) -> SpecResult<Vec<T>> {
        let predicates = specification
            .where_expressions()
            .iter()
            .map(|expression| expression.predicate())
            .collect::<SpecResult<Vec<_>>>()?;

        if !predicates.is_empty() {
            entities.retain(|entity| predicates.iter().all(|p| p(entity)));
        }
        Ok(entities)
    }
}
