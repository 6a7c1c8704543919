use super::{Evaluator, InMemoryEvaluator};
use crate::core::entity::Entity;
use crate::core::error::SpecResult;
use crate::core::store::{SearchTerm, StoreQuery};
use crate::specification::expressions::search_groups;
use crate::specification::specification::EntitySpecification;

/// Applies search criteria: OR within a group, AND across groups.
///
/// Criteria with an empty search term are ignored, and a group left with no
/// effective criteria does not filter anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchEvaluator;

impl<Q: StoreQuery> Evaluator<Q> for SearchEvaluator {
    fn name(&self) -> &'static str {
        "search"
    }

    fn is_criteria_evaluator(&self) -> bool {
        true
    }

    fn get_query(
        &self,
        mut query: Q,
        specification: &dyn EntitySpecification<Q::Entity>,
    ) -> SpecResult<Q> {
        for (_, members) in search_groups(specification.search_criteria()) {
            let mut terms = Vec::with_capacity(members.len());
            for criterion in members {
                criterion.pattern()?;
                terms.push(SearchTerm {
                    field: criterion.field().to_string(),
                    pattern: criterion.search_term().to_string(),
                });
            }
            query = query.search(&terms);
        }
        Ok(query)
    }
}

impl<T: Entity> InMemoryEvaluator<T> for SearchEvaluator {
    fn name(&self) -> &'static str {
        "search"
    }

    fn evaluate(
        &self,
        mut entities: Vec<T>,
        specification: &dyn EntitySpecification<T>,
    ) -> SpecResult<Vec<T>> {
        for (_, members) in search_groups(specification.search_criteria()) {
            let compiled = members
                .iter()
                .map(|c| -> SpecResult<_> { Ok((c.selector(), c.pattern()?)) })
                .collect::<SpecResult<Vec<_>>>()?;

            entities.retain(|entity| {
                compiled.iter().any(|(selector, pattern)| {
                    selector(entity).is_some_and(|text| pattern.is_match(&text))
                })
            });
        }
        Ok(entities)
    }
}
