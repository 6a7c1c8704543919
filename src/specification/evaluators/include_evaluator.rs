use super::Evaluator;
use crate::core::error::SpecResult;
use crate::core::store::StoreQuery;
use crate::specification::expressions::IncludeType;
use crate::specification::specification::EntitySpecification;

/// Translates include paths into eager-loading instructions.
///
/// A typed include chain becomes one path per step (`project`, then
/// `project.owner`), followed by the raw include strings. In-memory
/// sequences are already materialized, so there is no in-memory
/// counterpart.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncludeEvaluator;

impl<Q: StoreQuery> Evaluator<Q> for IncludeEvaluator {
    fn name(&self) -> &'static str {
        "include"
    }

    fn is_criteria_evaluator(&self) -> bool {
        false
    }

    fn get_query(
        &self,
        mut query: Q,
        specification: &dyn EntitySpecification<Q::Entity>,
    ) -> SpecResult<Q> {
        for include in specification.include_expressions() {
            if include.include_type == IncludeType::ThenInclude {
                tracing::trace!(path = %include.path, "extending include chain");
            }
            query = query.include(&include.path);
        }
        for path in specification.include_strings() {
            query = query.include(path);
        }
        Ok(query)
    }
}
