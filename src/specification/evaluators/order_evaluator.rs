use super::{Evaluator, InMemoryEvaluator};
use crate::core::entity::Entity;
use crate::core::error::{SpecResult, SpecificationError};
use crate::core::field::FieldValue;
use crate::core::store::StoreQuery;
use crate::specification::expressions::{OrderExpression, SortDirection, SortRole};
use crate::specification::specification::EntitySpecification;
use std::cmp::Ordering;

/// Applies the ordering chain.
///
/// At most one primary key is allowed; secondary keys break ties in
/// insertion order. Sorting is stable, so entities equal on every key keep
/// their input order.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderEvaluator;

fn check_single_primary<T>(orders: &[OrderExpression<T>]) -> SpecResult<()>
where
    T: Entity,
{
    let primaries = orders
        .iter()
        .filter(|o| o.role() == SortRole::Primary)
        .count();
    if primaries > 1 {
        return Err(SpecificationError::DuplicateOrderChain);
    }
    Ok(())
}

impl<Q: StoreQuery> Evaluator<Q> for OrderEvaluator {
    fn name(&self) -> &'static str {
        "order"
    }

    fn is_criteria_evaluator(&self) -> bool {
        false
    }

    fn get_query(
        &self,
        mut query: Q,
        specification: &dyn EntitySpecification<Q::Entity>,
    ) -> SpecResult<Q> {
        let orders = specification.order_expressions();
        check_single_primary(orders)?;

        for (idx, order) in orders.iter().enumerate() {
            query = if idx == 0 {
                query.order_by(order.field(), order.direction())
            } else {
                query.then_by(order.field(), order.direction())
            };
        }
        Ok(query)
    }
}

impl<T: Entity> InMemoryEvaluator<T> for OrderEvaluator {
    fn name(&self) -> &'static str {
        "order"
    }

    fn evaluate(
        &self,
        entities: Vec<T>,
        specification: &dyn EntitySpecification<T>,
    ) -> SpecResult<Vec<T>> {
        let orders = specification.order_expressions();
        check_single_primary(orders)?;
        if orders.is_empty() {
            return Ok(entities);
        }

        let keys: Vec<_> = orders
            .iter()
            .map(|o| (o.key_selector(), o.direction()))
            .collect();

        let mut keyed: Vec<(Vec<FieldValue>, T)> = entities
            .into_iter()
            .map(|entity| {
                let values = keys.iter().map(|(key, _)| key(&entity)).collect();
                (values, entity)
            })
            .collect();

        keyed.sort_by(|(a, _), (b, _)| {
            for (idx, (_, direction)) in keys.iter().enumerate() {
                let ordering = match direction {
                    SortDirection::Ascending => a[idx].sort_cmp(&b[idx]),
                    SortDirection::Descending => b[idx].sort_cmp(&a[idx]),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        Ok(keyed.into_iter().map(|(_, entity)| entity).collect())
    }
}
