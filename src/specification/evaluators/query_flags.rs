//! Evaluators forwarding query hints to the store
//!
//! They tune how a store executes a query (change tracking, split loading,
//! global filters). All of them also run for count and existence queries:
//! bypassing global filters changes what gets counted.

use super::Evaluator;
use crate::core::error::SpecResult;
use crate::core::store::StoreQuery;
use crate::specification::specification::EntitySpecification;

macro_rules! flag_evaluator {
    ($(#[$doc:meta])* $name:ident, $label:literal, $flag:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl<Q: StoreQuery> Evaluator<Q> for $name {
            fn name(&self) -> &'static str {
                $label
            }

            fn is_criteria_evaluator(&self) -> bool {
                true
            }

            fn get_query(
                &self,
                query: Q,
                specification: &dyn EntitySpecification<Q::Entity>,
            ) -> SpecResult<Q> {
                Ok(if specification.$flag() {
                    query.$flag()
                } else {
                    query
                })
            }
        }
    };
}

flag_evaluator!(
    /// Disables change tracking for the returned entities
    AsNoTrackingEvaluator,
    "as_no_tracking",
    as_no_tracking
);

flag_evaluator!(
    /// Disables change tracking while still resolving duplicate identities
    AsNoTrackingWithIdentityResolutionEvaluator,
    "as_no_tracking_with_identity_resolution",
    as_no_tracking_with_identity_resolution
);

flag_evaluator!(
    /// Loads included collections with separate queries
    AsSplitQueryEvaluator,
    "as_split_query",
    as_split_query
);

flag_evaluator!(
    /// Bypasses the store's global filters
    IgnoreQueryFiltersEvaluator,
    "ignore_query_filters",
    ignore_query_filters
);
