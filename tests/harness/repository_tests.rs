//! Macro-generated test suite for `Repository<Issue>` contract validation.
//!
//! The `repository_contract_tests!` macro generates a test module that
//! validates any `Repository<Issue>` implementation against the full
//! contract: writes with id assignment, specification reads, projections,
//! counting, cancellation, error propagation and concurrent writes.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod harness;
//!
//! use harness::*;
//!
//! repository_contract_tests!(StoreRepository::<Issue, _>::new(InMemoryStore::new()));
//! ```
//!
//! # Generated Tests
//!
//! ## Writes
//! - `test_add_assigns_id`: transient entity gets an id, readable by id
//! - `test_add_range_preserves_order`: ids follow input order
//! - `test_update_existing` / `test_update_nonexistent`
//! - `test_remove_existing` / `test_remove_nonexistent`
//!
//! ## Reads
//! - `test_get_by_spec_scenario`: bob's issues are [1, 3]
//! - `test_get_first_by_spec` / `test_get_first_by_spec_empty`
//! - `test_projection` / `test_projection_requires_selector`
//! - `test_count_and_any`: counting ignores ordering and pagination
//! - `test_post_processing_applies_to_list_reads`
//!
//! ## Errors
//! - `test_cancelled_token`: reads fail with `Cancelled`
//! - `test_duplicate_order_chain`: defective specification surfaces
//! - `test_invalid_search_pattern`
//!
//! ## Concurrency
//! - `test_concurrent_adds`: parallel adds from spawned tasks get unique ids

/// Generate a full `Repository<Issue>` conformance test suite.
///
/// `$factory` must evaluate to an empty repository implementing
/// `Repository<Issue> + 'static`. It is re-evaluated for each test.
#[macro_export]
macro_rules! repository_contract_tests {
    ($factory:expr) => {
        mod repository_contract_tests {
            use super::*;
            use specter::prelude::*;
            use std::sync::Arc;

            async fn scenario_repository() -> impl Repository<Issue> {
                let repository = $factory;
                repository
                    .add_range(vec![
                        issue("Alpha", Some("bob")),
                        issue("Beta", Some("amy")),
                        issue("Gamma", Some("bob")),
                    ])
                    .await
                    .unwrap();
                repository
            }

            fn bobs_issues() -> Specification<Issue> {
                Specification::<Issue>::builder()
                    .filter(Criterion::eq("assigned_to", "bob"))
                    .build()
            }

            // ==================================================================
            // Writes
            // ==================================================================

            #[tokio::test]
            async fn test_add_assigns_id() {
                let repository = $factory;
                let added = repository.add(issue("Alpha", Some("bob"))).await.unwrap();
                assert!(!added.is_transient());

                let found = repository.get_by_id(added.id, None).await.unwrap();
                assert_eq!(found, Some(added));
            }

            #[tokio::test]
            async fn test_add_range_preserves_order() {
                let repository = scenario_repository().await;
                let all = repository.get_all(None).await.unwrap();
                let titles: Vec<&str> = all.iter().map(|i| i.title.as_str()).collect();
                assert_eq!(titles, vec!["Alpha", "Beta", "Gamma"]);
                assert!(all.windows(2).all(|w| w[0].id < w[1].id));
            }

            #[tokio::test]
            async fn test_update_existing() {
                let repository = $factory;
                let mut added = repository.add(issue("Alpha", None)).await.unwrap();
                added.assigned_to = Some("amy".to_string());

                repository.update(added.clone()).await.unwrap();
                let found = repository.get_by_id(added.id, None).await.unwrap().unwrap();
                assert_eq!(found.assigned_to.as_deref(), Some("amy"));
            }

            #[tokio::test]
            async fn test_update_nonexistent() {
                let repository = $factory;
                let err = repository
                    .update(issue("Ghost", None).with_id(404))
                    .await
                    .unwrap_err();
                assert!(matches!(err, RepositoryError::NotFound { id: 404, .. }));
            }

            #[tokio::test]
            async fn test_remove_existing() {
                let repository = scenario_repository().await;
                let beta = repository
                    .get_first_by_spec(
                        &Specification::<Issue>::builder()
                            .filter(Criterion::eq("title", "Beta"))
                            .build(),
                        None,
                    )
                    .await
                    .unwrap()
                    .unwrap();

                assert_eq!(repository.remove(&beta).await.unwrap(), 1);
                assert_eq!(repository.get_by_id(beta.id, None).await.unwrap(), None);
                assert_eq!(repository.count(None).await.unwrap(), 2);
            }

            #[tokio::test]
            async fn test_remove_nonexistent() {
                let repository = scenario_repository().await;
                let err = repository
                    .remove(&issue("Ghost", None).with_id(404))
                    .await
                    .unwrap_err();
                assert_eq!(err.error_code(), "ENTITY_NOT_FOUND");
                assert_eq!(repository.count(None).await.unwrap(), 3);
            }

            #[tokio::test]
            async fn test_remove_range() {
                let repository = scenario_repository().await;
                let bobs = repository.get_by_spec(&bobs_issues(), None).await.unwrap();
                assert_eq!(repository.remove_range(&bobs).await.unwrap(), 2);
                assert!(!repository.any_by_spec(&bobs_issues(), None).await.unwrap());
            }

            #[tokio::test]
            async fn test_save_changes_with_nothing_staged() {
                let repository = $factory;
                assert_eq!(repository.save_changes().await.unwrap(), 0);
            }

            // ==================================================================
            // Reads
            // ==================================================================

            #[tokio::test]
            async fn test_get_by_spec_scenario() {
                let repository = scenario_repository().await;
                let bobs = repository.get_by_spec(&bobs_issues(), None).await.unwrap();
                let titles: Vec<&str> = bobs.iter().map(|i| i.title.as_str()).collect();
                assert_eq!(titles, vec!["Alpha", "Gamma"]);
            }

            #[tokio::test]
            async fn test_get_first_by_spec() {
                let repository = scenario_repository().await;
                let spec = Specification::<Issue>::builder()
                    .filter(Criterion::eq("assigned_to", "bob"))
                    .order_by_descending("title")
                    .build();
                let first = repository.get_first_by_spec(&spec, None).await.unwrap();
                assert_eq!(first.map(|i| i.title), Some("Gamma".to_string()));
            }

            #[tokio::test]
            async fn test_get_first_by_spec_empty() {
                let repository = scenario_repository().await;
                let spec = Specification::<Issue>::builder()
                    .filter(Criterion::eq("assigned_to", "nobody"))
                    .build();
                assert_eq!(repository.get_first_by_spec(&spec, None).await.unwrap(), None);
            }

            #[tokio::test]
            async fn test_projection() {
                let repository = scenario_repository().await;
                let spec = Specification::<Issue, String>::builder()
                    .filter(Criterion::eq("assigned_to", "bob"))
                    .order_by_descending("title")
                    .select(|i| i.title.to_uppercase())
                    .build();

                let titles = repository.get_projected_by_spec(&spec, None).await.unwrap();
                assert_eq!(titles, vec!["GAMMA".to_string(), "ALPHA".to_string()]);

                let first = repository
                    .get_first_projected_by_spec(&spec, None)
                    .await
                    .unwrap();
                assert_eq!(first.as_deref(), Some("GAMMA"));
            }

            #[tokio::test]
            async fn test_projection_requires_selector() {
                let repository = scenario_repository().await;
                let spec = Specification::<Issue, String>::builder().build();
                let err = repository
                    .get_projected_by_spec(&spec, None)
                    .await
                    .unwrap_err();
                assert!(matches!(
                    err,
                    RepositoryError::Specification(SpecificationError::MissingSelector)
                ));
            }

            #[tokio::test]
            async fn test_count_and_any() {
                let repository = $factory;
                assert_eq!(repository.count(None).await.unwrap(), 0);
                assert!(!repository.any(None).await.unwrap());

                let repository = scenario_repository().await;
                let paged = Specification::<Issue>::builder()
                    .filter(Criterion::eq("assigned_to", "bob"))
                    .order_by("title")
                    .skip(1)
                    .unwrap()
                    .take(1)
                    .unwrap()
                    .build();
                assert_eq!(repository.count(None).await.unwrap(), 3);
                assert_eq!(repository.count_by_spec(&paged, None).await.unwrap(), 2);
                assert!(repository.any_by_spec(&paged, None).await.unwrap());
                assert_eq!(repository.get_by_spec(&paged, None).await.unwrap().len(), 1);
            }

            #[tokio::test]
            async fn test_post_processing_applies_to_list_reads() {
                let repository = scenario_repository().await;
                let spec = Specification::<Issue>::builder()
                    .order_by("title")
                    .post_processing_action(|mut issues| {
                        issues.reverse();
                        issues
                    })
                    .build();
                let titles: Vec<String> = repository
                    .get_by_spec(&spec, None)
                    .await
                    .unwrap()
                    .into_iter()
                    .map(|i| i.title)
                    .collect();
                assert_eq!(titles, vec!["Gamma", "Beta", "Alpha"]);
            }

            // ==================================================================
            // Errors
            // ==================================================================

            #[tokio::test]
            async fn test_cancelled_token() {
                let repository = scenario_repository().await;
                let token = CancellationToken::new();
                token.cancel();

                let err = repository
                    .get_by_spec(&bobs_issues(), Some(&token))
                    .await
                    .unwrap_err();
                assert!(matches!(err, RepositoryError::Cancelled));
                assert!(repository.count(Some(&token)).await.is_err());

                let live = CancellationToken::new();
                assert_eq!(repository.count(Some(&live)).await.unwrap(), 3);
            }

            #[tokio::test]
            async fn test_duplicate_order_chain() {
                let repository = scenario_repository().await;
                let spec = Specification::<Issue>::builder()
                    .order_by("title")
                    .order_by("id")
                    .build();
                let err = repository.get_by_spec(&spec, None).await.unwrap_err();
                assert!(err.is_programming_error());
                assert_eq!(err.error_code(), "DUPLICATE_ORDER_CHAIN");
            }

            #[tokio::test]
            async fn test_invalid_search_pattern() {
                let repository = scenario_repository().await;
                let spec = Specification::<Issue>::builder()
                    .search("title", "[unterminated")
                    .build();
                let err = repository.get_by_spec(&spec, None).await.unwrap_err();
                assert_eq!(err.error_code(), "INVALID_SEARCH_PATTERN");
            }

            // ==================================================================
            // Concurrency
            // ==================================================================

            #[tokio::test]
            async fn test_concurrent_adds() {
                let repository = Arc::new($factory);
                let mut handles = Vec::new();
                for n in 0..10 {
                    let repository = Arc::clone(&repository);
                    handles.push(tokio::spawn(async move {
                        repository
                            .add(issue(&format!("Issue {}", n), None))
                            .await
                            .unwrap()
                    }));
                }

                let mut assigned = Vec::new();
                for handle in handles {
                    assigned.push(handle.await.unwrap().id);
                }
                assigned.sort();
                assigned.dedup();
                assert_eq!(assigned.len(), 10);
                assert_eq!(repository.count(None).await.unwrap(), 10);
            }
        }
    };
}
