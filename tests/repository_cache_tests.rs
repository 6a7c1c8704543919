//! Repository behavior beyond the shared contract: result caching, global
//! query filters, change tracking and failed writes.

mod harness;

use harness::*;
use specter::prelude::*;
use specter::storage::TrackingMode;
use std::sync::Arc;

fn cached_bob_spec() -> Specification<Issue> {
    Specification::<Issue>::builder()
        .filter(Criterion::eq("assigned_to", "bob"))
        .order_by("id")
        .enable_cache("IssuesFor", ["bob"])
        .unwrap()
        .build()
}

fn executed(repository: &IssueRepository) -> usize {
    repository.store().executed_plans().unwrap().len()
}

// ============================================================================
// Caching
// ============================================================================

#[tokio::test]
async fn test_cache_hit_skips_the_store() {
    let repository = seeded_repository(sample_issues());
    let spec = cached_bob_spec();

    let first = repository.get_by_spec(&spec, None).await.unwrap();
    assert!(repository.is_cached("IssuesFor-bob"));
    assert_eq!(executed(&repository), 1);

    let second = repository.get_by_spec(&spec, None).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(executed(&repository), 1);
}

#[tokio::test]
async fn test_uncached_specification_always_queries() {
    let repository = seeded_repository(sample_issues());
    let spec = Specification::<Issue>::builder()
        .filter(Criterion::eq("assigned_to", "bob"))
        .build();

    repository.get_by_spec(&spec, None).await.unwrap();
    repository.get_by_spec(&spec, None).await.unwrap();
    assert_eq!(executed(&repository), 2);
}

#[tokio::test]
async fn test_writes_invalidate_the_cache() {
    let repository = seeded_repository(sample_issues());
    let spec = cached_bob_spec();
    assert_eq!(ids(&repository.get_by_spec(&spec, None).await.unwrap()), vec![1, 5, 7]);

    let added = repository.add(issue("Fresh bug", Some("bob"))).await.unwrap();
    assert!(!repository.is_cached("IssuesFor-bob"));
    assert_eq!(
        ids(&repository.get_by_spec(&spec, None).await.unwrap()),
        vec![1, 5, 7, added.id]
    );

    repository.remove(&added).await.unwrap();
    assert_eq!(ids(&repository.get_by_spec(&spec, None).await.unwrap()), vec![1, 5, 7]);
}

#[tokio::test]
async fn test_direct_store_writes_are_not_seen_until_invalidation() {
    let repository = seeded_repository(sample_issues());
    let spec = cached_bob_spec();
    repository.get_by_spec(&spec, None).await.unwrap();

    repository
        .store()
        .seed(vec![issue("Seeded", Some("bob"))])
        .unwrap();
    assert_eq!(repository.get_by_spec(&spec, None).await.unwrap().len(), 3);

    // An empty commit leaves the cache alone, a real one clears it
    repository.save_changes().await.unwrap();
    assert!(repository.is_cached("IssuesFor-bob"));
    repository.add(issue("Unrelated", Some("amy"))).await.unwrap();
    assert_eq!(repository.get_by_spec(&spec, None).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_cache_keys_separate_results() {
    let repository = seeded_repository(sample_issues());
    let for_user = |user: &str| {
        Specification::<Issue>::builder()
            .filter(Criterion::eq("assigned_to", user))
            .enable_cache("IssuesFor", [user])
            .unwrap()
            .build()
    };

    let bob = repository.get_by_spec(&for_user("bob"), None).await.unwrap();
    let amy = repository.get_by_spec(&for_user("amy"), None).await.unwrap();
    assert_eq!(ids(&bob), vec![1, 5, 7]);
    assert_eq!(ids(&amy), vec![2, 6]);
    assert!(repository.is_cached("IssuesFor-bob"));
    assert!(repository.is_cached("IssuesFor-amy"));
}

#[tokio::test]
async fn test_cancelled_read_does_not_populate_cache() {
    let repository = seeded_repository(sample_issues());
    let token = CancellationToken::new();
    token.cancel();

    let err = repository
        .get_by_spec(&cached_bob_spec(), Some(&token))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "CANCELLED");
    assert!(!repository.is_cached("IssuesFor-bob"));
    assert_eq!(executed(&repository), 0);
}

#[tokio::test]
async fn test_write_during_a_read_keeps_its_result_out_of_the_cache() {
    let store = ScriptedStore::new(InMemoryStore::new());
    store.inner.seed(scenario_issues()).unwrap();
    let repository = Arc::new(StoreRepository::<Issue, _>::new(store));

    repository.store().hold_next_fetch();
    let reader = {
        let repository = Arc::clone(&repository);
        tokio::spawn(async move { repository.get_by_spec(&cached_bob_spec(), None).await })
    };
    repository.store().fetch_is_held().await;
    repository.add(issue("Delta", Some("bob"))).await.unwrap();
    repository.store().release_fetch();

    // The read in flight returns what it loaded before the write
    assert_eq!(ids(&reader.await.unwrap().unwrap()), vec![1, 3]);
    assert!(!repository.is_cached("IssuesFor-bob"));

    let fresh = repository.get_by_spec(&cached_bob_spec(), None).await.unwrap();
    assert_eq!(ids(&fresh), vec![1, 3, 4]);
    assert!(repository.is_cached("IssuesFor-bob"));
}

// ============================================================================
// Global query filters
// ============================================================================

fn filtered_repository() -> IssueRepository {
    let store = InMemoryStore::with_global_filters(vec![Criterion::eq("archived", false)]);
    store.seed(sample_issues()).unwrap();
    StoreRepository::new(store)
}

#[tokio::test]
async fn test_global_filters_hide_rows() {
    let repository = filtered_repository();
    let bobs = Specification::<Issue>::builder()
        .filter(Criterion::eq("assigned_to", "bob"))
        .build();

    assert_eq!(ids(&repository.get_by_spec(&bobs, None).await.unwrap()), vec![1, 7]);
    assert_eq!(repository.count(None).await.unwrap(), 7);
    assert_eq!(repository.count_by_spec(&bobs, None).await.unwrap(), 2);

    // get_by_id looks rows up directly
    assert!(repository.get_by_id(5, None).await.unwrap().is_some());
}

#[tokio::test]
async fn test_ignore_query_filters() {
    let repository = filtered_repository();
    let everything = Specification::<Issue>::builder()
        .filter(Criterion::eq("assigned_to", "bob"))
        .ignore_query_filters()
        .build();

    assert_eq!(
        ids(&repository.get_by_spec(&everything, None).await.unwrap()),
        vec![1, 5, 7]
    );
    assert_eq!(repository.count_by_spec(&everything, None).await.unwrap(), 3);
}

// ============================================================================
// Tracking and first-result reads
// ============================================================================

#[tokio::test]
async fn test_tracking_follows_specification() {
    let repository = seeded_repository(sample_issues());
    let untracked = Specification::<Issue>::builder()
        .filter(Criterion::eq("assigned_to", "amy"))
        .as_no_tracking()
        .build();
    repository.get_by_spec(&untracked, None).await.unwrap();
    assert!(repository.store().tracked_ids().unwrap().is_empty());

    let tracked = Specification::<Issue>::builder()
        .filter(Criterion::eq("assigned_to", "carol"))
        .build();
    repository.get_by_spec(&tracked, None).await.unwrap();
    assert_eq!(repository.store().tracked_ids().unwrap(), vec![4]);

    let plans = repository.store().executed_plans().unwrap();
    assert_eq!(plans[0].tracking, TrackingMode::NoTracking);
    assert_eq!(plans[1].tracking, TrackingMode::Tracking);
}

#[tokio::test]
async fn test_get_first_limits_the_query_and_skips_post_processing() {
    let repository = seeded_repository(sample_issues());
    let spec = Specification::<Issue>::builder()
        .order_by_descending("priority")
        .post_processing_action(|_| Vec::new())
        .build();

    let first = repository.get_first_by_spec(&spec, None).await.unwrap();
    assert_eq!(first.map(|i| i.id), Some(5));
    assert!(repository.get_by_spec(&spec, None).await.unwrap().is_empty());

    let plans = repository.store().executed_plans().unwrap();
    assert_eq!(plans[0].take, Some(1));
}

#[tokio::test]
async fn test_count_ignores_pagination_and_ordering() {
    let repository = seeded_repository(sample_issues());
    let spec = Specification::<Issue>::builder()
        .filter(Criterion::ge("priority", 2))
        .order_by("title")
        .skip(2)
        .unwrap()
        .take(1)
        .unwrap()
        .build();

    assert_eq!(repository.count_by_spec(&spec, None).await.unwrap(), 6);
    let plans = repository.store().executed_plans().unwrap();
    assert!(plans[0].order.is_empty());
    assert_eq!((plans[0].skip, plans[0].take), (None, None));
}

// ============================================================================
// Failed writes
// ============================================================================

#[tokio::test]
async fn test_failed_stage_leaves_nothing_pending() {
    let store = ScriptedStore::new(InMemoryStore::new()).rejecting("Broken");
    let repository = StoreRepository::<Issue, _>::new(store);

    let err = repository
        .add_range(vec![issue("Fine", None), issue("Broken", None)])
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Storage(_)));
    assert_eq!(repository.store().inner.pending_count().unwrap(), 0);

    // The next write commits only its own change
    repository.add(issue("Later", None)).await.unwrap();
    let titles: Vec<String> = repository
        .get_all(None)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.title)
        .collect();
    assert_eq!(titles, vec!["Later"]);
}
