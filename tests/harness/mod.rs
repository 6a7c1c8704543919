//! Shared test harness for specification and repository testing
//!
//! Provides the `Issue` aggregate (fields covering string, optional string,
//! integer, float and boolean values), fixture data, and helpers that run
//! one specification through both backends.
//!
//! # Usage
//!
//! From any integration test file in `tests/`:
//! ```rust,ignore
//! #[macro_use]
//! mod harness;
//! use harness::*;
//! ```

#![allow(dead_code)]

pub mod repository_tests;

use specter::prelude::*;
use specter::specification::evaluators::{SearchEvaluator, WhereEvaluator};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

impl_entity!(Issue, "issues", {
    title: String,
    assigned_to: Option<String>,
    priority: i64,
    estimate: f64,
    archived: bool,
});

impl_child_entity!(Project, "projects", { name: String });

impl_child_entity!(Person, "people", { login: String });

pub const ISSUE_PROJECT: Relation<Issue, Project> = Relation::new("project");
pub const PROJECT_OWNER: Relation<Project, Person> = Relation::new("owner");

pub type IssueRepository = StoreRepository<Issue, InMemoryStore<Issue>>;

/// Transient issue with defaults for the fields a test does not care about
pub fn issue(title: &str, assigned_to: Option<&str>) -> Issue {
    Issue::new(
        title.to_string(),
        assigned_to.map(str::to_string),
        0,
        0.0,
        false,
    )
}

/// The three-issue dataset: Alpha and Gamma belong to bob, Beta to amy
pub fn scenario_issues() -> Vec<Issue> {
    vec![
        issue("Alpha", Some("bob")).with_id(1),
        issue("Beta", Some("amy")).with_id(2),
        issue("Gamma", Some("bob")).with_id(3),
    ]
}

/// A varied dataset with ties, nulls and mixed priorities
pub fn sample_issues() -> Vec<Issue> {
    let rows = [
        ("Login page broken", Some("bob"), 3, 2.0, false),
        ("Signup copy typo", Some("amy"), 1, 0.5, false),
        ("Login timeout", None, 3, 5.0, false),
        ("Dark mode", Some("carol"), 2, 8.0, false),
        ("Crash on logout", Some("bob"), 5, 3.0, true),
        ("Search is slow", Some("amy"), 3, 13.0, false),
        ("Profile avatar", Some("bob"), 1, 1.0, false),
        ("Export to CSV", None, 2, 3.0, false),
    ];
    rows.into_iter()
        .enumerate()
        .map(|(idx, (title, owner, priority, estimate, archived))| {
            Issue::new(
                title.to_string(),
                owner.map(str::to_string),
                priority,
                estimate,
                archived,
            )
            .with_id(idx as i64 + 1)
        })
        .collect()
}

pub fn ids(issues: &[Issue]) -> Vec<i64> {
    issues.iter().map(|i| i.id).collect()
}

/// Repository over a store seeded with `issues`
pub fn seeded_repository(issues: Vec<Issue>) -> IssueRepository {
    let store = InMemoryStore::new();
    store.seed(issues).expect("seeding an in-memory store");
    StoreRepository::new(store)
}

/// Membership under filters and search only, the way count queries see it
pub fn criteria_matches(spec: &Specification<Issue>, data: Vec<Issue>) -> Vec<Issue> {
    InMemorySpecificationEvaluator::new(vec![Arc::new(WhereEvaluator), Arc::new(SearchEvaluator)])
        .apply(data, spec)
        .expect("criteria evaluation")
}

/// Run `spec` in memory and through a repository, assert both agree, and
/// return the resulting ids
pub async fn assert_backends_agree(spec: &Specification<Issue>, data: Vec<Issue>) -> Vec<i64> {
    let in_memory = spec.evaluate(data.clone()).expect("in-memory evaluation");
    let repository = seeded_repository(data.clone());
    let stored = repository
        .get_by_spec(spec, None)
        .await
        .expect("repository evaluation");
    assert_eq!(ids(&in_memory), ids(&stored), "backends disagree on {:?}", spec);

    let counted = repository
        .count_by_spec(spec, None)
        .await
        .expect("repository count");
    assert_eq!(counted, criteria_matches(spec, data).len());

    ids(&in_memory)
}

/// Store wrapper that can hold a read after it has loaded its rows and can
/// refuse to stage issues with a given title
pub struct ScriptedStore {
    pub inner: InMemoryStore<Issue>,
    hold_next_fetch: AtomicBool,
    fetch_held: Notify,
    fetch_released: Notify,
    rejected_title: Option<String>,
}

impl ScriptedStore {
    pub fn new(inner: InMemoryStore<Issue>) -> Self {
        Self {
            inner,
            hold_next_fetch: AtomicBool::new(false),
            fetch_held: Notify::new(),
            fetch_released: Notify::new(),
            rejected_title: None,
        }
    }

    /// Fail `stage` for any issue titled `title`
    pub fn rejecting(mut self, title: &str) -> Self {
        self.rejected_title = Some(title.to_string());
        self
    }

    /// Make the next `fetch` wait for `release_fetch` before returning
    pub fn hold_next_fetch(&self) {
        self.hold_next_fetch.store(true, Ordering::SeqCst);
    }

    /// Wait until a held `fetch` has loaded its rows
    pub async fn fetch_is_held(&self) {
        self.fetch_held.notified().await;
    }

    pub fn release_fetch(&self) {
        self.fetch_released.notify_one();
    }
}

#[async_trait]
impl DataStore<Issue> for ScriptedStore {
    type Query = QueryPlan<Issue>;

    fn query(&self) -> QueryPlan<Issue> {
        self.inner.query()
    }

    async fn find(&self, id: i64) -> RepositoryResult<Option<Issue>> {
        self.inner.find(id).await
    }

    async fn fetch(&self, query: QueryPlan<Issue>) -> RepositoryResult<Vec<Issue>> {
        let rows = self.inner.fetch(query).await?;
        if self.hold_next_fetch.swap(false, Ordering::SeqCst) {
            self.fetch_held.notify_one();
            self.fetch_released.notified().await;
        }
        Ok(rows)
    }

    async fn count(&self, query: QueryPlan<Issue>) -> RepositoryResult<usize> {
        self.inner.count(query).await
    }

    async fn any(&self, query: QueryPlan<Issue>) -> RepositoryResult<bool> {
        self.inner.any(query).await
    }

    async fn stage(&self, change: PendingChange<Issue>) -> RepositoryResult<PendingChange<Issue>> {
        if self.rejected_title.as_deref() == Some(change.entity().title.as_str()) {
            return Err(RepositoryError::Storage(format!(
                "cannot stage issue '{}'",
                change.entity().title
            )));
        }
        self.inner.stage(change).await
    }

    async fn save_changes(&self) -> RepositoryResult<usize> {
        self.inner.save_changes().await
    }

    async fn discard_changes(&self) -> RepositoryResult<()> {
        self.inner.discard_changes().await
    }
}
