//! Store traits: the translated query surface and the persistence contract

use crate::core::entity::Entity;
use crate::core::error::RepositoryResult;
use crate::specification::criterion::Criterion;
use crate::specification::expressions::SortDirection;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One `LIKE` term of a translated search group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTerm {
    pub field: String,
    pub pattern: String,
}

/// A store-native query under construction.
///
/// The translated evaluators drive this trait; they never look at entities.
/// Operations compose in call order, the way a query builder does.
pub trait StoreQuery: Sized + Send {
    type Entity: Entity;

    /// Restrict to entities matching `criterion`
    fn filter(self, criterion: &Criterion) -> Self;

    /// Restrict to entities matching at least one term of the group
    fn search(self, group: &[SearchTerm]) -> Self;

    /// Load related data along a dotted path
    fn include(self, path: &str) -> Self;

    /// Replace the ordering with a single primary key
    fn order_by(self, field: &str, direction: SortDirection) -> Self;

    /// Append a tie-breaking key to the current ordering
    fn then_by(self, field: &str, direction: SortDirection) -> Self;

    fn skip(self, count: usize) -> Self;

    fn take(self, count: usize) -> Self;

    fn as_no_tracking(self) -> Self;

    fn as_no_tracking_with_identity_resolution(self) -> Self;

    fn as_split_query(self) -> Self;

    /// Bypass the store's global filters
    fn ignore_query_filters(self) -> Self;
}

/// A change staged for the next `save_changes`
#[derive(Debug, Clone, PartialEq)]
pub enum PendingChange<T> {
    Add(T),
    Update(T),
    Remove(T),
}

impl<T> PendingChange<T> {
    pub fn entity(&self) -> &T {
        match self {
            PendingChange::Add(e) | PendingChange::Update(e) | PendingChange::Remove(e) => e,
        }
    }

    pub fn into_entity(self) -> T {
        match self {
            PendingChange::Add(e) | PendingChange::Update(e) | PendingChange::Remove(e) => e,
        }
    }
}

/// Persistence contract a repository is built on.
///
/// Writes are staged and only become visible once `save_changes` commits
/// them, all or nothing.
#[async_trait]
pub trait DataStore<T: Entity>: Send + Sync {
    type Query: StoreQuery<Entity = T>;

    /// A fresh query over the whole collection
    fn query(&self) -> Self::Query;

    /// Find one entity by id, ignoring global filters
    async fn find(&self, id: i64) -> RepositoryResult<Option<T>>;

    /// Execute a query
    async fn fetch(&self, query: Self::Query) -> RepositoryResult<Vec<T>>;

    /// Count the matches of a query
    async fn count(&self, query: Self::Query) -> RepositoryResult<usize>;

    /// Check whether a query matches anything
    async fn any(&self, query: Self::Query) -> RepositoryResult<bool>;

    /// Stage a change. Transient entities get their id reserved here, so
    /// the returned change carries the identity they will be stored under.
    async fn stage(&self, change: PendingChange<T>) -> RepositoryResult<PendingChange<T>>;

    /// Atomically apply every staged change, returning the affected count
    async fn save_changes(&self) -> RepositoryResult<usize>;

    /// Drop every staged change without applying it
    async fn discard_changes(&self) -> RepositoryResult<()>;
}
