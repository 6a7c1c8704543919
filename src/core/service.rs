//! Repository traits for specification-driven data access

use crate::core::entity::AggregateRoot;
use crate::core::error::RepositoryResult;
use crate::specification::Specification;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Read side of a repository.
///
/// Every operation takes an optional cancellation token; a cancelled token
/// makes the operation fail with `Cancelled` without touching the store.
/// Count and existence operations ignore ordering, includes and pagination
/// of a specification; filters, search and query hints still apply.
#[async_trait]
pub trait ReadRepository<T: AggregateRoot>: Send + Sync {
    /// Get an entity by id
    async fn get_by_id(
        &self,
        id: i64,
        cancel: Option<&CancellationToken>,
    ) -> RepositoryResult<Option<T>>;

    /// List every entity
    async fn get_all(&self, cancel: Option<&CancellationToken>) -> RepositoryResult<Vec<T>>;

    /// First entity of the specification's result, if any
    async fn get_first_by_spec(
        &self,
        specification: &Specification<T>,
        cancel: Option<&CancellationToken>,
    ) -> RepositoryResult<Option<T>>;

    /// First projected element of the specification's result, if any
    async fn get_first_projected_by_spec<R: Send + 'static>(
        &self,
        specification: &Specification<T, R>,
        cancel: Option<&CancellationToken>,
    ) -> RepositoryResult<Option<R>>;

    /// Entities matching the specification, post-processed
    async fn get_by_spec(
        &self,
        specification: &Specification<T>,
        cancel: Option<&CancellationToken>,
    ) -> RepositoryResult<Vec<T>>;

    /// Projected result of the specification, post-processed
    async fn get_projected_by_spec<R: Send + 'static>(
        &self,
        specification: &Specification<T, R>,
        cancel: Option<&CancellationToken>,
    ) -> RepositoryResult<Vec<R>>;

    /// Number of entities
    async fn count(&self, cancel: Option<&CancellationToken>) -> RepositoryResult<usize>;

    /// Number of entities matching the specification's criteria
    async fn count_by_spec(
        &self,
        specification: &Specification<T>,
        cancel: Option<&CancellationToken>,
    ) -> RepositoryResult<usize>;

    /// Whether any entity exists
    async fn any(&self, cancel: Option<&CancellationToken>) -> RepositoryResult<bool>;

    /// Whether any entity matches the specification's criteria
    async fn any_by_spec(
        &self,
        specification: &Specification<T>,
        cancel: Option<&CancellationToken>,
    ) -> RepositoryResult<bool>;
}

/// Full repository: reads plus writes.
///
/// Each write stages its changes and persists them with a single
/// `save_changes`, so a write either fully applies or not at all.
#[async_trait]
pub trait Repository<T: AggregateRoot>: ReadRepository<T> {
    /// Add an entity, returning it with its assigned id
    async fn add(&self, entity: T) -> RepositoryResult<T>;

    /// Add several entities in one commit
    async fn add_range(&self, entities: Vec<T>) -> RepositoryResult<Vec<T>>;

    /// Replace a stored entity
    async fn update(&self, entity: T) -> RepositoryResult<T>;

    /// Remove an entity, returning the number of affected rows
    async fn remove(&self, entity: &T) -> RepositoryResult<usize>;

    /// Remove several entities in one commit
    async fn remove_range(&self, entities: &[T]) -> RepositoryResult<usize>;

    /// Persist anything staged directly on the store
    async fn save_changes(&self) -> RepositoryResult<usize>;
}
