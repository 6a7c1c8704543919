//! Repository over any [`DataStore`], driven by the translated-query pipeline

use crate::config::{CacheConfig, EngineConfig};
use crate::core::entity::AggregateRoot;
use crate::core::error::{RepositoryError, RepositoryResult};
use crate::core::service::{ReadRepository, Repository};
use crate::core::store::{DataStore, PendingChange, StoreQuery};
use crate::specification::evaluators::SpecificationEvaluator;
use crate::specification::specification::{EntitySpecification, Specification};
use async_trait::async_trait;
use moka::sync::Cache;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Cache of materialized results, keyed by specification cache key.
///
/// Every `clear` bumps the generation; a result read under an older
/// generation is never kept.
#[derive(Clone)]
struct ResultCache<T> {
    cache: Cache<String, Arc<Vec<T>>>,
    generation: Arc<AtomicU64>,
}

impl<T: Clone + Send + Sync + 'static> ResultCache<T> {
    fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity.max(1))
            .time_to_live(config.ttl())
            .build();
        Self {
            cache,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn get(&self, key: &str) -> Option<Vec<T>> {
        self.cache.get(key).map(|hit| hit.as_ref().clone())
    }

    /// Store `value` unless the cache was cleared since `generation`
    fn put(&self, key: &str, value: &[T], generation: u64) {
        if self.generation() != generation {
            return;
        }
        self.cache.insert(key.to_string(), Arc::new(value.to_vec()));
        // A clear racing the insert may have missed it
        if self.generation() != generation {
            self.cache.invalidate(key);
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.cache.contains_key(key)
    }

    fn clear(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate_all();
    }
}

fn check_cancelled(cancel: Option<&CancellationToken>) -> RepositoryResult<()> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(RepositoryError::Cancelled),
        _ => Ok(()),
    }
}

/// Repository translating specifications into store queries.
///
/// Results of specifications with caching enabled are kept in a bounded,
/// time-limited cache that every successful write clears.
///
/// # Example
///
/// ```rust,ignore
/// let repository = StoreRepository::new(InMemoryStore::<Issue>::new());
/// let mine = repository.get_by_spec(&my_issues("bob"), None).await?;
/// ```
pub struct StoreRepository<T: AggregateRoot, S: DataStore<T>> {
    store: Arc<S>,
    evaluator: SpecificationEvaluator<S::Query>,
    cache: ResultCache<T>,
    write_lock: Mutex<()>,
}

impl<T, S> StoreRepository<T, S>
where
    T: AggregateRoot,
    S: DataStore<T>,
    S::Query: 'static,
{
    /// Create a repository with the default evaluator and cache settings
    pub fn new(store: S) -> Self {
        Self::with_cache_config(store, &CacheConfig::default())
    }

    /// Create a repository using the cache settings of `config`
    pub fn from_config(store: S, config: &EngineConfig) -> Self {
        Self::with_cache_config(store, &config.cache)
    }

    pub fn with_cache_config(store: S, cache: &CacheConfig) -> Self {
        Self {
            store: Arc::new(store),
            evaluator: SpecificationEvaluator::default(),
            cache: ResultCache::new(cache),
            write_lock: Mutex::new(()),
        }
    }

    /// Replace the translated-query pipeline
    pub fn with_evaluator(mut self, evaluator: SpecificationEvaluator<S::Query>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether a result is cached under `key`
    pub fn is_cached(&self, key: &str) -> bool {
        self.cache.contains(key)
    }

    fn translate(
        &self,
        specification: &dyn EntitySpecification<T>,
        criteria_only: bool,
    ) -> RepositoryResult<S::Query> {
        Ok(self
            .evaluator
            .get_query(self.store.query(), specification, criteria_only)?)
    }

    /// Stage `changes` and persist them with one `save_changes`, returning
    /// the staged entities and the affected count
    async fn commit(&self, changes: Vec<PendingChange<T>>) -> RepositoryResult<(Vec<T>, usize)> {
        let _guard = self.write_lock.lock().await;

        let mut staged = Vec::with_capacity(changes.len());
        for change in changes {
            match self.store.stage(change).await {
                Ok(change) => staged.push(change.into_entity()),
                Err(err) => {
                    if let Err(discard) = self.store.discard_changes().await {
                        tracing::warn!(
                            entity = T::resource_name(),
                            error = %discard,
                            "failed to discard staged changes"
                        );
                    }
                    return Err(err);
                }
            }
        }
        let affected = self.store.save_changes().await?;
        self.cache.clear();

        tracing::debug!(
            entity = T::resource_name(),
            affected,
            "repository write committed"
        );
        Ok((staged, affected))
    }
}

#[async_trait]
impl<T, S> ReadRepository<T> for StoreRepository<T, S>
where
    T: AggregateRoot,
    S: DataStore<T>,
    S::Query: 'static,
{
    async fn get_by_id(
        &self,
        id: i64,
        cancel: Option<&CancellationToken>,
    ) -> RepositoryResult<Option<T>> {
        check_cancelled(cancel)?;
        self.store.find(id).await
    }

    async fn get_all(&self, cancel: Option<&CancellationToken>) -> RepositoryResult<Vec<T>> {
        check_cancelled(cancel)?;
        self.store.fetch(self.store.query()).await
    }

    async fn get_first_by_spec(
        &self,
        specification: &Specification<T>,
        cancel: Option<&CancellationToken>,
    ) -> RepositoryResult<Option<T>> {
        check_cancelled(cancel)?;
        let query = self.translate(specification, false)?.take(1);
        let mut entities = self.store.fetch(query).await?;
        check_cancelled(cancel)?;
        Ok(entities.pop())
    }

    async fn get_first_projected_by_spec<R: Send + 'static>(
        &self,
        specification: &Specification<T, R>,
        cancel: Option<&CancellationToken>,
    ) -> RepositoryResult<Option<R>> {
        check_cancelled(cancel)?;
        let projected = self
            .evaluator
            .get_projected_query(self.store.query(), specification)?;
        let entities = self.store.fetch(projected.query.take(1)).await?;
        check_cancelled(cancel)?;
        Ok(entities.first().map(|entity| (projected.selector)(entity)))
    }

    async fn get_by_spec(
        &self,
        specification: &Specification<T>,
        cancel: Option<&CancellationToken>,
    ) -> RepositoryResult<Vec<T>> {
        check_cancelled(cancel)?;

        let cache_key = specification
            .cache_enabled()
            .then(|| specification.cache_key())
            .flatten();
        if let Some(key) = cache_key {
            if let Some(hit) = self.cache.get(key) {
                tracing::debug!(cache_key = key, "specification result served from cache");
                return Ok(hit);
            }
        }

        let generation = self.cache.generation();
        let query = self.translate(specification, false)?;
        let entities = self.store.fetch(query).await?;
        check_cancelled(cancel)?;

        let result = match specification.post_processing_action() {
            Some(action) => action(entities),
            None => entities,
        };
        if let Some(key) = cache_key {
            self.cache.put(key, &result, generation);
        }
        Ok(result)
    }

    async fn get_projected_by_spec<R: Send + 'static>(
        &self,
        specification: &Specification<T, R>,
        cancel: Option<&CancellationToken>,
    ) -> RepositoryResult<Vec<R>> {
        check_cancelled(cancel)?;
        let projected = self
            .evaluator
            .get_projected_query(self.store.query(), specification)?;
        let entities = self.store.fetch(projected.query).await?;
        check_cancelled(cancel)?;

        let result: Vec<R> = entities.iter().map(|e| (projected.selector)(e)).collect();
        Ok(match specification.post_processing_action() {
            Some(action) => action(result),
            None => result,
        })
    }

    async fn count(&self, cancel: Option<&CancellationToken>) -> RepositoryResult<usize> {
        check_cancelled(cancel)?;
        self.store.count(self.store.query()).await
    }

    async fn count_by_spec(
        &self,
        specification: &Specification<T>,
        cancel: Option<&CancellationToken>,
    ) -> RepositoryResult<usize> {
        check_cancelled(cancel)?;
        let query = self.translate(specification, true)?;
        self.store.count(query).await
    }

    async fn any(&self, cancel: Option<&CancellationToken>) -> RepositoryResult<bool> {
        check_cancelled(cancel)?;
        self.store.any(self.store.query()).await
    }

    async fn any_by_spec(
        &self,
        specification: &Specification<T>,
        cancel: Option<&CancellationToken>,
    ) -> RepositoryResult<bool> {
        check_cancelled(cancel)?;
        let query = self.translate(specification, true)?;
        self.store.any(query).await
    }
}

#[async_trait]
impl<T, S> Repository<T> for StoreRepository<T, S>
where
    T: AggregateRoot,
    S: DataStore<T>,
    S::Query: 'static,
{
    async fn add(&self, entity: T) -> RepositoryResult<T> {
        let (mut added, _) = self.commit(vec![PendingChange::Add(entity)]).await?;
        added
            .pop()
            .ok_or_else(|| RepositoryError::Storage("store returned no entity".to_string()))
    }

    async fn add_range(&self, entities: Vec<T>) -> RepositoryResult<Vec<T>> {
        let (added, _) = self
            .commit(entities.into_iter().map(PendingChange::Add).collect())
            .await?;
        Ok(added)
    }

    async fn update(&self, entity: T) -> RepositoryResult<T> {
        let (mut updated, _) = self.commit(vec![PendingChange::Update(entity)]).await?;
        updated
            .pop()
            .ok_or_else(|| RepositoryError::Storage("store returned no entity".to_string()))
    }

    async fn remove(&self, entity: &T) -> RepositoryResult<usize> {
        let (_, affected) = self
            .commit(vec![PendingChange::Remove(entity.clone())])
            .await?;
        Ok(affected)
    }

    async fn remove_range(&self, entities: &[T]) -> RepositoryResult<usize> {
        let changes = entities
            .iter()
            .cloned()
            .map(PendingChange::Remove)
            .collect();
        let (_, affected) = self.commit(changes).await?;
        Ok(affected)
    }

    async fn save_changes(&self) -> RepositoryResult<usize> {
        let _guard = self.write_lock.lock().await;
        let affected = self.store.save_changes().await?;
        if affected > 0 {
            self.cache.clear();
        }
        Ok(affected)
    }
}
