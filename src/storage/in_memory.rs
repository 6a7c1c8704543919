//! In-memory data store for testing and development
//!
//! Executes [`QueryPlan`]s directly against a map of rows. It interprets the
//! plan's criteria itself rather than reusing the compiled predicates, which
//! makes it an independent check on the in-memory evaluators.

use crate::config::EngineConfig;
use crate::core::entity::Entity;
use crate::core::error::{RepositoryError, RepositoryResult};
use crate::core::field::FieldValue;
use crate::core::store::{DataStore, PendingChange, StoreQuery};
use crate::specification::criterion::Criterion;
use crate::specification::expressions::SortDirection;
use crate::specification::like::LikePattern;
use crate::storage::plan::{QueryPlan, TrackingMode};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::fmt::Display;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, RwLock};

/// Number of executed plans kept for inspection, newest last
pub const QUERY_LOG_CAPACITY: usize = 256;

/// In-memory data store
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
/// Rows are kept in id order, which is the order unsorted queries return.
#[derive(Clone)]
pub struct InMemoryStore<T: Entity> {
    rows: Arc<RwLock<BTreeMap<i64, T>>>,
    pending: Arc<Mutex<Vec<PendingChange<T>>>>,
    tracked: Arc<RwLock<BTreeSet<i64>>>,
    global_filters: Arc<Vec<Criterion>>,
    next_id: Arc<AtomicI64>,
    executed: Arc<Mutex<VecDeque<QueryPlan<T>>>>,
}

fn lock_error(e: impl Display) -> RepositoryError {
    RepositoryError::Storage(format!("Failed to acquire lock: {}", e))
}

impl<T: Entity> InMemoryStore<T> {
    /// Create an empty store without global filters
    pub fn new() -> Self {
        Self::with_global_filters(Vec::new())
    }

    /// Create an empty store applying `filters` to every query that does
    /// not ignore query filters
    pub fn with_global_filters(filters: Vec<Criterion>) -> Self {
        Self {
            rows: Arc::new(RwLock::new(BTreeMap::new())),
            pending: Arc::new(Mutex::new(Vec::new())),
            tracked: Arc::new(RwLock::new(BTreeSet::new())),
            global_filters: Arc::new(filters),
            next_id: Arc::new(AtomicI64::new(1)),
            executed: Arc::new(Mutex::new(VecDeque::with_capacity(QUERY_LOG_CAPACITY))),
        }
    }

    /// Create an empty store using the global filters configured for `T`
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::with_global_filters(config.global_filters_for(T::resource_name()))
    }

    /// Insert rows directly, bypassing staging and change tracking.
    ///
    /// Transient rows get the next free id.
    pub fn seed(&self, entities: impl IntoIterator<Item = T>) -> RepositoryResult<()> {
        let mut rows = self.rows.write().map_err(lock_error)?;
        for mut entity in entities {
            if entity.is_transient() {
                entity.set_id(self.next_id.fetch_add(1, AtomicOrdering::SeqCst));
            } else {
                self.next_id
                    .fetch_max(entity.id() + 1, AtomicOrdering::SeqCst);
            }
            rows.insert(entity.id(), entity);
        }
        Ok(())
    }

    /// Filters applied unless a query ignores them
    pub fn global_filters(&self) -> &[Criterion] {
        &self.global_filters
    }

    /// Ids currently held by the change tracker
    pub fn tracked_ids(&self) -> RepositoryResult<Vec<i64>> {
        let tracked = self.tracked.read().map_err(lock_error)?;
        Ok(tracked.iter().copied().collect())
    }

    /// Number of staged, uncommitted changes
    pub fn pending_count(&self) -> RepositoryResult<usize> {
        Ok(self.pending.lock().map_err(lock_error)?.len())
    }

    /// The most recent executed plans (at most [`QUERY_LOG_CAPACITY`]),
    /// oldest first
    pub fn executed_plans(&self) -> RepositoryResult<Vec<QueryPlan<T>>> {
        Ok(self.executed.lock().map_err(lock_error)?.iter().cloned().collect())
    }

    fn execute(&self, plan: &QueryPlan<T>) -> RepositoryResult<Vec<T>> {
        if tracing::enabled!(tracing::Level::TRACE) {
            let rendered = serde_json::to_string(plan)
                .map_err(|e| RepositoryError::Storage(format!("Failed to render plan: {}", e)))?;
            tracing::trace!(entity = T::resource_name(), plan = %rendered, "executing query plan");
        }
        {
            let mut executed = self.executed.lock().map_err(lock_error)?;
            if executed.len() == QUERY_LOG_CAPACITY {
                executed.pop_front();
            }
            executed.push_back(plan.clone());
        }

        let mut patterns = PatternCache::default();
        let mut matched = Vec::new();
        {
            let rows = self.rows.read().map_err(lock_error)?;
            'rows: for entity in rows.values() {
                let globals: &[Criterion] = if plan.ignore_query_filters {
                    &[]
                } else {
                    &self.global_filters
                };
                for criterion in globals.iter().chain(&plan.filters) {
                    if !satisfies(criterion, entity, &mut patterns)? {
                        continue 'rows;
                    }
                }
                for group in &plan.search_groups {
                    let mut hit = false;
                    for term in group {
                        let pattern = patterns.get(&term.pattern)?;
                        if entity
                            .value_of(&term.field)
                            .as_text()
                            .is_some_and(|text| pattern.is_match(&text))
                        {
                            hit = true;
                            break;
                        }
                    }
                    if !hit {
                        continue 'rows;
                    }
                }
                matched.push(entity.clone());
            }
        }

        if !plan.order.is_empty() {
            matched.sort_by(|a, b| {
                for key in &plan.order {
                    let ordering = a.value_of(&key.field).sort_cmp(&b.value_of(&key.field));
                    let ordering = match key.direction {
                        SortDirection::Ascending => ordering,
                        SortDirection::Descending => ordering.reverse(),
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        let window = matched.into_iter().skip(plan.skip.unwrap_or(0));
        Ok(match plan.take {
            Some(take) => window.take(take).collect(),
            None => window.collect(),
        })
    }
}

impl<T: Entity> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
struct PatternCache {
    compiled: HashMap<String, Arc<LikePattern>>,
}

impl PatternCache {
    fn get(&mut self, pattern: &str) -> RepositoryResult<Arc<LikePattern>> {
        if let Some(found) = self.compiled.get(pattern) {
            return Ok(found.clone());
        }
        let compiled = Arc::new(LikePattern::new(pattern)?);
        self.compiled.insert(pattern.to_string(), compiled.clone());
        Ok(compiled)
    }
}

fn satisfies<T: Entity>(
    criterion: &Criterion,
    entity: &T,
    patterns: &mut PatternCache,
) -> RepositoryResult<bool> {
    let compare = |field: &str, value: &FieldValue, accept: fn(Ordering) -> bool| {
        entity.value_of(field).compare(value).is_some_and(accept)
    };

    Ok(match criterion {
        Criterion::Eq { field, value } => entity.value_of(field).matches(value),
        Criterion::Ne { field, value } => !entity.value_of(field).matches(value),
        Criterion::Gt { field, value } => compare(field, value, Ordering::is_gt),
        Criterion::Ge { field, value } => compare(field, value, Ordering::is_ge),
        Criterion::Lt { field, value } => compare(field, value, Ordering::is_lt),
        Criterion::Le { field, value } => compare(field, value, Ordering::is_le),
        Criterion::Like { field, pattern } => {
            let pattern = patterns.get(pattern)?;
            entity
                .value_of(field)
                .as_text()
                .is_some_and(|text| pattern.is_match(&text))
        }
        Criterion::In { field, values } => {
            let actual = entity.value_of(field);
            values.iter().any(|v| actual.matches(v))
        }
        Criterion::IsNull { field } => entity.value_of(field).is_null(),
        Criterion::IsNotNull { field } => !entity.value_of(field).is_null(),
        Criterion::And { criteria } => {
            for child in criteria {
                if !satisfies(child, entity, patterns)? {
                    return Ok(false);
                }
            }
            true
        }
        Criterion::Or { criteria } => {
            for child in criteria {
                if satisfies(child, entity, patterns)? {
                    return Ok(true);
                }
            }
            false
        }
        Criterion::Not { criterion } => !satisfies(criterion, entity, patterns)?,
    })
}

#[async_trait]
impl<T: Entity> DataStore<T> for InMemoryStore<T> {
    type Query = QueryPlan<T>;

    fn query(&self) -> QueryPlan<T> {
        QueryPlan::new()
    }

    async fn find(&self, id: i64) -> RepositoryResult<Option<T>> {
        let rows = self.rows.read().map_err(lock_error)?;
        Ok(rows.get(&id).cloned())
    }

    async fn fetch(&self, query: QueryPlan<T>) -> RepositoryResult<Vec<T>> {
        let entities = self.execute(&query)?;

        if !query.includes.is_empty() {
            tracing::debug!(
                includes = ?query.includes,
                split_query = query.split_query,
                "rows already hold related data, includes are satisfied"
            );
        }
        if query.tracking == TrackingMode::Tracking {
            let mut tracked = self.tracked.write().map_err(lock_error)?;
            tracked.extend(entities.iter().map(|e| e.id()));
        }

        tracing::debug!(
            entity = T::resource_name(),
            rows = entities.len(),
            tracking = ?query.tracking,
            "fetched rows"
        );
        Ok(entities)
    }

    async fn count(&self, query: QueryPlan<T>) -> RepositoryResult<usize> {
        Ok(self.execute(&query)?.len())
    }

    async fn any(&self, query: QueryPlan<T>) -> RepositoryResult<bool> {
        Ok(!self.execute(&query.take(1))?.is_empty())
    }

    async fn stage(&self, change: PendingChange<T>) -> RepositoryResult<PendingChange<T>> {
        let change = match change {
            PendingChange::Add(mut entity) => {
                if entity.is_transient() {
                    entity.set_id(self.next_id.fetch_add(1, AtomicOrdering::SeqCst));
                }
                PendingChange::Add(entity)
            }
            other => other,
        };
        self.pending
            .lock()
            .map_err(lock_error)?
            .push(change.clone());
        Ok(change)
    }

    async fn save_changes(&self) -> RepositoryResult<usize> {
        let changes = std::mem::take(&mut *self.pending.lock().map_err(lock_error)?);
        if changes.is_empty() {
            return Ok(0);
        }

        let mut rows = self.rows.write().map_err(lock_error)?;
        let mut working = rows.clone();
        let not_found = |id| RepositoryError::NotFound {
            entity_type: T::resource_name().to_string(),
            id,
        };

        for change in &changes {
            match change {
                PendingChange::Add(entity) => {
                    if working.contains_key(&entity.id()) {
                        return Err(RepositoryError::Storage(format!(
                            "{} with id '{}' already exists",
                            T::resource_name(),
                            entity.id()
                        )));
                    }
                    working.insert(entity.id(), entity.clone());
                }
                PendingChange::Update(entity) => {
                    let slot = working
                        .get_mut(&entity.id())
                        .ok_or_else(|| not_found(entity.id()))?;
                    *slot = entity.clone();
                }
                PendingChange::Remove(entity) => {
                    working
                        .remove(&entity.id())
                        .ok_or_else(|| not_found(entity.id()))?;
                }
            }
        }
        *rows = working;

        let mut tracked = self.tracked.write().map_err(lock_error)?;
        for change in &changes {
            match change {
                PendingChange::Remove(entity) => tracked.remove(&entity.id()),
                other => tracked.insert(other.entity().id()),
            };
        }

        tracing::debug!(
            entity = T::resource_name(),
            changes = changes.len(),
            "committed pending changes"
        );
        Ok(changes.len())
    }

    async fn discard_changes(&self) -> RepositoryResult<()> {
        let discarded = std::mem::take(&mut *self.pending.lock().map_err(lock_error)?);
        if !discarded.is_empty() {
            tracing::debug!(
                entity = T::resource_name(),
                changes = discarded.len(),
                "discarded pending changes"
            );
        }
        Ok(())
    }
}
