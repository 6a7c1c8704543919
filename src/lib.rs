//! # Specter
//!
//! A specification-pattern query engine: describe which entities you want
//! once, then run that description against a store or an in-memory
//! collection with the same result.
//!
//! ## Features
//!
//! - **Fluent Specifications**: filters, `LIKE` search groups, ordering
//!   chains, typed includes, pagination, projection and post-processing
//! - **Conditional Building**: every operation has an `_if` form; a skipped
//!   step discards the rest of its chain
//! - **Two Backends**: a translated-query pipeline producing store queries
//!   (with SQL rendering) and an in-memory pipeline over materialized data
//! - **Validation**: check a single entity against a specification's
//!   filters and search criteria
//! - **Repositories**: async read/write repositories with cancellation,
//!   atomic commits and result caching
//! - **Configuration-Based**: tables, global filters and cache settings via
//!   YAML configuration
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use specter::prelude::*;
//!
//! impl_entity!(Issue, "issues", {
//!     title: String,
//!     assigned_to: Option<String>,
//! });
//!
//! let spec = Specification::<Issue>::builder()
//!     .filter(Criterion::eq("assigned_to", "bob"))
//!     .order_by("id")
//!     .build();
//!
//! // In memory
//! let mine = spec.evaluate(issues.clone())?;
//!
//! // Through a repository
//! let repository = StoreRepository::new(InMemoryStore::<Issue>::new());
//! let stored = repository.get_by_spec(&spec, None).await?;
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod specification;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{
        entity::{AggregateRoot, Entity},
        error::{RepositoryError, RepositoryResult, SpecResult, SpecificationError},
        field::FieldValue,
        service::{ReadRepository, Repository},
        store::{DataStore, PendingChange, SearchTerm, StoreQuery},
    };

    // === Specifications ===
    pub use crate::specification::{
        Criterion, EntitySpecification, InMemorySpecificationEvaluator, OrderType, Relation,
        SortDirection, Specification, SpecificationBuilder, SpecificationBuilding,
        SpecificationEvaluator, SpecificationValidator,
    };

    // === Macros ===
    pub use crate::{impl_child_entity, impl_entity};

    // === Storage ===
    pub use crate::storage::{InMemoryStore, QueryPlan, SqlStatement, StoreRepository};

    // === Config ===
    pub use crate::config::{CacheConfig, EngineConfig, EntityConfig};

    // === External dependencies ===
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};
    pub use tokio_util::sync::CancellationToken;
}
