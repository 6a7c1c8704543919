//! Storage: query plans, the in-memory store and the store-backed repository

pub mod in_memory;
pub mod plan;
pub mod repository;

pub use in_memory::{InMemoryStore, QUERY_LOG_CAPACITY};
pub use plan::{QueryPlan, SortKey, SqlStatement, TrackingMode};
pub use repository::StoreRepository;
