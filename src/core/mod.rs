//! Core module containing fundamental traits and types for the engine

pub mod entity;
pub mod error;
pub mod field;
pub mod service;
pub mod store;

pub use entity::{AggregateRoot, Entity};
pub use error::{RepositoryError, RepositoryResult, SpecResult, SpecificationError};
pub use field::FieldValue;
pub use service::{ReadRepository, Repository};
pub use store::{DataStore, PendingChange, SearchTerm, StoreQuery};
