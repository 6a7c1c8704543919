//! Entity traits defining what a queryable type must provide

use crate::core::field::FieldValue;

/// Base trait for every type the engine can query.
///
/// An entity has:
/// - id: stable integer primary identity
/// - resource_name: the collection it lives in (used as a table name)
/// - field_value: dynamic access to named fields
///
/// Criteria, sort keys and search selectors are all expressed over field
/// names, so `field_value` is the single read path shared by the in-memory
/// evaluators and the store. Dotted names (`"assignee.name"`) may be used
/// for data reachable through a relation.
pub trait Entity: Clone + Send + Sync + 'static {
    /// The collection name (e.g., "issues", "projects")
    fn resource_name() -> &'static str;

    /// Names of the fields exposed through `field_value`
    fn fields() -> &'static [&'static str];

    /// Get the unique identifier for this entity instance
    fn id(&self) -> i64;

    /// Assign the identity, used by stores that generate ids on insert
    fn set_id(&mut self, id: i64);

    /// Get the value of a specific field by name
    fn field_value(&self, field: &str) -> Option<FieldValue>;

    /// Like `field_value`, with a missing field read as `Null`
    fn value_of(&self, field: &str) -> FieldValue {
        self.field_value(field).unwrap_or(FieldValue::Null)
    }

    /// Check whether the identity has been assigned yet
    fn is_transient(&self) -> bool {
        self.id() == 0
    }
}

/// Marker trait for aggregate roots.
///
/// Repositories only work with aggregate roots; child entities are reached
/// through include paths, never queried on their own.
pub trait AggregateRoot: Entity {}
