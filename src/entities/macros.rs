//! Macros for reducing boilerplate when defining entities
//!
//! These macros generate the struct and the [`Entity`](crate::core::entity::Entity)
//! implementation, exposing every declared field through `field_value`.
//! Field types must convert into [`FieldValue`](crate::core::field::FieldValue)
//! (strings, integers, floats, booleans, uuids, timestamps and `Option`s of
//! those).

/// Create an aggregate root entity with automatic trait implementations
///
/// # Example
///
/// ```rust,ignore
/// use specter::prelude::*;
///
/// impl_entity!(
///     Issue,
///     "issues",
///     {
///         title: String,
///         assigned_to: Option<String>,
///         priority: i64,
///     }
/// );
///
/// // Usage: the id is assigned by the store
/// let issue = Issue::new("Login broken".to_string(), Some("bob".to_string()), 2);
/// assert!(issue.is_transient());
/// ```
#[macro_export]
macro_rules! impl_entity {
    (
        $type:ident,
        $resource:expr,
        {
            $( $field:ident : $field_type:ty ),* $(,)?
        }
    ) => {
        $crate::impl_child_entity!($type, $resource, { $( $field : $field_type ),* });

        impl $crate::core::entity::AggregateRoot for $type {}
    };
}

/// Create an entity that is only reached through include paths.
///
/// Same shape as [`impl_entity!`], without the aggregate root marker, so
/// repositories cannot be built for it.
#[macro_export]
macro_rules! impl_child_entity {
    (
        $type:ident,
        $resource:expr,
        {
            $( $field:ident : $field_type:ty ),* $(,)?
        }
    ) => {
        #[derive(Debug, Clone, PartialEq, ::serde::Serialize, ::serde::Deserialize)]
        pub struct $type {
            /// Identity, `0` until assigned by a store
            pub id: i64,
            $( pub $field : $field_type ),*
        }

        impl $crate::core::entity::Entity for $type {
            fn resource_name() -> &'static str {
                $resource
            }

            fn fields() -> &'static [&'static str] {
                &["id", $( stringify!($field) ),*]
            }

            fn id(&self) -> i64 {
                self.id
            }

            fn set_id(&mut self, id: i64) {
                self.id = id;
            }

            fn field_value(&self, field: &str) -> Option<$crate::core::field::FieldValue> {
                match field {
                    "id" => Some($crate::core::field::FieldValue::Integer(self.id)),
                    $(
                        stringify!($field) => Some(
                            $crate::core::field::FieldValue::from(self.$field.clone())
                        ),
                    )*
                    _ => None,
                }
            }
        }

        impl $type {
            /// Create a new, transient instance of this entity
            #[allow(clippy::too_many_arguments)]
            pub fn new($( $field: $field_type ),*) -> Self {
                Self {
                    id: 0,
                    $( $field ),*
                }
            }

            /// Set the identity, for fixtures and tests
            pub fn with_id(mut self, id: i64) -> Self {
                self.id = id;
                self
            }
        }
    };
}
