//! Canonical filter criteria
//!
//! A [`Criterion`] is plain data: it can be serialized, rendered as SQL by a
//! store, or compiled into a predicate closure for in-memory evaluation.
//! Both execution paths start from the same value, so they cannot drift
//! apart in what a filter means.

use crate::core::entity::Entity;
use crate::core::error::SpecResult;
use crate::core::field::FieldValue;
use crate::specification::like::LikePattern;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// A compiled boolean predicate over one entity
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// A filter predicate over named entity fields
///
/// # Example
/// ```rust,ignore
/// let open_for_bob = Criterion::eq("assigned_to", "bob")
///     .and(Criterion::ne("status", "closed"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Criterion {
    Eq { field: String, value: FieldValue },
    Ne { field: String, value: FieldValue },
    Gt { field: String, value: FieldValue },
    Ge { field: String, value: FieldValue },
    Lt { field: String, value: FieldValue },
    Le { field: String, value: FieldValue },
    /// SQL `LIKE` pattern match, case-insensitive
    Like { field: String, pattern: String },
    In { field: String, values: Vec<FieldValue> },
    IsNull { field: String },
    IsNotNull { field: String },
    /// True when every child is true (and for an empty list)
    And { criteria: Vec<Criterion> },
    /// True when any child is true (false for an empty list)
    Or { criteria: Vec<Criterion> },
    Not { criterion: Box<Criterion> },
}

impl Criterion {
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Criterion::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Criterion::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Criterion::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ge(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Criterion::Ge {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Criterion::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn le(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Criterion::Le {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Criterion::Like {
            field: field.into(),
            pattern: pattern.into(),
        }
    }

    pub fn is_in<V: Into<FieldValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Criterion::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Criterion::IsNull {
            field: field.into(),
        }
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Criterion::IsNotNull {
            field: field.into(),
        }
    }

    pub fn all(criteria: impl IntoIterator<Item = Criterion>) -> Self {
        Criterion::And {
            criteria: criteria.into_iter().collect(),
        }
    }

    pub fn any(criteria: impl IntoIterator<Item = Criterion>) -> Self {
        Criterion::Or {
            criteria: criteria.into_iter().collect(),
        }
    }

    /// Combine with another criterion using logical AND
    pub fn and(self, other: Criterion) -> Self {
        match self {
            Criterion::And { mut criteria } => {
                criteria.push(other);
                Criterion::And { criteria }
            }
            this => Criterion::And {
                criteria: vec![this, other],
            },
        }
    }

    /// Combine with another criterion using logical OR
    pub fn or(self, other: Criterion) -> Self {
        match self {
            Criterion::Or { mut criteria } => {
                criteria.push(other);
                Criterion::Or { criteria }
            }
            this => Criterion::Or {
                criteria: vec![this, other],
            },
        }
    }

    /// Negate this criterion
    pub fn negate(self) -> Self {
        Criterion::Not {
            criterion: Box::new(self),
        }
    }

    /// Every field name referenced, in order of appearance
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Criterion::Eq { field, .. }
            | Criterion::Ne { field, .. }
            | Criterion::Gt { field, .. }
            | Criterion::Ge { field, .. }
            | Criterion::Lt { field, .. }
            | Criterion::Le { field, .. }
            | Criterion::Like { field, .. }
            | Criterion::In { field, .. }
            | Criterion::IsNull { field }
            | Criterion::IsNotNull { field } => out.push(field),
            Criterion::And { criteria } | Criterion::Or { criteria } => {
                criteria.iter().for_each(|c| c.collect_fields(out))
            }
            Criterion::Not { criterion } => criterion.collect_fields(out),
        }
    }

    /// Check that every `LIKE` pattern in the tree is well formed
    pub fn validate(&self) -> SpecResult<()> {
        match self {
            Criterion::Like { pattern, .. } => LikePattern::new(pattern).map(|_| ()),
            Criterion::And { criteria } | Criterion::Or { criteria } => {
                criteria.iter().try_for_each(Criterion::validate)
            }
            Criterion::Not { criterion } => criterion.validate(),
            _ => Ok(()),
        }
    }

    /// Compile into a predicate closure for in-memory evaluation.
    ///
    /// Pattern criteria are compiled here, so a malformed `LIKE` pattern
    /// fails once instead of on every entity.
    pub fn compile<T: Entity>(&self) -> SpecResult<Predicate<T>> {
        let predicate: Predicate<T> = match self.clone() {
            Criterion::Eq { field, value } => {
                Arc::new(move |e: &T| e.value_of(&field).matches(&value))
            }
            Criterion::Ne { field, value } => {
                Arc::new(move |e: &T| !e.value_of(&field).matches(&value))
            }
            Criterion::Gt { field, value } => ordered(field, value, Ordering::is_gt),
            Criterion::Ge { field, value } => ordered(field, value, Ordering::is_ge),
            Criterion::Lt { field, value } => ordered(field, value, Ordering::is_lt),
            Criterion::Le { field, value } => ordered(field, value, Ordering::is_le),
            Criterion::Like { field, pattern } => {
                let like = LikePattern::new(&pattern)?;
                Arc::new(move |e: &T| {
                    e.value_of(&field)
                        .as_text()
                        .is_some_and(|text| like.is_match(&text))
                })
            }
            Criterion::In { field, values } => Arc::new(move |e: &T| {
                let actual = e.value_of(&field);
                values.iter().any(|v| actual.matches(v))
            }),
            Criterion::IsNull { field } => Arc::new(move |e: &T| e.value_of(&field).is_null()),
            Criterion::IsNotNull { field } => {
                Arc::new(move |e: &T| !e.value_of(&field).is_null())
            }
            Criterion::And { criteria } => {
                let parts = compile_all::<T>(&criteria)?;
                Arc::new(move |e: &T| parts.iter().all(|p| p(e)))
            }
            Criterion::Or { criteria } => {
                let parts = compile_all::<T>(&criteria)?;
                Arc::new(move |e: &T| parts.iter().any(|p| p(e)))
            }
            Criterion::Not { criterion } => {
                let inner = criterion.compile::<T>()?;
                Arc::new(move |e: &T| !inner(e))
            }
        };
        Ok(predicate)
    }
}

fn ordered<T: Entity>(
    field: String,
    value: FieldValue,
    accept: fn(Ordering) -> bool,
) -> Predicate<T> {
    Arc::new(move |e: &T| e.value_of(&field).compare(&value).is_some_and(accept))
}

fn compile_all<T: Entity>(criteria: &[Criterion]) -> SpecResult<Vec<Predicate<T>>> {
    criteria.iter().map(Criterion::compile::<T>).collect()
}
