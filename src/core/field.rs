//! Field values read from entities by name

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// A polymorphic field value that can hold different types
///
/// Every criterion, sort key and search selector resolves entity data
/// through this type, so both execution backends see exactly the same
/// values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    DateTime(DateTime<Utc>),
    Null,
}

impl FieldValue {
    /// Get the value as a string if possible
    pub fn as_string(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as an integer if possible
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the value as a float, widening integers
    pub fn as_float(&self) -> Option<f64> {
        match self {
            FieldValue::Float(f) => Some(*f),
            FieldValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Text rendering used by pattern matching.
    ///
    /// `Null` has no text, so it never matches a search pattern.
    pub fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::String(s) => Some(s.clone()),
            FieldValue::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Compare two values of compatible kinds.
    ///
    /// Integers and floats compare numerically. Text compares with a uuid or
    /// a timestamp when it parses as one (RFC 3339 for timestamps), which is
    /// how those values come back from YAML and JSON. Other variants only
    /// compare with themselves; mixed kinds and anything involving `Null`
    /// are incomparable and yield `None`.
    pub fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::String(a), FieldValue::String(b)) => Some(a.cmp(b)),
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::Boolean(a), FieldValue::Boolean(b)) => Some(a.cmp(b)),
            (FieldValue::Uuid(a), FieldValue::Uuid(b)) => Some(a.cmp(b)),
            (FieldValue::DateTime(a), FieldValue::DateTime(b)) => Some(a.cmp(b)),
            (FieldValue::Uuid(a), FieldValue::String(b)) => {
                Uuid::parse_str(b).ok().map(|b| a.cmp(&b))
            }
            (FieldValue::String(a), FieldValue::Uuid(b)) => {
                Uuid::parse_str(a).ok().map(|a| a.cmp(b))
            }
            (FieldValue::DateTime(a), FieldValue::String(b)) => {
                parse_timestamp(b).map(|b| a.cmp(&b))
            }
            (FieldValue::String(a), FieldValue::DateTime(b)) => {
                parse_timestamp(a).map(|a| a.cmp(b))
            }
            (a, b) => match (a.as_float(), b.as_float()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    /// Equality as used by filters: `Null` only equals `Null`.
    pub fn matches(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Null, FieldValue::Null) => true,
            (FieldValue::Null, _) | (_, FieldValue::Null) => false,
            (a, b) => a.compare(b) == Some(Ordering::Equal),
        }
    }

    /// Total order used for sorting.
    ///
    /// Null < Boolean < numbers < String < Uuid < DateTime, natural order
    /// inside each kind.
    pub fn sort_cmp(&self, other: &FieldValue) -> Ordering {
        fn rank(value: &FieldValue) -> u8 {
            match value {
                FieldValue::Null => 0,
                FieldValue::Boolean(_) => 1,
                FieldValue::Integer(_) | FieldValue::Float(_) => 2,
                FieldValue::String(_) => 3,
                FieldValue::Uuid(_) => 4,
                FieldValue::DateTime(_) => 5,
            }
        }

        match rank(self).cmp(&rank(other)) {
            Ordering::Equal => self.compare(other).unwrap_or(Ordering::Equal),
            unequal => unequal,
        }
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::String(s) => write!(f, "{}", s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(v) => write!(f, "{}", v),
            FieldValue::Boolean(b) => write!(f, "{}", b),
            FieldValue::Uuid(u) => write!(f, "{}", u),
            FieldValue::DateTime(d) => write!(f, "{}", d.to_rfc3339()),
            FieldValue::Null => write!(f, "null"),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Boolean(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        FieldValue::Uuid(value)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::DateTime(value)
    }
}

impl<V: Into<FieldValue>> From<Option<V>> for FieldValue {
    fn from(value: Option<V>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}
