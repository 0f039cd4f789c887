//! Property value model shared by messages and queues.
//!
//! Reserved property names carry one of the canonical scalar shapes
//! ([`ScalarKind`]); every other name holds an arbitrary JSON value. Deletion
//! is a first-class write ([`PropertyWrite::Delete`]) rather than an implicit
//! null, so a tombstone can never be produced by an uninitialized field.

use std::fmt;

use uuid::Uuid;

/// Canonical scalar type assigned to a reserved property name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Text,
    Long,
    Bool,
    Id,
}

impl ScalarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarKind::Text => "text",
            ScalarKind::Long => "long",
            ScalarKind::Bool => "bool",
            ScalarKind::Id => "id",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single property value. The scalar variants are the shapes reserved
/// names are registered with; `Json` carries arbitrary structured values for
/// free-form names.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(String),
    Long(i64),
    Bool(bool),
    Id(Uuid),
    Json(serde_json::Value),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            PropertyValue::Long(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<Uuid> {
        match self {
            PropertyValue::Id(id) => Some(*id),
            _ => None,
        }
    }

    /// The JSON form used by the generic (non-reserved) encoding path.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            PropertyValue::Text(s) => serde_json::Value::String(s.clone()),
            PropertyValue::Long(n) => serde_json::Value::from(*n),
            PropertyValue::Bool(b) => serde_json::Value::Bool(*b),
            PropertyValue::Id(id) => serde_json::Value::String(id.to_string()),
            PropertyValue::Json(v) => v.clone(),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::Text(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::Text(s)
    }
}

impl From<i64> for PropertyValue {
    fn from(n: i64) -> Self {
        PropertyValue::Long(n)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Bool(b)
    }
}

impl From<Uuid> for PropertyValue {
    fn from(id: Uuid) -> Self {
        PropertyValue::Id(id)
    }
}

impl From<serde_json::Value> for PropertyValue {
    fn from(v: serde_json::Value) -> Self {
        PropertyValue::Json(v)
    }
}

/// A write-side property: either a value to store or an explicit deletion.
/// The mutation builder turns `Delete` into a tombstone for the column.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyWrite {
    Keep(PropertyValue),
    Delete,
}

impl PropertyWrite {
    pub fn keep(value: impl Into<PropertyValue>) -> Self {
        PropertyWrite::Keep(value.into())
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, PropertyWrite::Delete)
    }

    pub fn value(&self) -> Option<&PropertyValue> {
        match self {
            PropertyWrite::Keep(v) => Some(v),
            PropertyWrite::Delete => None,
        }
    }
}
