use std::collections::HashMap;

use uuid::Uuid;

use crate::properties::{PropertyValue, PropertyWrite, ScalarKind};

pub const QUEUE_ID: &str = "uuid";
pub const QUEUE_PATH: &str = "path";
pub const QUEUE_CREATED: &str = "created";
pub const QUEUE_MODIFIED: &str = "modified";
pub const QUEUE_OLDEST: &str = "oldest";
pub const QUEUE_NEWEST: &str = "newest";

/// Reserved queue properties and their canonical scalar types. Like the
/// message table, this is part of the on-disk format.
pub const QUEUE_PROPERTIES: &[(&str, ScalarKind)] = &[
    (QUEUE_ID, ScalarKind::Id),
    (QUEUE_PATH, ScalarKind::Text),
    (QUEUE_CREATED, ScalarKind::Long),
    (QUEUE_MODIFIED, ScalarKind::Long),
    (QUEUE_OLDEST, ScalarKind::Id),
    (QUEUE_NEWEST, ScalarKind::Id),
];

/// Queue value object. `oldest` and `newest` are runtime pointer state
/// maintained in the `queue_pointers` family — the property codec excludes
/// them (and the identity) from column storage, so a queue row round-trips
/// without them.
#[derive(Debug, Clone, PartialEq)]
pub struct Queue {
    pub id: Uuid,
    pub path: String,
    pub oldest: Option<Uuid>,
    pub newest: Option<Uuid>,
    pub properties: HashMap<String, PropertyWrite>,
}

impl Queue {
    pub fn new(path: impl AsRef<str>) -> Self {
        let path = normalize_path(path.as_ref());
        Self {
            id: Self::id_for_path(&path),
            path,
            oldest: None,
            newest: None,
            properties: HashMap::new(),
        }
    }

    /// Deterministic queue identifier: UUIDv5 of the normalized path. The
    /// identity is re-derivable from the stored `path` column, which is why
    /// it is never persisted itself.
    pub fn id_for_path(path: &str) -> Uuid {
        let path = normalize_path(path);
        Uuid::new_v5(&Uuid::NAMESPACE_URL, path.as_bytes())
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> &mut Self {
        self.properties
            .insert(name.into(), PropertyWrite::Keep(value.into()));
        self
    }

    pub fn unset(&mut self, name: impl Into<String>) -> &mut Self {
        self.properties.insert(name.into(), PropertyWrite::Delete);
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name).and_then(PropertyWrite::value)
    }
}

/// Queue paths are case-insensitive, slash-rooted, with no trailing slash.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }
    format!("/{}", trimmed.to_lowercase())
}
