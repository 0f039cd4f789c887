use std::collections::HashMap;

use uuid::Uuid;

use crate::properties::{PropertyValue, PropertyWrite, ScalarKind};

pub const MESSAGE_ID: &str = "uuid";
pub const MESSAGE_TYPE: &str = "type";
pub const MESSAGE_CORRELATION_ID: &str = "correlation_id";
pub const MESSAGE_DESTINATION: &str = "destination";
pub const MESSAGE_REPLY_TO: &str = "reply_to";
pub const MESSAGE_TIMESTAMP: &str = "timestamp";
pub const MESSAGE_EXPIRATION: &str = "expiration";
pub const MESSAGE_PRIORITY: &str = "priority";
pub const MESSAGE_PERSISTENT: &str = "persistent";

/// Reserved message properties and their canonical scalar types. Any name not
/// listed here is encoded through the generic JSON path. This table is part
/// of the on-disk format: changing a name or kind breaks previously stored
/// rows.
pub const MESSAGE_PROPERTIES: &[(&str, ScalarKind)] = &[
    (MESSAGE_ID, ScalarKind::Id),
    (MESSAGE_TYPE, ScalarKind::Text),
    (MESSAGE_CORRELATION_ID, ScalarKind::Text),
    (MESSAGE_DESTINATION, ScalarKind::Text),
    (MESSAGE_REPLY_TO, ScalarKind::Text),
    (MESSAGE_TIMESTAMP, ScalarKind::Long),
    (MESSAGE_EXPIRATION, ScalarKind::Long),
    (MESSAGE_PRIORITY, ScalarKind::Long),
    (MESSAGE_PERSISTENT, ScalarKind::Bool),
];

/// Core message value object. Constructed transiently per call — the durable
/// state is the column data keyed by `id`. The identifier is the row key and
/// is never stored as a column of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: Uuid,
    pub properties: HashMap<String, PropertyWrite>,
}

impl Message {
    /// New message with a UUIDv7 identifier, so the enqueue time is
    /// extractable from the id and ids sort in enqueue order.
    pub fn new() -> Self {
        Self::with_id(Uuid::now_v7())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            properties: HashMap::new(),
        }
    }

    /// Set a property value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> &mut Self {
        self.properties
            .insert(name.into(), PropertyWrite::Keep(value.into()));
        self
    }

    /// Mark a property for deletion; the next write tombstones its column.
    pub fn unset(&mut self, name: impl Into<String>) -> &mut Self {
        self.properties.insert(name.into(), PropertyWrite::Delete);
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name).and_then(PropertyWrite::value)
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_messages_get_time_ordered_ids() {
        let a = Message::new();
        let b = Message::new();
        assert_ne!(a.id, b.id);
        assert!(a.id.get_timestamp().is_some(), "id must carry a timestamp");
    }

    #[test]
    fn set_and_unset_properties() {
        let mut msg = Message::new();
        msg.set(MESSAGE_PRIORITY, 5i64);
        assert_eq!(msg.get(MESSAGE_PRIORITY), Some(&PropertyValue::Long(5)));

        msg.unset(MESSAGE_PRIORITY);
        assert_eq!(msg.get(MESSAGE_PRIORITY), None);
        assert!(msg.properties[MESSAGE_PRIORITY].is_delete());
    }

    #[test]
    fn registry_assigns_one_kind_per_name() {
        let mut seen = std::collections::HashSet::new();
        for (name, _) in MESSAGE_PROPERTIES {
            assert!(seen.insert(*name), "duplicate reserved name: {name}");
        }
    }
}
