//! Property codec and entity assemblers.
//!
//! Reserved property names (per-entity registries in [`crate::message`] and
//! [`crate::queue`]) encode as canonical typed bytes: UTF-8 for text, 8-byte
//! big-endian for longs, a single byte for bools, 16 raw bytes for ids.
//! Every other name encodes as a JSON blob. Both directions consult the same
//! registry, so a value round-trips exactly as long as its name is not
//! registered with a conflicting kind.
//!
//! Entity identity is not a column: message rows are keyed by the message id
//! and queue rows by the path-derived queue id, so assemblers recover the
//! identity from the row key (messages) or the stored `path` (queues).

use std::collections::HashMap;

use uuid::Uuid;

use crate::error::CodecError;
use crate::message::{Message, MESSAGE_ID, MESSAGE_PROPERTIES};
use crate::properties::{PropertyValue, PropertyWrite, ScalarKind};
use crate::queue::{Queue, QUEUE_ID, QUEUE_NEWEST, QUEUE_OLDEST, QUEUE_PATH, QUEUE_PROPERTIES};
use crate::storage::traits::Column;

/// An encoded column: bytes to insert, or an explicit tombstone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnWrite {
    Value(Vec<u8>),
    Tombstone,
}

fn registry_kind(registry: &[(&str, ScalarKind)], name: &str) -> Option<ScalarKind> {
    registry
        .iter()
        .find(|(reserved, _)| *reserved == name)
        .map(|(_, kind)| *kind)
}

/// Encode a single value as the canonical bytes for a reserved scalar kind.
pub fn encode_scalar(
    name: &str,
    kind: ScalarKind,
    value: &PropertyValue,
) -> Result<Vec<u8>, CodecError> {
    let mismatch = || CodecError::PropertyType {
        name: name.to_string(),
        expected: kind,
    };
    match kind {
        ScalarKind::Text => Ok(value.as_text().ok_or_else(mismatch)?.as_bytes().to_vec()),
        ScalarKind::Long => Ok(value.as_long().ok_or_else(mismatch)?.to_be_bytes().to_vec()),
        ScalarKind::Bool => Ok(vec![u8::from(value.as_bool().ok_or_else(mismatch)?)]),
        ScalarKind::Id => Ok(value.as_id().ok_or_else(mismatch)?.as_bytes().to_vec()),
    }
}

/// Decode canonical scalar bytes back into a value. Wrong length or encoding
/// is fatal for the row — stored bytes are never coerced.
pub fn decode_scalar(
    name: &str,
    kind: ScalarKind,
    bytes: &[u8],
) -> Result<PropertyValue, CodecError> {
    let corrupt = |reason: String| CodecError::Scalar {
        name: name.to_string(),
        kind,
        reason,
    };
    match kind {
        ScalarKind::Text => std::str::from_utf8(bytes)
            .map(|s| PropertyValue::Text(s.to_string()))
            .map_err(|e| corrupt(e.to_string())),
        ScalarKind::Long => {
            let bytes: [u8; 8] = bytes
                .try_into()
                .map_err(|_| corrupt(format!("expected 8 bytes, got {}", bytes.len())))?;
            Ok(PropertyValue::Long(i64::from_be_bytes(bytes)))
        }
        ScalarKind::Bool => match bytes {
            [0] => Ok(PropertyValue::Bool(false)),
            [1] => Ok(PropertyValue::Bool(true)),
            _ => Err(corrupt(format!("expected one byte 0/1, got {bytes:?}"))),
        },
        ScalarKind::Id => {
            let bytes: [u8; 16] = bytes
                .try_into()
                .map_err(|_| corrupt(format!("expected 16 bytes, got {}", bytes.len())))?;
            Ok(PropertyValue::Id(Uuid::from_bytes(bytes)))
        }
    }
}

fn encode_value(
    registry: &[(&str, ScalarKind)],
    name: &str,
    value: &PropertyValue,
) -> Result<Vec<u8>, CodecError> {
    match registry_kind(registry, name) {
        Some(kind) => encode_scalar(name, kind, value),
        None => serde_json::to_vec(&value.to_json()).map_err(|e| CodecError::Json {
            name: name.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn decode_value(
    registry: &[(&str, ScalarKind)],
    name: &str,
    bytes: &[u8],
) -> Result<PropertyValue, CodecError> {
    match registry_kind(registry, name) {
        Some(kind) => decode_scalar(name, kind, bytes),
        None => serde_json::from_slice(bytes)
            .map(PropertyValue::Json)
            .map_err(|e| CodecError::Json {
                name: name.to_string(),
                reason: e.to_string(),
            }),
    }
}

fn encode_properties(
    registry: &[(&str, ScalarKind)],
    properties: &HashMap<String, PropertyWrite>,
    excluded: &[&str],
) -> Result<HashMap<String, ColumnWrite>, CodecError> {
    let mut columns = HashMap::with_capacity(properties.len());
    for (name, write) in properties {
        if excluded.contains(&name.as_str()) {
            continue;
        }
        let column = match write {
            PropertyWrite::Delete => ColumnWrite::Tombstone,
            PropertyWrite::Keep(value) => ColumnWrite::Value(encode_value(registry, name, value)?),
        };
        columns.insert(name.clone(), column);
    }
    Ok(columns)
}

fn decode_properties(
    registry: &[(&str, ScalarKind)],
    columns: &[Column],
) -> Result<HashMap<String, PropertyValue>, CodecError> {
    let mut properties = HashMap::with_capacity(columns.len());
    for column in columns {
        let name = std::str::from_utf8(&column.name).map_err(|_| CodecError::ColumnName)?;
        properties.insert(name.to_string(), decode_value(registry, name, &column.value)?);
    }
    Ok(properties)
}

/// Encode a message's property map into column writes. `None` in, `None`
/// out — an absent entity is distinguishable from one with zero properties.
/// The identity is the row key and is excluded from the column set.
pub fn encode_message(
    message: Option<&Message>,
) -> Result<Option<HashMap<String, ColumnWrite>>, CodecError> {
    let Some(message) = message else {
        return Ok(None);
    };
    encode_properties(MESSAGE_PROPERTIES, &message.properties, &[MESSAGE_ID]).map(Some)
}

/// Encode a queue's property map into column writes. The identity and the
/// runtime `oldest`/`newest` pointers are excluded; the `path` column is
/// emitted from the typed field.
pub fn encode_queue(
    queue: Option<&Queue>,
) -> Result<Option<HashMap<String, ColumnWrite>>, CodecError> {
    let Some(queue) = queue else {
        return Ok(None);
    };
    let mut columns = encode_properties(
        QUEUE_PROPERTIES,
        &queue.properties,
        &[QUEUE_ID, QUEUE_PATH, QUEUE_OLDEST, QUEUE_NEWEST],
    )?;
    columns.insert(
        QUEUE_PATH.to_string(),
        ColumnWrite::Value(queue.path.as_bytes().to_vec()),
    );
    Ok(Some(columns))
}

/// Reconstruct a message from a column listing. An empty listing yields no
/// entity — a `Message` with an empty property map is never materialized.
/// Pure function: no I/O, deterministic for a given listing.
pub fn assemble_message(id: Uuid, columns: &[Column]) -> Result<Option<Message>, CodecError> {
    if columns.is_empty() {
        return Ok(None);
    }
    let decoded = decode_properties(MESSAGE_PROPERTIES, columns)?;
    let mut message = Message::with_id(id);
    message.properties = decoded
        .into_iter()
        .map(|(name, value)| (name, PropertyWrite::Keep(value)))
        .collect();
    Ok(Some(message))
}

/// Reconstruct a queue from a column listing. The identity is re-derived
/// from the stored `path`; the runtime pointers are left unset (they live in
/// the pointers family, not here). Pure function.
pub fn assemble_queue(columns: &[Column]) -> Result<Option<Queue>, CodecError> {
    if columns.is_empty() {
        return Ok(None);
    }
    let mut decoded = decode_properties(QUEUE_PROPERTIES, columns)?;
    let path = match decoded.remove(QUEUE_PATH) {
        Some(PropertyValue::Text(path)) => path,
        _ => return Err(CodecError::MissingColumn(QUEUE_PATH)),
    };
    let mut queue = Queue::new(&path);
    // Tolerate rows written before the exclusion rule: a stored identity or
    // pointer column is absorbed, never surfaced as an ordinary property.
    if let Some(PropertyValue::Id(id)) = decoded.remove(QUEUE_ID) {
        queue.id = id;
    }
    if let Some(PropertyValue::Id(id)) = decoded.remove(QUEUE_OLDEST) {
        queue.oldest = Some(id);
    }
    if let Some(PropertyValue::Id(id)) = decoded.remove(QUEUE_NEWEST) {
        queue.newest = Some(id);
    }
    queue.properties = decoded
        .into_iter()
        .map(|(name, value)| (name, PropertyWrite::Keep(value)))
        .collect();
    Ok(Some(queue))
}
