//! Mutation batches: the write-side discipline of the persistence layer.
//!
//! A batch is an ordered set of column operations applied atomically by the
//! store. Within one `add_message`/`add_queue` call every operation carries
//! the same caller-supplied timestamp, so last-write-wins resolution treats
//! the call as a single version relative to earlier or later batches. Ties
//! at equal timestamps are broken deterministically by the store; concurrent
//! writers sharing a timestamp are an accepted race, not a bug in this layer.

use std::fmt;

use tracing::debug;

use crate::error::CodecError;
use crate::message::Message;
use crate::queue::Queue;
use crate::storage::codec::{self, ColumnWrite};

/// Logical column families of the queue engine. The names are part of the
/// on-disk format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnFamily {
    MessageProperties,
    QueueProperties,
    QueueInbox,
    QueuePointers,
    ConsumerCursors,
}

impl ColumnFamily {
    pub const ALL: &'static [ColumnFamily] = &[
        ColumnFamily::MessageProperties,
        ColumnFamily::QueueProperties,
        ColumnFamily::QueueInbox,
        ColumnFamily::QueuePointers,
        ColumnFamily::ConsumerCursors,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ColumnFamily::MessageProperties => "message_properties",
            ColumnFamily::QueueProperties => "queue_properties",
            ColumnFamily::QueueInbox => "queue_inbox",
            ColumnFamily::QueuePointers => "queue_pointers",
            ColumnFamily::ConsumerCursors => "consumer_cursors",
        }
    }
}

impl fmt::Display for ColumnFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single operation in a batch: insert a column value or tombstone it,
/// both at an explicit write timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnOp {
    Insert {
        family: ColumnFamily,
        row: Vec<u8>,
        name: Vec<u8>,
        value: Vec<u8>,
        timestamp: i64,
    },
    Tombstone {
        family: ColumnFamily,
        row: Vec<u8>,
        name: Vec<u8>,
        timestamp: i64,
    },
}

/// An ordered batch of column operations, applied atomically by the store.
#[derive(Debug, Default)]
pub struct MutationBatch {
    ops: Vec<ColumnOp>,
}

impl MutationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[ColumnOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<ColumnOp> {
        self.ops
    }

    pub fn add_insertion(
        &mut self,
        family: ColumnFamily,
        row: Vec<u8>,
        name: Vec<u8>,
        value: Vec<u8>,
        timestamp: i64,
    ) -> &mut Self {
        let op = ColumnOp::Insert {
            family,
            row,
            name,
            value,
            timestamp,
        };
        audit(&op);
        self.ops.push(op);
        self
    }

    pub fn add_tombstone(
        &mut self,
        family: ColumnFamily,
        row: Vec<u8>,
        name: Vec<u8>,
        timestamp: i64,
    ) -> &mut Self {
        let op = ColumnOp::Tombstone {
            family,
            row,
            name,
            timestamp,
        };
        audit(&op);
        self.ops.push(op);
        self
    }

    /// Add a message's encoded columns to the batch. Absent message is a
    /// no-op. Non-empty encodings insert at the message-id row; tombstone
    /// encodings — and zero-length values, which carry absent semantics —
    /// delete that exact column. All operations share `timestamp`.
    pub fn add_message(
        &mut self,
        message: Option<&Message>,
        timestamp: i64,
    ) -> Result<&mut Self, CodecError> {
        let Some(message) = message else {
            return Ok(self);
        };
        let Some(columns) = codec::encode_message(Some(message))? else {
            return Ok(self);
        };
        let row = message.id.as_bytes().to_vec();
        self.add_columns(ColumnFamily::MessageProperties, row, columns, timestamp);
        Ok(self)
    }

    /// Add a queue's encoded columns to the batch, keyed by the queue id in
    /// the queue-properties family. Same contract as [`Self::add_message`].
    pub fn add_queue(
        &mut self,
        queue: Option<&Queue>,
        timestamp: i64,
    ) -> Result<&mut Self, CodecError> {
        let Some(queue) = queue else {
            return Ok(self);
        };
        let Some(columns) = codec::encode_queue(Some(queue))? else {
            return Ok(self);
        };
        let row = queue.id.as_bytes().to_vec();
        self.add_columns(ColumnFamily::QueueProperties, row, columns, timestamp);
        Ok(self)
    }

    fn add_columns(
        &mut self,
        family: ColumnFamily,
        row: Vec<u8>,
        columns: std::collections::HashMap<String, ColumnWrite>,
        timestamp: i64,
    ) {
        // Sort for deterministic batch contents; column order within a batch
        // has no storage meaning.
        let mut columns: Vec<_> = columns.into_iter().collect();
        columns.sort_by(|(a, _), (b, _)| a.cmp(b));
        for (name, write) in columns {
            match write {
                ColumnWrite::Value(value) if !value.is_empty() => {
                    self.add_insertion(family, row.clone(), name.into_bytes(), value, timestamp);
                }
                ColumnWrite::Value(_) | ColumnWrite::Tombstone => {
                    self.add_tombstone(family, row.clone(), name.into_bytes(), timestamp);
                }
            }
        }
    }
}

/// Batch audit log: one record per operation as it enters a batch, on a
/// dedicated target so deployments can filter it independently. Pure
/// side-channel — it never fails and never affects what the batch contains.
fn audit(op: &ColumnOp) {
    match op {
        ColumnOp::Insert {
            family,
            row,
            name,
            value,
            timestamp,
        } => debug!(
            target: "coluna::batch",
            op = "insert",
            family = %family,
            row = %hex(row),
            column = %String::from_utf8_lossy(name),
            value = %hex(value),
            timestamp,
        ),
        ColumnOp::Tombstone {
            family,
            row,
            name,
            timestamp,
        } => debug!(
            target: "coluna::batch",
            op = "tombstone",
            family = %family,
            row = %hex(row),
            column = %String::from_utf8_lossy(name),
            timestamp,
        ),
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
