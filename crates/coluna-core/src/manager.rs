//! Queue manager: the operation surface over the wide-column layout.
//!
//! Each operation builds one `MutationBatch` (single timestamp, applied
//! atomically) or performs range reads and assembly. The manager takes no
//! locks — concurrent managers over the same store race by last-write-wins,
//! which is the intended conflict model.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;
use uuid::Uuid;

use crate::config::MqConfig;
use crate::error::{MqError, MqResult, StorageResult};
use crate::message::Message;
use crate::queue::{Queue, QUEUE_CREATED, QUEUE_MODIFIED};
use crate::storage::codec;
use crate::storage::keys;
use crate::storage::mutation::{ColumnFamily, MutationBatch};
use crate::storage::shards::{self, ShardIter};
use crate::storage::traits::ColumnStore;

const POINTER_OLDEST: &[u8] = b"oldest";
const POINTER_NEWEST: &[u8] = b"newest";
const CURSOR_POSITION: &[u8] = b"position";

pub struct QueueManager {
    store: Arc<dyn ColumnStore>,
    config: MqConfig,
}

impl QueueManager {
    pub fn new(store: Arc<dyn ColumnStore>, config: MqConfig) -> Self {
        Self { store, config }
    }

    /// Write timestamp for one operation: microseconds since the epoch.
    /// Shard bucketing uses milliseconds; the two scales never mix.
    fn now_micros() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0)
    }

    fn now_millis() -> i64 {
        Self::now_micros() / 1_000
    }

    #[tracing::instrument(skip_all, fields(path = %path))]
    pub fn create_queue(&self, path: &str) -> MqResult<Queue> {
        // Check-then-put: two racing creators both succeed and their
        // property writes converge by last-write-wins; the check only
        // surfaces the common mistake of re-creating an existing queue.
        if self.get_queue(path)?.is_some() {
            return Err(MqError::QueueAlreadyExists(path.to_string()));
        }

        let mut queue = Queue::new(path);
        let ts = Self::now_micros();
        queue.set(QUEUE_CREATED, ts);
        queue.set(QUEUE_MODIFIED, ts);

        let mut batch = MutationBatch::new();
        batch.add_queue(Some(&queue), ts)?;
        self.store.apply(batch)?;

        debug!(queue = %queue.path, id = %queue.id, "queue created");
        Ok(queue)
    }

    pub fn get_queue(&self, path: &str) -> MqResult<Option<Queue>> {
        let id = Queue::id_for_path(path);
        let columns =
            self.store
                .read_columns(ColumnFamily::QueueProperties, id.as_bytes(), None, None)?;
        let Some(mut queue) = codec::assemble_queue(&columns)? else {
            return Ok(None);
        };
        let (oldest, newest) = self.read_pointers(&queue.id)?;
        queue.oldest = oldest;
        queue.newest = newest;
        Ok(Some(queue))
    }

    /// Persist a queue's property map. Properties marked `Delete` are
    /// tombstoned; the identity and pointer state are never written here.
    pub fn update_queue(&self, queue: &Queue) -> MqResult<()> {
        let ts = Self::now_micros();
        let mut stamped = queue.clone();
        stamped.set(QUEUE_MODIFIED, ts);

        let mut batch = MutationBatch::new();
        batch.add_queue(Some(&stamped), ts)?;
        self.store.apply(batch)?;
        Ok(())
    }

    /// Enqueue: message property columns, the inbox entry in the message's
    /// time-bucket shard, pointer maintenance, and the queue's `modified`
    /// stamp — one atomic batch, one timestamp.
    #[tracing::instrument(skip_all, fields(path = %path, message = %message.id))]
    pub fn post_to_queue(&self, path: &str, message: Message) -> MqResult<Message> {
        let queue = self
            .get_queue(path)?
            .ok_or_else(|| MqError::QueueNotFound(path.to_string()))?;

        let ts = Self::now_micros();
        let bucket_ms = shards::message_time_ms(&message.id).unwrap_or_else(Self::now_millis);
        let shard = keys::shard_key(
            &queue.id,
            shards::shard_start(bucket_ms, self.config.shard.interval_ms),
        );

        let mut batch = MutationBatch::new();
        batch.add_message(Some(&message), ts)?;
        batch.add_insertion(
            ColumnFamily::QueueInbox,
            shard.to_vec(),
            message.id.as_bytes().to_vec(),
            Vec::new(),
            ts,
        );
        if queue.oldest.is_none() {
            batch.add_insertion(
                ColumnFamily::QueuePointers,
                queue.id.as_bytes().to_vec(),
                POINTER_OLDEST.to_vec(),
                message.id.as_bytes().to_vec(),
                ts,
            );
        }
        batch.add_insertion(
            ColumnFamily::QueuePointers,
            queue.id.as_bytes().to_vec(),
            POINTER_NEWEST.to_vec(),
            message.id.as_bytes().to_vec(),
            ts,
        );
        batch.add_insertion(
            ColumnFamily::QueueProperties,
            queue.id.as_bytes().to_vec(),
            QUEUE_MODIFIED.as_bytes().to_vec(),
            ts.to_be_bytes().to_vec(),
            ts,
        );
        self.store.apply(batch)?;

        debug!(queue = %queue.path, message = %message.id, "message enqueued");
        Ok(message)
    }

    pub fn get_message(&self, id: &Uuid) -> MqResult<Option<Message>> {
        let columns =
            self.store
                .read_columns(ColumnFamily::MessageProperties, id.as_bytes(), None, None)?;
        Ok(codec::assemble_message(*id, &columns)?)
    }

    /// Destroy a message: tombstone every stored column at a timestamp later
    /// than all prior writes, and drop its inbox entry. Queue pointers are
    /// left as-is; scans skip rows that no longer assemble.
    pub fn delete_message(&self, path: &str, id: &Uuid) -> MqResult<()> {
        let queue = self
            .get_queue(path)?
            .ok_or_else(|| MqError::QueueNotFound(path.to_string()))?;

        let ts = Self::now_micros();
        let columns =
            self.store
                .read_columns(ColumnFamily::MessageProperties, id.as_bytes(), None, None)?;

        let mut batch = MutationBatch::new();
        for column in &columns {
            batch.add_tombstone(
                ColumnFamily::MessageProperties,
                id.as_bytes().to_vec(),
                column.name.clone(),
                ts,
            );
        }
        if let Some(shard) = self.find_inbox_shard(&queue, id)? {
            batch.add_tombstone(
                ColumnFamily::QueueInbox,
                shard.to_vec(),
                id.as_bytes().to_vec(),
                ts,
            );
        }
        self.store.apply(batch)?;
        Ok(())
    }

    /// Ordered scan: shard buckets in time order, message-id columns in byte
    /// order within a bucket, strictly after `cursor` when given.
    pub fn get_messages(
        &self,
        path: &str,
        cursor: Option<Uuid>,
        limit: Option<usize>,
    ) -> MqResult<Vec<Message>> {
        let queue = self
            .get_queue(path)?
            .ok_or_else(|| MqError::QueueNotFound(path.to_string()))?;

        let (Some(oldest), Some(newest)) = (queue.oldest, queue.newest) else {
            return Ok(Vec::new());
        };
        let first_ms = cursor
            .as_ref()
            .and_then(shards::message_time_ms)
            .or_else(|| shards::message_time_ms(&oldest))
            .unwrap_or(0);
        let last_ms = shards::message_time_ms(&newest).unwrap_or_else(Self::now_millis);
        let limit = limit.unwrap_or(self.config.scan.page_size);

        let cursor_bytes = cursor.map(|c| c.as_bytes().to_vec());
        let mut messages = Vec::new();
        for shard in ShardIter::new(queue.id, first_ms, last_ms, self.config.shard.interval_ms) {
            let entries = self.store.read_columns(
                ColumnFamily::QueueInbox,
                &shard,
                cursor_bytes.as_deref(),
                None,
            )?;
            for entry in entries {
                let Ok(id) = Uuid::from_slice(&entry.name) else {
                    debug!(shard = ?keys::timestamp_from_key(&shard), "skipping malformed inbox column");
                    continue;
                };
                if cursor == Some(id) {
                    continue;
                }
                // A tombstoned message can outlive its inbox entry when a
                // delete raced; it no longer assembles, so skip it.
                if let Some(message) = self.get_message(&id)? {
                    messages.push(message);
                    if messages.len() >= limit {
                        return Ok(messages);
                    }
                }
            }
        }
        Ok(messages)
    }

    /// Last committed position of a consumer on a queue.
    pub fn consumer_position(&self, path: &str, consumer: &str) -> MqResult<Option<Uuid>> {
        let row = cursor_row(&Queue::id_for_path(path), consumer);
        let columns =
            self.store
                .read_columns(ColumnFamily::ConsumerCursors, &row, None, None)?;
        Ok(columns
            .iter()
            .find(|c| c.name == CURSOR_POSITION)
            .and_then(|c| Uuid::from_slice(&c.value).ok()))
    }

    /// Commit a consumer's position. Later commits win by timestamp; two
    /// consumers sharing a name race by design.
    pub fn commit_position(&self, path: &str, consumer: &str, position: &Uuid) -> MqResult<()> {
        let row = cursor_row(&Queue::id_for_path(path), consumer);
        let mut batch = MutationBatch::new();
        batch.add_insertion(
            ColumnFamily::ConsumerCursors,
            row,
            CURSOR_POSITION.to_vec(),
            position.as_bytes().to_vec(),
            Self::now_micros(),
        );
        self.store.apply(batch)?;
        Ok(())
    }

    fn read_pointers(&self, queue_id: &Uuid) -> StorageResult<(Option<Uuid>, Option<Uuid>)> {
        let columns = self.store.read_columns(
            ColumnFamily::QueuePointers,
            queue_id.as_bytes(),
            None,
            None,
        )?;
        let mut oldest = None;
        let mut newest = None;
        for column in &columns {
            let id = Uuid::from_slice(&column.value).ok();
            if column.name == POINTER_OLDEST {
                oldest = id;
            } else if column.name == POINTER_NEWEST {
                newest = id;
            }
        }
        Ok((oldest, newest))
    }

    /// Locate the inbox shard holding a message's entry: directly from the
    /// id's time bucket for v7 ids, otherwise by walking the queue's bounds.
    fn find_inbox_shard(&self, queue: &Queue, id: &Uuid) -> MqResult<Option<[u8; 24]>> {
        let interval = self.config.shard.interval_ms;
        if let Some(ts_ms) = shards::message_time_ms(id) {
            return Ok(Some(keys::shard_key(
                &queue.id,
                shards::shard_start(ts_ms, interval),
            )));
        }
        let (Some(oldest), Some(newest)) = (queue.oldest, queue.newest) else {
            return Ok(None);
        };
        let first_ms = shards::message_time_ms(&oldest).unwrap_or(0);
        let last_ms = shards::message_time_ms(&newest).unwrap_or_else(Self::now_millis);
        for shard in ShardIter::new(queue.id, first_ms, last_ms, interval) {
            let entries = self.store.read_columns(
                ColumnFamily::QueueInbox,
                &shard,
                Some(id.as_bytes()),
                Some(1),
            )?;
            if entries.iter().any(|e| e.name == id.as_bytes()) {
                return Ok(Some(shard));
            }
        }
        Ok(None)
    }
}

fn cursor_row(queue_id: &Uuid, consumer: &str) -> Vec<u8> {
    let mut row = Vec::with_capacity(16 + consumer.len());
    row.extend_from_slice(queue_id.as_bytes());
    row.extend_from_slice(consumer.as_bytes());
    row
}
