//! Time-bucket shard iteration.
//!
//! A queue's inbox is spread over one physical row per time bucket, so
//! writers targeting different buckets never contend and row width stays
//! bounded. An ordered consumer walks the buckets in time order and, within
//! a bucket, the message-id columns in byte order (UUIDv7 ids sort by time).

use uuid::Uuid;

use crate::storage::keys::{self, SHARD_KEY_LEN};

/// Round a millisecond timestamp down to the start of its bucket.
pub fn shard_start(ts_ms: i64, interval_ms: i64) -> i64 {
    ts_ms - ts_ms.rem_euclid(interval_ms)
}

/// Millisecond timestamp carried by a time-ordered (v7) message id.
pub fn message_time_ms(id: &Uuid) -> Option<i64> {
    let ts = id.get_timestamp()?;
    let (secs, nanos) = ts.to_unix();
    Some(secs as i64 * 1_000 + i64::from(nanos / 1_000_000))
}

/// Yields the shard row keys of one queue covering `[first_ts_ms, last_ts_ms]`
/// in ascending bucket order.
pub struct ShardIter {
    queue: Uuid,
    next: i64,
    last: i64,
    interval: i64,
    exhausted: bool,
}

impl ShardIter {
    pub fn new(queue: Uuid, first_ts_ms: i64, last_ts_ms: i64, interval_ms: i64) -> Self {
        let next = shard_start(first_ts_ms, interval_ms);
        let last = shard_start(last_ts_ms, interval_ms);
        Self {
            queue,
            next,
            last,
            interval: interval_ms,
            exhausted: next > last,
        }
    }
}

impl Iterator for ShardIter {
    type Item = [u8; SHARD_KEY_LEN];

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let key = keys::shard_key(&self.queue, self.next);
        match self.next.checked_add(self.interval) {
            Some(next) if next <= self.last => self.next = next,
            _ => self.exhausted = true,
        }
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400_000;

    #[test]
    fn bucket_rounding() {
        assert_eq!(shard_start(0, DAY), 0);
        assert_eq!(shard_start(DAY - 1, DAY), 0);
        assert_eq!(shard_start(DAY, DAY), DAY);
        assert_eq!(shard_start(DAY + 1, DAY), DAY);
    }

    #[test]
    fn iter_covers_every_bucket_inclusive() {
        let queue = Uuid::now_v7();
        let shards: Vec<_> = ShardIter::new(queue, DAY + 5, 3 * DAY + 5, DAY).collect();
        assert_eq!(shards.len(), 3);

        for (i, shard) in shards.iter().enumerate() {
            assert_eq!(keys::id_from_key(shard).unwrap(), queue);
            assert_eq!(
                keys::timestamp_from_key(shard).unwrap(),
                (i as i64 + 1) * DAY
            );
        }
    }

    #[test]
    fn single_bucket_range_yields_one_shard() {
        let queue = Uuid::now_v7();
        let shards: Vec<_> = ShardIter::new(queue, 100, 200, DAY).collect();
        assert_eq!(shards.len(), 1);
        assert_eq!(keys::timestamp_from_key(&shards[0]).unwrap(), 0);
    }

    #[test]
    fn inverted_range_is_empty() {
        let queue = Uuid::now_v7();
        assert_eq!(ShardIter::new(queue, 2 * DAY, DAY, DAY).count(), 0);
    }

    #[test]
    fn v7_ids_carry_their_creation_time() {
        let before = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as i64;
        let id = Uuid::now_v7();
        let ts = message_time_ms(&id).expect("v7 id has a timestamp");
        assert!((ts - before).abs() < 60_000, "id time within a minute of now");
    }

    #[test]
    fn non_time_ordered_ids_have_no_time() {
        let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, b"x");
        assert_eq!(message_time_ms(&id), None);
    }
}
