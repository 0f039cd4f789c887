//! RocksDB adapter for the wide-column store contract.
//!
//! Each logical [`ColumnFamily`] maps to a RocksDB column family. A column
//! write becomes a versioned cell:
//!
//! ```text
//! cell key   = u16-len(row) || row || u16-len(column) || column || inv(ts)
//! cell value = tag byte (tombstone | value) || bytes
//! ```
//!
//! Lengths are big-endian prefixes (framing, so variable-length rows and
//! columns never alias). `inv(ts)` is the bitwise complement of the
//! sign-flipped timestamp, so within one column the newest version sorts
//! first and a forward prefix scan resolves last-write-wins by taking the
//! first cell per column and dropping tombstoned columns. Writes at equal
//! timestamps land on the same cell key, so the write applied later wins —
//! the store's deterministic tie-break.
//!
//! Column order within a row is (name length, name bytes); for the
//! fixed-width names of ordering-sensitive rows (inbox message ids) this is
//! plain byte order.

use std::path::Path;

use rocksdb::{
    ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode, MultiThreaded, Options,
    WriteBatch,
};

use crate::error::{StorageError, StorageResult};
use crate::storage::mutation::{ColumnFamily, ColumnOp, MutationBatch};
use crate::storage::traits::{Column, ColumnStore};

type Db = DBWithThreadMode<MultiThreaded>;

const TAG_TOMBSTONE: u8 = 0;
const TAG_VALUE: u8 = 1;

/// RocksDB-backed wide-column store.
pub struct RocksColumnStore {
    db: Db,
}

impl RocksColumnStore {
    /// Open or create the database at `path` with every column family.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ColumnFamily::ALL
            .iter()
            .map(|family| ColumnFamilyDescriptor::new(family.name(), Options::default()))
            .collect();

        let db = Db::open_cf_descriptors(&db_opts, path, cf_descriptors)?;
        Ok(Self { db })
    }

    fn cf(&self, family: ColumnFamily) -> StorageResult<std::sync::Arc<rocksdb::BoundColumnFamily<'_>>> {
        self.db.cf_handle(family.name()).ok_or_else(|| {
            StorageError::RocksDb(format!("column family not found: {}", family.name()))
        })
    }
}

fn frame(bytes: &[u8]) -> StorageResult<Vec<u8>> {
    let len = u16::try_from(bytes.len())
        .map_err(|_| StorageError::Corrupt(format!("key segment exceeds 64 KiB: {}", bytes.len())))?;
    let mut out = Vec::with_capacity(2 + bytes.len());
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(bytes);
    Ok(out)
}

/// Timestamp mapping with the property: larger timestamp ⇒ smaller key bytes.
fn invert_timestamp(ts: i64) -> [u8; 8] {
    (!((ts as u64) ^ (1 << 63))).to_be_bytes()
}

fn restore_timestamp(bytes: [u8; 8]) -> i64 {
    ((!u64::from_be_bytes(bytes)) ^ (1 << 63)) as i64
}

fn cell_key(row: &[u8], name: &[u8], timestamp: i64) -> StorageResult<Vec<u8>> {
    let mut key = frame(row)?;
    key.extend_from_slice(&frame(name)?);
    key.extend_from_slice(&invert_timestamp(timestamp));
    Ok(key)
}

fn cell_value(tag: u8, bytes: &[u8]) -> Vec<u8> {
    let mut value = Vec::with_capacity(1 + bytes.len());
    value.push(tag);
    value.extend_from_slice(bytes);
    value
}

/// Parse `u16-len(column) || column || inv(ts)` — the part of a cell key
/// after the row frame.
fn parse_cell_suffix(suffix: &[u8]) -> StorageResult<(&[u8], i64)> {
    let corrupt = || StorageError::Corrupt(format!("cell key suffix of {} bytes", suffix.len()));
    if suffix.len() < 2 {
        return Err(corrupt());
    }
    let name_len = u16::from_be_bytes([suffix[0], suffix[1]]) as usize;
    let rest = &suffix[2..];
    if rest.len() != name_len + 8 {
        return Err(corrupt());
    }
    let name = &rest[..name_len];
    let ts_bytes: [u8; 8] = rest[name_len..].try_into().map_err(|_| corrupt())?;
    Ok((name, restore_timestamp(ts_bytes)))
}

impl ColumnStore for RocksColumnStore {
    fn apply(&self, batch: MutationBatch) -> StorageResult<()> {
        let mut wb = WriteBatch::default();
        for op in batch.into_ops() {
            match op {
                ColumnOp::Insert {
                    family,
                    row,
                    name,
                    value,
                    timestamp,
                } => {
                    let cf = self.cf(family)?;
                    wb.put_cf(
                        &cf,
                        cell_key(&row, &name, timestamp)?,
                        cell_value(TAG_VALUE, &value),
                    );
                }
                ColumnOp::Tombstone {
                    family,
                    row,
                    name,
                    timestamp,
                } => {
                    let cf = self.cf(family)?;
                    wb.put_cf(
                        &cf,
                        cell_key(&row, &name, timestamp)?,
                        cell_value(TAG_TOMBSTONE, &[]),
                    );
                }
            }
        }
        self.db.write(wb)?;
        Ok(())
    }

    fn read_columns(
        &self,
        family: ColumnFamily,
        row: &[u8],
        start: Option<&[u8]>,
        limit: Option<usize>,
    ) -> StorageResult<Vec<Column>> {
        let cf = self.cf(family)?;
        let prefix = frame(row)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&prefix, Direction::Forward));

        let mut columns = Vec::new();
        let mut current: Option<Vec<u8>> = None;
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            let (name, timestamp) = parse_cell_suffix(&key[prefix.len()..])?;

            // Versions of one column are adjacent, newest first; only the
            // first cell per column is live.
            if current.as_deref() == Some(name) {
                continue;
            }
            current = Some(name.to_vec());

            if let Some(start) = start {
                if name < start {
                    continue;
                }
            }
            match value.split_first() {
                Some((&TAG_TOMBSTONE, _)) | None => continue,
                Some((&TAG_VALUE, bytes)) => columns.push(Column {
                    name: name.to_vec(),
                    value: bytes.to_vec(),
                    timestamp,
                }),
                Some((tag, _)) => {
                    return Err(StorageError::Corrupt(format!("unknown cell tag {tag}")));
                }
            }
            if let Some(limit) = limit {
                if columns.len() >= limit {
                    break;
                }
            }
        }
        Ok(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (RocksColumnStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = RocksColumnStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn insert(
        batch: &mut MutationBatch,
        row: &[u8],
        name: &[u8],
        value: &[u8],
        ts: i64,
    ) {
        batch.add_insertion(
            ColumnFamily::MessageProperties,
            row.to_vec(),
            name.to_vec(),
            value.to_vec(),
            ts,
        );
    }

    fn read(store: &RocksColumnStore, row: &[u8]) -> Vec<Column> {
        store
            .read_columns(ColumnFamily::MessageProperties, row, None, None)
            .unwrap()
    }

    #[test]
    fn open_creates_all_column_families() {
        let (store, _dir) = test_store();
        for family in ColumnFamily::ALL {
            assert!(
                store.db.cf_handle(family.name()).is_some(),
                "column family '{}' should exist",
                family.name()
            );
        }
    }

    #[test]
    fn timestamp_inversion_orders_newest_first() {
        for (older, newer) in [(0i64, 1i64), (-5, 5), (i64::MIN, i64::MAX), (41, 42)] {
            assert!(
                invert_timestamp(newer) < invert_timestamp(older),
                "{newer} must sort before {older}"
            );
            assert_eq!(restore_timestamp(invert_timestamp(older)), older);
            assert_eq!(restore_timestamp(invert_timestamp(newer)), newer);
        }
    }

    #[test]
    fn insert_then_read_round_trips() {
        let (store, _dir) = test_store();
        let mut batch = MutationBatch::new();
        insert(&mut batch, b"row", b"name", b"value", 10);
        store.apply(batch).unwrap();

        let columns = read(&store, b"row");
        assert_eq!(
            columns,
            vec![Column {
                name: b"name".to_vec(),
                value: b"value".to_vec(),
                timestamp: 10,
            }]
        );
    }

    #[test]
    fn later_timestamp_wins_regardless_of_apply_order() {
        let (store, _dir) = test_store();

        let mut newer = MutationBatch::new();
        insert(&mut newer, b"row", b"name", b"new", 20);
        store.apply(newer).unwrap();

        // Applied after, but stamped before — must lose.
        let mut older = MutationBatch::new();
        insert(&mut older, b"row", b"name", b"old", 10);
        store.apply(older).unwrap();

        let columns = read(&store, b"row");
        assert_eq!(columns[0].value, b"new".to_vec());
        assert_eq!(columns[0].timestamp, 20);
    }

    #[test]
    fn tombstone_suppresses_earlier_insert() {
        let (store, _dir) = test_store();

        let mut batch = MutationBatch::new();
        insert(&mut batch, b"row", b"name", b"value", 10);
        store.apply(batch).unwrap();

        let mut del = MutationBatch::new();
        del.add_tombstone(
            ColumnFamily::MessageProperties,
            b"row".to_vec(),
            b"name".to_vec(),
            20,
        );
        store.apply(del).unwrap();

        assert!(read(&store, b"row").is_empty());
    }

    #[test]
    fn earlier_tombstone_does_not_suppress_later_insert() {
        let (store, _dir) = test_store();

        let mut del = MutationBatch::new();
        del.add_tombstone(
            ColumnFamily::MessageProperties,
            b"row".to_vec(),
            b"name".to_vec(),
            10,
        );
        store.apply(del).unwrap();

        let mut batch = MutationBatch::new();
        insert(&mut batch, b"row", b"name", b"value", 20);
        store.apply(batch).unwrap();

        assert_eq!(read(&store, b"row").len(), 1);
    }

    #[test]
    fn equal_timestamps_fall_to_the_last_applied_write() {
        let (store, _dir) = test_store();

        let mut first = MutationBatch::new();
        insert(&mut first, b"row", b"name", b"first", 10);
        store.apply(first).unwrap();

        let mut second = MutationBatch::new();
        insert(&mut second, b"row", b"name", b"second", 10);
        store.apply(second).unwrap();

        assert_eq!(read(&store, b"row")[0].value, b"second".to_vec());
    }

    #[test]
    fn columns_come_back_in_order_with_start_and_limit() {
        let (store, _dir) = test_store();

        let mut batch = MutationBatch::new();
        for name in [b"cc", b"aa", b"bb", b"dd"] {
            insert(&mut batch, b"row", name, b"v", 1);
        }
        store.apply(batch).unwrap();

        let all = read(&store, b"row");
        let names: Vec<_> = all.iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec![b"aa".to_vec(), b"bb".to_vec(), b"cc".to_vec(), b"dd".to_vec()]);

        let bounded = store
            .read_columns(
                ColumnFamily::MessageProperties,
                b"row",
                Some(b"bb"),
                Some(2),
            )
            .unwrap();
        let names: Vec<_> = bounded.iter().map(|c| c.name.clone()).collect();
        assert_eq!(names, vec![b"bb".to_vec(), b"cc".to_vec()]);
    }

    #[test]
    fn rows_do_not_alias_across_lengths() {
        let (store, _dir) = test_store();

        let mut batch = MutationBatch::new();
        insert(&mut batch, b"ab", b"x", b"1", 1);
        insert(&mut batch, b"a", b"bx", b"2", 1);
        store.apply(batch).unwrap();

        assert_eq!(read(&store, b"ab").len(), 1);
        assert_eq!(read(&store, b"a").len(), 1);
        assert_eq!(read(&store, b"ab")[0].value, b"1".to_vec());
    }

    #[test]
    fn batch_lands_atomically_across_families() {
        let (store, _dir) = test_store();

        let mut batch = MutationBatch::new();
        batch.add_insertion(
            ColumnFamily::MessageProperties,
            b"m".to_vec(),
            b"a".to_vec(),
            b"1".to_vec(),
            1,
        );
        batch.add_insertion(
            ColumnFamily::QueueInbox,
            b"q".to_vec(),
            b"m".to_vec(),
            Vec::new(),
            1,
        );
        store.apply(batch).unwrap();

        assert_eq!(read(&store, b"m").len(), 1);
        let inbox = store
            .read_columns(ColumnFamily::QueueInbox, b"q", None, None)
            .unwrap();
        assert_eq!(inbox.len(), 1);
        assert!(inbox[0].value.is_empty());
    }

    #[test]
    fn reopen_preserves_data() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = RocksColumnStore::open(dir.path()).unwrap();
            let mut batch = MutationBatch::new();
            insert(&mut batch, b"row", b"name", b"value", 10);
            store.apply(batch).unwrap();
        }
        {
            let store = RocksColumnStore::open(dir.path()).unwrap();
            assert_eq!(read(&store, b"row").len(), 1);
        }
    }
}
