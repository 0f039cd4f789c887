use crate::error::StorageResult;
use crate::storage::mutation::{ColumnFamily, MutationBatch};

/// A live cell as returned by a row read: column name, resolved value, and
/// the timestamp of the winning write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: Vec<u8>,
    pub value: Vec<u8>,
    pub timestamp: i64,
}

/// Contract consumed from the backing wide-column store. Implementations
/// must be thread-safe; all concurrency control is the store's per-column
/// timestamp ordering — this layer takes no locks of its own.
pub trait ColumnStore: Send + Sync {
    /// Atomically apply a batch of insertions and tombstones. The
    /// batch-or-nothing guarantee is required from the store: a failed apply
    /// must leave no partial state visible.
    fn apply(&self, batch: MutationBatch) -> StorageResult<()>;

    /// Read the live columns of one row in column order, last-write-wins
    /// resolved, tombstoned columns suppressed. `start` is an inclusive
    /// lower bound on the column name; `limit` caps the number of columns
    /// returned. Row keys are matched byte-for-byte, untransformed.
    fn read_columns(
        &self,
        family: ColumnFamily,
        row: &[u8],
        start: Option<&[u8]>,
        limit: Option<usize>,
    ) -> StorageResult<Vec<Column>>;
}
