pub mod codec;
pub mod keys;
pub mod mutation;
mod rocks;
pub mod shards;
mod traits;

pub use mutation::{ColumnFamily, ColumnOp, MutationBatch};
pub use rocks::RocksColumnStore;
pub use traits::{Column, ColumnStore};
