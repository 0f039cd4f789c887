pub mod config;
pub mod error;
pub mod manager;
pub mod message;
pub mod properties;
pub mod queue;
pub mod storage;
pub mod telemetry;

pub use config::MqConfig;
pub use error::{CodecError, MqError, MqResult, StorageError, StorageResult};
pub use manager::QueueManager;
pub use message::Message;
pub use properties::{PropertyValue, PropertyWrite, ScalarKind};
pub use queue::Queue;
pub use storage::{Column, ColumnFamily, ColumnStore, MutationBatch, RocksColumnStore};
