//! Storage side: pool, schema, metadata cache and the batch engine

pub mod cache;
pub mod engine;
pub mod pool;
pub mod postgres;
pub mod schema;

pub use cache::MetadataCache;
pub use engine::{BatchStorageEngine, PreparedRecord, RecordStore, StoreRequest};
pub use pool::{PooledConnection, StoragePool};
pub use postgres::{PgRecordStore, TableCounts};
