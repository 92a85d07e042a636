//! Storage layer for the search backend.
//!
//! Provides a JSON document store with:
//! - One collection per column family (`posts`, `jobs`)
//! - Single-document atomic read-modify-write (compare-and-set, transactions)
//! - Atomic write batches capped at the store's 500-operation limit
//! - Id-ordered collection scans for batch jobs
//! - Equality / array-membership queries ordered by an integer field
//! - Lease locks built on the single-document transaction

pub mod column_families;
pub mod db;
pub mod document;
pub mod error;
pub mod keys;
pub mod lease;
pub mod memory;
pub mod query;
pub mod store;

pub use db::RocksStore;
pub use document::{merge_into, BatchOp, DocBatch, Document, TxnWrite, MAX_BATCH_OPS};
pub use error::StorageError;
pub use keys::{DocKey, COLLECTION_JOBS, COLLECTION_POSTS};
pub use lease::{system_clock, Clock, LeaseLock};
pub use memory::MemoryStore;
pub use query::{DocQuery, Filter, QueryCursor};
pub use store::{DocumentStore, TxnFn};
