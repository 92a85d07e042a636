//! RocksDB-backed document store.
//!
//! Provides:
//! - Database open with one column family per collection
//! - Single-document read-modify-write via pessimistic transactions
//!   (`get_for_update`), which is what lease locks are built on
//! - Atomic multi-document batches
//! - Id-ordered collection scans

use std::path::Path;

use rocksdb::{
    ColumnFamily, Direction, IteratorMode, Options, TransactionDB, TransactionDBOptions,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::column_families::build_cf_descriptors;
use crate::document::{merge_into, BatchOp, DocBatch, Document, TxnWrite};
use crate::error::StorageError;
use crate::keys::DocKey;
use crate::query::DocQuery;
use crate::store::{DocumentStore, TxnFn};

/// Document store on a RocksDB `TransactionDB`.
pub struct RocksStore {
    db: TransactionDB,
}

impl RocksStore {
    /// Open storage at the given path, creating if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening storage at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(4);

        let txn_opts = TransactionDBOptions::default();
        let db = TransactionDB::open_cf_descriptors(&db_opts, &txn_opts, path, build_cf_descriptors())?;

        Ok(Self { db })
    }

    fn cf(&self, collection: &str) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(collection)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(collection.to_string()))
    }

    fn read_all(&self, collection: &str) -> Result<Vec<Document>, StorageError> {
        let cf = self.cf(collection)?;
        let mut docs = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let key = DocKey::from_bytes(collection, &key)?;
            docs.push(Document::from_bytes(key.id, &value)?);
        }
        Ok(docs)
    }
}

impl DocumentStore for RocksStore {
    fn get(&self, key: &DocKey) -> Result<Option<Vec<u8>>, StorageError> {
        let cf = self.cf(&key.collection)?;
        Ok(self.db.get_cf(cf, key.to_bytes())?)
    }

    fn compare_and_set(
        &self,
        key: &DocKey,
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> Result<bool, StorageError> {
        let cf = self.cf(&key.collection)?;
        let txn = self.db.transaction();

        let current = txn.get_for_update_cf(cf, key.to_bytes(), true)?;
        if current.as_deref() != expected {
            txn.rollback()?;
            return Ok(false);
        }
        match new {
            Some(bytes) => txn.put_cf(cf, key.to_bytes(), bytes)?,
            None => txn.delete_cf(cf, key.to_bytes())?,
        }
        txn.commit()?;
        Ok(true)
    }

    /// Runs `body` while holding the row lock, so it never needs a retry.
    fn transaction(&self, key: &DocKey, body: &mut TxnFn<'_>) -> Result<(), StorageError> {
        let cf = self.cf(&key.collection)?;
        let txn = self.db.transaction();

        let current = txn.get_for_update_cf(cf, key.to_bytes(), true)?;
        match body(current.as_deref()) {
            Ok(TxnWrite::Keep) => {
                txn.rollback()?;
                return Ok(());
            }
            Ok(TxnWrite::Put(bytes)) => txn.put_cf(cf, key.to_bytes(), bytes)?,
            Ok(TxnWrite::Delete) => txn.delete_cf(cf, key.to_bytes())?,
            Err(e) => {
                txn.rollback()?;
                return Err(e);
            }
        }
        txn.commit()?;
        debug!(key = %key, "Committed document transaction");
        Ok(())
    }

    fn scan_collection(
        &self,
        collection: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Document>, StorageError> {
        let cf = self.cf(collection)?;
        let mode = match after {
            Some(id) => IteratorMode::From(id.as_bytes(), Direction::Forward),
            None => IteratorMode::Start,
        };

        let mut docs = Vec::new();
        for item in self.db.iterator_cf(cf, mode) {
            if docs.len() >= limit {
                break;
            }
            let (key, value) = item?;
            if after.is_some_and(|id| &*key == id.as_bytes()) {
                continue;
            }
            let key = DocKey::from_bytes(collection, &key)?;
            docs.push(Document::from_bytes(key.id, &value)?);
        }
        Ok(docs)
    }

    /// Evaluated over a full scan of the collection; there are no secondary
    /// indexes.
    fn query(&self, query: &DocQuery) -> Result<Vec<Document>, StorageError> {
        let docs = self.read_all(&query.collection)?;
        Ok(query.evaluate(docs))
    }

    fn commit(&self, batch: DocBatch) -> Result<(), StorageError> {
        batch.check_size()?;
        let size = batch.len();
        let txn = self.db.transaction();

        for op in batch.into_ops() {
            let key = op.key().clone();
            let cf = self.cf(&key.collection)?;
            match op {
                BatchOp::Set(_, data) => {
                    txn.put_cf(cf, key.to_bytes(), serde_json::to_vec(&data)?)?;
                }
                BatchOp::Merge(_, patch) => {
                    let Some(bytes) = txn.get_for_update_cf(cf, key.to_bytes(), true)? else {
                        txn.rollback()?;
                        return Err(StorageError::NotFound(key.to_string()));
                    };
                    let mut doc: Value = serde_json::from_slice(&bytes)?;
                    merge_into(&mut doc, &patch);
                    txn.put_cf(cf, key.to_bytes(), serde_json::to_vec(&doc)?)?;
                }
                BatchOp::Delete(_) => {
                    txn.delete_cf(cf, key.to_bytes())?;
                }
            }
        }

        txn.commit()?;
        debug!(ops = size, "Committed batch");
        Ok(())
    }
}
