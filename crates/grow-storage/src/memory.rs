//! In-process document store for tests and tooling.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;

use crate::document::{merge_into, BatchOp, DocBatch, Document};
use crate::error::StorageError;
use crate::keys::DocKey;
use crate::query::DocQuery;
use crate::store::DocumentStore;

type Collections = HashMap<String, BTreeMap<String, Vec<u8>>>;

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, StorageError> {
        self.collections.lock().map_err(|_| StorageError::Poisoned)
    }

    fn documents(
        collections: &Collections,
        collection: &str,
    ) -> Result<Vec<Document>, StorageError> {
        collections
            .get(collection)
            .into_iter()
            .flat_map(|docs| docs.iter())
            .map(|(id, bytes)| Document::from_bytes(id.clone(), bytes))
            .collect()
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, key: &DocKey) -> Result<Option<Vec<u8>>, StorageError> {
        let collections = self.lock()?;
        Ok(collections
            .get(&key.collection)
            .and_then(|docs| docs.get(&key.id))
            .cloned())
    }

    fn compare_and_set(
        &self,
        key: &DocKey,
        expected: Option<&[u8]>,
        new: Option<&[u8]>,
    ) -> Result<bool, StorageError> {
        let mut collections = self.lock()?;
        let docs = collections.entry(key.collection.clone()).or_default();

        if docs.get(&key.id).map(Vec::as_slice) != expected {
            return Ok(false);
        }
        match new {
            Some(bytes) => {
                docs.insert(key.id.clone(), bytes.to_vec());
            }
            None => {
                docs.remove(&key.id);
            }
        }
        Ok(true)
    }

    fn scan_collection(
        &self,
        collection: &str,
        after: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Document>, StorageError> {
        let collections = self.lock()?;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let lower = match after {
            Some(id) => Bound::Excluded(id.to_string()),
            None => Bound::Unbounded,
        };
        docs.range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(id, bytes)| Document::from_bytes(id.clone(), bytes))
            .collect()
    }

    fn query(&self, query: &DocQuery) -> Result<Vec<Document>, StorageError> {
        let collections = self.lock()?;
        let docs = Self::documents(&collections, &query.collection)?;
        Ok(query.evaluate(docs))
    }

    fn commit(&self, batch: DocBatch) -> Result<(), StorageError> {
        batch.check_size()?;
        let mut collections = self.lock()?;

        // Stage against a copy so a failing op leaves nothing applied
        let mut staged: HashMap<DocKey, Option<Value>> = HashMap::new();
        for op in batch.ops() {
            let key = op.key();
            let current = match staged.get(key) {
                Some(value) => value.clone(),
                None => collections
                    .get(&key.collection)
                    .and_then(|docs| docs.get(&key.id))
                    .map(|bytes| serde_json::from_slice::<Value>(bytes))
                    .transpose()?,
            };

            let next = match op {
                BatchOp::Set(_, data) => Some(data.clone()),
                BatchOp::Merge(_, patch) => {
                    let mut doc = current.ok_or_else(|| StorageError::NotFound(key.to_string()))?;
                    merge_into(&mut doc, patch);
                    Some(doc)
                }
                BatchOp::Delete(_) => None,
            };
            staged.insert(key.clone(), next);
        }

        for (key, value) in staged {
            let docs = collections.entry(key.collection).or_default();
            match value {
                Some(value) => {
                    docs.insert(key.id, serde_json::to_vec(&value)?);
                }
                None => {
                    docs.remove(&key.id);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TxnWrite;
    use serde_json::json;

    #[test]
    fn test_compare_and_set() {
        let store = MemoryStore::new();
        let key = DocKey::lock("reindexPosts");

        assert!(store.compare_and_set(&key, None, Some(&b"a"[..])).unwrap());
        assert!(!store.compare_and_set(&key, None, Some(&b"b"[..])).unwrap());
        assert!(store.compare_and_set(&key, Some(&b"a"[..]), Some(&b"b"[..])).unwrap());
        assert_eq!(store.get(&key).unwrap().as_deref(), Some(&b"b"[..]));
        assert!(store.compare_and_set(&key, Some(&b"b"[..]), None).unwrap());
        assert_eq!(store.get(&key).unwrap(), None);
    }

    #[test]
    fn test_transaction_keep_and_put() {
        let store = MemoryStore::new();
        let key = DocKey::new("jobs", "counter");

        for _ in 0..3 {
            store
                .transaction(&key, &mut |current| {
                    let n = current
                        .map(|b| String::from_utf8_lossy(b).parse::<u32>().unwrap_or(0))
                        .unwrap_or(0);
                    Ok(TxnWrite::Put((n + 1).to_string().into_bytes()))
                })
                .unwrap();
        }
        assert_eq!(store.get(&key).unwrap().as_deref(), Some(&b"3"[..]));

        store.transaction(&key, &mut |_| Ok(TxnWrite::Keep)).unwrap();
        assert_eq!(store.get(&key).unwrap().as_deref(), Some(&b"3"[..]));
    }

    #[test]
    fn test_scan_collection_pages_by_id() {
        let store = MemoryStore::new();
        for id in ["p3", "p1", "p2", "p4"] {
            store.set_document(&DocKey::post(id), &json!({ "text": id })).unwrap();
        }

        let first = store.scan_collection("posts", None, 2).unwrap();
        assert_eq!(first.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["p1", "p2"]);

        let rest = store.scan_collection("posts", Some("p2"), 10).unwrap();
        assert_eq!(rest.iter().map(|d| d.id.as_str()).collect::<Vec<_>>(), vec!["p3", "p4"]);

        assert!(store.scan_collection("unknown", None, 10).unwrap().is_empty());
    }

    #[test]
    fn test_commit_is_all_or_nothing() {
        let store = MemoryStore::new();
        store.set_document(&DocKey::post("p1"), &json!({ "text": "a" })).unwrap();

        let mut batch = DocBatch::new();
        batch.merge(DocKey::post("p1"), json!({ "keywords": ["a"] }));
        batch.merge(DocKey::post("missing"), json!({ "keywords": ["b"] }));

        assert!(matches!(store.commit(batch), Err(StorageError::NotFound(_))));
        let doc = store.get_document(&DocKey::post("p1")).unwrap().unwrap();
        assert!(doc.data.get("keywords").is_none());
    }

    #[test]
    fn test_merge_sequence_within_batch() {
        let store = MemoryStore::new();
        let mut batch = DocBatch::new();
        batch.set(DocKey::post("p1"), json!({ "text": "a" }));
        batch.merge(DocKey::post("p1"), json!({ "tagsLower": ["x"] }));
        store.commit(batch).unwrap();

        let doc = store.get_document(&DocKey::post("p1")).unwrap().unwrap();
        assert_eq!(doc.data, json!({ "text": "a", "tagsLower": ["x"] }));
    }
}
