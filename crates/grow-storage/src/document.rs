//! Documents, write batches and transaction decisions.

use grow_types::PostView;
use serde_json::Value;

use crate::error::StorageError;
use crate::keys::DocKey;

/// The store's atomic-write ceiling per batch.
pub const MAX_BATCH_OPS: usize = 500;

/// A stored JSON document and its id within a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    pub fn from_bytes(id: impl Into<String>, bytes: &[u8]) -> Result<Self, StorageError> {
        Ok(Self::new(id, serde_json::from_slice(bytes)?))
    }

    /// Read the document as a post.
    pub fn view(&self) -> PostView<'_> {
        PostView::new(&self.id, &self.data)
    }
}

/// One staged write.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOp {
    /// Replace the whole document
    Set(DocKey, Value),
    /// Overwrite the top-level fields named in the patch; the document must exist
    Merge(DocKey, Value),
    Delete(DocKey),
}

impl BatchOp {
    pub fn key(&self) -> &DocKey {
        match self {
            BatchOp::Set(key, _) | BatchOp::Merge(key, _) | BatchOp::Delete(key) => key,
        }
    }
}

/// Writes committed together or not at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocBatch {
    ops: Vec<BatchOp>,
}

impl DocBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: DocKey, data: Value) {
        self.ops.push(BatchOp::Set(key, data));
    }

    pub fn merge(&mut self, key: DocKey, patch: Value) {
        self.ops.push(BatchOp::Merge(key, patch));
    }

    pub fn delete(&mut self, key: DocKey) {
        self.ops.push(BatchOp::Delete(key));
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }

    /// Reject batches over [`MAX_BATCH_OPS`].
    pub fn check_size(&self) -> Result<(), StorageError> {
        if self.ops.len() > MAX_BATCH_OPS {
            return Err(StorageError::BatchTooLarge {
                size: self.ops.len(),
                limit: MAX_BATCH_OPS,
            });
        }
        Ok(())
    }
}

/// Outcome of a read-modify-write transaction body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnWrite {
    /// Leave the document as it is
    Keep,
    Put(Vec<u8>),
    Delete,
}

/// Apply a merge patch: top-level fields of `patch` overwrite those of `target`.
pub fn merge_into(target: &mut Value, patch: &Value) {
    match (target.as_object_mut(), patch.as_object()) {
        (Some(target), Some(patch)) => {
            for (field, value) in patch {
                target.insert(field.clone(), value.clone());
            }
        }
        _ => *target = patch.clone(),
    }
}
