//! Per-record step of a batch job.

use grow_storage::Document;
use serde_json::Value;

use crate::error::IndexingError;

/// What a transform decided for one record.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformOutcome {
    /// Nothing to write; counts as skipped
    Unchanged,
    /// Merge this patch into the record
    Patch(Value),
}

/// A pure decision over one scanned record.
///
/// Implementations never write; the runner batches the patches they return.
/// An `Err` counts the record as an error and the run moves on.
pub trait RecordTransform: Send + Sync {
    /// Name used in log fields.
    fn name(&self) -> &str;

    fn transform(&self, doc: &Document) -> Result<TransformOutcome, IndexingError>;
}

/// Reject documents whose top level is not a JSON object, since a merge
/// patch would replace them wholesale.
pub(crate) fn require_object(doc: &Document) -> Result<(), IndexingError> {
    if doc.data.is_object() {
        Ok(())
    } else {
        Err(IndexingError::Transform(format!(
            "document {} is not an object",
            doc.id
        )))
    }
}
