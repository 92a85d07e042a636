//! Rebuilds the search block of stored posts.

use grow_storage::{system_clock, Clock, Document};

use crate::builder::IndexBuilder;
use crate::error::IndexingError;
use crate::transform::{require_object, RecordTransform, TransformOutcome};

/// Recomputes every post's search fields, skipping posts whose stored block
/// already matches.
pub struct ReindexTransform {
    builder: IndexBuilder,
    clock: Clock,
}

impl ReindexTransform {
    pub fn new(builder: IndexBuilder) -> Self {
        Self {
            builder,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

impl RecordTransform for ReindexTransform {
    fn name(&self) -> &str {
        "reindex"
    }

    fn transform(&self, doc: &Document) -> Result<TransformOutcome, IndexingError> {
        require_object(doc)?;
        let out = self.builder.build_for(&doc.view());
        if !out.changed {
            return Ok(TransformOutcome::Unchanged);
        }
        Ok(TransformOutcome::Patch(out.fields.to_patch((self.clock)())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grow_taxonomy::TaxonomyMatcher;
    use grow_types::fields;
    use serde_json::json;
    use std::sync::Arc;

    fn transform() -> ReindexTransform {
        let builder = IndexBuilder::new(Arc::new(TaxonomyMatcher::builtin()));
        ReindexTransform::new(builder).with_clock(Arc::new(|| 42))
    }

    #[test]
    fn test_unindexed_post_gets_patch() {
        let doc = Document::new("p1", json!({ "text": "Blue Dream outdoor", "tags": ["Sativa"] }));
        let TransformOutcome::Patch(patch) = transform().transform(&doc).unwrap() else {
            panic!("expected patch");
        };

        assert_eq!(patch[fields::SEARCH_VERSION], 2);
        assert_eq!(patch[fields::UPDATED_AT], 42);
        assert_eq!(patch[fields::CANNA]["strains"], json!(["Blue Dream"]));
        assert_eq!(patch[fields::CANNA]["species"], json!(["sativa"]));
        let tags: Vec<&str> = patch[fields::TAGS_LOWER]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert!(tags.contains(&"outdoor"));
        assert!(tags.contains(&"sativa"));
    }

    #[test]
    fn test_indexed_post_is_unchanged() {
        let t = transform();
        let mut data = json!({ "text": "Gelato 41 indoor", "tags": ["indoor"] });
        let TransformOutcome::Patch(patch) = t.transform(&Document::new("p1", data.clone())).unwrap() else {
            panic!("expected patch");
        };
        grow_storage::merge_into(&mut data, &patch);

        assert_eq!(t.transform(&Document::new("p1", data)).unwrap(), TransformOutcome::Unchanged);
    }

    #[test]
    fn test_old_version_is_rebuilt() {
        let t = transform();
        let mut data = json!({ "text": "Gelato 41" });
        if let TransformOutcome::Patch(patch) = t.transform(&Document::new("p1", data.clone())).unwrap() {
            grow_storage::merge_into(&mut data, &patch);
        }
        data[fields::SEARCH_VERSION] = json!(1);

        assert!(matches!(
            t.transform(&Document::new("p1", data)).unwrap(),
            TransformOutcome::Patch(_)
        ));
    }

    #[test]
    fn test_non_object_document_errors() {
        let doc = Document::new("p1", json!(["not", "a", "post"]));
        assert!(matches!(transform().transform(&doc), Err(IndexingError::Transform(_))));
    }
}
