//! Indexing on record write.
//!
//! Called with the before/after images of a post write. Rebuilds the search
//! block when the authored text or tags changed and merges it back onto the
//! post.

use std::sync::Arc;

use grow_storage::{system_clock, Clock, DocKey, DocumentStore, COLLECTION_POSTS};
use grow_taxonomy::normalize;
use grow_types::{PostView, SearchFields};
use serde_json::Value;
use tracing::{debug, info};

use crate::builder::{normalize_tags, IndexBuilder};
use crate::error::IndexingError;

/// Receives every freshly indexed post.
pub trait NotifierPort: Send + Sync {
    fn post_indexed(&self, post_id: &str, fields: &SearchFields);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl NotifierPort for NoopNotifier {
    fn post_indexed(&self, _post_id: &str, _fields: &SearchFields) {}
}

/// What the trigger did for one write.
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// The post was deleted
    Deleted,
    /// Text and tags are unchanged since the previous image
    InputsUnchanged,
    /// Inputs changed but the stored block is already current
    UpToDate,
    /// A new block was written
    Indexed(SearchFields),
}

pub struct WriteTrigger {
    store: Arc<dyn DocumentStore>,
    builder: IndexBuilder,
    notifier: Arc<dyn NotifierPort>,
    collection: String,
    clock: Clock,
}

impl WriteTrigger {
    pub fn new(store: Arc<dyn DocumentStore>, builder: IndexBuilder) -> Self {
        Self {
            store,
            builder,
            notifier: Arc::new(NoopNotifier),
            collection: COLLECTION_POSTS.to_string(),
            clock: system_clock(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotifierPort>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Handle one write. `after == None` means the post was deleted.
    pub fn on_record_write(
        &self,
        post_id: &str,
        before: Option<&Value>,
        after: Option<&Value>,
    ) -> Result<TriggerOutcome, IndexingError> {
        let Some(after) = after else {
            debug!(post_id, "Post deleted, nothing to index");
            return Ok(TriggerOutcome::Deleted);
        };
        let after_view = PostView::new(post_id, after);

        if let Some(before) = before {
            let before_view = PostView::new(post_id, before);
            if same_inputs(&before_view, &after_view) {
                debug!(post_id, "Text and tags unchanged");
                return Ok(TriggerOutcome::InputsUnchanged);
            }
        }

        let out = self.builder.build_for(&after_view);
        if !out.changed {
            debug!(post_id, "Search fields already current");
            return Ok(TriggerOutcome::UpToDate);
        }

        let key = DocKey::new(self.collection.as_str(), post_id);
        self.store.merge_document(&key, &out.fields.to_patch((self.clock)()))?;
        info!(
            post_id,
            keywords = out.fields.keywords.len(),
            tags = out.fields.tags_lower.len(),
            strains = out.fields.canna.strains.len(),
            "Post indexed"
        );
        self.notifier.post_indexed(post_id, &out.fields);

        Ok(TriggerOutcome::Indexed(out.fields))
    }
}

fn same_inputs(before: &PostView<'_>, after: &PostView<'_>) -> bool {
    normalize(before.text()) == normalize(after.text())
        && normalize_tags(&before.raw_tags()).join("|") == normalize_tags(&after.raw_tags()).join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use grow_storage::MemoryStore;
    use grow_taxonomy::TaxonomyMatcher;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        seen: Mutex<Vec<String>>,
    }

    impl NotifierPort for RecordingNotifier {
        fn post_indexed(&self, post_id: &str, _fields: &SearchFields) {
            self.seen.lock().unwrap().push(post_id.to_string());
        }
    }

    fn setup() -> (WriteTrigger, Arc<MemoryStore>, Arc<RecordingNotifier>) {
        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let builder = IndexBuilder::new(Arc::new(TaxonomyMatcher::builtin()));
        let trigger = WriteTrigger::new(store.clone(), builder)
            .with_notifier(notifier.clone())
            .with_clock(Arc::new(|| 1_000));
        (trigger, store, notifier)
    }

    fn write(store: &MemoryStore, id: &str, data: &Value) {
        store.set_document(&DocKey::post(id), data).unwrap();
    }

    #[test]
    fn test_create_indexes_post() {
        let (trigger, store, notifier) = setup();
        let post = json!({ "text": "Amnesia Haze ist fantastisch #indoor", "tags": ["Indoor"] });
        write(&store, "p1", &post);

        let outcome = trigger.on_record_write("p1", None, Some(&post)).unwrap();
        let TriggerOutcome::Indexed(fields) = outcome else {
            panic!("expected Indexed");
        };
        assert!(fields.keywords.contains(&"amnesia haze".to_string()));

        let stored = store.get_document(&DocKey::post("p1")).unwrap().unwrap();
        assert_eq!(stored.data["text"], "Amnesia Haze ist fantastisch #indoor");
        assert_eq!(stored.data["searchVersion"], 2);
        assert_eq!(stored.data["updatedAt"], 1_000);
        assert_eq!(stored.data["canna"]["strains"], json!(["Amnesia Haze"]));
        assert_eq!(*notifier.seen.lock().unwrap(), vec!["p1".to_string()]);
    }

    #[test]
    fn test_unrelated_edit_skipped() {
        let (trigger, store, notifier) = setup();
        let before = json!({ "text": "OG Kush", "tags": ["Kush"], "likesCount": 1 });
        let after = json!({ "text": "og  kush!", "tags": ["kush"], "likesCount": 2 });
        write(&store, "p1", &after);

        let outcome = trigger.on_record_write("p1", Some(&before), Some(&after)).unwrap();
        assert_eq!(outcome, TriggerOutcome::InputsUnchanged);
        assert!(notifier.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_own_write_does_not_loop() {
        let (trigger, store, _notifier) = setup();
        let post = json!({ "text": "Blue Dream" });
        write(&store, "p1", &post);
        trigger.on_record_write("p1", None, Some(&post)).unwrap();

        // The merge above fires the trigger again with the indexed image
        let indexed = store.get_document(&DocKey::post("p1")).unwrap().unwrap().data;
        let outcome = trigger.on_record_write("p1", Some(&post), Some(&indexed)).unwrap();
        assert_eq!(outcome, TriggerOutcome::InputsUnchanged);

        // A fresh create of an already indexed image is current
        let outcome = trigger.on_record_write("p1", None, Some(&indexed)).unwrap();
        assert_eq!(outcome, TriggerOutcome::UpToDate);
    }

    #[test]
    fn test_delete_is_noop() {
        let (trigger, _store, _notifier) = setup();
        let before = json!({ "text": "gone" });
        assert_eq!(
            trigger.on_record_write("p1", Some(&before), None).unwrap(),
            TriggerOutcome::Deleted
        );
    }

    #[test]
    fn test_missing_post_surfaces_storage_error() {
        let (trigger, _store, _notifier) = setup();
        let post = json!({ "text": "never stored" });
        assert!(matches!(
            trigger.on_record_write("p1", None, Some(&post)),
            Err(IndexingError::Storage(_))
        ));
    }
}
