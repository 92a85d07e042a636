//! End-to-end test infrastructure for GrowGram search.
//!
//! Provides a RocksDB-backed TestHarness and helpers for scenarios covering
//! the write-trigger -> batch job -> search pipeline.

use std::sync::Arc;

use grow_indexing::{
    BatchJobRunner, IndexBuilder, JobConfig, ReindexTransform, TriggerOutcome, WriteTrigger,
    REINDEX_JOB,
};
use grow_search::{QueryResolver, SearchService};
use grow_storage::{merge_into, DocKey, DocumentStore, RocksStore};
use grow_taxonomy::TaxonomyMatcher;
use grow_types::{JobStats, PostRecord, SearchSettings};

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    pub store: Arc<dyn DocumentStore>,
    pub matcher: Arc<TaxonomyMatcher>,
}

impl TestHarness {
    /// Fresh RocksDB store in a temp directory, built-in taxonomy.
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open test storage");

        Self {
            _temp_dir: temp_dir,
            store: Arc::new(store),
            matcher: Arc::new(TaxonomyMatcher::builtin()),
        }
    }

    pub fn builder(&self) -> IndexBuilder {
        IndexBuilder::new(self.matcher.clone())
    }

    pub fn search(&self) -> SearchService {
        SearchService::new(
            self.store.clone(),
            QueryResolver::new(self.matcher.clone()),
            SearchSettings::default(),
        )
    }

    pub fn trigger(&self) -> WriteTrigger {
        WriteTrigger::new(self.store.clone(), self.builder())
    }

    /// Store posts as authored, without derived fields.
    pub fn seed(&self, posts: &[PostRecord]) {
        for post in posts {
            self.store
                .set_document(&DocKey::post(post.id.as_str()), &post.to_document())
                .expect("Failed to seed post");
        }
    }

    /// Merge a post's authored fields onto the stored document and run the
    /// write trigger for it, like an app update.
    pub fn write(&self, post: &PostRecord) -> TriggerOutcome {
        let key = DocKey::post(post.id.as_str());
        let before = self
            .store
            .get_document(&key)
            .expect("Failed to read post")
            .map(|doc| doc.data);
        let mut after = before.clone().unwrap_or_else(|| serde_json::json!({}));
        merge_into(&mut after, &post.to_document());
        self.store
            .set_document(&key, &after)
            .expect("Failed to write post");
        self.trigger()
            .on_record_write(&post.id, before.as_ref(), Some(&after))
            .expect("Write trigger failed")
    }

    pub fn reindex_runner(&self, page_size: usize) -> BatchJobRunner {
        BatchJobRunner::new(
            self.store.clone(),
            JobConfig::new(REINDEX_JOB, "reindex").with_page_size(page_size),
        )
    }

    /// One reindex run over the whole collection.
    pub fn reindex(&self, page_size: usize) -> JobStats {
        self.reindex_runner(page_size)
            .run(&ReindexTransform::new(self.builder()))
            .expect("Reindex failed")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// `count` public posts `"{prefix}-{i:03}"` with creation times 1000 ms apart.
pub fn numbered_posts(prefix: &str, count: usize, text: &str) -> Vec<PostRecord> {
    let base_ts: i64 = 1_717_200_000_000;
    (0..count)
        .map(|i| PostRecord::new(format!("{prefix}-{i:03}"), text, base_ts + i as i64 * 1000))
        .collect()
}

/// The accounting identity every finished run must satisfy.
pub fn assert_accounting(stats: &JobStats) {
    assert_eq!(
        stats.scanned,
        stats.updated + stats.skipped + stats.errors,
        "accounting identity violated: {stats:?}"
    );
}
