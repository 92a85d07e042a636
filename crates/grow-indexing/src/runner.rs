//! Lease-guarded paged scan that applies a [`RecordTransform`] to every
//! record of a collection.
//!
//! One run:
//! 1. Takes the job's lease; a held lease ends the run with zero counts
//! 2. Scans the collection in id order, `page_size` records per page
//! 3. Batches returned patches, committing whenever `batch_threshold` writes
//!    are pending and at the end of each page
//! 4. Releases the lease on every exit path, panics included
//!
//! Only a failure to fetch the first page fails the run. Later fetch
//! failures stop the scan with the counts so far; transform and commit
//! failures are counted as errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use grow_storage::{DocBatch, DocKey, DocumentStore, LeaseLock, COLLECTION_POSTS, MAX_BATCH_OPS};
use grow_types::{JobSettings, JobStats};
use tracing::{debug, error, info, warn};

use crate::error::IndexingError;
use crate::transform::{RecordTransform, TransformOutcome};

/// Lease document id for the reindex job.
pub const REINDEX_JOB: &str = "reindexPosts";

/// Lease document id for the thumbnail backfill.
pub const THUMBNAILS_JOB: &str = "thumbnails";

/// Called after every page with the counts so far.
pub type ProgressCallback = Box<dyn Fn(&JobStats) + Send + Sync>;

/// Configuration for one batch job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Lease document id under `jobs/locks/`
    pub job_name: String,
    /// Collection to scan
    pub collection: String,
    pub page_size: usize,
    /// Safety bound on pages per run
    pub max_pages: usize,
    pub lock_ttl: Duration,
    /// Pending writes that force a commit; at most [`MAX_BATCH_OPS`]
    pub batch_threshold: usize,
    /// Lease owners are `"<owner_prefix>:<now_ms>"`
    pub owner_prefix: String,
}

impl JobConfig {
    pub fn new(job_name: impl Into<String>, owner_prefix: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            collection: COLLECTION_POSTS.to_string(),
            page_size: 250,
            max_pages: 9999,
            lock_ttl: Duration::from_secs(600),
            batch_threshold: 450,
            owner_prefix: owner_prefix.into(),
        }
    }

    /// Build from the `[jobs.*]` settings section.
    pub fn from_settings(job_name: impl Into<String>, settings: &JobSettings) -> Self {
        Self::new(job_name, settings.owner_prefix.clone())
            .with_page_size(settings.page_size)
            .with_max_pages(settings.max_pages)
            .with_lock_ttl(Duration::from_secs(settings.lock_ttl_secs))
            .with_batch_threshold(settings.batch_threshold)
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_lock_ttl(mut self, ttl: Duration) -> Self {
        self.lock_ttl = ttl;
        self
    }

    pub fn with_batch_threshold(mut self, threshold: usize) -> Self {
        self.batch_threshold = threshold;
        self
    }

    pub fn lock_key(&self) -> DocKey {
        DocKey::lock(&self.job_name)
    }

    pub fn validate(&self) -> Result<(), IndexingError> {
        if self.page_size == 0 {
            return Err(IndexingError::InvalidConfig("page_size must be > 0".into()));
        }
        if self.batch_threshold == 0 || self.batch_threshold > MAX_BATCH_OPS {
            return Err(IndexingError::InvalidConfig(format!(
                "batch_threshold must be within 1..={MAX_BATCH_OPS}, got {}",
                self.batch_threshold
            )));
        }
        if self.owner_prefix.is_empty() {
            return Err(IndexingError::InvalidConfig("owner_prefix must not be empty".into()));
        }
        Ok(())
    }
}

/// Releases the job's lease when dropped, also while unwinding from a
/// panicking transform.
struct LeaseGuard<'a> {
    lease: &'a LeaseLock,
    key: DocKey,
    owner_prefix: String,
    job: &'a str,
}

impl Drop for LeaseGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.lease.release(&self.key, &self.owner_prefix) {
            warn!(job = self.job, error = %e, "Failed to release lease; it will expire");
        }
    }
}

pub struct BatchJobRunner {
    store: Arc<dyn DocumentStore>,
    lease: LeaseLock,
    config: JobConfig,
    progress: Option<ProgressCallback>,
}

impl BatchJobRunner {
    pub fn new(store: Arc<dyn DocumentStore>, config: JobConfig) -> Self {
        Self {
            lease: LeaseLock::new(store.clone()),
            store,
            config,
            progress: None,
        }
    }

    /// Replace the lease lock (custom clock in tests).
    pub fn with_lease(mut self, lease: LeaseLock) -> Self {
        self.lease = lease;
        self
    }

    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Run the job once. A held lease yields zero counts. Blocking; call
    /// from a blocking context.
    pub fn run(&self, transform: &dyn RecordTransform) -> Result<JobStats, IndexingError> {
        Ok(self.try_run(transform)?.unwrap_or_default())
    }

    /// Like [`run`](Self::run), but `None` when another run holds the lease.
    pub fn try_run(&self, transform: &dyn RecordTransform) -> Result<Option<JobStats>, IndexingError> {
        self.config.validate()?;
        let started = Instant::now();
        let job = self.config.job_name.as_str();
        let key = self.config.lock_key();
        let owner = self.lease.owner_for(&self.config.owner_prefix);

        if !self.lease.acquire(&key, self.config.lock_ttl, &owner)? {
            warn!(job, "Another run is active, skipping");
            return Ok(None);
        }
        info!(job, owner = %owner, transform = transform.name(), "Job started");

        let guard = LeaseGuard {
            lease: &self.lease,
            key,
            owner_prefix: format!("{}:", self.config.owner_prefix),
            job,
        };
        let mut stats = JobStats::new();
        let scanned = self.scan(transform, &mut stats);
        drop(guard);

        let stats = stats.finalize(started.elapsed().as_millis() as u64);
        match scanned {
            Ok(()) => {
                info!(
                    job,
                    scanned = stats.scanned,
                    updated = stats.updated,
                    skipped = stats.skipped,
                    errors = stats.errors,
                    batches = stats.batches,
                    duration_ms = stats.duration_ms,
                    "Job finished"
                );
                Ok(Some(stats))
            }
            Err(e) => {
                error!(job, error = %e, "Job failed");
                Err(e)
            }
        }
    }

    fn scan(&self, transform: &dyn RecordTransform, stats: &mut JobStats) -> Result<(), IndexingError> {
        let config = &self.config;
        let mut cursor: Option<String> = None;
        let mut batch = DocBatch::new();

        for page in 0..config.max_pages {
            let docs = match self
                .store
                .scan_collection(&config.collection, cursor.as_deref(), config.page_size)
            {
                Ok(docs) => docs,
                Err(e) if page == 0 => return Err(e.into()),
                Err(e) => {
                    warn!(job = %config.job_name, page, error = %e, "Page fetch failed, stopping scan");
                    break;
                }
            };
            if docs.is_empty() {
                break;
            }
            let fetched = docs.len();

            for doc in docs {
                stats.record_scanned();
                match transform.transform(&doc) {
                    Ok(TransformOutcome::Unchanged) => stats.record_skip(),
                    Ok(TransformOutcome::Patch(patch)) => {
                        batch.merge(DocKey::new(config.collection.as_str(), doc.id.as_str()), patch);
                        if batch.len() >= config.batch_threshold {
                            self.flush(&mut batch, stats);
                        }
                    }
                    Err(e) => {
                        stats.record_error();
                        warn!(job = %config.job_name, record_id = %doc.id, error = %e, "Record failed");
                    }
                }
                cursor = Some(doc.id);
            }

            if !batch.is_empty() {
                self.flush(&mut batch, stats);
            }
            debug!(job = %config.job_name, page, fetched, scanned = stats.scanned, "Page done");
            if let Some(callback) = &self.progress {
                callback(stats);
            }
            if fetched < config.page_size {
                break;
            }
        }

        Ok(())
    }

    fn flush(&self, batch: &mut DocBatch, stats: &mut JobStats) {
        let pending = std::mem::take(batch);
        let size = pending.len();
        match self.store.commit(pending) {
            Ok(()) => {
                stats.record_batch();
                debug!(job = %self.config.job_name, size, "Batch committed");
            }
            Err(e) => {
                stats.record_failed_commit(size);
                error!(job = %self.config.job_name, size, error = %e, "Batch commit failed");
            }
        }
    }
}
