//! The nightly batch jobs.
//!
//! - **reindex**: rebuilds the derived search fields of every post
//! - **thumbnails**: backfills thumbnail URLs and media aspect ratios
//!
//! Both run through [`BatchJobRunner`] on the blocking pool; the runner's
//! lease keeps concurrent daemons from scanning at the same time.

pub mod reindex;
pub mod thumbnails;

use std::sync::Arc;

use grow_indexing::{BatchJobRunner, RecordTransform};

use crate::JobOutput;

pub use reindex::{create_reindex_job, REINDEX_JOB_NAME};
pub use thumbnails::{create_thumbnail_job, THUMBNAIL_JOB_NAME};

/// Run `transform` once on the blocking pool.
///
/// A lease held by another run becomes a skipped output; a failed first
/// page, an invalid job config or a panicking worker becomes `Err`.
pub async fn run_batch_job(
    runner: Arc<BatchJobRunner>,
    transform: Arc<dyn RecordTransform>,
) -> Result<JobOutput, String> {
    let job = runner.config().job_name.clone();
    let outcome = tokio::task::spawn_blocking(move || runner.try_run(transform.as_ref()))
        .await
        .map_err(|e| format!("{job}: worker failed: {e}"))?;

    match outcome {
        Ok(Some(stats)) => Ok(JobOutput::from_stats(&stats)),
        Ok(None) => Ok(JobOutput::skipped("lease held by another run")),
        Err(e) => Err(format!("{job}: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use grow_indexing::{IndexBuilder, JobConfig, ReindexTransform, REINDEX_JOB};
    use grow_storage::{DocKey, DocumentStore, LeaseLock, MemoryStore};
    use grow_taxonomy::TaxonomyMatcher;
    use serde_json::json;

    use crate::JobResult;

    fn seeded_store(posts: usize) -> Arc<dyn DocumentStore> {
        let store = MemoryStore::new();
        for i in 0..posts {
            store
                .set_document(
                    &DocKey::post(format!("p{i:02}")),
                    &json!({ "text": "Amnesia Haze indoor", "visibility": "public" }),
                )
                .unwrap();
        }
        Arc::new(store)
    }

    fn reindex() -> Arc<dyn RecordTransform> {
        let builder = IndexBuilder::new(Arc::new(TaxonomyMatcher::builtin()));
        Arc::new(ReindexTransform::new(builder))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_batch_job_reports_stats() {
        let store = seeded_store(5);
        let runner = Arc::new(BatchJobRunner::new(
            store.clone(),
            JobConfig::new(REINDEX_JOB, "reindex").with_page_size(2),
        ));

        let output = run_batch_job(runner.clone(), reindex()).await.unwrap();
        assert_eq!(output.result(), JobResult::Success);
        assert_eq!(output.metadata.get("scanned").map(String::as_str), Some("5"));
        assert_eq!(output.metadata.get("updated").map(String::as_str), Some("5"));

        // Second run finds everything current
        let again = run_batch_job(runner, reindex()).await.unwrap();
        assert_eq!(again.metadata.get("skipped").map(String::as_str), Some("5"));
        assert_eq!(again.metadata.get("updated").map(String::as_str), Some("0"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_batch_job_skips_when_leased() {
        let store = seeded_store(1);
        let config = JobConfig::new(REINDEX_JOB, "reindex");
        let lease = LeaseLock::new(store.clone());
        assert!(lease
            .acquire(&config.lock_key(), Duration::from_secs(600), "other-host:1")
            .unwrap());

        let runner = Arc::new(BatchJobRunner::new(store, config));
        let output = run_batch_job(runner, reindex()).await.unwrap();
        assert!(matches!(output.result(), JobResult::Skipped(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_batch_job_invalid_config_fails() {
        let runner = Arc::new(BatchJobRunner::new(
            seeded_store(1),
            JobConfig::new(REINDEX_JOB, "reindex").with_page_size(0),
        ));
        let err = run_batch_job(runner, reindex()).await.unwrap_err();
        assert!(err.starts_with("reindexPosts:"));
    }
}
