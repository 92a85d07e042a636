//! Nightly reindex of the derived search fields.
//!
//! Runs at 3 AM by default. Posts whose search block is already current
//! are skipped, so a nightly run over an unchanged collection writes nothing.

use std::sync::Arc;

use grow_indexing::{BatchJobRunner, IndexBuilder, JobConfig, ReindexTransform, REINDEX_JOB};
use grow_storage::DocumentStore;
use grow_types::JobSettings;
use tracing::info;

use crate::jobs::run_batch_job;
use crate::{JitterConfig, SchedulerError, SchedulerService};

/// Registry name of the reindex job.
pub const REINDEX_JOB_NAME: &str = "reindex_posts";

/// Register the reindex job with the scheduler.
///
/// Returns `Ok(false)` without registering anything when the job is
/// disabled in `settings`.
///
/// # Errors
///
/// Returns error if job registration fails (invalid cron, invalid timezone,
/// duplicate name).
pub async fn create_reindex_job(
    scheduler: &SchedulerService,
    store: Arc<dyn DocumentStore>,
    builder: IndexBuilder,
    settings: &JobSettings,
) -> Result<bool, SchedulerError> {
    if !settings.enabled {
        info!(job = REINDEX_JOB_NAME, "Job disabled, not registering");
        return Ok(false);
    }

    let runner = Arc::new(BatchJobRunner::new(
        store,
        JobConfig::from_settings(REINDEX_JOB, settings),
    ));
    let transform: Arc<dyn grow_indexing::RecordTransform> =
        Arc::new(ReindexTransform::new(builder));

    scheduler
        .register_job(
            REINDEX_JOB_NAME,
            &settings.cron,
            None,
            JitterConfig::new(settings.jitter_secs),
            move || run_batch_job(runner.clone(), transform.clone()),
        )
        .await?;

    info!(cron = %settings.cron, "Registered reindex job");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use grow_storage::MemoryStore;
    use grow_taxonomy::TaxonomyMatcher;

    use crate::SchedulerConfig;

    fn builder() -> IndexBuilder {
        IndexBuilder::new(Arc::new(TaxonomyMatcher::builtin()))
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_reindex_job() {
        let scheduler = SchedulerService::new(SchedulerConfig::default()).await.unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());

        let registered = create_reindex_job(&scheduler, store, builder(), &JobSettings::reindex())
            .await
            .unwrap();

        assert!(registered);
        let status = scheduler.registry().get_status(REINDEX_JOB_NAME).unwrap();
        assert_eq!(status.cron_expr, "0 0 3 * * *");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_disabled_reindex_job_not_registered() {
        let scheduler = SchedulerService::new(SchedulerConfig::default()).await.unwrap();
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let settings = JobSettings {
            enabled: false,
            ..JobSettings::reindex()
        };

        let registered = create_reindex_job(&scheduler, store, builder(), &settings)
            .await
            .unwrap();

        assert!(!registered);
        assert!(!scheduler.registry().is_registered(REINDEX_JOB_NAME));
    }
}
