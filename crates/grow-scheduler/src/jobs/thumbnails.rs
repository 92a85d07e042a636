//! Nightly thumbnail backfill.

use std::sync::Arc;

use grow_indexing::{
    BatchJobRunner, JobConfig, MediaMetadataPort, RecordTransform, ThumbnailTransform,
    THUMBNAILS_JOB,
};
use grow_storage::DocumentStore;
use grow_types::{JobSettings, ThumbnailSettings};
use tracing::info;

use crate::jobs::run_batch_job;
use crate::{JitterConfig, SchedulerError, SchedulerService};

/// Registry name of the thumbnail backfill job.
pub const THUMBNAIL_JOB_NAME: &str = "thumbnail_backfill";

/// Register the thumbnail backfill with the scheduler. `metadata` supplies
/// media dimensions; returns `Ok(false)` when the job is disabled.
pub async fn create_thumbnail_job<M>(
    scheduler: &SchedulerService,
    store: Arc<dyn DocumentStore>,
    metadata: M,
    thumbs: ThumbnailSettings,
    settings: &JobSettings,
) -> Result<bool, SchedulerError>
where
    M: MediaMetadataPort + 'static,
{
    if !settings.enabled {
        info!(job = THUMBNAIL_JOB_NAME, "Job disabled, not registering");
        return Ok(false);
    }

    let runner = Arc::new(BatchJobRunner::new(
        store,
        JobConfig::from_settings(THUMBNAILS_JOB, settings),
    ));
    let transform: Arc<dyn RecordTransform> = Arc::new(ThumbnailTransform::new(metadata, thumbs));

    scheduler
        .register_job(
            THUMBNAIL_JOB_NAME,
            &settings.cron,
            None,
            JitterConfig::new(settings.jitter_secs),
            move || run_batch_job(runner.clone(), transform.clone()),
        )
        .await?;

    info!(cron = %settings.cron, "Registered thumbnail backfill job");
    Ok(true)
}
