//! Scheduler service wrapper around tokio-cron-scheduler.
//!
//! Provides lifecycle management for the nightly jobs with status
//! tracking in a [`JobRegistry`] and graceful shutdown.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono_tz::Tz;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{JitterConfig, JobOutput, JobRegistry, JobResult, SchedulerConfig, SchedulerError};

/// Validate a cron expression.
///
/// Expressions use the 6-field format: second minute hour day-of-month
/// month day-of-week.
///
/// ```
/// use grow_scheduler::validate_cron_expression;
///
/// assert!(validate_cron_expression("0 0 3 * * *").is_ok());
/// assert!(validate_cron_expression("0 30 3 * * *").is_ok());
/// assert!(validate_cron_expression("invalid").is_err());
/// assert!(validate_cron_expression("").is_err());
/// ```
pub fn validate_cron_expression(expr: &str) -> Result<(), SchedulerError> {
    match Job::new_async(expr, |_uuid, _lock| Box::pin(async {})) {
        Ok(_) => Ok(()),
        Err(e) => Err(SchedulerError::InvalidCron(format!("'{}': {}", expr, e))),
    }
}

/// Run one job invocation and record it in the registry.
///
/// The run is skipped when the previous invocation of the same job is
/// still active, or when `token` is cancelled during the jitter delay.
pub async fn execute_job<F, Fut>(
    name: &str,
    registry: &JobRegistry,
    jitter: &JitterConfig,
    token: &CancellationToken,
    job_fn: F,
) -> JobResult
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<JobOutput, String>>,
{
    if registry.is_running(name) {
        let result = JobResult::Skipped("previous run still active".to_string());
        info!(job = %name, "Previous run still active, skipping");
        registry.record_complete(name, result.clone(), 0);
        return result;
    }

    registry.record_start(name);
    let start = Instant::now();

    if !jitter.wait(token).await {
        let result = JobResult::Skipped("shutdown requested".to_string());
        info!(job = %name, "Shutdown requested before start, skipping");
        registry.record_complete(name, result.clone(), elapsed_ms(start));
        return result;
    }

    info!(job = %name, "Job started");
    let (result, metadata) = match job_fn().await {
        Ok(output) => (output.result(), output.metadata),
        Err(e) => (JobResult::Failed(e), Default::default()),
    };
    let duration_ms = elapsed_ms(start);

    match &result {
        JobResult::Success => info!(job = %name, duration_ms, "Job completed"),
        JobResult::Skipped(reason) => info!(job = %name, reason = %reason, "Job skipped"),
        JobResult::Failed(error) => warn!(job = %name, error = %error, duration_ms, "Job failed"),
    }

    registry.record_complete_with_metadata(name, result.clone(), duration_ms, metadata);
    result
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Service wrapper around JobScheduler for lifecycle management.
pub struct SchedulerService {
    scheduler: JobScheduler,
    config: SchedulerConfig,
    shutdown_token: CancellationToken,
    is_running: AtomicBool,
    registry: Arc<JobRegistry>,
}

impl SchedulerService {
    /// Create a new scheduler service. Call `start()` to begin executing
    /// registered jobs.
    pub async fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        // Reject a bad timezone before any job is registered
        let _ = config.parse_timezone()?;

        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            config,
            shutdown_token: CancellationToken::new(),
            is_running: AtomicBool::new(false),
            registry: Arc::new(JobRegistry::new()),
        })
    }

    /// Start the scheduler.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::AlreadyRunning` if the scheduler is already started.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.scheduler.start().await?;
        info!(jobs = self.registry.job_count(), "Scheduler started");

        Ok(())
    }

    /// Shutdown the scheduler gracefully.
    ///
    /// Cancels the shutdown token, waits up to `shutdown_timeout_secs` for
    /// running jobs to finish, then stops the scheduler. A batch job still
    /// running at the deadline keeps its lease until the lease expires.
    ///
    /// # Errors
    ///
    /// Returns `SchedulerError::NotRunning` if the scheduler is not started.
    pub async fn shutdown(&mut self) -> Result<(), SchedulerError> {
        if !self.is_running.load(Ordering::SeqCst) {
            return Err(SchedulerError::NotRunning);
        }

        info!("Initiating scheduler shutdown");
        self.shutdown_token.cancel();

        let registry = self.registry.clone();
        let deadline = Duration::from_secs(self.config.shutdown_timeout_secs);
        let drained = tokio::time::timeout(deadline, async move {
            while registry.any_running() {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
        .await
        .is_ok();
        if !drained {
            warn!(
                timeout_secs = self.config.shutdown_timeout_secs,
                "Jobs still running at shutdown deadline"
            );
        }

        if let Err(e) = self.scheduler.shutdown().await {
            warn!("Error during scheduler shutdown: {}", e);
        }

        self.is_running.store(false, Ordering::SeqCst);
        info!("Scheduler shutdown complete");

        Ok(())
    }

    /// Token cancelled when shutdown begins.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<JobRegistry> {
        self.registry.clone()
    }

    /// Register a named cron job.
    ///
    /// # Arguments
    ///
    /// * `name` - Unique job name, used as the registry key
    /// * `cron_expr` - Cron expression (6-field: sec min hour day month weekday)
    /// * `timezone` - IANA timezone string, or None to use the config default
    /// * `jitter` - Random delay applied before each run
    /// * `job_fn` - Job body; `Err` is recorded as a failed run
    ///
    /// # Errors
    ///
    /// Returns error if the cron expression or timezone is invalid, or a job
    /// with the same name is already registered.
    pub async fn register_job<F, Fut>(
        &self,
        name: &str,
        cron_expr: &str,
        timezone: Option<&str>,
        jitter: JitterConfig,
        job_fn: F,
    ) -> Result<uuid::Uuid, SchedulerError>
    where
        F: Fn() -> Fut + Clone + Send + Sync + 'static,
        Fut: Future<Output = Result<JobOutput, String>> + Send + 'static,
    {
        let tz: Tz = match timezone {
            Some(tz_str) => Self::parse_timezone(tz_str)?,
            None => self.config.parse_timezone()?,
        };
        validate_cron_expression(cron_expr)?;

        if !self.registry.register(name, cron_expr) {
            return Err(SchedulerError::DuplicateJob(name.to_string()));
        }

        let job_name = name.to_string();
        let registry = self.registry.clone();
        let shutdown_token = self.shutdown_token.clone();

        let job = Job::new_async_tz(cron_expr, tz, move |uuid, mut lock| {
            let name = job_name.clone();
            let registry = registry.clone();
            let token = shutdown_token.clone();
            let jitter = jitter.clone();
            let job_fn = job_fn.clone();

            Box::pin(async move {
                execute_job(&name, &registry, &jitter, &token, job_fn).await;

                match lock.next_tick_for_job(uuid).await {
                    Ok(Some(next)) => registry.set_next_run(&name, next),
                    Ok(None) => {}
                    Err(e) => debug!(job = %name, error = %e, "Could not read next tick"),
                }
            })
        })
        .map_err(|e| SchedulerError::InvalidCron(e.to_string()))?;

        let uuid = self.scheduler.add(job).await?;

        let mut scheduler = self.scheduler.clone();
        if let Ok(Some(next)) = scheduler.next_tick_for_job(uuid).await {
            self.registry.set_next_run(name, next);
        }

        info!(job = %name, uuid = %uuid, cron = %cron_expr, timezone = %tz.name(), "Job registered");
        Ok(uuid)
    }

    /// Parse a timezone string into a chrono_tz::Tz.
    pub fn parse_timezone(tz_str: &str) -> Result<Tz, SchedulerError> {
        tz_str
            .parse()
            .map_err(|_| SchedulerError::InvalidTimezone(tz_str.to_string()))
    }
}
