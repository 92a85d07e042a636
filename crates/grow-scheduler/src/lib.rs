//! Background job scheduler for the GrowGram daemon.
//!
//! Async cron scheduling on `tokio-cron-scheduler` with:
//!
//! - Timezone-aware cron expressions via chrono-tz
//! - Graceful shutdown via CancellationToken
//! - Per-job status (last run, outcome, batch stats) in a [`JobRegistry`]
//! - Random start jitter so multiple daemons spread their lease attempts
//!
//! With the default `jobs` feature the crate also wires the two nightly
//! batch jobs (reindex and thumbnail backfill) onto the scheduler.
//!
//! # Example
//!
//! ```ignore
//! use grow_scheduler::{JitterConfig, JobOutput, SchedulerConfig, SchedulerService};
//!
//! let scheduler = SchedulerService::new(SchedulerConfig::default()).await?;
//! scheduler.register_job(
//!     "reindex_posts",
//!     "0 0 3 * * *",
//!     None,
//!     JitterConfig::new(60),
//!     || async { Ok(JobOutput::new()) },
//! ).await?;
//!
//! scheduler.start().await?;
//! let status = scheduler.registry().get_status("reindex_posts");
//! ```

mod config;
mod error;
mod jitter;
mod registry;
mod scheduler;

#[cfg(feature = "jobs")]
pub mod jobs;

pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use jitter::JitterConfig;
pub use registry::{JobOutput, JobRegistry, JobResult, JobStatus};
pub use scheduler::{execute_job, validate_cron_expression, SchedulerService};
