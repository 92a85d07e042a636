//! Job registry for tracking scheduled job status.
//!
//! Each registered job keeps its last/next run times, the outcome of its
//! last run and the stats the batch runner reported for it.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of a job execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobResult {
    Success,
    /// Job failed with an error message
    Failed(String),
    /// Job did not run (lease held elsewhere, shutdown during jitter)
    Skipped(String),
}

/// What a job body hands back to the scheduler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOutput {
    /// Key-value stats from the run, stored as the job's last metadata.
    pub metadata: HashMap<String, String>,
    /// Set when the job decided not to do any work.
    pub skipped: Option<String>,
}

impl JobOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    #[cfg(feature = "jobs")]
    pub fn from_stats(stats: &grow_types::JobStats) -> Self {
        Self {
            metadata: stats.to_metadata().into_iter().collect(),
            skipped: None,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            metadata: HashMap::new(),
            skipped: Some(reason.into()),
        }
    }

    /// Map to the registry result.
    pub fn result(&self) -> JobResult {
        match &self.skipped {
            Some(reason) => JobResult::Skipped(reason.clone()),
            None => JobResult::Success,
        }
    }
}

/// Status of a registered job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_name: String,
    pub cron_expr: String,
    /// When the job last finished (if ever)
    pub last_run: Option<DateTime<Utc>>,
    pub last_duration_ms: Option<u64>,
    pub last_result: Option<JobResult>,
    pub next_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub error_count: u64,
    pub is_running: bool,
    /// Stats reported by the last run (scanned, updated, skipped, ...)
    #[serde(default)]
    pub last_run_metadata: HashMap<String, String>,
}

impl JobStatus {
    pub fn new(job_name: String, cron_expr: String) -> Self {
        Self {
            job_name,
            cron_expr,
            last_run: None,
            last_duration_ms: None,
            last_result: None,
            next_run: None,
            run_count: 0,
            error_count: 0,
            is_running: false,
            last_run_metadata: HashMap::new(),
        }
    }
}

/// Thread-safe registry of job status.
///
/// A panicking job never poisons the registry for the others; lock
/// poisoning is ignored and the inner map is used as-is.
///
/// # Example
///
/// ```
/// use grow_scheduler::{JobRegistry, JobResult};
///
/// let registry = JobRegistry::new();
/// registry.register("reindex_posts", "0 0 3 * * *");
///
/// registry.record_start("reindex_posts");
/// assert!(registry.is_running("reindex_posts"));
///
/// registry.record_complete("reindex_posts", JobResult::Success, 1500);
/// assert!(!registry.is_running("reindex_posts"));
/// ```
pub struct JobRegistry {
    jobs: RwLock<HashMap<String, JobStatus>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, JobStatus>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, JobStatus>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a job. Returns false if the name is already taken.
    pub fn register(&self, job_name: &str, cron_expr: &str) -> bool {
        let mut jobs = self.write();
        if jobs.contains_key(job_name) {
            return false;
        }
        jobs.insert(
            job_name.to_string(),
            JobStatus::new(job_name.to_string(), cron_expr.to_string()),
        );
        true
    }

    pub fn record_start(&self, job_name: &str) {
        if let Some(status) = self.write().get_mut(job_name) {
            status.is_running = true;
        }
    }

    pub fn record_complete(&self, job_name: &str, result: JobResult, duration_ms: u64) {
        self.record_complete_with_metadata(job_name, result, duration_ms, HashMap::new());
    }

    /// Record a finished run. Skipped runs count toward `run_count` but
    /// never toward `error_count`.
    pub fn record_complete_with_metadata(
        &self,
        job_name: &str,
        result: JobResult,
        duration_ms: u64,
        metadata: HashMap<String, String>,
    ) {
        if let Some(status) = self.write().get_mut(job_name) {
            status.is_running = false;
            status.last_run = Some(Utc::now());
            status.last_duration_ms = Some(duration_ms);
            status.run_count += 1;
            if matches!(result, JobResult::Failed(_)) {
                status.error_count += 1;
            }
            status.last_result = Some(result);
            status.last_run_metadata = metadata;
        }
    }

    pub fn set_next_run(&self, job_name: &str, next: DateTime<Utc>) {
        if let Some(status) = self.write().get_mut(job_name) {
            status.next_run = Some(next);
        }
    }

    pub fn get_status(&self, job_name: &str) -> Option<JobStatus> {
        self.read().get(job_name).cloned()
    }

    /// All jobs, sorted by name.
    pub fn get_all_status(&self) -> Vec<JobStatus> {
        let mut all: Vec<JobStatus> = self.read().values().cloned().collect();
        all.sort_by(|a, b| a.job_name.cmp(&b.job_name));
        all
    }

    pub fn is_running(&self, job_name: &str) -> bool {
        self.read()
            .get(job_name)
            .map(|s| s.is_running)
            .unwrap_or(false)
    }

    pub fn any_running(&self) -> bool {
        self.read().values().any(|s| s.is_running)
    }

    pub fn is_registered(&self, job_name: &str) -> bool {
        self.read().contains_key(job_name)
    }

    pub fn job_count(&self) -> usize {
        self.read().len()
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_rejects_duplicates() {
        let registry = JobRegistry::new();
        assert!(registry.register("reindex_posts", "0 0 3 * * *"));
        assert!(!registry.register("reindex_posts", "0 0 4 * * *"));

        let status = registry.get_status("reindex_posts").unwrap();
        assert_eq!(status.cron_expr, "0 0 3 * * *");
        assert_eq!(status.run_count, 0);
        assert!(!status.is_running);
    }

    #[test]
    fn test_record_complete_counts() {
        let registry = JobRegistry::new();
        registry.register("job", "0 0 * * * *");

        registry.record_start("job");
        assert!(registry.any_running());
        registry.record_complete("job", JobResult::Success, 1500);
        registry.record_complete("job", JobResult::Failed("store down".into()), 10);
        registry.record_complete("job", JobResult::Skipped("lease held".into()), 0);

        let status = registry.get_status("job").unwrap();
        assert!(!status.is_running);
        assert!(!registry.any_running());
        assert_eq!(status.run_count, 3);
        assert_eq!(status.error_count, 1);
        assert_eq!(status.last_duration_ms, Some(0));
        assert_eq!(
            status.last_result,
            Some(JobResult::Skipped("lease held".into()))
        );
    }

    #[test]
    fn test_metadata_replaced_per_run() {
        let registry = JobRegistry::new();
        registry.register("job", "0 0 * * * *");

        let first = JobOutput::new().with_metadata("scanned", "10");
        registry.record_complete_with_metadata("job", first.result(), 5, first.metadata);
        let second = JobOutput::new().with_metadata("updated", "2");
        registry.record_complete_with_metadata("job", second.result(), 5, second.metadata);

        let status = registry.get_status("job").unwrap();
        assert_eq!(status.last_run_metadata.len(), 1);
        assert_eq!(status.last_run_metadata.get("updated").map(String::as_str), Some("2"));
    }

    #[test]
    fn test_job_output_result() {
        assert_eq!(JobOutput::new().result(), JobResult::Success);
        assert_eq!(
            JobOutput::skipped("lease held").result(),
            JobResult::Skipped("lease held".into())
        );
    }

    #[cfg(feature = "jobs")]
    #[test]
    fn test_job_output_from_stats() {
        let mut stats = grow_types::JobStats::new();
        stats.record_scanned();
        stats.record_scanned();
        stats.record_skip();
        let stats = stats.finalize(42);

        let output = JobOutput::from_stats(&stats);
        assert_eq!(output.result(), JobResult::Success);
        assert_eq!(output.metadata.get("scanned").map(String::as_str), Some("2"));
        assert_eq!(output.metadata.get("updated").map(String::as_str), Some("1"));
        assert_eq!(output.metadata.get("duration_ms").map(String::as_str), Some("42"));
    }

    #[test]
    fn test_unknown_job_is_ignored() {
        let registry = JobRegistry::new();
        registry.record_start("unknown");
        registry.record_complete("unknown", JobResult::Success, 100);
        registry.set_next_run("unknown", Utc::now());

        assert!(registry.get_status("unknown").is_none());
        assert!(!registry.is_running("unknown"));
        assert!(!registry.is_registered("unknown"));
        assert_eq!(registry.job_count(), 0);
    }

    #[test]
    fn test_get_all_status_sorted() {
        let registry = JobRegistry::new();
        registry.register("thumbnail_backfill", "0 30 3 * * *");
        registry.register("reindex_posts", "0 0 3 * * *");

        let names: Vec<String> = registry
            .get_all_status()
            .into_iter()
            .map(|s| s.job_name)
            .collect();
        assert_eq!(names, vec!["reindex_posts", "thumbnail_backfill"]);
    }

    #[test]
    fn test_registry_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(JobRegistry::new());
        registry.register("shared", "0 0 * * * *");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for _ in 0..25 {
                        registry.record_start("shared");
                        registry.record_complete("shared", JobResult::Success, 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.get_status("shared").unwrap().run_count, 200);
    }
}
