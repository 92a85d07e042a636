//! Outcome counters for a batch job run.

use serde::{Deserialize, Serialize};

/// Counters reported by one run of a paged batch job.
///
/// `updated` is derived: every scanned record that was neither skipped nor
/// failed counts as updated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStats {
    pub scanned: u64,
    pub updated: u64,
    pub skipped: u64,
    pub errors: u64,
    /// Batch commits issued
    pub batches: u64,
    pub duration_ms: u64,
}

impl JobStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_scanned(&mut self) {
        self.scanned += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    /// A failed commit loses every write it carried.
    pub fn record_failed_commit(&mut self, pending: usize) {
        self.errors += pending as u64;
    }

    pub fn record_batch(&mut self) {
        self.batches += 1;
    }

    /// Compute `updated` and stamp the duration.
    pub fn finalize(mut self, duration_ms: u64) -> Self {
        self.updated = self.scanned.saturating_sub(self.skipped + self.errors);
        self.duration_ms = duration_ms;
        self
    }

    /// Flat key/value form for job status metadata.
    pub fn to_metadata(&self) -> Vec<(String, String)> {
        vec![
            ("scanned".to_string(), self.scanned.to_string()),
            ("updated".to_string(), self.updated.to_string()),
            ("skipped".to_string(), self.skipped.to_string()),
            ("errors".to_string(), self.errors.to_string()),
            ("batches".to_string(), self.batches.to_string()),
            ("duration_ms".to_string(), self.duration_ms.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_derives_updated() {
        let mut stats = JobStats::new();
        for _ in 0..10 {
            stats.record_scanned();
        }
        stats.record_skip();
        stats.record_skip();
        stats.record_error();

        let stats = stats.finalize(42);
        assert_eq!(stats.updated, 7);
        assert_eq!(stats.duration_ms, 42);
    }

    #[test]
    fn test_finalize_never_underflows() {
        let mut stats = JobStats::new();
        stats.record_scanned();
        stats.record_failed_commit(5);

        let stats = stats.finalize(0);
        assert_eq!(stats.updated, 0);
        assert_eq!(stats.errors, 5);
    }

    #[test]
    fn test_metadata_keys() {
        let stats = JobStats::new().finalize(3);
        let meta = stats.to_metadata();
        assert_eq!(meta.len(), 6);
        assert!(meta.contains(&("duration_ms".to_string(), "3".to_string())));
    }
}
