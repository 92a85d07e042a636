//! Self-expiring mutual exclusion on top of single-document transactions.
//!
//! A lease only guards against overlapping runs of the same job. It never
//! fences writes: a holder that outlives its TTL keeps writing while a new
//! holder starts.

use std::sync::Arc;
use std::time::Duration;

use grow_types::LeaseRecord;
use tracing::{debug, warn};

use crate::document::TxnWrite;
use crate::error::StorageError;
use crate::keys::DocKey;
use crate::store::DocumentStore;

/// Millisecond wall clock.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Wall clock backed by `chrono::Utc`.
pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp_millis())
}

pub struct LeaseLock {
    store: Arc<dyn DocumentStore>,
    clock: Clock,
}

impl LeaseLock {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            clock: system_clock(),
        }
    }

    /// Use a custom clock (tests).
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now_ms(&self) -> i64 {
        (self.clock)()
    }

    /// Owner string for a job class: `"<prefix>:<now_ms>"`.
    pub fn owner_for(&self, prefix: &str) -> String {
        format!("{prefix}:{}", self.now_ms())
    }

    /// Take the lease when it is absent or expired. Returns false while
    /// another holder's lease is still valid.
    ///
    /// Expiry is judged by the TTL stored in the existing lease, not by the
    /// caller's `ttl`.
    pub fn acquire(&self, key: &DocKey, ttl: Duration, owner: &str) -> Result<bool, StorageError> {
        let now = self.now_ms();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let mut acquired = false;

        self.store.transaction(key, &mut |current| {
            if let Some(bytes) = current {
                let held = LeaseRecord::from_bytes(bytes)?;
                if !held.is_expired(now) {
                    debug!(key = %key, holder = %held.owner, "Lease held");
                    acquired = false;
                    return Ok(TxnWrite::Keep);
                }
                debug!(key = %key, stale = %held.owner, "Overwriting expired lease");
            }

            acquired = true;
            Ok(TxnWrite::Put(LeaseRecord::new(owner, now, ttl_ms).to_bytes()?))
        })?;

        Ok(acquired)
    }

    /// Delete the lease if its owner starts with `owner_prefix`; otherwise
    /// leave it alone. An unreadable lease is left in place.
    pub fn release(&self, key: &DocKey, owner_prefix: &str) -> Result<(), StorageError> {
        self.store.transaction(key, &mut |current| {
            let Some(bytes) = current else {
                return Ok(TxnWrite::Keep);
            };
            match LeaseRecord::from_bytes(bytes) {
                Ok(held) if held.is_owned_by(owner_prefix) => Ok(TxnWrite::Delete),
                Ok(held) => {
                    debug!(key = %key, holder = %held.owner, "Lease belongs to another job");
                    Ok(TxnWrite::Keep)
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Unreadable lease left in place");
                    Ok(TxnWrite::Keep)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use std::sync::atomic::{AtomicI64, Ordering};

    fn fixed_clock(start: i64) -> (Arc<AtomicI64>, Clock) {
        let now = Arc::new(AtomicI64::new(start));
        let handle = now.clone();
        (now, Arc::new(move || handle.load(Ordering::SeqCst)))
    }

    fn lock_with_clock(start: i64) -> (LeaseLock, Arc<AtomicI64>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let (now, clock) = fixed_clock(start);
        (LeaseLock::new(store.clone()).with_clock(clock), now, store)
    }

    #[test]
    fn test_acquire_fresh_then_contended() {
        let (lock, _now, _store) = lock_with_clock(1_000);
        let key = DocKey::lock("reindexPosts");
        let ttl = Duration::from_millis(600_000);

        assert!(lock.acquire(&key, ttl, "reindex:1000").unwrap());
        assert!(!lock.acquire(&key, ttl, "reindex:1001").unwrap());
    }

    #[test]
    fn test_acquire_after_expiry_overwrites_owner() {
        let (lock, now, store) = lock_with_clock(1_000);
        let key = DocKey::lock("reindexPosts");
        let ttl = Duration::from_millis(500);

        assert!(lock.acquire(&key, ttl, "reindex:a").unwrap());
        now.store(1_499, Ordering::SeqCst);
        assert!(!lock.acquire(&key, ttl, "reindex:b").unwrap());

        now.store(1_500, Ordering::SeqCst);
        assert!(lock.acquire(&key, ttl, "reindex:b").unwrap());

        let held = LeaseRecord::from_bytes(&store.get(&key).unwrap().unwrap()).unwrap();
        assert_eq!(held.owner, "reindex:b");
        assert_eq!(held.locked_at, 1_500);
    }

    #[test]
    fn test_stored_ttl_decides_expiry() {
        let (lock, now, _store) = lock_with_clock(0);
        let key = DocKey::lock("thumbnails");

        assert!(lock.acquire(&key, Duration::from_millis(10_000), "thumbs:0").unwrap());
        now.store(5_000, Ordering::SeqCst);
        // A shorter requested TTL does not shorten the holder's lease
        assert!(!lock.acquire(&key, Duration::from_millis(100), "thumbs:1").unwrap());
    }

    #[test]
    fn test_release_only_own_prefix() {
        let (lock, _now, store) = lock_with_clock(0);
        let key = DocKey::lock("shared");
        let ttl = Duration::from_secs(60);

        assert!(lock.acquire(&key, ttl, "jobB:123").unwrap());
        lock.release(&key, "jobA:").unwrap();
        assert!(store.get(&key).unwrap().is_some());

        lock.release(&key, "jobB:").unwrap();
        assert!(store.get(&key).unwrap().is_none());

        // Releasing an absent lease is a no-op
        lock.release(&key, "jobB:").unwrap();
    }

    #[test]
    fn test_malformed_lease_fails_acquire() {
        let (lock, _now, store) = lock_with_clock(0);
        let key = DocKey::lock("broken");
        store.compare_and_set(&key, None, Some(&b"not json"[..])).unwrap();

        assert!(matches!(
            lock.acquire(&key, Duration::from_secs(1), "reindex:1"),
            Err(StorageError::Serialization(_))
        ));
        lock.release(&key, "reindex:").unwrap();
        assert!(store.get(&key).unwrap().is_some());
    }

    #[test]
    fn test_owner_for() {
        let (lock, _now, _store) = lock_with_clock(1_718_000_000_000);
        assert_eq!(lock.owner_for("thumbs"), "thumbs:1718000000000");
    }
}
