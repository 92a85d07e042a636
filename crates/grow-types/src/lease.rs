//! Lease documents used to keep batch jobs from overlapping.
//!
//! A lease lives at `jobs/locks/<jobName>` and expires on its own once
//! `ttl_ms` has elapsed since `locked_at`, so a crashed holder never blocks
//! the next run forever.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseRecord {
    /// Holder identity, e.g. "reindex:1718000000000"
    pub owner: String,
    /// Acquisition time in milliseconds since epoch
    pub locked_at: i64,
    pub ttl_ms: i64,
}

impl LeaseRecord {
    pub fn new(owner: impl Into<String>, locked_at: i64, ttl_ms: i64) -> Self {
        Self {
            owner: owner.into(),
            locked_at,
            ttl_ms,
        }
    }

    /// A lease is free once its own recorded TTL has elapsed.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms - self.locked_at >= self.ttl_ms
    }

    pub fn is_owned_by(&self, owner_prefix: &str) -> bool {
        self.owner.starts_with(owner_prefix)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
