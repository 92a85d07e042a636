//! # grow-types
//!
//! Shared domain types for the GrowGram search backend.
//!
//! This crate defines the core data structures used throughout the system:
//! - Posts: authored fields plus the derived search block stored inline
//! - Leases: self-expiring job lock documents
//! - Job stats: the observable outcome of a batch job run
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use grow_types::{JobStats, SearchFields};
//!
//! let stats = JobStats::new();
//! assert_eq!(stats.scanned, 0);
//! assert_eq!(SearchFields::default().keywords.len(), 0);
//! ```

pub mod config;
pub mod error;
pub mod lease;
pub mod post;
pub mod stats;

pub use config::{
    JobSettings, JobsSettings, SchedulerSettings, SearchSettings, Settings, TaxonomySettings,
    ThumbnailSettings,
};
pub use error::GrowError;
pub use lease::LeaseRecord;
pub use post::{fields, PostRecord, PostSummary, PostView, SearchFields, Taxonomy, SEARCH_VERSION};
pub use stats::JobStats;
