//! Search indexing for GrowGram posts.
//!
//! This crate derives the search block stored inline on every post and
//! keeps it current, both on write and through nightly batch jobs.
//!
//! ## Key Components
//!
//! - [`IndexBuilder`]: normalized text, keywords, prefixes, tags and taxonomy
//! - [`WriteTrigger`]: rebuilds the block when a post's text or tags change
//! - [`BatchJobRunner`]: lease-guarded, paged scan with batched commits
//! - [`ReindexTransform`]: the nightly reindex as a [`RecordTransform`]
//! - [`ThumbnailTransform`]: the nightly thumbnail and media metadata backfill
//!
//! ## Example
//!
//! ```ignore
//! use grow_indexing::{BatchJobRunner, IndexBuilder, JobConfig, ReindexTransform, REINDEX_JOB};
//!
//! let builder = IndexBuilder::new(matcher);
//! let runner = BatchJobRunner::new(store, JobConfig::new(REINDEX_JOB, "reindex"));
//! let stats = runner.run(&ReindexTransform::new(builder))?;
//! assert_eq!(stats.scanned, stats.updated + stats.skipped + stats.errors);
//! ```

pub mod builder;
pub mod error;
pub mod reindex;
pub mod runner;
pub mod thumbnails;
pub mod transform;
pub mod trigger;

pub use builder::{
    normalize_tags, BuildOutput, IndexBuilder, MAX_KEYWORDS, MAX_KEYWORD_PREFIXES, MAX_PREFIX_LEN,
    MAX_TAGS,
};
pub use error::IndexingError;
pub use reindex::ReindexTransform;
pub use runner::{BatchJobRunner, JobConfig, ProgressCallback, REINDEX_JOB, THUMBNAILS_JOB};
pub use thumbnails::{
    thumb_url, MediaDimensions, MediaMetadataPort, NoMediaMetadata, StaticMediaMetadata,
    ThumbnailTransform,
};
pub use transform::{RecordTransform, TransformOutcome};
pub use trigger::{NoopNotifier, NotifierPort, TriggerOutcome, WriteTrigger};
