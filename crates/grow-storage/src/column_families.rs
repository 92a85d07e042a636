//! Column family definitions for RocksDB.
//!
//! Each document collection is one column family, keyed by document id:
//! - posts: post documents with their inline search block
//! - jobs: job bookkeeping such as lease locks (`locks/<jobName>`)

use rocksdb::{ColumnFamilyDescriptor, Options};

use crate::keys::{COLLECTION_JOBS, COLLECTION_POSTS};

/// Column family name for post documents
pub const CF_POSTS: &str = COLLECTION_POSTS;

/// Column family name for job documents
pub const CF_JOBS: &str = COLLECTION_JOBS;

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_POSTS, CF_JOBS];

fn posts_options() -> Options {
    let mut opts = Options::default();
    // Posts carry large keyword arrays
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_POSTS, posts_options()),
        ColumnFamilyDescriptor::new(CF_JOBS, Options::default()),
    ]
}
