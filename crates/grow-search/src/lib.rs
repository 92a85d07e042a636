//! Post search for GrowGram.
//!
//! Queries are resolved to a strain, tag or free-text plan and executed as
//! array-membership probes on the search fields stored inline on each post.
//! Free-text queries that miss on exact keywords fall back to a prefix probe
//! on the first query token.

pub mod error;
pub mod resolver;
pub mod searcher;

pub use error::SearchError;
pub use resolver::{QueryPlan, QueryResolver};
pub use searcher::{
    decode_cursor, encode_cursor, SearchPage, SearchRequest, SearchService, TagCount,
};
