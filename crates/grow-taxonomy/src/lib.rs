//! # grow-taxonomy
//!
//! Text normalization and cannabis taxonomy matching.
//!
//! ## Core Concepts
//!
//! - **Normalization**: every stored or queried string is reduced to
//!   lowercase ASCII words (`[a-z0-9#]`) separated by single spaces
//! - **Dictionary**: alias -> canonical mappings for species, families,
//!   canonical tags and multi-word strains, loaded once and shared
//! - **Matcher**: probes single tokens and n-grams against the dictionary
//! - **Catalog**: canonical value listings, alias resolution, suggestions
//!
//! ## Usage
//!
//! ```rust
//! use grow_taxonomy::{normalize, tokenize, TaxonomyMatcher};
//!
//! let matcher = TaxonomyMatcher::builtin();
//! let words = tokenize(&normalize("Blue Dream outdoor"));
//! let found = matcher.match_tokens(&words, &[]);
//! assert_eq!(found.strains, vec!["Blue Dream".to_string()]);
//! ```

pub mod catalog;
pub mod dictionary;
pub mod error;
pub mod matcher;
pub mod normalize;

pub use catalog::{AliasResolution, CatalogListing, StrainEntry, TaxonomyCatalog};
pub use dictionary::{StrainInfo, TaxonomyDictionary};
pub use error::TaxonomyError;
pub use matcher::{TaxonomyMatch, TaxonomyMatcher};
pub use normalize::{ngrams, normalize, prefixes, slug, strip_hash, tokenize, unique, Tokenizer};
