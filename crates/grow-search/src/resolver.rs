//! Classifies a raw query as a strain, tag or free-text search.

use std::sync::Arc;

use grow_taxonomy::{normalize, strip_hash, TaxonomyMatcher, Tokenizer};
use serde::Serialize;

/// How a query is executed against the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "value", rename_all = "lowercase")]
pub enum QueryPlan {
    /// `keywords` contains the normalized strain name
    Strain(String),
    /// `tagsLower` contains the canonical value
    Tag(String),
    /// Exact keyword match, then first-token prefix match
    Free,
}

#[derive(Debug, Clone)]
pub struct QueryResolver {
    matcher: Arc<TaxonomyMatcher>,
    tokenizer: Tokenizer,
}

impl QueryResolver {
    pub fn new(matcher: Arc<TaxonomyMatcher>) -> Self {
        Self {
            matcher,
            tokenizer: Tokenizer::for_query(),
        }
    }

    /// Strain aliases win over everything (3-grams, then 2-grams, then
    /// single tokens). A single-token query may then resolve to a species,
    /// family or canonical tag, in that order.
    pub fn resolve(&self, raw_query: &str) -> QueryPlan {
        let tokens: Vec<String> = self
            .tokenizer
            .tokenize(&normalize(raw_query))
            .iter()
            .map(|t| strip_hash(t).to_string())
            .collect();

        if let Some(strain) = self.matcher.find_strain(&tokens) {
            return QueryPlan::Strain(normalize(&strain.name));
        }

        if let [token] = tokens.as_slice() {
            let dictionary = self.matcher.dictionary();
            let canonical = dictionary
                .species(token)
                .or_else(|| dictionary.family(token))
                .or_else(|| dictionary.canonical_tag(token));
            if let Some(value) = canonical {
                return QueryPlan::Tag(value.to_string());
            }
        }

        QueryPlan::Free
    }
}
