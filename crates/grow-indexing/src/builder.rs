//! Derives the search block of a post from its text and tags.
//!
//! The same builder backs the write trigger and the reindex job, so a post
//! indexed by either path carries identical fields.

use std::sync::Arc;

use grow_taxonomy::{normalize, prefixes, unique, TaxonomyMatch, TaxonomyMatcher, Tokenizer};
use grow_types::{PostView, SearchFields, Taxonomy, SEARCH_VERSION};

/// Cap on `keywords`.
pub const MAX_KEYWORDS: usize = 300;

/// Cap on `keywordPrefixes`.
pub const MAX_KEYWORD_PREFIXES: usize = 1000;

/// Longest prefix generated per keyword.
pub const MAX_PREFIX_LEN: usize = 12;

/// Cap on `tagsLower`.
pub const MAX_TAGS: usize = 100;

/// Result of a build: the fields and whether they differ from what is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    pub fields: SearchFields,
    pub matched: TaxonomyMatch,
    /// False when the stored block already matches on text, tags, keywords
    /// and version
    pub changed: bool,
}

#[derive(Debug, Clone)]
pub struct IndexBuilder {
    matcher: Arc<TaxonomyMatcher>,
    tokenizer: Tokenizer,
}

impl IndexBuilder {
    pub fn new(matcher: Arc<TaxonomyMatcher>) -> Self {
        Self {
            matcher,
            tokenizer: Tokenizer::for_index(),
        }
    }

    pub fn matcher(&self) -> &TaxonomyMatcher {
        &self.matcher
    }

    /// Build from a stored post, comparing against its stored block.
    pub fn build_for(&self, post: &PostView<'_>) -> BuildOutput {
        let existing = post.search_fields();
        self.build(post.text(), &post.raw_tags(), existing.as_ref())
    }

    pub fn build(
        &self,
        raw_text: &str,
        raw_tags: &[String],
        existing: Option<&SearchFields>,
    ) -> BuildOutput {
        let text_lc = normalize(raw_text);
        let tags = normalize_tags(raw_tags);
        let words = self.tokenizer.tokenize(&text_lc);

        let matched = self.matcher.match_tokens(&words, &tags);
        let derived = matched.derived_tags();
        let strain_keywords: Vec<String> = matched
            .strains
            .iter()
            .map(|name| normalize(name))
            .filter(|name| !name.is_empty())
            .collect();

        let mut keywords = unique(
            words
                .iter()
                .chain(tags.iter())
                .chain(derived.iter())
                .chain(strain_keywords.iter())
                .cloned(),
        );
        keywords.truncate(MAX_KEYWORDS);

        let mut keyword_prefixes = prefixes(&keywords, MAX_PREFIX_LEN);
        keyword_prefixes.truncate(MAX_KEYWORD_PREFIXES);

        let mut tags_lower = unique(tags.iter().chain(derived.iter()).cloned());
        tags_lower.truncate(MAX_TAGS);

        let fields = SearchFields {
            text_lc,
            keywords,
            keyword_prefixes,
            tags_lower,
            canna: Taxonomy {
                species: matched.species.iter().cloned().collect(),
                families: matched.families.clone(),
                strains: matched.strains.clone(),
            },
            search_version: SEARCH_VERSION,
        };
        let changed = !existing.is_some_and(|stored| same_index(stored, &fields));

        BuildOutput {
            fields,
            matched,
            changed,
        }
    }
}

/// Normalize each author tag, dropping tags that normalize to nothing.
pub fn normalize_tags(raw_tags: &[String]) -> Vec<String> {
    raw_tags
        .iter()
        .map(|tag| normalize(tag))
        .filter(|tag| !tag.is_empty())
        .collect()
}

// Lists are compared as `|`-joined strings, so ["a|b"] equals ["a", "b"].
// Normalized values never contain `|`, which keeps this exact in practice.
fn same_index(stored: &SearchFields, fresh: &SearchFields) -> bool {
    stored.text_lc == fresh.text_lc
        && stored.tags_lower.join("|") == fresh.tags_lower.join("|")
        && stored.keywords.join("|") == fresh.keywords.join("|")
        && stored.search_version == fresh.search_version
}
