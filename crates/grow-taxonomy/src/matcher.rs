//! Matches normalized tokens against a [`TaxonomyDictionary`].

use std::sync::Arc;

use serde::Serialize;

use crate::dictionary::{StrainInfo, TaxonomyDictionary};
use crate::normalize::{ngrams, strip_hash, unique};

/// Taxonomy values found in one post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TaxonomyMatch {
    /// Single-valued; the first species alias in token order wins
    pub species: Option<String>,
    pub families: Vec<String>,
    pub canon_tags: Vec<String>,
    /// Strain display names
    pub strains: Vec<String>,
}

impl TaxonomyMatch {
    /// `species ∪ families ∪ canon_tags`, duplicate-free.
    pub fn derived_tags(&self) -> Vec<String> {
        unique(
            self.species
                .iter()
                .chain(self.families.iter())
                .chain(self.canon_tags.iter())
                .cloned(),
        )
    }
}

/// Dictionary lookups over token streams.
#[derive(Debug, Clone)]
pub struct TaxonomyMatcher {
    dictionary: Arc<TaxonomyDictionary>,
}

impl TaxonomyMatcher {
    pub fn new(dictionary: Arc<TaxonomyDictionary>) -> Self {
        Self { dictionary }
    }

    pub fn builtin() -> Self {
        Self::new(Arc::new(TaxonomyDictionary::builtin()))
    }

    pub fn dictionary(&self) -> &TaxonomyDictionary {
        &self.dictionary
    }

    /// Match post words and normalized tags.
    ///
    /// Single tokens from both sources are probed against the species,
    /// family and canonical-tag tables. Strains are detected from the
    /// hash-stripped words only: 3-grams, then 2-grams, then single words
    /// not already part of a matched n-gram. Each strain also contributes
    /// its family.
    pub fn match_tokens(&self, words: &[String], tags: &[String]) -> TaxonomyMatch {
        let mut found = TaxonomyMatch::default();
        let bare_words: Vec<String> = words.iter().map(|w| strip_hash(w).to_string()).collect();

        for raw in unique(bare_words.iter().chain(tags.iter()).cloned()) {
            let token = strip_hash(&raw);
            if found.species.is_none() {
                found.species = self.dictionary.species(token).map(str::to_string);
            }
            if let Some(family) = self.dictionary.family(token) {
                push_unique(&mut found.families, family);
            }
            if let Some(tag) = self.dictionary.canonical_tag(token) {
                push_unique(&mut found.canon_tags, tag);
            }
        }

        let mut covered = vec![false; bare_words.len()];
        for n in [3, 2] {
            for (start, gram) in ngrams(&bare_words, n).into_iter().enumerate() {
                if let Some(strain) = self.dictionary.strain(&gram) {
                    add_strain(&mut found, strain);
                    covered[start..start + n].fill(true);
                }
            }
        }
        // "amnesia haze" must not also yield the single-word strain "amnesia"
        for (word, _) in bare_words.iter().zip(&covered).filter(|(_, c)| !**c) {
            if let Some(strain) = self.dictionary.strain(word) {
                add_strain(&mut found, strain);
            }
        }

        found
    }

    /// Most specific strain alias in a query: 3-grams, then 2-grams, then
    /// single tokens, left to right within each size.
    pub fn find_strain(&self, tokens: &[String]) -> Option<&StrainInfo> {
        ngrams(tokens, 3)
            .into_iter()
            .chain(ngrams(tokens, 2))
            .chain(tokens.iter().cloned())
            .find_map(|gram| self.dictionary.strain(&gram))
    }
}

fn add_strain(found: &mut TaxonomyMatch, strain: &StrainInfo) {
    push_unique(&mut found.strains, &strain.name);
    if let Some(family) = &strain.family {
        push_unique(&mut found.families, family);
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
