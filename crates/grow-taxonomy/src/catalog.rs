//! Browsable view of a dictionary: canonical value lists, whole-query alias
//! resolution and prefix suggestions.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dictionary::TaxonomyDictionary;
use crate::normalize::{normalize, slug, unique};

pub const DEFAULT_SUGGEST_LIMIT: usize = 10;
pub const MAX_SUGGEST_LIMIT: usize = 25;

/// One strain as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrainEntry {
    pub name: String,
    pub family: Option<String>,
    pub slug: String,
}

/// What a full query string stands for in each table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AliasResolution {
    pub species: Option<String>,
    pub family: Option<String>,
    pub tag: Option<String>,
    pub strain: Option<String>,
}

/// Every canonical value of the dictionary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogListing {
    pub species: Vec<String>,
    pub families: Vec<String>,
    pub tags: Vec<String>,
    pub strains: Vec<StrainEntry>,
}

/// Read-only catalog over a dictionary.
#[derive(Debug, Clone, Copy)]
pub struct TaxonomyCatalog<'a> {
    dictionary: &'a TaxonomyDictionary,
}

impl<'a> TaxonomyCatalog<'a> {
    pub fn new(dictionary: &'a TaxonomyDictionary) -> Self {
        Self { dictionary }
    }

    pub fn all_species(&self) -> Vec<String> {
        sorted_unique(self.dictionary.species_values())
    }

    pub fn all_families(&self) -> Vec<String> {
        sorted_unique(self.dictionary.family_values())
    }

    pub fn all_canonical_tags(&self) -> Vec<String> {
        sorted_unique(self.dictionary.canonical_tag_values())
    }

    /// Strains deduplicated by display name, sorted by name.
    pub fn all_strains(&self) -> Vec<StrainEntry> {
        let mut by_name: BTreeMap<&str, StrainEntry> = BTreeMap::new();
        for info in self.dictionary.strain_values() {
            by_name.entry(info.name.as_str()).or_insert_with(|| StrainEntry {
                name: info.name.clone(),
                family: info.family.clone(),
                slug: slug(&info.name),
            });
        }
        by_name.into_values().collect()
    }

    pub fn listing(&self) -> CatalogListing {
        CatalogListing {
            species: self.all_species(),
            families: self.all_families(),
            tags: self.all_canonical_tags(),
            strains: self.all_strains(),
        }
    }

    /// Look the whole normalized query up in every table. When the query is
    /// a strain alias the strain's family takes precedence.
    pub fn resolve_alias(&self, query: &str) -> AliasResolution {
        let q = normalize(query);
        if q.is_empty() {
            return AliasResolution::default();
        }

        let strain = self.dictionary.strain(&q);
        let family = strain
            .and_then(|s| s.family.clone())
            .or_else(|| self.dictionary.family(&q).map(str::to_string));

        AliasResolution {
            species: self.dictionary.species(&q).map(str::to_string),
            family,
            tag: self.dictionary.canonical_tag(&q).map(str::to_string),
            strain: strain.map(|s| s.name.clone()),
        }
    }

    /// Canonical values starting with the normalized query: species, then
    /// families, then tags, then strain slugs. `limit` defaults to 10 and is
    /// capped at 25.
    pub fn suggest(&self, query: &str, limit: Option<usize>) -> Vec<String> {
        let q = normalize(query);
        if q.is_empty() {
            return Vec::new();
        }
        let limit = clamp_limit(limit);

        let strain_slugs = self.all_strains().into_iter().map(|s| s.slug);
        let candidates = self
            .all_species()
            .into_iter()
            .chain(self.all_families())
            .chain(self.all_canonical_tags())
            .chain(strain_slugs)
            .filter(|value| value.starts_with(&q));

        unique(candidates).into_iter().take(limit).collect()
    }
}

fn clamp_limit(limit: Option<usize>) -> usize {
    match limit {
        Some(0) | None => DEFAULT_SUGGEST_LIMIT,
        Some(n) => n.min(MAX_SUGGEST_LIMIT),
    }
}

fn sorted_unique<'v>(values: impl Iterator<Item = &'v str>) -> Vec<String> {
    let mut out: Vec<String> = values.map(str::to_string).collect();
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_all_species_sorted() {
        let dict = TaxonomyDictionary::builtin();
        let catalog = TaxonomyCatalog::new(&dict);
        assert_eq!(
            catalog.all_species(),
            vec!["hybrid", "indica", "ruderalis", "sativa"]
        );
    }

    #[test]
    fn test_all_strains_dedup_by_name() {
        let dict = TaxonomyDictionary::builtin();
        let strains = TaxonomyCatalog::new(&dict).all_strains();

        let ak: Vec<_> = strains.iter().filter(|s| s.name == "AK-47").collect();
        assert_eq!(ak.len(), 1);
        assert_eq!(ak[0].slug, "ak-47");
        assert_eq!(ak[0].family.as_deref(), Some("skunk"));

        let names: Vec<_> = strains.iter().map(|s| s.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_resolve_alias() {
        let dict = TaxonomyDictionary::builtin();
        let catalog = TaxonomyCatalog::new(&dict);

        let r = catalog.resolve_alias("Auto");
        assert_eq!(r.species.as_deref(), Some("ruderalis"));
        assert_eq!(r.tag.as_deref(), Some("autoflower"));
        assert_eq!(r.strain, None);

        let r = catalog.resolve_alias("amnesia");
        assert_eq!(r.strain.as_deref(), Some("Amnesia"));
        assert_eq!(r.family.as_deref(), Some("haze"));

        assert_eq!(catalog.resolve_alias("  "), AliasResolution::default());
    }

    #[test]
    fn test_suggest_order_and_limit() {
        let dict = TaxonomyDictionary::builtin();
        let catalog = TaxonomyCatalog::new(&dict);

        assert_eq!(catalog.suggest("ge", None), vec!["gelato", "gelato-41"]);
        assert_eq!(catalog.suggest("s", Some(2)), vec!["sativa", "skunk"]);
        assert!(catalog.suggest("", None).is_empty());
        assert!(catalog.suggest("c", Some(100)).len() <= MAX_SUGGEST_LIMIT);
    }
}
