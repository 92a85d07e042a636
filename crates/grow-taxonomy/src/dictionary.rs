//! Alias dictionaries for species, families, canonical tags and strains.
//!
//! A dictionary is built once at startup (built-in tables or a TOML file)
//! and shared read-only afterwards. Alias keys are normalized on load, so
//! lookups always take normalized input.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::TaxonomyError;
use crate::normalize::normalize;

/// A strain's display name and the family it belongs to, if any.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StrainInfo {
    pub name: String,
    #[serde(default)]
    pub family: Option<String>,
}

const SPECIES: &[(&str, &str)] = &[
    ("sativa", "sativa"),
    ("indica", "indica"),
    ("hybrid", "hybrid"),
    ("ruderalis", "ruderalis"),
    ("auto", "ruderalis"),
    ("autoflower", "ruderalis"),
    ("auto-flower", "ruderalis"),
    ("autoflowering", "ruderalis"),
];

const FAMILIES: &[(&str, &str)] = &[
    ("haze", "haze"),
    ("amnesia", "haze"),
    ("super silver haze", "haze"),
    ("silver haze", "haze"),
    ("purple haze", "haze"),
    ("lemon haze", "haze"),
    ("kush", "kush"),
    ("og", "kush"),
    ("ogk", "kush"),
    ("og-kush", "kush"),
    ("ogkush", "kush"),
    ("diesel", "diesel"),
    ("sour diesel", "diesel"),
    ("nyc diesel", "diesel"),
    ("skunk", "skunk"),
    ("ak 47", "skunk"),
    ("ak-47", "skunk"),
    ("ak47", "skunk"),
    ("cookies", "cookies"),
    ("gsc", "cookies"),
    ("girl scout cookies", "cookies"),
    ("wedding cake", "cookies"),
    ("gelato", "gelato"),
    ("gelato 41", "gelato"),
    ("gelato41", "gelato"),
    ("white widow", "widow"),
    ("widow", "widow"),
    ("blue dream", "dream"),
    ("dream", "dream"),
    ("northern lights", "lights"),
    ("lights", "lights"),
    ("critical mass", "critical"),
    ("critical", "critical"),
    ("cheese", "cheese"),
    ("chemdog", "diesel"),
    ("chemdawg", "diesel"),
    ("zkittlez", "cookies"),
    ("zkit", "cookies"),
    ("runtz", "cookies"),
];

const CANONICAL_TAGS: &[(&str, &str)] = &[
    ("indoor", "indoor"),
    ("outdoor", "outdoor"),
    ("greenhouse", "greenhouse"),
    ("cali", "california"),
    ("california", "california"),
    ("soil", "soil"),
    ("erde", "soil"),
    ("coco", "coco"),
    ("coco coir", "coco"),
    ("hydro", "hydro"),
    ("hydroponic", "hydro"),
    ("dwc", "hydro"),
    ("nft", "hydro"),
    ("bio", "organic"),
    ("organic", "organic"),
    ("organic soil", "organic"),
    ("fem", "feminized"),
    ("feminized", "feminized"),
    ("feminised", "feminized"),
    ("reg", "regular"),
    ("regular", "regular"),
    ("photo", "photoperiod"),
    ("photoperiod", "photoperiod"),
    ("auto", "autoflower"),
    ("autoflower", "autoflower"),
    ("autoflowering", "autoflower"),
    ("sativa", "sativa"),
    ("indica", "indica"),
    ("hybrid", "hybrid"),
    ("haze", "haze"),
    ("kush", "kush"),
    ("diesel", "diesel"),
    ("cookies", "cookies"),
    ("gelato", "gelato"),
    ("skunk", "skunk"),
];

const STRAINS: &[(&str, &str, Option<&str>)] = &[
    ("amnesia haze", "Amnesia Haze", Some("haze")),
    ("amnesia", "Amnesia", Some("haze")),
    ("super silver haze", "Super Silver Haze", Some("haze")),
    ("silver haze", "Silver Haze", Some("haze")),
    ("purple haze", "Purple Haze", Some("haze")),
    ("lemon haze", "Lemon Haze", Some("haze")),
    ("og kush", "OG Kush", Some("kush")),
    ("master kush", "Master Kush", Some("kush")),
    ("bubba kush", "Bubba Kush", Some("kush")),
    ("banana kush", "Banana Kush", Some("kush")),
    ("sour diesel", "Sour Diesel", Some("diesel")),
    ("nyc diesel", "NYC Diesel", Some("diesel")),
    ("girl scout cookies", "Girl Scout Cookies", Some("cookies")),
    ("gsc", "Girl Scout Cookies", Some("cookies")),
    ("wedding cake", "Wedding Cake", Some("cookies")),
    ("gelato", "Gelato", Some("gelato")),
    ("gelato 41", "Gelato 41", Some("gelato")),
    ("blue dream", "Blue Dream", Some("dream")),
    ("white widow", "White Widow", Some("widow")),
    ("northern lights", "Northern Lights", Some("lights")),
    ("critical mass", "Critical Mass", Some("critical")),
    ("ak 47", "AK-47", Some("skunk")),
    ("ak-47", "AK-47", Some("skunk")),
    ("ak47", "AK-47", Some("skunk")),
    ("chemdog", "Chemdog", Some("diesel")),
    ("chemdawg", "Chemdog", Some("diesel")),
    ("zkittlez", "Zkittlez", Some("cookies")),
    ("zkit", "Zkittlez", Some("cookies")),
    ("runtz", "Runtz", Some("cookies")),
    ("strawberry cough", "Strawberry Cough", None),
    ("green crack", "Green Crack", None),
];

/// On-disk dictionary layout.
///
/// ```toml
/// [species]
/// auto = "ruderalis"
///
/// [family]
/// og = "kush"
///
/// [canonical_tag]
/// erde = "soil"
///
/// [strain]
/// "amnesia haze" = { name = "Amnesia Haze", family = "haze" }
/// ```
#[derive(Debug, Default, Deserialize)]
struct DictionaryFile {
    #[serde(default)]
    species: BTreeMap<String, String>,
    #[serde(default)]
    family: BTreeMap<String, String>,
    #[serde(default)]
    canonical_tag: BTreeMap<String, String>,
    #[serde(default)]
    strain: BTreeMap<String, StrainInfo>,
}

/// Immutable alias -> canonical value mappings.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyDictionary {
    species: HashMap<String, String>,
    families: HashMap<String, String>,
    canonical_tags: HashMap<String, String>,
    strains: HashMap<String, StrainInfo>,
}

impl TaxonomyDictionary {
    /// The dictionary compiled into the binary.
    pub fn builtin() -> Self {
        let pairs = |table: &[(&str, &str)]| {
            table
                .iter()
                .map(|(alias, value)| (normalize(alias), (*value).to_string()))
                .collect::<HashMap<_, _>>()
        };

        let strains = STRAINS
            .iter()
            .map(|(alias, name, family)| {
                (
                    normalize(alias),
                    StrainInfo {
                        name: (*name).to_string(),
                        family: family.map(str::to_string),
                    },
                )
            })
            .collect();

        Self {
            species: pairs(SPECIES),
            families: pairs(FAMILIES),
            canonical_tags: pairs(CANONICAL_TAGS),
            strains,
        }
    }

    /// Parse a TOML dictionary. Aliases are normalized; an alias that
    /// normalizes to nothing is rejected.
    pub fn from_toml_str(source: &str) -> Result<Self, TaxonomyError> {
        let file: DictionaryFile = toml::from_str(source)?;

        let dictionary = Self {
            species: normalize_keys("species", file.species)?,
            families: normalize_keys("family", file.family)?,
            canonical_tags: normalize_keys("canonical_tag", file.canonical_tag)?,
            strains: normalize_keys("strain", file.strain)?,
        };

        if let Some(info) = dictionary.strains.values().find(|s| s.name.trim().is_empty()) {
            return Err(TaxonomyError::InvalidEntry(format!(
                "strain with family {:?} has an empty name",
                info.family
            )));
        }

        debug!(
            species = dictionary.species.len(),
            families = dictionary.families.len(),
            canonical_tags = dictionary.canonical_tags.len(),
            strains = dictionary.strains.len(),
            "Loaded taxonomy dictionary"
        );

        Ok(dictionary)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TaxonomyError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Load from `path` when given, otherwise use the built-in tables.
    pub fn load(path: Option<&str>) -> Result<Self, TaxonomyError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn species(&self, alias: &str) -> Option<&str> {
        self.species.get(alias).map(String::as_str)
    }

    pub fn family(&self, alias: &str) -> Option<&str> {
        self.families.get(alias).map(String::as_str)
    }

    pub fn canonical_tag(&self, alias: &str) -> Option<&str> {
        self.canonical_tags.get(alias).map(String::as_str)
    }

    pub fn strain(&self, alias: &str) -> Option<&StrainInfo> {
        self.strains.get(alias)
    }

    pub(crate) fn species_values(&self) -> impl Iterator<Item = &str> {
        self.species.values().map(String::as_str)
    }

    pub(crate) fn family_values(&self) -> impl Iterator<Item = &str> {
        self.families.values().map(String::as_str)
    }

    pub(crate) fn canonical_tag_values(&self) -> impl Iterator<Item = &str> {
        self.canonical_tags.values().map(String::as_str)
    }

    pub(crate) fn strain_values(&self) -> impl Iterator<Item = &StrainInfo> {
        self.strains.values()
    }
}

fn normalize_keys<V>(
    table: &str,
    entries: BTreeMap<String, V>,
) -> Result<HashMap<String, V>, TaxonomyError> {
    let mut out = HashMap::with_capacity(entries.len());
    for (alias, value) in entries {
        let key = normalize(&alias);
        if key.is_empty() {
            return Err(TaxonomyError::InvalidEntry(format!(
                "{table} alias '{alias}' is empty after normalization"
            )));
        }
        out.insert(key, value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookups() {
        let dict = TaxonomyDictionary::builtin();
        assert_eq!(dict.species("auto"), Some("ruderalis"));
        assert_eq!(dict.canonical_tag("auto"), Some("autoflower"));
        assert_eq!(dict.family("og"), Some("kush"));
        assert_eq!(dict.canonical_tag("erde"), Some("soil"));

        let strain = dict.strain("amnesia haze").unwrap();
        assert_eq!(strain.name, "Amnesia Haze");
        assert_eq!(strain.family.as_deref(), Some("haze"));
        assert_eq!(dict.strain("green crack").unwrap().family, None);
    }

    #[test]
    fn test_builtin_keys_are_normalized() {
        let dict = TaxonomyDictionary::builtin();
        assert_eq!(dict.strain("ak 47").map(|s| s.name.as_str()), Some("AK-47"));
        assert!(dict.strain("ak-47").is_none());
        assert_eq!(dict.species("auto flower"), Some("ruderalis"));
        assert_eq!(dict.family("og kush"), Some("kush"));
    }

    #[test]
    fn test_from_toml_str() {
        let dict = TaxonomyDictionary::from_toml_str(
            r#"
            [species]
            Sativa = "sativa"

            [family]
            "Über Kush" = "kush"

            [strain]
            "Lemon-Skunk" = { name = "Lemon Skunk", family = "skunk" }
            "#,
        )
        .unwrap();

        assert_eq!(dict.species("sativa"), Some("sativa"));
        assert_eq!(dict.family("uber kush"), Some("kush"));
        assert_eq!(
            dict.strain("lemon skunk").map(|s| s.name.as_str()),
            Some("Lemon Skunk")
        );
        assert_eq!(dict.canonical_tag("indoor"), None);
    }

    #[test]
    fn test_from_toml_rejects_empty_alias() {
        let err = TaxonomyDictionary::from_toml_str("[family]\n\"!!\" = \"kush\"\n").unwrap_err();
        assert!(matches!(err, TaxonomyError::InvalidEntry(_)));
    }

    #[test]
    fn test_from_path_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TaxonomyDictionary::from_path(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, TaxonomyError::Io { .. }));
    }

    #[test]
    fn test_load_falls_back_to_builtin() {
        let dict = TaxonomyDictionary::load(None).unwrap();
        assert_eq!(dict.species("indica"), Some("indica"));
    }
}
