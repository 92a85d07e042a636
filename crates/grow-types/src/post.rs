//! Post documents and the derived search block.
//!
//! Posts are stored as JSON documents. The authored fields (`text`, `tags`,
//! `mediaUrls`, ...) are written by the app; the search block (`keywords`,
//! `keywordPrefixes`, `tagsLower`, `canna`, `searchVersion`) is derived from
//! them and stored inline on the same document.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Version stamped on every derived search block.
///
/// Bumping it forces the next reindex run to rewrite every post.
pub const SEARCH_VERSION: u32 = 2;

/// Field names of the persisted post document.
pub mod fields {
    pub const TEXT: &str = "text";
    pub const TAGS: &str = "tags";
    pub const MEDIA_URLS: &str = "mediaUrls";
    pub const THUMBS: &str = "thumbs";
    pub const META: &str = "meta";
    pub const VISIBILITY: &str = "visibility";
    pub const REMOVED: &str = "removed";
    pub const LIKES_COUNT: &str = "likesCount";
    pub const COMMENTS_COUNT: &str = "commentsCount";
    pub const CREATED_AT: &str = "createdAt";
    pub const UPDATED_AT: &str = "updatedAt";
    pub const THUMBS_CHECKED_AT: &str = "thumbsCheckedAt";

    pub const TEXT_LC: &str = "textLc";
    pub const KEYWORDS: &str = "keywords";
    pub const KEYWORD_PREFIXES: &str = "keywordPrefixes";
    pub const TAGS_LOWER: &str = "tagsLower";
    pub const CANNA: &str = "canna";
    pub const SEARCH_VERSION: &str = "searchVersion";
}

/// Taxonomy values derived for a post.
///
/// Each list is duplicate-free and keeps first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default)]
    pub species: Vec<String>,
    #[serde(default)]
    pub families: Vec<String>,
    /// Strain display names (e.g. "Amnesia Haze")
    #[serde(default)]
    pub strains: Vec<String>,
}

/// The derived search block of a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFields {
    /// Normalized post text
    #[serde(default)]
    pub text_lc: String,
    /// Exact-match search terms
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Leading substrings of every keyword, for prefix emulation
    #[serde(default)]
    pub keyword_prefixes: Vec<String>,
    /// Normalized author tags plus canonical taxonomy tags
    #[serde(default)]
    pub tags_lower: Vec<String>,
    /// Species, families and strains found in text and tags
    #[serde(default)]
    pub canna: Taxonomy,
    #[serde(default)]
    pub search_version: u32,
}

impl SearchFields {
    /// Build the merge patch that writes this block onto a post document.
    pub fn to_patch(&self, updated_at_ms: i64) -> Value {
        json!({
            fields::TEXT_LC: self.text_lc,
            fields::KEYWORDS: self.keywords,
            fields::KEYWORD_PREFIXES: self.keyword_prefixes,
            fields::TAGS_LOWER: self.tags_lower,
            fields::CANNA: {
                "species": self.canna.species,
                "families": self.canna.families,
                "strains": self.canna.strains,
            },
            fields::SEARCH_VERSION: self.search_version,
            fields::UPDATED_AT: updated_at_ms,
        })
    }
}

/// Tolerant read-only view over a stored post document.
///
/// Missing or mistyped fields read as empty values so a single malformed
/// document never aborts a scan.
#[derive(Debug, Clone, Copy)]
pub struct PostView<'a> {
    id: &'a str,
    data: &'a Value,
}

impl<'a> PostView<'a> {
    pub fn new(id: &'a str, data: &'a Value) -> Self {
        Self { id, data }
    }

    pub fn id(&self) -> &'a str {
        self.id
    }

    /// Raw access to any top-level field.
    pub fn field(&self, name: &str) -> Option<&'a Value> {
        self.data.get(name)
    }

    pub fn text(&self) -> &'a str {
        self.str_field(fields::TEXT).unwrap_or("")
    }

    /// Author tags. Non-array values read as no tags; scalar entries are
    /// stringified and empty entries dropped.
    pub fn raw_tags(&self) -> Vec<String> {
        match self.data.get(fields::TAGS) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    Value::Bool(b) => Some(b.to_string()),
                    _ => None,
                })
                .filter(|s| !s.trim().is_empty())
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn media_urls(&self) -> Vec<String> {
        self.string_list(fields::MEDIA_URLS)
    }

    pub fn visibility(&self) -> &'a str {
        self.str_field(fields::VISIBILITY).unwrap_or("public")
    }

    pub fn created_at(&self) -> Option<i64> {
        self.data.get(fields::CREATED_AT).and_then(Value::as_i64)
    }

    /// Stored search block, if the post has been indexed before.
    ///
    /// Requires at least a `keywords` array; everything else defaults.
    pub fn search_fields(&self) -> Option<SearchFields> {
        if !matches!(self.data.get(fields::KEYWORDS), Some(Value::Array(_))) {
            return None;
        }

        let canna = self
            .data
            .get(fields::CANNA)
            .cloned()
            .and_then(|v| serde_json::from_value::<Taxonomy>(v).ok())
            .unwrap_or_default();

        Some(SearchFields {
            text_lc: self.str_field(fields::TEXT_LC).unwrap_or("").to_string(),
            keywords: self.string_list(fields::KEYWORDS),
            keyword_prefixes: self.string_list(fields::KEYWORD_PREFIXES),
            tags_lower: self.string_list(fields::TAGS_LOWER),
            canna,
            search_version: self
                .data
                .get(fields::SEARCH_VERSION)
                .and_then(Value::as_u64)
                .unwrap_or(0) as u32,
        })
    }

    fn str_field(&self, name: &str) -> Option<&'a str> {
        self.data.get(name).and_then(Value::as_str)
    }

    fn string_list(&self, name: &str) -> Vec<String> {
        match self.data.get(name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// An authored post, as the app writes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default = "default_visibility")]
    pub visibility: String,
    #[serde(default)]
    pub removed: bool,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub comments_count: u64,
    /// Creation time in milliseconds since epoch
    #[serde(default)]
    pub created_at: i64,
}

fn default_visibility() -> String {
    "public".to_string()
}

impl PostRecord {
    pub fn new(id: impl Into<String>, text: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            tags: Vec::new(),
            media_urls: Vec::new(),
            visibility: default_visibility(),
            removed: false,
            likes_count: 0,
            comments_count: 0,
            created_at,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_media<I, S>(mut self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.media_urls = urls.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_visibility(mut self, visibility: impl Into<String>) -> Self {
        self.visibility = visibility.into();
        self
    }

    pub fn with_removed(mut self, removed: bool) -> Self {
        self.removed = removed;
        self
    }

    /// Document body as stored (the id is the document key, not a field).
    pub fn to_document(&self) -> Value {
        json!({
            fields::TEXT: self.text,
            fields::TAGS: self.tags,
            fields::MEDIA_URLS: self.media_urls,
            fields::VISIBILITY: self.visibility,
            fields::REMOVED: self.removed,
            fields::LIKES_COUNT: self.likes_count,
            fields::COMMENTS_COUNT: self.comments_count,
            fields::CREATED_AT: self.created_at,
        })
    }
}

/// Compact search result item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: String,
    pub text: String,
    pub media_urls: Vec<String>,
    pub tags: Vec<String>,
    pub likes_count: u64,
    pub comments_count: u64,
    pub created_at: Option<i64>,
    pub visibility: String,
}

impl From<PostView<'_>> for PostSummary {
    fn from(view: PostView<'_>) -> Self {
        let count = |name: &str| view.field(name).and_then(Value::as_u64).unwrap_or(0);
        Self {
            id: view.id().to_string(),
            text: view.text().to_string(),
            media_urls: view.media_urls(),
            tags: view.raw_tags(),
            likes_count: count(fields::LIKES_COUNT),
            comments_count: count(fields::COMMENTS_COUNT),
            created_at: view.created_at(),
            visibility: view.visibility().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_tolerates_malformed_fields() {
        let doc = json!({ "text": 42, "tags": "not-an-array" });
        let view = PostView::new("p1", &doc);

        assert_eq!(view.text(), "");
        assert!(view.raw_tags().is_empty());
        assert!(view.media_urls().is_empty());
        assert!(view.search_fields().is_none());
        assert_eq!(view.visibility(), "public");
    }

    #[test]
    fn test_view_stringifies_scalar_tags() {
        let doc = json!({ "tags": ["Indoor", 420, null, "", {"x": 1}, true] });
        let view = PostView::new("p1", &doc);
        assert_eq!(view.raw_tags(), vec!["Indoor", "420", "true"]);
    }

    #[test]
    fn test_search_fields_patch_is_readable_back() {
        let fields = SearchFields {
            text_lc: "og kush".to_string(),
            keywords: vec!["og".into(), "kush".into(), "og kush".into()],
            keyword_prefixes: vec!["o".into(), "og".into()],
            tags_lower: vec!["kush".into()],
            canna: Taxonomy {
                species: vec![],
                families: vec!["kush".into()],
                strains: vec!["OG Kush".into()],
            },
            search_version: SEARCH_VERSION,
        };

        let patch = fields.to_patch(1_700_000_000_000);
        assert_eq!(patch[fields::UPDATED_AT], 1_700_000_000_000i64);

        let view = PostView::new("p1", &patch);
        assert_eq!(view.search_fields(), Some(fields));
    }

    #[test]
    fn test_post_record_document_shape() {
        let post = PostRecord::new("p1", "Hello", 1000)
            .with_tags(["Indoor"])
            .with_media(["https://cdn.example.com/a.jpg"]);
        let doc = post.to_document();

        assert_eq!(doc["text"], "Hello");
        assert_eq!(doc["tags"], json!(["Indoor"]));
        assert_eq!(doc["visibility"], "public");
        assert_eq!(doc["removed"], false);
        assert!(doc.get("id").is_none());
    }

    #[test]
    fn test_summary_from_view() {
        let doc = PostRecord::new("p9", "Blue Dream", 55)
            .with_tags(["sativa"])
            .to_document();
        let summary = PostSummary::from(PostView::new("p9", &doc));

        assert_eq!(summary.id, "p9");
        assert_eq!(summary.text, "Blue Dream");
        assert_eq!(summary.tags, vec!["sativa"]);
        assert_eq!(summary.created_at, Some(55));
        assert_eq!(summary.likes_count, 0);
    }
}
