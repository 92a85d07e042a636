//! Post search over `keywords`, `keywordPrefixes` and `tagsLower`.
//!
//! The store only answers equality and array-membership queries, so every
//! search mode is a single `ArrayContains` probe on a derived field, ordered
//! newest first and paged by a `(createdAt, id)` cursor.

use std::collections::HashMap;
use std::sync::Arc;

use grow_storage::{DocQuery, Document, DocumentStore, Filter, QueryCursor, COLLECTION_POSTS};
use grow_taxonomy::{normalize, strip_hash, Tokenizer};
use grow_types::{fields, PostSummary, PostView, SearchSettings};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SearchError;
use crate::resolver::{QueryPlan, QueryResolver};

/// Distinct keywords collected before suggestions stop scanning.
const SUGGESTION_POOL: usize = 20;

/// Paging and filter options for one search call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Extra `tagsLower` filter for strain and free searches
    pub forced_tag: Option<String>,
    /// Opaque cursor from a previous page
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    pub fn with_forced_tag(mut self, tag: impl Into<String>) -> Self {
        self.forced_tag = Some(tag.into());
        self
    }
}

/// One page of results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub items: Vec<PostSummary>,
    /// Present only when another page exists
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: u64,
}

/// Encode a page cursor as `"<createdAt ms>:<id>"`.
pub fn encode_cursor(created_at: i64, id: &str) -> String {
    format!("{created_at}:{id}")
}

/// Parse a cursor produced by [`encode_cursor`].
pub fn decode_cursor(cursor: &str) -> Option<QueryCursor> {
    let (created, id) = cursor.split_once(':')?;
    let order_value = created.parse::<i64>().ok()?;
    if id.is_empty() {
        return None;
    }
    Some(QueryCursor {
        order_value,
        id: id.to_string(),
    })
}

pub struct SearchService {
    store: Arc<dyn DocumentStore>,
    resolver: QueryResolver,
    settings: SearchSettings,
}

impl SearchService {
    pub fn new(store: Arc<dyn DocumentStore>, resolver: QueryResolver, settings: SearchSettings) -> Self {
        Self {
            store,
            resolver,
            settings,
        }
    }

    pub fn resolver(&self) -> &QueryResolver {
        &self.resolver
    }

    /// Search posts. A blank query returns an empty page.
    pub fn search(&self, raw_query: &str, request: &SearchRequest) -> Result<SearchPage, SearchError> {
        let q = normalize(raw_query);
        if q.is_empty() {
            return Ok(SearchPage::default());
        }

        let limit = self.clamp_limit(request.limit);
        let forced_tag = request
            .forced_tag
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());
        let cursor = match request.cursor.as_deref() {
            Some(raw) => {
                let parsed = decode_cursor(raw);
                if parsed.is_none() {
                    debug!(cursor = raw, "Ignoring malformed cursor");
                }
                parsed
            }
            None => None,
        };

        let page = |field: &str, value: &str, forced: Option<&str>| -> Result<Vec<Document>, SearchError> {
            let mut query = self
                .base_query()
                .filter(Filter::array_contains(field, value))
                .start_after(cursor.clone())
                .limit(limit + 1);
            if let Some(tag) = forced {
                query = query.filter(Filter::array_contains(fields::TAGS_LOWER, tag));
            }
            Ok(self.store.query(&query)?)
        };

        let plan = self.resolver.resolve(raw_query);
        let docs = match &plan {
            QueryPlan::Strain(name) => page(fields::KEYWORDS, name, forced_tag.as_deref())?,
            QueryPlan::Tag(tag) => page(fields::TAGS_LOWER, tag, None)?,
            QueryPlan::Free => {
                let exact = page(fields::KEYWORDS, &q, forced_tag.as_deref())?;
                if exact.is_empty() {
                    let tokens = Tokenizer::for_query().tokenize(&q);
                    let first = strip_hash(tokens.first().map(String::as_str).unwrap_or(q.as_str()));
                    page(fields::KEYWORD_PREFIXES, first, forced_tag.as_deref())?
                } else {
                    exact
                }
            }
        };
        debug!(query = %q, plan = ?plan, hits = docs.len(), "Search executed");

        Ok(paginate(docs, limit))
    }

    /// Keywords starting with `prefix`, taken from recent posts indexed
    /// under that prefix.
    pub fn suggestions(&self, prefix: &str, limit: Option<usize>) -> Result<Vec<String>, SearchError> {
        let q = normalize(prefix);
        if q.is_empty() {
            return Ok(Vec::new());
        }
        let limit = match limit {
            Some(0) | None => self.settings.suggestion_limit,
            Some(n) => n,
        };

        let query = self
            .base_query()
            .filter(Filter::array_contains(fields::KEYWORD_PREFIXES, q.as_str()))
            .limit(self.settings.suggestion_scan);

        let mut pool: Vec<String> = Vec::new();
        'posts: for doc in self.store.query(&query)? {
            let keywords = doc.view().search_fields().map(|f| f.keywords).unwrap_or_default();
            for keyword in keywords {
                if keyword.starts_with(&q) && !pool.contains(&keyword) {
                    pool.push(keyword);
                }
                if pool.len() >= SUGGESTION_POOL {
                    break 'posts;
                }
            }
        }

        pool.truncate(limit);
        Ok(pool)
    }

    /// Tag counts over the newest visible posts, most frequent first.
    pub fn trending_tags(&self, limit: Option<usize>) -> Result<Vec<TagCount>, SearchError> {
        let limit = match limit {
            Some(0) | None => self.settings.trending_limit,
            Some(n) => n.min(self.settings.trending_max_limit),
        };
        let query = self.base_query().limit(self.settings.trending_window);

        let mut counts: HashMap<String, u64> = HashMap::new();
        for doc in self.store.query(&query)? {
            for tag in post_tags(&doc.view()) {
                *counts.entry(tag).or_default() += 1;
            }
        }

        let mut ranked: Vec<TagCount> = counts
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
        ranked.truncate(limit);
        Ok(ranked)
    }

    fn base_query(&self) -> DocQuery {
        DocQuery::new(COLLECTION_POSTS)
            .filter(Filter::eq(fields::VISIBILITY, self.settings.visibility.as_str()))
            .filter(Filter::not_eq(fields::REMOVED, true))
            .order_by_desc(fields::CREATED_AT)
    }

    fn clamp_limit(&self, requested: Option<usize>) -> usize {
        match requested {
            Some(0) | None => self.settings.default_limit,
            Some(n) => n.min(self.settings.max_limit),
        }
        .max(1)
    }
}

/// Indexed tags, or trimmed lower-cased raw tags for unindexed posts.
fn post_tags(post: &PostView<'_>) -> Vec<String> {
    match post.search_fields() {
        Some(fields) if !fields.tags_lower.is_empty() => fields.tags_lower,
        _ => {
            let mut tags: Vec<String> = Vec::new();
            for tag in post.raw_tags() {
                let tag = tag.trim().to_lowercase();
                if !tag.is_empty() && !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
            tags
        }
    }
}

fn paginate(mut docs: Vec<Document>, limit: usize) -> SearchPage {
    let has_more = docs.len() > limit;
    docs.truncate(limit);

    let next_cursor = if has_more {
        docs.last()
            .and_then(|doc| doc.view().created_at().map(|ts| encode_cursor(ts, &doc.id)))
    } else {
        None
    };

    SearchPage {
        items: docs.iter().map(|doc| PostSummary::from(doc.view())).collect(),
        next_cursor,
    }
}
