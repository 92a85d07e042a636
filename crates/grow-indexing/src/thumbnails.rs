//! Thumbnail URL and media metadata backfill.

use std::collections::HashMap;

use grow_storage::{system_clock, Clock, Document};
use grow_types::{fields, ThumbnailSettings};
use serde_json::{json, Map, Value};
use url::Url;

use crate::error::IndexingError;
use crate::transform::{require_object, RecordTransform, TransformOutcome};

/// Pixel size of a media item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaDimensions {
    pub width: u32,
    pub height: u32,
}

impl MediaDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// width / height rounded to 5 decimals; `None` for a degenerate size.
    pub fn aspect(&self) -> Option<f64> {
        if self.width == 0 || self.height == 0 {
            return None;
        }
        let ratio = f64::from(self.width) / f64::from(self.height);
        Some((ratio * 100_000.0).round() / 100_000.0)
    }
}

/// Looks up the dimensions of a media URL.
pub trait MediaMetadataPort: Send + Sync {
    fn dimensions(&self, url: &str) -> Option<MediaDimensions>;
}

/// Port with no metadata source; thumbnails are still derived.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMediaMetadata;

impl MediaMetadataPort for NoMediaMetadata {
    fn dimensions(&self, _url: &str) -> Option<MediaDimensions> {
        None
    }
}

/// Fixed URL -> dimensions table.
#[derive(Debug, Clone, Default)]
pub struct StaticMediaMetadata {
    entries: HashMap<String, MediaDimensions>,
}

impl StaticMediaMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, width: u32, height: u32) -> Self {
        self.entries.insert(url.into(), MediaDimensions::new(width, height));
        self
    }
}

impl MediaMetadataPort for StaticMediaMetadata {
    fn dimensions(&self, url: &str) -> Option<MediaDimensions> {
        self.entries.get(url).copied()
    }
}

/// Add `w` and `fit` query parameters unless already present. URLs that do
/// not parse are returned unchanged.
pub fn thumb_url(url: &str, width: u32, fit: &str) -> String {
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let has = |name: &str| parsed.query_pairs().any(|(k, _)| k == name);
    let (has_width, has_fit) = (has("w"), has("fit"));

    {
        let mut query = parsed.query_pairs_mut();
        if !has_width {
            query.append_pair("w", &width.to_string());
        }
        if !has_fit {
            query.append_pair("fit", fit);
        }
    }
    parsed.to_string()
}

pub struct ThumbnailTransform<M: MediaMetadataPort> {
    metadata: M,
    settings: ThumbnailSettings,
    clock: Clock,
}

impl<M: MediaMetadataPort> ThumbnailTransform<M> {
    pub fn new(metadata: M, settings: ThumbnailSettings) -> Self {
        Self {
            metadata,
            settings,
            clock: system_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

impl<M: MediaMetadataPort> RecordTransform for ThumbnailTransform<M> {
    fn name(&self) -> &str {
        "thumbnails"
    }

    fn transform(&self, doc: &Document) -> Result<TransformOutcome, IndexingError> {
        require_object(doc)?;
        let post = doc.view();
        let media = post.media_urls();
        if media.is_empty() {
            return Ok(TransformOutcome::Unchanged);
        }

        let stored_thumbs = post.field(fields::THUMBS);
        let stored_meta = post.field(fields::META);
        let mut meta: Map<String, Value> = stored_meta
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        if thumbs_complete(stored_thumbs, media.len()) && truthy(meta.get("aspect")) {
            return Ok(TransformOutcome::Unchanged);
        }

        let thumbs: Vec<String> = media
            .iter()
            .map(|url| thumb_url(url, self.settings.width, &self.settings.fit))
            .collect();

        if !(truthy(meta.get("width")) && truthy(meta.get("height"))) {
            if let Some(dims) = self.metadata.dimensions(&media[0]) {
                if let Some(aspect) = dims.aspect() {
                    meta.insert("width".into(), json!(dims.width));
                    meta.insert("height".into(), json!(dims.height));
                    meta.insert("aspect".into(), json!(aspect));
                }
            }
        }

        // Posts the metadata port cannot complete would otherwise be
        // rewritten on every run
        let thumbs_value = json!(thumbs);
        let meta_value = Value::Object(meta);
        let same_meta = match stored_meta {
            Some(stored) => *stored == meta_value,
            None => meta_value.as_object().is_some_and(Map::is_empty),
        };
        if stored_thumbs == Some(&thumbs_value) && same_meta {
            return Ok(TransformOutcome::Unchanged);
        }

        let now = (self.clock)();
        Ok(TransformOutcome::Patch(json!({
            fields::THUMBS: thumbs_value,
            fields::META: meta_value,
            fields::THUMBS_CHECKED_AT: now,
            fields::UPDATED_AT: now,
        })))
    }
}

fn thumbs_complete(thumbs: Option<&Value>, media_count: usize) -> bool {
    match thumbs {
        Some(Value::Array(items)) => {
            items.len() == media_count
                && items.iter().all(|t| t.as_str().is_some_and(|s| !s.is_empty()))
        }
        _ => false,
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const IMG: &str = "https://cdn.example.com/p/1.jpg";

    fn transform<M: MediaMetadataPort>(metadata: M) -> ThumbnailTransform<M> {
        ThumbnailTransform::new(metadata, ThumbnailSettings::default()).with_clock(Arc::new(|| 7))
    }

    #[test]
    fn test_thumb_url_adds_params() {
        assert_eq!(thumb_url(IMG, 512, "cover"), format!("{IMG}?w=512&fit=cover"));
        assert_eq!(
            thumb_url("https://cdn.example.com/a.jpg?w=300", 512, "cover"),
            "https://cdn.example.com/a.jpg?w=300&fit=cover"
        );
        assert_eq!(
            thumb_url("https://cdn.example.com/a.jpg?fit=contain&w=1", 512, "cover"),
            "https://cdn.example.com/a.jpg?fit=contain&w=1"
        );
        assert_eq!(thumb_url("not a url", 512, "cover"), "not a url");
    }

    #[test]
    fn test_aspect_rounding() {
        assert_eq!(MediaDimensions::new(1920, 1080).aspect(), Some(1.77778));
        assert_eq!(MediaDimensions::new(0, 1080).aspect(), None);
    }

    #[test]
    fn test_backfill_with_metadata() {
        let t = transform(StaticMediaMetadata::new().with(IMG, 1000, 800));
        let doc = Document::new("p1", json!({ "mediaUrls": [IMG], "meta": { "blurhash": "x" } }));

        let TransformOutcome::Patch(patch) = t.transform(&doc).unwrap() else {
            panic!("expected patch");
        };
        assert_eq!(patch[fields::THUMBS], json!([format!("{IMG}?w=512&fit=cover")]));
        assert_eq!(
            patch[fields::META],
            json!({ "blurhash": "x", "width": 1000, "height": 800, "aspect": 1.25 })
        );
        assert_eq!(patch[fields::THUMBS_CHECKED_AT], 7);
        assert_eq!(patch[fields::UPDATED_AT], 7);
    }

    #[test]
    fn test_complete_post_skipped() {
        let t = transform(NoMediaMetadata);
        let doc = Document::new(
            "p1",
            json!({ "mediaUrls": [IMG], "thumbs": ["t"], "meta": { "aspect": 1.5 } }),
        );
        assert_eq!(t.transform(&doc).unwrap(), TransformOutcome::Unchanged);
    }

    #[test]
    fn test_no_media_skipped() {
        let t = transform(NoMediaMetadata);
        let doc = Document::new("p1", json!({ "text": "no pictures" }));
        assert_eq!(t.transform(&doc).unwrap(), TransformOutcome::Unchanged);
    }

    #[test]
    fn test_missing_aspect_without_metadata_converges() {
        let t = transform(NoMediaMetadata);
        let mut data = json!({ "mediaUrls": [IMG, "https://cdn.example.com/p/2.jpg"], "thumbs": [""] });

        let TransformOutcome::Patch(patch) = t.transform(&Document::new("p1", data.clone())).unwrap() else {
            panic!("expected patch");
        };
        assert_eq!(patch[fields::THUMBS].as_array().unwrap().len(), 2);
        assert_eq!(patch[fields::META], json!({}));

        grow_storage::merge_into(&mut data, &patch);
        assert_eq!(t.transform(&Document::new("p1", data)).unwrap(), TransformOutcome::Unchanged);
    }

    #[test]
    fn test_existing_dimensions_kept() {
        let t = transform(StaticMediaMetadata::new().with(IMG, 10, 10));
        let doc = Document::new(
            "p1",
            json!({ "mediaUrls": [IMG], "meta": { "width": 640, "height": 480 } }),
        );
        let TransformOutcome::Patch(patch) = t.transform(&doc).unwrap() else {
            panic!("expected patch");
        };
        assert_eq!(patch[fields::META], json!({ "width": 640, "height": 480 }));
    }
}
