//! Collection queries: equality, inequality and array-membership filters, one ordering
//! field with an id tie-break, cursor and limit.
//!
//! These are the only query primitives the store offers. Prefix and
//! full-text search are emulated on top of `ArrayContains`.

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::Document;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equals value
    Eq(String, Value),
    /// Field is absent or differs from value
    NotEq(String, Value),
    /// Array field contains the string
    ArrayContains(String, String),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn not_eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::NotEq(field.to_string(), value.into())
    }

    pub fn array_contains(field: &str, value: impl Into<String>) -> Self {
        Filter::ArrayContains(field.to_string(), value.into())
    }

    pub fn matches(&self, data: &Value) -> bool {
        match self {
            Filter::Eq(field, expected) => data.get(field) == Some(expected),
            Filter::NotEq(field, excluded) => data.get(field) != Some(excluded),
            Filter::ArrayContains(field, needle) => data
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.iter().any(|v| v.as_str() == Some(needle))),
        }
    }
}

/// Position after which a query resumes: the ordering value and id of the
/// last document already returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCursor {
    pub order_value: i64,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocQuery {
    pub collection: String,
    pub filters: Vec<Filter>,
    /// Integer field to order by, newest first when `descending`
    pub order_by: Option<(String, bool)>,
    pub start_after: Option<QueryCursor>,
    pub limit: usize,
}

impl DocQuery {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            filters: Vec::new(),
            order_by: None,
            start_after: None,
            limit: usize::MAX,
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by_desc(mut self, field: &str) -> Self {
        self.order_by = Some((field.to_string(), true));
        self
    }

    pub fn order_by_asc(mut self, field: &str) -> Self {
        self.order_by = Some((field.to_string(), false));
        self
    }

    pub fn start_after(mut self, cursor: Option<QueryCursor>) -> Self {
        self.start_after = cursor;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Filter, order, resume and truncate a full collection listing.
    ///
    /// With an ordering field, documents lacking an integer value for it are
    /// excluded and ties break on id in the same direction. Without one the
    /// order is by id ascending.
    pub fn evaluate(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut hits: Vec<(Option<i64>, Document)> = docs
            .into_iter()
            .filter(|doc| self.filters.iter().all(|f| f.matches(&doc.data)))
            .filter_map(|doc| match &self.order_by {
                Some((field, _)) => doc
                    .data
                    .get(field)
                    .and_then(Value::as_i64)
                    .map(|v| (Some(v), doc)),
                None => Some((None, doc)),
            })
            .collect();

        let descending = matches!(self.order_by, Some((_, true)));
        let compare = |a: (&Option<i64>, &str), b: (&Option<i64>, &str)| -> Ordering {
            let ord = a.0.cmp(b.0).then_with(|| a.1.cmp(b.1));
            if descending {
                ord.reverse()
            } else {
                ord
            }
        };

        hits.sort_by(|(va, a), (vb, b)| compare((va, a.id.as_str()), (vb, b.id.as_str())));

        let after = self
            .start_after
            .as_ref()
            .map(|c| (Some(c.order_value), c.id.as_str()));

        hits.into_iter()
            .filter(|(value, doc)| match after {
                Some((cv, cid)) => compare((value, doc.id.as_str()), (&cv, cid)) == Ordering::Greater,
                None => true,
            })
            .take(self.limit)
            .map(|(_, doc)| doc)
            .collect()
    }
}
