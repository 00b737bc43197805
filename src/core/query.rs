//! List query parameters: search, filters, ordering and pagination

use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::Settings;

/// Query keys with a meaning of their own, never treated as filters
pub const RESERVED_PARAMS: &[&str] = &["page", "limit", "search", "ordering", "fields", "exclude"];

/// Parsed list parameters
///
/// # Example
/// ```text
/// GET /users?search=ada&is_staff=true&ordering=-created_at,email&page=2&limit=10
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// Page number (starts at 1)
    pub page: usize,

    /// Number of items per page, capped by `max_page_size`
    pub limit: usize,

    /// Case-insensitive substring searched in the search fields
    pub search: Option<String>,

    /// `(field, descending)` sort keys, most significant first
    pub ordering: Vec<(String, bool)>,

    /// Exact-match filters on declared filter fields
    pub filters: Vec<(String, String)>,
}

impl ListQuery {
    /// Read list parameters from a raw query map.
    ///
    /// Unparsable numbers fall back to defaults; filters on undeclared fields
    /// are ignored.
    pub fn parse(query: &HashMap<String, String>, filter_fields: &[String], settings: &Settings) -> Self {
        let page = query
            .get("page")
            .and_then(|p| p.parse::<usize>().ok())
            .unwrap_or(1)
            .max(1);
        let limit = query
            .get("limit")
            .and_then(|l| l.parse::<usize>().ok())
            .unwrap_or(settings.page_size)
            .clamp(1, settings.max_page_size.max(1));
        let search = query
            .get("search")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let ordering = query
            .get("ordering")
            .map(|o| parse_ordering(o))
            .unwrap_or_default();

        let mut filters: Vec<(String, String)> = query
            .iter()
            .filter(|(key, _)| !RESERVED_PARAMS.contains(&key.as_str()))
            .filter(|(key, _)| filter_fields.iter().any(|f| f == *key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        filters.sort();

        Self {
            page,
            limit,
            search,
            ordering,
            filters,
        }
    }

    /// Whether a row (as attribute map) passes search and filters
    pub fn matches(&self, row: &Map<String, Value>, search_fields: &[String]) -> bool {
        let found = self.search.as_ref().is_none_or(|needle| {
            let needle = needle.to_lowercase();
            search_fields.iter().any(|field| {
                row.get(field)
                    .and_then(Value::as_str)
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            })
        });
        found
            && self.filters.iter().all(|(field, raw)| {
                row.get(field)
                    .is_some_and(|stored| matches_query_value(stored, raw))
            })
    }

    /// Sort rows by the ordering keys the predicate accepts
    pub fn sort<R>(&self, rows: &mut [R], attributes: impl Fn(&R) -> &Map<String, Value>, orderable: impl Fn(&str) -> bool) {
        let keys: Vec<&(String, bool)> = self
            .ordering
            .iter()
            .filter(|(field, _)| orderable(field))
            .collect();
        if keys.is_empty() {
            return;
        }
        rows.sort_by(|a, b| {
            let (a, b) = (attributes(a), attributes(b));
            keys.iter()
                .map(|(field, descending)| {
                    let ordering = compare_values(
                        a.get(field).unwrap_or(&Value::Null),
                        b.get(field).unwrap_or(&Value::Null),
                    );
                    if *descending { ordering.reverse() } else { ordering }
                })
                .find(|ordering| *ordering != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
        });
    }

    /// Slice out the requested page
    pub fn paginate<R>(&self, rows: Vec<R>) -> (Vec<R>, PaginationMeta) {
        let total = rows.len();
        let meta = PaginationMeta::new(self.page, self.limit, total);
        let start = (self.page - 1).saturating_mul(self.limit);
        let page = rows.into_iter().skip(start).take(self.limit).collect();
        (page, meta)
    }
}

/// `"-created_at, email"` → `[("created_at", true), ("email", false)]`
pub fn parse_ordering(raw: &str) -> Vec<(String, bool)> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(|key| match key.strip_prefix('-') {
            Some(field) => (field.to_string(), true),
            None => (key.to_string(), false),
        })
        .filter(|(field, _)| !field.is_empty())
        .collect()
}

/// Compare a stored value with a raw query-string value
pub fn matches_query_value(stored: &Value, raw: &str) -> bool {
    match stored {
        Value::String(s) => s == raw,
        Value::Bool(b) => match raw.to_lowercase().as_str() {
            "true" | "1" => *b,
            "false" | "0" => !*b,
            _ => false,
        },
        Value::Number(n) => n.to_string() == raw,
        Value::Null => raw.is_empty() || raw == "null",
        _ => false,
    }
}

/// Total order over JSON scalars: null < bool < number < string
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Paginated response structure
///
/// This structure wraps paginated data with metadata about pagination state.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    /// The paginated data
    pub data: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub limit: usize,

    /// Total number of items (after search and filters)
    pub total: usize,

    /// Total number of pages
    pub total_pages: usize,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let limit = limit.max(1);
        let page = page.max(1);
        let total_pages = if total == 0 { 0 } else { total.div_ceil(limit) };
        let start = (page - 1).saturating_mul(limit);

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: start.saturating_add(limit) < total,
            has_prev: page > 1,
        }
    }
}
