use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============ Pagination ============

/// Query parameters for collection listing.
///
/// Pages are 1-indexed. `filters` are forwarded verbatim as query parameters
/// (e.g. `name=web`, `project_id=...`).
///
/// # Default
///
/// The default is `page = 1, page_size = 10`, with no filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Page number (1-indexed).
    pub page: u32,
    /// Number of items per page.
    pub page_size: u32,
    /// Search filters keyed by attribute name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub filters: BTreeMap<String, String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 10,
            filters: BTreeMap::new(),
        }
    }
}

impl ListQuery {
    /// Add (or replace) a filter, builder style.
    #[must_use]
    pub fn with_filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(name.into(), value.into());
        self
    }

    /// Clamp pagination values to valid ranges.
    ///
    /// - `page` is clamped to `>= 1`
    /// - `page_size` is clamped to `1..=max_page_size`
    /// - empty filter values are dropped
    #[must_use]
    pub fn validated(&self, max_page_size: u32) -> Self {
        Self {
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, max_page_size.max(1)),
            filters: self
                .filters
                .iter()
                .filter(|(_, v)| !v.trim().is_empty())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Render as `(key, value)` query pairs, pagination first.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.page_size.to_string()),
        ];
        pairs.extend(self.filters.iter().map(|(k, v)| (k.clone(), v.clone())));
        pairs
    }
}

/// A paginated response wrapper.
///
/// # Type Parameters
///
/// * `T`: The item type, usually [`Resource`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T> {
    /// Items in the current page.
    pub items: Vec<T>,
    /// Current page number.
    pub page: u32,
    /// Page size used for this request.
    pub page_size: u32,
    /// Total number of items across all pages.
    pub total_count: u32,
    /// Whether there are more pages after this one.
    pub has_more: bool,
}

impl<T> PaginatedResponse<T> {
    /// Create a new paginated response, automatically computing [`has_more`](Self::has_more).
    pub fn new(items: Vec<T>, page: u32, page_size: u32, total_count: u32) -> Self {
        let has_more = page.saturating_mul(page_size) < total_count;
        Self {
            items,
            page,
            page_size,
            total_count,
            has_more,
        }
    }
}

// ============ Resource ============

/// An opaque remote record with a stable identifier.
///
/// Everything except `id` lands in `attributes`; nested objects such as
/// `default_pool` stay as JSON and are read with dotted paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Stable identifier.
    pub id: String,
    /// All other fields of the record.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Resource {
    /// Build a resource from an id and a JSON object. Non-object values yield
    /// an empty attribute map.
    pub fn new(id: impl Into<String>, attributes: Value) -> Self {
        let attributes = match attributes {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: id.into(),
            attributes,
        }
    }

    /// Parse a server object. Numeric ids are accepted and stringified.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Object(mut map) = value else {
            return None;
        };
        let id = match map.remove("id")? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(Self {
            id,
            attributes: map,
        })
    }

    /// Look up an attribute by dotted path (`default_pool.healthmonitor_id`).
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.attributes.get(first)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// String attribute by dotted path; `id` returns the identifier.
    pub fn get_str(&self, path: &str) -> Option<&str> {
        if path == "id" {
            return Some(&self.id);
        }
        self.get(path).and_then(Value::as_str)
    }

    /// Display name, falling back to the id.
    pub fn name(&self) -> &str {
        self.get_str("name")
            .filter(|n| !n.is_empty())
            .unwrap_or(self.id.as_str())
    }

    /// The whole record as a JSON object including `id`.
    pub fn to_value(&self) -> Value {
        let mut map = self.attributes.clone();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        Value::Object(map)
    }
}

/// Whether a JSON value counts as "present" for trigger and display purposes:
/// not null, not an empty string, array or object.
pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
        Some(_) => true,
    }
}

// ============ Endpoint ============

/// Where a collection lives and how its JSON envelope is keyed.
///
/// OpenStack services wrap list bodies in the plural key and single records in
/// the singular key: `{"projects": [...]}` / `{"project": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceEndpoint {
    /// Path of the collection below the service base URL, e.g. `/v3/projects`.
    pub path: String,
    /// Envelope key for list responses, e.g. `projects`.
    pub collection: String,
    /// Envelope key for single-record bodies, e.g. `project`.
    pub member: String,
}

impl ResourceEndpoint {
    pub fn new(
        path: impl Into<String>,
        collection: impl Into<String>,
        member: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            collection: collection.into(),
            member: member.into(),
        }
    }
}

// ============ Batch ============

/// Result of a batch delete operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteResult {
    /// Number of resources deleted.
    pub success_count: usize,
    /// Number of deletions that failed.
    pub failed_count: usize,
    /// Per-id failure details.
    pub failures: Vec<BatchDeleteFailure>,
}

/// A single failed deletion within a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteFailure {
    /// Identifier that could not be deleted.
    pub resource_id: String,
    /// Human-readable failure reason.
    pub reason: String,
}

// ============ Client configuration ============

/// Connection settings for a REST service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiConfig {
    /// Service base URL, e.g. `https://cloud.example.com/identity`.
    pub base_url: String,
    /// Token sent as `X-Auth-Token`. Empty means anonymous.
    pub auth_token: String,
    /// Retries for transient failures (0 disables retrying).
    pub max_retries: u32,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            auth_token: String::new(),
            max_retries: 2,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}
