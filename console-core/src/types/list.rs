use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use console_api::{PaginatedResponse, Resource};
use serde::Serialize;

/// One fetched page of a collection, replaced wholesale on every successful
/// list request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceList {
    pub items: Vec<Resource>,
    pub total_count: u32,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
    /// Filters the page was fetched with.
    pub filters: BTreeMap<String, String>,
    pub fetched_at: DateTime<Utc>,
}

impl ResourceList {
    pub fn from_page(page: PaginatedResponse<Resource>, filters: BTreeMap<String, String>) -> Self {
        Self {
            items: page.items,
            total_count: page.total_count,
            page: page.page,
            page_size: page.page_size,
            has_more: page.has_more,
            filters,
            fetched_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Find an item by id.
    pub fn find(&self, id: &str) -> Option<&Resource> {
        self.items.iter().find(|r| r.id == id)
    }

    /// Display names of all items.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(Resource::name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_page_keeps_pagination() {
        let page = PaginatedResponse::new(
            vec![
                Resource::new("p-1", json!({ "name": "alpha" })),
                Resource::new("p-2", json!({})),
            ],
            1,
            2,
            5,
        );
        let mut filters = BTreeMap::new();
        filters.insert("name".to_string(), "a".to_string());

        let list = ResourceList::from_page(page, filters);
        assert_eq!(list.len(), 2);
        assert_eq!(list.total_count, 5);
        assert!(list.has_more);
        assert_eq!(list.filters.get("name").map(String::as_str), Some("a"));
        assert_eq!(list.names().collect::<Vec<_>>(), vec!["alpha", "p-2"]);
        assert!(list.find("p-2").is_some());
        assert!(list.find("p-3").is_none());
    }
}
