//! `ResourceApi` trait 实现

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::traits::ResourceApi;
use crate::types::{ListQuery, PaginatedResponse, Resource};

use super::RestResourceApi;

/// Largest page a single list request may ask for.
const MAX_PAGE_SIZE: u32 = 1000;

#[async_trait]
impl ResourceApi for RestResourceApi {
    fn resource_name(&self) -> &str {
        &self.endpoint.collection
    }

    async fn list(&self, query: &ListQuery) -> Result<PaginatedResponse<Resource>> {
        let query = query.validated(MAX_PAGE_SIZE);
        self.get_page(&query.to_query_pairs(), query.page, query.page_size)
            .await
    }

    async fn get(&self, id: &str) -> Result<Resource> {
        self.get_member(id).await
    }

    async fn create(&self, payload: &Value) -> Result<Resource> {
        self.post_member(payload).await
    }

    async fn update(&self, id: &str, payload: &Value) -> Result<Resource> {
        self.patch_member(id, payload).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.delete_member(id).await
    }
}
