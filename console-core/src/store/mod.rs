//! 远程资源存储
//!
//! [`ResourceStore`] wraps one [`ResourceApi`] collection, keeps the latest
//! list page and detail record in memory and publishes [`StoreEvent`]s.

mod event;

pub use event::{MutationOp, StoreEvent};

use std::sync::Arc;

use console_api::{ApiError, BatchDeleteResult, ListQuery, Resource, ResourceApi};
use serde_json::Value;
use tokio::sync::{RwLock, broadcast};

use crate::config::DEFAULT_MAX_PAGE_SIZE;
use crate::error::{CoreError, CoreResult};
use crate::guard::RequestSlot;
use crate::types::ResourceList;

/// Buffered events per subscriber before it starts lagging.
const EVENT_CAPACITY: usize = 64;

#[derive(Default)]
struct StoreCache {
    list: Option<ResourceList>,
    detail: Option<Resource>,
}

/// Observable, cached view of one remote collection.
///
/// - `list` / `fetch_detail` replace the cached page / record, but only when
///   the response belongs to the latest request for that slot. Older responses
///   are dropped and reported as [`CoreError::Superseded`].
/// - `load_list` / `load_detail` follow the same cache rule but return every
///   response to its caller; controllers guard staleness with their own slots.
/// - Mutations never touch the cache; they publish [`StoreEvent::Mutated`] and
///   callers decide when to re-fetch.
pub struct ResourceStore {
    api: Arc<dyn ResourceApi>,
    max_page_size: u32,
    list_slot: RequestSlot,
    detail_slot: RequestSlot,
    cache: RwLock<StoreCache>,
    events: broadcast::Sender<StoreEvent>,
}

impl ResourceStore {
    /// 创建资源存储
    pub fn new(api: Arc<dyn ResourceApi>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            api,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            list_slot: RequestSlot::new(),
            detail_slot: RequestSlot::new(),
            cache: RwLock::new(StoreCache::default()),
            events,
        }
    }

    /// Clamp list requests to at most `max_page_size` rows.
    #[must_use]
    pub fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    /// Collection name of the underlying API.
    pub fn resource_name(&self) -> &str {
        self.api.resource_name()
    }

    /// 列出资源（分页 + 过滤）
    ///
    /// Responses that lost the race against a newer `list` call on this store
    /// are reported as [`CoreError::Superseded`].
    pub async fn list(&self, query: ListQuery) -> CoreResult<ResourceList> {
        let (latest, result) = self.fetch_list(query).await;
        if !latest {
            return Err(CoreError::Superseded);
        }
        result.map_err(|e| self.handle_api_error("list", e))
    }

    /// Fetch a page for one caller.
    ///
    /// Unlike [`list`](Self::list) the response is always handed back: several
    /// controllers may share this store and each tracks its own requests. The
    /// shared cache is still only replaced by the latest request.
    pub async fn load_list(&self, query: ListQuery) -> CoreResult<ResourceList> {
        let (_, result) = self.fetch_list(query).await;
        result.map_err(|e| self.handle_api_error("list", e))
    }

    async fn fetch_list(&self, query: ListQuery) -> (bool, Result<ResourceList, ApiError>) {
        let query = query.validated(self.max_page_size);
        let token = self.list_slot.issue();
        log::debug!(
            "[{}] list page={} size={} filters={:?}",
            self.resource_name(),
            query.page,
            query.page_size,
            query.filters
        );

        let result = self.api.list(&query).await;

        let mut cache = self.cache.write().await;
        if !self.list_slot.is_current(token) {
            log::debug!("[{}] superseded list response not cached", self.resource_name());
            return (false, result.map(|page| ResourceList::from_page(page, query.filters)));
        }
        let list = match result {
            Ok(page) => ResourceList::from_page(page, query.filters),
            Err(e) => return (true, Err(e)),
        };
        cache.list = Some(list.clone());
        drop(cache);

        log::debug!(
            "[{}] list replaced: {} of {} items",
            self.resource_name(),
            list.len(),
            list.total_count
        );
        self.notify(StoreEvent::ListReplaced {
            total_count: list.total_count,
        });
        (true, Ok(list))
    }

    /// 获取资源详情
    pub async fn fetch_detail(&self, id: &str) -> CoreResult<Resource> {
        let (latest, result) = self.fetch_record(id).await;
        if !latest {
            return Err(CoreError::Superseded);
        }
        result.map_err(|e| self.handle_api_error("fetch_detail", e))
    }

    /// Detail counterpart of [`load_list`](Self::load_list).
    pub async fn load_detail(&self, id: &str) -> CoreResult<Resource> {
        let (_, result) = self.fetch_record(id).await;
        result.map_err(|e| self.handle_api_error("fetch_detail", e))
    }

    async fn fetch_record(&self, id: &str) -> (bool, Result<Resource, ApiError>) {
        let token = self.detail_slot.issue();
        log::debug!("[{}] fetch detail {id}", self.resource_name());

        let result = self.api.get(id).await;

        let mut cache = self.cache.write().await;
        if !self.detail_slot.is_current(token) {
            log::debug!("[{}] superseded detail {id} not cached", self.resource_name());
            return (false, result);
        }
        let detail = match result {
            Ok(detail) => detail,
            Err(e) => return (true, Err(e)),
        };
        cache.detail = Some(detail.clone());
        drop(cache);

        self.notify(StoreEvent::DetailReplaced {
            id: detail.id.clone(),
        });
        (true, Ok(detail))
    }

    /// 创建资源
    pub async fn create(&self, payload: &Value) -> CoreResult<Resource> {
        let created = self
            .api
            .create(payload)
            .await
            .map_err(|e| self.handle_api_error("create", e))?;
        log::info!("[{}] created {}", self.resource_name(), created.id);
        self.notify(StoreEvent::Mutated {
            op: MutationOp::Create,
            id: Some(created.id.clone()),
        });
        Ok(created)
    }

    /// 更新资源
    pub async fn edit(&self, id: &str, payload: &Value) -> CoreResult<Resource> {
        let updated = self
            .api
            .update(id, payload)
            .await
            .map_err(|e| self.handle_api_error("edit", e))?;
        log::info!("[{}] updated {id}", self.resource_name());
        self.notify(StoreEvent::Mutated {
            op: MutationOp::Edit,
            id: Some(id.to_string()),
        });
        Ok(updated)
    }

    /// 删除资源
    pub async fn delete(&self, id: &str) -> CoreResult<()> {
        self.api
            .delete(id)
            .await
            .map_err(|e| self.handle_api_error("delete", e))?;
        log::info!("[{}] deleted {id}", self.resource_name());
        self.notify(StoreEvent::Mutated {
            op: MutationOp::Delete,
            id: Some(id.to_string()),
        });
        Ok(())
    }

    /// 批量删除资源
    ///
    /// Per-id failures are collected in the result; `Mutated` is published when
    /// at least one deletion succeeded.
    pub async fn batch_delete(&self, ids: &[String]) -> CoreResult<BatchDeleteResult> {
        let result = self
            .api
            .batch_delete(ids)
            .await
            .map_err(|e| self.handle_api_error("batch_delete", e))?;

        for failure in &result.failures {
            log::warn!(
                "[{}] failed to delete {}: {}",
                self.resource_name(),
                failure.resource_id,
                failure.reason
            );
        }
        if result.success_count > 0 {
            self.notify(StoreEvent::Mutated {
                op: MutationOp::BatchDelete,
                id: None,
            });
        }
        Ok(result)
    }

    /// Subscribe to change notifications. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Publish an event to all current subscribers.
    pub fn notify(&self, event: StoreEvent) {
        // 没有订阅者时发送失败，忽略
        let _ = self.events.send(event);
    }

    /// Latest successfully fetched list page.
    pub async fn cached_list(&self) -> Option<ResourceList> {
        self.cache.read().await.list.clone()
    }

    /// Latest successfully fetched detail record.
    pub async fn cached_detail(&self) -> Option<Resource> {
        self.cache.read().await.detail.clone()
    }

    /// Drop cached state; in-flight requests will be discarded.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        self.list_slot.invalidate();
        self.detail_slot.invalidate();
        *cache = StoreCache::default();
    }

    fn handle_api_error(&self, op: &str, e: ApiError) -> CoreError {
        if e.is_expected() {
            log::warn!("[{}] {op} failed: {e}", self.resource_name());
        } else {
            log::error!("[{}] {op} failed: {e}", self.resource_name());
        }
        CoreError::Api(e)
    }
}
