//! 共享测试工具和辅助函数

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use console_api::{ApiError, ListQuery, PaginatedResponse, Resource, ResourceApi};
use console_core::{ConsoleContext, PageContext, RouteTable, StaticPermissions};
use serde_json::Value;
use tokio::sync::RwLock;

/// Assert a `Result` is `Ok` and unwrap it (fails the test otherwise).
#[macro_export]
macro_rules! require_ok {
    ($expr:expr $(,)?) => {{
        let res = $expr;
        assert!(res.is_ok(), "expected Ok(..), got Err({:?})", res.as_ref().err());
        let Ok(val) = res else {
            return;
        };
        val
    }};
}

/// In-memory collection with per-operation call counters.
pub struct MemoryApi {
    name: String,
    records: RwLock<Vec<Resource>>,
    gets: AtomicUsize,
    lists: AtomicUsize,
    updates: AtomicUsize,
}

impl MemoryApi {
    pub fn new(name: &str, records: Vec<Resource>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            records: RwLock::new(records),
            gets: AtomicUsize::new(0),
            lists: AtomicUsize::new(0),
            updates: AtomicUsize::new(0),
        })
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn lists(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub async fn record(&self, id: &str) -> Option<Resource> {
        self.records.read().await.iter().find(|r| r.id == id).cloned()
    }

    fn not_found(&self, id: &str) -> ApiError {
        ApiError::NotFound {
            resource: self.name.clone(),
            resource_id: id.to_string(),
            raw_message: None,
        }
    }
}

#[async_trait]
impl ResourceApi for MemoryApi {
    fn resource_name(&self) -> &str {
        &self.name
    }

    async fn list(&self, query: &ListQuery) -> console_api::Result<PaginatedResponse<Resource>> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        let matching: Vec<Resource> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| {
                query
                    .filters
                    .iter()
                    .all(|(k, v)| r.get_str(k).is_some_and(|actual| actual.contains(v.as_str())))
            })
            .cloned()
            .collect();
        let total = u32::try_from(matching.len()).unwrap_or(u32::MAX);
        let start = ((query.page - 1) * query.page_size) as usize;
        let items = matching
            .into_iter()
            .skip(start)
            .take(query.page_size as usize)
            .collect();
        Ok(PaginatedResponse::new(items, query.page, query.page_size, total))
    }

    async fn get(&self, id: &str) -> console_api::Result<Resource> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.record(id).await.ok_or_else(|| self.not_found(id))
    }

    async fn create(&self, payload: &Value) -> console_api::Result<Resource> {
        let resource = Resource::new(uuid::Uuid::new_v4().to_string(), payload.clone());
        self.records.write().await.push(resource.clone());
        Ok(resource)
    }

    async fn update(&self, id: &str, payload: &Value) -> console_api::Result<Resource> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| self.not_found(id))?;
        if let Value::Object(changes) = payload {
            for (key, value) in changes {
                record.attributes.insert(key.clone(), value.clone());
            }
        }
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> console_api::Result<()> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(self.not_found(id));
        }
        Ok(())
    }
}

/// Route table shared by the page tests.
pub fn routes() -> RouteTable {
    RouteTable::new()
        .with_scoped_route("project", "/identity/project")
        .with_scoped_route("projectDetail", "/identity/project-detail/:id")
        .with_scoped_route("database", "/database/instances")
        .with_scoped_route("databaseDetail", "/database/instances/detail/:id")
        .with_scoped_route("lbListener", "/network/load-balancers/:lbId/listener")
        .with_scoped_route("certificate", "/network/certificate-container/:id")
        .with_scoped_route("certificateList", "/network/certificate")
}

pub fn console(permissions: StaticPermissions) -> ConsoleContext {
    ConsoleContext::new(Arc::new(permissions), Arc::new(routes()))
}

pub fn page(api: Arc<MemoryApi>, permissions: StaticPermissions, admin: bool) -> PageContext {
    let console = console(permissions);
    let store = console.store(api);
    console.page(store, admin)
}
