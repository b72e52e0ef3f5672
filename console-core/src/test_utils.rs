//! 测试辅助模块
//!
//! 提供 mock 实现和便捷的测试工厂方法。

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use console_api::{ApiError, ListQuery, PaginatedResponse, Resource, ResourceApi};
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::context::{ConsoleContext, PageContext};
use crate::store::ResourceStore;
use crate::traits::{RouteTable, StaticPermissions};

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    List,
    Get,
    Create,
    Update,
    Delete,
}

struct ScriptedList {
    delay: Duration,
    response: ApiResult<Vec<Resource>>,
}

// ===== MockResourceApi =====

pub struct MockResourceApi {
    name: String,
    records: RwLock<Vec<Resource>>,
    /// 按顺序消费的 list 响应；为空时按 records 过滤
    scripted_lists: RwLock<VecDeque<ScriptedList>>,
    /// 下一次调用返回的错误
    failures: RwLock<HashMap<MockOp, VecDeque<ApiError>>>,
    delays: RwLock<HashMap<MockOp, Duration>>,
    calls: RwLock<HashMap<MockOp, usize>>,
    last_query: RwLock<Option<ListQuery>>,
    last_payload: RwLock<Option<Value>>,
}

impl MockResourceApi {
    pub fn new(name: &str) -> Self {
        Self::with_records(name, Vec::new())
    }

    pub fn with_records(name: &str, records: Vec<Resource>) -> Self {
        Self {
            name: name.to_string(),
            records: RwLock::new(records),
            scripted_lists: RwLock::new(VecDeque::new()),
            failures: RwLock::new(HashMap::new()),
            delays: RwLock::new(HashMap::new()),
            calls: RwLock::new(HashMap::new()),
            last_query: RwLock::new(None),
            last_payload: RwLock::new(None),
        }
    }

    pub async fn script_list(&self, delay: Duration, response: ApiResult<Vec<Resource>>) {
        self.scripted_lists
            .write()
            .await
            .push_back(ScriptedList { delay, response });
    }

    pub async fn fail_next(&self, op: MockOp, err: ApiError) {
        self.failures
            .write()
            .await
            .entry(op)
            .or_default()
            .push_back(err);
    }

    pub async fn set_delay(&self, op: MockOp, delay: Duration) {
        self.delays.write().await.insert(op, delay);
    }

    pub async fn calls(&self, op: MockOp) -> usize {
        self.calls.read().await.get(&op).copied().unwrap_or(0)
    }

    pub async fn last_query(&self) -> Option<ListQuery> {
        self.last_query.read().await.clone()
    }

    pub async fn last_payload(&self) -> Option<Value> {
        self.last_payload.read().await.clone()
    }

    pub async fn records(&self) -> Vec<Resource> {
        self.records.read().await.clone()
    }

    pub fn transport_error(name: &str) -> ApiError {
        ApiError::NetworkError {
            resource: name.to_string(),
            detail: "connection refused".to_string(),
        }
    }

    pub fn conflict_error(name: &str) -> ApiError {
        ApiError::Conflict {
            resource: name.to_string(),
            raw_message: Some("Conflicting resource already exists.".to_string()),
        }
    }

    fn not_found(&self, id: &str) -> ApiError {
        ApiError::NotFound {
            resource: self.name.clone(),
            resource_id: id.to_string(),
            raw_message: None,
        }
    }

    /// 记录调用、应用延迟、弹出预设错误
    async fn enter(&self, op: MockOp) -> ApiResult<()> {
        *self.calls.write().await.entry(op).or_insert(0) += 1;
        let delay = self.delays.read().await.get(&op).copied();
        let failure = self
            .failures
            .write()
            .await
            .get_mut(&op)
            .and_then(VecDeque::pop_front);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        failure.map_or(Ok(()), Err)
    }
}

fn matches_filters(record: &Resource, query: &ListQuery) -> bool {
    query.filters.iter().all(|(key, expected)| {
        record
            .get_str(key)
            .is_some_and(|actual| actual == expected)
    })
}

#[async_trait]
impl ResourceApi for MockResourceApi {
    fn resource_name(&self) -> &str {
        &self.name
    }

    async fn list(&self, query: &ListQuery) -> ApiResult<PaginatedResponse<Resource>> {
        *self.last_query.write().await = Some(query.clone());
        let scripted = self.scripted_lists.write().await.pop_front();
        self.enter(MockOp::List).await?;

        let items = match scripted {
            Some(ScriptedList { delay, response }) => {
                tokio::time::sleep(delay).await;
                response?
            }
            None => self
                .records
                .read()
                .await
                .iter()
                .filter(|r| matches_filters(r, query))
                .cloned()
                .collect(),
        };
        let total = u32::try_from(items.len()).unwrap_or(u32::MAX);
        Ok(PaginatedResponse::new(items, query.page, query.page_size, total))
    }

    async fn get(&self, id: &str) -> ApiResult<Resource> {
        self.enter(MockOp::Get).await?;
        self.records
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| self.not_found(id))
    }

    async fn create(&self, payload: &Value) -> ApiResult<Resource> {
        *self.last_payload.write().await = Some(payload.clone());
        self.enter(MockOp::Create).await?;
        let resource = Resource::new(uuid::Uuid::new_v4().to_string(), payload.clone());
        self.records.write().await.push(resource.clone());
        Ok(resource)
    }

    async fn update(&self, id: &str, payload: &Value) -> ApiResult<Resource> {
        *self.last_payload.write().await = Some(payload.clone());
        self.enter(MockOp::Update).await?;
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| self.not_found(id))?;
        if let Value::Object(changes) = payload {
            for (key, value) in changes {
                if key != "id" {
                    record.attributes.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(record.clone())
    }

    async fn delete(&self, id: &str) -> ApiResult<()> {
        self.enter(MockOp::Delete).await?;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            return Err(self.not_found(id));
        }
        Ok(())
    }
}

// ===== 工厂方法 =====

/// 创建一个项目资源
pub fn project(id: &str, name: &str) -> Resource {
    Resource::new(
        id,
        json!({ "name": name, "enabled": true, "description": "" }),
    )
}

/// 创建测试用 `PageContext`
pub fn create_page_context(
    api: Arc<MockResourceApi>,
    permissions: StaticPermissions,
    admin: bool,
) -> PageContext {
    let router = RouteTable::new()
        .with_scoped_route("project", "/identity/project")
        .with_scoped_route("projectDetail", "/identity/project-detail/:id");
    let console = ConsoleContext::new(Arc::new(permissions), Arc::new(router));
    console.page(Arc::new(ResourceStore::new(api)), admin)
}
