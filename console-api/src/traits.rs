use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ApiError, Result};
use crate::types::{BatchDeleteFailure, BatchDeleteResult, ListQuery, PaginatedResponse, Resource};

/// 原始 API 错误（内部使用）
#[derive(Debug, Clone)]
pub(crate) struct RawApiError {
    /// HTTP 状态码
    pub status: u16,
    /// 服务端错误码（如有）
    pub code: Option<String>,
    /// 原始错误消息
    pub message: String,
}

impl RawApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// 错误上下文信息（内部使用）
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorContext {
    /// 资源 ID（用于 `NotFound`）
    pub resource_id: Option<String>,
}

impl ErrorContext {
    pub fn for_id(id: &str) -> Self {
        Self {
            resource_id: Some(id.to_string()),
        }
    }
}

/// Maps raw HTTP failures onto [`ApiError`] (internal).
pub(crate) trait ApiErrorMapper {
    /// Collection name used in every produced error.
    fn resource_name(&self) -> &str;

    /// Map a raw API error to the unified error type.
    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ApiError;

    fn parse_error(&self, detail: impl ToString) -> ApiError {
        ApiError::ParseError {
            resource: self.resource_name().to_string(),
            detail: detail.to_string(),
        }
    }

    fn unknown_error(&self, raw: RawApiError) -> ApiError {
        ApiError::Unknown {
            resource: self.resource_name().to_string(),
            status: Some(raw.status),
            raw_message: raw.message,
        }
    }
}

/// Remote collection of [`Resource`]s.
///
/// One instance addresses one collection (projects, listeners, ...). All
/// operations are single network round trips; nothing is cached here.
#[async_trait]
pub trait ResourceApi: Send + Sync {
    /// Collection name, used for logging and error context.
    fn resource_name(&self) -> &str;

    /// List one page of the collection.
    async fn list(&self, query: &ListQuery) -> Result<PaginatedResponse<Resource>>;

    /// Fetch a single record.
    async fn get(&self, id: &str) -> Result<Resource>;

    /// Create a record from a JSON payload.
    async fn create(&self, payload: &Value) -> Result<Resource>;

    /// Update a record with a (partial) JSON payload.
    async fn update(&self, id: &str, payload: &Value) -> Result<Resource>;

    /// Delete a record.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete many records.
    ///
    /// 默认实现并发调用 `delete()`，逐条收集成功/失败结果。
    async fn batch_delete(&self, ids: &[String]) -> Result<BatchDeleteResult> {
        let futures: Vec<_> = ids.iter().map(|id| self.delete(id)).collect();
        let results = futures::future::join_all(futures).await;

        let mut success_count = 0;
        let mut failures = Vec::new();

        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(()) => success_count += 1,
                Err(e) => failures.push(BatchDeleteFailure {
                    resource_id: id.clone(),
                    reason: e.to_string(),
                }),
            }
        }

        Ok(BatchDeleteResult {
            success_count,
            failed_count: failures.len(),
            failures,
        })
    }
}
