//! REST error mapping
//!
//! OpenStack services disagree on error bodies:
//! - Keystone: `{"error": {"code": 404, "title": "Not Found", "message": "..."}}`
//! - Nova/Trove: `{"itemNotFound": {"code": 404, "message": "..."}}`
//! - Neutron: `{"NeutronError": {"type": "...", "message": "...", "detail": ""}}`
//! - Octavia: `{"faultcode": "Client", "faultstring": "...", "debuginfo": null}`

use serde_json::Value;

use crate::error::ApiError;
use crate::traits::{ApiErrorMapper, ErrorContext, RawApiError};
use crate::utils::log_sanitizer::truncate_for_log;

use super::RestResourceApi;

impl ApiErrorMapper for RestResourceApi {
    fn resource_name(&self) -> &str {
        &self.endpoint.collection
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ApiError {
        let resource = self.resource_name().to_string();
        match raw.status {
            400 | 422 => ApiError::ValidationFailed {
                resource,
                detail: raw.message,
            },
            401 => ApiError::Unauthorized {
                resource,
                raw_message: Some(raw.message),
            },
            403 => ApiError::Forbidden {
                resource,
                raw_message: Some(raw.message),
            },
            404 => ApiError::NotFound {
                resource,
                resource_id: context
                    .resource_id
                    .unwrap_or_else(|| "<unknown>".to_string()),
                raw_message: Some(raw.message),
            },
            409 => ApiError::Conflict {
                resource,
                raw_message: Some(raw.message),
            },
            500..=599 => ApiError::ServerError {
                resource,
                status: raw.status,
                raw_message: Some(raw.message),
            },
            _ => self.unknown_error(raw),
        }
    }
}

/// Pull `(code, message)` out of an error body, falling back to the raw text.
pub(crate) fn extract_error(status: u16, body: &str) -> RawApiError {
    let fallback = || RawApiError::new(status, truncate_for_log(body.trim()));

    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) else {
        return fallback();
    };

    if let Some(message) = map.get("faultstring").and_then(Value::as_str) {
        return match map.get("faultcode").and_then(Value::as_str) {
            Some(code) => RawApiError::with_code(status, code, message),
            None => RawApiError::new(status, message),
        };
    }

    if let Some(message) = map.get("message").and_then(Value::as_str) {
        return RawApiError::new(status, message);
    }

    for (key, inner) in &map {
        let Some(inner) = inner.as_object() else {
            continue;
        };
        let Some(message) = inner.get("message").and_then(Value::as_str) else {
            continue;
        };
        let code = inner
            .get("type")
            .or_else(|| inner.get("title"))
            .and_then(Value::as_str)
            .unwrap_or(key);
        return RawApiError::with_code(status, code, message);
    }

    fallback()
}
