//! HTTP transport of the REST client
//!
//! [`RestResourceApi`](crate::RestResourceApi) prepares the request (URL,
//! token, envelope); [`Transport`] sends it, classifies transport failures,
//! tags the exchange with the OpenStack request id and retries where that
//! cannot duplicate a mutation.

use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::utils::log_sanitizer::truncate_for_log;

/// Request id headers, in lookup order. Nova still answers with the legacy
/// compute header on some deployments.
const REQUEST_ID_HEADERS: [&str; 2] = ["x-openstack-request-id", "x-compute-request-id"];

/// Upper bound for a server supplied `Retry-After`.
const MAX_RETRY_AFTER_SECS: u64 = 30;

/// Status and body of a completed exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
    /// `X-Openstack-Request-Id` of the exchange, for correlating with service logs.
    pub request_id: Option<String>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// ` (req-...)` suffix for log lines, empty without an id.
    pub fn request_tag(&self) -> String {
        request_tag(self.request_id.as_deref())
    }
}

pub struct Transport;

impl Transport {
    /// Send one request.
    ///
    /// HTTP 429 becomes [`ApiError::RateLimited`] and 502–504 become
    /// [`ApiError::NetworkError`]; every other status is handed back for the
    /// collection's own error mapping.
    pub async fn send(
        request: RequestBuilder,
        resource: &str,
        method: &Method,
        url: &str,
    ) -> Result<RawResponse, ApiError> {
        log::debug!("[{resource}] {method} {url}");

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout {
                    resource: resource.to_string(),
                    detail: e.to_string(),
                }
            } else {
                ApiError::NetworkError {
                    resource: resource.to_string(),
                    detail: e.to_string(),
                }
            }
        })?;

        let status = response.status().as_u16();
        // 读取 body 会消费 response，先取 header
        let request_id = request_id(response.headers());
        let retry_after = retry_after(response.headers());
        let tag = request_tag(request_id.as_deref());
        log::debug!("[{resource}] {method} {url} -> {status}{tag}");

        if status == 429 {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{resource}] rate limited{tag}, retry_after={retry_after:?}");
            return Err(ApiError::RateLimited {
                resource: resource.to_string(),
                retry_after,
                raw_message: Some(truncate_for_log(&body)),
            });
        }

        if matches!(status, 502..=504) {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[{resource}] gateway error HTTP {status}{tag}");
            return Err(ApiError::NetworkError {
                resource: resource.to_string(),
                detail: format!("HTTP {status}: {}", truncate_for_log(&body)),
            });
        }

        let body = response.text().await.map_err(|e| ApiError::NetworkError {
            resource: resource.to_string(),
            detail: format!("Failed to read response body: {e}"),
        })?;
        log::debug!("[{resource}] body: {}", truncate_for_log(&body));

        Ok(RawResponse {
            status,
            body,
            request_id,
        })
    }

    /// [`send`](Self::send) with up to `max_retries` retries.
    ///
    /// Idempotent methods retry every transport-class error. `POST` and
    /// `PATCH` only retry a 429, which the service rejected before acting.
    /// A `Retry-After` hint (capped at 30s) wins over the 100ms…10s backoff.
    pub async fn send_with_retry(
        request: RequestBuilder,
        resource: &str,
        method: &Method,
        url: &str,
        max_retries: u32,
    ) -> Result<RawResponse, ApiError> {
        let mut attempt = 0;
        loop {
            let Some(req) = request.try_clone() else {
                log::debug!("[{resource}] streaming body, sending once");
                return Self::send(request, resource, method, url).await;
            };
            match Self::send(req, resource, method, url).await {
                Err(e) if attempt < max_retries && should_retry(method, &e) => {
                    let delay = retry_delay(&e, attempt);
                    attempt += 1;
                    log::warn!(
                        "[{resource}] {method} {url} failed (attempt {attempt}/{max_retries}), retrying in {:.1}s: {e}",
                        delay.as_secs_f32()
                    );
                    tokio::time::sleep(delay).await;
                }
                other => return other,
            }
        }
    }

    /// Parse a JSON body into `T`.
    pub fn parse_json<T>(body: &str, resource: &str) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_str(body).map_err(|e| {
            log::error!("[{resource}] JSON parse failed: {e}");
            log::error!("[{resource}] Raw response: {}", truncate_for_log(body));
            ApiError::ParseError {
                resource: resource.to_string(),
                detail: e.to_string(),
            }
        })
    }
}

fn request_id(headers: &HeaderMap) -> Option<String> {
    REQUEST_ID_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn request_tag(request_id: Option<&str>) -> String {
    request_id.map(|id| format!(" ({id})")).unwrap_or_default()
}

fn retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// A timed-out create may already exist on the server; only a 429 is safe to
/// resend for every method.
fn should_retry(method: &Method, error: &ApiError) -> bool {
    match error {
        ApiError::RateLimited { .. } => true,
        _ => method.is_idempotent() && error.is_retryable(),
    }
}

fn retry_delay(error: &ApiError, attempt: u32) -> Duration {
    match error {
        ApiError::RateLimited {
            retry_after: Some(secs),
            ..
        } => Duration::from_secs((*secs).min(MAX_RETRY_AFTER_SECS)),
        _ => backoff_delay(attempt),
    }
}

/// 100ms, 200ms, 400ms, ... capped at 10s
fn backoff_delay(attempt: u32) -> Duration {
    let delay_ms = 100_u64.saturating_mul(1_u64 << attempt.min(20));
    Duration::from_millis(delay_ms.min(10_000))
}
