//! REST 请求方法与信封解析

use reqwest::{Method, RequestBuilder};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::traits::{ApiErrorMapper, ErrorContext};
use crate::transport::Transport;
use crate::types::{PaginatedResponse, Resource};

use super::error::extract_error;
use super::{AUTH_HEADER, RestResourceApi};

impl RestResourceApi {
    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header("Accept", "application/json");
        if self.auth_token.is_empty() {
            builder
        } else {
            builder.header(AUTH_HEADER, &self.auth_token)
        }
    }

    /// Send, map non-2xx statuses, return the body text.
    async fn send(
        &self,
        builder: RequestBuilder,
        method: Method,
        url: &str,
        context: ErrorContext,
    ) -> Result<String> {
        let response = Transport::send_with_retry(
            self.authorized(builder),
            self.resource_name(),
            &method,
            url,
            self.max_retries,
        )
        .await?;

        if response.is_success() {
            return Ok(response.body);
        }

        let tag = response.request_tag();
        let raw = extract_error(response.status, &response.body);
        let err = self.map_error(raw, context);
        if err.is_expected() {
            log::warn!("{method} {url} rejected{tag}: {err}");
        } else {
            log::error!("{method} {url} failed{tag}: {err}");
        }
        Err(err)
    }

    pub(crate) async fn get_page(
        &self,
        query: &[(String, String)],
        page: u32,
        page_size: u32,
    ) -> Result<PaginatedResponse<Resource>> {
        let url = self.collection_url();
        let builder = self.client.get(&url).query(query);
        let body = self.send(builder, Method::GET, &url, ErrorContext::default()).await?;
        let value: Value = Transport::parse_json(&body, self.resource_name())?;
        self.unwrap_page(value, page, page_size)
    }

    pub(crate) async fn get_member(&self, id: &str) -> Result<Resource> {
        let url = self.item_url(id);
        let builder = self.client.get(&url);
        let body = self.send(builder, Method::GET, &url, ErrorContext::for_id(id)).await?;
        let value: Value = Transport::parse_json(&body, self.resource_name())?;
        self.unwrap_member(value)
    }

    pub(crate) async fn post_member(&self, payload: &Value) -> Result<Resource> {
        let url = self.collection_url();
        let builder = self.client.post(&url).json(&self.wrap_member(payload));
        let body = self.send(builder, Method::POST, &url, ErrorContext::default()).await?;
        let value: Value = Transport::parse_json(&body, self.resource_name())?;
        self.unwrap_member(value)
    }

    pub(crate) async fn patch_member(&self, id: &str, payload: &Value) -> Result<Resource> {
        let url = self.item_url(id);
        let builder = self.client.patch(&url).json(&self.wrap_member(payload));
        let body = self.send(builder, Method::PATCH, &url, ErrorContext::for_id(id)).await?;
        if body.trim().is_empty() {
            // some services answer 202/204 without a body; read it back
            return self.get_member(id).await;
        }
        let value: Value = Transport::parse_json(&body, self.resource_name())?;
        self.unwrap_member(value)
    }

    pub(crate) async fn delete_member(&self, id: &str) -> Result<()> {
        let url = self.item_url(id);
        let builder = self.client.delete(&url);
        self.send(builder, Method::DELETE, &url, ErrorContext::for_id(id))
            .await
            .map(|_| ())
    }

    fn wrap_member(&self, payload: &Value) -> Value {
        let mut envelope = Map::new();
        envelope.insert(self.endpoint.member.clone(), payload.clone());
        Value::Object(envelope)
    }

    /// `{"<member>": {...}}`, or a bare object carrying an `id`.
    pub(crate) fn unwrap_member(&self, value: Value) -> Result<Resource> {
        let inner = match value {
            Value::Object(mut map) => match map.remove(&self.endpoint.member) {
                Some(inner) => inner,
                None => Value::Object(map),
            },
            other => other,
        };
        Resource::from_value(inner).ok_or_else(|| {
            self.parse_error(format!(
                "response has no '{}' object with an id",
                self.endpoint.member
            ))
        })
    }

    /// `{"<collection>": [...], "count": n}` or a bare array.
    ///
    /// Without a count the total is derived from the page position, plus one
    /// when the service advertises a `next` link.
    pub(crate) fn unwrap_page(
        &self,
        value: Value,
        page: u32,
        page_size: u32,
    ) -> Result<PaginatedResponse<Resource>> {
        let (items, count, has_next) = match value {
            Value::Array(items) => (items, None, false),
            Value::Object(mut map) => {
                let Some(Value::Array(items)) = map.remove(&self.endpoint.collection) else {
                    return Err(self.parse_error(format!(
                        "response has no '{}' array",
                        self.endpoint.collection
                    )));
                };
                let count = map
                    .get("count")
                    .or_else(|| map.get("total_count"))
                    .and_then(Value::as_u64);
                let has_next = has_next_link(&map, &self.endpoint.collection);
                (items, count, has_next)
            }
            _ => return Err(self.parse_error("list response is neither object nor array")),
        };

        let mut resources = Vec::with_capacity(items.len());
        for item in items {
            let resource = Resource::from_value(item)
                .ok_or_else(|| self.parse_error("list item without an id"))?;
            resources.push(resource);
        }

        let total = match count {
            Some(n) => u32::try_from(n).unwrap_or(u32::MAX),
            None => {
                let seen = page.saturating_sub(1).saturating_mul(page_size);
                let len = u32::try_from(resources.len()).unwrap_or(u32::MAX);
                seen.saturating_add(len).saturating_add(u32::from(has_next))
            }
        };

        Ok(PaginatedResponse::new(resources, page, page_size, total))
    }
}

/// Keystone: `"links": {"next": "..."}`; Nova/Neutron: `"<collection>_links": [{"rel": "next"}]`.
fn has_next_link(map: &Map<String, Value>, collection: &str) -> bool {
    let keystone = map
        .get("links")
        .and_then(|l| l.get("next"))
        .is_some_and(|n| !n.is_null());
    let rel_links = map
        .get(&format!("{collection}_links"))
        .and_then(Value::as_array)
        .is_some_and(|links| {
            links
                .iter()
                .any(|l| l.get("rel").and_then(Value::as_str) == Some("next"))
        });
    keystone || rel_links
}
