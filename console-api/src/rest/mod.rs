//! OpenStack-style REST collection client

mod api;
mod error;
mod http;

use std::time::Duration;

use reqwest::Client;

use crate::error::{ApiError, Result};
use crate::types::{ApiConfig, ResourceEndpoint};
use crate::utils::log_sanitizer::mask_secret;

/// Header carrying the Keystone token.
pub(crate) const AUTH_HEADER: &str = "X-Auth-Token";

/// A [`ResourceApi`](crate::ResourceApi) over one JSON collection of an
/// OpenStack-style service.
///
/// | Operation | Request |
/// |-----------|---------|
/// | list | `GET {base}{path}?page=&limit=&<filters>` → `{"<collection>": [...], "count": n}` |
/// | get | `GET {base}{path}/{id}` → `{"<member>": {...}}` |
/// | create | `POST {base}{path}` with `{"<member>": payload}` |
/// | update | `PATCH {base}{path}/{id}` with `{"<member>": payload}` |
/// | delete | `DELETE {base}{path}/{id}` |
pub struct RestResourceApi {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) auth_token: String,
    pub(crate) max_retries: u32,
    pub(crate) endpoint: ResourceEndpoint,
}

impl RestResourceApi {
    /// Build a client for `endpoint` below `config.base_url`.
    pub fn new(config: &ApiConfig, endpoint: ResourceEndpoint) -> Result<Self> {
        let invalid = |detail: String| ApiError::InvalidConfig {
            resource: endpoint.collection.clone(),
            detail,
        };

        let parsed = url::Url::parse(&config.base_url)
            .map_err(|e| invalid(format!("base_url '{}': {e}", config.base_url)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!(
                "base_url must be http(s), got '{}'",
                parsed.scheme()
            )));
        }

        let client = create_http_client(config).map_err(|e| invalid(e.to_string()))?;

        log::debug!(
            "[{}] REST client for {}{} (token {})",
            endpoint.collection,
            config.base_url,
            endpoint.path,
            mask_secret(&config.auth_token)
        );

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_token: config.auth_token.clone(),
            max_retries: config.max_retries,
            endpoint,
        })
    }

    pub(crate) fn collection_url(&self) -> String {
        format!("{}{}", self.base_url, self.endpoint.path)
    }

    pub(crate) fn item_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url(), urlencoding::encode(id))
    }
}

/// 创建带超时配置的 HTTP Client
fn create_http_client(config: &ApiConfig) -> reqwest::Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
}
