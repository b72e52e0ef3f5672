//! Console configuration

use std::path::Path;

use console_api::{ApiConfig, ListQuery};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Default number of rows per list page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound for a single list request.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Top-level console settings, read from JSON.
///
/// ```json
/// {
///   "api": { "baseUrl": "https://cloud.example.com/identity", "authToken": "..." },
///   "defaultPageSize": 20,
///   "maxPageSize": 100,
///   "adminScope": false
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConsoleConfig {
    /// Remote service connection.
    pub api: ApiConfig,
    /// Page size of a freshly mounted list.
    pub default_page_size: u32,
    /// Requests asking for more rows are clamped to this.
    pub max_page_size: u32,
    /// Render pages in the administrator scope.
    pub admin_scope: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            admin_scope: false,
        }
    }
}

impl ConsoleConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CoreError::ConfigError(format!("Invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_json_str(&content)?;
        log::debug!(
            "Loaded console config from {} (admin_scope={})",
            path.display(),
            config.admin_scope
        );
        Ok(config)
    }

    /// Check the base URL and page-size bounds.
    pub fn validate(&self) -> CoreResult<()> {
        let url = url::Url::parse(&self.api.base_url).map_err(|e| {
            CoreError::ConfigError(format!("Invalid base URL '{}': {e}", self.api.base_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(CoreError::ConfigError(format!(
                "Unsupported URL scheme '{}'",
                url.scheme()
            )));
        }
        if self.max_page_size == 0 {
            return Err(CoreError::ConfigError(
                "maxPageSize must be at least 1".to_string(),
            ));
        }
        if self.default_page_size == 0 || self.default_page_size > self.max_page_size {
            return Err(CoreError::ConfigError(format!(
                "defaultPageSize must be within 1..={}",
                self.max_page_size
            )));
        }
        Ok(())
    }

    /// First page with the configured page size and no filters.
    #[must_use]
    pub fn default_query(&self) -> ListQuery {
        ListQuery {
            page_size: self.default_page_size,
            ..ListQuery::default()
        }
    }
}
