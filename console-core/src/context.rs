//! 依赖注入上下文

use std::sync::Arc;

use console_api::{ListQuery, ResourceApi, ResourceEndpoint, create_resource_api};

use crate::config::ConsoleConfig;
use crate::error::CoreResult;
use crate::store::ResourceStore;
use crate::traits::{PermissionOracle, Router};

/// 控制台上下文 - 持有所有页面共享的依赖
///
/// 宿主层创建此上下文，并注入权限与路由实现。
pub struct ConsoleContext {
    /// 权限判定
    pub permissions: Arc<dyn PermissionOracle>,
    /// 路由表
    pub router: Arc<dyn Router>,
    /// 配置
    pub config: ConsoleConfig,
}

impl ConsoleContext {
    /// 使用默认配置创建上下文
    #[must_use]
    pub fn new(permissions: Arc<dyn PermissionOracle>, router: Arc<dyn Router>) -> Self {
        Self::with_config(permissions, router, ConsoleConfig::default())
    }

    #[must_use]
    pub fn with_config(
        permissions: Arc<dyn PermissionOracle>,
        router: Arc<dyn Router>,
        config: ConsoleConfig,
    ) -> Self {
        Self {
            permissions,
            router,
            config,
        }
    }

    /// Build a store over an existing API, clamped to the configured page size.
    pub fn store(&self, api: Arc<dyn ResourceApi>) -> Arc<ResourceStore> {
        Arc::new(ResourceStore::new(api).with_max_page_size(self.config.max_page_size))
    }

    /// Build a store for a REST collection of the configured service.
    pub fn rest_store(&self, endpoint: ResourceEndpoint) -> CoreResult<Arc<ResourceStore>> {
        let api = create_resource_api(&self.config.api, endpoint)?;
        Ok(self.store(api))
    }

    /// 页面上下文
    pub fn page(&self, store: Arc<ResourceStore>, admin_page: bool) -> PageContext {
        PageContext {
            store,
            permissions: Arc::clone(&self.permissions),
            router: Arc::clone(&self.router),
            admin_page,
            default_query: self.config.default_query(),
        }
    }

    /// 页面上下文，作用域取自配置
    pub fn default_page(&self, store: Arc<ResourceStore>) -> PageContext {
        self.page(store, self.config.admin_scope)
    }
}

/// Everything a single page (list, detail or modal) needs.
#[derive(Clone)]
pub struct PageContext {
    pub store: Arc<ResourceStore>,
    pub permissions: Arc<dyn PermissionOracle>,
    pub router: Arc<dyn Router>,
    /// Rendered under the administrator route tree.
    pub admin_page: bool,
    /// Query a freshly mounted list starts from.
    pub default_query: ListQuery,
}

impl PageContext {
    /// Same page dependencies over another store.
    #[must_use]
    pub fn with_store(&self, store: Arc<ResourceStore>) -> Self {
        Self {
            store,
            ..self.clone()
        }
    }

    /// Resolve a route key in this page's scope.
    pub fn route_path(&self, key: &str, params: &[(&str, &str)]) -> CoreResult<String> {
        let name = self.router.route_name(key, self.admin_page);
        self.router.route_path(&name, params)
    }

    /// Like [`route_path`](Self::route_path) with a query string.
    pub fn route_url(
        &self,
        key: &str,
        params: &[(&str, &str)],
        query: &[(&str, &str)],
    ) -> CoreResult<String> {
        let name = self.router.route_name(key, self.admin_page);
        self.router.route_url(&name, params, query)
    }
}
