//! Route resolution abstract Trait

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult};

/// Suffix appended to a route key for its administrator variant.
pub const ADMIN_ROUTE_SUFFIX: &str = "Admin";

/// Path prefix of administrator pages.
pub const ADMIN_PATH_PREFIX: &str = "/admin";

/// Router Trait
///
/// Maps route names to URL paths. Administrator pages live under a parallel
/// route tree: `projectDetail` becomes `projectDetailAdmin`, `/identity/...`
/// becomes `/admin/identity/...`.
pub trait Router: Send + Sync {
    /// Route name for the given scope.
    fn route_name(&self, key: &str, admin: bool) -> String {
        if admin {
            format!("{key}{ADMIN_ROUTE_SUFFIX}")
        } else {
            key.to_string()
        }
    }

    /// Path for the given scope.
    fn url(&self, path: &str, admin: bool) -> String {
        if !admin || path.starts_with(ADMIN_PATH_PREFIX) {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{ADMIN_PATH_PREFIX}{path}")
        } else {
            format!("{ADMIN_PATH_PREFIX}/{path}")
        }
    }

    /// Resolve a route name and fill its `:param` segments.
    ///
    /// # Errors
    /// `RouteError` when the name is unknown or a parameter is missing.
    fn route_path(&self, name: &str, params: &[(&str, &str)]) -> CoreResult<String>;

    /// [`route_path`](Self::route_path) followed by a query string, e.g. the
    /// certificate list opened on its `?tab=SERVER` tab.
    fn route_url(
        &self,
        name: &str,
        params: &[(&str, &str)],
        query: &[(&str, &str)],
    ) -> CoreResult<String> {
        let path = self.route_path(name, params)?;
        if query.is_empty() {
            return Ok(path);
        }
        let query = query
            .iter()
            .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");
        Ok(format!("{path}?{query}"))
    }
}

/// In-memory routing table
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, String>,
}

impl RouteTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a single route, builder style.
    #[must_use]
    pub fn with_route(mut self, name: impl Into<String>, template: impl Into<String>) -> Self {
        self.insert(name, template);
        self
    }

    /// Register a route together with its administrator variant.
    #[must_use]
    pub fn with_scoped_route(mut self, key: &str, template: &str) -> Self {
        let admin_name = self.route_name(key, true);
        let admin_template = self.url(template, true);
        self.insert(key, template);
        self.insert(admin_name, admin_template);
        self
    }

    /// Register a single route.
    pub fn insert(&mut self, name: impl Into<String>, template: impl Into<String>) {
        self.routes.insert(name.into(), template.into());
    }

    /// Whether the name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }
}

impl Router for RouteTable {
    fn route_path(&self, name: &str, params: &[(&str, &str)]) -> CoreResult<String> {
        let template = self
            .routes
            .get(name)
            .ok_or_else(|| CoreError::RouteError(format!("Unknown route '{name}'")))?;

        let segments = template
            .split('/')
            .map(|segment| match segment.strip_prefix(':') {
                Some(param) => params
                    .iter()
                    .find(|(key, _)| *key == param)
                    .map(|(_, value)| urlencoding::encode(value).into_owned())
                    .ok_or_else(|| {
                        CoreError::RouteError(format!(
                            "Route '{name}' is missing parameter '{param}'"
                        ))
                    }),
                None => Ok(segment.to_string()),
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(segments.join("/"))
    }
}
