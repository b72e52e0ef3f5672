//! Permission oracle abstract Trait

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Permission Oracle Trait
///
/// Answers whether the current viewer holds a policy such as
/// `identity:update_project`. Provides a default memory implementation of
/// `StaticPermissions`.
#[async_trait]
pub trait PermissionOracle: Send + Sync {
    /// Whether the policy is granted
    ///
    /// # Arguments
    /// * `policy` - Policy name
    async fn is_allowed(&self, policy: &str) -> bool;
}

/// In-memory permission set
///
/// An empty policy string is always allowed.
#[derive(Clone, Default)]
pub struct StaticPermissions {
    granted: Arc<RwLock<HashSet<String>>>,
    allow_all: bool,
}

impl StaticPermissions {
    /// Create an empty permission set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Permission set that grants every policy (administrator view)
    #[must_use]
    pub fn allow_all() -> Self {
        Self {
            granted: Arc::default(),
            allow_all: true,
        }
    }

    /// Create a permission set from policy names
    #[must_use]
    pub fn with_policies<I, S>(policies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            granted: Arc::new(RwLock::new(policies.into_iter().map(Into::into).collect())),
            allow_all: false,
        }
    }

    /// Grant a policy
    pub async fn grant(&self, policy: impl Into<String>) {
        self.granted.write().await.insert(policy.into());
    }

    /// Revoke a policy
    pub async fn revoke(&self, policy: &str) {
        self.granted.write().await.remove(policy);
    }
}

#[async_trait]
impl PermissionOracle for StaticPermissions {
    async fn is_allowed(&self, policy: &str) -> bool {
        self.allow_all || policy.is_empty() || self.granted.read().await.contains(policy)
    }
}
