//! Modal form actions
//!
//! An action is registered once per page and instantiated per invocation as
//! a [`ModalSession`] bound to an optional target item.

mod session;

pub use session::{ModalOutcome, ModalSession, ModalState, ModalView};

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use console_api::Resource;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::context::PageContext;
use crate::error::{CoreError, CoreResult};
use crate::form::FieldSpec;

/// Modal Action Trait
///
/// Describes one modal form: its policy, availability, fields, defaults and
/// submit handler.
#[async_trait]
pub trait ModalAction: Send + Sync {
    /// Unique within one action group of a page.
    fn id(&self) -> &str;

    fn title(&self) -> &str;

    /// Policy the viewer must hold.
    fn policy(&self) -> &str;

    /// Whether the action is available for the target.
    async fn allowed(&self, _ctx: &PageContext, _item: Option<&Resource>) -> bool {
        true
    }

    /// Initial form values.
    fn default_value(&self, _item: Option<&Resource>) -> Map<String, Value> {
        Map::new()
    }

    /// Form items.
    fn form_items(&self, ctx: &PageContext, item: Option<&Resource>) -> CoreResult<Vec<FieldSpec>>;

    /// Perform the mutation with validated values.
    async fn on_submit(
        &self,
        ctx: &PageContext,
        item: Option<&Resource>,
        values: &Map<String, Value>,
    ) -> CoreResult<()>;
}

/// Rendered action button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionView {
    pub id: String,
    pub title: String,
}

impl ActionView {
    fn of(action: &dyn ModalAction) -> Self {
        Self {
            id: action.id().to_string(),
            title: action.title().to_string(),
        }
    }
}

/// Actions of one page scope, grouped by where they render.
#[derive(Clone, Default)]
pub struct ActionSet {
    /// Toolbar buttons (create).
    pub primary: Vec<Arc<dyn ModalAction>>,
    /// Per-row buttons (edit, delete).
    pub row: Vec<Arc<dyn ModalAction>>,
    /// Applied to the selected rows.
    pub batch: Vec<Arc<dyn ModalAction>>,
}

impl fmt::Debug for ActionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids = |actions: &[Arc<dyn ModalAction>]| {
            actions.iter().map(|a| a.id().to_string()).collect::<Vec<_>>()
        };
        f.debug_struct("ActionSet")
            .field("primary", &ids(&self.primary))
            .field("row", &ids(&self.row))
            .field("batch", &ids(&self.batch))
            .finish()
    }
}

impl ActionSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn primary(mut self, action: Arc<dyn ModalAction>) -> Self {
        self.primary.push(action);
        self
    }

    #[must_use]
    pub fn row(mut self, action: Arc<dyn ModalAction>) -> Self {
        self.row.push(action);
        self
    }

    #[must_use]
    pub fn batch(mut self, action: Arc<dyn ModalAction>) -> Self {
        self.batch.push(action);
        self
    }

    /// Reject duplicate ids within a group. The same action may appear in
    /// more than one group (delete as row and batch action).
    pub fn validate(&self) -> CoreResult<()> {
        for group in [&self.primary, &self.row, &self.batch] {
            let mut seen = HashSet::new();
            if let Some(dup) = group.iter().find(|a| !seen.insert(a.id())) {
                return Err(CoreError::DuplicateActionId(dup.id().to_string()));
            }
        }
        Ok(())
    }

    /// Find an action by id in any group.
    pub fn find(&self, id: &str) -> Option<Arc<dyn ModalAction>> {
        self.primary
            .iter()
            .chain(&self.row)
            .chain(&self.batch)
            .find(|a| a.id() == id)
            .cloned()
    }

    /// Drop actions whose policy the viewer lacks.
    pub async fn permitted(&self, ctx: &PageContext) -> CoreResult<Self> {
        self.validate()?;
        Ok(Self {
            primary: filter_by_policy(ctx, &self.primary).await,
            row: filter_by_policy(ctx, &self.row).await,
            batch: filter_by_policy(ctx, &self.batch).await,
        })
    }

    pub fn primary_views(&self) -> Vec<ActionView> {
        self.primary.iter().map(|a| ActionView::of(a.as_ref())).collect()
    }

    pub fn batch_views(&self) -> Vec<ActionView> {
        self.batch.iter().map(|a| ActionView::of(a.as_ref())).collect()
    }

    /// Row actions whose `allowed` predicate accepts the item.
    pub async fn row_views(&self, ctx: &PageContext, item: &Resource) -> Vec<ActionView> {
        let mut views = Vec::new();
        for action in &self.row {
            if action.allowed(ctx, Some(item)).await {
                views.push(ActionView::of(action.as_ref()));
            }
        }
        views
    }
}

async fn filter_by_policy(
    ctx: &PageContext,
    actions: &[Arc<dyn ModalAction>],
) -> Vec<Arc<dyn ModalAction>> {
    let mut permitted = Vec::with_capacity(actions.len());
    for action in actions {
        if ctx.permissions.is_allowed(action.policy()).await {
            permitted.push(Arc::clone(action));
        } else {
            log::debug!("action {} hidden: policy {} denied", action.id(), action.policy());
        }
    }
    permitted
}

/// Action configuration of a page: one set for every scope, or separate sets
/// for the standard and administrator scopes. Scoped sets are never merged.
#[derive(Debug, Clone)]
pub enum ActionConfigs {
    Shared(ActionSet),
    Scoped {
        standard: ActionSet,
        admin: ActionSet,
    },
}

impl Default for ActionConfigs {
    fn default() -> Self {
        Self::Shared(ActionSet::default())
    }
}

impl ActionConfigs {
    /// The set for a scope.
    pub fn select(&self, admin: bool) -> &ActionSet {
        match self {
            Self::Shared(set) => set,
            Self::Scoped { admin: set, .. } if admin => set,
            Self::Scoped { standard, .. } => standard,
        }
    }
}
