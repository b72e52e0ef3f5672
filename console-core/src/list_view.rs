//! 列表页控制器
//!
//! Binds a [`ResourceStore`](crate::store::ResourceStore) to a table: column
//! rendering, search, paging, selection and the page's resolved actions.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use console_api::{BatchDeleteResult, ListQuery, Resource};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock, broadcast};

use crate::action::{ActionConfigs, ActionSet, ActionView, ModalAction};
use crate::context::PageContext;
use crate::error::{CoreError, CoreResult};
use crate::guard::{MountHandle, RequestSlot};
use crate::store::StoreEvent;
use crate::types::{ColumnSpec, SearchFilter};

/// Static configuration of a list page.
#[derive(Debug, Clone)]
pub struct ListPageConfig {
    pub title: String,
    /// Policy required to view the page.
    pub policy: String,
    /// Alternative policy that also grants access.
    pub alias_policy: Option<String>,
    pub columns: Vec<ColumnSpec>,
    pub search_filters: Vec<SearchFilter>,
    pub actions: ActionConfigs,
}

impl ListPageConfig {
    pub fn new(title: impl Into<String>, policy: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            policy: policy.into(),
            alias_policy: None,
            columns: Vec::new(),
            search_filters: Vec::new(),
            actions: ActionConfigs::default(),
        }
    }

    #[must_use]
    pub fn alias_policy(mut self, policy: impl Into<String>) -> Self {
        self.alias_policy = Some(policy.into());
        self
    }

    #[must_use]
    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn search_filter(mut self, filter: SearchFilter) -> Self {
        self.search_filters.push(filter);
        self
    }

    #[must_use]
    pub fn actions(mut self, actions: ActionConfigs) -> Self {
        self.actions = actions;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "camelCase")]
pub enum ListStatus {
    Idle,
    Loading,
    Ready,
    /// Neither the policy nor its alias is granted; no request was made.
    Forbidden,
    Error(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnView {
    pub title: String,
    pub data_index: String,
    pub hideable: bool,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellView {
    pub text: String,
    /// Detail page URL for linked columns.
    pub link: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowView {
    pub id: String,
    pub cells: Vec<CellView>,
    pub selected: bool,
}

/// Rendered table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableView {
    pub title: String,
    pub status: ListStatus,
    pub columns: Vec<ColumnView>,
    pub rows: Vec<RowView>,
    pub total_count: u32,
    pub page: u32,
    pub page_size: u32,
    pub search_filters: Vec<SearchFilter>,
    pub primary_actions: Vec<ActionView>,
    pub batch_actions: Vec<ActionView>,
    /// Row under the cursor.
    pub cursor: Option<usize>,
}

struct ListState {
    status: ListStatus,
    query: ListQuery,
    rows: Vec<Resource>,
    total_count: u32,
    cursor: Option<usize>,
    selected: BTreeSet<String>,
}

/// Controller of one mounted list page.
pub struct ListViewController {
    ctx: PageContext,
    config: ListPageConfig,
    state: RwLock<ListState>,
    slot: RequestSlot,
    mount: MountHandle,
    events: Mutex<Option<broadcast::Receiver<StoreEvent>>>,
}

impl ListViewController {
    /// Start from the page context's default query (configured page size).
    pub fn new(ctx: PageContext, config: ListPageConfig) -> Self {
        let query = ctx.default_query.clone();
        Self::with_query(ctx, config, query)
    }

    /// Start from a specific query (page size from configuration, preset filters).
    pub fn with_query(ctx: PageContext, config: ListPageConfig, query: ListQuery) -> Self {
        Self {
            ctx,
            config,
            state: RwLock::new(ListState {
                status: ListStatus::Idle,
                query,
                rows: Vec::new(),
                total_count: 0,
                cursor: None,
                selected: BTreeSet::new(),
            }),
            slot: RequestSlot::new(),
            mount: MountHandle::new(),
            events: Mutex::new(None),
        }
    }

    pub fn handle(&self) -> MountHandle {
        self.mount.clone()
    }

    /// Whether the viewer holds the page policy or its alias.
    pub async fn can_access(&self) -> bool {
        let permissions = &self.ctx.permissions;
        if permissions.is_allowed(&self.config.policy).await {
            return true;
        }
        match &self.config.alias_policy {
            Some(alias) => permissions.is_allowed(alias).await,
            None => false,
        }
    }

    /// Subscribe to store events and load the initial page.
    pub async fn mount(&self) -> CoreResult<()> {
        *self.events.lock().await = Some(self.ctx.store.subscribe());
        self.refresh().await
    }

    /// Drop the subscription; in-flight loads will not write state.
    pub async fn unmount(&self) {
        self.mount.unmount();
        self.slot.invalidate();
        self.events.lock().await.take();
    }

    /// Drain pending store events. Returns `true` if any of them asks for a
    /// refresh (mutation, submitted modal, or missed events).
    pub async fn poll_events(&self) -> bool {
        let mut guard = self.events.lock().await;
        let Some(rx) = guard.as_mut() else {
            return false;
        };
        let mut refresh = false;
        loop {
            match rx.try_recv() {
                Ok(event) => refresh |= event.requests_refresh(),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    log::debug!("list view lagged {skipped} store events");
                    refresh = true;
                }
                Err(_) => break,
            }
        }
        refresh
    }

    /// Reload if a mutation happened since the last poll.
    pub async fn refresh_if_requested(&self) -> CoreResult<bool> {
        if self.poll_events().await {
            self.refresh().await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Re-issue the last query.
    pub async fn refresh(&self) -> CoreResult<()> {
        let query = self.state.read().await.query.clone();
        self.load(query).await
    }

    /// Search from the first page with the given filters.
    pub async fn search(&self, filters: BTreeMap<String, String>) -> CoreResult<()> {
        let mut query = self.state.read().await.query.clone();
        query.page = 1;
        query.filters = filters;
        self.load(query).await
    }

    pub async fn goto_page(&self, page: u32) -> CoreResult<()> {
        let mut query = self.state.read().await.query.clone();
        query.page = page;
        self.load(query).await
    }

    /// Fetch a page. Only the latest call writes rows; earlier ones return
    /// [`CoreError::Superseded`].
    pub async fn load(&self, query: ListQuery) -> CoreResult<()> {
        if !self.mount.is_mounted() {
            return Err(CoreError::Unmounted);
        }
        let token = self.slot.issue();

        if !self.can_access().await {
            let mut state = self.state.write().await;
            if self.slot.is_current(token) {
                state.status = ListStatus::Forbidden;
                state.rows.clear();
                state.total_count = 0;
            }
            log::warn!("list {} forbidden: {}", self.config.title, self.config.policy);
            return Err(CoreError::PolicyDenied(self.config.policy.clone()));
        }

        {
            let mut state = self.state.write().await;
            state.status = ListStatus::Loading;
            state.query = query.clone();
        }

        let result = self.ctx.store.load_list(query).await;

        let mut state = self.state.write().await;
        if !self.mount.is_mounted() {
            return Err(CoreError::Unmounted);
        }
        if !self.slot.is_current(token) {
            return Err(CoreError::Superseded);
        }
        match result {
            Ok(list) => {
                state.selected.retain(|id| list.find(id).is_some());
                state.cursor = match state.cursor {
                    _ if list.is_empty() => None,
                    Some(i) => Some(i.min(list.len() - 1)),
                    None => Some(0),
                };
                state.total_count = list.total_count;
                state.query.page = list.page;
                state.query.page_size = list.page_size;
                state.rows = list.items;
                state.status = ListStatus::Ready;
                Ok(())
            }
            Err(e) => {
                state.rows.clear();
                state.total_count = 0;
                state.cursor = None;
                state.status = ListStatus::Error(e.to_string());
                Err(e)
            }
        }
    }

    pub async fn status(&self) -> ListStatus {
        self.state.read().await.status.clone()
    }

    pub async fn rows(&self) -> Vec<Resource> {
        self.state.read().await.rows.clone()
    }

    pub async fn query(&self) -> ListQuery {
        self.state.read().await.query.clone()
    }

    // ===== Actions =====

    /// The action set of this page's scope, filtered by policy.
    pub async fn actions(&self) -> CoreResult<ActionSet> {
        self.config
            .actions
            .select(self.ctx.admin_page)
            .permitted(&self.ctx)
            .await
    }

    /// Row actions available for an item.
    pub async fn row_actions(&self, item: &Resource) -> CoreResult<Vec<ActionView>> {
        Ok(self.actions().await?.row_views(&self.ctx, item).await)
    }

    /// Look up a permitted action by id.
    pub async fn action(&self, id: &str) -> CoreResult<Arc<dyn ModalAction>> {
        self.actions()
            .await?
            .find(id)
            .ok_or_else(|| CoreError::ActionNotAllowed(id.to_string()))
    }

    // ===== Selection =====

    pub async fn select_next(&self) {
        let mut state = self.state.write().await;
        let len = state.rows.len();
        if len == 0 {
            return;
        }
        state.cursor = Some(state.cursor.map_or(0, |i| (i + 1).min(len - 1)));
    }

    pub async fn select_previous(&self) {
        let mut state = self.state.write().await;
        if state.rows.is_empty() {
            return;
        }
        state.cursor = Some(state.cursor.map_or(0, |i| i.saturating_sub(1)));
    }

    pub async fn select_first(&self) {
        let mut state = self.state.write().await;
        if !state.rows.is_empty() {
            state.cursor = Some(0);
        }
    }

    pub async fn select_last(&self) {
        let mut state = self.state.write().await;
        if !state.rows.is_empty() {
            state.cursor = Some(state.rows.len() - 1);
        }
    }

    /// Row under the cursor.
    pub async fn current_item(&self) -> Option<Resource> {
        let state = self.state.read().await;
        state.cursor.and_then(|i| state.rows.get(i)).cloned()
    }

    /// Toggle batch selection of the row under the cursor.
    pub async fn toggle_selected(&self) {
        let mut state = self.state.write().await;
        let Some(id) = state
            .cursor
            .and_then(|i| state.rows.get(i))
            .map(|r| r.id.clone())
        else {
            return;
        };
        if !state.selected.remove(&id) {
            state.selected.insert(id);
        }
    }

    pub async fn clear_selection(&self) {
        self.state.write().await.selected.clear();
    }

    pub async fn selected_items(&self) -> Vec<Resource> {
        let state = self.state.read().await;
        state
            .rows
            .iter()
            .filter(|r| state.selected.contains(&r.id))
            .cloned()
            .collect()
    }

    /// Delete the selected rows. The selection is cleared afterwards; the
    /// store publishes a mutation event for the next poll.
    pub async fn delete_selected(&self) -> CoreResult<BatchDeleteResult> {
        let ids: Vec<String> = self.state.read().await.selected.iter().cloned().collect();
        let result = self.ctx.store.batch_delete(&ids).await?;
        self.clear_selection().await;
        Ok(result)
    }

    // ===== Rendering =====

    fn visible_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        let admin = self.ctx.admin_page;
        self.config.columns.iter().filter(move |c| admin || !c.admin_only)
    }

    fn render_cell(&self, column: &ColumnSpec, item: &Resource) -> CellView {
        let link = column.route_name.as_ref().and_then(|key| {
            self.ctx
                .route_path(key, &[("id", item.id.as_str())])
                .map_err(|e| log::warn!("column {} link: {e}", column.title))
                .ok()
        });
        CellView {
            text: column.render(item),
            link,
        }
    }

    pub async fn view(&self) -> CoreResult<TableView> {
        let actions = self.actions().await?;
        let state = self.state.read().await;
        let columns = self
            .visible_columns()
            .map(|c| ColumnView {
                title: c.title.clone(),
                data_index: c.data_index.clone(),
                hideable: c.hideable,
                hidden: c.hidden_by_default,
            })
            .collect();
        let rows = state
            .rows
            .iter()
            .map(|item| RowView {
                id: item.id.clone(),
                cells: self
                    .visible_columns()
                    .map(|c| self.render_cell(c, item))
                    .collect(),
                selected: state.selected.contains(&item.id),
            })
            .collect();

        Ok(TableView {
            title: self.config.title.clone(),
            status: state.status.clone(),
            columns,
            rows,
            total_count: state.total_count,
            page: state.query.page,
            page_size: state.query.page_size,
            search_filters: self.config.search_filters.clone(),
            primary_actions: actions.primary_views(),
            batch_actions: actions.batch_views(),
            cursor: state.cursor,
        })
    }
}
