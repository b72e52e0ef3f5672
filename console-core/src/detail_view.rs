//! 详情页控制器
//!
//! Loads one record, then (optionally) one auxiliary record named by a
//! trigger field of the detail, and serves a tabbed, card-based read view.
//!
//! ```text
//! Idle → LoadingPrimary → PrimaryLoaded ─┬─────────────────────────────────────→ Ready
//!               │                        └→ LoadingAuxiliary → AuxiliaryLoaded → Ready
//!               └→ Failed
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use console_api::{ListQuery, Resource, is_present};
use futures::future;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::action::{ActionConfigs, ActionSet, ActionView, ModalAction};
use crate::context::PageContext;
use crate::error::{CoreError, CoreResult};
use crate::guard::{MountHandle, RequestSlot, RequestToken};
use crate::store::ResourceStore;
use crate::traits::Router;
use crate::types::{CardView, DetailInfo, InfoRow, ResourceList, render_value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "message", rename_all = "camelCase")]
pub enum DetailPhase {
    Idle,
    LoadingPrimary,
    PrimaryLoaded,
    LoadingAuxiliary,
    AuxiliaryLoaded,
    Ready,
    /// The page policy is not granted; no request was made.
    Forbidden,
    /// Primary fetch failed.
    Failed(String),
}

/// Related record fetched after the detail, keyed by a detail field.
#[derive(Clone)]
pub struct AuxiliarySpec {
    /// Dotted path of the related id in the detail (`default_pool.healthmonitor_id`).
    pub trigger: String,
    pub store: Arc<ResourceStore>,
}

impl AuxiliarySpec {
    pub fn new(trigger: impl Into<String>, store: Arc<ResourceStore>) -> Self {
        Self {
            trigger: trigger.into(),
            store,
        }
    }
}

#[derive(Clone)]
pub enum TabSource {
    /// Rendered from the detail record itself.
    Static,
    /// A list of another collection filtered by `filter_field = <detail id>`.
    Related {
        store: Arc<ResourceStore>,
        filter_field: String,
    },
}

impl fmt::Debug for TabSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static => f.write_str("Static"),
            Self::Related {
                store,
                filter_field,
            } => f
                .debug_struct("Related")
                .field("store", &store.resource_name())
                .field("filter_field", filter_field)
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TabSpec {
    pub key: String,
    pub title: String,
    /// Fetched right after mount instead of on first selection.
    pub force_load: bool,
    pub source: TabSource,
}

impl TabSpec {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            force_load: false,
            source: TabSource::Static,
        }
    }

    #[must_use]
    pub fn related(mut self, store: Arc<ResourceStore>, filter_field: impl Into<String>) -> Self {
        self.source = TabSource::Related {
            store,
            filter_field: filter_field.into(),
        };
        self
    }

    #[must_use]
    pub fn force_load(mut self) -> Self {
        self.force_load = true;
        self
    }
}

/// Inputs of a card layout.
pub struct CardContext<'a> {
    pub detail: &'a Resource,
    /// `None` when not configured, not triggered or failed to load.
    pub auxiliary: Option<&'a Resource>,
    pub admin: bool,
    pub router: &'a dyn Router,
}

/// Card Layout Trait
///
/// Produces the cards of a detail page; cards may depend on detail values,
/// the auxiliary record and the scope.
pub trait CardLayout: Send + Sync {
    fn left_cards(&self, ctx: &CardContext<'_>) -> Vec<CardView>;

    fn right_cards(&self, _ctx: &CardContext<'_>) -> Vec<CardView> {
        Vec::new()
    }
}

/// Static configuration of a detail page.
#[derive(Clone)]
pub struct DetailPageConfig {
    pub title: String,
    /// Policy required to view the page; empty means always allowed.
    pub policy: String,
    /// Route key of the owning list page (back link).
    pub list_route: String,
    /// Back link parameters as `(route param, detail path)`.
    pub list_params: Vec<(String, String)>,
    /// Fixed query of the back link (`tab=SERVER`).
    pub list_query: Vec<(String, String)>,
    pub infos: Vec<DetailInfo>,
    pub tabs: Vec<TabSpec>,
    pub cards: Option<Arc<dyn CardLayout>>,
    pub auxiliary: Option<AuxiliarySpec>,
    /// Actions offered for the loaded record.
    pub actions: ActionConfigs,
}

impl DetailPageConfig {
    pub fn new(title: impl Into<String>, list_route: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            policy: String::new(),
            list_route: list_route.into(),
            list_params: Vec::new(),
            list_query: Vec::new(),
            infos: Vec::new(),
            tabs: Vec::new(),
            cards: None,
            auxiliary: None,
            actions: ActionConfigs::default(),
        }
    }

    #[must_use]
    pub fn policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = policy.into();
        self
    }

    /// Fill route parameter `param` of the back link from the detail.
    #[must_use]
    pub fn list_param(mut self, param: impl Into<String>, data_index: impl Into<String>) -> Self {
        self.list_params.push((param.into(), data_index.into()));
        self
    }

    #[must_use]
    pub fn list_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.list_query.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn info(mut self, info: DetailInfo) -> Self {
        self.infos.push(info);
        self
    }

    #[must_use]
    pub fn tab(mut self, tab: TabSpec) -> Self {
        self.tabs.push(tab);
        self
    }

    #[must_use]
    pub fn cards(mut self, layout: Arc<dyn CardLayout>) -> Self {
        self.cards = Some(layout);
        self
    }

    #[must_use]
    pub fn auxiliary(mut self, auxiliary: AuxiliarySpec) -> Self {
        self.auxiliary = Some(auxiliary);
        self
    }

    #[must_use]
    pub fn actions(mut self, actions: ActionConfigs) -> Self {
        self.actions = actions;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "camelCase")]
pub enum TabState {
    NotLoaded,
    Loading,
    /// Row count of a related list; `0` for static tabs.
    Loaded(usize),
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct TabView {
    pub key: String,
    pub title: String,
    pub active: bool,
    pub state: TabState,
}

/// Rendered detail page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailView {
    pub title: String,
    pub phase: DetailPhase,
    pub list_url: Option<String>,
    pub infos: Vec<InfoRow>,
    pub left_cards: Vec<CardView>,
    pub right_cards: Vec<CardView>,
    pub tabs: Vec<TabView>,
    /// Actions of this scope available for the record.
    pub actions: Vec<ActionView>,
}

struct DetailState {
    phase: DetailPhase,
    history: Vec<DetailPhase>,
    detail: Option<Resource>,
    auxiliary: Option<Resource>,
    /// Trigger value the auxiliary record was loaded for.
    auxiliary_key: Option<String>,
    active_tab: Option<String>,
    tab_states: BTreeMap<String, TabState>,
    tab_lists: BTreeMap<String, ResourceList>,
    /// Latest request number per tab; older responses are dropped.
    tab_requests: BTreeMap<String, u64>,
}

impl DetailState {
    fn set_phase(&mut self, phase: DetailPhase) {
        log::debug!("detail phase {:?} -> {phase:?}", self.phase);
        self.history.push(phase.clone());
        self.phase = phase;
    }
}

/// Controller of one mounted detail page.
pub struct DetailViewController {
    ctx: PageContext,
    config: DetailPageConfig,
    id: String,
    state: RwLock<DetailState>,
    primary_slot: RequestSlot,
    auxiliary_slot: RequestSlot,
    mount: MountHandle,
}

impl DetailViewController {
    pub fn new(ctx: PageContext, config: DetailPageConfig, id: impl Into<String>) -> Self {
        let active_tab = config.tabs.first().map(|t| t.key.clone());
        let tab_states = config
            .tabs
            .iter()
            .map(|t| (t.key.clone(), TabState::NotLoaded))
            .collect();
        Self {
            ctx,
            config,
            id: id.into(),
            state: RwLock::new(DetailState {
                phase: DetailPhase::Idle,
                history: vec![DetailPhase::Idle],
                detail: None,
                auxiliary: None,
                auxiliary_key: None,
                active_tab,
                tab_states,
                tab_lists: BTreeMap::new(),
                tab_requests: BTreeMap::new(),
            }),
            primary_slot: RequestSlot::new(),
            auxiliary_slot: RequestSlot::new(),
            mount: MountHandle::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn handle(&self) -> MountHandle {
        self.mount.clone()
    }

    /// Load the detail, then the active and force-load tabs.
    pub async fn mount(&self) -> CoreResult<()> {
        self.load().await?;

        let mut keys: Vec<String> = self
            .config
            .tabs
            .iter()
            .filter(|t| t.force_load)
            .map(|t| t.key.clone())
            .collect();
        if let Some(active) = self.state.read().await.active_tab.clone() {
            if !keys.contains(&active) {
                keys.push(active);
            }
        }
        let loads = keys.iter().map(|key| self.load_tab(key));
        for result in future::join_all(loads).await {
            match result {
                // 同一标签页已有更新的请求
                Err(CoreError::Superseded) => {}
                other => other?,
            }
        }
        Ok(())
    }

    pub fn unmount(&self) {
        self.mount.unmount();
        self.primary_slot.invalidate();
        self.auxiliary_slot.invalidate();
    }

    fn ensure_live(&self) -> CoreResult<()> {
        if self.mount.is_mounted() {
            Ok(())
        } else {
            Err(CoreError::Unmounted)
        }
    }

    /// Whether the viewer holds the page policy.
    pub async fn can_access(&self) -> bool {
        self.config.policy.is_empty() || self.ctx.permissions.is_allowed(&self.config.policy).await
    }

    /// Fetch the detail and, if triggered, the auxiliary record.
    ///
    /// An auxiliary failure is logged and leaves the section absent; the
    /// controller still reaches `Ready`.
    pub async fn load(&self) -> CoreResult<()> {
        self.ensure_live()?;
        let token = self.primary_slot.issue();

        if !self.can_access().await {
            let mut state = self.state.write().await;
            if self.primary_slot.is_current(token) {
                state.detail = None;
                state.auxiliary = None;
                state.auxiliary_key = None;
                state.set_phase(DetailPhase::Forbidden);
            }
            log::warn!("detail {} forbidden: {}", self.config.title, self.config.policy);
            return Err(CoreError::PolicyDenied(self.config.policy.clone()));
        }

        self.state.write().await.set_phase(DetailPhase::LoadingPrimary);

        let result = self.ctx.store.load_detail(&self.id).await;

        let trigger_value = {
            let mut state = self.state.write().await;
            self.ensure_live()?;
            if !self.primary_slot.is_current(token) {
                return Err(CoreError::Superseded);
            }
            let detail = match result {
                Ok(detail) => detail,
                Err(e) => {
                    state.detail = None;
                    state.set_phase(DetailPhase::Failed(e.to_string()));
                    return Err(e);
                }
            };

            let trigger_value = self.config.auxiliary.as_ref().and_then(|aux| {
                let value = detail.get(&aux.trigger);
                is_present(value).then(|| render_value(value))
            });
            state.detail = Some(detail);
            state.set_phase(DetailPhase::PrimaryLoaded);

            match trigger_value {
                None => {
                    state.auxiliary = None;
                    state.auxiliary_key = None;
                    state.set_phase(DetailPhase::Ready);
                    return Ok(());
                }
                Some(ref value) if state.auxiliary_key.as_ref() == Some(value) => {
                    log::debug!("auxiliary {value} already loaded");
                    state.set_phase(DetailPhase::Ready);
                    return Ok(());
                }
                Some(value) => {
                    state.set_phase(DetailPhase::LoadingAuxiliary);
                    value
                }
            }
        };

        self.load_auxiliary(token, trigger_value).await
    }

    async fn load_auxiliary(
        &self,
        primary: RequestToken,
        trigger_value: String,
    ) -> CoreResult<()> {
        let Some(aux) = self.config.auxiliary.as_ref() else {
            return Ok(());
        };
        let token = self.auxiliary_slot.issue();
        let result = aux.store.load_detail(&trigger_value).await;

        let mut state = self.state.write().await;
        self.ensure_live()?;
        if !self.auxiliary_slot.is_current(token) || !self.primary_slot.is_current(primary) {
            return Err(CoreError::Superseded);
        }
        match result {
            Ok(record) => {
                state.auxiliary = Some(record);
                state.auxiliary_key = Some(trigger_value);
                state.set_phase(DetailPhase::AuxiliaryLoaded);
            }
            Err(e) => {
                log::warn!(
                    "[{}] auxiliary {trigger_value} unavailable: {e}",
                    aux.store.resource_name()
                );
                state.auxiliary = None;
                state.auxiliary_key = None;
            }
        }
        state.set_phase(DetailPhase::Ready);
        Ok(())
    }

    /// Switch tabs, loading the tab on first selection.
    pub async fn select_tab(&self, key: &str) -> CoreResult<()> {
        if !self.config.tabs.iter().any(|t| t.key == key) {
            return Err(CoreError::ConfigError(format!("Unknown tab '{key}'")));
        }
        let needs_load = {
            let mut state = self.state.write().await;
            state.active_tab = Some(key.to_string());
            matches!(
                state.tab_states.get(key),
                Some(TabState::NotLoaded | TabState::Failed(_))
            )
        };
        if needs_load {
            self.load_tab(key).await?;
        }
        Ok(())
    }

    /// (Re)load one tab. Related tab failures are kept in the tab state.
    ///
    /// Each tab tracks its own latest request, so tabs sharing a store never
    /// supersede each other.
    pub async fn load_tab(&self, key: &str) -> CoreResult<()> {
        self.ensure_live()?;
        let tab = self
            .config
            .tabs
            .iter()
            .find(|t| t.key == key)
            .ok_or_else(|| CoreError::ConfigError(format!("Unknown tab '{key}'")))?;

        let TabSource::Related {
            store,
            filter_field,
        } = &tab.source
        else {
            self.state
                .write()
                .await
                .tab_states
                .insert(key.to_string(), TabState::Loaded(0));
            return Ok(());
        };

        let request = {
            let mut state = self.state.write().await;
            state
                .tab_states
                .insert(key.to_string(), TabState::Loading);
            let request = state.tab_requests.entry(key.to_string()).or_insert(0);
            *request += 1;
            *request
        };

        let query = ListQuery::default().with_filter(filter_field.clone(), self.id.clone());
        let result = store.load_list(query).await;

        let mut state = self.state.write().await;
        self.ensure_live()?;
        if state.tab_requests.get(key) != Some(&request) {
            return Err(CoreError::Superseded);
        }
        match result {
            Ok(list) => {
                state
                    .tab_states
                    .insert(key.to_string(), TabState::Loaded(list.len()));
                state.tab_lists.insert(key.to_string(), list);
                Ok(())
            }
            Err(e) => {
                log::warn!("tab {key} failed: {e}");
                state
                    .tab_states
                    .insert(key.to_string(), TabState::Failed(e.to_string()));
                Ok(())
            }
        }
    }

    pub async fn phase(&self) -> DetailPhase {
        self.state.read().await.phase.clone()
    }

    /// Every phase entered since construction, in order.
    pub async fn phase_history(&self) -> Vec<DetailPhase> {
        self.state.read().await.history.clone()
    }

    pub async fn detail(&self) -> Option<Resource> {
        self.state.read().await.detail.clone()
    }

    pub async fn auxiliary(&self) -> Option<Resource> {
        self.state.read().await.auxiliary.clone()
    }

    pub async fn active_tab(&self) -> Option<String> {
        self.state.read().await.active_tab.clone()
    }

    pub async fn tab_state(&self, key: &str) -> Option<TabState> {
        self.state.read().await.tab_states.get(key).cloned()
    }

    /// Rows of a loaded related tab.
    pub async fn tab_list(&self, key: &str) -> Option<ResourceList> {
        self.state.read().await.tab_lists.get(key).cloned()
    }

    /// The action set of this page's scope, filtered by policy.
    pub async fn actions(&self) -> CoreResult<ActionSet> {
        self.config
            .actions
            .select(self.ctx.admin_page)
            .permitted(&self.ctx)
            .await
    }

    /// Look up a permitted action by id.
    pub async fn action(&self, id: &str) -> CoreResult<Arc<dyn ModalAction>> {
        self.actions()
            .await?
            .find(id)
            .ok_or_else(|| CoreError::ActionNotAllowed(id.to_string()))
    }

    /// Back link to the list page in this page's scope.
    pub async fn list_url(&self) -> CoreResult<String> {
        let state = self.state.read().await;
        self.resolve_list_url(state.detail.as_ref())
    }

    fn resolve_list_url(&self, detail: Option<&Resource>) -> CoreResult<String> {
        let values = self
            .config
            .list_params
            .iter()
            .map(|(param, path)| {
                detail
                    .and_then(|d| d.get_str(path))
                    .map(|v| (param.as_str(), v.to_string()))
                    .ok_or_else(|| {
                        CoreError::RouteError(format!("'{path}' is not available for the back link"))
                    })
            })
            .collect::<CoreResult<Vec<_>>>()?;
        let params: Vec<(&str, &str)> = values.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let query: Vec<(&str, &str)> = self
            .config
            .list_query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        self.ctx.route_url(&self.config.list_route, &params, &query)
    }

    pub async fn view(&self) -> CoreResult<DetailView> {
        let actions = self.actions().await?;
        let state = self.state.read().await;
        let actions = match &state.detail {
            Some(detail) => actions.row_views(&self.ctx, detail).await,
            None => Vec::new(),
        };
        let (infos, left_cards, right_cards) = match &state.detail {
            Some(detail) => {
                let infos = self.config.infos.iter().map(|i| i.render(detail)).collect();
                let card_ctx = CardContext {
                    detail,
                    auxiliary: state.auxiliary.as_ref(),
                    admin: self.ctx.admin_page,
                    router: self.ctx.router.as_ref(),
                };
                match &self.config.cards {
                    Some(layout) => (
                        infos,
                        layout.left_cards(&card_ctx),
                        layout.right_cards(&card_ctx),
                    ),
                    None => (infos, Vec::new(), Vec::new()),
                }
            }
            None => (Vec::new(), Vec::new(), Vec::new()),
        };

        let tabs = self
            .config
            .tabs
            .iter()
            .map(|t| TabView {
                key: t.key.clone(),
                title: t.title.clone(),
                active: state.active_tab.as_deref() == Some(t.key.as_str()),
                state: state
                    .tab_states
                    .get(&t.key)
                    .cloned()
                    .unwrap_or(TabState::NotLoaded),
            })
            .collect();

        Ok(DetailView {
            title: self.config.title.clone(),
            phase: state.phase.clone(),
            list_url: self
                .resolve_list_url(state.detail.as_ref())
                .map_err(|e| log::warn!("detail back link: {e}"))
                .ok(),
            infos,
            left_cards,
            right_cards,
            tabs,
            actions,
        })
    }
}
