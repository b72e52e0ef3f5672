use std::sync::Arc;

use console_api::Resource;
use serde::Serialize;
use serde_json::Value;

use super::ModalAction;
use crate::context::PageContext;
use crate::error::{CoreError, CoreResult, FieldErrors};
use crate::form::{FieldView, FormModel};
use crate::store::StoreEvent;

/// How a closed modal ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ModalOutcome {
    Submitted,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "outcome", rename_all = "camelCase")]
pub enum ModalState {
    Open,
    Closed(ModalOutcome),
}

/// Rendered modal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModalView {
    pub action_id: String,
    pub title: String,
    pub state: ModalState,
    pub fields: Vec<FieldView>,
    /// Error of the last failed submit that is not tied to a field.
    pub summary_error: Option<String>,
}

/// One invocation of a [`ModalAction`].
///
/// - validation failure: stays open with inline field errors, nothing is sent
/// - submit failure: stays open with a summary error, values untouched
/// - success: closes and publishes [`StoreEvent::RefreshRequested`] once
pub struct ModalSession {
    action: Arc<dyn ModalAction>,
    ctx: PageContext,
    item: Option<Resource>,
    form: FormModel,
    state: ModalState,
    summary_error: Option<String>,
}

impl ModalSession {
    /// Open the modal for an optional target.
    ///
    /// # Errors
    /// `PolicyDenied` when the viewer lacks the policy, `ActionNotAllowed` when
    /// the action rejects the target.
    pub async fn open(
        action: Arc<dyn ModalAction>,
        ctx: PageContext,
        item: Option<Resource>,
    ) -> CoreResult<Self> {
        if !ctx.permissions.is_allowed(action.policy()).await {
            return Err(CoreError::PolicyDenied(action.policy().to_string()));
        }
        if !action.allowed(&ctx, item.as_ref()).await {
            return Err(CoreError::ActionNotAllowed(action.id().to_string()));
        }

        let fields = action.form_items(&ctx, item.as_ref())?;
        let form = FormModel::new(fields, action.default_value(item.as_ref()));
        log::debug!(
            "open modal {} for {}",
            action.id(),
            item.as_ref().map_or("<new>", |i| i.id.as_str())
        );

        Ok(Self {
            action,
            ctx,
            item,
            form,
            state: ModalState::Open,
            summary_error: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.state == ModalState::Open
    }

    pub fn state(&self) -> ModalState {
        self.state
    }

    pub fn item(&self) -> Option<&Resource> {
        self.item.as_ref()
    }

    pub fn form(&self) -> &FormModel {
        &self.form
    }

    pub fn field_errors(&self) -> &FieldErrors {
        self.form.errors()
    }

    pub fn summary_error(&self) -> Option<&str> {
        self.summary_error.as_deref()
    }

    pub fn set_value(&mut self, field: &str, value: Value) -> CoreResult<()> {
        self.ensure_open()?;
        self.form.set(field, value)
    }

    pub fn set_subfield(&mut self, field: &str, subfield: &str, value: Value) -> CoreResult<()> {
        self.ensure_open()?;
        self.form.set_subfield(field, subfield, value)
    }

    /// Validate and submit.
    pub async fn submit(&mut self) -> CoreResult<ModalOutcome> {
        self.ensure_open()?;
        self.summary_error = None;

        self.form
            .validate(&self.ctx.store, self.item.as_ref())
            .await?;

        if let Err(e) = self
            .action
            .on_submit(&self.ctx, self.item.as_ref(), self.form.values())
            .await
        {
            if e.is_expected() {
                log::warn!("modal {} submit failed: {e}", self.action.id());
            } else {
                log::error!("modal {} submit failed: {e}", self.action.id());
            }
            self.summary_error = Some(e.to_string());
            return Err(e);
        }

        self.state = ModalState::Closed(ModalOutcome::Submitted);
        self.ctx.store.notify(StoreEvent::RefreshRequested);
        log::info!("modal {} submitted", self.action.id());
        Ok(ModalOutcome::Submitted)
    }

    /// Close without submitting.
    pub fn cancel(&mut self) -> ModalOutcome {
        if self.is_open() {
            self.state = ModalState::Closed(ModalOutcome::Cancelled);
        }
        ModalOutcome::Cancelled
    }

    pub fn view(&self) -> ModalView {
        ModalView {
            action_id: self.action.id().to_string(),
            title: self.action.title().to_string(),
            state: self.state,
            fields: self.form.views(),
            summary_error: self.summary_error.clone(),
        }
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CoreError::ActionNotAllowed(format!(
                "{}: modal is closed",
                self.action.id()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::tests::StubAction;
    use crate::form::{FieldSpec, PatternValidator, UniqueNameValidator};
    use crate::test_utils::{MockOp, MockResourceApi, create_page_context, project};
    use crate::traits::StaticPermissions;
    use async_trait::async_trait;
    use console_api::ListQuery;
    use serde_json::{Map, json};

    /// Edit name/description of a project.
    struct EditProject;

    #[async_trait]
    impl ModalAction for EditProject {
        fn id(&self) -> &str {
            "edit"
        }

        fn title(&self) -> &str {
            "Edit"
        }

        fn policy(&self) -> &str {
            "identity:update_project"
        }

        fn default_value(&self, item: Option<&Resource>) -> Map<String, Value> {
            let mut values = Map::new();
            if let Some(item) = item {
                values.insert("name".to_string(), json!(item.name()));
                values.insert(
                    "description".to_string(),
                    item.get("description").cloned().unwrap_or(Value::Null),
                );
            }
            values
        }

        fn form_items(
            &self,
            _ctx: &PageContext,
            _item: Option<&Resource>,
        ) -> CoreResult<Vec<FieldSpec>> {
            Ok(vec![
                FieldSpec::input("name", "Name")
                    .required()
                    .validator(PatternValidator::name_without_cjk()?)
                    .validator(UniqueNameValidator::default()),
                FieldSpec::textarea("description", "Description"),
            ])
        }

        async fn on_submit(
            &self,
            ctx: &PageContext,
            item: Option<&Resource>,
            values: &Map<String, Value>,
        ) -> CoreResult<()> {
            let id = item.map(|i| i.id.as_str()).unwrap_or_default();
            ctx.store.edit(id, &Value::Object(values.clone())).await?;
            Ok(())
        }
    }

    async fn setup(permissions: StaticPermissions) -> (PageContext, Arc<MockResourceApi>) {
        let api = Arc::new(MockResourceApi::with_records(
            "projects",
            vec![project("p-a", "a"), project("p-b", "b")],
        ));
        let ctx = create_page_context(api.clone(), permissions, false);
        ctx.store.list(ListQuery::default()).await.unwrap();
        (ctx, api)
    }

    fn refresh_count(rx: &mut tokio::sync::broadcast::Receiver<StoreEvent>) -> usize {
        let mut count = 0;
        while let Ok(event) = rx.try_recv() {
            if event == StoreEvent::RefreshRequested {
                count += 1;
            }
        }
        count
    }

    #[tokio::test]
    async fn policy_denied_blocks_open() {
        let (ctx, _) = setup(StaticPermissions::new()).await;
        let result = ModalSession::open(Arc::new(EditProject), ctx, Some(project("p-a", "a"))).await;
        assert!(matches!(result, Err(CoreError::PolicyDenied(_))));
    }

    #[tokio::test]
    async fn duplicate_name_stays_open_without_request() {
        let (ctx, api) = setup(StaticPermissions::allow_all()).await;
        let mut rx = ctx.store.subscribe();
        let mut modal = ModalSession::open(Arc::new(EditProject), ctx, Some(project("p-a", "a")))
            .await
            .unwrap();
        assert_eq!(modal.form().value("name"), Some(&json!("a")));

        modal.set_value("name", json!("b")).unwrap();
        let err = modal.submit().await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed(_)));
        assert!(modal.is_open());
        assert_eq!(
            modal.field_errors().get("name").map(String::as_str),
            Some("Name already exists")
        );
        assert_eq!(api.calls(MockOp::Update).await, 0);
        assert_eq!(refresh_count(&mut rx), 0);
    }

    #[tokio::test]
    async fn unchanged_own_name_submits() {
        let (ctx, api) = setup(StaticPermissions::allow_all()).await;
        let mut rx = ctx.store.subscribe();
        let mut modal = ModalSession::open(Arc::new(EditProject), ctx, Some(project("p-a", "a")))
            .await
            .unwrap();
        modal.set_value("description", json!("edited")).unwrap();

        assert_eq!(modal.submit().await.unwrap(), ModalOutcome::Submitted);
        assert_eq!(modal.state(), ModalState::Closed(ModalOutcome::Submitted));
        assert_eq!(refresh_count(&mut rx), 1);
        assert_eq!(
            api.last_payload().await.unwrap(),
            json!({ "name": "a", "description": "edited" })
        );

        // 已关闭，不能再次提交
        assert!(modal.submit().await.is_err());
        assert_eq!(refresh_count(&mut rx), 0);
    }

    #[tokio::test]
    async fn store_failure_keeps_values_and_summary() {
        let (ctx, api) = setup(StaticPermissions::allow_all()).await;
        let mut rx = ctx.store.subscribe();
        api.fail_next(MockOp::Update, MockResourceApi::conflict_error("projects"))
            .await;
        let mut modal = ModalSession::open(Arc::new(EditProject), ctx, Some(project("p-a", "a")))
            .await
            .unwrap();
        modal.set_value("name", json!("c")).unwrap();

        let err = modal.submit().await.unwrap_err();
        assert!(matches!(err, CoreError::Api(_)));
        assert!(modal.is_open());
        assert!(modal.summary_error().is_some());
        assert!(modal.field_errors().is_empty());
        assert_eq!(modal.form().value("name"), Some(&json!("c")));
        assert_eq!(refresh_count(&mut rx), 0);

        // 重试成功
        assert!(modal.submit().await.is_ok());
        assert!(modal.summary_error().is_none());
        assert_eq!(refresh_count(&mut rx), 1);
    }

    #[tokio::test]
    async fn cancel_closes_without_signal() {
        let (ctx, _) = setup(StaticPermissions::allow_all()).await;
        let mut rx = ctx.store.subscribe();
        let mut modal = ModalSession::open(StubAction::arc("create", ""), ctx, None)
            .await
            .unwrap();
        assert_eq!(modal.cancel(), ModalOutcome::Cancelled);
        assert!(!modal.is_open());
        assert!(modal.set_value("name", json!("x")).is_err());
        assert_eq!(refresh_count(&mut rx), 0);
    }

    #[tokio::test]
    async fn not_allowed_target_is_rejected() {
        let (ctx, _) = setup(StaticPermissions::allow_all()).await;
        let action = Arc::new(StubAction {
            id: "disable",
            policy: "",
            only_enabled: true,
        });
        let disabled = Resource::new("p-x", json!({ "enabled": false }));
        let result = ModalSession::open(action, ctx, Some(disabled)).await;
        assert!(matches!(result, Err(CoreError::ActionNotAllowed(_))));
    }

    #[tokio::test]
    async fn view_reports_fields_and_errors() {
        let (ctx, _) = setup(StaticPermissions::allow_all()).await;
        let mut modal = ModalSession::open(Arc::new(EditProject), ctx, None)
            .await
            .unwrap();
        let _ = modal.submit().await;
        let view = modal.view();
        assert_eq!(view.action_id, "edit");
        assert_eq!(view.fields.len(), 2);
        assert_eq!(view.fields[0].error.as_deref(), Some("Please input Name"));
        assert_eq!(view.state, ModalState::Open);
    }
}
