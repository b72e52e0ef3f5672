//! Controlled composite fields.
//!
//! A composite field owns a set of tracked subfields plus local-only flags.
//! Its local state is re-derived from the externally supplied value with
//! [`derive_local_state`], and every edit reports the complete composed
//! value, never a partial one and never the flags.

use serde_json::{Map, Value};

use super::field::FieldSpec;
use crate::error::{CoreError, CoreResult};

/// Tracked subfields and branch flags of one composite field.
pub type LocalState = Map<String, Value>;

/// A driver subfield whose value switches a boolean flag; the flag decides
/// which sibling subfields are visible. Hidden siblings keep their values.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchRule {
    pub driver: String,
    pub flag: String,
    /// Driver values that turn the flag on.
    pub on_values: Vec<Value>,
    /// Visible only while the flag is on.
    pub when_on: Vec<String>,
    /// Visible only while the flag is off.
    pub when_off: Vec<String>,
}

impl BranchRule {
    pub fn new(driver: impl Into<String>, flag: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            flag: flag.into(),
            on_values: Vec::new(),
            when_on: Vec::new(),
            when_off: Vec::new(),
        }
    }

    #[must_use]
    pub fn on_value(mut self, value: impl Into<Value>) -> Self {
        self.on_values.push(value.into());
        self
    }

    #[must_use]
    pub fn show_when_on<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.when_on.extend(fields.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn show_when_off<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.when_off.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Flag value for a driver value.
    pub fn evaluate(&self, driver_value: Option<&Value>) -> bool {
        driver_value.is_some_and(|v| self.on_values.contains(v))
    }

    fn hides(&self, field: &str, flag_on: bool) -> bool {
        let hidden_side = if flag_on { &self.when_off } else { &self.when_on };
        hidden_side.iter().any(|f| f == field)
    }
}

/// Subfields and branch rules of a composite field.
#[derive(Debug, Clone, Default)]
pub struct BindingSpec {
    pub fields: Vec<FieldSpec>,
    pub branches: Vec<BranchRule>,
}

impl BindingSpec {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(mut self, field: FieldSpec) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn branch(mut self, rule: BranchRule) -> Self {
        self.branches.push(rule);
        self
    }

    /// Names of the tracked subfields, in declaration order.
    pub fn tracked(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.tracked().any(|t| t == name)
    }

    /// Visibility of a subfield under the flags in `state`.
    pub fn is_visible(&self, name: &str, state: &LocalState) -> bool {
        self.branches.iter().all(|rule| {
            let flag_on = state.get(&rule.flag).and_then(Value::as_bool).unwrap_or(false);
            !rule.hides(name, flag_on)
        })
    }
}

/// Derive local state from an external value.
///
/// Returns `None` when every tracked subfield of `external` equals the one in
/// `previous`. Otherwise the tracked subfields are copied over; a branch flag
/// is recomputed only when its driver changed, so flags of untouched branches
/// survive.
pub fn derive_local_state(
    external: &Value,
    spec: &BindingSpec,
    previous: Option<&LocalState>,
) -> Option<LocalState> {
    let unchanged = previous.is_some_and(|prev| {
        spec.tracked()
            .all(|name| present(prev.get(name)) == present(external.get(name)))
    });
    if unchanged {
        return None;
    }

    let mut next = previous.cloned().unwrap_or_default();
    for name in spec.tracked() {
        match external.get(name) {
            Some(value) => {
                next.insert(name.to_string(), value.clone());
            }
            None => {
                next.remove(name);
            }
        }
    }
    for rule in &spec.branches {
        let incoming = external.get(&rule.driver);
        let driver_changed = previous.is_none_or(|prev| prev.get(&rule.driver) != incoming);
        if driver_changed {
            next.insert(rule.flag.clone(), Value::Bool(rule.evaluate(incoming)));
        }
    }
    Some(next)
}

/// Missing and `null` subfields compare equal.
fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

type ChangeHandler = Box<dyn FnMut(&Value) + Send + Sync>;

/// Live composite field: local state plus the change callback.
pub struct FieldBinding {
    spec: BindingSpec,
    state: LocalState,
    on_change: Option<ChangeHandler>,
}

impl FieldBinding {
    pub fn new(spec: BindingSpec, external: &Value) -> Self {
        let state = derive_local_state(external, &spec, None).unwrap_or_default();
        Self {
            spec,
            state,
            on_change: None,
        }
    }

    #[must_use]
    pub fn with_on_change<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&Value) + Send + Sync + 'static,
    {
        self.on_change = Some(Box::new(handler));
        self
    }

    /// Apply a new external value. Returns whether local state changed.
    pub fn sync(&mut self, external: &Value) -> bool {
        match derive_local_state(external, &self.spec, Some(&self.state)) {
            Some(next) => {
                self.state = next;
                true
            }
            None => false,
        }
    }

    /// Edit one subfield and report the composed value.
    pub fn set(&mut self, field: &str, value: Value) -> CoreResult<Value> {
        if !self.spec.is_tracked(field) {
            return Err(CoreError::ConfigError(format!("Unknown subfield '{field}'")));
        }
        for rule in self.spec.branches.iter().filter(|r| r.driver == field) {
            self.state
                .insert(rule.flag.clone(), Value::Bool(rule.evaluate(Some(&value))));
        }
        self.state.insert(field.to_string(), value);

        let composed = self.value();
        if let Some(handler) = self.on_change.as_mut() {
            handler(&composed);
        }
        Ok(composed)
    }

    /// All tracked subfields as one object; missing ones are `null`.
    pub fn value(&self) -> Value {
        let composed: Map<String, Value> = self
            .spec
            .tracked()
            .map(|name| {
                (
                    name.to_string(),
                    self.state.get(name).cloned().unwrap_or(Value::Null),
                )
            })
            .collect();
        Value::Object(composed)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.state.get(name).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn is_visible(&self, field: &str) -> bool {
        self.spec.is_visible(field, &self.state)
    }

    pub fn visible_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.spec
            .fields
            .iter()
            .filter(|f| !f.hidden && self.is_visible(&f.name))
    }

    pub fn local_state(&self) -> &LocalState {
        &self.state
    }

    pub fn spec(&self) -> &BindingSpec {
        &self.spec
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::field::{FieldKind, SelectOption};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Container volume: `type` drives `is_cinder`, which shows either the
    /// cinder size or the local source.
    fn volume_spec() -> BindingSpec {
        BindingSpec::new()
            .field(FieldSpec::new(
                "type",
                "Type",
                FieldKind::Select(vec![
                    SelectOption::new("New", "cinder-new"),
                    SelectOption::new("Existing", "cinder-available"),
                    SelectOption::new("Bind mount", "bind"),
                ]),
            ))
            .field(FieldSpec::input("source", "Source"))
            .field(FieldSpec::new(
                "cinderVolumeSize",
                "Size",
                FieldKind::Number {
                    min: Some(1),
                    max: None,
                },
            ))
            .field(FieldSpec::input("destination", "Destination"))
            .branch(
                BranchRule::new("type", "is_cinder")
                    .on_value("cinder-new")
                    .show_when_on(["cinderVolumeSize"])
                    .show_when_off(["source"]),
            )
    }

    #[test]
    fn unchanged_external_derives_nothing() {
        let spec = volume_spec();
        let external = json!({ "type": "bind", "source": "/data", "destination": "/mnt" });
        let first = derive_local_state(&external, &spec, None).unwrap();
        assert!(derive_local_state(&external, &spec, Some(&first)).is_none());

        let reordered = json!({ "destination": "/mnt", "source": "/data", "type": "bind" });
        assert!(derive_local_state(&reordered, &spec, Some(&first)).is_none());
    }

    #[test]
    fn nested_values_compare_structurally() {
        let spec = BindingSpec::new().field(FieldSpec::input("tags", "Tags"));
        let first = derive_local_state(&json!({ "tags": ["a", "b"] }), &spec, None).unwrap();
        assert!(derive_local_state(&json!({ "tags": ["a", "b"] }), &spec, Some(&first)).is_none());
        assert!(derive_local_state(&json!({ "tags": ["b", "a"] }), &spec, Some(&first)).is_some());
    }

    #[test]
    fn flags_survive_unrelated_changes() {
        let spec = volume_spec();
        let mut state = derive_local_state(&json!({ "type": "cinder-new" }), &spec, None).unwrap();
        assert_eq!(state["is_cinder"], json!(true));

        // 手动关闭 flag，driver 未变时应保留
        state.insert("is_cinder".to_string(), json!(false));
        let next = derive_local_state(
            &json!({ "type": "cinder-new", "destination": "/mnt" }),
            &spec,
            Some(&state),
        )
        .unwrap();
        assert_eq!(next["is_cinder"], json!(false));
        assert_eq!(next["destination"], json!("/mnt"));

        let next = derive_local_state(&json!({ "type": "bind" }), &spec, Some(&next)).unwrap();
        assert_eq!(next["is_cinder"], json!(false));
        assert!(!next.contains_key("destination"));
    }

    #[test]
    fn set_emits_full_value_without_flags() {
        let emitted = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&emitted);
        let mut binding = FieldBinding::new(volume_spec(), &json!({ "type": "bind" }))
            .with_on_change(move |v| sink.lock().unwrap().push(v.clone()));

        binding.set("destination", json!("/mnt")).unwrap();

        let emitted = emitted.lock().unwrap();
        assert_eq!(emitted.len(), 1);
        assert_eq!(
            emitted[0],
            json!({
                "type": "bind",
                "source": null,
                "cinderVolumeSize": null,
                "destination": "/mnt"
            })
        );
        assert!(emitted[0].get("is_cinder").is_none());
    }

    #[test]
    fn branch_toggle_preserves_hidden_values() {
        let mut binding = FieldBinding::new(
            volume_spec(),
            &json!({ "type": "bind", "source": "/data", "destination": "/mnt" }),
        );
        assert!(!binding.flag("is_cinder"));
        assert!(binding.is_visible("source"));
        assert!(!binding.is_visible("cinderVolumeSize"));

        binding.set("type", json!("cinder-new")).unwrap();
        assert!(binding.flag("is_cinder"));
        assert!(!binding.is_visible("source"));
        binding.set("cinderVolumeSize", json!(20)).unwrap();

        let value = binding.set("type", json!("bind")).unwrap();
        assert!(!binding.flag("is_cinder"));
        assert_eq!(value["source"], json!("/data"));
        assert_eq!(value["cinderVolumeSize"], json!(20));

        let visible: Vec<_> = binding.visible_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(visible, vec!["type", "source", "destination"]);
    }

    #[test]
    fn sync_rederives_flag_when_driver_changes() {
        let mut binding = FieldBinding::new(volume_spec(), &json!({ "type": "bind" }));
        assert!(!binding.sync(&json!({ "type": "bind" })));
        assert!(binding.sync(&json!({ "type": "cinder-new" })));
        assert!(binding.flag("is_cinder"));

        // 已有卷只需挂载源，不新建
        assert!(binding.sync(&json!({ "type": "cinder-available", "cinderVolumeSize": 8 })));
        assert!(!binding.flag("is_cinder"));
        assert!(binding.is_visible("source"));
        assert!(!binding.is_visible("cinderVolumeSize"));
        assert_eq!(binding.value()["cinderVolumeSize"], json!(8));
    }

    #[test]
    fn set_rejects_unknown_subfield() {
        let mut binding = FieldBinding::new(volume_spec(), &Value::Null);
        assert!(matches!(
            binding.set("is_cinder", json!(true)),
            Err(CoreError::ConfigError(_))
        ));
    }
}
