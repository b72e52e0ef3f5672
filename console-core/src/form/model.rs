use std::collections::BTreeMap;

use console_api::{Resource, is_present};
use serde_json::{Map, Value};

use super::binding::FieldBinding;
use super::field::{FieldKind, FieldSpec, FieldView};
use super::validators::{FieldValidator, Required, ValidationContext};
use crate::error::{CoreError, CoreResult, FieldErrors};
use crate::store::ResourceStore;

/// Values, composite bindings and inline errors of one form.
pub struct FormModel {
    fields: Vec<FieldSpec>,
    values: Map<String, Value>,
    bindings: BTreeMap<String, FieldBinding>,
    errors: FieldErrors,
}

impl FormModel {
    /// Seed the form with `defaults`. Composite fields start from their
    /// default object.
    pub fn new(fields: Vec<FieldSpec>, defaults: Map<String, Value>) -> Self {
        let mut values = defaults;
        let mut bindings = BTreeMap::new();
        for field in &fields {
            if let FieldKind::Composite(spec) = &field.kind {
                let external = values.get(&field.name).cloned().unwrap_or(Value::Null);
                let binding = FieldBinding::new(spec.clone(), &external);
                if !external.is_null() {
                    values.insert(field.name.clone(), binding.value());
                }
                bindings.insert(field.name.clone(), binding);
            }
        }
        Self {
            fields,
            values,
            bindings,
            errors: FieldErrors::new(),
        }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn values(&self) -> &Map<String, Value> {
        &self.values
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn binding(&self, name: &str) -> Option<&FieldBinding> {
        self.bindings.get(name)
    }

    /// Set a whole field value; composite fields re-derive their local state.
    pub fn set(&mut self, name: &str, value: Value) -> CoreResult<()> {
        if self.field(name).is_none() {
            return Err(CoreError::ConfigError(format!("Unknown field '{name}'")));
        }
        let value = match self.bindings.get_mut(name) {
            Some(binding) => {
                binding.sync(&value);
                binding.value()
            }
            None => value,
        };
        self.values.insert(name.to_string(), value);
        self.clear_errors(name);
        Ok(())
    }

    /// Edit one part of a composite field.
    pub fn set_subfield(&mut self, name: &str, subfield: &str, value: Value) -> CoreResult<()> {
        let binding = self
            .bindings
            .get_mut(name)
            .ok_or_else(|| CoreError::ConfigError(format!("'{name}' is not a composite field")))?;
        let composed = binding.set(subfield, value)?;
        self.values.insert(name.to_string(), composed);
        self.errors.remove(&format!("{name}.{subfield}"));
        Ok(())
    }

    fn clear_errors(&mut self, name: &str) {
        let prefix = format!("{name}.");
        self.errors
            .retain(|key, _| key != name && !key.starts_with(&prefix));
    }

    /// Run required checks and validators of every visible, enabled field and
    /// subfield. Errors are keyed by field name (`volume.size` for subfields).
    pub async fn validate(
        &mut self,
        store: &ResourceStore,
        item: Option<&Resource>,
    ) -> CoreResult<()> {
        let ctx = ValidationContext {
            store,
            item,
            values: &self.values,
        };

        let mut errors = FieldErrors::new();
        for field in self.fields.iter().filter(|f| !f.hidden && !f.disabled) {
            let value = self.values.get(&field.name);
            if let Some(message) = check_field(&ctx, field, value).await {
                errors.insert(field.name.clone(), message);
                continue;
            }

            let Some(binding) = self.bindings.get(&field.name) else {
                continue;
            };
            for sub in binding.visible_fields().filter(|f| !f.disabled) {
                let sub_value = value.and_then(|v| v.get(&sub.name));
                if let Some(message) = check_field(&ctx, sub, sub_value).await {
                    errors.insert(format!("{}.{}", field.name, sub.name), message);
                }
            }
        }

        self.errors = errors;
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::ValidationFailed(self.errors.clone()))
        }
    }

    /// Rendered fields, hidden ones omitted.
    pub fn views(&self) -> Vec<FieldView> {
        self.fields
            .iter()
            .filter(|f| !f.hidden)
            .map(|field| {
                let value = self.values.get(&field.name);
                let mut view = field.view(value, self.errors.get(&field.name).map(String::as_str));
                if let Some(binding) = self.bindings.get(&field.name) {
                    view.subfields = binding
                        .visible_fields()
                        .map(|sub| {
                            let key = format!("{}.{}", field.name, sub.name);
                            sub.view(
                                binding.local_state().get(&sub.name),
                                self.errors.get(&key).map(String::as_str),
                            )
                        })
                        .collect();
                }
                view
            })
            .collect()
    }
}

/// First failing check of a field, if any. Validators are skipped for empty
/// optional values.
async fn check_field(
    ctx: &ValidationContext<'_>,
    field: &FieldSpec,
    value: Option<&Value>,
) -> Option<String> {
    if field.required {
        if let Err(message) = Required.validate(ctx, &field.label, value).await {
            return Some(message);
        }
    }
    if !is_present(value) {
        return None;
    }
    for validator in &field.validators {
        if let Err(message) = validator.validate(ctx, &field.label, value).await {
            return Some(message);
        }
    }
    None
}
