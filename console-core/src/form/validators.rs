//! Field validators

use async_trait::async_trait;
use console_api::{Resource, is_present};
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{CoreError, CoreResult};
use crate::store::ResourceStore;

/// What a validator may look at besides the value itself.
pub struct ValidationContext<'a> {
    /// Store of the page the form belongs to.
    pub store: &'a ResourceStore,
    /// Edit target, `None` for create forms.
    pub item: Option<&'a Resource>,
    /// All current form values.
    pub values: &'a Map<String, Value>,
}

/// Field Validator Trait
///
/// Returns the inline error message on failure.
#[async_trait]
pub trait FieldValidator: Send + Sync {
    async fn validate(
        &self,
        ctx: &ValidationContext<'_>,
        label: &str,
        value: Option<&Value>,
    ) -> Result<(), String>;
}

/// Value must be present (non-null, non-empty).
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

#[async_trait]
impl FieldValidator for Required {
    async fn validate(
        &self,
        _ctx: &ValidationContext<'_>,
        label: &str,
        value: Option<&Value>,
    ) -> Result<(), String> {
        if is_present(value) {
            Ok(())
        } else {
            Err(format!("Please input {label}"))
        }
    }
}

/// String value must match a regular expression.
#[derive(Debug, Clone)]
pub struct PatternValidator {
    regex: Regex,
    message: String,
}

/// Letter first, then up to 127 ASCII letters, digits or `"'[]^.:()_-`.
pub const NAME_WITHOUT_CJK: &str = r#"^[a-zA-Z][a-zA-Z0-9_"'\[\]^.:()-]{0,127}$"#;

impl PatternValidator {
    pub fn new(pattern: &str, message: impl Into<String>) -> CoreResult<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| CoreError::ConfigError(format!("Invalid pattern '{pattern}': {e}")))?;
        Ok(Self {
            regex,
            message: message.into(),
        })
    }

    /// Resource names: no CJK characters, starts with a letter, 1-128 chars.
    pub fn name_without_cjk() -> CoreResult<Self> {
        Self::new(
            NAME_WITHOUT_CJK,
            "The name should start with upper letter or lower letter, characters can only contain \"0-9, a-z, A-Z, \"-'_()[].:^\".",
        )
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

#[async_trait]
impl FieldValidator for PatternValidator {
    async fn validate(
        &self,
        _ctx: &ValidationContext<'_>,
        _label: &str,
        value: Option<&Value>,
    ) -> Result<(), String> {
        match value {
            Some(Value::String(s)) if self.is_match(s) => Ok(()),
            _ => Err(self.message.clone()),
        }
    }
}

/// Name must not collide with another item of the store's cached list.
///
/// The edit target's own name is excluded. Without a cached list the check
/// passes: it is only a hint, the server decides.
#[derive(Debug, Clone)]
pub struct UniqueNameValidator {
    message: String,
}

impl Default for UniqueNameValidator {
    fn default() -> Self {
        Self {
            message: "Name already exists".to_string(),
        }
    }
}

impl UniqueNameValidator {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl FieldValidator for UniqueNameValidator {
    async fn validate(
        &self,
        ctx: &ValidationContext<'_>,
        _label: &str,
        value: Option<&Value>,
    ) -> Result<(), String> {
        let Some(name) = value.and_then(Value::as_str) else {
            return Ok(());
        };
        let Some(list) = ctx.store.cached_list().await else {
            log::debug!(
                "[{}] no cached list, skipping name uniqueness check",
                ctx.store.resource_name()
            );
            return Ok(());
        };

        let own_name = ctx.item.map(Resource::name);
        let taken = list
            .names()
            .filter(|existing| Some(*existing) != own_name)
            .any(|existing| existing == name);
        if taken {
            Err(self.message.clone())
        } else {
            Ok(())
        }
    }
}
