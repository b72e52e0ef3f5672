use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::binding::BindingSpec;
use super::validators::FieldValidator;

/// Choice of a radio group or select.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub label: String,
    pub value: Value,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Input widget of a field.
#[derive(Debug, Clone)]
pub enum FieldKind {
    Input,
    TextArea,
    Number { min: Option<i64>, max: Option<i64> },
    Radio(Vec<SelectOption>),
    Select(Vec<SelectOption>),
    Checkbox,
    /// Controlled multi-part input that reports one composed object.
    Composite(BindingSpec),
}

impl FieldKind {
    fn tag(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::TextArea => "textarea",
            Self::Number { .. } => "input-number",
            Self::Radio(_) => "radio",
            Self::Select(_) => "select",
            Self::Checkbox => "checkbox",
            Self::Composite(_) => "composite",
        }
    }

    fn options(&self) -> &[SelectOption] {
        match self {
            Self::Radio(options) | Self::Select(options) => options,
            _ => &[],
        }
    }
}

/// One form item.
#[derive(Clone)]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub required: bool,
    /// Shown but not editable, and not validated.
    pub disabled: bool,
    /// Not rendered, and not validated.
    pub hidden: bool,
    pub validators: Vec<Arc<dyn FieldValidator>>,
    pub help: Option<String>,
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("disabled", &self.disabled)
            .field("hidden", &self.hidden)
            .field("validators", &self.validators.len())
            .finish_non_exhaustive()
    }
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            required: false,
            disabled: false,
            hidden: false,
            validators: Vec::new(),
            help: None,
        }
    }

    pub fn input(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::Input)
    }

    pub fn textarea(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(name, label, FieldKind::TextArea)
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: impl FieldValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render with the current value and error.
    pub fn view(&self, value: Option<&Value>, error: Option<&str>) -> FieldView {
        FieldView {
            name: self.name.clone(),
            label: self.label.clone(),
            kind: self.kind.tag(),
            options: self.kind.options().to_vec(),
            required: self.required,
            disabled: self.disabled,
            value: value.cloned().unwrap_or(Value::Null),
            error: error.map(str::to_string),
            help: self.help.clone(),
            subfields: Vec::new(),
        }
    }
}

/// Rendered form item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldView {
    pub name: String,
    pub label: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    pub required: bool,
    pub disabled: bool,
    pub value: Value,
    pub error: Option<String>,
    pub help: Option<String>,
    /// Visible parts of a composite field.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub subfields: Vec<FieldView>,
}
