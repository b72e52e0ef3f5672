//! Page layout descriptors: table columns, search filters, detail rows and cards.

use std::fmt;
use std::sync::Arc;

use console_api::Resource;
use serde::Serialize;
use serde_json::Value;

/// Placeholder for a missing value.
pub const EMPTY_CELL: &str = "-";

/// Render a raw attribute value as cell text.
pub fn render_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => EMPTY_CELL.to_string(),
        Some(Value::String(s)) if s.is_empty() => EMPTY_CELL.to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => other.to_string(),
    }
}

type RenderFn = dyn Fn(Option<&Value>, &Resource) -> String + Send + Sync;

/// Custom cell renderer. Receives the value at `data_index` and the whole record.
#[derive(Clone)]
pub struct Renderer(Arc<RenderFn>);

impl Renderer {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>, &Resource) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Map raw values through a lookup table (status codes → labels).
    /// Unknown values render as-is.
    pub fn dict<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let table: Vec<(String, String)> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(move |value, _| {
            let raw = render_value(value);
            table
                .iter()
                .find(|(k, _)| *k == raw)
                .map_or(raw, |(_, label)| label.clone())
        })
    }

    /// Append a unit to present values (`10` → `10 GiB`).
    pub fn unit(unit: &'static str) -> Self {
        Self::new(move |value, _| match value {
            Some(v) if console_api::is_present(Some(v)) => format!("{} {unit}", render_value(Some(v))),
            _ => EMPTY_CELL.to_string(),
        })
    }

    pub fn render(&self, value: Option<&Value>, item: &Resource) -> String {
        (self.0)(value, item)
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Renderer(..)")
    }
}

fn render_field(renderer: Option<&Renderer>, data_index: &str, item: &Resource) -> String {
    let value = if data_index == "id" {
        Some(Value::String(item.id.clone()))
    } else {
        item.get(data_index).cloned()
    };
    match renderer {
        Some(r) => r.render(value.as_ref(), item),
        None => render_value(value.as_ref()),
    }
}

// ============ Table ============

/// One table column.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub title: String,
    /// Dotted attribute path.
    pub data_index: String,
    pub renderer: Option<Renderer>,
    /// Route key of the detail page; the cell links to it with the row id.
    pub route_name: Option<String>,
    /// The viewer may toggle this column.
    pub hideable: bool,
    pub hidden_by_default: bool,
    /// Dropped outside the administrator scope.
    pub admin_only: bool,
}

impl ColumnSpec {
    pub fn new(title: impl Into<String>, data_index: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            data_index: data_index.into(),
            renderer: None,
            route_name: None,
            hideable: false,
            hidden_by_default: false,
            admin_only: false,
        }
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[must_use]
    pub fn linked(mut self, route_name: impl Into<String>) -> Self {
        self.route_name = Some(route_name.into());
        self
    }

    #[must_use]
    pub fn hideable(mut self) -> Self {
        self.hideable = true;
        self
    }

    #[must_use]
    pub fn hidden_by_default(mut self) -> Self {
        self.hideable = true;
        self.hidden_by_default = true;
        self
    }

    #[must_use]
    pub fn admin_only(mut self) -> Self {
        self.admin_only = true;
        self
    }

    /// Cell text for a row.
    pub fn render(&self, item: &Resource) -> String {
        render_field(self.renderer.as_ref(), &self.data_index, item)
    }
}

/// A search box entry: `label` shown, `name` sent as the filter key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchFilter {
    pub label: String,
    pub name: String,
}

impl SearchFilter {
    pub fn new(label: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            name: name.into(),
        }
    }
}

// ============ Detail ============

/// Summary row shown above the tabs of a detail page.
#[derive(Debug, Clone)]
pub struct DetailInfo {
    pub title: String,
    pub data_index: String,
    pub renderer: Option<Renderer>,
    /// Collapsed unless the viewer expands the summary.
    pub hideable: bool,
}

impl DetailInfo {
    pub fn new(title: impl Into<String>, data_index: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            data_index: data_index.into(),
            renderer: None,
            hideable: false,
        }
    }

    #[must_use]
    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    #[must_use]
    pub fn hideable(mut self) -> Self {
        self.hideable = true;
        self
    }

    pub fn render(&self, item: &Resource) -> InfoRow {
        InfoRow {
            title: self.title.clone(),
            value: render_field(self.renderer.as_ref(), &self.data_index, item),
            hideable: self.hideable,
        }
    }
}

/// Rendered [`DetailInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoRow {
    pub title: String,
    pub value: String,
    pub hideable: bool,
}

/// One labelled line of a [`Card`].
#[derive(Debug, Clone)]
pub struct CardOption {
    pub label: String,
    pub data_index: String,
    pub renderer: Option<Renderer>,
}

/// A titled group of labelled values rendered from one record.
#[derive(Debug, Clone)]
pub struct Card {
    pub title: String,
    pub options: Vec<CardOption>,
}

impl Card {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn option(mut self, label: impl Into<String>, data_index: impl Into<String>) -> Self {
        self.options.push(CardOption {
            label: label.into(),
            data_index: data_index.into(),
            renderer: None,
        });
        self
    }

    #[must_use]
    pub fn option_with(
        mut self,
        label: impl Into<String>,
        data_index: impl Into<String>,
        renderer: Renderer,
    ) -> Self {
        self.options.push(CardOption {
            label: label.into(),
            data_index: data_index.into(),
            renderer: Some(renderer),
        });
        self
    }

    pub fn render(&self, item: &Resource) -> CardView {
        CardView {
            title: self.title.clone(),
            rows: self
                .options
                .iter()
                .map(|o| CardRow {
                    label: o.label.clone(),
                    value: render_field(o.renderer.as_ref(), &o.data_index, item),
                })
                .collect(),
        }
    }

    /// Render every line as [`EMPTY_CELL`], for a record that is not available.
    pub fn render_empty(&self) -> CardView {
        CardView {
            title: self.title.clone(),
            rows: self
                .options
                .iter()
                .map(|o| CardRow {
                    label: o.label.clone(),
                    value: EMPTY_CELL.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub title: String,
    pub rows: Vec<CardRow>,
}

impl CardView {
    /// Value of the row with the given label.
    pub fn value(&self, label: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.label == label)
            .map(|r| r.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardRow {
    pub label: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn instance() -> Resource {
        Resource::new(
            "db-1",
            json!({
                "name": "mysql-a",
                "status": "ACTIVE",
                "volume": { "size": 10 },
                "datastore": { "type": "mysql", "version": "" }
            }),
        )
    }

    #[test]
    fn render_value_placeholders() {
        assert_eq!(render_value(None), "-");
        assert_eq!(render_value(Some(&Value::Null)), "-");
        assert_eq!(render_value(Some(&json!(""))), "-");
        assert_eq!(render_value(Some(&json!(3))), "3");
        assert_eq!(render_value(Some(&json!(true))), "true");
        assert_eq!(render_value(Some(&json!(["a"]))), r#"["a"]"#);
    }

    #[test]
    fn column_uses_dotted_path_and_renderer() {
        let size = ColumnSpec::new("Volume Size", "volume.size").with_renderer(Renderer::unit("GiB"));
        assert_eq!(size.render(&instance()), "10 GiB");

        let version = ColumnSpec::new("Version", "datastore.version").with_renderer(Renderer::unit("GiB"));
        assert_eq!(version.render(&instance()), "-");

        let id = ColumnSpec::new("ID", "id");
        assert_eq!(id.render(&instance()), "db-1");
    }

    #[test]
    fn dict_renderer_maps_known_values() {
        let status = Renderer::dict([("ACTIVE", "Active"), ("BUILD", "Building")]);
        let column = ColumnSpec::new("Status", "status").with_renderer(status.clone());
        assert_eq!(column.render(&instance()), "Active");
        let other = Resource::new("x", json!({ "status": "ERROR" }));
        assert_eq!(status.render(other.get("status"), &other), "ERROR");
    }

    #[test]
    fn renderer_sees_whole_record() {
        let r = Renderer::new(|_, item| format!("{}:{}", item.id, item.name()));
        let column = ColumnSpec::new("Ref", "missing").with_renderer(r);
        assert_eq!(column.render(&instance()), "db-1:mysql-a");
    }

    #[test]
    fn hidden_by_default_implies_hideable() {
        let c = ColumnSpec::new("Project", "project_id").hidden_by_default();
        assert!(c.hideable);
        assert!(c.hidden_by_default);
    }

    #[test]
    fn card_renders_rows() {
        let card = Card::new("Base Info")
            .option("Name", "name")
            .option("Type", "datastore.type");
        let view = card.render(&instance());
        assert_eq!(view.value("Name"), Some("mysql-a"));
        assert_eq!(view.value("Type"), Some("mysql"));

        let empty = card.render_empty();
        assert!(empty.rows.iter().all(|r| r.value == EMPTY_CELL));
    }

    #[test]
    fn detail_info_renders() {
        let row = DetailInfo::new("Status", "status").hideable().render(&instance());
        assert_eq!(row.value, "ACTIVE");
        assert!(row.hideable);
    }
}
