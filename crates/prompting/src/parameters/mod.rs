//! Parameter definitions as handed to a prompt panel.
//!
//! A [`ParameterDefinition`] is produced outside this crate (the server's XML
//! is parsed into the camelCase JSON shape accepted here) and is replaced
//! wholesale on every refresh. Groups and parameters are identified by name;
//! order is significant everywhere.

pub mod diff;
pub mod format;

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Lookup, PromptError};

/// Attribute holding `"true"` for parameters that must never be rendered.
pub const ATTR_HIDDEN: &str = "hidden";
/// Attribute naming the preferred widget kind for a parameter.
pub const ATTR_RENDER_TYPE: &str = "parameter-render-type";
/// Attribute holding the human-readable label of a parameter or group.
pub const ATTR_LABEL: &str = "label";

const NUMBER_TYPES: &[&str] = &[
    "java.lang.Number",
    "java.lang.Byte",
    "java.lang.Short",
    "java.lang.Integer",
    "java.lang.Long",
    "java.lang.Float",
    "java.lang.Double",
    "java.math.BigDecimal",
    "java.math.BigInteger",
];

fn default_type() -> String {
    "java.lang.String".into()
}

fn default_true() -> bool {
    true
}

// ── Values ─────────────────────────────────────────────────────────

/// One selectable value of a parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ParameterValue {
    pub value: String,
    /// Display label; empty means "use the value".
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub selected: bool,
}

impl ParameterValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    /// The label to display, falling back to the raw value.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.value
        } else {
            &self.label
        }
    }
}

// ── Parameters ─────────────────────────────────────────────────────

/// A single prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    /// Java class name of the value type, e.g. `java.lang.Integer`.
    #[serde(rename = "type", default = "default_type")]
    pub value_type: String,
    #[serde(default)]
    pub multi_select: bool,
    /// Only one of `values` may be chosen; with no values the parameter cannot render.
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub values: Vec<ParameterValue>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: default_type(),
            multi_select: false,
            strict: false,
            attributes: BTreeMap::new(),
            values: Vec::new(),
        }
    }

    /// Append plain values (label = value), marking those in `selected`.
    pub fn with_choices(mut self, values: &[&str], selected: &[&str]) -> Self {
        for v in values {
            let mut pv = ParameterValue::new(*v);
            pv.selected = selected.contains(v);
            self.values.push(pv);
        }
        self
    }

    pub fn with_value(mut self, value: ParameterValue) -> Self {
        self.values.push(value);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_type(mut self, value_type: impl Into<String>) -> Self {
        self.value_type = value_type.into();
        self
    }

    pub fn with_multi_select(mut self, multi_select: bool) -> Self {
        self.multi_select = multi_select;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Values whose `selected` flag is set, in list order.
    pub fn selected_values(&self) -> Vec<&str> {
        self.values
            .iter()
            .filter(|v| v.selected)
            .map(|v| v.value.as_str())
            .collect()
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn is_hidden(&self) -> bool {
        self.attribute(ATTR_HIDDEN) == Some("true")
    }

    pub fn render_type(&self) -> Option<&str> {
        self.attribute(ATTR_RENDER_TYPE)
    }

    /// Label attribute, or the parameter name.
    pub fn label(&self) -> &str {
        self.attribute(ATTR_LABEL).unwrap_or(&self.name)
    }

    pub fn is_number_type(&self) -> bool {
        NUMBER_TYPES.contains(&self.value_type.as_str())
    }

    /// A strict parameter with no values never gets a widget.
    pub fn is_renderable(&self) -> bool {
        !(self.strict && self.values.is_empty())
    }
}

// ── Groups ─────────────────────────────────────────────────────────

/// An ordered set of parameters rendered together in one group panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParameterGroup {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl ParameterGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            attributes: BTreeMap::new(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Copy of this group carrying no parameters, used as diff context.
    pub fn header(&self) -> Self {
        Self {
            name: self.name.clone(),
            label: self.label.clone(),
            attributes: self.attributes.clone(),
            parameters: Vec::new(),
        }
    }
}

// ── Definition ─────────────────────────────────────────────────────

/// The server-declared description of every prompt to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    #[serde(default)]
    pub parameter_groups: Vec<ParameterGroup>,
    /// Validation messages keyed by parameter name.
    #[serde(default)]
    pub errors: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_submit: Option<bool>,
    #[serde(default, rename = "autoSubmitUI")]
    pub auto_submit_ui: bool,
    #[serde(default = "default_true", rename = "showParameterUI")]
    pub show_parameter_ui: bool,
}

impl Default for ParameterDefinition {
    fn default() -> Self {
        Self {
            parameter_groups: Vec::new(),
            errors: BTreeMap::new(),
            auto_submit: None,
            auto_submit_ui: false,
            show_parameter_ui: true,
        }
    }
}

impl ParameterDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the JSON form of a definition.
    pub fn from_json(json: &str) -> Result<Self, PromptError> {
        serde_json::from_str(json).map_err(|e| PromptError::InvalidDefinition(e.to_string()))
    }

    pub fn with_group(mut self, group: ParameterGroup) -> Self {
        self.parameter_groups.push(group);
        self
    }

    pub fn with_error(mut self, parameter: impl Into<String>, message: impl Into<String>) -> Self {
        self.errors
            .entry(parameter.into())
            .or_default()
            .push(message.into());
        self
    }

    pub fn with_auto_submit(mut self, auto_submit: Option<bool>) -> Self {
        self.auto_submit = auto_submit;
        self
    }

    pub fn with_show_parameter_ui(mut self, show: bool) -> Self {
        self.show_parameter_ui = show;
        self
    }

    /// Explicit `autoSubmit` wins over the UI default.
    pub fn allow_auto_submit(&self) -> bool {
        self.auto_submit.unwrap_or(self.auto_submit_ui)
    }

    pub fn show_parameter_ui(&self) -> bool {
        self.show_parameter_ui
    }

    pub fn errors_for(&self, parameter: &str) -> &[String] {
        self.errors.get(parameter).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Visit every parameter of every group, in definition order.
    pub fn map_parameters<F>(&self, mut f: F)
    where
        F: FnMut(&Parameter, &ParameterGroup),
    {
        for group in &self.parameter_groups {
            for param in &group.parameters {
                f(param, group);
            }
        }
    }

    pub fn parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameter_groups
            .iter()
            .flat_map(|g| g.parameters.iter())
    }

    pub fn group(&self, name: &str) -> Option<&ParameterGroup> {
        self.parameter_groups.iter().find(|g| g.name == name)
    }

    pub fn get_parameter(
        &self,
        name: &str,
        lookup: Lookup,
    ) -> Result<Option<&Parameter>, PromptError> {
        let found = self.parameters().find(|p| p.name == name);
        lookup.resolve(found, || PromptError::UnknownParameter(name.to_string()))
    }

    pub fn get_group(
        &self,
        name: &str,
        lookup: Lookup,
    ) -> Result<Option<&ParameterGroup>, PromptError> {
        let found = self.parameter_groups.iter().find(|g| g.name == name);
        lookup.resolve(found, || PromptError::UnknownGroup(name.to_string()))
    }
}

// ── Stored values ──────────────────────────────────────────────────

/// Entry in the dashboard value store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StoredValue {
    #[default]
    Empty,
    Single(String),
    Multi(Vec<String>),
}

impl StoredValue {
    /// `[]` is empty, `[v]` is a single value, anything longer is multi.
    pub fn from_selected<S: AsRef<str>>(selected: &[S]) -> Self {
        match selected {
            [] => StoredValue::Empty,
            [one] => StoredValue::Single(one.as_ref().to_string()),
            many => StoredValue::Multi(many.iter().map(|s| s.as_ref().to_string()).collect()),
        }
    }

    /// Convert a client-supplied JSON value. Numbers and booleans become text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        fn text(v: &Value) -> Option<String> {
            match v {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            }
        }
        match value {
            Value::Array(items) => {
                let items: Vec<String> = items.iter().filter_map(text).collect();
                Self::from_selected(&items)
            }
            Value::String(s) if s.is_empty() => StoredValue::Empty,
            other => text(other).map_or(StoredValue::Empty, StoredValue::Single),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            StoredValue::Empty => true,
            StoredValue::Single(_) => false,
            StoredValue::Multi(v) => v.is_empty(),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            StoredValue::Empty => Vec::new(),
            StoredValue::Single(v) => vec![v.as_str()],
            StoredValue::Multi(v) => v.iter().map(String::as_str).collect(),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values().contains(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "parameterGroups": [{
            "name": "parameters",
            "label": "Parameters",
            "parameters": [
                {
                    "name": "region",
                    "multiSelect": true,
                    "strict": true,
                    "attributes": {"parameter-render-type": "list", "label": "Region"},
                    "values": [
                        {"value": "east", "label": "East", "selected": true},
                        {"value": "west", "label": "West"}
                    ]
                },
                {
                    "name": "limit",
                    "type": "java.lang.Integer",
                    "attributes": {"hidden": "true"},
                    "values": [{"value": "10", "selected": true}]
                }
            ]
        }],
        "errors": {"region": ["pick one"]},
        "autoSubmitUI": true
    }"#;

    #[test]
    fn parses_camel_case_json() {
        let defn = ParameterDefinition::from_json(SAMPLE).unwrap();
        assert_eq!(defn.parameter_groups.len(), 1);
        assert!(defn.show_parameter_ui());
        assert!(defn.allow_auto_submit());
        assert_eq!(defn.errors_for("region"), ["pick one".to_string()]);
        assert!(defn.errors_for("limit").is_empty());

        let region = defn.get_parameter("region", Lookup::Strict).unwrap().unwrap();
        assert!(region.multi_select);
        assert!(region.strict);
        assert_eq!(region.render_type(), Some("list"));
        assert_eq!(region.label(), "Region");
        assert_eq!(region.selected_values(), vec!["east"]);
        assert!(!region.is_number_type());

        let limit = defn.get_parameter("limit", Lookup::Strict).unwrap().unwrap();
        assert!(limit.is_hidden());
        assert!(limit.is_number_type());
        assert_eq!(limit.values[0].display_label(), "10");
    }

    #[test]
    fn invalid_json_is_an_invalid_definition() {
        let err = ParameterDefinition::from_json("{\"parameterGroups\": 3}").unwrap_err();
        assert!(matches!(err, PromptError::InvalidDefinition(_)));
    }

    #[test]
    fn explicit_auto_submit_overrides_ui_default() {
        let defn = ParameterDefinition::from_json(SAMPLE)
            .unwrap()
            .with_auto_submit(Some(false));
        assert!(!defn.allow_auto_submit());
        assert!(!ParameterDefinition::new().allow_auto_submit());
    }

    #[test]
    fn lookups_follow_the_policy() {
        let defn = ParameterDefinition::from_json(SAMPLE).unwrap();
        assert_eq!(
            defn.get_parameter("nope", Lookup::Strict).unwrap_err(),
            PromptError::UnknownParameter("nope".into())
        );
        assert_eq!(defn.get_parameter("nope", Lookup::Lenient), Ok(None));
        assert_eq!(
            defn.get_group("missing", Lookup::Strict).unwrap_err(),
            PromptError::UnknownGroup("missing".into())
        );
        assert!(defn.get_group("parameters", Lookup::Lenient).unwrap().is_some());
    }

    #[test]
    fn map_parameters_visits_in_order() {
        let defn = ParameterDefinition::new()
            .with_group(
                ParameterGroup::new("g1")
                    .with_parameter(Parameter::new("a"))
                    .with_parameter(Parameter::new("b")),
            )
            .with_group(ParameterGroup::new("g2").with_parameter(Parameter::new("c")));
        let mut seen = Vec::new();
        defn.map_parameters(|p, g| seen.push(format!("{}/{}", g.name, p.name)));
        assert_eq!(seen, ["g1/a", "g1/b", "g2/c"]);
    }

    #[test]
    fn strict_without_values_is_not_renderable() {
        assert!(!Parameter::new("p").with_strict(true).is_renderable());
        assert!(Parameter::new("p").is_renderable());
        assert!(
            Parameter::new("p")
                .with_strict(true)
                .with_choices(&["a"], &[])
                .is_renderable()
        );
    }

    #[test]
    fn stored_value_from_selection() {
        let none: [&str; 0] = [];
        assert_eq!(StoredValue::from_selected(&none), StoredValue::Empty);
        assert_eq!(
            StoredValue::from_selected(&["a"]),
            StoredValue::Single("a".into())
        );
        assert_eq!(
            StoredValue::from_selected(&["a", "b"]),
            StoredValue::Multi(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn stored_value_from_json() {
        use serde_json::json;
        assert_eq!(StoredValue::from_json(&json!(null)), StoredValue::Empty);
        assert_eq!(StoredValue::from_json(&json!("")), StoredValue::Empty);
        assert_eq!(StoredValue::from_json(&json!(5)), StoredValue::Single("5".into()));
        assert_eq!(
            StoredValue::from_json(&json!(["x", 2])),
            StoredValue::Multi(vec!["x".into(), "2".into()])
        );
        assert!(StoredValue::Multi(vec![]).is_empty());
        assert!(StoredValue::Single("x".into()).contains("x"));
    }

    #[test]
    fn stored_value_serializes_untagged() {
        assert_eq!(serde_json::to_string(&StoredValue::Empty).unwrap(), "null");
        assert_eq!(
            serde_json::to_string(&StoredValue::Multi(vec!["a".into()])).unwrap(),
            "[\"a\"]"
        );
    }
}
