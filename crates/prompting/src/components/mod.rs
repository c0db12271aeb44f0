//! Live UI components of a prompt panel.
//!
//! A [`Component`] is a named record plus a [`ComponentKind`] tag carrying
//! only what that kind needs. Panels refer to their children by name; the
//! [`Dashboard`](crate::dashboard::Dashboard) owns the records. Code that
//! needs to know "is this a panel" or "is this the submit control" matches
//! on the tag.

pub mod builder;

use serde::Serialize;

use crate::parameters::ParameterValue;

// ── Widget kinds ───────────────────────────────────────────────────

/// Widget flavour chosen from a parameter's `parameter-render-type`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WidgetType {
    #[default]
    TextBox,
    DropDown,
    List,
    Radio,
    Checkbox,
    ToggleButton,
    DatePicker,
    MultiLine,
}

impl WidgetType {
    /// Resolve a render-type attribute. Without one, parameters with values
    /// get a drop-down (or a list when multi-select) and the rest a text box.
    pub fn from_render_type(render_type: Option<&str>, multi_select: bool, has_values: bool) -> Self {
        match render_type.map(str::to_ascii_lowercase).as_deref() {
            Some("dropdown") => WidgetType::DropDown,
            Some("list") => WidgetType::List,
            Some("radio") => WidgetType::Radio,
            Some("checkbox") => WidgetType::Checkbox,
            Some("togglebutton") => WidgetType::ToggleButton,
            Some("datepicker") => WidgetType::DatePicker,
            Some("multi-line") => WidgetType::MultiLine,
            Some("textbox") => WidgetType::TextBox,
            _ if has_values && multi_select => WidgetType::List,
            _ if has_values => WidgetType::DropDown,
            _ => WidgetType::TextBox,
        }
    }

    /// Widgets whose choice list scrolls independently of the panel.
    pub fn is_scrollable(self) -> bool {
        matches!(self, WidgetType::List)
    }
}

/// One entry of a widget's choice list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl From<&ParameterValue> for Choice {
    fn from(v: &ParameterValue) -> Self {
        Self {
            value: v.value.clone(),
            label: v.display_label().to_string(),
            selected: v.selected,
        }
    }
}

/// State of a parameter input widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Widget {
    pub widget_type: WidgetType,
    /// Plain parameter name (not the store key).
    pub param: String,
    pub values_array: Vec<Choice>,
    pub multi_select: bool,
    pub auto_focus: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_top_value: Option<u32>,
    pub focused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_top: Option<u32>,
}

impl Widget {
    pub fn selected(&self) -> Vec<&str> {
        self.values_array
            .iter()
            .filter(|c| c.selected)
            .map(|c| c.value.as_str())
            .collect()
    }
}

// ── Components ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComponentKind {
    Label {
        text: String,
    },
    ErrorLabel {
        message: String,
    },
    ParameterWidget(Widget),
    ParameterPanel {
        css_class: String,
        children: Vec<String>,
    },
    GroupPanel {
        group: String,
        label: String,
        children: Vec<String>,
    },
    SubmitPanel {
        auto_submit: bool,
    },
    PromptPanel {
        children: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        scroll_top: Option<u32>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Component {
    pub name: String,
    /// Store key of the parameter this component renders, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    /// Store keys whose changes this component reacts to.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub listeners: Vec<String>,
    #[serde(flatten)]
    pub kind: ComponentKind,
    /// Incremented by the dashboard on every update.
    pub revision: u64,
    /// Set once the component has been cleared after removal.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cleared: bool,
}

impl Component {
    pub fn new(name: impl Into<String>, kind: ComponentKind) -> Self {
        Self {
            name: name.into(),
            parameter: None,
            listeners: Vec::new(),
            kind,
            revision: 0,
            cleared: false,
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>) -> Self {
        self.parameter = Some(key.into());
        self
    }

    pub fn with_listeners(mut self, listeners: Vec<String>) -> Self {
        self.listeners = listeners;
        self
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ComponentKind::Label { .. } => "label",
            ComponentKind::ErrorLabel { .. } => "error_label",
            ComponentKind::ParameterWidget(_) => "parameter_widget",
            ComponentKind::ParameterPanel { .. } => "parameter_panel",
            ComponentKind::GroupPanel { .. } => "group_panel",
            ComponentKind::SubmitPanel { .. } => "submit_panel",
            ComponentKind::PromptPanel { .. } => "prompt_panel",
        }
    }

    /// Panels are the kinds that own an ordered child list.
    pub fn is_panel(&self) -> bool {
        self.children_ref().is_some()
    }

    pub fn is_submit(&self) -> bool {
        matches!(self.kind, ComponentKind::SubmitPanel { .. })
    }

    fn children_ref(&self) -> Option<&Vec<String>> {
        match &self.kind {
            ComponentKind::ParameterPanel { children, .. }
            | ComponentKind::GroupPanel { children, .. }
            | ComponentKind::PromptPanel { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Child names in order; empty for leaves.
    pub fn children(&self) -> &[String] {
        self.children_ref().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<String>> {
        match &mut self.kind {
            ComponentKind::ParameterPanel { children, .. }
            | ComponentKind::GroupPanel { children, .. }
            | ComponentKind::PromptPanel { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn widget(&self) -> Option<&Widget> {
        match &self.kind {
            ComponentKind::ParameterWidget(w) => Some(w),
            _ => None,
        }
    }

    pub fn widget_mut(&mut self) -> Option<&mut Widget> {
        match &mut self.kind {
            ComponentKind::ParameterWidget(w) => Some(w),
            _ => None,
        }
    }

    pub fn scroll_top(&self) -> Option<u32> {
        match &self.kind {
            ComponentKind::ParameterWidget(w) => w.scroll_top,
            ComponentKind::PromptPanel { scroll_top, .. } => *scroll_top,
            _ => None,
        }
    }

    /// Record a scroll offset. Returns `false` for kinds that do not scroll.
    pub fn set_scroll_top(&mut self, offset: u32) -> bool {
        match &mut self.kind {
            ComponentKind::ParameterWidget(w) => {
                w.scroll_top = Some(offset);
                true
            }
            ComponentKind::PromptPanel { scroll_top, .. } => {
                *scroll_top = Some(offset);
                true
            }
            _ => false,
        }
    }

    /// Drop internal state after removal from the dashboard.
    pub fn clear(&mut self) {
        if let Some(children) = self.children_mut() {
            children.clear();
        }
        if let Some(w) = self.widget_mut() {
            w.values_array.clear();
        }
        self.listeners.clear();
        self.cleared = true;
    }
}

// ── Tree snapshots ─────────────────────────────────────────────────

/// A component with its children resolved, for snapshots and printing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentNode {
    #[serde(flatten)]
    pub component: Component,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<ComponentNode>,
}

impl ComponentNode {
    /// Indented one-line-per-component outline.
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(0, &mut out);
        out
    }

    fn write_outline(&self, depth: usize, out: &mut String) {
        let c = &self.component;
        let detail = match &c.kind {
            ComponentKind::Label { text } => format!(" \"{text}\""),
            ComponentKind::ErrorLabel { message } => format!(" !{message}"),
            ComponentKind::ParameterWidget(w) => {
                let choices: Vec<String> = w
                    .values_array
                    .iter()
                    .map(|ch| {
                        if ch.selected {
                            format!("*{}", ch.value)
                        } else {
                            ch.value.clone()
                        }
                    })
                    .collect();
                format!(" {}:{:?} [{}]", w.param, w.widget_type, choices.join(", "))
            }
            ComponentKind::ParameterPanel { css_class, .. } => format!(" .{css_class}"),
            ComponentKind::GroupPanel { group, .. } => format!(" group={group}"),
            ComponentKind::SubmitPanel { auto_submit } => format!(" auto_submit={auto_submit}"),
            ComponentKind::PromptPanel { .. } => String::new(),
        };
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("{} ({}){detail}\n", c.name, c.kind_name()));
        for node in &self.nodes {
            node.write_outline(depth + 1, out);
        }
    }

    /// Pre-order walk over every node.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a ComponentNode)) {
        f(self);
        for node in &self.nodes {
            node.walk(f);
        }
    }
}
