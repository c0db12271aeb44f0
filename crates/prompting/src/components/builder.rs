//! Turning parameters and groups into components.
//!
//! The panel decides *what* to build and in which order; a [`WidgetFactory`]
//! decides how each piece looks. [`WidgetBuilder`] is the stock factory.

use crate::parameters::{Parameter, ParameterGroup};

use super::{Choice, Component, ComponentKind, Widget, WidgetType};

/// Sequential id source for widget names. Reset on every full build so a
/// rebuilt panel reuses the same names.
#[derive(Debug, Default, Clone)]
pub struct GuidHelper {
    next: u64,
}

impl GuidHelper {
    pub fn generate(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        id.to_string()
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

/// Naming context handed to a factory for one build call.
pub struct BuildContext<'a> {
    guid: &'a str,
    guids: &'a mut GuidHelper,
    auto_submit: bool,
}

impl<'a> BuildContext<'a> {
    pub fn new(guid: &'a str, guids: &'a mut GuidHelper, auto_submit: bool) -> Self {
        Self {
            guid,
            guids,
            auto_submit,
        }
    }

    pub fn guid(&self) -> &str {
        self.guid
    }

    /// Effective auto-submit setting of the panel.
    pub fn auto_submit(&self) -> bool {
        self.auto_submit
    }

    /// Fresh `guid-n` component name.
    pub fn widget_name(&mut self) -> String {
        format!("{}-{}", self.guid, self.guids.generate())
    }

    /// Dashboard store key of a parameter.
    pub fn parameter_key(&self, param: &str) -> String {
        format!("{}{param}", self.guid)
    }

    pub fn prompt_panel_name(&self) -> String {
        format!("prompt{}", self.guid)
    }
}

/// What to build. Panel requests carry the names of already-built children.
#[derive(Debug)]
pub enum WidgetRequest<'a> {
    Label(&'a Parameter),
    ErrorLabel {
        param: &'a Parameter,
        message: &'a str,
    },
    Parameter(&'a Parameter),
    ParameterPanel {
        param: &'a Parameter,
        children: Vec<String>,
        has_errors: bool,
    },
    GroupPanel {
        group: &'a ParameterGroup,
        children: Vec<String>,
        /// Store keys of the parameters rendered in the group.
        parameters: Vec<String>,
    },
    SubmitPanel,
    PromptPanel {
        children: Vec<String>,
    },
}

/// Builds components for a prompt panel.
///
/// Implementations must name group panels after their group and the root
/// after [`BuildContext::prompt_panel_name`]; the panel looks them up by
/// those names.
pub trait WidgetFactory: Send + Sync {
    fn build(&self, request: WidgetRequest<'_>, ctx: &mut BuildContext<'_>) -> Component;
}

/// Default factory.
#[derive(Debug, Default, Clone, Copy)]
pub struct WidgetBuilder;

impl WidgetBuilder {
    pub fn choices(param: &Parameter) -> Vec<Choice> {
        param.values.iter().map(Choice::from).collect()
    }
}

impl WidgetFactory for WidgetBuilder {
    fn build(&self, request: WidgetRequest<'_>, ctx: &mut BuildContext<'_>) -> Component {
        match request {
            WidgetRequest::Label(param) => Component::new(
                ctx.widget_name(),
                ComponentKind::Label {
                    text: param.label().to_string(),
                },
            )
            .with_parameter(ctx.parameter_key(&param.name)),
            WidgetRequest::ErrorLabel { param, message } => Component::new(
                ctx.widget_name(),
                ComponentKind::ErrorLabel {
                    message: message.to_string(),
                },
            )
            .with_parameter(ctx.parameter_key(&param.name)),
            WidgetRequest::Parameter(param) => {
                let widget = Widget {
                    widget_type: WidgetType::from_render_type(
                        param.render_type(),
                        param.multi_select,
                        !param.values.is_empty(),
                    ),
                    param: param.name.clone(),
                    values_array: Self::choices(param),
                    multi_select: param.multi_select,
                    auto_focus: false,
                    auto_top_value: None,
                    focused: false,
                    scroll_top: None,
                };
                Component::new(ctx.widget_name(), ComponentKind::ParameterWidget(widget))
                    .with_parameter(ctx.parameter_key(&param.name))
            }
            WidgetRequest::ParameterPanel {
                param,
                children,
                has_errors,
            } => {
                let css_class = if has_errors {
                    "parameter error"
                } else {
                    "parameter"
                };
                Component::new(
                    ctx.widget_name(),
                    ComponentKind::ParameterPanel {
                        css_class: css_class.into(),
                        children,
                    },
                )
                .with_parameter(ctx.parameter_key(&param.name))
            }
            WidgetRequest::GroupPanel {
                group,
                children,
                parameters,
            } => Component::new(
                group.name.clone(),
                ComponentKind::GroupPanel {
                    group: group.name.clone(),
                    label: if group.label.is_empty() {
                        group.name.clone()
                    } else {
                        group.label.clone()
                    },
                    children,
                },
            )
            .with_listeners(parameters),
            WidgetRequest::SubmitPanel => Component::new(
                ctx.widget_name(),
                ComponentKind::SubmitPanel {
                    auto_submit: ctx.auto_submit(),
                },
            ),
            WidgetRequest::PromptPanel { children } => Component::new(
                ctx.prompt_panel_name(),
                ComponentKind::PromptPanel {
                    children,
                    scroll_top: None,
                },
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guid_helper_counts_and_resets() {
        let mut g = GuidHelper::default();
        assert_eq!(g.generate(), "0");
        assert_eq!(g.generate(), "1");
        g.reset();
        assert_eq!(g.generate(), "0");
    }

    #[test]
    fn naming_conventions() {
        let mut guids = GuidHelper::default();
        let mut ctx = BuildContext::new("abc", &mut guids, true);
        assert_eq!(ctx.widget_name(), "abc-0");
        assert_eq!(ctx.parameter_key("region"), "abcregion");
        assert_eq!(ctx.prompt_panel_name(), "promptabc");
    }

    #[test]
    fn builds_parameter_widget_from_values() {
        let param = Parameter::new("region")
            .with_choices(&["east", "west"], &["west"])
            .with_multi_select(true);
        let mut guids = GuidHelper::default();
        let mut ctx = BuildContext::new("g", &mut guids, false);
        let c = WidgetBuilder.build(WidgetRequest::Parameter(&param), &mut ctx);

        assert_eq!(c.name, "g-0");
        assert_eq!(c.parameter.as_deref(), Some("gregion"));
        let w = c.widget().unwrap();
        assert_eq!(w.widget_type, WidgetType::List);
        assert_eq!(w.selected(), vec!["west"]);
        assert_eq!(w.values_array[0].label, "east");
    }

    #[test]
    fn error_panels_get_error_class() {
        let param = Parameter::new("p");
        let mut guids = GuidHelper::default();
        let mut ctx = BuildContext::new("g", &mut guids, false);
        let c = WidgetBuilder.build(
            WidgetRequest::ParameterPanel {
                param: &param,
                children: vec!["g-0".into()],
                has_errors: true,
            },
            &mut ctx,
        );
        assert!(matches!(
            &c.kind,
            ComponentKind::ParameterPanel { css_class, .. } if css_class == "parameter error"
        ));
        assert_eq!(c.children(), ["g-0".to_string()]);
    }

    #[test]
    fn group_panels_are_named_after_their_group() {
        let group = ParameterGroup::new("G1").with_label("First");
        let mut guids = GuidHelper::default();
        let mut ctx = BuildContext::new("g", &mut guids, false);
        let c = WidgetBuilder.build(
            WidgetRequest::GroupPanel {
                group: &group,
                children: vec![],
                parameters: vec!["gp".into()],
            },
            &mut ctx,
        );
        assert_eq!(c.name, "G1");
        assert_eq!(c.listeners, ["gp".to_string()]);
        assert!(matches!(&c.kind, ComponentKind::GroupPanel { label, .. } if label == "First"));
    }

    #[test]
    fn submit_panel_carries_auto_submit() {
        let mut guids = GuidHelper::default();
        let mut ctx = BuildContext::new("g", &mut guids, true);
        let c = WidgetBuilder.build(WidgetRequest::SubmitPanel, &mut ctx);
        assert!(c.is_submit());
        assert!(matches!(c.kind, ComponentKind::SubmitPanel { auto_submit: true }));
    }
}
