//! When a reconciliation pass should submit the form.
//!
//! The coordinator fires only when there is no submit control to do it.
//! A submit control, once present, fires according to its own auto-submit
//! setting: after its first layout, and after refresh-driven updates that
//! follow a parameter change.

use crate::components::{Component, ComponentKind};
use crate::dashboard::Dashboard;

/// Which branch of `init` ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// The component tree was built from scratch.
    FullBuild,
    /// A refresh diff was applied to the live tree.
    Update,
    /// No UI: parameter values were initialized only.
    ValuesOnly,
}

pub struct SubmitCoordinator;

impl SubmitCoordinator {
    /// Whether `init` itself fires a submit after `pass`.
    ///
    /// The values-only pass must submit unless the caller suppressed it;
    /// the other passes submit only when no submit control exists.
    pub fn coordinator_fires(pass: Pass, has_submit_control: bool, no_auto_auto_submit: bool) -> bool {
        match pass {
            Pass::ValuesOnly => !no_auto_auto_submit,
            Pass::FullBuild | Pass::Update => !has_submit_control,
        }
    }

    /// Whether an existing submit control fires after a refresh-driven update.
    pub fn control_fires_after_update(auto_submit: bool, parameters_changed: bool) -> bool {
        auto_submit && parameters_changed
    }

    /// Name of the submit control among the prompt panel's direct children.
    pub fn find_submit(dashboard: &dyn Dashboard, prompt_panel: &str) -> Option<String> {
        let prompt = dashboard.get_component_by_name(prompt_panel)?;
        prompt
            .children()
            .iter()
            .find(|name| {
                dashboard
                    .get_component_by_name(name)
                    .is_some_and(Component::is_submit)
            })
            .cloned()
    }

    /// Auto-submit setting of a submit control.
    pub fn control_auto_submit(dashboard: &dyn Dashboard, submit: &str) -> bool {
        matches!(
            dashboard.get_component_by_name(submit).map(|c| &c.kind),
            Some(ComponentKind::SubmitPanel { auto_submit: true })
        )
    }

    /// Group panels among the prompt panel's direct children.
    pub fn group_panels(dashboard: &dyn Dashboard, prompt_panel: &str) -> Vec<String> {
        let Some(prompt) = dashboard.get_component_by_name(prompt_panel) else {
            return Vec::new();
        };
        prompt
            .children()
            .iter()
            .filter(|name| {
                matches!(
                    dashboard.get_component_by_name(name).map(|c| &c.kind),
                    Some(ComponentKind::GroupPanel { .. })
                )
            })
            .cloned()
            .collect()
    }

    /// A submit control is synthesized once some group panel has content.
    pub fn needs_submit_panel(dashboard: &dyn Dashboard, prompt_panel: &str) -> bool {
        !Self::group_panels(dashboard, prompt_panel).is_empty()
            && Self::find_submit(dashboard, prompt_panel).is_none()
    }
}
