//! Component registry and parameter value store.
//!
//! The panel only talks to a [`Dashboard`] through this trait. A dashboard
//! owns every registered [`Component`] by name and holds the value store
//! keyed by parameter store key. Initialization is asynchronous from the
//! panel's point of view: after [`Dashboard::init`] the dashboard reports
//! [`is_waiting_for_init`](Dashboard::is_waiting_for_init) until a later
//! [`tick`](Dashboard::tick) finishes laying components out.

use std::collections::BTreeMap;

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use crate::components::Component;
use crate::error::{Lookup, PromptError};
use crate::parameters::StoredValue;

pub trait Dashboard: Send {
    fn add_component(&mut self, component: Component);

    /// Re-render a registered component. Unknown names are ignored.
    fn update_component(&mut self, name: &str);

    fn remove_component(&mut self, name: &str) -> Option<Component>;

    fn get_component_by_name(&self, name: &str) -> Option<&Component>;

    fn get_component_by_name_mut(&mut self, name: &str) -> Option<&mut Component>;

    /// Visit every registered component in registration order.
    fn for_each_component_mut(&mut self, f: &mut dyn FnMut(&mut Component));

    fn set_parameter(&mut self, key: &str, value: StoredValue);

    fn get_parameter_value(&self, key: &str) -> Option<&StoredValue>;

    /// Start initializing every registered component.
    fn init(&mut self);

    fn is_waiting_for_init(&self) -> bool;

    /// Advance one scheduling step. Returns `true` when a pending
    /// initialization completed during this step.
    fn tick(&mut self) -> bool;

    /// Names passed to `update_component` since the last call, in order.
    fn take_updates(&mut self) -> Vec<String>;

    /// Lookup by name under a [`Lookup`] policy.
    fn component(&self, name: &str, lookup: Lookup) -> Result<Option<&Component>, PromptError> {
        lookup.resolve(self.get_component_by_name(name), || {
            PromptError::UnknownComponent(name.to_string())
        })
    }
}

/// In-process dashboard used by the CLI, the web host and tests.
#[derive(Debug, Default)]
pub struct LocalDashboard {
    components: IndexMap<String, Component>,
    params: BTreeMap<String, StoredValue>,
    initialized: bool,
    waiting_for_init: IndexSet<String>,
    updates: Vec<String>,
}

impl LocalDashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    pub fn parameters(&self) -> &BTreeMap<String, StoredValue> {
        &self.params
    }
}

impl Dashboard for LocalDashboard {
    fn add_component(&mut self, component: Component) {
        // Components added after the first init are laid out on the next tick.
        if self.initialized {
            self.waiting_for_init.insert(component.name.clone());
        }
        self.components.insert(component.name.clone(), component);
    }

    fn update_component(&mut self, name: &str) {
        if let Some(c) = self.components.get_mut(name) {
            c.revision += 1;
            self.updates.push(name.to_string());
        }
    }

    fn remove_component(&mut self, name: &str) -> Option<Component> {
        self.waiting_for_init.shift_remove(name);
        self.components.shift_remove(name)
    }

    fn get_component_by_name(&self, name: &str) -> Option<&Component> {
        self.components.get(name)
    }

    fn get_component_by_name_mut(&mut self, name: &str) -> Option<&mut Component> {
        self.components.get_mut(name)
    }

    fn for_each_component_mut(&mut self, f: &mut dyn FnMut(&mut Component)) {
        for c in self.components.values_mut() {
            f(c);
        }
    }

    fn set_parameter(&mut self, key: &str, value: StoredValue) {
        self.params.insert(key.to_string(), value);
    }

    fn get_parameter_value(&self, key: &str) -> Option<&StoredValue> {
        self.params.get(key)
    }

    fn init(&mut self) {
        self.initialized = true;
        self.waiting_for_init = self.components.keys().cloned().collect();
        trace!(pending = self.waiting_for_init.len(), "dashboard init scheduled");
    }

    fn is_waiting_for_init(&self) -> bool {
        !self.waiting_for_init.is_empty()
    }

    fn tick(&mut self) -> bool {
        if self.waiting_for_init.is_empty() {
            return false;
        }
        let names: Vec<String> = self.waiting_for_init.drain(..).collect();
        for name in &names {
            self.update_component(name);
        }
        true
    }

    fn take_updates(&mut self) -> Vec<String> {
        std::mem::take(&mut self.updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ComponentKind;

    fn label(name: &str) -> Component {
        Component::new(name, ComponentKind::Label { text: name.into() })
    }

    #[test]
    fn init_waits_until_tick() {
        let mut d = LocalDashboard::new();
        d.add_component(label("a"));
        d.add_component(label("b"));
        assert!(!d.is_waiting_for_init());

        d.init();
        assert!(d.is_waiting_for_init());
        assert!(d.tick());
        assert!(!d.is_waiting_for_init());
        assert!(!d.tick());
        assert_eq!(d.take_updates(), ["a", "b"]);
        assert!(d.take_updates().is_empty());
    }

    #[test]
    fn components_added_after_init_wait_for_the_next_tick() {
        let mut d = LocalDashboard::new();
        d.init();
        d.add_component(label("late"));
        assert!(d.is_waiting_for_init());
        d.tick();
        assert_eq!(d.get_component_by_name("late").unwrap().revision, 1);
    }

    #[test]
    fn remove_returns_the_component_and_clears_waiting() {
        let mut d = LocalDashboard::new();
        d.add_component(label("a"));
        d.init();
        let removed = d.remove_component("a").unwrap();
        assert_eq!(removed.name, "a");
        assert!(!d.is_waiting_for_init());
        assert!(d.remove_component("a").is_none());
        assert!(d.is_empty());
    }

    #[test]
    fn strict_and_lenient_component_lookup() {
        let mut d = LocalDashboard::new();
        d.add_component(label("a"));
        assert!(d.component("a", Lookup::Strict).unwrap().is_some());
        assert_eq!(d.component("zz", Lookup::Lenient), Ok(None));
        assert_eq!(
            d.component("zz", Lookup::Strict).unwrap_err(),
            PromptError::UnknownComponent("zz".into())
        );
    }

    #[test]
    fn value_store_round_trip() {
        let mut d = LocalDashboard::new();
        d.set_parameter("gp", StoredValue::Single("x".into()));
        assert_eq!(
            d.get_parameter_value("gp"),
            Some(&StoredValue::Single("x".into()))
        );
        assert_eq!(d.get_parameter_value("gq"), None);
        assert_eq!(d.parameters().len(), 1);
    }

    #[test]
    fn update_ignores_unknown_names() {
        let mut d = LocalDashboard::new();
        d.update_component("ghost");
        assert!(d.take_updates().is_empty());
    }
}
