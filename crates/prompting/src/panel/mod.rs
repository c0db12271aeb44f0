//! The prompt panel: owner of the live component tree.
//!
//! A [`PromptPanel`] builds components for a [`ParameterDefinition`],
//! registers them with a [`Dashboard`], and on every refresh reconciles
//! the live tree against a [`Diff`] instead of rebuilding it.
//!
//! ```text
//! Uninitialized ──init──▶ Initialized ──refresh──▶ Refreshing ──▶ Initialized
//! ```
//!
//! Structural mutation happens in exactly one place at a time. A refresh
//! that arrives while the dashboard is still initializing is queued and
//! replayed, in arrival order, from [`PromptPanel::tick`].

pub mod events;
pub mod provider;
pub mod submit;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, error, trace, warn};

use crate::components::builder::{BuildContext, GuidHelper, WidgetBuilder, WidgetFactory, WidgetRequest};
use crate::components::{Component, ComponentKind, ComponentNode, Widget};
use crate::config::PanelConfig;
use crate::dashboard::{Dashboard, LocalDashboard};
use crate::error::{Lookup, PromptError};
use crate::parameters::diff::{Diff, DiffEntry, diff};
use crate::parameters::format::FormattingContext;
use crate::parameters::{Parameter, ParameterDefinition, ParameterGroup, StoredValue};

use events::{CompositeEventHandler, PromptEvent, PromptEventHandler};
use provider::DefinitionProvider;
use submit::{Pass, SubmitCoordinator};

// ── State ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelState {
    Uninitialized,
    Initialized,
    Refreshing,
}

/// What happened to a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshOutcome {
    Applied,
    /// Queued until the dashboard finishes initializing.
    Deferred,
    /// The provider had nothing new.
    Skipped,
}

/// Ephemeral UI state carried from one component generation to the next.
#[derive(Debug, Default)]
struct UiHints {
    focused_param: Option<String>,
    /// Widget scroll offsets by parameter name.
    top_values: HashMap<String, u32>,
    panel_scroll: Option<u32>,
}

impl UiHints {
    fn is_empty(&self) -> bool {
        self.focused_param.is_none() && self.top_values.is_empty() && self.panel_scroll.is_none()
    }
}

#[derive(Debug)]
struct PendingRefresh {
    definition: ParameterDefinition,
    no_auto_auto_submit: bool,
}

/// Serializable view of a panel for hosts.
#[derive(Debug, Clone, Serialize)]
pub struct PanelSnapshot {
    pub guid: String,
    pub destination_id: String,
    pub state: PanelState,
    pub hidden: bool,
    pub auto_submit: bool,
    pub waiting_for_init: bool,
    pub pending_refreshes: usize,
    pub values: Map<String, Value>,
    pub tree: Option<ComponentNode>,
}

// ── Panel ──────────────────────────────────────────────────────────

pub struct PromptPanel {
    destination_id: String,
    guid: String,
    definition: ParameterDefinition,
    auto_submit: bool,
    postpone_clear: bool,
    formatting: FormattingContext,
    dashboard: Box<dyn Dashboard>,
    factory: Arc<dyn WidgetFactory>,
    provider: Option<Arc<dyn DefinitionProvider>>,
    handlers: CompositeEventHandler,
    guids: GuidHelper,
    /// Every live component name, pre-order from the prompt panel.
    components: Vec<String>,
    diff: Option<Diff>,
    is_refresh: bool,
    state: PanelState,
    hints: UiHints,
    pending_scroll_restore: Option<u32>,
    awaiting_post_init: bool,
    pending_refreshes: VecDeque<PendingRefresh>,
    garbage: Vec<Component>,
    parameters_changed: bool,
    hidden: bool,
}

impl std::fmt::Debug for PromptPanel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptPanel")
            .field("guid", &self.guid)
            .field("destination_id", &self.destination_id)
            .field("state", &self.state)
            .field("components", &self.components.len())
            .finish_non_exhaustive()
    }
}

impl PromptPanel {
    /// Create a panel rendering into `destination_id`.
    ///
    /// Uses a [`LocalDashboard`] and the stock [`WidgetBuilder`]; swap them
    /// with [`with_dashboard`](Self::with_dashboard) and
    /// [`with_factory`](Self::with_factory) before the first `init`.
    pub fn new(
        destination_id: impl Into<String>,
        definition: ParameterDefinition,
        config: PanelConfig,
    ) -> Result<Self, PromptError> {
        let destination_id = destination_id.into();
        if destination_id.trim().is_empty() {
            return Err(PromptError::ArgRequired("destinationId"));
        }
        let auto_submit = config
            .auto_submit
            .unwrap_or_else(|| definition.allow_auto_submit());
        Ok(Self {
            destination_id,
            guid: config.resolve_guid(),
            definition,
            auto_submit,
            postpone_clear: config.postpone_clear,
            formatting: config.formatting(),
            dashboard: Box::new(LocalDashboard::new()),
            factory: Arc::new(WidgetBuilder),
            provider: None,
            handlers: CompositeEventHandler::new(),
            guids: GuidHelper::default(),
            components: Vec::new(),
            diff: None,
            is_refresh: false,
            state: PanelState::Uninitialized,
            hints: UiHints::default(),
            pending_scroll_restore: None,
            awaiting_post_init: false,
            pending_refreshes: VecDeque::new(),
            garbage: Vec::new(),
            parameters_changed: false,
            hidden: false,
        })
    }

    pub fn with_dashboard(mut self, dashboard: Box<dyn Dashboard>) -> Self {
        self.dashboard = dashboard;
        self
    }

    pub fn with_factory(mut self, factory: Arc<dyn WidgetFactory>) -> Self {
        self.factory = factory;
        self
    }

    pub fn with_provider(mut self, provider: Arc<dyn DefinitionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_handler(mut self, handler: impl PromptEventHandler + 'static) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn add_handler(&mut self, handler: impl PromptEventHandler + 'static) {
        self.handlers.push(handler);
    }

    // ── Accessors ──

    pub fn guid(&self) -> &str {
        &self.guid
    }

    pub fn destination_id(&self) -> &str {
        &self.destination_id
    }

    pub fn definition(&self) -> &ParameterDefinition {
        &self.definition
    }

    pub fn state(&self) -> PanelState {
        self.state
    }

    pub fn auto_submit(&self) -> bool {
        self.auto_submit
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn formatting(&self) -> &FormattingContext {
        &self.formatting
    }

    /// Live component names, pre-order.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn dashboard(&self) -> &dyn Dashboard {
        self.dashboard.as_ref()
    }

    pub fn dashboard_mut(&mut self) -> &mut dyn Dashboard {
        self.dashboard.as_mut()
    }

    /// Removed components awaiting their postponed clear.
    pub fn garbage(&self) -> &[Component] {
        &self.garbage
    }

    pub fn pending_refreshes(&self) -> usize {
        self.pending_refreshes.len()
    }

    pub fn parameters_changed(&self) -> bool {
        self.parameters_changed
    }

    /// Name of the root component.
    pub fn prompt_panel_name(&self) -> String {
        format!("prompt{}", self.guid)
    }

    /// Store key of a parameter: the panel GUID followed by its name.
    pub fn parameter_name(&self, name: &str) -> String {
        format!("{}{name}", self.guid)
    }

    // ── Values ──

    pub fn get_parameter_value(
        &self,
        name: &str,
        lookup: Lookup,
    ) -> Result<Option<&StoredValue>, PromptError> {
        if self.definition.get_parameter(name, lookup)?.is_none() {
            return Ok(None);
        }
        Ok(self.dashboard.get_parameter_value(&self.parameter_name(name)))
    }

    pub fn set_parameter_value(&mut self, name: &str, value: StoredValue) -> Result<(), PromptError> {
        self.definition.get_parameter(name, Lookup::Strict)?;
        let key = self.parameter_name(name);
        self.dashboard.set_parameter(&key, value);
        Ok(())
    }

    /// Every non-empty stored value by plain parameter name.
    ///
    /// Multi-select parameters always yield arrays. Number-typed parameters
    /// are parsed with the panel's formatting context, keeping the raw text
    /// when it does not parse.
    pub fn get_parameter_values(&self) -> Map<String, Value> {
        let mut out = Map::new();
        self.definition.map_parameters(|param, _| {
            let Some(stored) = self
                .dashboard
                .get_parameter_value(&self.parameter_name(&param.name))
            else {
                return;
            };
            if stored.is_empty() {
                return;
            }
            let convert = |text: &str| {
                if param.is_number_type() {
                    self.formatting.number_or_text(text)
                } else {
                    Value::String(text.to_string())
                }
            };
            let value = match stored {
                StoredValue::Single(v) if !param.multi_select => convert(v.as_str()),
                other => Value::Array(other.values().into_iter().map(convert).collect()),
            };
            out.insert(param.name.clone(), value);
        });
        out
    }

    fn initialize_parameter_value(&mut self, param: &Parameter) {
        let key = self.parameter_name(&param.name);
        self.dashboard
            .set_parameter(&key, StoredValue::from_selected(&param.selected_values()));
    }

    // ── Lifecycle ──

    /// Build, update, or initialize values, then decide on submitting.
    ///
    /// * first time (or re-init) with UI shown: full build;
    /// * pending refresh diff: apply it to the live tree;
    /// * otherwise: initialize every parameter value and submit unless
    ///   `no_auto_auto_submit` is set.
    pub fn init(&mut self, no_auto_auto_submit: bool) {
        let pass = if !self.is_refresh && self.definition.show_parameter_ui() {
            self.full_build();
            Pass::FullBuild
        } else if let Some(diff) = self.diff.take() {
            self.update(&diff);
            Pass::Update
        } else {
            let params: Vec<Parameter> = self.definition.parameters().cloned().collect();
            for param in &params {
                self.initialize_parameter_value(param);
            }
            Pass::ValuesOnly
        };

        let prompt = self.prompt_panel_name();
        let submit = SubmitCoordinator::find_submit(self.dashboard.as_ref(), &prompt);
        if SubmitCoordinator::coordinator_fires(pass, submit.is_some(), no_auto_auto_submit) {
            self.fire_submit(!self.is_refresh);
        } else if pass == Pass::Update
            && let Some(submit) = submit
            && SubmitCoordinator::control_fires_after_update(
                SubmitCoordinator::control_auto_submit(self.dashboard.as_ref(), &submit),
                self.parameters_changed,
            )
        {
            self.fire_submit(false);
        }

        if pass == Pass::FullBuild {
            self.emit(PromptEvent::AfterRender);
        }
        self.diff = None;
        self.is_refresh = false;
        self.state = PanelState::Initialized;
    }

    /// Apply a new definition, or queue it while the dashboard initializes.
    pub fn refresh(
        &mut self,
        definition: ParameterDefinition,
        no_auto_auto_submit: bool,
    ) -> RefreshOutcome {
        if self.dashboard.is_waiting_for_init() || !self.pending_refreshes.is_empty() {
            self.pending_refreshes.push_back(PendingRefresh {
                definition,
                no_auto_auto_submit,
            });
            let queued = self.pending_refreshes.len();
            warn!(queued, "Overlapping refresh");
            self.emit(PromptEvent::RefreshDeferred { queued });
            return RefreshOutcome::Deferred;
        }
        self.apply_refresh(definition, no_auto_auto_submit);
        RefreshOutcome::Applied
    }

    fn apply_refresh(&mut self, definition: ParameterDefinition, no_auto_auto_submit: bool) {
        if self.state == PanelState::Uninitialized {
            debug!("Refresh before first init, initializing with the new definition");
            self.definition = definition;
            self.init(no_auto_auto_submit);
            return;
        }
        let diff = diff(&self.definition, &definition);
        let summary = diff.summary();
        self.state = PanelState::Refreshing;
        self.diff = Some(diff);
        self.is_refresh = true;
        self.definition = definition;
        self.init(no_auto_auto_submit);
        self.emit(PromptEvent::Refreshed {
            added: summary.added,
            removed: summary.removed,
            changed: summary.changed,
        });
    }

    /// Advance one scheduling step: let the dashboard finish initializing,
    /// run post-init work, then replay queued refreshes while it is idle.
    /// Returns `true` if anything happened.
    pub fn tick(&mut self) -> bool {
        let completed = self.dashboard.tick();
        if completed && self.awaiting_post_init {
            self.awaiting_post_init = false;
            self.post_init();
        }

        let mut replayed = false;
        while !self.dashboard.is_waiting_for_init() {
            let Some(next) = self.pending_refreshes.pop_front() else {
                break;
            };
            trace!(remaining = self.pending_refreshes.len(), "replaying deferred refresh");
            self.apply_refresh(next.definition, next.no_auto_auto_submit);
            replayed = true;
        }
        completed || replayed
    }

    /// Nothing waiting on the dashboard and no refresh queued.
    pub fn is_settled(&self) -> bool {
        !self.dashboard.is_waiting_for_init() && self.pending_refreshes.is_empty()
    }

    /// Tick until settled. Returns the number of productive ticks.
    pub fn settle(&mut self) -> usize {
        let mut ticks = 0;
        while !self.is_settled() && self.tick() {
            ticks += 1;
        }
        ticks
    }

    fn post_init(&mut self) {
        let prompt = self.prompt_panel_name();
        if let Some(offset) = self.pending_scroll_restore.take()
            && let Some(panel) = self.dashboard.get_component_by_name_mut(&prompt)
        {
            panel.set_scroll_top(offset);
            self.dashboard.update_component(&prompt);
        }
        self.emit(PromptEvent::PostInit);

        if let Some(submit) = SubmitCoordinator::find_submit(self.dashboard.as_ref(), &prompt)
            && SubmitCoordinator::control_auto_submit(self.dashboard.as_ref(), &submit)
        {
            self.fire_submit(true);
        }
    }

    /// Ask the provider for a new definition and refresh with it.
    ///
    /// A failed fetch leaves the tree untouched, raises an
    /// [`Alert`](PromptEvent::Alert) and returns [`PromptError::Fetch`].
    pub async fn refresh_prompt(&mut self) -> Result<RefreshOutcome, PromptError> {
        let Some(provider) = self.provider.clone() else {
            return Ok(RefreshOutcome::Skipped);
        };
        let values = self.get_parameter_values();
        let fetched = provider.fetch(&self.definition, &values).await;
        match fetched {
            Ok(Some(definition)) => Ok(self.refresh(definition, false)),
            Ok(None) => Ok(RefreshOutcome::Skipped),
            Err(e) => {
                error!("Failed to fetch parameter definition: {e}");
                self.emit(PromptEvent::Alert {
                    message: format!("Exception caught attempting to refresh the prompt: {e}"),
                });
                Err(PromptError::Fetch(e))
            }
        }
    }

    /// A user changed a parameter in the UI.
    pub async fn parameter_changed(
        &mut self,
        name: &str,
        value: StoredValue,
    ) -> Result<RefreshOutcome, PromptError> {
        self.set_parameter_value(name, value.clone())?;
        self.sync_widget_selection(name, &value);
        self.parameters_changed = true;
        self.emit(PromptEvent::ParameterChanged {
            name: name.to_string(),
            value,
        });
        self.refresh_prompt().await
    }

    fn sync_widget_selection(&mut self, name: &str, value: &StoredValue) {
        let key = self.parameter_name(name);
        let Some(widget_name) = self.component_by_parameter(&key, false) else {
            return;
        };
        if let Some(w) = self
            .dashboard
            .get_component_by_name_mut(&widget_name)
            .and_then(Component::widget_mut)
        {
            for choice in &mut w.values_array {
                choice.selected = value.contains(&choice.value);
            }
            self.dashboard.update_component(&widget_name);
        }
    }

    pub fn submit(&mut self) {
        self.fire_submit(false);
    }

    pub fn submit_start(&mut self) {
        self.emit(PromptEvent::SubmitStart);
    }

    pub fn ready(&mut self) {
        self.emit(PromptEvent::Ready);
    }

    pub fn hide(&mut self) {
        self.hidden = true;
    }

    fn fire_submit(&mut self, is_init: bool) {
        self.parameters_changed = false;
        self.emit(PromptEvent::Submit { is_init });
    }

    fn emit(&self, event: PromptEvent) {
        self.handlers.on_event(&event);
    }

    // ── UI hints ──

    /// Give input focus to a parameter's widget, or remember it for the next
    /// full build when no widget exists yet.
    pub fn focus(&mut self, param: &str) -> Result<(), PromptError> {
        self.definition.get_parameter(param, Lookup::Strict)?;
        let key = self.parameter_name(param);
        let target = self.component_by_parameter(&key, false);
        if target.is_none() {
            self.hints.focused_param = Some(param.to_string());
            return Ok(());
        }
        for name in self.components.clone() {
            if let Some(w) = self
                .dashboard
                .get_component_by_name_mut(&name)
                .and_then(Component::widget_mut)
            {
                w.focused = target.as_deref() == Some(name.as_str());
            }
        }
        Ok(())
    }

    /// Record the scroll offset of a live component.
    pub fn scroll_to(&mut self, component: &str, offset: u32) -> Result<(), PromptError> {
        let c = self
            .dashboard
            .get_component_by_name_mut(component)
            .ok_or_else(|| PromptError::UnknownComponent(component.to_string()))?;
        if !c.set_scroll_top(offset) {
            return Err(PromptError::InvalidArgument {
                name: "component",
                reason: format!("{component} does not scroll"),
            });
        }
        Ok(())
    }

    // ── Full build ──

    fn full_build(&mut self) {
        self.collect_garbage();
        if !self.components.is_empty() {
            self.teardown();
        }
        self.emit(PromptEvent::BeforeRender);
        self.guids.reset();

        let mut staged: HashMap<String, Component> = HashMap::new();
        let groups = self.definition.parameter_groups.clone();
        let mut group_panels = Vec::new();
        for group in &groups {
            if let Some(name) = self.build_group_panel(group, &group.parameters, &mut staged) {
                group_panels.push(name);
            }
        }
        if !group_panels.is_empty() {
            let submit = self.build(WidgetRequest::SubmitPanel);
            group_panels.push(submit.name.clone());
            staged.insert(submit.name.clone(), submit);
        }
        let root = self.build(WidgetRequest::PromptPanel {
            children: group_panels,
        });
        let root_name = root.name.clone();
        staged.insert(root_name.clone(), root);

        let hints = std::mem::take(&mut self.hints);
        self.apply_hints(hints, &mut staged, &root_name);

        self.components = Vec::new();
        self.register_subtree(&root_name, &mut staged, false);
        debug!(components = self.components.len(), "Prompt panel built");
        self.dashboard.init();
        self.awaiting_post_init = true;
    }

    /// Remove the previous generation, remembering focus and scroll state.
    fn teardown(&mut self) {
        for name in &self.components {
            let Some(c) = self.dashboard.get_component_by_name(name) else {
                continue;
            };
            match &c.kind {
                ComponentKind::ParameterWidget(w) => {
                    if w.focused && self.hints.focused_param.is_none() {
                        self.hints.focused_param = Some(w.param.clone());
                    }
                    if let Some(top) = w.scroll_top {
                        self.hints.top_values.insert(w.param.clone(), top);
                    }
                }
                ComponentKind::PromptPanel {
                    scroll_top: Some(top),
                    ..
                } => self.hints.panel_scroll = Some(*top),
                _ => {}
            }
        }
        let root = vec![self.prompt_panel_name()];
        self.remove_dashboard_components(&root, true);
        self.components.clear();
    }

    /// Consume focus and scroll hints on a freshly built tree.
    fn apply_hints(&mut self, mut hints: UiHints, staged: &mut HashMap<String, Component>, root: &str) {
        if hints.is_empty() {
            return;
        }
        for name in preorder(root, |n| staged.get(n).map(|c| c.children().to_vec())) {
            let Some(c) = staged.get_mut(&name) else {
                continue;
            };
            if let Some(w) = c.widget_mut() {
                if hints.focused_param.as_deref() == Some(w.param.as_str()) {
                    hints.focused_param = None;
                    w.auto_focus = true;
                }
                if w.widget_type.is_scrollable()
                    && let Some(top) = hints.top_values.remove(&w.param)
                {
                    w.auto_top_value = Some(top);
                }
            }
        }
        // Restored once the dashboard has laid the children out.
        self.pending_scroll_restore = hints.panel_scroll.take();
    }

    /// Build the group panel for `params` of `group`. `None` when no
    /// parameter produced a panel.
    fn build_group_panel(
        &mut self,
        group: &ParameterGroup,
        params: &[Parameter],
        staged: &mut HashMap<String, Component>,
    ) -> Option<String> {
        let mut children = Vec::new();
        let mut keys = Vec::new();
        for param in params {
            if let Some(panel) = self.build_parameter_panel(param, staged) {
                children.push(panel);
                keys.push(self.parameter_name(&param.name));
            }
        }
        if children.is_empty() {
            return None;
        }
        let panel = self.build(WidgetRequest::GroupPanel {
            group,
            children,
            parameters: keys,
        });
        let name = panel.name.clone();
        staged.insert(name.clone(), panel);
        Some(name)
    }

    /// Label, error labels and widget wrapped in a parameter panel. Hidden
    /// and unrenderable parameters only get their value initialized.
    fn build_parameter_panel(
        &mut self,
        param: &Parameter,
        staged: &mut HashMap<String, Component>,
    ) -> Option<String> {
        self.initialize_parameter_value(param);
        if param.is_hidden() {
            return None;
        }
        if !param.is_renderable() {
            debug!(parameter = %param.name, "No widget created, return");
            return None;
        }

        let mut children = Vec::new();
        let label = self.build(WidgetRequest::Label(param));
        children.push(label.name.clone());
        staged.insert(label.name.clone(), label);

        let errors = self.definition.errors_for(&param.name).to_vec();
        for message in &errors {
            let c = self.build(WidgetRequest::ErrorLabel { param, message });
            children.push(c.name.clone());
            staged.insert(c.name.clone(), c);
        }

        let widget = self.build(WidgetRequest::Parameter(param));
        children.push(widget.name.clone());
        staged.insert(widget.name.clone(), widget);

        let panel = self.build(WidgetRequest::ParameterPanel {
            param,
            children,
            has_errors: !errors.is_empty(),
        });
        let name = panel.name.clone();
        staged.insert(name.clone(), panel);
        Some(name)
    }

    fn build(&mut self, request: WidgetRequest<'_>) -> Component {
        let mut ctx = BuildContext::new(&self.guid, &mut self.guids, self.auto_submit);
        self.factory.build(request, &mut ctx)
    }

    /// Register `root` and its staged descendants parent-first, appending
    /// their names to the flat list.
    fn register_subtree(
        &mut self,
        root: &str,
        staged: &mut HashMap<String, Component>,
        update_each: bool,
    ) {
        let Some(component) = staged.remove(root) else {
            return;
        };
        let children = component.children().to_vec();
        self.dashboard.add_component(component);
        if update_each {
            self.dashboard.update_component(root);
        }
        self.components.push(root.to_string());
        for child in &children {
            self.register_subtree(child, staged, update_each);
        }
    }

    // ── Update ──

    /// Reconcile the live tree with `diff`: removals, then additions, then
    /// data changes.
    fn update(&mut self, diff: &Diff) {
        self.collect_garbage();
        let diff = self.effective_diff(diff);

        if !diff.to_remove.is_empty() {
            self.remove_components_by_diff(&diff);
            self.components = self.flatten();
        }
        if !diff.to_add.is_empty() {
            self.add_components_by_diff(&diff);
            self.components = self.flatten();
        }
        if !diff.to_change_data.is_empty() {
            self.change_components_by_diff(&diff);
        }
        let summary = diff.summary();
        debug!(
            removed = summary.removed,
            added = summary.added,
            changed = summary.changed,
            components = self.components.len(),
            "Prompt panel updated"
        );
    }

    /// Reconcile `diff` with the live tree. Parameters that survive the
    /// refresh are checked against their panels: one that stopped rendering
    /// (hidden, or strict with no values) is removed, one that started is
    /// added, and a rendered one whose widget flavour changed is rebuilt in
    /// place.
    fn effective_diff(&self, diff: &Diff) -> Diff {
        let mut out = diff.clone();
        if self
            .dashboard
            .get_component_by_name(&self.prompt_panel_name())
            .is_none()
        {
            return out;
        }
        let listed = |map: &IndexMap<String, DiffEntry>, name: &str| {
            map.values()
                .any(|e| e.params.iter().any(|p| p.name == name))
        };

        for group in &self.definition.parameter_groups {
            for param in &group.parameters {
                if listed(&diff.to_add, &param.name) {
                    continue;
                }
                let key = self.parameter_name(&param.name);
                let has_panel = self.component_by_parameter(&key, true).is_some();
                let renders = param.is_renderable() && !param.is_hidden();
                if has_panel && !renders {
                    Diff::push(&mut out.to_remove, group, param);
                } else if !has_panel && renders {
                    Diff::push(&mut out.to_add, group, param);
                } else if has_panel
                    && !listed(&diff.to_change_data, &param.name)
                    && self.widget_flavour_changed(&key, param)
                {
                    Diff::push(&mut out.to_change_data, group, param);
                }
            }
        }

        // Promoted parameters keep definition order within their group.
        for (group_name, entry) in out.to_add.iter_mut() {
            if let Some(group) = self.definition.group(group_name) {
                entry.params.sort_by_key(|p| {
                    group
                        .parameters
                        .iter()
                        .position(|q| q.name == p.name)
                        .unwrap_or(usize::MAX)
                });
            }
        }
        out
    }

    /// Widget the factory would build for `param` now, without consuming ids.
    fn rebuilt_widget(&self, param: &Parameter) -> Option<Widget> {
        let mut scratch = GuidHelper::default();
        let mut ctx = BuildContext::new(&self.guid, &mut scratch, self.auto_submit);
        self.factory
            .build(WidgetRequest::Parameter(param), &mut ctx)
            .widget()
            .cloned()
    }

    fn widget_flavour_changed(&self, key: &str, param: &Parameter) -> bool {
        let Some(live) = self
            .component_by_parameter(key, false)
            .and_then(|name| self.dashboard.get_component_by_name(&name))
            .and_then(Component::widget)
        else {
            return false;
        };
        self.rebuilt_widget(param).is_some_and(|w| {
            w.widget_type != live.widget_type || w.multi_select != live.multi_select
        })
    }

    fn remove_components_by_diff(&mut self, diff: &Diff) {
        let prompt = self.prompt_panel_name();
        let mut to_remove: Vec<String> = Vec::new();

        for (group_name, entry) in &diff.to_remove {
            for param in &entry.params {
                let key = self.parameter_name(&param.name);
                let Some(panel) = self.component_by_parameter(&key, true) else {
                    continue;
                };
                if let Some(group) = self.dashboard.get_component_by_name_mut(group_name)
                    && let Some(children) = group.children_mut()
                {
                    children.retain(|c| *c != panel);
                    if children.is_empty() && !to_remove.contains(group_name) {
                        to_remove.push(group_name.clone());
                    }
                }
                to_remove.push(panel);
            }
        }

        let remaining_groups = SubmitCoordinator::group_panels(self.dashboard.as_ref(), &prompt)
            .into_iter()
            .filter(|g| !to_remove.contains(g))
            .count();
        if remaining_groups == 0
            && let Some(submit) = SubmitCoordinator::find_submit(self.dashboard.as_ref(), &prompt)
        {
            to_remove.push(submit);
        }

        if let Some(children) = self
            .dashboard
            .get_component_by_name_mut(&prompt)
            .and_then(Component::children_mut)
        {
            children.retain(|c| !to_remove.contains(c));
        }

        debug!(count = to_remove.len(), "Removing components");
        self.remove_dashboard_components(&to_remove, self.postpone_clear);
    }

    fn add_components_by_diff(&mut self, diff: &Diff) {
        let prompt = self.prompt_panel_name();
        if self.dashboard.get_component_by_name(&prompt).is_none() {
            // No UI: values still have to be initialized.
            for entry in diff.to_add.values() {
                for param in &entry.params {
                    self.initialize_parameter_value(param);
                }
            }
            return;
        }

        let mut staged: HashMap<String, Component> = HashMap::new();
        for (group_name, entry) in &diff.to_add {
            if let Some(group) = self.dashboard.get_component_by_name(group_name)
                && group.is_panel()
            {
                let mut panels = Vec::new();
                let mut keys = Vec::new();
                for param in &entry.params {
                    if let Some(panel) = self.build_parameter_panel(param, &mut staged) {
                        panels.push(panel);
                        keys.push(self.parameter_name(&param.name));
                    }
                }
                if let Some(group) = self.dashboard.get_component_by_name_mut(group_name) {
                    group.listeners.extend(keys);
                    if let Some(children) = group.children_mut() {
                        children.extend(panels.iter().cloned());
                    }
                }
                self.order_group_children(group_name);
                for panel in &panels {
                    self.register_subtree(panel, &mut staged, true);
                }
                self.dashboard.update_component(group_name);
            } else if let Some(name) =
                self.build_group_panel(&entry.group, &entry.params, &mut staged)
            {
                if let Some(children) = self
                    .dashboard
                    .get_component_by_name_mut(&prompt)
                    .and_then(Component::children_mut)
                {
                    children.push(name.clone());
                }
                self.register_subtree(&name, &mut staged, true);
            }
        }

        if SubmitCoordinator::needs_submit_panel(self.dashboard.as_ref(), &prompt) {
            let submit = self.build(WidgetRequest::SubmitPanel);
            let name = submit.name.clone();
            if let Some(children) = self
                .dashboard
                .get_component_by_name_mut(&prompt)
                .and_then(Component::children_mut)
            {
                children.push(name.clone());
            }
            self.dashboard.add_component(submit);
            self.dashboard.update_component(&name);
        }
        self.order_prompt_children();
        self.dashboard.update_component(&prompt);
    }

    fn change_components_by_diff(&mut self, diff: &Diff) {
        let prompt = self.prompt_panel_name();
        for entry in diff.to_change_data.values() {
            for param in &entry.params {
                let key = self.parameter_name(&param.name);
                self.dashboard
                    .set_parameter(&key, StoredValue::from_selected(&param.selected_values()));

                let Some(widget_name) = self.component_by_parameter(&key, false) else {
                    continue;
                };
                let Some(rebuilt) = self.rebuilt_widget(param) else {
                    continue;
                };
                if let Some(w) = self
                    .dashboard
                    .get_component_by_name_mut(&widget_name)
                    .and_then(Component::widget_mut)
                {
                    if w.values_array != rebuilt.values_array {
                        trace!(widget = %widget_name, "choice list replaced");
                        w.values_array = rebuilt.values_array;
                    }
                    w.widget_type = rebuilt.widget_type;
                    w.multi_select = rebuilt.multi_select;
                }
            }
        }

        // Parents first, so listeners see the new values before their own update.
        for name in preorder(&prompt, |n| {
            self.dashboard
                .get_component_by_name(n)
                .map(|c| c.children().to_vec())
        }) {
            self.dashboard.update_component(&name);
        }
    }

    /// Sort parameter panels of a group by the definition's parameter order.
    fn order_group_children(&mut self, group_name: &str) {
        let order: Vec<String> = self
            .definition
            .parameter_groups
            .iter()
            .find(|g| g.name == group_name)
            .map(|g| g.parameters.iter().map(|p| self.parameter_name(&p.name)).collect())
            .unwrap_or_default();
        let Some(children) = self
            .dashboard
            .get_component_by_name(group_name)
            .map(|g| g.children().to_vec())
        else {
            return;
        };
        let rank = |child: &String| {
            self.dashboard
                .get_component_by_name(child)
                .and_then(|c| c.parameter.as_ref())
                .and_then(|key| order.iter().position(|k| k == key))
                .unwrap_or(usize::MAX)
        };
        let mut sorted = children;
        sorted.sort_by_key(rank);
        if let Some(children) = self
            .dashboard
            .get_component_by_name_mut(group_name)
            .and_then(Component::children_mut)
        {
            *children = sorted;
        }
    }

    /// Group panels in definition order, anything else after them.
    fn order_prompt_children(&mut self) {
        let prompt = self.prompt_panel_name();
        let Some(children) = self
            .dashboard
            .get_component_by_name(&prompt)
            .map(|c| c.children().to_vec())
        else {
            return;
        };
        let rank = |child: &String| match self.dashboard.get_component_by_name(child).map(|c| &c.kind) {
            Some(ComponentKind::GroupPanel { group, .. }) => self
                .definition
                .parameter_groups
                .iter()
                .position(|g| g.name == *group)
                .unwrap_or(usize::MAX - 1),
            _ => usize::MAX,
        };
        let mut sorted = children;
        sorted.sort_by_key(rank);
        if let Some(children) = self
            .dashboard
            .get_component_by_name_mut(&prompt)
            .and_then(Component::children_mut)
        {
            *children = sorted;
        }
    }

    // ── Removal ──

    /// Remove `roots` and all their descendants from the dashboard.
    ///
    /// Removed components are cleared now, or parked until the next pass
    /// when `postpone_clear` is set. Their parameters are dropped from every
    /// remaining component's listeners; stored values are kept.
    pub fn remove_dashboard_components(&mut self, roots: &[String], postpone_clear: bool) {
        let mut names = Vec::new();
        for root in roots {
            names.extend(preorder(root, |n| {
                self.dashboard
                    .get_component_by_name(n)
                    .map(|c| c.children().to_vec())
            }));
        }

        let mut removed = Vec::new();
        for name in &names {
            if let Some(c) = self.dashboard.remove_component(name) {
                removed.push(c);
            }
        }

        for mut component in removed {
            if let Some(key) = component.parameter.clone() {
                self.dashboard.for_each_component_mut(&mut |c: &mut Component| {
                    c.listeners.retain(|l| *l != key);
                });
            }
            if postpone_clear {
                self.garbage.push(component);
            } else {
                component.clear();
            }
        }
        self.components.retain(|c| !names.contains(c));
    }

    fn collect_garbage(&mut self) {
        if self.garbage.is_empty() {
            return;
        }
        trace!(count = self.garbage.len(), "clearing postponed components");
        for mut c in self.garbage.drain(..) {
            c.clear();
        }
    }

    // ── Lookup ──

    /// Live component rendering store key `key`: its panel when `panel`,
    /// otherwise its widget.
    fn component_by_parameter(&self, key: &str, panel: bool) -> Option<String> {
        self.components
            .iter()
            .filter_map(|n| self.dashboard.get_component_by_name(n))
            .find(|c| {
                c.parameter.as_deref() == Some(key)
                    && match c.kind {
                        ComponentKind::ParameterPanel { .. } => panel,
                        ComponentKind::ParameterWidget(_) => !panel,
                        _ => false,
                    }
            })
            .map(|c| c.name.clone())
    }

    /// Live component by name under a lookup policy.
    pub fn component(&self, name: &str, lookup: Lookup) -> Result<Option<&Component>, PromptError> {
        self.dashboard.component(name, lookup)
    }

    fn flatten(&self) -> Vec<String> {
        let root = self.prompt_panel_name();
        if self.dashboard.get_component_by_name(&root).is_none() {
            return Vec::new();
        }
        preorder(&root, |n| {
            self.dashboard
                .get_component_by_name(n)
                .map(|c| c.children().to_vec())
        })
    }

    // ── Snapshots ──

    /// The live tree with children resolved.
    pub fn tree(&self) -> Option<ComponentNode> {
        self.node(&self.prompt_panel_name())
    }

    fn node(&self, name: &str) -> Option<ComponentNode> {
        let component = self.dashboard.get_component_by_name(name)?.clone();
        let nodes = component
            .children()
            .iter()
            .filter_map(|child| self.node(child))
            .collect();
        Some(ComponentNode { component, nodes })
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        PanelSnapshot {
            guid: self.guid.clone(),
            destination_id: self.destination_id.clone(),
            state: self.state,
            hidden: self.hidden,
            auto_submit: self.auto_submit,
            waiting_for_init: self.dashboard.is_waiting_for_init(),
            pending_refreshes: self.pending_refreshes.len(),
            values: self.get_parameter_values(),
            tree: self.tree(),
        }
    }
}

/// Pre-order names below (and including) `root`, resolving children with
/// `children_of`. Unknown names end their branch.
fn preorder<F>(root: &str, children_of: F) -> Vec<String>
where
    F: Fn(&str) -> Option<Vec<String>>,
{
    let mut out = Vec::new();
    let mut stack = vec![root.to_string()];
    while let Some(name) = stack.pop() {
        let Some(children) = children_of(&name) else {
            continue;
        };
        stack.extend(children.into_iter().rev());
        out.push(name);
    }
    out
}
