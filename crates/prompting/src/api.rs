//! Operation and event facade over a single prompt panel.
//!
//! Embedders that do not want to hold a [`PromptPanel`] themselves talk to a
//! [`PromptingApi`]: `render` creates the panel from definition JSON, the
//! remaining operations act on it, and the event hooks register callbacks
//! for one lifecycle event each.
//!
//! ```ignore
//! let mut api = PromptingApi::new(PanelConfig::default());
//! api.render("prompt-div", &definition_json)?;
//! api.post_init(|| println!("laid out"))?;
//! api.init(false)?;
//! ```

use serde_json::{Map, Value};
use tracing::error;

use crate::config::PanelConfig;
use crate::error::PromptError;
use crate::panel::PromptPanel;
use crate::panel::events::{FnEventHandler, PromptEvent};
use crate::parameters::{ParameterDefinition, StoredValue};

const PANEL_NOT_FOUND: &str = "Prompt Panel not found. Call 'render' to create a panel.";

#[derive(Debug, Default)]
pub struct PromptingApi {
    config: PanelConfig,
    panel: Option<PromptPanel>,
}

impl PromptingApi {
    pub fn new(config: PanelConfig) -> Self {
        Self {
            config,
            panel: None,
        }
    }

    /// Parse `definition_json` and create the panel, replacing any previous one.
    pub fn render(
        &mut self,
        destination_id: &str,
        definition_json: &str,
    ) -> Result<&mut PromptPanel, PromptError> {
        let definition = ParameterDefinition::from_json(definition_json)?;
        self.render_definition(destination_id, definition)
    }

    pub fn render_definition(
        &mut self,
        destination_id: &str,
        definition: ParameterDefinition,
    ) -> Result<&mut PromptPanel, PromptError> {
        let panel = PromptPanel::new(destination_id, definition, self.config.clone())?;
        Ok(self.panel.insert(panel))
    }

    pub fn panel(&self) -> Result<&PromptPanel, PromptError> {
        self.panel.as_ref().ok_or_else(not_found)
    }

    pub fn panel_mut(&mut self) -> Result<&mut PromptPanel, PromptError> {
        self.panel.as_mut().ok_or_else(not_found)
    }

    pub fn init(&mut self, no_auto_auto_submit: bool) -> Result<(), PromptError> {
        self.panel_mut()?.init(no_auto_auto_submit);
        Ok(())
    }

    pub fn get_parameter_values(&self) -> Result<Map<String, Value>, PromptError> {
        Ok(self.panel()?.get_parameter_values())
    }

    // ── Event hooks ──

    pub fn before_render(&mut self, f: impl Fn() + Send + Sync + 'static) -> Result<(), PromptError> {
        self.on(move |e| {
            if matches!(e, PromptEvent::BeforeRender) {
                f();
            }
        })
    }

    pub fn after_render(&mut self, f: impl Fn() + Send + Sync + 'static) -> Result<(), PromptError> {
        self.on(move |e| {
            if matches!(e, PromptEvent::AfterRender) {
                f();
            }
        })
    }

    pub fn post_init(&mut self, f: impl Fn() + Send + Sync + 'static) -> Result<(), PromptError> {
        self.on(move |e| {
            if matches!(e, PromptEvent::PostInit) {
                f();
            }
        })
    }

    /// Called with the parameter name and its new value.
    pub fn parameter_changed(
        &mut self,
        f: impl Fn(&str, &StoredValue) + Send + Sync + 'static,
    ) -> Result<(), PromptError> {
        self.on(move |e| {
            if let PromptEvent::ParameterChanged { name, value } = e {
                f(name, value);
            }
        })
    }

    fn on(&mut self, f: impl Fn(&PromptEvent) + Send + Sync + 'static) -> Result<(), PromptError> {
        self.panel_mut()?.add_handler(FnEventHandler::new(f));
        Ok(())
    }
}

fn not_found() -> PromptError {
    error!("{PANEL_NOT_FOUND}");
    PromptError::PanelNotFound
}
