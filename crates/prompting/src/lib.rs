//! Parameter prompt panels that update in place.
//!
//! A server describes the prompts a report needs as a
//! [`ParameterDefinition`](parameters::ParameterDefinition): ordered groups of
//! parameters, their selectable values and validation errors. A
//! [`PromptPanel`](panel::PromptPanel) turns that definition into a tree of
//! UI components registered with a [`Dashboard`](dashboard::Dashboard). When
//! the server sends a refreshed definition, the panel does not rebuild: it
//! computes a [`Diff`](parameters::diff::Diff) and applies it to the live
//! tree, keeping widget identity, focus and scroll position.
//!
//! # Getting started
//!
//! ```ignore
//! use prompting::prelude::*;
//!
//! let definition = ParameterDefinition::from_json(&json)?;
//! let mut panel = PromptPanel::new("prompt-div", definition, PanelConfig::default())?
//!     .with_handler(LoggingHandler);
//!
//! panel.init(false);
//! panel.settle();
//!
//! // Later, with a definition fetched after the user changed something:
//! panel.refresh(next_definition, false);
//! println!("{}", panel.tree().unwrap().outline());
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`parameters`] | Definition model, [`diff`](parameters::diff) and locale-aware [`format`](parameters::format) |
//! | [`components`] | Tagged component kinds and the [`WidgetFactory`](components::builder::WidgetFactory) |
//! | [`dashboard`] | Component registry and value store |
//! | [`panel`] | [`PromptPanel`](panel::PromptPanel) reconciliation, submit decisions, events, definition providers |
//! | [`api`] | Render/init facade with event hooks |
//! | [`view`] | Single-shot render boundary for visualizations |
//! | [`logging`] | `tracing` capture layer |

pub mod api;
pub mod components;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod panel;
pub mod parameters;
pub mod prelude;
pub mod view;

use schemars::JsonSchema;

pub use error::{Lookup, PromptError, RenderError};

/// JSON Schema of `T` as a `serde_json::Value`.
///
/// ```ignore
/// let schema = json_schema_for::<ParameterDefinition>();
/// assert_eq!(schema["type"], "object");
/// ```
pub fn json_schema_for<T: JsonSchema>() -> serde_json::Value {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema)
        .unwrap_or_else(|_| serde_json::json!({"type": "object", "properties": {}}))
}
