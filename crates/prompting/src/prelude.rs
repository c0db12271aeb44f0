//! Convenience re-exports for embedding a prompt panel.
//!
//! ```ignore
//! use prompting::prelude::*;
//! ```
//!
//! Diff internals, the logging layer and the view boundary are left out;
//! import those from their modules.

// ── Model ───────────────────────────────────────────────────────────
pub use crate::parameters::diff::{Diff, diff};
pub use crate::parameters::{
    Parameter, ParameterDefinition, ParameterGroup, ParameterValue, StoredValue,
};

// ── Panel ───────────────────────────────────────────────────────────
pub use crate::api::PromptingApi;
pub use crate::config::PanelConfig;
pub use crate::dashboard::{Dashboard, LocalDashboard};
pub use crate::panel::events::{
    CompositeEventHandler, FnEventHandler, LoggingHandler, NoopHandler, PromptEvent,
    PromptEventHandler,
};
pub use crate::panel::provider::{DefinitionFuture, DefinitionProvider};
pub use crate::panel::{PanelState, PromptPanel, RefreshOutcome};

// ── Components ──────────────────────────────────────────────────────
pub use crate::components::builder::{WidgetBuilder, WidgetFactory};
pub use crate::components::{Component, ComponentKind, ComponentNode};

// ── Errors ──────────────────────────────────────────────────────────
pub use crate::{Lookup, PromptError, json_schema_for};
