//! Lifecycle events emitted by a [`PromptPanel`](super::PromptPanel).
//!
//! Hosts observe a panel by registering [`PromptEventHandler`]s.
//!
//! | Handler | Use case |
//! |---------|----------|
//! | [`NoopHandler`] | Tests or headless panels |
//! | [`LoggingHandler`] | Structured logging via `tracing` |
//! | [`FnEventHandler`] | Quick closures |
//! | [`CompositeEventHandler`] | Several handlers in order |

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::parameters::StoredValue;

// ── Events ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PromptEvent {
    /// A full build is about to register components.
    BeforeRender,
    /// A full build registered its components with the dashboard.
    AfterRender,
    /// The dashboard finished laying out the components of a full build.
    PostInit,
    Ready,
    /// The form was submitted. `is_init` is set for the submit that
    /// accompanies the first initialization.
    Submit { is_init: bool },
    SubmitStart,
    ParameterChanged { name: String, value: StoredValue },
    /// A refresh arrived while the dashboard was still initializing.
    RefreshDeferred { queued: usize },
    /// A refresh was applied to the live tree.
    Refreshed {
        added: usize,
        removed: usize,
        changed: usize,
    },
    /// Something the user must be told about.
    Alert { message: String },
}

impl PromptEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PromptEvent::BeforeRender => "before_render",
            PromptEvent::AfterRender => "after_render",
            PromptEvent::PostInit => "post_init",
            PromptEvent::Ready => "ready",
            PromptEvent::Submit { .. } => "submit",
            PromptEvent::SubmitStart => "submit_start",
            PromptEvent::ParameterChanged { .. } => "parameter_changed",
            PromptEvent::RefreshDeferred { .. } => "refresh_deferred",
            PromptEvent::Refreshed { .. } => "refreshed",
            PromptEvent::Alert { .. } => "alert",
        }
    }
}

// ── Handlers ───────────────────────────────────────────────────────

/// Observer of panel events. Handlers run synchronously inside the panel's
/// event loop and must not block.
pub trait PromptEventHandler: Send + Sync {
    fn on_event(&self, event: &PromptEvent) {
        let _ = event;
    }
}

pub struct NoopHandler;
impl PromptEventHandler for NoopHandler {}

/// An event handler backed by a closure.
///
/// ```ignore
/// let handler = FnEventHandler::new(|event| {
///     if let PromptEvent::Submit { is_init } = event {
///         println!("submit (init={is_init})");
///     }
/// });
/// ```
pub struct FnEventHandler<F>(F)
where
    F: Fn(&PromptEvent) + Send + Sync;

impl<F> FnEventHandler<F>
where
    F: Fn(&PromptEvent) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> PromptEventHandler for FnEventHandler<F>
where
    F: Fn(&PromptEvent) + Send + Sync,
{
    fn on_event(&self, event: &PromptEvent) {
        (self.0)(event)
    }
}

/// Dispatches every event to each inner handler in registration order.
pub struct CompositeEventHandler {
    handlers: Vec<Box<dyn PromptEventHandler>>,
}

impl CompositeEventHandler {
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    pub fn with(mut self, handler: impl PromptEventHandler + 'static) -> Self {
        self.push(handler);
        self
    }

    pub fn with_if(self, condition: bool, handler: impl PromptEventHandler + 'static) -> Self {
        if condition { self.with(handler) } else { self }
    }

    pub fn with_opt(self, handler: Option<impl PromptEventHandler + 'static>) -> Self {
        match handler {
            Some(h) => self.with(h),
            None => self,
        }
    }

    /// Non-builder form of [`with`](Self::with).
    pub fn push(&mut self, handler: impl PromptEventHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for CompositeEventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptEventHandler for CompositeEventHandler {
    fn on_event(&self, event: &PromptEvent) {
        for handler in &self.handlers {
            handler.on_event(event);
        }
    }
}

/// Logs every event via `tracing`.
pub struct LoggingHandler;

impl PromptEventHandler for LoggingHandler {
    fn on_event(&self, event: &PromptEvent) {
        match event {
            PromptEvent::BeforeRender => debug!("Rendering prompt panel"),
            PromptEvent::AfterRender => debug!("Prompt panel rendered"),
            PromptEvent::PostInit => debug!("Prompt panel laid out"),
            PromptEvent::Ready => debug!("Prompt panel ready"),
            PromptEvent::Submit { is_init } => info!("Submit (init={is_init})"),
            PromptEvent::SubmitStart => debug!("Submit started"),
            PromptEvent::ParameterChanged { name, value } => {
                debug!("Parameter {name} changed to {value:?}")
            }
            PromptEvent::RefreshDeferred { queued } => {
                warn!("Refresh deferred ({queued} queued)")
            }
            PromptEvent::Refreshed {
                added,
                removed,
                changed,
            } => info!("Refreshed: +{added} -{removed} ~{changed}"),
            PromptEvent::Alert { message } => error!("{message}"),
        }
    }
}
