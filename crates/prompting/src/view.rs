//! Render boundary for visualizations.
//!
//! A [`View`] holds a rendering target (an element id) and a [`Renderer`]
//! that does the drawing. [`View::render`] is the single completion channel:
//! it resolves once, or fails with [`RenderError::Invalid`] (validation
//! failed, nothing drawn) or [`RenderError::Failed`] (the renderer failed,
//! synchronously or while its future ran).

use std::future::Future;
use std::pin::Pin;

use tracing::{debug, warn};

use crate::error::{PromptError, RenderError};

/// Boxed future returned by [`Renderer::render`].
pub type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<(), String>> + Send + 'a>>;

/// How a renderer reacts to a resize or model change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Reaction {
    /// Draw everything again.
    #[default]
    Rerender,
    /// The renderer updated itself in place.
    Handled,
}

/// The drawing capabilities of one visualization kind.
///
/// Only [`render`](Self::render) is required. Every change hook defaults to
/// a full re-render.
pub trait Renderer: Send {
    /// Validation errors of the current model. Empty means valid.
    fn validate(&self) -> Vec<String> {
        Vec::new()
    }

    /// Start drawing into `element`. An `Err` is a synchronous failure.
    fn render<'a>(&'a mut self, element: &'a str) -> Result<RenderFuture<'a>, String>;

    fn resize(&mut self, _width: u32, _height: u32) -> Reaction {
        Reaction::Rerender
    }

    fn selection_changed(&mut self) -> Reaction {
        Reaction::Rerender
    }

    fn on_change(&mut self) -> Reaction {
        Reaction::Rerender
    }
}

pub struct View<R: Renderer> {
    element: Option<String>,
    renderer: R,
}

impl<R: Renderer> View<R> {
    pub fn new(element: Option<String>, renderer: R) -> Result<Self, PromptError> {
        let element = element.ok_or(PromptError::ArgRequired("element"))?;
        if element.trim().is_empty() {
            return Err(PromptError::InvalidArgument {
                name: "element",
                reason: "element id is empty".into(),
            });
        }
        Ok(Self {
            element: Some(element),
            renderer,
        })
    }

    pub fn element(&self) -> Option<&str> {
        self.element.as_deref()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn is_valid(&self) -> bool {
        self.renderer.validate().is_empty()
    }

    pub async fn render(&mut self) -> Result<(), RenderError> {
        let element = self
            .element
            .as_deref()
            .ok_or(PromptError::ArgRequired("element"))?;

        let errors = self.renderer.validate();
        if !errors.is_empty() {
            debug!(errors = errors.len(), "visualization invalid, not rendering");
            return Err(RenderError::Invalid(errors));
        }

        let drawing = self.renderer.render(element).map_err(|e| {
            warn!("render failed: {e}");
            RenderError::Failed(e)
        })?;
        drawing.await.map_err(|e| {
            warn!("render failed: {e}");
            RenderError::Failed(e)
        })
    }

    pub async fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        let reaction = self.renderer.resize(width, height);
        self.react(reaction).await
    }

    pub async fn selection_changed(&mut self) -> Result<(), RenderError> {
        let reaction = self.renderer.selection_changed();
        self.react(reaction).await
    }

    pub async fn on_change(&mut self) -> Result<(), RenderError> {
        let reaction = self.renderer.on_change();
        self.react(reaction).await
    }

    async fn react(&mut self, reaction: Reaction) -> Result<(), RenderError> {
        match reaction {
            Reaction::Rerender => self.render().await,
            Reaction::Handled => Ok(()),
        }
    }

    /// Release the rendering target. Later renders fail.
    pub fn dispose(&mut self) {
        self.element = None;
    }
}
