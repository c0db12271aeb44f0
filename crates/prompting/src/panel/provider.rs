//! Sources of refreshed parameter definitions.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use serde_json::{Map, Value};

use crate::parameters::ParameterDefinition;

/// Boxed future returned by [`DefinitionProvider::fetch`].
pub type DefinitionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<ParameterDefinition>, String>> + Send + 'a>>;

/// Asks the server for the definition matching the current parameter values.
///
/// `Ok(None)` means "nothing new". The future is awaited once per refresh.
pub trait DefinitionProvider: Send + Sync {
    fn fetch<'a>(
        &'a self,
        current: &'a ParameterDefinition,
        values: &'a Map<String, Value>,
    ) -> DefinitionFuture<'a>;
}

/// Hands out pre-recorded responses in order, then `Ok(None)`.
#[derive(Default)]
pub struct QueuedDefinitionProvider {
    responses: Mutex<VecDeque<Result<Option<ParameterDefinition>, String>>>,
}

impl QueuedDefinitionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definition(self, definition: ParameterDefinition) -> Self {
        self.push(Ok(Some(definition)));
        self
    }

    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()));
        self
    }

    pub fn push(&self, response: Result<Option<ParameterDefinition>, String>) {
        if let Ok(mut q) = self.responses.lock() {
            q.push_back(response);
        }
    }

    pub fn remaining(&self) -> usize {
        self.responses.lock().map(|q| q.len()).unwrap_or(0)
    }
}

impl DefinitionProvider for QueuedDefinitionProvider {
    fn fetch<'a>(
        &'a self,
        _current: &'a ParameterDefinition,
        _values: &'a Map<String, Value>,
    ) -> DefinitionFuture<'a> {
        let next = self
            .responses
            .lock()
            .map_err(|e| format!("provider queue poisoned: {e}"))
            .map(|mut q| q.pop_front().unwrap_or(Ok(None)));
        Box::pin(async move { next? })
    }
}
