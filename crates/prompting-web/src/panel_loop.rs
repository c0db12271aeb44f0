//! The task that owns the hosted [`PromptPanel`].
//!
//! Handlers never touch the panel directly. They send a [`PanelCommand`]
//! and await the reply, so commands are applied one at a time in arrival
//! order. After each command the task ticks the panel until it settles,
//! yielding to the runtime after every tick, and publishes a fresh
//! [`WebSnapshot`].

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use prompting::logging::{LogBuffer, LogLine};
use prompting::PromptError;
use prompting::panel::{PanelState, PromptPanel, RefreshOutcome};
use prompting::parameters::{ParameterDefinition, StoredValue};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info};

use crate::broadcast::WsMessage;
use crate::snapshot::{SNAPSHOT_MAX_LOGS, SharedSnapshot, WebSnapshot};

type Reply<T> = oneshot::Sender<Result<T, PromptError>>;

/// A request for the panel task.
pub enum PanelCommand {
    /// A user changed a parameter; the provider is asked for a new definition.
    SetParameter {
        name: String,
        value: StoredValue,
        reply: Reply<RefreshOutcome>,
    },
    /// Apply a definition pushed by the client.
    Refresh {
        definition: ParameterDefinition,
        reply: Reply<RefreshOutcome>,
    },
    Submit { reply: Reply<()> },
    Focus { parameter: String, reply: Reply<()> },
    Scroll {
        component: String,
        offset: u32,
        reply: Reply<()>,
    },
}

impl PanelCommand {
    fn name(&self) -> &'static str {
        match self {
            PanelCommand::SetParameter { .. } => "set_parameter",
            PanelCommand::Refresh { .. } => "refresh",
            PanelCommand::Submit { .. } => "submit",
            PanelCommand::Focus { .. } => "focus",
            PanelCommand::Scroll { .. } => "scroll",
        }
    }
}

pub(crate) struct PanelLoop {
    pub panel: PromptPanel,
    pub commands: mpsc::Receiver<PanelCommand>,
    pub shared: SharedSnapshot,
    pub broadcast_tx: broadcast::Sender<WsMessage>,
    pub submits: Arc<AtomicU64>,
    pub logs: Option<LogBuffer>,
    pub history: Vec<LogLine>,
}

impl PanelLoop {
    /// Initialize the panel if needed and publish the first snapshot, so
    /// handlers never observe an empty state.
    pub fn prime(&mut self) {
        if self.panel.state() == PanelState::Uninitialized {
            self.panel.init(false);
        }
        self.panel.settle();
        self.publish();
    }

    /// Run until every [`PanelHandle`](crate::PanelHandle) is dropped.
    pub async fn run(mut self) {
        while let Some(command) = self.commands.recv().await {
            debug!(command = command.name(), "panel command");
            self.apply(command).await;
        }
        info!("Panel task stopped");
    }

    async fn apply(&mut self, command: PanelCommand) {
        match command {
            PanelCommand::SetParameter { name, value, reply } => {
                let result = self.panel.parameter_changed(&name, value).await;
                self.finish(reply, result).await;
            }
            PanelCommand::Refresh { definition, reply } => {
                let outcome = self.panel.refresh(definition, false);
                self.finish(reply, Ok(outcome)).await;
            }
            PanelCommand::Submit { reply } => {
                self.panel.submit_start();
                self.panel.submit();
                self.finish(reply, Ok(())).await;
            }
            PanelCommand::Focus { parameter, reply } => {
                let result = self.panel.focus(&parameter);
                self.finish(reply, result).await;
            }
            PanelCommand::Scroll {
                component,
                offset,
                reply,
            } => {
                let result = self.panel.scroll_to(&component, offset);
                self.finish(reply, result).await;
            }
        }
    }

    /// Settle and publish before replying, so a requester that reads the
    /// snapshot next sees its own change.
    async fn finish<T>(&mut self, reply: Reply<T>, result: Result<T, PromptError>) {
        self.settle().await;
        self.publish();
        // A dropped receiver means the requester went away; the command still ran.
        let _ = reply.send(result);
    }

    async fn settle(&mut self) {
        while !self.panel.is_settled() && self.panel.tick() {
            tokio::task::yield_now().await;
        }
    }

    fn publish(&mut self) {
        if let Some(buffer) = &self.logs {
            for line in buffer.drain() {
                let _ = self.broadcast_tx.send(WsMessage::Log { line: line.clone() });
                self.history.push(line);
            }
            if self.history.len() > SNAPSHOT_MAX_LOGS {
                let excess = self.history.len() - SNAPSHOT_MAX_LOGS;
                self.history.drain(..excess);
            }
        }

        // The dashboard logs every re-render; drain it so the log stays bounded.
        let mut rendered = self.panel.dashboard_mut().take_updates();
        if !rendered.is_empty() {
            let mut seen = HashSet::new();
            rendered.retain(|name| seen.insert(name.clone()));
            debug!(count = rendered.len(), "components re-rendered");
            let _ = self.broadcast_tx.send(WsMessage::Rendered {
                components: rendered,
            });
        }

        let snapshot = WebSnapshot::from_panel(
            &self.panel,
            &self.history,
            self.submits.load(Ordering::Relaxed),
        );
        let data = snapshot.to_json();
        *self.shared.lock().unwrap_or_else(|e| e.into_inner()) = snapshot;
        let _ = self.broadcast_tx.send(WsMessage::Snapshot { data });
    }
}
