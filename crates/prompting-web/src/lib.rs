//! Host a prompt panel behind a browser-facing server.
//!
//! `prompting-web` runs a [`PromptPanel`] on its own Tokio task and exposes
//! it through an axum server: a WebSocket at `/ws` that streams state and
//! events, and a REST API under `/api` for parameter changes, refreshes,
//! submits, focus and scroll.
//!
//! # Quick start
//!
//! ```ignore
//! use prompting::prelude::*;
//! use prompting_web::{FileDefinitionProvider, WebConfig, spawn_web};
//!
//! let provider = Arc::new(FileDefinitionProvider::new("report.json"));
//! let definition = provider.load().await?;
//! let panel = PromptPanel::new("prompt", definition, PanelConfig::default())?;
//!
//! let (addr, handle) = spawn_web(panel, Some(provider), WebConfig::default()).await?;
//! println!("Prompt panel: http://{addr}");
//! handle.submit().await?;
//! ```
//!
//! # Architecture
//!
//! ```text
//! REST / WebSocket ──PanelCommand──▶ panel task (owns PromptPanel)
//!                                        │
//!        WebSocket clients ◀──WsMessage──┴── WebBroadcastHandler, snapshots
//! ```
//!
//! Every command is applied to the panel in arrival order, so overlapping
//! requests from several clients never interleave inside a reconciliation.

mod api;
pub mod broadcast;
pub mod error;
mod panel_loop;
pub mod provider;
mod server;
pub mod snapshot;
mod ws;

pub use broadcast::{WebBroadcastHandler, WsMessage};
pub use error::ServerError;
pub use panel_loop::PanelCommand;
pub use provider::FileDefinitionProvider;
pub use snapshot::{SharedSnapshot, WebSnapshot};

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use prompting::PromptError;
use prompting::logging::LogBuffer;
use prompting::panel::provider::DefinitionProvider;
use prompting::panel::{PromptPanel, RefreshOutcome};
use prompting::parameters::{ParameterDefinition, StoredValue};
use tokio::sync::{mpsc, oneshot};

use crate::panel_loop::PanelLoop;

/// Configuration for the web host.
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:3002`.
    pub bind_addr: SocketAddr,
    /// Directory of a static frontend build, served as the fallback route.
    pub static_dir: Option<PathBuf>,
    /// WebSocket broadcast channel capacity. Default: 256.
    ///
    /// Clients that fall behind by this many messages receive a fresh
    /// snapshot to resynchronize.
    pub broadcast_capacity: usize,
    /// Commands that may wait for the panel task. Default: 64.
    pub command_capacity: usize,
    /// Captured log lines to forward to clients.
    pub logs: Option<LogBuffer>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3002)),
            static_dir: None,
            broadcast_capacity: 256,
            command_capacity: 64,
            logs: None,
        }
    }
}

/// Cloneable access to the hosted panel.
#[derive(Clone)]
pub struct PanelHandle {
    commands: mpsc::Sender<PanelCommand>,
    snapshot: SharedSnapshot,
    broadcast_tx: tokio::sync::broadcast::Sender<WsMessage>,
}

impl PanelHandle {
    /// The most recently published state.
    pub fn snapshot(&self) -> WebSnapshot {
        snapshot::read(&self.snapshot)
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<WsMessage> {
        self.broadcast_tx.subscribe()
    }

    pub async fn set_parameter(
        &self,
        name: impl Into<String>,
        value: StoredValue,
    ) -> Result<RefreshOutcome, PromptError> {
        let name = name.into();
        self.request(|reply| PanelCommand::SetParameter { name, value, reply })
            .await
    }

    pub async fn refresh(
        &self,
        definition: ParameterDefinition,
    ) -> Result<RefreshOutcome, PromptError> {
        self.request(|reply| PanelCommand::Refresh { definition, reply })
            .await
    }

    pub async fn submit(&self) -> Result<(), PromptError> {
        self.request(|reply| PanelCommand::Submit { reply }).await
    }

    pub async fn focus(&self, parameter: impl Into<String>) -> Result<(), PromptError> {
        let parameter = parameter.into();
        self.request(|reply| PanelCommand::Focus { parameter, reply })
            .await
    }

    pub async fn scroll(
        &self,
        component: impl Into<String>,
        offset: u32,
    ) -> Result<(), PromptError> {
        let component = component.into();
        self.request(|reply| PanelCommand::Scroll {
            component,
            offset,
            reply,
        })
        .await
    }

    /// Send a command and wait for its reply. A stopped panel task reads as
    /// a missing panel.
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<T, PromptError>>) -> PanelCommand,
    ) -> Result<T, PromptError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| PromptError::PanelNotFound)?;
        response.await.map_err(|_| PromptError::PanelNotFound)?
    }
}

/// Start the panel task and the web server.
///
/// The panel is initialized and settled before this returns if it has not
/// been yet, so the first snapshot is always available. A
/// `provider` replaces any provider already attached to the panel.
/// Returns the bound address and a handle to the panel; the server runs
/// until the Tokio runtime shuts down.
pub async fn spawn_web(
    mut panel: PromptPanel,
    provider: Option<Arc<dyn DefinitionProvider>>,
    config: WebConfig,
) -> Result<(SocketAddr, PanelHandle), ServerError> {
    let (broadcast_tx, _) = tokio::sync::broadcast::channel(config.broadcast_capacity);
    let (command_tx, command_rx) = mpsc::channel(config.command_capacity);
    let shared = SharedSnapshot::default();

    if let Some(provider) = provider {
        panel = panel.with_provider(provider);
    }
    let handler = WebBroadcastHandler::new(broadcast_tx.clone());
    let submits = handler.submit_counter();
    panel.add_handler(handler);

    let handle = PanelHandle {
        commands: command_tx,
        snapshot: shared.clone(),
        broadcast_tx: broadcast_tx.clone(),
    };

    let mut panel_loop = PanelLoop {
        panel,
        commands: command_rx,
        shared,
        broadcast_tx,
        submits,
        logs: config.logs,
        history: Vec::new(),
    };
    panel_loop.prime();
    tokio::spawn(panel_loop.run());

    let router = server::build_router(handle.clone(), config.static_dir);
    let addr = server::start_server(router, config.bind_addr).await?;
    Ok((addr, handle))
}
