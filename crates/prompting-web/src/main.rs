//! Serve a prompt panel built from a definition file.
//!
//! The file is re-read whenever a parameter changes, so editing it while the
//! server runs plays the part of the report server.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p prompting-web -- --definition report.json
//! cargo run -p prompting-web -- --definition report.json --port 8080 -vv
//! ```
//!
//! ## Changing a parameter
//!
//! **WebSocket** (connect to `/ws`):
//! ```json
//! {"type": "set_parameter", "name": "year", "value": "2025"}
//! ```
//!
//! **REST** (`POST /api/parameter`):
//! ```json
//! {"name": "lines", "value": ["cars", "ships"]}
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use prompting::logging::{LogLevel, PanelTracingLayer, init_tracing};
use prompting::prelude::*;
use prompting_web::{FileDefinitionProvider, WebConfig, WsMessage, spawn_web};
use tokio::sync::broadcast::error::RecvError;

/// Prompt panel server.
#[derive(Parser)]
#[command(about = "Serve a live prompt panel over HTTP and WebSocket")]
struct Args {
    /// Parameter definition file (JSON).
    #[arg(long)]
    definition: PathBuf,

    /// Port for the server.
    #[arg(long, default_value_t = 3002)]
    port: u16,

    /// Static frontend build to serve at `/`.
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Locale for number-typed parameters.
    #[arg(long, default_value = "en")]
    locale: String,

    /// Override the definition's auto-submit setting.
    #[arg(long)]
    auto_submit: Option<bool>,

    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    // Console logging, plus captured lines forwarded to clients.
    let (layer, logs) = PanelTracingLayer::new();
    init_tracing(args.verbose, Some(layer.with_min_level(LogLevel::Info)));

    let provider = Arc::new(FileDefinitionProvider::new(&args.definition));
    let definition = provider.load().await?;
    let config = PanelConfig::default()
        .with_locale(args.locale)
        .with_auto_submit(args.auto_submit);
    let panel = PromptPanel::new("prompt", definition, config)
        .map_err(|e| e.to_string())?
        .with_handler(LoggingHandler);

    let web_config = WebConfig {
        bind_addr: ([127, 0, 0, 1], args.port).into(),
        static_dir: args.static_dir,
        logs: Some(logs),
        ..Default::default()
    };
    let (addr, handle) = spawn_web(panel, Some(provider), web_config)
        .await
        .map_err(|e| e.to_string())?;
    println!("Prompt panel: http://{addr}");
    println!("Press Ctrl-C to stop.\n");

    // Print the submitted values once the snapshot that follows a submit arrives.
    let mut events = handle.subscribe();
    let mut submitted = None;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            msg = events.recv() => match msg {
                Ok(WsMessage::Submit { is_init }) => submitted = Some(is_init),
                Ok(WsMessage::Snapshot { data }) => {
                    if let Some(is_init) = submitted.take() {
                        println!("submit (init={is_init}): {}", data["panel"]["values"]);
                    }
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}
