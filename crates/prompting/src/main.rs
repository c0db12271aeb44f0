//! Inspect parameter definitions and the panels built from them.
//!
//! # Examples
//!
//! ```sh
//! # What changes between two definitions
//! prompting diff before.json after.json
//!
//! # Build a panel, apply refreshes, print the component tree
//! prompting render report.json --refresh step1.json --refresh step2.json
//!
//! # Parameter values as the report would receive them
//! prompting values report.json --locale de
//!
//! # JSON Schema of the definition format
//! prompting schema
//! ```

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use prompting::logging::init_tracing;
use prompting::prelude::*;

/// Inspect parameter definitions and the prompt panels built from them.
#[derive(Parser)]
#[command(name = "prompting")]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the diff between two definitions as JSON
    Diff { old: PathBuf, new: PathBuf },

    /// Build a panel and print its component tree
    Render {
        definition: PathBuf,

        /// Definitions to refresh with, in order
        #[arg(long = "refresh")]
        refreshes: Vec<PathBuf>,

        /// Override the definition's auto-submit setting
        #[arg(long)]
        auto_submit: Option<bool>,

        /// Fixed panel GUID (default: random)
        #[arg(long, default_value = "cli")]
        guid: String,

        /// Print the panel snapshot as JSON instead of an outline
        #[arg(long)]
        json: bool,
    },

    /// Print the parameter values of a definition
    Values {
        definition: PathBuf,

        /// Locale for number-typed parameters
        #[arg(long, default_value = "en")]
        locale: String,
    },

    /// Print the JSON Schema of the definition format
    Schema,
}

fn load(path: &Path) -> Result<ParameterDefinition, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {e}", path.display()))?;
    ParameterDefinition::from_json(&text).map_err(|e| format!("{}: {e}", path.display()))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| e.to_string())
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Diff { old, new } => {
            let d = diff(&load(&old)?, &load(&new)?);
            println!("{}", to_json(&d)?);
        }
        Command::Render {
            definition,
            refreshes,
            auto_submit,
            guid,
            json,
        } => {
            let config = PanelConfig::default()
                .with_guid(guid)
                .with_auto_submit(auto_submit);
            let submits: Arc<Mutex<Vec<bool>>> = Arc::default();
            let s = submits.clone();
            let mut panel = PromptPanel::new("cli", load(&definition)?, config)
                .map_err(|e| e.to_string())?
                .with_handler(LoggingHandler)
                .with_handler(FnEventHandler::new(move |e: &PromptEvent| {
                    if let PromptEvent::Submit { is_init } = e
                        && let Ok(mut s) = s.lock()
                    {
                        s.push(*is_init);
                    }
                }));

            panel.init(false);
            panel.settle();
            for path in &refreshes {
                panel.refresh(load(path)?, false);
                panel.settle();
            }

            if json {
                println!("{}", to_json(&panel.snapshot())?);
            } else {
                match panel.tree() {
                    Some(tree) => print!("{}", tree.outline()),
                    None => println!("(no parameter UI)"),
                }
                let submits = submits.lock().map(|s| s.clone()).unwrap_or_default();
                for is_init in submits {
                    println!("submit (init={is_init})");
                }
            }
        }
        Command::Values { definition, locale } => {
            let config = PanelConfig::default().with_locale(locale);
            let mut panel =
                PromptPanel::new("cli", load(&definition)?, config).map_err(|e| e.to_string())?;
            panel.init(true);
            println!("{}", to_json(&panel.get_parameter_values())?);
        }
        Command::Schema => {
            println!("{}", to_json(&json_schema_for::<ParameterDefinition>())?);
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, None);
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
