//! Command-line driver for the integration plugins.
//!
//! Runs the plugins against an event loaded from JSON with project options
//! loaded from TOML, which is handy for checking a webhook or write key
//! before enabling it for a project.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use sentry_plugins::{
    ErrorEvent, MemoryConfigStore, Notification, NotificationRule, PluginRegistry, Settings,
};

#[derive(Parser)]
#[command(name = "sentry-plugins")]
#[command(about = "Run Segment and Slack plugins against an event", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe a plugin and list the options it reads
    Fields {
        /// Plugin slug (segment, slack)
        plugin: String,
    },

    /// Run every plugin's post-process hook on an event
    PostProcess {
        /// TOML file with `[<project>.<plugin>]` option tables
        #[arg(long)]
        options: PathBuf,

        /// JSON file containing the event
        #[arg(long)]
        event: PathBuf,
    },

    /// Send a rule notification through every configured plugin
    Notify {
        /// TOML file with `[<project>.<plugin>]` option tables
        #[arg(long)]
        options: PathBuf,

        /// JSON file containing the event
        #[arg(long)]
        event: PathBuf,

        /// Label of the triggering rule
        #[arg(long, default_value = "Manual notification")]
        rule: String,

        /// Id of the triggering rule
        #[arg(long, default_value_t = 0)]
        rule_id: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::from_env();

    match cli.command {
        Commands::Fields { plugin } => {
            let registry =
                PluginRegistry::from_settings(&settings, Arc::new(MemoryConfigStore::new()))?;
            let Some(plugin) = registry.get(&plugin) else {
                bail!("unknown plugin '{plugin}'");
            };
            let fields = serde_json::json!({
                "slug": plugin.slug(),
                "title": plugin.title(),
                "description": plugin.description(),
                "fields": plugin.config_fields(),
            });
            println!(
                "{}",
                serde_json::to_string_pretty(&fields).context("failed to render config fields")?
            );
        }

        Commands::PostProcess { options, event } => {
            let registry = load_registry(&settings, &options)?;
            let event = load_event(&event)?;

            info!(event_id = %event.event_id, "Running post-process hooks");
            report(registry.post_process_and_wait(&event).await)?;
        }

        Commands::Notify {
            options,
            event,
            rule,
            rule_id,
        } => {
            let registry = load_registry(&settings, &options)?;
            let notification = Notification::new(
                load_event(&event)?,
                NotificationRule {
                    id: rule_id,
                    label: rule,
                },
            );

            info!(event_id = %notification.event.event_id, "Running notify hooks");
            report(registry.notify_and_wait(&notification).await)?;
        }
    }

    Ok(())
}

fn load_registry(settings: &Settings, path: &Path) -> Result<PluginRegistry> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read options from {}", path.display()))?;
    let store = MemoryConfigStore::from_toml_str(&raw)
        .with_context(|| format!("invalid options file {}", path.display()))?;
    Ok(PluginRegistry::from_settings(settings, Arc::new(store))?)
}

fn load_event(path: &Path) -> Result<ErrorEvent> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read event from {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid event JSON in {}", path.display()))
}

fn report(results: Vec<(&'static str, Result<(), sentry_plugins::PluginError>)>) -> Result<()> {
    let mut failed = 0;
    for (plugin, result) in results {
        match result {
            Ok(()) => println!("{plugin}: ok"),
            Err(e) => {
                failed += 1;
                println!("{plugin}: failed: {e}");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} plugin(s) failed");
    }
    Ok(())
}
