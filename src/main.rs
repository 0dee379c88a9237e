//! `hotconf` command line tool.
//!
//! Registers a demo schema under the given owner id and either prints the
//! materialized configuration, checks that it loads, or keeps it loaded and
//! reports every reload until interrupted.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;

use hotconf::config::{ConfigEventKind, ConfigRegistry};
use hotconf::error::SchemaError;
use hotconf::lifecycle::shutdown_signal;
use hotconf::observability::logging;
use hotconf::schema::{ExecutionMode, Field, Schema, Section};
use hotconf::settings::{load_settings, EngineSettings};

#[derive(Parser)]
#[command(name = "hotconf")]
#[command(about = "Inspect and watch hot-reloadable configuration files", long_about = None)]
struct Cli {
    /// Engine settings file (TOML)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Override the directory holding per-owner configuration files
    #[arg(long)]
    config_root: Option<PathBuf>,

    /// Override the execution mode (client or server)
    #[arg(long)]
    mode: Option<ExecutionMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the materialized configuration as JSON
    Show {
        #[arg(short, long, default_value = "example")]
        owner: String,
    },
    /// Load, migrate and validate the configuration, then exit
    Check {
        #[arg(short, long, default_value = "example")]
        owner: String,
    },
    /// Keep the configuration loaded and report reloads until interrupted
    Watch {
        #[arg(short, long, default_value = "example")]
        owner: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init("hotconf=info");

    let cli = Cli::parse();

    let mut settings = match &cli.settings {
        Some(path) => load_settings(path)?,
        None => EngineSettings::default(),
    };
    if let Some(root) = cli.config_root {
        settings.config_root = root;
    }
    if let Some(mode) = cli.mode {
        settings.mode = mode;
    }
    settings.watch_files = matches!(cli.command, Commands::Watch { .. });
    settings.validate()?;

    let registry = ConfigRegistry::new(settings);

    match cli.command {
        Commands::Show { owner } => {
            let handle = registry.register(&owner, demo_schema()?)?;
            println!("{}", serde_json::to_string_pretty(&*handle.get())?);
        }
        Commands::Check { owner } => {
            let handle = registry.register(&owner, demo_schema()?)?;
            let instance = handle.get();
            println!(
                "{}: ok (version {}, {} values)",
                handle.path().display(),
                instance.version(),
                instance.len()
            );
        }
        Commands::Watch { owner } => {
            let handle = registry.register(&owner, demo_schema()?)?;
            let mut events = handle.subscribe();
            tracing::info!(path = %handle.path().display(), "Watching configuration, press Ctrl+C to stop");

            let signal = shutdown_signal();
            tokio::pin!(signal);

            loop {
                tokio::select! {
                    _ = &mut signal => break,
                    event = events.recv() => match event {
                        Ok(event) if event.kind == ConfigEventKind::ReloadFailed => {
                            tracing::warn!(
                                owner = %event.owner,
                                error = event.error.as_deref().unwrap_or("unknown"),
                                "Reload rejected"
                            );
                        }
                        Ok(event) => {
                            tracing::info!(owner = %event.owner, kind = ?event.kind, generation = event.generation, "Configuration event");
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Event receiver lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }
    }

    registry.shutdown();
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Demo schema exercising every field type, nesting and a client-only
/// section.
fn demo_schema() -> Result<Schema, SchemaError> {
    Schema::builder(2)
        .section(
            Section::new("rendering")
                .field(Field::bool("enableFog", true))
                .field(Field::enumeration("quality", &["fast", "fancy"], "FANCY"))
                .section(
                    Section::new("entityCulling")
                        .label("Entity Culling")
                        .field(Field::bool("enableCulling", true))
                        .field(Field::bool("enableEntityCulling", true)),
                ),
        )
        .section(
            Section::new("example")
                .field(Field::string("greeting", "hello").rule("minLength:1"))
                .field(Field::long("seed", 42))
                .field(Field::double("scale", 1.0).range(0.1, 10.0)),
        )
        .section(
            Section::new("exampleClient")
                .label("Client Only")
                .client_only()
                .field(Field::int("renderDistance", 64).range(1.0, 256.0))
                .field(Field::string_list(
                    "trackedEntities",
                    &["minecraft:player", "minecraft:villager"],
                )),
        )
        .build()
}
