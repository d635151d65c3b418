//! diam-sm CLI binary.
//!
//! Inspect what a node would negotiate before deploying it.
//!
//! # Commands
//!
//! - `apps` - List the applications a node advertises in CEA
//! - `settings` - Validate a settings file and print it normalized
//! - `cer` - Print the CER the node would send, as JSON

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use diam_sm::{
    prepare_supported_apps, Dictionary, Settings, StateMachine, SupportedApp, VERSION,
};

#[derive(Parser)]
#[command(name = "diam-sm")]
#[command(version = VERSION)]
#[command(about = "Diameter peer state machine tooling", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List locally supported applications
    Apps {
        /// Dictionary file (TOML)
        #[arg(short, long)]
        dict: PathBuf,

        /// Settings file; its supported_apps are used when no --filter is given
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Application filter, repeatable (e.g. "1", "TGPP.TGPP S6A")
        #[arg(short, long)]
        filter: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a settings file
    Settings {
        /// Settings file (TOML)
        config: PathBuf,

        /// Apply DIAM_* environment overrides
        #[arg(long)]
        env: bool,
    },

    /// Print the CER this node would send
    Cer {
        /// Dictionary file (TOML)
        #[arg(short, long)]
        dict: PathBuf,

        /// Settings file (TOML)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Apps {
            dict,
            config,
            filter,
            json,
        } => cmd_apps(dict, config, filter, json),
        Commands::Settings { config, env } => cmd_settings(config, env),
        Commands::Cer { dict, config } => cmd_cer(dict, config),
    }
}

fn load_settings(path: PathBuf) -> anyhow::Result<Settings> {
    Settings::from_file(&path).with_context(|| format!("loading {}", path.display()))
}

fn cmd_apps(
    dict: PathBuf,
    config: Option<PathBuf>,
    filter: Vec<String>,
    json: bool,
) -> anyhow::Result<()> {
    let dict = Dictionary::from_file(&dict)?;
    let filters = if !filter.is_empty() {
        Some(filter)
    } else if let Some(path) = config {
        load_settings(path)?.supported_apps
    } else {
        None
    };

    let apps = prepare_supported_apps(&dict, filters.as_deref());
    if json {
        println!("{}", serde_json::to_string_pretty(&apps)?);
        return Ok(());
    }

    println!("Supported Applications ({}):", apps.len());
    println!();
    for app in &apps {
        let name = dict
            .apps()
            .iter()
            .find(|a| SupportedApp::from(*a) == *app)
            .map_or("", |a| a.name.as_str());
        let kind = app.app_type.name();
        if app.is_vendor_specific() {
            println!("  {:>10}  {:<4}  vendor {:<6}  {}", app.id, kind, app.vendor, name);
        } else {
            println!("  {:>10}  {:<4}  {:<13}  {}", app.id, kind, "", name);
        }
    }
    Ok(())
}

fn cmd_settings(config: PathBuf, env: bool) -> anyhow::Result<()> {
    let mut settings = load_settings(config)?;
    if env {
        settings = settings.with_env_overrides();
    }
    settings.validate()?;
    println!("{}", toml::to_string_pretty(&settings)?);
    Ok(())
}

fn cmd_cer(dict: PathBuf, config: PathBuf) -> anyhow::Result<()> {
    let dict = Dictionary::from_file(&dict)?;
    let settings = load_settings(config)?;
    settings.validate()?;

    let sm = StateMachine::new(settings, &dict);
    let cer = sm.capabilities_request(1, 1);
    println!("{}", serde_json::to_string_pretty(&cer)?);
    Ok(())
}
